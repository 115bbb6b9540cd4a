//! Small deterministic helpers used by the decoder and the plugins.

pub mod crypto;
pub mod felts;
