//! Errors surfaced by the account.
//!
//! The enum lives in the shared crate so the signer toolkit can match on the same variants.

pub use plugin_account_types::{AccountError, EnvironmentError, MerkleError, SignatureRole};
