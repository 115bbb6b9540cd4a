//! Off-chain counterpart of the plugin account: key handling, session issuance, policy proofs,
//! signature envelope encoding and a mock ledger for tests and tooling.

pub mod encoder;
pub mod mock;
pub mod session;
pub mod signer;
pub mod types;


pub use encoder::encode_signature;
pub use mock::MockEnvironment;
pub use session::{issue_session, IssuedSession};
pub use signer::{build_invoke, DirectKeySigner, EcdsaKeyPair, PluginSigner, SessionKeySigner, SignerError};
