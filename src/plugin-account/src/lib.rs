//! Plugin-based smart account.
//!
//! Transactions carry a signature envelope whose first felt names the validating plugin. The
//! built-in plugins are a direct owner-key signer and a session-key engine that authorizes calls
//! through an owner-signed token and a Merkle tree of `(contract, selector)` policies.

pub mod account;
pub mod constants;
pub mod decoder;
pub mod errors;
pub mod plugins;
pub mod utils;

pub use account::{AccountEvent, AccountState, ExecutionReceipt, PluginAccount};
pub use decoder::{decode_execute_calldata, decode_signature};
pub use errors::{AccountError, EnvironmentError, SignatureRole};
pub use plugins::PluginCatalog;
