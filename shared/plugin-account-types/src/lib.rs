//! Types shared by the plugin account and its off-chain signer: felt hashing, call encoding,
//! transaction hashing, the policy Merkle tree, session tokens and the signature envelope.

pub mod calls;
pub mod envelope;
pub mod environment;
pub mod errors;
pub mod felt;
pub mod keys;
pub mod merkle;
pub mod session;
pub mod transaction;

pub use calls::{decode_calls, encode_calls, encode_execute_calldata, execute_calldata, Call, CallArrayEntry};
pub use envelope::{CallProof, PluginKind, SessionPayload, SignatureEnvelope, SignaturePayload};
pub use environment::{Environment, EnvironmentError};
pub use errors::{AccountError, SignatureRole};
pub use felt::{hash_on_elements, hash_pair, selector_from_name, short_string, Felt};
pub use keys::{public_key_felt, EcdsaSignature};
pub use merkle::{verify_proof, MerkleError, Policy, PolicyTree};
pub use session::{session_hash, Session, SessionDomain, SessionStatus};
pub use transaction::{transaction_hash, InvokeTransaction, TransactionContext, TRANSACTION_VERSION};
