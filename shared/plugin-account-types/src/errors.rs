use core::fmt;

use thiserror::Error;

use crate::{environment::EnvironmentError, felt::Felt};

/// Which signature failed cryptographic verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureRole {
    /// Owner key over the transaction hash (direct-key plugin).
    Owner,
    /// Owner key over the session hash (the session token).
    SessionToken,
    /// Session key over the transaction hash.
    SessionKey,
}

impl fmt::Display for SignatureRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignatureRole::Owner => "owner",
            SignatureRole::SessionToken => "session token",
            SignatureRole::SessionKey => "session key",
        };
        f.write_str(name)
    }
}

/// Every way a transaction can be rejected by the account.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("malformed call #{index}: {reason}")]
    MalformedCall { index: usize, reason: &'static str },

    #[error("signature length error at `{field}`: expected {expected}, got {actual}")]
    EnvelopeLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("signature field `{field}` is out of range")]
    MalformedEnvelope { field: &'static str },

    #[error("plugin {0:#x} is not registered")]
    UnknownPlugin(Felt),

    #[error("call #{call}: proof has {actual} elements, tree depth is {expected}")]
    ProofLengthMismatch {
        call: usize,
        expected: usize,
        actual: usize,
    },

    #[error("call #{call} is not allowed by policy")]
    PolicyNotAuthorized { call: usize },

    #[error("session expired at {expires_at} (now {now})")]
    SessionExpired { expires_at: u64, now: u64 },

    #[error("session {0:#x} revoked")]
    SessionRevoked(Felt),

    #[error("invalid {0} signature")]
    BadSignature(SignatureRole),

    #[error("caller {caller:#x} is not the account")]
    Unauthorized { caller: Felt },

    #[error("invalid nonce: expected {expected}, got {actual}")]
    InvalidNonce { expected: Felt, actual: Felt },

    #[error("transaction sender {actual:#x} is not this account ({expected:#x})")]
    WrongSender { expected: Felt, actual: Felt },

    #[error("policy set is empty")]
    EmptyPolicySet,

    #[error("account already initialized")]
    AlreadyInitialized,

    #[error("account not initialized")]
    NotInitialized,

    #[error("plugin {0:#x} is the default plugin")]
    DefaultPluginRemoval(Felt),

    #[error("unknown selector {0:#x}")]
    UnknownSelector(Felt),

    #[error("call #{call} failed: {reason}")]
    CallFailed { call: usize, reason: EnvironmentError },
}
