//! Signature envelope types.
//!
//! The first felt of every transaction signature names the plugin that validates it; the rest
//! is that plugin's payload. Layout:
//!
//! - `[0]` plugin id
//! - direct key: `r, s` (3 felts in total)
//! - session key:
//!   - `session_key, expires_at, sig_r, sig_s, policy_root`
//!   - `proof_len` (declared tree depth), `calls_len`
//!   - `proof_len_i` for each call, then `position_i` for each call
//!   - all proof elements, in call order
//!   - `token_len` (always 2), `token_r, token_s`
//!
//! `sig_*` is the session key over the transaction hash; the token is the owner over the session
//! hash. The account decodes; the signer toolkit encodes.

use crate::{
    felt::Felt,
    keys::EcdsaSignature,
    session::{Session, SessionDomain},
};

pub const DIRECT_KEY_SIGNATURE_LEN: usize = 3;

/// `session_key, expires_at, sig_r, sig_s, policy_root, proof_len, calls_len`.
pub const SESSION_HEADER_LEN: usize = 7;

pub const SESSION_TOKEN_LEN: usize = 2;

/// How a registered plugin interprets its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PluginKind {
    /// Owner key signs the transaction hash directly.
    StarkSigner,
    /// A session key signs under an owner-issued token.
    SessionKey,
}

/// Inclusion proof of one call's policy leaf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallProof {
    pub position: u64,
    pub siblings: Vec<Felt>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionPayload {
    pub session_key: Felt,
    pub expires_at: u64,
    /// Session key over the transaction hash.
    pub signature: EcdsaSignature,
    pub policy_root: Felt,
    /// Declared tree depth; every proof must have exactly this many siblings.
    pub proof_len: usize,
    /// One per call, in call order.
    pub proofs: Vec<CallProof>,
    /// Owner over the session hash.
    pub session_token: EcdsaSignature,
}

impl SessionPayload {
    /// The owner-signed token this payload carries, bound to `domain`.
    pub fn session(&self, domain: &SessionDomain) -> Session {
        Session::new(domain, self.session_key, self.expires_at, self.policy_root, self.session_token)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignaturePayload {
    DirectKey(EcdsaSignature),
    Session(SessionPayload),
}

impl SignaturePayload {
    pub fn kind(&self) -> PluginKind {
        match self {
            SignaturePayload::DirectKey(_) => PluginKind::StarkSigner,
            SignaturePayload::Session(_) => PluginKind::SessionKey,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureEnvelope {
    pub plugin_id: Felt,
    pub payload: SignaturePayload,
}
