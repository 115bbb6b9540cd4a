//! Session-key plugin.
//!
//! A session is an owner-signed token `(session_key, expires_at, policy_root)`. A transaction
//! signed by the session key is valid when every call is a leaf of the policy tree, the token
//! verifies against the current owner key, the session is live and not revoked, and the session
//! key signed the transaction hash. Checks run in that order and the first failure wins.

use log::debug;
use plugin_account_types::{
    merkle::{policy_leaf, MAX_TREE_DEPTH},
    verify_proof, Call, Felt, MerkleError, SessionDomain, SessionPayload, SessionStatus,
};

use crate::{
    errors::{AccountError, SignatureRole},
    utils::crypto::verify_signature,
};

/// Everything the engine reads from the account and the environment.
#[derive(Clone, Copy)]
pub struct SessionContext<'a> {
    pub account: Felt,
    pub chain_id: Felt,
    pub owner_key: Felt,
    pub now: u64,
    pub transaction_hash: Felt,
    pub is_revoked: &'a dyn Fn(Felt) -> bool,
}

/// Authorize `calls` under `payload`; returns the session hash on success.
pub fn validate(ctx: &SessionContext<'_>, calls: &[Call], payload: &SessionPayload) -> Result<Felt, AccountError> {
    if payload.proofs.len() != calls.len() {
        return Err(AccountError::EnvelopeLength {
            field: "calls_len",
            expected: calls.len(),
            actual: payload.proofs.len(),
        });
    }

    check_policies(calls, payload)?;

    let session = payload.session(&SessionDomain::new(ctx.chain_id, ctx.account));
    let session_hash = session.session_hash;

    if !verify_signature(session_hash, &session.owner_signature, ctx.owner_key) {
        return Err(AccountError::BadSignature(SignatureRole::SessionToken));
    }

    match session.status(ctx.now, (ctx.is_revoked)(session_hash)) {
        SessionStatus::Expired => {
            return Err(AccountError::SessionExpired {
                expires_at: session.expires_at,
                now: ctx.now,
            })
        }
        SessionStatus::Revoked => return Err(AccountError::SessionRevoked(session_hash)),
        SessionStatus::Active => {}
    }

    if !verify_signature(ctx.transaction_hash, &payload.signature, session.session_key) {
        return Err(AccountError::BadSignature(SignatureRole::SessionKey));
    }

    debug!(
        "session {session_hash:#x} authorized {} call(s) for tx {:#x}",
        calls.len(),
        ctx.transaction_hash
    );
    Ok(session_hash)
}

/// Every call must prove `(to, selector)` against the token's root at the declared depth.
fn check_policies(calls: &[Call], payload: &SessionPayload) -> Result<(), AccountError> {
    let depth = payload.proof_len;
    for (index, (call, proof)) in calls.iter().zip(&payload.proofs).enumerate() {
        if proof.siblings.len() != depth {
            return Err(AccountError::ProofLengthMismatch {
                call: index,
                expected: depth,
                actual: proof.siblings.len(),
            });
        }
        if depth == 0 || depth > MAX_TREE_DEPTH {
            return Err(AccountError::PolicyNotAuthorized { call: index });
        }

        let leaf = policy_leaf(call.to, call.selector);
        verify_proof(payload.policy_root, leaf, &proof.siblings, proof.position, depth).map_err(|err| {
            debug!("call #{index} failed policy check: {err}");
            match err {
                MerkleError::LengthMismatch { expected, actual } => AccountError::ProofLengthMismatch {
                    call: index,
                    expected,
                    actual,
                },
                MerkleError::InvalidDepth(_) | MerkleError::PositionOutOfRange { .. } | MerkleError::RootMismatch => {
                    AccountError::PolicyNotAuthorized { call: index }
                },
            }
        })?;
    }
    Ok(())
}
