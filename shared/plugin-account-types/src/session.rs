//! Session tokens.
//!
//! The owner signs `session_hash` once; the triple `(session_key, expires_at, policy_root)` and
//! that signature are then replayed with every session transaction. The hash is a typed-data
//! message bound to the chain and the account, and does not include the owner signature, so the
//! same parameters always map to the same revocation key.

use crate::{
    felt::{hash_on_elements, selector_from_name, Felt, MESSAGE_PREFIX},
    keys::EcdsaSignature,
};

pub const DOMAIN_TYPE: &str = "StarkNetDomain(chainId:felt)";
pub const SESSION_TYPE: &str = "Session(key:felt,expires:felt,root:merkletree)";

pub fn domain_type_hash() -> Felt {
    selector_from_name(DOMAIN_TYPE)
}

pub fn session_type_hash() -> Felt {
    selector_from_name(SESSION_TYPE)
}

/// Where a session is valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionDomain {
    pub chain_id: Felt,
    pub account: Felt,
}

impl SessionDomain {
    pub fn new(chain_id: Felt, account: Felt) -> Self {
        Self { chain_id, account }
    }

    pub fn domain_hash(&self) -> Felt {
        hash_on_elements(&[domain_type_hash(), self.chain_id])
    }
}

/// Message hash the owner signs to issue a session.
pub fn session_hash(domain: &SessionDomain, session_key: Felt, expires_at: u64, policy_root: Felt) -> Felt {
    let message_hash = hash_on_elements(&[
        session_type_hash(),
        session_key,
        Felt::from(expires_at),
        policy_root,
    ]);
    hash_on_elements(&[MESSAGE_PREFIX, domain.domain_hash(), domain.account, message_hash])
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Expired,
    Revoked,
}

/// An issued session token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Session {
    pub session_key: Felt,
    pub expires_at: u64,
    pub policy_root: Felt,
    pub session_hash: Felt,
    pub owner_signature: EcdsaSignature,
}

impl Session {
    pub fn new(
        domain: &SessionDomain,
        session_key: Felt,
        expires_at: u64,
        policy_root: Felt,
        owner_signature: EcdsaSignature,
    ) -> Self {
        Self {
            session_key,
            expires_at,
            policy_root,
            session_hash: session_hash(domain, session_key, expires_at, policy_root),
            owner_signature,
        }
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    /// Expiry is reported ahead of revocation.
    pub fn status(&self, now: u64, revoked: bool) -> SessionStatus {
        if self.is_expired(now) {
            SessionStatus::Expired
        } else if revoked {
            SessionStatus::Revoked
        } else {
            SessionStatus::Active
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::felt::CHAIN_ID_TESTNET;

    fn domain() -> SessionDomain {
        SessionDomain::new(CHAIN_ID_TESTNET, Felt::from(0xacc0u64))
    }

    #[test]
    fn hash_ignores_owner_signature() {
        let a = Session::new(&domain(), Felt::from(1u64), 100, Felt::from(2u64), EcdsaSignature::new(Felt::from(3u64), Felt::from(4u64)));
        let b = Session::new(&domain(), Felt::from(1u64), 100, Felt::from(2u64), EcdsaSignature::new(Felt::from(5u64), Felt::from(6u64)));
        assert_eq!(a.session_hash, b.session_hash);
    }

    #[test]
    fn hash_is_domain_separated() {
        let h = session_hash(&domain(), Felt::from(1u64), 100, Felt::from(2u64));
        let other_account = SessionDomain::new(CHAIN_ID_TESTNET, Felt::from(0xacc1u64));
        let other_chain = SessionDomain::new(Felt::from(1u64), Felt::from(0xacc0u64));
        assert_ne!(h, session_hash(&other_account, Felt::from(1u64), 100, Felt::from(2u64)));
        assert_ne!(h, session_hash(&other_chain, Felt::from(1u64), 100, Felt::from(2u64)));
        assert_ne!(h, session_hash(&domain(), Felt::from(1u64), 101, Felt::from(2u64)));
        assert_ne!(h, session_hash(&domain(), Felt::from(1u64), 100, Felt::from(3u64)));
    }

    #[test]
    fn status_transitions() {
        let session = Session::new(&domain(), Felt::from(1u64), 100, Felt::from(2u64), EcdsaSignature::new(Felt::ZERO, Felt::ZERO));
        assert_eq!(session.status(99, false), SessionStatus::Active);
        assert_eq!(session.status(100, false), SessionStatus::Expired);
        assert_eq!(session.status(50, true), SessionStatus::Revoked);
        assert_eq!(session.status(100, true), SessionStatus::Expired);
    }
}
