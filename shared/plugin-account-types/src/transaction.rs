//! Invoke transaction hashing.
//!
//! The hash covers, in order: the invoke domain tag, version, sender, a zero entry-point
//! sentinel (the account is always entered through `__execute__`), the hash of the full
//! execute calldata, max fee, chain id and the nonce. The signature envelope is never hashed,
//! so plugins can change their payload shape without touching this scheme.

use crate::felt::{hash_on_elements, Felt, INVOKE_PREFIX};

pub const TRANSACTION_VERSION: u8 = 1;

/// Entry point selector committed by the hash; the account dispatches internally.
pub const ENTRY_POINT_SENTINEL: Felt = Felt::ZERO;

/// Account and chain context bound into the transaction hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionContext {
    pub sender: Felt,
    pub max_fee: Felt,
    pub chain_id: Felt,
    pub nonce: Felt,
    pub version: u8,
}

/// A signed invoke transaction as submitted to the account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvokeTransaction {
    pub sender: Felt,
    /// Outer `__execute__` calldata (see [`crate::calls::execute_calldata`]).
    pub calldata: Vec<Felt>,
    pub signature: Vec<Felt>,
    pub max_fee: Felt,
    pub nonce: Felt,
    pub version: u8,
}

impl InvokeTransaction {
    pub fn context(&self, chain_id: Felt) -> TransactionContext {
        TransactionContext {
            sender: self.sender,
            max_fee: self.max_fee,
            chain_id,
            nonce: self.nonce,
            version: self.version,
        }
    }

    pub fn hash(&self, chain_id: Felt) -> Felt {
        transaction_hash(&self.context(chain_id), &self.calldata)
    }
}

/// Compute the invoke transaction hash over `execute_calldata`.
pub fn transaction_hash(ctx: &TransactionContext, execute_calldata: &[Felt]) -> Felt {
    hash_on_elements(&[
        INVOKE_PREFIX,
        Felt::from(ctx.version),
        ctx.sender,
        ENTRY_POINT_SENTINEL,
        hash_on_elements(execute_calldata),
        ctx.max_fee,
        ctx.chain_id,
        ctx.nonce,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::felt::CHAIN_ID_TESTNET;

    fn ctx() -> TransactionContext {
        TransactionContext {
            sender: Felt::from(0xacc0u64),
            max_fee: Felt::ZERO,
            chain_id: CHAIN_ID_TESTNET,
            nonce: Felt::from(3u64),
            version: TRANSACTION_VERSION,
        }
    }

    #[test]
    fn every_context_field_is_bound() {
        let calldata = vec![Felt::from(1u64), Felt::from(2u64)];
        let base = transaction_hash(&ctx(), &calldata);

        let mut other = ctx();
        other.nonce = Felt::from(4u64);
        assert_ne!(transaction_hash(&other, &calldata), base);

        let mut other = ctx();
        other.max_fee = Felt::from(1u64);
        assert_ne!(transaction_hash(&other, &calldata), base);

        let mut other = ctx();
        other.chain_id = Felt::from(1u64);
        assert_ne!(transaction_hash(&other, &calldata), base);

        let mut other = ctx();
        other.sender = Felt::from(0xacc1u64);
        assert_ne!(transaction_hash(&other, &calldata), base);

        assert_ne!(transaction_hash(&ctx(), &calldata[..1]), base);
    }

    #[test]
    fn hash_is_deterministic_and_ignores_signature() {
        let tx = InvokeTransaction {
            sender: Felt::from(0xacc0u64),
            calldata: vec![Felt::from(9u64)],
            signature: vec![Felt::from(1u64)],
            max_fee: Felt::ZERO,
            nonce: Felt::from(3u64),
            version: TRANSACTION_VERSION,
        };
        let mut resigned = tx.clone();
        resigned.signature = vec![Felt::from(2u64), Felt::from(3u64)];
        assert_eq!(tx.hash(CHAIN_ID_TESTNET), resigned.hash(CHAIN_ID_TESTNET));
        assert_eq!(
            tx.hash(CHAIN_ID_TESTNET),
            transaction_hash(&tx.context(CHAIN_ID_TESTNET), &tx.calldata)
        );
    }
}
