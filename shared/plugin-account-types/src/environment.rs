use thiserror::Error;

use crate::{calls::Call, felt::Felt};

/// Errors raised by the execution environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentError {
    /// Used by mocks or partially implemented environments.
    #[error("not implemented")]
    NotImplemented,
    #[error("no contract at {0:#x}")]
    ContractNotFound(Felt),
    #[error("contract {contract:#x} has no entry point {selector:#x}")]
    EntryPointNotFound { contract: Felt, selector: Felt },
    #[error("reverted: {0}")]
    Reverted(String),
}

/// The ledger the account runs inside of.
///
/// The account only reads the block context and forwards non-self calls; everything else
/// (storage of other contracts, transaction ordering) belongs to the implementation.
pub trait Environment {
    fn block_timestamp(&self) -> u64;

    fn chain_id(&self) -> Felt;

    /// Run `call` with `caller` as the sender and return its result felts.
    fn call_contract(&mut self, _caller: Felt, _call: &Call) -> Result<Vec<Felt>, EnvironmentError> {
        Err(EnvironmentError::NotImplemented)
    }

    /// Mark a point that `revert` can roll external state back to.
    fn snapshot(&mut self) -> usize {
        0
    }

    /// Undo every call made since `snapshot` returned `id`.
    fn revert(&mut self, _id: usize) {}

    /// Keep the calls made since `snapshot` returned `id`.
    fn commit(&mut self, _id: usize) {}
}
