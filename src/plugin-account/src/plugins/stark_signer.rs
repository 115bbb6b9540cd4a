//! Direct-key plugin: the owner key signs the transaction hash.

use log::debug;
use plugin_account_types::{EcdsaSignature, Felt};

use crate::{
    errors::{AccountError, SignatureRole},
    utils::crypto::verify_signature,
};

pub fn validate(owner_key: Felt, transaction_hash: Felt, signature: &EcdsaSignature) -> Result<(), AccountError> {
    if !verify_signature(transaction_hash, signature, owner_key) {
        debug!("owner signature rejected for tx {transaction_hash:#x}");
        return Err(AccountError::BadSignature(SignatureRole::Owner));
    }
    Ok(())
}

/// Install calldata is either empty or the single owner key.
pub fn parse_init(calldata: &[Felt]) -> Result<Option<Felt>, AccountError> {
    match calldata {
        [] => Ok(None),
        [key] if *key != Felt::ZERO => Ok(Some(*key)),
        [_] => Err(AccountError::MalformedCall { index: 0, reason: "zero owner key" }),
        _ => Err(AccountError::MalformedCall { index: 0, reason: "unexpected plugin calldata" }),
    }
}
