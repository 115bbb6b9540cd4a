//! Signature verification.
//!
//! Keys are identified by their felt (see [`public_key_felt`]), so verification recovers the
//! signing key from `(hash, r, s)` and compares felts. The recovery id is not on the wire; both
//! candidates are tried.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use plugin_account_types::{public_key_felt, EcdsaSignature, Felt};

pub fn verify_signature(hash: Felt, signature: &EcdsaSignature, public_key: Felt) -> bool {
    if public_key == Felt::ZERO {
        return false;
    }

    let mut bytes = [0u8; 64];
    bytes[..32].copy_from_slice(&signature.r.to_be_bytes::<32>());
    bytes[32..].copy_from_slice(&signature.s.to_be_bytes::<32>());
    let Ok(sig) = Signature::from_slice(&bytes) else {
        return false;
    };
    let prehash = hash.to_be_bytes::<32>();

    for v in 0u8..=1 {
        let Some(recovery_id) = RecoveryId::from_byte(v) else {
            continue;
        };
        if let Ok(key) = VerifyingKey::recover_from_prehash(&prehash, &sig, recovery_id) {
            if public_key_felt(&key) == public_key {
                return true;
            }
        }
    }
    false
}
