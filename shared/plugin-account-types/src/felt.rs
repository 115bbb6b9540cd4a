//! Field-element helpers shared by the signer and the account.
//!
//! Every value on the wire is a [`Felt`]. Hash outputs and selectors are truncated to 250 bits so
//! they always fit the field the protocol was designed around.

use alloy_primitives::U256;
use sha3::{Digest, Keccak256};

/// A fixed-width field element.
pub type Felt = U256;

/// Mask applied to keccak outputs (`2^250 - 1`).
pub const MASK_250: Felt = U256::from_limbs([u64::MAX, u64::MAX, u64::MAX, u64::MAX >> 6]);

/// `short_string("invoke")`, the invoke transaction domain tag.
pub const INVOKE_PREFIX: Felt = U256::from_limbs([0x696e_766f_6b65, 0, 0, 0]);

/// `short_string("StarkNet Message")`, the typed-data message prefix.
pub const MESSAGE_PREFIX: Felt = U256::from_limbs([0x204d_6573_7361_6765, 0x5374_6172_6b4e_6574, 0, 0]);

/// `short_string("SN_GOERLI")`.
pub const CHAIN_ID_TESTNET: Felt = U256::from_limbs([0x4e5f_474f_4552_4c49, 0x53, 0, 0]);

/// `short_string("SN_MAIN")`.
pub const CHAIN_ID_MAINNET: Felt = U256::from_limbs([0x0053_4e5f_4d41_494e, 0, 0, 0]);

pub fn keccak256_bytes(bytes: &[u8]) -> [u8; 32] {
    let mut h = Keccak256::new();
    h.update(bytes);
    let out = h.finalize();
    let mut b = [0u8; 32];
    b.copy_from_slice(out.as_slice());
    b
}

/// Keccak-256 truncated to 250 bits.
pub fn truncated_keccak(bytes: &[u8]) -> Felt {
    U256::from_be_bytes(keccak256_bytes(bytes)) & MASK_250
}

/// Entry point selector for a method name.
pub fn selector_from_name(name: &str) -> Felt {
    truncated_keccak(name.as_bytes())
}

/// Two-to-one compression used by every hash in the protocol.
pub fn hash_pair(a: Felt, b: Felt) -> Felt {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(&a.to_be_bytes::<32>());
    buf[32..].copy_from_slice(&b.to_be_bytes::<32>());
    truncated_keccak(&buf)
}

/// Chain `hash_pair` over `elements` starting from zero, then bind the element count.
pub fn hash_on_elements(elements: &[Felt]) -> Felt {
    let acc = elements
        .iter()
        .fold(Felt::ZERO, |acc, element| hash_pair(acc, *element));
    hash_pair(acc, Felt::from(elements.len()))
}

/// Encode up to 31 ASCII bytes as a big-endian felt.
pub fn short_string(text: &str) -> Option<Felt> {
    if text.len() > 31 || !text.is_ascii() {
        return None;
    }
    Some(U256::from_be_slice(text.as_bytes()))
}
