use alloy_primitives::U256;
use k256::ecdsa::VerifyingKey;

use crate::felt::{keccak256_bytes, Felt};

/// An ECDSA signature as two felts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EcdsaSignature {
    pub r: Felt,
    pub s: Felt,
}

impl EcdsaSignature {
    pub fn new(r: Felt, s: Felt) -> Self {
        Self { r, s }
    }

    pub fn to_felts(&self) -> [Felt; 2] {
        [self.r, self.s]
    }
}

/// The felt that identifies a public key on the wire: the low 160 bits of
/// `keccak(uncompressed point without the 0x04 tag)`.
pub fn public_key_felt(key: &VerifyingKey) -> Felt {
    let point = key.to_encoded_point(false);
    let hash = keccak256_bytes(&point.as_bytes()[1..]);
    U256::from_be_slice(&hash[12..32])
}
