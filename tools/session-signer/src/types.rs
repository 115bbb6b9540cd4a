//! JSON shapes exchanged with the command line and dapps.
//!
//! Felts serialize as `0x`-prefixed hex strings.

use plugin_account_types::Felt;
use serde::{Deserialize, Serialize};

/// A policy given by contract and selector name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub contract_address: Felt,
    pub selector: String,
}

/// What the owner wants to delegate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    pub account: Felt,
    /// Chain id as a short string, e.g. `SN_GOERLI`.
    pub chain_id: String,
    pub session_key: Felt,
    pub expires_at: u64,
    pub policies: Vec<PolicyConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyProof {
    pub contract_address: Felt,
    pub selector: Felt,
    pub position: u64,
    pub proof: Vec<Felt>,
}

/// An issued session: token, root and one proof per policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBundle {
    pub account: Felt,
    pub chain_id: Felt,
    pub session_key: Felt,
    pub expires_at: u64,
    pub policy_root: Felt,
    pub session_hash: Felt,
    /// Owner signature `(r, s)` over `session_hash`.
    pub token: [Felt; 2],
    pub proof_len: usize,
    pub policies: Vec<PolicyProof>,
}

/// A call given by target and selector name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallConfig {
    pub to: Felt,
    pub selector: String,
    #[serde(default)]
    pub calldata: Vec<Felt>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction_hash: Felt,
    pub sender: Felt,
    pub calldata: Vec<Felt>,
    pub signature: Vec<Felt>,
    pub max_fee: Felt,
    pub nonce: Felt,
    pub version: u8,
}
