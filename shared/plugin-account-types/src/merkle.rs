//! Binary Merkle tree over session policies.
//!
//! Leaves are `hash_on_elements([POLICY_TYPE_HASH, contract, selector])`. Each level hashes
//! adjacent nodes left to right; a trailing odd node is paired with itself. The tree always has
//! at least one pairing level, so a single policy yields `root = hash_pair(leaf, leaf)` and a
//! one-element proof.

use thiserror::Error;

use crate::{
    errors::AccountError,
    felt::{hash_on_elements, hash_pair, selector_from_name, Felt},
};

pub const POLICY_TYPE: &str = "Policy(contractAddress:felt,selector:selector)";

/// Deepest tree a proof may claim (2^32 policies).
pub const MAX_TREE_DEPTH: usize = 32;

pub fn policy_type_hash() -> Felt {
    selector_from_name(POLICY_TYPE)
}

/// An authorised `(contract, selector)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Policy {
    pub contract_address: Felt,
    pub selector: Felt,
}

impl Policy {
    pub fn new(contract_address: Felt, selector: Felt) -> Self {
        Self { contract_address, selector }
    }

    pub fn leaf(&self) -> Felt {
        policy_leaf(self.contract_address, self.selector)
    }
}

pub fn policy_leaf(contract_address: Felt, selector: Felt) -> Felt {
    hash_on_elements(&[policy_type_hash(), contract_address, selector])
}

/// Merkle verification failures.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MerkleError {
    #[error("proof has {actual} elements, tree depth is {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("unsupported tree depth {0}")]
    InvalidDepth(usize),
    #[error("position {position} does not fit a tree of depth {depth}")]
    PositionOutOfRange { position: u64, depth: usize },
    #[error("computed root does not match")]
    RootMismatch,
}

/// Depth of the tree built over `leaf_count` leaves.
pub fn tree_depth(leaf_count: usize) -> usize {
    let mut depth = 1;
    while (1usize << depth) < leaf_count {
        depth += 1;
    }
    depth
}

/// A fully materialised policy tree; `levels[0]` are the leaves, the last level is the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyTree {
    levels: Vec<Vec<Felt>>,
}

impl PolicyTree {
    pub fn new(policies: &[Policy]) -> Result<Self, AccountError> {
        Self::from_leaves(policies.iter().map(Policy::leaf).collect())
    }

    pub fn from_leaves(leaves: Vec<Felt>) -> Result<Self, AccountError> {
        if leaves.is_empty() {
            return Err(AccountError::EmptyPolicySet);
        }
        let mut levels = vec![leaves];
        loop {
            let next = next_level(&levels[levels.len() - 1]);
            let done = next.len() == 1;
            levels.push(next);
            if done {
                break;
            }
        }
        Ok(Self { levels })
    }

    pub fn root(&self) -> Felt {
        self.levels[self.levels.len() - 1][0]
    }

    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn len(&self) -> usize {
        self.levels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    pub fn leaves(&self) -> &[Felt] {
        &self.levels[0]
    }

    pub fn position_of(&self, policy: &Policy) -> Option<usize> {
        let leaf = policy.leaf();
        self.levels[0].iter().position(|l| *l == leaf)
    }

    /// Sibling path for the leaf at `position`, bottom to top.
    pub fn proof(&self, position: usize) -> Option<Vec<Felt>> {
        if position >= self.len() {
            return None;
        }
        let mut index = position;
        let mut proof = Vec::with_capacity(self.depth());
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = if index % 2 == 0 {
                // Self-padding: a lone trailing node is its own sibling.
                *level.get(index + 1).unwrap_or(&level[index])
            } else {
                level[index - 1]
            };
            proof.push(sibling);
            index /= 2;
        }
        Some(proof)
    }

    pub fn verify(&self, leaf: Felt, proof: &[Felt], position: u64) -> Result<(), MerkleError> {
        verify_proof(self.root(), leaf, proof, position, self.depth())
    }
}

fn next_level(level: &[Felt]) -> Vec<Felt> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => hash_pair(*left, *right),
            [lone] => hash_pair(*lone, *lone),
            _ => unreachable!("chunks(2) yields one or two nodes"),
        })
        .collect()
}

/// Recompute the root from `leaf` and `proof` and compare with `root`.
///
/// Bit `k` of `position` says whether the running node is the right child at level `k`.
pub fn verify_proof(
    root: Felt,
    leaf: Felt,
    proof: &[Felt],
    position: u64,
    depth: usize,
) -> Result<(), MerkleError> {
    if depth == 0 || depth > MAX_TREE_DEPTH {
        return Err(MerkleError::InvalidDepth(depth));
    }
    if proof.len() != depth {
        return Err(MerkleError::LengthMismatch { expected: depth, actual: proof.len() });
    }
    if position >> depth != 0 {
        return Err(MerkleError::PositionOutOfRange { position, depth });
    }

    let mut node = leaf;
    for (level, sibling) in proof.iter().enumerate() {
        node = if (position >> level) & 1 == 0 {
            hash_pair(node, *sibling)
        } else {
            hash_pair(*sibling, node)
        };
    }

    if node == root {
        Ok(())
    } else {
        Err(MerkleError::RootMismatch)
    }
}
