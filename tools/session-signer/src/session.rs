//! Session issuance on the owner side.

use log::info;
use plugin_account_types::{Call, CallProof, EcdsaSignature, Felt, Policy, PolicyTree, Session, SessionDomain};

use crate::{
    signer::{SignerError, EcdsaKeyPair},
    types::{PolicyProof, SessionBundle},
};

/// An owner-signed session together with the tree its root commits to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedSession {
    pub token: Session,
    pub tree: PolicyTree,
    /// Policies in leaf order.
    pub policies: Vec<Policy>,
}

impl IssuedSession {
    /// Proof for the policy matching `call.to` and `call.selector`.
    pub fn proof_for(&self, call: &Call) -> Option<CallProof> {
        let position = self.tree.position_of(&Policy::new(call.to, call.selector))?;
        self.proof_at(position)
    }

    pub fn proof_at(&self, position: usize) -> Option<CallProof> {
        let siblings = self.tree.proof(position)?;
        Some(CallProof {
            position: u64::try_from(position).ok()?,
            siblings,
        })
    }

    /// Portable form handed to the session key holder.
    pub fn to_bundle(&self, domain: &SessionDomain) -> SessionBundle {
        let policies = self
            .policies
            .iter()
            .enumerate()
            .filter_map(|(position, policy)| {
                let proof = self.proof_at(position)?;
                Some(PolicyProof {
                    contract_address: policy.contract_address,
                    selector: policy.selector,
                    position: proof.position,
                    proof: proof.siblings,
                })
            })
            .collect();

        SessionBundle {
            account: domain.account,
            chain_id: domain.chain_id,
            session_key: self.token.session_key,
            expires_at: self.token.expires_at,
            policy_root: self.token.policy_root,
            session_hash: self.token.session_hash,
            token: [self.token.owner_signature.r, self.token.owner_signature.s],
            proof_len: self.tree.depth(),
            policies,
        }
    }

    /// Rebuild a session from a bundle, checking the policies still hash to its root.
    pub fn from_bundle(bundle: &SessionBundle) -> Result<Self, SignerError> {
        let mut ordered = bundle.policies.clone();
        ordered.sort_by_key(|p| p.position);
        let policies: Vec<Policy> = ordered
            .iter()
            .map(|p| Policy::new(p.contract_address, p.selector))
            .collect();
        let tree = PolicyTree::new(&policies)?;
        if tree.root() != bundle.policy_root {
            return Err(SignerError::BundleRootMismatch {
                expected: bundle.policy_root,
                actual: tree.root(),
            });
        }

        let domain = SessionDomain::new(bundle.chain_id, bundle.account);
        let token = Session::new(
            &domain,
            bundle.session_key,
            bundle.expires_at,
            bundle.policy_root,
            EcdsaSignature::new(bundle.token[0], bundle.token[1]),
        );
        Ok(Self { token, tree, policies })
    }
}

/// Build the policy tree and sign the session hash with the owner key.
pub fn issue_session(
    owner: &EcdsaKeyPair,
    domain: &SessionDomain,
    session_key: Felt,
    expires_at: u64,
    policies: Vec<Policy>,
) -> Result<IssuedSession, SignerError> {
    let tree = PolicyTree::new(&policies)?;
    let unsigned = Session::new(
        domain,
        session_key,
        expires_at,
        tree.root(),
        EcdsaSignature::default(),
    );
    let owner_signature = owner.sign(unsigned.session_hash)?;
    let token = Session {
        owner_signature,
        ..unsigned
    };
    info!(
        "issued session {:#x} for key {session_key:#x} over {} policies (depth {}), expires at {expires_at}",
        token.session_hash,
        policies.len(),
        tree.depth()
    );
    Ok(IssuedSession { token, tree, policies })
}
