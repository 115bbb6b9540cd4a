//! Keys and plugin signers.

use k256::ecdsa::SigningKey;
use log::debug;
use plugin_account_types::{
    encode_execute_calldata, public_key_felt, AccountError, Call, EcdsaSignature, Felt, InvokeTransaction,
    SessionPayload, SignatureEnvelope, SignaturePayload, TRANSACTION_VERSION,
};
use thiserror::Error;

use crate::{encoder::encode_signature, session::IssuedSession};

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("invalid secret key: {0}")]
    InvalidKey(k256::ecdsa::Error),
    #[error("signing failed: {0}")]
    Signing(k256::ecdsa::Error),
    #[error("call #{call} is not covered by the session policies")]
    PolicyNotInSession { call: usize },
    #[error("session bundle root {expected:#x} does not match its policies ({actual:#x})")]
    BundleRootMismatch { expected: Felt, actual: Felt },
    #[error(transparent)]
    Account(#[from] AccountError),
}

/// A secp256k1 key pair; the public key is carried as its felt.
#[derive(Clone, Debug)]
pub struct EcdsaKeyPair {
    signing_key: SigningKey,
}

impl EcdsaKeyPair {
    /// Key pair for a small scalar, handy for fixtures.
    pub fn from_secret(secret: u64) -> Result<Self, SignerError> {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&secret.to_be_bytes());
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignerError> {
        let signing_key = SigningKey::from_slice(bytes).map_err(SignerError::InvalidKey)?;
        Ok(Self { signing_key })
    }

    pub fn public_key(&self) -> Felt {
        public_key_felt(self.signing_key.verifying_key())
    }

    /// Sign a 32-byte felt hash directly (no further hashing).
    pub fn sign(&self, hash: Felt) -> Result<EcdsaSignature, SignerError> {
        let (signature, _) = self
            .signing_key
            .sign_prehash_recoverable(&hash.to_be_bytes::<32>())
            .map_err(SignerError::Signing)?;
        let (r, s) = signature.split_bytes();
        Ok(EcdsaSignature::new(Felt::from_be_slice(r.as_slice()), Felt::from_be_slice(s.as_slice())))
    }
}

/// Produces the signature envelope a plugin expects for a transaction.
pub trait PluginSigner {
    fn plugin_id(&self) -> Felt;

    fn sign_envelope(&self, transaction_hash: Felt, calls: &[Call]) -> Result<SignatureEnvelope, SignerError>;
}

/// Owner key signing through the direct-key plugin.
#[derive(Clone, Debug)]
pub struct DirectKeySigner {
    pub plugin_id: Felt,
    pub key: EcdsaKeyPair,
}

impl DirectKeySigner {
    pub fn new(plugin_id: Felt, key: EcdsaKeyPair) -> Self {
        Self { plugin_id, key }
    }
}

impl PluginSigner for DirectKeySigner {
    fn plugin_id(&self) -> Felt {
        self.plugin_id
    }

    fn sign_envelope(&self, transaction_hash: Felt, _calls: &[Call]) -> Result<SignatureEnvelope, SignerError> {
        Ok(SignatureEnvelope {
            plugin_id: self.plugin_id,
            payload: SignaturePayload::DirectKey(self.key.sign(transaction_hash)?),
        })
    }
}

/// Session key signing under an issued session.
#[derive(Clone, Debug)]
pub struct SessionKeySigner {
    pub plugin_id: Felt,
    pub session_key: EcdsaKeyPair,
    pub session: IssuedSession,
}

impl SessionKeySigner {
    pub fn new(plugin_id: Felt, session_key: EcdsaKeyPair, session: IssuedSession) -> Self {
        Self {
            plugin_id,
            session_key,
            session,
        }
    }
}

impl PluginSigner for SessionKeySigner {
    fn plugin_id(&self) -> Felt {
        self.plugin_id
    }

    fn sign_envelope(&self, transaction_hash: Felt, calls: &[Call]) -> Result<SignatureEnvelope, SignerError> {
        let proofs = calls
            .iter()
            .enumerate()
            .map(|(call, c)| self.session.proof_for(c).ok_or(SignerError::PolicyNotInSession { call }))
            .collect::<Result<Vec<_>, _>>()?;
        let token = &self.session.token;

        Ok(SignatureEnvelope {
            plugin_id: self.plugin_id,
            payload: SignaturePayload::Session(SessionPayload {
                session_key: token.session_key,
                expires_at: token.expires_at,
                signature: self.session_key.sign(transaction_hash)?,
                policy_root: token.policy_root,
                proof_len: self.session.tree.depth(),
                proofs,
                session_token: token.owner_signature,
            }),
        })
    }
}

/// Build and sign an invoke transaction for `calls`.
pub fn build_invoke<S: PluginSigner + ?Sized>(
    signer: &S,
    sender: Felt,
    calls: &[Call],
    nonce: Felt,
    max_fee: Felt,
    chain_id: Felt,
) -> Result<InvokeTransaction, SignerError> {
    let mut tx = InvokeTransaction {
        sender,
        calldata: encode_execute_calldata(calls)?,
        signature: Vec::new(),
        max_fee,
        nonce,
        version: TRANSACTION_VERSION,
    };
    let transaction_hash = tx.hash(chain_id);
    let envelope = signer.sign_envelope(transaction_hash, calls)?;
    tx.signature = encode_signature(&envelope);
    debug!(
        "signed tx {transaction_hash:#x} with plugin {:#x} ({} signature felts)",
        signer.plugin_id(),
        tx.signature.len()
    );
    Ok(tx)
}
