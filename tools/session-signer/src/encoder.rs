use plugin_account_types::{envelope::SESSION_TOKEN_LEN, Felt, SessionPayload, SignatureEnvelope, SignaturePayload};

/// Serialize a signature envelope into transaction signature felts.
///
/// Inverse of the account's `decode_signature`.
pub fn encode_signature(envelope: &SignatureEnvelope) -> Vec<Felt> {
    let mut buf = vec![envelope.plugin_id];
    match &envelope.payload {
        SignaturePayload::DirectKey(signature) => buf.extend(signature.to_felts()),
        SignaturePayload::Session(payload) => encode_session(&mut buf, payload),
    }
    buf
}

fn encode_session(buf: &mut Vec<Felt>, payload: &SessionPayload) {
    buf.push(payload.session_key);
    buf.push(Felt::from(payload.expires_at));
    buf.extend(payload.signature.to_felts());
    buf.push(payload.policy_root);
    buf.push(Felt::from(payload.proof_len));
    buf.push(Felt::from(payload.proofs.len()));

    // per-call proof lengths, then positions, then the concatenated siblings
    buf.extend(payload.proofs.iter().map(|proof| Felt::from(proof.siblings.len())));
    buf.extend(payload.proofs.iter().map(|proof| Felt::from(proof.position)));
    for proof in &payload.proofs {
        buf.extend_from_slice(&proof.siblings);
    }

    buf.push(Felt::from(SESSION_TOKEN_LEN));
    buf.extend(payload.session_token.to_felts());
}
