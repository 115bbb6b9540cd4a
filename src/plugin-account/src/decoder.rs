//! Decoders for the two felt buffers a transaction carries: the signature envelope and the outer
//! `__execute__` calldata.

use plugin_account_types::{
    calls::CALL_ARRAY_ENTRY_LEN,
    envelope::SESSION_TOKEN_LEN,
    decode_calls, Call, CallArrayEntry, CallProof, EcdsaSignature, Felt, PluginKind, SessionPayload,
    SignatureEnvelope, SignaturePayload,
};

use crate::{errors::AccountError, utils::felts};

/// Decode a transaction signature.
///
/// `kind_of` resolves the leading plugin id against the plugins installed on the account. The
/// whole buffer must be consumed.
pub fn decode_signature<F>(signature: &[Felt], kind_of: F) -> Result<SignatureEnvelope, AccountError>
where
    F: Fn(Felt) -> Option<PluginKind>,
{
    let mut i = 0usize;
    let plugin_id = read_felt(signature, &mut i, "plugin_id")?;
    let kind = kind_of(plugin_id).ok_or(AccountError::UnknownPlugin(plugin_id))?;

    let payload = match kind {
        PluginKind::StarkSigner => SignaturePayload::DirectKey(read_signature(signature, &mut i, "signature")?),
        PluginKind::SessionKey => SignaturePayload::Session(read_session_payload(signature, &mut i)?),
    };

    if i != signature.len() {
        return Err(AccountError::EnvelopeLength {
            field: "signature",
            expected: i,
            actual: signature.len(),
        });
    }

    Ok(SignatureEnvelope { plugin_id, payload })
}

fn read_session_payload(sig: &[Felt], i: &mut usize) -> Result<SessionPayload, AccountError> {
    let session_key = read_felt(sig, i, "session_key")?;
    let expires_at = read_u64(sig, i, "expires_at")?;
    let signature = read_signature(sig, i, "session_signature")?;
    let policy_root = read_felt(sig, i, "policy_root")?;
    let proof_len = read_len(sig, i, "proof_len")?;
    let calls_len = read_len(sig, i, "calls_len")?;

    // Lengths and positions must be present before anything is allocated for them.
    require_remaining(sig, *i, calls_len.saturating_mul(2), "proof_table")?;

    let mut lens = Vec::with_capacity(calls_len);
    for _ in 0..calls_len {
        lens.push(read_len(sig, i, "proof_len_i")?);
    }
    let mut positions = Vec::with_capacity(calls_len);
    for _ in 0..calls_len {
        positions.push(read_u64(sig, i, "position_i")?);
    }

    let total = lens.iter().fold(0usize, |acc, len| acc.saturating_add(*len));
    // Proof elements plus the token length felt.
    require_remaining(sig, *i, total.saturating_add(1), "proofs")?;

    let proofs = lens
        .iter()
        .zip(positions)
        .map(|(len, position)| {
            let siblings = felts::read_vec(sig, i, *len)
                .map_err(|_| length_error(sig, *i, *len, "proofs"))?;
            Ok(CallProof { position, siblings })
        })
        .collect::<Result<Vec<_>, AccountError>>()?;

    let token_len = read_len(sig, i, "session_token_len")?;
    if token_len != SESSION_TOKEN_LEN {
        return Err(AccountError::EnvelopeLength {
            field: "session_token_len",
            expected: SESSION_TOKEN_LEN,
            actual: token_len,
        });
    }
    require_remaining(sig, *i, SESSION_TOKEN_LEN, "session_token")?;
    let session_token = read_signature(sig, i, "session_token")?;

    Ok(SessionPayload {
        session_key,
        expires_at,
        signature,
        policy_root,
        proof_len,
        proofs,
        session_token,
    })
}

fn length_error(buf: &[Felt], i: usize, needed: usize, field: &'static str) -> AccountError {
    AccountError::EnvelopeLength {
        field,
        expected: i.saturating_add(needed),
        actual: buf.len(),
    }
}

fn require_remaining(buf: &[Felt], i: usize, needed: usize, field: &'static str) -> Result<(), AccountError> {
    if buf.len().saturating_sub(i) < needed {
        return Err(length_error(buf, i, needed, field));
    }
    Ok(())
}

fn read_felt(buf: &[Felt], i: &mut usize, field: &'static str) -> Result<Felt, AccountError> {
    felts::read_felt(buf, i).map_err(|_| length_error(buf, *i, 1, field))
}

fn read_u64(buf: &[Felt], i: &mut usize, field: &'static str) -> Result<u64, AccountError> {
    let felt = read_felt(buf, i, field)?;
    u64::try_from(felt).map_err(|_| AccountError::MalformedEnvelope { field })
}

/// Length fields too large for `usize` can never fit the buffer either.
fn read_len(buf: &[Felt], i: &mut usize, field: &'static str) -> Result<usize, AccountError> {
    let felt = read_felt(buf, i, field)?;
    usize::try_from(felt).map_err(|_| AccountError::EnvelopeLength {
        field,
        expected: usize::MAX,
        actual: buf.len(),
    })
}

fn read_signature(buf: &[Felt], i: &mut usize, field: &'static str) -> Result<EcdsaSignature, AccountError> {
    let r = read_felt(buf, i, field)?;
    let s = read_felt(buf, i, field)?;
    Ok(EcdsaSignature::new(r, s))
}

/// Decode `[call_array_len, (to, selector, offset, len)*, calldata_len, calldata*]` into calls.
pub fn decode_execute_calldata(calldata: &[Felt]) -> Result<Vec<Call>, AccountError> {
    let mut i = 0usize;
    let call_array_len = felts::read_usize(calldata, &mut i).map_err(|_| malformed(0, "missing call array length"))?;

    let needed = call_array_len
        .checked_mul(CALL_ARRAY_ENTRY_LEN)
        .ok_or(malformed(0, "call array length out of range"))?;
    if calldata.len().saturating_sub(i) < needed {
        return Err(malformed(0, "call array out of bounds"));
    }

    let mut entries = Vec::with_capacity(call_array_len);
    for index in 0..call_array_len {
        let to = felts::read_felt(calldata, &mut i).map_err(|_| malformed(index, "call array out of bounds"))?;
        let selector = felts::read_felt(calldata, &mut i).map_err(|_| malformed(index, "call array out of bounds"))?;
        let data_offset = felts::read_u32(calldata, &mut i).map_err(|_| malformed(index, "data offset out of range"))?;
        let data_len = felts::read_u32(calldata, &mut i).map_err(|_| malformed(index, "data length out of range"))?;
        entries.push(CallArrayEntry {
            to,
            selector,
            data_offset,
            data_len,
        });
    }

    let data = felts::read_array(calldata, &mut i).map_err(|_| malformed(call_array_len, "calldata out of bounds"))?;
    if i != calldata.len() {
        return Err(malformed(call_array_len, "trailing calldata"));
    }

    decode_calls(&entries, &data)
}

fn malformed(index: usize, reason: &'static str) -> AccountError {
    AccountError::MalformedCall { index, reason }
}
