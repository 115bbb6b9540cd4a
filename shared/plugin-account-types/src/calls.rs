//! Call batching: a list of calls becomes a positional call array plus one shared calldata buffer.
//!
//! The account's `__execute__` entry point receives both, serialized as
//! `[call_array_len, (to, selector, data_offset, data_len)*, calldata_len, calldata*]`.

use crate::{errors::AccountError, felt::Felt};

/// A single logical invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub to: Felt,
    pub selector: Felt,
    pub calldata: Vec<Felt>,
}

impl Call {
    pub fn new(to: Felt, selector: Felt, calldata: Vec<Felt>) -> Self {
        Self { to, selector, calldata }
    }
}

/// One call's entry in the call array; `data_offset..data_offset + data_len` slices the calldata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallArrayEntry {
    pub to: Felt,
    pub selector: Felt,
    pub data_offset: u32,
    pub data_len: u32,
}

/// Number of felts one call-array entry occupies on the wire.
pub const CALL_ARRAY_ENTRY_LEN: usize = 4;

/// Flatten `calls` into a call array and calldata buffer, preserving order.
pub fn encode_calls(calls: &[Call]) -> Result<(Vec<CallArrayEntry>, Vec<Felt>), AccountError> {
    if calls.is_empty() {
        return Err(AccountError::MalformedCall { index: 0, reason: "empty call list" });
    }

    let mut call_array = Vec::with_capacity(calls.len());
    let mut calldata = Vec::new();
    for (index, call) in calls.iter().enumerate() {
        if call.to == Felt::ZERO {
            return Err(AccountError::MalformedCall { index, reason: "zero target" });
        }
        if call.selector == Felt::ZERO {
            return Err(AccountError::MalformedCall { index, reason: "zero selector" });
        }
        let data_offset = u32::try_from(calldata.len())
            .map_err(|_| AccountError::MalformedCall { index, reason: "calldata offset overflow" })?;
        let data_len = u32::try_from(call.calldata.len())
            .map_err(|_| AccountError::MalformedCall { index, reason: "too many arguments" })?;
        data_offset
            .checked_add(data_len)
            .ok_or(AccountError::MalformedCall { index, reason: "calldata offset overflow" })?;

        call_array.push(CallArrayEntry {
            to: call.to,
            selector: call.selector,
            data_offset,
            data_len,
        });
        calldata.extend_from_slice(&call.calldata);
    }
    Ok((call_array, calldata))
}

/// Rebuild calls from a call array, checking that entries tile the calldata exactly.
pub fn decode_calls(call_array: &[CallArrayEntry], calldata: &[Felt]) -> Result<Vec<Call>, AccountError> {
    if call_array.is_empty() {
        return Err(AccountError::MalformedCall { index: 0, reason: "empty call list" });
    }

    let mut calls = Vec::with_capacity(call_array.len());
    let mut expected_offset = 0usize;
    for (index, entry) in call_array.iter().enumerate() {
        let offset = entry.data_offset as usize;
        let len = entry.data_len as usize;
        if offset != expected_offset {
            return Err(AccountError::MalformedCall { index, reason: "non-contiguous data offset" });
        }
        if calldata.len() < offset + len {
            return Err(AccountError::MalformedCall { index, reason: "calldata out of bounds" });
        }
        calls.push(Call {
            to: entry.to,
            selector: entry.selector,
            calldata: calldata[offset..offset + len].to_vec(),
        });
        expected_offset = offset + len;
    }
    if expected_offset != calldata.len() {
        return Err(AccountError::MalformedCall {
            index: call_array.len() - 1,
            reason: "trailing calldata",
        });
    }
    Ok(calls)
}

/// Serialize a call array and calldata as the outer `__execute__` calldata.
pub fn execute_calldata(call_array: &[CallArrayEntry], calldata: &[Felt]) -> Vec<Felt> {
    let mut out = Vec::with_capacity(2 + call_array.len() * CALL_ARRAY_ENTRY_LEN + calldata.len());
    out.push(Felt::from(call_array.len()));
    for entry in call_array {
        out.push(entry.to);
        out.push(entry.selector);
        out.push(Felt::from(entry.data_offset));
        out.push(Felt::from(entry.data_len));
    }
    out.push(Felt::from(calldata.len()));
    out.extend_from_slice(calldata);
    out
}

/// `encode_calls` followed by `execute_calldata`.
pub fn encode_execute_calldata(calls: &[Call]) -> Result<Vec<Felt>, AccountError> {
    let (call_array, calldata) = encode_calls(calls)?;
    Ok(execute_calldata(&call_array, &calldata))
}
