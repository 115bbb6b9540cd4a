//! Positional felt readers.
//!
//! Callers map the unit error into the error kind that fits the buffer they are parsing.

use plugin_account_types::Felt;

pub fn read_felt(buf: &[Felt], i: &mut usize) -> Result<Felt, ()> {
    let out = *buf.get(*i).ok_or(())?;
    *i += 1;
    Ok(out)
}

pub fn read_vec(buf: &[Felt], i: &mut usize, len: usize) -> Result<Vec<Felt>, ()> {
    let end = i.checked_add(len).ok_or(())?;
    if buf.len() < end {
        return Err(());
    }
    let out = buf[*i..end].to_vec();
    *i = end;
    Ok(out)
}

pub fn read_usize(buf: &[Felt], i: &mut usize) -> Result<usize, ()> {
    let felt = read_felt(buf, i)?;
    usize::try_from(felt).map_err(|_| ())
}

pub fn read_u32(buf: &[Felt], i: &mut usize) -> Result<u32, ()> {
    let felt = read_felt(buf, i)?;
    u32::try_from(felt).map_err(|_| ())
}

/// Read a `len, elements...` array.
pub fn read_array(buf: &[Felt], i: &mut usize) -> Result<Vec<Felt>, ()> {
    let len = read_usize(buf, i)?;
    read_vec(buf, i, len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_advance_and_stop_at_end() {
        let buf = vec![Felt::from(2u64), Felt::from(7u64), Felt::from(8u64)];
        let mut i = 0;
        assert_eq!(read_array(&buf, &mut i), Ok(vec![Felt::from(7u64), Felt::from(8u64)]));
        assert_eq!(i, 3);
        assert_eq!(read_felt(&buf, &mut i), Err(()));

        let mut i = 1;
        assert_eq!(read_vec(&buf, &mut i, 3), Err(()));
        assert_eq!(i, 1);
        assert_eq!(read_vec(&buf, &mut i, usize::MAX), Err(()));
    }

    #[test]
    fn oversized_numbers_are_rejected() {
        let buf = vec![Felt::MAX];
        assert_eq!(read_u32(&buf, &mut 0), Err(()));
        assert_eq!(read_usize(&buf, &mut 0), Err(()));
    }
}
