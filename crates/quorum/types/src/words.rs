//! Fixed-width payload words
//!
//! Backend payloads are byte strings made of packed 20-byte addresses and
//! 32-byte big-endian words. Amounts are `u128`, so a word whose upper 16 bytes
//! are non-zero is rejected rather than truncated.

use thiserror::Error;

use crate::ids::Address;

/// Width of a payload word in bytes.
pub const WORD: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WordError {
    #[error("payload too short: need {needed} bytes at offset {offset}, have {len}")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("word at offset {0} does not fit in 128 bits")]
    Overflow(usize),

    #[error("word at offset {0} is not a left-padded address")]
    DirtyAddress(usize),
}

fn slice(data: &[u8], offset: usize, needed: usize) -> Result<&[u8], WordError> {
    data.get(offset..offset.saturating_add(needed))
        .ok_or(WordError::OutOfBounds {
            offset,
            needed,
            len: data.len(),
        })
}

/// Read a packed 20-byte address.
pub fn read_packed_address(data: &[u8], offset: usize) -> Result<Address, WordError> {
    let bytes = slice(data, offset, Address::LEN)?;
    let mut array = [0u8; 20];
    array.copy_from_slice(bytes);
    Ok(Address::new(array))
}

/// Read a 32-byte word as `u128`.
pub fn read_u128(data: &[u8], offset: usize) -> Result<u128, WordError> {
    let bytes = slice(data, offset, WORD)?;
    if bytes[..16].iter().any(|b| *b != 0) {
        return Err(WordError::Overflow(offset));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&bytes[16..]);
    Ok(u128::from_be_bytes(low))
}

/// Read a 32-byte word holding a left-padded address.
pub fn read_word_address(data: &[u8], offset: usize) -> Result<Address, WordError> {
    let bytes = slice(data, offset, WORD)?;
    if bytes[..12].iter().any(|b| *b != 0) {
        return Err(WordError::DirtyAddress(offset));
    }
    read_packed_address(bytes, 12)
}

pub fn push_packed_address(buf: &mut Vec<u8>, address: &Address) {
    buf.extend_from_slice(address.as_bytes());
}

pub fn push_u128(buf: &mut Vec<u8>, value: u128) {
    buf.extend_from_slice(&[0u8; 16]);
    buf.extend_from_slice(&value.to_be_bytes());
}

pub fn push_word_address(buf: &mut Vec<u8>, address: &Address) {
    buf.extend_from_slice(&[0u8; 12]);
    buf.extend_from_slice(address.as_bytes());
}
