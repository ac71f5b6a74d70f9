use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Bit offsets address at most 512 megabytes.
const MAX_BIT_OFFSET: i64 = 1 << 32;

/// Returns the bit value at offset in the string value stored at key.
///
/// Bit 0 is the most significant bit of the first byte. When offset is beyond the string length,
/// or the key does not exist, the bit is assumed to be 0.
///
/// Ref: <https://redis.io/docs/latest/commands/getbit/>
#[derive(Debug, PartialEq)]
pub struct Getbit {
    pub key: Bytes,
    pub offset: u64,
}

impl Executable for Getbit {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        let value = store.read().get(&self.key).unwrap_or_default();
        Ok(Frame::Integer(bit_at(&value, self.offset) as i64))
    }
}

impl TryFrom<&mut CommandParser> for Getbit {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let offset = next_bit_offset(parser)?;

        Ok(Self { key, offset })
    }
}

pub(crate) fn next_bit_offset(parser: &mut CommandParser) -> Result<u64, CommandError> {
    let offset = parser.next_integer().map_err(|err| match err {
        CommandError::NotInteger => CommandError::BitOffsetOutOfRange,
        err => err,
    })?;

    if !(0..MAX_BIT_OFFSET).contains(&offset) {
        return Err(CommandError::BitOffsetOutOfRange);
    }

    Ok(offset as u64)
}

/// Splits a bit offset into the index of its byte and the mask selecting it in that byte.
pub(crate) fn bit_position(offset: u64) -> (usize, u8) {
    let byte = (offset / 8) as usize;
    let mask = 1 << (7 - (offset % 8));

    (byte, mask)
}

pub(crate) fn bit_at(value: &[u8], offset: u64) -> u8 {
    let (byte, mask) = bit_position(offset);

    match value.get(byte) {
        Some(b) if b & mask != 0 => 1,
        _ => 0,
    }
}
