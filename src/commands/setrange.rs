use bytes::{Bytes, BytesMut};

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Values may not grow beyond 512 megabytes.
pub(crate) const MAX_STRING_LEN: i64 = 512 * 1024 * 1024;

/// Setrange overwrites part of the string stored at key, starting at the specified offset, for the
/// entire length of value. If the offset is larger than the current length of the string at key,
/// the string is padded with zero-bytes to make offset fit. Non-existing keys are considered as
/// empty strings, so this command will make sure it holds a string large enough to be able to set
/// value at offset.
///
/// Note that the maximum offset that you can set is 2^29 -1 (536870911), as strings are limited to
/// 512 megabytes.
///
/// Ref: <https://redis.io/docs/latest/commands/setrange/>
#[derive(Debug, PartialEq)]
pub struct Setrange {
    pub key: Bytes,
    pub offset: i64,
    pub value: Bytes,
}

impl Executable for Setrange {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        if self.offset < 0 {
            return Err(CommandError::OffsetOutOfRange);
        }

        let mut store = store.write();
        let current = store.get(&self.key).unwrap_or_default();

        // Nothing to write, the key is not even created.
        if self.value.is_empty() {
            return Ok(Frame::Integer(current.len() as i64));
        }

        let end = self
            .offset
            .checked_add(self.value.len() as i64)
            .filter(|end| *end <= MAX_STRING_LEN)
            .ok_or(CommandError::OffsetOutOfRange)?;

        let offset = self.offset as usize;
        let end = end as usize;

        let mut new_value = BytesMut::from(&current[..]);
        if new_value.len() < end {
            new_value.resize(end, 0);
        }
        new_value[offset..end].copy_from_slice(&self.value);

        let len = new_value.len();
        store.set(self.key, new_value.freeze());

        Ok(Frame::Integer(len as i64))
    }
}

impl TryFrom<&mut CommandParser> for Setrange {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let offset = parser.next_integer()?;
        let value = parser.next_bytes()?;

        Ok(Self { key, offset, value })
    }
}
