use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Returns the substring of the string value stored at key, determined by the offsets start and
/// end (both are inclusive). Negative offsets can be used in order to provide an offset starting
/// from the end of the string. So -1 means the last character, -2 the penultimate and so forth.
/// The function handles out of range requests by limiting the resulting range to the actual length
/// of the string.
///
/// Ref: <https://redis.io/docs/latest/commands/getrange/>
#[derive(Debug, PartialEq)]
pub struct Getrange {
    pub key: Bytes,
    pub start: i64,
    pub end: i64,
}

impl Executable for Getrange {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        let value = match store.read().get(&self.key) {
            Some(value) => value,
            None => return Ok(Frame::Bulk(Bytes::new())),
        };

        let res = match byte_range(value.len() as i64, self.start, self.end) {
            Some((start, end)) => value.slice(start..=end),
            None => Bytes::new(),
        };

        Ok(Frame::Bulk(res))
    }
}

/// Resolves `start` and `end` against a value of `len` bytes. `None` means the range is empty.
fn byte_range(len: i64, start: i64, end: i64) -> Option<(usize, usize)> {
    if len == 0 || start >= len {
        return None;
    }

    let end = end.min(len - 1);

    let start = start.rem_euclid(len);
    let end = end.rem_euclid(len);

    if start > end {
        return None;
    }

    Some((start as usize, end as usize))
}

impl TryFrom<&mut CommandParser> for Getrange {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let start = parser.next_integer()?;
        let end = parser.next_integer()?;

        Ok(Self { key, start, end })
    }
}
