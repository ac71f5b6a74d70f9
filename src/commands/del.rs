use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Removes the specified keys. A key is ignored if it does not exist. Returns the number of keys
/// that were removed.
///
/// Ref: <https://redis.io/docs/latest/commands/del/>
#[derive(Debug, PartialEq)]
pub struct Del {
    pub keys: Vec<Bytes>,
}

impl Executable for Del {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        let mut store = store.write();

        let count = self
            .keys
            .iter()
            .filter(|key| store.remove(key).is_some())
            .count();

        Ok(Frame::Integer(count as i64))
    }
}

impl TryFrom<&mut CommandParser> for Del {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let mut keys = Vec::with_capacity(parser.remaining());

        while parser.remaining() > 0 {
            keys.push(parser.next_bytes()?);
        }

        Ok(Self { keys })
    }
}
