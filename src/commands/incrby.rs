use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Increments the number stored at key by `increment`.
///
/// Ref: <https://redis.io/docs/latest/commands/incrby/>
#[derive(Debug, PartialEq)]
pub struct IncrBy {
    pub key: Bytes,
    pub increment: i64,
}

impl Executable for IncrBy {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        let value = store.write().incr_by(self.key, self.increment)?;
        Ok(Frame::Integer(value))
    }
}

impl TryFrom<&mut CommandParser> for IncrBy {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let increment = parser.next_integer()?;

        Ok(Self { key, increment })
    }
}
