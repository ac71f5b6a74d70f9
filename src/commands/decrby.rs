use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Decrements the number stored at key by `decrement`.
///
/// Ref: <https://redis.io/docs/latest/commands/decrby/>
#[derive(Debug, PartialEq)]
pub struct DecrBy {
    pub key: Bytes,
    pub decrement: i64,
}

impl Executable for DecrBy {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        // i64::MIN has no positive counterpart.
        let increment = self.decrement.checked_neg().ok_or(CommandError::NotInteger)?;
        let value = store.write().incr_by(self.key, increment)?;

        Ok(Frame::Integer(value))
    }
}

impl TryFrom<&mut CommandParser> for DecrBy {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let decrement = parser.next_integer()?;

        Ok(Self { key, decrement })
    }
}
