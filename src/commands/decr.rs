use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Decrements the number stored at key by one.
///
/// Ref: <https://redis.io/docs/latest/commands/decr/>
#[derive(Debug, PartialEq)]
pub struct Decr {
    pub key: Bytes,
}

impl Executable for Decr {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        let value = store.write().incr_by(self.key, -1i64)?;
        Ok(Frame::Integer(value))
    }
}

impl TryFrom<&mut CommandParser> for Decr {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;

        Ok(Self { key })
    }
}
