use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Get the value of key and delete the key. This command is similar to GET, except for the fact
/// that it also deletes the key on success.
///
/// Ref: <https://redis.io/docs/latest/commands/getdel/>
#[derive(Debug, PartialEq)]
pub struct Getdel {
    pub key: Bytes,
}

impl Executable for Getdel {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        let removed = store.write().remove(&self.key);

        let res = match removed {
            Some(value) => Frame::Bulk(value),
            None => Frame::NullBulkString,
        };

        Ok(res)
    }
}

impl TryFrom<&mut CommandParser> for Getdel {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        Ok(Self { key })
    }
}
