use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Renames key to newkey. It returns an error when key does not exist. If newkey already exists it
/// is overwritten.
///
/// Ref: <https://redis.io/docs/latest/commands/rename/>
#[derive(Debug, PartialEq)]
pub struct Rename {
    pub key: Bytes,
    pub newkey: Bytes,
}

impl Executable for Rename {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        let mut store = store.write();

        let value = store.remove(&self.key).ok_or(CommandError::NoSuchKey)?;
        store.set(self.newkey, value);

        Ok(Frame::Simple("OK".to_string()))
    }
}

impl TryFrom<&mut CommandParser> for Rename {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let newkey = parser.next_bytes()?;

        Ok(Self { key, newkey })
    }
}
