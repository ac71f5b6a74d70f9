use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Returns how many of the given keys exist. A key mentioned multiple times is counted multiple
/// times.
///
/// Ref: <https://redis.io/docs/latest/commands/exists/>
#[derive(Debug, PartialEq)]
pub struct Exists {
    pub keys: Vec<Bytes>,
}

impl Executable for Exists {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        let store = store.read();
        let count = self.keys.iter().filter(|key| store.exists(key)).count();

        Ok(Frame::Integer(count as i64))
    }
}

impl TryFrom<&mut CommandParser> for Exists {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let mut keys = Vec::with_capacity(parser.remaining());

        while parser.remaining() > 0 {
            keys.push(parser.next_bytes()?);
        }

        Ok(Self { keys })
    }
}
