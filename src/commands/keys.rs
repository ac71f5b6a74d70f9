use bytes::Bytes;
use glob_match::glob_match;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Returns all keys matching a glob-style pattern.
///
/// Ref: <https://redis.io/docs/latest/commands/keys/>
#[derive(Debug, PartialEq)]
pub struct Keys {
    pub pattern: String,
}

impl Executable for Keys {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        let store = store.read();

        let mut keys: Vec<&Bytes> = store
            .keys()
            .filter(|key| glob_match(&self.pattern, &String::from_utf8_lossy(key)))
            .collect();
        keys.sort();

        let res = keys.into_iter().cloned().map(Frame::Bulk).collect();
        Ok(Frame::Array(res))
    }
}

impl TryFrom<&mut CommandParser> for Keys {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let pattern = parser.next_bytes()?;
        let pattern = String::from_utf8_lossy(&pattern).into_owned();

        Ok(Self { pattern })
    }
}
