use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Returns the length, in bytes, of the value stored at key. Missing keys count as empty.
///
/// Ref: <https://redis.io/docs/latest/commands/strlen/>
#[derive(Debug, PartialEq)]
pub struct Strlen {
    pub key: Bytes,
}

impl Executable for Strlen {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        let len = store.read().get(&self.key).map_or(0, |value| value.len());
        Ok(Frame::Integer(len as i64))
    }
}

impl TryFrom<&mut CommandParser> for Strlen {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        Ok(Self { key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;

    #[test]
    fn existing_key() {
        let store = Store::new();

        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("STRLEN")),
            Frame::Bulk(Bytes::from("key1")),
        ]);
        let cmd = Command::try_from(frame).unwrap();

        assert_eq!(
            cmd,
            Command::Strlen(Strlen {
                key: Bytes::from("key1")
            })
        );

        store
            .write()
            .set(Bytes::from("key1"), Bytes::from("Hello world"));

        let result = cmd.exec(store.clone()).unwrap();

        assert_eq!(result, Frame::Integer(11));
    }

    #[test]
    fn non_existing_key() {
        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("STRLEN")),
            Frame::Bulk(Bytes::from("key1")),
        ]);
        let cmd = Command::try_from(frame).unwrap();

        let result = cmd.exec(Store::new()).unwrap();

        assert_eq!(result, Frame::Integer(0));
    }
}
