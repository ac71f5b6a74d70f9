use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Returns the values of all specified keys, in request order. Keys that do not exist yield `nil`.
///
/// Ref: <https://redis.io/docs/latest/commands/mget/>
#[derive(Debug, PartialEq)]
pub struct Mget {
    pub keys: Vec<Bytes>,
}

impl Executable for Mget {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        let store = store.read();
        let values = self
            .keys
            .iter()
            .map(|key| store.get(key).map_or(Frame::NullBulkString, Frame::Bulk))
            .collect::<Vec<_>>();

        Ok(Frame::Array(values))
    }
}

impl TryFrom<&mut CommandParser> for Mget {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let mut keys = Vec::with_capacity(parser.remaining());

        while parser.remaining() > 0 {
            keys.push(parser.next_bytes()?);
        }

        Ok(Self { keys })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;

    #[test]
    fn single_key() {
        let store = Store::new();

        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("MGET")),
            Frame::Bulk(Bytes::from("key1")),
        ]);
        let cmd = Command::try_from(frame).unwrap();

        assert_eq!(
            cmd,
            Command::Mget(Mget {
                keys: vec![Bytes::from("key1")]
            })
        );

        store.write().set(Bytes::from("key1"), Bytes::from("value1"));

        let result = cmd.exec(store.clone()).unwrap();

        assert_eq!(
            result,
            Frame::Array(vec![Frame::Bulk(Bytes::from("value1"))])
        );
    }

    #[test]
    fn multiple_keys_with_missing() {
        let store = Store::new();

        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("MGET")),
            Frame::Bulk(Bytes::from("key1")),
            Frame::Bulk(Bytes::from("nonexisting")),
            Frame::Bulk(Bytes::from("key2")),
        ]);
        let cmd = Command::try_from(frame).unwrap();

        store.write().set(Bytes::from("key1"), Bytes::from("value1"));
        store.write().set(Bytes::from("key2"), Bytes::from("value2"));

        let result = cmd.exec(store.clone()).unwrap();

        assert_eq!(
            result,
            Frame::Array(vec![
                Frame::Bulk(Bytes::from("value1")),
                Frame::NullBulkString,
                Frame::Bulk(Bytes::from("value2")),
            ])
        );
    }
}
