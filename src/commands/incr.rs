use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Increments the number stored at key by one. A missing key is set to 0 before performing the
/// operation.
///
/// Ref: <https://redis.io/docs/latest/commands/incr/>
#[derive(Debug, PartialEq)]
pub struct Incr {
    pub key: Bytes,
}

impl Executable for Incr {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        let value = store.write().incr_by(self.key, 1i64)?;
        Ok(Frame::Integer(value))
    }
}

impl TryFrom<&mut CommandParser> for Incr {
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
        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("INCR")),
            Frame::Bulk(Bytes::from("key1")),
        ]);
        let cmd = Command::try_from(frame).unwrap();

        assert_eq!(
            cmd,
            Command::Incr(Incr {
                key: Bytes::from("key1")
            })
        );

        let store = Store::new();
        store.write().set(Bytes::from("key1"), Bytes::from("1"));

        let result = cmd.exec(store.clone()).unwrap();

        assert_eq!(result, Frame::Integer(2));
        assert_eq!(store.read().get(b"key1"), Some(Bytes::from("2")));
    }

    #[test]
    fn non_existing_key() {
        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("INCR")),
            Frame::Bulk(Bytes::from("key1")),
        ]);
        let cmd = Command::try_from(frame).unwrap();

        let store = Store::new();
        let result = cmd.exec(store.clone()).unwrap();

        assert_eq!(result, Frame::Integer(1));
        assert_eq!(store.read().get(b"key1"), Some(Bytes::from("1")));
    }

    #[test]
    fn invalid_value() {
        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("INCR")),
            Frame::Bulk(Bytes::from("key1")),
        ]);
        let cmd = Command::try_from(frame).unwrap();

        let store = Store::new();
        store.write().set(Bytes::from("key1"), Bytes::from("value"));

        let err = cmd.exec(store.clone()).unwrap_err();

        assert_eq!(err, CommandError::NotInteger);
        assert_eq!(store.read().get(b"key1"), Some(Bytes::from("value")));
    }

    #[test]
    fn out_of_range() {
        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("INCR")),
            Frame::Bulk(Bytes::from("key1")),
        ]);
        let cmd = Command::try_from(frame).unwrap();

        let store = Store::new();
        store
            .write()
            .set(Bytes::from("key1"), Bytes::from(i64::MAX.to_string()));

        let err = cmd.exec(store.clone()).unwrap_err();

        assert_eq!(err.to_string(), "ERR value is not an integer or out of range");
    }
}
