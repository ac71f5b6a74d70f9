use bytes::{Bytes, BytesMut};

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// If key already exists, this command appends the value at the end of the string. If key does
/// not exist it is created holding the value, so APPEND will be similar to SET in this special
/// case.
///
/// Ref: <https://redis.io/docs/latest/commands/append>
#[derive(Debug, PartialEq)]
pub struct Append {
    pub key: Bytes,
    pub value: Bytes,
}

impl Executable for Append {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        let mut store = store.write();

        let len = match store.get(&self.key) {
            Some(current) => {
                let new_len = current.len() + self.value.len();
                let mut new_value = BytesMut::with_capacity(new_len);

                new_value.extend_from_slice(&current);
                new_value.extend_from_slice(&self.value);

                store.set(self.key, new_value.freeze());
                new_len
            }
            None => {
                let len = self.value.len();
                store.set(self.key, self.value);
                len
            }
        };

        Ok(Frame::Integer(len as i64))
    }
}

impl TryFrom<&mut CommandParser> for Append {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let value = parser.next_bytes()?;

        Ok(Self { key, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;

    #[test]
    fn when_key_does_not_exists() {
        let store = Store::new();

        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("APPEND")),
            Frame::Bulk(Bytes::from("foo")),
            Frame::Bulk(Bytes::from("baz")),
        ]);
        let cmd = Command::try_from(frame).unwrap();

        assert_eq!(
            cmd,
            Command::Append(Append {
                key: Bytes::from("foo"),
                value: Bytes::from("baz")
            })
        );

        let res = cmd.exec(store.clone()).unwrap();

        assert_eq!(res, Frame::Integer(3));
        assert_eq!(store.read().get(b"foo"), Some(Bytes::from("baz")));
    }

    #[test]
    fn when_key_exists() {
        let store = Store::new();
        store
            .write()
            .set(Bytes::from("key1"), Bytes::from("hello"));

        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("APPEND")),
            Frame::Bulk(Bytes::from("key1")),
            Frame::Bulk(Bytes::from(" world")),
        ]);
        let cmd = Command::try_from(frame).unwrap();

        let res = cmd.exec(store.clone()).unwrap();

        assert_eq!(res, Frame::Integer(11));
        assert_eq!(
            store.read().get(b"key1"),
            Some(Bytes::from("hello world"))
        );
    }

    #[test]
    fn binary_values() {
        let store = Store::new();
        store
            .write()
            .set(Bytes::from("bin"), Bytes::from_static(b"\x00\r\n"));

        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("APPEND")),
            Frame::Bulk(Bytes::from("bin")),
            Frame::Bulk(Bytes::from_static(b"\xff")),
        ]);
        let res = Command::try_from(frame)
            .unwrap()
            .exec(store.clone())
            .unwrap();

        assert_eq!(res, Frame::Integer(4));
        assert_eq!(
            store.read().get(b"bin"),
            Some(Bytes::from_static(b"\x00\r\n\xff"))
        );
    }
}
