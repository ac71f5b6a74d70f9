use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::mset::parse_pairs;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Sets the given keys to their respective values.
/// Will not perform any operation at all even if just a single key already exists.
///
/// Because of this semantic MSETNX can be used in order to set different keys representing
/// different fields of a unique logic object in a way that ensures that either all the
/// fields or none at all are set.
///
/// Ref: <https://redis.io/docs/latest/commands/msetnx/>
#[derive(Debug, PartialEq)]
pub struct Msetnx {
    pub pairs: Vec<(Bytes, Bytes)>,
}

impl Executable for Msetnx {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        let mut store = store.write();

        if self.pairs.iter().any(|(key, _)| store.exists(key)) {
            return Ok(Frame::Integer(0));
        }

        for (key, value) in self.pairs {
            store.set(key, value);
        }

        Ok(Frame::Integer(1))
    }
}

impl TryFrom<&mut CommandParser> for Msetnx {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let pairs = parse_pairs(parser)?;
        Ok(Self { pairs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;

    #[test]
    fn when_no_key_exists() {
        let store = Store::new();

        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("MSETNX")),
            Frame::Bulk(Bytes::from("key1")),
            Frame::Bulk(Bytes::from("value1")),
            Frame::Bulk(Bytes::from("key2")),
            Frame::Bulk(Bytes::from("value2")),
        ]);
        let cmd = Command::try_from(frame).unwrap();

        assert_eq!(
            cmd,
            Command::Msetnx(Msetnx {
                pairs: vec![
                    (Bytes::from("key1"), Bytes::from("value1")),
                    (Bytes::from("key2"), Bytes::from("value2"))
                ]
            })
        );

        let result = cmd.exec(store.clone()).unwrap();

        assert_eq!(result, Frame::Integer(1));
        assert_eq!(store.read().get(b"key1"), Some(Bytes::from("value1")));
        assert_eq!(store.read().get(b"key2"), Some(Bytes::from("value2")));
    }

    #[test]
    fn when_one_key_exists() {
        let store = Store::new();
        store.write().set(Bytes::from("key2"), Bytes::from("old"));

        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("MSETNX")),
            Frame::Bulk(Bytes::from("key1")),
            Frame::Bulk(Bytes::from("value1")),
            Frame::Bulk(Bytes::from("key2")),
            Frame::Bulk(Bytes::from("value2")),
        ]);
        let result = Command::try_from(frame)
            .unwrap()
            .exec(store.clone())
            .unwrap();

        assert_eq!(result, Frame::Integer(0));
        assert_eq!(store.read().get(b"key1"), None);
        assert_eq!(store.read().get(b"key2"), Some(Bytes::from("old")));
    }
}
