use bytes::Bytes;
use itertools::Itertools;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Sets the given keys to their respective values. Replaces existing values with new values.
///
/// Ref: <https://redis.io/docs/latest/commands/mset/>
#[derive(Debug, PartialEq)]
pub struct Mset {
    pub pairs: Vec<(Bytes, Bytes)>,
}

impl Executable for Mset {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        let mut store = store.write();

        for (key, value) in self.pairs {
            store.set(key, value);
        }

        Ok(Frame::Simple("OK".to_string()))
    }
}

impl TryFrom<&mut CommandParser> for Mset {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let pairs = parse_pairs(parser)?;
        Ok(Self { pairs })
    }
}

/// Reads the remaining arguments as `key value` pairs. A dangling key is an arity error.
pub(crate) fn parse_pairs(
    parser: &mut CommandParser,
) -> Result<Vec<(Bytes, Bytes)>, CommandError> {
    if parser.remaining() % 2 != 0 {
        return Err(parser.wrong_args());
    }

    let mut args = Vec::with_capacity(parser.remaining());
    while parser.remaining() > 0 {
        args.push(parser.next_bytes()?);
    }

    Ok(args.into_iter().tuples().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;

    #[test]
    fn insert_one() {
        let store = Store::new();

        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("MSET")),
            Frame::Bulk(Bytes::from("key1")),
            Frame::Bulk(Bytes::from("value1")),
        ]);
        let cmd = Command::try_from(frame).unwrap();

        assert_eq!(
            cmd,
            Command::Mset(Mset {
                pairs: vec![(Bytes::from("key1"), Bytes::from("value1"))]
            })
        );

        let result = cmd.exec(store.clone()).unwrap();

        assert_eq!(result, Frame::Simple("OK".to_string()));
        assert_eq!(store.read().get(b"key1"), Some(Bytes::from("value1")));
    }

    #[test]
    fn insert_many_and_overwrite() {
        let store = Store::new();
        store.write().set(Bytes::from("key1"), Bytes::from("old"));

        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("MSET")),
            Frame::Bulk(Bytes::from("key1")),
            Frame::Bulk(Bytes::from("value1")),
            Frame::Bulk(Bytes::from("key2")),
            Frame::Bulk(Bytes::from("value2")),
        ]);
        let result = Command::try_from(frame)
            .unwrap()
            .exec(store.clone())
            .unwrap();

        assert_eq!(result, Frame::Simple("OK".to_string()));
        assert_eq!(store.read().get(b"key1"), Some(Bytes::from("value1")));
        assert_eq!(store.read().get(b"key2"), Some(Bytes::from("value2")));
    }

    #[test]
    fn dangling_key() {
        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("MSET")),
            Frame::Bulk(Bytes::from("key1")),
            Frame::Bulk(Bytes::from("value1")),
            Frame::Bulk(Bytes::from("key2")),
        ]);
        let err = Command::try_from(frame).unwrap_err();

        assert_eq!(
            err,
            CommandError::WrongArgs {
                command: "mset".to_string()
            }
        );
    }
}
