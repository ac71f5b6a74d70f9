use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Delete all the keys of the database.
///
/// Ref: <https://redis.io/docs/latest/commands/flushdb/>
#[derive(Debug, PartialEq)]
pub struct Flushdb;

impl Executable for Flushdb {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        store.write().clear();
        Ok(Frame::Simple("OK".to_string()))
    }
}

impl TryFrom<&mut CommandParser> for Flushdb {
    type Error = CommandError;

    fn try_from(_parser: &mut CommandParser) -> Result<Self, Self::Error> {
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::commands::Command;

    #[test]
    fn removes_every_key() {
        let store = Store::new();
        store.write().set(Bytes::from("a"), Bytes::from("1"));
        store.write().set(Bytes::from("b"), Bytes::from("2"));

        let frame = Frame::Array(vec![Frame::Bulk(Bytes::from("FLUSHDB"))]);
        let cmd = Command::try_from(frame).unwrap();
        assert_eq!(cmd, Command::Flushdb(Flushdb));

        let res = cmd.exec(store.clone()).unwrap();

        assert_eq!(res, Frame::Simple("OK".to_string()));
        assert_eq!(store.read().size(), 0);
    }
}
