use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Return the number of keys in the database.
///
/// Ref: <https://redis.io/docs/latest/commands/dbsize/>
#[derive(Debug, PartialEq)]
pub struct DBSize;

impl Executable for DBSize {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        let size = store.read().size();
        Ok(Frame::Integer(size as i64))
    }
}

impl TryFrom<&mut CommandParser> for DBSize {
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
    fn counts_keys() {
        let store = Store::new();

        let frame = Frame::Array(vec![Frame::Bulk(Bytes::from("DBSIZE"))]);
        let cmd = Command::try_from(frame).unwrap();
        assert_eq!(cmd, Command::DBsize(DBSize));

        assert_eq!(cmd.exec(store.clone()).unwrap(), Frame::Integer(0));

        store.write().set(Bytes::from("a"), Bytes::from("1"));
        store.write().set(Bytes::from("b"), Bytes::from("2"));

        let frame = Frame::Array(vec![Frame::Bulk(Bytes::from("DBSIZE"))]);
        let res = Command::try_from(frame).unwrap().exec(store).unwrap();
        assert_eq!(res, Frame::Integer(2));
    }
}
