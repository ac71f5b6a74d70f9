use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Set key to hold string value if key does not exist. In that case, it is equal to SET. When key
/// already holds a value, no operation is performed. SETNX is short for "SET if Not eXists".
///
/// Ref: <https://redis.io/docs/latest/commands/setnx/>
#[derive(Debug, PartialEq)]
pub struct Setnx {
    pub key: Bytes,
    pub value: Bytes,
}

impl Executable for Setnx {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        let mut store = store.write();

        let res = if store.exists(&self.key) {
            Frame::Integer(0)
        } else {
            store.set(self.key, self.value);
            Frame::Integer(1)
        };

        Ok(res)
    }
}

impl TryFrom<&mut CommandParser> for Setnx {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let value = parser.next_bytes()?;

        Ok(Self { key, value })
    }
}
