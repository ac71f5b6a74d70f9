use bytes::Bytes;
use std::str::FromStr;
use strum_macros::EnumString;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Set key to hold the string value. If key already holds a value, it is overwritten.
///
/// Options:
/// - `NX`: only set the key if it does not already exist.
/// - `XX`: only set the key if it already exists.
/// - `GET`: return the old value stored at key, or nil when key did not exist.
///
/// Ref: <https://redis.io/docs/latest/commands/set/>
#[derive(Debug, PartialEq)]
pub struct Set {
    pub key: Bytes,
    pub value: Bytes,
    pub condition: Option<Condition>,
    pub get: bool,
}

#[derive(Debug, PartialEq, Clone, Copy, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Condition {
    Nx,
    Xx,
}

#[derive(Debug, PartialEq, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
enum SetOption {
    Nx,
    Xx,
    Get,
}

impl Executable for Set {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        let mut store = store.write();
        let previous = store.get(&self.key);

        let should_write = match self.condition {
            None => true,
            Some(Condition::Nx) => previous.is_none(),
            Some(Condition::Xx) => previous.is_some(),
        };

        if should_write {
            store.set(self.key, self.value);
        }

        let res = if self.get {
            previous.map_or(Frame::NullBulkString, Frame::Bulk)
        } else if should_write {
            Frame::Simple("OK".to_string())
        } else {
            Frame::NullBulkString
        };

        Ok(res)
    }
}

impl TryFrom<&mut CommandParser> for Set {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let value = parser.next_bytes()?;

        let mut condition = None;
        let mut get = false;

        while let Some(option) = parser.next_option()? {
            let option = SetOption::from_str(&option).map_err(|_| CommandError::SyntaxError)?;

            match option {
                SetOption::Nx if condition.is_none() => condition = Some(Condition::Nx),
                SetOption::Xx if condition.is_none() => condition = Some(Condition::Xx),
                SetOption::Get if !get => get = true,
                _ => return Err(CommandError::SyntaxError),
            }
        }

        Ok(Self {
            key,
            value,
            condition,
            get,
        })
    }
}
