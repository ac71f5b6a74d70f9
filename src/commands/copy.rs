use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Copies the value stored at the source key to the destination key. Returns 1 if source was
/// copied, 0 if it does not exist or the destination already holds a value and `REPLACE` was not
/// given.
///
/// Ref: <https://redis.io/docs/latest/commands/copy/>
#[derive(Debug, PartialEq)]
pub struct Copy {
    pub source: Bytes,
    pub destination: Bytes,
    pub replace: bool,
}

impl Executable for Copy {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        let mut store = store.write();

        let value = match store.get(&self.source) {
            Some(value) => value,
            None => return Ok(Frame::Integer(0)),
        };

        if !self.replace && store.exists(&self.destination) {
            return Ok(Frame::Integer(0));
        }

        store.set(self.destination, value);

        Ok(Frame::Integer(1))
    }
}

impl TryFrom<&mut CommandParser> for Copy {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let source = parser.next_bytes()?;
        let destination = parser.next_bytes()?;

        let replace = match parser.next_option()?.as_deref() {
            None => false,
            Some("REPLACE") => true,
            Some(_) => return Err(CommandError::SyntaxError),
        };

        if parser.remaining() > 0 {
            return Err(CommandError::SyntaxError);
        }

        Ok(Self {
            source,
            destination,
            replace,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;

    fn copy_frame(args: &[&str]) -> Frame {
        let mut parts = vec![Frame::Bulk(Bytes::from("COPY"))];
        parts.extend(args.iter().map(|arg| Frame::Bulk(Bytes::from(arg.to_string()))));
        Frame::Array(parts)
    }

    #[test]
    fn to_new_key() {
        let store = Store::new();
        store.write().set(Bytes::from("src"), Bytes::from("v"));

        let cmd = Command::try_from(copy_frame(&["src", "dst"])).unwrap();
        assert_eq!(
            cmd,
            Command::Copy(Copy {
                source: Bytes::from("src"),
                destination: Bytes::from("dst"),
                replace: false
            })
        );

        let res = cmd.exec(store.clone()).unwrap();

        assert_eq!(res, Frame::Integer(1));
        assert_eq!(store.read().get(b"src"), Some(Bytes::from("v")));
        assert_eq!(store.read().get(b"dst"), Some(Bytes::from("v")));
    }

    #[test]
    fn existing_destination_without_replace() {
        let store = Store::new();
        store.write().set(Bytes::from("src"), Bytes::from("v"));
        store.write().set(Bytes::from("dst"), Bytes::from("old"));

        let res = Command::try_from(copy_frame(&["src", "dst"]))
            .unwrap()
            .exec(store.clone())
            .unwrap();

        assert_eq!(res, Frame::Integer(0));
        assert_eq!(store.read().get(b"dst"), Some(Bytes::from("old")));
    }

    #[test]
    fn existing_destination_with_replace() {
        let store = Store::new();
        store.write().set(Bytes::from("src"), Bytes::from("v"));
        store.write().set(Bytes::from("dst"), Bytes::from("old"));

        let res = Command::try_from(copy_frame(&["src", "dst", "replace"]))
            .unwrap()
            .exec(store.clone())
            .unwrap();

        assert_eq!(res, Frame::Integer(1));
        assert_eq!(store.read().get(b"dst"), Some(Bytes::from("v")));
    }

    #[test]
    fn missing_source() {
        let store = Store::new();

        let res = Command::try_from(copy_frame(&["src", "dst"]))
            .unwrap()
            .exec(store.clone())
            .unwrap();

        assert_eq!(res, Frame::Integer(0));
        assert!(!store.read().exists(b"dst"));
    }

    #[test]
    fn unknown_option() {
        let err = Command::try_from(copy_frame(&["src", "dst", "NOW"])).unwrap_err();
        assert_eq!(err, CommandError::SyntaxError);

        let err = Command::try_from(copy_frame(&["src", "dst", "REPLACE", "REPLACE"])).unwrap_err();
        assert_eq!(err, CommandError::SyntaxError);
    }
}
