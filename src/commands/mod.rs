pub mod append;
pub mod copy;
pub mod dbsize;
pub mod decr;
pub mod decrby;
pub mod del;
pub mod echo;
pub mod executable;
pub mod exists;
pub mod flushdb;
pub mod get;
pub mod getbit;
pub mod getdel;
pub mod getrange;
pub mod incr;
pub mod incrby;
pub mod keys;
pub mod mget;
pub mod mset;
pub mod msetnx;
pub mod ping;
pub mod rename;
pub mod save;
pub mod set;
pub mod setbit;
pub mod setnx;
pub mod setrange;
pub mod strlen;

use bytes::Bytes;
use std::{str, vec};
use thiserror::Error as ThisError;

use crate::commands::executable::Executable;
use crate::frame::Frame;
use crate::store::{NotAnInteger, SnapshotError, Store};

use append::Append;
use copy::Copy as Copy_;
use dbsize::DBSize;
use decr::Decr;
use decrby::DecrBy;
use del::Del;
use echo::Echo;
use exists::Exists;
use flushdb::Flushdb;
use get::Get;
use getbit::Getbit;
use getdel::Getdel;
use getrange::Getrange;
use incr::Incr;
use incrby::IncrBy;
use keys::Keys;
use mget::Mget;
use mset::Mset;
use msetnx::Msetnx;
use ping::Ping;
use rename::Rename;
use save::Save;
use set::Set;
use setbit::Setbit;
use setnx::Setnx;
use setrange::Setrange;
use strlen::Strlen;

#[derive(Debug, PartialEq)]
pub enum Command {
    Append(Append),
    Copy(Copy_),
    DBsize(DBSize),
    Decr(Decr),
    DecrBy(DecrBy),
    Del(Del),
    Echo(Echo),
    Exists(Exists),
    Flushdb(Flushdb),
    Get(Get),
    Getbit(Getbit),
    Getdel(Getdel),
    Getrange(Getrange),
    Incr(Incr),
    IncrBy(IncrBy),
    Keys(Keys),
    Mget(Mget),
    Mset(Mset),
    Msetnx(Msetnx),
    Ping(Ping),
    Rename(Rename),
    Save(Save),
    Set(Set),
    Setbit(Setbit),
    Setnx(Setnx),
    Setrange(Setrange),
    Strlen(Strlen),
}

impl Executable for Command {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        match self {
            Command::Append(cmd) => cmd.exec(store),
            Command::Copy(cmd) => cmd.exec(store),
            Command::DBsize(cmd) => cmd.exec(store),
            Command::Decr(cmd) => cmd.exec(store),
            Command::DecrBy(cmd) => cmd.exec(store),
            Command::Del(cmd) => cmd.exec(store),
            Command::Echo(cmd) => cmd.exec(store),
            Command::Exists(cmd) => cmd.exec(store),
            Command::Flushdb(cmd) => cmd.exec(store),
            Command::Get(cmd) => cmd.exec(store),
            Command::Getbit(cmd) => cmd.exec(store),
            Command::Getdel(cmd) => cmd.exec(store),
            Command::Getrange(cmd) => cmd.exec(store),
            Command::Incr(cmd) => cmd.exec(store),
            Command::IncrBy(cmd) => cmd.exec(store),
            Command::Keys(cmd) => cmd.exec(store),
            Command::Mget(cmd) => cmd.exec(store),
            Command::Mset(cmd) => cmd.exec(store),
            Command::Msetnx(cmd) => cmd.exec(store),
            Command::Ping(cmd) => cmd.exec(store),
            Command::Rename(cmd) => cmd.exec(store),
            Command::Save(cmd) => cmd.exec(store),
            Command::Set(cmd) => cmd.exec(store),
            Command::Setbit(cmd) => cmd.exec(store),
            Command::Setnx(cmd) => cmd.exec(store),
            Command::Setrange(cmd) => cmd.exec(store),
            Command::Strlen(cmd) => cmd.exec(store),
        }
    }
}

/// Parses and runs one request. Failures never escape: every error becomes an error reply and the
/// session carries on.
pub fn execute(store: &Store, frame: Frame) -> Frame {
    let res = Command::try_from(frame).and_then(|cmd| cmd.exec(store.clone()));

    match res {
        Ok(frame) => frame,
        // Error replies are a single line, arguments echoed back must not break it.
        Err(err) => Frame::Error(err.to_string().replace(['\r', '\n'], " ")),
    }
}

type ParseFn = fn(&mut CommandParser) -> Result<Command, CommandError>;

struct CommandSpec {
    name: &'static str,
    /// Number of arguments including the command name. A negative value `-n` means "at least n".
    arity: i64,
    parse: ParseFn,
}

impl CommandSpec {
    fn accepts(&self, argc: usize) -> bool {
        let argc = argc as i64;
        if self.arity >= 0 {
            argc == self.arity
        } else {
            argc >= -self.arity
        }
    }
}

// Sorted by name, lookups use a binary search.
static COMMAND_TABLE: &[CommandSpec] = &[
    CommandSpec {
        name: "APPEND",
        arity: 3,
        parse: |p| Append::try_from(p).map(Command::Append),
    },
    CommandSpec {
        name: "COPY",
        arity: -3,
        parse: |p| Copy_::try_from(p).map(Command::Copy),
    },
    CommandSpec {
        name: "DBSIZE",
        arity: 1,
        parse: |p| DBSize::try_from(p).map(Command::DBsize),
    },
    CommandSpec {
        name: "DECR",
        arity: 2,
        parse: |p| Decr::try_from(p).map(Command::Decr),
    },
    CommandSpec {
        name: "DECRBY",
        arity: 3,
        parse: |p| DecrBy::try_from(p).map(Command::DecrBy),
    },
    CommandSpec {
        name: "DEL",
        arity: -2,
        parse: |p| Del::try_from(p).map(Command::Del),
    },
    CommandSpec {
        name: "ECHO",
        arity: 2,
        parse: |p| Echo::try_from(p).map(Command::Echo),
    },
    CommandSpec {
        name: "EXISTS",
        arity: -2,
        parse: |p| Exists::try_from(p).map(Command::Exists),
    },
    CommandSpec {
        name: "FLUSHDB",
        arity: 1,
        parse: |p| Flushdb::try_from(p).map(Command::Flushdb),
    },
    CommandSpec {
        name: "GET",
        arity: 2,
        parse: |p| Get::try_from(p).map(Command::Get),
    },
    CommandSpec {
        name: "GETBIT",
        arity: 3,
        parse: |p| Getbit::try_from(p).map(Command::Getbit),
    },
    CommandSpec {
        name: "GETDEL",
        arity: 2,
        parse: |p| Getdel::try_from(p).map(Command::Getdel),
    },
    CommandSpec {
        name: "GETRANGE",
        arity: 4,
        parse: |p| Getrange::try_from(p).map(Command::Getrange),
    },
    CommandSpec {
        name: "INCR",
        arity: 2,
        parse: |p| Incr::try_from(p).map(Command::Incr),
    },
    CommandSpec {
        name: "INCRBY",
        arity: 3,
        parse: |p| IncrBy::try_from(p).map(Command::IncrBy),
    },
    CommandSpec {
        name: "KEYS",
        arity: 2,
        parse: |p| Keys::try_from(p).map(Command::Keys),
    },
    CommandSpec {
        name: "MGET",
        arity: -2,
        parse: |p| Mget::try_from(p).map(Command::Mget),
    },
    CommandSpec {
        name: "MSET",
        arity: -3,
        parse: |p| Mset::try_from(p).map(Command::Mset),
    },
    CommandSpec {
        name: "MSETNX",
        arity: -3,
        parse: |p| Msetnx::try_from(p).map(Command::Msetnx),
    },
    CommandSpec {
        name: "PING",
        arity: -1,
        parse: |p| Ping::try_from(p).map(Command::Ping),
    },
    CommandSpec {
        name: "RENAME",
        arity: 3,
        parse: |p| Rename::try_from(p).map(Command::Rename),
    },
    CommandSpec {
        name: "SAVE",
        arity: 1,
        parse: |p| Save::try_from(p).map(Command::Save),
    },
    CommandSpec {
        name: "SET",
        arity: -3,
        parse: |p| Set::try_from(p).map(Command::Set),
    },
    CommandSpec {
        name: "SETBIT",
        arity: 4,
        parse: |p| Setbit::try_from(p).map(Command::Setbit),
    },
    CommandSpec {
        name: "SETNX",
        arity: 3,
        parse: |p| Setnx::try_from(p).map(Command::Setnx),
    },
    CommandSpec {
        name: "SETRANGE",
        arity: 4,
        parse: |p| Setrange::try_from(p).map(Command::Setrange),
    },
    CommandSpec {
        name: "STRLEN",
        arity: 2,
        parse: |p| Strlen::try_from(p).map(Command::Strlen),
    },
];

impl TryFrom<Frame> for Command {
    type Error = CommandError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        // Clients send commands to the server as RESP arrays.
        let frames = match frame {
            Frame::Array(array) => array,
            frame => {
                return Err(CommandError::InvalidFrame {
                    expected: "array".to_string(),
                    actual: frame,
                })
            }
        };

        let argc = frames.len();
        let mut parts = frames.into_iter();

        let name = match parts.next() {
            Some(Frame::Bulk(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            Some(Frame::Simple(s)) => s,
            Some(frame) => {
                return Err(CommandError::InvalidFrame {
                    expected: "simple or bulk string".to_string(),
                    actual: frame,
                })
            }
            None => {
                return Err(CommandError::InvalidFrame {
                    expected: "non-empty array".to_string(),
                    actual: Frame::Array(vec![]),
                })
            }
        };

        let upper = name.to_uppercase();
        let spec = COMMAND_TABLE
            .binary_search_by(|spec| spec.name.cmp(upper.as_str()))
            .map(|idx| &COMMAND_TABLE[idx])
            .map_err(|_| CommandError::UnknownCommand { command: name })?;

        if !spec.accepts(argc) {
            return Err(CommandError::WrongArgs {
                command: spec.name.to_lowercase(),
            });
        }

        let parser = &mut CommandParser {
            command: spec.name,
            parts,
        };

        (spec.parse)(parser)
    }
}

pub(crate) struct CommandParser {
    command: &'static str,
    parts: vec::IntoIter<Frame>,
}

impl CommandParser {
    fn next(&mut self) -> Result<Frame, CommandError> {
        self.parts.next().ok_or_else(|| self.wrong_args())
    }

    /// Next argument as raw bytes. Both `Simple` and `Bulk` frames carry strings.
    pub(crate) fn next_bytes(&mut self) -> Result<Bytes, CommandError> {
        match self.next()? {
            Frame::Simple(s) => Ok(Bytes::from(s)),
            Frame::Bulk(bytes) => Ok(bytes),
            frame => Err(CommandError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: frame,
            }),
        }
    }

    /// Next argument as a base-10 signed 64 bit integer.
    pub(crate) fn next_integer(&mut self) -> Result<i64, CommandError> {
        match self.next()? {
            Frame::Integer(i) => Ok(i),
            Frame::Simple(s) => s.parse::<i64>().map_err(|_| CommandError::NotInteger),
            Frame::Bulk(bytes) => str::from_utf8(&bytes[..])
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or(CommandError::NotInteger),
            frame => Err(CommandError::InvalidFrame {
                expected: "integer".to_string(),
                actual: frame,
            }),
        }
    }

    /// Next argument uppercased, for matching keywords such as `NX`. `None` once all arguments
    /// have been consumed.
    pub(crate) fn next_option(&mut self) -> Result<Option<String>, CommandError> {
        if self.remaining() == 0 {
            return Ok(None);
        }

        let bytes = self.next_bytes()?;
        Ok(Some(String::from_utf8_lossy(&bytes).to_uppercase()))
    }

    pub(crate) fn remaining(&self) -> usize {
        self.parts.len()
    }

    pub(crate) fn wrong_args(&self) -> CommandError {
        CommandError::WrongArgs {
            command: self.command.to_lowercase(),
        }
    }
}

/// Errors a command reports back to the client. They never end the session.
#[derive(Debug, ThisError, PartialEq)]
pub enum CommandError {
    #[error("ERR wrong number of arguments for '{command}' command")]
    WrongArgs { command: String },
    #[error("ERR value is not an integer or out of range")]
    NotInteger,
    #[error("ERR unknown command '{command}'")]
    UnknownCommand { command: String },
    #[error("ERR syntax error")]
    SyntaxError,
    #[error("ERR offset is out of range")]
    OffsetOutOfRange,
    #[error("ERR bit offset is not an integer or out of range")]
    BitOffsetOutOfRange,
    #[error("ERR bit is not an integer or out of range")]
    BitValue,
    #[error("ERR no such key")]
    NoSuchKey,
    #[error("ERR Protocol error: expected {expected}, got {actual}")]
    InvalidFrame { expected: String, actual: Frame },
    #[error("ERR {0}")]
    Persistence(String),
}

impl From<NotAnInteger> for CommandError {
    fn from(_: NotAnInteger) -> Self {
        CommandError::NotInteger
    }
}

impl From<SnapshotError> for CommandError {
    fn from(err: SnapshotError) -> Self {
        CommandError::Persistence(err.to_string())
    }
}
