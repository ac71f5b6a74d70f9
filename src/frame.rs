// https://redis.io/docs/reference/protocol-spec

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::io;

use bytes::Buf;
use bytes::Bytes;
use std::io::Cursor;
use std::string::FromUtf8Error;
use thiserror::Error as ThisError;

static CRLF: &[u8; 2] = b"\r\n";

/// Aggregates nested deeper than this are rejected before they can exhaust the stack.
const MAX_NESTING_DEPTH: usize = 512;

/// Upper bound on the slots reserved up front for an aggregate, larger ones grow as they parse.
const MAX_PREALLOCATED_ELEMENTS: usize = 1024;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("not enough data is available to parse an entire frame")]
    Incomplete,
    /// The leading byte is not a known type tag. Only that byte was consumed.
    #[error("invalid frame data type '{}'", char::from(*.0))]
    InvalidDataType(u8),
    #[error("invalid frame input: {0}")]
    InvalidInput(String),
    #[error("invalid frame length: {0}")]
    InvalidLength(i64),
    /// Invalid message encoding.
    #[error("{0}")]
    Other(crate::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Double(f64),
    /// Arbitrary precision integer, kept as its validated decimal representation.
    BigNumber(String),
    Boolean(bool),
    Bulk(Bytes),
    /// RESP2 null bulk string (`$-1`), used by commands to signal an absent value.
    NullBulkString,
    BulkError(String),
    Verbatim(Bytes),
    Array(Vec<Frame>),
    /// RESP2 null array (`*-1`).
    NullArray,
    Set(Vec<Frame>),
    Null,
}

// Protocol specification: https://redis.io/docs/reference/protocol-spec/
impl Frame {
    /// Decodes a single frame starting at the cursor position, leaving the cursor right after it.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        Self::parse_nested(src, 0)
    }

    fn parse_nested(src: &mut Cursor<&[u8]>, depth: usize) -> Result<Self, Error> {
        // The first byte in an RESP-serialized payload always identifies its type.
        // Subsequent bytes constitute the type's contents.
        let first_byte = get_byte(src)?;
        let data_type = DataType::try_from(first_byte)?;

        match data_type {
            DataType::SimpleString => {
                let string = get_line_string(src)?;
                Ok(Frame::Simple(string))
            }
            DataType::SimpleError => {
                let string = get_line_string(src)?;
                Ok(Frame::Error(string))
            }
            DataType::Integer => {
                let line = get_line(src)?;
                let integer = parse_integer(&line)?;
                Ok(Frame::Integer(integer))
            }
            // ,<floating-point-number>\r\n
            DataType::Double => {
                let string = get_line_string(src)?;
                let double = string
                    .parse::<f64>()
                    .map_err(|_| Error::InvalidInput(format!("invalid double {:?}", string)))?;
                Ok(Frame::Double(double))
            }
            // ([+|-]<number>\r\n
            DataType::BigNumber => {
                let string = get_line_string(src)?;
                let digits = string
                    .strip_prefix(['+', '-'])
                    .unwrap_or(string.as_str());

                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(Error::InvalidInput(format!(
                        "invalid big number {:?}",
                        string
                    )));
                }

                Ok(Frame::BigNumber(string))
            }
            // #<t|f>\r\n
            DataType::Boolean => {
                let line = get_line(src)?;
                match &line[..] {
                    b"t" => Ok(Frame::Boolean(true)),
                    b"f" => Ok(Frame::Boolean(false)),
                    other => Err(Error::InvalidInput(format!(
                        "invalid boolean {:?}",
                        String::from_utf8_lossy(other)
                    ))),
                }
            }
            // $<length>\r\n<data>\r\n
            DataType::BulkString => match get_bulk(src)? {
                Some(data) => Ok(Frame::Bulk(Bytes::copy_from_slice(data))),
                None => Ok(Frame::NullBulkString),
            },
            // =<length>\r\n<encoding>:<data>\r\n
            DataType::VerbatimString => match get_bulk(src)? {
                Some(data) => Ok(Frame::Verbatim(Bytes::copy_from_slice(data))),
                None => Ok(Frame::NullBulkString),
            },
            // !<length>\r\n<error>\r\n
            DataType::BulkError => match get_bulk(src)? {
                Some(msg) => {
                    let msg = String::from_utf8(msg.to_vec())?;
                    Ok(Frame::BulkError(msg))
                }
                // NOTE: the protocol does not specify a way to represent a null bulk error
                None => Ok(Frame::NullBulkString),
            },
            // *<number-of-elements>\r\n<element-1>...<element-n>
            DataType::Array => {
                let length = get_length(src)?;

                if length == -1 {
                    return Ok(Frame::NullArray);
                }
                if length < 0 {
                    return Err(Error::InvalidLength(length));
                }
                check_depth(depth)?;

                let mut frames = Vec::with_capacity(preallocated(length));
                for _ in 0..length {
                    let frame = Self::parse_nested(src, depth + 1)?;
                    frames.push(frame);
                }

                Ok(Frame::Array(frames))
            }
            // ~<number-of-elements>\r\n<element-1>...<element-n>
            DataType::Set => {
                let length = get_length(src)?;

                if length < 0 {
                    return Err(Error::InvalidLength(length));
                }
                check_depth(depth)?;

                let mut members = SetBuilder::with_capacity(preallocated(length));
                for _ in 0..length {
                    members.insert(Self::parse_nested(src, depth + 1)?);
                }

                Ok(Frame::Set(members.frames))
            }
            // _\r\n
            DataType::Null => {
                let line = get_line(src)?;
                if !line.is_empty() {
                    return Err(Error::InvalidInput("null frame with payload".to_string()));
                }

                Ok(Frame::Null)
            }
        }
    }

    /// Decodes the first frame of `src`, returning it along with the number of bytes it took.
    pub fn decode(src: &[u8]) -> Result<(Self, usize), Error> {
        let mut cursor = Cursor::new(src);
        let frame = Self::parse(&mut cursor)?;

        Ok((frame, cursor.position() as usize))
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes);
        bytes
    }

    fn write_to(&self, dst: &mut Vec<u8>) {
        match self {
            Frame::Simple(s) => write_line(dst, DataType::SimpleString, s.as_bytes()),
            Frame::Error(s) => write_line(dst, DataType::SimpleError, s.as_bytes()),
            Frame::Integer(i) => write_line(dst, DataType::Integer, i.to_string().as_bytes()),
            Frame::Double(d) => write_line(dst, DataType::Double, format_double(*d).as_bytes()),
            Frame::BigNumber(n) => write_line(dst, DataType::BigNumber, n.as_bytes()),
            Frame::Boolean(b) => {
                write_line(dst, DataType::Boolean, if *b { b"t" } else { b"f" })
            }
            Frame::Bulk(bytes) => write_bulk(dst, DataType::BulkString, bytes),
            Frame::NullBulkString => write_line(dst, DataType::BulkString, b"-1"),
            Frame::BulkError(s) => write_bulk(dst, DataType::BulkError, s.as_bytes()),
            Frame::Verbatim(bytes) => write_bulk(dst, DataType::VerbatimString, bytes),
            Frame::Array(arr) => {
                write_line(dst, DataType::Array, arr.len().to_string().as_bytes());
                for frame in arr {
                    frame.write_to(dst);
                }
            }
            Frame::NullArray => write_line(dst, DataType::Array, b"-1"),
            Frame::Set(set) => {
                write_line(dst, DataType::Set, set.len().to_string().as_bytes());
                for frame in set {
                    frame.write_to(dst);
                }
            }
            Frame::Null => write_line(dst, DataType::Null, b""),
        }
    }

    /// Builds a set frame, dropping repeated members while keeping the first occurrence order.
    pub fn set(members: impl IntoIterator<Item = Frame>) -> Frame {
        let mut set = SetBuilder::with_capacity(0);
        for member in members {
            set.insert(member);
        }
        Frame::Set(set.frames)
    }
}

fn check_depth(depth: usize) -> Result<(), Error> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(Error::InvalidInput(format!(
            "aggregates nested deeper than {} levels",
            MAX_NESTING_DEPTH
        )));
    }
    Ok(())
}

// The declared length is untrusted.
fn preallocated(length: i64) -> usize {
    usize::try_from(length)
        .unwrap_or(0)
        .min(MAX_PREALLOCATED_ELEMENTS)
}

/// Collects set members in arrival order. Members are compared by their wire encoding, frames hold
/// doubles and cannot be hashed directly.
struct SetBuilder {
    frames: Vec<Frame>,
    seen: HashSet<Vec<u8>>,
}

impl SetBuilder {
    fn with_capacity(capacity: usize) -> Self {
        SetBuilder {
            frames: Vec::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    fn insert(&mut self, frame: Frame) {
        if self.seen.insert(frame.serialize()) {
            self.frames.push(frame);
        }
    }
}

impl From<Frame> for Vec<u8> {
    fn from(frame: Frame) -> Self {
        frame.serialize()
    }
}

// Human readable form used in logs, binary payloads are rendered lossily.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "+{}", s),
            Frame::Error(s) => write!(f, "-{}", s),
            Frame::Integer(i) => write!(f, ":{}", i),
            Frame::Double(d) => write!(f, ",{}", format_double(*d)),
            Frame::BigNumber(n) => write!(f, "({}", n),
            Frame::Boolean(b) => write!(f, "#{}", if *b { "t" } else { "f" }),
            Frame::Bulk(bytes) => write!(f, "${}", String::from_utf8_lossy(bytes)),
            Frame::NullBulkString => write!(f, "$-1"),
            Frame::BulkError(s) => write!(f, "!{}", s),
            Frame::Verbatim(bytes) => write!(f, "={}", String::from_utf8_lossy(bytes)),
            Frame::Array(arr) => {
                write!(f, "*{}\r\n", arr.len())?;
                for frame in arr {
                    write!(f, "{}\r\n", frame)?;
                }
                Ok(())
            }
            Frame::NullArray => write!(f, "*-1"),
            Frame::Set(set) => {
                write!(f, "~{}\r\n", set.len())?;
                for frame in set {
                    write!(f, "{}\r\n", frame)?;
                }
                Ok(())
            }
            Frame::Null => write!(f, "_"),
        }
    }
}

fn write_line(dst: &mut Vec<u8>, data_type: DataType, payload: &[u8]) {
    dst.reserve(1 + payload.len() + CRLF.len());
    dst.push(u8::from(data_type));
    dst.extend_from_slice(payload);
    dst.extend_from_slice(CRLF);
}

fn write_bulk(dst: &mut Vec<u8>, data_type: DataType, payload: &[u8]) {
    write_line(dst, data_type, payload.len().to_string().as_bytes());
    dst.reserve(payload.len() + CRLF.len());
    dst.extend_from_slice(payload);
    dst.extend_from_slice(CRLF);
}

fn format_double(double: f64) -> String {
    if double.is_nan() {
        "nan".to_string()
    } else if double.is_infinite() {
        if double.is_sign_positive() {
            "inf".to_string()
        } else {
            "-inf".to_string()
        }
    } else {
        double.to_string()
    }
}

/// Reads up to the next `\n`. Carriage returns are not data and are dropped, so both `\r\n` and a
/// lone `\n` terminate a line.
fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<Cow<'a, [u8]>, Error> {
    let buf: &'a [u8] = *src.get_ref();
    let start = src.position() as usize;

    let line_end = buf
        .get(start..)
        .and_then(|rest| rest.iter().position(|&b| b == b'\n'))
        .map(|index| start + index)
        .ok_or(Error::Incomplete)?;

    src.set_position((line_end + 1) as u64);

    let line = &buf[start..line_end];
    if line.contains(&b'\r') {
        Ok(Cow::Owned(
            line.iter().copied().filter(|&b| b != b'\r').collect(),
        ))
    } else {
        Ok(Cow::Borrowed(line))
    }
}

fn get_line_string(src: &mut Cursor<&[u8]>) -> Result<String, Error> {
    let line = get_line(src)?;
    Ok(String::from_utf8(line.into_owned())?)
}

fn get_length(src: &mut Cursor<&[u8]>) -> Result<i64, Error> {
    let line = get_line(src)?;
    parse_integer(&line)
}

fn parse_integer(line: &[u8]) -> Result<i64, Error> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            Error::InvalidInput(format!(
                "invalid integer {:?}",
                String::from_utf8_lossy(line)
            ))
        })
}

/// Reads a length prefixed payload. `None` is the `-1` length, the absent value.
fn get_bulk<'a>(src: &mut Cursor<&'a [u8]>) -> Result<Option<&'a [u8]>, Error> {
    let length = get_length(src)?;

    if length == -1 {
        return Ok(None);
    }
    if length < 0 {
        return Err(Error::InvalidLength(length));
    }

    let buf: &'a [u8] = *src.get_ref();
    let start = src.position() as usize;
    let end = usize::try_from(length)
        .ok()
        .and_then(|length| start.checked_add(length))
        .ok_or(Error::InvalidLength(length))?;

    // The payload is taken verbatim, only the bytes after it must be a terminator.
    let next = match buf.get(end) {
        Some(b'\n') => end + 1,
        Some(b'\r') => match buf.get(end + 1) {
            Some(b'\n') => end + 2,
            Some(_) => {
                return Err(Error::InvalidInput(
                    "bulk payload is not followed by CRLF".to_string(),
                ))
            }
            None => return Err(Error::Incomplete),
        },
        Some(_) => {
            return Err(Error::InvalidInput(
                "bulk payload is not followed by CRLF".to_string(),
            ))
        }
        None => return Err(Error::Incomplete),
    };

    src.set_position(next as u64);

    Ok(Some(&buf[start..end]))
}

fn get_byte(src: &mut Cursor<&[u8]>) -> Result<u8, Error> {
    if !src.has_remaining() {
        return Err(Error::Incomplete);
    }
    Ok(src.get_u8())
}

#[derive(Debug)]
enum DataType {
    SimpleString,   // '+'
    BulkString,     // '$'
    VerbatimString, // '='
    SimpleError,    // '-'
    BulkError,      // '!'
    Boolean,        // '#'
    Integer,        // ':'
    Double,         // ','
    BigNumber,      // '('
    Array,          // '*'
    Set,            // '~'
    // Due to historical reasons, RESP2 features two specially crafted values for representing null
    // values of bulk strings and arrays. This duality has always been a redundancy that added zero
    // semantical value to the protocol itself. The null type, introduced in RESP3, aims to fix
    // this wrong.
    Null, // '_'
}

impl TryFrom<u8> for DataType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b'+' => Ok(Self::SimpleString),
            b'-' => Ok(Self::SimpleError),
            b':' => Ok(Self::Integer),
            b'$' => Ok(Self::BulkString),
            b'!' => Ok(Self::BulkError),
            b'*' => Ok(Self::Array),
            b'_' => Ok(Self::Null),
            b'#' => Ok(Self::Boolean),
            b',' => Ok(Self::Double),
            b'(' => Ok(Self::BigNumber),
            b'=' => Ok(Self::VerbatimString),
            b'~' => Ok(Self::Set),
            _ => Err(Error::InvalidDataType(byte)),
        }
    }
}

impl From<DataType> for u8 {
    fn from(value: DataType) -> Self {
        match value {
            DataType::SimpleString => b'+',
            DataType::SimpleError => b'-',
            DataType::Integer => b':',
            DataType::BulkString => b'$',
            DataType::BulkError => b'!',
            DataType::Array => b'*',
            DataType::Null => b'_',
            DataType::Boolean => b'#',
            DataType::Double => b',',
            DataType::BigNumber => b'(',
            DataType::VerbatimString => b'=',
            DataType::Set => b'~',
        }
    }
}

impl From<FromUtf8Error> for Error {
    fn from(_src: FromUtf8Error) -> Error {
        "protocol error; invalid frame format".into()
    }
}

impl From<&str> for Error {
    fn from(src: &str) -> Error {
        src.to_string().into()
    }
}

impl From<String> for Error {
    fn from(src: String) -> Error {
        Error::Other(src.into())
    }
}
