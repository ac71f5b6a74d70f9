use bytes::{Bytes, BytesMut};

use crate::commands::executable::Executable;
use crate::commands::getbit::{bit_at, bit_position, next_bit_offset};
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Sets or clears the bit at offset in the string value stored at key. The string is grown with
/// zero bytes to hold the bit. Returns the bit previously stored at offset.
///
/// Ref: <https://redis.io/docs/latest/commands/setbit/>
#[derive(Debug, PartialEq)]
pub struct Setbit {
    pub key: Bytes,
    pub offset: u64,
    pub bit: bool,
}

impl Executable for Setbit {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        let mut store = store.write();
        let current = store.get(&self.key).unwrap_or_default();

        let previous = bit_at(&current, self.offset);
        let (byte, mask) = bit_position(self.offset);

        let mut value = BytesMut::from(&current[..]);
        if value.len() <= byte {
            value.resize(byte + 1, 0);
        }

        if self.bit {
            value[byte] |= mask;
        } else {
            value[byte] &= !mask;
        }

        store.set(self.key, value.freeze());

        Ok(Frame::Integer(previous as i64))
    }
}

impl TryFrom<&mut CommandParser> for Setbit {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let offset = next_bit_offset(parser)?;

        let bit = match &parser.next_bytes()?[..] {
            b"0" => false,
            b"1" => true,
            _ => return Err(CommandError::BitValue),
        };

        Ok(Self { key, offset, bit })
    }
}
