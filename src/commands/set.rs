use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;

/// Set `key` to hold the string `value`. If `key` already holds a value, it is overwritten.
/// Options after the value are not supported and are ignored.
///
/// Ref: <https://redis.io/docs/latest/commands/set/>
#[derive(Debug, PartialEq)]
pub struct Set {
    pub key: Bytes,
    pub value: Bytes,
}

impl Executable for Set {
    fn exec(self, store: Store) -> Frame {
        store.set(self.key, self.value);

        Frame::Simple("OK".to_string())
    }
}

impl TryFrom<&mut CommandParser> for Set {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes("set")?;
        let value = parser.next_bytes("set")?;

        Ok(Self { key, value })
    }
}
