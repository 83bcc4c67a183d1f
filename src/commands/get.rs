use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;

/// Get the value of `key`. If the key does not exist an empty bulk string is returned.
///
/// Ref: <https://redis.io/docs/latest/commands/get/>
#[derive(Debug, PartialEq)]
pub struct Get {
    pub key: Bytes,
}

impl Executable for Get {
    fn exec(self, store: Store) -> Frame {
        let value = store.get(&self.key).unwrap_or_default();
        Frame::Bulk(value)
    }
}

impl TryFrom<&mut CommandParser> for Get {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes("get")?;
        Ok(Self { key })
    }
}
