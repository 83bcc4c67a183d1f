use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;

/// Removes `key`. Replies with the number of keys removed, 1 or 0. Only the first key argument
/// is honored.
///
/// Ref: <https://redis.io/commands/del>
#[derive(Debug, PartialEq)]
pub struct Del {
    pub key: Bytes,
}

impl Executable for Del {
    fn exec(self, store: Store) -> Frame {
        let removed = store.del(&self.key);
        Frame::Integer(i64::from(removed))
    }
}

impl TryFrom<&mut CommandParser> for Del {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes("del")?;
        Ok(Self { key })
    }
}
