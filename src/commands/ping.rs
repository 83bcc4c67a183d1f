use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;

/// Returns PONG if no argument is provided, otherwise return a copy of the argument as a bulk.
///
/// Ref: <https://redis.io/docs/latest/commands/ping>
#[derive(Debug, PartialEq)]
pub struct Ping {
    pub payload: Option<Bytes>,
}

impl Executable for Ping {
    fn exec(self, _store: Store) -> Frame {
        self.payload
            .map_or(Frame::Simple("PONG".to_string()), Frame::Bulk)
    }
}

impl TryFrom<&mut CommandParser> for Ping {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let payload = match parser.remaining() {
            0 => None,
            1 => Some(parser.next_bytes("ping")?),
            _ => return Err(CommandParserError::WrongArity { command: "ping" }),
        };

        Ok(Self { payload })
    }
}
