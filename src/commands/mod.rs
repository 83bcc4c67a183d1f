pub mod del;
pub mod executable;
pub mod get;
pub mod ping;
pub mod set;
pub mod unknown;

use bytes::Bytes;
use std::vec;
use thiserror::Error as ThisError;
use tracing::debug;

use crate::commands::executable::Executable;
use crate::frame::Frame;
use crate::store::Store;

use del::Del;
use get::Get;
use ping::Ping;
use set::Set;
use unknown::Unknown;

#[derive(Debug, PartialEq)]
pub enum Command {
    Del(Del),
    Get(Get),
    Set(Set),

    Ping(Ping),
    Unknown(Unknown),
}

impl Executable for Command {
    fn exec(self, store: Store) -> Frame {
        match self {
            Command::Del(cmd) => cmd.exec(store),
            Command::Get(cmd) => cmd.exec(store),
            Command::Ping(cmd) => cmd.exec(store),
            Command::Set(cmd) => cmd.exec(store),
            Command::Unknown(cmd) => cmd.exec(store),
        }
    }
}

impl TryFrom<Frame> for Command {
    type Error = CommandParserError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        // Clients send commands to the Redis server as RESP arrays.
        let frames = match frame {
            Frame::Array(array) => array,
            _ => return Err(CommandParserError::InvalidInput),
        };

        let mut frames = frames.into_iter();
        let command_name = match frames.next() {
            Some(Frame::Simple(s)) => s.to_lowercase(),
            Some(Frame::Bulk(bytes)) => String::from_utf8_lossy(&bytes).to_lowercase(),
            _ => return Err(CommandParserError::InvalidInput),
        };

        // Only string arguments are considered, anything else is skipped. A null bulk string
        // is still a bulk argument and reads as empty.
        let args: Vec<Bytes> = frames
            .filter_map(|frame| match frame {
                Frame::Simple(s) => Some(Bytes::from(s)),
                Frame::Bulk(bytes) => Some(bytes),
                Frame::Null => Some(Bytes::new()),
                _ => None,
            })
            .collect();

        let parser = &mut CommandParser {
            parts: args.into_iter(),
        };

        match &command_name[..] {
            "del" => Del::try_from(parser).map(Command::Del),
            "get" => Get::try_from(parser).map(Command::Get),
            "ping" => Ping::try_from(parser).map(Command::Ping),
            "set" => Set::try_from(parser).map(Command::Set),
            _ => Ok(Command::Unknown(Unknown { name: command_name })),
        }
    }
}

/// Turns one request frame into its response frame. Malformed requests are answered with an
/// error frame; they never fail the connection.
pub fn dispatch(frame: Frame, store: Store) -> Frame {
    match Command::try_from(frame) {
        Ok(cmd) => {
            debug!(?cmd, "executing command");
            cmd.exec(store)
        }
        Err(err) => {
            debug!(%err, "rejected command");
            err.into()
        }
    }
}

pub struct CommandParser {
    parts: vec::IntoIter<Bytes>,
}

impl CommandParser {
    fn remaining(&self) -> usize {
        self.parts.len()
    }

    fn next_bytes(&mut self, command: &'static str) -> Result<Bytes, CommandParserError> {
        self.parts
            .next()
            .ok_or(CommandParserError::WrongArity { command })
    }
}

#[derive(Debug, ThisError, PartialEq)]
pub enum CommandParserError {
    #[error("invalid input")]
    InvalidInput,
    #[error("ERR wrong number of arguments for '{command}' command")]
    WrongArity { command: &'static str },
}

impl From<CommandParserError> for Frame {
    fn from(err: CommandParserError) -> Frame {
        Frame::Error(err.to_string())
    }
}
