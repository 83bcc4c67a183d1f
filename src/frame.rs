// https://redis.io/docs/reference/protocol-spec

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use thiserror::Error as ThisError;

static CRLF: &[u8; 2] = b"\r\n";

/// Arrays nested deeper than this are rejected instead of recursing further.
pub const MAX_NESTING_DEPTH: usize = 512;

#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum Error {
    #[error("protocol error; unknown type prefix {}", describe_prefix(.0))]
    UnknownTypePrefix(u8),
    #[error("protocol error; malformed integer {0:?}")]
    MalformedInteger(String),
    #[error("protocol error; malformed length {0:?}")]
    MalformedLength(String),
    #[error("protocol error; bulk string truncated, expected {expected} bytes, got {available}")]
    TruncatedBulkString { expected: usize, available: usize },
    #[error("protocol error; bulk string is not terminated by CRLF after {expected} bytes")]
    BulkLengthMismatch { expected: usize },
    #[error("protocol error; missing CRLF terminator")]
    MissingTerminator,
    #[error("protocol error; invalid UTF-8 string")]
    InvalidUtf8,
    #[error("protocol error; unexpected end of stream")]
    UnexpectedEof,
    #[error("protocol error; arrays nested deeper than {} levels", MAX_NESTING_DEPTH)]
    NestingTooDeep,
    #[error("protocol error; invalid array element at index {index}: {source}")]
    ArrayElement { index: usize, source: Box<Error> },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    /// The null bulk string, `$-1\r\n`.
    Null,
    Array(Vec<Frame>),
    /// The null array, `*-1\r\n`.
    NullArray,
}

/// Outcome of a single decode attempt over a buffered window.
#[derive(Debug, PartialEq)]
pub enum Decoded {
    /// A whole frame was decoded from the first `consumed` bytes.
    Complete { frame: Frame, consumed: usize },
    /// The window ends mid-frame. `truncation` is the error to report if the stream ends
    /// before more bytes arrive.
    NeedMoreData { truncation: Error },
    Fatal(Error),
}

enum Failure {
    Incomplete(Error),
    Fatal(Error),
}

impl Failure {
    fn map(self, f: impl FnOnce(Error) -> Error) -> Failure {
        match self {
            Failure::Incomplete(err) => Failure::Incomplete(f(err)),
            Failure::Fatal(err) => Failure::Fatal(f(err)),
        }
    }
}

// Protocol specification: https://redis.io/docs/reference/protocol-spec/
impl Frame {
    /// Attempts to decode one frame from the start of `buf`. Nothing is consumed unless the
    /// result is [`Decoded::Complete`].
    pub fn decode(buf: &[u8]) -> Decoded {
        let mut cursor = Cursor::new(buf);

        match Frame::parse(&mut cursor, 0) {
            Ok(frame) => Decoded::Complete {
                frame,
                consumed: cursor.position() as usize,
            },
            Err(Failure::Incomplete(truncation)) => Decoded::NeedMoreData { truncation },
            Err(Failure::Fatal(err)) => Decoded::Fatal(err),
        }
    }

    fn parse(src: &mut Cursor<&[u8]>, depth: usize) -> Result<Self, Failure> {
        // The first byte in an RESP-serialized payload always identifies its type.
        // Subsequent bytes constitute the type's contents.
        let first_byte = get_byte(src)?;
        let data_type = DataType::try_from(first_byte).map_err(Failure::Fatal)?;

        match data_type {
            DataType::SimpleString => {
                let line = get_line(src)?;
                Ok(Frame::Simple(to_string(line)?))
            }
            DataType::SimpleError => {
                let line = get_line(src)?;
                Ok(Frame::Error(to_string(line)?))
            }
            DataType::Integer => {
                let line = get_line(src)?;
                let integer = parse_i64(line)
                    .ok_or_else(|| Error::MalformedInteger(lossy(line)))
                    .map_err(Failure::Fatal)?;

                Ok(Frame::Integer(integer))
            }
            // $<length>\r\n<data>\r\n
            DataType::BulkString => {
                let line = get_line(src)?;
                let length = parse_length(line)?;

                // Any negative length denotes the null bulk string; there is no payload to read.
                if length < 0 {
                    return Ok(Frame::Null);
                }

                let data = get_bulk(src, length as usize)?;
                Ok(Frame::Bulk(Bytes::copy_from_slice(data)))
            }
            // *<number-of-elements>\r\n<element-1>...<element-n>
            DataType::Array => {
                let line = get_line(src)?;
                let length = parse_length(line)?;

                if length < 0 {
                    return Ok(Frame::NullArray);
                }

                if depth >= MAX_NESTING_DEPTH {
                    return Err(Failure::Fatal(Error::NestingTooDeep));
                }

                // Every element takes at least three bytes, so never trust the announced
                // length further than the buffered data allows.
                let length = length as usize;
                let mut frames = Vec::with_capacity(length.min(src.remaining() / 3));
                for index in 0..length {
                    let frame = Self::parse(src, depth + 1).map_err(|failure| {
                        failure.map(|source| Error::ArrayElement {
                            index,
                            source: Box::new(source),
                        })
                    })?;
                    frames.push(frame);
                }

                Ok(Frame::Array(frames))
            }
        }
    }

    /// Appends the wire encoding of this frame to `dst`.
    pub fn write_to(&self, dst: &mut BytesMut) {
        match self {
            Frame::Simple(s) => {
                dst.put_u8(u8::from(DataType::SimpleString));
                dst.put_slice(s.as_bytes());
                dst.put_slice(CRLF);
            }
            Frame::Error(s) => {
                dst.put_u8(u8::from(DataType::SimpleError));
                dst.put_slice(s.as_bytes());
                dst.put_slice(CRLF);
            }
            Frame::Integer(i) => {
                dst.put_u8(u8::from(DataType::Integer));
                dst.put_slice(i.to_string().as_bytes());
                dst.put_slice(CRLF);
            }
            Frame::Bulk(bytes) => {
                dst.put_u8(u8::from(DataType::BulkString));
                dst.put_slice(bytes.len().to_string().as_bytes());
                dst.put_slice(CRLF);
                dst.put_slice(bytes);
                dst.put_slice(CRLF);
            }
            Frame::Null => {
                dst.put_u8(u8::from(DataType::BulkString));
                dst.put_slice(b"-1");
                dst.put_slice(CRLF);
            }
            Frame::Array(arr) => {
                dst.put_u8(u8::from(DataType::Array));
                dst.put_slice(arr.len().to_string().as_bytes());
                dst.put_slice(CRLF);
                for frame in arr {
                    frame.write_to(dst);
                }
            }
            Frame::NullArray => {
                dst.put_u8(u8::from(DataType::Array));
                dst.put_slice(b"-1");
                dst.put_slice(CRLF);
            }
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = BytesMut::new();
        self.write_to(&mut bytes);
        bytes.to_vec()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "+{}", s),
            Frame::Error(s) => write!(f, "-{}", s),
            Frame::Integer(i) => write!(f, ":{}", i),
            Frame::Bulk(bytes) => write!(f, "${}", String::from_utf8_lossy(bytes)),
            Frame::Null => write!(f, "$-1"),
            Frame::Array(arr) => {
                write!(f, "*{}", arr.len())?;
                for frame in arr {
                    write!(f, " {}", frame)?;
                }
                Ok(())
            }
            Frame::NullArray => write!(f, "*-1"),
        }
    }
}

fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], Failure> {
    let start = src.position() as usize;
    let buf: &'a [u8] = *src.get_ref();

    let end = buf[start..]
        .windows(2)
        .position(|window| window == CRLF)
        .map(|index| start + index)
        .ok_or(Failure::Incomplete(Error::MissingTerminator))?;

    src.set_position((end + CRLF.len()) as u64);

    Ok(&buf[start..end])
}

fn get_bulk<'a>(src: &mut Cursor<&'a [u8]>, length: usize) -> Result<&'a [u8], Failure> {
    let start = src.position() as usize;
    let buf: &'a [u8] = *src.get_ref();
    let available = buf.len() - start;

    if available < length.saturating_add(CRLF.len()) {
        return Err(Failure::Incomplete(Error::TruncatedBulkString {
            expected: length,
            available: available.min(length),
        }));
    }

    let end = start + length;
    if &buf[end..end + CRLF.len()] != CRLF {
        return Err(Failure::Fatal(Error::BulkLengthMismatch { expected: length }));
    }

    src.set_position((end + CRLF.len()) as u64);

    Ok(&buf[start..end])
}

fn get_byte(src: &mut Cursor<&[u8]>) -> Result<u8, Failure> {
    if !src.has_remaining() {
        return Err(Failure::Incomplete(Error::UnexpectedEof));
    }
    Ok(src.get_u8())
}

fn parse_i64(line: &[u8]) -> Option<i64> {
    std::str::from_utf8(line).ok()?.parse::<i64>().ok()
}

fn parse_length(line: &[u8]) -> Result<i64, Failure> {
    parse_i64(line).ok_or_else(|| Failure::Fatal(Error::MalformedLength(lossy(line))))
}

fn to_string(line: &[u8]) -> Result<String, Failure> {
    String::from_utf8(line.to_vec()).map_err(|_| Failure::Fatal(Error::InvalidUtf8))
}

fn describe_prefix(byte: &u8) -> String {
    format!("'{}'", char::from(*byte).escape_default())
}

fn lossy(line: &[u8]) -> String {
    String::from_utf8_lossy(line).into_owned()
}

#[derive(Debug)]
enum DataType {
    SimpleString, // '+'
    SimpleError,  // '-'
    Integer,      // ':'
    BulkString,   // '$'
    Array,        // '*'
}

impl TryFrom<u8> for DataType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b'+' => Ok(Self::SimpleString),
            b'-' => Ok(Self::SimpleError),
            b':' => Ok(Self::Integer),
            b'$' => Ok(Self::BulkString),
            b'*' => Ok(Self::Array),
            _ => Err(Error::UnknownTypePrefix(byte)),
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
            DataType::Array => b'*',
        }
    }
}
