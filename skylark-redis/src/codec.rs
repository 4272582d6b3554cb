//! RESP2 wire codec.
//!
//! Commands go out as arrays of bulk strings; replies come back as any
//! of the five RESP reply kinds. The decoder is incremental: a partial
//! frame leaves the read buffer untouched and waits for more bytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Replies larger than this indicate a confused peer, not feed data.
const MAX_BULK_SIZE: usize = 64 * 1024 * 1024;

/// One outbound command.
#[derive(Debug, Clone)]
pub struct Command {
    args: Vec<Bytes>,
}

impl Command {
    pub fn new(verb: &'static str) -> Self {
        Self {
            args: vec![Bytes::from_static(verb.as_bytes())],
        }
    }

    pub fn arg(mut self, arg: impl AsRef<[u8]>) -> Self {
        self.args.push(Bytes::copy_from_slice(arg.as_ref()));
        self
    }

    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    /// Space-joined argv for debug logging.
    pub fn render(&self) -> String {
        self.args
            .iter()
            .map(|arg| String::from_utf8_lossy(arg).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One parsed reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Simple(String),
    Error(String),
    Int(i64),
    Bulk(Bytes),
    Nil,
    Array(Vec<Reply>),
}

impl Reply {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Reply::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bulk(&self) -> Option<&Bytes> {
        match self {
            Reply::Bulk(bytes) => Some(bytes),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RespCodec;

impl Encoder<Command> for RespCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut header = itoa_line(b'*', item.args.len() as i64);
        dst.reserve(header.len() + item.args.iter().map(|a| a.len() + 16).sum::<usize>());
        dst.put_slice(&header);
        for arg in &item.args {
            header = itoa_line(b'$', arg.len() as i64);
            dst.put_slice(&header);
            dst.put_slice(arg);
            dst.put_slice(b"\r\n");
        }
        Ok(())
    }
}

impl Decoder for RespCodec {
    type Item = Reply;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match parse_reply(src.as_ref())? {
            Some((reply, consumed)) => {
                src.advance(consumed);
                Ok(Some(reply))
            }
            None => Ok(None),
        }
    }
}

fn itoa_line(prefix: u8, n: i64) -> Vec<u8> {
    let mut line = Vec::with_capacity(16);
    line.push(prefix);
    line.extend_from_slice(n.to_string().as_bytes());
    line.extend_from_slice(b"\r\n");
    line
}

/// Parse one reply from the front of `buf`. `None` means incomplete.
fn parse_reply(buf: &[u8]) -> io::Result<Option<(Reply, usize)>> {
    let Some((line, header_len)) = read_line(buf)? else {
        return Ok(None);
    };
    if line.is_empty() {
        return Err(protocol_error("empty reply line"));
    }
    let (kind, rest) = (line[0], &line[1..]);
    match kind {
        b'+' => Ok(Some((
            Reply::Simple(String::from_utf8_lossy(rest).into_owned()),
            header_len,
        ))),
        b'-' => Ok(Some((
            Reply::Error(String::from_utf8_lossy(rest).into_owned()),
            header_len,
        ))),
        b':' => {
            let n = parse_i64(rest)?;
            Ok(Some((Reply::Int(n), header_len)))
        }
        b'$' => {
            let len = parse_i64(rest)?;
            if len < 0 {
                return Ok(Some((Reply::Nil, header_len)));
            }
            let len = len as usize;
            if len > MAX_BULK_SIZE {
                return Err(protocol_error("bulk reply too large"));
            }
            let total = header_len + len + 2;
            if buf.len() < total {
                return Ok(None);
            }
            let payload = Bytes::copy_from_slice(&buf[header_len..header_len + len]);
            if &buf[header_len + len..total] != b"\r\n" {
                return Err(protocol_error("bulk reply missing terminator"));
            }
            Ok(Some((Reply::Bulk(payload), total)))
        }
        b'*' => {
            let len = parse_i64(rest)?;
            if len < 0 {
                return Ok(Some((Reply::Nil, header_len)));
            }
            let mut items = Vec::with_capacity(len as usize);
            let mut consumed = header_len;
            for _ in 0..len {
                let Some((item, item_len)) = parse_reply(&buf[consumed..])? else {
                    return Ok(None);
                };
                items.push(item);
                consumed += item_len;
            }
            Ok(Some((Reply::Array(items), consumed)))
        }
        other => Err(protocol_error(format!(
            "unknown reply type byte 0x{other:02x}"
        ))),
    }
}

/// One CRLF-terminated line, without the terminator. `None` if no CRLF
/// arrived yet; the returned length includes the terminator.
fn read_line(buf: &[u8]) -> io::Result<Option<(&[u8], usize)>> {
    match buf.windows(2).position(|window| window == b"\r\n") {
        Some(pos) => Ok(Some((&buf[..pos], pos + 2))),
        None => Ok(None),
    }
}

fn parse_i64(digits: &[u8]) -> io::Result<i64> {
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| protocol_error("malformed integer"))
}

fn protocol_error(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}
