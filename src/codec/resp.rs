//! # RESP2 Codec
//!
//! Purpose: Encode commands as RESP2 arrays of bulk strings and parse one RESP2 reply
//! per command, reusing the codec's buffers across calls.
//!
//! ## Design Principles
//! 1. **State-Free Parsing**: Replies are parsed top-down with minimal state.
//! 2. **Buffer Reuse**: Line and output buffers live on the codec.
//! 3. **Binary-Safe**: Bulk strings are treated as raw bytes.
//! 4. **Fail Fast**: Invalid framing is a protocol error, a closed stream an IO error.
use std::io::{self, BufRead, Read, Write};

use bincode::{Decode, Encode};

use crate::parameters::ConnectionParameters;

use super::{Codec, CodecError};

/// Largest bulk string or array a reply may announce.
pub const MAX_REPLY_LEN: i64 = 512 * 1024 * 1024;
/// Deepest array nesting accepted in a reply.
pub const MAX_REPLY_DEPTH: usize = 64;

/// A command as a list of binary-safe arguments, name first.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct RespCommand {
    args: Vec<Vec<u8>>,
}

impl RespCommand {
    pub fn new(name: impl AsRef<[u8]>) -> Self {
        Self {
            args: vec![name.as_ref().to_vec()],
        }
    }

    pub fn arg(mut self, arg: impl AsRef<[u8]>) -> Self {
        self.args.push(arg.as_ref().to_vec());
        self
    }

    pub fn args(&self) -> &[Vec<u8>] {
        &self.args
    }

    /// Upper-cased command name.
    pub fn name(&self) -> String {
        self.args
            .first()
            .map(|name| String::from_utf8_lossy(name).to_ascii_uppercase())
            .unwrap_or_default()
    }

    /// Session setup implied by the parameters: `AUTH` then `SELECT`.
    pub fn handshake(parameters: &ConnectionParameters) -> Vec<RespCommand> {
        let mut commands = Vec::new();
        if let Some(password) = parameters.password() {
            let auth = match parameters.username() {
                Some(username) => RespCommand::new("AUTH").arg(username),
                None => RespCommand::new("AUTH"),
            };
            commands.push(auth.arg(password));
        }
        if let Some(database) = parameters.database() {
            commands.push(RespCommand::new("SELECT").arg(database.to_string()));
        }
        commands
    }
}

impl<T: AsRef<[u8]>> FromIterator<T> for RespCommand {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            args: iter.into_iter().map(|a| a.as_ref().to_vec()).collect(),
        }
    }
}

/// RESP reply value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// +OK or +PONG style replies.
    Simple(Vec<u8>),
    /// -ERR ... replies.
    Error(Vec<u8>),
    /// :123 replies.
    Integer(i64),
    /// $... bulk strings, with None for null.
    Bulk(Option<Vec<u8>>),
    /// *... arrays; a null array reads as empty.
    Array(Vec<RespValue>),
}

#[derive(Debug, Default)]
pub struct RespCodec {
    line: Vec<u8>,
    out: Vec<u8>,
}

impl Codec for RespCodec {
    type Command = RespCommand;
    type Response = RespValue;

    fn encode<W: Write>(&mut self, command: &RespCommand, out: &mut W) -> Result<(), CodecError> {
        self.out.clear();
        encode_command(&command.args, &mut self.out);
        out.write_all(&self.out)?;
        Ok(())
    }

    fn decode<R: BufRead>(
        &mut self,
        _command: &RespCommand,
        input: &mut R,
    ) -> Result<RespValue, CodecError> {
        read_value(input, &mut self.line, 0)
    }

    fn command_name(&self, command: &RespCommand) -> String {
        command.name()
    }

    fn rejection(&self, response: &RespValue) -> Option<String> {
        match response {
            RespValue::Error(message) => Some(String::from_utf8_lossy(message).into_owned()),
            _ => None,
        }
    }
}

/// Encodes a RESP2 array command into the provided buffer.
pub fn encode_command<A: AsRef<[u8]>>(args: &[A], out: &mut Vec<u8>) {
    out.push(b'*');
    out.extend_from_slice(args.len().to_string().as_bytes());
    out.extend_from_slice(b"\r\n");
    for arg in args {
        let arg = arg.as_ref();
        out.push(b'$');
        out.extend_from_slice(arg.len().to_string().as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
}

fn read_value<R: BufRead>(
    reader: &mut R,
    line: &mut Vec<u8>,
    depth: usize,
) -> Result<RespValue, CodecError> {
    if depth > MAX_REPLY_DEPTH {
        return Err(CodecError::Protocol(format!(
            "reply nested deeper than {MAX_REPLY_DEPTH} levels"
        )));
    }
    read_line(reader, line)?;
    let Some(&prefix) = line.first() else {
        return Err(CodecError::Protocol("empty reply line".into()));
    };

    match prefix {
        b'+' => Ok(RespValue::Simple(line[1..].to_vec())),
        b'-' => Ok(RespValue::Error(line[1..].to_vec())),
        b':' => Ok(RespValue::Integer(parse_i64(&line[1..])?)),
        b'$' => {
            let len = parse_len(&line[1..])?;
            read_bulk(reader, len)
        }
        b'*' => {
            let len = parse_len(&line[1..])?;
            let mut items = Vec::with_capacity(len.clamp(0, 1024) as usize);
            for _ in 0..len.max(0) {
                items.push(read_value(reader, line, depth + 1)?);
            }
            Ok(RespValue::Array(items))
        }
        other => Err(CodecError::Protocol(format!(
            "unknown reply prefix '{}'",
            other.escape_ascii()
        ))),
    }
}

fn read_bulk<R: BufRead>(reader: &mut R, len: i64) -> Result<RespValue, CodecError> {
    if len < 0 {
        return Ok(RespValue::Bulk(None));
    }
    let mut data = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut data)?;
    if data.len() as i64 != len {
        let closed = io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed by server");
        return Err(closed.into());
    }

    let mut crlf = [0u8; 2];
    reader.read_exact(&mut crlf)?;
    if crlf != *b"\r\n" {
        return Err(CodecError::Protocol("bulk string not terminated by CRLF".into()));
    }
    Ok(RespValue::Bulk(Some(data)))
}

fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> Result<(), CodecError> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        let closed = io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed by server");
        return Err(closed.into());
    }
    if !buf.ends_with(b"\r\n") {
        return Err(CodecError::Protocol("reply line not terminated by CRLF".into()));
    }
    buf.truncate(buf.len() - 2);
    Ok(())
}

/// Parses an announced length; negative means null.
fn parse_len(data: &[u8]) -> Result<i64, CodecError> {
    let len = parse_i64(data)?;
    if len > MAX_REPLY_LEN {
        return Err(CodecError::Protocol(format!(
            "announced length {len} exceeds {MAX_REPLY_LEN}"
        )));
    }
    Ok(len)
}

fn parse_i64(data: &[u8]) -> Result<i64, CodecError> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| CodecError::Protocol(format!("invalid integer '{}'", data.escape_ascii())))
}
