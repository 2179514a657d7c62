//! Binary request/response codec.
//!
//! Requests and responses are bincode-encoded enums with a big-endian, fixed-width
//! integer configuration, so every message is framed by its own encoding and needs
//! no length prefix. Decoding stops with a protocol error once a message would
//! exceed [`MAX_MESSAGE_SIZE`].
use std::io::{self, BufRead, Write};

use bincode::{
    Decode, Encode,
    config::{BigEndian, Configuration, Fixint, Limit},
    decode_from_std_read, encode_to_vec,
    error::{DecodeError, EncodeError},
};

use super::{Codec, CodecError};

/// Upper bound on the decoded size of a single message.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

type WireConfig = Configuration<BigEndian, Fixint, Limit<MAX_MESSAGE_SIZE>>;

#[derive(Debug, Clone, Encode, Decode, PartialEq, Eq)]
pub enum Request {
    Ping,
    Get {
        key: Vec<u8>,
    },
    Set {
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        key: Vec<u8>,
    },
    Select(u32),
    Auth {
        username: Option<String>,
        password: String,
    },
    CloseConnection,
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::Ping => "PING",
            Request::Get { .. } => "GET",
            Request::Set { .. } => "SET",
            Request::Delete { .. } => "DELETE",
            Request::Select(_) => "SELECT",
            Request::Auth { .. } => "AUTH",
            Request::CloseConnection => "CLOSE",
        }
    }
}

#[derive(Debug, Clone, Encode, Decode, PartialEq, Eq)]
pub enum Response {
    Ok,
    Pong,
    Value(Option<Vec<u8>>),
    Integer(i64),
    Err {
        code: ResponseError,
        description: String,
    },
    ConnectionClosed,
}

#[derive(Debug, Clone, Copy, Encode, Decode, PartialEq, Eq)]
pub enum ResponseError {
    Command,
    Auth,
    Read,
}

pub struct BinaryCodec {
    config: WireConfig,
}

impl Default for BinaryCodec {
    fn default() -> Self {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_fixed_int_encoding()
            .with_limit::<MAX_MESSAGE_SIZE>();
        Self { config }
    }
}

impl BinaryCodec {
    /// Writes a response; the serving side of the protocol.
    pub fn write_response<W: Write>(&self, resp: &Response, out: &mut W) -> Result<(), CodecError> {
        self.write_message(resp, out)
    }

    /// Reads a request; the serving side of the protocol.
    pub fn read_request<R: BufRead>(&self, input: &mut R) -> Result<Request, CodecError> {
        decode_from_std_read(input, self.config).map_err(decode_failure)
    }

    /// Encodes into memory first so a message goes out in one write.
    fn write_message<T: Encode, W: Write>(&self, msg: &T, out: &mut W) -> Result<(), CodecError> {
        let bytes = encode_to_vec(msg, self.config).map_err(encode_failure)?;
        out.write_all(&bytes)?;
        Ok(())
    }
}

impl Codec for BinaryCodec {
    type Command = Request;
    type Response = Response;

    fn encode<W: Write>(&mut self, command: &Request, out: &mut W) -> Result<(), CodecError> {
        self.write_message(command, out)
    }

    fn decode<R: BufRead>(
        &mut self,
        _command: &Request,
        input: &mut R,
    ) -> Result<Response, CodecError> {
        decode_from_std_read(input, self.config).map_err(decode_failure)
    }

    fn command_name(&self, command: &Request) -> String {
        command.name().to_string()
    }

    fn rejection(&self, response: &Response) -> Option<String> {
        match response {
            Response::Err { description, .. } => Some(description.clone()),
            _ => None,
        }
    }
}

fn encode_failure(err: EncodeError) -> CodecError {
    match err {
        EncodeError::Io { inner, .. } => CodecError::Io(inner),
        other => CodecError::Protocol(format!("failed to encode message: {other}")),
    }
}

fn decode_failure(err: DecodeError) -> CodecError {
    match err {
        DecodeError::Io { inner, .. } => CodecError::Io(inner),
        DecodeError::UnexpectedEnd { .. } => {
            let inner = io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed by server");
            CodecError::Io(inner)
        }
        other => CodecError::Protocol(format!("failed to decode message: {other}")),
    }
}
