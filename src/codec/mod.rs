//! Wire codecs.
//!
//! A [`Codec`] turns commands into bytes on a writer and reads exactly one reply per
//! command back from a buffered reader. The link never looks inside commands or
//! replies; it only sequences the codec calls and translates their failures.
//!
//! # Key Components
//!
//! - [`resp`]: RESP2 arrays of bulk strings, as spoken by Redis-compatible servers.
//! - [`binary`]: bincode-framed requests and responses for the binary protocol.
//!
//! # Failures
//!
//! Codecs report [`CodecError::Io`] when the underlying stream fails and
//! [`CodecError::Protocol`] when the bytes read do not form a valid reply. The first
//! becomes a [`ConnectionError`](crate::ConnectionError), the second a
//! [`ProtocolError`](crate::ProtocolError).
use std::io::{self, BufRead, Write};

use thiserror::Error;

pub mod binary;
pub mod resp;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("{0}")]
    Protocol(String),
}

pub trait Codec {
    type Command;
    type Response;

    /// Serializes one command onto the writer.
    fn encode<W: Write>(&mut self, command: &Self::Command, out: &mut W) -> Result<(), CodecError>;

    /// Reads and decodes exactly one reply to `command`.
    fn decode<R: BufRead>(
        &mut self,
        command: &Self::Command,
        input: &mut R,
    ) -> Result<Self::Response, CodecError>;

    /// Short name of a command, used when an init command is rejected.
    fn command_name(&self, command: &Self::Command) -> String;

    /// Server-side error message carried by a reply, if any.
    fn rejection(&self, response: &Self::Response) -> Option<String>;
}
