//! Request/response execution.
//!
//! One command, one reply, synchronously: [`Connection::execute_command`] writes the
//! command and then blocks until exactly one reply has been read. Commands issued one
//! after another on the same link are sent and answered in that order.
//!
//! [`Connection::write_request`] and [`Connection::read_response`] expose the two
//! halves for callers that batch their own writes. Neither half ever repeats the
//! other.
use std::io::{Read, Write};

use log::trace;

use crate::{
    codec::{Codec, CodecError},
    connection::Connection,
    error::Result,
    transport::{Transport, TransportFactory},
};

impl<F: TransportFactory, C: Codec> Connection<F, C> {
    /// Sends `command` and reads its reply, connecting first when disconnected.
    pub fn execute_command(&mut self, command: &C::Command) -> Result<C::Response> {
        self.write_request(command)?;
        self.read_response(command)
    }

    /// Sends `command` without reading anything back.
    pub fn write_request(&mut self, command: &C::Command) -> Result<()> {
        let (codec, transport) = self.split()?;
        match send(codec, transport, command) {
            Ok(()) => {
                trace!("sent `{}` to {}", self.codec().command_name(command), self);
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Reads the reply to a command that was already sent.
    pub fn read_response(&mut self, command: &C::Command) -> Result<C::Response> {
        let (codec, transport) = self.split()?;
        match codec.decode(command, transport.reader()) {
            Ok(response) => {
                trace!("read reply to `{}` from {}", self.codec().command_name(command), self);
                Ok(response)
            }
            Err(err) => Err(self.fail(err)),
        }
    }
}

/// Writes `command` and reads one reply on a transport not yet owned by a link.
pub(crate) fn exchange<C: Codec, S: Read + Write>(
    codec: &mut C,
    transport: &mut Transport<S>,
    command: &C::Command,
) -> std::result::Result<C::Response, CodecError> {
    send(codec, transport, command)?;
    codec.decode(command, transport.reader())
}

fn send<C: Codec, S: Read + Write>(
    codec: &mut C,
    transport: &mut Transport<S>,
    command: &C::Command,
) -> std::result::Result<(), CodecError> {
    let writer = transport.writer();
    codec.encode(command, &mut *writer)?;
    writer.flush()?;
    Ok(())
}
