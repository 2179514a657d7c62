//! Connection lifecycle core for a blocking key-value store client.
//!
//! A [`Connection`] manages one logical link to a server over TCP or a Unix-domain
//! socket: it creates the transport lazily, replays queued init commands on every new
//! transport, runs strict one-command-one-reply exchanges through a [`Codec`], and
//! turns transport and protocol failures into errors that name the link.
pub mod cli;
pub mod codec;
pub mod connection;
pub mod error;
pub mod executor;
pub mod parameters;
pub mod policy;
pub mod snapshot;
pub mod transport;

#[cfg(test)]
mod mock;

pub use codec::{
    Codec, CodecError,
    binary::BinaryCodec,
    resp::{RespCodec, RespCommand, RespValue},
};
pub use connection::Connection;
pub use error::{
    CommunicationError, ConfigurationError, ConnectionError, LinkError, ProtocolError, Result,
};
pub use parameters::{ConnectionParameters, RawParameters, Scheme};
pub use policy::{Disposition, ErrorPolicy, LogAndSuppress, RaisePolicy, SharedPolicy};
pub use snapshot::{Snapshot, SnapshotError};
#[cfg(unix)]
pub use transport::UnixFactory;
pub use transport::{SchemeFactory, SchemeStream, TcpFactory, Transport, TransportFactory};
