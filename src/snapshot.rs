//! Link snapshots.
//!
//! A [`Snapshot`] captures what is needed to rebuild an equivalent link elsewhere:
//! its parameters and its init-command queue. The live transport is never part of
//! it; a restored link always starts disconnected and replays the queue on its
//! first connect.
//!
//! Decoded parameters go through the same validation as freshly built ones.
use bincode::{
    Decode, Encode,
    config::{BigEndian, Configuration, Fixint, Limit},
    decode_from_slice, encode_to_vec,
    error::{DecodeError, EncodeError},
};
use thiserror::Error;

use crate::{
    codec::Codec,
    connection::Connection,
    error::ConfigurationError,
    parameters::ConnectionParameters,
    transport::TransportFactory,
};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to encode snapshot: {0}")]
    Serialize(#[from] EncodeError),
    #[error("failed to decode snapshot: {0}")]
    Deserialize(#[from] DecodeError),
    #[error("snapshot holds invalid parameters: {0}")]
    Invalid(#[from] ConfigurationError),
}

/// Upper bound on the size of a decoded snapshot.
pub const MAX_SNAPSHOT_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Snapshot<T> {
    parameters: ConnectionParameters,
    init_commands: Vec<T>,
}

fn config() -> Configuration<BigEndian, Fixint, Limit<MAX_SNAPSHOT_SIZE>> {
    bincode::config::standard()
        .with_big_endian()
        .with_fixed_int_encoding()
        .with_limit::<MAX_SNAPSHOT_SIZE>()
}

impl<T> Snapshot<T> {
    pub fn new(parameters: ConnectionParameters, init_commands: Vec<T>) -> Self {
        Self {
            parameters,
            init_commands,
        }
    }

    pub fn parameters(&self) -> &ConnectionParameters {
        &self.parameters
    }

    pub fn init_commands(&self) -> &[T] {
        &self.init_commands
    }
}

impl<T: Encode> Snapshot<T> {
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(encode_to_vec(self, config())?)
    }
}

impl<T: Decode<()>> Snapshot<T> {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let (snapshot, _): (Self, usize) = decode_from_slice(bytes, config())?;
        Ok(Self {
            parameters: ConnectionParameters::validate(snapshot.parameters.into())?,
            init_commands: snapshot.init_commands,
        })
    }
}

impl<F: TransportFactory, C: Codec> Connection<F, C> {
    /// Captures the parameters and init queue of this link.
    pub fn snapshot(&self) -> Snapshot<C::Command>
    where
        C::Command: Clone,
    {
        Snapshot::new(self.parameters().clone(), self.init_commands().to_vec())
    }

    /// Builds a disconnected link equivalent to the one the snapshot was taken from.
    pub fn restore(snapshot: Snapshot<C::Command>, factory: F, codec: C) -> Self {
        let Snapshot {
            parameters,
            init_commands,
        } = snapshot;

        let mut conn = Connection::new(parameters, factory, codec);
        for command in init_commands {
            conn.push_init_command(command);
        }
        conn
    }
}
