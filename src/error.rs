//! Error taxonomy for a single link.
//!
//! Every failure that leaves this crate carries the identity of the link it
//! happened on, rendered as `<scheme>://<identifier>`.
//!
//! # Overview
//!
//! - [`ConfigurationError`]: invalid or incomplete parameters, raised at construction.
//! - [`LinkError::AlreadyConnected`]: `connect` called on a connected link.
//! - [`ConnectionError`]: the transport could not be created or failed during use.
//! - [`ProtocolError`]: a reply could not be decoded or had the wrong shape.
//!
//! Connection and protocol errors are the two [`CommunicationError`] kinds that
//! get handed to the [`ErrorPolicy`](crate::policy::ErrorPolicy).
use thiserror::Error;

/// Invalid or incomplete connection parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("unsupported scheme '{0}', expected 'tcp' or 'unix'")]
    UnsupportedScheme(String),

    #[error("missing or empty path for 'unix' scheme")]
    MissingPath,

    #[error("invalid uri '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("invalid value '{value}' for option '{name}'")]
    InvalidOption { name: String, value: String },
}

/// The transport could not be created or failed while in use.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message} [{target}]")]
pub struct ConnectionError {
    message: String,
    code: Option<i32>,
    target: String,
}

impl ConnectionError {
    pub fn new(message: impl Into<String>, code: Option<i32>, target: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            target: target.into(),
        }
    }

    /// Message without the target suffix.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Numeric code, usually the raw OS error.
    pub fn code(&self) -> Option<i32> {
        self.code
    }

    /// `<scheme>://<identifier>` of the link at the moment of failure.
    pub fn target(&self) -> &str {
        &self.target
    }
}

/// A reply was malformed or did not match what the command expects.
///
/// The transport may still be healthy, but the session is out of step and is
/// reset before this error is reported.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message} [{target}]")]
pub struct ProtocolError {
    message: String,
    target: String,
}

impl ProtocolError {
    pub fn new(message: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            target: target.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

/// Failures handed to the error policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommunicationError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl CommunicationError {
    pub fn target(&self) -> &str {
        match self {
            CommunicationError::Connection(e) => e.target(),
            CommunicationError::Protocol(e) => e.target(),
        }
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, CommunicationError::Protocol(_))
    }
}

/// Errors surfaced by a [`Connection`](crate::Connection).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("connection to {target} is already established")]
    AlreadyConnected { target: String },

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The error policy suppressed the failure but the operation could not complete.
    #[error("failure on {target} was suppressed by the error policy")]
    Suppressed { target: String },
}

impl From<CommunicationError> for LinkError {
    fn from(value: CommunicationError) -> Self {
        match value {
            CommunicationError::Connection(e) => LinkError::Connection(e),
            CommunicationError::Protocol(e) => LinkError::Protocol(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
