//! Single-link connection state machine.
//!
//! A [`Connection`] owns the lifecycle of exactly one link to a server. It is either
//! disconnected (the initial state) or connected, and it is connected exactly when it
//! holds a [`Transport`]. A failed connect leaves it disconnected.
//!
//! # Responsibilities
//!
//! - Creating the transport lazily, on first access through [`Connection::resource`],
//!   or eagerly through [`Connection::connect`].
//! - Replaying queued init commands, in insertion order, on every new transport
//!   before anything else is sent on it.
//! - Translating transport and protocol failures into errors that carry the link's
//!   `<scheme>://<identifier>` and handing them to the injected
//!   [`ErrorPolicy`](crate::policy::ErrorPolicy).
//! - Releasing the transport when dropped.
//!
//! A connection is not meant to be shared between threads; it mutates its transport
//! and its init queue in place.
//!
//! # Example
//! ```rust,no_run
//! use keylink::{Connection, RespCodec, RespCommand, SchemeFactory};
//!
//! let params = "tcp://127.0.0.1:6379".parse().unwrap();
//! let mut conn = Connection::new(params, SchemeFactory, RespCodec::default());
//! conn.push_init_command(RespCommand::new("SELECT").arg("1"));
//!
//! let reply = conn.execute_command(&RespCommand::new("PING")).unwrap();
//! println!("{reply:?}");
//! ```
use std::{cell::OnceCell, fmt, sync::Arc};

use log::{debug, info};

use crate::{
    codec::{Codec, CodecError},
    error::{CommunicationError, ConnectionError, LinkError, ProtocolError, Result},
    executor::exchange,
    parameters::{ConnectionParameters, RawParameters},
    policy::{Disposition, RaisePolicy, SharedPolicy},
    transport::{Transport, TransportFactory},
};

pub struct Connection<F: TransportFactory, C: Codec> {
    parameters: ConnectionParameters,
    factory: F,
    codec: C,
    policy: SharedPolicy,
    resource: Option<Transport<F::Stream>>,
    label: OnceCell<String>,
    init_commands: Vec<C::Command>,
}

enum InitFailure {
    Codec(CodecError),
    Rejected { command: String, message: String },
}

impl From<CodecError> for InitFailure {
    fn from(value: CodecError) -> Self {
        InitFailure::Codec(value)
    }
}

impl<F: TransportFactory, C: Codec> Connection<F, C> {
    /// Creates a disconnected link that raises every failure.
    pub fn new(parameters: ConnectionParameters, factory: F, codec: C) -> Self {
        Self {
            parameters,
            factory,
            codec,
            policy: Arc::new(RaisePolicy),
            resource: None,
            label: OnceCell::new(),
            init_commands: Vec::new(),
        }
    }

    /// Validates `raw` and creates a disconnected link from it.
    pub fn from_raw(raw: RawParameters, factory: F, codec: C) -> Result<Self> {
        let parameters = ConnectionParameters::validate(raw)?;
        Ok(Self::new(parameters, factory, codec))
    }

    pub fn with_error_policy(mut self, policy: SharedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn set_error_policy(&mut self, policy: SharedPolicy) {
        self.policy = policy;
    }

    pub fn parameters(&self) -> &ConnectionParameters {
        &self.parameters
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn is_connected(&self) -> bool {
        self.resource.is_some()
    }

    /// Creates the transport and replays the init commands on it.
    ///
    /// # Errors
    /// - [`LinkError::AlreadyConnected`] if a transport is already held.
    /// - Whatever the error policy raises for a failed open or replay.
    pub fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(LinkError::AlreadyConnected {
                target: self.target(),
            });
        }

        match self.create_resource() {
            Ok(transport) => {
                self.resource = Some(transport);
                info!("connected to {}", self.target());
                Ok(())
            }
            Err(InitFailure::Codec(err)) => self.translate(err),
            Err(InitFailure::Rejected { command, message }) => {
                self.report_connection_error(format!("`{command}` failed: {message}"), None)
            }
        }
    }

    /// Releases the transport, if any. Never fails.
    pub fn disconnect(&mut self) {
        if self.resource.take().is_some() {
            debug!("disconnected from {}", self.target());
        }
    }

    /// Returns the transport, connecting first when disconnected.
    pub fn resource(&mut self) -> Result<&mut Transport<F::Stream>> {
        self.split().map(|(_, transport)| transport)
    }

    /// Queues a command to run on every new transport. Sends nothing by itself.
    pub fn push_init_command(&mut self, command: C::Command) {
        self.init_commands.push(command);
    }

    pub fn init_commands(&self) -> &[C::Command] {
        &self.init_commands
    }

    /// Socket path for `unix`, `host:port` otherwise.
    pub fn identifier(&self) -> String {
        self.parameters.identifier()
    }

    /// The identifier, computed once and kept for the link's lifetime.
    pub fn display_string(&self) -> &str {
        render(&self.label, &self.parameters)
    }

    /// `<scheme>://<identifier>`, as carried by errors.
    fn target(&self) -> String {
        target(&self.label, &self.parameters)
    }

    /// Reports a transport failure to the error policy.
    ///
    /// The link is reset first. Returns the error if the policy raises it.
    pub fn report_connection_error(
        &mut self,
        message: impl Into<String>,
        code: Option<i32>,
    ) -> Result<()> {
        let error = ConnectionError::new(message, code, self.target());
        self.report(error.into())
    }

    /// Reports a malformed or unexpected reply to the error policy.
    ///
    /// The link is reset first. Returns the error if the policy raises it.
    pub fn report_protocol_error(&mut self, message: impl Into<String>) -> Result<()> {
        let error = ProtocolError::new(message, self.target());
        self.report(error.into())
    }

    /// Codec and transport, borrowed together.
    pub(crate) fn split(&mut self) -> Result<(&mut C, &mut Transport<F::Stream>)> {
        if self.resource.is_none() {
            self.connect()?;
        }

        let Self {
            codec,
            resource,
            parameters,
            label,
            ..
        } = self;
        match resource.as_mut() {
            Some(transport) => Ok((codec, transport)),
            None => Err(LinkError::Suppressed {
                target: target(label, parameters),
            }),
        }
    }

    /// Translates a codec failure and reports it.
    pub(crate) fn translate(&mut self, err: CodecError) -> Result<()> {
        match err {
            CodecError::Io(e) => self.report_connection_error(e.to_string(), e.raw_os_error()),
            CodecError::Protocol(message) => self.report_protocol_error(message),
        }
    }

    /// Error to return from an operation that could not complete after a failure.
    pub(crate) fn fail(&mut self, err: CodecError) -> LinkError {
        match self.translate(err) {
            Err(e) => e,
            Ok(()) => LinkError::Suppressed {
                target: self.target(),
            },
        }
    }

    fn report(&mut self, error: CommunicationError) -> Result<()> {
        debug!("reporting {error}");
        self.disconnect();
        match self.policy.dispose(&error) {
            Disposition::Raise => Err(error.into()),
            Disposition::Suppress => Ok(()),
        }
    }

    fn create_resource(&mut self) -> std::result::Result<Transport<F::Stream>, InitFailure> {
        let stream = self.factory.open(&self.parameters).map_err(CodecError::from)?;
        let mut transport = Transport::new(stream);

        for command in &self.init_commands {
            debug!(
                "replaying `{}` on {}",
                self.codec.command_name(command),
                target(&self.label, &self.parameters)
            );
            let response = exchange(&mut self.codec, &mut transport, command)?;
            if let Some(message) = self.codec.rejection(&response) {
                return Err(InitFailure::Rejected {
                    command: self.codec.command_name(command),
                    message,
                });
            }
        }

        Ok(transport)
    }
}

fn render<'a>(label: &'a OnceCell<String>, parameters: &ConnectionParameters) -> &'a str {
    label.get_or_init(|| parameters.identifier())
}

fn target(label: &OnceCell<String>, parameters: &ConnectionParameters) -> String {
    format!("{}://{}", parameters.scheme(), render(label, parameters))
}

impl<F: TransportFactory, C: Codec> Drop for Connection<F, C> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl<F: TransportFactory, C: Codec> fmt::Display for Connection<F, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_string())
    }
}

impl<F: TransportFactory, C: Codec> fmt::Debug for Connection<F, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("target", &self.target())
            .field("connected", &self.is_connected())
            .field("init_commands", &self.init_commands.len())
            .finish_non_exhaustive()
    }
}
