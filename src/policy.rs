//! Error-handling policy.
//!
//! A link never decides on its own what happens to a transport or protocol failure.
//! It translates the failure into a [`CommunicationError`], resets itself, and hands
//! the error to an [`ErrorPolicy`] exactly once. The policy answers with a
//! [`Disposition`]:
//!
//! - [`Disposition::Raise`]: the failing operation returns the error.
//! - [`Disposition::Suppress`]: the error is not surfaced. `connect` returns `Ok(())`
//!   and leaves the link disconnected; operations that must deliver data return
//!   [`LinkError::Suppressed`](crate::LinkError::Suppressed) instead.
//!
//! Any `Fn(&CommunicationError) -> Disposition` closure is a policy.
use std::sync::Arc;

use log::warn;

use crate::error::CommunicationError;

/// What to do with a reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Raise,
    Suppress,
}

pub trait ErrorPolicy {
    fn dispose(&self, error: &CommunicationError) -> Disposition;
}

impl<F> ErrorPolicy for F
where
    F: Fn(&CommunicationError) -> Disposition,
{
    fn dispose(&self, error: &CommunicationError) -> Disposition {
        self(error)
    }
}

/// Policy shared between links of one client.
pub type SharedPolicy = Arc<dyn ErrorPolicy + Send + Sync>;

/// Raises every failure. Used when no policy is injected.
#[derive(Debug, Default, Clone, Copy)]
pub struct RaisePolicy;

impl ErrorPolicy for RaisePolicy {
    fn dispose(&self, _error: &CommunicationError) -> Disposition {
        Disposition::Raise
    }
}

/// Logs every failure and suppresses it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAndSuppress;

impl ErrorPolicy for LogAndSuppress {
    fn dispose(&self, error: &CommunicationError) -> Disposition {
        warn!("suppressed communication error: {error}");
        Disposition::Suppress
    }
}
