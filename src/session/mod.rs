//! One request/response cycle per accepted submission.

use thiserror::Error;

mod controller;
mod manager;
mod message;

pub(crate) use controller::{run_session, SessionEvent, SessionOutcome};
pub(crate) use manager::{CancelHandle, SessionId, SessionManager};
pub(crate) use message::{AgentMessage, Phase};
#[cfg(test)]
pub(crate) use message::{STATUS_CANCELLED, STATUS_PROCESSING};

/// Failures surfaced inline in an agent message. Cancellation is not an
/// error and is reported through [`SessionOutcome::Cancelled`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub(crate) enum SessionError {
    /// Non-2xx response; `message` is the server's detail or a fallback.
    #[error("{message}")]
    Http { status: u16, message: String },
    /// The request never produced a response.
    #[error("{0}")]
    Request(String),
    /// The body stream broke after the response started.
    #[error("{0}")]
    Stream(String),
    #[error("a translation is already in progress")]
    Busy,
}
