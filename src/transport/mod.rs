use serde::Serialize;

use crate::direction::Direction;
use crate::session::{CancelHandle, SessionError};

mod decode;
#[cfg(test)]
pub(crate) mod fake;
mod http;
#[cfg(test)]
mod tests;

pub(crate) use http::HttpTransport;

/// Body of `POST /translate`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct TranslateRequest {
    pub(crate) content: String,
    pub(crate) direction: Direction,
}

/// Result of waiting for the next piece of the response body.
#[derive(Debug)]
pub(crate) enum ReadStep {
    Chunk(String),
    Done,
    Cancelled,
    Failed(SessionError),
}

/// An open response body.
pub(crate) trait ChunkSource: Send {
    fn read_step(&mut self, cancel: &CancelHandle) -> ReadStep;
}

/// Issues the request and hands back the body once the status is known
/// to be successful.
pub(crate) trait Transport: Send + Sync {
    fn open(
        &self,
        request: &TranslateRequest,
        cancel: &CancelHandle,
    ) -> Result<Box<dyn ChunkSource>, SessionError>;
}
