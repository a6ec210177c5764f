use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, info};

use super::SessionError;
use crate::direction::Direction;

pub(crate) type SessionId = u64;

/// Cancellation shared between the UI and one worker. Blocking code polls
/// `is_cancelled`; async reads race against `cancelled`.
#[derive(Clone, Debug)]
pub(crate) struct CancelHandle {
    session: SessionId,
    token: CancellationToken,
}

impl CancelHandle {
    fn new(session: SessionId) -> Self {
        Self {
            session,
            token: CancellationToken::new(),
        }
    }

    pub(crate) fn session(&self) -> SessionId {
        self.session
    }

    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once `cancel` has been called on any clone.
    pub(crate) fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

/// Process-wide selection state: the active direction and the single
/// in-flight cancellation handle.
#[derive(Debug)]
pub(crate) struct SessionManager {
    active_direction: Direction,
    in_flight: Option<CancelHandle>,
    next_session: SessionId,
}

impl SessionManager {
    pub(crate) fn new(active_direction: Direction) -> Self {
        Self {
            active_direction,
            in_flight: None,
            next_session: 1,
        }
    }

    pub(crate) fn active_direction(&self) -> Direction {
        self.active_direction
    }

    pub(crate) fn set_active_direction(&mut self, direction: Direction) {
        self.active_direction = direction;
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub(crate) fn current_session(&self) -> Option<SessionId> {
        self.in_flight.as_ref().map(CancelHandle::session)
    }

    /// Allocate the handle for a new session. Refuses while one is held.
    pub(crate) fn begin(&mut self) -> Result<CancelHandle, SessionError> {
        if self.in_flight.is_some() {
            return Err(SessionError::Busy);
        }
        let handle = CancelHandle::new(self.next_session);
        self.next_session += 1;
        self.in_flight = Some(handle.clone());
        info!(session = handle.session(), "session started");
        Ok(handle)
    }

    /// Drop the handle if it still belongs to `session`.
    pub(crate) fn release(&mut self, session: SessionId) -> bool {
        if self.current_session() != Some(session) {
            return false;
        }
        self.in_flight = None;
        debug!(session, "session handle released");
        true
    }

    /// Signal and drop the in-flight handle. Returns the cancelled session.
    pub(crate) fn cancel(&mut self) -> Option<SessionId> {
        let handle = self.in_flight.take()?;
        handle.cancel();
        info!(session = handle.session(), "session cancelled");
        Some(handle.session())
    }
}
