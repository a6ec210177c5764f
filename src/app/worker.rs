use super::*;
use crossbeam_channel::TryRecvError;

use crate::session::SessionError;

impl App {
    /// Drain pending session events in order. Returns true if anything
    /// visible changed.
    pub(super) fn poll_worker(&mut self) -> bool {
        let Some(rx) = self.rx.clone() else {
            return false;
        };
        let mut changed = false;
        loop {
            match rx.try_recv() {
                Ok(event) => {
                    changed |= self.apply_session_event(event);
                    if self.rx.is_none() {
                        break;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // Worker went away without reporting; only a panic does that.
                    if let Some(session) = self.sessions.current_session() {
                        warn!(session, "worker exited without a terminal event");
                        changed |= self.finish_session(
                            session,
                            SessionOutcome::Failed(SessionError::Stream(
                                "translation worker stopped unexpectedly".to_string(),
                            )),
                        );
                    }
                    self.rx = None;
                    break;
                }
            }
        }
        if changed {
            self.follow_scroll();
        }
        changed
    }

    fn apply_session_event(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Rendered {
                session,
                chunk,
                html,
            } => {
                if self.sessions.current_session() != Some(session) {
                    return false;
                }
                self.agent_message_mut(session)
                    .is_some_and(|msg| msg.apply_render(&chunk, html))
            }
            SessionEvent::Finished { session, outcome } => self.finish_session(session, outcome),
        }
    }

    /// Apply the single terminal transition and re-enable submission.
    fn finish_session(&mut self, session: SessionId, outcome: SessionOutcome) -> bool {
        if !self.sessions.release(session) {
            return false;
        }
        self.rx = None;
        let Some(msg) = self.agent_message_mut(session) else {
            return false;
        };
        let applied = match &outcome {
            SessionOutcome::Done => msg.complete(),
            SessionOutcome::Cancelled => msg.cancel(),
            SessionOutcome::Failed(err) => msg.fail(&err.to_string()),
        };
        if let Some(text) = msg.error() {
            warn!(session, error = text, "translation failed");
        }
        debug!(session, bytes = msg.buffer().len(), "terminal state applied");
        self.last_status = match outcome {
            SessionOutcome::Done => "done".to_string(),
            SessionOutcome::Cancelled => "cancelled".to_string(),
            SessionOutcome::Failed(err) => format!("error: {}", crate::truncate(&err.to_string(), 60)),
        };
        applied
    }
}
