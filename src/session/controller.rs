use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use super::{CancelHandle, SessionError, SessionId};
use crate::formatter::format_markdown;
use crate::transport::{ReadStep, TranslateRequest, Transport};

#[derive(Debug)]
pub(crate) enum SessionEvent {
    /// One chunk arrived; `html` is the formatter output for the whole
    /// buffer including this chunk.
    Rendered {
        session: SessionId,
        chunk: String,
        html: String,
    },
    Finished {
        session: SessionId,
        outcome: SessionOutcome,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SessionOutcome {
    Done,
    Cancelled,
    Failed(SessionError),
}

/// Drive one session to its terminal outcome. Runs on a worker thread and
/// always ends with exactly one `Finished` event.
pub(crate) fn run_session(
    transport: &dyn Transport,
    request: &TranslateRequest,
    cancel: &CancelHandle,
    tx: &Sender<SessionEvent>,
) -> SessionOutcome {
    let session = cancel.session();
    info!(
        session,
        direction = request.direction.as_str(),
        chars = request.content.chars().count(),
        "translation requested"
    );

    let outcome = stream_reply(transport, request, cancel, tx);
    match &outcome {
        SessionOutcome::Done => info!(session, "translation finished"),
        SessionOutcome::Cancelled => info!(session, "translation cancelled"),
        SessionOutcome::Failed(err) => warn!(session, error = %err, "translation failed"),
    }

    let _ = tx.send(SessionEvent::Finished {
        session,
        outcome: outcome.clone(),
    });
    outcome
}

fn stream_reply(
    transport: &dyn Transport,
    request: &TranslateRequest,
    cancel: &CancelHandle,
    tx: &Sender<SessionEvent>,
) -> SessionOutcome {
    let session = cancel.session();
    if cancel.is_cancelled() {
        return SessionOutcome::Cancelled;
    }

    let mut source = match transport.open(request, cancel) {
        Ok(source) => source,
        Err(_) if cancel.is_cancelled() => return SessionOutcome::Cancelled,
        Err(err) => return SessionOutcome::Failed(err),
    };

    let mut buffer = String::new();
    let mut chunks = 0usize;
    loop {
        match source.read_step(cancel) {
            ReadStep::Chunk(chunk) => {
                if cancel.is_cancelled() {
                    return SessionOutcome::Cancelled;
                }
                chunks += 1;
                buffer.push_str(&chunk);
                let html = format_markdown(&buffer);
                debug!(session, chunks, bytes = buffer.len(), "chunk rendered");
                let event = SessionEvent::Rendered {
                    session,
                    chunk,
                    html,
                };
                if tx.send(event).is_err() {
                    // Nobody is listening any more.
                    return SessionOutcome::Cancelled;
                }
            }
            ReadStep::Done => return SessionOutcome::Done,
            ReadStep::Cancelled => return SessionOutcome::Cancelled,
            ReadStep::Failed(_) if cancel.is_cancelled() => return SessionOutcome::Cancelled,
            ReadStep::Failed(err) => return SessionOutcome::Failed(err),
        }
    }
}
