//! Scripted transports for controller and app tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use super::{ChunkSource, ReadStep, TranslateRequest, Transport};
use crate::session::{CancelHandle, SessionError};

enum Script {
    Steps(VecDeque<ReadStep>),
    Gated(Receiver<ReadStep>),
    Reject(SessionError),
}

/// Replays one script per `open` call and records every request.
pub(crate) struct FakeTransport {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<TranslateRequest>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_chunks(self, chunks: &[&str]) -> Self {
        let steps = chunks
            .iter()
            .map(|c| ReadStep::Chunk((*c).to_string()))
            .collect();
        self.push(Script::Steps(steps))
    }

    pub(crate) fn with_steps(self, steps: Vec<ReadStep>) -> Self {
        self.push(Script::Steps(steps.into()))
    }

    /// Steps are delivered only when the test sends them.
    pub(crate) fn with_gate(self, rx: Receiver<ReadStep>) -> Self {
        self.push(Script::Gated(rx))
    }

    pub(crate) fn rejecting(self, err: SessionError) -> Self {
        self.push(Script::Reject(err))
    }

    fn push(self, script: Script) -> Self {
        self.scripts.lock().unwrap().push_back(script);
        self
    }

    pub(crate) fn requests(&self) -> Vec<TranslateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    fn open(
        &self,
        request: &TranslateRequest,
        _cancel: &CancelHandle,
    ) -> Result<Box<dyn ChunkSource>, SessionError> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Script::Steps(VecDeque::new()));
        match script {
            Script::Steps(steps) => Ok(Box::new(ScriptedSource { steps })),
            Script::Gated(rx) => Ok(Box::new(GatedSource { rx })),
            Script::Reject(err) => Err(err),
        }
    }
}

struct ScriptedSource {
    steps: VecDeque<ReadStep>,
}

impl ChunkSource for ScriptedSource {
    fn read_step(&mut self, cancel: &CancelHandle) -> ReadStep {
        if cancel.is_cancelled() {
            return ReadStep::Cancelled;
        }
        self.steps.pop_front().unwrap_or(ReadStep::Done)
    }
}

struct GatedSource {
    rx: Receiver<ReadStep>,
}

impl ChunkSource for GatedSource {
    fn read_step(&mut self, cancel: &CancelHandle) -> ReadStep {
        loop {
            if cancel.is_cancelled() {
                return ReadStep::Cancelled;
            }
            match self.rx.recv_timeout(Duration::from_millis(5)) {
                Ok(step) => return step,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return ReadStep::Done,
            }
        }
    }
}
