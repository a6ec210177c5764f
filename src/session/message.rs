use super::SessionId;
use crate::direction::Direction;

pub(crate) const STATUS_PROCESSING: &str = "已处理 1 步";
pub(crate) const STATUS_CANCELLED: &str = "已取消生成";
const ERROR_PREFIX: &str = "发生错误: ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Streaming,
    Done,
    Failed,
    Cancelled,
}

impl Phase {
    pub(crate) fn is_terminal(self) -> bool {
        !matches!(self, Phase::Streaming)
    }
}

/// Reply being streamed into the transcript. Frozen once terminal.
#[derive(Clone, Debug)]
pub(crate) struct AgentMessage {
    session: SessionId,
    direction: Direction,
    phase: Phase,
    buffer: String,
    html: String,
    status_line: String,
    progress_visible: bool,
    cancel_visible: bool,
    error: Option<String>,
}

impl AgentMessage {
    pub(crate) fn new(session: SessionId, direction: Direction) -> Self {
        Self {
            session,
            direction,
            phase: Phase::Streaming,
            buffer: String::new(),
            html: String::new(),
            status_line: STATUS_PROCESSING.to_string(),
            progress_visible: true,
            cancel_visible: true,
            error: None,
        }
    }

    pub(crate) fn session(&self) -> SessionId {
        self.session
    }

    pub(crate) fn direction(&self) -> Direction {
        self.direction
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn buffer(&self) -> &str {
        &self.buffer
    }

    pub(crate) fn html(&self) -> &str {
        &self.html
    }

    pub(crate) fn status_line(&self) -> &str {
        &self.status_line
    }

    pub(crate) fn progress_visible(&self) -> bool {
        self.progress_visible
    }

    pub(crate) fn cancel_visible(&self) -> bool {
        self.cancel_visible
    }

    pub(crate) fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Append a chunk and take the html rendered from the whole buffer.
    pub(crate) fn apply_render(&mut self, chunk: &str, html: String) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        self.buffer.push_str(chunk);
        self.html = html;
        true
    }

    pub(crate) fn complete(&mut self) -> bool {
        self.finish(Phase::Done)
    }

    /// Replace the content with an error block.
    pub(crate) fn fail(&mut self, message: &str) -> bool {
        if !self.finish(Phase::Failed) {
            return false;
        }
        let text = format!("{ERROR_PREFIX}{message}");
        self.html = format!(r#"<div class="error">{text}</div>"#);
        self.error = Some(text);
        true
    }

    pub(crate) fn cancel(&mut self) -> bool {
        if !self.finish(Phase::Cancelled) {
            return false;
        }
        self.status_line = STATUS_CANCELLED.to_string();
        true
    }

    fn finish(&mut self, phase: Phase) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        self.phase = phase;
        self.progress_visible = false;
        self.cancel_visible = false;
        true
    }
}
