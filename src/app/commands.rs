use super::*;
use crossbeam_channel::unbounded;

impl App {
    pub(super) fn submit_current_line(&mut self) {
        match router::on_submit(&self.composer, &self.sessions) {
            SessionCommand::Start(submission) => self.start_session(submission),
            SessionCommand::Ignore => {
                if self.is_busy() {
                    self.last_status = "translation running, Esc to cancel".to_string();
                }
            }
        }
    }

    /// Append the user bubble and a streaming agent message, then hand the
    /// request to a worker thread.
    pub(super) fn start_session(&mut self, submission: Submission) {
        let cancel = match self.sessions.begin() {
            Ok(handle) => handle,
            Err(err) => {
                warn!(error = %err, "submission refused");
                self.last_status = err.to_string();
                return;
            }
        };
        let session = cancel.session();
        let Submission {
            direction,
            content,
            mention,
        } = submission;

        self.chat_started = true;
        self.messages.push(Message::User {
            mention,
            content: content.clone(),
        });
        self.messages
            .push(Message::Agent(AgentMessage::new(session, direction)));
        self.composer.set_text(String::new());
        self.composer.mention_menu_open = false;
        self.autoscroll = true;

        let (tx, rx) = unbounded::<SessionEvent>();
        self.rx = Some(rx);
        let transport = Arc::clone(&self.transport);
        let request = TranslateRequest { content, direction };
        std::thread::spawn(move || {
            run_session(transport.as_ref(), &request, &cancel, &tx);
        });

        debug!(session, direction = direction.as_str(), "worker spawned");
        self.last_status = format!("{} translating", direction.meta().name);
        self.follow_scroll();
    }

    /// Stop the in-flight session. The agent message is marked cancelled
    /// right away; the worker notices the flag or the dropped receiver.
    pub(super) fn cancel_session(&mut self) -> bool {
        let Some(session) = self.sessions.cancel() else {
            return false;
        };
        self.rx = None;
        if let Some(msg) = self.agent_message_mut(session) {
            msg.cancel();
        }
        self.last_status = "cancelled".to_string();
        self.follow_scroll();
        true
    }
}
