//! Mention parsing and agent selection.
//!
//! Everything here is a plain function over the composer and the session
//! manager; the `App` turns the returned values into view updates.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::direction::Direction;
use crate::session::SessionManager;

static LEADING_MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@([^\s]+)\s*").expect("leading mention pattern"));
static TRAILING_PARTIAL_MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[^\s]*$").expect("partial mention pattern"));

/// Text box state the router reads and rewrites.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Composer {
    pub(crate) input: String,
    /// Byte offset into `input`, always on a char boundary.
    pub(crate) cursor: usize,
    pub(crate) mention_menu_open: bool,
    pub(crate) focused: bool,
}

impl Composer {
    pub(crate) fn set_text(&mut self, text: String) {
        self.cursor = text.len();
        self.input = text;
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.input.trim().is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RouterAction {
    ShowMentionMenu,
    HideMentionMenu,
}

/// A submission after mention handling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Submission {
    pub(crate) direction: Direction,
    pub(crate) content: String,
    /// Display tag such as `@pm`, echoed in the transcript.
    pub(crate) mention: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SessionCommand {
    Start(Submission),
    Ignore,
}

fn canonical_mention(direction: Direction) -> String {
    format!("@{} ", direction.role_name())
}

/// True when the cursor sits inside an `@token` that has no whitespace yet.
pub(crate) fn detect_mention_trigger(text: &str, cursor: usize) -> bool {
    let cursor = cursor.min(text.len());
    let Some(before) = text.get(..cursor) else {
        return false;
    };
    match before.rfind('@') {
        Some(at) => !before[at..].chars().any(char::is_whitespace),
        None => false,
    }
}

/// Recompute the mention menu after any edit of the composer.
pub(crate) fn on_input_changed(composer: &mut Composer) -> RouterAction {
    let show = detect_mention_trigger(&composer.input, composer.cursor);
    composer.mention_menu_open = show;
    if show {
        RouterAction::ShowMentionMenu
    } else {
        RouterAction::HideMentionMenu
    }
}

/// Make `direction` the active agent. A blank composer, or one that still
/// only starts with a mention, is rewritten to the canonical prefix.
pub(crate) fn select_agent(
    sessions: &mut SessionManager,
    composer: &mut Composer,
    direction: Direction,
) -> RouterAction {
    sessions.set_active_direction(direction);
    debug!(direction = direction.as_str(), "agent selected");

    let current = composer.input.trim();
    if current.is_empty() || current.starts_with('@') {
        composer.set_text(canonical_mention(direction));
        composer.focused = true;
    }
    on_input_changed(composer)
}

/// Replace the partial `@token` before the cursor with the role's mention.
pub(crate) fn apply_mention(
    sessions: &mut SessionManager,
    composer: &mut Composer,
    direction: Direction,
) -> RouterAction {
    let cursor = composer.cursor.min(composer.input.len());
    let (before, after) = composer.input.split_at(cursor);
    let before = TRAILING_PARTIAL_MENTION_RE.replace(before, "");
    let spliced = format!("{before}{}", canonical_mention(direction));
    let new_cursor = spliced.len();
    composer.input = format!("{spliced}{after}");
    composer.cursor = new_cursor;
    composer.mention_menu_open = false;

    select_agent(sessions, composer, direction)
}

/// Strip a leading mention and decide the direction. `@pm` addresses the
/// product manager, so it routes `dev_to_pm`; `@dev` routes `pm_to_dev`.
/// Returns `None` for a blank submission.
pub(crate) fn resolve_submission(raw: &str, current: Direction) -> Option<Submission> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let Some(caps) = LEADING_MENTION_RE.captures(raw) else {
        return Some(Submission {
            direction: current,
            content: raw.to_string(),
            mention: None,
        });
    };

    let token = caps.get(1).map_or("", |m| m.as_str());
    let direction = match token {
        "pm" => Direction::DevToPm,
        "dev" => Direction::PmToDev,
        _ => current,
    };
    let consumed = caps.get(0).map_or(0, |m| m.end());
    Some(Submission {
        direction,
        content: raw[consumed..].to_string(),
        mention: Some(format!("@{token}")),
    })
}

/// Turn a submit key press into a command. Submission is disabled while a
/// session is in flight.
pub(crate) fn on_submit(composer: &Composer, sessions: &SessionManager) -> SessionCommand {
    if sessions.is_busy() {
        return SessionCommand::Ignore;
    }
    match resolve_submission(&composer.input, sessions.active_direction()) {
        Some(submission) => SessionCommand::Start(submission),
        None => SessionCommand::Ignore,
    }
}
