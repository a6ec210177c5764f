use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use crossterm::event::{self, Event, KeyEventKind, MouseEventKind};
use ratatui::backend::CrosstermBackend;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::Terminal;
use tracing::{debug, warn};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::direction::Direction;
use crate::input_cursor_position;
use crate::router::{self, Composer, RouterAction, SessionCommand, Submission};
use crate::session::{
    run_session, AgentMessage, SessionEvent, SessionId, SessionManager, SessionOutcome,
};
use crate::transport::{TranslateRequest, Transport};

mod commands;
mod input;
mod markup;
mod render;
mod runtime;
mod text;
mod types;
mod ui;
mod worker;

pub(crate) use runtime::run_app;
use types::{default_palette, Message, ThemePalette};

const PROMPT_PREFIX: &str = "> ";

/// Cached rendering state to avoid recomputing transcript lines and scroll
/// bounds every frame.
struct RenderCache {
    /// Generation counter at the time of last cache build.
    generation: u64,
    width: u16,
    height: u16,
    lines: Vec<Line<'static>>,
    scroll_max: u16,
}

impl RenderCache {
    fn new() -> Self {
        Self {
            generation: u64::MAX, // force first rebuild
            width: 0,
            height: 0,
            lines: Vec::new(),
            scroll_max: 0,
        }
    }
}

struct App {
    transport: Arc<dyn Transport>,
    sessions: SessionManager,
    composer: Composer,
    should_quit: bool,
    spinner_idx: usize,
    /// Highlighted row of the mention menu, indexes `Direction::all()`.
    menu_idx: usize,

    messages: Vec<Message>,
    /// Flips on the first accepted submission and never back.
    chat_started: bool,
    scroll: u16,
    autoscroll: bool,
    viewport_width: u16,
    viewport_height: u16,

    rx: Option<Receiver<SessionEvent>>,
    palette: ThemePalette,
    last_status: String,

    /// Bumped whenever anything the transcript shows changes.
    render_generation: u64,
    render_cache: RenderCache,
}

impl App {
    fn new(transport: Arc<dyn Transport>, direction: Direction) -> Self {
        let mut app = Self {
            transport,
            sessions: SessionManager::new(direction),
            composer: Composer::default(),
            should_quit: false,
            spinner_idx: 0,
            menu_idx: 0,
            messages: Vec::new(),
            chat_started: false,
            scroll: 0,
            autoscroll: true,
            viewport_width: 120,
            viewport_height: 36,
            rx: None,
            palette: default_palette(),
            last_status: "ready".to_string(),
            render_generation: 0,
            render_cache: RenderCache::new(),
        };
        app.select_agent(direction);
        app
    }

    fn is_busy(&self) -> bool {
        self.sessions.is_busy()
    }

    /// Submit is offered only with something to send and nothing in flight.
    fn submit_enabled(&self) -> bool {
        !self.is_busy() && !self.composer.is_blank()
    }

    fn invalidate_render_cache(&mut self) {
        self.render_generation = self.render_generation.wrapping_add(1);
    }

    /// Invalidate the render cache and keep following the bottom if enabled.
    /// Call after any change to the transcript.
    fn follow_scroll(&mut self) {
        self.invalidate_render_cache();
        if self.autoscroll {
            self.scroll = self.scroll_max();
        } else {
            self.scroll = self.scroll.min(self.scroll_max());
        }
    }

    /// Returns true if the cache was rebuilt.
    fn ensure_render_cache(&mut self) -> bool {
        let need_rebuild = self.render_cache.generation != self.render_generation
            || self.render_cache.width != self.viewport_width
            || self.render_cache.height != self.viewport_height;
        if !need_rebuild {
            return false;
        }

        let w = self.viewport_width.max(1);
        let lines = self.render_transcript_lines(w);
        let available = ui::section_heights(self, w, self.viewport_height).transcript;
        let paragraph = Paragraph::new(Text::from(lines.clone())).wrap(Wrap { trim: false });
        let rendered_line_count = paragraph.line_count(w).min(u16::MAX as usize) as u16;
        let scroll_max = rendered_line_count.saturating_sub(available);

        self.render_cache = RenderCache {
            generation: self.render_generation,
            width: self.viewport_width,
            height: self.viewport_height,
            lines,
            scroll_max,
        };
        true
    }

    fn scroll_max(&mut self) -> u16 {
        self.ensure_render_cache();
        self.render_cache.scroll_max
    }

    fn cached_lines(&self) -> &[Line<'static>] {
        &self.render_cache.lines
    }

    fn update_viewport(&mut self, width: u16, height: u16) {
        self.viewport_width = width.max(1);
        self.viewport_height = height.max(1);
        let max_scroll = self.scroll_max();
        if self.autoscroll {
            self.scroll = max_scroll;
        } else {
            self.scroll = self.scroll.min(max_scroll);
        }
    }

    fn scroll_up(&mut self, n: u16) {
        let from = if self.autoscroll {
            self.scroll_max()
        } else {
            self.scroll
        };
        self.autoscroll = false;
        self.scroll = from.saturating_sub(n);
    }

    fn scroll_down(&mut self, n: u16) {
        let max_scroll = self.scroll_max();
        self.scroll = self.scroll.saturating_add(n).min(max_scroll);
        if self.scroll >= max_scroll {
            self.autoscroll = true;
        }
    }

    fn input_height(&self, width: u16) -> u16 {
        if self.composer.input.is_empty() {
            return 1;
        }
        let prompt_width = UnicodeWidthStr::width(PROMPT_PREFIX) as u16;
        let (_, end_y) = input_cursor_position(
            &self.composer.input,
            self.composer.input.len(),
            width,
            prompt_width,
        );
        end_y.saturating_add(1).max(1)
    }

    fn agent_message_mut(&mut self, session: SessionId) -> Option<&mut AgentMessage> {
        self.messages.iter_mut().rev().find_map(|m| match m {
            Message::Agent(msg) if msg.session() == session => Some(msg),
            _ => None,
        })
    }
}
