//! Terminal rendering of formatter output.
//!
//! Only the handful of tags the formatter emits are understood. Anything
//! else that looks like a tag is shown literally, as is a tag cut off at
//! the end of a partial stream.

use ratatui::style::{Modifier, Style};
use ratatui::text::Span;

use super::text::sanitize_terminal_text;
use super::ThemePalette;

const RULE_WIDTH: usize = 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Block {
    Plain,
    DiscussionBadge,
    SolutionBadge,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tag {
    Break,
    Rule,
    StrongOpen,
    StrongClose,
    HeadingOpen(u8),
    HeadingClose,
    DivOpen(Block),
    DivClose,
}

fn parse_tag(inner: &str) -> Option<Tag> {
    match inner {
        "br" => return Some(Tag::Break),
        "hr" => return Some(Tag::Rule),
        "strong" => return Some(Tag::StrongOpen),
        "/strong" => return Some(Tag::StrongClose),
        "h2" => return Some(Tag::HeadingOpen(2)),
        "h3" => return Some(Tag::HeadingOpen(3)),
        "/h2" | "/h3" => return Some(Tag::HeadingClose),
        "/div" => return Some(Tag::DivClose),
        _ => {}
    }
    let class = inner.strip_prefix("div class=\"")?.strip_suffix('"')?;
    let block = if class.contains("scenario-discussion") {
        Block::DiscussionBadge
    } else if class.contains("scenario-solution") {
        Block::SolutionBadge
    } else if class.split_whitespace().any(|c| c == "error") {
        Block::Error
    } else {
        Block::Plain
    };
    Some(Tag::DivOpen(block))
}

struct LineBuilder {
    palette: ThemePalette,
    lines: Vec<Vec<Span<'static>>>,
    current: Vec<Span<'static>>,
    buf: String,
    strong: bool,
    heading: Option<u8>,
    block: Block,
}

impl LineBuilder {
    fn new(palette: ThemePalette) -> Self {
        Self {
            palette,
            lines: Vec::new(),
            current: Vec::new(),
            buf: String::new(),
            strong: false,
            heading: None,
            block: Block::Plain,
        }
    }

    fn style(&self) -> Style {
        let p = self.palette;
        let mut style = match self.block {
            Block::Plain => p.body_style(),
            Block::DiscussionBadge => Style::default()
                .fg(p.discussion_badge_fg)
                .bg(p.discussion_badge_bg)
                .add_modifier(Modifier::BOLD),
            Block::SolutionBadge => Style::default()
                .fg(p.solution_badge_fg)
                .bg(p.solution_badge_bg)
                .add_modifier(Modifier::BOLD),
            Block::Error => p.error_style(),
        };
        match self.heading {
            Some(2) => {
                style = style
                    .fg(p.heading)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            }
            Some(_) => style = style.fg(p.heading).add_modifier(Modifier::BOLD),
            None => {}
        }
        if self.strong {
            style = style.add_modifier(Modifier::BOLD);
        }
        style
    }

    fn flush_text(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let text = sanitize_terminal_text(&std::mem::take(&mut self.buf));
        if text.is_empty() {
            return;
        }
        let text = match self.block {
            Block::DiscussionBadge | Block::SolutionBadge => format!(" {text} "),
            _ => text,
        };
        let style = self.style();
        self.current.push(Span::styled(text, style));
    }

    fn end_line(&mut self) {
        self.flush_text();
        self.lines.push(std::mem::take(&mut self.current));
    }

    /// Start a block element on its own row.
    fn open_row(&mut self) {
        self.flush_text();
        if !self.current.is_empty() {
            self.lines.push(std::mem::take(&mut self.current));
        }
    }

    fn apply(&mut self, tag: Tag) {
        match tag {
            Tag::Break => self.end_line(),
            Tag::Rule => {
                self.open_row();
                self.lines.push(vec![Span::styled(
                    "─".repeat(RULE_WIDTH),
                    Style::default().fg(self.palette.rule),
                )]);
            }
            Tag::StrongOpen | Tag::StrongClose => {
                self.flush_text();
                self.strong = matches!(tag, Tag::StrongOpen);
            }
            Tag::HeadingOpen(level) => {
                self.open_row();
                self.heading = Some(level);
            }
            Tag::HeadingClose => {
                self.end_line();
                self.heading = None;
            }
            Tag::DivOpen(block) => {
                self.open_row();
                self.block = block;
            }
            Tag::DivClose => {
                self.end_line();
                self.block = Block::Plain;
            }
        }
    }

    fn finish(mut self) -> Vec<Vec<Span<'static>>> {
        self.flush_text();
        if !self.current.is_empty() {
            self.lines.push(self.current);
        }
        self.lines
    }
}

/// Convert formatter html into styled rows.
pub(super) fn html_to_lines(html: &str, palette: ThemePalette) -> Vec<Vec<Span<'static>>> {
    let mut builder = LineBuilder::new(palette);
    let mut rest = html;
    while let Some(lt) = rest.find('<') {
        builder.buf.push_str(&rest[..lt]);
        let tail = &rest[lt..];
        let Some(gt) = tail.find('>') else {
            builder.buf.push_str(tail);
            rest = "";
            break;
        };
        match parse_tag(&tail[1..gt]) {
            Some(tag) => {
                builder.apply(tag);
                rest = &tail[gt + 1..];
            }
            None => {
                builder.buf.push('<');
                rest = &tail[1..];
            }
        }
    }
    builder.buf.push_str(rest);
    builder.finish()
}

/// Plain text of a row.
#[cfg(test)]
pub(super) fn plain(row: &[Span<'static>]) -> String {
    row.iter().map(|s| s.content.as_ref()).collect()
}
