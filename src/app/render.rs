use std::path::Path;

use super::markup::html_to_lines;
use super::text::sanitize_terminal_text;
use super::*;
use crate::session::Phase;

const TYPING_FRAMES: [&str; 4] = ["   ", ".  ", ".. ", "..."];
const CONTENT_INDENT: &str = "  ";
const CANCEL_HINT: &str = "  Esc 取消";

fn banner_card_outer_width(viewport_width: u16) -> usize {
    let max_outer = viewport_width.max(1) as usize;
    if max_outer >= 26 {
        max_outer.min(64)
    } else {
        max_outer
    }
}

fn truncate_display_width(text: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let cw = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + cw > max_width {
            break;
        }
        out.push(ch);
        used += cw;
    }
    out
}

fn fit_to_display_width(text: &str, width: usize) -> String {
    let mut fitted = truncate_display_width(text, width);
    let used = UnicodeWidthStr::width(fitted.as_str());
    if used < width {
        fitted.push_str(&" ".repeat(width - used));
    }
    fitted
}

fn spans_width(spans: &[Span<'static>]) -> usize {
    spans
        .iter()
        .map(|s| UnicodeWidthStr::width(s.content.as_ref()))
        .sum()
}

fn avatar_label(avatar: &str) -> String {
    Path::new(avatar)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl App {
    pub(super) fn render_transcript_lines(&self, width: u16) -> Vec<Line<'static>> {
        if !self.chat_started {
            return self.render_welcome_lines(width);
        }
        let mut lines = Vec::new();
        for message in &self.messages {
            match message {
                Message::User { mention, content } => {
                    self.push_user_lines(&mut lines, mention.as_deref(), content, width)
                }
                Message::Agent(msg) => self.push_agent_lines(&mut lines, msg, width),
            }
            lines.push(Line::from(""));
        }
        lines
    }

    fn render_welcome_lines(&self, width: u16) -> Vec<Line<'static>> {
        let p = self.palette;
        let mut rows: Vec<(String, Style)> = vec![
            ("PM ⇄ Dev 双向转译".to_string(), p.title_style()),
            (String::new(), p.muted_style()),
        ];
        for direction in Direction::all() {
            let meta = direction.meta();
            rows.push((
                format!("@{}  {}", meta.name, meta.title),
                p.agent_label_style(direction),
            ));
        }
        rows.push((String::new(), p.muted_style()));
        rows.push((
            "输入 @ 选择转译官，@pm / @dev 指定读者".to_string(),
            p.muted_style(),
        ));
        rows.push((
            "Enter send | Shift+Enter newline | F1/F2 agent | Esc cancel".to_string(),
            p.muted_style(),
        ));

        let border_style = p.panel_border_style();
        let outer = banner_card_outer_width(width);
        if outer < 6 {
            return rows
                .into_iter()
                .map(|(text, style)| Line::from(Span::styled(text, style)))
                .collect();
        }
        let inner = outer.saturating_sub(2);
        let content_width = inner.saturating_sub(2);
        let mut lines = vec![Line::from(vec![
            Span::styled("┌".to_string(), border_style),
            Span::styled("─".repeat(inner), border_style),
            Span::styled("┐".to_string(), border_style),
        ])];
        for (text, style) in rows {
            lines.push(Line::from(vec![
                Span::styled("│ ".to_string(), border_style),
                Span::styled(fit_to_display_width(&format!(" {text}"), content_width), style),
                Span::styled(" │".to_string(), border_style),
            ]));
        }
        lines.push(Line::from(vec![
            Span::styled("└".to_string(), border_style),
            Span::styled("─".repeat(inner), border_style),
            Span::styled("┘".to_string(), border_style),
        ]));
        lines
    }

    fn push_user_lines(
        &self,
        lines: &mut Vec<Line<'static>>,
        mention: Option<&str>,
        content: &str,
        width: u16,
    ) {
        let p = self.palette;
        let w = width as usize;
        let inner = w.saturating_sub(2).max(1);
        for (i, part) in content.split('\n').enumerate() {
            let mut spans = Vec::new();
            if i == 0 {
                if let Some(tag) = mention {
                    spans.push(Span::styled(
                        format!("{} ", sanitize_terminal_text(tag)),
                        p.mention_style(),
                    ));
                }
            }
            let text = sanitize_terminal_text(part);
            if !text.is_empty() {
                spans.push(Span::styled(text, p.user_style()));
            }
            for row in wrap_spans(spans, inner) {
                let used = spans_width(&row) + 1;
                let mut out = vec![Span::styled(" ", p.user_style())];
                out.extend(row);
                if used < w {
                    out.push(Span::styled(" ".repeat(w - used), p.user_style()));
                }
                lines.push(Line::from(out));
            }
        }
    }

    fn push_agent_lines(&self, lines: &mut Vec<Line<'static>>, msg: &AgentMessage, width: u16) {
        let p = self.palette;
        let meta = msg.direction().meta();
        let label_style = p.agent_label_style(msg.direction());

        lines.push(Line::from(vec![
            Span::styled("◉ ", label_style),
            Span::styled(meta.name.to_string(), label_style),
            Span::styled(format!("  {}", meta.title), p.secondary_style()),
            Span::styled(format!("  {}", avatar_label(meta.avatar)), p.muted_style()),
        ]));

        let mark = match msg.phase() {
            Phase::Failed => Span::styled(format!("{CONTENT_INDENT}✗ "), p.error_style()),
            Phase::Cancelled => Span::styled(format!("{CONTENT_INDENT}✓ "), p.muted_style()),
            Phase::Streaming | Phase::Done => Span::styled(
                format!("{CONTENT_INDENT}✓ "),
                Style::default().fg(p.check).add_modifier(Modifier::BOLD),
            ),
        };
        let mut status = vec![
            mark,
            Span::styled(msg.status_line().to_string(), p.status_style()),
        ];
        if msg.progress_visible() {
            let frame = TYPING_FRAMES[self.spinner_idx % TYPING_FRAMES.len()];
            status.push(Span::styled(format!(" {frame}"), label_style));
        }
        if msg.cancel_visible() {
            status.push(Span::styled(CANCEL_HINT, p.muted_style()));
        }
        lines.push(Line::from(status));

        let content_width = (width as usize).saturating_sub(CONTENT_INDENT.len());
        for row in html_to_lines(msg.html(), p) {
            for wrapped in wrap_spans(row, content_width) {
                let mut spans = vec![Span::raw(CONTENT_INDENT)];
                spans.extend(wrapped);
                lines.push(Line::from(spans));
            }
        }
    }
}

/// Pre-wrap a list of spans so that each resulting line fits within `max_width`
/// display columns. Returns a single-element vec with the original spans if no
/// wrapping is needed.
pub(super) fn wrap_spans(spans: Vec<Span<'static>>, max_width: usize) -> Vec<Vec<Span<'static>>> {
    if max_width == 0 {
        return vec![spans];
    }
    let mut result: Vec<Vec<Span<'static>>> = Vec::new();
    let mut current_line: Vec<Span<'static>> = Vec::new();
    let mut current_width: usize = 0;

    for span in spans {
        let span_width = UnicodeWidthStr::width(span.content.as_ref());
        if current_width + span_width <= max_width {
            current_width += span_width;
            current_line.push(span);
            continue;
        }
        let style = span.style;
        let text = span.content.into_owned();
        let mut remaining = text.as_str();
        while !remaining.is_empty() {
            let avail = max_width.saturating_sub(current_width);
            let mut split_byte = 0;
            let mut cols = 0usize;
            for (byte_idx, ch) in remaining.char_indices() {
                let w = UnicodeWidthChar::width(ch).unwrap_or(0);
                if cols + w > avail {
                    break;
                }
                cols += w;
                split_byte = byte_idx + ch.len_utf8();
            }
            if split_byte == 0 {
                if current_line.is_empty() {
                    // A glyph wider than the whole row; place it anyway.
                    let Some(ch) = remaining.chars().next() else {
                        break;
                    };
                    split_byte = ch.len_utf8();
                    cols = UnicodeWidthChar::width(ch).unwrap_or(1);
                } else {
                    result.push(std::mem::take(&mut current_line));
                    current_width = 0;
                    continue;
                }
            }
            current_line.push(Span::styled(remaining[..split_byte].to_string(), style));
            current_width += cols;
            remaining = &remaining[split_byte..];
            if !remaining.is_empty() {
                result.push(std::mem::take(&mut current_line));
                current_width = 0;
            }
        }
    }
    if !current_line.is_empty() {
        result.push(current_line);
    }
    if result.is_empty() {
        result.push(Vec::new());
    }
    result
}
