use ratatui::layout::{Constraint, Layout};
use ratatui::widgets::{Block, BorderType, Borders, Padding};
use ratatui::Frame;

use super::*;

const PANEL_PADDING_X: u16 = 1;
const PANEL_PADDING_Y: u16 = 0;
const PANEL_HORIZONTAL_INSET: u16 = 2 + PANEL_PADDING_X * 2;
const PANEL_VERTICAL_INSET: u16 = 2 + PANEL_PADDING_Y * 2;
const INPUT_PLACEHOLDER: &str = "输入要转译的内容，Enter 发送，Shift+Enter 换行";

/// Row budget per section; shared by drawing and scroll math.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct SectionHeights {
    pub(super) agent_bar: u16,
    pub(super) transcript: u16,
    pub(super) menu: u16,
    pub(super) composer: u16,
    pub(super) status: u16,
}

pub(super) fn section_heights(app: &App, width: u16, height: u16) -> SectionHeights {
    let agent_bar = 1 + PANEL_VERTICAL_INSET;
    let status = 1 + PANEL_VERTICAL_INSET;
    let menu = if app.composer.mention_menu_open {
        Direction::all().len() as u16 + PANEL_VERTICAL_INSET
    } else {
        0
    };
    let fixed = agent_bar + status + menu;
    let composer_width = width.saturating_sub(PANEL_HORIZONTAL_INSET).max(1);
    let max_input_height = height.saturating_sub(fixed + 1).max(3);
    let composer = app
        .input_height(composer_width)
        .saturating_add(PANEL_VERTICAL_INSET)
        .min(max_input_height);
    SectionHeights {
        agent_bar,
        transcript: height.saturating_sub(fixed + composer),
        menu,
        composer,
        status,
    }
}

pub(super) fn draw(f: &mut Frame, app: &App) {
    let area = f.area();
    let theme = app.palette;
    let heights = section_heights(app, area.width, area.height);

    let mut constraints = vec![
        Constraint::Length(heights.agent_bar),
        Constraint::Length(heights.transcript),
    ];
    if heights.menu > 0 {
        constraints.push(Constraint::Length(heights.menu));
    }
    constraints.push(Constraint::Length(heights.composer));
    constraints.push(Constraint::Length(heights.status));
    let chunks = Layout::vertical(constraints).split(area);

    let mut section_idx = 0usize;
    let agent_chunk = chunks[section_idx];
    section_idx += 1;
    let transcript_chunk = chunks[section_idx];
    section_idx += 1;
    let menu_chunk = if heights.menu > 0 {
        let c = chunks[section_idx];
        section_idx += 1;
        Some(c)
    } else {
        None
    };
    let input_chunk = chunks[section_idx];
    section_idx += 1;
    let status_chunk = chunks[section_idx];

    let agent_bar = Paragraph::new(build_agent_bar(app, theme))
        .style(theme.panel_surface_style())
        .block(panel_block(theme, "agents"));
    f.render_widget(agent_bar, agent_chunk);

    let transcript = Paragraph::new(Text::from(app.cached_lines().to_vec()))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));
    f.render_widget(transcript, transcript_chunk);

    if let Some(area) = menu_chunk {
        let menu = Paragraph::new(Text::from(build_menu_lines(app, theme)))
            .style(theme.panel_surface_style())
            .block(panel_block(theme, "mention"));
        f.render_widget(menu, area);
    }

    let content_width = input_chunk
        .width
        .saturating_sub(PANEL_HORIZONTAL_INSET)
        .max(1);
    let content_height = input_chunk
        .height
        .saturating_sub(PANEL_VERTICAL_INSET)
        .max(1);
    let prompt_width = UnicodeWidthStr::width(PROMPT_PREFIX) as u16;
    let (cx, cy) = input_cursor_position(
        &app.composer.input,
        app.composer.cursor,
        content_width,
        prompt_width,
    );
    // Keep the cursor row inside the visible part of a tall composer.
    let input_scroll = cy.saturating_sub(content_height.saturating_sub(1));
    let submit_style = if app.submit_enabled() {
        theme.hint_selected_style()
    } else {
        theme.muted_style()
    };
    let input = Paragraph::new(Text::from(build_input_lines(app, theme)))
        .style(theme.input_surface_style())
        .block(
            panel_block(theme, "compose")
                .title(Line::from(Span::styled(" ⏎ 转译 ", submit_style)).right_aligned()),
        )
        .wrap(Wrap { trim: false })
        .scroll((input_scroll, 0));
    f.render_widget(input, input_chunk);

    let cursor_x = input_chunk.x + 1 + PANEL_PADDING_X + cx.min(content_width.saturating_sub(1));
    let cursor_y = input_chunk.y
        + 1
        + PANEL_PADDING_Y
        + cy.saturating_sub(input_scroll)
            .min(content_height.saturating_sub(1));
    if app.composer.focused {
        f.set_cursor_position((cursor_x, cursor_y));
    }

    let cancel_hint = if app.is_busy() { " | Esc cancel" } else { "" };
    let status = Paragraph::new(format!(
        "{} | {}{} | F1/F2 agent | Ctrl+T toggle | Ctrl+C exit",
        app.last_status,
        app.sessions.active_direction().meta().name,
        cancel_hint,
    ))
    .style(theme.status_style())
    .block(panel_block(theme, "status"));
    f.render_widget(status, status_chunk);
}

fn panel_block(theme: ThemePalette, title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme.panel_border_style())
        .title(Span::styled(format!(" {} ", title), theme.title_style()))
        .padding(Padding::new(
            PANEL_PADDING_X,
            PANEL_PADDING_X,
            PANEL_PADDING_Y,
            PANEL_PADDING_Y,
        ))
        .style(theme.panel_surface_style())
}

/// Both agents, exactly one marked active.
fn build_agent_bar(app: &App, theme: ThemePalette) -> Line<'static> {
    let active = app.sessions.active_direction();
    let mut spans = Vec::new();
    for (i, direction) in Direction::all().into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("   "));
        }
        let meta = direction.meta();
        spans.push(Span::styled(format!("F{} ", i + 1), theme.muted_style()));
        if direction == active {
            spans.push(Span::styled(
                format!("▸ {} {} ", meta.name, meta.title),
                theme.hint_selected_style(),
            ));
        } else {
            spans.push(Span::styled(
                format!("  {} {} ", meta.name, meta.title),
                Style::default().fg(theme.agent_color(direction)),
            ));
        }
    }
    Line::from(spans)
}

fn build_menu_lines(app: &App, theme: ThemePalette) -> Vec<Line<'static>> {
    Direction::all()
        .into_iter()
        .enumerate()
        .map(|(i, direction)| {
            let meta = direction.meta();
            let text = format!("@{}  {}", meta.name, meta.title);
            if i == app.menu_idx {
                Line::from(Span::styled(format!("> {text}"), theme.hint_selected_style()))
            } else {
                Line::from(Span::styled(format!("  {text}"), theme.body_style()))
            }
        })
        .collect()
}

fn build_input_lines(app: &App, theme: ThemePalette) -> Vec<Line<'static>> {
    let prompt_style = theme.prompt_style();
    if app.composer.input.is_empty() {
        return vec![Line::from(vec![
            Span::styled(PROMPT_PREFIX.to_string(), prompt_style),
            Span::styled(INPUT_PLACEHOLDER, theme.muted_style()),
        ])];
    }

    let indent = " ".repeat(PROMPT_PREFIX.chars().count());
    app.composer
        .input
        .split('\n')
        .enumerate()
        .map(|(idx, part)| {
            let lead = if idx == 0 {
                PROMPT_PREFIX.to_string()
            } else {
                indent.clone()
            };
            Line::from(vec![
                Span::styled(lead, prompt_style),
                Span::styled(part.to_string(), Style::default().fg(theme.input_text)),
            ])
        })
        .collect()
}
