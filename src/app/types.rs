use ratatui::style::{Color, Modifier, Style};

use crate::direction::Direction;
use crate::session::AgentMessage;

/// One transcript row group.
#[derive(Clone, Debug)]
pub(crate) enum Message {
    /// Immutable once pushed.
    User {
        mention: Option<String>,
        content: String,
    },
    Agent(AgentMessage),
}

#[derive(Clone, Copy)]
pub(crate) struct ThemePalette {
    pub(crate) prompt: Color,
    pub(crate) input_text: Color,
    pub(crate) muted_text: Color,
    pub(crate) highlight_fg: Color,
    pub(crate) highlight_bg: Color,
    pub(crate) status_text: Color,
    pub(crate) user_fg: Color,
    pub(crate) user_bg: Color,
    pub(crate) mention_fg: Color,
    pub(crate) pm_to_dev_label: Color,
    pub(crate) dev_to_pm_label: Color,
    pub(crate) body_text: Color,
    pub(crate) heading: Color,
    pub(crate) rule: Color,
    pub(crate) check: Color,
    pub(crate) discussion_badge_fg: Color,
    pub(crate) discussion_badge_bg: Color,
    pub(crate) solution_badge_fg: Color,
    pub(crate) solution_badge_bg: Color,
    pub(crate) error_text: Color,
    pub(crate) banner_title: Color,
    pub(crate) panel_bg: Color,
    pub(crate) panel_fg: Color,
}

pub(crate) fn default_palette() -> ThemePalette {
    // 深海蓝
    ThemePalette {
        prompt: Color::Rgb(100, 150, 200),
        input_text: Color::Rgb(180, 200, 220),
        muted_text: Color::Rgb(80, 100, 120),
        highlight_fg: Color::Rgb(200, 220, 240),
        highlight_bg: Color::Rgb(40, 60, 80),
        status_text: Color::Rgb(90, 110, 130),
        user_fg: Color::Rgb(200, 220, 240),
        user_bg: Color::Rgb(25, 35, 45),
        mention_fg: Color::Rgb(120, 180, 255),
        pm_to_dev_label: Color::Rgb(255, 127, 80),
        dev_to_pm_label: Color::Rgb(65, 105, 225),
        body_text: Color::Rgb(170, 190, 210),
        heading: Color::Rgb(150, 170, 190),
        rule: Color::Rgb(60, 80, 100),
        check: Color::Rgb(110, 190, 130),
        discussion_badge_fg: Color::Rgb(20, 30, 40),
        discussion_badge_bg: Color::Rgb(240, 190, 90),
        solution_badge_fg: Color::Rgb(20, 30, 40),
        solution_badge_bg: Color::Rgb(110, 190, 130),
        error_text: Color::Rgb(239, 68, 68),
        banner_title: Color::Rgb(150, 170, 190),
        panel_bg: Color::Rgb(10, 20, 30),
        panel_fg: Color::Rgb(170, 190, 210),
    }
}

impl ThemePalette {
    pub(crate) fn agent_color(self, direction: Direction) -> Color {
        match direction {
            Direction::PmToDev => self.pm_to_dev_label,
            Direction::DevToPm => self.dev_to_pm_label,
        }
    }

    pub(crate) fn agent_label_style(self, direction: Direction) -> Style {
        Style::default()
            .fg(self.agent_color(direction))
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn prompt_style(self) -> Style {
        Style::default()
            .fg(self.prompt)
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn title_style(self) -> Style {
        Style::default()
            .fg(self.banner_title)
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn body_style(self) -> Style {
        Style::default().fg(self.body_text)
    }

    pub(crate) fn secondary_style(self) -> Style {
        Style::default().fg(self.heading)
    }

    pub(crate) fn muted_style(self) -> Style {
        Style::default().fg(self.muted_text)
    }

    pub(crate) fn status_style(self) -> Style {
        Style::default().fg(self.status_text)
    }

    pub(crate) fn error_style(self) -> Style {
        Style::default()
            .fg(self.error_text)
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn mention_style(self) -> Style {
        Style::default()
            .fg(self.mention_fg)
            .bg(self.user_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn user_style(self) -> Style {
        Style::default().fg(self.user_fg).bg(self.user_bg)
    }

    pub(crate) fn panel_surface_style(self) -> Style {
        Style::default().bg(self.panel_bg).fg(self.panel_fg)
    }

    pub(crate) fn panel_border_style(self) -> Style {
        Style::default().fg(self.highlight_bg)
    }

    pub(crate) fn input_surface_style(self) -> Style {
        Style::default().fg(self.input_text)
    }

    pub(crate) fn hint_selected_style(self) -> Style {
        Style::default()
            .fg(self.highlight_fg)
            .bg(self.highlight_bg)
            .add_modifier(Modifier::BOLD)
    }
}
