use std::io::Stdout;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{error, info};
use unicode_width::UnicodeWidthChar;

mod app;
mod config;
mod direction;
mod formatter;
mod logging;
mod router;
mod session;
mod transport;

use config::CliAction;
use transport::HttpTransport;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let action = match config::from_args(&args[1..], |key| std::env::var(key).ok()) {
        Ok(action) => action,
        Err(err) => {
            eprintln!("{err}");
            eprintln!("{}", config::USAGE);
            std::process::exit(2);
        }
    };
    let config = match action {
        CliAction::Version => {
            println!("roletalk {}", config::APP_VERSION);
            return Ok(());
        }
        CliAction::Help => {
            println!("{}", config::USAGE);
            return Ok(());
        }
        CliAction::Run(config) => config,
    };

    let _log_guard = logging::init(&config.log_dir)?;
    let transport = HttpTransport::new(config.endpoint, config.connect_timeout)?;
    info!(
        endpoint = transport.endpoint(),
        direction = config.direction.as_str(),
        "starting"
    );

    let mut terminal = setup_terminal()?;
    let result = app::run_app(&mut terminal, Arc::new(transport), config.direction);
    restore_terminal(&mut terminal)?;
    if let Err(err) = &result {
        error!(error = %err, "exited with error");
    }
    result
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enable raw mode")?;
    crossterm::execute!(std::io::stdout(), EnterAlternateScreen, EnableMouseCapture)
        .context("enter alternate screen")?;

    let terminal =
        Terminal::new(CrosstermBackend::new(std::io::stdout())).context("create terminal")?;

    // Needed to tell Shift+Enter from Enter.
    if matches!(supports_keyboard_enhancement(), Ok(true)) {
        crossterm::execute!(
            std::io::stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )
        .ok();
    }
    crossterm::execute!(std::io::stdout(), EnableBracketedPaste).ok();
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    crossterm::execute!(std::io::stdout(), DisableBracketedPaste).ok();
    crossterm::execute!(std::io::stdout(), PopKeyboardEnhancementFlags).ok();
    disable_raw_mode().context("disable raw mode")?;
    crossterm::execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)
        .context("leave alternate screen")?;
    terminal.show_cursor().context("show cursor")?;
    Ok(())
}

fn truncate(s: &str, n: usize) -> String {
    match s.char_indices().nth(n) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

fn input_cursor_position(input: &str, cursor: usize, width: u16, prompt_width: u16) -> (u16, u16) {
    let width = width.max(1) as usize;
    let mut x = prompt_width as usize;
    let mut y = 0usize;
    let mut consumed = 0usize;

    for ch in input.chars() {
        let len = ch.len_utf8();
        if consumed + len > cursor {
            break;
        }
        consumed += len;
        if ch == '\n' {
            x = prompt_width as usize;
            y += 1;
            continue;
        }
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(1).max(1);
        if x + ch_width > width {
            x = 0;
            y += 1;
        }
        x += ch_width;
        if x >= width {
            x = 0;
            y += 1;
        }
    }

    (x as u16, y as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_appends_ellipsis_past_limit() {
        assert_eq!(truncate("overloaded", 60), "overloaded");
        assert_eq!(truncate("连接被重置了", 2), "连接...");
    }

    #[test]
    fn cursor_position_wraps_wide_chars() {
        assert_eq!(input_cursor_position("ab", 2, 10, 2), (4, 0));
        assert_eq!(input_cursor_position("a\nb", 3, 10, 2), (3, 1));
        // Four columns of CJK after a two column prompt fill a six column row.
        assert_eq!(input_cursor_position("中文", "中文".len(), 6, 2), (0, 1));
    }
}
