use super::*;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

impl App {
    pub(super) fn handle_paste_event(&mut self, raw: &str) {
        let normalized = if raw.contains('\r') {
            raw.replace("\r\n", "\n").replace('\r', "\n")
        } else {
            raw.to_string()
        };
        if normalized.is_empty() {
            return;
        }
        for c in normalized.chars() {
            self.insert_char(c);
        }
        self.refresh_mention_menu();
    }

    /// Re-run mention detection after an edit.
    pub(super) fn refresh_mention_menu(&mut self) {
        let was_open = self.composer.mention_menu_open;
        match router::on_input_changed(&mut self.composer) {
            RouterAction::ShowMentionMenu if !was_open => self.menu_idx = 0,
            RouterAction::ShowMentionMenu | RouterAction::HideMentionMenu => {}
        }
    }

    pub(super) fn select_agent(&mut self, direction: Direction) {
        router::select_agent(&mut self.sessions, &mut self.composer, direction);
        self.last_status = format!("agent: {}", direction.meta().name);
    }

    fn apply_highlighted_mention(&mut self) {
        let roles = Direction::all();
        let direction = roles[self.menu_idx.min(roles.len() - 1)];
        router::apply_mention(&mut self.sessions, &mut self.composer, direction);
        self.last_status = format!("agent: {}", direction.meta().name);
    }

    pub(super) fn insert_char(&mut self, c: char) {
        let composer = &mut self.composer;
        if composer.cursor >= composer.input.len() {
            composer.input.push(c);
        } else {
            composer.input.insert(composer.cursor, c);
        }
        composer.cursor += c.len_utf8();
    }

    pub(super) fn backspace(&mut self) {
        let composer = &mut self.composer;
        if composer.cursor == 0 || composer.input.is_empty() {
            return;
        }
        if let Some(prev_idx) = composer.input[..composer.cursor]
            .char_indices()
            .last()
            .map(|(i, _)| i)
        {
            composer.input.drain(prev_idx..composer.cursor);
            composer.cursor = prev_idx;
        }
    }

    pub(super) fn backspace_word(&mut self) {
        while self.composer.cursor > 0
            && self.composer.input[..self.composer.cursor].ends_with(char::is_whitespace)
        {
            self.backspace();
        }
        while self.composer.cursor > 0
            && !self.composer.input[..self.composer.cursor].ends_with(char::is_whitespace)
        {
            self.backspace();
        }
    }

    pub(super) fn delete(&mut self) {
        let composer = &mut self.composer;
        let Some(ch) = composer.input[composer.cursor..].chars().next() else {
            return;
        };
        let end = composer.cursor + ch.len_utf8();
        composer.input.drain(composer.cursor..end);
    }

    pub(super) fn move_left(&mut self) {
        let composer = &mut self.composer;
        if let Some((prev_idx, _)) = composer.input[..composer.cursor].char_indices().last() {
            composer.cursor = prev_idx;
        }
    }

    pub(super) fn move_right(&mut self) {
        let composer = &mut self.composer;
        if let Some(ch) = composer.input[composer.cursor..].chars().next() {
            composer.cursor += ch.len_utf8();
        }
    }

    pub(super) fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => {
                    self.cancel_session();
                    self.should_quit = true;
                    return;
                }
                KeyCode::Char('t') => {
                    let next = self.sessions.active_direction().toggled();
                    self.select_agent(next);
                    return;
                }
                KeyCode::Char('j') => {
                    self.insert_char('\n');
                    self.refresh_mention_menu();
                    return;
                }
                KeyCode::Char('a') => {
                    self.composer.cursor = 0;
                    self.refresh_mention_menu();
                    return;
                }
                KeyCode::Char('e') => {
                    self.composer.cursor = self.composer.input.len();
                    self.refresh_mention_menu();
                    return;
                }
                _ => {}
            }
        }

        if key.modifiers.contains(KeyModifiers::ALT) && matches!(key.code, KeyCode::Backspace) {
            self.backspace_word();
            self.refresh_mention_menu();
            return;
        }

        if self.composer.mention_menu_open && self.handle_menu_key(key) {
            return;
        }

        match key.code {
            KeyCode::F(1) => self.select_agent(Direction::PmToDev),
            KeyCode::F(2) => self.select_agent(Direction::DevToPm),
            KeyCode::PageUp => self.scroll_up(5),
            KeyCode::PageDown => self.scroll_down(5),
            KeyCode::Esc => {
                if self.is_busy() {
                    self.cancel_session();
                }
            }
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.insert_char('\n');
                    self.refresh_mention_menu();
                } else {
                    self.submit_current_line();
                }
            }
            KeyCode::Backspace => {
                self.backspace();
                self.refresh_mention_menu();
            }
            KeyCode::Delete => {
                self.delete();
                self.refresh_mention_menu();
            }
            KeyCode::Left => {
                self.move_left();
                self.refresh_mention_menu();
            }
            KeyCode::Right => {
                self.move_right();
                self.refresh_mention_menu();
            }
            KeyCode::Home => {
                self.composer.cursor = 0;
                self.refresh_mention_menu();
            }
            KeyCode::End => {
                self.composer.cursor = self.composer.input.len();
                self.refresh_mention_menu();
            }
            KeyCode::Char(c) => {
                self.insert_char(c);
                self.refresh_mention_menu();
            }
            _ => {}
        }
    }

    /// Keys the open mention menu consumes. Returns false to fall through.
    fn handle_menu_key(&mut self, key: KeyEvent) -> bool {
        let len = Direction::all().len();
        match key.code {
            KeyCode::Up => {
                self.menu_idx = if self.menu_idx == 0 {
                    len - 1
                } else {
                    self.menu_idx - 1
                };
                true
            }
            KeyCode::Down => {
                self.menu_idx = (self.menu_idx + 1) % len;
                true
            }
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => false,
            KeyCode::Enter | KeyCode::Tab => {
                self.apply_highlighted_mention();
                true
            }
            KeyCode::Esc => {
                self.composer.mention_menu_open = false;
                true
            }
            _ => false,
        }
    }
}
