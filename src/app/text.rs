const TAB_SPACES: &str = "    ";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Escape {
    None,
    Start,
    Csi,
    Osc,
    OscEsc,
}

/// Make one row of untrusted text safe to draw: escape sequences (CSI and
/// OSC) and control characters are dropped, tabs become spaces.
pub(super) fn sanitize_terminal_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut state = Escape::None;

    for ch in text.chars() {
        match state {
            Escape::None => {}
            Escape::Start => {
                state = match ch {
                    '[' => Escape::Csi,
                    ']' => Escape::Osc,
                    _ => Escape::None,
                };
                continue;
            }
            Escape::Csi => {
                // Final byte is in 0x40..=0x7E.
                if ('@'..='~').contains(&ch) {
                    state = Escape::None;
                }
                continue;
            }
            Escape::Osc => {
                match ch {
                    '\u{7}' => state = Escape::None,
                    '\u{1b}' => state = Escape::OscEsc,
                    _ => {}
                }
                continue;
            }
            Escape::OscEsc => {
                state = if ch == '\\' { Escape::None } else { Escape::Osc };
                continue;
            }
        }

        match ch {
            '\u{1b}' => state = Escape::Start,
            '\t' => out.push_str(TAB_SPACES),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    out
}
