//! Text-to-HTML rendering for streamed agent replies.
//!
//! The rules form a fixed chain of regex substitutions; each one runs on the
//! output of the previous one. Nested or malformed markdown produces stable
//! but unspecified output.

use std::sync::LazyLock;

use regex::Regex;

pub(crate) const DISCUSSION_BADGE: &str =
    r#"<div class="scenario-badge scenario-discussion">需求讨论</div>"#;
pub(crate) const SOLUTION_BADGE: &str =
    r#"<div class="scenario-badge scenario-solution">技术方案</div>"#;

static DISCUSSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)- \*\*当前场景\*\*：需求讨论 \(Requirement Discussion\)")
        .expect("discussion badge pattern")
});
static SOLUTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)- \*\*当前场景\*\*：技术方案 \(Technical Solution\)")
        .expect("solution badge pattern")
});
static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern"));
static H3_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"### (.*?)(?:<br>|$)").expect("h3 pattern"));
static H2_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"## (.*?)(?:<br>|$)").expect("h2 pattern"));

/// Render the full accumulated reply. Pure: the same input always yields
/// the same output, so it is safe to re-run on every chunk.
pub(crate) fn format_markdown(text: &str) -> String {
    // At most one badge fires; discussion wins when both are present.
    let html = if DISCUSSION_RE.is_match(text) {
        DISCUSSION_RE.replace(text, DISCUSSION_BADGE).into_owned()
    } else if SOLUTION_RE.is_match(text) {
        SOLUTION_RE.replace(text, SOLUTION_BADGE).into_owned()
    } else {
        text.to_string()
    };

    let html = html.replace('\n', "<br>");
    let html = BOLD_RE.replace_all(&html, "<strong>$1</strong>");
    // Level 3 first so `###` lines are not eaten by the `## ` rule.
    let html = H3_RE.replace_all(&html, "<h3>$1</h3>");
    let html = H2_RE.replace_all(&html, "<h2>$1</h2>");
    html.replace("---", "<hr>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bold_wraps_inner_text_without_badge() {
        let html = format_markdown("**x**");
        assert_eq!(html, "<strong>x</strong>");
        assert!(!html.contains("scenario-badge"));
    }

    #[test]
    fn bold_is_non_greedy() {
        assert_eq!(
            format_markdown("**a** and **b**"),
            "<strong>a</strong> and <strong>b</strong>"
        );
    }

    #[test]
    fn discussion_badge_precedes_line_break() {
        let html = format_markdown("- **当前场景**：需求讨论 (Requirement Discussion)\nmore");
        assert_eq!(html, format!("{DISCUSSION_BADGE}<br>more"));
        assert!(!html.contains("scenario-solution"));
    }

    #[test]
    fn discussion_badge_is_case_insensitive() {
        let html = format_markdown("- **当前场景**：需求讨论 (requirement DISCUSSION)");
        assert_eq!(html, DISCUSSION_BADGE);
    }

    #[test]
    fn discussion_wins_over_solution() {
        let text = "- **当前场景**：技术方案 (Technical Solution)\n\
                    - **当前场景**：需求讨论 (Requirement Discussion)";
        let html = format_markdown(text);
        assert!(html.contains("scenario-discussion"));
        assert!(!html.contains("scenario-solution"));
        // The solution line is left to the later rules.
        assert!(html.contains("<strong>当前场景</strong>：技术方案"));
    }

    #[test]
    fn solution_badge_when_no_discussion() {
        let html = format_markdown("- **当前场景**：技术方案 (Technical Solution)");
        assert_eq!(html, SOLUTION_BADGE);
    }

    #[test]
    fn only_first_badge_occurrence_is_replaced() {
        let line = "- **当前场景**：需求讨论 (Requirement Discussion)";
        let html = format_markdown(&format!("{line}\n{line}"));
        assert_eq!(html.matches("scenario-discussion").count(), 1);
    }

    #[test]
    fn headings_run_to_break_or_end() {
        assert_eq!(
            format_markdown("### Scope\nbody\n## Plan"),
            "<h3>Scope</h3>body<br><h2>Plan</h2>"
        );
    }

    #[test]
    fn level_three_heading_is_not_double_matched() {
        let html = format_markdown("### Title");
        assert_eq!(html, "<h3>Title</h3>");
        assert!(!html.contains("<h2>"));
    }

    #[test]
    fn horizontal_rule_becomes_divider() {
        assert_eq!(format_markdown("a\n---\nb"), "a<br><hr><br>b");
    }

    #[test]
    fn unterminated_bold_is_left_alone() {
        assert_eq!(format_markdown("**open"), "**open");
    }

    #[test]
    fn format_is_idempotent_for_fixed_input() {
        let text = "## Title\n- **当前场景**：需求讨论 (Requirement Discussion)\n**b** ---";
        assert_eq!(format_markdown(text), format_markdown(text));
    }
}
