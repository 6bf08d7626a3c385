//! CLI theme and styling.

use colored::Colorize;
use warden_core::RiskLevel;

/// Width between the borders of an approval box.
const BOX_INNER: usize = 58;
/// Usable text width inside an approval box.
const BOX_TEXT: usize = 56;

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(50).dimmed().to_string()
    }

    /// Draw a box around an approval request, bordered in the risk colour.
    pub(crate) fn approval_box(title: &str, content: &str, risk: RiskLevel) -> String {
        let color_fn = match risk {
            RiskLevel::Low => |s: &str| s.green().to_string(),
            RiskLevel::Medium => |s: &str| s.yellow().to_string(),
            RiskLevel::High => |s: &str| s.red().bold().to_string(),
        };

        let top = format!("╭{}╮", "─".repeat(BOX_INNER));
        let bottom = format!("╰{}╯", "─".repeat(BOX_INNER));
        let empty = format!("│{:w$}│", "", w = BOX_INNER);

        let pad_line = |text: &str| -> String {
            let visible_len = strip_ansi(text).chars().count();
            let padding = BOX_TEXT.saturating_sub(visible_len);
            format!("│ {text}{:p$} │", "", p = padding)
        };

        let mut lines = vec![
            color_fn(&top),
            pad_line(&title.bold().to_string()),
            color_fn(&empty),
        ];
        for line in content.lines() {
            lines.push(pad_line(line));
        }
        lines.push(color_fn(&bottom));
        lines.join("\n")
    }

    /// Format a key-value pair for display in approval boxes.
    pub(crate) fn kv(key: &str, value: &str) -> String {
        format!("{}: {}", key.bold(), value)
    }

    /// Format a risk level.
    pub(crate) fn risk_level(level: RiskLevel) -> String {
        match level {
            RiskLevel::Low => "low".green().to_string(),
            RiskLevel::Medium => "medium".yellow().to_string(),
            RiskLevel::High => "high".red().bold().to_string(),
        }
    }

    /// Format a yes/no flag.
    pub(crate) fn flag(value: bool) -> String {
        if value {
            "yes".yellow().to_string()
        } else {
            "no".dimmed().to_string()
        }
    }
}

/// Strip ANSI escape codes from a string for visible-length calculation.
fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_escape = false;
    for c in s.chars() {
        if in_escape {
            if c.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if c == '\x1b' {
            in_escape = true;
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[1;31mhello\x1b[0m"), "hello");
        assert_eq!(strip_ansi("plain"), "plain");
    }

    #[test]
    fn test_approval_box_lines_are_aligned() {
        colored::control::set_override(false);
        let rendered = Theme::approval_box("Approve?", "tool: x\nrisk: high", RiskLevel::High);
        let widths: Vec<usize> = rendered.lines().map(|l| l.chars().count()).collect();
        assert_eq!(widths.len(), 5);
        assert!(widths.iter().all(|w| *w == widths[0]), "{rendered}");
        colored::control::unset_override();
    }
}
