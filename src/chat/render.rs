//! Markdown-ish text to HTML for chat bubbles.
//!
//! This is a deliberately small subset: tables, line breaks, bullet and
//! numbered-list decoration, bold and italic. The stages run in a fixed order
//! and every stage after the first works on already-escaped text, so the only
//! markup in the output is markup the renderer itself inserted.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub const DEFAULT_BULLET_ICON_SRC: &str = "/static/egis.png";

const TABLE_OPEN: &str = "<table class=\"markdown-table\">";
const TABLE_CLOSE: &str = "</table>";
const LINE_BREAK: &str = "<br>";

// After line breaks are converted, a line starts at the beginning of the
// text, right after a <br>, or right after a closed table.
static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|<br>|</table>)[-*] ").expect("bullet regex"));
static NUMBERED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|<br>|</table>)(\d+)\. ").expect("numbered list regex"));
static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold regex"));
static ITALIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.+?)\*").expect("italic regex"));

/// Escape text for insertion into HTML element content.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[derive(Debug, Clone)]
pub struct MessageRenderer {
    icon_tag: String,
}

impl Default for MessageRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_BULLET_ICON_SRC)
    }
}

impl MessageRenderer {
    pub fn new(icon_src: &str) -> Self {
        Self {
            icon_tag: format!(
                "<img src=\"{}\" alt=\"Egis Logo\" style=\"height:20px; vertical-align:middle; margin-right:5px;\">",
                escape_html(icon_src)
            ),
        }
    }

    /// Render raw message text to an HTML fragment.
    ///
    /// Must be called on raw text only, once per message: feeding the output
    /// back in escapes it a second time.
    pub fn render(&self, text: &str) -> String {
        let escaped = escape_html(text);
        let tabled = convert_tables(&escaped);
        let broken = tabled.replace('\n', LINE_BREAK);
        let bulleted = self.decorate_bullets(&broken);
        let emphasized = apply_emphasis(&bulleted);
        self.decorate_numbers(&emphasized)
    }

    fn decorate_bullets(&self, text: &str) -> String {
        BULLET_RE
            .replace_all(text, |caps: &Captures| format!("{}{}", &caps[1], self.icon_tag))
            .into_owned()
    }

    fn decorate_numbers(&self, text: &str) -> String {
        NUMBERED_RE
            .replace_all(text, |caps: &Captures| {
                format!("{}{}{}. ", &caps[1], self.icon_tag, &caps[2])
            })
            .into_owned()
    }
}

/// Consecutive lines starting with `|` become one table. Table rows consume
/// their own line terminator; every other line is copied through as-is.
fn convert_tables(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_table = false;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with('|') {
            if !in_table {
                out.push_str(TABLE_OPEN);
                in_table = true;
            }
            let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
            let inner = inner.strip_suffix('|').unwrap_or(inner);
            out.push_str("<tr>");
            for cell in inner.split('|') {
                out.push_str("<td>");
                out.push_str(cell.trim());
                out.push_str("</td>");
            }
            out.push_str("</tr>");
        } else {
            if in_table {
                out.push_str(TABLE_CLOSE);
                in_table = false;
            }
            out.push_str(line);
        }
    }

    if in_table {
        out.push_str(TABLE_CLOSE);
    }
    out
}

// Bold first, so `**x**` is consumed before the single-asterisk pass runs.
fn apply_emphasis(text: &str) -> String {
    let bold = BOLD_RE.replace_all(text, "<strong>$1</strong>");
    ITALIC_RE.replace_all(&bold, "<em>$1</em>").into_owned()
}
