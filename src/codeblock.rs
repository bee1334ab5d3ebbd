//! Codeblock sanitization and escaping
//!
//! Submissions arrive wrapped in chat-style markdown fences and output
//! flows back out inside fresh fences, so both directions need exact
//! text handling: stripping a fence (with an optional language tag) from
//! input, and neutralizing fence terminators plus terminal escape codes
//! in output before it is re-embedded.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;

/// Matches a literal triple-backtick run in output text.
static TRIPLE_BACKTICK: Lazy<Regex> = Lazy::new(|| Regex::new("```").unwrap());

/// Best-effort terminal escape code matcher: ESC or BEL followed by
/// anything on the same line up to and including the next ASCII letter.
/// Not a full ANSI parser; a sequence with no alphabetic terminator on
/// the line is left alone.
static ESCAPE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\x07\x1b].*?[a-zA-Z]").unwrap());

/// One leading whitespace run ending in a newline, or one trailing
/// newline-led whitespace run.
static EDGE_BLANK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\n|\n\s*$").unwrap());

/// Prepare arbitrary text for embedding inside a display code fence.
///
/// Triple-backtick runs get a zero-width joiner spliced in after the
/// second backtick so the output cannot prematurely terminate the
/// enclosing fence, escape codes are removed, and a single blank line is
/// trimmed from each edge. Idempotent on text that is already clean.
pub fn sanitize_for_display(text: &str) -> String {
    let text = TRIPLE_BACKTICK.replace_all(text, "``\u{200d}`");
    let text = ESCAPE_CODE.replace_all(&text, "");
    EDGE_BLANK.replace_all(&text, "").into_owned()
}

/// Backslash-escape markdown metacharacters for use in a label line.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '*' | '_' | '~' | '`' | '|' | '>') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Strip a markdown code fence from `text` if the input starts with one.
///
/// The opening ``` may carry a language tag matching `language_pattern`
/// (required unless `language_optional`), terminated by a newline. When a
/// fence matches, the markers and tag are removed; either way the
/// remaining body gets its blank edge lines trimmed, single inline
/// backticks stripped (when `strip_inline`), and any uniform leading
/// indentation removed.
pub fn strip_fence(
    text: &str,
    language_pattern: &str,
    language_optional: bool,
    strip_inline: bool,
) -> Result<String> {
    let mut language_pattern = language_pattern.to_string();
    if !language_pattern.is_empty() && !language_pattern.ends_with('\n') {
        language_pattern.push('\n');
    }
    // Long-standing imprecision, kept on purpose: the interior `.+` needs
    // at least one character, so
    // ```lang
    // ```
    // can end up consuming "lang" as body instead of as the language
    // line, and a bare `` `````` `` is not a fence at all.
    let optional = if language_optional { "?" } else { "" };
    let fence = Regex::new(&format!(
        "(?si)^```(?P<language>{language_pattern}){optional}.+```"
    ))?;

    let mut body = text.to_string();
    if let Some(caps) = fence.captures(&body) {
        let language_len = caps
            .name("language")
            .map(|m| m.as_str().chars().count())
            .unwrap_or(0);
        let start = 3 + language_len;
        let chars: Vec<char> = body.chars().collect();
        if chars.len() >= start + 3 {
            body = chars[start..chars.len() - 3].iter().collect();
        }
    }

    let mut lines: Vec<&str> = body.lines().collect();
    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let mut body = lines.join("\n");

    if strip_inline && starts_with_single_backtick(&body) && ends_with_single_backtick(&body) {
        let chars: Vec<char> = body.chars().collect();
        body = if chars.len() <= 2 {
            String::new()
        } else {
            chars[1..chars.len() - 1].iter().collect()
        };
    }

    Ok(dedent(&body))
}

/// True if the text begins with optional whitespace and exactly one backtick.
fn starts_with_single_backtick(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with('`') && !trimmed.starts_with("``")
}

/// True if the text ends with exactly one backtick and optional whitespace.
fn ends_with_single_backtick(text: &str) -> bool {
    let trimmed = text.trim_end();
    trimmed.ends_with('`') && !trimmed.ends_with("``")
}

/// Remove the leading indentation shared by all non-blank lines.
/// Whitespace-only lines are ignored for the margin and normalized to empty.
fn dedent(text: &str) -> String {
    let mut margin: Option<&str> = None;
    for line in text.lines() {
        let stripped = line.trim_start();
        if stripped.is_empty() {
            continue;
        }
        let indent = &line[..line.len() - stripped.len()];
        margin = Some(match margin {
            None => indent,
            Some(current) => common_prefix(current, indent),
        });
    }

    let margin = margin.unwrap_or("");
    let dedented: Vec<&str> = text
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                ""
            } else {
                line.strip_prefix(margin).unwrap_or(line)
            }
        })
        .collect();
    dedented.join("\n")
}

/// Longest common prefix of two indentation strings.
fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let mut end = 0;
    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca != cb {
            break;
        }
        end += ca.len_utf8();
    }
    &a[..end]
}
