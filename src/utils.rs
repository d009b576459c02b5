use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

// Cached regexes, compiled once
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<a\s[^>]*href="([^"]*)"[^>]*>([\s\S]*?)</a>"#).unwrap());
static BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|<hr\s*/?>|</div>").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n+").unwrap());

pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {:?}", path))?;
    }
    Ok(())
}

/// Find the largest char boundary in `s` that is <= `max_bytes`.
/// Safe for slicing: `&s[..find_char_boundary(s, max_bytes)]` never panics.
pub fn find_char_boundary(s: &str, max_bytes: usize) -> usize {
    if max_bytes >= s.len() {
        return s.len();
    }
    let mut boundary = max_bytes;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}

/// Escape text for insertion into transcript markup, attributes included.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverse of [`escape_html`]. `&amp;` goes last so `&amp;lt;` stays `&lt;`.
pub fn unescape_html(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Render transcript markup as plain terminal text: links become
/// `label: url`, block breaks become newlines, other tags are dropped.
pub fn markup_to_text(markup: &str) -> String {
    let with_links = LINK_RE.replace_all(markup, "$2: $1");
    let with_breaks = BREAK_RE.replace_all(&with_links, "\n");
    let stripped = TAG_RE.replace_all(&with_breaks, "");
    let lines: Vec<&str> = stripped.lines().map(str::trim).collect();
    let joined = lines.join("\n");
    let collapsed = BLANK_LINES_RE.replace_all(joined.trim(), "\n");
    unescape_html(&collapsed)
}
