//! Exact-format canonical identifier markers for mirror artifacts.
//!
//! A mirror artifact carries the canonical identifier in two places: a
//! title marker `[CID:<id>] <rest>` and a body marker line
//! `Canonical-ID: <id>`. Extraction is exact-format parsing, never
//! free-text inference: a marker that does not match the format precisely
//! yields no identifier. All functions here are pure and deterministic.

use crate::issue::domain::CanonicalId;

const TITLE_PREFIX: &str = "[CID:";
const BODY_KEY: &str = "Canonical-ID:";

/// Extracts the canonical identifier from a title marker.
///
/// Matches only when the title begins with the exact bracket form
/// `[CID:<id>]` and the identifier is non-empty with no whitespace.
#[must_use]
pub fn parse_title_marker(title: &str) -> Option<&str> {
    let rest = title.strip_prefix(TITLE_PREFIX)?;
    let (id, tail) = rest.split_once(']')?;
    if id.is_empty() || id.chars().any(char::is_whitespace) {
        return None;
    }
    if !(tail.is_empty() || tail.starts_with(' ')) {
        return None;
    }
    Some(id)
}

/// Extracts the canonical identifier from a body marker line.
///
/// Matches the first line beginning with `Canonical-ID:`. Trailing
/// whitespace is tolerated, as are both `\n` and `\r\n` line endings.
#[must_use]
pub fn parse_body_marker(body: &str) -> Option<&str> {
    body.lines().find_map(|line| {
        let rest = line.strip_prefix(BODY_KEY)?;
        let id = rest.trim();
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return None;
        }
        Some(id)
    })
}

/// Renders a marker-bearing artifact title.
#[must_use]
pub fn render_title_marker(canonical_id: &CanonicalId, title: &str) -> String {
    format!("{TITLE_PREFIX}{canonical_id}] {title}")
}

/// Renders a marker-bearing artifact body.
///
/// The marker line is appended after the body content, separated by a
/// blank line. An empty body yields the marker line alone.
#[must_use]
pub fn render_body_marker(canonical_id: &CanonicalId, body: &str) -> String {
    let content = body.trim_end();
    if content.is_empty() {
        format!("{BODY_KEY} {canonical_id}\n")
    } else {
        format!("{content}\n\n{BODY_KEY} {canonical_id}\n")
    }
}
