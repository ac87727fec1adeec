//! Two-pass scanner for `-ztag` output.
//!
//! Pass one locates free text ahead of the first `...` marker and captures
//! it as a preamble. Pass two splits the rest into groups on blank-line-
//! then-marker boundaries, then each group into `... key value` fields.

use std::sync::LazyLock;

use regex::Regex;

use super::types::{Entry, Record, Value};

/// Blank line followed by a field marker separates records.
static GROUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n\n\.\.\.\s").unwrap_or_else(|e| panic!("invalid group regex: {e}"))
});

/// Field marker at the start of the group or of a line.
static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\n|^)\.\.\.\s").unwrap_or_else(|e| panic!("invalid field regex: {e}"))
});

/// Universal newline boundary.
static NEWLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\r\n|\n|\r").unwrap_or_else(|e| panic!("invalid newline regex: {e}"))
});

/// Strict integer value: no leading zeros, optional trailing whitespace.
static INTEGER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[1-9][0-9]*\s*$").unwrap_or_else(|e| panic!("invalid integer regex: {e}"))
});

/// Parse raw `-ztag` output into an ordered sequence of entries.
///
/// With `multi_line` off, a value containing embedded newlines is truncated
/// at the first line and the remaining non-empty lines are emitted as an
/// [`Entry::Overflow`] immediately after the owning record. With it on, the
/// full value is kept intact (needed for `changes` descriptions).
///
/// Malformed text never fails: unmatched text becomes a preamble and groups
/// that yield no fields are dropped rather than emitted empty.
#[must_use]
pub fn parse(raw: &str, multi_line: bool) -> Vec<Entry> {
    let mut output = Vec::new();

    // Free text (login banners, error lines) ahead of the first marker.
    let buffer = match raw.find("...") {
        Some(0) => raw,
        Some(start) => {
            output.push(Entry::Preamble(split_lines(raw[..start].trim())));
            &raw[start..]
        }
        None => {
            let preamble = raw.trim();
            if !preamble.is_empty() {
                output.push(Entry::Preamble(split_lines(preamble)));
            }
            ""
        }
    };

    for group in GROUP_RE.split(buffer) {
        let mut record = Record::new();
        let mut overflow: Vec<String> = Vec::new();

        let mut chunks = FIELD_RE.split(group);
        let mut first = chunks.next();
        // A marker at position 0 produces a leading empty chunk.
        if first == Some("") {
            first = chunks.next();
        }

        for chunk in first.into_iter().chain(chunks) {
            let pair = chunk.trim();
            if pair.is_empty() {
                continue;
            }

            if let Some(space) = pair.find(' ') {
                let key = &pair[..space];
                let mut value = pair[space + 1..].to_string();

                if !multi_line {
                    if let Some(newline) = value.find('\n') {
                        let rest = value.split_off(newline + 1);
                        value.truncate(newline);
                        overflow.extend(
                            rest.split('\n').filter(|l| !l.is_empty()).map(String::from),
                        );
                    }
                }

                record.insert(key, coerce(value));
            } else {
                // No space means a bare presence flag.
                record.insert(pair, Value::Flag);
            }
        }

        // Groups that parse to nothing are dropped, not emitted empty.
        if record.is_empty() {
            continue;
        }

        output.push(Entry::Record(record));
        if !overflow.is_empty() {
            output.push(Entry::Overflow(overflow));
        }
    }

    output
}

/// Coerce a field value: strictly numeric text becomes an integer.
fn coerce(value: String) -> Value {
    if INTEGER_RE.is_match(&value) || value.trim() == "0" {
        if let Ok(n) = value.trim().parse::<i64>() {
            return Value::Integer(n);
        }
    }
    Value::Text(value)
}

/// Split trimmed preamble text on universal newline boundaries.
fn split_lines(text: &str) -> Vec<String> {
    NEWLINE_RE.split(text).map(String::from).collect()
}
