//! Structural screening of regex sources.
//!
//! Patterns arrive from remote configuration and are matched against
//! attacker-influenced strings (hostnames, event fields), so sources with
//! catastrophic-backtracking shapes are rejected before they ever reach the
//! regex engine. The screen is a single forward walk, so it cannot itself be
//! made to backtrack.

use thiserror::Error;

/// Longest accepted pattern source, in bytes.
pub const MAX_PATTERN_LEN: usize = 512;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScreenError {
    #[error("pattern exceeds {MAX_PATTERN_LEN} characters")]
    TooLong,
    #[error("quantified group contains a quantifier")]
    NestedQuantifier,
}

/// Screen a regex source.
///
/// Rejects sources longer than [`MAX_PATTERN_LEN`] and sources where a
/// quantified group's body itself contains an unescaped `+`, `*`, or
/// open-ended `{n,}` bound (`(a+)+`, `(a*)*`, `(a+){2,}`). Escaped characters
/// and `[...]` classes are opaque to the walk.
pub fn screen(pattern: &str) -> Result<(), ScreenError> {
    if pattern.len() > MAX_PATTERN_LEN {
        return Err(ScreenError::TooLong);
    }

    let bytes = pattern.as_bytes();
    // One entry per open group: whether its body contains a quantifier.
    let mut groups: Vec<bool> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'[' => {
                i = skip_class(bytes, i);
                continue;
            }
            b'(' => groups.push(false),
            b')' => {
                let quantified = groups.pop().unwrap_or(false);
                if quantified {
                    if let Some(&next) = bytes.get(i + 1) {
                        if matches!(next, b'+' | b'*' | b'{') {
                            return Err(ScreenError::NestedQuantifier);
                        }
                    }
                }
            }
            b'+' | b'*' => mark_open_groups(&mut groups),
            b'{' => {
                let (end, open_ended) = scan_bound(bytes, i);
                if open_ended {
                    mark_open_groups(&mut groups);
                }
                i = end;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    Ok(())
}

/// A quantifier anywhere inside a group also sits inside every group
/// enclosing it, so all open groups are marked.
fn mark_open_groups(groups: &mut [bool]) {
    for quantified in groups.iter_mut() {
        *quantified = true;
    }
}

/// Skip a `[...]` character class starting at `start` (which indexes `[`).
/// Returns the index just past the closing `]`. A `]` in first position
/// (after an optional `^`) is literal.
fn skip_class(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    if bytes.get(i) == Some(&b'^') {
        i += 1;
    }
    if bytes.get(i) == Some(&b']') {
        i += 1;
    }
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b']' => return i + 1,
            _ => i += 1,
        }
    }
    i
}

/// Scan a `{...}` starting at `start` (which indexes `{`). Returns the index
/// just past the bound and whether it is an open-ended repetition (`{n,}`).
/// Anything that is not `{digits[,digits]}` is treated as a literal brace.
fn scan_bound(bytes: &[u8], start: usize) -> (usize, bool) {
    let mut i = start + 1;
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start {
        return (start + 1, false);
    }
    let open_ended = match bytes.get(i) {
        Some(&b'}') => false,
        Some(&b',') => {
            i += 1;
            if bytes.get(i) == Some(&b'}') {
                true
            } else {
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                if bytes.get(i) == Some(&b'}') {
                    false
                } else {
                    return (start + 1, false);
                }
            }
        }
        _ => return (start + 1, false),
    };
    (i + 1, open_ended)
}
