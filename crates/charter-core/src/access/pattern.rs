//! Two-token glob matching for path patterns.
//!
//! The pattern grammar is deliberately small: `**` matches any number of
//! path segments (including none), `*` matches within a single segment,
//! and every other character is literal, the dot included. Patterns and
//! paths are both `/`-separated relative paths.
//!
//! The matcher is a direct recursive walk over segments. Patterns are
//! short and match volume is low, so there is no compile step.

/// Returns true if `path` matches `pattern`.
#[must_use]
pub fn matches(pattern: &str, path: &str) -> bool {
    let pattern_segments: Vec<&str> = pattern.split('/').collect();
    let path_segments: Vec<&str> = path.split('/').collect();
    match_segments(&pattern_segments, &path_segments)
}

fn match_segments(pattern: &[&str], path: &[&str]) -> bool {
    let Some((head, rest)) = pattern.split_first() else {
        return path.is_empty();
    };
    if *head == "**" {
        // `**` may consume zero segments or one segment and recurse.
        if match_segments(rest, path) {
            return true;
        }
        return match path.split_first() {
            Some((_, path_rest)) => match_segments(pattern, path_rest),
            None => false,
        };
    }
    match path.split_first() {
        Some((segment, path_rest)) => {
            segment_matches(head.as_bytes(), segment.as_bytes()) && match_segments(rest, path_rest)
        }
        None => false,
    }
}

fn segment_matches(pattern: &[u8], segment: &[u8]) -> bool {
    match pattern.split_first() {
        None => segment.is_empty(),
        Some((b'*', rest)) => {
            segment_matches(rest, segment)
                || (!segment.is_empty() && segment_matches(pattern, &segment[1..]))
        }
        Some((&c, rest)) => match segment.split_first() {
            Some((&s, segment_rest)) => c == s && segment_matches(rest, segment_rest),
            None => false,
        },
    }
}

/// Returns the literal (wildcard-free) prefix of a pattern.
///
/// Used to compute "nearest allowed" hints: the allowed pattern whose
/// literal prefix shares the longest common prefix with a denied path is
/// the best remediation suggestion.
#[must_use]
pub fn literal_prefix(pattern: &str) -> &str {
    match pattern.find('*') {
        Some(idx) => &pattern[..idx],
        None => pattern,
    }
}

/// Returns the length of the common prefix of two strings, in bytes.
#[must_use]
pub fn common_prefix_len(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count()
}

/// Picks the allowed pattern nearest to `path` by longest literal-prefix
/// match. Returns `None` when the pattern list is empty.
#[must_use]
pub fn nearest_allowed<'a>(patterns: &'a [String], path: &str) -> Option<&'a str> {
    patterns
        .iter()
        .map(|p| (common_prefix_len(literal_prefix(p), path), p.as_str()))
        .max_by_key(|(len, _)| *len)
        .map(|(_, p)| p)
}
