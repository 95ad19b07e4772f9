//! URI pattern canonicalization.
//!
//! # Responsibilities
//! - Lexically clean registration paths (collapse slashes, resolve `.`/`..`)
//! - Build the dedup key used to reject duplicate route definitions
//! - Translate `:name` / `*name` segments into the multiplexer's `{name}` /
//!   `{*name}` placeholders
//!
//! # Design Decisions
//! - Pure string transforms: no I/O, no error cases
//! - The dedup key is never used for matching, only for duplicate detection
//!   and for the registration order

/// Marker that opens a named path variable (`/users/:id`).
pub const VAR_MARKER: char = ':';

/// Marker that opens a catch-all variable (`/public/*file`).
pub const CATCH_ALL_MARKER: char = '*';

/// Token that replaces variable segments in a dedup key.
const WILDCARD: &str = "*";

/// Lexically clean a slash-separated path.
///
/// Multiple slashes collapse into one, `.` segments are dropped, `..` removes
/// the preceding segment and a trailing slash is removed. A rooted path
/// never climbs above `/`; an empty path cleans to `.`.
pub fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(last) if *last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Returns true when the segment names a path variable of either kind.
pub fn is_variable(segment: &str) -> bool {
    segment.contains(VAR_MARKER) || segment.trim_start().starts_with(CATCH_ALL_MARKER)
}

/// Build the dedup key for a pattern: every variable segment becomes `*`,
/// literal segments are trimmed of surrounding whitespace.
///
/// `/me/:id/name` and `/me/:x/name` share the key `/me/*/name`.
pub fn normalize_for_dedup(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if is_variable(segment) {
                WILDCARD
            } else {
                segment.trim()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Convert `:name` and `*name` segments into the router's `{name}` and
/// `{*name}` placeholders.
pub fn to_router_syntax(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            let segment = segment.trim();
            if let Some(name) = segment.strip_prefix(VAR_MARKER) {
                format!("{{{name}}}")
            } else if let Some(name) = segment.strip_prefix(CATCH_ALL_MARKER) {
                format!("{{*{name}}}")
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Returns true when the last segment of the pattern is a catch-all.
pub fn ends_with_catch_all(path: &str) -> bool {
    path.rsplit('/')
        .next()
        .is_some_and(|last| last.trim_start().starts_with(CATCH_ALL_MARKER))
}
