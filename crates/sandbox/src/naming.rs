//! Turning a test's identity into a filesystem-safe sandbox prefix.

/// Sanitized method names longer than this are shortened with an ellipsis.
pub const MAX_METHOD_NAME_LEN: usize = 64;

/// Characters kept from each end of a shortened method name.
const KEEP_CHARS: usize = 32;

/// Separator used in `PATH`-style lists on this platform.
const PATH_LIST_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

/// Replace whitespace, path separators, colons and quotes with `_`.
///
/// Names made only of dots (`""`, `"."`, `".."`) are turned into
/// underscores too so a name can never address a parent directory.
#[must_use]
pub fn sanitize_segment(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_whitespace()
                || matches!(c, '/' | '\\' | ':' | '"')
                || c == PATH_LIST_SEPARATOR
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    if sanitized.chars().all(|c| c == '.') {
        return "_".repeat(sanitized.chars().count().max(1));
    }
    sanitized
}

/// Shorten names over [`MAX_METHOD_NAME_LEN`] characters to the first 32,
/// `...`, and the last 32.
#[must_use]
pub fn truncate_method_name(name: String) -> String {
    let len = name.chars().count();
    if len <= MAX_METHOD_NAME_LEN {
        return name;
    }
    let head: String = name.chars().take(KEEP_CHARS).collect();
    let tail: String = name.chars().skip(len - KEEP_CHARS).collect();
    format!("{head}...{tail}")
}

/// `<sanitized class>/<sanitized, truncated method>`.
///
/// Both halves are single path segments, so the prefix always stays two
/// levels below the root.
#[must_use]
pub fn test_prefix(class_name: &str, method_name: &str) -> String {
    let class = sanitize_segment(class_name);
    let method = truncate_method_name(sanitize_segment(method_name));
    format!("{class}/{method}")
}
