//! Helpers for `/`-delimited repository paths.
//!
//! These mirror the way the server addresses resources: a leading `/` marks
//! an absolute path, `/` alone is the root, and the empty string is "no path".

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Path segment delimiter.
pub const DELIMITER: char = '/';

/// Bytes escaped inside a path segment; the URI path-safe punctuation stays literal.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b':')
    .remove(b'=')
    .remove(b'@');

/// Join `tail` onto `base` with exactly one delimiter between them.
///
/// ```
/// use repo_access::path::append;
///
/// assert_eq!(append("/a", "b/c"), "/a/b/c");
/// assert_eq!(append("b", ""), "b");
/// assert_eq!(append("", "c"), "c");
/// ```
#[must_use]
pub fn append(base: &str, tail: &str) -> String {
    let tail = tail.trim_start_matches(DELIMITER);
    if base.is_empty() {
        return tail.to_string();
    }
    if tail.is_empty() {
        return base.to_string();
    }
    let base = base.trim_end_matches(DELIMITER);
    format!("{base}{DELIMITER}{tail}")
}

/// The last segment of `path`, ignoring trailing delimiters.
#[must_use]
pub fn tail(path: &str) -> &str {
    let trimmed = path.trim_end_matches(DELIMITER);
    match trimmed.rfind(DELIMITER) {
        Some(index) => &trimmed[index + 1..],
        None => trimmed,
    }
}

/// `path` with its last segment removed.
///
/// The parent of a top-level absolute path is the root `/`; the parent of
/// the root and of a single relative segment is the empty path. The result
/// is always strictly shorter than a non-empty input.
#[must_use]
pub fn remove_tail(path: &str) -> &str {
    if path == "/" {
        return "";
    }
    let trimmed = path.trim_end_matches(DELIMITER);
    match trimmed.rfind(DELIMITER) {
        Some(0) => &path[..1],
        Some(index) => trimmed[..index].trim_end_matches(DELIMITER),
        None => "",
    }
}

/// Whether `path` denotes the root or nothing at all.
#[must_use]
pub fn is_root(path: &str) -> bool {
    path.is_empty() || path.trim_matches(DELIMITER).is_empty()
}

/// Percent-encode every segment of `path`, keeping the delimiters.
///
/// ```
/// use repo_access::path::uri_encode;
///
/// assert_eq!(uri_encode("trunk/my file"), "trunk/my%20file");
/// assert_eq!(uri_encode("tags/v(1)+x@y"), "tags/v(1)+x@y");
/// ```
#[must_use]
pub fn uri_encode(path: &str) -> String {
    path.split(DELIMITER)
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tail_of_paths() {
        assert_eq!(tail("/a/b/c"), "c");
        assert_eq!(tail("/a/b/"), "b");
        assert_eq!(tail("a"), "a");
        assert_eq!(tail("/"), "");
    }

    #[test]
    fn remove_tail_walks_to_root() {
        assert_eq!(remove_tail("/a/b/c"), "/a/b");
        assert_eq!(remove_tail("/a/b/"), "/a");
        assert_eq!(remove_tail("/a"), "/");
        assert_eq!(remove_tail("/"), "");
        assert_eq!(remove_tail("a"), "");
        assert_eq!(remove_tail("a/b"), "a");
    }

    #[test]
    fn root_detection() {
        assert!(is_root(""));
        assert!(is_root("/"));
        assert!(!is_root("/a"));
    }

    #[test]
    fn encode_keeps_delimiters() {
        assert_eq!(uri_encode("a b/c%d"), "a%20b/c%25d");
        assert_eq!(uri_encode(""), "");
        assert_eq!(uri_encode("/x/"), "/x/");
    }

    #[test]
    fn encode_leaves_path_safe_punctuation() {
        assert_eq!(uri_encode("a+b/v(1)/x@y/it's"), "a+b/v(1)/x@y/it's");
        assert_eq!(uri_encode("!$&*,:=~-_."), "!$&*,:=~-_.");
        assert_eq!(uri_encode("q?#[]"), "q%3F%23%5B%5D");
        assert_eq!(uri_encode("caf\u{e9}"), "caf%C3%A9");
    }

    proptest! {
        #[test]
        fn remove_tail_strictly_shortens(path in "(/?[a-z]{1,4}){0,6}/?") {
            prop_assume!(!path.is_empty());
            prop_assert!(remove_tail(&path).len() < path.len());
        }

        #[test]
        fn lopping_reconstructs_path(segments in proptest::collection::vec("[a-z]{1,4}", 1..6)) {
            let path = format!("/{}", segments.join("/"));
            let mut current = path.as_str();
            let mut lopped = String::new();
            while current != "/" {
                lopped = append(tail(current), &lopped);
                current = remove_tail(current);
            }
            prop_assert_eq!(append("/", &lopped), path);
        }
    }
}
