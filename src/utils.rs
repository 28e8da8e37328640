//! Utility functions for path components and feed lists

use crate::error::{Error, Result};
use std::path::Path;

/// Reduce arbitrary text to a token that is safe as a single path component
///
/// Keeps ASCII letters, digits, space and `%`, `-`, `_`, `,` in their original
/// order and drops everything else. Nothing is substituted, so separators, NUL,
/// dots and all non-ASCII characters simply disappear.
///
/// # Examples
///
/// ```
/// use podarchive::utils::sanitize;
///
/// assert_eq!(sanitize("12 - Part 1/2: Intro?"), "12 - Part 12 Intro");
/// assert_eq!(sanitize("../../etc"), "etc");
/// ```
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|c| is_safe_char(*c)).collect()
}

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ' ' | '%' | '-' | '_' | ',')
}

/// Parse a feed list: one URL per line, only lines starting with `http` count
///
/// Comment lines (`#Show Name`, as written by the directory search) and blank
/// lines are ignored.
pub fn parse_feed_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("http"))
        .map(str::to_string)
        .collect()
}

/// Read a feed list file, see [`parse_feed_list`]
pub fn read_feed_list(path: &Path) -> Result<Vec<String>> {
    if !path.is_file() {
        return Err(Error::Config {
            message: format!("feed list not found: {}", path.display()),
            key: Some("file".to_string()),
        });
    }
    let content = std::fs::read_to_string(path)?;
    Ok(parse_feed_list(&content))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sanitize_keeps_permitted_characters_in_order() {
        assert_eq!(sanitize("Hello, World 100% _ok-"), "Hello, World 100% _ok-");
    }

    #[test]
    fn sanitize_strips_path_separators_and_nul() {
        assert_eq!(sanitize("a/b\\c\0d"), "abcd");
        assert_eq!(sanitize(".."), "");
        assert_eq!(sanitize("/"), "");
    }

    #[test]
    fn sanitize_strips_non_ascii_without_substitution() {
        assert_eq!(sanitize("Café Ünïcode 日本"), "Caf ncode ");
        assert_eq!(sanitize("tab\there\nnewline"), "tabherenewline");
    }

    #[test]
    fn sanitize_output_only_contains_permitted_set() {
        // Every char in the Latin-1 range plus some astral ones
        let input: String = (0u32..=0x2FF)
            .chain([0x1F600, 0x10FFFF])
            .filter_map(char::from_u32)
            .collect();
        let out = sanitize(&input);

        assert!(out.chars().all(is_safe_char));
        assert_eq!(
            out,
            " %,-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz"
        );
    }

    #[test]
    fn sanitize_empty_input() {
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn feed_list_keeps_only_http_lines() {
        let content = "#My Show\nhttps://example.com/a.rss\n\n  http://example.com/b.xml  \nftp://nope\nnot a url\n";
        assert_eq!(
            parse_feed_list(content),
            vec![
                "https://example.com/a.rss".to_string(),
                "http://example.com/b.xml".to_string()
            ]
        );
    }

    #[test]
    fn read_feed_list_missing_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = read_feed_list(&temp_dir.path().join("feeds.txt"));
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn read_feed_list_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("feeds.txt");
        std::fs::write(&path, "#Show\nhttps://example.com/feed\n").unwrap();

        assert_eq!(
            read_feed_list(&path).unwrap(),
            vec!["https://example.com/feed".to_string()]
        );
    }
}
