//! Link extraction from raw document text
//!
//! Links are found with a permissive, case-insensitive pattern rather than by
//! walking markup, so URLs in attributes, scripts and plain prose are all
//! picked up. The pattern recognizes:
//! - `scheme:` prefixes (`http://`, `ftp://`, `mailto:x`)
//! - `www.`, `www1.` .. `www999.` hosts
//! - bare `host.tld/` strings
//!
//! followed by a greedy run of non-whitespace, non-bracket characters. Up to
//! two levels of balanced parentheses are kept, and trailing punctuation or
//! quote characters are dropped. It is a heuristic: some matches will not
//! resolve, and URLs ending in unusual punctuation get truncated.

use regex::Regex;
use std::sync::OnceLock;

const URI_PATTERN: &str = r#"(?i)\b((?:[a-z][\w-]+:(?:/{1,3}|[a-z0-9%])|www\d{0,3}[.]|[a-z0-9.\-]+[.][a-z]{2,4}/)(?:[^\s()<>]+|\(([^\s()<>]+|(\([^\s()<>]+\)))*\))+(?:\(([^\s()<>]+|(\([^\s()<>]+\)))*\)|[^\s`!()\[\]{};:'".,<>?«»“”‘’]))"#;

fn uri_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(URI_PATTERN).expect("static regex compiles"))
}

/// Lazily yields every URI-like substring of `source`, in order of appearance
///
/// Nothing is deduplicated or validated here; the frontier takes care of
/// repeats. Calling this again on the same string yields the same sequence.
///
/// # Example
///
/// ```
/// use walker::crawler::extract_uris;
///
/// let found: Vec<String> =
///     extract_uris("Check http://example.com/page?q=1 and (see www.test.org/a).").collect();
/// assert_eq!(found, vec!["http://example.com/page?q=1", "www.test.org/a"]);
/// ```
pub fn extract_uris(source: &str) -> impl Iterator<Item = String> + '_ {
    uri_pattern()
        .find_iter(source)
        .map(|found| found.as_str().to_string())
}
