use std::borrow::Cow;

/// Separator whose presence marks a URI as already carrying a scheme
pub const SCHEME_SEPARATOR: &str = "://";

/// Prefixes `http://` to a URI that has no scheme separator
///
/// Nothing else is canonicalised: case, trailing slashes and query order are
/// left exactly as given.
///
/// # Examples
///
/// ```
/// use walker::url::ensure_scheme;
///
/// assert_eq!(ensure_scheme("example.com"), "http://example.com");
/// assert_eq!(ensure_scheme("https://example.com/"), "https://example.com/");
/// ```
pub fn ensure_scheme(uri: &str) -> Cow<'_, str> {
    if uri.contains(SCHEME_SEPARATOR) {
        Cow::Borrowed(uri)
    } else {
        Cow::Owned(format!("http://{}", uri))
    }
}
