//! Pattern compilation.
//!
//! A stored URL is resolved against the base URL and turned into a
//! [`Matcher`] for the interception adapter. URLs without sentinel tokens stay
//! literal; tokenized URLs become regexes anchored at the end only, so they
//! match regardless of the scheme and host in front of the path.

pub mod cache;

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use url::Url;

use crate::error::{MockError, Result};
use crate::normalize::{
    OPTIONAL_SEARCH_TOKEN, PARAM_TOKEN, REQUIRED_SEARCH_TOKEN, TOKENS, is_absolute,
};

pub use cache::{GLOBAL_CACHE, PatternCache};

/// Regex fragment substituted for [`PARAM_TOKEN`].
pub const PARAM_FRAGMENT: &str = r"[\w-]+";

/// Regex fragment substituted for [`OPTIONAL_SEARCH_TOKEN`].
pub const OPTIONAL_SEARCH_FRAGMENT: &str = r"((\?).+)?";

/// Regex fragment substituted for [`REQUIRED_SEARCH_TOKEN`].
pub const REQUIRED_SEARCH_FRAGMENT: &str = r"((\?).+)";

/// A compiled regular expression with its source pattern.
#[derive(Clone)]
pub struct CompiledRegex {
    source: String,
    regex: Arc<Regex>,
}

impl CompiledRegex {
    /// Compile a regex through the global cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is not a valid regex.
    pub fn compile(source: &str) -> Result<Self> {
        let regex = GLOBAL_CACHE.get_or_compile(source)?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// Get the source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.source
    }

    /// Check if the regex matches anywhere in `text`.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for CompiledRegex {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for CompiledRegex {}

impl fmt::Debug for CompiledRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompiledRegex").field(&self.source).finish()
    }
}

/// What an adapter handler matches request URLs against.
#[derive(Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Exact URL equality.
    Literal(String),
    /// Regex search.
    Regex(CompiledRegex),
}

impl Matcher {
    /// Check if a request URL satisfies this matcher.
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == url,
            Self::Regex(regex) => regex.is_match(url),
        }
    }

    /// The literal URL or regex source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(literal) => literal,
            Self::Regex(regex) => regex.pattern(),
        }
    }

    /// Check if this is a regex matcher.
    #[must_use]
    pub const fn is_regex(&self) -> bool {
        matches!(self, Self::Regex(_))
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "Literal({s:?})"),
            Self::Regex(r) => write!(f, "Regex({:?})", r.pattern()),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => f.write_str(s),
            Self::Regex(r) => write!(f, "/{}/", r.pattern()),
        }
    }
}

/// Ensure a base URL ends with `/` (and starts with `/` unless absolute).
#[must_use]
pub fn base_for_relative(base_url: &str) -> String {
    let mut base = if is_absolute(base_url) || base_url.starts_with('/') {
        base_url.to_string()
    } else {
        format!("/{base_url}")
    };
    if !base.ends_with('/') {
        base.push('/');
    }
    base
}

fn origin_of(base_url: &str) -> Result<String> {
    let parsed = Url::parse(base_url).map_err(|source| MockError::MalformedUrl {
        url: base_url.to_string(),
        source,
    })?;
    Ok(parsed.origin().ascii_serialization())
}

/// Resolve a stored URL against the base URL.
///
/// - a URL already starting with the base is kept;
/// - a base of `/` keeps the URL;
/// - an unrooted URL is appended to the base;
/// - a rooted URL replaces the path of an absolute base (origin is kept);
/// - a rooted URL is appended to a relative base.
///
/// # Errors
///
/// Returns [`MockError::MalformedUrl`] if an absolute base cannot be parsed.
pub fn full_url_to_mock(base_url: &str, url: &str) -> Result<String> {
    if url.starts_with(base_url) || base_url == "/" {
        return Ok(url.to_string());
    }

    if !url.starts_with('/') {
        return Ok(base_for_relative(base_url) + url);
    }

    if is_absolute(base_url) {
        return Ok(origin_of(base_url)? + url);
    }

    Ok(base_for_relative(base_url) + &url[1..])
}

fn fragment_for(token: &str) -> &'static str {
    match token {
        PARAM_TOKEN => PARAM_FRAGMENT,
        OPTIONAL_SEARCH_TOKEN => OPTIONAL_SEARCH_FRAGMENT,
        REQUIRED_SEARCH_TOKEN => REQUIRED_SEARCH_FRAGMENT,
        _ => unreachable!("unknown sentinel token {token}"),
    }
}

/// Turn a resolved URL containing sentinel tokens into a regex source.
///
/// Literal parts are escaped; the result is anchored at the end only.
#[must_use]
pub fn regex_source(resolved: &str) -> String {
    let mut source = String::with_capacity(resolved.len() + 16);
    let mut rest = resolved;

    loop {
        let next = TOKENS
            .iter()
            .filter_map(|token| rest.find(token).map(|pos| (pos, *token)))
            .min_by_key(|(pos, _)| *pos);

        match next {
            Some((pos, token)) => {
                source.push_str(&regex::escape(&rest[..pos]));
                source.push_str(fragment_for(token));
                rest = &rest[pos + token.len()..];
            }
            None => {
                source.push_str(&regex::escape(rest));
                break;
            }
        }
    }

    source.push('$');
    source
}

/// Compile a stored URL into a matcher for the given base URL.
///
/// # Errors
///
/// Returns an error if the base URL is malformed or the generated regex
/// fails to compile.
pub fn compile(base_url: &str, url: &str) -> Result<Matcher> {
    let resolved = full_url_to_mock(base_url, url)?;
    if !TOKENS.iter().any(|token| resolved.contains(token)) {
        return Ok(Matcher::Literal(resolved));
    }

    Ok(Matcher::Regex(CompiledRegex::compile(&regex_source(
        &resolved,
    ))?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_base_keeps_origin_for_rooted_url() {
        assert_eq!(
            full_url_to_mock("https://example.com/api", "/users").unwrap(),
            "https://example.com/users"
        );
        assert_eq!(
            full_url_to_mock("https://example.com", "/posts").unwrap(),
            "https://example.com/posts"
        );
    }

    #[test]
    fn root_base_keeps_url() {
        assert_eq!(full_url_to_mock("/", "/posts").unwrap(), "/posts");
    }

    #[test]
    fn unrooted_url_is_appended_to_base() {
        assert_eq!(
            full_url_to_mock("https://example.com", "users").unwrap(),
            "https://example.com/users"
        );
        assert_eq!(
            full_url_to_mock("https://example.com/api", "users").unwrap(),
            "https://example.com/api/users"
        );
        assert_eq!(full_url_to_mock("api", "users").unwrap(), "/api/users");
    }

    #[test]
    fn url_with_base_prefix_is_kept() {
        assert_eq!(
            full_url_to_mock("/api/v1", "/api/v1/abc/qwe").unwrap(),
            "/api/v1/abc/qwe"
        );
    }

    #[test]
    fn rooted_url_is_appended_to_relative_base() {
        assert_eq!(full_url_to_mock("/abc", "/articles").unwrap(), "/abc/articles");
    }

    #[test]
    fn malformed_base_is_reported() {
        assert!(matches!(
            full_url_to_mock("http://", "/users"),
            Err(MockError::MalformedUrl { .. })
        ));
    }

    #[test]
    fn literal_url_compiles_to_literal() {
        let matcher = compile("http://localhost:8080/", "abc/qwe").unwrap();
        assert_eq!(
            matcher,
            Matcher::Literal("http://localhost:8080/abc/qwe".into())
        );
    }

    #[test]
    fn param_and_required_search_compile_to_regex() {
        let url = format!("abc/{PARAM_TOKEN}/qwe{REQUIRED_SEARCH_TOKEN}");
        let matcher = compile("http://localhost:8080/", &url).unwrap();

        assert!(matcher.is_regex());
        assert_eq!(
            matcher.as_str(),
            r"http://localhost:8080/abc/[\w-]+/qwe((\?).+)$"
        );
        assert!(matcher.matches("http://localhost:8080/abc/42/qwe?x=1"));
        assert!(!matcher.matches("http://localhost:8080/abc/42/qwe"));
    }

    #[test]
    fn optional_search_matches_with_and_without_query() {
        let url = format!("abc/123/qwe{OPTIONAL_SEARCH_TOKEN}");
        let matcher = compile("http://localhost:8080/", &url).unwrap();

        assert_eq!(matcher.as_str(), r"http://localhost:8080/abc/123/qwe((\?).+)?$");
        assert!(matcher.matches("http://localhost:8080/abc/123/qwe"));
        assert!(matcher.matches("http://localhost:8080/abc/123/qwe?page=1"));
    }

    #[test]
    fn regex_is_anchored_at_end_only() {
        let matcher = compile("/", &format!("/users/{PARAM_TOKEN}")).unwrap();

        assert!(!matcher.as_str().starts_with('^'));
        assert!(matcher.as_str().ends_with('$'));
        assert!(matcher.matches("https://any.host/users/ab-12"));
        assert!(!matcher.matches("/users/ab-12/posts"));
        assert!(!matcher.matches("/users/a.b"));
    }

    #[test]
    fn literal_parts_are_escaped() {
        let source = regex_source(&format!("https://example.com/a+b/{PARAM_TOKEN}"));
        assert_eq!(source, r"https://example\.com/a\+b/[\w-]+$");
    }
}
