//! URL normalization.
//!
//! Caller URLs are canonicalized into a storage-safe form: absolute URLs are
//! reduced to path and query, trailing slashes are dropped and dynamic parts
//! are replaced with sentinel tokens:
//!
//! | Declared      | Stored            |
//! |---------------|-------------------|
//! | `:name`       | [`PARAM_TOKEN`]   |
//! | `:?search`    | [`OPTIONAL_SEARCH_TOKEN`] |
//! | `:!search`    | [`REQUIRED_SEARCH_TOKEN`] |

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{MockError, Result};

/// Stands in for a `:name` path segment.
pub const PARAM_TOKEN: &str = "{{param}}";

/// Stands in for a `:?search` suffix (query string may be present).
pub const OPTIONAL_SEARCH_TOKEN: &str = "{{search?}}";

/// Stands in for a `:!search` suffix (query string must be present).
pub const REQUIRED_SEARCH_TOKEN: &str = "{{search!}}";

/// All sentinel tokens.
pub const TOKENS: [&str; 3] = [PARAM_TOKEN, OPTIONAL_SEARCH_TOKEN, REQUIRED_SEARCH_TOKEN];

static PATH_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\w+").expect("path param regex is valid"));

const OPTIONAL_SEARCH: &str = ":?search";
const REQUIRED_SEARCH: &str = ":!search";

/// Check if a URL starts with an `http` or `https` scheme.
#[must_use]
pub fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Reduce an absolute URL to its path and query; relative URLs pass through.
///
/// # Errors
///
/// Returns [`MockError::MalformedUrl`] if an absolute URL cannot be parsed.
pub fn get_relative_url(url: &str) -> Result<String> {
    if !is_absolute(url) {
        return Ok(url.to_string());
    }

    let parsed = Url::parse(url).map_err(|source| MockError::MalformedUrl {
        url: url.to_string(),
        source,
    })?;

    Ok(match parsed.query() {
        Some(query) if !query.is_empty() => format!("{}?{query}", parsed.path()),
        _ => parsed.path().to_string(),
    })
}

/// Normalize a declared URL into its stored form.
///
/// The root path `/` is kept as is; any other trailing slash is removed.
///
/// # Errors
///
/// Returns [`MockError::EmptyUrl`] for an empty URL and
/// [`MockError::MalformedUrl`] for an unparseable absolute URL.
pub fn normalize_url(url: &str) -> Result<String> {
    if url.is_empty() {
        return Err(MockError::EmptyUrl);
    }

    let relative = get_relative_url(url)?;
    let trimmed = match relative.trim_end_matches('/') {
        "" if relative.starts_with('/') => "/",
        rest => rest,
    };

    let normalized = PATH_PARAM
        .replace_all(trimmed, PARAM_TOKEN)
        .replacen(OPTIONAL_SEARCH, OPTIONAL_SEARCH_TOKEN, 1)
        .replacen(REQUIRED_SEARCH, REQUIRED_SEARCH_TOKEN, 1);

    Ok(normalized)
}

/// Check if a normalized URL contains any sentinel token.
#[must_use]
pub fn has_tokens(url: &str) -> bool {
    TOKENS.iter().any(|token| url.contains(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn absolute_url_becomes_path() {
        assert_eq!(normalize_url("http://localhost:8000/abc/qwe").unwrap(), "/abc/qwe");
    }

    #[test]
    fn absolute_url_keeps_query() {
        assert_eq!(
            normalize_url("https://example.com/abc?page=2").unwrap(),
            "/abc?page=2"
        );
        assert_eq!(get_relative_url("https://example.com/abc?").unwrap(), "/abc");
    }

    #[test]
    fn rooted_and_relative_urls_pass_through() {
        assert_eq!(normalize_url("/abc/qwe").unwrap(), "/abc/qwe");
        assert_eq!(normalize_url("abc/qwe").unwrap(), "abc/qwe");
    }

    #[test]
    fn trailing_slash_is_removed() {
        assert_eq!(normalize_url("/abc/qwe/").unwrap(), "/abc/qwe");
        assert_eq!(normalize_url("/").unwrap(), "/");
    }

    #[test]
    fn params_become_tokens() {
        assert_eq!(
            normalize_url("/:account/qwe:?search").unwrap(),
            format!("/{PARAM_TOKEN}/qwe{OPTIONAL_SEARCH_TOKEN}")
        );
        assert_eq!(
            normalize_url("abc/:id/qwe/:otherId").unwrap(),
            format!("abc/{PARAM_TOKEN}/qwe/{PARAM_TOKEN}")
        );
    }

    #[test]
    fn required_search_becomes_token() {
        assert_eq!(
            normalize_url("/abc/qwe:!search").unwrap(),
            format!("/abc/qwe{REQUIRED_SEARCH_TOKEN}")
        );
    }

    #[test]
    fn empty_url_is_rejected() {
        assert!(matches!(normalize_url(""), Err(MockError::EmptyUrl)));
    }

    #[test]
    fn malformed_absolute_url_is_rejected() {
        assert!(matches!(
            normalize_url("http://"),
            Err(MockError::MalformedUrl { .. })
        ));
    }

    #[test]
    fn token_detection() {
        assert!(has_tokens(&normalize_url("/a/:id").unwrap()));
        assert!(!has_tokens("/a/b"));
    }

    proptest! {
        #[test]
        fn normalized_never_ends_with_slash(
            segments in prop::collection::vec("(:?[a-z0-9_-]{1,8})", 1..5),
            rooted in any::<bool>(),
            trailing in any::<bool>(),
        ) {
            let mut url = segments.join("/");
            if rooted {
                url.insert(0, '/');
            }
            if trailing {
                url.push('/');
            }
            let normalized = normalize_url(&url).unwrap();
            prop_assert!(!normalized.ends_with('/'));
        }

        #[test]
        fn normalization_is_idempotent(
            segments in prop::collection::vec("(:?[a-z0-9_-]{1,8})", 1..5),
            search in prop::sample::select(vec!["", ":?search", ":!search"]),
        ) {
            let url = format!("/{}{search}", segments.join("/"));
            let once = normalize_url(&url).unwrap();
            let twice = normalize_url(&once).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
