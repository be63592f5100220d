//! Human-readable listings of stored and registered mocks.
//!
//! Labels are numbered from 1 so the numbers can be passed back to
//! `clear_mock_at` (stored mocks) or `apply_ready` (registered mocks).

use std::fmt;

use serde_json::Value;

use crate::error::Result;
use crate::normalize::normalize_url;
use crate::registry::MockDeclaration;
use crate::store::PreparedMock;
use crate::types::UrlPattern;

/// One line of a listing: a label and the response body it refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingEntry {
    /// Label, starting with the 1-based number.
    pub label: String,
    /// Response body.
    pub data: Value,
}

impl fmt::Display for ListingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.label, self.data)
    }
}

/// List stored mocks in load order.
///
/// Labels read `<n> <originalUrl> <method> <originalStatus> T:<times> D:<delay>`.
#[must_use]
pub fn set_mocks(mocks: &[PreparedMock]) -> Vec<ListingEntry> {
    mocks
        .iter()
        .enumerate()
        .map(|(i, mock)| ListingEntry {
            label: format!(
                "{} {} {} {} T:{} D:{}",
                i + 1,
                mock.original_url,
                mock.method,
                mock.original_status,
                mock.times,
                mock.options.delay.unwrap_or(0)
            ),
            data: mock.data.clone(),
        })
        .collect()
}

/// List registered declarations, optionally filtered.
///
/// The filter is normalized like a URL. Declarations whose URL or name equals
/// it come first, then those containing it; numbers always refer to the
/// unfiltered position. Labels read
/// `<n>[ <widget>] <originalUrl> <originalStatus> <method> N:<name|->`.
///
/// # Errors
///
/// Returns an error if the filter is a malformed absolute URL.
pub fn registered_mocks(
    declarations: &[MockDeclaration],
    filter: Option<&str>,
) -> Result<Vec<ListingEntry>> {
    let filter = filter
        .filter(|f| !f.is_empty())
        .map(normalize_url)
        .transpose()?;

    let selected: Vec<usize> = match filter.as_deref() {
        None => (0..declarations.len()).collect(),
        Some(filter) => {
            let mut exact = Vec::new();
            let mut partial = Vec::new();
            for (index, declaration) in declarations.iter().enumerate() {
                let literal = match &declaration.url {
                    UrlPattern::Literal(url) => Some(url.as_str()),
                    UrlPattern::Regex(_) => None,
                };
                let name = declaration.name.as_deref();

                if literal == Some(filter) || name == Some(filter) {
                    exact.push(index);
                } else if literal.is_some_and(|url| url.contains(filter))
                    || name.is_some_and(|name| name.contains(filter))
                {
                    partial.push(index);
                }
            }
            exact.into_iter().chain(partial).collect()
        }
    };

    Ok(selected
        .into_iter()
        .map(|index| {
            let declaration = &declarations[index];
            let widget = declaration
                .widget_name
                .as_deref()
                .map_or_else(|| " ".to_string(), |w| format!(" {w} "));
            ListingEntry {
                label: format!(
                    "{}{widget}{} {} {} N:{}",
                    index + 1,
                    declaration.original_url,
                    declaration.original_status,
                    declaration.method,
                    declaration.name.as_deref().unwrap_or("-")
                ),
                data: declaration.data.clone(),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CodeStatus, HttpMethod, MockOptions, Times};
    use serde_json::json;

    fn declaration(url: &str, name: Option<&str>) -> MockDeclaration {
        let mut declaration = MockDeclaration::new(
            HttpMethod::Get,
            UrlPattern::literal(url),
            200,
            CodeStatus::Success,
            json!({"url": url}),
        )
        .unwrap();
        declaration.name = name.map(str::to_string);
        declaration
    }

    #[test]
    fn stored_mock_labels() {
        let mock = PreparedMock {
            key: "__MOCK_XHR__(post)[2]/a/{{param}}".into(),
            method: HttpMethod::Post,
            times: Times::Count(2),
            url: UrlPattern::literal("/a/{{param}}"),
            status: 424,
            data: json!([1]),
            options: MockOptions::with_delay(300),
            original_url: UrlPattern::literal("/a/:id"),
            original_status: CodeStatus::Error,
            headers: None,
        };

        let listing = set_mocks(&[mock]);
        assert_eq!(listing[0].label, "1 /a/:id post error T:2 D:300");
        assert_eq!(listing[0].data, json!([1]));
    }

    #[test]
    fn registered_labels_include_widget_and_name() {
        let mut with_widget = declaration("/cart", Some("cart"));
        with_widget.widget_name = Some("shop".into());
        let listing = registered_mocks(&[declaration("/a", None), with_widget], None).unwrap();

        assert_eq!(listing[0].label, "1 /a success get N:-");
        assert_eq!(listing[1].label, "2 shop /cart success get N:cart");
    }

    #[test]
    fn exact_matches_come_first() {
        let declarations = [
            declaration("/users/list", None),
            declaration("/users", None),
            declaration("/posts", Some("users")),
            declaration("/posts/all", None),
        ];

        let listing = registered_mocks(&declarations, Some("/users/")).unwrap();
        let numbers: Vec<&str> = listing
            .iter()
            .map(|e| e.label.split(' ').next().unwrap())
            .collect();
        assert_eq!(numbers, vec!["2", "1"]);

        let listing = registered_mocks(&declarations, Some("users")).unwrap();
        let numbers: Vec<&str> = listing
            .iter()
            .map(|e| e.label.split(' ').next().unwrap())
            .collect();
        assert_eq!(numbers, vec!["3", "1", "2"]);
    }
}
