//! Installing registered declarations.
//!
//! A declaration is picked by its 1-based position in the merged listing or
//! by name, optionally overridden, and turned into a [`MockRecord`] ready for
//! the persistent store.

use std::fmt;

use serde_json::Value;

use crate::config::StatusCodes;
use crate::error::{MockError, Result};
use crate::registry::MockDeclaration;
use crate::store::MockRecord;
use crate::types::{CodeStatus, MockOptions, ResponseHeaders, Times};

/// Reference to a registered declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockRef {
    /// 1-based position in the merged registered listing.
    Index(usize),
    /// Declaration name, optionally scoped to a widget.
    Name {
        /// Declaration name.
        name: String,
        /// Widget that contributed the declaration.
        widget: Option<String>,
    },
}

impl MockRef {
    /// Reference a declaration by name in a specific widget.
    #[must_use]
    pub fn in_widget(name: impl Into<String>, widget: impl Into<String>) -> Self {
        Self::Name {
            name: name.into(),
            widget: Some(widget.into()),
        }
    }
}

impl From<usize> for MockRef {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for MockRef {
    fn from(name: &str) -> Self {
        Self::Name {
            name: name.to_string(),
            widget: None,
        }
    }
}

impl From<String> for MockRef {
    fn from(name: String) -> Self {
        Self::Name { name, widget: None }
    }
}

impl fmt::Display for MockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "#{index}"),
            Self::Name { name, widget: None } => f.write_str(name),
            Self::Name {
                name,
                widget: Some(widget),
            } => write!(f, "{widget}/{name}"),
        }
    }
}

/// Replacement value, or a function of the declared value.
pub enum Override<T, A = T> {
    /// Use this value.
    Value(T),
    /// Compute from the declared value.
    Map(Box<dyn FnOnce(A) -> T + Send>),
}

impl<T: fmt::Debug, A> fmt::Debug for Override<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Map(_) => f.write_str("Map(..)"),
        }
    }
}

/// Options applied on top of a declaration.
#[derive(Debug, Default)]
pub struct ApplyOverrides {
    data: Option<Override<Value>>,
    headers: Option<Override<ResponseHeaders, Option<ResponseHeaders>>>,
    times: Option<Times>,
    status: Option<CodeStatus>,
    delay: Option<u64>,
}

impl ApplyOverrides {
    /// No overrides: install as declared, repeating.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the body.
    #[must_use]
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(Override::Value(data));
        self
    }

    /// Derive the body from the declared one.
    #[must_use]
    pub fn map_data(mut self, f: impl FnOnce(Value) -> Value + Send + 'static) -> Self {
        self.data = Some(Override::Map(Box::new(f)));
        self
    }

    /// Replace the headers.
    #[must_use]
    pub fn headers(mut self, headers: ResponseHeaders) -> Self {
        self.headers = Some(Override::Value(headers));
        self
    }

    /// Derive the headers from the declared ones.
    #[must_use]
    pub fn map_headers(
        mut self,
        f: impl FnOnce(Option<ResponseHeaders>) -> ResponseHeaders + Send + 'static,
    ) -> Self {
        self.headers = Some(Override::Map(Box::new(f)));
        self
    }

    /// Set the repeat count (default `always`).
    #[must_use]
    pub const fn times(mut self, times: Times) -> Self {
        self.times = Some(times);
        self
    }

    /// Replace the status.
    #[must_use]
    pub const fn status(mut self, status: CodeStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set a response delay in milliseconds.
    #[must_use]
    pub const fn delay(mut self, ms: u64) -> Self {
        self.delay = Some(ms);
        self
    }
}

/// Find the declaration a reference points to.
///
/// # Errors
///
/// Returns [`MockError::MockIndexOutOfRange`] for an index outside
/// `1..=len` and [`MockError::MockNotFound`] for an unknown name.
pub fn resolve<'a>(declarations: &'a [MockDeclaration], reference: &MockRef) -> Result<&'a MockDeclaration> {
    match reference {
        MockRef::Index(index) => {
            if *index < 1 || *index > declarations.len() {
                return Err(MockError::MockIndexOutOfRange {
                    index: *index,
                    len: declarations.len(),
                });
            }
            Ok(&declarations[index - 1])
        }
        MockRef::Name { name, widget } => declarations
            .iter()
            .find(|d| {
                d.name.as_deref() == Some(name.as_str())
                    && widget
                        .as_deref()
                        .is_none_or(|w| d.widget_name.as_deref() == Some(w))
            })
            .ok_or_else(|| MockError::MockNotFound {
                name: reference.to_string(),
            }),
    }
}

/// Build the record to store for a declaration with overrides applied.
#[must_use]
pub fn prepare(declaration: &MockDeclaration, overrides: ApplyOverrides, codes: StatusCodes) -> MockRecord {
    let data = match overrides.data {
        Some(Override::Value(data)) => data,
        Some(Override::Map(f)) => f(declaration.data.clone()),
        None => declaration.data.clone(),
    };
    let headers = match overrides.headers {
        Some(Override::Value(headers)) => Some(headers),
        Some(Override::Map(f)) => Some(f(declaration.headers.clone())),
        None => declaration.headers.clone(),
    };
    let (status, original_status) = match overrides.status {
        Some(status) => (codes.resolve(status), status),
        None => (declaration.status, declaration.original_status),
    };

    MockRecord {
        method: declaration.method,
        times: overrides.times.unwrap_or_default(),
        url: declaration.url.clone(),
        original_url: declaration.original_url.clone(),
        status,
        original_status,
        data,
        options: MockOptions {
            delay: overrides.delay,
        },
        headers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HttpMethod, UrlPattern};
    use serde_json::json;

    fn declarations() -> Vec<MockDeclaration> {
        let first = MockDeclaration::new(
            HttpMethod::Get,
            UrlPattern::literal("/users"),
            200,
            CodeStatus::Success,
            json!({"users": []}),
        )
        .unwrap()
        .named("users");
        let mut second = MockDeclaration::new(
            HttpMethod::Get,
            UrlPattern::literal("/cart"),
            200,
            CodeStatus::Success,
            json!({"items": 1}),
        )
        .unwrap()
        .named("cart");
        second.widget_name = Some("shop".into());
        vec![first, second]
    }

    #[test]
    fn resolves_by_index_and_name() {
        let all = declarations();
        assert_eq!(resolve(&all, &MockRef::Index(2)).unwrap().name.as_deref(), Some("cart"));
        assert_eq!(resolve(&all, &"users".into()).unwrap().url, UrlPattern::literal("/users"));
        assert!(resolve(&all, &MockRef::in_widget("cart", "shop")).is_ok());
    }

    #[test]
    fn index_out_of_range() {
        let all = declarations();
        for index in [0, 3] {
            assert!(matches!(
                resolve(&all, &MockRef::Index(index)),
                Err(MockError::MockIndexOutOfRange { len: 2, .. })
            ));
        }
    }

    #[test]
    fn unknown_name_or_wrong_widget() {
        let all = declarations();
        assert!(matches!(
            resolve(&all, &"nobody".into()),
            Err(MockError::MockNotFound { .. })
        ));
        assert!(matches!(
            resolve(&all, &MockRef::in_widget("users", "shop")),
            Err(MockError::MockNotFound { .. })
        ));
    }

    #[test]
    fn defaults_install_as_declared() {
        let all = declarations();
        let record = prepare(&all[0], ApplyOverrides::new(), StatusCodes::default());

        assert_eq!(record.times, Times::Always);
        assert_eq!(record.status, 200);
        assert_eq!(record.original_status, CodeStatus::Success);
        assert_eq!(record.data, json!({"users": []}));
        assert_eq!(record.options, MockOptions::default());
    }

    #[test]
    fn overrides_are_applied() {
        let all = declarations();
        let overrides = ApplyOverrides::new()
            .map_data(|mut data| {
                data["users"] = json!(["ann"]);
                data
            })
            .map_headers(|headers| {
                let mut headers = headers.unwrap_or_default();
                headers.insert("x-total".into(), json!(1));
                headers
            })
            .times(Times::Count(1))
            .status(CodeStatus::Error)
            .delay(500);

        let record = prepare(&all[0], overrides, StatusCodes::default());
        assert_eq!(record.data, json!({"users": ["ann"]}));
        assert_eq!(record.headers.unwrap()["x-total"], json!(1));
        assert_eq!(record.times, Times::Count(1));
        assert_eq!(record.status, 424);
        assert_eq!(record.original_status, CodeStatus::Error);
        assert_eq!(record.options.delay, Some(500));
    }
}
