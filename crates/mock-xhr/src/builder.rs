//! Response builder writing mocks straight to the persistent store.
//!
//! ```ignore
//! system.get("/users").times(Times::Count(2)).delay(300).success(Some(json!([])), None)?;
//! ```

use serde_json::Value;

use crate::error::{MockError, Result};
use crate::normalize::normalize_url;
use crate::storage::KeyValueStore;
use crate::store::MockRecord;
use crate::system::MockSystem;
use crate::types::{CodeStatus, HttpMethod, MockOptions, ResponseHeaders, Times, UrlPattern};

/// Builder for one stored mock, started by [`MockSystem::mock`].
#[must_use = "nothing is stored until success, error or with_status is called"]
pub struct MethodBuilder<'a, S> {
    system: &'a mut MockSystem<S>,
    method: HttpMethod,
    url: UrlPattern,
    times: Times,
    delay: Option<u64>,
}

impl<'a, S: KeyValueStore> MethodBuilder<'a, S> {
    pub(crate) fn new(system: &'a mut MockSystem<S>, method: HttpMethod, url: UrlPattern) -> Self {
        Self {
            system,
            method,
            url,
            times: Times::Always,
            delay: None,
        }
    }

    /// Set the repeat count; `Times::Count(n)` mocks are served once each,
    /// lowest count first, before the repeating one.
    pub const fn times(mut self, times: Times) -> Self {
        self.times = times;
        self
    }

    /// Delay the response by `ms` milliseconds.
    pub const fn delay(mut self, ms: u64) -> Self {
        self.delay = Some(ms);
        self
    }

    /// Store a response with the configured success status.
    ///
    /// Without data, the body of a registered declaration with the same URL,
    /// method and status is reused.
    ///
    /// # Errors
    ///
    /// See [`with_status`](Self::with_status).
    pub fn success(self, data: Option<Value>, headers: Option<ResponseHeaders>) -> Result<String> {
        self.store(CodeStatus::Success, data, headers)
    }

    /// Store a response with the configured error status.
    ///
    /// # Errors
    ///
    /// See [`with_status`](Self::with_status).
    pub fn error(self, data: Option<Value>, headers: Option<ResponseHeaders>) -> Result<String> {
        self.store(CodeStatus::Error, data, headers)
    }

    /// Store a response with an explicit status code.
    ///
    /// Returns the storage key.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::UnrootedUrl`] for a literal URL that starts with
    /// neither `http` nor `/`, [`MockError::StringResponseBody`] for string
    /// data, [`MockError::StatusWithoutData`] when data is null,
    /// [`MockError::DataNotFound`] when no declaration supplies data.
    pub fn with_status(self, code: u16, data: Value, headers: Option<ResponseHeaders>) -> Result<String> {
        self.store(CodeStatus::Code(code), Some(data), headers)
    }

    fn store(
        self,
        status: CodeStatus,
        data: Option<Value>,
        headers: Option<ResponseHeaders>,
    ) -> Result<String> {
        let url = match &self.url {
            UrlPattern::Literal(literal) => {
                if !literal.starts_with("http") && !literal.starts_with('/') {
                    return Err(MockError::UnrootedUrl {
                        url: literal.clone(),
                    });
                }
                UrlPattern::Literal(normalize_url(literal)?)
            }
            UrlPattern::Regex(_) => self.url.clone(),
        };

        let (data, headers) = match data {
            Some(Value::String(_)) => return Err(MockError::StringResponseBody),
            Some(Value::Null) | None => {
                if status.is_code() {
                    return Err(MockError::StatusWithoutData);
                }
                self.registered_response(&url, status, headers)?
            }
            Some(data) => (data, headers),
        };

        let record = MockRecord {
            method: self.method,
            times: self.times,
            url,
            original_url: self.url,
            status: self.system.config().status_codes.resolve(status),
            original_status: status,
            data,
            options: MockOptions { delay: self.delay },
            headers,
        };
        let key = self.system.save(&record)?;
        tracing::info!(%key, "Mock stored");
        Ok(key)
    }

    fn registered_response(
        &self,
        url: &UrlPattern,
        status: CodeStatus,
        headers: Option<ResponseHeaders>,
    ) -> Result<(Value, Option<ResponseHeaders>)> {
        let not_found = || MockError::DataNotFound {
            url: url.to_string(),
            method: self.method,
        };
        if url.is_regex() {
            return Err(not_found());
        }
        let code = self.system.config().status_codes.resolve(status);

        self.system
            .all_declarations()
            .into_iter()
            .find(|d| d.method == self.method && d.status == code && &d.url == url)
            .map(|d| (d.data, headers.or(d.headers)))
            .ok_or_else(not_found)
    }
}
