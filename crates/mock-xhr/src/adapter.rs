//! Request interception.
//!
//! The [`Interceptor`] trait is the seam between the mock system and an HTTP
//! client: handlers are registered per method with a URL [`Matcher`] and a
//! [`Responder`]. [`MockAdapter`] is the in-crate implementation; requests
//! that match no handler are settled according to its [`NoMatchPolicy`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MockError, Result};
use crate::pattern::Matcher;
use crate::types::{HttpMethod, ResponseHeaders};

/// A structured request descriptor as seen by the adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request URL, absolute or relative to `base_url`.
    pub url: String,
    /// Client base URL, if configured.
    pub base_url: Option<String>,
    /// Request body.
    pub body: Option<Value>,
    /// Query parameters.
    pub params: BTreeMap<String, String>,
    /// Request headers.
    pub headers: BTreeMap<String, String>,
}

impl Request {
    /// Create a request without body, parameters or headers.
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            base_url: None,
            body: None,
            params: BTreeMap::new(),
            headers: BTreeMap::new(),
        }
    }

    /// Shorthand for a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    /// Shorthand for a POST request.
    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    /// Set the client base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// The URL joined with the base URL, when the URL is relative.
    #[must_use]
    pub fn full_url(&self) -> Option<String> {
        let base = self.base_url.as_deref()?;
        if self.url.starts_with("http://") || self.url.starts_with("https://") {
            return None;
        }
        Some(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            self.url.trim_start_matches('/')
        ))
    }
}

/// A canned reply produced by a responder.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub data: Value,
    /// Optional response headers.
    pub headers: Option<ResponseHeaders>,
}

impl Reply {
    /// Create a reply without headers.
    #[must_use]
    pub const fn new(status: u16, data: Value) -> Self {
        Self {
            status,
            data,
            headers: None,
        }
    }

    /// Attach headers.
    #[must_use]
    pub fn with_headers(mut self, headers: Option<ResponseHeaders>) -> Self {
        self.headers = headers;
        self
    }
}

/// A settled response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub data: Value,
    /// Response headers.
    pub headers: ResponseHeaders,
    /// URL of the request that produced the response.
    pub url: String,
}

impl Response {
    fn from_reply(reply: Reply, request: &Request) -> Self {
        Self {
            status: reply.status,
            data: reply.data,
            headers: reply.headers.unwrap_or_default(),
            url: request.url.clone(),
        }
    }

    /// Check if the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// What a responder produces: a reply now, or one that resolves later.
pub enum ResponderOutput {
    /// Reply immediately.
    Ready(Reply),
    /// Reply once the future resolves.
    Pending(BoxFuture<'static, Reply>),
}

impl fmt::Debug for ResponderOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(reply) => f.debug_tuple("Ready").field(reply).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Produces a reply for a matched request.
pub type Responder = Arc<dyn Fn(&Request) -> ResponderOutput + Send + Sync>;

/// Whether a handler serves one request or every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    /// Removed after the first matching request.
    Once,
    /// Serves every matching request.
    Always,
}

/// How to settle a request that matches no handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoMatchPolicy {
    /// Forward to the real transport.
    #[default]
    Passthrough,
    /// Fail with [`MockError::NoMatch`].
    Error,
    /// Settle with a 404 response.
    NotFound,
}

impl FromStr for NoMatchPolicy {
    type Err = MockError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "passthrough" => Ok(Self::Passthrough),
            "error" | "throw" => Ok(Self::Error),
            "not-found" | "404" => Ok(Self::NotFound),
            other => Err(MockError::config(format!("unknown no-match policy '{other}'"))),
        }
    }
}

/// The real HTTP transport unmatched requests pass through to.
pub trait Transport: Send + Sync {
    /// Send a request over the network.
    fn send(&self, request: Request) -> BoxFuture<'static, Result<Response>>;
}

/// The adapter contract the installer registers handlers on.
pub trait Interceptor {
    /// Register a handler for `method` requests whose URL satisfies `matcher`.
    fn add_handler(&self, method: HttpMethod, matcher: Matcher, responder: Responder, mode: ReplyMode);

    /// Start registering a handler.
    fn on(&self, method: HttpMethod, matcher: Matcher) -> HandlerBuilder<'_, Self>
    where
        Self: Sized,
    {
        HandlerBuilder {
            adapter: self,
            method,
            matcher,
        }
    }
}

/// Fluent handler registration returned by [`Interceptor::on`].
#[must_use = "a handler is only registered by reply or reply_once"]
pub struct HandlerBuilder<'a, I> {
    adapter: &'a I,
    method: HttpMethod,
    matcher: Matcher,
}

impl<I: Interceptor> HandlerBuilder<'_, I> {
    /// Serve every matching request.
    pub fn reply<F>(self, responder: F)
    where
        F: Fn(&Request) -> ResponderOutput + Send + Sync + 'static,
    {
        self.adapter
            .add_handler(self.method, self.matcher, Arc::new(responder), ReplyMode::Always);
    }

    /// Serve the next matching request only.
    pub fn reply_once<F>(self, responder: F)
    where
        F: Fn(&Request) -> ResponderOutput + Send + Sync + 'static,
    {
        self.adapter
            .add_handler(self.method, self.matcher, Arc::new(responder), ReplyMode::Once);
    }

    /// Serve every matching request with a fixed reply.
    pub fn reply_with(self, reply: Reply) {
        self.reply(move |_| ResponderOutput::Ready(reply.clone()));
    }
}

struct Handler {
    matcher: Matcher,
    responder: Responder,
    mode: ReplyMode,
}

#[derive(Default)]
struct AdapterState {
    handlers: HashMap<HttpMethod, Vec<Handler>>,
}

impl AdapterState {
    fn add(&mut self, method: HttpMethod, handler: Handler) {
        let handlers = self.handlers.entry(method).or_default();
        if handler.mode == ReplyMode::Always {
            let existing = handlers
                .iter()
                .rposition(|h| h.mode == ReplyMode::Always && h.matcher == handler.matcher);
            if let Some(index) = existing {
                handlers[index] = handler;
                return;
            }
        }
        handlers.push(handler);
    }

    fn take_responder(&mut self, request: &Request) -> Option<Responder> {
        let full_url = request.full_url();
        let handlers = self.handlers.get_mut(&request.method)?;
        let index = handlers.iter().position(|h| {
            h.matcher.matches(&request.url)
                || full_url.as_deref().is_some_and(|url| h.matcher.matches(url))
        })?;

        let responder = Arc::clone(&handlers[index].responder);
        if handlers[index].mode == ReplyMode::Once {
            handlers.remove(index);
        }
        Some(responder)
    }
}

/// In-process interception adapter.
///
/// Lookup is first-registered-wins per method. Registering a repeating
/// handler with a matcher identical to an earlier repeating one replaces it;
/// one-shot handlers always append and are removed when used.
#[derive(Clone)]
pub struct MockAdapter {
    state: Arc<Mutex<AdapterState>>,
    policy: NoMatchPolicy,
    transport: Option<Arc<dyn Transport>>,
}

impl MockAdapter {
    /// Create an adapter with the given no-match policy and no transport.
    #[must_use]
    pub fn new(policy: NoMatchPolicy) -> Self {
        Self {
            state: Arc::new(Mutex::new(AdapterState::default())),
            policy,
            transport: None,
        }
    }

    /// Set the transport used for passthrough.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// The no-match policy.
    #[must_use]
    pub const fn policy(&self) -> NoMatchPolicy {
        self.policy
    }

    /// Number of handlers registered for a method.
    #[must_use]
    pub fn handler_count(&self, method: HttpMethod) -> usize {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .handlers
            .get(&method)
            .map_or(0, Vec::len)
    }

    /// Remove every handler.
    pub fn reset(&self) {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .handlers
            .clear();
    }

    /// Settle a request.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::NoMatch`] under [`NoMatchPolicy::Error`], or a
    /// transport error when passing through.
    pub async fn handle(&self, request: Request) -> Result<Response> {
        let responder = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take_responder(&request);

        if let Some(responder) = responder {
            tracing::trace!(method = %request.method, url = %request.url, "Request matched a mock");
            let reply = match responder(&request) {
                ResponderOutput::Ready(reply) => reply,
                ResponderOutput::Pending(future) => future.await,
            };
            return Ok(Response::from_reply(reply, &request));
        }

        tracing::trace!(
            method = %request.method,
            url = %request.url,
            policy = ?self.policy,
            "Request matched no mock"
        );
        match self.policy {
            NoMatchPolicy::Passthrough => match &self.transport {
                Some(transport) => transport.send(request).await,
                None => Err(MockError::transport(format!(
                    "no transport to pass {} {} through",
                    request.method, request.url
                ))),
            },
            NoMatchPolicy::Error => Err(MockError::NoMatch {
                method: request.method,
                url: request.url,
            }),
            NoMatchPolicy::NotFound => {
                Ok(Response::from_reply(Reply::new(404, Value::Null), &request))
            }
        }
    }
}

impl Interceptor for MockAdapter {
    fn add_handler(&self, method: HttpMethod, matcher: Matcher, responder: Responder, mode: ReplyMode) {
        tracing::trace!(%method, %matcher, ?mode, "Handler registered");
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .add(
                method,
                Handler {
                    matcher,
                    responder,
                    mode,
                },
            );
    }
}

impl fmt::Debug for MockAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockAdapter")
            .field("policy", &self.policy)
            .field("has_transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn literal(url: &str) -> Matcher {
        Matcher::Literal(url.to_string())
    }

    fn fixed(status: u16) -> impl Fn(&Request) -> ResponderOutput + Send + Sync + 'static {
        move |_| ResponderOutput::Ready(Reply::new(status, json!(status)))
    }

    #[tokio::test]
    async fn first_registered_handler_wins() {
        let adapter = MockAdapter::new(NoMatchPolicy::NotFound);
        adapter
            .on(HttpMethod::Get, Matcher::Regex(crate::pattern::CompiledRegex::compile("/a$").unwrap()))
            .reply(fixed(201));
        adapter.on(HttpMethod::Get, literal("/a")).reply(fixed(202));

        let response = adapter.handle(Request::get("/a")).await.unwrap();
        assert_eq!(response.status, 201);
    }

    #[tokio::test]
    async fn once_handlers_are_consumed_in_order() {
        let adapter = MockAdapter::new(NoMatchPolicy::NotFound);
        adapter.on(HttpMethod::Get, literal("/a")).reply_once(fixed(201));
        adapter.on(HttpMethod::Get, literal("/a")).reply_once(fixed(202));
        adapter.on(HttpMethod::Get, literal("/a")).reply(fixed(200));

        let mut statuses = Vec::new();
        for _ in 0..4 {
            statuses.push(adapter.handle(Request::get("/a")).await.unwrap().status);
        }
        assert_eq!(statuses, vec![201, 202, 200, 200]);
        assert_eq!(adapter.handler_count(HttpMethod::Get), 1);
    }

    #[tokio::test]
    async fn repeating_handler_with_same_matcher_is_replaced() {
        let adapter = MockAdapter::new(NoMatchPolicy::NotFound);
        adapter.on(HttpMethod::Get, literal("/a")).reply(fixed(200));
        adapter.on(HttpMethod::Get, literal("/a")).reply(fixed(500));

        assert_eq!(adapter.handler_count(HttpMethod::Get), 1);
        let response = adapter.handle(Request::get("/a")).await.unwrap();
        assert_eq!(response.status, 500);
    }

    #[tokio::test]
    async fn methods_are_separate() {
        let adapter = MockAdapter::new(NoMatchPolicy::NotFound);
        adapter.on(HttpMethod::Post, literal("/a")).reply(fixed(201));

        let response = adapter.handle(Request::get("/a")).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn base_url_is_joined_for_matching() {
        let adapter = MockAdapter::new(NoMatchPolicy::Error);
        adapter
            .on(HttpMethod::Get, literal("https://api.test/users"))
            .reply(fixed(200));

        let request = Request::get("users").with_base_url("https://api.test/");
        assert_eq!(adapter.handle(request).await.unwrap().status, 200);
    }

    #[tokio::test]
    async fn error_policy_reports_unmatched_request() {
        let adapter = MockAdapter::new(NoMatchPolicy::Error);
        let err = adapter.handle(Request::get("/missing")).await.unwrap_err();
        assert!(matches!(err, MockError::NoMatch { method: HttpMethod::Get, .. }));
    }

    #[tokio::test]
    async fn passthrough_without_transport_fails() {
        let adapter = MockAdapter::new(NoMatchPolicy::Passthrough);
        let err = adapter.handle(Request::get("/missing")).await.unwrap_err();
        assert!(matches!(err, MockError::Transport { .. }));
    }

    #[test]
    fn policy_parses() {
        assert_eq!("passthrough".parse::<NoMatchPolicy>().unwrap(), NoMatchPolicy::Passthrough);
        assert_eq!("404".parse::<NoMatchPolicy>().unwrap(), NoMatchPolicy::NotFound);
        assert!("ignore".parse::<NoMatchPolicy>().is_err());
    }
}
