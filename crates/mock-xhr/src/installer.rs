//! Interception installer.
//!
//! Registers loaded mocks on an [`Interceptor`]. Counted mocks become one-shot
//! handlers and `always` mocks become repeating ones; because mocks arrive
//! ordered by repeat count, one-shot handlers for an endpoint are consumed
//! before its repeating fallback answers.

use std::time::Duration;

use futures::FutureExt;

use crate::adapter::{Interceptor, Reply, ReplyMode, Request, ResponderOutput};
use crate::error::Result;
use crate::pattern::{self, Matcher};
use crate::store::PreparedMock;
use crate::types::UrlPattern;

/// Compile the matcher for a stored mock.
///
/// Regex URLs are used as-is; literal URLs are resolved against the base URL.
///
/// # Errors
///
/// Returns an error if the base URL is malformed or the pattern does not
/// compile.
pub fn matcher_for(mock: &PreparedMock, base_url: &str) -> Result<Matcher> {
    match &mock.url {
        UrlPattern::Regex(regex) => Ok(Matcher::Regex(regex.clone())),
        UrlPattern::Literal(url) => pattern::compile(base_url, url),
    }
}

/// Effective delay for a mock: its own when positive, else the global one.
#[must_use]
pub fn effective_delay(mock: &PreparedMock, global_delay_ms: u64) -> Option<Duration> {
    mock.options
        .delay_duration()
        .or_else(|| (global_delay_ms > 0).then(|| Duration::from_millis(global_delay_ms)))
}

/// Register every mock on the adapter, in order.
///
/// A mock whose matcher cannot be built is logged and skipped. Returns the
/// number of installed handlers.
pub fn register_all_mocks<I: Interceptor>(
    adapter: &I,
    mocks: &[PreparedMock],
    base_url: &str,
    global_delay_ms: u64,
) -> usize {
    let mut installed = 0;

    for mock in mocks {
        let matcher = match matcher_for(mock, base_url) {
            Ok(matcher) => matcher,
            Err(error) => {
                tracing::error!(key = %mock.key, %error, "Skipping mock that failed to compile");
                continue;
            }
        };

        let reply = Reply::new(mock.status, mock.data.clone()).with_headers(mock.headers.clone());
        let delay = effective_delay(mock, global_delay_ms);
        let responder = move |_: &Request| match delay {
            Some(delay) => {
                let reply = reply.clone();
                ResponderOutput::Pending(
                    async move {
                        tokio::time::sleep(delay).await;
                        reply
                    }
                    .boxed(),
                )
            }
            None => ResponderOutput::Ready(reply.clone()),
        };

        let mode = if mock.times.is_always() {
            ReplyMode::Always
        } else {
            ReplyMode::Once
        };
        tracing::debug!(
            method = %mock.method,
            %matcher,
            times = %mock.times,
            delay_ms = delay.map(|d| d.as_millis()),
            "Installing mock"
        );
        adapter.add_handler(mock.method, matcher, std::sync::Arc::new(responder), mode);
        installed += 1;
    }

    installed
}
