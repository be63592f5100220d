//! mock-xhr: persisted, declarative response mocking for HTTP clients
//!
//! Canned responses are declared per URL and method, written to a durable
//! key-value store, and installed on an interception adapter that sits in
//! front of the real transport. Mocks survive restarts, can be toggled on and
//! off, and switch themselves off a couple of days after being enabled.
//!
//! # Features
//!
//! - **URL patterns** with `:param`, `:?search` and `:!search` placeholders, or raw regexes
//! - **Repeat counts**: one-shot mocks are served in order before repeating ones
//! - **Base URL resolution** for relative declarations
//! - **Widgets** sharing their declarations through a [`WidgetRegistry`]
//! - **Snapshots** to move mocks between stores
//! - **Lazy loading** that holds requests until asynchronous declarations are in
//!
//! # Example
//!
//! ```ignore
//! use mock_xhr::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut system = MockSystem::new(MemoryStore::new(), MockConfig::default());
//!     system.declare_static(HttpMethod::Get, "/users", CodeStatus::Success, json!([]))?
//!         .with_name("users");
//!     system.enable()?;
//!     system.apply_ready("users", ApplyOverrides::new().times(Times::Count(1)))?;
//!
//!     let adapter = system.create_adapter(None);
//!     system.wrap_adapter(&adapter)?;
//!     let response = adapter.handle(Request::get("/users")).await?;
//!     assert_eq!(response.data, json!([]));
//!     Ok(())
//! }
//! ```

// Core types
pub mod config;
pub mod error;
pub mod prelude;
pub mod types;

// Encoding and storage
pub mod key;
pub mod normalize;
pub mod storage;
pub mod store;

// Matching and installation
pub mod adapter;
pub mod installer;
pub mod pattern;
pub mod registry;

// Facade
pub mod apply_ready;
pub mod builder;
pub mod lazy;
pub mod lifecycle;
pub mod listing;
pub mod logging;
pub mod snapshot;
pub mod system;

pub use adapter::{
    HandlerBuilder, Interceptor, MockAdapter, NoMatchPolicy, Reply, ReplyMode, Request,
    Responder, ResponderOutput, Response, Transport,
};
pub use apply_ready::{ApplyOverrides, MockRef, Override};
pub use builder::MethodBuilder;
pub use config::{AutoDisable, EnvConfig, LogFormat, LoggingConfig, MockConfig, StatusCodes};
pub use error::{MockError, Result};
pub use lazy::{DeferredAdapter, LazyMockSystem, LoadGate, LoadOutcome};
pub use lifecycle::{Clock, ManualClock, SystemClock};
pub use listing::ListingEntry;
pub use logging::init_logging;
pub use pattern::{CompiledRegex, GLOBAL_CACHE, Matcher, PatternCache};
pub use registry::{DeclarationId, MockDeclaration, RegistrationStore, WidgetRegistry};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{MockRecord, MockStore, PreparedMock, StoredMockEntry};
pub use system::{Declaration, DeclarationHandle, MockSystem};
pub use types::{CodeStatus, HttpMethod, MockOptions, ResponseHeaders, Times, UrlPattern};

// Test utilities
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

#[cfg(any(test, feature = "test-utils"))]
pub use test_utils::{
    ListingAssertions, RecordingTransport, assert_response, catalog, enabled_system,
    get_declaration, memory_system,
};
