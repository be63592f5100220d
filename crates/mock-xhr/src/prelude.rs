//! Convenient re-exports for common mock-xhr usage.
//!
//! ```ignore
//! use mock_xhr::prelude::*;
//! ```

// Context and configuration
pub use crate::config::{AutoDisable, MockConfig, StatusCodes};
pub use crate::lazy::{DeferredAdapter, LazyMockSystem};
pub use crate::system::{Declaration, MockSystem};

// Error handling
pub use crate::error::{MockError, Result};

// Common types
pub use crate::types::{CodeStatus, HttpMethod, ResponseHeaders, Times, UrlPattern};

// Storage
pub use crate::storage::{FileStore, KeyValueStore, MemoryStore};

// Installing mocks
pub use crate::apply_ready::{ApplyOverrides, MockRef};
pub use crate::registry::WidgetRegistry;

// Adapter contract
pub use crate::adapter::{Interceptor, MockAdapter, NoMatchPolicy, Request, Response, Transport};
