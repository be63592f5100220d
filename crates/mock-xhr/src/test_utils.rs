//! Test utilities for mock-xhr.
//!
//! A recording transport for passthrough tests, fixture systems with a
//! manual clock, and listing assertions.

mod assertions;
mod fixtures;
mod transport;

pub use assertions::{ListingAssertions, assert_response};
pub use fixtures::{START_MS, catalog, enabled_system, get_declaration, memory_system};
pub use transport::RecordingTransport;
