//! Assertion helpers for listings and responses.

use crate::adapter::Response;
use crate::listing::ListingEntry;

/// Assertions over a listing.
pub trait ListingAssertions {
    /// The listing's labels.
    fn labels(&self) -> Vec<&str>;

    /// Assert that some label contains `needle`.
    fn assert_has_label(&self, needle: &str) {
        let labels = self.labels();
        assert!(
            labels.iter().any(|label| label.contains(needle)),
            "Expected a label containing {needle:?}, got:\n{}",
            labels.join("\n")
        );
    }

    /// Assert the listing's length.
    fn assert_len(&self, expected: usize) {
        let labels = self.labels();
        assert_eq!(
            labels.len(),
            expected,
            "Expected {expected} entries, got:\n{}",
            labels.join("\n")
        );
    }
}

impl ListingAssertions for [ListingEntry] {
    fn labels(&self) -> Vec<&str> {
        self.iter().map(|entry| entry.label.as_str()).collect()
    }
}

impl ListingAssertions for Vec<ListingEntry> {
    fn labels(&self) -> Vec<&str> {
        self.as_slice().labels()
    }
}

/// Assert that a response came from a mock with `status` and `data`.
///
/// # Panics
///
/// Panics if status or body differ.
pub fn assert_response(response: &Response, status: u16, data: &serde_json::Value) {
    assert_eq!(
        response.status, status,
        "Unexpected status for {}: {:?}",
        response.url, response.data
    );
    assert_eq!(&response.data, data, "Unexpected body for {}", response.url);
}
