//! Ready-made systems and declarations for tests.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::config::MockConfig;
use crate::lifecycle::ManualClock;
use crate::storage::MemoryStore;
use crate::system::{Declaration, MockSystem};
use crate::types::{CodeStatus, HttpMethod};

/// Fixed start time for [`ManualClock`]s handed out by fixtures.
pub const START_MS: u64 = 1_700_000_000_000;

/// A system over an empty in-memory store with a manual clock.
#[must_use]
pub fn memory_system(config: MockConfig) -> (MockSystem<MemoryStore>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START_MS));
    let system = MockSystem::new(MemoryStore::new(), config).with_clock(clock.clone());
    (system, clock)
}

/// Like [`memory_system`], already enabled.
///
/// # Panics
///
/// Never with a [`MemoryStore`].
#[must_use]
pub fn enabled_system(config: MockConfig) -> (MockSystem<MemoryStore>, Arc<ManualClock>) {
    let (mut system, clock) = memory_system(config);
    system.enable().expect("memory store accepts writes");
    (system, clock)
}

/// A successful GET declaration.
#[must_use]
pub fn get_declaration(url: &str, data: Value) -> Declaration {
    Declaration::new(HttpMethod::Get, url, CodeStatus::Success, data)
}

/// A handful of declarations covering names, params and errors.
#[must_use]
pub fn catalog() -> Vec<Declaration> {
    vec![
        get_declaration("/users", json!([{"id": 1}])).named("users"),
        get_declaration("/users/:id", json!({"id": 1})).named("user"),
        Declaration::new(HttpMethod::Post, "/users", CodeStatus::Error, json!({"error": "taken"}))
            .named("create-user-fails"),
        get_declaration("/search:?search", json!({"hits": 0})),
    ]
}
