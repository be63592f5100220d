//! The mock system context.
//!
//! [`MockSystem`] owns everything the facade operations need: configuration,
//! the registration store, the persistent store and a clock. Nothing lives in
//! process globals; widgets of one host share declarations only through an
//! explicitly passed [`WidgetRegistry`].

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::adapter::{Interceptor, MockAdapter, Transport};
use crate::apply_ready::{self, ApplyOverrides, MockRef};
use crate::builder::MethodBuilder;
use crate::config::MockConfig;
use crate::error::Result;
use crate::installer;
use crate::lifecycle::{self, Clock, SystemClock};
use crate::listing::{self, ListingEntry};
use crate::registry::{DeclarationId, MockDeclaration, RegistrationStore, WidgetRegistry};
use crate::snapshot;
use crate::storage::KeyValueStore;
use crate::store::{MockRecord, MockStore};
use crate::types::{CodeStatus, HttpMethod, ResponseHeaders, UrlPattern};

/// Everything needed to register one declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// HTTP method.
    pub method: HttpMethod,
    /// URL or regex.
    pub url: UrlPattern,
    /// Declared status.
    pub status: CodeStatus,
    /// Response body.
    pub data: Value,
    /// Optional unique name.
    pub name: Option<String>,
    /// Optional response headers.
    pub headers: Option<ResponseHeaders>,
}

impl Declaration {
    /// Create a declaration without name or headers.
    #[must_use]
    pub fn new(
        method: HttpMethod,
        url: impl Into<UrlPattern>,
        status: impl Into<CodeStatus>,
        data: Value,
    ) -> Self {
        Self {
            method,
            url: url.into(),
            status: status.into(),
            data,
            name: None,
            headers: None,
        }
    }

    /// Set the name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the response headers.
    #[must_use]
    pub fn with_headers(mut self, headers: ResponseHeaders) -> Self {
        self.headers = Some(headers);
        self
    }
}

/// Handle returned by [`MockSystem::declare_static`] to attach headers and a name.
pub struct DeclarationHandle<'a> {
    registry: &'a mut RegistrationStore,
    id: DeclarationId,
}

impl DeclarationHandle<'_> {
    /// Attach response headers.
    pub fn with_headers(self, headers: ResponseHeaders) -> Self {
        self.registry.update(self.id, |d| d.headers = Some(headers));
        self
    }

    /// Attach a name. Duplicate names are logged and not indexed.
    pub fn with_name(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.registry.update(self.id, |d| d.name = Some(name));
        self
    }

    /// The registered declaration's id.
    #[must_use]
    pub const fn id(&self) -> DeclarationId {
        self.id
    }
}

/// A request-mocking system over a key-value store.
pub struct MockSystem<S> {
    config: MockConfig,
    registry: RegistrationStore,
    widgets: WidgetRegistry,
    store: MockStore<S>,
    clock: Arc<dyn Clock>,
}

impl<S: KeyValueStore> MockSystem<S> {
    /// Create a system with its own widget registry and the system clock.
    pub fn new(storage: S, config: MockConfig) -> Self {
        Self {
            config,
            registry: RegistrationStore::new(),
            widgets: WidgetRegistry::new(),
            store: MockStore::new(storage),
            clock: Arc::new(SystemClock),
        }
    }

    /// Share declarations with the other widgets using `widgets`.
    #[must_use]
    pub fn with_widgets(mut self, widgets: WidgetRegistry) -> Self {
        self.widgets = widgets;
        self
    }

    /// Use a different clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The configuration.
    pub const fn config(&self) -> &MockConfig {
        &self.config
    }

    /// The registration store.
    pub const fn registry(&self) -> &RegistrationStore {
        &self.registry
    }

    /// The shared widget registry.
    pub const fn widgets(&self) -> &WidgetRegistry {
        &self.widgets
    }

    /// The persistent store.
    pub const fn store(&self) -> &MockStore<S> {
        &self.store
    }

    /// The persistent store, mutably.
    pub const fn store_mut(&mut self) -> &mut MockStore<S> {
        &mut self.store
    }

    /// Consume the system, returning its storage.
    pub fn into_storage(self) -> S {
        self.store.into_inner()
    }

    // Declaration

    /// Register a declaration built from its parts.
    ///
    /// # Errors
    ///
    /// Returns an error if a literal URL is empty or malformed.
    pub fn declare_static(
        &mut self,
        method: HttpMethod,
        url: impl Into<UrlPattern>,
        status: impl Into<CodeStatus>,
        data: Value,
    ) -> Result<DeclarationHandle<'_>> {
        let status = status.into();
        let declaration = MockDeclaration::new(
            method,
            url.into(),
            self.config.status_codes.resolve(status),
            status,
            data,
        )?;
        let id = self.registry.add(declaration);
        Ok(DeclarationHandle {
            registry: &mut self.registry,
            id,
        })
    }

    /// Register a complete declaration.
    ///
    /// # Errors
    ///
    /// Returns an error if a literal URL is empty or malformed.
    pub fn declare(&mut self, declaration: Declaration) -> Result<DeclarationId> {
        let Declaration {
            method,
            url,
            status,
            data,
            name,
            headers,
        } = declaration;

        let mut handle = self.declare_static(method, url, status, data)?;
        if let Some(headers) = headers {
            handle = handle.with_headers(headers);
        }
        if let Some(name) = name {
            handle = handle.with_name(name);
        }
        Ok(handle.id())
    }

    /// Register a declaration produced asynchronously.
    ///
    /// Nothing is registered until the factory's future resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the produced declaration is invalid.
    pub async fn declare_dynamic<F, Fut>(&mut self, factory: F) -> Result<DeclarationId>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Declaration>,
    {
        let declaration = factory().await;
        self.declare(declaration)
    }

    // Response builder and apply_ready

    /// Start a response builder for `method` and `url`.
    pub fn mock(&mut self, method: HttpMethod, url: impl Into<UrlPattern>) -> MethodBuilder<'_, S> {
        MethodBuilder::new(self, method, url.into())
    }

    /// Start a GET response builder.
    pub fn get(&mut self, url: impl Into<UrlPattern>) -> MethodBuilder<'_, S> {
        self.mock(HttpMethod::Get, url)
    }

    /// Start a POST response builder.
    pub fn post(&mut self, url: impl Into<UrlPattern>) -> MethodBuilder<'_, S> {
        self.mock(HttpMethod::Post, url)
    }

    /// Start a PUT response builder.
    pub fn put(&mut self, url: impl Into<UrlPattern>) -> MethodBuilder<'_, S> {
        self.mock(HttpMethod::Put, url)
    }

    /// Start a PATCH response builder.
    pub fn patch(&mut self, url: impl Into<UrlPattern>) -> MethodBuilder<'_, S> {
        self.mock(HttpMethod::Patch, url)
    }

    /// Start a DELETE response builder.
    pub fn delete(&mut self, url: impl Into<UrlPattern>) -> MethodBuilder<'_, S> {
        self.mock(HttpMethod::Delete, url)
    }

    /// Every registered declaration, own first, then other widgets'.
    #[must_use]
    pub fn all_declarations(&self) -> Vec<MockDeclaration> {
        self.registry.list_all(Some(&self.widgets))
    }

    /// Store a registered declaration, with overrides, as an installed mock.
    ///
    /// Returns the storage key.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference does not resolve or the write fails.
    pub fn apply_ready(&mut self, reference: impl Into<MockRef>, overrides: ApplyOverrides) -> Result<String> {
        let reference = reference.into();
        let declarations = self.all_declarations();
        let declaration = apply_ready::resolve(&declarations, &reference)?;
        let record = apply_ready::prepare(declaration, overrides, self.config.status_codes);
        tracing::info!(mock = %reference, url = %record.url, "Applying registered mock");
        self.save(&record)
    }

    pub(crate) fn save(&mut self, record: &MockRecord) -> Result<String> {
        self.store.save(record)
    }

    // Listing

    /// List stored mocks.
    ///
    /// # Errors
    ///
    /// Returns an error if stored mocks cannot be decoded.
    pub fn set_mocks(&self) -> Result<Vec<ListingEntry>> {
        Ok(listing::set_mocks(&self.store.load_all()?))
    }

    /// List registered declarations, optionally filtered by URL or name.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter is a malformed absolute URL.
    pub fn registered_mocks(&self, filter: Option<&str>) -> Result<Vec<ListingEntry>> {
        listing::registered_mocks(&self.all_declarations(), filter)
    }

    // Clearing

    /// Remove stored mocks for a URL, optionally for one method only.
    ///
    /// # Errors
    ///
    /// Returns an error for an unsupported method or corrupted storage.
    pub fn clear_mock(&mut self, url: impl Into<UrlPattern>, method: Option<&str>) -> Result<usize> {
        self.store.clear_by_url(&url.into(), method)
    }

    /// Remove the `n`-th stored mock as numbered by [`set_mocks`](Self::set_mocks).
    ///
    /// # Errors
    ///
    /// Returns an error if stored mocks cannot be decoded.
    pub fn clear_mock_at(&mut self, n: usize) -> Result<bool> {
        self.store.clear_by_ordinal(n)
    }

    /// Remove every stored mock; with `everything`, also the delay, and disable.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects a removal.
    pub fn clear_all(&mut self, everything: bool) -> Result<usize> {
        self.store.clear_all(everything)
    }

    // Delay

    /// Set the global response delay.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::InvalidDelay`](crate::MockError::InvalidDelay) for 0.
    pub fn set_delay_response_time(&mut self, ms: u64) -> Result<()> {
        self.store.set_delay(ms)
    }

    /// Remove the global response delay.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the removal.
    pub fn clear_delay_response_time(&mut self) -> Result<()> {
        self.store.clear_delay()
    }

    /// Global response delay in milliseconds; 0 when unset.
    #[must_use]
    pub fn delay_response_time(&self) -> u64 {
        self.store.delay()
    }

    // Lifecycle

    /// Enable the system as of now.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects a write.
    pub fn enable(&mut self) -> Result<()> {
        lifecycle::enable(&mut self.store, self.clock.as_ref())
    }

    /// Disable the system.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects a removal.
    pub fn disable(&mut self) -> Result<()> {
        lifecycle::disable(&mut self.store)
    }

    /// Check if the system is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.store.is_enabled()
    }

    /// Disable the system if the configured interval has passed since enabling.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects a write.
    pub fn try_auto_disable(&mut self) -> Result<bool> {
        match self.config.auto_disable.interval() {
            Some(interval) => lifecycle::try_auto_disable(&mut self.store, self.clock.as_ref(), interval),
            None => Ok(false),
        }
    }

    // Snapshot

    /// Export mocks, delay and the enabled marker.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn snapshot(&self) -> Result<String> {
        snapshot::snapshot(self.store.storage())
    }

    /// Import a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot is malformed or has foreign keys.
    pub fn apply_snapshot(&mut self, encoded: &str) -> Result<usize> {
        snapshot::apply_snapshot(self.store.storage_mut(), encoded)
    }

    // Wrapping

    /// Create an adapter with the configured no-match policy.
    #[must_use]
    pub fn create_adapter(&self, transport: Option<Arc<dyn Transport>>) -> MockAdapter {
        let adapter = MockAdapter::new(self.config.no_match);
        match transport {
            Some(transport) => adapter.with_transport(transport),
            None => adapter,
        }
    }

    /// Install stored mocks on the host application's adapter.
    ///
    /// Runs the auto-disable check first. Returns the number of installed
    /// handlers, 0 when the system is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is malformed or storage is corrupted.
    pub fn wrap_adapter<I: Interceptor>(&mut self, adapter: &I) -> Result<usize> {
        self.try_auto_disable()?;
        self.install(adapter)
    }

    /// Install stored mocks on a widget's adapter and publish its declarations.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is malformed or storage is corrupted.
    pub fn wrap_child_adapter<I: Interceptor>(&mut self, adapter: &I, widget: &str) -> Result<usize> {
        if !self.is_enabled() {
            return Ok(0);
        }
        self.registry.set_widget_name(widget);
        self.install(adapter)
    }

    fn install<I: Interceptor>(&mut self, adapter: &I) -> Result<usize> {
        if !self.is_enabled() {
            tracing::debug!("Mock system disabled, adapter left untouched");
            return Ok(0);
        }

        self.registry.set_base_url(&self.config.base_url)?;
        if let Some(widget) = self.registry.widget_name() {
            self.widgets
                .contribute(widget, self.registry.declarations().to_vec());
        }

        let mocks = self.store.load_all()?;
        let installed = installer::register_all_mocks(
            adapter,
            &mocks,
            &self.config.base_url,
            self.store.delay(),
        );
        tracing::info!(installed, stored = mocks.len(), "Mocks installed");
        Ok(installed)
    }
}

impl<S> std::fmt::Debug for MockSystem<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSystem")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
