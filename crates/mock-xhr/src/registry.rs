//! Registration store.
//!
//! Declarations made before the adapter is wrapped are held here in memory.
//! They are never installed directly: `apply_ready` and the response builder
//! copy them into the persistent store. The registry keeps a global name
//! index, resolves relative URLs against the base URL and, through a shared
//! [`WidgetRegistry`], exposes the declarations of sibling widgets.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::error::Result;
use crate::normalize::{get_relative_url, normalize_url};
use crate::types::{CodeStatus, HttpMethod, ResponseHeaders, UrlPattern};

/// A response declared in code, pending installation.
#[derive(Debug, Clone, PartialEq)]
pub struct MockDeclaration {
    /// HTTP method.
    pub method: HttpMethod,
    /// Normalized URL, rebased against the base URL.
    pub url: UrlPattern,
    /// URL as declared by the caller.
    pub original_url: UrlPattern,
    /// Numeric status code.
    pub status: u16,
    /// Status as declared by the caller.
    pub original_status: CodeStatus,
    /// Response body.
    pub data: Value,
    /// Optional globally unique name.
    pub name: Option<String>,
    /// Widget that contributed the declaration, for merged listings.
    pub widget_name: Option<String>,
    /// Optional response headers.
    pub headers: Option<ResponseHeaders>,
}

impl MockDeclaration {
    /// Create a declaration, normalizing literal URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if a literal URL is empty or malformed.
    pub fn new(
        method: HttpMethod,
        url: UrlPattern,
        status: u16,
        original_status: CodeStatus,
        data: Value,
    ) -> Result<Self> {
        let normalized = match &url {
            UrlPattern::Literal(literal) => UrlPattern::Literal(normalize_url(literal)?),
            UrlPattern::Regex(_) => url.clone(),
        };

        Ok(Self {
            method,
            url: normalized,
            original_url: url,
            status,
            original_status,
            data,
            name: None,
            widget_name: None,
            headers: None,
        })
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

/// Handle to a declaration inside a [`RegistrationStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclarationId(usize);

impl DeclarationId {
    /// Position of the declaration in registration order.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Normalize a base URL into its rooted relative form with a trailing slash.
///
/// `https://e.com/rrr` and `rrr` both become `/rrr/`. An empty base URL is
/// kept empty, meaning "no base URL configured".
///
/// # Errors
///
/// Returns an error if an absolute base URL cannot be parsed.
pub fn normalize_base_url(url: &str) -> Result<String> {
    if url.is_empty() {
        return Ok(String::new());
    }

    let mut base = get_relative_url(url)?;
    if !base.starts_with('/') {
        base.insert(0, '/');
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    Ok(base)
}

/// In-memory store of declarations for one widget (or the host application).
#[derive(Debug, Default)]
pub struct RegistrationStore {
    declarations: Vec<MockDeclaration>,
    names: HashMap<String, usize>,
    base_url: Option<String>,
    widget_name: Option<String>,
    missing_base_reported: bool,
}

impl RegistrationStore {
    /// Create an empty store with no base URL.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store owned by a widget.
    #[must_use]
    pub fn for_widget(widget: impl Into<String>) -> Self {
        Self {
            widget_name: Some(widget.into()),
            ..Self::default()
        }
    }

    /// Widget owning this store, if any.
    #[must_use]
    pub fn widget_name(&self) -> Option<&str> {
        self.widget_name.as_deref()
    }

    /// Set the owning widget.
    pub fn set_widget_name(&mut self, widget: impl Into<String>) {
        self.widget_name = Some(widget.into());
    }

    /// Current base URL, if set.
    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Own declarations in registration order.
    #[must_use]
    pub fn declarations(&self) -> &[MockDeclaration] {
        &self.declarations
    }

    /// Number of own declarations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Check if nothing has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Add a declaration, rebasing its URL and indexing its name.
    pub fn add(&mut self, mut declaration: MockDeclaration) -> DeclarationId {
        declaration.url = self.rebase(&declaration.url);
        let id = self.declarations.len();
        tracing::debug!(
            method = %declaration.method,
            url = %declaration.url,
            "Registered mock declaration"
        );
        self.declarations.push(declaration);
        self.index_name(id);
        DeclarationId(id)
    }

    /// Apply a mutation to a declaration and refresh the name index.
    ///
    /// Returns `false` if the id does not belong to this store.
    pub fn update(&mut self, id: DeclarationId, mutator: impl FnOnce(&mut MockDeclaration)) -> bool {
        let Some(declaration) = self.declarations.get_mut(id.0) else {
            return false;
        };
        mutator(declaration);
        self.index_name(id.0);
        true
    }

    fn index_name(&mut self, id: usize) {
        let Some(declaration) = self.declarations.get(id) else {
            return;
        };
        let Some(name) = declaration.name.clone() else {
            return;
        };

        match self.names.get(&name) {
            Some(owner) if *owner == id => {}
            Some(_) => {
                tracing::error!(
                    name = %name,
                    url = %declaration.url,
                    "Mock name is already in use, choose a different name"
                );
            }
            None => {
                self.names.insert(name, id);
            }
        }
    }

    /// Set the base URL and rebase every pending declaration.
    ///
    /// # Errors
    ///
    /// Returns an error if an absolute base URL cannot be parsed.
    pub fn set_base_url(&mut self, url: &str) -> Result<()> {
        let base = normalize_base_url(url)?;
        tracing::debug!(base_url = %base, "Base url set");
        self.base_url = Some(base);
        self.rebase_all();
        Ok(())
    }

    /// Re-resolve every declaration against the current base URL.
    ///
    /// Rooted and regex URLs are left untouched, so repeated calls are stable.
    pub fn rebase_all(&mut self) {
        for index in 0..self.declarations.len() {
            let current = self.declarations[index].url.clone();
            self.declarations[index].url = self.rebase(&current);
        }
    }

    fn rebase(&mut self, url: &UrlPattern) -> UrlPattern {
        let (UrlPattern::Literal(literal), Some(base)) = (url, self.base_url.as_deref()) else {
            return url.clone();
        };
        if literal.starts_with('/') {
            return url.clone();
        }

        if base.is_empty() {
            if !self.missing_base_reported {
                tracing::error!("Declared mocks should start with / or a base url should be set");
                self.missing_base_reported = true;
            }
            return UrlPattern::Literal(format!("/{literal}"));
        }

        UrlPattern::Literal(format!("{base}{literal}"))
    }

    /// Own declarations followed by every sibling widget's declarations.
    ///
    /// Own declarations are tagged with this store's widget name. If the
    /// shared registry cannot be read the error is logged and only own
    /// declarations are returned.
    #[must_use]
    pub fn list_all(&self, widgets: Option<&WidgetRegistry>) -> Vec<MockDeclaration> {
        let mut all: Vec<MockDeclaration> = self
            .declarations
            .iter()
            .cloned()
            .map(|mut declaration| {
                declaration.widget_name.clone_from(&self.widget_name);
                declaration
            })
            .collect();

        if let Some(widgets) = widgets {
            match widgets.merge_all(self.widget_name.as_deref()) {
                Some(external) => all.extend(external),
                None => tracing::error!("Could not merge declarations of other widgets"),
            }
        }

        all
    }

    /// Find a declaration by name, optionally scoped to a widget.
    #[must_use]
    pub fn find_by_name(
        &self,
        name: &str,
        widget: Option<&str>,
        widgets: Option<&WidgetRegistry>,
    ) -> Option<MockDeclaration> {
        self.list_all(widgets).into_iter().find(|declaration| {
            declaration.name.as_deref() == Some(name)
                && widget.is_none_or(|w| declaration.widget_name.as_deref() == Some(w))
        })
    }
}

/// Declarations shared between widgets of one host application.
///
/// Each widget contributes its own declarations when it wraps its adapter;
/// listings from any widget then include everyone else's.
#[derive(Debug, Clone, Default)]
pub struct WidgetRegistry {
    widgets: Arc<RwLock<BTreeMap<String, Vec<MockDeclaration>>>>,
}

impl WidgetRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a widget's declarations, replacing any earlier contribution.
    pub fn contribute(&self, widget: &str, declarations: Vec<MockDeclaration>) {
        let mut widgets = self
            .widgets
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        tracing::debug!(widget, count = declarations.len(), "Widget declarations contributed");
        widgets.insert(widget.to_string(), declarations);
    }

    /// Every contributed declaration tagged with its widget, in widget-name order.
    ///
    /// Returns `None` if the registry lock is poisoned.
    #[must_use]
    pub fn merge_all(&self, exclude: Option<&str>) -> Option<Vec<MockDeclaration>> {
        let widgets = self.widgets.read().ok()?;
        Some(
            widgets
                .iter()
                .filter(|(widget, _)| Some(widget.as_str()) != exclude)
                .flat_map(|(widget, declarations)| {
                    declarations.iter().cloned().map(move |mut declaration| {
                        declaration.widget_name = Some(widget.clone());
                        declaration
                    })
                })
                .collect(),
        )
    }

    /// Names of contributing widgets.
    #[must_use]
    pub fn widget_names(&self) -> Vec<String> {
        self.widgets
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}
