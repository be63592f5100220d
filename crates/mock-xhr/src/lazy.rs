//! Deferred start-up.
//!
//! A host may want to hand out HTTP adapters before its declarations are
//! ready. [`LazyMockSystem`] records declarations and adapter wraps in a FIFO
//! queue; [`LazyMockSystem::load`] replays them in call order and then opens a
//! [`LoadGate`]. Requests sent through a [`DeferredAdapter`] in the meantime
//! wait for the gate, but only when the system was enabled with stored mocks
//! at wrap time. Otherwise there is nothing to wait for.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::watch;

use crate::adapter::{MockAdapter, Request, Response, Transport};
use crate::error::{MockError, Result};
use crate::storage::KeyValueStore;
use crate::system::{Declaration, MockSystem};

enum Command {
    Declare(Declaration),
    DeclareDynamic(BoxFuture<'static, Declaration>),
    Wrap {
        adapter: MockAdapter,
        widget: Option<String>,
    },
}

/// Receiving side of the load signal.
///
/// Opens when loading finishes, or when the lazy system is dropped without
/// loading so requests are never held forever.
#[derive(Debug, Clone)]
pub struct LoadGate {
    rx: watch::Receiver<bool>,
}

impl LoadGate {
    /// Check if loading has finished.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Wait until the gate opens.
    pub async fn opened(&self) {
        let mut rx = self.rx.clone();
        // An error means the sender is gone; nothing will load any more.
        let _ = rx.wait_for(|open| *open).await;
    }
}

/// An adapter handed out before loading.
#[derive(Clone)]
pub struct DeferredAdapter {
    inner: MockAdapter,
    gate: Option<LoadGate>,
}

impl DeferredAdapter {
    /// Settle a request, waiting for loading first if mocks are pending.
    ///
    /// # Errors
    ///
    /// Same as [`MockAdapter::handle`].
    pub async fn handle(&self, request: Request) -> Result<Response> {
        if let Some(gate) = &self.gate {
            if !gate.is_open() {
                tracing::debug!(method = %request.method, url = %request.url, "Holding request until mocks load");
                gate.opened().await;
            }
        }
        self.inner.handle(request).await
    }

    /// Check if requests are held until loading finishes.
    #[must_use]
    pub const fn is_deferred(&self) -> bool {
        self.gate.is_some()
    }

    /// The underlying adapter.
    #[must_use]
    pub const fn adapter(&self) -> &MockAdapter {
        &self.inner
    }
}

/// A [`MockSystem`] whose declarations and wraps are replayed on load.
pub struct LazyMockSystem<S> {
    system: MockSystem<S>,
    queue: VecDeque<Command>,
    gate: watch::Sender<bool>,
}

impl<S: KeyValueStore> LazyMockSystem<S> {
    /// Wrap a system whose queued work will run on [`load`](Self::load).
    pub fn new(system: MockSystem<S>) -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            system,
            queue: VecDeque::new(),
            gate,
        }
    }

    /// The wrapped system.
    pub const fn system(&self) -> &MockSystem<S> {
        &self.system
    }

    /// A handle on the load signal.
    pub fn gate(&self) -> LoadGate {
        LoadGate {
            rx: self.gate.subscribe(),
        }
    }

    /// Number of queued commands.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Enable the system now; this is not deferred.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects a write.
    pub fn enable(&mut self) -> Result<()> {
        self.system.enable()
    }

    /// Queue a declaration.
    pub fn declare(&mut self, declaration: Declaration) {
        self.queue.push_back(Command::Declare(declaration));
    }

    /// Queue a declaration produced asynchronously.
    ///
    /// The future is awaited during [`load`](Self::load), in queue order.
    pub fn declare_dynamic<F, Fut>(&mut self, factory: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Declaration> + Send + 'static,
    {
        self.queue
            .push_back(Command::DeclareDynamic(factory().boxed()));
    }

    /// Hand out an adapter for the host application.
    pub fn wrap_adapter(&mut self, transport: Option<Arc<dyn Transport>>) -> DeferredAdapter {
        self.queue_wrap(transport, None)
    }

    /// Hand out an adapter for a widget.
    pub fn wrap_child_adapter(
        &mut self,
        transport: Option<Arc<dyn Transport>>,
        widget: impl Into<String>,
    ) -> DeferredAdapter {
        self.queue_wrap(transport, Some(widget.into()))
    }

    fn queue_wrap(&mut self, transport: Option<Arc<dyn Transport>>, widget: Option<String>) -> DeferredAdapter {
        let adapter = self.system.create_adapter(transport);
        let hold = self.system.is_enabled() && self.system.store().has_mocks();
        self.queue.push_back(Command::Wrap {
            adapter: adapter.clone(),
            widget,
        });

        DeferredAdapter {
            inner: adapter,
            gate: hold.then(|| self.gate()),
        }
    }

    /// Replay every queued command in order, then open the gate.
    ///
    /// A failing command is logged and skipped so later declarations and
    /// every queued wrap still run. Held requests are released once the
    /// queue is drained.
    pub async fn load(mut self) -> LoadOutcome<S> {
        let commands = self.queue.len();
        let mut failures = Vec::new();
        while let Some(command) = self.queue.pop_front() {
            let result = match command {
                Command::Declare(declaration) => self.system.declare(declaration).map(drop),
                Command::DeclareDynamic(future) => {
                    let declaration = future.await;
                    self.system.declare(declaration).map(drop)
                }
                Command::Wrap { adapter, widget } => match widget {
                    Some(widget) => self.system.wrap_child_adapter(&adapter, &widget),
                    None => self.system.wrap_adapter(&adapter),
                }
                .map(drop),
            };
            if let Err(err) = result {
                tracing::error!(error = %err, "Queued mock command failed");
                failures.push(err);
            }
        }

        self.gate.send_replace(true);
        tracing::info!(commands, failed = failures.len(), "Lazy mock system loaded");
        LoadOutcome {
            system: self.system,
            failures,
        }
    }
}

/// Result of [`LazyMockSystem::load`].
#[derive(Debug)]
pub struct LoadOutcome<S> {
    /// The loaded system.
    pub system: MockSystem<S>,
    /// Errors from commands that failed, in queue order.
    pub failures: Vec<MockError>,
}

impl<S> LoadOutcome<S> {
    /// Check if every queued command succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// The loaded system, or the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first failing command's error.
    pub fn into_result(self) -> Result<MockSystem<S>> {
        match self.failures.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.system),
        }
    }
}

impl<S> std::fmt::Debug for LazyMockSystem<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyMockSystem")
            .field("pending", &self.queue.len())
            .finish_non_exhaustive()
    }
}
