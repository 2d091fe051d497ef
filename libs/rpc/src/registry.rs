//! Dispatch Registry
//!
//! Explicit operation-name → handler map, built once at startup and frozen.
//! Handlers receive the server's shared state and the coerced positional
//! arguments, and may be asynchronous.

use crate::{BridgeError, Result};
use anyhow::{anyhow, Context};
use bridge_codec::ArgValue;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Handler return: an optional value, or an error reported as a handler fault
pub type HandlerResult = anyhow::Result<Option<ArgValue>>;

/// Type-erased asynchronous handler
pub type Handler<S> = Arc<dyn Fn(Arc<S>, Args) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Positional arguments handed to a handler
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<ArgValue>,
}

impl Args {
    pub fn new(values: Vec<ArgValue>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ArgValue> {
        self.values.get(index)
    }

    /// Argument at `index`, failing when the caller sent too few
    pub fn value(&self, index: usize) -> anyhow::Result<&ArgValue> {
        self.values
            .get(index)
            .ok_or_else(|| anyhow!("missing argument {} (got {})", index, self.values.len()))
    }

    pub fn str(&self, index: usize) -> anyhow::Result<&str> {
        let value = self.value(index)?;
        value
            .as_str()
            .with_context(|| format!("argument {} must be a string, got {}", index, value.tag()))
    }

    pub fn i64(&self, index: usize) -> anyhow::Result<i64> {
        let value = self.value(index)?;
        value
            .as_i64()
            .with_context(|| format!("argument {} must be an integer, got {}", index, value.tag()))
    }

    pub fn f64(&self, index: usize) -> anyhow::Result<f64> {
        let value = self.value(index)?;
        value
            .as_f64()
            .with_context(|| format!("argument {} must be a number, got {}", index, value.tag()))
    }

    pub fn bool(&self, index: usize) -> anyhow::Result<bool> {
        let value = self.value(index)?;
        value
            .as_bool()
            .with_context(|| format!("argument {} must be a Boolean, got {}", index, value.tag()))
    }

    pub fn bytes(&self, index: usize) -> anyhow::Result<&[u8]> {
        let value = self.value(index)?;
        value.as_bytes().with_context(|| {
            format!("argument {} must be a Uint8Array, got {}", index, value.tag())
        })
    }

    pub fn into_vec(self) -> Vec<ArgValue> {
        self.values
    }
}

impl From<Vec<ArgValue>> for Args {
    fn from(values: Vec<ArgValue>) -> Self {
        Self::new(values)
    }
}

struct Entry<S> {
    handler: Handler<S>,
    invocations: AtomicU64,
}

/// Collects handlers before the registry is frozen
pub struct RegistryBuilder<S> {
    entries: HashMap<String, Entry<S>>,
}

impl<S: Send + Sync + 'static> RegistryBuilder<S> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register an async handler under `name`
    ///
    /// Fails with [`BridgeError::DuplicateOperation`] if the name is taken.
    pub fn register<F, Fut>(mut self, name: &str, handler: F) -> Result<Self>
    where
        F: Fn(Arc<S>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        if self.entries.contains_key(name) {
            return Err(BridgeError::DuplicateOperation {
                name: name.to_string(),
            });
        }

        let handler: Handler<S> =
            Arc::new(move |state: Arc<S>, args: Args| handler(state, args).boxed());
        debug!("Registering operation: {}", name);
        self.entries.insert(
            name.to_string(),
            Entry {
                handler,
                invocations: AtomicU64::new(0),
            },
        );
        Ok(self)
    }

    /// Register a synchronous handler under `name`
    pub fn register_sync<F>(self, name: &str, handler: F) -> Result<Self>
    where
        F: Fn(&S, Args) -> HandlerResult + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        self.register(name, move |state: Arc<S>, args| {
            let handler = handler.clone();
            async move { handler(&state, args) }
        })
    }

    /// Freeze the registry
    pub fn build(self) -> Arc<Registry<S>> {
        Arc::new(Registry {
            entries: self.entries,
        })
    }
}

impl<S: Send + Sync + 'static> Default for RegistryBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Frozen name → handler map, shared without locking
pub struct Registry<S> {
    entries: HashMap<String, Entry<S>>,
}

impl<S> Registry<S> {
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of times the handler for `name` has been entered
    pub fn invocation_count(&self, name: &str) -> u64 {
        self.entries
            .get(name)
            .map_or(0, |entry| entry.invocations.load(Ordering::Relaxed))
    }

    /// Total handler entries across all operations
    pub fn total_invocations(&self) -> u64 {
        self.entries
            .values()
            .map(|entry| entry.invocations.load(Ordering::Relaxed))
            .sum()
    }

    /// Look up a handler and count the invocation
    pub(crate) fn acquire(&self, name: &str) -> Option<Handler<S>> {
        self.entries.get(name).map(|entry| {
            entry.invocations.fetch_add(1, Ordering::Relaxed);
            entry.handler.clone()
        })
    }
}

impl<S> std::fmt::Debug for Registry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("operations", &self.names())
            .finish()
    }
}
