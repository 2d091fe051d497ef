//! Invoker
//!
//! Resolves an operation name, coerces textual arguments by their type tags
//! and drives the handler to completion. Asynchronous handlers are awaited;
//! a panicking handler is contained and reported as a handler failure.

use crate::registry::{Args, Registry};
use crate::BridgeError;
use bridge_codec::{ArgValue, DecodeError};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of one invocation
#[derive(Debug)]
pub enum InvokeOutcome {
    /// Handler returned, with an optional value
    Completed(Option<ArgValue>),
    /// No handler registered under this name; nothing was invoked
    NotFound(String),
    /// Arguments were rejected or the handler failed
    Failed(BridgeError),
}

impl InvokeOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, InvokeOutcome::Completed(_))
    }

    /// Convert into a plain result, treating not-found as an error
    pub fn into_result(self) -> Result<Option<ArgValue>, BridgeError> {
        match self {
            InvokeOutcome::Completed(value) => Ok(value),
            InvokeOutcome::NotFound(name) => Err(BridgeError::not_found(name)),
            InvokeOutcome::Failed(error) => Err(error),
        }
    }
}

/// Invokes registered handlers against server-owned state
pub struct Invoker<S> {
    registry: Arc<Registry<S>>,
    state: Arc<S>,
}

impl<S> Clone for Invoker<S> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            state: self.state.clone(),
        }
    }
}

impl<S: Send + Sync + 'static> Invoker<S> {
    pub fn new(registry: Arc<Registry<S>>, state: Arc<S>) -> Self {
        Self { registry, state }
    }

    pub fn registry(&self) -> &Arc<Registry<S>> {
        &self.registry
    }

    pub fn state(&self) -> &Arc<S> {
        &self.state
    }

    /// Invoke `name` with wire-form arguments
    pub async fn invoke(&self, name: &str, arg_types: &[String], args: &[String]) -> InvokeOutcome {
        if !self.registry.contains(name) {
            debug!("Operation not found: {}", name);
            return InvokeOutcome::NotFound(name.to_string());
        }

        if arg_types.len() != args.len() {
            return InvokeOutcome::Failed(BridgeError::Decode(DecodeError::ArityMismatch {
                types: arg_types.len(),
                values: args.len(),
            }));
        }

        let mut values = Vec::with_capacity(args.len());
        for (index, (tag, text)) in arg_types.iter().zip(args).enumerate() {
            match ArgValue::from_wire(tag, text) {
                Ok(value) => values.push(value),
                Err(source) => {
                    warn!("{}: argument {} rejected: {}", name, index, source);
                    return InvokeOutcome::Failed(BridgeError::ArgumentCoercion { index, source });
                }
            }
        }

        self.invoke_values(name, values).await
    }

    /// Invoke `name` with already typed arguments
    pub async fn invoke_values(&self, name: &str, values: Vec<ArgValue>) -> InvokeOutcome {
        let Some(handler) = self.registry.acquire(name) else {
            return InvokeOutcome::NotFound(name.to_string());
        };

        let state = self.state.clone();
        let args = Args::new(values);
        // The handler call itself runs inside the future so a panic before
        // its first await is caught too.
        let call = async move { handler(state, args).await };

        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(value)) => InvokeOutcome::Completed(value),
            Ok(Err(error)) => {
                warn!("{} failed: {:#}", name, error);
                InvokeOutcome::Failed(BridgeError::handler(name, format!("{:#}", error)))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!("{} panicked: {}", name, message);
                InvokeOutcome::Failed(BridgeError::handler(
                    name,
                    format!("handler panicked: {}", message),
                ))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryBuilder;
    use anyhow::bail;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Counter {
        hits: AtomicUsize,
    }

    fn wire(values: &[ArgValue]) -> (Vec<String>, Vec<String>) {
        values.iter().map(ArgValue::to_wire).unzip()
    }

    fn invoker() -> Invoker<Counter> {
        let registry = RegistryBuilder::<Counter>::new()
            .register("known", |state: Arc<Counter>, _args| async move {
                state.hits.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            })
            .unwrap()
            .register("slowEcho", |_state, args: Args| async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(args.get(0).cloned())
            })
            .unwrap()
            .register_sync("fails", |_, _| bail!("store is not open"))
            .unwrap()
            .register_sync("panics", |_, _| panic!("handler bug"))
            .unwrap()
            .build();
        Invoker::new(registry, Arc::new(Counter::default()))
    }

    #[tokio::test]
    async fn test_known_operation_invoked_once() {
        let invoker = invoker();
        let outcome = invoker.invoke("known", &[], &[]).await;
        assert!(outcome.is_completed());
        assert_eq!(invoker.state().hits.load(Ordering::SeqCst), 1);
        assert_eq!(invoker.registry().invocation_count("known"), 1);
    }

    #[tokio::test]
    async fn test_unknown_operation_invokes_nothing() {
        let invoker = invoker();
        let outcome = invoker.invoke("unknown-op", &[], &[]).await;
        assert!(matches!(outcome, InvokeOutcome::NotFound(ref name) if name == "unknown-op"));
        assert_eq!(invoker.registry().total_invocations(), 0);
        assert_eq!(invoker.state().hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_async_handler_is_awaited() {
        let invoker = invoker();
        let (types, args) = wire(&[ArgValue::from("V")]);
        let outcome = invoker.invoke("slowEcho", &types, &args).await;
        assert_eq!(outcome.into_result().unwrap(), Some(ArgValue::from("V")));
    }

    #[tokio::test]
    async fn test_coercion_failure_reports_index() {
        let invoker = invoker();
        let types = vec!["string".to_string(), "number".to_string()];
        let args = vec!["ok".to_string(), "twelve".to_string()];
        match invoker.invoke("slowEcho", &types, &args).await {
            InvokeOutcome::Failed(BridgeError::ArgumentCoercion { index, .. }) => {
                assert_eq!(index, 1)
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(invoker.registry().invocation_count("slowEcho"), 0);
    }

    #[tokio::test]
    async fn test_handler_error_and_panic_are_contained() {
        let invoker = invoker();

        match invoker.invoke("fails", &[], &[]).await {
            InvokeOutcome::Failed(BridgeError::Handler { operation, message }) => {
                assert_eq!(operation, "fails");
                assert!(message.contains("store is not open"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        match invoker.invoke("panics", &[], &[]).await {
            InvokeOutcome::Failed(BridgeError::Handler { message, .. }) => {
                assert!(message.contains("handler bug"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        // Still serving after the panic
        assert!(invoker.invoke("known", &[], &[]).await.is_completed());
    }

    #[tokio::test]
    async fn test_arity_mismatch_rejected() {
        let invoker = invoker();
        let outcome = invoker
            .invoke("known", &["string".to_string()], &[])
            .await;
        assert!(matches!(
            outcome,
            InvokeOutcome::Failed(BridgeError::Decode(DecodeError::ArityMismatch { .. }))
        ));
    }
}
