use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::mpsc;

use orchestration_core::OrchestratorEvent;

/// Subscriber callback for lifecycle events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: OrchestratorEvent) -> anyhow::Result<()>;
}

pub type SharedHandler = Arc<dyn EventHandler>;

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(OrchestratorEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, event: OrchestratorEvent) -> anyhow::Result<()> {
        (self.0)(event).await
    }
}

type HandlerMap = Arc<DashMap<String, Vec<SharedHandler>>>;

/// Pub/sub keyed by event-kind string.
///
/// `emit` enqueues onto an unbounded channel and returns immediately; a
/// single dispatcher task drains the channel and spawns one task per
/// matching handler. A handler that errors or panics is logged and never
/// affects other handlers or the emitting operation.
pub struct EventNotifier {
    handlers: HandlerMap,
    tx: mpsc::UnboundedSender<OrchestratorEvent>,
}

impl Default for EventNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EventNotifier {
    /// Spawns the dispatcher task; must be called within a tokio runtime.
    /// Dropping the notifier drops the sender and ends the dispatcher.
    pub fn new() -> Self {
        let handlers: HandlerMap = Arc::new(DashMap::new());
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(dispatch_loop(rx, Arc::clone(&handlers)));

        Self { handlers, tx }
    }

    pub fn on<H>(&self, kind: impl Into<String>, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.on_shared(kind, Arc::new(handler));
    }

    pub fn on_shared(&self, kind: impl Into<String>, handler: SharedHandler) {
        let kind = kind.into();
        self.handlers.entry(kind.clone()).or_default().push(handler);
        tracing::debug!(%kind, "event handler subscribed");
    }

    /// Subscribe an async closure.
    pub fn on_fn<F, Fut>(&self, kind: impl Into<String>, handler: F)
    where
        F: Fn(OrchestratorEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on(kind, FnHandler(handler));
    }

    /// Fire-and-forget: never blocks or fails the caller.
    pub fn emit(&self, kind: &str, payload: Value) {
        let event = OrchestratorEvent::new(kind, payload);
        if self.tx.send(event).is_err() {
            tracing::warn!(kind, "event dropped, dispatcher stopped");
        }
    }

    /// Histogram of handler counts per event kind.
    pub fn handler_counts(&self) -> HashMap<String, usize> {
        self.handlers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().len()))
            .collect()
    }
}

async fn dispatch_loop(mut rx: mpsc::UnboundedReceiver<OrchestratorEvent>, handlers: HandlerMap) {
    while let Some(event) = rx.recv().await {
        let matching: Vec<SharedHandler> = handlers
            .get(&event.kind)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        for handler in matching {
            let event = event.clone();
            // One task per handler: a panicking or erroring handler
            // cannot abort dispatch to the others.
            tokio::spawn(async move {
                if let Err(error) = handler.handle(event).await {
                    tracing::error!(%error, "event handler failed");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;

    #[tokio::test]
    async fn emit_reaches_subscribed_handler() {
        let notifier = EventNotifier::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        notifier.on_fn("task_completed", move |event| {
            let tx = tx.clone();
            async move {
                tx.send(event.payload).ok();
                Ok(())
            }
        });

        notifier.emit("task_completed", json!({"task_id": "t1"}));

        let payload = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("handler not invoked")
            .unwrap();
        assert_eq!(payload["task_id"], "t1");
    }

    #[tokio::test]
    async fn handlers_only_receive_their_kind() {
        let notifier = EventNotifier::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        notifier.on_fn("plan_completed", move |event| {
            let tx = tx.clone();
            async move {
                tx.send(event.kind).ok();
                Ok(())
            }
        });

        notifier.emit("task_completed", json!({}));
        notifier.emit("plan_completed", json!({}));

        let kind = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("handler not invoked")
            .unwrap();
        assert_eq!(kind, "plan_completed");
    }

    #[tokio::test]
    async fn failing_handler_does_not_stop_others() {
        let notifier = EventNotifier::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        notifier.on_fn("plan_failed", |_event| async {
            anyhow::bail!("handler exploded")
        });
        notifier.on_fn("plan_failed", move |event| {
            let tx = tx.clone();
            async move {
                tx.send(event.kind).ok();
                Ok(())
            }
        });

        notifier.emit("plan_failed", json!({}));

        let kind = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("second handler not invoked")
            .unwrap();
        assert_eq!(kind, "plan_failed");
    }

    #[tokio::test]
    async fn handler_counts_histogram() {
        let notifier = EventNotifier::new();

        notifier.on_fn("task_completed", |_| async { Ok(()) });
        notifier.on_fn("task_completed", |_| async { Ok(()) });
        notifier.on_fn("custom_kind", |_| async { Ok(()) });

        let counts = notifier.handler_counts();
        assert_eq!(counts.get("task_completed"), Some(&2));
        assert_eq!(counts.get("custom_kind"), Some(&1));
        assert_eq!(counts.get("plan_completed"), None);
    }
}
