//! Subscriber registry
//!
//! Keeps, per [`EventKind`], the ordered list of handlers registered through
//! `SocketBaseClient::on` and delivers events to them.
//!
//! # Delivery Rules
//!
//! - Handlers run in registration order, one at a time.
//! - Each emission works on a snapshot of the list taken when it starts, so
//!   a handler that subscribes or unsubscribes (itself or others) affects
//!   only later emissions.
//! - A handler that panics is logged and skipped; the remaining handlers
//!   still run and the emitter never sees the panic.
//!
//! # Examples
//!
//! ```rust
//! use socketbase_client::{Event, EventKind, EventRegistry};
//!
//! # async fn example() {
//! let registry = EventRegistry::new();
//! let subscription = registry
//!     .register(EventKind::Open, |_event| async move {
//!         println!("connected");
//!     })
//!     .await;
//!
//! registry.emit(Event::Open).await;
//! subscription.unsubscribe().await;
//! # }
//! ```

use crate::event::{Event, EventKind};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;

/// Type for event handler functions
pub type EventFn = Arc<dyn Fn(Event) -> BoxFuture<'static, ()> + Send + Sync>;

struct Subscriber {
    id: u64,
    handler: EventFn,
}

type HandlerMap = HashMap<EventKind, Vec<Subscriber>>;

/// Registry of event handlers
#[derive(Clone, Default)]
pub struct EventRegistry {
    handlers: Arc<Mutex<HandlerMap>>,
    next_id: Arc<AtomicU64>,
}

impl EventRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for `kind`
    ///
    /// The returned [`Subscription`] removes exactly this registration.
    pub async fn register<F, Fut>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: EventFn = Arc::new(move |event| handler(event).boxed());
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.handlers
            .lock()
            .await
            .entry(kind)
            .or_default()
            .push(Subscriber { id, handler });

        Subscription {
            handlers: Arc::downgrade(&self.handlers),
            kind,
            id,
        }
    }

    /// Deliver `event` to every handler registered for its kind
    ///
    /// Returns the number of handlers that ran to completion.
    pub async fn emit(&self, event: Event) -> usize {
        let kind = event.kind();
        let snapshot: Vec<EventFn> = {
            let handlers = self.handlers.lock().await;
            match handlers.get(&kind) {
                Some(subscribers) => subscribers.iter().map(|s| Arc::clone(&s.handler)).collect(),
                None => return 0,
            }
        };

        let mut completed = 0;
        for handler in snapshot {
            let started = std::panic::catch_unwind(AssertUnwindSafe(|| handler(event.clone())));
            let outcome = match started {
                Ok(future) => AssertUnwindSafe(future).catch_unwind().await,
                Err(panic) => Err(panic),
            };

            match outcome {
                Ok(()) => completed += 1,
                Err(panic) => {
                    tracing::error!(
                        event = %kind,
                        panic = %panic_message(panic.as_ref()),
                        "Event handler panicked"
                    );
                }
            }
        }

        completed
    }

    /// Number of handlers registered for `kind`
    pub async fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers
            .lock()
            .await
            .get(&kind)
            .map_or(0, |subscribers| subscribers.len())
    }

    /// Remove every handler
    pub async fn clear(&self) {
        self.handlers.lock().await.clear();
    }
}

/// Handle returned by a registration
///
/// Dropping it keeps the handler registered; call
/// [`unsubscribe`](Subscription::unsubscribe) to remove it.
#[derive(Debug, Clone)]
pub struct Subscription {
    handlers: Weak<Mutex<HandlerMap>>,
    kind: EventKind,
    id: u64,
}

impl Subscription {
    /// The event kind this subscription listens to
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Remove the handler
    ///
    /// Returns true if it was still registered. Calling it again is a no-op.
    pub async fn unsubscribe(&self) -> bool {
        let Some(handlers) = self.handlers.upgrade() else {
            return false;
        };

        let mut handlers = handlers.lock().await;
        let Some(subscribers) = handlers.get_mut(&self.kind) else {
            return false;
        };

        match subscribers.iter().position(|s| s.id == self.id) {
            Some(index) => {
                subscribers.remove(index);
                true
            }
            None => false,
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
