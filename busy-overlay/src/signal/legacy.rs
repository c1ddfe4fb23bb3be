//! Legacy global AJAX event bus and its overlay adapter.
//!
//! Older page code announces its requests on a process-wide event bus rather
//! than going through the HTTP pipeline. The bus raises:
//!
//! - [`AjaxEventKind::Send`] when a request goes out
//! - [`AjaxEventKind::Complete`] exactly once when it finishes, success or failure
//!
//! The bus may not exist in a given environment. [`LegacyBusAdapter::install`]
//! takes an `Option` and simply installs nothing when it is absent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::{report_end, report_start, RequestConfig, RequestObserver, SignalSource};

/// Bus event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AjaxEventKind {
    Send,
    Complete,
}

/// One event raised on the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct AjaxEvent {
    pub kind: AjaxEventKind,
    /// Status of the underlying request; 0 before completion or on network failure.
    pub status: u16,
    /// Options the request was issued with, when the emitter supplies them.
    pub options: Option<RequestConfig>,
}

impl AjaxEvent {
    pub fn send(options: RequestConfig) -> Self {
        Self {
            kind: AjaxEventKind::Send,
            status: 0,
            options: Some(options),
        }
    }

    pub fn complete(status: u16, options: RequestConfig) -> Self {
        Self {
            kind: AjaxEventKind::Complete,
            status,
            options: Some(options),
        }
    }
}

/// Bus event handler.
pub type AjaxHandler = Arc<dyn Fn(&AjaxEvent) + Send + Sync>;

/// Identifies one [`AjaxEventBus::on`] registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    kind: AjaxEventKind,
    handler: AjaxHandler,
}

/// Publish/subscribe bus for AJAX lifecycle events.
#[derive(Default)]
pub struct AjaxEventBus {
    handlers: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for AjaxEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AjaxEventBus")
            .field("handlers", &self.handlers.read().len())
            .finish()
    }
}

impl AjaxEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to events of `kind`.
    pub fn on(&self, kind: AjaxEventKind, handler: AjaxHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push(Subscription { id, kind, handler });
        id
    }

    /// Remove a subscription. Returns false if `id` was not registered.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|sub| sub.id != id);
        handlers.len() != before
    }

    /// Deliver `event` to every handler subscribed to its kind, in
    /// subscription order. Handlers run without the bus lock held.
    pub fn emit(&self, event: &AjaxEvent) {
        let handlers: Vec<AjaxHandler> = self
            .handlers
            .read()
            .iter()
            .filter(|sub| sub.kind == event.kind)
            .map(|sub| Arc::clone(&sub.handler))
            .collect();

        for handler in handlers {
            handler(event);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }
}

/// Reports legacy bus traffic to a [`RequestObserver`].
///
/// The handlers only hold a weak reference to the observer. Dropping the
/// adapter removes them from the bus.
#[derive(Debug)]
pub struct LegacyBusAdapter {
    bus: Arc<AjaxEventBus>,
    subscriptions: [SubscriptionId; 2],
}

impl LegacyBusAdapter {
    /// Subscribe to `bus` if the environment has one.
    pub fn install(
        bus: Option<Arc<AjaxEventBus>>,
        observer: Arc<dyn RequestObserver>,
    ) -> Option<Self> {
        let Some(bus) = bus else {
            tracing::debug!("No legacy AJAX bus present, adapter not installed");
            return None;
        };

        let on_send: Weak<dyn RequestObserver> = Arc::downgrade(&observer);
        let send = bus.on(
            AjaxEventKind::Send,
            Arc::new(move |event: &AjaxEvent| {
                if let Some(observer) = on_send.upgrade() {
                    report_start(observer.as_ref(), SignalSource::LegacyBus, event.options.as_ref());
                }
            }),
        );

        let on_complete: Weak<dyn RequestObserver> = Arc::downgrade(&observer);
        let complete = bus.on(
            AjaxEventKind::Complete,
            Arc::new(move |event: &AjaxEvent| {
                if let Some(observer) = on_complete.upgrade() {
                    report_end(observer.as_ref(), SignalSource::LegacyBus, event.options.as_ref());
                }
            }),
        );

        tracing::debug!("Legacy AJAX bus adapter installed");
        Some(Self {
            bus,
            subscriptions: [send, complete],
        })
    }

    /// The bus this adapter listens on.
    pub fn bus(&self) -> &Arc<AjaxEventBus> {
        &self.bus
    }
}

impl Drop for LegacyBusAdapter {
    fn drop(&mut self) {
        for id in self.subscriptions {
            self.bus.off(id);
        }
        tracing::debug!("Legacy AJAX bus adapter removed");
    }
}
