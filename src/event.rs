//! Bridges the engine's push-style transport callbacks into a single ordered,
//! multicast event stream scoped to the session's lifetime.
//!
//! Consumers never touch the raw listener interface; they take a
//! [`Subscription`] from the bridge. Late subscribers join at the most recently
//! emitted event (replay depth 1) so a UI re-attaching after a configuration
//! change sees the current connection state rather than nothing.

use std::sync::{Arc, Mutex, PoisonError};

use presentment_frontend::RequestedDocument;
use tokio::sync::mpsc;
use url::Url;

/// Failure signalled by the radio/network layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Event pushed by the engine's transfer layer.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Proximity engagement material (e.g. QR contents) is ready to display.
    EngagementReady { payload: String },
    /// The transport connection is being established.
    Connecting,
    /// The transport connection is established.
    Connected,
    /// A presentation request arrived.
    RequestReceived { documents: Vec<RequestedDocument> },
    /// The transport confirmed the response reached the verifier.
    ResponseSent,
    /// The remote protocol continues at another location.
    Redirect { uri: Url },
    /// The channel closed without a transport error.
    Disconnected,
    /// The transport layer failed.
    Error(TransportError),
}

/// Push-style listener registered with the engine's transfer layer.
///
/// At most one listener is active per session; the session registers it before
/// issuing the engagement or connect call so the first event cannot be lost.
pub trait TransferListener: Send + Sync {
    fn on_event(&self, event: TransportEvent);
}

/// Multicast channel with replay depth 1.
///
/// Events are fanned out to every live subscriber in emission order; the most
/// recent event is retained and delivered first to new subscribers.
#[derive(Debug)]
pub(crate) struct Multicast<T> {
    inner: Mutex<MulticastInner<T>>,
}

#[derive(Debug)]
struct MulticastInner<T> {
    subscribers: Vec<mpsc::UnboundedSender<T>>,
    last: Option<T>,
}

impl<T: Clone> Multicast<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MulticastInner {
                subscribers: Vec::new(),
                last: None,
            }),
        }
    }

    /// Deliver `event` to all live subscribers and retain it for replay.
    ///
    /// Holding the lock across the fan-out keeps emission order identical for
    /// every subscriber.
    pub fn emit(&self, event: T) {
        let mut inner = self.lock();
        inner
            .subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
        inner.last = Some(event);
    }

    /// Subscribe, receiving the most recent event (if any) first.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        if let Some(last) = &inner.last {
            // The channel is unbounded and tx is not yet shared, so this cannot fail.
            let _ = tx.send(last.clone());
        }
        inner.subscribers.push(tx);
        Subscription { rx }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MulticastInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A live subscription to a [`Multicast`] channel.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Receive the next event. Returns `None` once the emitting side is gone.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

/// Converts transport push callbacks into the session's single ordered stream.
///
/// The session also injects its own synthetic events (remote-binding
/// `Connecting`/`Connected`/`RequestReceived`) through [`EventBridge::emit`] so
/// that every consumer observes one totally ordered sequence.
#[derive(Debug, Clone)]
pub(crate) struct EventBridge {
    events: Arc<Multicast<TransportEvent>>,
}

struct BridgeListener {
    events: Arc<Multicast<TransportEvent>>,
}

impl TransferListener for BridgeListener {
    fn on_event(&self, event: TransportEvent) {
        self.events.emit(event);
    }
}

impl EventBridge {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Multicast::new()),
        }
    }

    /// The listener to register with the engine's transfer layer.
    pub fn listener(&self) -> Arc<dyn TransferListener> {
        Arc::new(BridgeListener {
            events: Arc::clone(&self.events),
        })
    }

    /// Inject a session-synthesized event into the ordered stream.
    pub fn emit(&self, event: TransportEvent) {
        self.events.emit(event);
    }

    pub fn subscribe(&self) -> Subscription<TransportEvent> {
        self.events.subscribe()
    }
}

/// A cleanup action guaranteed to run at most once, however the session ends:
/// explicit stop, scope cancellation, or stream completion.
pub(crate) struct Teardown {
    action: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Teardown {
    pub fn new() -> Self {
        Self {
            action: Mutex::new(None),
        }
    }

    /// Install the cleanup action. Later arms replace an unexecuted action.
    pub fn arm(&self, action: impl FnOnce() + Send + 'static) {
        *self.action.lock().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(action));
    }

    /// Run the cleanup action if it has not already run.
    pub fn run_once(&self) {
        let action = self
            .action
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(action) = action {
            action();
        }
    }
}

impl std::fmt::Debug for Teardown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Teardown").finish_non_exhaustive()
    }
}
