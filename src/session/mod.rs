//! The presentment session controller.
//!
//! A [`PresentmentSession`] drives one credential-presentation exchange between
//! the holder and a verifier over either transport binding. It multiplexes the
//! transport's push callbacks into a single ordered event stream, tracks the
//! session lifecycle, gates response release behind the holder's authorization,
//! and reports exactly one [`SessionOutcome`] per send attempt.
//!
//! Session-scoped work runs on spawned tasks with independent failure
//! isolation; cancelling the session's token unregisters the transport listener
//! and requests disconnect without awaiting in-flight engine calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use presentment_frontend::{
    CryptoHandle, Phase, RequestedDocument, SessionEvent, SessionOutcome,
};
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::authorization::AuthorizationGate;
use crate::config::Binding;
use crate::engine::{CredentialEngine, EngineError, ResponseOutcome};
use crate::event::{
    EventBridge, Multicast, Subscription, Teardown, TransportError, TransportEvent,
};
use crate::selection::SelectionStore;

mod join;

use join::{OutcomeJoin, TerminalEvent};

pub use join::BENIGN_DISCONNECT_MESSAGE;

/// Errors surfaced directly by session verbs.
///
/// Transport and engine failures during an exchange are not raised here; they
/// are classified into [`SessionOutcome::Failure`] on the observation stream.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The radio/network layer failed while the session was being started.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
    /// The engine failed while resolving configuration.
    #[error("credential engine failure: {0}")]
    Engine(#[from] EngineError),
    /// A session verb was invoked outside its contract. This is a programming
    /// error and is not recoverable locally.
    #[error("session contract violation: {0}")]
    Configuration(&'static str),
}

fn contract_violation(message: &'static str) -> SessionError {
    tracing::error!("session contract violation: {message}");
    SessionError::Configuration(message)
}

/// State shared between the session's verbs and its event pump task.
struct Shared {
    observers: Multicast<SessionEvent>,
    phase: Mutex<Phase>,
    join: Mutex<OutcomeJoin>,
    store: SelectionStore,
    current_request: Mutex<Option<Vec<RequestedDocument>>>,
    /// Set once response bytes leave this side for the current request.
    responded: AtomicBool,
}

impl Shared {
    fn new(remote: bool) -> Self {
        Self {
            observers: Multicast::new(),
            phase: Mutex::new(Phase::Idle),
            join: Mutex::new(OutcomeJoin::new(remote)),
            store: SelectionStore::new(),
            current_request: Mutex::new(None),
            responded: AtomicBool::new(false),
        }
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    fn phase(&self) -> Phase {
        self.phase
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn join(&self) -> std::sync::MutexGuard<'_, OutcomeJoin> {
        self.join.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        self.observers.emit(event);
    }

    fn complete(&self, outcome: SessionOutcome) {
        self.set_phase(Phase::Complete(outcome.clone()));
        self.emit(SessionEvent::Completed(outcome));
    }

    fn handle_transport_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::EngagementReady { payload } => {
                self.emit(SessionEvent::EngagementReady { payload });
            }
            TransportEvent::Connecting => {
                self.set_phase(Phase::Connecting);
                self.emit(SessionEvent::Connecting);
            }
            TransportEvent::Connected => {
                self.set_phase(Phase::Connected);
                self.emit(SessionEvent::Connected);
            }
            TransportEvent::RequestReceived { documents } => {
                // A new request invalidates the previous selection and attempt.
                self.store.clear();
                self.join().begin_attempt();
                self.responded.store(false, Ordering::SeqCst);
                *self
                    .current_request
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(documents.clone());
                self.set_phase(Phase::AwaitingSelection);
                self.emit(SessionEvent::RequestReceived { documents });
            }
            TransportEvent::ResponseSent => self.terminal(TerminalEvent::ResponseSent),
            TransportEvent::Redirect { uri } => self.terminal(TerminalEvent::Redirect(uri)),
            TransportEvent::Disconnected => self.terminal(TerminalEvent::Disconnected),
            TransportEvent::Error(error) => {
                tracing::warn!(%error, "transport error");
                self.terminal(TerminalEvent::Error(error));
            }
        }
    }

    fn terminal(&self, event: TerminalEvent) {
        let outcome = self.join().terminal(event);
        if let Some(outcome) = outcome {
            self.complete(outcome);
        }
    }
}

/// Drives one credential-presentation exchange between the holder and a
/// verifier.
///
/// Exactly one session is active per presentation attempt; starting a new one
/// invalidates the prior session's event stream. The caller owns the
/// [`CancellationToken`] and cancels it on teardown (e.g. when the presenting
/// screen goes away).
pub struct PresentmentSession<E, G> {
    id: Uuid,
    binding: Binding,
    engine: Arc<E>,
    gate: Arc<G>,
    shared: Arc<Shared>,
    bridge: EventBridge,
    cancel: CancellationToken,
    teardown: Arc<Teardown>,
    started: AtomicBool,
    sending: AtomicBool,
}

impl<E, G> PresentmentSession<E, G>
where
    E: CredentialEngine,
    G: AuthorizationGate,
{
    pub fn new(
        binding: Binding,
        engine: Arc<E>,
        gate: Arc<G>,
        cancellation: CancellationToken,
    ) -> Self {
        let shared = Arc::new(Shared::new(binding.is_remote()));
        Self {
            id: Uuid::new_v4(),
            binding,
            engine,
            gate,
            shared,
            bridge: EventBridge::new(),
            cancel: cancellation,
            teardown: Arc::new(Teardown::new()),
            started: AtomicBool::new(false),
            sending: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.shared.phase()
    }

    /// The verifier's current request, once one has arrived.
    pub fn requested_documents(&self) -> Option<Vec<RequestedDocument>> {
        self.shared
            .current_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Start the exchange.
    ///
    /// Resolves engine configuration, registers the transport listener (before
    /// the engagement or connect call, so the first event cannot be lost) and
    /// kicks off the binding-specific connection flow. For the proximity
    /// binding this issues the radio engagement request; for the remote binding
    /// it resolves the request URI, reporting `Connecting`, `Connected` and
    /// `RequestReceived` through the session stream as resolution progresses.
    pub async fn start(&self) -> Result<(), SessionError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(contract_violation("session already started"));
        }

        // Configuration resolves strictly before any event subscription.
        self.engine.resolve_config(&self.binding).await?;

        self.engine.add_transfer_listener(self.bridge.listener());
        {
            let engine = Arc::clone(&self.engine);
            self.teardown.arm(move || {
                engine.remove_transfer_listener();
                engine.stop_presentation();
            });
        }

        let stream = self.bridge.subscribe();
        tokio::spawn(run_event_pump(
            Arc::clone(&self.shared),
            stream,
            self.cancel.clone(),
            Arc::clone(&self.teardown),
        ));

        match &self.binding {
            Binding::Proximity => {
                self.shared.set_phase(Phase::Engaging);
                self.shared.emit(SessionEvent::Engaging);
                self.engine.start_engagement().await.map_err(|error| {
                    tracing::error!(%error, "radio engagement failed");
                    error
                })?;
            }
            Binding::Remote { request_uri } => {
                let engine = Arc::clone(&self.engine);
                let bridge = self.bridge.clone();
                let cancel = self.cancel.clone();
                let uri: Url = (**request_uri).clone();
                tokio::spawn(async move {
                    bridge.emit(TransportEvent::Connecting);
                    let resolved = tokio::select! {
                        _ = cancel.cancelled() => return,
                        resolved = engine.resolve_request(&uri) => resolved,
                    };
                    match resolved {
                        Ok(documents) => {
                            bridge.emit(TransportEvent::Connected);
                            bridge.emit(TransportEvent::RequestReceived { documents });
                        }
                        Err(error) => {
                            tracing::warn!(%error, "request resolution failed");
                            bridge.emit(TransportEvent::Error(error));
                        }
                    }
                });
            }
        }

        Ok(())
    }

    /// Subscribe to session events.
    ///
    /// Late subscribers receive the most recent event first, so a UI
    /// re-attaching after a configuration change sees the current state.
    pub fn observe(&self) -> Result<Subscription<SessionEvent>, SessionError> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(contract_violation("observe called before start"));
        }
        Ok(self.shared.observers.subscribe())
    }

    /// Register a rendered document into the selection store.
    ///
    /// Registration is driven by the caller, once per document it shows.
    pub fn on_document_rendered(&self, document: RequestedDocument) {
        self.shared.store.register(document);
    }

    /// Flip one element of one document in the selection store.
    pub fn on_element_toggled(&self, document_id: &str, element_id: &str) {
        self.shared.store.toggle(document_id, element_id);
    }

    /// Build and send the disclosure response for the current selection.
    ///
    /// Takes a fresh snapshot of the selection store, asks the engine for a
    /// response, passes the authorization gate if the engine requires it (on
    /// gate success the same send is retried with the same snapshot), and hands
    /// the bytes to the transport. The terminal [`SessionOutcome`] is reported
    /// on the observation stream once the transport's own signal arrives.
    ///
    /// Engine and transport failures are reported as
    /// [`SessionOutcome::Failure`] rather than returned; an `Err` here means
    /// the call itself violated the session contract.
    pub async fn confirm_and_send(&self) -> Result<(), SessionError> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(contract_violation("confirm_and_send called before start"));
        }
        if self.shared.responded.load(Ordering::SeqCst) {
            return Err(contract_violation(
                "a response was already produced for this request",
            ));
        }
        if self.sending.swap(true, Ordering::SeqCst) {
            return Err(contract_violation("a send attempt is already in flight"));
        }
        let result = self.send_attempt().await;
        self.sending.store(false, Ordering::SeqCst);
        result
    }

    async fn send_attempt(&self) -> Result<(), SessionError> {
        self.shared.join().begin_attempt();
        self.shared.set_phase(Phase::Sending);
        // Built fresh for every attempt; never cached across toggles.
        let documents = self.shared.store.snapshot();

        loop {
            let response = tokio::select! {
                _ = self.cancel.cancelled() => {
                    // In-flight engine work is abandoned, not awaited.
                    tracing::debug!(session = %self.id, "send attempt cancelled");
                    return Ok(());
                }
                response = self.engine.create_response(&documents) => response,
            };

            match response {
                Err(error) => {
                    tracing::warn!(%error, "engine could not build a response");
                    self.fail_attempt(error.to_string());
                    return Ok(());
                }
                Ok(ResponseOutcome::Failed { reason }) => {
                    self.fail_attempt(reason);
                    return Ok(());
                }
                Ok(ResponseOutcome::AuthorizationRequired(handle)) => {
                    if !self.authorize(handle).await {
                        return Ok(());
                    }
                    // Gate passed; retry the same send with the same snapshot.
                    self.shared.set_phase(Phase::Sending);
                }
                Ok(ResponseOutcome::Ready(bytes)) => {
                    self.engine.send_response_bytes(bytes);
                    self.shared.responded.store(true, Ordering::SeqCst);
                    let outcome = self.shared.join().local_send_accepted();
                    if let Some(outcome) = outcome {
                        self.shared.complete(outcome);
                    }
                    return Ok(());
                }
            }
        }
    }

    fn fail_attempt(&self, reason: String) {
        let outcome = self.shared.join().local_failure(reason);
        if let Some(outcome) = outcome {
            self.shared.complete(outcome);
        }
    }

    /// Run the authorization gate for `handle`. Returns whether the send should
    /// be retried.
    async fn authorize(&self, handle: CryptoHandle) -> bool {
        if let Err(error) = self.gate.check_availability().check() {
            tracing::warn!(%error, "authorization gate cannot run");
            // The caller has to arrange authorization out of band; hand the
            // handle back and keep the request answerable.
            self.shared.join().begin_attempt();
            self.shared.set_phase(Phase::AwaitingSelection);
            self.shared
                .emit(SessionEvent::Completed(SessionOutcome::AuthorizationRequired {
                    handle,
                }));
            return false;
        }

        self.shared.set_phase(Phase::Authorizing);
        self.shared.emit(SessionEvent::AuthorizationRequired {
            handle: handle.clone(),
        });

        let outcome = tokio::select! {
            _ = self.cancel.cancelled() => return false,
            outcome = self.gate.authenticate(handle, true) => outcome,
        };

        match outcome.check() {
            Ok(()) => true,
            Err(error) => {
                // Holder can retry from the selection screen without
                // re-receiving the request.
                tracing::debug!(%error, "authorization attempt failed");
                self.shared.join().begin_attempt();
                self.shared.set_phase(Phase::AwaitingSelection);
                false
            }
        }
    }

    /// Stop the session.
    ///
    /// Signals cancellation to all session-scoped work, unregisters the
    /// transport listener and requests transport-level disconnect. Idempotent;
    /// the cleanup pair runs exactly once however the session ends. Does not
    /// wait for full teardown.
    pub fn stop(&self) {
        tracing::debug!(session = %self.id, "stopping presentment session");
        self.shared.store.clear();
        self.cancel.cancel();
        self.teardown.run_once();
    }
}

impl<E, G> Drop for PresentmentSession<E, G> {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.teardown.run_once();
    }
}

/// Consumes the bridged transport stream for the session's lifetime.
///
/// Runs as its own task so a failure in any sibling operation cannot stall
/// event delivery. The teardown pair runs on every exit path.
async fn run_event_pump(
    shared: Arc<Shared>,
    mut stream: Subscription<TransportEvent>,
    cancel: CancellationToken,
    teardown: Arc<Teardown>,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = stream.recv() => {
                let Some(event) = event else { break };
                shared.handle_transport_event(event);
            }
        }
    }
    teardown.run_once();
}
