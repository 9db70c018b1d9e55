//! Scripted collaborators for driving a session end to end.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use presentment::authorization::{AuthOutcome, AuthorizationGate, Availability};
use presentment::config::Binding;
use presentment::engine::{CredentialEngine, EngineError, ResponseOutcome};
use presentment::event::{TransferListener, TransportError, TransportEvent};
use presentment::frontend::{CryptoHandle, DisclosedDocument, ReaderIdentity, RequestedDocument};
use url::Url;

pub fn mdl() -> RequestedDocument {
    RequestedDocument {
        id: "doc-1".into(),
        doc_type: "org.iso.18013.5.1.mDL".into(),
        elements: vec![
            "family_name".into(),
            "given_name".into(),
            "portrait".into(),
        ],
        reader: ReaderIdentity {
            reader_name: Some("Checkpoint A".into()),
            trusted: true,
        },
    }
}

pub fn remote_binding() -> Binding {
    Binding::Remote {
        request_uri: "https://verifier.example/request/abc123"
            .try_into()
            .expect("static uri"),
    }
}

/// Credential engine with scripted responses and a capturable transport listener.
#[derive(Default)]
pub struct MockEngine {
    listener: Mutex<Option<Arc<dyn TransferListener>>>,
    pub listener_registrations: AtomicUsize,
    pub listener_removals: AtomicUsize,
    pub stop_calls: AtomicUsize,
    pub sent: Mutex<Vec<Vec<u8>>>,
    pub snapshots: Mutex<Vec<Vec<DisclosedDocument>>>,
    responses: Mutex<VecDeque<Result<ResponseOutcome, EngineError>>>,
    resolution: Mutex<Option<Result<Vec<RequestedDocument>, TransportError>>>,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_response(&self, response: Result<ResponseOutcome, EngineError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn script_resolution(&self, resolution: Result<Vec<RequestedDocument>, TransportError>) {
        *self.resolution.lock().unwrap() = Some(resolution);
    }

    /// Push a transport event through the registered listener.
    pub fn push_event(&self, event: TransportEvent) {
        self.listener
            .lock()
            .unwrap()
            .as_ref()
            .expect("no transport listener registered")
            .on_event(event);
    }

    pub fn sent_bytes(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl CredentialEngine for MockEngine {
    async fn resolve_config(&self, _binding: &Binding) -> Result<(), EngineError> {
        Ok(())
    }

    fn add_transfer_listener(&self, listener: Arc<dyn TransferListener>) {
        self.listener_registrations.fetch_add(1, Ordering::SeqCst);
        *self.listener.lock().unwrap() = Some(listener);
    }

    fn remove_transfer_listener(&self) {
        self.listener_removals.fetch_add(1, Ordering::SeqCst);
        *self.listener.lock().unwrap() = None;
    }

    async fn start_engagement(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn resolve_request(
        &self,
        _request_uri: &Url,
    ) -> Result<Vec<RequestedDocument>, TransportError> {
        self.resolution
            .lock()
            .unwrap()
            .take()
            .expect("no request resolution scripted")
    }

    async fn create_response(
        &self,
        documents: &[DisclosedDocument],
    ) -> Result<ResponseOutcome, EngineError> {
        self.snapshots.lock().unwrap().push(documents.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("no engine response scripted")
    }

    fn send_response_bytes(&self, bytes: Vec<u8>) {
        self.sent.lock().unwrap().push(bytes);
    }

    fn stop_presentation(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Authorization gate with scripted availability and outcomes.
pub struct MockGate {
    availability: Mutex<Availability>,
    outcomes: Mutex<VecDeque<AuthOutcome>>,
    pub attempts: AtomicUsize,
    pub seen_handles: Mutex<Vec<CryptoHandle>>,
}

impl MockGate {
    pub fn allowing() -> Arc<Self> {
        Arc::new(Self {
            availability: Mutex::new(Availability::CanAuthenticate),
            outcomes: Mutex::new(VecDeque::new()),
            attempts: AtomicUsize::new(0),
            seen_handles: Mutex::new(Vec::new()),
        })
    }

    pub fn set_availability(&self, availability: Availability) {
        *self.availability.lock().unwrap() = availability;
    }

    pub fn script_outcome(&self, outcome: AuthOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }
}

#[async_trait]
impl AuthorizationGate for MockGate {
    fn check_availability(&self) -> Availability {
        self.availability.lock().unwrap().clone()
    }

    async fn authenticate(&self, handle: CryptoHandle, _notify_on_failure: bool) -> AuthOutcome {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.seen_handles.lock().unwrap().push(handle);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(AuthOutcome::Success)
    }
}
