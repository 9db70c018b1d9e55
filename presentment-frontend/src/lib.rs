//! Presentment session data structures that are needed on the frontend, without all of the
//! other dependencies that can cause compilation issues with web and mobile UI targets.
use serde::{Deserialize, Serialize};
use url::Url;

/// Verifier-authentication metadata attached to a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderIdentity {
    /// Human-readable verifier name, if the reader authenticated itself.
    pub reader_name: Option<String>,
    /// Whether the reader's authentication chain was validated.
    pub trusted: bool,
}

/// One document the verifier asked about.
///
/// Immutable once received from the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedDocument {
    /// Identifier of the document in the holder's wallet.
    pub id: String,
    /// Document type, e.g. `org.iso.18013.5.1.mDL`.
    pub doc_type: String,
    /// Requested data element identifiers, in the order the verifier asked for them.
    pub elements: Vec<String>,
    /// Verifier-authentication metadata presented alongside the request.
    pub reader: ReaderIdentity,
}

/// Read-only projection of the holder's selection for one document, built at send time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosedDocument {
    /// Identifier of the document in the holder's wallet.
    pub id: String,
    /// Document type, e.g. `org.iso.18013.5.1.mDL`.
    pub doc_type: String,
    /// Elements the holder opted to disclose, in selection order.
    pub selected_elements: Vec<String>,
    /// The original request this selection answers.
    pub requested: RequestedDocument,
}

/// Opaque handle to the cryptographic material the authorization gate must unlock
/// before the engine will release a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoHandle(Vec<u8>);

impl CryptoHandle {
    pub fn new(handle: impl Into<Vec<u8>>) -> Self {
        Self(handle.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Lifecycle phase of a presentment session.
#[derive(Debug, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum Phase {
    /// Session created, transport not yet started.
    Idle,
    /// Proximity engagement material is being generated or displayed.
    Engaging,
    /// Transport connection is being established.
    Connecting,
    /// Transport connection established, waiting on the verifier's request.
    Connected,
    /// Request received, waiting on the holder to select elements and confirm.
    AwaitingSelection,
    /// Waiting on the holder to pass the authorization gate.
    Authorizing,
    /// A response is being built and handed to the transport.
    Sending,
    /// The session has produced a terminal outcome.
    Complete(SessionOutcome),
}

/// Terminal classification of a send attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionOutcome {
    /// The attempt failed; `reason` is for the caller to render.
    Failure { reason: String },
    /// The engine requires holder authorization that the session could not perform.
    AuthorizationRequired { handle: CryptoHandle },
    /// The remote protocol continues at another location.
    Redirect { uri: Url },
    /// The response reached the verifier.
    Success,
}

impl PartialEq for SessionOutcome {
    fn eq(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }
}

impl SessionOutcome {
    fn ordering(&self) -> u8 {
        match self {
            SessionOutcome::Failure { .. } => 0,
            SessionOutcome::AuthorizationRequired { .. } => 1,
            SessionOutcome::Redirect { .. } => 2,
            SessionOutcome::Success => 3,
        }
    }
}

impl PartialOrd for SessionOutcome {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.ordering().partial_cmp(&other.ordering())
    }
}

/// Session-level event delivered to UI observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// Proximity engagement has started.
    Engaging,
    /// Engagement payload (e.g. QR contents) is ready to display.
    EngagementReady { payload: String },
    /// Transport connection is being established.
    Connecting,
    /// Transport connection established.
    Connected,
    /// The verifier's request arrived. The caller renders these documents and
    /// registers each one it shows into the selection store.
    RequestReceived { documents: Vec<RequestedDocument> },
    /// The engine requires holder authorization before the response is released.
    AuthorizationRequired { handle: CryptoHandle },
    /// The session produced a terminal outcome for the current attempt.
    Completed(SessionOutcome),
}
