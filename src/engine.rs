//! Contract for the credential engine: the external component that resolves
//! inbound requests and builds cryptographically valid disclosure responses.
//!
//! The session treats the engine as a black box. Response construction
//! (selective-disclosure proofs, COSE/JWT signing) and the wire bytes of either
//! transport live entirely behind this trait.

use std::sync::Arc;

use async_trait::async_trait;
use presentment_frontend::{CryptoHandle, DisclosedDocument, RequestedDocument};
use url::Url;

use crate::config::Binding;
use crate::event::{TransferListener, TransportError};

/// Failure raised by the credential engine itself.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The request was malformed or asks for an unsupported format or document.
    #[error("engine rejected the request: {0}")]
    Rejected(String),
    /// Anything else that went wrong inside the engine.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Result of asking the engine to build a disclosure response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// A complete response, ready to hand to the transport.
    Ready(Vec<u8>),
    /// The engine needs the holder to unlock the signing key first. Retry the
    /// same send after the authorization gate reports success.
    AuthorizationRequired(CryptoHandle),
    /// The engine could not build a response for this selection.
    Failed { reason: String },
}

/// The credential engine adapter.
///
/// Implementations wrap a wallet-core SDK. Contract, in call order:
///
/// 1. [`resolve_config`](CredentialEngine::resolve_config) completes before any
///    listener registration for the session.
/// 2. [`add_transfer_listener`](CredentialEngine::add_transfer_listener) is
///    called exactly once per session, before the engagement or connect call.
/// 3. [`send_response_bytes`](CredentialEngine::send_response_bytes) is fire and
///    forget; its outcome is observed through the listener events.
#[async_trait]
pub trait CredentialEngine: Send + Sync + 'static {
    /// Resolve engine configuration for the given transport binding.
    async fn resolve_config(&self, binding: &Binding) -> Result<(), EngineError>;

    /// Register the session's transport listener.
    fn add_transfer_listener(&self, listener: Arc<dyn TransferListener>);

    /// Remove the previously registered transport listener.
    fn remove_transfer_listener(&self);

    /// Kick off proximity engagement. Progress and the engagement payload are
    /// reported through the listener.
    async fn start_engagement(&self) -> Result<(), TransportError>;

    /// Resolve a remote presentation request into the documents it asks about.
    async fn resolve_request(
        &self,
        request_uri: &Url,
    ) -> Result<Vec<RequestedDocument>, TransportError>;

    /// Build a disclosure response for the given selection.
    async fn create_response(
        &self,
        documents: &[DisclosedDocument],
    ) -> Result<ResponseOutcome, EngineError>;

    /// Hand response bytes to the transport.
    fn send_response_bytes(&self, bytes: Vec<u8>);

    /// Terminate the physical connection.
    fn stop_presentation(&self);
}
