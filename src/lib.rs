//! This library provides the holder-side session controller for a
//! credential-presentation exchange: the component that drives one
//! presentation between a holder device and a verifier across two
//! interchangeable transport bindings, while the holder interactively selects
//! which attested data elements to disclose.
//!
//! Response construction (selective-disclosure proofs, COSE/JWT signing) and
//! the wire bytes of either transport are delegated to a credential engine
//! behind the [`CredentialEngine`] trait; holder identity confirmation is
//! delegated to an [`AuthorizationGate`]. This crate owns the session
//! lifecycle that sits above them.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use presentment::config::Binding;
//! use presentment::frontend::{SessionEvent, SessionOutcome};
//! use presentment::session::PresentmentSession;
//! use tokio_util::sync::CancellationToken;
//!
//! // Setup: the engine wraps your wallet-core SDK, the gate your biometric
//! // or PIN prompt. The caller owns the cancellation token and cancels it
//! // when the presenting screen goes away.
//! let cancellation = CancellationToken::new();
//! let session = PresentmentSession::new(
//!     Binding::Proximity,
//!     Arc::new(engine),
//!     Arc::new(gate),
//!     cancellation.child_token(),
//! );
//!
//! session.start().await?;
//! let mut events = session.observe()?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         SessionEvent::EngagementReady { payload } => show_qr(payload),
//!         SessionEvent::RequestReceived { documents } => {
//!             for document in documents {
//!                 // Render, then register each shown document.
//!                 session.on_document_rendered(document);
//!             }
//!         }
//!         SessionEvent::Completed(outcome) => {
//!             render_outcome(outcome);
//!             break;
//!         }
//!         _ => {}
//!     }
//! }
//!
//! // Holder toggles elements from the UI, then confirms:
//! session.on_element_toggled("doc-1", "family_name");
//! session.confirm_and_send().await?;
//! ```
//!
//! # Protocol overview
//!
//! 1. *Start*: [`PresentmentSession::start`] resolves engine configuration,
//!    registers the transport listener and kicks off the binding-specific
//!    connection flow — radio engagement for [`Binding::Proximity`], request
//!    resolution for [`Binding::Remote`].
//! 2. *Request*: the verifier's request arrives as
//!    [`SessionEvent::RequestReceived`]. The caller renders the requested
//!    documents and registers each one into the selection store; the holder
//!    toggles the elements they are willing to disclose.
//! 3. *Send*: [`PresentmentSession::confirm_and_send`] snapshots the
//!    selection, asks the engine for a response, passes the authorization
//!    gate if the engine requires it, and hands the bytes to the transport.
//! 4. *Outcome*: the local send result and the transport's terminal event are
//!    joined into exactly one [`SessionOutcome`] per attempt, reported as
//!    [`SessionEvent::Completed`].
//!
//! The session event machinery lives in [`session`], the callback-to-stream
//! bridge in [`event`], the disclosure selection store in [`selection`], and
//! the collaborator contracts in [`engine`] and [`authorization`]. Data types
//! shared with UI processes live in the `presentment-frontend` crate,
//! re-exported here as [`frontend`].
//!
//! [`CredentialEngine`]: crate::engine::CredentialEngine
//! [`AuthorizationGate`]: crate::authorization::AuthorizationGate
//! [`Binding::Proximity`]: crate::config::Binding::Proximity
//! [`Binding::Remote`]: crate::config::Binding::Remote
//! [`SessionEvent::RequestReceived`]: presentment_frontend::SessionEvent::RequestReceived
//! [`SessionEvent::Completed`]: presentment_frontend::SessionEvent::Completed
//! [`SessionOutcome`]: presentment_frontend::SessionOutcome

pub mod authorization;
pub mod config;
pub mod engine;
pub mod event;
pub mod selection;
pub mod session;

pub use presentment_frontend as frontend;
pub use session::{PresentmentSession, SessionError};
