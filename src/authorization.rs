//! Contract for the authorization gate: the external component that confirms
//! the holder's identity (biometric or PIN) before a response is released.
//!
//! Only the pass/fail/cancel outcome is consumed here; sensor access belongs to
//! the implementation.

use async_trait::async_trait;
use presentment_frontend::CryptoHandle;

/// Whether the gate can currently authenticate the holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    CanAuthenticate,
    /// No biometric or PIN is enrolled on this device.
    NotEnrolled,
    /// The gate cannot run, e.g. hardware unavailable or locked out.
    Unavailable { reason: String },
}

/// Result of one authorization attempt. Exactly one is reported per
/// [`AuthorizationGate::authenticate`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Success,
    Failure,
    Cancelled,
}

impl Availability {
    /// The error this availability implies, if the gate cannot run.
    pub fn check(&self) -> Result<(), AuthorizationError> {
        match self {
            Availability::CanAuthenticate => Ok(()),
            Availability::NotEnrolled => Err(AuthorizationError::NotEnrolled),
            Availability::Unavailable { reason } => {
                Err(AuthorizationError::Unavailable(reason.clone()))
            }
        }
    }
}

impl AuthOutcome {
    /// The error this outcome implies, if the holder did not pass the gate.
    pub fn check(&self) -> Result<(), AuthorizationError> {
        match self {
            AuthOutcome::Success => Ok(()),
            AuthOutcome::Failure => Err(AuthorizationError::Rejected),
            AuthOutcome::Cancelled => Err(AuthorizationError::Cancelled),
        }
    }
}

/// Failure classification for the authorization step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    #[error("holder authorization is not enrolled on this device")]
    NotEnrolled,
    #[error("holder authorization is unavailable: {0}")]
    Unavailable(String),
    #[error("holder authorization was rejected")]
    Rejected,
    #[error("holder cancelled authorization")]
    Cancelled,
}

/// The authorization gate adapter.
#[async_trait]
pub trait AuthorizationGate: Send + Sync + 'static {
    /// Report whether authentication can be attempted at all.
    fn check_availability(&self) -> Availability;

    /// Ask the holder to confirm their identity for the given cryptographic
    /// handle. `notify_on_failure` requests that the gate surface failed
    /// attempts to the holder itself.
    async fn authenticate(&self, handle: CryptoHandle, notify_on_failure: bool) -> AuthOutcome;
}
