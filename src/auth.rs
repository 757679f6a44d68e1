//! Authentication collaborator contract.
//!
//! The provider itself (sign-in, token refresh) is external. The core only
//! needs "who is the current practitioner" and "sign out". Components never
//! query the provider themselves — they receive the resolved [`Identity`]
//! explicitly, so ownership filtering is always based on one identity per
//! flow.

use thiserror::Error;
use uuid::Uuid;

/// The authenticated practitioner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}

/// Contract of the external authentication subsystem.
pub trait AuthProvider {
    /// The currently signed-in practitioner, if any.
    fn current_user(&self) -> Option<Identity>;

    /// Ends the current session.
    fn sign_out(&mut self);
}

#[derive(Error, Debug)]
pub enum AuthError {
    /// No current user — the caller's cue to redirect to the login entry point.
    #[error("No practitioner is signed in")]
    SignedOut,
}

/// Resolves the current practitioner or fails with [`AuthError::SignedOut`].
pub fn require_user(provider: &impl AuthProvider) -> Result<Identity, AuthError> {
    provider.current_user().ok_or(AuthError::SignedOut)
}
