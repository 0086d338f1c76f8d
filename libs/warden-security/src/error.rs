//! Error types for the security core.

use thiserror::Error;

use crate::session::SessionId;

/// No authority could be found by any lookup path.
///
/// Raised by the resolution chain when neither the calling thread nor the
/// process-wide fallback provides an [`Authority`](crate::Authority). This is
/// an invalid application configuration and is never retried internally.
#[derive(Debug, Clone, Error)]
#[error(
    "no authority accessible to the calling code, either bound to the thread context \
     or installed as the process-wide fallback; this is an invalid application configuration"
)]
pub struct UnavailableAuthority;

/// Authentication failures surfaced to the caller of `login`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthenticationError {
    /// The submitted principal is not known to the authenticator.
    #[error("unknown account: {0}")]
    UnknownAccount(String),

    /// The submitted secret does not match.
    #[error("incorrect credentials for account: {0}")]
    IncorrectCredentials(String),

    /// The account exists but is locked.
    #[error("account is locked: {0}")]
    LockedAccount(String),

    /// The account exists but is disabled.
    #[error("account is disabled: {0}")]
    DisabledAccount(String),

    /// The account's credentials have expired.
    #[error("credentials have expired for account: {0}")]
    ExpiredCredentials(String),

    /// The authenticator failed for a reason unrelated to the credential.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Authorization failures raised by permission and role checks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthorizationError {
    /// The identity has no principals, so no check can succeed.
    #[error("identity is not authenticated")]
    Unauthenticated,

    /// The identity lacks the named permission or role.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

/// Session lookup and lifecycle failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// No session exists for the id.
    #[error("unknown session: {0}")]
    Unknown(SessionId),

    /// The session exists but its idle timeout has elapsed.
    #[error("session expired: {0}")]
    Expired(SessionId),

    /// The identity does not allow session creation.
    #[error("session creation is disabled for this identity")]
    CreationDisabled,

    /// The session manager failed for an unrelated reason.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Umbrella error for callers that do not care which concern failed.
#[derive(Debug, Clone, Error)]
pub enum SecurityError {
    #[error(transparent)]
    UnavailableAuthority(#[from] UnavailableAuthority),

    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error(transparent)]
    Session(#[from] SessionError),
}
