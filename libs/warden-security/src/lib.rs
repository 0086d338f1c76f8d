#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Ambient identity and authority for Rust services.
//!
//! - [`thread_context`] - thread-confined bindings for the current [`Authority`] and [`Identity`]
//! - [`resolver`] - resolution chain (thread binding, then process-wide fallback)
//! - [`Authority`] - authentication, authorization, sessions and identity lifecycle
//! - [`Identity`] - the delegate through which callers query and act
//! - [`propagation`] - carrying an identity onto other threads and tasks
//!
//! ## Usage
//!
//! ```ignore
//! use warden_security::prelude::*;
//!
//! // Bootstrap once
//! set_fallback_authority(authority);
//!
//! // Anywhere on a thread
//! let identity = resolve_identity()?;
//! identity.login(&Credential::new("alice", secret))?;
//! identity.check_permission(&"docs:read".into())?;
//!
//! // Hand work to a pool without losing who is acting
//! pool.execute(identity.associate_with(move || do_work()));
//! ```

pub mod authority;
pub mod credential;
pub mod default_authority;
pub mod error;
pub mod identity;
pub mod prelude;
pub mod principal;
pub mod propagation;
pub mod resolver;
pub mod session;
pub mod thread_context;
pub mod transport;

#[cfg(test)]
mod testing;

pub use authority::{
    Authenticator, Authority, Authorizer, Permission, RememberMeManager, SessionManager,
};
pub use credential::{AuthenticationInfo, Credential};
pub use default_authority::DefaultAuthority;
pub use error::{
    AuthenticationError, AuthorizationError, SecurityError, SessionError, UnavailableAuthority,
};
pub use identity::{Identity, IdentityBuildContext, IdentityState};
pub use principal::{Principal, PrincipalCollection};
pub use propagation::{IdentityThreadState, Propagated, ScopedBinding};
pub use resolver::{
    AuthorityResolver, FallbackGuard, clear_fallback_authority, resolve_authority,
    resolve_identity, set_fallback_authority,
};
pub use session::{Session, SessionContext, SessionId};
#[cfg(feature = "http")]
pub use transport::HttpExchange;
pub use transport::TransportExchange;
