//! Common imports for code that consumes the ambient identity.

pub use crate::authority::{Authority, Permission};
pub use crate::credential::Credential;
pub use crate::error::{AuthenticationError, AuthorizationError, SecurityError};
pub use crate::identity::{Identity, IdentityState};
pub use crate::resolver::{resolve_authority, resolve_identity, set_fallback_authority};
