//! Collaborators backing a static realm.

pub mod authenticator;
pub mod authorizer;
pub mod remember_me;
pub mod sessions;
pub mod wildcard;

pub use authenticator::StaticAuthenticator;
pub use authorizer::StaticAuthorizer;
pub use remember_me::MemoryRememberMe;
pub use sessions::MemorySessionManager;
pub use wildcard::{WildcardParseError, WildcardPermission};
