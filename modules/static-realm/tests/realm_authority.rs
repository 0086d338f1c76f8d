#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end behavior of an authority assembled from a static realm.

use std::sync::Arc;

use static_realm::{StaticRealm, StaticRealmConfig, build_authority};
use warden_security::{
    AuthenticationError, Authority, Credential, IdentityBuildContext, IdentityState,
    SessionManager, resolve_identity, thread_context,
};
use warden_security::session::AUTHENTICATED_SESSION_KEY;

const REALM: &str = r#"
name: corp
accounts:
  - username: alice
    password: wonderland
    roles: [reader]
  - username: bob
    password: builder
    roles: [reader, editor]
  - username: eve
    password: pw
    locked: true
roles:
  reader: ["docs:read"]
  editor: ["docs:write,delete"]
session:
  timeout_secs: 1800
remember_me:
  enabled: true
"#;

fn authority() -> Arc<dyn Authority> {
    build_authority(&StaticRealmConfig::from_yaml(REALM).unwrap())
}

#[test]
fn login_grants_role_permissions() {
    let identity = authority().create_identity(IdentityBuildContext::default());

    identity.login(&Credential::new("bob", "builder".to_owned())).unwrap();

    assert_eq!(identity.state(), IdentityState::Authenticated);
    assert!(identity.is_permitted(&"docs:delete".into()));
    assert!(identity.check_permission(&"docs:read".into()).is_ok());
    assert!(identity.check_permission(&"admin:shutdown".into()).is_err());
    assert!(identity.has_all_roles(&["reader", "editor"]));
}

#[test]
fn locked_account_is_refused() {
    let identity = authority().create_identity(IdentityBuildContext::default());
    let err = identity.login(&Credential::new("eve", "pw".to_owned())).unwrap_err();

    assert!(matches!(err, AuthenticationError::LockedAccount(_)));
    assert_eq!(identity.state(), IdentityState::Anonymous);
}

#[test]
fn session_restores_identity_state() {
    let authority = authority();
    let identity = authority.clone().create_identity(IdentityBuildContext::default());
    identity.login(&Credential::new("alice", "wonderland".to_owned())).unwrap();
    let session_id = identity.session_id().unwrap();

    let next_request = authority.create_identity(IdentityBuildContext::default().with_session_id(session_id));

    assert!(next_request.is_authenticated());
    assert_eq!(next_request.primary_principal().unwrap().value(), "alice");
    assert_eq!(next_request.session_id(), Some(session_id));
}

#[test]
fn logout_stops_session_and_unbinds() {
    thread_context::clear();
    let authority = authority();
    thread_context::bind_authority(Arc::clone(&authority));

    let identity = resolve_identity().unwrap();
    identity.login(&Credential::new("alice", "wonderland".to_owned())).unwrap();
    let session_id = identity.session_id().unwrap();

    authority.logout(&identity);

    assert_eq!(authority.get_session(session_id), Ok(None));
    assert!(thread_context::identity().is_none());
    assert!(thread_context::authority().is_some());
    thread_context::clear();
}

#[test]
fn remembered_login_yields_remembered_identity_for_same_host() {
    let authority = authority();
    let identity = authority.clone().create_identity(IdentityBuildContext::default());
    identity
        .login(
            &Credential::new("alice", "wonderland".to_owned())
                .with_host("192.0.2.10")
                .with_remember_me(true),
        )
        .unwrap();

    let returning = authority
        .clone()
        .create_identity(IdentityBuildContext::default().with_host("192.0.2.10"));
    assert_eq!(returning.state(), IdentityState::Remembered);
    assert!(!returning.is_authenticated());
    assert!(returning.has_role("reader"));

    let stranger = authority.create_identity(IdentityBuildContext::default().with_host("192.0.2.99"));
    assert_eq!(stranger.state(), IdentityState::Anonymous);
}

#[test]
fn remembered_identity_becomes_authenticated_on_login() {
    let authority = authority();
    let first = authority.clone().create_identity(IdentityBuildContext::default());
    first
        .login(
            &Credential::new("alice", "wonderland".to_owned())
                .with_host("192.0.2.40")
                .with_remember_me(true),
        )
        .unwrap();

    let returning = authority
        .clone()
        .create_identity(IdentityBuildContext::default().with_host("192.0.2.40"));
    assert_eq!(returning.state(), IdentityState::Remembered);
    let remembered_session = returning.session_id().unwrap();

    returning
        .login(&Credential::new("bob", "builder".to_owned()))
        .unwrap();

    assert_eq!(returning.state(), IdentityState::Authenticated);
    assert_eq!(returning.primary_principal().unwrap().value(), "bob");
    assert_eq!(returning.principals().len(), 1);
    assert_eq!(returning.session_id(), Some(remembered_session));
    assert!(returning.has_role("editor"));

    let session = authority.get_session(remembered_session).unwrap().unwrap();
    assert_eq!(
        session.attribute(AUTHENTICATED_SESSION_KEY),
        Some(&serde_json::Value::Bool(true))
    );
}

#[test]
fn logout_forgets_remembered_principals() {
    let authority = authority();
    let identity = authority.clone().create_identity(IdentityBuildContext::default());
    identity
        .login(
            &Credential::new("bob", "builder".to_owned())
                .with_host("192.0.2.20")
                .with_remember_me(true),
        )
        .unwrap();

    identity.logout();

    let returning = authority.create_identity(IdentityBuildContext::default().with_host("192.0.2.20"));
    assert_eq!(returning.state(), IdentityState::Anonymous);
}

#[test]
fn realm_without_remember_me_builds_anonymous_identities() {
    let mut cfg = StaticRealmConfig::from_yaml(REALM).unwrap();
    cfg.remember_me.enabled = false;
    let realm = StaticRealm::from_config(&cfg);
    assert!(realm.remember_me.is_none());

    let authority: Arc<dyn Authority> = Arc::new(realm.into_authority());
    let identity = authority.clone().create_identity(IdentityBuildContext::default());
    identity
        .login(
            &Credential::new("alice", "wonderland".to_owned())
                .with_host("192.0.2.30")
                .with_remember_me(true),
        )
        .unwrap();

    let returning = authority.create_identity(IdentityBuildContext::default().with_host("192.0.2.30"));
    assert_eq!(returning.state(), IdentityState::Anonymous);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn propagated_identity_is_checked_against_realm() {
    let identity = authority().create_identity(IdentityBuildContext::default());
    identity.login(&Credential::new("alice", "wonderland".to_owned())).unwrap();

    let (read, write) = tokio::spawn(identity.associate_with_future(async {
        let ambient = resolve_identity().unwrap();
        (
            ambient.is_permitted(&"docs:read".into()),
            ambient.is_permitted(&"docs:write".into()),
        )
    }))
    .await
    .unwrap();

    assert!(read);
    assert!(!write);
}
