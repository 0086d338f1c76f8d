//! Thread-confined binding registry for the current authority and identity.
//!
//! Every operation affects the calling thread only and none can fail. Code
//! running on pooled threads must call [`clear`] (or go through
//! [`IdentityThreadState`](crate::IdentityThreadState) / the propagation
//! adapters) before the thread is handed back, otherwise the binding leaks
//! into unrelated work.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use crate::authority::Authority;
use crate::identity::Identity;

/// The fixed key set of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKey {
    Authority,
    Identity,
}

/// A value stored under one [`BindingKey`].
#[derive(Clone)]
pub enum Bound {
    Authority(Arc<dyn Authority>),
    Identity(Identity),
}

impl Bound {
    #[must_use]
    pub fn key(&self) -> BindingKey {
        match self {
            Self::Authority(_) => BindingKey::Authority,
            Self::Identity(_) => BindingKey::Identity,
        }
    }
}

impl fmt::Debug for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authority(_) => f.write_str("Bound::Authority"),
            Self::Identity(identity) => f.debug_tuple("Bound::Identity").field(identity).finish(),
        }
    }
}

/// Contents of both registry slots, as captured by [`snapshot`].
#[derive(Clone, Default)]
pub struct Bindings {
    pub authority: Option<Arc<dyn Authority>>,
    pub identity: Option<Identity>,
}

impl Bindings {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.authority.is_none() && self.identity.is_none()
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bindings")
            .field("authority", &self.authority.is_some())
            .field("identity", &self.identity)
            .finish()
    }
}

thread_local! {
    static BINDINGS: RefCell<Bindings> = const {
        RefCell::new(Bindings {
            authority: None,
            identity: None,
        })
    };
}

/// Bind `value` under its key, replacing any previous value.
pub fn bind(value: Bound) {
    let replaced = BINDINGS.with(|cell| {
        let mut slots = cell.borrow_mut();
        match value {
            Bound::Authority(authority) => slots.authority.replace(authority).map(Bound::Authority),
            Bound::Identity(identity) => slots.identity.replace(identity).map(Bound::Identity),
        }
    });
    // Dropped outside the borrow, see `clear`.
    drop(replaced);
}

/// Current value for `key` on this thread.
#[must_use]
pub fn get(key: BindingKey) -> Option<Bound> {
    BINDINGS.with(|cell| {
        let slots = cell.borrow();
        match key {
            BindingKey::Authority => slots.authority.clone().map(Bound::Authority),
            BindingKey::Identity => slots.identity.clone().map(Bound::Identity),
        }
    })
}

/// Remove the value for `key` only, returning it.
pub fn unbind(key: BindingKey) -> Option<Bound> {
    BINDINGS.with(|cell| {
        let mut slots = cell.borrow_mut();
        match key {
            BindingKey::Authority => slots.authority.take().map(Bound::Authority),
            BindingKey::Identity => slots.identity.take().map(Bound::Identity),
        }
    })
}

/// Remove every binding on this thread.
pub fn clear() {
    // Take the values out before dropping them: a `Drop` impl reaching back
    // into the registry must not observe the `RefCell` borrowed.
    let old = BINDINGS.with(|cell| std::mem::take(&mut *cell.borrow_mut()));
    drop(old);
}

pub fn bind_authority(authority: Arc<dyn Authority>) {
    bind(Bound::Authority(authority));
}

pub fn bind_identity(identity: Identity) {
    bind(Bound::Identity(identity));
}

#[must_use]
pub fn authority() -> Option<Arc<dyn Authority>> {
    BINDINGS.with(|cell| cell.borrow().authority.clone())
}

#[must_use]
pub fn identity() -> Option<Identity> {
    BINDINGS.with(|cell| cell.borrow().identity.clone())
}

pub fn unbind_authority() -> Option<Arc<dyn Authority>> {
    BINDINGS.with(|cell| cell.borrow_mut().authority.take())
}

pub fn unbind_identity() -> Option<Identity> {
    BINDINGS.with(|cell| cell.borrow_mut().identity.take())
}

/// Copy of both slots.
#[must_use]
pub fn snapshot() -> Bindings {
    BINDINGS.with(|cell| cell.borrow().clone())
}

/// Replace both slots with `bindings`, including restoring "nothing bound".
pub fn restore(bindings: Bindings) {
    let old = BINDINGS.with(|cell| std::mem::replace(&mut *cell.borrow_mut(), bindings));
    drop(old);
}

#[must_use]
pub fn is_empty() -> bool {
    BINDINGS.with(|cell| cell.borrow().is_empty())
}
