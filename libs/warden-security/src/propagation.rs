//! Carrying an identity across thread and task boundaries.
//!
//! Work handed to another thread (a worker pool, a queue, a deferred callback)
//! does not see the submitting thread's bindings. Wrapping it with
//! [`Identity::associate_with`] captures the identity and its authority; when
//! the wrapper runs, it snapshots the executing thread's bindings, binds the
//! captured pair, runs the work and restores the snapshot. The restore happens
//! from a drop guard, so it also runs when the work panics.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::authority::Authority;
use crate::identity::Identity;
use crate::thread_context::{self, Bindings};

/// Bind/restore protocol for one identity on the current thread.
///
/// Frameworks use it around a unit of work (e.g. one request): [`bind`](Self::bind)
/// at the start, [`restore`](Self::restore) at the end. [`clear`](Self::clear)
/// wipes the thread completely, for threads returning to a pool.
pub struct IdentityThreadState {
    identity: Identity,
    authority: Arc<dyn Authority>,
    original: Option<Bindings>,
}

impl IdentityThreadState {
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        let authority = identity.authority();
        Self {
            identity,
            authority,
            original: None,
        }
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Remember the current bindings and bind this identity and its authority.
    pub fn bind(&mut self) {
        self.original = Some(thread_context::snapshot());
        thread_context::bind_authority(Arc::clone(&self.authority));
        thread_context::bind_identity(self.identity.clone());
    }

    /// Reinstate the bindings present before [`bind`](Self::bind).
    ///
    /// Without a prior `bind` this clears the thread.
    pub fn restore(&mut self) {
        thread_context::restore(self.original.take().unwrap_or_default());
    }

    /// Remove all bindings from the current thread.
    pub fn clear(&mut self) {
        self.original = None;
        thread_context::clear();
    }

    /// Bind now and restore when the returned guard drops.
    #[must_use = "bindings are restored as soon as the guard is dropped"]
    pub fn scoped(identity: &Identity) -> ScopedBinding {
        let mut state = Self::new(identity.clone());
        state.bind();
        ScopedBinding { state }
    }
}

impl fmt::Debug for IdentityThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityThreadState")
            .field("identity", &self.identity)
            .field("bound", &self.original.is_some())
            .finish_non_exhaustive()
    }
}

/// Restores the thread's previous bindings on drop, unwinding included.
#[derive(Debug)]
pub struct ScopedBinding {
    state: IdentityThreadState,
}

impl Drop for ScopedBinding {
    fn drop(&mut self) {
        self.state.restore();
    }
}

impl Identity {
    /// Wrap `work` so that, wherever it eventually runs, this identity and its
    /// authority are bound for the duration of the call.
    ///
    /// The returned closure has the same contract as `work`: it yields the
    /// same value, an `Err` passes through untouched and a panic unwinds
    /// unchanged. The executing thread's previous bindings are restored in
    /// every case.
    pub fn associate_with<F, R>(&self, work: F) -> impl FnOnce() -> R + Send + 'static
    where
        F: FnOnce() -> R + Send + 'static,
        R: 'static,
    {
        let identity = self.clone();
        move || {
            let _scope = IdentityThreadState::scoped(&identity);
            work()
        }
    }

    /// Run `work` immediately on the current thread with this identity bound.
    pub fn execute<F, R>(&self, work: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _scope = IdentityThreadState::scoped(self);
        work()
    }

    /// Wrap `future` so this identity is bound around every poll.
    ///
    /// A task on a multi-threaded runtime may be polled on a different worker
    /// each time; binding per poll keeps the identity attached to the task
    /// rather than to whichever thread happens to run it.
    pub fn associate_with_future<F>(&self, future: F) -> Propagated<F>
    where
        F: Future,
    {
        Propagated {
            inner: future,
            identity: self.clone(),
        }
    }
}

pin_project_lite::pin_project! {
    /// Future returned by [`Identity::associate_with_future`].
    #[must_use = "futures do nothing unless polled"]
    pub struct Propagated<F> {
        #[pin]
        inner: F,
        identity: Identity,
    }
}

impl<F> Propagated<F> {
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl<F: Future> Future for Propagated<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _scope = IdentityThreadState::scoped(this.identity);
        this.inner.poll(cx)
    }
}
