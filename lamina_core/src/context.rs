// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! GPU context handles and the context owner.
//!
//! A [`GpuContext`] is a cheap, cloneable handle to a backend plus a shared
//! liveness flag. Texture handles and the images derived from them each hold
//! one, so a texture freed after its context has been torn down can tell
//! that it must not touch the GPU.
//!
//! [`RenderState`] owns the context. Updaters register with it as
//! [`ContextObserver`]s; [`destroy_context`](RenderState::destroy_context)
//! flips the liveness flag and notifies every live observer exactly once.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::backend::GpuBackend;

/// Shared handle to a GPU backend and its liveness.
pub struct GpuContext<B: GpuBackend> {
    backend: Arc<B>,
    alive: Arc<AtomicBool>,
}

impl<B: GpuBackend> GpuContext<B> {
    /// Wraps a backend in a live context.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Returns the backend.
    #[inline]
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns `true` until the context owner tears the context down.
    #[inline]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Marks the context as lost. Returns `true` if it was alive before.
    fn mark_lost(&self) -> bool {
        self.alive.swap(false, Ordering::SeqCst)
    }
}

impl<B: GpuBackend> Clone for GpuContext<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            alive: Arc::clone(&self.alive),
        }
    }
}

impl<B: GpuBackend> fmt::Debug for GpuContext<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuContext")
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}

/// Receives the GPU-context destruction notification.
pub trait ContextObserver {
    /// Called once when the context is torn down out of band.
    ///
    /// The context is already marked lost when this runs; implementations
    /// must release their GPU resources without issuing GPU calls.
    fn on_context_destroyed(&mut self);
}

/// Shared, lockable observer as stored by [`RenderState`].
pub type SharedObserver = Mutex<dyn ContextObserver + Send>;

/// Owner of a GPU context.
///
/// Holds the context handle and the set of registered observers. Observers
/// are held weakly: dropping an updater unregisters it.
pub struct RenderState<B: GpuBackend> {
    context: GpuContext<B>,
    observers: Mutex<Vec<Weak<SharedObserver>>>,
}

impl<B: GpuBackend> RenderState<B> {
    /// Creates a render state around a backend.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            context: GpuContext::new(backend),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Returns a handle to the owned context.
    #[must_use]
    pub fn context(&self) -> GpuContext<B> {
        self.context.clone()
    }

    /// Registers an observer for the destruction notification.
    ///
    /// Dead observers are pruned on each registration.
    pub fn register_observer(&self, observer: Weak<SharedObserver>) {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        observers.retain(|o| o.strong_count() > 0);
        observers.push(observer);
    }

    /// Returns the number of registered observers that are still alive.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|o| o.strong_count() > 0)
            .count()
    }

    /// Tears the context down and notifies every live observer.
    ///
    /// Returns the number of observers notified. Calling this again is a
    /// no-op that returns 0.
    ///
    /// The caller must not hold the lock of any registered observer.
    pub fn destroy_context(&self) -> usize {
        if !self.context.mark_lost() {
            return 0;
        }
        let live: Vec<Arc<SharedObserver>> = {
            let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
            observers.drain(..).filter_map(|o| o.upgrade()).collect()
        };
        tracing::debug!(observers = live.len(), "GPU context destroyed");
        for observer in &live {
            observer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .on_context_destroyed();
        }
        live.len()
    }
}

impl<B: GpuBackend> fmt::Debug for RenderState<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderState")
            .field("context", &self.context)
            .field("observers", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockBackend;

    #[derive(Default)]
    struct CountingObserver {
        notified: usize,
    }

    impl ContextObserver for CountingObserver {
        fn on_context_destroyed(&mut self) {
            self.notified += 1;
        }
    }

    #[test]
    fn context_starts_alive() {
        let state = RenderState::new(MockBackend::default());
        assert!(state.context().is_alive());
    }

    #[test]
    fn destroy_notifies_once() {
        let state = RenderState::new(MockBackend::default());
        let observer = Arc::new(Mutex::new(CountingObserver::default()));
        let shared: Arc<SharedObserver> = observer.clone();
        state.register_observer(Arc::downgrade(&shared));

        assert_eq!(state.destroy_context(), 1);
        assert_eq!(state.destroy_context(), 0, "second teardown is a no-op");
        assert_eq!(observer.lock().unwrap().notified, 1);
        assert!(!state.context().is_alive());
    }

    #[test]
    fn dropped_observers_are_skipped() {
        let state = RenderState::new(MockBackend::default());
        let kept = Arc::new(Mutex::new(CountingObserver::default()));
        let kept_shared: Arc<SharedObserver> = kept.clone();
        state.register_observer(Arc::downgrade(&kept_shared));
        {
            let dropped: Arc<SharedObserver> =
                Arc::new(Mutex::new(CountingObserver::default()));
            state.register_observer(Arc::downgrade(&dropped));
            assert_eq!(state.observer_count(), 2);
        }
        assert_eq!(state.observer_count(), 1);
        assert_eq!(state.destroy_context(), 1);
        assert_eq!(kept.lock().unwrap().notified, 1);
    }

    #[test]
    fn cloned_contexts_share_liveness() {
        let state = RenderState::new(MockBackend::default());
        let a = state.context();
        let b = a.clone();
        state.destroy_context();
        assert!(!a.is_alive());
        assert!(!b.is_alive());
    }
}
