// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-slot "new frame available" mailbox.
//!
//! The producer side posts with [`FrameNotifier::notify`] from any thread.
//! The render pass owns the [`FrameSignal`] and consumes the post with
//! [`FrameSignal::take`]. Posts that arrive before the next `take` collapse
//! into one; a post that arrives after a `take` began is seen by the next
//! one.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receiving end of the mailbox, owned by the render pass.
pub struct FrameSignal {
    pending: Arc<AtomicBool>,
}

impl FrameSignal {
    /// Creates an empty mailbox.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a producer-side handle posting into this mailbox.
    #[must_use]
    pub fn notifier(&self) -> FrameNotifier {
        FrameNotifier {
            pending: Arc::clone(&self.pending),
        }
    }

    /// Posts from the receiving side.
    #[inline]
    pub fn raise(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }

    /// Consumes the post. Returns `true` if one was pending.
    #[inline]
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }

    /// Whether a post is pending, without consuming it.
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }
}

impl Default for FrameSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FrameSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSignal")
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Producer-side handle to a [`FrameSignal`].
///
/// Cheap to clone and `Send + Sync`. Outliving the signal is harmless:
/// posts are simply never consumed.
#[derive(Clone)]
pub struct FrameNotifier {
    pending: Arc<AtomicBool>,
}

impl FrameNotifier {
    /// Posts "a new frame is available".
    #[inline]
    pub fn notify(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }
}

impl fmt::Debug for FrameNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameNotifier").finish_non_exhaustive()
    }
}
