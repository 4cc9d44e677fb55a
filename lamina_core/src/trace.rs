// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lifecycle events for diagnostics.
//!
//! This module provides a [`TraceSink`] trait with one method per updater
//! lifecycle event. All method bodies default to no-ops, so implementing only
//! the events you care about is fine.
//!
//! [`Tracer`] owns an optional boxed sink. When the `trace` feature is
//! **off**, every `Tracer` method compiles to nothing and the sink passed to
//! [`Tracer::new`] is dropped. When **on**, each method performs a single
//! `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).

use core::fmt;

use crate::backend::RenderPipeline;
use crate::buffer::{BufferId, SlotId};
use crate::fence::FenceClass;
use crate::texture::{Release, Teardown};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How a latched frame's slot was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotOutcome {
    /// The slot's cached texture was reused.
    Cached,
    /// A new texture was imported.
    Created,
    /// Import failed and the frame was skipped.
    Unavailable,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when `apply` latches a producer frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameLatchedEvent {
    /// Number of frames latched by this updater, including this one.
    pub frame_index: u64,
    /// Pipeline the updater runs on.
    pub pipeline: RenderPipeline,
    /// Slot the frame arrived in.
    pub slot: SlotId,
    /// Buffer the frame arrived in.
    pub buffer: BufferId,
    /// How the slot was resolved.
    pub outcome: SlotOutcome,
    /// Release fence handed to the producer during dequeue, if one was
    /// requested.
    pub release_fence: Option<FenceClass>,
    /// Whether the layer will be sampled with filtering forced on.
    pub force_filter: bool,
}

/// Emitted when a slot's texture reference is dropped outside teardown.
#[derive(Clone, Copy, Debug)]
pub struct TextureReleasedEvent {
    /// Slot the texture belonged to.
    pub slot: SlotId,
    /// Teardown path used.
    pub mode: Teardown,
    /// Whether the texture was freed or is still held by an image.
    pub release: Release,
}

/// Emitted when the producer source is detached.
#[derive(Clone, Copy, Debug)]
pub struct DetachEvent {
    /// Slot that was active at detach, if any.
    pub active_slot: Option<SlotId>,
    /// Whether consumer ownership was held and released.
    pub released_consumer: bool,
}

/// Emitted when the updater is torn down.
#[derive(Clone, Copy, Debug)]
pub struct TeardownEvent {
    /// Teardown path taken.
    pub mode: Teardown,
    /// Number of slot textures released.
    pub released_textures: usize,
    /// Whether a backing layer existed and was released.
    pub released_layer: bool,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives lifecycle events from a layer updater.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called after a frame is latched.
    fn on_frame_latched(&mut self, e: &FrameLatchedEvent) {
        _ = e;
    }

    /// Called when a slot texture reference is dropped.
    fn on_texture_released(&mut self, e: &TextureReleasedEvent) {
        _ = e;
    }

    /// Called when the producer source is detached.
    fn on_detach(&mut self, e: &DetachEvent) {
        _ = e;
    }

    /// Called when the updater is torn down.
    fn on_teardown(&mut self, e: &TeardownEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Owning wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
#[derive(Default)]
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Box<dyn TraceSink + Send>>,
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl Tracer {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink + Send>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            drop(sink);
            Self {}
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether events reach a sink.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    /// Emits a [`FrameLatchedEvent`].
    #[inline]
    pub fn frame_latched(&mut self, e: &FrameLatchedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_latched(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TextureReleasedEvent`].
    #[inline]
    pub fn texture_released(&mut self, e: &TextureReleasedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_texture_released(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DetachEvent`].
    #[inline]
    pub fn detach(&mut self, e: &DetachEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_detach(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TeardownEvent`].
    #[inline]
    pub fn teardown(&mut self, e: &TeardownEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_teardown(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_teardown() -> TeardownEvent {
        TeardownEvent {
            mode: Teardown::ContextLost,
            released_textures: 2,
            released_layer: true,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_teardown(&sample_teardown());
        sink.on_detach(&DetachEvent {
            active_slot: None,
            released_consumer: false,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        assert!(!tracer.is_enabled());
        tracer.teardown(&sample_teardown());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use std::sync::{Arc, Mutex};

        struct RecordingSink {
            modes: Arc<Mutex<Vec<Teardown>>>,
        }
        impl TraceSink for RecordingSink {
            fn on_teardown(&mut self, e: &TeardownEvent) {
                self.modes.lock().unwrap().push(e.mode);
            }
        }

        let modes = Arc::new(Mutex::new(Vec::new()));
        let mut tracer = Tracer::new(Box::new(RecordingSink {
            modes: Arc::clone(&modes),
        }));
        assert!(tracer.is_enabled());
        tracer.teardown(&sample_teardown());
        assert_eq!(*modes.lock().unwrap(), [Teardown::ContextLost]);
    }
}
