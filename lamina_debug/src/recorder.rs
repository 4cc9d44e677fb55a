// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Timestamped in-memory event recording.
//!
//! [`RecorderSink`] implements [`TraceSink`] and appends every event, stamped
//! with the time since the recorder was created, to a shared log. Clones
//! share the log, so a test or tool can keep one clone and hand another to
//! [`DeferredLayerUpdater::set_trace_sink`](lamina_core::DeferredLayerUpdater::set_trace_sink).

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use lamina_core::trace::{
    DetachEvent, FrameLatchedEvent, TeardownEvent, TextureReleasedEvent, TraceSink,
};

/// A recorded lifecycle event.
#[derive(Clone, Copy, Debug)]
pub enum RecordedEvent {
    /// See [`TraceSink::on_frame_latched`].
    FrameLatched(FrameLatchedEvent),
    /// See [`TraceSink::on_texture_released`].
    TextureReleased(TextureReleasedEvent),
    /// See [`TraceSink::on_detach`].
    Detach(DetachEvent),
    /// See [`TraceSink::on_teardown`].
    Teardown(TeardownEvent),
}

/// An event and when it was recorded.
#[derive(Clone, Copy, Debug)]
pub struct Record {
    /// Time since the recorder was created.
    pub at: Duration,
    /// The event.
    pub event: RecordedEvent,
}

/// A [`TraceSink`] that appends events to a shared, timestamped log.
#[derive(Clone, Debug)]
pub struct RecorderSink {
    start: Instant,
    records: Arc<Mutex<Vec<Record>>>,
}

impl Default for RecorderSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderSink {
    /// Creates an empty recorder. Timestamps are relative to now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns a snapshot of the recorded events.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.lock().clone()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Discards everything recorded so far.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Record>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&mut self, event: RecordedEvent) {
        let at = self.start.elapsed();
        self.lock().push(Record { at, event });
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_latched(&mut self, e: &FrameLatchedEvent) {
        self.push(RecordedEvent::FrameLatched(*e));
    }

    fn on_texture_released(&mut self, e: &TextureReleasedEvent) {
        self.push(RecordedEvent::TextureReleased(*e));
    }

    fn on_detach(&mut self, e: &DetachEvent) {
        self.push(RecordedEvent::Detach(*e));
    }

    fn on_teardown(&mut self, e: &TeardownEvent) {
        self.push(RecordedEvent::Teardown(*e));
    }
}
