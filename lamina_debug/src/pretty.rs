// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use lamina_core::buffer::SlotId;
use lamina_core::fence::FenceClass;
use lamina_core::texture::{Release, Teardown};
use lamina_core::trace::{
    DetachEvent, FrameLatchedEvent, SlotOutcome, TeardownEvent, TextureReleasedEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write + Send>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    #[must_use]
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn slot_name(slot: Option<SlotId>) -> String {
    slot.map_or_else(|| "-".to_owned(), |s| s.0.to_string())
}

fn outcome_name(outcome: SlotOutcome) -> &'static str {
    match outcome {
        SlotOutcome::Cached => "cached",
        SlotOutcome::Created => "created",
        SlotOutcome::Unavailable => "SKIPPED",
    }
}

fn fence_name(fence: Option<FenceClass>) -> &'static str {
    match fence {
        Some(FenceClass::Native) => "native",
        Some(FenceClass::Sync) => "sync",
        Some(FenceClass::None) => "NONE",
        None => "-",
    }
}

fn mode_name(mode: Teardown) -> &'static str {
    match mode {
        Teardown::Normal => "normal",
        Teardown::ContextLost => "context-lost",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_latched(&mut self, e: &FrameLatchedEvent) {
        let _ = writeln!(
            self.writer,
            "[latch] frame={} pipeline={:?} slot={} buffer={} {} fence={} filter={}",
            e.frame_index,
            e.pipeline,
            e.slot.0,
            e.buffer.0,
            outcome_name(e.outcome),
            fence_name(e.release_fence),
            e.force_filter,
        );
    }

    fn on_texture_released(&mut self, e: &TextureReleasedEvent) {
        let release = match e.release {
            Release::Shared => "shared",
            Release::Freed => "freed",
        };
        let _ = writeln!(
            self.writer,
            "[release] slot={} mode={} {release}",
            e.slot.0,
            mode_name(e.mode),
        );
    }

    fn on_detach(&mut self, e: &DetachEvent) {
        let _ = writeln!(
            self.writer,
            "[detach] slot={} consumer_released={}",
            slot_name(e.active_slot),
            e.released_consumer,
        );
    }

    fn on_teardown(&mut self, e: &TeardownEvent) {
        let _ = writeln!(
            self.writer,
            "[teardown] mode={} textures={} layer={}",
            mode_name(e.mode),
            e.released_textures,
            e.released_layer,
        );
    }
}
