// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deferred-layer texture lifecycle for producer-fed compositing layers.
//!
//! `lamina_core` turns hardware buffers produced asynchronously (a camera, a
//! video decoder, another process) into GPU images a synchronous render pass
//! can draw. It caches one texture per producer queue slot, hands buffers
//! back to the producer behind release fences, and stays consistent when the
//! producer, the render pass, or the GPU context goes away out of order.
//!
//! # Architecture
//!
//! ```text
//!   Producer ──FrameNotifier::notify()──► FrameSignal
//!                                              │
//!   Render pass ──apply()──────────────────────┤
//!                                              ▼
//!   BufferSource::dequeue_buffer(DequeueFences) ──► DequeuedBuffer
//!                                                        │
//!                 ┌──────────────────────────────────────┘
//!                 ▼
//!   ImageSlotCache::create_if_needed() ──► LayerImage ──► Layer
//!
//!   RenderState::destroy_context() ──► on_context_destroyed()
//!                                      └► teardown(ContextLost)
//! ```
//!
//! **[`updater`]**: [`DeferredLayerUpdater`](updater::DeferredLayerUpdater),
//! the per-layer orchestrator: pending properties, frame latching, detach,
//! and the two teardown paths.
//!
//! **[`slot`]**: Per-slot texture cache. A slot's texture is reused while
//! the buffer identity and dataspace stay the same.
//!
//! **[`texture`]**: Reference-counted texture handles shared between the
//! cache and the images bound to layers.
//!
//! **[`fence`]**: Release-fence creation and acquire-fence waits, with the
//! no-fence fallback.
//!
//! **[`context`]**: The GPU context handle and its owner, which notifies
//! registered updaters when the context is destroyed.
//!
//! **[`backend`]**: The [`GpuBackend`](backend::GpuBackend) and
//! [`BufferSource`](backend::BufferSource) traits platform code implements.
//!
//! **[`layer`]**: The backing render target and its paint properties.
//!
//! **[`signal`]**: The single-slot "new frame" mailbox.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and lifecycle
//! events, dispatched through [`Tracer`](trace::Tracer).
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod backend;
pub mod buffer;
pub mod config;
pub mod context;
pub mod error;
pub mod fence;
pub mod layer;
pub mod signal;
pub mod slot;
pub mod texture;
pub mod trace;
pub mod updater;

#[cfg(test)]
mod test_support;

pub use config::UpdaterConfig;
pub use error::{GpuError, Result};
pub use updater::{DeferredLayerUpdater, UpdaterState};
