// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The deferred layer updater.
//!
//! A [`DeferredLayerUpdater`] sits between a producer that fills hardware
//! buffers on its own schedule and a render pass that draws once per frame.
//! Property setters only record pending values. The render pass calls
//! [`apply`](DeferredLayerUpdater::apply) once per frame to commit them onto
//! the backing [`Layer`] and, if the producer posted a new frame, to latch
//! the newest buffer through the slot cache.
//!
//! # States
//!
//! ```text
//!   Detached ──set_surface_texture──▶ Attached
//!      ▲                                 │
//!      └──────detach_surface_texture─────┘
//!   (any) ──teardown(Normal | ContextLost)──▶ Destroyed
//! ```
//!
//! [`Teardown::Normal`] frees GPU resources. [`Teardown::ContextLost`] runs
//! when the [`RenderState`] destroys the context out of band and releases
//! everything without GPU calls. Either path runs at most once; later calls
//! and the drop-time teardown are no-ops.
//!
//! # Threads
//!
//! Everything except [`update_tex_image`](DeferredLayerUpdater::update_tex_image)
//! and the [`FrameNotifier`] belongs to the render pass. Producers signal
//! through a notifier obtained from
//! [`frame_notifier`](DeferredLayerUpdater::frame_notifier).

use core::fmt;
use std::sync::{Arc, Mutex};

use kurbo::{Affine, Rect};

use crate::backend::{BufferSource, GpuBackend};
use crate::buffer::{DequeuedBuffer, SlotId, TextureTransform};
use crate::config::UpdaterConfig;
use crate::context::{ContextObserver, GpuContext, RenderState, SharedObserver};
use crate::fence::{DequeueFences, FenceGate};
use crate::layer::{BlendMode, ColorFilter, Layer, LayerPaint};
use crate::signal::{FrameNotifier, FrameSignal};
use crate::slot::{ImageSlotCache, SlotImage};
use crate::texture::{LayerImage, Teardown};
use crate::trace::{
    DetachEvent, FrameLatchedEvent, SlotOutcome, TeardownEvent, TextureReleasedEvent, TraceSink,
    Tracer,
};

/// Lifecycle state of an updater.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdaterState {
    /// A producer source is installed.
    Attached,
    /// No producer source is installed.
    Detached,
    /// Torn down; GPU resources and the backing layer are gone.
    Destroyed,
}

/// Turns producer buffers into a committed, drawable layer.
pub struct DeferredLayerUpdater<B: GpuBackend> {
    context: GpuContext<B>,
    config: UpdaterConfig,

    width: u32,
    height: u32,
    blend: bool,
    alpha: u8,
    blend_mode: BlendMode,
    color_filter: Option<Arc<ColorFilter>>,
    transform: Option<Affine>,

    signal: FrameSignal,
    source: Option<Box<dyn BufferSource<B>>>,
    consumer_attached: bool,

    layer: Option<Layer<B>>,
    slots: ImageSlotCache<B>,
    current_slot: Option<SlotId>,
    frames_latched: u64,
    destroyed: bool,

    tracer: Tracer,
}

impl<B: GpuBackend> DeferredLayerUpdater<B> {
    /// Creates a detached updater bound to `context`.
    ///
    /// The updater is not registered for context destruction; use
    /// [`new_registered`](Self::new_registered) for that.
    #[must_use]
    pub fn new(context: GpuContext<B>, config: UpdaterConfig) -> Self {
        Self {
            context,
            config,
            width: 0,
            height: 0,
            blend: false,
            alpha: 255,
            blend_mode: BlendMode::SrcOver,
            color_filter: None,
            transform: None,
            signal: FrameSignal::new(),
            source: None,
            consumer_attached: false,
            layer: None,
            slots: ImageSlotCache::new(config.pipeline),
            current_slot: None,
            frames_latched: 0,
            destroyed: false,
            tracer: Tracer::none(),
        }
    }

    /// Creates an updater bound to `state`'s context and registers it for
    /// the context-destruction notification.
    ///
    /// The registration is weak: dropping the returned handle unregisters
    /// the updater.
    #[must_use]
    pub fn new_registered(state: &RenderState<B>, config: UpdaterConfig) -> Arc<Mutex<Self>> {
        let updater = Arc::new(Mutex::new(Self::new(state.context(), config)));
        let observer: Arc<SharedObserver> = updater.clone();
        state.register_observer(Arc::downgrade(&observer));
        updater
    }

    /// Routes lifecycle events to `sink`. Requires the `trace` feature;
    /// without it the sink is dropped.
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink + Send>) {
        self.tracer = Tracer::new(sink);
    }

    // -- pending properties ------------------------------------------------

    /// Sets the pending layer size. Returns whether it changed.
    pub fn set_size(&mut self, width: u32, height: u32) -> bool {
        if self.width == width && self.height == height {
            return false;
        }
        self.width = width;
        self.height = height;
        true
    }

    /// Sets whether the layer blends. Returns whether it changed.
    pub fn set_blend(&mut self, blend: bool) -> bool {
        if self.blend == blend {
            return false;
        }
        self.blend = blend;
        true
    }

    /// Replaces the pending transform. `None` discards a transform that has
    /// not been committed yet.
    pub fn set_transform(&mut self, transform: Option<Affine>) {
        self.transform = transform;
    }

    /// Takes alpha, blend mode, and color filter from `paint`, or resets
    /// them to opaque `SrcOver` with no filter.
    pub fn set_paint(&mut self, paint: Option<&LayerPaint>) {
        let paint = paint.cloned().unwrap_or_default();
        self.alpha = paint.alpha;
        self.blend_mode = paint.blend_mode;
        self.color_filter = paint.color_filter;
    }

    // -- producer ----------------------------------------------------------

    /// Installs a producer source, replacing and releasing any previous one.
    ///
    /// The previous producer's slots are dropped from the cache, its active
    /// slot handed back to its queue first; the image bound to the backing
    /// layer stays until the new source delivers a frame. Consumer ownership
    /// of the new source is taken on the next [`apply`](Self::apply), which
    /// also latches its newest frame.
    pub fn set_surface_texture(&mut self, source: Box<dyn BufferSource<B>>) {
        self.release_source();
        self.sever_active_slot();
        let stale = self.slots.clear_all(Teardown::Normal);
        if stale > 0 {
            tracing::debug!(stale, "dropped slots of the replaced producer");
        }
        self.source = Some(source);
    }

    /// Signals that the producer has a new frame.
    ///
    /// Repeated calls before the next [`apply`](Self::apply) collapse into
    /// one latch.
    pub fn update_tex_image(&self) {
        self.signal.raise();
    }

    /// Returns a `Send + Sync` handle producers use to signal new frames.
    #[must_use]
    pub fn frame_notifier(&self) -> FrameNotifier {
        self.signal.notifier()
    }

    /// Whether a new-frame signal is waiting for the next
    /// [`apply`](Self::apply).
    #[must_use]
    pub fn is_frame_pending(&self) -> bool {
        self.signal.is_pending()
    }

    // -- commit ------------------------------------------------------------

    /// Binds `image` with its sampling parameters onto the backing layer,
    /// together with the pending size and blend flag.
    ///
    /// Creates the backing layer if it does not exist yet.
    pub fn update_layer(
        &mut self,
        force_filter: bool,
        texture_transform: TextureTransform,
        crop: Rect,
        image: LayerImage<B>,
    ) {
        let layer = self.layer_mut();
        layer.set_force_filter(force_filter);
        layer.set_crop(crop);
        layer.set_window_transform(texture_transform);
        layer.set_image(image);
    }

    /// Commits pending properties onto the backing layer and latches the
    /// newest producer frame if one was signalled.
    ///
    /// Without a new frame the previously bound image stays. Does nothing
    /// once the updater is destroyed.
    pub fn apply(&mut self) {
        if self.destroyed {
            tracing::debug!("apply on a destroyed layer updater ignored");
            return;
        }

        let (alpha, blend_mode, color_filter) =
            (self.alpha, self.blend_mode, self.color_filter.clone());
        self.layer_mut().set_paint(alpha, blend_mode, color_filter);

        if let Some(source) = self.source.as_mut() {
            if !self.consumer_attached {
                source.take_consumer_ownership();
                self.consumer_attached = true;
                self.signal.raise();
            }
            if self.signal.take() {
                self.latch_frame();
            }
        }

        if let Some(transform) = self.transform.take() {
            self.layer_mut().set_transform(Some(transform));
        }
    }

    fn layer_mut(&mut self) -> &mut Layer<B> {
        let (width, height, blend) = (self.width, self.height, self.blend);
        let layer = self
            .layer
            .get_or_insert_with(|| Layer::new(width, height, blend));
        layer.set_size(width, height);
        layer.set_blend(blend);
        layer
    }

    fn latch_frame(&mut self) {
        let Some(source) = self.source.as_mut() else {
            return;
        };
        let previous = self.current_slot.and_then(|slot| self.slots.get(slot));
        let mut fences = DequeueFences::new(
            FenceGate::new(&self.context, self.config.pipeline),
            previous,
        );
        let Some(frame) = source.dequeue_buffer(&mut fences) else {
            return;
        };
        let release_fence = fences.issued();

        let DequeuedBuffer {
            slot,
            buffer,
            dataspace,
            texture_transform,
            crop,
            force_recreate,
        } = frame;
        self.current_slot = Some(slot);
        self.frames_latched += 1;

        let resolved =
            self.slots
                .create_if_needed(slot, &buffer, dataspace, force_recreate, &self.context);
        let outcome = match &resolved {
            SlotImage::Cached(_) => SlotOutcome::Cached,
            SlotImage::Created(_) => SlotOutcome::Created,
            SlotImage::Unavailable => SlotOutcome::Unavailable,
        };
        let desc = buffer.desc();
        let (width, height) = if texture_transform.swaps_axes() {
            (desc.height, desc.width)
        } else {
            (desc.width, desc.height)
        };
        let force_filter =
            self.config.filter_on_size_mismatch && (width != self.width || height != self.height);

        self.tracer.frame_latched(&FrameLatchedEvent {
            frame_index: self.frames_latched,
            pipeline: self.config.pipeline,
            slot,
            buffer: buffer.id(),
            outcome,
            release_fence,
            force_filter,
        });

        if let Some(image) = resolved.image() {
            self.update_layer(force_filter, texture_transform, crop, image);
        }
    }

    // -- teardown ----------------------------------------------------------

    fn release_source(&mut self) -> bool {
        let Some(mut source) = self.source.take() else {
            return false;
        };
        let released = self.consumer_attached;
        if released {
            source.release_consumer_ownership();
            self.consumer_attached = false;
        }
        released
    }

    /// Hands the active slot's buffer back to the producer queue, clears the
    /// slot, and forgets it.
    fn sever_active_slot(&mut self) -> Option<SlotId> {
        let slot = self.current_slot.take()?;
        self.slots.release_queue_ownership(slot);
        if let Some(release) = self.slots.clear(slot, Teardown::Normal) {
            self.tracer.texture_released(&TextureReleasedEvent {
                slot,
                mode: Teardown::Normal,
                release,
            });
        }
        Some(slot)
    }

    /// Drops the producer source and severs the active slot from the
    /// producer queue.
    ///
    /// The active slot's buffer is handed back to the queue and the slot is
    /// cleared; the image bound to the backing layer stays valid for
    /// in-flight draws. Calling this again is a no-op.
    pub fn detach_surface_texture(&mut self) {
        let had_source = self.source.is_some();
        let released_consumer = self.release_source();
        let active_slot = self.sever_active_slot();
        if had_source || active_slot.is_some() {
            tracing::debug!(?active_slot, "producer source detached");
            self.tracer.detach(&DetachEvent {
                active_slot,
                released_consumer,
            });
        }
    }

    /// Releases the backing layer and every cached texture and enters
    /// [`UpdaterState::Destroyed`].
    ///
    /// Runs at most once; later calls are no-ops regardless of mode.
    pub fn teardown(&mut self, mode: Teardown) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        if self.consumer_attached {
            if let Some(source) = self.source.as_mut() {
                source.release_consumer_ownership();
            }
            self.consumer_attached = false;
        }
        // The layer's image goes first so the cache holds the last
        // reference and frees each texture under `mode`.
        let released_layer = self.layer.take().is_some();
        let released_textures = self.slots.clear_all(mode);
        self.current_slot = None;

        tracing::debug!(?mode, released_textures, "layer updater torn down");
        self.tracer.teardown(&TeardownEvent {
            mode,
            released_textures,
            released_layer,
        });
    }

    /// Normal teardown, see [`teardown`](Self::teardown).
    pub fn destroy_layer(&mut self) {
        self.teardown(Teardown::Normal);
    }

    // -- accessors ---------------------------------------------------------

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> UpdaterState {
        if self.destroyed {
            UpdaterState::Destroyed
        } else if self.source.is_some() {
            UpdaterState::Attached
        } else {
            UpdaterState::Detached
        }
    }

    /// The committed render target, once the first `apply` or
    /// `update_layer` has created it.
    #[must_use]
    pub fn backing_layer(&self) -> Option<&Layer<B>> {
        self.layer.as_ref()
    }

    /// Pending width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Pending height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pending blend flag.
    #[must_use]
    pub fn blend(&self) -> bool {
        self.blend
    }

    /// Pending alpha.
    #[must_use]
    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    /// Pending blend mode.
    #[must_use]
    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// Pending color filter.
    #[must_use]
    pub fn color_filter(&self) -> Option<&ColorFilter> {
        self.color_filter.as_deref()
    }

    /// Pending transform, not yet committed.
    #[must_use]
    pub fn transform(&self) -> Option<Affine> {
        self.transform
    }

    /// Slot of the most recently latched frame.
    #[must_use]
    pub fn current_slot(&self) -> Option<SlotId> {
        self.current_slot
    }

    /// Number of slot-cache entries.
    #[must_use]
    pub fn cached_slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of frames latched so far.
    #[must_use]
    pub fn frames_latched(&self) -> u64 {
        self.frames_latched
    }

    /// The configuration the updater was created with.
    #[must_use]
    pub fn config(&self) -> UpdaterConfig {
        self.config
    }

    /// The GPU context the updater is bound to.
    #[must_use]
    pub fn context(&self) -> &GpuContext<B> {
        &self.context
    }
}

impl<B: GpuBackend> ContextObserver for DeferredLayerUpdater<B> {
    fn on_context_destroyed(&mut self) {
        self.teardown(Teardown::ContextLost);
    }
}

impl<B: GpuBackend> Drop for DeferredLayerUpdater<B> {
    fn drop(&mut self) {
        let mode = if self.context.is_alive() {
            Teardown::Normal
        } else {
            Teardown::ContextLost
        };
        self.teardown(mode);
    }
}

impl<B: GpuBackend> fmt::Debug for DeferredLayerUpdater<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredLayerUpdater")
            .field("state", &self.state())
            .field("config", &self.config)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("current_slot", &self.current_slot)
            .field("slots", &self.slots)
            .field("layer", &self.layer)
            .field("signal", &self.signal)
            .finish_non_exhaustive()
    }
}
