// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-slot texture cache.
//!
//! The producer cycles buffers through a small, fixed set of queue slots.
//! [`ImageSlotCache`] keeps the texture imported for each slot so a buffer
//! that comes back to the same slot is not imported again. A slot's texture
//! is replaced only when the buffer identity or dataspace changes, or when
//! the producer forces recreation.

use core::fmt;

use hashbrown::HashMap;

use crate::backend::{GpuBackend, RenderPipeline};
use crate::buffer::{Dataspace, HardwareBuffer, SlotId};
use crate::context::GpuContext;
use crate::texture::{LayerImage, Release, Teardown, TextureHandle};

/// Result of resolving a slot to an image.
#[derive(Debug)]
pub enum SlotImage<B: GpuBackend> {
    /// The slot's existing texture was reused.
    Cached(LayerImage<B>),
    /// A new texture was imported for the slot.
    Created(LayerImage<B>),
    /// Import failed; the slot is empty and the frame should be skipped.
    Unavailable,
}

impl<B: GpuBackend> SlotImage<B> {
    /// Returns the resolved image, if any.
    #[must_use]
    pub fn image(self) -> Option<LayerImage<B>> {
        match self {
            Self::Cached(image) | Self::Created(image) => Some(image),
            Self::Unavailable => None,
        }
    }
}

/// One cache entry: the last buffer seen in a slot and its texture.
///
/// The texture handle is present only while a GPU texture exists; an empty
/// slot also forgets its buffer.
pub struct ImageSlot<B: GpuBackend> {
    pipeline: RenderPipeline,
    buffer: Option<HardwareBuffer>,
    dataspace: Dataspace,
    texture: Option<TextureHandle<B>>,
}

impl<B: GpuBackend> ImageSlot<B> {
    /// Creates an empty slot.
    #[must_use]
    pub fn new(pipeline: RenderPipeline) -> Self {
        Self {
            pipeline,
            buffer: None,
            dataspace: Dataspace::UNKNOWN,
            texture: None,
        }
    }

    /// Returns an image for `buffer`, importing a new texture if the cached
    /// one does not match.
    ///
    /// A stale texture is cleared before the import, so the old reference is
    /// released exactly once whether or not the import succeeds.
    pub fn create_if_needed(
        &mut self,
        buffer: &HardwareBuffer,
        dataspace: Dataspace,
        force_create: bool,
        context: &GpuContext<B>,
    ) -> SlotImage<B> {
        if let Some(texture) = &self.texture {
            if !force_create && texture.buffer() == buffer && self.dataspace == dataspace {
                texture.reacquire_queue_ownership();
                return SlotImage::Cached(texture.image());
            }
        }
        self.clear(Teardown::Normal);

        match TextureHandle::create(context, self.pipeline, buffer, dataspace) {
            Ok(texture) => {
                let image = texture.image();
                self.buffer = Some(buffer.clone());
                self.dataspace = dataspace;
                self.texture = Some(texture);
                SlotImage::Created(image)
            }
            Err(err) => {
                tracing::warn!(buffer = ?buffer.id(), %err, "texture import failed, skipping frame");
                SlotImage::Unavailable
            }
        }
    }

    /// Hands the slot's buffer back to the producer queue. No-op when empty.
    pub fn release_queue_ownership(&self) -> bool {
        self.texture
            .as_ref()
            .is_some_and(TextureHandle::release_queue_ownership)
    }

    /// Drops the slot's texture reference and forgets its buffer.
    ///
    /// A [`Teardown::Normal`] clear first releases queue ownership. Returns
    /// `None` if the slot was already empty.
    pub fn clear(&mut self, mode: Teardown) -> Option<Release> {
        self.buffer = None;
        self.dataspace = Dataspace::UNKNOWN;
        let texture = self.texture.take()?;
        if mode == Teardown::Normal {
            texture.release_queue_ownership();
        }
        Some(texture.release(mode))
    }

    /// The buffer the cached texture was imported from.
    #[must_use]
    pub fn buffer(&self) -> Option<&HardwareBuffer> {
        self.buffer.as_ref()
    }

    /// The dataspace the cached texture was imported with.
    #[must_use]
    pub fn dataspace(&self) -> Dataspace {
        self.dataspace
    }

    /// The cached texture handle.
    #[must_use]
    pub fn texture(&self) -> Option<&TextureHandle<B>> {
        self.texture.as_ref()
    }

    /// Whether the slot holds no texture.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.texture.is_none()
    }
}

impl<B: GpuBackend> fmt::Debug for ImageSlot<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageSlot")
            .field("pipeline", &self.pipeline)
            .field("buffer", &self.buffer.as_ref().map(HardwareBuffer::id))
            .field("dataspace", &self.dataspace)
            .field("texture", &self.texture)
            .finish()
    }
}

/// Map from producer slot to cached texture.
pub struct ImageSlotCache<B: GpuBackend> {
    pipeline: RenderPipeline,
    slots: HashMap<SlotId, ImageSlot<B>>,
}

impl<B: GpuBackend> ImageSlotCache<B> {
    /// Creates an empty cache for the given pipeline.
    #[must_use]
    pub fn new(pipeline: RenderPipeline) -> Self {
        Self {
            pipeline,
            slots: HashMap::new(),
        }
    }

    /// Resolves `slot` to an image, see [`ImageSlot::create_if_needed`].
    ///
    /// Slot ids the cache has not seen get a fresh entry.
    pub fn create_if_needed(
        &mut self,
        slot: SlotId,
        buffer: &HardwareBuffer,
        dataspace: Dataspace,
        force_create: bool,
        context: &GpuContext<B>,
    ) -> SlotImage<B> {
        let pipeline = self.pipeline;
        self.slots
            .entry(slot)
            .or_insert_with(|| ImageSlot::new(pipeline))
            .create_if_needed(buffer, dataspace, force_create, context)
    }

    /// Returns the entry for `slot`, if one exists.
    #[must_use]
    pub fn get(&self, slot: SlotId) -> Option<&ImageSlot<B>> {
        self.slots.get(&slot)
    }

    /// Releases queue ownership of `slot`'s texture. No-op for unknown or
    /// empty slots.
    pub fn release_queue_ownership(&self, slot: SlotId) -> bool {
        self.slots
            .get(&slot)
            .is_some_and(ImageSlot::release_queue_ownership)
    }

    /// Clears `slot`. The entry stays in the map, empty.
    pub fn clear(&mut self, slot: SlotId, mode: Teardown) -> Option<Release> {
        self.slots.get_mut(&slot)?.clear(mode)
    }

    /// Clears every entry and empties the map. Returns how many textures
    /// were released.
    pub fn clear_all(&mut self, mode: Teardown) -> usize {
        self.slots
            .drain()
            .filter_map(|(_, mut slot)| slot.clear(mode))
            .count()
    }

    /// Number of entries, including empty ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of entries currently holding a texture.
    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.slots.values().filter(|s| !s.is_empty()).count()
    }
}

impl<B: GpuBackend> fmt::Debug for ImageSlotCache<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageSlotCache")
            .field("pipeline", &self.pipeline)
            .field("slots", &self.slots)
            .finish()
    }
}
