// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference-counted GPU textures imported from hardware buffers.
//!
//! A [`TextureHandle`] is the slot cache's reference to an imported texture.
//! Every [`LayerImage`] produced from it shares ownership, so the texture can
//! outlive the cache entry (and the updater) while a render target or an
//! in-flight draw still samples it.
//!
//! Releasing is explicit on the cache side: [`TextureHandle::release`]
//! drops the cache's reference and reports whether that was the last one
//! ([`Release::Freed`]) or an image still holds the texture
//! ([`Release::Shared`]). The last image to drop frees the texture itself.
//!
//! Freeing picks one of two paths. On a live context the texture is
//! [deleted](crate::backend::GpuBackend::delete_texture). Under
//! [`Teardown::ContextLost`], or whenever the context has been marked lost,
//! it is [abandoned](crate::backend::GpuBackend::abandon_texture) and no GPU
//! call is issued.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backend::{GpuBackend, RenderPipeline};
use crate::buffer::{BufferId, Dataspace, HardwareBuffer};
use crate::context::GpuContext;
use crate::error::{GpuError, Result};

/// Which teardown path is releasing resources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Teardown {
    /// The GPU context is alive; resources are freed with GPU calls.
    Normal,
    /// The GPU context is already gone; only CPU-side bookkeeping is
    /// released.
    ContextLost,
}

/// Outcome of dropping the cache's reference to a texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Release {
    /// A derived image still holds the texture; it is freed when that image
    /// drops.
    Shared,
    /// This was the last reference; the texture has been freed.
    Freed,
}

struct TextureInner<B: GpuBackend> {
    context: GpuContext<B>,
    texture: Option<B::Texture>,
    buffer: HardwareBuffer,
    dataspace: Dataspace,
    pipeline: RenderPipeline,
    queue_owned: AtomicBool,
    /// Set when the cache let go under [`Teardown::ContextLost`]; the last
    /// image to drop then abandons instead of deleting.
    abandoned: AtomicBool,
}

impl<B: GpuBackend> TextureInner<B> {
    fn free(&mut self, mode: Teardown) {
        let Some(texture) = self.texture.take() else {
            return;
        };
        let backend = self.context.backend();
        let abandoned = *self.abandoned.get_mut();
        if mode == Teardown::Normal && !abandoned && self.context.is_alive() {
            backend.delete_texture(texture);
        } else {
            backend.abandon_texture(texture);
        }
    }

    fn release_queue_ownership(&self) -> bool {
        if self.pipeline != RenderPipeline::Vulkan {
            return false;
        }
        if !self.queue_owned.swap(false, Ordering::SeqCst) {
            return false;
        }
        match &self.texture {
            Some(texture) if self.context.is_alive() => {
                self.context.backend().release_queue_ownership(texture);
                true
            }
            _ => false,
        }
    }
}

impl<B: GpuBackend> Drop for TextureInner<B> {
    fn drop(&mut self) {
        // Falls back to abandoning when the context is already gone or the
        // cache released under `ContextLost`.
        self.free(Teardown::Normal);
    }
}

/// The slot cache's reference to an imported texture.
///
/// Not `Clone`: the cache holds exactly one handle per texture. Share the
/// texture with render targets through [`image`](Self::image).
pub struct TextureHandle<B: GpuBackend> {
    inner: Arc<TextureInner<B>>,
}

impl<B: GpuBackend> TextureHandle<B> {
    /// Imports `buffer` into `context` as a new texture.
    ///
    /// On the Vulkan pipeline the new handle holds producer-queue ownership
    /// until [`release_queue_ownership`](Self::release_queue_ownership).
    pub fn create(
        context: &GpuContext<B>,
        pipeline: RenderPipeline,
        buffer: &HardwareBuffer,
        dataspace: Dataspace,
    ) -> Result<Self> {
        if !context.is_alive() {
            return Err(GpuError::ContextLost);
        }
        let texture = context.backend().import_buffer(buffer, dataspace)?;
        Ok(Self {
            inner: Arc::new(TextureInner {
                context: context.clone(),
                texture: Some(texture),
                buffer: buffer.clone(),
                dataspace,
                pipeline,
                queue_owned: AtomicBool::new(pipeline == RenderPipeline::Vulkan),
                abandoned: AtomicBool::new(false),
            }),
        })
    }

    /// Returns the buffer this texture was imported from.
    #[must_use]
    pub fn buffer(&self) -> &HardwareBuffer {
        &self.inner.buffer
    }

    /// Returns the dataspace the texture was imported with.
    #[must_use]
    pub fn dataspace(&self) -> Dataspace {
        self.inner.dataspace
    }

    /// Produces an image sharing ownership of the texture.
    #[must_use]
    pub fn image(&self) -> LayerImage<B> {
        LayerImage {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of live references (this handle plus derived images).
    #[must_use]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Whether the texture still holds producer-queue ownership.
    #[must_use]
    pub fn holds_queue_ownership(&self) -> bool {
        self.inner.queue_owned.load(Ordering::SeqCst)
    }

    /// Hands the underlying buffer back to the producer queue without
    /// freeing the texture.
    ///
    /// Issues a backend call only on the Vulkan pipeline, only while the
    /// context is alive, and only the first time. Returns whether a call was
    /// issued.
    pub fn release_queue_ownership(&self) -> bool {
        self.inner.release_queue_ownership()
    }

    /// Marks the buffer as held by the consumer again after the producer
    /// redelivered it.
    pub(crate) fn reacquire_queue_ownership(&self) {
        if self.inner.pipeline == RenderPipeline::Vulkan {
            self.inner.queue_owned.store(true, Ordering::SeqCst);
        }
    }

    /// Drops the cache's reference.
    ///
    /// Frees the texture if no image holds it; otherwise the last image to
    /// drop frees it. A [`Teardown::ContextLost`] release sticks: the texture
    /// is abandoned whenever it is finally freed, even if the context still
    /// reports itself alive.
    pub fn release(self, mode: Teardown) -> Release {
        if mode == Teardown::ContextLost {
            self.inner.abandoned.store(true, Ordering::SeqCst);
        }
        match Arc::into_inner(self.inner) {
            Some(mut inner) => {
                inner.free(mode);
                Release::Freed
            }
            None => Release::Shared,
        }
    }
}

impl<B: GpuBackend> fmt::Debug for TextureHandle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureHandle")
            .field("buffer", &self.inner.buffer.id())
            .field("dataspace", &self.inner.dataspace)
            .field("refs", &self.ref_count())
            .finish_non_exhaustive()
    }
}

/// A sampleable image backed by a shared texture.
///
/// Holding a `LayerImage` keeps the texture alive even after the slot cache
/// has cleared its entry.
pub struct LayerImage<B: GpuBackend> {
    inner: Arc<TextureInner<B>>,
}

impl<B: GpuBackend> LayerImage<B> {
    /// Image width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.inner.buffer.desc().width
    }

    /// Image height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.inner.buffer.desc().height
    }

    /// Identity of the source buffer.
    #[must_use]
    pub fn buffer_id(&self) -> BufferId {
        self.inner.buffer.id()
    }

    /// Dataspace the image is sampled with.
    #[must_use]
    pub fn dataspace(&self) -> Dataspace {
        self.inner.dataspace
    }

    /// The backend texture, or `None` once it has been freed.
    #[must_use]
    pub fn texture(&self) -> Option<&B::Texture> {
        self.inner.texture.as_ref()
    }

    /// Whether two images share the same texture.
    #[must_use]
    pub fn same_texture(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<B: GpuBackend> Clone for LayerImage<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: GpuBackend> fmt::Debug for LayerImage<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerImage")
            .field("buffer", &self.inner.buffer.id())
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RenderState;
    use crate::test_support::{MockBackend, buffer};

    #[test]
    fn release_without_images_frees() {
        let state = RenderState::new(MockBackend::default());
        let ctx = state.context();
        let handle =
            TextureHandle::create(&ctx, RenderPipeline::Gl, &buffer(1), Dataspace::SRGB).unwrap();
        assert_eq!(ctx.backend().imports(), 1);
        assert_eq!(handle.release(Teardown::Normal), Release::Freed);
        assert_eq!(ctx.backend().deletes(), 1);
        assert_eq!(ctx.backend().abandons(), 0);
    }

    #[test]
    fn image_outlives_handle() {
        let state = RenderState::new(MockBackend::default());
        let ctx = state.context();
        let handle =
            TextureHandle::create(&ctx, RenderPipeline::Gl, &buffer(1), Dataspace::SRGB).unwrap();
        let image = handle.image();
        assert_eq!(handle.ref_count(), 2);

        assert_eq!(handle.release(Teardown::Normal), Release::Shared);
        assert_eq!(ctx.backend().deletes(), 0, "image still samples the texture");
        assert!(image.texture().is_some());

        drop(image);
        assert_eq!(ctx.backend().deletes(), 1);
    }

    #[test]
    fn context_lost_release_abandons() {
        let state = RenderState::new(MockBackend::default());
        let ctx = state.context();
        let handle =
            TextureHandle::create(&ctx, RenderPipeline::Gl, &buffer(1), Dataspace::SRGB).unwrap();
        assert_eq!(handle.release(Teardown::ContextLost), Release::Freed);
        assert_eq!(ctx.backend().deletes(), 0);
        assert_eq!(ctx.backend().abandons(), 1);
    }

    #[test]
    fn image_dropped_after_context_loss_abandons() {
        let state = RenderState::new(MockBackend::default());
        let ctx = state.context();
        let handle =
            TextureHandle::create(&ctx, RenderPipeline::Gl, &buffer(1), Dataspace::SRGB).unwrap();
        let image = handle.image();
        assert_eq!(handle.release(Teardown::Normal), Release::Shared);

        state.destroy_context();
        drop(image);
        assert_eq!(ctx.backend().deletes(), 0, "no GPU call after context loss");
        assert_eq!(ctx.backend().abandons(), 1);
    }

    #[test]
    fn context_lost_release_sticks_to_shared_images() {
        let state = RenderState::new(MockBackend::default());
        let ctx = state.context();
        let handle =
            TextureHandle::create(&ctx, RenderPipeline::Gl, &buffer(1), Dataspace::SRGB).unwrap();
        let image = handle.image();
        assert_eq!(handle.release(Teardown::ContextLost), Release::Shared);

        // The context was never marked lost, yet the texture must not be
        // deleted through it.
        assert!(ctx.is_alive());
        drop(image);
        assert_eq!(ctx.backend().deletes(), 0);
        assert_eq!(ctx.backend().abandons(), 1);
    }

    #[test]
    fn create_on_lost_context_fails() {
        let state = RenderState::new(MockBackend::default());
        let ctx = state.context();
        state.destroy_context();
        let err = TextureHandle::create(&ctx, RenderPipeline::Gl, &buffer(1), Dataspace::SRGB)
            .unwrap_err();
        assert_eq!(err, GpuError::ContextLost);
        assert_eq!(ctx.backend().imports(), 0);
    }

    #[test]
    fn queue_ownership_released_once_on_vulkan() {
        let state = RenderState::new(MockBackend::default());
        let ctx = state.context();
        let handle =
            TextureHandle::create(&ctx, RenderPipeline::Vulkan, &buffer(1), Dataspace::SRGB)
                .unwrap();
        assert!(handle.holds_queue_ownership());
        assert!(handle.release_queue_ownership());
        assert!(!handle.release_queue_ownership(), "second release is a no-op");
        assert!(!handle.holds_queue_ownership());
        assert_eq!(ctx.backend().queue_releases(), 1);
    }

    #[test]
    fn gl_textures_hold_no_queue_ownership() {
        let state = RenderState::new(MockBackend::default());
        let ctx = state.context();
        let handle =
            TextureHandle::create(&ctx, RenderPipeline::Gl, &buffer(1), Dataspace::SRGB).unwrap();
        assert!(!handle.holds_queue_ownership());
        assert!(!handle.release_queue_ownership());
        assert_eq!(ctx.backend().queue_releases(), 0);
    }

    #[test]
    fn images_compare_by_texture() {
        let state = RenderState::new(MockBackend::default());
        let ctx = state.context();
        let a = TextureHandle::create(&ctx, RenderPipeline::Gl, &buffer(1), Dataspace::SRGB)
            .unwrap();
        let b = TextureHandle::create(&ctx, RenderPipeline::Gl, &buffer(1), Dataspace::SRGB)
            .unwrap();
        assert!(a.image().same_texture(&a.image()));
        assert!(!a.image().same_texture(&b.image()));
        assert_ne!(a.image().texture().unwrap().id, b.image().texture().unwrap().id);
        assert_eq!(a.image().buffer_id(), BufferId(1));
        assert_eq!(a.image().width(), 64);
    }
}
