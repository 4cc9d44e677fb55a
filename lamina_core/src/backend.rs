// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collaborator contracts for GPU backends and buffer producers.
//!
//! Lamina splits platform-specific work into two seams:
//!
//! - **GPU backend**: Implements [`GpuBackend`] to import hardware buffers
//!   as textures, free them, hand queue ownership back to the producer, and
//!   create or wait on fences. One backend instance lives behind each
//!   [`GpuContext`](crate::context::GpuContext).
//!
//! - **Buffer source**: Implements [`BufferSource`] to hand frames to the
//!   consumer. During [`dequeue_buffer`](BufferSource::dequeue_buffer) the
//!   source calls back through [`ConsumerFences`] to obtain a release fence
//!   for the buffer it is about to reclaim and to wait on the producer's
//!   acquire fence.
//!
//! # Crate boundaries
//!
//! `lamina_core` owns the slot cache, the texture handles, and the updater
//! state machine. Platform crates provide the backend and source
//! implementations. Application code creates a
//! [`RenderState`](crate::context::RenderState), builds updaters from it, and
//! drives them from its render pass:
//!
//! ```rust,ignore
//! fn on_frame(updater: &mut DeferredLayerUpdater<MyBackend>) {
//!     // Commit pending properties and latch the newest producer frame.
//!     updater.apply();
//!
//!     // Draw: read the committed render target.
//!     if let Some(layer) = updater.backing_layer() {
//!         draw_layer(layer);
//!     }
//! }
//! ```

use crate::buffer::{Dataspace, DequeuedBuffer, HardwareBuffer};
use crate::error::{GpuError, Result};
use crate::fence::{FenceFd, ReleaseFence};

/// The rendering pipeline a GPU context runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderPipeline {
    /// GL-based pipeline. Release fences are native fence descriptors when
    /// supported, otherwise sync objects tied to a display.
    #[default]
    Gl,
    /// Vulkan-based pipeline. Imported textures hold producer-queue
    /// ownership which must be released before the producer may reuse the
    /// buffer.
    Vulkan,
}

/// Opaque display handle a sync object is tied to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DisplayId(pub u64);

/// GPU-side operations the updater needs from a rendering context.
///
/// Methods take `&self`; implementations that need mutation use interior
/// mutability. A backend is shared between the context owner, every texture
/// handle, and every image derived from one, so it must be `Send + Sync`.
pub trait GpuBackend: Send + Sync + 'static {
    /// Backend texture object created from a hardware buffer.
    type Texture: Send + Sync + 'static;

    /// Backend sync object (for example an EGL fence sync).
    type Sync: Send + 'static;

    /// Imports `buffer` as a sampleable texture with the given dataspace.
    fn import_buffer(
        &self,
        buffer: &HardwareBuffer,
        dataspace: Dataspace,
    ) -> Result<Self::Texture>;

    /// Frees a texture on a live context.
    fn delete_texture(&self, texture: Self::Texture);

    /// Drops a texture whose context is already gone.
    ///
    /// Implementations must only release CPU-side bookkeeping here and must
    /// not issue GPU calls.
    fn abandon_texture(&self, texture: Self::Texture) {
        drop(texture);
    }

    /// Transfers the buffer behind `texture` back to the producer queue
    /// without freeing the texture.
    fn release_queue_ownership(&self, texture: &Self::Texture);

    /// Display that sync objects are created against, if any.
    fn display(&self) -> Option<DisplayId> {
        None
    }

    /// Whether [`create_native_fence`](Self::create_native_fence) is
    /// available.
    fn supports_native_fence(&self) -> bool;

    /// Creates a fence that signals when all GPU work submitted so far has
    /// completed, exported as a waitable descriptor.
    fn create_native_fence(&self) -> Result<FenceFd>;

    /// Creates a sync object that signals when all GPU work submitted so far
    /// has completed.
    fn create_sync_fence(&self) -> Result<Self::Sync> {
        Err(GpuError::SyncCreation("sync objects unsupported".into()))
    }

    /// Makes the GPU wait until `fence` signals before executing further
    /// work, blocking the caller if the backend cannot queue the wait.
    fn wait_fence(&self, fence: FenceFd) -> Result<()>;
}

/// Consumer-side fence callbacks handed to [`BufferSource::dequeue_buffer`].
pub trait ConsumerFences<B: GpuBackend> {
    /// Produces a release fence for the buffer the consumer is giving back.
    ///
    /// Never fails: when no fence can be created the result is the
    /// [`FenceKind::None`](crate::fence::FenceKind::None) sentinel and the
    /// producer must fall back to a blocking wait.
    fn create_release_fence(&mut self, use_fence_sync: bool) -> ReleaseFence<B::Sync>;

    /// Waits on the producer's acquire fence for the incoming buffer.
    ///
    /// An error means there is no pending GPU work to wait for.
    fn fence_wait(&mut self, fence: FenceFd) -> Result<()>;
}

/// Producer side of a buffer queue, as seen by the consumer.
pub trait BufferSource<B: GpuBackend>: Send {
    /// Marks the consumer as attached. Called once before the first dequeue
    /// after the source is installed.
    fn take_consumer_ownership(&mut self);

    /// Marks the consumer as detached. Buffers it held may be reclaimed once
    /// their release fences signal.
    fn release_consumer_ownership(&mut self);

    /// Returns the newest available frame, discarding older queued frames,
    /// or `None` if nothing new was produced.
    fn dequeue_buffer(&mut self, fences: &mut dyn ConsumerFences<B>) -> Option<DequeuedBuffer>;
}
