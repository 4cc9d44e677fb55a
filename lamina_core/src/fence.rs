// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Release and acquire fences at the producer boundary.
//!
//! When the consumer latches a new frame it gives the previous buffer back
//! to the producer. The producer may only overwrite that buffer once the GPU
//! has finished reading it, so the consumer hands over a [`ReleaseFence`]
//! that signals at that point. Creation never fails the frame: when no fence
//! can be made the result is the [`FenceKind::None`] sentinel and the
//! producer falls back to a blocking wait.
//!
//! [`FenceGate`] implements both directions for one context.
//! [`DequeueFences`] adapts it to the [`ConsumerFences`] callbacks a
//! [`BufferSource`](crate::backend::BufferSource) receives during dequeue.

use core::fmt;

use crate::backend::{ConsumerFences, DisplayId, GpuBackend, RenderPipeline};
use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use crate::slot::ImageSlot;

/// A waitable fence descriptor exported by the GPU or the producer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FenceFd(pub i32);

impl fmt::Debug for FenceFd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FenceFd({})", self.0)
    }
}

/// The kind of release signal handed to the producer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FenceKind<S> {
    /// A native fence descriptor.
    Native(FenceFd),
    /// A backend sync object tied to the release fence's display.
    Sync(S),
    /// No fence could be created; the producer must wait by other means.
    None,
}

/// Payload-free classification of a [`FenceKind`], used in trace events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FenceClass {
    /// A native fence descriptor was produced.
    Native,
    /// A sync object was produced.
    Sync,
    /// The no-fence sentinel was produced.
    None,
}

/// Release signal for a buffer the consumer is giving back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReleaseFence<S> {
    /// Display a [`FenceKind::Sync`] object belongs to, if any.
    pub display: Option<DisplayId>,
    /// The signal itself.
    pub kind: FenceKind<S>,
}

impl<S> ReleaseFence<S> {
    /// The no-fence sentinel.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            display: None,
            kind: FenceKind::None,
        }
    }

    /// Returns `true` for the no-fence sentinel.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self.kind, FenceKind::None)
    }

    /// Classifies the fence without its payload.
    #[must_use]
    pub const fn class(&self) -> FenceClass {
        match self.kind {
            FenceKind::Native(_) => FenceClass::Native,
            FenceKind::Sync(_) => FenceClass::Sync,
            FenceKind::None => FenceClass::None,
        }
    }
}

/// Creates release fences and waits on acquire fences for one context.
pub struct FenceGate<'a, B: GpuBackend> {
    context: &'a GpuContext<B>,
    pipeline: RenderPipeline,
}

impl<'a, B: GpuBackend> FenceGate<'a, B> {
    /// Creates a gate over `context` using the given pipeline's fence
    /// strategy.
    #[must_use]
    pub fn new(context: &'a GpuContext<B>, pipeline: RenderPipeline) -> Self {
        Self { context, pipeline }
    }

    /// Creates a release fence covering all GPU work submitted so far.
    ///
    /// GL prefers a native fence descriptor, then a sync object when
    /// `use_fence_sync` is set. Vulkan always exports a native fence. Any
    /// creation failure yields [`ReleaseFence::none`].
    pub fn create_release_fence(&self, use_fence_sync: bool) -> ReleaseFence<B::Sync> {
        if !self.context.is_alive() {
            return ReleaseFence::none();
        }
        let backend = self.context.backend();
        match self.pipeline {
            RenderPipeline::Gl => {
                let display = backend.display();
                if backend.supports_native_fence() {
                    match backend.create_native_fence() {
                        Ok(fd) => ReleaseFence {
                            display,
                            kind: FenceKind::Native(fd),
                        },
                        Err(err) => fallback(&err),
                    }
                } else if use_fence_sync {
                    match backend.create_sync_fence() {
                        Ok(sync) => ReleaseFence {
                            display,
                            kind: FenceKind::Sync(sync),
                        },
                        Err(err) => fallback(&err),
                    }
                } else {
                    ReleaseFence::none()
                }
            }
            RenderPipeline::Vulkan => match backend.create_native_fence() {
                Ok(fd) => ReleaseFence {
                    display: None,
                    kind: FenceKind::Native(fd),
                },
                Err(err) => fallback(&err),
            },
        }
    }

    /// Waits until `fence` signals.
    ///
    /// Fails with [`GpuError::ContextLost`] without touching the backend
    /// when the context is gone. Callers treat any error as "no pending GPU
    /// work".
    pub fn fence_wait(&self, fence: FenceFd) -> Result<()> {
        if !self.context.is_alive() {
            return Err(GpuError::ContextLost);
        }
        self.context
            .backend()
            .wait_fence(fence)
            .inspect_err(|err| tracing::warn!(?fence, %err, "fence wait failed"))
    }
}

impl<B: GpuBackend> fmt::Debug for FenceGate<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FenceGate")
            .field("pipeline", &self.pipeline)
            .field("context", self.context)
            .finish()
    }
}

fn fallback<S>(err: &GpuError) -> ReleaseFence<S> {
    tracing::warn!(%err, "release fence unavailable, producer will block");
    ReleaseFence::none()
}

/// [`ConsumerFences`] implementation used while dequeuing a frame.
///
/// On the Vulkan pipeline, creating a release fence first hands the
/// previously active slot's buffer back to the producer queue.
pub struct DequeueFences<'a, B: GpuBackend> {
    gate: FenceGate<'a, B>,
    previous: Option<&'a ImageSlot<B>>,
    issued: Option<FenceClass>,
}

impl<'a, B: GpuBackend> DequeueFences<'a, B> {
    /// Creates the callbacks for one dequeue.
    #[must_use]
    pub fn new(gate: FenceGate<'a, B>, previous: Option<&'a ImageSlot<B>>) -> Self {
        Self {
            gate,
            previous,
            issued: None,
        }
    }

    /// The class of the last release fence handed out, if any.
    #[must_use]
    pub fn issued(&self) -> Option<FenceClass> {
        self.issued
    }
}

impl<B: GpuBackend> ConsumerFences<B> for DequeueFences<'_, B> {
    fn create_release_fence(&mut self, use_fence_sync: bool) -> ReleaseFence<B::Sync> {
        if self.gate.pipeline == RenderPipeline::Vulkan {
            if let Some(slot) = self.previous {
                slot.release_queue_ownership();
            }
        }
        let fence = self.gate.create_release_fence(use_fence_sync);
        self.issued = Some(fence.class());
        fence
    }

    fn fence_wait(&mut self, fence: FenceFd) -> Result<()> {
        self.gate.fence_wait(fence)
    }
}

impl<B: GpuBackend> fmt::Debug for DequeueFences<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DequeueFences")
            .field("gate", &self.gate)
            .field("has_previous", &self.previous.is_some())
            .field("issued", &self.issued)
            .finish()
    }
}
