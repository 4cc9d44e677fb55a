// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Counting test doubles for the backend and producer seams.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::backend::{BufferSource, ConsumerFences, DisplayId, GpuBackend};
use crate::buffer::{BufferDesc, BufferId, Dataspace, DequeuedBuffer, HardwareBuffer, SlotId};
use crate::error::{GpuError, Result};
use crate::fence::{FenceClass, FenceFd};

/// A 64x32 buffer with the given identity.
pub(crate) fn buffer(id: u64) -> HardwareBuffer {
    HardwareBuffer::new(
        BufferId(id),
        BufferDesc {
            width: 64,
            height: 32,
            format: 1,
        },
    )
}

/// An sRGB frame carrying [`buffer`]`(buffer_id)` in `slot`.
pub(crate) fn frame(slot: i32, buffer_id: u64) -> DequeuedBuffer {
    DequeuedBuffer::new(SlotId(slot), buffer(buffer_id), Dataspace::SRGB)
}

#[derive(Debug)]
pub(crate) struct MockTexture {
    pub(crate) id: u64,
    pub(crate) buffer: BufferId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct MockSync(pub(crate) usize);

/// Backend that counts every call.
#[derive(Debug)]
pub(crate) struct MockBackend {
    native_fence: bool,
    fail_imports: AtomicBool,
    fail_fences: AtomicBool,
    next_texture: AtomicU64,
    imports: AtomicUsize,
    deletes: AtomicUsize,
    abandons: AtomicUsize,
    queue_releases: AtomicUsize,
    native_fences: AtomicUsize,
    sync_fences: AtomicUsize,
    waits: AtomicUsize,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            native_fence: true,
            fail_imports: AtomicBool::new(false),
            fail_fences: AtomicBool::new(false),
            next_texture: AtomicU64::new(1),
            imports: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            abandons: AtomicUsize::new(0),
            queue_releases: AtomicUsize::new(0),
            native_fences: AtomicUsize::new(0),
            sync_fences: AtomicUsize::new(0),
            waits: AtomicUsize::new(0),
        }
    }
}

fn bump(counter: &AtomicUsize) -> usize {
    counter.fetch_add(1, Ordering::SeqCst) + 1
}

fn read(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

impl MockBackend {
    pub(crate) fn without_native_fence() -> Self {
        Self {
            native_fence: false,
            ..Self::default()
        }
    }

    pub(crate) fn set_fail_imports(&self, fail: bool) {
        self.fail_imports.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_fences(&self, fail: bool) {
        self.fail_fences.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn imports(&self) -> usize {
        read(&self.imports)
    }

    pub(crate) fn deletes(&self) -> usize {
        read(&self.deletes)
    }

    pub(crate) fn abandons(&self) -> usize {
        read(&self.abandons)
    }

    pub(crate) fn queue_releases(&self) -> usize {
        read(&self.queue_releases)
    }

    pub(crate) fn native_fences(&self) -> usize {
        read(&self.native_fences)
    }

    pub(crate) fn sync_fences(&self) -> usize {
        read(&self.sync_fences)
    }

    pub(crate) fn waits(&self) -> usize {
        read(&self.waits)
    }

    fn fences_fail(&self) -> bool {
        self.fail_fences.load(Ordering::SeqCst)
    }
}

impl GpuBackend for MockBackend {
    type Texture = MockTexture;
    type Sync = MockSync;

    fn import_buffer(&self, buffer: &HardwareBuffer, _dataspace: Dataspace) -> Result<MockTexture> {
        if self.fail_imports.load(Ordering::SeqCst) {
            return Err(GpuError::TextureImport("mock import failure".into()));
        }
        bump(&self.imports);
        Ok(MockTexture {
            id: self.next_texture.fetch_add(1, Ordering::SeqCst),
            buffer: buffer.id(),
        })
    }

    fn delete_texture(&self, texture: MockTexture) {
        bump(&self.deletes);
        drop(texture);
    }

    fn abandon_texture(&self, texture: MockTexture) {
        bump(&self.abandons);
        drop(texture);
    }

    fn release_queue_ownership(&self, _texture: &MockTexture) {
        bump(&self.queue_releases);
    }

    fn display(&self) -> Option<DisplayId> {
        Some(DisplayId(1))
    }

    fn supports_native_fence(&self) -> bool {
        self.native_fence
    }

    fn create_native_fence(&self) -> Result<FenceFd> {
        if self.fences_fail() {
            return Err(GpuError::SyncCreation("mock fence failure".into()));
        }
        let n = bump(&self.native_fences);
        Ok(FenceFd(i32::try_from(n).unwrap_or(i32::MAX) + 100))
    }

    fn create_sync_fence(&self) -> Result<MockSync> {
        if self.fences_fail() {
            return Err(GpuError::SyncCreation("mock sync failure".into()));
        }
        Ok(MockSync(bump(&self.sync_fences)))
    }

    fn wait_fence(&self, _fence: FenceFd) -> Result<()> {
        bump(&self.waits);
        if self.fences_fail() {
            return Err(GpuError::FenceWait("mock wait failure".into()));
        }
        Ok(())
    }
}

/// What a [`MockSource`] observed.
#[derive(Clone, Debug, Default)]
pub(crate) struct SourceLog {
    pub(crate) takes: usize,
    pub(crate) releases: usize,
    pub(crate) dequeues: usize,
    pub(crate) fences: Vec<FenceClass>,
    pub(crate) acquire_waits: usize,
    pub(crate) dropped: bool,
}

#[derive(Debug, Default)]
struct SourceShared {
    queue: VecDeque<DequeuedBuffer>,
    log: SourceLog,
}

/// Producer double. Frames are queued through the paired [`SourceHandle`];
/// each dequeue hands out the newest and discards the rest.
#[derive(Debug)]
pub(crate) struct MockSource {
    shared: Arc<Mutex<SourceShared>>,
    use_fence_sync: bool,
    acquire_fence: Option<FenceFd>,
}

/// Test-side view of a [`MockSource`] that survives the source being
/// dropped.
#[derive(Clone, Debug)]
pub(crate) struct SourceHandle {
    shared: Arc<Mutex<SourceShared>>,
}

impl MockSource {
    pub(crate) fn new() -> (Self, SourceHandle) {
        let shared = Arc::new(Mutex::new(SourceShared::default()));
        let source = Self {
            shared: Arc::clone(&shared),
            use_fence_sync: true,
            acquire_fence: None,
        };
        (source, SourceHandle { shared })
    }

    pub(crate) fn with_acquire_fence(mut self, fence: FenceFd) -> Self {
        self.acquire_fence = Some(fence);
        self
    }
}

impl SourceHandle {
    pub(crate) fn push(&self, frame: DequeuedBuffer) {
        self.shared.lock().unwrap().queue.push_back(frame);
    }

    pub(crate) fn log(&self) -> SourceLog {
        self.shared.lock().unwrap().log.clone()
    }
}

impl<B: GpuBackend> BufferSource<B> for MockSource {
    fn take_consumer_ownership(&mut self) {
        self.shared.lock().unwrap().log.takes += 1;
    }

    fn release_consumer_ownership(&mut self) {
        self.shared.lock().unwrap().log.releases += 1;
    }

    fn dequeue_buffer(&mut self, fences: &mut dyn ConsumerFences<B>) -> Option<DequeuedBuffer> {
        let mut shared = self.shared.lock().unwrap();
        shared.log.dequeues += 1;
        let frame = shared.queue.drain(..).last()?;
        let fence = fences.create_release_fence(self.use_fence_sync);
        shared.log.fences.push(fence.class());
        if let Some(acquire) = self.acquire_fence {
            shared.log.acquire_waits += 1;
            let _ = fences.fence_wait(acquire);
        }
        Some(frame)
    }
}

impl Drop for MockSource {
    fn drop(&mut self) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.log.dropped = true;
        }
    }
}
