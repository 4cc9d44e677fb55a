// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Producer-side buffer identity and per-frame metadata.
//!
//! A producer (camera, video decoder, another process) hands frames to the
//! consumer as [`DequeuedBuffer`] records. Each record names the queue
//! [`SlotId`] the buffer lives in, the [`HardwareBuffer`] itself, and the
//! metadata needed to sample it correctly.

use core::any::Any;
use core::fmt;
use std::sync::Arc;

use kurbo::Rect;

/// Identifies one buffer-queue position the producer cycles through.
///
/// Slot ids are assigned by the producer and reused as it cycles; the
/// consumer treats them as opaque keys.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(pub i32);

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotId({})", self.0)
    }
}

/// Stable identity of a hardware buffer.
///
/// Two [`HardwareBuffer`] values with the same id refer to the same
/// allocation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(pub u64);

impl fmt::Debug for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BufferId({})", self.0)
    }
}

/// Color interpretation tag attached to a buffer.
///
/// Values follow the platform's dataspace encoding. Only equality matters to
/// the slot cache: a changed dataspace forces a new texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Dataspace(pub i32);

impl Dataspace {
    /// No color information attached.
    pub const UNKNOWN: Self = Self(0);
    /// sRGB primaries and transfer, full range.
    pub const SRGB: Self = Self(142_671_872);
    /// sRGB primaries, linear transfer.
    pub const SRGB_LINEAR: Self = Self(138_477_568);
    /// Display P3 primaries, sRGB transfer.
    pub const DISPLAY_P3: Self = Self(143_261_696);
}

/// Window transform flags the producer attaches to each frame.
///
/// The rotation values are compositions of the flip bits, matching the
/// native-window encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextureTransform(pub u32);

impl TextureTransform {
    /// No transform.
    pub const IDENTITY: Self = Self(0);
    /// Mirror horizontally.
    pub const FLIP_H: Self = Self(0x01);
    /// Mirror vertically.
    pub const FLIP_V: Self = Self(0x02);
    /// Rotate 90 degrees clockwise.
    pub const ROT_90: Self = Self(0x04);
    /// Rotate 180 degrees.
    pub const ROT_180: Self = Self(0x03);
    /// Rotate 270 degrees clockwise.
    pub const ROT_270: Self = Self(0x07);

    /// Returns `true` if the transform swaps width and height.
    #[inline]
    #[must_use]
    pub const fn swaps_axes(self) -> bool {
        self.0 & Self::ROT_90.0 != 0
    }
}

/// Size and format of a hardware buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BufferDesc {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Platform pixel-format code.
    pub format: u32,
}

/// A GPU-shareable buffer owned by the producer.
///
/// Cloning is cheap and does not duplicate the allocation. Backends that need
/// the platform object (an `AHardwareBuffer`, a dma-buf, an `IOSurface`)
/// attach it with [`with_native`](Self::with_native) and recover it with
/// [`native`](Self::native).
#[derive(Clone)]
pub struct HardwareBuffer {
    id: BufferId,
    desc: BufferDesc,
    native: Option<Arc<dyn Any + Send + Sync>>,
}

impl HardwareBuffer {
    /// Creates a buffer record without a native payload.
    #[must_use]
    pub fn new(id: BufferId, desc: BufferDesc) -> Self {
        Self {
            id,
            desc,
            native: None,
        }
    }

    /// Attaches a backend-specific native object.
    #[must_use]
    pub fn with_native(mut self, native: Arc<dyn Any + Send + Sync>) -> Self {
        self.native = Some(native);
        self
    }

    /// Returns the buffer identity.
    #[inline]
    #[must_use]
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Returns the buffer description.
    #[inline]
    #[must_use]
    pub fn desc(&self) -> BufferDesc {
        self.desc
    }

    /// Returns the native payload, if one of type `T` was attached.
    #[must_use]
    pub fn native<T: Any>(&self) -> Option<&T> {
        self.native.as_deref()?.downcast_ref::<T>()
    }
}

impl PartialEq for HardwareBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for HardwareBuffer {}

impl fmt::Debug for HardwareBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HardwareBuffer")
            .field("id", &self.id)
            .field("desc", &self.desc)
            .field("native", &self.native.is_some())
            .finish()
    }
}

/// One frame handed over by the producer.
#[derive(Clone, Debug)]
pub struct DequeuedBuffer {
    /// Queue slot the buffer occupies.
    pub slot: SlotId,
    /// The buffer itself.
    pub buffer: HardwareBuffer,
    /// Color interpretation of the pixel data.
    pub dataspace: Dataspace,
    /// Window transform to apply when sampling.
    pub texture_transform: TextureTransform,
    /// Region of the buffer holding valid content, in buffer pixels.
    pub crop: Rect,
    /// The producer requires the slot's image to be recreated even when the
    /// buffer identity and dataspace are unchanged.
    pub force_recreate: bool,
}

impl DequeuedBuffer {
    /// Creates a frame record with no transform, a crop covering the whole
    /// buffer, and no forced recreation.
    #[must_use]
    pub fn new(slot: SlotId, buffer: HardwareBuffer, dataspace: Dataspace) -> Self {
        let desc = buffer.desc();
        Self {
            slot,
            buffer,
            dataspace,
            texture_transform: TextureTransform::IDENTITY,
            crop: Rect::new(0.0, 0.0, f64::from(desc.width), f64::from(desc.height)),
            force_recreate: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc() -> BufferDesc {
        BufferDesc {
            width: 64,
            height: 32,
            format: 1,
        }
    }

    #[test]
    fn buffer_identity_ignores_payload() {
        let a = HardwareBuffer::new(BufferId(7), desc());
        let b = HardwareBuffer::new(BufferId(7), desc()).with_native(Arc::new(5_u32));
        let c = HardwareBuffer::new(BufferId(8), desc());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn native_payload_downcasts() {
        let buffer = HardwareBuffer::new(BufferId(1), desc()).with_native(Arc::new(42_u64));
        assert_eq!(buffer.native::<u64>(), Some(&42));
        assert!(buffer.native::<u32>().is_none(), "wrong type must not downcast");
        assert!(HardwareBuffer::new(BufferId(2), desc()).native::<u64>().is_none());
    }

    #[test]
    fn default_crop_covers_buffer() {
        let frame = DequeuedBuffer::new(
            SlotId(0),
            HardwareBuffer::new(BufferId(1), desc()),
            Dataspace::SRGB,
        );
        assert_eq!(frame.crop, Rect::new(0.0, 0.0, 64.0, 32.0));
        assert!(!frame.force_recreate);
    }

    #[test]
    fn rotations_swap_axes() {
        assert!(TextureTransform::ROT_90.swaps_axes());
        assert!(TextureTransform::ROT_270.swaps_axes());
        assert!(!TextureTransform::ROT_180.swaps_axes());
        assert!(!TextureTransform::IDENTITY.swaps_axes());
    }

    #[test]
    fn slot_debug_format() {
        assert_eq!(std::format!("{:?}", SlotId(-1)), "SlotId(-1)");
    }
}
