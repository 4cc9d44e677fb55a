// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The backing render target and its display properties.
//!
//! A [`Layer`] is what the render pass draws. It only changes through the
//! updater's commit step, so between two `apply` calls the render pass sees
//! a stable set of properties:
//!
//! - Geometry: size, [`transform`](Layer::transform), and the
//!   [`crop`](Layer::crop) rectangle within the bound image.
//! - Compositing: blend flag, [`alpha`](Layer::alpha),
//!   [`BlendMode`], and an optional [`ColorFilter`].
//! - Content: the bound [`LayerImage`], its window transform, and whether
//!   sampling must filter because the image size differs from the layer.

use core::fmt;
use std::sync::Arc;

use kurbo::{Affine, Rect};

use crate::backend::GpuBackend;
use crate::buffer::TextureTransform;
use crate::texture::LayerImage;

/// Porter-Duff and separable blend modes a layer composites with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Clears the destination.
    Clear,
    /// Replaces the destination.
    Src,
    /// Keeps the destination.
    Dst,
    /// Source over destination.
    #[default]
    SrcOver,
    /// Destination over source.
    DstOver,
    /// Source where destination is opaque.
    SrcIn,
    /// Destination where source is opaque.
    DstIn,
    /// Source where destination is transparent.
    SrcOut,
    /// Destination where source is transparent.
    DstOut,
    /// Source atop destination.
    SrcATop,
    /// Destination atop source.
    DstATop,
    /// Exclusive or.
    Xor,
    /// Saturating add.
    Plus,
    /// Multiplies premultiplied components.
    Modulate,
    /// Inverse multiply.
    Screen,
    /// Multiply including alpha.
    Multiply,
}

/// A color transformation applied to the layer while compositing.
#[derive(Clone, Debug, PartialEq)]
pub enum ColorFilter {
    /// A 4x5 row-major color matrix applied to unpremultiplied RGBA.
    Matrix([f32; 20]),
    /// Blends a constant ARGB color onto every pixel.
    Blend {
        /// Packed `0xAARRGGBB` color.
        color: u32,
        /// How the color is blended.
        mode: BlendMode,
    },
}

/// The paint properties a layer takes from a paint object.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerPaint {
    /// Opacity, 0 to 255.
    pub alpha: u8,
    /// Composite blend mode.
    pub blend_mode: BlendMode,
    /// Optional color filter, shared with the paint that owns it.
    pub color_filter: Option<Arc<ColorFilter>>,
}

impl Default for LayerPaint {
    fn default() -> Self {
        Self {
            alpha: 255,
            blend_mode: BlendMode::SrcOver,
            color_filter: None,
        }
    }
}

/// The committed render target for one composited layer.
pub struct Layer<B: GpuBackend> {
    width: u32,
    height: u32,
    blend: bool,
    force_filter: bool,
    alpha: u8,
    blend_mode: BlendMode,
    color_filter: Option<Arc<ColorFilter>>,
    transform: Option<Affine>,
    crop: Rect,
    window_transform: TextureTransform,
    image: Option<LayerImage<B>>,
}

impl<B: GpuBackend> Layer<B> {
    pub(crate) fn new(width: u32, height: u32, blend: bool) -> Self {
        Self {
            width,
            height,
            blend,
            force_filter: false,
            alpha: 255,
            blend_mode: BlendMode::SrcOver,
            color_filter: None,
            transform: None,
            crop: Rect::ZERO,
            window_transform: TextureTransform::IDENTITY,
            image: None,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the layer blends with what is beneath it.
    #[must_use]
    pub fn blend(&self) -> bool {
        self.blend
    }

    /// Whether sampling must filter regardless of the transform.
    #[must_use]
    pub fn force_filter(&self) -> bool {
        self.force_filter
    }

    /// Opacity, 0 to 255.
    #[must_use]
    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    /// Composite blend mode.
    #[must_use]
    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// Color filter, if any.
    #[must_use]
    pub fn color_filter(&self) -> Option<&ColorFilter> {
        self.color_filter.as_deref()
    }

    /// Layer transform, if one was committed.
    #[must_use]
    pub fn transform(&self) -> Option<Affine> {
        self.transform
    }

    /// Region of the bound image to sample, in image pixels.
    #[must_use]
    pub fn crop(&self) -> Rect {
        self.crop
    }

    /// Window transform to apply when sampling the image.
    #[must_use]
    pub fn window_transform(&self) -> TextureTransform {
        self.window_transform
    }

    /// The bound image, if a frame has been latched.
    #[must_use]
    pub fn image(&self) -> Option<&LayerImage<B>> {
        self.image.as_ref()
    }

    pub(crate) fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub(crate) fn set_blend(&mut self, blend: bool) {
        self.blend = blend;
    }

    pub(crate) fn set_force_filter(&mut self, force_filter: bool) {
        self.force_filter = force_filter;
    }

    pub(crate) fn set_paint(
        &mut self,
        alpha: u8,
        blend_mode: BlendMode,
        color_filter: Option<Arc<ColorFilter>>,
    ) {
        self.alpha = alpha;
        self.blend_mode = blend_mode;
        self.color_filter = color_filter;
    }

    pub(crate) fn set_transform(&mut self, transform: Option<Affine>) {
        self.transform = transform;
    }

    pub(crate) fn set_crop(&mut self, crop: Rect) {
        self.crop = crop;
    }

    pub(crate) fn set_window_transform(&mut self, window_transform: TextureTransform) {
        self.window_transform = window_transform;
    }

    /// Binds `image`, dropping the previously bound one.
    pub(crate) fn set_image(&mut self, image: LayerImage<B>) {
        self.image = Some(image);
    }
}

impl<B: GpuBackend> fmt::Debug for Layer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("blend", &self.blend)
            .field("force_filter", &self.force_filter)
            .field("alpha", &self.alpha)
            .field("blend_mode", &self.blend_mode)
            .field("color_filter", &self.color_filter)
            .field("transform", &self.transform)
            .field("crop", &self.crop)
            .field("window_transform", &self.window_transform)
            .field("image", &self.image)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockBackend;

    #[test]
    fn default_paint_is_opaque_src_over() {
        let paint = LayerPaint::default();
        assert_eq!(paint.alpha, 255);
        assert_eq!(paint.blend_mode, BlendMode::SrcOver);
        assert!(paint.color_filter.is_none());
    }

    #[test]
    fn new_layer_has_no_content() {
        let layer = Layer::<MockBackend>::new(10, 20, true);
        assert_eq!((layer.width(), layer.height()), (10, 20));
        assert!(layer.blend());
        assert!(layer.image().is_none());
        assert!(layer.transform().is_none());
        assert_eq!(layer.alpha(), 255);
    }

    #[test]
    fn color_filter_is_shared_not_copied() {
        let filter = Arc::new(ColorFilter::Blend {
            color: 0xff00_00ff,
            mode: BlendMode::Modulate,
        });
        let mut layer = Layer::<MockBackend>::new(1, 1, false);
        layer.set_paint(128, BlendMode::Screen, Some(Arc::clone(&filter)));
        assert_eq!(Arc::strong_count(&filter), 2);
        assert_eq!(layer.color_filter(), Some(&*filter));

        layer.set_paint(255, BlendMode::SrcOver, None);
        assert_eq!(Arc::strong_count(&filter), 1, "previous filter released");
    }
}
