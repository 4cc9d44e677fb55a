// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Updater configuration.

use crate::backend::RenderPipeline;

/// Configuration for a [`DeferredLayerUpdater`](crate::updater::DeferredLayerUpdater).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpdaterConfig {
    /// Which rendering pipeline the GPU context runs. Selects the fence
    /// strategy and whether textures carry producer-queue ownership.
    pub pipeline: RenderPipeline,
    /// Force filtered sampling when the latched buffer's size differs from
    /// the layer size.
    pub filter_on_size_mismatch: bool,
}

impl UpdaterConfig {
    /// Configuration for a GL-based render pipeline.
    #[must_use]
    pub const fn gl() -> Self {
        Self {
            pipeline: RenderPipeline::Gl,
            filter_on_size_mismatch: true,
        }
    }

    /// Configuration for a Vulkan-based render pipeline.
    #[must_use]
    pub const fn vulkan() -> Self {
        Self {
            pipeline: RenderPipeline::Vulkan,
            filter_on_size_mismatch: true,
        }
    }
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self::gl()
    }
}
