// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by GPU backends.

use thiserror::Error;

/// Failure reported by a [`GpuBackend`](crate::backend::GpuBackend).
///
/// None of these are fatal to the updater: a failed import skips the frame's
/// visual update, a failed fence falls back to the no-fence path, and a
/// failed wait is treated as "the buffer is already safe to reuse".
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum GpuError {
    /// Importing a hardware buffer as a texture failed.
    #[error("texture import failed: {0}")]
    TextureImport(String),

    /// Creating a fence or sync object failed.
    #[error("sync object creation failed: {0}")]
    SyncCreation(String),

    /// Waiting on a fence failed.
    #[error("fence wait failed: {0}")]
    FenceWait(String),

    /// The GPU context has already been torn down.
    #[error("GPU context has been destroyed")]
    ContextLost,
}

/// Result type for backend operations.
pub type Result<T> = core::result::Result<T, GpuError>;
