//! Error Types
//!
//! The frame pipeline itself never fails: degraded states (incomplete
//! targets, exhausted shadow slots, VPL budget overflow, unnamed probes) are
//! logged and rendering continues. [`RenderError`] covers the few entry
//! points that genuinely can fail:
//!
//! - GPU adapter / device creation
//! - Texture readback during cubemap baking
//! - Image encoding and file I/O for baked probe faces
//! - Settings parsing
//!
//! ```rust,ignore
//! use myth_deferred::errors::{RenderError, Result};
//!
//! fn bake() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the deferred renderer.
#[derive(Error, Debug)]
pub enum RenderError {
    // ========================================================================
    // GPU & Rendering Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// Mapping a readback buffer failed.
    #[error("GPU readback failed: {0}")]
    ReadbackFailed(String),

    // ========================================================================
    // Image & Texture Errors
    // ========================================================================
    /// Image encoding or decoding error.
    #[error("Image error: {0}")]
    ImageError(String),

    /// Cube map validation error.
    #[error("Cube map error: {0}")]
    CubeMapError(String),

    // ========================================================================
    // I/O & Configuration Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Settings JSON could not be parsed.
    #[error("Settings parse error: {0}")]
    SettingsError(#[from] serde_json::Error),
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<image::ImageError> for RenderError {
    fn from(err: image::ImageError) -> Self {
        RenderError::ImageError(err.to_string())
    }
}

/// Alias for `Result<T, RenderError>`.
pub type Result<T> = std::result::Result<T, RenderError>;
