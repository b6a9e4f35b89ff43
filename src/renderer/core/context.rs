//! wgpu Context
//!
//! The [`WgpuContext`] holds the core GPU handles: device, queue and, when
//! presenting to a window, the surface and its configuration. A headless
//! context (no surface) is used for offline work such as probe baking.

use crate::errors::{RenderError, Result};
use crate::renderer::settings::ContextSettings;

pub struct WgpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// `None` for headless contexts.
    pub surface: Option<wgpu::Surface<'static>>,
    pub config: Option<wgpu::SurfaceConfiguration>,
    /// Format of the final presented image.
    pub output_format: wgpu::TextureFormat,
    /// Limits the device was created with.
    pub limits: wgpu::Limits,
    /// Line polygon mode is available (wireframe toggle).
    pub supports_wireframe: bool,
}

impl WgpuContext {
    /// Creates a context presenting to `target`.
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        settings: &ContextSettings,
    ) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(target)
            .map_err(|e| RenderError::AdapterRequestFailed(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: settings.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::AdapterRequestFailed(e.to_string()))?;

        let (device, queue, limits, supports_wireframe) = Self::create_device(&adapter).await?;

        let mut config = surface
            .get_default_config(&adapter, width.max(1), height.max(1))
            .ok_or_else(|| {
                RenderError::AdapterRequestFailed("Surface not supported by adapter".to_string())
            })?;
        config.present_mode = if settings.vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };
        config.usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
        surface.configure(&device, &config);

        let output_format = config.format;
        log::info!("Surface configured: {}x{} {:?}", config.width, config.height, output_format);

        Ok(Self {
            device,
            queue,
            surface: Some(surface),
            config: Some(config),
            output_format,
            limits,
            supports_wireframe,
        })
    }

    /// Creates a context without a window surface.
    pub async fn new_headless(settings: &ContextSettings) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: settings.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::AdapterRequestFailed(e.to_string()))?;

        let (device, queue, limits, supports_wireframe) = Self::create_device(&adapter).await?;

        Ok(Self {
            device,
            queue,
            surface: None,
            config: None,
            output_format: settings.output_format,
            limits,
            supports_wireframe,
        })
    }

    async fn create_device(
        adapter: &wgpu::Adapter,
    ) -> Result<(wgpu::Device, wgpu::Queue, wgpu::Limits, bool)> {
        let info = adapter.get_info();
        log::info!("Using adapter: {} ({:?})", info.name, info.backend);

        // Ask for what the adapter offers; the geometry pass still fits the
        // defaults, but larger shadow atlases and extents benefit.
        let limits = adapter.limits();
        let supports_wireframe = adapter.features().contains(wgpu::Features::POLYGON_MODE_LINE);
        let required_features = if supports_wireframe {
            wgpu::Features::POLYGON_MODE_LINE
        } else {
            wgpu::Features::empty()
        };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Deferred Renderer Device"),
                required_features,
                required_limits: limits.clone(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        Ok((device, queue, limits, supports_wireframe))
    }

    /// Current output size, if presenting to a surface.
    #[inline]
    #[must_use]
    pub fn surface_size(&self) -> Option<(u32, u32)> {
        self.config.as_ref().map(|c| (c.width, c.height))
    }
}
