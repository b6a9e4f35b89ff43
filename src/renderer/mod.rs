//! Deferred Renderer
//!
//! [`Renderer`] owns the GPU context, the long-lived resources, the frame
//! targets and one instance of every pass. Each call to
//! [`Renderer::render_frame`] renders the main view:
//!
//! ```text
//! FramePlan::main ──► prepare_scene ──► pass.prepare() (plan order)
//!                                            │
//!          submit ◄── pass.run() ◄── FrameUniforms ◄── flush_light_views
//! ```
//!
//! The same `render_view` path renders reflection-probe faces into a
//! separate 256² target set, which is what makes [`Renderer::bake_probes`]
//! safe to call between two frames: the main targets, camera history and
//! exposure state are left untouched.

pub mod core;
pub mod graph;
pub mod probe_bake;
pub mod settings;

use std::path::Path;

use glam::Mat4;

use crate::errors::{RenderError, Result};
use crate::resources::composite::FeatureToggles;
use crate::resources::texture::Image;
use crate::resources::uniforms::{ExposureValue, FrameUniforms};
use crate::scene::{Camera, CubemapHandle, RenderCamera, Scene};

use self::core::targets::RenderTarget;
use self::core::{FrameTargets, ResourceManager, WgpuContext};
use self::graph::passes::Passes;
use self::graph::{ExecuteContext, FrameBlackboard, FramePlan, PrepareContext, ViewContext, ViewKind};
use self::probe_bake::{BakeReport, PROBE_FACE_SIZE, ProbeCapture};
use self::settings::RenderSettings;

/// Format of captured probe faces (and of the saved PNGs).
pub const PROBE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Main-view state carried from one frame to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameHistory {
    /// View-projection of the last presented frame.
    pub prev_view_projection: Option<Mat4>,
    /// Accumulated time in seconds.
    pub time: f32,
}

/// Where a view's terminal pass writes.
enum ViewOutput<'a> {
    External(&'a wgpu::TextureView),
    Offscreen,
    Probe,
}

/// Target set of probe captures, created on the first bake.
struct ProbeTargets {
    frame: FrameTargets,
    color: RenderTarget,
    readback: wgpu::Buffer,
    padded_row: u32,
}

impl ProbeTargets {
    fn new(device: &wgpu::Device, settings: &RenderSettings) -> Self {
        let size = PROBE_FACE_SIZE;
        let padded_row = (size * 4).next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        Self {
            frame: FrameTargets::new(device, size, size, settings),
            color: RenderTarget::new(
                device,
                "Probe Face",
                size,
                size,
                PROBE_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            ),
            readback: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Probe Readback"),
                size: u64::from(padded_row * size),
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            }),
            padded_row,
        }
    }
}

pub struct Renderer {
    pub wgpu_ctx: WgpuContext,
    resources: ResourceManager,
    targets: FrameTargets,
    /// Output of headless contexts.
    offscreen: Option<RenderTarget>,
    probe: Option<ProbeTargets>,
    passes: Passes,
    settings: RenderSettings,
    history: FrameHistory,
}

impl Renderer {
    /// Creates a renderer for `wgpu_ctx`. The output extent is the surface
    /// size when presenting, `width × height` otherwise.
    #[must_use]
    pub fn new(wgpu_ctx: WgpuContext, width: u32, height: u32, settings: RenderSettings) -> Self {
        let (width, height) = wgpu_ctx.surface_size().unwrap_or((width, height));
        let device = &wgpu_ctx.device;

        let resources = ResourceManager::new(device, &wgpu_ctx.queue, &settings);
        let targets = FrameTargets::new(device, width, height, &settings);
        if !targets.check_complete(&wgpu_ctx.limits) {
            log::warn!("Frame targets are incomplete; rendering continues with degraded output");
        }
        let offscreen = wgpu_ctx.surface.is_none().then(|| {
            RenderTarget::new(
                device,
                "Offscreen Output",
                width,
                height,
                wgpu_ctx.output_format,
                wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
            )
        });
        let passes = Passes::new(device);

        log::info!("Deferred renderer ready: {width}x{height}, output {:?}", wgpu_ctx.output_format);

        Self {
            wgpu_ctx,
            resources,
            targets,
            offscreen,
            probe: None,
            passes,
            settings,
            history: FrameHistory::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Toggles take effect on the next frame. Shadow map size and target
    /// resolutions stay as they were at creation.
    pub fn settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.settings
    }

    #[inline]
    #[must_use]
    pub fn history(&self) -> FrameHistory {
        self.history
    }

    #[must_use]
    pub fn output_size(&self) -> (u32, u32) {
        (self.targets.width, self.targets.height)
    }

    /// Rendered image of a headless renderer.
    #[must_use]
    pub fn offscreen_output(&self) -> Option<&wgpu::Texture> {
        self.offscreen.as_ref().map(|t| &t.texture)
    }

    #[must_use]
    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    /// Renders and presents the main view.
    pub fn render_frame(&mut self, scene: &Scene, camera: &Camera, dt: f32) {
        self.history.time += dt.max(0.0);

        let (width, height) = self.output_size();
        let render_camera = camera.extract_render_camera(width as f32 / height as f32);
        let view = ViewContext {
            camera: render_camera,
            prev_view_projection: self
                .history
                .prev_view_projection
                .unwrap_or(render_camera.view_projection),
            kind: ViewKind::Main,
            dt,
            time: self.history.time,
            features: FeatureToggles::ALL,
            output_format: self.wgpu_ctx.output_format,
        };

        let surface_texture = match &self.wgpu_ctx.surface {
            Some(surface) => match surface.get_current_texture() {
                wgpu::CurrentSurfaceTexture::Success(texture)
                | wgpu::CurrentSurfaceTexture::Suboptimal(texture) => Some(texture),
                wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                    if let Some(config) = &self.wgpu_ctx.config {
                        surface.configure(&self.wgpu_ctx.device, config);
                    }
                    return;
                }
                e => {
                    log::error!("Render error: {e:?}");
                    return;
                }
            },
            None => None,
        };

        match surface_texture {
            Some(texture) => {
                let output = texture.texture.create_view(&wgpu::TextureViewDescriptor {
                    format: Some(self.wgpu_ctx.output_format),
                    ..Default::default()
                });
                self.render_view(scene, &view, ViewOutput::External(&output));
                texture.present();
            }
            None => {
                self.render_view(scene, &view, ViewOutput::Offscreen);
            }
        }

        self.history.prev_view_projection = Some(render_camera.view_projection);
    }

    /// Re-captures every named reflection probe and installs the results.
    ///
    /// Frame history is saved before and restored after, so the next main
    /// frame's velocity and timing are unaffected by the bake.
    pub fn bake_probes(&mut self, scene: &mut Scene, out_dir: &Path) -> Result<BakeReport> {
        let saved = self.history;
        let result = probe_bake::build_cubemaps(scene, self, out_dir);
        self.history = saved;
        result
    }

    /// Runs one view through its frame plan and submits the commands.
    fn render_view(
        &mut self,
        scene: &Scene,
        view: &ViewContext,
        output: ViewOutput,
    ) -> Option<wgpu::SubmissionIndex> {
        let Self {
            wgpu_ctx,
            resources,
            targets,
            offscreen,
            probe,
            passes,
            settings,
            ..
        } = self;
        let wgpu_ctx = &*wgpu_ctx;
        let settings = &*settings;

        let (targets, output) = match output {
            ViewOutput::External(output) => (&*targets, output),
            ViewOutput::Offscreen => (&*targets, &offscreen.as_ref()?.view),
            ViewOutput::Probe => {
                let probe = probe.as_ref()?;
                (&probe.frame, &probe.color.view)
            }
        };

        let plan = match view.kind {
            ViewKind::Main => FramePlan::main(settings, &scene.environment),
            ViewKind::ProbeFace => FramePlan::probe_face(settings),
        };

        let device = &wgpu_ctx.device;
        let queue = &wgpu_ctx.queue;
        resources.prepare_scene(device, queue, scene, settings.texture_quality);
        resources.reset_light_views();

        let mut blackboard = FrameBlackboard {
            neutral_exposure: !view.is_main(),
            ..Default::default()
        };

        for id in plan.passes() {
            let mut ctx = PrepareContext {
                wgpu_ctx,
                resources: &mut *resources,
                targets,
                scene,
                view,
                settings,
                blackboard: &mut blackboard,
            };
            passes.node_mut(*id).prepare(&mut ctx);
        }
        resources.flush_light_views(device, queue);

        let frame = FrameUniforms::new(
            &view.camera,
            view.prev_view_projection,
            view.time,
            (targets.width, targets.height),
        )
        .with_counts(blackboard.light_count, blackboard.vpl_count)
        .with_ambient(scene.environment.ambient, settings.shadow_bias);
        queue.write_buffer(&resources.frame_uniforms, 0, bytemuck::bytes_of(&frame));

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(match view.kind {
                ViewKind::Main => "Main View Encoder",
                ViewKind::ProbeFace => "Probe Face Encoder",
            }),
        });
        let ctx = ExecuteContext {
            wgpu_ctx,
            resources: &*resources,
            targets,
            scene,
            view,
            settings,
            blackboard: &blackboard,
            output,
        };
        for id in plan.passes() {
            passes.node(*id).run(&ctx, &mut encoder);
        }

        Some(queue.submit(Some(encoder.finish())))
    }

    /// Copies the probe face target into an [`Image`], dropping row padding.
    fn read_probe_face(&self) -> Result<Image> {
        let probe = self
            .probe
            .as_ref()
            .ok_or_else(|| RenderError::ReadbackFailed("probe targets not created".to_string()))?;
        self.read_rgba8(&probe.color.texture, &probe.readback, probe.padded_row)
    }

    /// Reads back the last frame of a headless renderer.
    ///
    /// The output format must be a four-byte RGBA format (the headless
    /// default is `Rgba8UnormSrgb`).
    pub fn read_output(&self) -> Result<Image> {
        let output = self
            .offscreen
            .as_ref()
            .ok_or_else(|| RenderError::ReadbackFailed("renderer presents to a surface".to_string()))?;
        if output.format.block_copy_size(None) != Some(4) {
            return Err(RenderError::ReadbackFailed(format!(
                "output format {:?} is not 8-bit RGBA",
                output.format
            )));
        }
        let padded_row = (output.width * 4).next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let readback = self.wgpu_ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Output Readback"),
            size: u64::from(padded_row * output.height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        self.read_rgba8(&output.texture, &readback, padded_row)
    }

    /// Current contents of the persisted exposure buffer.
    pub fn read_exposure(&self) -> Result<ExposureValue> {
        let device = &self.wgpu_ctx.device;
        let size = std::mem::size_of::<ExposureValue>() as u64;
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Exposure Readback"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Exposure Readback Encoder"),
        });
        encoder.copy_buffer_to_buffer(&self.resources.exposure_buffer, 0, &readback, 0, size);
        self.wgpu_ctx.queue.submit(Some(encoder.finish()));

        let slice = readback.slice(..);
        self.map_blocking(&slice)?;
        let value = bytemuck::pod_read_unaligned::<ExposureValue>(&slice.get_mapped_range());
        readback.unmap();
        Ok(value)
    }

    fn read_rgba8(&self, texture: &wgpu::Texture, readback: &wgpu::Buffer, padded_row: u32) -> Result<Image> {
        let (width, height) = (texture.width(), texture.height());
        let mut encoder = self
            .wgpu_ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.wgpu_ctx.queue.submit(Some(encoder.finish()));

        let slice = readback.slice(..);
        self.map_blocking(&slice)?;
        let row = (width * 4) as usize;
        let mut data = Vec::with_capacity(row * height as usize);
        {
            let mapped = slice.get_mapped_range();
            for chunk in mapped.chunks(padded_row as usize) {
                data.extend_from_slice(&chunk[..row]);
            }
        }
        readback.unmap();

        Image::new(width, height, data)
            .ok_or_else(|| RenderError::ReadbackFailed("readback has an unexpected size".to_string()))
    }

    /// Maps `slice` for reading and waits for the device.
    fn map_blocking(&self, slice: &wgpu::BufferSlice<'_>) -> Result<()> {
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.wgpu_ctx
            .device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .map_err(|e| RenderError::ReadbackFailed(e.to_string()))?;
        rx.recv()
            .map_err(|e| RenderError::ReadbackFailed(e.to_string()))?
            .map_err(|e| RenderError::ReadbackFailed(e.to_string()))
    }
}

impl ProbeCapture for Renderer {
    fn capture_face(&mut self, scene: &Scene, camera: &RenderCamera) -> Result<Image> {
        if self.probe.is_none() {
            log::debug!("Allocating probe capture targets ({PROBE_FACE_SIZE}²)");
            self.probe = Some(ProbeTargets::new(&self.wgpu_ctx.device, &self.settings));
        }
        let view = ViewContext {
            camera: *camera,
            prev_view_projection: camera.view_projection,
            kind: ViewKind::ProbeFace,
            dt: 0.0,
            time: self.history.time,
            features: FeatureToggles::NONE,
            output_format: PROBE_FORMAT,
        };
        self.render_view(scene, &view, ViewOutput::Probe)
            .ok_or_else(|| RenderError::ReadbackFailed("probe view was not rendered".to_string()))?;
        self.read_probe_face()
    }

    fn install_cubemap(&mut self, faces: &[Image; 6]) -> Result<CubemapHandle> {
        self.resources
            .insert_cubemap(&self.wgpu_ctx.device, &self.wgpu_ctx.queue, faces)
    }

    fn release_cubemap(&mut self, handle: CubemapHandle) {
        if !self.resources.remove_cubemap(handle) {
            log::debug!("Cubemap {handle:?} was already released");
        }
    }
}
