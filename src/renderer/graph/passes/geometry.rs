//! Geometry Pass
//!
//! Fills the G-buffer in two raster phases over the same visible draw list.
//!
//! 1. **Surface**: blended material layers, perturbed normal and velocity,
//!    with depth write. Decal quads are blended onto albedo afterwards.
//! 2. **Lit**: the same draws again with depth loaded (`LessEqual`, no
//!    write). Each fragment reads its surface back from phase 1, so decal
//!    tinting reaches the lit colour, then evaluates direct lighting
//!    (shadows, cookies, probe reflections) and VPL indirect light.
//!
//! Splitting keeps each phase within four attachments and 32 colour bytes
//! per sample.
//!
//! # Attachments
//!
//! | phase   | location | content                                   |
//! |---------|----------|-------------------------------------------|
//! | surface | 0        | albedo                                    |
//! | surface | 1        | view-space normal                         |
//! | surface | 2        | roughness, metallic, ao, height           |
//! | surface | 3        | velocity (uv delta)                       |
//! | lit     | 0        | view-space position, `w = 1` on geometry  |
//! | lit     | 1        | direct light                              |
//! | lit     | 2        | indirect (VPL) light                      |
//!
//! Every attachment is cleared to zero. Position `w = 0` marks pixels no
//! geometry touched; the skybox and composite use it as the sky mask.

use rustc_hash::FxHashMap;

use crate::renderer::core::pipeline::{self, MeshPipelineDesc};
use crate::renderer::core::resources::{DrawBindings, lighting_layout_entries, texture_entry};
use crate::renderer::core::shaders::{self, ShaderId};
use crate::renderer::core::targets::{LIT_FORMATS, RenderTarget, SURFACE_FORMATS, attachment_issues};
use crate::renderer::graph::context::{ExecuteContext, PrepareContext, ViewKind};
use crate::renderer::graph::cull::{DrawList, cull_scene_into};
use crate::renderer::graph::node::RenderNode;
use crate::resources::geometry::Vertex;

/// Rasterizer state a pipeline variant is keyed on.
type RasterKey = (Option<wgpu::Face>, wgpu::PolygonMode);

/// First lit-group binding after the shared lighting entries.
const SURFACE_BINDING: u32 = 8;

struct PhasePipelines {
    surface: wgpu::RenderPipeline,
    lit: wgpu::RenderPipeline,
}

pub struct GeometryPass {
    pipelines: FxHashMap<RasterKey, PhasePipelines>,
    decal_pipeline: Option<wgpu::RenderPipeline>,
    /// Lighting entries plus the surface attachments, read by the lit phase.
    lit_layout: Option<wgpu::BindGroupLayout>,
    lit_group: Option<wgpu::BindGroup>,
    active: Option<RasterKey>,
    draws: DrawList,
    warned_wireframe: bool,
    limits_ok: Option<bool>,
}

impl GeometryPass {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pipelines: FxHashMap::default(),
            decal_pipeline: None,
            lit_layout: None,
            lit_group: None,
            active: None,
            draws: DrawList::default(),
            warned_wireframe: false,
            limits_ok: None,
        }
    }

    fn raster_key(&mut self, ctx: &PrepareContext) -> RasterKey {
        let mut cull = ctx.settings.face_culling.to_wgpu();
        if ctx.view.kind == ViewKind::ProbeFace {
            cull = cull.map(|face| match face {
                wgpu::Face::Back => wgpu::Face::Front,
                wgpu::Face::Front => wgpu::Face::Back,
            });
        }
        let polygon = if ctx.settings.wireframe {
            if ctx.wgpu_ctx.supports_wireframe {
                wgpu::PolygonMode::Line
            } else {
                if !self.warned_wireframe {
                    log::warn!("Wireframe requested but POLYGON_MODE_LINE is unsupported; drawing filled");
                    self.warned_wireframe = true;
                }
                wgpu::PolygonMode::Fill
            }
        } else {
            wgpu::PolygonMode::Fill
        };
        (cull, polygon)
    }

    /// Checks both phases against the device limits once. A device that
    /// cannot take either attachment set gets no geometry pipelines at all.
    fn supported(&mut self, limits: &wgpu::Limits) -> bool {
        *self.limits_ok.get_or_insert_with(|| {
            let issues: Vec<_> = attachment_issues("GBuffer Surface", &SURFACE_FORMATS, limits)
                .into_iter()
                .chain(attachment_issues("GBuffer Lit", &LIT_FORMATS, limits))
                .collect();
            for issue in &issues {
                log::error!("Geometry pass disabled: {issue}");
            }
            issues.is_empty()
        })
    }

    fn ensure_lit_layout(&mut self, device: &wgpu::Device) {
        if self.lit_layout.is_some() {
            return;
        }
        let mut entries = lighting_layout_entries();
        entries.extend((0..3).map(|i| texture_entry(SURFACE_BINDING + i, wgpu::ShaderStages::FRAGMENT)));
        self.lit_layout = Some(device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Geometry Lit Layout"),
            entries: &entries,
        }));
    }

    fn ensure_pipelines(&mut self, ctx: &PrepareContext, key: RasterKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        let device = ctx.device();
        self.ensure_lit_layout(device);
        let Some(lit_layout) = &self.lit_layout else {
            return;
        };
        let resources = &*ctx.resources;
        let module = shaders::create_module(device, ShaderId::Geometry);

        let surface_layout = pipeline::pipeline_layout(
            device,
            "Geometry Surface Layout",
            &[
                &resources.lighting_layout,
                &resources.object_layout,
                &resources.material_layout,
            ],
        );
        let surface_targets = SURFACE_FORMATS.map(pipeline::replace_target);
        let surface = pipeline::mesh_pipeline(
            device,
            &MeshPipelineDesc {
                label: "Geometry Surface Pipeline",
                module: &module,
                layout: &surface_layout,
                vertex_buffers: &[Vertex::layout()],
                vs_entry: "vs_main",
                fs_entry: Some("fs_surface"),
                targets: &surface_targets,
                depth: Some(pipeline::depth_state(true, wgpu::DepthBiasState::default())),
                cull_mode: key.0,
                polygon_mode: key.1,
            },
        );

        let lit_pipeline_layout = pipeline::pipeline_layout(
            device,
            "Geometry Lit Layout",
            &[
                lit_layout,
                &resources.object_layout,
                &resources.material_layout,
                &resources.probe_layout,
            ],
        );
        let lit_targets = LIT_FORMATS.map(pipeline::replace_target);
        let lit = pipeline::mesh_pipeline(
            device,
            &MeshPipelineDesc {
                label: "Geometry Lit Pipeline",
                module: &module,
                layout: &lit_pipeline_layout,
                vertex_buffers: &[Vertex::layout()],
                vs_entry: "vs_main",
                fs_entry: Some("fs_lit"),
                targets: &lit_targets,
                depth: Some(pipeline::depth_state(false, wgpu::DepthBiasState::default())),
                cull_mode: key.0,
                polygon_mode: key.1,
            },
        );
        log::debug!("Geometry pipelines created for {key:?}");
        self.pipelines.insert(key, PhasePipelines { surface, lit });
    }

    fn ensure_decal_pipeline(&mut self, ctx: &PrepareContext) {
        if self.decal_pipeline.is_some() {
            return;
        }
        let device = ctx.device();
        let resources = &*ctx.resources;
        let module = shaders::create_module(device, ShaderId::Decal);
        let layout = pipeline::pipeline_layout(
            device,
            "Decal Pipeline Layout",
            &[&resources.lighting_layout, &resources.object_layout, &resources.material_layout],
        );
        // Only albedo is written; the lit phase picks the tint up from there.
        let targets: Vec<Option<wgpu::ColorTargetState>> = SURFACE_FORMATS
            .iter()
            .enumerate()
            .map(|(i, format)| {
                Some(wgpu::ColorTargetState {
                    format: *format,
                    blend: (i == 0).then_some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: if i == 0 {
                        wgpu::ColorWrites::COLOR
                    } else {
                        wgpu::ColorWrites::empty()
                    },
                })
            })
            .collect();
        self.decal_pipeline = Some(pipeline::mesh_pipeline(
            device,
            &MeshPipelineDesc {
                label: "Decal Pipeline",
                module: &module,
                layout: &layout,
                vertex_buffers: &[Vertex::layout()],
                vs_entry: "vs_main",
                fs_entry: Some("fs_main"),
                targets: &targets,
                depth: Some(pipeline::depth_state(
                    false,
                    wgpu::DepthBiasState {
                        constant: -2,
                        slope_scale: -1.0,
                        clamp: 0.0,
                    },
                )),
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
            },
        ));
    }

    fn build_lit_group(&mut self, ctx: &PrepareContext) {
        let Some(layout) = &self.lit_layout else {
            self.lit_group = None;
            return;
        };
        let gbuffer = &ctx.targets.gbuffer;
        let mut entries = ctx.resources.lighting_entries().to_vec();
        for (binding, target) in (SURFACE_BINDING..).zip([&gbuffer.albedo, &gbuffer.normal, &gbuffer.pbr]) {
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(&target.view),
            });
        }
        self.lit_group = Some(ctx.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Geometry Lit BindGroup"),
            layout,
            entries: &entries,
        }));
    }
}

impl Default for GeometryPass {
    fn default() -> Self {
        Self::new()
    }
}

fn cleared_attachments<'a>(
    targets: impl IntoIterator<Item = &'a RenderTarget>,
) -> Vec<Option<wgpu::RenderPassColorAttachment<'a>>> {
    targets
        .into_iter()
        .map(|target| {
            Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })
        })
        .collect()
}

impl RenderNode for GeometryPass {
    fn name(&self) -> &'static str {
        "Geometry Pass"
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        self.active = None;
        if !self.supported(&ctx.wgpu_ctx.limits) {
            return;
        }
        let key = self.raster_key(ctx);
        self.ensure_pipelines(ctx, key);
        self.ensure_decal_pipeline(ctx);
        self.build_lit_group(ctx);
        self.active = Some(key);

        let frustum = ctx.view.camera.frustum();
        cull_scene_into(ctx.scene, &frustum, &mut self.draws);
        log::trace!("Geometry pass: {} visible drawables", self.draws.len());
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        let (Some(pipelines), Some(lit_group)) = (self.active.and_then(|key| self.pipelines.get(&key)), &self.lit_group)
        else {
            return;
        };
        let gbuffer = &ctx.targets.gbuffer;
        encoder.push_debug_group(self.name());

        {
            let attachments = cleared_attachments(gbuffer.surface_targets());
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Geometry Surface"),
                color_attachments: &attachments,
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &gbuffer.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            pass.set_pipeline(&pipelines.surface);
            pass.set_bind_group(0, &ctx.resources.lighting_bind_group, &[]);
            ctx.resources.draw_items(
                &mut pass,
                &self.draws.items,
                DrawBindings {
                    object_group: 1,
                    material_group: Some(2),
                    probe_group: None,
                },
            );

            if let Some(decal_pipeline) = &self.decal_pipeline
                && ctx.resources.decal_count() > 0
            {
                pass.set_pipeline(decal_pipeline);
                ctx.resources.draw_decals(
                    &mut pass,
                    DrawBindings {
                        object_group: 1,
                        material_group: Some(2),
                        probe_group: None,
                    },
                );
            }
        }

        {
            let attachments = cleared_attachments(gbuffer.lit_targets());
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Geometry Lit"),
                color_attachments: &attachments,
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &gbuffer.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            pass.set_pipeline(&pipelines.lit);
            pass.set_bind_group(0, lit_group, &[]);
            ctx.resources.draw_items(
                &mut pass,
                &self.draws.items,
                DrawBindings {
                    object_group: 1,
                    material_group: Some(2),
                    probe_group: Some(3),
                },
            );
        }

        encoder.pop_debug_group();
    }
}
