//! Shadow Pass
//!
//! Renders depth for every shadow-casting light and uploads the light table
//! read by the geometry pass.
//!
//! # Per-light states
//!
//! | light                         | shadow                              |
//! |-------------------------------|-------------------------------------|
//! | intensity ≤ 0                 | skipped (not even in the table)     |
//! | point, casts shadows          | 6 face passes into the cube array   |
//! | spot, casts shadows           | 1 perspective pass, front culling   |
//! | first directional (the sun)   | 1 orthographic pass into layer 0    |
//!
//! Point faces write `distance / far` so the lighting shader compares
//! against the light-to-fragment distance directly. Each face, spot and sun
//! view is culled against its own frustum.

use crate::renderer::core::pipeline::{self, MeshPipelineDesc};
use crate::renderer::core::resources::{DrawBindings, MAX_LIGHTS};
use crate::renderer::core::shaders::{self, ShaderId};
use crate::renderer::graph::context::{ExecuteContext, PrepareContext};
use crate::renderer::graph::cull::{DrawList, cull_scene};
use crate::renderer::graph::node::RenderNode;
use crate::renderer::graph::shadow_utils::{
    cube_face_view_projections, point_shadow_far, spot_view_projection, sun_view_projection,
};
use crate::resources::geometry::Vertex;
use crate::resources::uniforms::{GpuLight, LightViewUniforms};
use crate::scene::Frustum;
use crate::scene::light::LightKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShadowTarget {
    /// Layer of the cube array (`6 × cube + face`).
    CubeFace(u32),
    /// Layer of the planar array.
    Planar(u32),
}

struct ShadowJob {
    view_offset: u32,
    target: ShadowTarget,
    draws: DrawList,
}

pub struct ShadowPass {
    point_pipeline: Option<wgpu::RenderPipeline>,
    planar_pipeline: Option<wgpu::RenderPipeline>,
    jobs: Vec<ShadowJob>,
    lights: Vec<GpuLight>,
    warned_overflow: bool,
}

impl ShadowPass {
    #[must_use]
    pub fn new() -> Self {
        Self {
            point_pipeline: None,
            planar_pipeline: None,
            jobs: Vec::new(),
            lights: Vec::with_capacity(MAX_LIGHTS),
            warned_overflow: false,
        }
    }

    fn ensure_pipelines(&mut self, ctx: &PrepareContext) {
        if self.point_pipeline.is_some() {
            return;
        }
        let device = ctx.device();
        let module = shaders::create_module(device, ShaderId::Shadow);
        let layout = pipeline::pipeline_layout(
            device,
            "Shadow Pipeline Layout",
            &[&ctx.resources.light_view_layout, &ctx.resources.object_layout],
        );
        let vertex_buffers = [Vertex::layout()];

        self.point_pipeline = Some(pipeline::mesh_pipeline(
            device,
            &MeshPipelineDesc {
                label: "Point Shadow Pipeline",
                module: &module,
                layout: &layout,
                vertex_buffers: &vertex_buffers,
                vs_entry: "vs_main",
                fs_entry: Some("fs_point"),
                targets: &[],
                depth: Some(pipeline::depth_state(true, wgpu::DepthBiasState::default())),
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
            },
        ));
        self.planar_pipeline = Some(pipeline::mesh_pipeline(
            device,
            &MeshPipelineDesc {
                label: "Planar Shadow Pipeline",
                module: &module,
                layout: &layout,
                vertex_buffers: &vertex_buffers,
                vs_entry: "vs_main",
                fs_entry: None,
                targets: &[],
                depth: Some(pipeline::depth_state(
                    true,
                    wgpu::DepthBiasState {
                        constant: 2,
                        slope_scale: 2.0,
                        clamp: 0.0,
                    },
                )),
                // Front faces culled to reduce peter-panning.
                cull_mode: Some(wgpu::Face::Front),
                polygon_mode: wgpu::PolygonMode::Fill,
            },
        ));
    }

    fn push_job(ctx: &mut PrepareContext, jobs: &mut Vec<ShadowJob>, view: &LightViewUniforms, target: ShadowTarget) {
        let frustum = Frustum::from_matrix(view.view_projection);
        let draws = cull_scene(ctx.scene, &frustum);
        let view_offset = ctx.resources.push_light_view(view);
        jobs.push(ShadowJob {
            view_offset,
            target,
            draws,
        });
    }
}

impl Default for ShadowPass {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderNode for ShadowPass {
    fn name(&self) -> &'static str {
        "Shadow Pass"
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        self.ensure_pipelines(ctx);
        self.jobs.clear();
        self.lights.clear();

        let shadows = ctx.settings.shadows;
        ctx.resources.shadow_atlas.slots.sync(ctx.scene, shadows);

        let mut jobs = std::mem::take(&mut self.jobs);
        let scene = ctx.scene;
        let focus = ctx.view.camera.position;
        ctx.blackboard.sun_direction = None;

        for (id, light) in scene.lights() {
            if !light.is_active() {
                continue;
            }
            if self.lights.len() >= MAX_LIGHTS {
                if !self.warned_overflow {
                    log::warn!("More than {MAX_LIGHTS} active lights; extra lights are ignored");
                    self.warned_overflow = true;
                }
                break;
            }

            let mut gpu = GpuLight::from_light(light);
            if let Some(layer) = ctx.resources.cookies.layer(id) {
                gpu.extra.x = layer as f32;
            }

            let slots = &ctx.resources.shadow_atlas.slots;
            let (cube_layer, planar_layer, is_sun) =
                (slots.cube_layer(id), slots.planar_layer(id), slots.sun() == Some(id));
            let base = LightViewUniforms {
                view_projection: glam::Mat4::IDENTITY,
                light_position: light.position.extend(0.0),
                light_color: (light.color * light.intensity).extend(0.0),
                params: [0; 4],
                light_direction: light.direction().extend(0.0),
            };

            match light.kind {
                LightKind::Point(_) => {
                    if let Some(cube) = cube_layer {
                        let far = point_shadow_far(light);
                        gpu.cone_shadow.w = cube as f32;
                        gpu.extra.y = far;
                        for (face, vp) in cube_face_view_projections(light.position, far).into_iter().enumerate() {
                            let view = LightViewUniforms {
                                view_projection: vp,
                                light_position: light.position.extend(far),
                                ..base
                            };
                            Self::push_job(ctx, &mut jobs, &view, ShadowTarget::CubeFace(cube * 6 + face as u32));
                        }
                    }
                }
                LightKind::Spot(_) => {
                    let vp = spot_view_projection(light);
                    // Cookies project through the cone even without a shadow.
                    if let Some(vp) = vp {
                        gpu.shadow_matrix = vp;
                    }
                    if let (Some(layer), Some(vp)) = (planar_layer, vp) {
                        gpu.cone_shadow.w = layer as f32;
                        let view = LightViewUniforms {
                            view_projection: vp,
                            ..base
                        };
                        Self::push_job(ctx, &mut jobs, &view, ShadowTarget::Planar(layer));
                    }
                }
                LightKind::Directional(_) => {
                    if is_sun {
                        let vp = sun_view_projection(light.direction(), focus, ctx.settings.sun_shadow_distance);
                        gpu.cone_shadow.w = 0.0;
                        gpu.shadow_matrix = vp;
                        ctx.blackboard.sun_direction = Some(light.direction());
                        let view = LightViewUniforms {
                            view_projection: vp,
                            ..base
                        };
                        Self::push_job(ctx, &mut jobs, &view, ShadowTarget::Planar(0));
                    } else if ctx.blackboard.sun_direction.is_none() {
                        ctx.blackboard.sun_direction = Some(light.direction());
                    }
                }
            }
            self.lights.push(gpu);
        }

        self.jobs = jobs;
        ctx.blackboard.light_count = self.lights.len() as u32;
        if !self.lights.is_empty() {
            ctx.queue()
                .write_buffer(&ctx.resources.light_buffer, 0, bytemuck::cast_slice(&self.lights));
        }
        log::trace!(
            "Shadow pass: {} lights, {} depth views",
            self.lights.len(),
            self.jobs.len()
        );
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        let (Some(point), Some(planar)) = (&self.point_pipeline, &self.planar_pipeline) else {
            return;
        };
        let atlas = &ctx.resources.shadow_atlas;
        encoder.push_debug_group(self.name());
        for job in &self.jobs {
            let (view, pipeline) = match job.target {
                ShadowTarget::CubeFace(layer) => (atlas.cube_face_views.get(layer as usize), point),
                ShadowTarget::Planar(layer) => (atlas.planar_layer_views.get(layer as usize), planar),
            };
            let Some(view) = view else { continue };

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Depth"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view,
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
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, ctx.resources.light_view_bind_group(), &[job.view_offset]);
            ctx.resources.draw_items(
                &mut pass,
                &job.draws.items,
                DrawBindings {
                    object_group: 1,
                    material_group: None,
                    probe_group: None,
                },
            );
        }
        encoder.pop_debug_group();
    }
}
