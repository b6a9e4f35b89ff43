//! VPL Global Illumination Pass
//!
//! Approximates one bounce of indirect light by turning lit surface samples
//! into virtual point lights that the geometry pass evaluates per pixel.
//!
//! # Per view of each active light
//!
//! ```text
//! reserve quota in VplAllocator ──(refused)──► skip view
//!        │
//!        ▼
//! render light view → aux G-buffer 32² (world position, normal, flux)
//!        │
//!        ▼
//! vpl_inject kernel: ceil(n / 64) groups, invocation i < n writes
//!                    VplRecord[offset + i]
//! ```
//!
//! Point lights split the quota over their six faces (`quota / 6` each) and
//! stop at the first face that does not fit. Spot lights and the sun use the
//! whole quota in one view. The compute pass ends before the geometry pass
//! begins, which orders the buffer writes before the lighting reads.
//!
//! In [`VplMode::Static`] the records are generated once and reused until
//! the scene generation or the VPL settings change.

use glam::{Mat4, Vec3};

use crate::renderer::core::pipeline::{self, MeshPipelineDesc};
use crate::renderer::core::resources::{DrawBindings, storage_entry};
use crate::renderer::core::shaders::{self, ShaderId};
use crate::renderer::core::targets::VPL_AUX_FORMATS;
use crate::renderer::graph::context::{ExecuteContext, PrepareContext};
use crate::renderer::graph::cull::{DrawList, cull_scene};
use crate::renderer::graph::node::RenderNode;
use crate::renderer::graph::shadow_utils::{
    cube_face_view_projections, point_shadow_far, spot_view_projection, sun_view_projection,
};
use crate::resources::geometry::Vertex;
use crate::resources::uniforms::LightViewUniforms;
use crate::resources::vpl::{VPL_AUX_SIZE, VplAllocator, VplMode, VplSettings, vpl_dispatch_groups};
use crate::scene::light::LightKind;
use crate::scene::{Frustum, LightId, Scene};

// ============================================================================
// Planning (CPU only)
// ============================================================================

/// One light view that contributes VPLs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VplView {
    pub light: LightId,
    /// Cube face index for point lights.
    pub face: Option<u8>,
    pub view_projection: Mat4,
    /// First record written by this view.
    pub offset: u32,
    /// Records written by this view.
    pub count: u32,
    /// Records planned for the light over all of its views. Flux is
    /// normalized by this so a light's total injected flux does not depend
    /// on how many faces it was split into.
    pub light_quota: u32,
}

impl VplView {
    /// `LightViewUniforms::params` for the injection kernel.
    #[must_use]
    pub fn inject_params(&self) -> [u32; 4] {
        [self.offset, self.count, VPL_AUX_SIZE, self.light_quota]
    }
}

/// Splits the VPL budget over the scene's active lights in insertion order.
///
/// Every accepted view has already been reserved in `allocator`, so the sum
/// of all view counts equals `allocator.count()` and never exceeds its
/// capacity.
#[must_use]
pub fn plan_vpl_views(
    scene: &Scene,
    quota_per_light: u32,
    allocator: &mut VplAllocator,
    focus: Vec3,
    sun_shadow_distance: f32,
) -> Vec<VplView> {
    let mut views = Vec::new();
    for (id, light) in scene.lights() {
        if !light.is_active() || allocator.remaining() == 0 {
            continue;
        }
        match light.kind {
            LightKind::Point(_) => {
                let per_face = quota_per_light / 6;
                if per_face == 0 {
                    continue;
                }
                let faces = cube_face_view_projections(light.position, point_shadow_far(light));
                for (face, view_projection) in faces.into_iter().enumerate() {
                    let Some(offset) = allocator.try_reserve(per_face) else {
                        break;
                    };
                    views.push(VplView {
                        light: id,
                        face: Some(face as u8),
                        view_projection,
                        offset,
                        count: per_face,
                        light_quota: per_face * 6,
                    });
                }
            }
            LightKind::Spot(_) | LightKind::Directional(_) => {
                if quota_per_light == 0 {
                    continue;
                }
                let view_projection = match spot_view_projection(light) {
                    Some(vp) => vp,
                    None => sun_view_projection(light.direction(), focus, sun_shadow_distance),
                };
                let Some(offset) = allocator.try_reserve(quota_per_light) else {
                    continue;
                };
                views.push(VplView {
                    light: id,
                    face: None,
                    view_projection,
                    offset,
                    count: quota_per_light,
                    light_quota: quota_per_light,
                });
            }
        }
    }
    views
}

/// Inputs that invalidate cached static VPLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StaticKey {
    generation: u64,
    settings: VplSettings,
}

// ============================================================================
// Pass
// ============================================================================

struct PreparedView {
    view_offset: u32,
    count: u32,
    draws: DrawList,
}

pub struct VplPass {
    aux_pipeline: Option<wgpu::RenderPipeline>,
    inject_pipeline: Option<wgpu::ComputePipeline>,
    inject_layout: wgpu::BindGroupLayout,
    inject_bind_group: Option<wgpu::BindGroup>,

    views: Vec<PreparedView>,
    static_key: Option<StaticKey>,
    static_count: u32,
}

impl VplPass {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let aux_texture = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let inject_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("VPL Inject Layout"),
            entries: &[
                aux_texture(0),
                aux_texture(1),
                aux_texture(2),
                storage_entry(3, wgpu::ShaderStages::COMPUTE, false),
            ],
        });
        Self {
            aux_pipeline: None,
            inject_pipeline: None,
            inject_layout,
            inject_bind_group: None,
            views: Vec::new(),
            static_key: None,
            static_count: 0,
        }
    }

    fn ensure_pipelines(&mut self, ctx: &PrepareContext) {
        if self.aux_pipeline.is_some() {
            return;
        }
        let device = ctx.device();
        let resources = &*ctx.resources;

        let aux_module = shaders::create_module(device, ShaderId::VplAux);
        let aux_layout = pipeline::pipeline_layout(
            device,
            "VPL Aux Pipeline Layout",
            &[
                &resources.light_view_layout,
                &resources.object_layout,
                &resources.material_layout,
            ],
        );
        let targets = VPL_AUX_FORMATS.map(pipeline::replace_target);
        self.aux_pipeline = Some(pipeline::mesh_pipeline(
            device,
            &MeshPipelineDesc {
                label: "VPL Aux Pipeline",
                module: &aux_module,
                layout: &aux_layout,
                vertex_buffers: &[Vertex::layout()],
                vs_entry: "vs_main",
                fs_entry: Some("fs_main"),
                targets: &targets,
                depth: Some(pipeline::depth_state(true, wgpu::DepthBiasState::default())),
                // Point-light faces are mirrored; draw both windings.
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
            },
        ));

        let inject_module = shaders::create_module(device, ShaderId::VplInject);
        let inject_layout = pipeline::pipeline_layout(
            device,
            "VPL Inject Pipeline Layout",
            &[&resources.light_view_layout, &self.inject_layout],
        );
        self.inject_pipeline = Some(pipeline::compute_pipeline(
            device,
            "VPL Inject Pipeline",
            &inject_module,
            &inject_layout,
            "main",
        ));
    }

    /// Aux targets belong to the view's [`FrameTargets`], so the group is
    /// rebuilt for every view that injects.
    ///
    /// [`FrameTargets`]: crate::renderer::core::FrameTargets
    fn build_inject_group(&mut self, ctx: &PrepareContext) {
        let device = ctx.device();
        let resources = &*ctx.resources;
        let aux = &ctx.targets.vpl_aux;
        self.inject_bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("VPL Inject BindGroup"),
            layout: &self.inject_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&aux.position.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&aux.normal.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&aux.flux.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: resources.vpl_buffer.as_entire_binding(),
                },
            ],
        }));
    }
}

impl RenderNode for VplPass {
    fn name(&self) -> &'static str {
        "VPL Pass"
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        self.ensure_pipelines(ctx);
        self.views.clear();

        let settings = ctx.settings.vpl;
        let key = StaticKey {
            generation: ctx.scene.generation(),
            settings,
        };
        if settings.mode == VplMode::Static && self.static_key == Some(key) {
            ctx.blackboard.vpl_count = self.static_count;
            return;
        }

        let capacity = settings.max_vpls.min(ctx.resources.vpl_capacity);
        let mut allocator = VplAllocator::new(capacity);
        let scene = ctx.scene;
        let planned = plan_vpl_views(
            scene,
            settings.quota_per_light,
            &mut allocator,
            ctx.view.camera.position,
            ctx.settings.sun_shadow_distance,
        );

        for view in &planned {
            let Some(light) = scene.light(view.light) else {
                continue;
            };
            let (kind, far) = match light.kind {
                LightKind::Point(_) => (0.0, point_shadow_far(light)),
                LightKind::Spot(spot) => (1.0, spot.range),
                LightKind::Directional(_) => (2.0, 0.0),
            };
            let uniforms = LightViewUniforms {
                view_projection: view.view_projection,
                light_position: light.position.extend(far),
                light_color: (light.color * light.intensity).extend(kind),
                params: view.inject_params(),
                light_direction: light.direction().extend(0.0),
            };
            let draws = cull_scene(scene, &Frustum::from_matrix(view.view_projection));
            self.views.push(PreparedView {
                view_offset: ctx.resources.push_light_view(&uniforms),
                count: view.count,
                draws,
            });
        }

        if !self.views.is_empty() {
            self.build_inject_group(ctx);
        }
        ctx.blackboard.vpl_count = allocator.count();
        if settings.mode == VplMode::Static {
            self.static_key = Some(key);
            self.static_count = allocator.count();
            log::info!("Static VPLs generated: {} records", allocator.count());
        } else {
            self.static_key = None;
        }
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        let (Some(aux_pipeline), Some(inject_pipeline), Some(inject_group)) =
            (&self.aux_pipeline, &self.inject_pipeline, &self.inject_bind_group)
        else {
            return;
        };
        if self.views.is_empty() {
            return;
        }
        let aux = &ctx.targets.vpl_aux;
        let light_views = ctx.resources.light_view_bind_group();
        encoder.push_debug_group(self.name());

        for view in &self.views {
            {
                fn attachment(target: &wgpu::TextureView) -> Option<wgpu::RenderPassColorAttachment<'_>> {
                    Some(wgpu::RenderPassColorAttachment {
                        view: target,
                        depth_slice: None,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                            store: wgpu::StoreOp::Store,
                        },
                    })
                }
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("VPL Aux"),
                    color_attachments: &[
                        attachment(&aux.position.view),
                        attachment(&aux.normal.view),
                        attachment(&aux.flux.view),
                    ],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &aux.depth.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Discard,
                        }),
                        stencil_ops: None,
                    }),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                });
                pass.set_pipeline(aux_pipeline);
                pass.set_bind_group(0, light_views, &[view.view_offset]);
                ctx.resources.draw_items(
                    &mut pass,
                    &view.draws.items,
                    DrawBindings {
                        object_group: 1,
                        material_group: Some(2),
                        probe_group: None,
                    },
                );
            }

            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("VPL Inject"),
                timestamp_writes: None,
            });
            cpass.set_pipeline(inject_pipeline);
            cpass.set_bind_group(0, light_views, &[view.view_offset]);
            cpass.set_bind_group(1, inject_group, &[]);
            cpass.dispatch_workgroups(vpl_dispatch_groups(view.count), 1, 1);
        }

        encoder.pop_debug_group();
    }
}
