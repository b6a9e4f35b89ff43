//! GPU Resource Manager
//!
//! Owns every GPU resource that outlives a single pass: mesh and brush
//! buffers, material textures (with fallbacks), probe cubemaps, the shadow
//! and cookie atlases, the shared storage buffers (lights, VPLs, histogram,
//! exposure) and the per-view dynamic uniform buffers.
//!
//! # Per-view flow
//!
//! ```text
//! prepare_scene()            uploads new meshes / textures, writes one
//!        │                   ObjectUniforms per drawable, resolves materials
//!        ▼
//! passes.prepare()           push light views, fill storage buffers
//!        │
//!        ▼
//! flush_light_views()        upload light views (rebind if grown)
//!        │
//!        ▼
//! passes.run()               draw_items() binds per-draw groups
//! ```

pub mod allocator;
pub mod shadow_atlas;
pub mod texture;

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use wgpu::util::DeviceExt;

use crate::errors::Result;
use crate::renderer::graph::cull::DrawItem;
use crate::renderer::settings::RenderSettings;
use crate::resources::geometry::{BoundingBox, Mesh, Vertex};
use crate::resources::material::{MAX_MATERIAL_LAYERS, MaterialLayer, MaterialLayers, ResolvedMaterial};
use crate::resources::texture::{Image, TextureQuality, TextureSlot, TextureSource};
use crate::resources::tone_mapping::{HISTOGRAM_BINS, NEUTRAL_EXPOSURE};
use crate::resources::uniforms::{
    ExposureValue, FrameUniforms, GpuLight, LightViewUniforms, ObjectUniforms, PostUniforms,
    VplRecord,
};
use crate::scene::{CubemapHandle, MeshHandle, Scene, TextureHandle};

use allocator::{DynamicUniforms, dynamic_uniform_entry};
use shadow_atlas::{CookieAtlas, ShadowAtlas};
use texture::{GpuCubemap, GpuTexture, Samplers};

/// Capacity of the light storage buffer.
pub const MAX_LIGHTS: usize = 64;

// ============================================================================
// GPU-side records
// ============================================================================

#[derive(Debug)]
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    #[must_use]
    pub fn new(device: &wgpu::Device, vertices: &[Vertex], indices: &[u32], label: &str) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }
    }
}

/// Everything needed to issue one draw, resolved once per view.
#[derive(Debug, Clone, Copy)]
pub struct DrawRecord {
    /// Scene mesh for objects; `None` for brushes and decals.
    pub mesh: Option<MeshHandle>,
    pub uniform_offset: u32,
    pub material: ResolvedMaterial,
    /// Probe cubemap applied to this drawable, if any.
    pub cubemap: Option<CubemapHandle>,
    pub bounds: BoundingBox,
}

/// Bind group slots used by [`ResourceManager::draw_items`].
#[derive(Debug, Clone, Copy)]
pub struct DrawBindings {
    pub object_group: u32,
    pub material_group: Option<u32>,
    pub probe_group: Option<u32>,
}

// ============================================================================
// ResourceManager
// ============================================================================

pub struct ResourceManager {
    pub samplers: Samplers,

    // --- Layouts shared across passes ---
    pub material_layout: wgpu::BindGroupLayout,
    pub object_layout: wgpu::BindGroupLayout,
    pub probe_layout: wgpu::BindGroupLayout,
    pub light_view_layout: wgpu::BindGroupLayout,
    /// Frame + post uniforms + exposure (screen-space passes).
    pub frame_layout: wgpu::BindGroupLayout,
    /// Frame uniforms, lights, VPLs, shadow maps and cookies.
    pub lighting_layout: wgpu::BindGroupLayout,

    // --- Shared buffers ---
    pub frame_uniforms: wgpu::Buffer,
    pub post_uniforms: wgpu::Buffer,
    pub light_buffer: wgpu::Buffer,
    pub vpl_buffer: wgpu::Buffer,
    pub vpl_capacity: u32,
    pub histogram_buffer: wgpu::Buffer,
    pub exposure_buffer: wgpu::Buffer,

    pub frame_bind_group: wgpu::BindGroup,
    pub lighting_bind_group: wgpu::BindGroup,

    // --- Per-view dynamic uniforms ---
    object_uniforms: DynamicUniforms<ObjectUniforms>,
    object_bind_group: wgpu::BindGroup,
    light_views: DynamicUniforms<LightViewUniforms>,
    light_view_bind_group: wgpu::BindGroup,

    // --- Atlases ---
    pub shadow_atlas: ShadowAtlas,
    pub cookies: CookieAtlas,

    // --- Scene assets ---
    meshes: FxHashMap<MeshHandle, GpuMesh>,
    brushes: Vec<Option<GpuMesh>>,
    brush_generation: Option<u64>,
    textures: FxHashMap<TextureHandle, GpuTexture>,
    texture_quality: TextureQuality,
    fallbacks: [GpuTexture; 3],
    materials: FxHashMap<ResolvedMaterial, wgpu::BindGroup>,
    cubemaps: SlotMap<CubemapHandle, GpuCubemap>,
    fallback_cube: GpuCubemap,
    probe_groups: FxHashMap<Option<CubemapHandle>, wgpu::BindGroup>,

    /// Unit quad shared by every decal.
    decal_quad: GpuMesh,
    object_records: Vec<Option<DrawRecord>>,
    brush_records: Vec<Option<DrawRecord>>,
    decal_records: Vec<DrawRecord>,
}

impl ResourceManager {
    #[must_use]
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, settings: &RenderSettings) -> Self {
        let samplers = Samplers::new(device);

        // --- Layouts ---
        let mut material_entries: Vec<wgpu::BindGroupLayoutEntry> = (0..(MAX_MATERIAL_LAYERS * 3)
            as u32)
            .map(|binding| texture_entry(binding, wgpu::ShaderStages::VERTEX_FRAGMENT))
            .collect();
        material_entries.push(sampler_entry(
            (MAX_MATERIAL_LAYERS * 3) as u32,
            wgpu::ShaderStages::VERTEX_FRAGMENT,
            wgpu::SamplerBindingType::Filtering,
        ));
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Layout"),
            entries: &material_entries,
        });

        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object Layout"),
            entries: &[dynamic_uniform_entry::<ObjectUniforms>(
                0,
                wgpu::ShaderStages::VERTEX_FRAGMENT,
            )],
        });

        let probe_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Probe Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                sampler_entry(1, wgpu::ShaderStages::FRAGMENT, wgpu::SamplerBindingType::Filtering),
            ],
        });

        let light_view_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Light View Layout"),
            entries: &[dynamic_uniform_entry::<LightViewUniforms>(
                0,
                wgpu::ShaderStages::VERTEX_FRAGMENT | wgpu::ShaderStages::COMPUTE,
            )],
        });

        let screen_stages = wgpu::ShaderStages::VERTEX_FRAGMENT | wgpu::ShaderStages::COMPUTE;
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Layout"),
            entries: &[
                uniform_entry(0, screen_stages),
                uniform_entry(1, screen_stages),
                storage_entry(2, wgpu::ShaderStages::FRAGMENT | wgpu::ShaderStages::COMPUTE, true),
            ],
        });

        let lighting_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Lighting Layout"),
            entries: &lighting_layout_entries(),
        });

        // --- Buffers ---
        let frame_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let post_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Post Uniforms"),
            size: std::mem::size_of::<PostUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let light_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Light Storage"),
            size: (std::mem::size_of::<GpuLight>() * MAX_LIGHTS) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let vpl_capacity = settings.vpl.max_vpls.max(1);
        let vpl_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("VPL Storage"),
            size: std::mem::size_of::<VplRecord>() as u64 * u64::from(vpl_capacity),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let histogram_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Luminance Histogram"),
            size: (HISTOGRAM_BINS * std::mem::size_of::<u32>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let exposure_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Exposure Value"),
            contents: bytemuck::bytes_of(&ExposureValue {
                exposure: NEUTRAL_EXPOSURE,
                average_luminance: 0.18,
                _pad: [0.0; 2],
            }),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
        });

        let shadow_atlas = ShadowAtlas::new(device, settings.shadow_map_size, settings.max_shadowed_lights);
        let cookies = CookieAtlas::new(device);

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame BindGroup"),
            layout: &frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame_uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: post_uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: exposure_buffer.as_entire_binding(),
                },
            ],
        });

        let lighting_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Lighting BindGroup"),
            layout: &lighting_layout,
            entries: &lighting_group_entries(
                &frame_uniforms,
                &light_buffer,
                &vpl_buffer,
                &shadow_atlas,
                &cookies,
                &samplers,
            ),
        });

        let object_uniforms = DynamicUniforms::new(device, "Object Uniforms", 256);
        let object_bind_group = Self::build_dynamic_group(device, &object_layout, &object_uniforms, "Object BindGroup");
        let light_views = DynamicUniforms::new(device, "Light View Uniforms", 64);
        let light_view_bind_group = Self::build_dynamic_group(device, &light_view_layout, &light_views, "Light View BindGroup");

        let fallbacks = [TextureSlot::Albedo, TextureSlot::Normal, TextureSlot::Pbr]
            .map(|slot| GpuTexture::from_image(device, queue, &slot.fallback_image(), "Fallback Texture"));

        Self {
            samplers,
            material_layout,
            object_layout,
            probe_layout,
            light_view_layout,
            frame_layout,
            lighting_layout,
            frame_uniforms,
            post_uniforms,
            light_buffer,
            vpl_buffer,
            vpl_capacity,
            histogram_buffer,
            exposure_buffer,
            frame_bind_group,
            lighting_bind_group,
            object_uniforms,
            object_bind_group,
            light_views,
            light_view_bind_group,
            shadow_atlas,
            cookies,
            meshes: FxHashMap::default(),
            brushes: Vec::new(),
            brush_generation: None,
            textures: FxHashMap::default(),
            texture_quality: settings.texture_quality,
            fallbacks,
            materials: FxHashMap::default(),
            cubemaps: SlotMap::with_key(),
            fallback_cube: GpuCubemap::fallback(device, queue),
            probe_groups: FxHashMap::default(),
            decal_quad: {
                let quad = Mesh::quad();
                GpuMesh::new(device, quad.vertices(), quad.indices(), "Decal Quad")
            },
            object_records: Vec::new(),
            brush_records: Vec::new(),
            decal_records: Vec::new(),
        }
    }

    /// Entries of [`Self::lighting_bind_group`], for passes that extend the
    /// lighting group with bindings of their own.
    #[must_use]
    pub fn lighting_entries(&self) -> [wgpu::BindGroupEntry<'_>; 8] {
        lighting_group_entries(
            &self.frame_uniforms,
            &self.light_buffer,
            &self.vpl_buffer,
            &self.shadow_atlas,
            &self.cookies,
            &self.samplers,
        )
    }

    fn build_dynamic_group<T: bytemuck::Pod>(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniforms: &DynamicUniforms<T>,
        label: &str,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.binding(),
            }],
        })
    }

    // =========================================================================
    // Scene upload
    // =========================================================================

    /// Uploads whatever the scene added since the last view and writes this
    /// view's per-object uniforms.
    pub fn prepare_scene(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &Scene,
        texture_quality: TextureQuality,
    ) {
        if texture_quality != self.texture_quality {
            log::info!("Texture quality changed to {texture_quality:?}; re-uploading textures");
            self.textures.clear();
            self.materials.clear();
            self.texture_quality = texture_quality;
        }

        // Textures removed from the scene: drop their GPU copy and every
        // material bind group that might reference it.
        let before = self.textures.len();
        self.textures.retain(|handle, _| scene.textures().contains_key(*handle));
        if self.textures.len() != before {
            self.materials.clear();
        }
        self.probe_groups.retain(|handle, _| handle.is_none_or(|h| self.cubemaps.contains_key(h)));

        self.sync_brushes(device, scene);
        self.cookies.sync(queue, scene);

        self.object_uniforms.reset();
        self.object_records.clear();
        self.brush_records.clear();

        for object in &scene.objects {
            let record = scene.mesh(object.mesh).map(|mesh| {
                self.meshes
                    .entry(object.mesh)
                    .or_insert_with(|| GpuMesh::new(device, mesh.vertices(), mesh.indices(), "Object Mesh"));
                let material = object.layers.resolve(scene);
                let (cubemap, probe) = Self::probe_at(scene, object.position());
                let mut uniforms = ObjectUniforms::new(object.transform, material.layer_count);
                if let Some(bounds) = probe {
                    uniforms = uniforms.with_probe(bounds.min, bounds.max);
                }
                DrawRecord {
                    mesh: Some(object.mesh),
                    uniform_offset: self.object_uniforms.push(&uniforms),
                    material,
                    cubemap,
                    bounds: object.world_bounds(&mesh.bounds()),
                }
            });
            self.object_records.push(record);
        }

        for brush in &scene.brushes {
            let record = (!brush.indices.is_empty()).then(|| {
                let bounds = brush.bounds();
                let material = brush.layers.resolve(scene);
                let (cubemap, probe) = Self::probe_at(scene, bounds.center());
                let mut uniforms = ObjectUniforms::new(glam::Mat4::IDENTITY, material.layer_count);
                if let Some(probe) = probe {
                    uniforms = uniforms.with_probe(probe.min, probe.max);
                }
                DrawRecord {
                    mesh: None,
                    uniform_offset: self.object_uniforms.push(&uniforms),
                    material,
                    cubemap,
                    bounds,
                }
            });
            self.brush_records.push(record);
        }

        self.decal_records.clear();
        for decal in &scene.decals {
            let layer = decal.texture.map(MaterialLayer::albedo).unwrap_or_default();
            let material = MaterialLayers::single(layer).resolve(scene);
            let mut uniforms = ObjectUniforms::new(decal.transform, 1);
            uniforms.params.z = decal.opacity.clamp(0.0, 1.0);
            self.decal_records.push(DrawRecord {
                mesh: None,
                uniform_offset: self.object_uniforms.push(&uniforms),
                material,
                cubemap: None,
                bounds: BoundingBox::new(glam::Vec3::splat(-0.5), glam::Vec3::splat(0.5))
                    .transformed(&decal.transform),
            });
        }

        if self.object_uniforms.flush(device, queue) {
            self.object_bind_group =
                Self::build_dynamic_group(device, &self.object_layout, &self.object_uniforms, "Object BindGroup");
        }

        let records: Vec<DrawRecord> = self
            .object_records
            .iter()
            .chain(self.brush_records.iter())
            .flatten()
            .chain(self.decal_records.iter())
            .copied()
            .collect();
        for record in records {
            self.ensure_material(device, queue, scene, &record.material);
            self.ensure_probe_group(device, record.cubemap);
        }
        self.ensure_probe_group(device, None);
    }

    /// Probe applied at `point`: the first probe brush (scan order) whose
    /// bounds contain it. The cubemap is `None` until the probe is baked.
    fn probe_at(scene: &Scene, point: glam::Vec3) -> (Option<CubemapHandle>, Option<BoundingBox>) {
        let Some(index) = scene.find_probe(point) else {
            return (None, None);
        };
        let brush = &scene.brushes[index];
        match brush.probe.as_ref().and_then(|p| p.cubemap) {
            Some(cubemap) => (Some(cubemap), Some(brush.bounds())),
            None => (None, None),
        }
    }

    fn sync_brushes(&mut self, device: &wgpu::Device, scene: &Scene) {
        if self.brush_generation == Some(scene.generation()) && self.brushes.len() == scene.brushes.len() {
            return;
        }
        log::debug!("Uploading {} brushes (generation {})", scene.brushes.len(), scene.generation());
        self.brushes = scene
            .brushes
            .iter()
            .map(|b| (!b.indices.is_empty()).then(|| GpuMesh::new(device, &b.vertices, &b.indices, "Brush Mesh")))
            .collect();
        self.brush_generation = Some(scene.generation());
    }

    fn texture_view(&self, source: TextureSource) -> &wgpu::TextureView {
        match source {
            TextureSource::Scene(handle) => match self.textures.get(&handle) {
                Some(texture) => &texture.view,
                None => &self.fallbacks[0].view,
            },
            TextureSource::Fallback(TextureSlot::Albedo) => &self.fallbacks[0].view,
            TextureSource::Fallback(TextureSlot::Normal) => &self.fallbacks[1].view,
            TextureSource::Fallback(TextureSlot::Pbr) => &self.fallbacks[2].view,
        }
    }

    fn ensure_material(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &Scene, material: &ResolvedMaterial) {
        if self.materials.contains_key(material) {
            return;
        }
        let max_dimension = self.texture_quality.max_dimension();
        for source in material.sources.iter().flatten() {
            if let TextureSource::Scene(handle) = source
                && !self.textures.contains_key(handle)
                && let Some(image) = scene.textures().get(*handle)
            {
                let image = image.limited_to(max_dimension);
                self.textures
                    .insert(*handle, GpuTexture::from_image(device, queue, &image, "Material Texture"));
            }
        }

        let mut entries: Vec<wgpu::BindGroupEntry> = material
            .sources
            .iter()
            .flatten()
            .enumerate()
            .map(|(binding, source)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: wgpu::BindingResource::TextureView(self.texture_view(*source)),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: (MAX_MATERIAL_LAYERS * 3) as u32,
            resource: wgpu::BindingResource::Sampler(&self.samplers.linear_repeat),
        });
        let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material BindGroup"),
            layout: &self.material_layout,
            entries: &entries,
        });
        self.materials.insert(*material, group);
    }

    fn ensure_probe_group(&mut self, device: &wgpu::Device, cubemap: Option<CubemapHandle>) {
        if self.probe_groups.contains_key(&cubemap) {
            return;
        }
        let view = cubemap
            .and_then(|h| self.cubemaps.get(h))
            .map_or(&self.fallback_cube.view, |c| &c.view);
        let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Probe BindGroup"),
            layout: &self.probe_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.samplers.linear_clamp),
                },
            ],
        });
        self.probe_groups.insert(cubemap, group);
    }

    // =========================================================================
    // Light views
    // =========================================================================

    /// Starts a new set of shadow / VPL views for this render.
    pub fn reset_light_views(&mut self) {
        self.light_views.reset();
    }

    pub fn push_light_view(&mut self, view: &LightViewUniforms) -> u32 {
        self.light_views.push(view)
    }

    pub fn flush_light_views(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if self.light_views.flush(device, queue) {
            self.light_view_bind_group = Self::build_dynamic_group(
                device,
                &self.light_view_layout,
                &self.light_views,
                "Light View BindGroup",
            );
        }
    }

    #[inline]
    #[must_use]
    pub fn light_view_bind_group(&self) -> &wgpu::BindGroup {
        &self.light_view_bind_group
    }

    // =========================================================================
    // Cubemaps
    // =========================================================================

    /// Uploads six faces as a new live cubemap.
    pub fn insert_cubemap(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, faces: &[Image; 6]) -> Result<CubemapHandle> {
        let cube = GpuCubemap::from_faces(device, queue, faces, "Probe Cubemap")?;
        Ok(self.cubemaps.insert(cube))
    }

    pub fn remove_cubemap(&mut self, handle: CubemapHandle) -> bool {
        self.probe_groups.remove(&Some(handle));
        self.cubemaps.remove(handle).is_some()
    }

    #[must_use]
    pub fn cubemap(&self, handle: CubemapHandle) -> Option<&GpuCubemap> {
        self.cubemaps.get(handle)
    }

    #[must_use]
    pub fn cubemap_count(&self) -> usize {
        self.cubemaps.len()
    }

    // =========================================================================
    // Drawing
    // =========================================================================

    #[must_use]
    pub fn draw_record(&self, item: DrawItem) -> Option<&DrawRecord> {
        match item {
            DrawItem::Object(i) => self.object_records.get(i)?.as_ref(),
            DrawItem::Brush(i) => self.brush_records.get(i)?.as_ref(),
        }
    }

    fn mesh_for(&self, item: DrawItem, record: &DrawRecord) -> Option<&GpuMesh> {
        match item {
            DrawItem::Object(_) => self.meshes.get(&record.mesh?),
            DrawItem::Brush(i) => self.brushes.get(i)?.as_ref(),
        }
    }

    /// Issues one indexed draw per item with the requested per-draw groups.
    pub fn draw_items(&self, pass: &mut wgpu::RenderPass<'_>, items: &[DrawItem], bindings: DrawBindings) {
        for item in items {
            let Some(record) = self.draw_record(*item) else {
                continue;
            };
            let Some(mesh) = self.mesh_for(*item, record) else {
                continue;
            };
            self.draw_record_with(pass, mesh, record, bindings);
        }
    }

    /// Draws every decal quad, in scene order.
    pub fn draw_decals(&self, pass: &mut wgpu::RenderPass<'_>, bindings: DrawBindings) {
        for record in &self.decal_records {
            self.draw_record_with(pass, &self.decal_quad, record, bindings);
        }
    }

    #[must_use]
    pub fn decal_count(&self) -> usize {
        self.decal_records.len()
    }

    fn draw_record_with(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        mesh: &GpuMesh,
        record: &DrawRecord,
        bindings: DrawBindings,
    ) {
        pass.set_bind_group(bindings.object_group, &self.object_bind_group, &[record.uniform_offset]);
        if let Some(group) = bindings.material_group {
            let Some(material) = self.materials.get(&record.material) else {
                return;
            };
            pass.set_bind_group(group, material, &[]);
        }
        if let Some(group) = bindings.probe_group {
            let Some(probe) = self
                .probe_groups
                .get(&record.cubemap)
                .or_else(|| self.probe_groups.get(&None))
            else {
                return;
            };
            pass.set_bind_group(group, probe, &[]);
        }
        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..mesh.index_count, 0, 0..1);
    }

    /// Brush mesh by index (water overlay).
    #[must_use]
    pub fn brush_mesh(&self, index: usize) -> Option<&GpuMesh> {
        self.brushes.get(index)?.as_ref()
    }
}

// ============================================================================
// Layout entry helpers
// ============================================================================

#[must_use]
pub fn texture_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

#[must_use]
pub fn depth_entry(binding: u32, view_dimension: wgpu::TextureViewDimension) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Depth,
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

#[must_use]
pub fn sampler_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    ty: wgpu::SamplerBindingType,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Sampler(ty),
        count: None,
    }
}

#[must_use]
pub fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

#[must_use]
pub fn storage_entry(binding: u32, visibility: wgpu::ShaderStages, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Bindings 0..=7 of the lighting group: frame uniforms, lights, VPLs,
/// shadow maps and cookies.
#[must_use]
pub fn lighting_layout_entries() -> Vec<wgpu::BindGroupLayoutEntry> {
    vec![
        uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT),
        storage_entry(1, wgpu::ShaderStages::FRAGMENT, true),
        storage_entry(2, wgpu::ShaderStages::FRAGMENT, true),
        depth_entry(3, wgpu::TextureViewDimension::CubeArray),
        depth_entry(4, wgpu::TextureViewDimension::D2Array),
        sampler_entry(5, wgpu::ShaderStages::FRAGMENT, wgpu::SamplerBindingType::Comparison),
        wgpu::BindGroupLayoutEntry {
            binding: 6,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2Array,
                multisampled: false,
            },
            count: None,
        },
        sampler_entry(7, wgpu::ShaderStages::FRAGMENT, wgpu::SamplerBindingType::Filtering),
    ]
}

fn lighting_group_entries<'a>(
    frame_uniforms: &'a wgpu::Buffer,
    light_buffer: &'a wgpu::Buffer,
    vpl_buffer: &'a wgpu::Buffer,
    shadow_atlas: &'a ShadowAtlas,
    cookies: &'a CookieAtlas,
    samplers: &'a Samplers,
) -> [wgpu::BindGroupEntry<'a>; 8] {
    [
        wgpu::BindGroupEntry {
            binding: 0,
            resource: frame_uniforms.as_entire_binding(),
        },
        wgpu::BindGroupEntry {
            binding: 1,
            resource: light_buffer.as_entire_binding(),
        },
        wgpu::BindGroupEntry {
            binding: 2,
            resource: vpl_buffer.as_entire_binding(),
        },
        wgpu::BindGroupEntry {
            binding: 3,
            resource: wgpu::BindingResource::TextureView(&shadow_atlas.cube_view),
        },
        wgpu::BindGroupEntry {
            binding: 4,
            resource: wgpu::BindingResource::TextureView(&shadow_atlas.planar_view),
        },
        wgpu::BindGroupEntry {
            binding: 5,
            resource: wgpu::BindingResource::Sampler(&samplers.shadow),
        },
        wgpu::BindGroupEntry {
            binding: 6,
            resource: wgpu::BindingResource::TextureView(&cookies.view),
        },
        wgpu::BindGroupEntry {
            binding: 7,
            resource: wgpu::BindingResource::Sampler(&samplers.linear_clamp),
        },
    ]
}
