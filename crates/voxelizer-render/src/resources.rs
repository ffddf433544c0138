//! The voxelizer resource bundle.
//!
//! [`VoxelizerResources`] plays the role of the external capability bundle:
//! the rasterization shader/pipeline, the compaction kernel with its
//! declared workgroup size, and the visualization mesh/pipeline. The
//! pipeline core only consumes lookups from it — a bundle built without the
//! compaction kernel makes the compaction and sync passes skip cleanly.

use std::num::NonZeroU64;

use glam::UVec3;

use crate::grid_resources::{OCCUPANCY_FORMAT, RASTER_TARGET_FORMAT};
use crate::mesh::{CubeMesh, CubeVertex, MeshVertex};

/// Workgroup size declared by the `find_filled_voxels` kernel.
/// Must match the `@workgroup_size` attribute in `shaders/compact.wgsl`.
pub const COMPACT_GROUP_SIZE: UVec3 = UVec3::new(4, 4, 4);

/// Per-axis uniforms of the fill pass.
/// Layout must match WGSL `FillUniforms` exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FillUniforms {
    /// Per-axis view-projection matrix.
    pub view_proj: [[f32; 4]; 4],
    /// Grid bounds minimum corner (xyz).
    pub bounds_min: [f32; 4],
    /// Reciprocal of the physical volume size (xyz).
    pub inv_size: [f32; 4],
    /// Grid dimensions (xyz).
    pub dims: [f32; 4],
}

/// Uniforms of the compaction kernel.
/// Layout must match WGSL `CompactUniforms` exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CompactUniforms {
    /// Integer cell index to physical cell-center transform.
    pub index_to_position: [[f32; 4]; 4],
    /// Grid dimensions (xyz).
    pub dims: [u32; 4],
}

/// Uniforms of the instanced voxel draw.
/// Layout must match WGSL `DrawUniforms` exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    /// Camera view-projection matrix.
    pub view_proj: [[f32; 4]; 4],
    /// Owning object's local-to-world transform.
    pub local_to_world: [[f32; 4]; 4],
    /// Voxel edge length in x.
    pub voxel_size: [f32; 4],
}

/// Rasterization fill shader and pipeline.
pub struct FillResources {
    /// The fill render pipeline.
    pub pipeline: wgpu::RenderPipeline,
    /// Bind group layout (uniforms + storage image).
    pub bind_group_layout: wgpu::BindGroupLayout,
}

/// The compaction compute kernel and its declared workgroup size.
pub struct CompactKernel {
    /// The find-filled-voxels pipeline.
    pub pipeline: wgpu::ComputePipeline,
    /// Bind group layout (uniforms, image, counter, instances).
    pub bind_group_layout: wgpu::BindGroupLayout,
    /// Declared per-axis workgroup size.
    pub group_size: UVec3,
}

/// Visualization mesh and instanced-indirect draw pipeline.
pub struct InstanceDrawResources {
    /// The instanced draw pipeline.
    pub pipeline: wgpu::RenderPipeline,
    /// Bind group layout (draw uniforms + instance records).
    pub bind_group_layout: wgpu::BindGroupLayout,
    /// The unit cube instanced per filled voxel.
    pub cube: CubeMesh,
}

/// All shared (per-device, not per-grid) voxelizer resources.
pub struct VoxelizerResources {
    /// Fill pass resources.
    pub fill: FillResources,
    /// Compaction kernel, when the bundle provides one.
    compact: Option<CompactKernel>,
    /// Instanced draw resources.
    pub instance: InstanceDrawResources,
}

impl VoxelizerResources {
    /// Builds the full bundle for a given output color/depth format.
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        Self {
            fill: create_fill_resources(device),
            compact: Some(create_compact_kernel(device)),
            instance: create_instance_resources(device, color_format, depth_format),
        }
    }

    /// Builds a bundle lacking the compaction kernel. The fill pass still
    /// runs and leaves a valid occupancy image; compaction and
    /// draw-argument sync are skipped.
    #[must_use]
    pub fn without_compaction(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        Self {
            fill: create_fill_resources(device),
            compact: None,
            instance: create_instance_resources(device, color_format, depth_format),
        }
    }

    /// Capability lookup for the compaction kernel.
    #[must_use]
    pub fn compact_kernel(&self) -> Option<&CompactKernel> {
        self.compact.as_ref()
    }
}

fn create_fill_resources(device: &wgpu::Device) -> FillResources {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("voxelize fill shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/voxelize.wgsl").into()),
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("fill bind group layout"),
        entries: &[
            // Fill uniforms
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(
                        std::mem::size_of::<FillUniforms>() as u64
                    ),
                },
                count: None,
            },
            // Occupancy image, scatter writes from the fragment stage
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: OCCUPANCY_FORMAT,
                    view_dimension: wgpu::TextureViewDimension::D3,
                },
                count: None,
            },
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("fill pipeline layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("voxelize fill pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[MeshVertex::LAYOUT],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            // The attachment is a throwaway; nothing is written to it.
            targets: &[Some(wgpu::ColorTargetState {
                format: RASTER_TARGET_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::empty(),
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // Both windings must rasterize or back-facing surface parts
            // would never mark their voxels.
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    FillResources {
        pipeline,
        bind_group_layout,
    }
}

fn create_compact_kernel(device: &wgpu::Device) -> CompactKernel {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("voxel compact shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/compact.wgsl").into()),
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("compact bind group layout"),
        entries: &[
            // Compact uniforms
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(
                        std::mem::size_of::<CompactUniforms>() as u64
                    ),
                },
                count: None,
            },
            // Occupancy image
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D3,
                    multisampled: false,
                },
                count: None,
            },
            // Atomic append counter
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(4),
                },
                count: None,
            },
            // Compacted instance records
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("compact pipeline layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("find filled voxels pipeline"),
        layout: Some(&pipeline_layout),
        module: &shader,
        entry_point: Some("find_filled_voxels"),
        compilation_options: wgpu::PipelineCompilationOptions::default(),
        cache: None,
    });

    CompactKernel {
        pipeline,
        bind_group_layout,
        group_size: COMPACT_GROUP_SIZE,
    }
}

fn create_instance_resources(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,
) -> InstanceDrawResources {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("voxel instance shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/voxel_instance.wgsl").into()),
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("voxel instance bind group layout"),
        entries: &[
            // Draw uniforms
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(
                        std::mem::size_of::<DrawUniforms>() as u64
                    ),
                },
                count: None,
            },
            // Compacted instance records
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("voxel instance pipeline layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("voxel instance pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[CubeVertex::LAYOUT],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    InstanceDrawResources {
        pipeline,
        bind_group_layout,
        cube: CubeMesh::unit(device),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_uniforms_size() {
        let size = std::mem::size_of::<FillUniforms>();
        assert_eq!(size % 16, 0, "FillUniforms size ({size} bytes) must be 16-byte aligned");
        // view_proj(64) + bounds_min(16) + inv_size(16) + dims(16) = 112
        assert_eq!(size, 112);
    }

    #[test]
    fn test_compact_uniforms_size() {
        let size = std::mem::size_of::<CompactUniforms>();
        assert_eq!(size % 16, 0, "CompactUniforms size ({size} bytes) must be 16-byte aligned");
        // index_to_position(64) + dims(16) = 80
        assert_eq!(size, 80);
    }

    #[test]
    fn test_draw_uniforms_size() {
        let size = std::mem::size_of::<DrawUniforms>();
        assert_eq!(size % 16, 0, "DrawUniforms size ({size} bytes) must be 16-byte aligned");
        // view_proj(64) + local_to_world(64) + voxel_size(16) = 144
        assert_eq!(size, 144);
    }

    #[test]
    fn test_compact_group_size_is_positive() {
        assert!(COMPACT_GROUP_SIZE.cmpge(UVec3::ONE).all());
    }
}
