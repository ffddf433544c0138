//! GPU mesh upload.
//!
//! Two meshes matter to the pipeline: the source mesh being voxelized
//! (position + color vertices, read-only) and the small unit cube used to
//! visualize filled voxels through instanced-indirect drawing.

use glam::Vec3;
use wgpu::util::DeviceExt;

use voxelizer_core::Aabb;

use crate::error::{RenderError, RenderResult};

/// Vertex layout of a mesh to voxelize.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    /// Object-space position.
    pub position: [f32; 3],
    /// Linear RGB color scattered into the occupancy grid.
    pub color: [f32; 3],
}

impl MeshVertex {
    /// Vertex buffer layout for the fill pipeline.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
    };
}

/// A triangle mesh resident on the GPU, ready to be voxelized.
pub struct VoxelMesh {
    /// Vertex buffer ([`MeshVertex`] records).
    pub vertex_buffer: wgpu::Buffer,
    /// u32 index buffer.
    pub index_buffer: wgpu::Buffer,
    /// Number of indices.
    pub index_count: u32,
    /// Object-space bounding box.
    pub bounds: Aabb,
}

impl VoxelMesh {
    /// Uploads a mesh from positions, per-vertex colors, and triangle
    /// indices.
    ///
    /// # Errors
    /// Returns [`RenderError::SizeMismatch`] if `colors` does not match
    /// `positions`, or [`RenderError::EmptyMesh`] for an empty vertex set.
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        positions: &[Vec3],
        colors: &[Vec3],
        indices: &[u32],
    ) -> RenderResult<Self> {
        if colors.len() != positions.len() {
            return Err(RenderError::SizeMismatch {
                expected: positions.len(),
                actual: colors.len(),
            });
        }
        let bounds = Aabb::from_points(positions).ok_or(RenderError::EmptyMesh)?;

        let vertices: Vec<MeshVertex> = positions
            .iter()
            .zip(colors)
            .map(|(p, c)| MeshVertex {
                position: p.to_array(),
                color: c.to_array(),
            })
            .collect();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} vertices")),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} indices")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            bounds,
        })
    }
}

/// Vertex layout of the visualization cube.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CubeVertex {
    /// Position within the unit cube ([-0.5, 0.5]^3).
    pub position: [f32; 3],
    /// Face normal.
    pub normal: [f32; 3],
}

impl CubeVertex {
    /// Vertex buffer layout for the instance draw pipeline.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<CubeVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
    };
}

/// The instanced visualization mesh: a unit cube with per-face normals.
pub struct CubeMesh {
    /// Vertex buffer (24 [`CubeVertex`] records, 4 per face).
    pub vertex_buffer: wgpu::Buffer,
    /// u32 index buffer (36 indices).
    pub index_buffer: wgpu::Buffer,
    /// Number of indices; seeds the indirect draw arguments.
    pub index_count: u32,
}

/// Generates the 24 vertices and 36 indices of a unit cube ([-0.5, 0.5]^3)
/// with flat per-face normals.
#[must_use]
pub fn generate_unit_cube() -> (Vec<CubeVertex>, Vec<u32>) {
    // 6 faces, 4 vertices each, 2 triangles per face.
    // Face order: +X, -X, +Y, -Y, +Z, -Z.
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        ([1.0, 0.0, 0.0], [
            [0.5, -0.5, -0.5], [0.5, 0.5, -0.5], [0.5, 0.5, 0.5], [0.5, -0.5, 0.5],
        ]),
        ([-1.0, 0.0, 0.0], [
            [-0.5, -0.5, 0.5], [-0.5, 0.5, 0.5], [-0.5, 0.5, -0.5], [-0.5, -0.5, -0.5],
        ]),
        ([0.0, 1.0, 0.0], [
            [-0.5, 0.5, -0.5], [-0.5, 0.5, 0.5], [0.5, 0.5, 0.5], [0.5, 0.5, -0.5],
        ]),
        ([0.0, -1.0, 0.0], [
            [-0.5, -0.5, 0.5], [-0.5, -0.5, -0.5], [0.5, -0.5, -0.5], [0.5, -0.5, 0.5],
        ]),
        ([0.0, 0.0, 1.0], [
            [-0.5, -0.5, 0.5], [0.5, -0.5, 0.5], [0.5, 0.5, 0.5], [-0.5, 0.5, 0.5],
        ]),
        ([0.0, 0.0, -1.0], [
            [0.5, -0.5, -0.5], [-0.5, -0.5, -0.5], [-0.5, 0.5, -0.5], [0.5, 0.5, -0.5],
        ]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (face, (normal, verts)) in faces.iter().enumerate() {
        let base = (face * 4) as u32;
        for v in verts {
            vertices.push(CubeVertex {
                position: *v,
                normal: *normal,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    (vertices, indices)
}

impl CubeMesh {
    /// Uploads the unit cube.
    #[must_use]
    pub fn unit(device: &wgpu::Device) -> Self {
        let (vertices, indices) = generate_unit_cube();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("voxel cube vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("voxel cube indices"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_vertex_layout() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 24);
        assert_eq!(MeshVertex::LAYOUT.array_stride, 24);
        assert_eq!(MeshVertex::LAYOUT.attributes.len(), 2);
    }

    #[test]
    fn test_unit_cube_geometry() {
        let (vertices, indices) = generate_unit_cube();
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);

        for v in &vertices {
            for c in v.position {
                assert!(c.abs() <= 0.5 + f32::EPSILON);
            }
            let n = v.normal;
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            assert!((len - 1.0).abs() < 1e-6);
        }
        for &i in &indices {
            assert!((i as usize) < vertices.len());
        }
    }

    #[test]
    fn test_unit_cube_winding_faces_outward() {
        let (vertices, indices) = generate_unit_cube();
        for tri in indices.chunks(3) {
            let [a, b, c] = [
                Vec3::from_array(vertices[tri[0] as usize].position),
                Vec3::from_array(vertices[tri[1] as usize].position),
                Vec3::from_array(vertices[tri[2] as usize].position),
            ];
            let face_normal = (b - a).cross(c - a);
            let declared = Vec3::from_array(vertices[tri[0] as usize].normal);
            assert!(face_normal.dot(declared) > 0.0);
        }
    }
}
