//! CPU-side mesh buffers produced by the chunk builder

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::types::ChunkIndex;

/// A contiguous slice of the index buffer whose indices are relative to
/// `first_vertex` and stay inside a 16-bit-safe window.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable, Serialize, Deserialize)]
pub struct SubRange {
    /// Offset of the first index in the index buffer
    pub start: u32,
    /// Vertex added to every index in this range
    pub first_vertex: u32,
    /// Number of indices in the range
    pub count: u32,
}

/// Geometry for one chunk at one detail index.
///
/// Positions are centered on the chunk; place the mesh at the chunk center
/// shifted by `(x_offset, 0, z_offset)` (see [`Placement`]).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshBuffers {
    pub vertices_x: u32,
    pub vertices_z: u32,
    pub positions: Vec<[f32; 3]>,
    /// Always zero; normals are left to the rendering layer
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u16>,
    pub sub_ranges: Vec<SubRange>,
    /// Horizontal shift from padding on the chunk's edges
    pub x_offset: f32,
    pub z_offset: f32,
}

impl MeshBuffers {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Indices of one sub-range, still relative to its `first_vertex`
    pub fn sub_range_indices(&self, range: &SubRange) -> &[u16] {
        let start = range.start as usize;
        &self.indices[start..start + range.count as usize]
    }

    /// Largest absolute vertex referenced through any sub-range
    pub fn max_vertex_reference(&self) -> Option<u32> {
        self.sub_ranges
            .iter()
            .filter_map(|range| {
                self.sub_range_indices(range)
                    .iter()
                    .max()
                    .map(|&i| range.first_vertex + i as u32)
            })
            .max()
    }

    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    pub fn uv_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.uvs)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn sub_range_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.sub_ranges)
    }
}

/// Where a finished mesh goes in the world
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub chunk: ChunkIndex,
    pub detail: u32,
    /// World position of the mesh's local origin
    pub translation: Vec3,
}

impl Placement {
    pub fn new(chunk: ChunkIndex, detail: u32, center: Vec3, mesh: &MeshBuffers) -> Self {
        Self {
            chunk,
            detail,
            translation: center + Vec3::new(mesh.x_offset, 0.0, mesh.z_offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> MeshBuffers {
        MeshBuffers {
            vertices_x: 2,
            vertices_z: 2,
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 1.0]],
            normals: vec![[0.0; 3]; 4],
            uvs: vec![[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]],
            indices: vec![0, 2, 1, 1, 2, 3],
            sub_ranges: vec![SubRange { start: 0, first_vertex: 0, count: 6 }],
            x_offset: 2.0,
            z_offset: -2.0,
        }
    }

    #[test]
    fn test_counts() {
        let mesh = quad();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.max_vertex_reference(), Some(3));
    }

    #[test]
    fn test_byte_views() {
        let mesh = quad();
        assert_eq!(mesh.position_bytes().len(), 4 * 12);
        assert_eq!(mesh.normal_bytes().len(), 4 * 12);
        assert_eq!(mesh.uv_bytes().len(), 4 * 8);
        assert_eq!(mesh.index_bytes().len(), 6 * 2);
        assert_eq!(mesh.sub_range_bytes().len(), 12);
    }

    #[test]
    fn test_sub_range_indices() {
        let mut mesh = quad();
        mesh.sub_ranges = vec![
            SubRange { start: 0, first_vertex: 0, count: 3 },
            SubRange { start: 3, first_vertex: 1, count: 3 },
        ];
        assert_eq!(mesh.sub_range_indices(&mesh.sub_ranges[1]), &[1, 2, 3]);
        assert_eq!(mesh.max_vertex_reference(), Some(4));
    }

    #[test]
    fn test_placement_applies_offsets() {
        let mesh = quad();
        let placement = Placement::new(7, 1, Vec3::new(100.0, 5.0, 50.0), &mesh);
        assert_eq!(placement.chunk, 7);
        assert_eq!(placement.detail, 1);
        assert_eq!(placement.translation, Vec3::new(102.0, 5.0, 48.0));
    }
}
