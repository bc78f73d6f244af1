//! Chunk mesh builder
//!
//! Turns a chunk region plus a detail index into a vertex grid sampled from
//! the height field. Edges that face another chunk are padded by one LOD
//! step so neighbouring chunks at different detail overlap instead of
//! leaving cracks. Large grids are split into sub-ranges so that every
//! 16-bit index stays addressable.
//!
//! The builder is a pure function of its inputs: identical region, detail
//! and heights always produce identical buffers, on any thread.

use crate::core::error::BuildError;
use crate::mesh::buffers::{MeshBuffers, SubRange};
use crate::terrain::height_field::HeightField;
use crate::terrain::layout::Region;
use crate::terrain::lod::detail_increment;

/// Vertex window per sub-range: 65535 / 3
pub const INDEX_WINDOW: u32 = 21845;

/// Resolved grid dimensions for one build
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridPlan {
    pub detail: u32,
    /// Cells between sampled vertices (`4^detail`)
    pub increment: u32,
    pub vertices_x: u32,
    pub vertices_z: u32,
    /// Padded geometric extent in cells
    pub extent_x: u64,
    pub extent_z: u64,
    /// First sampled height-field column/row (may be shifted back by padding)
    pub sample_x: i64,
    pub sample_z: i64,
    pub x_offset: f32,
    pub z_offset: f32,
}

struct AxisPlan {
    vertices: u32,
    extent: u64,
    sample_start: i64,
    offset: f32,
}

fn plan_axis(origin: u32, length: u32, field_length: u32, increment: u32) -> AxisPlan {
    let mut axis = AxisPlan {
        vertices: length / increment,
        extent: length as u64,
        sample_start: origin as i64,
        offset: 0.0,
    };
    let half = increment as f32 / 2.0;

    // Near edge faces a neighbour unless it is the terrain boundary
    if origin != 0 {
        axis.extent += increment as u64;
        axis.vertices += 1;
        axis.offset -= half;
        axis.sample_start -= increment as i64;
    }

    // Far edge is padded only if a full step still fits inside the terrain
    if (origin as u64 + length as u64 + increment as u64) < field_length as u64 {
        axis.extent += increment as u64;
        axis.vertices += 1;
        axis.offset += half;
    }

    axis
}

/// Work out vertex counts, padding and sampling origin for a build.
///
/// Fails with [`BuildError::Degenerate`] when fewer than two unpadded
/// vertices remain along either axis.
pub fn plan_grid(
    region: &Region,
    detail: u32,
    field_width: u32,
    field_depth: u32,
) -> Result<GridPlan, BuildError> {
    let degenerate = |vertices_x, vertices_z| BuildError::Degenerate {
        chunk: region.chunk,
        detail,
        vertices_x,
        vertices_z,
    };

    let increment = detail_increment(detail).ok_or_else(|| degenerate(0, 0))?;
    let base_x = region.width / increment;
    let base_z = region.depth / increment;
    if base_x < 2 || base_z < 2 {
        return Err(degenerate(base_x, base_z));
    }

    let x = plan_axis(region.origin_x, region.width, field_width, increment);
    let z = plan_axis(region.origin_z, region.depth, field_depth, increment);

    Ok(GridPlan {
        detail,
        increment,
        vertices_x: x.vertices,
        vertices_z: z.vertices,
        extent_x: x.extent,
        extent_z: z.extent,
        sample_x: x.sample_start,
        sample_z: z.sample_start,
        x_offset: x.offset,
        z_offset: z.offset,
    })
}

/// Build the mesh for `region` at `detail` from `field`
pub fn build_mesh(
    region: &Region,
    detail: u32,
    field: &HeightField,
) -> Result<MeshBuffers, BuildError> {
    let plan = plan_grid(region, detail, field.width(), field.depth())?;

    if plan.vertices_x * 2 > INDEX_WINDOW {
        return Err(BuildError::RowTooWide {
            chunk: region.chunk,
            detail,
            vertices_x: plan.vertices_x,
        });
    }

    let vx = plan.vertices_x as usize;
    let vz = plan.vertices_z as usize;
    let vertex_count = vx * vz;

    let step_x = plan.extent_x as f64 / (vx - 1) as f64;
    let step_z = plan.extent_z as f64 / (vz - 1) as f64;
    let start_x = -(plan.extent_x as f64) / 2.0;
    let start_z = -(plan.extent_z as f64) / 2.0;

    let mut positions = Vec::with_capacity(vertex_count);
    let mut uvs = Vec::with_capacity(vertex_count);

    // Vertex (x, z) lives at z * vx + x
    for z in 0..vz {
        let sample_z = (step_z * z as f64).round() as i64 + plan.sample_z;
        let pos_z = (start_z + z as f64 * step_z) as f32;
        let v = (1.0 - z as f64 / (vz - 1) as f64) as f32;

        for x in 0..vx {
            let sample_x = (step_x * x as f64).round() as i64 + plan.sample_x;
            let height = field.get_clamped(sample_x, sample_z);

            positions.push([(start_x + x as f64 * step_x) as f32, height, pos_z]);
            uvs.push([(x as f64 / (vx - 1) as f64) as f32, v]);
        }
    }

    let (indices, sub_ranges) = emit_indices(vx, vz);

    log::trace!(
        "Built chunk {} at detail {}: {}x{} vertices, {} sub-ranges, offset ({}, {})",
        region.chunk,
        detail,
        vx,
        vz,
        sub_ranges.len(),
        plan.x_offset,
        plan.z_offset
    );

    Ok(MeshBuffers {
        vertices_x: plan.vertices_x,
        vertices_z: plan.vertices_z,
        positions,
        normals: vec![[0.0; 3]; vertex_count],
        uvs,
        indices,
        sub_ranges,
        x_offset: plan.x_offset,
        z_offset: plan.z_offset,
    })
}

/// Two triangles per quad, rows split into 16-bit-safe sub-ranges.
///
/// Callers guarantee `2 * vx <= INDEX_WINDOW`.
fn emit_indices(vx: usize, vz: usize) -> (Vec<u16>, Vec<SubRange>) {
    let quads_per_row = vx - 1;
    let window = INDEX_WINDOW as usize;

    let mut indices = Vec::with_capacity(quads_per_row * (vz - 1) * 6);
    let mut sub_ranges = Vec::new();

    let mut range_row = 0;
    let mut range_vertex = 0;

    for row in 0..vz - 1 {
        let row_vertex = row * vx;

        // This row reaches two rows of vertices past its start
        if row > range_row && (row_vertex - range_vertex) + vx * 2 > window {
            sub_ranges.push(SubRange {
                start: (range_row * quads_per_row * 6) as u32,
                first_vertex: range_vertex as u32,
                count: ((row - range_row) * quads_per_row * 6) as u32,
            });
            range_row = row;
            range_vertex = row_vertex;
        }

        let stride = vx as u16;
        for column in 0..quads_per_row {
            let v = (row_vertex + column - range_vertex) as u16;
            indices.extend_from_slice(&[
                v,
                v + stride,
                v + 1,
                v + 1,
                v + stride,
                v + stride + 1,
            ]);
        }
    }

    sub_ranges.push(SubRange {
        start: (range_row * quads_per_row * 6) as u32,
        first_vertex: range_vertex as u32,
        count: ((vz - 1 - range_row) * quads_per_row * 6) as u32,
    });

    (indices, sub_ranges)
}
