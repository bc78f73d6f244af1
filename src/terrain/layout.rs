//! Chunk layout: how the height field is cut into independently built regions

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::core::types::ChunkIndex;

/// Placement of one chunk inside the height field. Fixed at layout time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub chunk: ChunkIndex,
    /// First height-field column covered by the chunk
    pub origin_x: u32,
    /// First height-field row covered by the chunk
    pub origin_z: u32,
    pub width: u32,
    pub depth: u32,
    /// World-space center of the chunk's footprint
    pub center: Vec3,
}

impl Region {
    /// Whether a world-space point lies over this chunk's footprint (edges inclusive)
    pub fn footprint_contains(&self, point: Vec3) -> bool {
        let half_w = self.width as f32 / 2.0;
        let half_d = self.depth as f32 / 2.0;
        point.x >= self.center.x - half_w
            && point.x <= self.center.x + half_w
            && point.z >= self.center.z - half_d
            && point.z <= self.center.z + half_d
    }

    /// Whether height-field cell `(x, z)` lies within `margin` cells of this region
    pub fn covers_cell(&self, x: u32, z: u32, margin: u32) -> bool {
        let x = x as i64;
        let z = z as i64;
        let margin = margin as i64;
        let min_x = self.origin_x as i64 - margin;
        let min_z = self.origin_z as i64 - margin;
        let max_x = (self.origin_x + self.width) as i64 + margin;
        let max_z = (self.origin_z + self.depth) as i64 + margin;
        x >= min_x && x <= max_x && z >= min_z && z <= max_z
    }
}

/// Regular grid of chunks over a `width x depth` height field
#[derive(Clone, Debug)]
pub struct ChunkGrid {
    field_width: u32,
    field_depth: u32,
    chunk_size: u32,
    columns: u32,
    rows: u32,
    /// World position of height-field cell (0, 0)
    world_origin: Vec3,
    regions: Vec<Region>,
}

impl ChunkGrid {
    /// Lay out chunks over a field centered on `position`.
    ///
    /// Chunk `column + row * columns` starts at cell `(column, row) * chunk_size`;
    /// chunks on the far edges take whatever width/depth remains.
    pub fn new(
        field_width: u32,
        field_depth: u32,
        chunk_size: u32,
        position: Vec3,
    ) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if field_width == 0 || field_depth == 0 {
            return Err(ConfigError::EmptyHeightField);
        }

        let columns = field_width.div_ceil(chunk_size);
        let rows = field_depth.div_ceil(chunk_size);
        let world_origin = Vec3::new(
            position.x - (field_width / 2) as f32,
            position.y,
            position.z - (field_depth / 2) as f32,
        );

        let mut regions = Vec::with_capacity((columns * rows) as usize);
        for row in 0..rows {
            for column in 0..columns {
                let origin_x = column * chunk_size;
                let origin_z = row * chunk_size;
                let width = chunk_size.min(field_width - origin_x);
                let depth = chunk_size.min(field_depth - origin_z);

                regions.push(Region {
                    chunk: (column + row * columns) as ChunkIndex,
                    origin_x,
                    origin_z,
                    width,
                    depth,
                    center: Vec3::new(
                        world_origin.x + origin_x as f32 + width as f32 / 2.0,
                        world_origin.y,
                        world_origin.z + origin_z as f32 + depth as f32 / 2.0,
                    ),
                });
            }
        }

        Ok(Self {
            field_width,
            field_depth,
            chunk_size,
            columns,
            rows,
            world_origin,
            regions,
        })
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, chunk: ChunkIndex) -> Option<&Region> {
        self.regions.get(chunk)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// World position of height-field cell (0, 0)
    pub fn world_origin(&self) -> Vec3 {
        self.world_origin
    }

    /// Convert world X/Z to fractional height-field coordinates
    pub fn world_to_cell(&self, world_x: f32, world_z: f32) -> (f32, f32) {
        (world_x - self.world_origin.x, world_z - self.world_origin.z)
    }

    /// Chunk whose footprint holds the world-space point, if any
    pub fn chunk_at(&self, world_x: f32, world_z: f32) -> Option<ChunkIndex> {
        let (x, z) = self.world_to_cell(world_x, world_z);
        if x < 0.0 || z < 0.0 || x >= self.field_width as f32 || z >= self.field_depth as f32 {
            return None;
        }
        Some(self.chunk_for_cell(x as u32, z as u32))
    }

    /// Chunk that owns height-field cell `(x, z)`
    pub fn chunk_for_cell(&self, x: u32, z: u32) -> ChunkIndex {
        let column = x / self.chunk_size;
        let row = z / self.chunk_size;
        (column + row * self.columns) as ChunkIndex
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_layout() {
        let grid = ChunkGrid::new(1000, 1000, 500, Vec3::ZERO).unwrap();
        assert_eq!(grid.columns(), 2);
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.len(), 4);

        let r = grid.region(3).unwrap();
        assert_eq!((r.origin_x, r.origin_z, r.width, r.depth), (500, 500, 500, 500));
        assert_eq!(r.center, Vec3::new(250.0, 0.0, 250.0));

        let r = grid.region(0).unwrap();
        assert_eq!(r.center, Vec3::new(-250.0, 0.0, -250.0));
    }

    #[test]
    fn test_remainder_chunks() {
        let grid = ChunkGrid::new(1200, 700, 500, Vec3::new(0.0, 5.0, 0.0)).unwrap();
        assert_eq!(grid.columns(), 3);
        assert_eq!(grid.rows(), 2);

        // Index is column + row * columns
        let r = grid.region(2).unwrap();
        assert_eq!((r.origin_x, r.origin_z, r.width, r.depth), (1000, 0, 200, 500));
        let r = grid.region(5).unwrap();
        assert_eq!((r.origin_x, r.origin_z, r.width, r.depth), (1000, 500, 200, 200));
        assert_eq!(r.center, Vec3::new(-600.0 + 1100.0, 5.0, -350.0 + 600.0));
    }

    #[test]
    fn test_layout_errors() {
        assert!(matches!(
            ChunkGrid::new(100, 100, 0, Vec3::ZERO),
            Err(ConfigError::ZeroChunkSize)
        ));
        assert!(matches!(
            ChunkGrid::new(0, 100, 50, Vec3::ZERO),
            Err(ConfigError::EmptyHeightField)
        ));
    }

    #[test]
    fn test_chunk_at() {
        let grid = ChunkGrid::new(1200, 700, 500, Vec3::ZERO).unwrap();
        // World origin is (-600, -350)
        assert_eq!(grid.chunk_at(-600.0, -350.0), Some(0));
        assert_eq!(grid.chunk_at(-99.0, -350.0), Some(1));
        assert_eq!(grid.chunk_at(599.0, 349.0), Some(5));
        assert_eq!(grid.chunk_at(600.0, 0.0), None);
        assert_eq!(grid.chunk_at(-601.0, 0.0), None);
    }

    #[test]
    fn test_footprint_contains() {
        let grid = ChunkGrid::new(1000, 1000, 500, Vec3::ZERO).unwrap();
        let r = grid.region(0).unwrap();
        assert!(r.footprint_contains(Vec3::new(-250.0, 100.0, -250.0)));
        assert!(r.footprint_contains(Vec3::new(0.0, 0.0, 0.0)));
        assert!(!r.footprint_contains(Vec3::new(10.0, 0.0, -250.0)));
    }

    #[test]
    fn test_covers_cell_with_margin() {
        let grid = ChunkGrid::new(1000, 1000, 500, Vec3::ZERO).unwrap();
        let r = grid.region(1).unwrap(); // cells x 500..1000, z 0..500
        assert!(r.covers_cell(600, 100, 0));
        assert!(!r.covers_cell(490, 100, 0));
        assert!(r.covers_cell(490, 100, 16));
        assert!(!r.covers_cell(600, 520, 16));
    }
}
