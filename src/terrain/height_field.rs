//! Row-major height grid shared by the coordinator and every build worker.

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;

/// Flat index of cell `(x, z)` in a row-major grid `width` cells wide.
///
/// Every consumer of height data goes through this function so the
/// coordinator copy and worker snapshots can never disagree on layout.
#[inline]
pub fn height_index(width: u32, x: u32, z: u32) -> usize {
    z as usize * width as usize + x as usize
}

/// A single point edit, broadcast to every worker snapshot
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeightEdit {
    pub x: u32,
    pub z: u32,
    pub height: f32,
}

/// `width x depth` grid of heights
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeightField {
    width: u32,
    depth: u32,
    heights: Vec<f32>,
}

impl HeightField {
    /// Create a field at ground level (height 0)
    pub fn flat(width: u32, depth: u32) -> Result<Self, ConfigError> {
        Self::from_data(Vec::new(), width, depth)
    }

    /// Wrap existing height data.
    ///
    /// Short data is zero-filled up to `width * depth`; longer data is rejected.
    pub fn from_data(mut heights: Vec<f32>, width: u32, depth: u32) -> Result<Self, ConfigError> {
        if width == 0 || depth == 0 {
            return Err(ConfigError::EmptyHeightField);
        }

        let len = width as usize * depth as usize;
        if heights.len() > len {
            return Err(ConfigError::HeightDataTooLong {
                expected: len,
                actual: heights.len(),
            });
        }
        heights.resize(len, 0.0);

        Ok(Self { width, depth, heights })
    }

    /// Build a field by evaluating `f(x, z)` for every cell
    pub fn from_fn(
        width: u32,
        depth: u32,
        mut f: impl FnMut(u32, u32) -> f32,
    ) -> Result<Self, ConfigError> {
        let mut field = Self::flat(width, depth)?;
        for z in 0..depth {
            for x in 0..width {
                let i = height_index(width, x, z);
                field.heights[i] = f(x, z);
            }
        }
        Ok(field)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Number of cells (`width * depth`)
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    /// Flat index of `(x, z)` in this field
    #[inline]
    pub fn index(&self, x: u32, z: u32) -> usize {
        height_index(self.width, x, z)
    }

    pub fn contains(&self, x: u32, z: u32) -> bool {
        x < self.width && z < self.depth
    }

    /// Height of cell `(x, z)`, or `None` outside the field
    pub fn get(&self, x: u32, z: u32) -> Option<f32> {
        if self.contains(x, z) {
            Some(self.heights[self.index(x, z)])
        } else {
            None
        }
    }

    /// Height of the nearest in-bounds cell to `(x, z)`
    pub fn get_clamped(&self, x: i64, z: i64) -> f32 {
        let x = x.clamp(0, self.width as i64 - 1) as u32;
        let z = z.clamp(0, self.depth as i64 - 1) as u32;
        self.heights[self.index(x, z)]
    }

    /// Overwrite one cell, returning the previous height
    pub fn set(&mut self, x: u32, z: u32, height: f32) -> Result<f32, ConfigError> {
        if !self.contains(x, z) {
            return Err(ConfigError::OutOfBounds {
                x,
                z,
                width: self.width,
                depth: self.depth,
            });
        }
        let i = self.index(x, z);
        Ok(std::mem::replace(&mut self.heights[i], height))
    }

    /// Apply a broadcast edit
    pub fn apply(&mut self, edit: HeightEdit) -> Result<f32, ConfigError> {
        self.set(edit.x, edit.z, edit.height)
    }

    /// Height at fractional grid coordinates.
    ///
    /// Interpolates across the triangle of the containing quad, split along
    /// the `(x+1, z)` to `(x, z+1)` diagonal the mesh builder uses.
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        let max_x = (self.width - 1) as f32;
        let max_z = (self.depth - 1) as f32;
        if !(0.0..=max_x).contains(&x) || !(0.0..=max_z).contains(&z) {
            return None;
        }

        let x0 = x.floor() as u32;
        let z0 = z.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let z1 = (z0 + 1).min(self.depth - 1);
        let dx = x - x0 as f32;
        let dz = z - z0 as f32;

        let nw = self.heights[self.index(x0, z0)];
        let ne = self.heights[self.index(x1, z0)];
        let sw = self.heights[self.index(x0, z1)];
        let se = self.heights[self.index(x1, z1)];

        let h = if dx + dz <= 1.0 {
            nw + (ne - nw) * dx + (sw - nw) * dz
        } else {
            se + (sw - se) * (1.0 - dx) + (ne - se) * (1.0 - dz)
        };
        Some(h)
    }

    /// Raw row-major heights
    pub fn as_slice(&self) -> &[f32] {
        &self.heights
    }
}
