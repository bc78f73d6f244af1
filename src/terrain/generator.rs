//! Noise-based height field generation

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::terrain::height_field::HeightField;

/// Parameters controlling height generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    pub seed: u32,
    pub scale: f32,        // Horizontal scale (larger = smoother)
    pub height_scale: f32, // Vertical scale (max height)
    pub octaves: u32,      // FBM octaves
    pub persistence: f32,  // FBM persistence (0.5 typical)
    pub lacunarity: f32,   // FBM lacunarity (2.0 typical)
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            seed: 12345,
            scale: 400.0,
            height_scale: 300.0,
            octaves: 5,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

/// Fills height fields with fractal Brownian motion (FBM)
pub struct TerrainGenerator {
    params: TerrainParams,
    noise: Fbm<Perlin>,
}

impl TerrainGenerator {
    pub fn new(params: TerrainParams) -> Self {
        let noise = Fbm::<Perlin>::new(params.seed)
            .set_octaves(params.octaves as usize)
            .set_persistence(params.persistence as f64)
            .set_lacunarity(params.lacunarity as f64);

        Self { params, noise }
    }

    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Height at grid coordinates, in `[0, height_scale]`
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let nx = (x / self.params.scale) as f64;
        let nz = (z / self.params.scale) as f64;

        // Noise is in [-1, 1]
        let normalized = (self.noise.get([nx, nz]) + 1.0) / 2.0;
        (normalized.clamp(0.0, 1.0) * self.params.height_scale as f64) as f32
    }

    /// Sample a `width x depth` field
    pub fn generate(&self, width: u32, depth: u32) -> Result<HeightField, ConfigError> {
        log::debug!(
            "Generating {}x{} height field (seed {})",
            width,
            depth,
            self.params.seed
        );
        HeightField::from_fn(width, depth, |x, z| self.height_at(x as f32, z as f32))
    }
}
