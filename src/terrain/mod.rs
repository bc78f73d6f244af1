//! Height field, chunk layout and per-chunk LOD state

pub mod height_field;
pub mod lod;
pub mod layout;
pub mod generator;
pub mod chunk;
pub mod map;

pub use height_field::{HeightEdit, HeightField, height_index};
pub use lod::{DetailRanges, LodSettings, detail_increment};
pub use layout::{ChunkGrid, Region};
pub use generator::{TerrainGenerator, TerrainParams};
pub use chunk::{ApplyOutcome, ChunkAction, ChunkState, TerrainChunk};
pub use map::{SceneSink, TerrainMap, UpdateStats, Viewpoint};
