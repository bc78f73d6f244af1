//! Error types for the terrain LOD engine

use thiserror::Error;

use crate::core::types::{ChunkIndex, SlotId};

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Problems detected while laying out the terrain, before any job runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("detail range table is empty")]
    EmptyDetailRanges,

    #[error("detail range {index} ({value}) is not greater than the previous one ({previous})")]
    NonAscendingDetailRanges {
        index: usize,
        previous: f32,
        value: f32,
    },

    #[error("chunk size must be non-zero")]
    ZeroChunkSize,

    #[error("worker count must be non-zero when workers are enabled")]
    ZeroWorkers,

    #[error("hover range must not be negative, got {0}")]
    NegativeHoverRange(f32),

    #[error("height field must have non-zero width and depth")]
    EmptyHeightField,

    #[error("height data has {actual} samples, expected at most {expected}")]
    HeightDataTooLong { expected: usize, actual: usize },

    #[error("cell ({x}, {z}) lies outside the {width}x{depth} height field")]
    OutOfBounds {
        x: u32,
        z: u32,
        width: u32,
        depth: u32,
    },
}

/// A single build request that could not produce a mesh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error(
        "chunk {chunk} collapses to {vertices_x}x{vertices_z} vertices at detail {detail}"
    )]
    Degenerate {
        chunk: ChunkIndex,
        detail: u32,
        vertices_x: u32,
        vertices_z: u32,
    },

    #[error(
        "chunk {chunk} rows hold {vertices_x} vertices at detail {detail}, too many for u16 indices"
    )]
    RowTooWide {
        chunk: ChunkIndex,
        detail: u32,
        vertices_x: u32,
    },
}

/// Failures of an individual worker slot.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn worker {slot}: {source}")]
    Spawn {
        slot: SlotId,
        #[source]
        source: std::io::Error,
    },

    #[error("worker {0} is disconnected")]
    Disconnected(SlotId),

    #[error("no worker slot {0}")]
    UnknownSlot(SlotId),
}
