//! Core type aliases and re-exports

pub use glam::{Vec2, Vec3};

/// Position of a chunk in the terrain's chunk list (`column + row * columns`)
pub type ChunkIndex = usize;

/// Index of a worker execution slot
pub type SlotId = usize;

/// Identifier of a dispatched build job, unique per scheduler
pub type JobId = u64;

/// Standard Result type for the crate
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;
