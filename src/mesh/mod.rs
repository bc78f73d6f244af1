//! Chunk mesh generation

pub mod buffers;
pub mod builder;

pub use buffers::{MeshBuffers, Placement, SubRange};
pub use builder::{GridPlan, INDEX_WINDOW, build_mesh, plan_grid};
