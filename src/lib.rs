//! Terralod - LOD terrain chunk meshing with a background build pool

pub mod core;
pub mod terrain;
pub mod mesh;
pub mod streaming;

pub use crate::core::{Error, Result};
