//! Build requests, dispatched jobs and their results

use std::sync::Arc;

use crate::core::error::BuildError;
use crate::core::types::{ChunkIndex, JobId};
use crate::mesh::buffers::MeshBuffers;
use crate::mesh::builder::build_mesh;
use crate::terrain::height_field::HeightField;
use crate::terrain::layout::Region;

/// Request to (re)build a chunk at a detail index. Identity is the chunk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuildRequest {
    pub chunk: ChunkIndex,
    pub detail: u32,
    pub region: Region,
}

impl BuildRequest {
    pub fn new(region: Region, detail: u32) -> Self {
        Self {
            chunk: region.chunk,
            detail,
            region,
        }
    }
}

/// A request that has been handed to a worker slot
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuildJob {
    pub id: JobId,
    /// Per-chunk dispatch counter, starting at 1
    pub sequence: u64,
    pub request: BuildRequest,
}

impl BuildJob {
    pub fn chunk(&self) -> ChunkIndex {
        self.request.chunk
    }

    pub fn detail(&self) -> u32 {
        self.request.detail
    }
}

/// What came of a dispatched job
#[derive(Clone, Debug)]
pub enum JobOutcome {
    /// Mesh built successfully
    Built(Arc<MeshBuffers>),
    /// The builder rejected the request
    Failed(BuildError),
    /// The worker died before reporting
    Lost,
}

/// Completion of a job, routed back to its chunk
#[derive(Clone, Debug)]
pub struct JobResult {
    pub job: JobId,
    pub chunk: ChunkIndex,
    pub detail: u32,
    pub sequence: u64,
    pub outcome: JobOutcome,
}

impl JobResult {
    pub fn new(job: &BuildJob, outcome: JobOutcome) -> Self {
        Self {
            job: job.id,
            chunk: job.chunk(),
            detail: job.detail(),
            sequence: job.sequence,
            outcome,
        }
    }

    /// Run the mesh builder for `job` and wrap the outcome
    pub fn build(job: &BuildJob, field: &HeightField) -> Self {
        let outcome = match build_mesh(&job.request.region, job.detail(), field) {
            Ok(mesh) => JobOutcome::Built(Arc::new(mesh)),
            Err(e) => JobOutcome::Failed(e),
        };
        Self::new(job, outcome)
    }

    pub fn mesh(&self) -> Option<&Arc<MeshBuffers>> {
        match &self.outcome {
            JobOutcome::Built(mesh) => Some(mesh),
            _ => None,
        }
    }
}
