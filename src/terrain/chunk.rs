//! Per-chunk LOD state machine
//!
//! A chunk decides when it needs a rebuild and keeps the last mesh it
//! accepted. It never talks to the scheduler directly: `evaluate` returns
//! what the coordinator should do, and `apply` folds a job result back in.

use std::sync::Arc;

use glam::Vec3;

use crate::mesh::buffers::MeshBuffers;
use crate::streaming::request::{BuildRequest, JobOutcome, JobResult};
use crate::terrain::layout::Region;
use crate::terrain::lod::{LodSettings, detail_increment};

/// Where a chunk is in its rebuild cycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChunkState {
    /// Nothing built yet
    #[default]
    Unbuilt,
    /// Showing a mesh at this detail
    Stable(u32),
    /// A build has been requested and not answered
    Pending { requested: u32 },
    /// Beyond the last threshold with far chunks hidden
    Culled,
}

/// What the coordinator should do after an evaluation tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkAction {
    Idle,
    /// Submit a build at this detail
    Request(u32),
    /// Detach the mesh from the scene
    Cull,
}

/// What became of a job result handed to a chunk
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// New mesh adopted
    Applied,
    /// Older than a result already applied; dropped
    Stale,
    /// Build failed; previous state kept
    Failed,
    /// Job died with its worker; previous state kept
    Lost,
}

/// Runtime state for one chunk of terrain
#[derive(Clone, Debug)]
pub struct TerrainChunk {
    region: Region,
    state: ChunkState,
    current_detail: Option<u32>,
    mesh: Option<Arc<MeshBuffers>>,
    /// Highest sequence number applied so far
    applied_sequence: u64,
    /// Detail whose last build failed; not retried until something changes
    rejected_detail: Option<u32>,
    /// Heights under the chunk changed since its mesh was built
    dirty: bool,
}

impl TerrainChunk {
    pub fn new(region: Region) -> Self {
        Self {
            region,
            state: ChunkState::Unbuilt,
            current_detail: None,
            mesh: None,
            applied_sequence: 0,
            rejected_detail: None,
            dirty: false,
        }
    }

    /// Detail this chunk wants for the given viewpoint
    pub fn desired_detail(&self, viewpoint: Vec3, lod: &LodSettings) -> u32 {
        // Low and directly overhead: always full detail
        if viewpoint.y <= lod.hover_range && self.region.footprint_contains(viewpoint) {
            return 0;
        }
        lod.ranges.detail_index(self.region.center.distance(viewpoint))
    }

    /// Run one evaluation tick against the current viewpoint
    pub fn evaluate(&mut self, viewpoint: Vec3, lod: &LodSettings) -> ChunkAction {
        if matches!(self.state, ChunkState::Pending { .. }) {
            return ChunkAction::Idle;
        }

        let desired = self.desired_detail(viewpoint, lod);

        if lod.culls(desired) {
            if self.state == ChunkState::Culled {
                return ChunkAction::Idle;
            }
            self.state = ChunkState::Culled;
            self.mesh = None;
            self.current_detail = None;
            return ChunkAction::Cull;
        }

        if !self.dirty {
            if self.current_detail == Some(desired) {
                return ChunkAction::Idle;
            }
            if self.rejected_detail == Some(desired) {
                return ChunkAction::Idle;
            }
        }

        self.state = ChunkState::Pending { requested: desired };
        self.dirty = false;
        ChunkAction::Request(desired)
    }

    /// Request for the chunk's pending build, if any
    pub fn build_request(&self) -> Option<BuildRequest> {
        match self.state {
            ChunkState::Pending { requested } => Some(BuildRequest::new(self.region, requested)),
            _ => None,
        }
    }

    /// Fold a job result into the chunk
    pub fn apply(&mut self, result: &JobResult) -> ApplyOutcome {
        if result.sequence <= self.applied_sequence {
            log::debug!(
                "Chunk {} dropped stale result (seq {} <= {})",
                self.region.chunk,
                result.sequence,
                self.applied_sequence
            );
            return ApplyOutcome::Stale;
        }

        match &result.outcome {
            JobOutcome::Built(mesh) => {
                self.applied_sequence = result.sequence;
                self.mesh = Some(Arc::clone(mesh));
                self.current_detail = Some(result.detail);
                self.rejected_detail = None;
                self.settle_after_result(result.detail);
                ApplyOutcome::Applied
            }
            JobOutcome::Failed(_) => {
                self.rejected_detail = Some(result.detail);
                self.revert();
                ApplyOutcome::Failed
            }
            JobOutcome::Lost => {
                self.revert();
                ApplyOutcome::Lost
            }
        }
    }

    /// Leave `Pending` once the detail it asked for has arrived
    fn settle_after_result(&mut self, detail: u32) {
        match self.state {
            ChunkState::Pending { requested } if requested != detail => {
                // An earlier job landed; the requested one is still on its way
            }
            _ => self.state = ChunkState::Stable(detail),
        }
    }

    fn revert(&mut self) {
        if let ChunkState::Pending { .. } = self.state {
            self.state = match self.current_detail {
                Some(detail) => ChunkState::Stable(detail),
                None => ChunkState::Unbuilt,
            };
        }
    }

    /// Force a rebuild at the current detail on the next tick
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether an edit at cell `(x, z)` can change this chunk's mesh
    pub fn samples_cell(&self, x: u32, z: u32) -> bool {
        let detail = match self.state {
            ChunkState::Pending { requested } => Some(requested),
            _ => self.current_detail,
        };
        let margin = detail.and_then(detail_increment).unwrap_or(1);
        self.region.covers_cell(x, z, margin)
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn state(&self) -> ChunkState {
        self.state
    }

    pub fn current_detail(&self) -> Option<u32> {
        self.current_detail
    }

    pub fn mesh(&self) -> Option<&Arc<MeshBuffers>> {
        self.mesh.as_ref()
    }

    pub fn applied_sequence(&self) -> u64 {
        self.applied_sequence
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, ChunkState::Pending { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::BuildError;
    use crate::core::types::JobId;
    use crate::terrain::layout::ChunkGrid;
    use crate::terrain::lod::DetailRanges;

    fn lod(show_farthest: bool) -> LodSettings {
        LodSettings {
            ranges: DetailRanges::new(vec![100.0, 1500.0, 3000.0, 10000.0]).unwrap(),
            hover_range: 500.0,
            show_farthest,
        }
    }

    /// Chunk 0 of a 2000x2000 field centered at the origin, 500 cells wide
    fn chunk() -> TerrainChunk {
        let grid = ChunkGrid::new(2000, 2000, 500, Vec3::ZERO).unwrap();
        TerrainChunk::new(*grid.region(0).unwrap())
    }

    fn result(sequence: u64, detail: u32, outcome: JobOutcome) -> JobResult {
        JobResult {
            job: sequence as JobId,
            chunk: 0,
            detail,
            sequence,
            outcome,
        }
    }

    fn built(sequence: u64, detail: u32) -> JobResult {
        result(sequence, detail, JobOutcome::Built(Arc::new(MeshBuffers::default())))
    }

    #[test]
    fn test_first_tick_requests() {
        let mut chunk = chunk();
        let center = chunk.region().center;
        let far = center + Vec3::new(2000.0, 600.0, 0.0);

        assert_eq!(chunk.evaluate(far, &lod(false)), ChunkAction::Request(2));
        assert_eq!(chunk.state(), ChunkState::Pending { requested: 2 });
        assert_eq!(chunk.build_request().unwrap().detail, 2);

        // No further requests while pending
        assert_eq!(chunk.evaluate(center, &lod(false)), ChunkAction::Idle);
    }

    #[test]
    fn test_result_makes_stable() {
        let mut chunk = chunk();
        let far = chunk.region().center + Vec3::new(2000.0, 600.0, 0.0);
        chunk.evaluate(far, &lod(false));

        assert_eq!(chunk.apply(&built(1, 2)), ApplyOutcome::Applied);
        assert_eq!(chunk.state(), ChunkState::Stable(2));
        assert_eq!(chunk.current_detail(), Some(2));
        assert!(chunk.mesh().is_some());

        // Same detail again: nothing to do
        assert_eq!(chunk.evaluate(far, &lod(false)), ChunkAction::Idle);
    }

    #[test]
    fn test_hover_forces_full_detail() {
        let mut chunk = chunk();
        let center = chunk.region().center;

        // Over the footprint but high up: plain distance rule
        let high = center + Vec3::new(0.0, 1000.0, 0.0);
        assert_eq!(chunk.desired_detail(high, &lod(false)), 1);

        // Low and overhead, off-center but inside the footprint
        let low = center + Vec3::new(240.0, 400.0, -240.0);
        assert!(low.distance(center) > 100.0);
        assert_eq!(chunk.desired_detail(low, &lod(false)), 0);

        // Low but beside the chunk
        let beside = center + Vec3::new(260.0, 50.0, 0.0);
        assert_eq!(chunk.desired_detail(beside, &lod(false)), 1);
    }

    #[test]
    fn test_cull_and_show_farthest() {
        let far = Vec3::new(20_000.0, 0.0, 0.0);

        let mut hidden = chunk();
        assert_eq!(hidden.evaluate(far, &lod(false)), ChunkAction::Cull);
        assert_eq!(hidden.state(), ChunkState::Culled);
        assert!(hidden.mesh().is_none());
        assert_eq!(hidden.evaluate(far, &lod(false)), ChunkAction::Idle);

        let mut shown = chunk();
        assert_eq!(shown.evaluate(far, &lod(true)), ChunkAction::Request(4));
    }

    #[test]
    fn test_culled_chunk_comes_back() {
        let mut chunk = chunk();
        let center = chunk.region().center;
        chunk.evaluate(center + Vec3::new(0.0, 600.0, 0.0), &lod(false));
        chunk.apply(&built(1, 1));

        assert_eq!(chunk.evaluate(Vec3::splat(50_000.0), &lod(false)), ChunkAction::Cull);
        assert_eq!(chunk.current_detail(), None);

        let near = center + Vec3::new(0.0, 600.0, 0.0);
        assert_eq!(chunk.evaluate(near, &lod(false)), ChunkAction::Request(1));
    }

    #[test]
    fn test_stale_result_rejected() {
        let mut chunk = chunk();
        let center = chunk.region().center;
        chunk.evaluate(center + Vec3::new(0.0, 600.0, 0.0), &lod(false));

        assert_eq!(chunk.apply(&built(5, 1)), ApplyOutcome::Applied);
        assert_eq!(chunk.apply(&built(4, 3)), ApplyOutcome::Stale);

        assert_eq!(chunk.applied_sequence(), 5);
        assert_eq!(chunk.current_detail(), Some(1));
        assert_eq!(chunk.state(), ChunkState::Stable(1));
    }

    #[test]
    fn test_earlier_result_keeps_pending() {
        let mut chunk = chunk();
        let center = chunk.region().center;
        chunk.evaluate(center + Vec3::new(0.0, 600.0, 0.0), &lod(false));
        chunk.apply(&built(1, 1));

        // Moves away, requests detail 2; an older detail-3 job lands first
        chunk.evaluate(center + Vec3::new(2000.0, 600.0, 0.0), &lod(false));
        assert_eq!(chunk.apply(&built(2, 3)), ApplyOutcome::Applied);
        assert_eq!(chunk.state(), ChunkState::Pending { requested: 2 });

        assert_eq!(chunk.apply(&built(3, 2)), ApplyOutcome::Applied);
        assert_eq!(chunk.state(), ChunkState::Stable(2));
    }

    #[test]
    fn test_failed_build_keeps_previous_mesh() {
        let mut chunk = chunk();
        let center = chunk.region().center;
        let near = center + Vec3::new(0.0, 600.0, 0.0);
        chunk.evaluate(near, &lod(false));
        chunk.apply(&built(1, 1));

        let far = center + Vec3::new(2000.0, 600.0, 0.0);
        assert_eq!(chunk.evaluate(far, &lod(false)), ChunkAction::Request(2));

        let err = BuildError::Degenerate { chunk: 0, detail: 2, vertices_x: 1, vertices_z: 1 };
        assert_eq!(chunk.apply(&result(2, 2, JobOutcome::Failed(err))), ApplyOutcome::Failed);
        assert_eq!(chunk.state(), ChunkState::Stable(1));
        assert!(chunk.mesh().is_some());

        // Not retried while the wanted detail stays the same
        assert_eq!(chunk.evaluate(far, &lod(false)), ChunkAction::Idle);
        // A different detail is fine
        let farther = center + Vec3::new(0.0, 5000.0, 0.0);
        assert_eq!(chunk.evaluate(farther, &lod(false)), ChunkAction::Request(3));
    }

    #[test]
    fn test_lost_job_is_retried() {
        let mut chunk = chunk();
        let near = chunk.region().center + Vec3::new(0.0, 600.0, 0.0);
        chunk.evaluate(near, &lod(false));

        assert_eq!(chunk.apply(&result(1, 1, JobOutcome::Lost)), ApplyOutcome::Lost);
        assert_eq!(chunk.state(), ChunkState::Unbuilt);
        assert_eq!(chunk.evaluate(near, &lod(false)), ChunkAction::Request(1));
    }

    #[test]
    fn test_dirty_rebuilds_same_detail() {
        let mut chunk = chunk();
        let near = chunk.region().center + Vec3::new(0.0, 600.0, 0.0);
        chunk.evaluate(near, &lod(false));
        chunk.apply(&built(1, 1));

        chunk.mark_dirty();
        assert_eq!(chunk.evaluate(near, &lod(false)), ChunkAction::Request(1));
        assert!(!chunk.is_dirty());
    }

    #[test]
    fn test_samples_cell_uses_detail_margin() {
        let mut chunk = chunk();
        // Unbuilt: one-cell margin
        assert!(chunk.samples_cell(500, 10));
        assert!(!chunk.samples_cell(504, 10));

        chunk.evaluate(chunk.region().center + Vec3::new(2000.0, 600.0, 0.0), &lod(false));
        chunk.apply(&built(1, 2));
        assert!(chunk.samples_cell(515, 10));
        assert!(!chunk.samples_cell(517, 10));
    }
}
