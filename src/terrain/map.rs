//! Terrain map - ties chunks, scheduler and scene together
//!
//! The map runs entirely on the coordinating thread. Each call to
//! [`TerrainMap::update`] first folds in whatever builds have finished,
//! then re-evaluates every chunk against the viewpoint and submits new
//! requests. Meshes reach the scene only through a [`SceneSink`].

use std::sync::Arc;

use glam::Vec3;

use crate::core::config::TerrainConfig;
use crate::core::types::ChunkIndex;
use crate::mesh::buffers::{MeshBuffers, Placement};
use crate::streaming::backend::BuildBackend;
use crate::streaming::inline::InlineBuilder;
use crate::streaming::scheduler::{ChunkScheduler, SchedulerStats};
use crate::streaming::worker_pool::WorkerPool;
use crate::terrain::chunk::{ApplyOutcome, ChunkAction, TerrainChunk};
use crate::terrain::height_field::{HeightEdit, HeightField};
use crate::terrain::layout::ChunkGrid;
use crate::terrain::lod::LodSettings;

/// Receives finished meshes and removal notices
pub trait SceneSink {
    /// Show `mesh` for `chunk`, replacing whatever was shown before
    fn attach_mesh(&mut self, chunk: ChunkIndex, mesh: Arc<MeshBuffers>, placement: Placement);

    /// Stop showing `chunk`
    fn detach_mesh(&mut self, chunk: ChunkIndex);
}

/// Source of the position LOD is evaluated against, polled once per update
pub trait Viewpoint {
    fn current_position(&self) -> Vec3;
}

impl Viewpoint for Vec3 {
    fn current_position(&self) -> Vec3 {
        *self
    }
}

/// What happened during one update
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// Meshes handed to the sink
    pub applied: usize,
    /// Results dropped as out of date
    pub stale: usize,
    pub failed: usize,
    pub lost: usize,
    /// Builds submitted to the scheduler
    pub requested: usize,
    /// Chunks detached for distance
    pub culled: usize,
}

/// LOD terrain over one height field
pub struct TerrainMap<B: BuildBackend> {
    config: TerrainConfig,
    lod: LodSettings,
    field: HeightField,
    grid: ChunkGrid,
    chunks: Vec<TerrainChunk>,
    scheduler: ChunkScheduler<B>,
}

impl TerrainMap<WorkerPool> {
    /// Lay out the terrain and spawn `config.worker_count` build threads
    pub fn spawn(config: TerrainConfig, field: HeightField) -> crate::Result<Self> {
        config.validate()?;
        let pool = WorkerPool::spawn(config.worker_count, &field)?;
        Self::with_backend(config, field, pool)
    }
}

impl TerrainMap<InlineBuilder> {
    /// Lay out the terrain and build meshes on the calling thread.
    ///
    /// The worker settings in `config` are ignored; the returned map's
    /// config has `use_workers` cleared.
    pub fn inline(mut config: TerrainConfig, field: HeightField) -> crate::Result<Self> {
        config.use_workers = false;
        let builder = InlineBuilder::new(field.clone());
        Self::with_backend(config, field, builder)
    }
}

impl TerrainMap<Box<dyn BuildBackend>> {
    /// Pick the backend from `config.use_workers`
    pub fn open(config: TerrainConfig, field: HeightField) -> crate::Result<Self> {
        config.validate()?;
        let backend: Box<dyn BuildBackend> = if config.use_workers {
            Box::new(WorkerPool::spawn(config.worker_count, &field)?)
        } else {
            Box::new(InlineBuilder::new(field.clone()))
        };
        Self::with_backend(config, field, backend)
    }
}

impl<B: BuildBackend> TerrainMap<B> {
    /// Lay out the terrain over `field` using an already constructed backend.
    ///
    /// The backend must hold the same heights as `field`.
    pub fn with_backend(
        config: TerrainConfig,
        field: HeightField,
        backend: B,
    ) -> crate::Result<Self> {
        let lod = config.lod_settings()?;
        let grid = ChunkGrid::new(
            field.width(),
            field.depth(),
            config.chunk_size,
            config.position(),
        )?;
        let chunks = grid.regions().iter().copied().map(TerrainChunk::new).collect();

        log::info!(
            "Terrain {}x{} laid out as {}x{} chunks of {} cells, {} build slot(s)",
            field.width(),
            field.depth(),
            grid.columns(),
            grid.rows(),
            config.chunk_size,
            backend.slot_count()
        );

        Ok(Self {
            config,
            lod,
            field,
            grid,
            chunks,
            scheduler: ChunkScheduler::new(backend),
        })
    }

    /// Apply finished builds, then re-evaluate every chunk against the viewpoint
    pub fn update(&mut self, viewpoint: &impl Viewpoint, sink: &mut impl SceneSink) -> UpdateStats {
        let mut stats = UpdateStats::default();

        for result in self.scheduler.pump() {
            let Some(chunk) = self.chunks.get_mut(result.chunk) else {
                log::warn!("Result for unknown chunk {}", result.chunk);
                continue;
            };

            match chunk.apply(&result) {
                ApplyOutcome::Applied => {
                    if let Some(mesh) = result.mesh() {
                        let center = chunk.region().center;
                        let placement = Placement::new(result.chunk, result.detail, center, mesh);
                        sink.attach_mesh(result.chunk, Arc::clone(mesh), placement);
                    }
                    stats.applied += 1;
                }
                ApplyOutcome::Stale => stats.stale += 1,
                ApplyOutcome::Failed => stats.failed += 1,
                ApplyOutcome::Lost => stats.lost += 1,
            }
        }

        let position = viewpoint.current_position();
        for chunk in &mut self.chunks {
            match chunk.evaluate(position, &self.lod) {
                ChunkAction::Idle => {}
                ChunkAction::Request(_) => {
                    if let Some(request) = chunk.build_request() {
                        self.scheduler.submit(request);
                        stats.requested += 1;
                    }
                }
                ChunkAction::Cull => {
                    sink.detach_mesh(chunk.region().chunk);
                    stats.culled += 1;
                }
            }
        }

        if stats != UpdateStats::default() {
            log::debug!("Terrain update: {:?}", stats);
        }
        stats
    }

    /// Change one height, push it to every worker and rebuild chunks that sample it
    pub fn set_height(&mut self, x: u32, z: u32, height: f32) -> crate::Result<()> {
        let edit = HeightEdit { x, z, height };
        self.field.apply(edit)?;
        self.scheduler.broadcast_height(edit);

        let mut dirtied = 0;
        for chunk in self.chunks.iter_mut().filter(|c| c.samples_cell(x, z)) {
            chunk.mark_dirty();
            dirtied += 1;
        }

        log::trace!("Height ({}, {}) = {}, {} chunk(s) dirtied", x, z, height, dirtied);
        Ok(())
    }

    /// World-space terrain height under a point
    pub fn height_at(&self, world_x: f32, world_z: f32) -> Option<f32> {
        let (x, z) = self.grid.world_to_cell(world_x, world_z);
        self.field
            .height_at(x, z)
            .map(|h| h + self.grid.world_origin().y)
    }

    /// Chunk under a world-space point
    pub fn chunk_at(&self, world_x: f32, world_z: f32) -> Option<&TerrainChunk> {
        self.grid
            .chunk_at(world_x, world_z)
            .and_then(|index| self.chunks.get(index))
    }

    pub fn chunk(&self, index: ChunkIndex) -> Option<&TerrainChunk> {
        self.chunks.get(index)
    }

    pub fn chunks(&self) -> &[TerrainChunk] {
        &self.chunks
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn lod(&self) -> &LodSettings {
        &self.lod
    }

    pub fn field(&self) -> &HeightField {
        &self.field
    }

    pub fn grid(&self) -> &ChunkGrid {
        &self.grid
    }

    pub fn scheduler(&self) -> &ChunkScheduler<B> {
        &self.scheduler
    }

    pub fn scheduler_stats(&self) -> &SchedulerStats {
        self.scheduler.stats()
    }

    /// No chunk waiting on a build and nothing queued or running
    pub fn is_settled(&self) -> bool {
        self.scheduler.is_idle() && !self.chunks.iter().any(|c| c.is_pending())
    }
}
