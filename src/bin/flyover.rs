//! Flyover demo - streams LOD chunks under a moving viewpoint.
//!
//! Usage: cargo run --release --bin flyover -- [OPTIONS]
//!
//! Options:
//!   --size <CELLS>       Height field width and depth (default: 4000)
//!   --seed <SEED>        Noise seed (default: 12345)
//!   --scale <SCALE>      Noise horizontal scale (default: 400.0)
//!   --height <H>         Noise height scale (default: 300.0)
//!   --chunk <CELLS>      Chunk size (default: from config)
//!   --workers <N>        Build threads, 0 builds on the main thread (default: from config)
//!   --altitude <Y>       Flight altitude (default: 450.0)
//!   --speed <UNITS>      Distance moved per tick (default: 40.0)
//!   --ticks <N>          Number of ticks to fly (default: 300)
//!   --edit-every <N>     Raise the ground under the viewpoint every N ticks (default: 0, off)
//!   --config <PATH>      Load terrain settings from JSON
//!   --save-config <PATH> Write the effective settings to JSON and continue

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use glam::Vec3;

use terralod::core::{ChunkIndex, TerrainConfig, logging};
use terralod::mesh::{MeshBuffers, Placement};
use terralod::terrain::{SceneSink, TerrainGenerator, TerrainMap, TerrainParams, UpdateStats};

/// Tracks what would be on screen
#[derive(Default)]
struct CountingSink {
    shown: HashMap<ChunkIndex, (u32, usize)>,
    attaches: usize,
    detaches: usize,
}

impl CountingSink {
    fn triangles(&self) -> usize {
        self.shown.values().map(|(_, t)| t).sum()
    }

    fn detail_histogram(&self) -> BTreeMap<u32, usize> {
        let mut histogram = BTreeMap::new();
        for (detail, _) in self.shown.values() {
            *histogram.entry(*detail).or_insert(0) += 1;
        }
        histogram
    }
}

impl SceneSink for CountingSink {
    fn attach_mesh(&mut self, chunk: ChunkIndex, mesh: Arc<MeshBuffers>, placement: Placement) {
        log::trace!(
            "attach chunk {} detail {} at {:?} ({} sub-ranges)",
            chunk,
            placement.detail,
            placement.translation,
            mesh.sub_ranges.len()
        );
        self.shown.insert(chunk, (placement.detail, mesh.triangle_count()));
        self.attaches += 1;
    }

    fn detach_mesh(&mut self, chunk: ChunkIndex) {
        log::trace!("detach chunk {}", chunk);
        self.shown.remove(&chunk);
        self.detaches += 1;
    }
}

fn main() {
    logging::init_with_timestamps();

    if let Err(e) = run() {
        log::error!("flyover failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> terralod::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => TerrainConfig::load(&PathBuf::from(path))?,
        None => TerrainConfig::default(),
    };
    if let Some(chunk) = parse_u32_arg(&args, "--chunk") {
        config.chunk_size = chunk;
    }
    if let Some(workers) = parse_usize_arg(&args, "--workers") {
        config.use_workers = workers > 0;
        config.worker_count = workers.max(1);
    }
    config.validate()?;

    if let Some(path) = parse_str_arg(&args, "--save-config") {
        config.save(&PathBuf::from(path))?;
    }

    let size = parse_u32_arg(&args, "--size").unwrap_or(4000);
    let params = TerrainParams {
        seed: parse_u32_arg(&args, "--seed").unwrap_or(12345),
        scale: parse_f32_arg(&args, "--scale").unwrap_or(400.0),
        height_scale: parse_f32_arg(&args, "--height").unwrap_or(300.0),
        ..Default::default()
    };
    let altitude = parse_f32_arg(&args, "--altitude").unwrap_or(450.0);
    let speed = parse_f32_arg(&args, "--speed").unwrap_or(40.0);
    let ticks = parse_usize_arg(&args, "--ticks").unwrap_or(300);
    let edit_every = parse_usize_arg(&args, "--edit-every").unwrap_or(0);

    log::info!("Generating {}x{} height field (seed {})", size, size, params.seed);
    let start = Instant::now();
    let field = TerrainGenerator::new(params).generate(size, size)?;
    log::info!("Height field ready in {:.2?}", start.elapsed());

    let mut map = TerrainMap::open(config, field)?;
    let mut sink = CountingSink::default();

    // Fly west to east across the middle of the terrain
    let origin = map.config().position();
    let half = size as f32 * 0.45;
    let mut viewpoint = Vec3::new(origin.x - half, origin.y + altitude, origin.z);
    let mut totals = UpdateStats::default();

    let start = Instant::now();
    for tick in 0..ticks {
        let stats = map.update(&viewpoint, &mut sink);
        accumulate(&mut totals, &stats);

        if edit_every > 0 && tick > 0 && tick % edit_every == 0 {
            raise_ground(&mut map, viewpoint)?;
        }

        if tick % 50 == 0 {
            log::info!(
                "tick {:4} at x={:8.1}: {} chunks shown, {} triangles, in flight {}, queued {}",
                tick,
                viewpoint.x,
                sink.shown.len(),
                sink.triangles(),
                map.scheduler().in_flight(),
                map.scheduler().queued()
            );
        }

        viewpoint.x += speed;
        thread::sleep(Duration::from_millis(2));
    }

    // Let outstanding builds land
    let deadline = Instant::now() + Duration::from_secs(30);
    while !map.is_settled() && Instant::now() < deadline {
        let stats = map.update(&viewpoint, &mut sink);
        accumulate(&mut totals, &stats);
        thread::sleep(Duration::from_millis(1));
    }

    log::info!("Flight finished in {:.2?}", start.elapsed());
    log::info!(
        "Updates: applied {}, stale {}, failed {}, lost {}, requested {}, culled {}",
        totals.applied,
        totals.stale,
        totals.failed,
        totals.lost,
        totals.requested,
        totals.culled
    );
    log::info!("Scheduler: {:?}", map.scheduler_stats());
    log::info!(
        "Scene: {} attaches, {} detaches, {} chunks shown by detail {:?}",
        sink.attaches,
        sink.detaches,
        sink.shown.len(),
        sink.detail_histogram()
    );

    Ok(())
}

fn raise_ground<B: terralod::streaming::BuildBackend>(
    map: &mut TerrainMap<B>,
    viewpoint: Vec3,
) -> terralod::Result<()> {
    let (x, z) = map.grid().world_to_cell(viewpoint.x, viewpoint.z);
    if x < 0.0 || z < 0.0 {
        return Ok(());
    }
    let (x, z) = (x as u32, z as u32);

    if let Some(current) = map.field().get(x, z) {
        map.set_height(x, z, current + 50.0)?;
        log::info!("Raised cell ({}, {}) to {:.1}", x, z, current + 50.0);
    }
    Ok(())
}

fn accumulate(totals: &mut UpdateStats, stats: &UpdateStats) {
    totals.applied += stats.applied;
    totals.stale += stats.stale;
    totals.failed += stats.failed;
    totals.lost += stats.lost;
    totals.requested += stats.requested;
    totals.culled += stats.culled;
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
