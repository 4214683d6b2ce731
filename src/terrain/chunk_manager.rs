// src/terrain/chunk_manager.rs
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use glam::DVec2;
use log::{debug, info};

use crate::terrain::chunk_position::ChunkPosition;
use crate::terrain::height_query;
use crate::terrain::noise::NoiseParameters;
use crate::terrain::terrain_chunk::{ChunkSurface, TerrainChunk};
use crate::terrain::terrain_config::TerrainConfig;
use crate::terrain::terrain_error::TerrainResult;
use crate::threading::chunk_pipeline::{ChunkPipeline, ChunkResult};
use crate::utils::error_logger::ErrorLogger;

/// What one tick changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub viewer_chunk: ChunkPosition,
    /// The viewer crossed into a new chunk and the wanted set was rebuilt.
    pub recomputed: bool,
    pub loaded: Vec<ChunkPosition>,
    pub unloaded: Vec<ChunkPosition>,
    pub failed: Vec<ChunkPosition>,
    /// Results discarded on arrival because the chunk was out of range.
    pub dropped: usize,
    pub requested: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingStats {
    pub resident: usize,
    pub active: usize,
    pub in_flight: usize,
    pub wanted: usize,
    pub failures: usize,
}

// Owns every resident chunk and decides, once per tick, what to load, show and drop.
pub struct StreamingController {
    config: Arc<TerrainConfig>,
    chunks: HashMap<ChunkPosition, TerrainChunk>,
    pipeline: ChunkPipeline,
    viewer_chunk: Option<ChunkPosition>,
    // Nearest first, mirrored in `wanted_set` for lookups
    wanted: Vec<ChunkPosition>,
    wanted_set: HashSet<ChunkPosition>,
    origin_delta: DVec2,
    error_logger: ErrorLogger,
}

impl StreamingController {
    pub fn new(
        config: Arc<TerrainConfig>,
        noise: &NoiseParameters,
        threads: usize,
    ) -> TerrainResult<Self> {
        config.validate()?;
        noise.validate()?;
        let pipeline = ChunkPipeline::new(config.clone(), noise, threads)?;
        Ok(Self::with_pipeline(config, pipeline))
    }

    pub fn with_pipeline(config: Arc<TerrainConfig>, pipeline: ChunkPipeline) -> Self {
        info!(
            "StreamingController: render distance {} (+{} retained), {} worker threads",
            config.render_distance,
            config.retention_margin,
            pipeline.num_threads()
        );
        StreamingController {
            config,
            chunks: HashMap::new(),
            pipeline,
            viewer_chunk: None,
            wanted: Vec::new(),
            wanted_set: HashSet::new(),
            origin_delta: DVec2::ZERO,
            error_logger: ErrorLogger::new(),
        }
    }

    pub fn config(&self) -> &Arc<TerrainConfig> {
        &self.config
    }

    /// Runs one streaming step for a viewer at an absolute horizontal position.
    pub fn tick(&mut self, viewer_xz: DVec2) -> TickOutcome {
        let side = self.config.chunk_side_length() as f64;
        let viewer_chunk = ChunkPosition::from_world(viewer_xz, side);
        let recomputed = self.viewer_chunk != Some(viewer_chunk);
        if recomputed {
            self.viewer_chunk = Some(viewer_chunk);
            self.wanted = wanted_positions(viewer_chunk, self.config.render_distance);
            self.wanted_set = self.wanted.iter().copied().collect();
            debug!(
                "StreamingController: viewer entered {}, {} chunks wanted",
                viewer_chunk,
                self.wanted.len()
            );
        }

        let mut outcome = TickOutcome {
            viewer_chunk,
            recomputed,
            ..TickOutcome::default()
        };

        self.evict(viewer_chunk, &mut outcome);
        self.receive(viewer_chunk, &mut outcome);

        if recomputed {
            self.refresh_resident(viewer_chunk);
            self.request_missing(&mut outcome);
        }

        outcome
    }

    fn retention_radius_squared(&self) -> i64 {
        let radius = (self.config.render_distance + self.config.retention_margin) as i64;
        radius * radius
    }

    fn evict(&mut self, viewer_chunk: ChunkPosition, outcome: &mut TickOutcome) {
        let limit = self.retention_radius_squared();
        self.chunks.retain(|position, chunk| {
            let keep = position.distance_squared(viewer_chunk) <= limit;
            if !keep {
                debug!("StreamingController: evicting {}", chunk.label());
                outcome.unloaded.push(*position);
            }
            keep
        });
    }

    fn receive(&mut self, viewer_chunk: ChunkPosition, outcome: &mut TickOutcome) {
        let limit = self.retention_radius_squared();
        for result in self.pipeline.drain() {
            match result {
                ChunkResult::Ready(mut chunk) => {
                    let position = chunk.position();
                    // Requests skip resident coordinates and only this loop inserts
                    debug_assert!(
                        !self.chunks.contains_key(&position),
                        "{} delivered while resident",
                        chunk.label()
                    );
                    if position.distance_squared(viewer_chunk) > limit {
                        debug!("StreamingController: dropping out-of-range {}", chunk.label());
                        outcome.dropped += 1;
                        continue;
                    }

                    chunk.place(self.origin_delta);
                    chunk.set_lod(self.config.lod_for_distance(position.distance(viewer_chunk)));
                    chunk.set_active(self.wanted_set.contains(&position));
                    self.chunks.insert(position, chunk);
                    outcome.loaded.push(position);
                }
                ChunkResult::Failed { position, error } => {
                    self.error_logger
                        .log_error("StreamingController", &format!("T{}: {}", position, error));
                    outcome.failed.push(position);
                }
            }
        }
    }

    fn refresh_resident(&mut self, viewer_chunk: ChunkPosition) {
        for (position, chunk) in self.chunks.iter_mut() {
            if self.wanted_set.contains(position) {
                chunk.set_active(true);
                chunk.set_lod(self.config.lod_for_distance(position.distance(viewer_chunk)));
            } else {
                chunk.set_active(false);
            }
        }
    }

    fn request_missing(&mut self, outcome: &mut TickOutcome) {
        for position in &self.wanted {
            if self.chunks.contains_key(position) || self.pipeline.is_in_flight(*position) {
                continue;
            }
            if self.pipeline.request(*position) {
                outcome.requested += 1;
            }
        }
    }

    /// Moves every resident chunk with the origin.
    pub fn shift_origin(&mut self, delta: DVec2) {
        self.origin_delta += delta;
        for chunk in self.chunks.values_mut() {
            chunk.shift_origin(delta);
        }
    }

    pub fn origin_delta(&self) -> DVec2 {
        self.origin_delta
    }

    /// Height of the full-detail surface at an absolute position.
    pub fn height(&self, world_xz: DVec2) -> TerrainResult<f32> {
        height_query::height_at(&self.chunks, &self.config, world_xz)
    }

    /// Same as [`height`](Self::height) for a scene-space position.
    pub fn height_scene(&self, scene_xz: DVec2) -> TerrainResult<f32> {
        self.height(scene_xz - self.origin_delta)
    }

    pub fn chunk(&self, position: ChunkPosition) -> Option<&TerrainChunk> {
        self.chunks.get(&position)
    }

    pub fn chunk_surface(&self, position: ChunkPosition) -> Option<ChunkSurface<'_>> {
        self.chunks.get(&position).map(TerrainChunk::surface)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &TerrainChunk> {
        self.chunks.values()
    }

    pub fn active_chunks(&self) -> impl Iterator<Item = &TerrainChunk> {
        self.chunks.values().filter(|chunk| chunk.is_active())
    }

    pub fn is_resident(&self, position: ChunkPosition) -> bool {
        self.chunks.contains_key(&position)
    }

    pub fn viewer_chunk(&self) -> Option<ChunkPosition> {
        self.viewer_chunk
    }

    pub fn wanted_positions(&self) -> &[ChunkPosition] {
        &self.wanted
    }

    /// Every wanted chunk is resident.
    pub fn is_fully_loaded(&self) -> bool {
        self.viewer_chunk.is_some() && self.wanted.iter().all(|p| self.chunks.contains_key(p))
    }

    pub fn stats(&self) -> StreamingStats {
        StreamingStats {
            resident: self.chunks.len(),
            active: self.chunks.values().filter(|c| c.is_active()).count(),
            in_flight: self.pipeline.in_flight_count(),
            wanted: self.wanted.len(),
            failures: self.error_logger.error_count(),
        }
    }

    pub fn error_history(&self) -> Vec<String> {
        self.error_logger.get_error_history()
    }
}

/// Chunks within `render_distance` of `center`, nearest first.
pub fn wanted_positions(center: ChunkPosition, render_distance: i32) -> Vec<ChunkPosition> {
    let r = render_distance;
    let mut offsets = Vec::new();
    for x in -r..r {
        for z in -r..r {
            if x * x + z * z < r * r {
                offsets.push((x, z));
            }
        }
    }
    offsets.sort_by_key(|&(x, z)| (x * x + z * z, x, z));
    offsets
        .into_iter()
        .map(|(x, z)| center.offset(x, z))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use crate::terrain::height_field::HeightFieldGenerator;
    use crate::threading::thread_pool::ThreadPool;

    fn config() -> Arc<TerrainConfig> {
        Arc::new(TerrainConfig {
            grid_resolution: 9,
            world_scale: 1.0,
            height_scale: 10.0,
            render_distance: 3,
            retention_margin: 1,
            levels_of_detail: 3,
            lod_limit: 1,
            descend_multiplier: None,
        })
    }

    fn controller() -> StreamingController {
        StreamingController::new(config(), &NoiseParameters::default(), 2).unwrap()
    }

    // Ticks at `viewer` until every wanted chunk is resident and nothing is in flight
    fn settle(controller: &mut StreamingController, viewer: DVec2) -> Vec<TickOutcome> {
        let deadline = Instant::now() + Duration::from_secs(20);
        let mut outcomes = vec![controller.tick(viewer)];
        while !(controller.is_fully_loaded() && controller.stats().in_flight == 0) {
            assert!(Instant::now() < deadline, "streaming did not settle");
            std::thread::sleep(Duration::from_millis(5));
            outcomes.push(controller.tick(viewer));
        }
        outcomes
    }

    #[test]
    fn wanted_set_is_a_disk_sorted_by_distance() {
        let wanted = wanted_positions(ChunkPosition::new(10, -4), 2);
        assert_eq!(wanted.len(), 9);
        assert_eq!(wanted[0], ChunkPosition::new(10, -4));
        let distances: Vec<_> = wanted
            .iter()
            .map(|p| p.distance_squared(ChunkPosition::new(10, -4)))
            .collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
        assert!(!wanted.contains(&ChunkPosition::new(12, -4)));
    }

    #[test]
    fn wanted_set_excludes_the_rim() {
        let wanted = wanted_positions(ChunkPosition::ORIGIN, 3);
        assert!(wanted.contains(&ChunkPosition::new(-2, -2)));
        assert!(wanted.contains(&ChunkPosition::new(2, 2)));
        assert!(!wanted.contains(&ChunkPosition::new(3, 0)));
        assert!(!wanted.contains(&ChunkPosition::new(-3, 0)));
        assert_eq!(wanted.len(), 25);
        assert_eq!(wanted.len(), config().wanted_chunk_count());
    }

    #[test]
    fn loads_every_wanted_chunk() {
        let mut c = controller();
        let outcomes = settle(&mut c, DVec2::ZERO);
        assert!(outcomes[0].recomputed);
        assert_eq!(outcomes[0].requested, c.wanted_positions().len());
        assert!(outcomes[1..].iter().all(|o| !o.recomputed && o.requested == 0));

        let stats = c.stats();
        assert_eq!(stats.resident, stats.wanted);
        assert_eq!(stats.active, stats.wanted);
        for position in c.wanted_positions() {
            let chunk = c.chunk(*position).unwrap();
            let expected = c.config().lod_for_distance(position.distance(ChunkPosition::ORIGIN));
            let expected = if expected == 1 { 0 } else { expected };
            assert_eq!(chunk.lod(), Some(expected), "{}", chunk.label());
        }
        assert!(c.height(DVec2::new(1.0, -2.5)).is_ok());
    }

    #[test]
    fn far_move_evicts_and_drops_stale_results() {
        let mut c = controller();
        let first = c.tick(DVec2::ZERO);
        assert_eq!(first.requested, 25);

        // Far enough that nothing near the origin stays in range
        let far = DVec2::new(800.0, 0.0);
        let outcomes = settle(&mut c, far);
        let dropped: usize = outcomes.iter().map(|o| o.dropped).sum();
        let unloaded: usize = outcomes.iter().map(|o| o.unloaded.len()).sum();
        // Every origin chunk is either dropped on arrival or loaded before the move and then evicted
        assert_eq!(dropped + unloaded, first.requested);

        let viewer = c.viewer_chunk().unwrap();
        assert_eq!(viewer, ChunkPosition::new(100, 0));
        let limit = 4 * 4;
        assert!(c.chunks().all(|chunk| chunk.position().distance_squared(viewer) <= limit));
    }

    #[test]
    fn chunks_in_margin_are_deactivated_not_dropped() {
        let mut c = controller();
        settle(&mut c, DVec2::ZERO);
        // One chunk to +x: (-2, 0) leaves the wanted disk but stays within distance 4
        let outcome = c.tick(DVec2::new(8.0, 0.0));
        assert!(outcome.recomputed);
        let kept = c.chunk(ChunkPosition::new(-2, 0)).unwrap();
        assert!(!kept.is_active());
        assert!(outcome.unloaded.is_empty());
        assert!(c.stats().active < c.stats().resident);
    }

    #[test]
    fn steady_viewer_changes_nothing() {
        let mut c = controller();
        settle(&mut c, DVec2::ZERO);
        let lods: HashMap<_, _> = c.chunks().map(|ch| (ch.position(), ch.lod())).collect();
        let outcome = c.tick(DVec2::new(1.5, -1.5));
        assert!(!outcome.recomputed);
        assert_eq!(outcome.requested, 0);
        for chunk in c.chunks() {
            assert_eq!(lods[&chunk.position()], chunk.lod());
        }
    }

    #[test]
    fn origin_shift_moves_chunks_and_scene_queries() {
        let mut c = controller();
        settle(&mut c, DVec2::ZERO);
        let absolute = DVec2::new(2.5, 3.25);
        let before = c.height(absolute).unwrap();
        let center_before = c.chunk(ChunkPosition::ORIGIN).unwrap().scene_center();

        let delta = DVec2::new(-3.0, 7.0);
        c.shift_origin(delta);
        assert_eq!(c.chunk(ChunkPosition::ORIGIN).unwrap().scene_center(), center_before + delta);
        assert_eq!(c.height_scene(absolute + delta).unwrap(), before);
    }

    #[test]
    fn failed_chunks_are_recorded_and_retried_on_crossing() {
        // Height fields of the wrong size make every mesh stage fail
        let generator = HeightFieldGenerator::shared(5, &NoiseParameters::default());
        let pipeline =
            ChunkPipeline::from_parts(config(), generator, ThreadPool::new(1).unwrap()).unwrap();
        let mut c = StreamingController::with_pipeline(config(), pipeline);

        let first = c.tick(DVec2::ZERO);
        assert!(first.recomputed);
        assert_eq!(first.requested, 25);

        let deadline = Instant::now() + Duration::from_secs(20);
        let mut failed = first.failed.clone();
        while c.stats().in_flight > 0 {
            assert!(Instant::now() < deadline, "failures never arrived");
            std::thread::sleep(Duration::from_millis(5));
            let outcome = c.tick(DVec2::new(1.0, -2.0));
            assert!(!outcome.recomputed);
            assert_eq!(outcome.requested, 0);
            assert!(outcome.loaded.is_empty());
            failed.extend(outcome.failed);
        }

        failed.sort_by_key(|p| (p.x, p.z));
        let mut wanted = c.wanted_positions().to_vec();
        wanted.sort_by_key(|p| (p.x, p.z));
        assert_eq!(failed, wanted);

        let stats = c.stats();
        assert_eq!(stats.resident, 0);
        assert_eq!(stats.failures, 25);
        let history = c.error_history();
        assert_eq!(history.len(), 25);
        assert!(history.iter().all(|e| e.starts_with("[StreamingController]")));
        assert!(!c.is_resident(ChunkPosition::ORIGIN));
        assert!(!c.is_fully_loaded());

        // Same chunk: nothing is retried
        let idle = c.tick(DVec2::ZERO);
        assert_eq!(idle.requested, 0);
        assert_eq!(c.stats().in_flight, 0);

        // Crossing into (1, 0) requests the new wanted set again
        let crossed = c.tick(DVec2::new(8.0, 0.0));
        assert!(crossed.recomputed);
        assert_eq!(crossed.viewer_chunk, ChunkPosition::new(1, 0));
        assert_eq!(crossed.requested, 25);
        assert!(c.stats().in_flight > 0);
    }

    #[test]
    fn missing_height_is_an_error() {
        let c = controller();
        assert!(c.height(DVec2::new(1000.0, 1000.0)).is_err());
        assert!(!c.is_fully_loaded());
    }
}
