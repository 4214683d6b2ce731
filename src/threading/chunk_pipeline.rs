// src/threading/chunk_pipeline.rs
use std::any::Any;
use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};

use log::{debug, trace};

use crate::terrain::chunk_position::ChunkPosition;
use crate::terrain::height_field::HeightFieldGenerator;
use crate::terrain::mesh_builder::MeshBuilder;
use crate::terrain::noise::NoiseParameters;
use crate::terrain::terrain_chunk::TerrainChunk;
use crate::terrain::terrain_config::TerrainConfig;
use crate::terrain::terrain_error::{TerrainError, TerrainResult};
use crate::threading::thread_pool::ThreadPool;

// Outcome of one chunk request, sent back from the workers
#[derive(Debug)]
pub enum ChunkResult {
    Ready(TerrainChunk),
    Failed {
        position: ChunkPosition,
        error: TerrainError,
    },
}

impl ChunkResult {
    pub fn position(&self) -> ChunkPosition {
        match self {
            ChunkResult::Ready(chunk) => chunk.position(),
            ChunkResult::Failed { position, .. } => *position,
        }
    }
}

// Shared, read-only state the workers need
struct Stages {
    config: Arc<TerrainConfig>,
    generator: Arc<HeightFieldGenerator>,
    builder: MeshBuilder,
}

/// Two-stage background generation: height field, then mesh set.
///
/// Requests are keyed by coordinate; a coordinate already in flight is not
/// requested again until its result has been drained.
pub struct ChunkPipeline {
    pool: ThreadPool,
    stages: Arc<Stages>,
    result_sender: Sender<ChunkResult>,
    result_receiver: Receiver<ChunkResult>,
    in_flight: HashSet<ChunkPosition>,
}

impl ChunkPipeline {
    pub fn new(
        config: Arc<TerrainConfig>,
        noise: &NoiseParameters,
        threads: usize,
    ) -> TerrainResult<Self> {
        let generator = HeightFieldGenerator::shared(config.grid_resolution, noise);
        Self::from_parts(config, generator, ThreadPool::new(threads)?)
    }

    pub fn from_parts(
        config: Arc<TerrainConfig>,
        generator: Arc<HeightFieldGenerator>,
        pool: ThreadPool,
    ) -> TerrainResult<Self> {
        let (result_sender, result_receiver) = channel();
        Ok(ChunkPipeline {
            pool,
            stages: Arc::new(Stages {
                builder: MeshBuilder::new(config.clone()),
                config,
                generator,
            }),
            result_sender,
            result_receiver,
            in_flight: HashSet::new(),
        })
    }

    /// Queues a chunk. Returns `false` if the coordinate is already in flight.
    pub fn request(&mut self, position: ChunkPosition) -> bool {
        if !self.in_flight.insert(position) {
            trace!("ChunkPipeline: T{} already in flight", position);
            return false;
        }

        let stages = Arc::clone(&self.stages);
        let sender = self.result_sender.clone();
        self.pool.execute(move || {
            let field = catch_unwind(AssertUnwindSafe(|| stages.generator.generate(position)))
                .unwrap_or_else(|panic| Err(panic_error(position, "height field", panic)));

            match field {
                Ok(field) => {
                    // Stage two goes back onto the same pool
                    rayon::spawn(move || {
                        let chunk = catch_unwind(AssertUnwindSafe(|| {
                            let meshes = stages.builder.build(&field)?;
                            TerrainChunk::new(position, meshes, stages.config.clone())
                        }))
                        .unwrap_or_else(|panic| Err(panic_error(position, "mesh", panic)));
                        let _ = sender.send(into_result(position, chunk));
                    });
                }
                Err(error) => {
                    let _ = sender.send(ChunkResult::Failed { position, error });
                }
            }
        });

        debug!("ChunkPipeline: requested T{}", position);
        true
    }

    /// Collects every finished request without blocking, in completion order.
    pub fn drain(&mut self) -> Vec<ChunkResult> {
        let results: Vec<ChunkResult> = self.result_receiver.try_iter().collect();
        for result in &results {
            self.in_flight.remove(&result.position());
        }
        results
    }

    pub fn is_in_flight(&self, position: ChunkPosition) -> bool {
        self.in_flight.contains(&position)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn num_threads(&self) -> usize {
        self.pool.num_threads()
    }
}

fn into_result(position: ChunkPosition, chunk: TerrainResult<TerrainChunk>) -> ChunkResult {
    match chunk {
        Ok(chunk) => ChunkResult::Ready(chunk),
        Err(error) => ChunkResult::Failed { position, error },
    }
}

fn panic_error(position: ChunkPosition, stage: &str, panic: Box<dyn Any + Send>) -> TerrainError {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    TerrainError::Generation {
        position,
        reason: format!("{} stage panicked: {}", stage, message),
    }
}
