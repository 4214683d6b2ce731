use rayon::ThreadPoolBuilder;
use log::info;

use crate::terrain::terrain_error::TerrainResult;

// A wrapper around Rayon's ThreadPool that provides a clean interface for terrain generation.
// Owned by whoever builds it; there is no process-wide pool.
pub struct ThreadPool {
    pool: rayon::ThreadPool,
    num_threads: usize,
}

impl ThreadPool {
    // Create a new ThreadPool with the specified number of threads.
    // If size is 0, one core is left free for the control loop (minimum one worker).
    pub fn new(size: usize) -> TerrainResult<ThreadPool> {
        let num_threads = if size > 0 {
            size
        } else {
            std::cmp::max(1, num_cpus::get().saturating_sub(1))
        };

        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|index| format!("terrain-worker-{}", index))
            .build()?;

        info!("Created thread pool with {} threads", num_threads);

        Ok(ThreadPool { pool, num_threads })
    }

    // Execute a job in the thread pool without waiting for it
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(f);
    }

    // Get the number of threads in the pool
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }
}
