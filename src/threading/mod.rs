pub mod thread_pool;
pub mod chunk_pipeline;

pub use thread_pool::ThreadPool;
pub use chunk_pipeline::{ChunkPipeline, ChunkResult};
