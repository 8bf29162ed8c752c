pub mod memory_progress_cache;

pub use memory_progress_cache::MemoryProgressCache;
