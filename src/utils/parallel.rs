//! Parallel processing utilities

/// Smallest number of sets handed to a worker at once
pub const MIN_SETS_PER_TASK: usize = 10;

/// Resolve a thread count where 0 means all available cores
pub fn resolve_threads(threads: usize) -> usize {
    if threads == 0 {
        num_cpus::get()
    } else {
        threads
    }
}

/// Configure the global thread pool
pub fn configure_thread_pool(threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(resolve_threads(threads))
        .build_global()
}
