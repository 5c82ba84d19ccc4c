//! Bounded worker pool for batches of independent requests.

use kplay_analysis::Environment;
use rayon::prelude::*;

/// Worker thread stack size. Parsing and checking recurse on nested
/// expressions; `stacker` grows the stack past this when needed.
const STACK_SIZE: usize = 16 * 1024 * 1024;

/// Runs a batch on a scoped rayon pool and returns results in submission
/// order.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkerPool {
    /// `None` lets rayon size the pool.
    workers: Option<usize>,
}

impl WorkerPool {
    pub fn new(workers: Option<usize>) -> Self {
        WorkerPool { workers }
    }

    /// Sized by `KPLAY_WORKERS`, through the environment.
    pub fn from_environment(env: &Environment) -> Self {
        Self::new(env.workers())
    }

    pub fn workers(&self) -> Option<usize> {
        self.workers
    }

    /// Apply `f` to every item. Falls back to running sequentially when the
    /// pool cannot be built.
    pub fn run<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        if items.len() <= 1 {
            return items.iter().map(&f).collect();
        }

        let mut builder = rayon::ThreadPoolBuilder::new().stack_size(STACK_SIZE);
        if let Some(workers) = self.workers {
            builder = builder.num_threads(workers);
        }
        builder
            .build_scoped(rayon::ThreadBuilder::run, |pool| {
                pool.install(|| items.par_iter().map(&f).collect::<Vec<_>>())
            })
            .unwrap_or_else(|e| {
                tracing::warn!("failed to create worker pool ({e}), running sequentially");
                items.iter().map(&f).collect()
            })
    }
}

#[cfg(test)]
mod tests;
