//! Worker-pool dispatch of data-parallel maps
//!
//! Every parallel loop in the crate maps over one independent index axis:
//! momentum points, frequency points, spatial points, or orbital rows. The
//! [`Dispatcher`] owns the scheduling strategy for such a map. It is either
//! a plain sequential loop or an owned `rayon` pool of explicit size, chosen
//! by the caller at construction; the two strategies share one
//! implementation and produce results in identical index order, so output is
//! independent of the worker count.

use crate::error::DispatchError;
use rayon::prelude::*;

/// Scheduling strategy for a data-parallel map over an index range
///
/// Constructed from an explicit parallelism degree. There is no implicit
/// global pool: each `Dispatcher` owns its threads, and callers pass the
/// dispatcher through every operation that fans out work.
pub enum Dispatcher {
    /// Run the map on the calling thread, in index order
    Sequential,
    /// Run the map on an owned worker pool
    Pooled(rayon::ThreadPool),
}

impl Dispatcher {
    /// Builds a dispatcher with the given parallelism degree
    ///
    /// A degree of zero or one yields the sequential strategy.
    pub fn new(workers: usize) -> Result<Self, DispatchError> {
        if workers <= 1 {
            return Ok(Self::Sequential);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()?;
        Ok(Self::Pooled(pool))
    }

    /// The number of worker threads backing this dispatcher
    pub fn workers(&self) -> usize {
        match self {
            Self::Sequential => 1,
            Self::Pooled(pool) => pool.current_num_threads(),
        }
    }

    /// Maps `op` over `0..count`, returning results in index order
    pub fn map<T, F>(&self, count: usize, op: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        match self {
            Self::Sequential => (0..count).map(op).collect(),
            Self::Pooled(pool) => pool.install(|| (0..count).into_par_iter().map(op).collect()),
        }
    }

    /// Maps a fallible `op` over `0..count`
    ///
    /// The first error aborts the whole map; no partial results are
    /// returned. Successful results arrive in index order.
    pub fn try_map<T, E, F>(&self, count: usize, op: F) -> Result<Vec<T>, E>
    where
        T: Send,
        E: Send,
        F: Fn(usize) -> Result<T, E> + Send + Sync,
    {
        match self {
            Self::Sequential => (0..count).map(op).collect(),
            Self::Pooled(pool) => pool.install(|| (0..count).into_par_iter().map(op).collect()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Dispatcher;

    #[test]
    fn sequential_and_pooled_maps_agree() {
        let sequential = Dispatcher::new(1).unwrap();
        let pooled = Dispatcher::new(4).unwrap();
        let square = |idx: usize| (idx * idx) as u64;
        assert_eq!(sequential.map(100, square), pooled.map(100, square));
    }

    #[test]
    fn pooled_map_preserves_index_order() {
        let pooled = Dispatcher::new(8).unwrap();
        let result = pooled.map(1000, |idx| idx);
        assert!(result.iter().enumerate().all(|(idx, value)| idx == *value));
    }

    #[test]
    fn first_error_aborts_the_map() {
        let pooled = Dispatcher::new(4).unwrap();
        let result: Result<Vec<usize>, &str> =
            pooled.try_map(10, |idx| if idx == 7 { Err("boom") } else { Ok(idx) });
        assert_eq!(result, Err("boom"));
    }

    #[test]
    fn degree_of_one_selects_the_sequential_strategy() {
        assert!(matches!(Dispatcher::new(0).unwrap(), Dispatcher::Sequential));
        assert!(matches!(Dispatcher::new(1).unwrap(), Dispatcher::Sequential));
        assert_eq!(Dispatcher::new(3).unwrap().workers(), 3);
    }
}
