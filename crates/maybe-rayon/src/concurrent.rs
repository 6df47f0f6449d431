pub mod prelude {
    pub use rayon::iter::{IndexedParallelIterator, ParallelIterator};
    use rayon::prelude::*;

    pub trait MaybeParallelIterator: ParallelIterator {}

    pub trait MaybeIndexedParallelIterator: IndexedParallelIterator {}

    pub trait IntoMaybeParallelIterator: IntoParallelIterator {
        fn into_maybe_par_iter(self) -> Self::Iter;
    }

    // Implementations

    impl<I: ParallelIterator> MaybeParallelIterator for I {}

    impl<I: IndexedParallelIterator> MaybeIndexedParallelIterator for I {}

    impl<I: IntoParallelIterator> IntoMaybeParallelIterator for I {
        fn into_maybe_par_iter(self) -> Self::Iter {
            self.into_par_iter()
        }
    }
}

pub fn join<A, B, RA, RB>(oper_a: A, oper_b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    rayon::join(oper_a, oper_b)
}

/// Run `op` inside a pool of `num_threads` workers. Parallel iterators created inside `op` are
/// scheduled on that pool. If the pool cannot be built, `op` runs on the global pool instead.
pub fn install<OP, R>(num_threads: usize, op: OP) -> R
where
    OP: FnOnce() -> R + Send,
    R: Send,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build();
    install_on(pool, num_threads, op)
}

fn install_on<OP, R>(
    pool: Result<rayon::ThreadPool, rayon::ThreadPoolBuildError>,
    num_threads: usize,
    op: OP,
) -> R
where
    OP: FnOnce() -> R + Send,
    R: Send,
{
    match pool {
        Ok(pool) => pool.install(op),
        Err(e) => {
            tracing::warn!(
                error = %e,
                num_threads,
                "failed to build thread pool, running on the global pool"
            );
            op()
        }
    }
}

/// The number of workers available to parallel iterators started from the calling thread.
pub fn current_num_threads() -> usize {
    rayon::current_num_threads()
}

#[cfg(test)]
mod tests {
    use std::io;

    #[test]
    fn falls_back_to_global_pool() {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .spawn_handler(|_| Err(io::Error::new(io::ErrorKind::Other, "no threads")))
            .build();
        assert!(pool.is_err());
        let n = super::install_on(pool, 2, rayon::current_num_threads);
        assert_eq!(n, rayon::current_num_threads());
    }
}
