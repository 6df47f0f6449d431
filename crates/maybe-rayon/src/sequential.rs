pub mod prelude {
    pub trait MaybeParallelIterator: Iterator {}

    pub trait MaybeIndexedParallelIterator: Iterator {}

    pub trait IntoMaybeParallelIterator: IntoIterator + Sized {
        fn into_maybe_par_iter(self) -> Self::IntoIter {
            self.into_iter()
        }
    }

    // Implementations

    impl<I: Iterator> MaybeParallelIterator for I {}

    impl<I: Iterator> MaybeIndexedParallelIterator for I {}

    impl<I: IntoIterator> IntoMaybeParallelIterator for I {}
}

pub fn join<A, B, RA, RB>(oper_a: A, oper_b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    (oper_a(), oper_b())
}

/// Run `op` on the current thread. The thread count is ignored.
pub fn install<OP, R>(_num_threads: usize, op: OP) -> R
where
    OP: FnOnce() -> R + Send,
    R: Send,
{
    op()
}

pub fn current_num_threads() -> usize {
    1
}
