//! A thin layer over [rayon](https://docs.rs/rayon) that can be compiled away.
//!
//! With the `concurrent` feature, the items of this crate forward to rayon. Without it, they run
//! on the current thread with the same signatures, so that callers are written once and work in
//! both configurations.

#[cfg(feature = "concurrent")]
pub mod concurrent;
#[cfg(feature = "concurrent")]
pub use concurrent::*;

#[cfg(not(feature = "concurrent"))]
pub mod sequential;
#[cfg(not(feature = "concurrent"))]
pub use sequential::*;

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn map_collect_preserves_order() {
        let squares: Vec<u64> = (0..100u64)
            .collect::<Vec<_>>()
            .into_maybe_par_iter()
            .map(|x| x * x)
            .collect();
        assert_eq!(squares, (0..100u64).map(|x| x * x).collect::<Vec<_>>());
    }

    #[test]
    fn collect_result_short_circuits() {
        let result: Result<Vec<u32>, String> = super::install(2, || {
            (0..10u32)
                .collect::<Vec<_>>()
                .into_maybe_par_iter()
                .map(|x| if x == 7 { Err(format!("bad {x}")) } else { Ok(x) })
                .collect()
        });
        assert_eq!(result, Err("bad 7".to_string()));
    }

    #[test]
    fn join_runs_both() {
        let (a, b) = super::join(|| 1 + 1, || "two");
        assert_eq!((a, b), (2, "two"));
    }

    #[test]
    fn install_sizes_pool() {
        let n = super::install(3, super::current_num_threads);
        assert_eq!(n, if cfg!(feature = "concurrent") { 3 } else { 1 });
    }
}
