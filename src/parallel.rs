//! Parallel execution switch.
//!
//! With the `parallel` feature (on by default) work is spread over the rayon
//! thread pool; without it everything runs sequentially on the caller's
//! thread. Either way results come back in input order.
//!
//! # Usage
//!
//! ```ignore
//! use crate::iter_maybe_parallel;
//!
//! let fitted: Vec<_> = iter_maybe_parallel!(windows)
//!     .map(|w| fit(w))
//!     .collect();
//! ```

/// Macro for conditionally parallel consuming iteration.
///
/// When the `parallel` feature is enabled, uses `into_par_iter()`.
/// Otherwise, uses `into_iter()` for sequential execution.
#[macro_export]
macro_rules! iter_maybe_parallel {
    ($expr:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::iter::IntoParallelIterator;

            IntoParallelIterator::into_par_iter($expr)
        }
        #[cfg(not(feature = "parallel"))]
        {
            IntoIterator::into_iter($expr)
        }
    }};
}

pub use iter_maybe_parallel;

/// Run two closures, potentially in parallel, and return both results.
pub fn maybe_join<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    #[cfg(feature = "parallel")]
    {
        rayon::join(a, b)
    }
    #[cfg(not(feature = "parallel"))]
    {
        (a(), b())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_preserves_order() {
        #[cfg(feature = "parallel")]
        use rayon::iter::ParallelIterator;

        let squares: Vec<usize> = iter_maybe_parallel!(0..64usize).map(|i| i * i).collect();
        assert_eq!(squares, (0..64).map(|i| i * i).collect::<Vec<_>>());
    }

    #[test]
    fn test_join_returns_both() {
        let (a, b) = maybe_join(|| 2 + 2, || "four");
        assert_eq!(a, 4);
        assert_eq!(b, "four");
    }
}
