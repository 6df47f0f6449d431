use std::num::NonZeroUsize;
use std::sync::OnceLock;

use fp::prime::{ValidPrime, TWO};
use serde::{Deserialize, Serialize};

use crate::save::LatticeDirectory;
use crate::store::PathStore;

/// Segments with more simplices than this are compressed when the `zstd` feature is enabled.
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 1000;

/// Parameters shared by every computation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Size of the worker pool. Defaults to half the available cores.
    pub num_threads: Option<NonZeroUsize>,
    /// Coefficient field of the zigzag computations.
    pub prime: ValidPrime,
    pub lattice_dir: LatticeDirectory,
    pub compression_threshold: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_threads: None,
            prime: TWO,
            lattice_dir: LatticeDirectory::None,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
        }
    }
}

impl Config {
    /// The default configuration, with the thread count taken from `CLADDER_THREADS` if set.
    pub fn from_env() -> Self {
        use std::env;

        let mut config = Self::default();
        match env::var("CLADDER_THREADS") {
            Ok(n) => match n.parse::<NonZeroUsize>() {
                Ok(n) => config.num_threads = Some(n),
                Err(_) => tracing::warn!("Invalid value of CLADDER_THREADS variable: {n}"),
            },
            Err(env::VarError::NotUnicode(_)) => {
                tracing::warn!("Invalid value of CLADDER_THREADS variable")
            }
            Err(env::VarError::NotPresent) => (),
        };
        config
    }

    pub fn with_prime(mut self, prime: ValidPrime) -> Self {
        self.prime = prime;
        self
    }

    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = NonZeroUsize::new(num_threads);
        self
    }

    /// The pool size actually used. Requests above the number of available cores are clamped.
    pub fn num_threads(&self) -> usize {
        let cores = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        match self.num_threads {
            None => (cores / 2).max(1),
            Some(n) if n.get() > cores => {
                tracing::warn!(
                    requested = n.get(),
                    available = cores,
                    "clamping thread count to the available cores"
                );
                cores
            }
            Some(n) => n.get(),
        }
    }

    /// Run `op` on a pool of [`Config::num_threads`] workers.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        maybe_rayon::install(self.num_threads(), op)
    }

    /// A fresh store for the segments of one computation.
    pub fn path_store(&self) -> Box<dyn PathStore> {
        #[cfg(feature = "zstd")]
        {
            Box::new(crate::store::CompressedStore::new(
                self.compression_threshold,
            ))
        }
        #[cfg(not(feature = "zstd"))]
        {
            Box::new(crate::store::MemoryStore::new())
        }
    }
}

static LOGGING: OnceLock<()> = OnceLock::new();

/// Install a `tracing` subscriber writing to stderr, filtered by `RUST_LOG` (default `info`).
/// Only the first call has an effect.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    LOGGING.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr);
        // Another subscriber may already be installed, e.g. by a test harness.
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.prime, 2);
        assert!(config.num_threads() >= 1);
        assert!(config.lattice_dir.is_none());
    }

    #[test]
    fn clamps_threads() {
        let cores = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        assert_eq!(Config::default().with_threads(cores + 5).num_threads(), cores);
        assert_eq!(Config::default().with_threads(1).num_threads(), 1);
    }

    #[test]
    fn deserialize_partial() {
        let config: Config = serde_json::from_str(r#"{"prime": 3, "num_threads": 2}"#).unwrap();
        assert_eq!(config.prime, 3);
        assert_eq!(config.num_threads, NonZeroUsize::new(2));
        assert_eq!(config.compression_threshold, DEFAULT_COMPRESSION_THRESHOLD);
    }

    #[test]
    fn install_runs() {
        let config = Config::default().with_threads(2);
        assert_eq!(config.install(|| 6 * 7), 42);
        init_logging();
        init_logging();
    }
}
