//! Configuration of a benchmark sweep.

use crate::error::ConfigError;

/// Number of runs per size, unless configured otherwise.
pub const DEFAULT_RUNS: usize = 16;
/// Smallest payload size of the sweep, unless configured otherwise.
pub const DEFAULT_MIN_SIZE: u64 = 1 << 20;
/// Largest payload size of the sweep, unless configured otherwise.
pub const DEFAULT_MAX_SIZE: u64 = 128 << 20;
/// Prefix of all object names, unless configured otherwise.
pub const DEFAULT_PREFIX: &str = "x";

/// Parameters of a benchmark sweep.
///
/// Built by the command line layer and passed to [`sweep::run`](crate::sweep::run), which
/// validates it before talking to the storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BenchConfig {
    /// The destination bucket.
    pub bucket: String,
    /// Prefix of all created object names.
    pub prefix: String,
    /// Number of uploads (or chunks) per size.
    pub runs: usize,
    /// The first payload size, also the unit throughput is measured in.
    pub min_size: u64,
    /// The last payload size, inclusive.
    pub max_size: u64,
}

impl BenchConfig {
    /// Creates a config for `bucket` with default sweep parameters.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: DEFAULT_PREFIX.to_owned(),
            runs: DEFAULT_RUNS,
            min_size: DEFAULT_MIN_SIZE,
            max_size: DEFAULT_MAX_SIZE,
        }
    }

    /// Checks that the config describes a sweep that can be run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.is_empty() {
            return Err(ConfigError::MissingBucket);
        }
        if self.runs == 0 {
            return Err(ConfigError::NoRuns);
        }
        if self.min_size == 0 || self.min_size > self.max_size {
            return Err(ConfigError::InvalidSizeRange {
                min: self.min_size,
                max: self.max_size,
            });
        }
        Ok(())
    }

    /// Returns the payload sizes of the sweep, doubling from `min_size` up to `max_size`.
    pub fn sizes(&self) -> impl Iterator<Item = TrialSize> + use<> {
        let min_size = self.min_size;
        let max_size = self.max_size;
        std::iter::successors(Some(min_size), |size| size.checked_mul(2))
            .take_while(move |size| *size <= max_size)
            .map(move |bytes| TrialSize {
                bytes,
                units: bytes / min_size,
            })
    }
}

/// One step of the sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrialSize {
    /// The payload size in bytes.
    pub bytes: u64,
    /// The payload size as a multiple of the sweep's minimum size.
    pub units: u64,
}

impl TrialSize {
    /// Name of the object for one run of a whole-object upload.
    pub fn run_object_name(&self, prefix: &str, run: usize) -> String {
        format!("{prefix}-{}-{run}", self.units)
    }

    /// Name of the object assembled by a resumable upload.
    pub fn session_object_name(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.units)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn default_sweep_has_eight_sizes() {
        let config = BenchConfig::new("bucket");

        let mib: Vec<_> = config.sizes().map(|size| size.bytes >> 20).collect();
        assert_eq!(mib, [1, 2, 4, 8, 16, 32, 64, 128]);

        let units: Vec<_> = config.sizes().map(|size| size.units).collect();
        assert_eq!(units, mib);
    }

    #[test]
    fn sweep_includes_max_size() {
        let config = BenchConfig {
            min_size: 3,
            max_size: 12,
            ..BenchConfig::new("bucket")
        };
        let bytes: Vec<_> = config.sizes().map(|size| size.bytes).collect();
        assert_eq!(bytes, [3, 6, 12]);

        let config = BenchConfig {
            min_size: 3,
            max_size: 11,
            ..BenchConfig::new("bucket")
        };
        let bytes: Vec<_> = config.sizes().map(|size| size.bytes).collect();
        assert_eq!(bytes, [3, 6]);
    }

    #[test]
    fn sweep_stops_before_overflow() {
        let config = BenchConfig {
            min_size: 1 << 62,
            max_size: u64::MAX,
            ..BenchConfig::new("bucket")
        };
        assert_eq!(config.sizes().count(), 2);
    }

    #[test]
    fn object_names_are_unique() {
        let config = BenchConfig::new("bucket");

        let mut names = HashSet::new();
        for size in config.sizes() {
            for run in 0..config.runs {
                assert!(names.insert(size.run_object_name(&config.prefix, run)));
            }
        }
        assert_eq!(names.len(), 8 * DEFAULT_RUNS);

        let sessions: HashSet<_> = config
            .sizes()
            .map(|size| size.session_object_name(&config.prefix))
            .collect();
        assert_eq!(sessions.len(), 8);
    }

    #[test]
    fn validation() {
        assert_eq!(BenchConfig::new("bucket").validate(), Ok(()));
        assert_eq!(
            BenchConfig::new("").validate(),
            Err(ConfigError::MissingBucket)
        );

        let no_runs = BenchConfig {
            runs: 0,
            ..BenchConfig::new("bucket")
        };
        assert_eq!(no_runs.validate(), Err(ConfigError::NoRuns));

        let inverted = BenchConfig {
            min_size: 2,
            max_size: 1,
            ..BenchConfig::new("bucket")
        };
        assert_eq!(
            inverted.validate(),
            Err(ConfigError::InvalidSizeRange { min: 2, max: 1 })
        );

        let empty = BenchConfig {
            min_size: 0,
            ..BenchConfig::new("bucket")
        };
        assert!(empty.validate().is_err());
    }
}
