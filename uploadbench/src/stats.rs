//! Aggregation of upload durations into throughput statistics.

use std::fmt;
use std::time::Duration;

/// Mean throughput of a series of uploads and its spread.
///
/// Both values are in logical units per second, where a unit is the minimum size of the sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Throughput {
    /// Units divided by the mean duration.
    pub mean: f64,
    /// Population standard deviation of the per-run speeds around [`Self::mean`].
    pub std_dev: f64,
}

impl Throughput {
    /// Computes the throughput of uploading `units` in each of the given `durations`.
    ///
    /// The mean is derived from the mean duration, not from the per-run speeds. The deviation of
    /// every run's speed is then taken against that mean, which is not the arithmetic mean of the
    /// speeds. Results are kept comparable with earlier measurements that used this definition.
    ///
    /// Returns `None` if there are no durations.
    pub fn from_durations(units: f64, durations: &[Duration]) -> Option<Self> {
        if durations.is_empty() {
            return None;
        }
        let n = durations.len() as f64;

        let mean_time = durations.iter().map(Duration::as_secs_f64).sum::<f64>() / n;
        let mean = units / mean_time;

        let variance = durations
            .iter()
            .map(|d| {
                let diff = mean - units / d.as_secs_f64();
                diff * diff
            })
            .sum::<f64>()
            / n;

        Some(Self {
            mean,
            std_dev: variance.sqrt(),
        })
    }
}

/// The result line for one size of the sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SizeReport {
    /// The size as a multiple of the sweep's minimum size (MiB with the default sweep).
    pub units: u64,
    /// The measured throughput.
    pub throughput: Throughput,
}

impl fmt::Display for SizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "size={:3} MiB: mean speed={:.3} MiB/s, standard deviation={:.6} MiB/s",
            self.units, self.throughput.mean, self.throughput.std_dev
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(values: &[f64]) -> Vec<Duration> {
        values.iter().copied().map(Duration::from_secs_f64).collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn empty_sample() {
        assert_eq!(Throughput::from_durations(1.0, &[]), None);
    }

    #[test]
    fn single_run_has_no_spread() {
        let throughput = Throughput::from_durations(4.0, &secs(&[0.5])).unwrap();
        assert_close(throughput.mean, 8.0);
        assert_close(throughput.std_dev, 0.0);
    }

    #[test]
    fn mean_uses_mean_duration() {
        let durations = secs(&[0.25, 0.5, 1.0, 2.0, 0.75]);
        let throughput = Throughput::from_durations(16.0, &durations).unwrap();
        assert_close(throughput.mean, 16.0 / (4.5 / 5.0));

        // Mean of the individual speeds would be (64 + 32 + 16 + 8 + 21.33) / 5.
        assert!(throughput.mean < 28.0);
    }

    #[test]
    fn deviation_is_taken_against_mean_throughput() {
        // Speeds are 1 and 0.5, the mean throughput is 1 / 1.5 = 2/3.
        let throughput = Throughput::from_durations(1.0, &secs(&[1.0, 2.0])).unwrap();
        assert_close(throughput.mean, 2.0 / 3.0);

        // sqrt(((2/3 - 1)² + (2/3 - 1/2)²) / 2) = sqrt(5/72)
        assert_close(throughput.std_dev, (5.0f64 / 72.0).sqrt());

        // The standard deviation of the speeds themselves would be 0.25.
        let speeds_std_dev = 0.25;
        assert!((throughput.std_dev - speeds_std_dev).abs() > 1e-3);
    }

    #[test]
    fn identical_runs() {
        let throughput = Throughput::from_durations(2.0, &secs(&[0.1; 16])).unwrap();
        assert_close(throughput.mean, 20.0);
        assert_close(throughput.std_dev, 0.0);
    }

    #[test]
    fn report_format() {
        let report = SizeReport {
            units: 4,
            throughput: Throughput {
                mean: 123.45678,
                std_dev: 0.1234567,
            },
        };
        assert_eq!(
            report.to_string(),
            "size=  4 MiB: mean speed=123.457 MiB/s, standard deviation=0.123457 MiB/s"
        );

        let report = SizeReport {
            units: 128,
            throughput: Throughput {
                mean: 1.0,
                std_dev: 0.0,
            },
        };
        assert_eq!(
            report.to_string(),
            "size=128 MiB: mean speed=1.000 MiB/s, standard deviation=0.000000 MiB/s"
        );
    }
}
