use std::{fmt::Display, ops::Range};

use average::Mean;
use delite_bench_cli_types::WarmupMode;
use readable::num::{Float, Unsigned};

use crate::{data::SampleSet, registry::Config, run_key::RunKey};

/// How leading warm-up samples are dropped before averaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmupPolicy {
    /// Drop the first `floor(n / 2)` samples.
    HalfDiscard,
    /// Drop the first `discard` samples of a run that produced exactly `expected` samples.
    /// Any other sample count marks the run as incomplete and nothing is kept.
    FixedCount { discard: usize, expected: usize },
}

impl WarmupPolicy {
    pub fn from_mode(mode: WarmupMode, discard: usize, expected: usize) -> WarmupPolicy {
        match mode {
            WarmupMode::HalfDiscard => WarmupPolicy::HalfDiscard,
            WarmupMode::FixedCount => WarmupPolicy::FixedCount { discard, expected },
        }
    }

    /// Indices of the samples kept out of `len`, or `None` if nothing is kept.
    pub fn kept_range(&self, len: usize) -> Option<Range<usize>> {
        let range = match *self {
            WarmupPolicy::HalfDiscard => len / 2..len,
            WarmupPolicy::FixedCount { discard, expected } => {
                if len != expected {
                    return None;
                }
                discard.min(len)..len
            }
        };
        (!range.is_empty()).then_some(range)
    }
}

impl Display for WarmupPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarmupPolicy::HalfDiscard => write!(f, "discard first half"),
            WarmupPolicy::FixedCount { discard, expected } => {
                write!(f, "discard first {} of {} samples", discard, expected)
            }
        }
    }
}

pub fn filter_warmup(samples: &SampleSet, policy: WarmupPolicy) -> SampleSet {
    match policy.kept_range(samples.len()) {
        Some(range) => samples.slice(range),
        None => SampleSet::empty(),
    }
}

/// Arithmetic mean, 0.0 for no samples.
pub fn mean(samples: &SampleSet) -> f64 {
    let m: Mean = samples.iter().collect();
    if m.is_empty() {
        0.0
    } else {
        m.mean()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedResult {
    pub run_key: RunKey,
    pub raw_samples: SampleSet,
    pub filtered_samples: SampleSet,
    pub mean: f64,
    /// Whether a timing file existed for the run.
    pub stored: bool,
}

impl AggregatedResult {
    pub fn has_data(&self) -> bool {
        !self.filtered_samples.is_empty()
    }

    /// The kept sample indices within `raw_samples`.
    pub fn kept_range(&self) -> Option<Range<usize>> {
        self.has_data().then(|| {
            let end = self.raw_samples.len();
            end - self.filtered_samples.len()..end
        })
    }
}

impl Display for AggregatedResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.stored {
            return write!(f, "{}: no data", self.run_key);
        }
        write!(
            f,
            "{}: μ: {} s n: {} (of {})",
            self.run_key,
            Float::from(self.mean),
            Unsigned::from(self.filtered_samples.len()),
            Unsigned::from(self.raw_samples.len()),
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    policy: WarmupPolicy,
}

impl Aggregator {
    pub fn new(policy: WarmupPolicy) -> Aggregator {
        Aggregator { policy }
    }

    pub fn policy(&self) -> WarmupPolicy {
        self.policy
    }

    pub fn filter(&self, samples: &SampleSet, config: &Config) -> SampleSet {
        if config.run_only_once {
            samples.clone()
        } else {
            filter_warmup(samples, self.policy)
        }
    }

    pub fn aggregate(
        &self,
        run_key: RunKey,
        samples: Option<&SampleSet>,
        config: &Config,
    ) -> AggregatedResult {
        let stored = samples.is_some();
        let raw_samples = samples.cloned().unwrap_or_default();
        let filtered_samples = self.filter(&raw_samples, config);
        let mean = mean(&filtered_samples);
        AggregatedResult {
            run_key,
            raw_samples,
            filtered_samples,
            mean,
            stored,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn samples(values: &[f64]) -> SampleSet {
        SampleSet::from(values.to_vec())
    }

    fn key() -> RunKey {
        RunKey::new("abc1234", "LogReg", "smp4").unwrap()
    }

    #[test]
    fn half_discard_keeps_the_last_ceil_half() {
        for n in 0..12 {
            let raw: SampleSet = (0..n).map(|i| i as f64).collect();
            let filtered = filter_warmup(&raw, WarmupPolicy::HalfDiscard);
            assert_eq!(filtered.len(), n - n / 2);
            assert_eq!(filtered.as_slice(), &raw.as_slice()[n / 2..]);
        }
    }

    #[test]
    fn fixed_count_requires_the_expected_length() {
        let policy = WarmupPolicy::FixedCount {
            discard: 2,
            expected: 5,
        };
        for n in [0, 1, 4, 6, 10] {
            let raw: SampleSet = (0..n).map(|i| i as f64 + 1.0).collect();
            let filtered = filter_warmup(&raw, policy);
            assert!(filtered.is_empty(), "n = {}", n);
            assert_eq!(mean(&filtered), 0.0);
        }

        let raw = samples(&[9.0, 8.0, 1.0, 2.0, 3.0]);
        assert_eq!(filter_warmup(&raw, policy).as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn fixed_count_discarding_everything() {
        let policy = WarmupPolicy::FixedCount {
            discard: 7,
            expected: 3,
        };
        assert!(filter_warmup(&samples(&[1.0, 2.0, 3.0]), policy).is_empty());
        assert_eq!(policy.kept_range(3), None);
    }

    #[test]
    fn mean_edge_cases() {
        assert_eq!(mean(&SampleSet::empty()), 0.0);
        assert_eq!(mean(&samples(&[4.5])), 4.5);
        assert_eq!(
            mean(&samples(&[1.0, 2.0, 6.0])),
            mean(&samples(&[6.0, 1.0, 2.0]))
        );
        assert_eq!(mean(&samples(&[30.0, 40.0])), 35.0);
    }

    #[test]
    fn run_once_configuration_bypasses_filtering() {
        let config = Config::gpu().once();
        for policy in [
            WarmupPolicy::HalfDiscard,
            WarmupPolicy::FixedCount {
                discard: 3,
                expected: 10,
            },
        ] {
            let result =
                Aggregator::new(policy).aggregate(key(), Some(&samples(&[42.0])), &config);
            assert_eq!(result.filtered_samples.as_slice(), &[42.0]);
            assert_eq!(result.mean, 42.0);
        }
    }

    #[test]
    fn missing_samples_aggregate_to_zero() {
        let result = Aggregator::new(WarmupPolicy::HalfDiscard).aggregate(
            key(),
            None,
            &Config::smp(4),
        );
        assert!(!result.stored);
        assert!(!result.has_data());
        assert_eq!(result.mean, 0.0);
        assert_eq!(result.kept_range(), None);
        assert_eq!(result.to_string(), "abc1234/LogReg/smp4: no data");
    }

    #[test]
    fn aggregate_half_discard() {
        let result = Aggregator::new(WarmupPolicy::HalfDiscard).aggregate(
            key(),
            Some(&samples(&[10.0, 20.0, 30.0, 40.0])),
            &Config::smp(4),
        );
        assert!(result.stored);
        assert_eq!(result.filtered_samples.as_slice(), &[30.0, 40.0]);
        assert_eq!(result.mean, 35.0);
        assert_eq!(result.kept_range(), Some(2..4));
    }
}
