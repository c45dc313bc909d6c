use std::ops::Range;

/// Timings of one run in seconds, in execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet(Vec<f64>);

impl SampleSet {
    pub fn new(samples: Vec<f64>) -> SampleSet {
        SampleSet(samples)
    }

    pub fn empty() -> SampleSet {
        SampleSet(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    /// Samples at the given indices, keeping their order. Out of range indices are ignored.
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> SampleSet {
        let end = range.end.min(self.0.len());
        let start = range.start.min(end);
        SampleSet(self.0[start..end].to_vec())
    }
}

impl From<Vec<f64>> for SampleSet {
    fn from(samples: Vec<f64>) -> Self {
        SampleSet(samples)
    }
}

impl FromIterator<f64> for SampleSet {
    fn from_iter<T: IntoIterator<Item = f64>>(iter: T) -> Self {
        SampleSet(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_clamps_to_length() {
        let samples = SampleSet::from(vec![1.0, 2.0, 3.0]);
        assert_eq!(samples.slice(1..3).as_slice(), &[2.0, 3.0]);
        assert_eq!(samples.slice(2..10).as_slice(), &[3.0]);
        assert!(samples.slice(5..10).is_empty());
    }
}
