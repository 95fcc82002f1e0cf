use crate::sax::znorm_in_place;

/// Euclidean distance between two equal-length subsequences.
#[inline]
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    squared(a, b).sqrt()
}

/// Euclidean distance divided by the subsequence length, so that scores of
/// candidates of different lengths are comparable.
#[inline]
pub fn normalized_euclidean(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    euclidean(a, b) / a.len() as f64
}

#[inline]
pub(crate) fn squared(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Squared distance that stops accumulating once the partial sum exceeds
/// `limit`. The exact sum is returned whenever it is at most `limit`;
/// otherwise some value greater than `limit`.
#[inline]
pub(crate) fn squared_bounded(a: &[f64], b: &[f64], limit: f64) -> f64 {
    let mut sum = 0.0;
    for (x, y) in a.iter().zip(b) {
        sum += (x - y) * (x - y);
        if sum > limit {
            return sum;
        }
    }
    sum
}

/// Every z-normalized sliding window of one length, stored contiguously.
#[derive(Debug, Clone)]
pub(crate) struct ZNormWindows {
    length: usize,
    data: Vec<f64>,
}

impl ZNormWindows {
    pub(crate) fn new(series: &[f64], length: usize, threshold: f64) -> Self {
        let count = if length == 0 || length > series.len() {
            0
        } else {
            series.len() - length + 1
        };
        let mut data = Vec::with_capacity(count * length);
        for start in 0..count {
            let from = data.len();
            data.extend_from_slice(&series[start..start + length]);
            znorm_in_place(&mut data[from..], threshold);
        }
        Self { length, data }
    }

    pub(crate) fn length(&self) -> usize {
        self.length
    }

    /// Number of windows.
    pub(crate) fn count(&self) -> usize {
        if self.length == 0 {
            0
        } else {
            self.data.len() / self.length
        }
    }

    #[inline]
    pub(crate) fn get(&self, start: usize) -> &[f64] {
        &self.data[start * self.length..(start + 1) * self.length]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean() {
        assert!((euclidean(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-12);
        assert!((normalized_euclidean(&[0.0, 0.0], &[3.0, 4.0]) - 2.5).abs() < 1e-12);
        assert_eq!(normalized_euclidean(&[], &[]), 0.0);
    }

    #[test]
    fn test_bounded_is_exact_below_limit() {
        let a = [1.0, 2.0, 3.0];
        let b = [2.0, 2.0, 5.0];
        assert_eq!(squared_bounded(&a, &b, 10.0), squared(&a, &b));
        assert_eq!(squared_bounded(&a, &b, 5.0), squared(&a, &b));
        assert!(squared_bounded(&a, &b, 0.5) > 0.5);
    }

    #[test]
    fn test_windows_are_znormalized() {
        let series: Vec<f64> = (0..20).map(|i| (i * i) as f64).collect();
        let windows = ZNormWindows::new(&series, 5, 0.01);
        assert_eq!(windows.count(), 16);
        assert_eq!(windows.length(), 5);
        for start in 0..windows.count() {
            let mean: f64 = windows.get(start).iter().sum::<f64>() / 5.0;
            assert!(mean.abs() < 1e-9);
        }
    }
}
