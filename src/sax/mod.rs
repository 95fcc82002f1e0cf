//! Symbolic Aggregate approXimation (SAX) of a numeric series.
//!
//! Each window is z-normalized, reduced to `paa_size` averages and mapped to
//! letters through an [`Alphabet`]. Consecutive near-identical words can be
//! dropped (numerosity reduction) before the stream reaches the grammar
//! engine.

mod alphabet;
mod parallel;

pub use alphabet::{mindist_is_zero, Alphabet, MAX_ALPHABET, MIN_ALPHABET};
pub use parallel::{discretize_parallel, ParallelDiscretization, ParallelOptions};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Policy for dropping consecutive repeated words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumerosityReduction {
    /// Keep every word.
    None,
    /// Drop a word equal to the last retained one.
    #[default]
    Exact,
    /// Drop a word whose MINDIST to the last retained one is zero.
    MinDist,
}

/// How windows are laid over the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// One window per start offset.
    #[default]
    Sliding,
    /// Non-overlapping windows; a trailing partial window is dropped.
    Fixed,
}

/// Discretization parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SaxParams {
    pub window_size: usize,
    pub paa_size: usize,
    pub alphabet_size: usize,
    pub reduction: NumerosityReduction,
    /// Windows whose standard deviation falls below this are only
    /// mean-centered.
    pub norm_threshold: f64,
    pub mode: WindowMode,
}

impl SaxParams {
    pub fn new(window_size: usize, paa_size: usize, alphabet_size: usize) -> Self {
        Self {
            window_size,
            paa_size,
            alphabet_size,
            reduction: NumerosityReduction::default(),
            norm_threshold: 0.01,
            mode: WindowMode::default(),
        }
    }

    pub fn with_reduction(mut self, reduction: NumerosityReduction) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn with_norm_threshold(mut self, threshold: f64) -> Self {
        self.norm_threshold = threshold;
        self
    }

    pub fn with_mode(mut self, mode: WindowMode) -> Self {
        self.mode = mode;
        self
    }

    /// Checks the parameters against a series length and returns the
    /// alphabet they select.
    pub fn validate(&self, series_len: usize) -> Result<Alphabet> {
        let alphabet = Alphabet::new(self.alphabet_size)?;
        if self.paa_size == 0 || self.paa_size > self.window_size {
            return Err(Error::InvalidPaaSize {
                paa: self.paa_size,
                window: self.window_size,
            });
        }
        if self.window_size < 2 || self.window_size >= series_len {
            return Err(Error::InvalidWindow {
                window: self.window_size,
                series_len,
            });
        }
        Ok(alphabet)
    }
}

/// A word and the series offset of the window it was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaxWord {
    pub word: String,
    pub position: usize,
}

/// Ordered, positioned words: the input of grammar induction.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolStream {
    words: Vec<SaxWord>,
    series_len: usize,
    mode: WindowMode,
}

impl SymbolStream {
    /// Wraps words produced elsewhere.
    ///
    /// # Errors
    ///
    /// [`Error::UnorderedStream`] unless positions are strictly increasing and
    /// lie inside the series.
    pub fn from_words(words: Vec<SaxWord>, series_len: usize, mode: WindowMode) -> Result<Self> {
        let mut previous = None;
        for (index, word) in words.iter().enumerate() {
            if word.position >= series_len || previous.is_some_and(|p| word.position <= p) {
                return Err(Error::UnorderedStream {
                    index,
                    position: word.position,
                    series_len,
                });
            }
            previous = Some(word.position);
        }
        Ok(Self::from_ordered(words, series_len, mode))
    }

    /// Words already known to be ordered, as produced by discretization.
    pub(crate) fn from_ordered(words: Vec<SaxWord>, series_len: usize, mode: WindowMode) -> Self {
        debug_assert!(words.windows(2).all(|w| w[0].position < w[1].position));
        Self {
            words,
            series_len,
            mode,
        }
    }

    /// One word per token at positions 0, 1, 2, ... over a series as long as
    /// the token list.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words: Vec<SaxWord> = tokens
            .into_iter()
            .enumerate()
            .map(|(position, word)| SaxWord {
                word: word.into(),
                position,
            })
            .collect();
        let series_len = words.len();
        Self::from_ordered(words, series_len, WindowMode::Sliding)
    }

    pub fn words(&self) -> &[SaxWord] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Length of the series the stream was discretized from.
    pub fn series_len(&self) -> usize {
        self.series_len
    }

    pub fn mode(&self) -> WindowMode {
        self.mode
    }

    /// Series offset of the `index`-th word.
    #[inline]
    pub fn position(&self, index: usize) -> usize {
        self.words[index].position
    }
}

/// Z-normalizes `values` with the sample standard deviation.
pub fn znorm(values: &[f64], threshold: f64) -> Vec<f64> {
    let mut out = values.to_vec();
    znorm_in_place(&mut out, threshold);
    out
}

pub(crate) fn znorm_in_place(values: &mut [f64], threshold: f64) {
    let n = values.len();
    if n == 0 {
        return;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let std = if n > 1 {
        let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        (ss / (n - 1) as f64).sqrt()
    } else {
        0.0
    };

    if std < threshold {
        values.iter_mut().for_each(|v| *v -= mean);
    } else {
        values.iter_mut().for_each(|v| *v = (*v - mean) / std);
    }
}

/// Piecewise aggregate approximation into `segments` averages.
///
/// Points straddling a segment boundary contribute to both segments in
/// proportion to their overlap.
pub fn paa(values: &[f64], segments: usize) -> Vec<f64> {
    let n = values.len();
    if segments == 0 || n == 0 {
        return Vec::new();
    }
    if segments == n {
        return values.to_vec();
    }

    let width = n as f64 / segments as f64;
    (0..segments)
        .map(|i| {
            let start = i as f64 * width;
            let end = start + width;
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(n);
            let mut sum = 0.0;
            for (j, &value) in values.iter().enumerate().take(last).skip(first) {
                let lo = start.max(j as f64);
                let hi = end.min(j as f64 + 1.0);
                if hi > lo {
                    sum += value * (hi - lo);
                }
            }
            sum / width
        })
        .collect()
}

/// Discretizes `series` sequentially.
pub fn discretize(series: &[f64], params: &SaxParams) -> Result<SymbolStream> {
    let alphabet = params.validate(series.len())?;
    let starts = window_starts(series.len(), params);
    let raw = raw_words(series, &starts, params, &alphabet);

    let mut reducer = NumerosityReducer::new(params.reduction);
    let mut words = Vec::with_capacity(raw.len());
    for word in raw {
        reducer.offer(word, &mut words);
    }

    tracing::debug!(
        windows = starts.len(),
        words = words.len(),
        "series discretized"
    );
    Ok(SymbolStream::from_ordered(words, series.len(), params.mode))
}

/// Start offsets of every window for the configured mode.
pub(crate) fn window_starts(series_len: usize, params: &SaxParams) -> Vec<usize> {
    let window = params.window_size;
    if window == 0 || window > series_len {
        return Vec::new();
    }
    let step = match params.mode {
        WindowMode::Sliding => 1,
        WindowMode::Fixed => window,
    };
    (0..=series_len - window).step_by(step).collect()
}

/// Words for the given window starts, before numerosity reduction.
pub(crate) fn raw_words(
    series: &[f64],
    starts: &[usize],
    params: &SaxParams,
    alphabet: &Alphabet,
) -> Vec<SaxWord> {
    let window = params.window_size;
    let mut buffer = vec![0.0; window];
    starts
        .iter()
        .map(|&position| {
            buffer.copy_from_slice(&series[position..position + window]);
            znorm_in_place(&mut buffer, params.norm_threshold);
            SaxWord {
                word: alphabet.word(&paa(&buffer, params.paa_size)),
                position,
            }
        })
        .collect()
}

/// Applies numerosity reduction against the last retained word.
pub(crate) struct NumerosityReducer {
    reduction: NumerosityReduction,
    last: Option<String>,
}

impl NumerosityReducer {
    pub(crate) fn new(reduction: NumerosityReduction) -> Self {
        Self {
            reduction,
            last: None,
        }
    }

    pub(crate) fn offer(&mut self, word: SaxWord, out: &mut Vec<SaxWord>) {
        let keep = match (&self.last, self.reduction) {
            (None, _) | (_, NumerosityReduction::None) => true,
            (Some(last), NumerosityReduction::Exact) => *last != word.word,
            (Some(last), NumerosityReduction::MinDist) => !mindist_is_zero(last, &word.word),
        };
        if keep {
            self.last = Some(word.word.clone());
            out.push(word);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(n: usize, period: f64) -> Vec<f64> {
        (0..n)
            .map(|i| (i as f64 * std::f64::consts::TAU / period).sin())
            .collect()
    }

    #[test]
    fn test_znorm_unit_variance() {
        let z = znorm(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.01);
        let mean: f64 = z.iter().sum::<f64>() / 5.0;
        let var: f64 = z.iter().map(|v| v * v).sum::<f64>() / 4.0;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_znorm_flat_is_only_centered() {
        let z = znorm(&[3.0, 3.0, 3.001], 0.01);
        assert!(z.iter().all(|v| v.abs() < 0.001));
    }

    #[test]
    fn test_paa_divisible() {
        assert_eq!(paa(&[1.0, 3.0, 5.0, 7.0], 2), vec![2.0, 6.0]);
    }

    #[test]
    fn test_paa_fractional() {
        // Segment width 5/2: the middle point is split between both halves.
        let out = paa(&[1.0, 1.0, 4.0, 2.0, 2.0], 2);
        assert!((out[0] - 1.6).abs() < 1e-12);
        assert!((out[1] - 2.4).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        let series = vec![0.0; 50];
        assert!(matches!(
            SaxParams::new(10, 11, 3).validate(series.len()),
            Err(Error::InvalidPaaSize { paa: 11, window: 10 })
        ));
        assert!(matches!(
            SaxParams::new(10, 0, 3).validate(series.len()),
            Err(Error::InvalidPaaSize { .. })
        ));
        assert!(matches!(
            SaxParams::new(60, 4, 3).validate(series.len()),
            Err(Error::InvalidWindow { .. })
        ));
        assert!(matches!(
            SaxParams::new(10, 4, 1).validate(series.len()),
            Err(Error::InvalidAlphabetSize { .. })
        ));
    }

    #[test]
    fn test_sliding_without_reduction_emits_every_window() {
        let series = sine(100, 25.0);
        let params = SaxParams::new(20, 4, 4).with_reduction(NumerosityReduction::None);
        let stream = discretize(&series, &params).unwrap();
        assert_eq!(stream.len(), 81);
        assert_eq!(stream.series_len(), 100);
        assert!(stream.words().iter().all(|w| w.word.len() == 4));
        assert!(stream.words().iter().enumerate().all(|(i, w)| w.position == i));
    }

    #[test]
    fn test_exact_reduction_has_no_adjacent_duplicates() {
        let series = sine(300, 60.0);
        let params = SaxParams::new(30, 3, 3);
        let stream = discretize(&series, &params).unwrap();
        assert!(stream.len() < 271);
        assert!(stream.words().windows(2).all(|w| w[0].word != w[1].word));
        assert_eq!(stream.position(0), 0);
    }

    #[test]
    fn test_mindist_reduction_is_coarser() {
        let series = sine(300, 60.0);
        let exact = discretize(&series, &SaxParams::new(30, 4, 5)).unwrap();
        let mindist = discretize(
            &series,
            &SaxParams::new(30, 4, 5).with_reduction(NumerosityReduction::MinDist),
        )
        .unwrap();
        assert!(mindist.len() <= exact.len());
    }

    #[test]
    fn test_fixed_mode_steps_by_window() {
        let series = sine(105, 20.0);
        let params = SaxParams::new(10, 2, 3)
            .with_mode(WindowMode::Fixed)
            .with_reduction(NumerosityReduction::None);
        let stream = discretize(&series, &params).unwrap();
        assert_eq!(stream.len(), 10);
        assert_eq!(stream.position(3), 30);
        assert_eq!(stream.mode(), WindowMode::Fixed);
    }

    #[test]
    fn test_reducer_compares_with_last_retained() {
        let mut reducer = NumerosityReducer::new(NumerosityReduction::MinDist);
        let mut out = Vec::new();
        for (position, word) in ["aa", "ab", "bb", "cc"].into_iter().enumerate() {
            reducer.offer(
                SaxWord {
                    word: word.to_string(),
                    position,
                },
                &mut out,
            );
        }
        // "ab" and "bb" are within one band of "aa"; "cc" is not.
        let kept: Vec<&str> = out.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(kept, vec!["aa", "cc"]);
    }

    #[test]
    fn test_from_words_rejects_unordered_positions() {
        let word = |position: usize| SaxWord {
            word: "ab".to_string(),
            position,
        };

        let stream = SymbolStream::from_words(vec![word(0), word(4)], 10, WindowMode::Sliding);
        assert_eq!(stream.unwrap().len(), 2);

        assert!(matches!(
            SymbolStream::from_words(vec![word(4), word(4)], 10, WindowMode::Sliding),
            Err(Error::UnorderedStream { index: 1, position: 4, .. })
        ));
        assert!(matches!(
            SymbolStream::from_words(vec![word(5), word(2)], 10, WindowMode::Fixed),
            Err(Error::UnorderedStream { index: 1, .. })
        ));
        assert!(matches!(
            SymbolStream::from_words(vec![word(10)], 10, WindowMode::Sliding),
            Err(Error::UnorderedStream { index: 0, series_len: 10, .. })
        ));
    }
}
