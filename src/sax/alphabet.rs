use crate::error::{Error, Result};

/// Smallest supported alphabet.
pub const MIN_ALPHABET: usize = 2;
/// Largest supported alphabet.
pub const MAX_ALPHABET: usize = 20;

/// Equiprobable N(0, 1) cut points for a SAX alphabet.
///
/// Letter `a` covers values below the first cut, `b` the next band and so on.
#[derive(Debug, Clone, PartialEq)]
pub struct Alphabet {
    cuts: Vec<f64>,
}

impl Alphabet {
    /// Builds the cut table for `size` letters.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAlphabetSize`] when `size` is outside
    /// `MIN_ALPHABET..=MAX_ALPHABET`.
    pub fn new(size: usize) -> Result<Self> {
        if !(MIN_ALPHABET..=MAX_ALPHABET).contains(&size) {
            return Err(Error::InvalidAlphabetSize {
                size,
                min: MIN_ALPHABET,
                max: MAX_ALPHABET,
            });
        }
        let cuts = (1..size)
            .map(|i| probit(i as f64 / size as f64))
            .collect();
        Ok(Self { cuts })
    }

    /// Number of letters.
    pub fn size(&self) -> usize {
        self.cuts.len() + 1
    }

    pub fn cuts(&self) -> &[f64] {
        &self.cuts
    }

    /// Index of the band `value` falls into.
    #[inline]
    pub fn index_of(&self, value: f64) -> usize {
        self.cuts.partition_point(|&cut| cut <= value)
    }

    #[inline]
    pub fn letter(&self, value: f64) -> char {
        (b'a' + self.index_of(value) as u8) as char
    }

    /// Maps PAA coefficients to a word.
    pub fn word(&self, coefficients: &[f64]) -> String {
        coefficients.iter().map(|&v| self.letter(v)).collect()
    }
}

/// True when the SAX MINDIST between two words is zero: same length and no
/// letter pair more than one band apart.
pub fn mindist_is_zero(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .all(|(x, y)| x.abs_diff(y) <= 1)
}

/// Inverse of the standard normal CDF (Acklam's rational approximation,
/// relative error below 1.15e-9).
fn probit(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549671010405470e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p > 1.0 - P_LOW {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    } else {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    }
}
