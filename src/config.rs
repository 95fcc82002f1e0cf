//! Pipeline configuration, loadable from TOML.
//!
//! ```toml
//! window_size = 100
//! paa_size = 4
//! alphabet_size = 4
//! reduction = "exact"
//! strategy = "rra"
//! discord_count = 3
//! ```

use crate::discord::{SearchParams, WordIndexKind};
use crate::error::{Error, Result};
use crate::sax::{NumerosityReduction, ParallelOptions, SaxParams, WindowMode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which discord search the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    BruteForce,
    HotSaxTrie,
    HotSaxHash,
    #[default]
    Rra,
}

/// Every knob of [`analyze`](crate::analyze).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub window_size: usize,
    pub paa_size: usize,
    pub alphabet_size: usize,
    pub reduction: NumerosityReduction,
    pub norm_threshold: f64,
    pub window_mode: WindowMode,
    pub discord_count: usize,
    pub strategy: StrategyKind,
    pub seed: u64,
    /// 1 discretizes on the calling thread.
    pub threads: usize,
    pub worker_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_size: 100,
            paa_size: 4,
            alphabet_size: 4,
            reduction: NumerosityReduction::Exact,
            norm_threshold: 0.01,
            window_mode: WindowMode::Sliding,
            discord_count: 1,
            strategy: StrategyKind::Rra,
            seed: 0,
            threads: 1,
            worker_timeout_ms: 30_000,
        }
    }
}

impl PipelineConfig {
    /// Parses a TOML document; missing fields take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Checks every parameter against a series length.
    pub fn validate(&self, series_len: usize) -> Result<()> {
        self.sax_params().validate(series_len)?;
        if self.threads == 0 {
            return Err(Error::InvalidThreadCount {
                threads: self.threads,
            });
        }
        self.search_params().validate(series_len)
    }

    pub fn sax_params(&self) -> SaxParams {
        SaxParams::new(self.window_size, self.paa_size, self.alphabet_size)
            .with_reduction(self.reduction)
            .with_norm_threshold(self.norm_threshold)
            .with_mode(self.window_mode)
    }

    pub fn search_params(&self) -> SearchParams {
        SearchParams::new(self.window_size, self.paa_size, self.alphabet_size)
            .with_norm_threshold(self.norm_threshold)
            .with_discord_count(self.discord_count)
            .with_seed(self.seed)
    }

    pub fn parallel_options(&self) -> ParallelOptions {
        ParallelOptions {
            threads: self.threads,
            timeout: Duration::from_millis(self.worker_timeout_ms),
        }
    }

    pub(crate) fn index_kind(&self) -> Option<WordIndexKind> {
        match self.strategy {
            StrategyKind::HotSaxTrie => Some(WordIndexKind::Trie),
            StrategyKind::HotSaxHash => Some(WordIndexKind::Hash),
            StrategyKind::BruteForce | StrategyKind::Rra => None,
        }
    }
}
