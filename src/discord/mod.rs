//! Discord search.
//!
//! Three strategies share one multi-discord loop ([`DiscordSession`]): each
//! round asks the strategy for the best window not yet visited, records it,
//! and marks its window visited so later rounds cannot report it again.

mod brute_force;
mod distance;
mod hotsax;
mod registry;
mod rra;
mod word_index;

pub use distance::{euclidean, normalized_euclidean};
pub use registry::VisitRegistry;
pub use word_index::WordIndexKind;

use crate::coverage::CoverageProfile;
use crate::error::{Error, Result};
use crate::intervals::{RuleInterval, RuleIntervals};
use crate::sax::SaxParams;
use brute_force::BruteForce;
use hotsax::HotSax;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rra::Rra;

/// Work counters for one search round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchDiagnostics {
    pub distance_calls: usize,
    pub candidates_examined: usize,
    /// Candidates dropped early because they could not beat the best so far.
    pub candidates_abandoned: usize,
}

/// One discord.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscordRecord {
    pub position: usize,
    pub length: usize,
    /// Distance to the nearest non-self-overlapping neighbor.
    pub nn_distance: f64,
    /// Rule (or negative gap id) the discord came from; RRA only.
    pub rule_id: Option<i64>,
    pub diagnostics: SearchDiagnostics,
}

impl DiscordRecord {
    /// Series range the discord occupies.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.position..self.position + self.length
    }
}

/// Search strategy.
#[derive(Debug, Clone, Copy)]
pub enum Strategy<'a> {
    /// Exact nearest neighbor of every window.
    BruteForce,
    /// HOT SAX over all sliding-window words.
    Classic(WordIndexKind),
    /// Rare Rule Anomaly over the given candidate intervals, usually from
    /// [`rra_candidates`].
    Rra(&'a [RuleInterval]),
}

/// Parameters of a discord search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    /// Discord length for brute force and classic search.
    pub window_size: usize,
    pub paa_size: usize,
    pub alphabet_size: usize,
    pub norm_threshold: f64,
    pub discord_count: usize,
    /// Seed of the random neighbor sampling.
    pub seed: u64,
}

impl SearchParams {
    pub fn new(window_size: usize, paa_size: usize, alphabet_size: usize) -> Self {
        Self {
            window_size,
            paa_size,
            alphabet_size,
            norm_threshold: 0.01,
            discord_count: 1,
            seed: 0,
        }
    }

    pub fn with_discord_count(mut self, count: usize) -> Self {
        self.discord_count = count;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_norm_threshold(mut self, threshold: f64) -> Self {
        self.norm_threshold = threshold;
        self
    }

    fn sax(&self) -> SaxParams {
        SaxParams::new(self.window_size, self.paa_size, self.alphabet_size)
            .with_norm_threshold(self.norm_threshold)
    }

    pub fn validate(&self, series_len: usize) -> Result<()> {
        if self.discord_count == 0 {
            return Err(Error::InvalidDiscordCount {
                count: self.discord_count,
            });
        }
        self.sax().validate(series_len).map(|_| ())
    }
}

/// One strategy's single-round search.
pub(crate) trait DiscordSearch {
    fn name(&self) -> &'static str;

    /// Best discord whose window touches no visited position, or `None` when
    /// no candidate is left.
    fn next_discord(&self, registry: &VisitRegistry, rng: &mut StdRng) -> Option<DiscordRecord>;
}

/// Whether `score` at `key` beats `best`; ties go to the smaller key.
#[inline]
pub(crate) fn improves(best: Option<(usize, f64)>, key: usize, score: f64) -> bool {
    match best {
        None => true,
        Some((best_key, best_score)) => {
            score > best_score || (score == best_score && key < best_key)
        }
    }
}

/// A multi-discord search in progress.
///
/// Iterating yields one discord per round until the requested count is
/// reached or a round finds nothing informative (no candidate, or a zero
/// nearest-neighbor distance).
pub struct DiscordSession<'a> {
    search: Box<dyn DiscordSearch + 'a>,
    registry: VisitRegistry,
    rng: StdRng,
    requested: usize,
    found: Vec<DiscordRecord>,
    exhausted: bool,
}

impl<'a> DiscordSession<'a> {
    pub fn new(series: &'a [f64], strategy: Strategy<'a>, params: &SearchParams) -> Result<Self> {
        params.validate(series.len())?;

        let search: Box<dyn DiscordSearch + 'a> = match strategy {
            Strategy::BruteForce => Box::new(BruteForce::new(
                series,
                params.window_size,
                params.norm_threshold,
            )),
            Strategy::Classic(kind) => {
                let alphabet = params.sax().validate(series.len())?;
                Box::new(HotSax::new(
                    series,
                    params.window_size,
                    params.paa_size,
                    &alphabet,
                    params.norm_threshold,
                    kind,
                ))
            }
            Strategy::Rra(candidates) => {
                Box::new(Rra::new(series, candidates, params.norm_threshold))
            }
        };

        Ok(Self {
            search,
            registry: VisitRegistry::new(series.len()),
            rng: StdRng::seed_from_u64(params.seed),
            requested: params.discord_count,
            found: Vec::new(),
            exhausted: false,
        })
    }

    /// Positions covered by the discords reported so far.
    pub fn registry(&self) -> &VisitRegistry {
        &self.registry
    }

    pub fn discords(&self) -> &[DiscordRecord] {
        &self.found
    }

    pub fn is_done(&self) -> bool {
        self.exhausted || self.found.len() >= self.requested
    }
}

impl Iterator for DiscordSession<'_> {
    type Item = DiscordRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_done() {
            return None;
        }

        let round = self.found.len();
        let record = self
            .search
            .next_discord(&self.registry, &mut self.rng)
            .filter(|r| r.nn_distance > 0.0);

        let Some(record) = record else {
            tracing::debug!(
                strategy = self.search.name(),
                round,
                "no further discord"
            );
            self.exhausted = true;
            return None;
        };

        tracing::debug!(
            strategy = self.search.name(),
            round,
            position = record.position,
            length = record.length,
            nn_distance = record.nn_distance,
            distance_calls = record.diagnostics.distance_calls,
            "discord found"
        );
        self.registry.mark_range(record.range());
        self.found.push(record.clone());
        Some(record)
    }
}

/// Runs a full multi-discord search.
pub fn find_discords(
    series: &[f64],
    strategy: Strategy<'_>,
    params: &SearchParams,
) -> Result<Vec<DiscordRecord>> {
    let session = DiscordSession::new(series, strategy, params)?;
    let discords: Vec<DiscordRecord> = session.collect();
    tracing::info!(found = discords.len(), requested = params.discord_count, "discord search finished");
    Ok(discords)
}

/// RRA candidate pool: every non-zero rule interval plus every coverage gap,
/// rarest first. The sort is stable, so equal coverage keeps rule order with
/// gaps last.
pub fn rra_candidates(intervals: &RuleIntervals, profile: &CoverageProfile) -> Vec<RuleInterval> {
    let mut candidates: Vec<RuleInterval> = intervals
        .intervals()
        .chain(profile.gaps.iter())
        .copied()
        .collect();
    candidates.sort_by_key(|i| i.coverage);
    candidates
}
