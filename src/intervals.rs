//! Maps rule occurrences in the symbol stream back onto series intervals.

use crate::error::{Error, Result};
use crate::grammar::Grammar;
use crate::sax::SymbolStream;
use std::fmt::Display;

/// A half-open series range `[start, end)` covered by one rule occurrence.
///
/// Negative ids mark coverage gaps (see [`coverage`](crate::coverage)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleInterval {
    pub rule_id: i64,
    pub start: usize,
    pub end: usize,
    /// Occurrence count of the owning rule; 0 for gaps.
    pub coverage: usize,
}

impl RuleInterval {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// One rule with its intervals and summary statistics.
#[derive(Debug, Clone)]
pub struct RuleRecord {
    pub rule_id: u32,
    /// Body with rule references, e.g. `R1 ccb`.
    pub body: String,
    /// Fully expanded body.
    pub expanded: String,
    /// Occurrence starts in the symbol stream.
    pub occurrences: Vec<usize>,
    pub intervals: Vec<RuleInterval>,
    /// References to the rule from rule bodies.
    pub use_frequency: u32,
    pub yield_len: usize,
    pub level: usize,
    pub min_length: usize,
    pub max_length: usize,
    pub mean_length: f64,
}

impl RuleRecord {
    pub fn occurrence_count(&self) -> usize {
        self.intervals.len()
    }
}

/// Per-rule intervals for one series.
#[derive(Debug, Clone)]
pub struct RuleIntervals {
    records: Vec<RuleRecord>,
    series_len: usize,
}

impl RuleIntervals {
    /// Records ordered by rule id; rule 0 comes first.
    pub fn records(&self) -> &[RuleRecord] {
        &self.records
    }

    pub fn record(&self, rule_id: u32) -> Option<&RuleRecord> {
        self.records
            .binary_search_by_key(&rule_id, |r| r.rule_id)
            .ok()
            .map(|idx| &self.records[idx])
    }

    /// Drops a record, returning it.
    pub fn remove(&mut self, rule_id: u32) -> Option<RuleRecord> {
        let idx = self
            .records
            .binary_search_by_key(&rule_id, |r| r.rule_id)
            .ok()?;
        Some(self.records.remove(idx))
    }

    /// Intervals of every rule except rule 0.
    pub fn intervals(&self) -> impl Iterator<Item = &RuleInterval> + '_ {
        self.records
            .iter()
            .filter(|r| r.rule_id != 0)
            .flat_map(|r| r.intervals.iter())
    }

    pub fn series_len(&self) -> usize {
        self.series_len
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Computes the series interval of every rule occurrence.
///
/// In sliding mode an occurrence of `yield` words starting at word `i` spans
/// `[position(i), position(i + yield) + window - 1)`; in fixed mode it ends at
/// `position(i + yield)`. Occurrences reaching the end of the stream run to the
/// end of the series. Rule 0 spans the whole series.
///
/// # Errors
///
/// [`Error::InvalidPaaSize`] for a PAA size of zero or larger than the window,
/// [`Error::StreamMismatch`] when `grammar` was not induced from `stream`.
pub fn map_intervals<T: Display>(
    grammar: &Grammar<T>,
    stream: &SymbolStream,
    window_size: usize,
    paa_size: usize,
    sliding: bool,
) -> Result<RuleIntervals> {
    if paa_size == 0 || paa_size > window_size {
        return Err(Error::InvalidPaaSize {
            paa: paa_size,
            window: window_size,
        });
    }
    if grammar.input_len() != stream.len() {
        return Err(Error::StreamMismatch {
            grammar_len: grammar.input_len(),
            stream_len: stream.len(),
        });
    }

    let series_len = stream.series_len();
    let end_of = |word_index: usize| -> usize {
        if word_index >= stream.len() {
            return series_len;
        }
        let position = stream.position(word_index);
        let end = if sliding {
            position + window_size - 1
        } else {
            position
        };
        end.min(series_len)
    };

    let records = grammar
        .rules()
        .iter()
        .map(|rule| {
            let intervals: Vec<RuleInterval> = if rule.id == 0 {
                vec![RuleInterval {
                    rule_id: 0,
                    start: 0,
                    end: series_len,
                    coverage: 1,
                }]
            } else {
                rule.occurrences
                    .iter()
                    .map(|&occ| RuleInterval {
                        rule_id: i64::from(rule.id),
                        start: stream.position(occ),
                        end: end_of(occ + rule.yield_len),
                        coverage: rule.occurrences.len(),
                    })
                    .collect()
            };

            let lengths = intervals.iter().map(RuleInterval::len);
            let min_length = lengths.clone().min().unwrap_or(0);
            let max_length = lengths.clone().max().unwrap_or(0);
            let mean_length = if intervals.is_empty() {
                0.0
            } else {
                lengths.sum::<usize>() as f64 / intervals.len() as f64
            };

            RuleRecord {
                rule_id: rule.id,
                body: grammar.rule_string(rule.id),
                expanded: grammar.expanded_string(rule.id),
                occurrences: rule.occurrences.clone(),
                intervals,
                use_frequency: rule.use_count,
                yield_len: rule.yield_len,
                level: rule.level,
                min_length,
                max_length,
                mean_length,
            }
        })
        .collect();

    let intervals = RuleIntervals {
        records,
        series_len,
    };
    tracing::debug!(
        rules = intervals.len(),
        intervals = intervals.intervals().count(),
        "rule intervals mapped"
    );
    Ok(intervals)
}
