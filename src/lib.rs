//! # grammar-discords - Grammar-Guided Time Series Anomaly Discovery
//!
//! Finds discords (the subsequences farthest from their nearest
//! non-overlapping neighbor) in a numeric series:
//!
//! 1. The series is discretized into SAX words ([`discretize`]).
//! 2. Sequitur infers a context-free grammar over the words ([`induce`]),
//!    enforcing two constraints:
//!    - **Digram Uniqueness**: no pair of adjacent symbols appears twice
//!    - **Rule Utility**: every rule is used at least twice
//! 3. Rule occurrences are mapped back to series intervals
//!    ([`map_intervals`]) and aggregated into a coverage curve ([`coverage`]).
//! 4. The rarest intervals drive the discord search ([`find_discords`]).
//!
//! ## Example
//!
//! ```
//! use grammar_discords::{analyze, PipelineConfig};
//!
//! let series: Vec<f64> = (0..400)
//!     .map(|i| (i as f64 / 8.0).sin() + if (200..210).contains(&i) { 2.0 } else { 0.0 })
//!     .collect();
//! let config = PipelineConfig { window_size: 50, ..PipelineConfig::default() };
//!
//! let analysis = analyze(&series, &config).unwrap();
//! println!("{}", analysis.grammar);
//! for discord in &analysis.discords {
//!     println!("discord at {} ({} points)", discord.position, discord.length);
//! }
//! ```
//!
//! The grammar engine can also be used on its own over any hashable values:
//!
//! ```
//! use grammar_discords::GrammarEngine;
//!
//! let mut engine = GrammarEngine::new();
//! engine.extend("abcabcabc".chars());
//!
//! let reconstructed: String = engine.iter().collect();
//! assert_eq!(reconstructed, "abcabcabc");
//! ```

mod coverage;
mod digram;
mod discord;
mod engine;
mod error;
mod grammar;
mod id_gen;
mod intervals;
mod iter;
mod pipeline;
mod rule;
mod symbol;

pub mod config;
pub mod report;
pub mod sax;

#[cfg(test)]
mod tests;

pub use config::{PipelineConfig, StrategyKind};
pub use coverage::{coverage, CoverageProfile};
pub use discord::{
    euclidean, find_discords, normalized_euclidean, rra_candidates, DiscordRecord,
    DiscordSession, SearchDiagnostics, SearchParams, Strategy, VisitRegistry, WordIndexKind,
};
pub use engine::{CompressionStats, GrammarEngine};
pub use error::{Error, Result};
pub use grammar::{induce, Grammar, GrammarRule, GrammarSymbol};
pub use intervals::{map_intervals, RuleInterval, RuleIntervals, RuleRecord};
pub use iter::ExpandIter;
pub use pipeline::{analyze, Analysis};
pub use sax::{discretize, discretize_parallel, SaxParams, SymbolStream};
