//! Error types shared by every stage of the pipeline.
//!
//! Configuration problems are reported before any work starts. Invariant
//! violations indicate an engine bug and abort the induction run that hit them.

use miette::Diagnostic;
use thiserror::Error;

/// Errors produced while discretizing, inducing grammars or searching discords.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("alphabet size {size} is outside the supported range {min}..={max}")]
    #[diagnostic(
        code(grammar_discords::invalid_alphabet),
        help("Pick an alphabet between 2 and 20 letters; 3 to 5 works for most series.")
    )]
    InvalidAlphabetSize { size: usize, min: usize, max: usize },

    #[error("PAA size {paa} is invalid for window size {window}")]
    #[diagnostic(
        code(grammar_discords::invalid_paa),
        help("The PAA size must be at least 1 and no larger than the window size.")
    )]
    InvalidPaaSize { paa: usize, window: usize },

    #[error("window size {window} is invalid for a series of length {series_len}")]
    #[diagnostic(
        code(grammar_discords::invalid_window),
        help("The window must hold at least 2 points and be shorter than the series.")
    )]
    InvalidWindow { window: usize, series_len: usize },

    #[error("discord count must be positive, got {count}")]
    #[diagnostic(
        code(grammar_discords::invalid_discord_count),
        help("Request at least one discord.")
    )]
    InvalidDiscordCount { count: usize },

    #[error("thread count must be positive, got {threads}")]
    #[diagnostic(
        code(grammar_discords::invalid_thread_count),
        help("Use 1 for sequential discretization.")
    )]
    InvalidThreadCount { threads: usize },

    #[error("grammar expands to {grammar_len} symbols but the stream holds {stream_len}")]
    #[diagnostic(
        code(grammar_discords::stream_mismatch),
        help("Map intervals with the same symbol stream the grammar was induced from.")
    )]
    StreamMismatch { grammar_len: usize, stream_len: usize },

    #[error("word {index} at position {position} is out of order or outside a series of length {series_len}")]
    #[diagnostic(
        code(grammar_discords::unordered_stream),
        help("Word positions must be strictly increasing and smaller than the series length.")
    )]
    UnorderedStream {
        index: usize,
        position: usize,
        series_len: usize,
    },

    #[error("grammar invariant violated: {message}")]
    #[diagnostic(
        code(grammar_discords::invariant_violation),
        help("This is a bug in the induction engine; the run was aborted instead of returning a corrupt grammar.")
    )]
    InvariantViolation { message: String },

    #[error("failed to start worker pool: {message}")]
    #[diagnostic(code(grammar_discords::worker_pool))]
    WorkerPool { message: String },

    #[error("parallel discretization merged {merged} of {total} chunks before giving up")]
    #[diagnostic(
        code(grammar_discords::discretization_incomplete),
        help("Raise the worker timeout or fall back to a single thread.")
    )]
    DiscretizationIncomplete { merged: usize, total: usize },

    #[error("invalid configuration: {0}")]
    #[diagnostic(
        code(grammar_discords::config),
        help("Check the TOML syntax and field names against PipelineConfig.")
    )]
    Config(#[from] toml::de::Error),
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Error::InvariantViolation {
            message: message.into(),
        }
    }
}
