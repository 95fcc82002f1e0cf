//! Chunked discretization on a worker pool.
//!
//! Window starts are split into contiguous ranges, one job per range. Workers
//! only produce raw words; the calling thread merges chunks strictly in order
//! through the same reducer the sequential path uses, so the merged stream is
//! identical to [`discretize`](super::discretize).

use super::{
    raw_words, window_starts, NumerosityReducer, NumerosityReduction, SaxParams, SaxWord,
    SymbolStream,
};
use crate::error::{Error, Result};
use rayon::ThreadPoolBuilder;
use std::collections::BTreeMap;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

/// Worker pool settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelOptions {
    pub threads: usize,
    /// Longest wait for the next chunk before giving up; retried once.
    pub timeout: Duration,
}

impl Default for ParallelOptions {
    fn default() -> Self {
        Self {
            threads: 4,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Result of a parallel run.
///
/// When `merged_chunks < total_chunks` the stream holds exactly the words of
/// the first `merged_chunks` chunks.
#[derive(Debug, Clone)]
pub struct ParallelDiscretization {
    pub stream: SymbolStream,
    pub merged_chunks: usize,
    pub total_chunks: usize,
}

impl ParallelDiscretization {
    pub fn is_complete(&self) -> bool {
        self.merged_chunks == self.total_chunks
    }
}

type ChunkResult = (usize, Option<Vec<SaxWord>>);

/// Discretizes `series` with `options.threads` workers.
pub fn discretize_parallel(
    series: &[f64],
    params: &SaxParams,
    options: &ParallelOptions,
) -> Result<ParallelDiscretization> {
    let alphabet = params.validate(series.len())?;
    if options.threads == 0 {
        return Err(Error::InvalidThreadCount {
            threads: options.threads,
        });
    }

    let starts = window_starts(series.len(), params);
    let ranges = split_ranges(starts.len(), options.threads);
    let total_chunks = ranges.len();

    let pool = ThreadPoolBuilder::new()
        .num_threads(options.threads)
        .thread_name(|i| format!("sax-worker-{i}"))
        .build()
        .map_err(|e| Error::WorkerPool {
            message: e.to_string(),
        })?;

    let series: Arc<[f64]> = Arc::from(series);
    let starts: Arc<[usize]> = Arc::from(starts);
    let (tx, rx) = mpsc::channel::<ChunkResult>();

    for (chunk, range) in ranges.into_iter().enumerate() {
        let tx = tx.clone();
        let series = Arc::clone(&series);
        let starts = Arc::clone(&starts);
        let params = params.clone();
        let alphabet = alphabet.clone();
        pool.spawn(move || {
            let words = panic::catch_unwind(AssertUnwindSafe(|| {
                raw_words(&series, &starts[range], &params, &alphabet)
            }))
            .ok();
            // The coordinator may already have given up.
            let _ = tx.send((chunk, words));
        });
    }
    drop(tx);

    let (words, merged_chunks) =
        merge_chunks(&rx, total_chunks, params.reduction, options.timeout);

    // Dropping the pool lets idle workers exit; stragglers finish into a
    // closed channel.
    drop(pool);

    tracing::debug!(
        merged_chunks,
        total_chunks,
        words = words.len(),
        "parallel discretization merged"
    );

    Ok(ParallelDiscretization {
        stream: SymbolStream::from_ordered(words, series.len(), params.mode),
        merged_chunks,
        total_chunks,
    })
}

/// Reduces chunks in index order as they arrive.
///
/// Stops at the first panicked chunk, or after a second timeout,
/// and returns the words of the chunks merged so far with their count.
fn merge_chunks(
    rx: &Receiver<ChunkResult>,
    total_chunks: usize,
    reduction: NumerosityReduction,
    timeout: Duration,
) -> (Vec<SaxWord>, usize) {
    let mut reducer = NumerosityReducer::new(reduction);
    let mut words = Vec::new();
    let mut pending: BTreeMap<usize, Option<Vec<SaxWord>>> = BTreeMap::new();
    let mut merged_chunks = 0;
    let mut retried = false;

    'merge: while merged_chunks < total_chunks {
        while let Some(chunk) = pending.remove(&merged_chunks) {
            let Some(raw) = chunk else {
                tracing::warn!(chunk = merged_chunks, "discretization worker panicked");
                break 'merge;
            };
            for word in raw {
                reducer.offer(word, &mut words);
            }
            merged_chunks += 1;
        }
        if merged_chunks == total_chunks {
            break;
        }

        match rx.recv_timeout(timeout) {
            Ok((chunk, result)) => {
                pending.insert(chunk, result);
            }
            Err(RecvTimeoutError::Timeout) if !retried => {
                tracing::warn!(
                    merged_chunks,
                    total_chunks,
                    timeout_ms = timeout.as_millis() as u64,
                    "worker pool unresponsive, waiting once more"
                );
                retried = true;
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    merged_chunks,
                    total_chunks,
                    "worker pool unresponsive, shutting it down"
                );
                break;
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!(merged_chunks, total_chunks, "worker pool disconnected");
                break;
            }
        }
    }

    (words, merged_chunks)
}

/// Splits `0..len` into at most `parts` near-equal contiguous ranges.
fn split_ranges(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.min(len).max(1);
    let base = len / parts;
    let extra = len % parts;
    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0;
    for i in 0..parts {
        let size = base + usize::from(i < extra);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sax::{discretize, WindowMode};
    use std::time::Instant;

    fn wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                (t / 7.0).sin() + 0.5 * (t / 23.0).cos()
            })
            .collect()
    }

    /// Raw words of each chunk, as the workers would produce them.
    fn chunked_words(series: &[f64], params: &SaxParams, parts: usize) -> Vec<Vec<SaxWord>> {
        let alphabet = params.validate(series.len()).unwrap();
        let starts = window_starts(series.len(), params);
        split_ranges(starts.len(), parts)
            .into_iter()
            .map(|range| raw_words(series, &starts[range], params, &alphabet))
            .collect()
    }

    #[test]
    fn test_split_ranges_cover_everything() {
        let ranges = split_ranges(10, 3);
        assert_eq!(ranges, vec![0..4, 4..7, 7..10]);
        assert_eq!(split_ranges(2, 8), vec![0..1, 1..2]);
        assert_eq!(split_ranges(0, 4), vec![0..0]);
    }

    #[test]
    fn test_matches_sequential() {
        let series = wave(600);
        for reduction in [
            NumerosityReduction::None,
            NumerosityReduction::Exact,
            NumerosityReduction::MinDist,
        ] {
            let params = SaxParams::new(40, 4, 4).with_reduction(reduction);
            let sequential = discretize(&series, &params).unwrap();
            for threads in [1, 2, 3, 7] {
                let options = ParallelOptions {
                    threads,
                    ..ParallelOptions::default()
                };
                let parallel = discretize_parallel(&series, &params, &options).unwrap();
                assert!(parallel.is_complete());
                assert_eq!(parallel.stream, sequential);
            }
        }
    }

    #[test]
    fn test_fixed_mode_matches_sequential() {
        let series = wave(500);
        let params = SaxParams::new(25, 5, 6).with_mode(WindowMode::Fixed);
        let sequential = discretize(&series, &params).unwrap();
        let parallel = discretize_parallel(
            &series,
            &params,
            &ParallelOptions {
                threads: 4,
                ..ParallelOptions::default()
            },
        )
        .unwrap();
        assert_eq!(parallel.total_chunks, 4);
        assert_eq!(parallel.stream, sequential);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let series = wave(100);
        let options = ParallelOptions {
            threads: 0,
            ..ParallelOptions::default()
        };
        assert!(matches!(
            discretize_parallel(&series, &SaxParams::new(10, 2, 3), &options),
            Err(Error::InvalidThreadCount { threads: 0 })
        ));
    }

    #[test]
    fn test_panicked_chunk_stops_merge() {
        let series = wave(400);
        let params = SaxParams::new(20, 4, 4).with_reduction(NumerosityReduction::None);
        let chunks = chunked_words(&series, &params, 4);

        let (tx, rx) = mpsc::channel();
        tx.send((2, Some(chunks[2].clone()))).unwrap();
        tx.send((0, Some(chunks[0].clone()))).unwrap();
        tx.send((1, None)).unwrap();
        tx.send((3, Some(chunks[3].clone()))).unwrap();

        let (words, merged) = merge_chunks(&rx, 4, params.reduction, Duration::from_secs(5));
        assert_eq!(merged, 1);
        assert_eq!(words, chunks[0]);
    }

    #[test]
    fn test_silent_workers_time_out_after_one_retry() {
        let series = wave(400);
        let params = SaxParams::new(20, 4, 4).with_reduction(NumerosityReduction::None);
        let chunks = chunked_words(&series, &params, 3);

        let (tx, rx) = mpsc::channel();
        tx.send((0, Some(chunks[0].clone()))).unwrap();

        let timeout = Duration::from_millis(20);
        let started = Instant::now();
        let (words, merged) = merge_chunks(&rx, 3, params.reduction, timeout);
        assert!(started.elapsed() >= timeout * 2);
        assert_eq!(merged, 1);
        assert_eq!(words, chunks[0]);
        drop(tx);
    }

    #[test]
    fn test_tiny_timeout_keeps_whole_chunks() {
        let series = wave(200_000);
        let params = SaxParams::new(100, 4, 4);
        let options = ParallelOptions {
            threads: 8,
            timeout: Duration::from_nanos(1),
        };

        let run = discretize_parallel(&series, &params, &options).unwrap();
        assert_eq!(run.total_chunks, 8);
        assert!(!run.is_complete());

        let sequential = discretize(&series, &params).unwrap();
        assert!(sequential.words().starts_with(run.stream.words()));

        // Exactly the reduced words of the merged chunks, nothing from the next.
        let chunks = chunked_words(&series, &params, 8);
        let mut reducer = NumerosityReducer::new(params.reduction);
        let mut expected = Vec::new();
        for word in chunks[..run.merged_chunks].iter().flatten().cloned() {
            reducer.offer(word, &mut expected);
        }
        assert_eq!(run.stream.words(), expected.as_slice());
    }
}
