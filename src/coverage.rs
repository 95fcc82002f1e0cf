use crate::intervals::{RuleInterval, RuleIntervals};

/// Per-position rule coverage and the zero-coverage runs between rules.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageProfile {
    /// Number of rule intervals (rule 0 excluded) covering each position.
    pub counts: Vec<i32>,
    /// Maximal zero-coverage runs, ids -1, -2, ... in series order.
    pub gaps: Vec<RuleInterval>,
}

impl CoverageProfile {
    /// True when every position is covered by at least one rule.
    pub fn is_fully_covered(&self) -> bool {
        self.gaps.is_empty()
    }
}

/// Counts how many rule intervals cover each of `series_len` positions and
/// extracts the uncovered runs as synthetic intervals.
pub fn coverage(series_len: usize, intervals: &RuleIntervals) -> CoverageProfile {
    let mut counts = vec![0i32; series_len];
    for interval in intervals.intervals() {
        let end = interval.end.min(series_len);
        for count in counts.iter_mut().take(end).skip(interval.start) {
            *count += 1;
        }
    }

    let mut gaps = Vec::new();
    let mut next_id = -1i64;
    let mut run_start = None;
    for (idx, &count) in counts.iter().enumerate() {
        match (count == 0, run_start) {
            (true, None) => run_start = Some(idx),
            (false, Some(start)) => {
                gaps.push(gap(next_id, start, idx));
                next_id -= 1;
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        gaps.push(gap(next_id, start, series_len));
    }

    tracing::debug!(series_len, gaps = gaps.len(), "coverage computed");
    CoverageProfile { counts, gaps }
}

fn gap(rule_id: i64, start: usize, end: usize) -> RuleInterval {
    RuleInterval {
        rule_id,
        start,
        end,
        coverage: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::induce;
    use crate::intervals::map_intervals;
    use crate::sax::SymbolStream;

    fn intervals_of(text: &str) -> RuleIntervals {
        let stream = SymbolStream::from_tokens(text.split_whitespace());
        let grammar = induce(&stream).unwrap();
        map_intervals(&grammar, &stream, 1, 1, true).unwrap()
    }

    #[test]
    fn test_fully_explained_series_has_no_gaps() {
        // S -> R1 R1 R2 R2
        let intervals = intervals_of("a b a b c d c d");
        let profile = coverage(8, &intervals);
        assert!(profile.is_fully_covered());
        assert_eq!(profile.counts, vec![1; 8]);
    }

    #[test]
    fn test_removing_any_record_opens_a_gap() {
        let intervals = intervals_of("a b a b c d c d");
        for record in intervals.records().iter().filter(|r| r.rule_id != 0) {
            let mut reduced = intervals.clone();
            reduced.remove(record.rule_id);
            let profile = coverage(8, &reduced);
            assert!(!profile.gaps.is_empty(), "rule {} left no gap", record.rule_id);
        }
    }

    #[test]
    fn test_gap_ids_decrease() {
        // Only "a b" repeats; "x" and "y" stay uncovered.
        let intervals = intervals_of("x a b y a b");
        let profile = coverage(6, &intervals);
        assert_eq!(profile.counts, vec![0, 1, 1, 0, 1, 1]);
        assert_eq!(
            profile.gaps,
            vec![
                RuleInterval { rule_id: -1, start: 0, end: 1, coverage: 0 },
                RuleInterval { rule_id: -2, start: 3, end: 4, coverage: 0 },
            ]
        );
    }

    #[test]
    fn test_trailing_gap() {
        let intervals = intervals_of("a b a b z");
        let profile = coverage(5, &intervals);
        assert_eq!(profile.gaps.len(), 1);
        assert_eq!((profile.gaps[0].start, profile.gaps[0].end), (4, 5));
    }
}
