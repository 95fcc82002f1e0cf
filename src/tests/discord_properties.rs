use crate::coverage::coverage;
use crate::discord::{
    find_discords, rra_candidates, DiscordRecord, DiscordSession, SearchParams,
    Strategy as Search, WordIndexKind,
};
use crate::grammar::induce;
use crate::intervals::map_intervals;
use crate::sax::{discretize, SaxParams};
use proptest::prelude::*;

const ANOMALY: std::ops::Range<usize> = 1150..1190;

/// Two slightly different periodic halves with a triangular spike in the
/// second one.
fn spike_series() -> Vec<f64> {
    let mut seed = 0x2545_f491_4f6c_dd1du64;
    (0..1600)
        .map(|i| {
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let noise = ((seed >> 33) as f64 / (1u64 << 31) as f64 - 0.5) * 0.04;
            let phase = i as f64 * std::f64::consts::TAU / 100.0;
            let base = if i < 800 { phase.sin() } else { 0.9 * phase.sin() };
            let spike = if ANOMALY.contains(&i) {
                let mid = (ANOMALY.start + ANOMALY.end) as f64 / 2.0;
                3.0 * (1.0 - (i as f64 - mid).abs() / 20.0)
            } else {
                0.0
            };
            base + noise + spike
        })
        .collect()
}

fn overlaps(record: &DiscordRecord, range: std::ops::Range<usize>) -> bool {
    record.position < range.end && record.position + record.length > range.start
}

#[test]
fn test_spike_found_by_every_strategy() {
    let series = spike_series();
    let params = SearchParams::new(100, 3, 3).with_seed(11);

    let brute = find_discords(&series, Search::BruteForce, &params).unwrap();
    let hash = find_discords(&series, Search::Classic(WordIndexKind::Hash), &params).unwrap();
    let trie = find_discords(&series, Search::Classic(WordIndexKind::Trie), &params).unwrap();

    assert_eq!(brute.len(), 1);
    assert!(overlaps(&brute[0], ANOMALY), "brute force: {:?}", brute[0]);
    for classic in [&hash, &trie] {
        assert_eq!(classic[0].position, brute[0].position);
        assert_eq!(classic[0].nn_distance, brute[0].nn_distance);
    }

    let sax = SaxParams::new(100, 3, 3);
    let stream = discretize(&series, &sax).unwrap();
    let grammar = induce(&stream).unwrap();
    let intervals = map_intervals(&grammar, &stream, 100, 3, true).unwrap();
    let profile = coverage(series.len(), &intervals);
    let candidates = rra_candidates(&intervals, &profile);
    let rra = find_discords(&series, Search::Rra(&candidates), &params).unwrap();

    assert_eq!(rra.len(), 1);
    let near_spike = ANOMALY.start - 100..ANOMALY.end + 100;
    assert!(overlaps(&rra[0], near_spike), "rra: {:?}", rra[0]);
    assert!(
        rra[0].position.abs_diff(brute[0].position) <= 50,
        "rra {:?} vs exact {:?}",
        rra[0],
        brute[0]
    );
    assert!(rra[0].rule_id.is_some());
}

#[test]
fn test_rra_candidates_are_rarest_first() {
    let series = spike_series();
    let sax = SaxParams::new(100, 3, 3);
    let stream = discretize(&series, &sax).unwrap();
    let grammar = induce(&stream).unwrap();
    let intervals = map_intervals(&grammar, &stream, 100, 3, true).unwrap();
    let profile = coverage(series.len(), &intervals);
    let candidates = rra_candidates(&intervals, &profile);

    assert_eq!(
        candidates.len(),
        intervals.intervals().count() + profile.gaps.len()
    );
    assert!(candidates.windows(2).all(|w| w[0].coverage <= w[1].coverage));
    assert!(candidates.iter().all(|c| c.rule_id != 0));
}

#[test]
fn test_removing_every_rule_leaves_one_gap() {
    let series = spike_series();
    let sax = SaxParams::new(100, 3, 3);
    let stream = discretize(&series, &sax).unwrap();
    let grammar = induce(&stream).unwrap();
    let mut intervals = map_intervals(&grammar, &stream, 100, 3, true).unwrap();

    let ids: Vec<u32> = intervals.records().iter().map(|r| r.rule_id).collect();
    for id in ids.into_iter().filter(|&id| id != 0) {
        intervals.remove(id);
    }
    let profile = coverage(series.len(), &intervals);
    assert_eq!(profile.gaps.len(), 1);
    assert_eq!((profile.gaps[0].start, profile.gaps[0].end), (0, series.len()));
}

#[test]
fn test_session_visitation_is_monotonic() {
    let series = spike_series();
    let params = SearchParams::new(100, 3, 3).with_discord_count(4);
    let mut session =
        DiscordSession::new(&series, Search::Classic(WordIndexKind::Hash), &params).unwrap();

    let mut visited: Vec<usize> = Vec::new();
    for record in session.by_ref() {
        let now: Vec<usize> = session_positions(&record, &visited);
        assert!(now.len() > visited.len());
        visited = now;
    }
    let registered: Vec<usize> = session.registry().visited_positions().collect();
    assert_eq!(registered, visited);
    assert_non_overlapping(session.discords());
}

/// Previously visited positions plus the new discord's window, sorted.
fn session_positions(record: &DiscordRecord, visited: &[usize]) -> Vec<usize> {
    let mut all: Vec<usize> = visited.iter().copied().chain(record.range()).collect();
    all.sort_unstable();
    all.dedup();
    all
}

fn assert_non_overlapping(discords: &[DiscordRecord]) {
    for (i, a) in discords.iter().enumerate() {
        for b in &discords[i + 1..] {
            assert!(!overlaps(a, b.range()), "{a:?} overlaps {b:?}");
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Discords reported by one session never overlap, and each round only
    /// adds visited positions.
    #[test]
    fn prop_session_discords_do_not_overlap(
        series in prop::collection::vec(-5.0f64..5.0, 60..160),
        window in 6usize..16,
        count in 1usize..5,
    ) {
        let params = SearchParams::new(window, 3.min(window), 3).with_discord_count(count);
        let mut session = DiscordSession::new(&series, Search::BruteForce, &params).unwrap();

        let mut last_visited = 0;
        while let Some(record) = session.next() {
            prop_assert!(record.nn_distance > 0.0);
            prop_assert!(session.registry().visited_count() >= last_visited + record.length);
            last_visited = session.registry().visited_count();
        }
        prop_assert!(session.discords().len() <= count);

        let discords = session.discords();
        for (i, a) in discords.iter().enumerate() {
            for b in &discords[i + 1..] {
                prop_assert!(!overlaps(a, b.range()));
            }
        }
    }
}
