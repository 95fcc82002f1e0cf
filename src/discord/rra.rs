use super::distance::normalized_euclidean;
use super::registry::VisitRegistry;
use super::{improves, DiscordRecord, DiscordSearch, SearchDiagnostics};
use crate::intervals::RuleInterval;
use crate::sax::{znorm, znorm_in_place};
use ahash::AHashMap as HashMap;
use rand::rngs::StdRng;

/// Rare Rule Anomaly search over grammar intervals and coverage gaps.
///
/// Candidates are visited by ascending coverage. Other occurrences of the
/// candidate's own rule are compared first, since a discord rarely lies close
/// to them, then the remaining positions in random order. Lengths vary from
/// rule to rule, so distances are divided by the candidate length.
pub(crate) struct Rra<'a> {
    series: &'a [f64],
    candidates: Vec<RuleInterval>,
    starts_by_rule: HashMap<i64, Vec<usize>>,
    threshold: f64,
}

impl<'a> Rra<'a> {
    pub(crate) fn new(series: &'a [f64], intervals: &[RuleInterval], threshold: f64) -> Self {
        let mut candidates: Vec<RuleInterval> = intervals
            .iter()
            .filter(|i| i.rule_id != 0 && i.len() >= 2 && i.end <= series.len())
            .copied()
            .collect();
        candidates.sort_by_key(|i| i.coverage);

        let mut starts_by_rule: HashMap<i64, Vec<usize>> = HashMap::default();
        for interval in &candidates {
            starts_by_rule
                .entry(interval.rule_id)
                .or_default()
                .push(interval.start);
        }

        Self {
            series,
            candidates,
            starts_by_rule,
            threshold,
        }
    }

    fn distance_at(&self, candidate: &[f64], q: usize, buffer: &mut Vec<f64>) -> f64 {
        buffer.clear();
        buffer.extend_from_slice(&self.series[q..q + candidate.len()]);
        znorm_in_place(buffer, self.threshold);
        normalized_euclidean(candidate, buffer)
    }
}

impl DiscordSearch for Rra<'_> {
    fn name(&self) -> &'static str {
        "rra"
    }

    fn next_discord(&self, registry: &VisitRegistry, rng: &mut StdRng) -> Option<DiscordRecord> {
        let mut diagnostics = SearchDiagnostics::default();
        let mut best: Option<(usize, f64)> = None;
        let mut buffer = Vec::new();
        let mut local = VisitRegistry::scratch(self.series.len());

        for (idx, interval) in self.candidates.iter().enumerate() {
            let (p, length) = (interval.start, interval.len());
            if registry.any_visited(p..p + length) {
                continue;
            }
            diagnostics.candidates_examined += 1;

            let candidate = znorm(&self.series[p..p + length], self.threshold);
            let best_so_far = best.map_or(f64::NEG_INFINITY, |(_, d)| d);
            let positions = self.series.len() - length + 1;
            local.mark_tail(positions..self.series.len());
            let mut nn = f64::INFINITY;
            let mut abandoned = false;

            let same_rule = self
                .starts_by_rule
                .get(&interval.rule_id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            for &q in same_rule.iter().filter(|&&q| q < positions) {
                local.mark(q);
                if p.abs_diff(q) < length {
                    continue;
                }
                nn = nn.min(self.distance_at(&candidate, q, &mut buffer));
                diagnostics.distance_calls += 1;
                if nn < best_so_far {
                    abandoned = true;
                    break;
                }
            }

            if !abandoned {
                while let Some(q) = local.random_unvisited(rng) {
                    local.mark(q);
                    if p.abs_diff(q) < length {
                        continue;
                    }
                    nn = nn.min(self.distance_at(&candidate, q, &mut buffer));
                    diagnostics.distance_calls += 1;
                    if nn < best_so_far {
                        abandoned = true;
                        break;
                    }
                }
            }

            local.rollback();

            if abandoned {
                diagnostics.candidates_abandoned += 1;
                continue;
            }
            if nn.is_finite() && improves(best, idx, nn) {
                best = Some((idx, nn));
            }
        }

        best.map(|(idx, nn)| {
            let interval = self.candidates[idx];
            DiscordRecord {
                position: interval.start,
                length: interval.len(),
                nn_distance: nn,
                rule_id: Some(interval.rule_id),
                diagnostics,
            }
        })
    }
}
