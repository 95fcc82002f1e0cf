use super::distance::{squared_bounded, ZNormWindows};
use super::registry::VisitRegistry;
use super::{improves, DiscordRecord, DiscordSearch, SearchDiagnostics};
use rand::rngs::StdRng;

/// Exhaustive search: exact nearest neighbor of every window.
pub(crate) struct BruteForce {
    windows: ZNormWindows,
}

impl BruteForce {
    pub(crate) fn new(series: &[f64], window: usize, threshold: f64) -> Self {
        Self {
            windows: ZNormWindows::new(series, window, threshold),
        }
    }
}

impl DiscordSearch for BruteForce {
    fn name(&self) -> &'static str {
        "brute_force"
    }

    fn next_discord(&self, registry: &VisitRegistry, _rng: &mut StdRng) -> Option<DiscordRecord> {
        let length = self.windows.length();
        let count = self.windows.count();
        let mut diagnostics = SearchDiagnostics::default();
        let mut best: Option<(usize, f64)> = None;

        for p in 0..count {
            if registry.any_visited(p..p + length) {
                continue;
            }
            diagnostics.candidates_examined += 1;

            let candidate = self.windows.get(p);
            let mut nn = f64::INFINITY;
            for q in (0..count).filter(|q| p.abs_diff(*q) >= length) {
                nn = nn.min(squared_bounded(candidate, self.windows.get(q), nn));
                diagnostics.distance_calls += 1;
            }

            if nn.is_finite() && improves(best, p, nn) {
                best = Some((p, nn));
            }
        }

        best.map(|(position, nn)| DiscordRecord {
            position,
            length,
            nn_distance: nn.sqrt(),
            rule_id: None,
            diagnostics,
        })
    }
}
