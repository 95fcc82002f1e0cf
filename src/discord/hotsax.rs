use super::distance::{squared_bounded, ZNormWindows};
use super::registry::VisitRegistry;
use super::word_index::{build_index, rarest_first, WordIndex, WordIndexKind};
use super::{improves, DiscordRecord, DiscordSearch, SearchDiagnostics};
use crate::sax::{paa, Alphabet};
use rand::rngs::StdRng;

/// HOT SAX: windows are visited rarest word first. Each candidate is compared
/// with the windows sharing its word, then with the rest in random order, and
/// dropped as soon as its running nearest-neighbor distance falls below the
/// best discord distance so far.
pub(crate) struct HotSax {
    windows: ZNormWindows,
    words: Vec<String>,
    index: Box<dyn WordIndex>,
    order: Vec<usize>,
}

impl HotSax {
    pub(crate) fn new(
        series: &[f64],
        window: usize,
        paa_size: usize,
        alphabet: &Alphabet,
        threshold: f64,
        kind: WordIndexKind,
    ) -> Self {
        let windows = ZNormWindows::new(series, window, threshold);
        let words: Vec<String> = (0..windows.count())
            .map(|p| alphabet.word(&paa(windows.get(p), paa_size)))
            .collect();
        let index = build_index(kind, &words);
        let order = rarest_first(index.as_ref());

        Self {
            windows,
            words,
            index,
            order,
        }
    }
}

impl DiscordSearch for HotSax {
    fn name(&self) -> &'static str {
        "hotsax"
    }

    fn next_discord(&self, registry: &VisitRegistry, rng: &mut StdRng) -> Option<DiscordRecord> {
        let length = self.windows.length();
        let count = self.windows.count();
        let mut diagnostics = SearchDiagnostics::default();
        let mut best: Option<(usize, f64)> = None;
        let mut local = VisitRegistry::scratch(count);

        for &p in &self.order {
            if registry.any_visited(p..p + length) {
                continue;
            }
            diagnostics.candidates_examined += 1;

            let candidate = self.windows.get(p);
            let best_so_far = best.map_or(f64::NEG_INFINITY, |(_, d)| d);
            let mut nn = f64::INFINITY;
            let mut abandoned = false;

            for &q in self.index.occurrences(&self.words[p]) {
                local.mark(q);
                if p.abs_diff(q) < length {
                    continue;
                }
                nn = nn.min(squared_bounded(candidate, self.windows.get(q), nn));
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
                    nn = nn.min(squared_bounded(candidate, self.windows.get(q), nn));
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
