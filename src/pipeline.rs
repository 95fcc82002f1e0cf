use crate::config::{PipelineConfig, StrategyKind};
use crate::coverage::{coverage, CoverageProfile};
use crate::discord::{find_discords, rra_candidates, DiscordRecord, Strategy};
use crate::error::{Error, Result};
use crate::grammar::{induce, Grammar};
use crate::intervals::{map_intervals, RuleIntervals};
use crate::sax::{discretize, discretize_parallel, SymbolStream, WindowMode};

/// Every artifact of one pipeline run.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub stream: SymbolStream,
    pub grammar: Grammar<String>,
    pub intervals: RuleIntervals,
    pub coverage: CoverageProfile,
    pub discords: Vec<DiscordRecord>,
}

/// Discretizes `series`, induces a grammar over the words, maps rules to
/// intervals, computes coverage and runs the configured discord search.
pub fn analyze(series: &[f64], config: &PipelineConfig) -> Result<Analysis> {
    config.validate(series.len())?;
    let sax = config.sax_params();

    let stream = if config.threads > 1 {
        let run = discretize_parallel(series, &sax, &config.parallel_options())?;
        if !run.is_complete() {
            return Err(Error::DiscretizationIncomplete {
                merged: run.merged_chunks,
                total: run.total_chunks,
            });
        }
        run.stream
    } else {
        discretize(series, &sax)?
    };

    let grammar = induce(&stream)?;
    let intervals = map_intervals(
        &grammar,
        &stream,
        config.window_size,
        config.paa_size,
        config.window_mode == WindowMode::Sliding,
    )?;
    let coverage = coverage(series.len(), &intervals);

    let search = config.search_params();
    let discords = match (config.strategy, config.index_kind()) {
        (StrategyKind::Rra, _) => {
            let candidates = rra_candidates(&intervals, &coverage);
            find_discords(series, Strategy::Rra(&candidates), &search)?
        }
        (_, Some(kind)) => find_discords(series, Strategy::Classic(kind), &search)?,
        (_, None) => find_discords(series, Strategy::BruteForce, &search)?,
    };

    tracing::info!(
        series_len = series.len(),
        words = stream.len(),
        rules = grammar.len(),
        gaps = coverage.gaps.len(),
        discords = discords.len(),
        "analysis finished"
    );

    Ok(Analysis {
        stream,
        grammar,
        intervals,
        coverage,
        discords,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                let base = (t * std::f64::consts::TAU / 50.0).sin();
                if (300..315).contains(&i) {
                    base + 2.0
                } else {
                    base
                }
            })
            .collect()
    }

    #[test]
    fn test_analyze_runs_every_stage() {
        let data = series(600);
        let config = PipelineConfig {
            window_size: 50,
            paa_size: 4,
            alphabet_size: 4,
            ..PipelineConfig::default()
        };
        let analysis = analyze(&data, &config).unwrap();

        assert_eq!(analysis.grammar.input_len(), analysis.stream.len());
        assert_eq!(analysis.coverage.counts.len(), 600);
        assert_eq!(analysis.discords.len(), 1);
        assert!(analysis.discords[0].rule_id.is_some());
    }

    #[test]
    fn test_parallel_pipeline_matches_sequential() {
        let data = series(600);
        let sequential = PipelineConfig {
            window_size: 50,
            strategy: StrategyKind::HotSaxTrie,
            ..PipelineConfig::default()
        };
        let parallel = PipelineConfig {
            threads: 3,
            ..sequential.clone()
        };

        let a = analyze(&data, &sequential).unwrap();
        let b = analyze(&data, &parallel).unwrap();
        assert_eq!(a.stream, b.stream);
        assert_eq!(a.discords, b.discords);
    }

    #[test]
    fn test_invalid_config_rejected_before_work() {
        let data = series(100);
        let config = PipelineConfig {
            paa_size: 200,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            analyze(&data, &config),
            Err(Error::InvalidPaaSize { .. })
        ));
    }
}
