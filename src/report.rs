//! Line-oriented text renderings of pipeline results.
//!
//! These only format; writing them anywhere is up to the caller.

use crate::coverage::CoverageProfile;
use crate::discord::DiscordRecord;
use crate::intervals::RuleIntervals;

/// One coverage count per line, in series order.
pub fn coverage_curve(profile: &CoverageProfile) -> String {
    let mut out = String::with_capacity(profile.counts.len() * 3);
    for count in &profile.counts {
        out.push_str(&count.to_string());
        out.push('\n');
    }
    out
}

/// One line per rule:
/// `id,body,expanded,use_frequency,min_length,mean_length,max_length,start:length ...`
pub fn grammar_report(intervals: &RuleIntervals) -> String {
    let mut out =
        String::from("rule,body,expanded,use_frequency,min_length,mean_length,max_length,occurrences\n");
    for record in intervals.records() {
        let occurrences: Vec<String> = record
            .intervals
            .iter()
            .map(|i| format!("{}:{}", i.start, i.len()))
            .collect();
        out.push_str(&format!(
            "R{},{},{},{},{},{:.2},{},{}\n",
            record.rule_id,
            record.body,
            record.expanded,
            record.use_frequency,
            record.min_length,
            record.mean_length,
            record.max_length,
            occurrences.join(" ")
        ));
    }
    out
}

/// One line per discord: `position,length,nn_distance`.
pub fn discord_report(discords: &[DiscordRecord]) -> String {
    let mut out = String::from("position,length,nn_distance\n");
    for discord in discords {
        out.push_str(&format!(
            "{},{},{:.6}\n",
            discord.position, discord.length, discord.nn_distance
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::coverage;
    use crate::discord::SearchDiagnostics;
    use crate::grammar::induce;
    use crate::intervals::map_intervals;
    use crate::sax::SymbolStream;

    #[test]
    fn test_reports() {
        let stream = SymbolStream::from_tokens(["a", "b", "a", "b", "c"]);
        let grammar = induce(&stream).unwrap();
        let intervals = map_intervals(&grammar, &stream, 1, 1, true).unwrap();
        let profile = coverage(5, &intervals);

        assert_eq!(coverage_curve(&profile), "1\n1\n1\n1\n0\n");

        let report = grammar_report(&intervals);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "R0,R1 R1 c,a b a b c,0,5,5.00,5,0:5");
        assert_eq!(lines[2], "R1,a b,a b,2,2,2.00,2,0:2 2:2");

        let discords = vec![DiscordRecord {
            position: 12,
            length: 4,
            nn_distance: 1.5,
            rule_id: None,
            diagnostics: SearchDiagnostics::default(),
        }];
        assert_eq!(
            discord_report(&discords),
            "position,length,nn_distance\n12,4,1.500000\n"
        );
    }
}
