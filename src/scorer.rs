//! Value-equality scoring of one unnamed column against one candidate column.
//!
//! Every shared record key is classified as a zero match (both values `"0"`),
//! a value match (equal, not `"0"`) or no match. Numeric columns are scored
//! on non-zero matches only since zero is the default for most fields and says
//! little about identity. A column with no non-zero match at all falls back
//! to the total match rate and is flagged so it ranks below regular scores.

use std::collections::HashSet;

use crate::{
    candidates::normalise, comparison::Comparison, config::MATCH_THRESHOLD, sample::SampleTable,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    NoMatch,
    ZeroMatch,
    ValueMatch,
}

pub fn classify(left: &str, right: &str) -> MatchKind {
    if left != right {
        MatchKind::NoMatch
    } else if left == "0" {
        MatchKind::ZeroMatch
    } else {
        MatchKind::ValueMatch
    }
}

/// Match counters for one column pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchCounts {
    pub matches: usize,
    pub non_zero_matches: usize,
    /// Keys that were not zero matches.
    pub non_zero_count: usize,
}

impl MatchCounts {
    pub fn record(&mut self, kind: MatchKind) {
        match kind {
            MatchKind::ZeroMatch => self.matches += 1,
            MatchKind::ValueMatch => {
                self.matches += 1;
                self.non_zero_matches += 1;
                self.non_zero_count += 1;
            }
            MatchKind::NoMatch => self.non_zero_count += 1,
        }
    }
}

/// Fills the scoring fields of `comparison` from `counts` over `total` keys.
pub fn apply_statistics(comparison: &mut Comparison, counts: MatchCounts, total: usize, numeric: bool) {
    let MatchCounts {
        matches: m,
        non_zero_matches: nzm,
        non_zero_count: nzc,
    } = counts;
    let fallback = nzm == 0 && nzc > 0;

    if !numeric || fallback {
        comparison.percentage = round2(m as f32 / total.max(1) as f32);
        comparison.matches = m;
        comparison.records_compared = total;
    } else if nzc > 0 {
        comparison.percentage = round2(nzm as f32 / nzc as f32);
        comparison.matches = nzm;
        comparison.records_compared = nzc;
    } else {
        // Every key matched on zero. The fixed score is a heuristic guess,
        // not a measured probability.
        comparison.percentage = MATCH_THRESHOLD;
        comparison.matches = 1;
        comparison.records_compared = 1;
    }

    comparison.zero_count_fallback = fallback;
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Scores column `target_index` of `target` against `candidate_index` of
/// `candidate` over `keys`. Returns `None` when nothing matched.
pub fn score_column(
    target: &SampleTable,
    target_index: usize,
    candidate: &SampleTable,
    candidate_index: usize,
    candidate_column: &str,
    keys: &[i64],
    numeric: bool,
) -> Option<Comparison> {
    if keys.is_empty() {
        return None;
    }

    let mut counts = MatchCounts::default();
    let mut unique = HashSet::with_capacity(keys.len());
    for &key in keys {
        let left = target.value(key, target_index).unwrap_or_default();
        let right = candidate.value(key, candidate_index).unwrap_or_default();
        let kind = classify(left, right);
        if kind != MatchKind::NoMatch {
            unique.insert(left);
        }
        counts.record(kind);
    }

    let mut comparison = Comparison {
        column: normalise(candidate_column).to_string(),
        comparable_records: keys.len(),
        records_compared: 0,
        matches: 0,
        unique_matches: unique.len(),
        percentage: 0.0,
        zero_count_fallback: false,
    };
    apply_statistics(&mut comparison, counts, keys.len(), numeric);

    (comparison.percentage > 0.0).then_some(comparison)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::VersionId;

    fn sample(build: u32, column: &str, values: &[&str]) -> SampleTable {
        let mut table = SampleTable::new(
            VersionId::new(1, 0, 0, build),
            vec!["ID".to_string(), column.to_string()],
            "ID",
        )
        .unwrap();
        for (idx, value) in values.iter().enumerate() {
            table
                .add_row(vec![(idx + 1).to_string(), value.to_string()])
                .unwrap();
        }
        table
    }

    #[test]
    fn classify_distinguishes_zero_matches() {
        assert_eq!(classify("0", "0"), MatchKind::ZeroMatch);
        assert_eq!(classify("5", "5"), MatchKind::ValueMatch);
        assert_eq!(classify("5", "0"), MatchKind::NoMatch);
    }

    #[test]
    fn numeric_scores_exclude_zero_matches() {
        let target = sample(2, "Field_1", &["10", "20", "0", "0", "5"]);
        let health = sample(1, "Health", &["10", "20", "0", "0", "5"]);
        let keys = target.intersect_keys(&health, 100);
        let comparison = score_column(&target, 1, &health, 1, "Health", &keys, true).unwrap();
        assert_eq!(comparison.percentage, 1.0);
        assert_eq!(comparison.matches, 3);
        assert_eq!(comparison.records_compared, 3);
        assert_eq!(comparison.comparable_records, 5);
        assert_eq!(comparison.unique_matches, 4);
        assert!(!comparison.zero_count_fallback);
    }

    #[test]
    fn no_value_match_falls_back_to_total_rate() {
        let target = sample(2, "Field_1", &["10", "20", "0", "0", "5"]);
        let mana = sample(1, "Mana", &["1", "2", "0", "0", "9"]);
        let keys = target.intersect_keys(&mana, 100);
        let comparison = score_column(&target, 1, &mana, 1, "Mana", &keys, true).unwrap();
        assert_eq!(comparison.percentage, 0.4);
        assert_eq!(comparison.matches, 2);
        assert_eq!(comparison.records_compared, 5);
        assert!(comparison.zero_count_fallback);
    }

    #[test]
    fn all_zero_columns_get_the_fixed_score() {
        let target = sample(2, "Field_1", &["0", "0", "0"]);
        let other = sample(1, "Flags", &["0", "0", "0"]);
        let keys = target.intersect_keys(&other, 100);
        let comparison = score_column(&target, 1, &other, 1, "Flags", &keys, true).unwrap();
        assert_eq!(comparison.percentage, MATCH_THRESHOLD);
        assert_eq!(comparison.matches, 1);
        assert_eq!(comparison.records_compared, 1);
        assert!(!comparison.zero_count_fallback);
    }

    #[test]
    fn text_columns_use_total_match_rate() {
        let target = sample(2, "Field_1", &["Fire", "Frost", "0", "Arcane"]);
        let other = sample(1, "Name[0]", &["Fire", "Nature", "0", "Shadow"]);
        let keys = target.intersect_keys(&other, 100);
        let comparison = score_column(&target, 1, &other, 1, "Name[0]", &keys, false).unwrap();
        assert_eq!(comparison.column, "Name");
        assert_eq!(comparison.percentage, 0.5);
        assert_eq!(comparison.records_compared, 4);
        assert!(!comparison.zero_count_fallback);
    }

    #[test]
    fn zero_scores_are_discarded() {
        let target = sample(2, "Field_1", &["1", "2"]);
        let other = sample(1, "Other", &["3", "4"]);
        let keys = target.intersect_keys(&other, 100);
        assert!(score_column(&target, 1, &other, 1, "Other", &keys, true).is_none());
        assert!(score_column(&target, 1, &other, 1, "Other", &[], true).is_none());
    }
}
