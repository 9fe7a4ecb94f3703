//! Aggregation and validation of scored candidates for one target build.
//!
//! Comparisons are bucketed by the unnamed column they were scored for (all
//! ordinals of an array share a bucket). After each scoring pass the buckets
//! are validated: weak candidates are dropped, the rest ranked, and anything
//! outside the leader's tolerance band removed. Names claimed by more than one
//! column are re-validated across columns before the set is applied to a
//! [`Definition`].

use std::collections::{BTreeMap, HashMap, HashSet};

use itertools::Itertools;
use log::{info, warn};

use crate::{
    candidates::normalise,
    comparison::{Comparison, sort_ranked},
    config::{
        COMMENT_MARKER, DISPARITY_TOLERANCE, EXACT_THRESHOLD, MATCH_THRESHOLD, MIN_THRESHOLD,
    },
    definition::{Definition, FieldIndex},
    error::AnalysisError,
    version::VersionId,
};

#[derive(Debug, Clone)]
pub struct ComparisonSet {
    definition: String,
    build: VersionId,
    results: BTreeMap<String, Vec<Comparison>>,
}

impl ComparisonSet {
    pub fn new(definition: impl Into<String>, build: VersionId) -> Self {
        Self {
            definition: definition.into(),
            build,
            results: BTreeMap::new(),
        }
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn build(&self) -> VersionId {
        self.build
    }

    pub fn results(&self) -> &BTreeMap<String, Vec<Comparison>> {
        &self.results
    }

    pub fn get(&self, column: &str) -> Option<&[Comparison]> {
        self.results.get(normalise(column)).map(|l| l.as_slice())
    }

    pub fn count(&self) -> usize {
        self.results.values().filter(|l| !l.is_empty()).count()
    }

    pub fn add_set(&mut self, column: &str) -> &mut Vec<Comparison> {
        self.results
            .entry(normalise(column).to_string())
            .or_default()
    }

    /// Records `field` as a confirmed mapping unless `column` already has
    /// candidates.
    pub fn add_field(&mut self, column: &str, field: &str) {
        self.results
            .entry(normalise(column).to_string())
            .or_insert_with(|| vec![Comparison::confirmed(normalise(field))]);
    }

    pub fn merge(&mut self, other: ComparisonSet) {
        for (column, list) in other.results {
            self.results.entry(column).or_default().extend(list);
        }
        self.finalise();
    }

    pub fn finalise(&mut self) {
        for list in self.results.values_mut() {
            validate(list, true);
        }
    }

    /// Candidate names still claimed by more than one column.
    ///
    /// Each contested group is validated on its own first; candidates it
    /// prunes are removed from every column that held them.
    pub fn duplicates(&mut self) -> HashSet<String> {
        let mut groups: HashMap<String, Vec<Comparison>> = HashMap::new();
        for comparison in self.results.values().flatten() {
            groups
                .entry(comparison.column.clone())
                .or_default()
                .push(comparison.clone());
        }

        let mut duplicates = HashSet::new();
        for (name, mut group) in groups.into_iter().filter(|(_, g)| g.len() > 1) {
            if validate(&mut group, false) {
                for list in self.results.values_mut() {
                    list.retain(|c| c.column != name || group.contains(c));
                }
            }
            if group.len() > 1 {
                duplicates.insert(name);
            }
        }
        duplicates
    }

    /// Applies resolved columns to `definition`. Returns true if anything
    /// was renamed or annotated.
    pub fn update_definition(&mut self, definition: &mut Definition, index: &mut FieldIndex) -> bool {
        let duplicates = self.duplicates();
        let prefix = format!(" {COMMENT_MARKER} ");
        let mut updated = false;

        for (column, list) in &self.results {
            let Some(best) = list.first() else {
                continue;
            };

            if list.len() > 1 || duplicates.contains(&best.column) || best.percentage < MIN_THRESHOLD {
                let candidates = list.iter().join(", ");
                warn!(
                    "{}",
                    AnalysisError::AmbiguousMapping {
                        column: column.clone(),
                        candidates: candidates.clone(),
                    }
                );
                if !definition.annotate_column(column, &format!("{prefix}{candidates}")) {
                    warn!("Column '{column}' not found in '{}'", self.definition);
                    continue;
                }
            } else {
                let comment = (best.percentage < MATCH_THRESHOLD).then(|| format!("{prefix}{best}"));
                if index.rename(definition, column, &best.column, comment.as_deref()) == 0 {
                    warn!("Column '{column}' not found in '{}'", self.definition);
                    continue;
                }
                info!("{}: renamed '{column}' to '{}'", self.definition, best.column);
            }
            updated = true;
        }

        updated
    }
}

/// Prunes `list` to the candidates worth keeping, best first.
///
/// Returns true when the list holds at most one entry or something was
/// removed.
pub fn validate(list: &mut Vec<Comparison>, deduplicate: bool) -> bool {
    if list.len() <= 1 {
        return true;
    }
    let original = list.len();

    if !list.iter().all(|c| c.percentage < MIN_THRESHOLD) {
        list.retain(|c| c.percentage >= MIN_THRESHOLD);
    }

    sort_ranked(list);

    let leader = list[0].clone();
    let threshold = if leader.percentage >= EXACT_THRESHOLD {
        EXACT_THRESHOLD
    } else if leader.percentage >= MATCH_THRESHOLD {
        MATCH_THRESHOLD
    } else {
        leader.percentage - DISPARITY_TOLERANCE
    };

    let mut seen = HashSet::with_capacity(list.len());
    let retained = list
        .drain(..)
        .enumerate()
        .filter(|(idx, c)| {
            if c.percentage < threshold || c.zero_count_fallback != leader.zero_count_fallback {
                return false;
            }
            if deduplicate && !seen.insert(c.column.clone()) {
                return false;
            }
            *idx == 0 || leader.scalar(c) - 1.0 < DISPARITY_TOLERANCE
        })
        .map(|(_, c)| c)
        .collect::<Vec<_>>();
    *list = retained;

    list.len() < original
}
