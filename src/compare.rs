use std::rc::Rc;

use log::{debug, info, warn};

use crate::{
    candidates::{applicable_columns, normalise},
    comparison_set::ComparisonSet,
    config::COMPARISON_LIMIT,
    definition::{Definition, FieldDef, VersionDefinition},
    error::AnalysisError,
    sample::SampleTable,
    scorer::score_column,
    source::{SampleCache, SampleSource},
    version::{ClosestSorter, VersionId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionKind {
    Older,
    Current,
    Newer,
}

#[derive(Debug, Clone)]
pub struct BuildVersion {
    pub build: VersionId,
    pub version: usize,
    pub data: Option<Rc<SampleTable>>,
}

impl BuildVersion {
    pub fn new(build: VersionId, version: usize) -> Self {
        Self {
            build,
            version,
            data: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Versions {
    pub older: Option<BuildVersion>,
    pub current: Option<BuildVersion>,
    pub newer: Option<BuildVersion>,
}

impl Versions {
    pub fn get(&self, kind: VersionKind) -> Option<&BuildVersion> {
        match kind {
            VersionKind::Older => self.older.as_ref(),
            VersionKind::Current => self.current.as_ref(),
            VersionKind::Newer => self.newer.as_ref(),
        }
    }

    fn get_mut(&mut self, kind: VersionKind) -> Option<&mut BuildVersion> {
        match kind {
            VersionKind::Older => self.older.as_mut(),
            VersionKind::Current => self.current.as_mut(),
            VersionKind::Newer => self.newer.as_mut(),
        }
    }
}

/// Finds the version containing `build` and the nearest named versions on
/// either side of it.
pub fn resolve_versions(definition: &Definition, build: VersionId) -> Versions {
    let mut result = Versions::default();
    let mut min = VersionId::MIN;
    let mut max = VersionId::MAX;

    for (idx, version) in definition.versions.iter().enumerate() {
        if version.contains(&build) {
            result.current = Some(BuildVersion::new(build, idx));
            continue;
        }
        if version.is_unmapped() {
            continue;
        }
        let Some(closest) = version.closest_build(&build) else {
            continue;
        };
        if closest < build && closest > min {
            min = closest;
            result.older = Some(BuildVersion::new(closest, idx));
        } else if closest > build && closest < max {
            max = closest;
            result.newer = Some(BuildVersion::new(closest, idx));
        }
    }

    result
}

pub struct Comparer<'a> {
    name: &'a str,
    definition: &'a Definition,
    versions: Versions,
    comparison_limit: usize,
    data: Option<Rc<SampleTable>>,
}

impl<'a> Comparer<'a> {
    pub fn new(name: &'a str, definition: &'a Definition, versions: Versions) -> Self {
        Self {
            name,
            definition,
            versions,
            comparison_limit: COMPARISON_LIMIT,
            data: None,
        }
    }

    pub fn with_comparison_limit(mut self, limit: usize) -> Self {
        self.comparison_limit = limit;
        self
    }

    pub fn versions(&self) -> &Versions {
        &self.versions
    }

    pub fn target_sample(&self) -> Option<&SampleTable> {
        self.data.as_deref()
    }

    fn version_def(&self, entry: &BuildVersion) -> &'a VersionDefinition {
        &self.definition.versions[entry.version]
    }

    /// Loads the sample of the `kind` version and a target sample from the
    /// target build closest to it. Returns false if either is unavailable.
    pub fn load_samples<S: SampleSource>(&mut self, kind: VersionKind, cache: &mut SampleCache<S>) -> bool {
        let Some(entry) = self.versions.get(kind).cloned() else {
            return false;
        };
        let version = self.version_def(&entry);
        let Some(id_field) = version.id_field() else {
            warn!("'{}' has no id field for build {}", self.name, entry.build);
            return false;
        };
        match cache.get(self.name, entry.build, &id_field.name) {
            Ok(table) => {
                if let Some(slot) = self.versions.get_mut(kind) {
                    slot.data = Some(table);
                }
            }
            Err(err) => {
                warn!("{err}");
                return false;
            }
        }
        self.update_target_sample(cache, entry.build)
    }

    fn update_target_sample<S: SampleSource>(&mut self, cache: &mut SampleCache<S>, build: VersionId) -> bool {
        let Some(current) = self.versions.current.clone() else {
            return false;
        };
        let version = self.version_def(&current);
        let Some(id_field) = version.id_field() else {
            return false;
        };

        let mut builds = version.known_builds();
        ClosestSorter::new(build).sort(&mut builds);
        let Some(&nearest) = builds.first() else {
            return false;
        };
        if self.data.as_ref().is_some_and(|d| d.build() == nearest) {
            return true;
        }

        match cache.get(self.name, nearest, &id_field.name) {
            Ok(table) => {
                debug!("Using build {nearest} as target sample for '{}'", self.name);
                self.data = Some(table);
                true
            }
            Err(err) => {
                warn!("{err}");
                false
            }
        }
    }

    /// Scores every pending column of the target sample against the `kind`
    /// version. Returns an empty set when samples are missing or share no keys.
    pub fn compare(&self, kind: VersionKind) -> ComparisonSet {
        let build = self
            .versions
            .current
            .as_ref()
            .map(|c| c.build)
            .unwrap_or(VersionId::MIN);
        let mut results = ComparisonSet::new(self.name, build);

        let (Some(target), Some(current), Some(entry)) =
            (self.data.as_deref(), self.versions.current.as_ref(), self.versions.get(kind))
        else {
            return results;
        };
        let Some(candidate) = entry.data.as_deref() else {
            return results;
        };

        let keys = target.intersect_keys(candidate, self.comparison_limit);
        if keys.is_empty() {
            warn!(
                "{}",
                AnalysisError::NoSharedKeys {
                    target: target.build(),
                    candidate: candidate.build(),
                }
            );
            return results;
        }

        let target_version = self.version_def(current);
        let candidate_version = self.version_def(entry);
        let pending = [target.build().patch.to_string(), build.patch.to_string()];

        for (index, column_name) in target.columns().iter().enumerate() {
            let Some(column) = target_version.field(normalise(column_name)) else {
                continue;
            };
            if self.definition.is_annotated(&column.name) {
                continue;
            }
            if !pending.iter().any(|p| column.name.contains(p.as_str())) {
                continue;
            }

            if column.is_id {
                if let Some(id_field) = candidate_version.id_field() {
                    results.add_field(column_name, &id_field.name);
                }
                continue;
            }

            self.score_pending(&mut results, column, index, candidate, target_version, candidate_version, &keys);
        }

        results.finalise();
        info!(
            "{} build {} vs {}: {} column(s) with candidates",
            self.name,
            target.build(),
            candidate.build(),
            results.count()
        );
        results
    }

    #[allow(clippy::too_many_arguments)]
    fn score_pending(
        &self,
        results: &mut ComparisonSet,
        column: &FieldDef,
        index: usize,
        candidate: &SampleTable,
        target_version: &VersionDefinition,
        candidate_version: &VersionDefinition,
        keys: &[i64],
    ) {
        let Some(target) = self.data.as_deref() else {
            return;
        };
        let numeric = self
            .definition
            .field_type(&column.name)
            .is_some_and(|t| !t.is_text());
        let column_name = &target.columns()[index];
        let columns = applicable_columns(self.definition, target_version, column, candidate_version);
        let set = results.add_set(column_name);

        for candidate_column in &columns {
            let Some(candidate_index) = candidate.ordinal(candidate_column) else {
                debug!(
                    "{}",
                    AnalysisError::StructuralMismatch {
                        column: candidate_column.clone(),
                        build: candidate.build(),
                    }
                );
                continue;
            };
            if let Some(comparison) = score_column(
                target,
                index,
                candidate,
                candidate_index,
                candidate_column,
                keys,
                numeric,
            ) {
                set.push(comparison);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{
        definition::{ColumnDef, FieldType},
        source::MemorySampleSource,
    };

    fn v(value: &str) -> VersionId {
        value.parse().unwrap()
    }

    fn definition() -> Definition {
        let mut columns = BTreeMap::new();
        for (name, ty) in [
            ("ID", FieldType::Int),
            ("Health", FieldType::Int),
            ("Mana", FieldType::Int),
            ("Field_2_0_0_200_001", FieldType::Int),
        ] {
            columns.insert(name.to_string(), ColumnDef::new(ty));
        }
        let named = |build: &str| VersionDefinition {
            builds: vec![v(build)],
            build_ranges: Vec::new(),
            fields: vec![FieldDef::id("ID"), FieldDef::new("Health"), FieldDef::new("Mana")],
        };
        Definition {
            columns,
            versions: vec![
                named("1.0.0.100"),
                named("1.5.0.150"),
                VersionDefinition {
                    builds: vec![v("2.0.0.200")],
                    build_ranges: Vec::new(),
                    fields: vec![FieldDef::id("ID"), FieldDef::new("Field_2_0_0_200_001")],
                },
                named("3.0.0.300"),
                VersionDefinition {
                    builds: vec![v("4.0.0.400")],
                    build_ranges: Vec::new(),
                    fields: vec![FieldDef::id("ID"), FieldDef::new("Field_4_0_0_400_001")],
                },
            ],
        }
    }

    fn table(build: &str, columns: &[&str], rows: &[&[&str]]) -> SampleTable {
        let mut table = SampleTable::new(
            v(build),
            columns.iter().map(|c| c.to_string()).collect(),
            "ID",
        )
        .unwrap();
        for row in rows {
            table
                .add_row(row.iter().map(|c| c.to_string()).collect())
                .unwrap();
        }
        table
    }

    #[test]
    fn resolves_closest_named_neighbours() {
        let versions = resolve_versions(&definition(), v("2.0.0.200"));
        assert_eq!(versions.current.as_ref().unwrap().version, 2);
        assert_eq!(versions.older.as_ref().unwrap().build, v("1.5.0.150"));
        assert_eq!(versions.newer.as_ref().unwrap().build, v("3.0.0.300"));
    }

    #[test]
    fn missing_target_version_yields_no_current() {
        let versions = resolve_versions(&definition(), v("9.0.0.900"));
        assert!(versions.current.is_none());
        assert_eq!(versions.older.as_ref().unwrap().build, v("3.0.0.300"));
        assert!(versions.newer.is_none());
    }

    #[test]
    fn compare_scores_pending_columns() {
        let definition = definition();
        let mut memory = MemorySampleSource::new();
        memory.insert(
            "Spell",
            table(
                "2.0.0.200",
                &["ID", "Field_2_0_0_200_001"],
                &[&["1", "10"], &["2", "20"], &["3", "0"], &["4", "0"], &["5", "5"]],
            ),
        );
        memory.insert(
            "Spell",
            table(
                "3.0.0.300",
                &["ID", "Health", "Mana"],
                &[
                    &["1", "10", "1"],
                    &["2", "20", "2"],
                    &["3", "0", "0"],
                    &["4", "0", "0"],
                    &["5", "5", "9"],
                ],
            ),
        );
        let mut cache = SampleCache::new(memory);
        let versions = resolve_versions(&definition, v("2.0.0.200"));
        let mut comparer = Comparer::new("Spell", &definition, versions);

        assert!(comparer.load_samples(VersionKind::Newer, &mut cache));
        assert!(!comparer.load_samples(VersionKind::Older, &mut cache));

        let set = comparer.compare(VersionKind::Newer);
        let list = set.get("Field_2_0_0_200_001").unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].column, "Health");
        assert_eq!(list[0].percentage, 1.0);
        assert!(set.get("ID").is_none());

        let older = comparer.compare(VersionKind::Older);
        assert_eq!(older.count(), 0);
    }

    #[test]
    fn candidate_missing_from_sample_is_skipped() {
        let definition = definition();
        let mut memory = MemorySampleSource::new();
        memory.insert(
            "Spell",
            table(
                "2.0.0.200",
                &["ID", "Field_2_0_0_200_001"],
                &[&["1", "10"], &["2", "20"], &["3", "5"]],
            ),
        );
        memory.insert(
            "Spell",
            table(
                "3.0.0.300",
                &["ID", "Mana"],
                &[&["1", "10"], &["2", "20"], &["3", "5"]],
            ),
        );
        let mut cache = SampleCache::new(memory);
        let mut comparer = Comparer::new("Spell", &definition, resolve_versions(&definition, v("2.0.0.200")));
        assert!(comparer.load_samples(VersionKind::Newer, &mut cache));

        let set = comparer.compare(VersionKind::Newer);
        let list = set.get("Field_2_0_0_200_001").unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].column, "Mana");
        assert_eq!(list[0].percentage, 1.0);
    }

    #[test]
    fn no_shared_keys_yields_empty_set() {
        let definition = definition();
        let mut memory = MemorySampleSource::new();
        memory.insert("Spell", table("2.0.0.200", &["ID", "Field_2_0_0_200_001"], &[&["1", "10"]]));
        memory.insert("Spell", table("3.0.0.300", &["ID", "Health", "Mana"], &[&["7", "10", "1"]]));
        let mut cache = SampleCache::new(memory);
        let mut comparer = Comparer::new("Spell", &definition, resolve_versions(&definition, v("2.0.0.200")));
        assert!(comparer.load_samples(VersionKind::Newer, &mut cache));
        assert_eq!(comparer.compare(VersionKind::Newer).count(), 0);
    }
}
