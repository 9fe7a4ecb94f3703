use std::{collections::BTreeSet, fs::File, io::BufReader, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    config::PLACEHOLDER_PREFIX,
    definition::Definition,
    version::VersionId,
};

/// Files with this many changed lines or fewer only carry merged structures.
const MIN_FILE_CHANGES: usize = 2;

static NEW_FIELD_PATTERN: OnceLock<Regex> = OnceLock::new();

fn new_field_pattern() -> &'static Regex {
    NEW_FIELD_PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^\+\w+\sField_(\d{1,2}_\d{1,2}_\d{1,2}_\d+)")
            .expect("placeholder field pattern is valid")
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangedFile {
    pub filename: String,
    #[serde(default)]
    pub changes: Option<usize>,
    #[serde(default)]
    pub patch: String,
}

impl ChangedFile {
    pub fn definition_name(&self) -> &str {
        Path::new(&self.filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.filename)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeSet {
    pub id: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub files: Vec<ChangedFile>,
}

impl ChangeSet {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening change set {path:?}"))?;
        let reader = BufReader::new(file);
        let change_set = serde_json::from_reader(reader)
            .with_context(|| format!("Parsing change set JSON {path:?}"))?;
        Ok(change_set)
    }

    /// A change touching every named definition with a placeholder field for
    /// `build`.
    pub fn for_build<'a, I>(build: VersionId, names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let patch = format!("+int {PLACEHOLDER_PREFIX}{}", build.underscored());
        let files = names
            .into_iter()
            .map(|name| ChangedFile {
                filename: name.to_string(),
                changes: None,
                patch: patch.clone(),
            })
            .collect();
        Self {
            id: build.to_string(),
            message: None,
            files,
        }
    }

    pub fn relevant_files(&self) -> impl Iterator<Item = &ChangedFile> + '_ {
        self.files
            .iter()
            .filter(|f| f.changes.is_none_or(|c| c > MIN_FILE_CHANGES))
    }
}

/// Builds whose placeholder fields `patch` adds and `definition` still holds
/// unresolved.
pub fn extract_builds(definition: &Definition, patch: &str) -> BTreeSet<VersionId> {
    let mut builds = BTreeSet::new();
    for captures in new_field_pattern().captures_iter(patch) {
        let token = &captures[1];
        let pending = definition
            .columns
            .iter()
            .find(|(name, _)| name.contains(token))
            .is_some_and(|(_, column)| !column.is_annotated());
        if !pending {
            continue;
        }
        match VersionId::from_underscored(token) {
            Ok(build) => {
                builds.insert(build);
            }
            Err(err) => warn!("{err}"),
        }
    }
    builds
}
