//! Versioned schema definitions, YAML persistence, and the rename index.
//!
//! A [`Definition`] describes one record type: the column table (name, type,
//! comment) and the ordered list of [`VersionDefinition`]s, each listing the
//! fields valid for a set of builds. Definitions are stored as YAML files and
//! discovered through a [`DefinitionLibrary`].
//!
//! Renames go through a [`FieldIndex`], built once per definition, which maps
//! a field name to every `(version, field)` slot that references it.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    fs::{self, File},
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    config::{COMMENT_MARKER, PLACEHOLDER_PREFIX},
    version::{BuildRange, VersionId, closest},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Int,
    Uint,
    Float,
    String,
    Locstring,
}

impl FieldType {
    pub fn is_text(&self) -> bool {
        matches!(self, FieldType::String | FieldType::Locstring)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Int => "int",
            FieldType::Uint => "uint",
            FieldType::Float => "float",
            FieldType::String => "string",
            FieldType::Locstring => "locstring",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnDef {
    #[serde(rename = "type")]
    pub datatype: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ColumnDef {
    pub fn new(datatype: FieldType) -> Self {
        Self {
            datatype,
            comment: None,
        }
    }

    pub fn is_annotated(&self) -> bool {
        self.comment
            .as_deref()
            .is_some_and(|c| c.contains(COMMENT_MARKER))
    }
}

fn default_array_length() -> usize {
    1
}

fn is_single(value: &usize) -> bool {
    *value <= 1
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    #[serde(default = "default_array_length", skip_serializing_if = "is_single")]
    pub array_length: usize,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_id: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_relation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            array_length: 1,
            is_id: false,
            is_relation: false,
            comment: None,
        }
    }

    pub fn id(name: impl Into<String>) -> Self {
        Self {
            is_id: true,
            ..Self::new(name)
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.name.starts_with(PLACEHOLDER_PREFIX)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionDefinition {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub builds: Vec<VersionId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub build_ranges: Vec<BuildRange>,
    pub fields: Vec<FieldDef>,
}

impl VersionDefinition {
    pub fn contains(&self, build: &VersionId) -> bool {
        self.builds.contains(build) || self.build_ranges.iter().any(|r| r.contains(build))
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn id_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.is_id)
    }

    /// Every concrete build this version names, range bounds included.
    pub fn known_builds(&self) -> Vec<VersionId> {
        let mut builds = self.builds.clone();
        builds.extend(self.build_ranges.iter().map(|r| r.min));
        builds.extend(self.build_ranges.iter().map(|r| r.max));
        builds
    }

    pub fn closest_build(&self, target: &VersionId) -> Option<VersionId> {
        closest(target, &self.known_builds())
    }

    /// True when no field other than the id has a real name yet.
    pub fn is_unmapped(&self) -> bool {
        self.fields.iter().all(|f| f.is_id || f.is_placeholder())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Definition {
    pub columns: BTreeMap<String, ColumnDef>,
    pub versions: Vec<VersionDefinition>,
}

impl Definition {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening definition {path:?}"))?;
        let reader = BufReader::new(file);
        let definition = serde_yaml::from_reader(reader)
            .with_context(|| format!("Parsing definition YAML {path:?}"))?;
        Ok(definition)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_yaml::to_string(self).context("Serializing definition YAML")?;
        let mut file =
            File::create(path).with_context(|| format!("Creating definition {path:?}"))?;
        file.write_all(serialized.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.columns.get(name).map(|c| c.datatype)
    }

    pub fn is_annotated(&self, name: &str) -> bool {
        self.columns.get(name).is_some_and(|c| c.is_annotated())
    }

    pub fn version_for(&self, build: &VersionId) -> Option<usize> {
        self.versions.iter().position(|v| v.contains(build))
    }

    pub fn annotate_column(&mut self, name: &str, text: &str) -> bool {
        match self.columns.get_mut(name) {
            Some(column) => {
                column.comment = Some(append_comment(column.comment.as_deref(), text));
                true
            }
            None => false,
        }
    }
}

// Stored comments carry no leading or trailing whitespace.
pub(crate) fn append_comment(existing: Option<&str>, text: &str) -> String {
    let mut comment = existing.unwrap_or_default().to_string();
    comment.push_str(text);
    comment.trim().to_string()
}

/// Name → `(version, field)` positions for one [`Definition`].
#[derive(Debug, Clone, Default)]
pub struct FieldIndex {
    locations: HashMap<String, Vec<(usize, usize)>>,
}

impl FieldIndex {
    pub fn build(definition: &Definition) -> Self {
        let mut locations: HashMap<String, Vec<(usize, usize)>> = HashMap::new();
        for (v_idx, version) in definition.versions.iter().enumerate() {
            for (f_idx, field) in version.fields.iter().enumerate() {
                locations
                    .entry(field.name.clone())
                    .or_default()
                    .push((v_idx, f_idx));
            }
        }
        Self { locations }
    }

    pub fn locations(&self, name: &str) -> &[(usize, usize)] {
        self.locations
            .get(name)
            .map(|l| l.as_slice())
            .unwrap_or_default()
    }

    /// Renames every field called `from` to `to`, moving the column entry
    /// along with it. `comment` is appended to each renamed field.
    pub fn rename(
        &mut self,
        definition: &mut Definition,
        from: &str,
        to: &str,
        comment: Option<&str>,
    ) -> usize {
        if from == to {
            return 0;
        }
        let Some(slots) = self.locations.remove(from) else {
            return 0;
        };
        for &(v_idx, f_idx) in &slots {
            let field = &mut definition.versions[v_idx].fields[f_idx];
            field.name = to.to_string();
            if let Some(text) = comment {
                field.comment = Some(append_comment(field.comment.as_deref(), text));
            }
        }
        if let Some(column) = definition.columns.remove(from) {
            definition.columns.entry(to.to_string()).or_insert(column);
        }
        let renamed = slots.len();
        debug!("Renamed '{from}' to '{to}' in {renamed} version(s)");
        self.locations.entry(to.to_string()).or_default().extend(slots);
        renamed
    }
}

/// Definition files found under a directory, keyed case-insensitively by
/// file stem.
#[derive(Debug, Clone, Default)]
pub struct DefinitionLibrary {
    root: PathBuf,
    entries: BTreeMap<String, PathBuf>,
}

impl DefinitionLibrary {
    pub fn scan(root: &Path) -> Result<Self> {
        let mut library = DefinitionLibrary {
            root: root.to_path_buf(),
            entries: BTreeMap::new(),
        };
        if !root.is_dir() {
            return Ok(library);
        }
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in
                fs::read_dir(&dir).with_context(|| format!("Reading definitions in {dir:?}"))?
            {
                let path = entry?.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                let is_yaml = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                    && is_yaml
                {
                    library.entries.insert(stem.to_ascii_lowercase(), path.clone());
                }
            }
        }
        Ok(library)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> Option<&Path> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|p| p.as_path())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries
            .values()
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
