use std::{
    collections::HashMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    rc::Rc,
};

use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{
    error::{AnalysisError, AnalysisResult},
    sample::SampleTable,
    version::VersionId,
};

pub trait SampleSource {
    fn fetch(&mut self, name: &str, build: VersionId, id_column: &str) -> AnalysisResult<SampleTable>;
}

#[derive(Debug, Clone)]
pub struct DirectorySampleSource {
    root: PathBuf,
    encoding: &'static Encoding,
}

impl DirectorySampleSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            encoding: UTF_8,
        }
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sample_path(&self, name: &str, build: VersionId) -> PathBuf {
        self.root
            .join(name.to_ascii_lowercase())
            .join(format!("{build}.csv"))
    }
}

impl SampleSource for DirectorySampleSource {
    fn fetch(&mut self, name: &str, build: VersionId, id_column: &str) -> AnalysisResult<SampleTable> {
        let path = self.sample_path(name, build);
        let unavailable = |reason: String| AnalysisError::SampleUnavailable {
            name: name.to_string(),
            build,
            reason,
        };
        let file = File::open(&path).map_err(|err| unavailable(format!("{path:?}: {err}")))?;
        let table = SampleTable::from_reader(build, BufReader::new(file), id_column, self.encoding)
            .map_err(|err| unavailable(format!("{err:#}")))?;
        debug!(
            "Loaded {} row(s) across {} column(s) from {path:?}",
            table.row_count(),
            table.column_count()
        );
        Ok(table)
    }
}

/// Memoizes successful fetches per `(name, build)` for one run.
#[derive(Debug)]
pub struct SampleCache<S> {
    source: S,
    tables: HashMap<(String, VersionId), Rc<SampleTable>>,
}

impl<S: SampleSource> SampleCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            tables: HashMap::new(),
        }
    }

    pub fn get(&mut self, name: &str, build: VersionId, id_column: &str) -> AnalysisResult<Rc<SampleTable>> {
        let key = (name.to_ascii_lowercase(), build);
        if let Some(table) = self.tables.get(&key) {
            return Ok(Rc::clone(table));
        }
        let table = Rc::new(self.source.fetch(name, build, id_column)?);
        self.tables.insert(key, Rc::clone(&table));
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

/// Samples held in memory, keyed by lower-cased name and build.
#[derive(Debug, Default, Clone)]
pub struct MemorySampleSource {
    tables: HashMap<(String, VersionId), SampleTable>,
    fetches: usize,
}

impl MemorySampleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, table: SampleTable) {
        self.tables
            .insert((name.to_ascii_lowercase(), table.build()), table);
    }

    pub fn fetches(&self) -> usize {
        self.fetches
    }
}

impl SampleSource for MemorySampleSource {
    fn fetch(&mut self, name: &str, build: VersionId, _id_column: &str) -> AnalysisResult<SampleTable> {
        self.fetches += 1;
        self.tables
            .get(&(name.to_ascii_lowercase(), build))
            .cloned()
            .ok_or_else(|| AnalysisError::SampleUnavailable {
                name: name.to_string(),
                build,
                reason: "not in memory".to_string(),
            })
    }
}
