//! In-memory sample of exported records for one build.
//!
//! A [`SampleTable`] keeps the raw header and every row keyed by its record id
//! so two builds can be compared value by value over the ids they share.

use std::{collections::HashMap, io::Read};

use anyhow::{Context, Result};
use csv::ByteRecord;
use encoding_rs::Encoding;

use crate::{
    error::{AnalysisError, AnalysisResult},
    version::VersionId,
};

#[derive(Debug, Clone)]
pub struct SampleTable {
    build: VersionId,
    columns: Vec<String>,
    id_index: usize,
    rows: HashMap<i64, Vec<String>>,
}

impl SampleTable {
    pub fn new(build: VersionId, columns: Vec<String>, id_column: &str) -> AnalysisResult<Self> {
        let id_index = columns
            .iter()
            .position(|c| c == id_column)
            .ok_or_else(|| AnalysisError::MissingIdColumn(id_column.to_string()))?;
        Ok(Self {
            build,
            columns,
            id_index,
            rows: HashMap::with_capacity(0x1000),
        })
    }

    /// Reads a header row followed by one record per line.
    pub fn from_reader<R: Read>(
        build: VersionId,
        reader: R,
        id_column: &str,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(false).from_reader(reader);
        let headers = reader.byte_headers().context("Reading sample header")?;
        let headers = decode_fields(headers, encoding).context("Decoding sample header")?;
        let mut table = SampleTable::new(build, headers, id_column)?;

        let mut record = ByteRecord::new();
        let mut line = 1;
        while reader
            .read_byte_record(&mut record)
            .with_context(|| format!("Reading row {}", line + 1))?
        {
            line += 1;
            let fields =
                decode_fields(&record, encoding).with_context(|| format!("Decoding row {line}"))?;
            table
                .add_row(fields)
                .with_context(|| format!("Processing row {line}"))?;
        }
        Ok(table)
    }

    /// Adds a row keyed by its id column. A repeated id replaces the earlier row.
    pub fn add_row(&mut self, fields: Vec<String>) -> AnalysisResult<()> {
        let raw = fields.get(self.id_index).map(|s| s.trim()).unwrap_or("");
        let key = raw
            .parse::<i64>()
            .map_err(|_| AnalysisError::InvalidRecordId {
                value: raw.to_string(),
            })?;
        self.rows.insert(key, fields);
        Ok(())
    }

    pub fn build(&self) -> VersionId {
        self.build
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn ordinal(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn value(&self, key: i64, index: usize) -> Option<&str> {
        self.rows
            .get(&key)
            .and_then(|row| row.get(index))
            .map(|s| s.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = i64> + '_ {
        self.rows.keys().copied()
    }

    /// Record ids present in both tables, ascending, capped at `limit`.
    pub fn intersect_keys(&self, other: &SampleTable, limit: usize) -> Vec<i64> {
        let (small, large) = if self.rows.len() <= other.rows.len() {
            (self, other)
        } else {
            (other, self)
        };
        let mut keys = small
            .keys()
            .filter(|key| large.rows.contains_key(key))
            .collect::<Vec<_>>();
        keys.sort_unstable();
        keys.truncate(limit);
        keys
    }
}

fn decode_fields(record: &ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| {
            encoding
                .decode_without_bom_handling_and_without_replacement(field)
                .map(|text| text.into_owned())
                .with_context(|| format!("Invalid {} text in field", encoding.name()))
        })
        .collect()
}
