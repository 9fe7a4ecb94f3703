use std::{
    borrow::Cow,
    fmt::Write as _,
    fs::OpenOptions,
    io::Write,
    path::Path,
};

use anyhow::{Context, Result};
use chrono::Local;
use itertools::Itertools;

use crate::{analyse::DefinitionReport, comparison_set::ComparisonSet};

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let separator = widths.iter().map(|w| "-".repeat((*w).max(3))).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let cell = sanitize_cell(value);
            let padding = width.saturating_sub(display_width(&cell));
            format!("{cell}{}", " ".repeat(padding))
        })
        .join("  ");
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

/// One row per column of `set`: column name and its ranked candidates.
pub fn summary_rows(set: &ComparisonSet) -> Vec<Vec<String>> {
    set.results()
        .iter()
        .map(|(column, list)| {
            let candidates = if list.is_empty() {
                "-".to_string()
            } else {
                list.iter().join(", ")
            };
            vec![column.clone(), candidates]
        })
        .collect()
}

pub fn render_set(set: &ComparisonSet) -> String {
    let headers = vec!["column".to_string(), "candidates".to_string()];
    format!(
        "{} @ {}:\n{}",
        set.definition(),
        set.build(),
        render_table(&headers, &summary_rows(set))
    )
}

pub fn render_reports(reports: &[DefinitionReport]) -> String {
    reports
        .iter()
        .flat_map(|r| r.sets.iter())
        .map(|set| format!("\n{}", render_set(set)))
        .collect()
}

/// Appends `contents` to the log at `path` under a timestamp header.
pub fn append_log(path: &Path, contents: &str) -> Result<()> {
    if contents.trim().is_empty() {
        return Ok(());
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Opening log file {path:?}"))?;
    writeln!(file, "[{}]", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(file, "{}", contents.trim_end())?;
    writeln!(file)?;
    file.flush()?;
    Ok(())
}
