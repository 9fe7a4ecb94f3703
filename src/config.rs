use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use encoding_rs::{Encoding, UTF_8};

use crate::cli::AnalyseArgs;

/// Maximum number of shared record keys compared per column pair.
pub const COMPARISON_LIMIT: usize = 100_000;
pub const CARDINALITY_TOLERANCE: usize = 2;
/// Maximum score gap from the leading candidate.
pub const DISPARITY_TOLERANCE: f32 = 0.2;
/// Score at which a candidate counts as a true match.
pub const MATCH_THRESHOLD: f32 = 0.95;
/// Minimum score for a candidate to be renamed without review.
pub const MIN_THRESHOLD: f32 = 0.85;
pub const EXACT_THRESHOLD: f32 = 0.99;
/// Marker written into comments of fields this tool has resolved or flagged.
pub const COMMENT_MARKER: &str = "FieldSleuth:";
pub const PLACEHOLDER_PREFIX: &str = "Field_";

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub definitions: PathBuf,
    pub samples: PathBuf,
    pub comparison_limit: usize,
    pub encoding: &'static Encoding,
    pub dry_run: bool,
    pub log_file: Option<PathBuf>,
}

impl RunConfig {
    pub fn from_args(args: &AnalyseArgs) -> Result<Self> {
        ensure!(
            args.comparison_limit > 0,
            "Comparison limit must be greater than zero"
        );
        Ok(Self {
            definitions: args.definitions.clone(),
            samples: args.samples.clone(),
            comparison_limit: args.comparison_limit.min(COMPARISON_LIMIT),
            encoding: encoding_for(args.input_encoding.as_deref())?,
            dry_run: args.dry_run,
            log_file: args.log_file.clone(),
        })
    }
}

/// Sample encoding for a WHATWG label; UTF-8 when none is given.
pub fn encoding_for(label: Option<&str>) -> Result<&'static Encoding> {
    let Some(label) = label else {
        return Ok(UTF_8);
    };
    Encoding::for_label(label.trim().as_bytes())
        .with_context(|| format!("Unknown encoding '{label}'"))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use encoding_rs::WINDOWS_1252;

    use super::*;

    fn args(comparison_limit: usize, input_encoding: Option<&str>) -> AnalyseArgs {
        AnalyseArgs {
            definitions: PathBuf::from("definitions"),
            samples: PathBuf::from("samples"),
            build: Some("9.0.1.33978".to_string()),
            changes: None,
            comparison_limit,
            input_encoding: input_encoding.map(str::to_string),
            dry_run: false,
            log_file: None,
        }
    }

    #[test]
    fn encoding_labels_resolve() {
        assert_eq!(encoding_for(None).unwrap(), UTF_8);
        assert_eq!(encoding_for(Some(" latin1 ")).unwrap(), WINDOWS_1252);
        assert!(encoding_for(Some("not-an-encoding")).is_err());
    }

    #[test]
    fn comparison_limit_is_capped_and_must_be_positive() {
        let config = RunConfig::from_args(&args(COMPARISON_LIMIT * 2, None)).unwrap();
        assert_eq!(config.comparison_limit, COMPARISON_LIMIT);
        assert_eq!(RunConfig::from_args(&args(50, Some("windows-1252"))).unwrap().encoding, WINDOWS_1252);
        assert!(RunConfig::from_args(&args(0, None)).is_err());
    }
}
