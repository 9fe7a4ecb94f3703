use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    cli::AnalyseArgs,
    compare::{Comparer, VersionKind, resolve_versions},
    comparison_set::ComparisonSet,
    config::RunConfig,
    definition::{Definition, DefinitionLibrary, FieldIndex},
    history::{ChangeSet, extract_builds},
    report,
    source::{DirectorySampleSource, SampleCache, SampleSource},
    version::VersionId,
};

/// Outcome of analysing one definition.
#[derive(Debug)]
pub struct DefinitionReport {
    pub name: String,
    pub sets: Vec<ComparisonSet>,
    pub updated: bool,
}

pub fn execute(args: &AnalyseArgs) -> Result<()> {
    let config = RunConfig::from_args(args)?;
    let library = DefinitionLibrary::scan(&config.definitions)
        .with_context(|| format!("Scanning definitions in {:?}", config.definitions))?;
    info!(
        "Found {} definition(s) under {:?}",
        library.len(),
        config.definitions
    );

    let change_set = match (&args.build, &args.changes) {
        (Some(raw), _) => match raw.parse::<VersionId>() {
            Ok(build) => ChangeSet::for_build(build, library.names()),
            Err(err) => {
                warn!("{err}; nothing to analyse");
                return Ok(());
            }
        },
        (None, Some(path)) => {
            ChangeSet::load(path).with_context(|| format!("Loading change set {path:?}"))?
        }
        (None, None) => ChangeSet::default(),
    };

    let source = DirectorySampleSource::new(&config.samples).with_encoding(config.encoding);
    let mut cache = SampleCache::new(source);
    let reports = run_change_set(&change_set, &library, &mut cache, &config)?;

    let rendered = report::render_reports(&reports);
    if !rendered.is_empty() {
        print!("{rendered}");
    }
    if let Some(path) = &config.log_file {
        report::append_log(path, &rendered)
            .with_context(|| format!("Writing run log to {path:?}"))?;
    }
    info!(
        "Analysed {} definition(s), updated {}",
        reports.len(),
        reports.iter().filter(|r| r.updated).count()
    );
    Ok(())
}

/// Analyses every relevant file of `change_set`.
pub fn run_change_set<S: SampleSource>(
    change_set: &ChangeSet,
    library: &DefinitionLibrary,
    cache: &mut SampleCache<S>,
    config: &RunConfig,
) -> Result<Vec<DefinitionReport>> {
    let mut reports = Vec::new();
    for file in change_set.relevant_files() {
        let name = file.definition_name();
        let Some(path) = library.path(name) else {
            warn!("Definition '{name}' not found under {:?}", library.root());
            continue;
        };
        let mut definition = match Definition::load(path) {
            Ok(definition) => definition,
            Err(err) => {
                warn!("Skipping '{name}': {err:#}");
                continue;
            }
        };

        let report = analyse_definition(
            name,
            &mut definition,
            &file.patch,
            cache,
            config.comparison_limit,
        );
        if report.updated && !config.dry_run {
            definition
                .save(path)
                .with_context(|| format!("Saving definition {path:?}"))?;
            info!("Updated {path:?}");
        }
        reports.push(report);
    }
    Ok(reports)
}

/// Resolves the placeholder fields `patch` introduced in `definition`.
pub fn analyse_definition<S: SampleSource>(
    name: &str,
    definition: &mut Definition,
    patch: &str,
    cache: &mut SampleCache<S>,
    comparison_limit: usize,
) -> DefinitionReport {
    let builds = extract_builds(definition, patch);
    let mut sets = Vec::with_capacity(builds.len());

    for build in builds {
        let versions = resolve_versions(definition, build);
        if versions.current.is_none() {
            warn!("'{name}' has no version for build {build}");
            continue;
        }
        let mut comparer =
            Comparer::new(name, definition, versions).with_comparison_limit(comparison_limit);
        let mut set = ComparisonSet::new(name, build);

        for kind in [VersionKind::Newer, VersionKind::Older] {
            if comparer.load_samples(kind, cache) {
                set.merge(comparer.compare(kind));
            }
        }

        if set.count() == 0 {
            info!("'{name}' build {build}: no candidates found");
            continue;
        }
        sets.push(set);
    }

    let mut updated = false;
    if !sets.is_empty() {
        let mut index = FieldIndex::build(definition);
        for set in &mut sets {
            updated |= set.update_definition(definition, &mut index);
        }
    }

    DefinitionReport {
        name: name.to_string(),
        sets,
        updated,
    }
}
