//! Stage orchestration for one export run.
//!
//! Each stage consumes the previous table and returns a new one or a tagged
//! failure. The first failure ends the run; it is written to the run log
//! here and mapped to an exit status by the caller.

use std::path::{Path, PathBuf};

use log::{error, info, warn};
use polars::prelude::DataFrame;

use crate::attachments::{self, Attachment};
use crate::config::{PipelineConfig, SpeciesRegistry};
use crate::eligibility;
use crate::emitter;
use crate::error::ExportError;
use crate::model::{self, Parameters, ScanType};
use crate::normalize;
use crate::router;
use crate::run_log::{HtmlRunLog, RunLog};
use crate::species;
use crate::validation;

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub species_label: String,
    pub scan_type: ScanType,
    pub spatial_exact_eligible: bool,
    pub temporal_eligible: bool,
    pub cases: usize,
    pub controls: usize,
    pub files: Vec<PathBuf>,
}

/// Run the export against the files named in `config`.
///
/// The run log must already exist (ingestion creates it); a missing or empty
/// log is an infrastructure failure and nothing else is attempted.
pub fn run(config: &PipelineConfig) -> Result<RunSummary, ExportError> {
    let mut log = HtmlRunLog::open_existing(&config.run_log_path())?;

    match run_with_log(config, &mut log) {
        Ok(summary) => {
            register_outputs(&config.attachments_path(), &summary.files);
            Ok(summary)
        }
        Err(e) => {
            report_failure(&mut log, &e);
            Err(e)
        }
    }
}

/// Load the inputs and run every stage, writing user messages to `log`.
pub fn run_with_log(
    config: &PipelineConfig,
    log: &mut dyn RunLog,
) -> Result<RunSummary, ExportError> {
    let params = model::load_parameters(&config.params_path())?;
    let samples = model::load_samples(&config.sample_path())?;
    info!(
        "Running {} export for species '{}' over {} samples",
        params.scan_type,
        params.species,
        samples.height()
    );
    run_stages(samples, &params, &config.species, &config.output_dir(), log)
}

/// The export cascade over an already loaded sample table.
pub fn run_stages(
    samples: DataFrame,
    params: &Parameters,
    registry: &SpeciesRegistry,
    output_dir: &Path,
    log: &mut dyn RunLog,
) -> Result<RunSummary, ExportError> {
    // Outputs exist only after a successful run.
    emitter::clear_outputs(output_dir)?;

    let validated = validation::validate(samples)?;
    let selection = species::select_species(validated, &params.species, registry, log)?;
    let normalized = normalize::normalize(selection.records)?;
    normalize::require_case_control(&normalized)?;

    let eligibility = eligibility::classify(normalized, log)?;
    let (spatial_exact_eligible, temporal_eligible) =
        (eligibility.spatial_exact, eligibility.temporal);

    let projection = router::route(eligibility, params.scan_type, log)?;
    let emitted = emitter::emit(&projection, output_dir, log)?;

    Ok(RunSummary {
        species_label: selection.label,
        scan_type: params.scan_type,
        spatial_exact_eligible,
        temporal_eligible,
        cases: emitted.cases,
        controls: emitted.controls,
        files: emitted.files,
    })
}

/// Append the failure to the run log under an ERROR heading.
///
/// Log write failures are only reported to the developer log; the original
/// error is what the caller acts on.
pub fn report_failure(log: &mut dyn RunLog, err: &ExportError) {
    error!("{err}");
    let written = log.heading("ERROR").and_then(|_| {
        err.user_message()
            .iter()
            .try_for_each(|line| log.paragraph(line))
    });
    if let Err(e) = written {
        warn!("Could not write failure to run log: {e}");
    }
}

fn register_outputs(manifest: &Path, files: &[PathBuf]) {
    if !manifest.exists() {
        warn!("{} not found; outputs not registered", manifest.display());
        return;
    }
    for path in files {
        let Some(name) = path.file_name() else {
            continue;
        };
        let attachment = Attachment::new(
            &name.to_string_lossy(),
            attachments::CONTENT_CSV,
            attachments::ROLE_DOWNLOADABLE,
        );
        if let Err(e) = attachments::add(manifest, attachment) {
            warn!("Could not register {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Insufficiency;
    use crate::run_log::MemoryRunLog;
    use crate::schema::sample;
    use polars::prelude::*;
    use tempfile::tempdir;

    fn samples(species: &[&str], precision: &[Option<&str>]) -> DataFrame {
        let n = species.len();
        let results: Vec<&str> = (0..n)
            .map(|i| if i % 2 == 0 { "Detected" } else { "Not Detected" })
            .collect();
        let df = df!(
            sample::SUB_ADMIN_AREA_ID => &vec!["A1"; n],
            sample::SEASON_YEAR => &vec!["2020-2021"; n],
            sample::SPECIES => species,
            sample::AGE_GROUP => &vec![None::<&str>; n],
            sample::SEX => &vec![None::<&str>; n],
            sample::DATE_HARVESTED => &vec!["2020-11-03"; n],
            sample::RESULT => &results,
            sample::GEOLOCATION_PRECISION => precision,
            sample::LATITUDE => &vec![44.1; n],
            sample::LONGITUDE => &vec![-73.0; n],
        )
        .unwrap();
        model::parse_date_column(df, sample::DATE_HARVESTED).unwrap()
    }

    fn params(species: &str) -> Parameters {
        Parameters {
            species: species.to_string(),
            scan_type: ScanType::DiscreteBernoulliSpatialExact,
        }
    }

    #[test]
    fn test_run_stages_success() {
        let dir = tempdir().unwrap();
        let mut log = MemoryRunLog::new();
        let summary = run_stages(
            samples(&["elk", "elk"], &[Some("Exact"), Some("Exact")]),
            &params("elk"),
            &SpeciesRegistry::default(),
            dir.path(),
            &mut log,
        )
        .unwrap();

        assert_eq!(summary.species_label, "Elk");
        assert!(summary.spatial_exact_eligible && summary.temporal_eligible);
        assert_eq!((summary.cases, summary.controls), (1, 1));
        assert_eq!(summary.files.len(), 5);
    }

    #[test]
    fn test_species_mismatch_stops_before_classification() {
        let dir = tempdir().unwrap();
        let mut log = MemoryRunLog::new();
        let err = run_stages(
            samples(&["elk", "elk"], &[None, None]),
            &params("moose"),
            &SpeciesRegistry::default(),
            dir.path(),
            &mut log,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ExportError::Insufficient(Insufficiency::NoSpeciesRecords(_))
        ));
        // The classifier would have logged the missing precision.
        assert!(log.lines.is_empty());
    }

    #[test]
    fn test_failed_run_removes_previous_outputs() {
        let dir = tempdir().unwrap();
        for name in crate::schema::files::ALL {
            std::fs::write(dir.path().join(name), "stale\n").unwrap();
        }
        let err = run_stages(
            samples(&["elk", "elk"], &[None, None]),
            &params("elk"),
            &SpeciesRegistry::default(),
            dir.path(),
            &mut MemoryRunLog::new(),
        )
        .unwrap_err();

        assert_eq!(err.exit_code(), 70);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_report_failure_writes_heading_and_lines() {
        let mut log = MemoryRunLog::new();
        report_failure(&mut log, &Insufficiency::MissingHarvestDates.into());
        assert_eq!(log.lines[0], "<h4>ERROR</h4>");
        assert_eq!(log.lines.len(), 3);
    }
}
