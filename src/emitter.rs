//! Writes the scan input files from a [`ScanProjection`].
//!
//! Files produced (all with a header row):
//! - `All_SaTScan_Data.csv`: the full projection
//! - `Case_File.csv`: Identifier, Number of Cases, Year, Date
//! - `Control_File.csv`: Identifier, Number of Controls, Year, Date
//! - `Coordinates_File.csv`: Identifier, Latitude, Longitude
//! - `SaTScan_user_inputs.csv`: one row echoing the run settings
//!
//! Nothing is written unless the projection has at least one case and one
//! control. Files are serialized into a staging directory next to the
//! destination and moved into place only once all of them were written;
//! files from an earlier run are removed first.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use polars::prelude::*;

use crate::error::{ExportError, Insufficiency};
use crate::model::write_csv;
use crate::router::ScanProjection;
use crate::run_log::RunLog;
use crate::schema::{files, projection, scan_files, user_inputs};

/// Outcome of a successful emit.
#[derive(Debug, Clone)]
pub struct EmitSummary {
    pub cases: usize,
    pub controls: usize,
    pub files: Vec<PathBuf>,
}

/// In-memory output tables, keyed by file name.
struct OutputSet {
    cases: DataFrame,
    controls: DataFrame,
    tables: Vec<(&'static str, DataFrame)>,
}

fn case_table(table: &DataFrame) -> Result<DataFrame, ExportError> {
    let cases = table
        .clone()
        .lazy()
        .filter(col(projection::RESULT).eq(lit(1i32)))
        .select([
            col(projection::LOCATION).alias(scan_files::IDENTIFIER),
            col(projection::RESULT).alias(scan_files::NUMBER_OF_CASES),
            col(projection::SEASON_YEAR).alias(scan_files::YEAR),
            col(projection::HARVEST_DATE).alias(scan_files::DATE),
        ])
        .collect()?;
    Ok(cases)
}

fn control_table(table: &DataFrame) -> Result<DataFrame, ExportError> {
    let controls = table
        .clone()
        .lazy()
        .filter(col(projection::RESULT).eq(lit(0i32)))
        .select([
            col(projection::LOCATION).alias(scan_files::IDENTIFIER),
            lit(1i32).alias(scan_files::NUMBER_OF_CONTROLS),
            col(projection::SEASON_YEAR).alias(scan_files::YEAR),
            col(projection::HARVEST_DATE).alias(scan_files::DATE),
        ])
        .collect()?;
    Ok(controls)
}

fn coordinates_table(table: &DataFrame) -> Result<DataFrame, ExportError> {
    let coords = table
        .clone()
        .lazy()
        .select([
            col(projection::LOCATION).alias(scan_files::IDENTIFIER),
            col(projection::LATITUDE).alias(scan_files::LATITUDE),
            col(projection::LONGITUDE).alias(scan_files::LONGITUDE),
        ])
        .collect()?;
    Ok(coords)
}

fn user_inputs_table(scan: &ScanProjection) -> Result<DataFrame, ExportError> {
    let df = df!(
        user_inputs::TIME_PRECISION => &[scan.time_precision()],
        user_inputs::STUDY_PERIOD_START => &[scan.study_period_start.as_str()],
        user_inputs::STUDY_PERIOD_END => &[scan.study_period_end.as_str()],
        user_inputs::COORDINATES => &[user_inputs::LAT_LONG],
        user_inputs::SCAN_STATISTIC => &[scan.scan_type.label()],
    )?;
    Ok(df)
}

/// Build every output table, enforcing the case/control requirement.
fn build_outputs(scan: &ScanProjection) -> Result<OutputSet, ExportError> {
    let results = scan.table.column(projection::RESULT)?.i32()?;
    if !results.into_iter().any(|v| v == Some(1)) {
        return Err(Insufficiency::NoCases.into());
    }
    if !results.into_iter().any(|v| v == Some(0)) {
        return Err(Insufficiency::NoControls.into());
    }

    let cases = case_table(&scan.table)?;
    let controls = control_table(&scan.table)?;

    let tables = vec![
        (files::ALL_DATA, scan.table.clone()),
        (files::CASES, cases.clone()),
        (files::CONTROLS, controls.clone()),
        (files::COORDINATES, coordinates_table(&scan.table)?),
        (files::USER_INPUTS, user_inputs_table(scan)?),
    ];
    Ok(OutputSet {
        cases,
        controls,
        tables,
    })
}

/// Remove scan input files left in `output_dir` by an earlier run.
pub fn clear_outputs(output_dir: &Path) -> Result<(), ExportError> {
    for name in files::ALL {
        let path = output_dir.join(name);
        if path.is_file() {
            fs::remove_file(&path)?;
            debug!("Removed previous {}", path.display());
        }
    }
    Ok(())
}

/// Move staged files into place. On failure the files already moved are
/// removed again.
fn publish(
    staged: Vec<(&'static str, PathBuf)>,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, ExportError> {
    let mut written: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for (name, path) in staged {
        let dest = output_dir.join(name);
        if let Err(e) = fs::rename(&path, &dest) {
            for placed in &written {
                if let Err(cleanup) = fs::remove_file(placed) {
                    warn!("Could not remove {}: {cleanup}", placed.display());
                }
            }
            return Err(e.into());
        }
        written.push(dest);
    }
    Ok(written)
}

/// Write the scan input files into `output_dir`.
pub fn emit(
    scan: &ScanProjection,
    output_dir: &Path,
    log: &mut dyn RunLog,
) -> Result<EmitSummary, ExportError> {
    let outputs = build_outputs(scan)?;

    fs::create_dir_all(output_dir)?;
    let staging = tempfile::Builder::new()
        .prefix(".scan-export-")
        .tempdir_in(output_dir)?;

    let mut staged = Vec::with_capacity(outputs.tables.len());
    for (name, mut df) in outputs.tables {
        let path = staging.path().join(name);
        write_csv(&path, &mut df)?;
        debug!("Staged {} ({} rows)", path.display(), df.height());
        staged.push((name, path));
    }

    clear_outputs(output_dir)?;
    let written = publish(staged, output_dir)?;

    let summary = EmitSummary {
        cases: outputs.cases.height(),
        controls: outputs.controls.height(),
        files: written,
    };
    info!(
        "Wrote {} files to {} ({} cases, {} controls)",
        summary.files.len(),
        output_dir.display(),
        summary.cases,
        summary.controls
    );
    log.paragraph(&format!("Cases: {}", summary.cases))?;
    log.paragraph(&format!("Controls: {}", summary.controls))?;

    Ok(summary)
}
