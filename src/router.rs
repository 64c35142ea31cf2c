//! Scan-type routing: pick the eligible subset for the requested scan type
//! and project it into the scan input layout.

use log::{debug, info};
use polars::prelude::*;

use crate::eligibility::Eligibility;
use crate::error::{ExportError, Insufficiency};
use crate::model::ScanType;
use crate::run_log::RunLog;
use crate::schema::{projection, sample, values};

/// Final table handed to the output emitter.
///
/// Columns: Location, Season-Year, Harvest Date, Longitude, Latitude, Result.
/// Every row has coordinates and a harvest date; Result is 1 or 0.
#[derive(Debug, Clone)]
pub struct ScanProjection {
    pub scan_type: ScanType,
    pub table: DataFrame,
    pub study_period_start: String,
    pub study_period_end: String,
}

impl ScanProjection {
    pub fn time_precision(&self) -> &'static str {
        self.scan_type.time_precision()
    }
}

/// Route the classified samples to the requested scan type.
pub fn route(
    eligibility: Eligibility,
    scan_type: ScanType,
    log: &mut dyn RunLog,
) -> Result<ScanProjection, ExportError> {
    let eligible = match scan_type {
        ScanType::DiscreteBernoulliTemporal => eligibility.temporal,
        ScanType::DiscreteBernoulliSpatialExact => eligibility.spatial_exact,
    };
    let subset = match eligibility.into_exact_subset() {
        Some(subset) if eligible => subset,
        _ => return Err(Insufficiency::MissingLocations.into()),
    };

    let dated = with_harvest_dates(subset)?;
    log.paragraph(&format!(
        "{} samples are eligible for a {} scan.",
        dated.height(),
        scan_type
    ))?;

    let table = project(dated)?;
    let (study_period_start, study_period_end) = match scan_type {
        ScanType::DiscreteBernoulliTemporal => date_range(&table)?,
        ScanType::DiscreteBernoulliSpatialExact => year_range(&table)?,
    };
    info!(
        "{} projection: {} rows, study period {} to {}",
        scan_type,
        table.height(),
        study_period_start,
        study_period_end
    );

    Ok(ScanProjection {
        scan_type,
        table,
        study_period_start,
        study_period_end,
    })
}

fn with_harvest_dates(subset: DataFrame) -> Result<DataFrame, ExportError> {
    let before = subset.height();
    let dated = subset
        .lazy()
        .filter(col(sample::DATE_HARVESTED).is_not_null())
        .collect()?;
    debug!("Harvest dates: kept {} of {} samples", dated.height(), before);
    if dated.height() == 0 {
        return Err(Insufficiency::MissingHarvestDates.into());
    }
    Ok(dated)
}

/// Number the rows from 1 and recode the result to 1 (Detected) / 0.
fn project(dated: DataFrame) -> Result<DataFrame, ExportError> {
    let table = dated
        .lazy()
        .with_row_index(projection::LOCATION, Some(1))
        .select([
            col(projection::LOCATION),
            col(sample::SEASON_YEAR).alias(projection::SEASON_YEAR),
            col(sample::DATE_HARVESTED).alias(projection::HARVEST_DATE),
            col(sample::LONGITUDE).alias(projection::LONGITUDE),
            col(sample::LATITUDE).alias(projection::LATITUDE),
            when(col(sample::RESULT).eq(lit(values::DETECTED)))
                .then(lit(1i32))
                .otherwise(lit(0i32))
                .alias(projection::RESULT),
        ])
        .collect()?;
    Ok(table)
}

/// Smallest and largest non-null value of `column`, rendered as text.
///
/// Date columns render as `YYYY-MM-DD`, integer years as plain numbers.
fn column_range(
    table: &DataFrame,
    column: &str,
) -> Result<Option<(String, String)>, ExportError> {
    let bounds = table
        .clone()
        .lazy()
        .select([
            col(column).min().cast(DataType::String).alias("start"),
            col(column).max().cast(DataType::String).alias("end"),
        ])
        .collect()?;
    let start = bounds.column("start")?.str()?.get(0).map(str::to_string);
    let end = bounds.column("end")?.str()?.get(0).map(str::to_string);
    Ok(start.zip(end))
}

fn date_range(table: &DataFrame) -> Result<(String, String), ExportError> {
    column_range(table, projection::HARVEST_DATE)?
        .ok_or_else(|| Insufficiency::MissingHarvestDates.into())
}

fn year_range(table: &DataFrame) -> Result<(String, String), ExportError> {
    column_range(table, projection::SEASON_YEAR)?
        .ok_or_else(|| Insufficiency::MissingSeasonYear.into())
}
