//! Field normalization and the case/control precondition.

use log::{info, warn};
use polars::prelude::*;

use crate::error::{ExportError, Insufficiency};
use crate::schema::{sample, values};

/// Fill defaulted categorical fields and reduce season-year to its start year.
///
/// `age_group` nulls become "No age", `sex` nulls become "Unknown", and
/// `season_year` ("2023-2024") becomes the Int32 2023. Applying it to an
/// already normalized table changes nothing.
pub fn normalize(records: DataFrame) -> Result<DataFrame, ExportError> {
    let df = records
        .lazy()
        .with_columns([
            col(sample::AGE_GROUP).fill_null(lit(values::NO_AGE)),
            col(sample::SEX).fill_null(lit(values::UNKNOWN)),
            col(sample::SEASON_YEAR)
                .cast(DataType::String)
                .str()
                .slice(lit(0), lit(4))
                .cast(DataType::Int32),
        ])
        .collect()?;

    let bad_years = df.column(sample::SEASON_YEAR)?.null_count();
    if bad_years > 0 {
        warn!("{bad_years} season_year values do not start with a four-digit year");
    }
    Ok(df)
}

/// Counts of Detected and Not Detected samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultBalance {
    pub detected: usize,
    pub not_detected: usize,
}

/// Require at least one Detected and one Not Detected sample.
pub fn require_case_control(records: &DataFrame) -> Result<ResultBalance, ExportError> {
    let results = records.column(sample::RESULT)?.str()?;
    let detected = results
        .into_iter()
        .filter(|v| *v == Some(values::DETECTED))
        .count();
    let not_detected = results
        .into_iter()
        .filter(|v| *v == Some(values::NOT_DETECTED))
        .count();

    info!("Detected: {detected}, Not Detected: {not_detected}");
    if detected == 0 {
        return Err(Insufficiency::NoDetected.into());
    }
    if not_detected == 0 {
        return Err(Insufficiency::NoNotDetected.into());
    }
    Ok(ResultBalance {
        detected,
        not_detected,
    })
}
