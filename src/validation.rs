//! Required-field gate applied to the raw sample table.

use log::{debug, info};
use polars::prelude::*;

use crate::error::{ExportError, Insufficiency};
use crate::schema::{sample, values};

/// One row filter and the condition reported when it empties the table.
struct RequiredField {
    name: &'static str,
    keep: Expr,
    failure: Insufficiency,
}

/// Filters in application order.
fn required_fields() -> Vec<RequiredField> {
    vec![
        RequiredField {
            name: "season_year present",
            keep: col(sample::SEASON_YEAR).is_not_null(),
            failure: Insufficiency::MissingSeasonYear,
        },
        RequiredField {
            name: "result present",
            keep: col(sample::RESULT).is_not_null(),
            failure: Insufficiency::MissingResult,
        },
        RequiredField {
            name: "result is Detected or Not Detected",
            keep: col(sample::RESULT)
                .eq(lit(values::DETECTED))
                .or(col(sample::RESULT).eq(lit(values::NOT_DETECTED))),
            failure: Insufficiency::UnusableResult,
        },
        RequiredField {
            name: "sub_administrative_area_id present",
            keep: col(sample::SUB_ADMIN_AREA_ID).is_not_null(),
            failure: Insufficiency::MissingSubAdminArea,
        },
    ]
}

/// Drop samples missing a required field.
///
/// Filters run in a fixed order; the first one that leaves no rows ends the
/// run with its specific insufficiency and later filters are not applied.
pub fn validate(samples: DataFrame) -> Result<DataFrame, ExportError> {
    let total = samples.height();
    let mut current = samples;

    for field in required_fields() {
        let before = current.height();
        current = current.lazy().filter(field.keep).collect()?;
        debug!(
            "Validation [{}]: kept {} of {} samples",
            field.name,
            current.height(),
            before
        );
        if current.height() == 0 {
            return Err(field.failure.into());
        }
    }

    info!("Validation kept {} of {} samples", current.height(), total);
    Ok(current)
}
