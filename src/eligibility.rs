//! Eligibility of the normalized table for each family of scan types.

use log::{debug, info};
use polars::prelude::*;

use crate::error::ExportError;
use crate::run_log::RunLog;
use crate::schema::{sample, values};

/// Per-run eligibility flags plus the exact-location subset they were
/// computed from.
///
/// `temporal` is never true unless `spatial_exact` is: temporal scans run on
/// the exact-location subset.
#[derive(Debug)]
pub struct Eligibility {
    pub spatial_exact: bool,
    pub temporal: bool,
    exact_subset: Option<DataFrame>,
}

impl Eligibility {
    /// Samples with latitude, longitude and exact precision, when any exist.
    pub fn into_exact_subset(self) -> Option<DataFrame> {
        self.exact_subset
    }
}

struct LocationFilter {
    dimension: &'static str,
    keep: Expr,
}

fn location_filters() -> [LocationFilter; 3] {
    [
        LocationFilter {
            dimension: "latitude",
            keep: col(sample::LATITUDE).is_not_null(),
        },
        LocationFilter {
            dimension: "longitude",
            keep: col(sample::LONGITUDE).is_not_null(),
        },
        LocationFilter {
            dimension: "exact geolocation precision",
            keep: col(sample::GEOLOCATION_PRECISION).eq(lit(values::EXACT)),
        },
    ]
}

/// Compute eligibility flags over the normalized samples.
///
/// Location filters run in order (latitude, longitude, precision). The first
/// that empties the table is written to the run log and the rest are skipped.
/// Ineligibility is not an error here; it only becomes fatal once a scan type
/// that needs exact locations is requested.
pub fn classify(records: DataFrame, log: &mut dyn RunLog) -> Result<Eligibility, ExportError> {
    let mut current = records;

    for filter in location_filters() {
        let before = current.height();
        current = current.lazy().filter(filter.keep).collect()?;
        debug!(
            "Eligibility [{}]: kept {} of {} samples",
            filter.dimension,
            current.height(),
            before
        );
        if current.height() == 0 {
            info!("No samples with {}; spatial scans unavailable", filter.dimension);
            log.paragraph(&format!(
                "No samples have {}. Spatial and temporal scans are not available for the selected data.",
                filter.dimension
            ))?;
            return Ok(Eligibility {
                spatial_exact: false,
                temporal: false,
                exact_subset: None,
            });
        }
    }

    info!("{} samples have exact locations", current.height());
    Ok(Eligibility {
        spatial_exact: true,
        temporal: true,
        exact_subset: Some(current),
    })
}
