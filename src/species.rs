//! Species selection over the validated sample table.

use log::info;
use polars::prelude::*;

use crate::config::SpeciesRegistry;
use crate::error::{ExportError, Insufficiency};
use crate::run_log::RunLog;
use crate::schema::{sample, values};

const ALL_SPECIES_LABEL: &str = "All species";

/// Samples of the requested species and the label used to describe them.
#[derive(Debug)]
pub struct SpeciesSelection {
    pub records: DataFrame,
    pub label: String,
}

/// Keep the samples of one species.
///
/// "all species" (any case) keeps every sample and recodes a null species to
/// "Unknown". Any other selection must be registered; it is matched exactly
/// against the `species` column.
pub fn select_species(
    samples: DataFrame,
    selection: &str,
    registry: &SpeciesRegistry,
    log: &mut dyn RunLog,
) -> Result<SpeciesSelection, ExportError> {
    let (records, label) = if SpeciesRegistry::is_all_species(selection) {
        let records = samples
            .lazy()
            .with_columns([col(sample::SPECIES).fill_null(lit(values::UNKNOWN))])
            .collect()?;
        (records, ALL_SPECIES_LABEL.to_string())
    } else {
        let label = registry
            .label(selection)
            .ok_or_else(|| ExportError::UnknownSpecies(selection.to_string()))?
            .to_string();
        let records = samples
            .lazy()
            .filter(col(sample::SPECIES).eq(lit(selection)))
            .collect()?;
        (records, label)
    };

    if records.height() == 0 {
        return Err(Insufficiency::NoSpeciesRecords(label).into());
    }

    info!("Selected {} samples for species '{}'", records.height(), selection);
    log.paragraph(&format!("{label} samples: {}", records.height()))?;

    Ok(SpeciesSelection { records, label })
}
