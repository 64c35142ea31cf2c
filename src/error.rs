use thiserror::Error;

/// Exit status for a broken upstream contract (missing input or log target).
pub const EXIT_INFRASTRUCTURE: i32 = 1;
/// Exit status for every data-insufficiency termination.
pub const EXIT_INSUFFICIENT: i32 = 70;
/// Exit status for unrecognized species or scan type (sysexits EX_CONFIG).
pub const EXIT_CONFIGURATION: i32 = 78;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Infrastructure: {0}")]
    Infrastructure(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Insufficient data: {0}")]
    Insufficient(#[from] Insufficiency),

    #[error("Unrecognized species: '{0}'")]
    UnknownSpecies(String),

    #[error("Unrecognized scan type: '{0}'")]
    UnknownScanType(String),

    #[error("Configuration: {0}")]
    Config(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ExportError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ExportError::Insufficient(_) => EXIT_INSUFFICIENT,
            ExportError::UnknownSpecies(_)
            | ExportError::UnknownScanType(_)
            | ExportError::Config(_) => EXIT_CONFIGURATION,
            _ => EXIT_INFRASTRUCTURE,
        }
    }

    /// Paragraphs appended to the run log under the ERROR heading.
    pub fn user_message(&self) -> Vec<String> {
        match self {
            ExportError::Insufficient(reason) => reason.user_message(),
            ExportError::UnknownSpecies(species) => vec![format!(
                "The selected species '{species}' is not recognized by this model. \
                 Select a different species."
            )],
            ExportError::UnknownScanType(scan_type) => vec![format!(
                "The selected scan type '{scan_type}' is not supported by this model. \
                 Select a different scan type."
            )],
            ExportError::Infrastructure(msg) => vec![format!("{msg}. Execution halted.")],
            other => vec![format!("{other}. Execution halted.")],
        }
    }
}

/// Every data-insufficiency condition that terminates a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Insufficiency {
    #[error("no samples with a season-year")]
    MissingSeasonYear,

    #[error("no samples with a test result")]
    MissingResult,

    #[error("no samples with a Detected or Not Detected result")]
    UnusableResult,

    #[error("no samples with a sub-administrative area")]
    MissingSubAdminArea,

    #[error("no samples of species '{0}'")]
    NoSpeciesRecords(String),

    #[error("no Detected samples")]
    NoDetected,

    #[error("no Not Detected samples")]
    NoNotDetected,

    #[error("no samples with exact locations")]
    MissingLocations,

    #[error("no samples with harvest dates")]
    MissingHarvestDates,

    #[error("no cases in the scan projection")]
    NoCases,

    #[error("no controls in the scan projection")]
    NoControls,
}

impl Insufficiency {
    pub fn user_message(&self) -> Vec<String> {
        let lines: &[&str] = match self {
            Insufficiency::MissingSeasonYear => &[
                "No samples have a season-year value.",
                "Season-year is required for cluster analysis. Select a different season-year.",
            ],
            Insufficiency::MissingResult => &[
                "No samples have a test result.",
                "A Detected or Not Detected result is required for cluster analysis.",
            ],
            Insufficiency::UnusableResult => &[
                "No samples have a Detected or Not Detected result.",
                "Only Detected and Not Detected results can be used for cluster analysis.",
            ],
            Insufficiency::MissingSubAdminArea => &[
                "No samples have a sub-administrative area.",
                "A sub-administrative area is required for cluster analysis.",
            ],
            Insufficiency::NoSpeciesRecords(label) => {
                return vec![
                    format!("There are no {label} samples in the selected data."),
                    "Select a different species or season-year.".to_string(),
                ]
            }
            Insufficiency::NoDetected => &[
                "There are no Detected samples in the selected data.",
                "At least one Detected and one Not Detected sample are required. \
                 Select a different species or season-year.",
            ],
            Insufficiency::NoNotDetected => &[
                "There are no Not Detected samples in the selected data.",
                "At least one Detected and one Not Detected sample are required. \
                 Select a different species or season-year.",
            ],
            Insufficiency::MissingLocations => &[
                "The selected data do not have exact sample locations.",
                "Exact latitude and longitude are required for this scan type. \
                 Select a different scan type.",
            ],
            Insufficiency::MissingHarvestDates => &[
                "The selected data do not have harvest dates.",
                "Harvest dates are required for this scan type. \
                 Select a different species, season-year or scan type.",
            ],
            Insufficiency::NoCases => &[
                "There are no positive samples eligible for this scan type.",
                "At least one positive sample is needed. \
                 Select a different species, season-year or scan type.",
            ],
            Insufficiency::NoControls => &[
                "There are no negative samples eligible for this scan type.",
                "At least one negative sample is needed. \
                 Select a different species, season-year or scan type.",
            ],
        };
        lines.iter().map(|l| l.to_string()).collect()
    }
}
