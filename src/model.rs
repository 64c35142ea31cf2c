use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use log::{debug, warn};
use polars::prelude::*;

use crate::error::ExportError;
use crate::schema::*;

/// Characters stripped from every cell before null detection.
const WHITESPACE: &str = " \t\r\n";

/// Date layout of harvest dates, in and out.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ── Scan types ──────────────────────────────────────────────────────────────

/// Cluster-detection model variant requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    DiscreteBernoulliTemporal,
    DiscreteBernoulliSpatialExact,
}

impl ScanType {
    pub const ALL: [ScanType; 2] = [
        ScanType::DiscreteBernoulliTemporal,
        ScanType::DiscreteBernoulliSpatialExact,
    ];

    /// Human-readable label, as written to `Scan_Statistic`.
    pub fn label(&self) -> &'static str {
        match self {
            ScanType::DiscreteBernoulliTemporal => "Discrete Bernoulli Temporal",
            ScanType::DiscreteBernoulliSpatialExact => "Discrete Bernoulli Spatial Exact",
        }
    }

    fn identifier(&self) -> &'static str {
        match self {
            ScanType::DiscreteBernoulliTemporal => "DiscreteBernoulliTemporal",
            ScanType::DiscreteBernoulliSpatialExact => "DiscreteBernoulliSpatialExact",
        }
    }

    pub fn time_precision(&self) -> &'static str {
        match self {
            ScanType::DiscreteBernoulliTemporal => "Day",
            ScanType::DiscreteBernoulliSpatialExact => "Year",
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ScanType {
    type Err = ExportError;

    /// Accepts the human label or the compact identifier, verbatim.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ScanType::ALL
            .into_iter()
            .find(|t| t.label() == s || t.identifier() == s)
            .ok_or_else(|| ExportError::UnknownScanType(s.to_string()))
    }
}

// ── Parameters ──────────────────────────────────────────────────────────────

/// The single-row parameters table, resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    pub species: String,
    pub scan_type: ScanType,
}

/// Load the parameters table.
///
/// Required columns: species, scan_type. Only the first row is read.
pub fn load_parameters(path: &Path) -> Result<Parameters, ExportError> {
    if !path.exists() {
        return Err(ExportError::Infrastructure(format!(
            "parameters file '{}' not found",
            path.display()
        )));
    }
    let df = read_csv_as_strings(path)?;
    require_columns(&df, &[params::SPECIES, params::SCAN_TYPE])?;
    if df.height() == 0 {
        return Err(ExportError::Infrastructure(format!(
            "parameters file '{}' has no rows",
            path.display()
        )));
    }

    let species = first_value(&df, params::SPECIES)?
        .ok_or_else(|| ExportError::Config("species parameter is empty".into()))?;
    let scan_type = first_value(&df, params::SCAN_TYPE)?
        .ok_or_else(|| ExportError::Config("scan_type parameter is empty".into()))?
        .parse::<ScanType>()?;

    Ok(Parameters { species, scan_type })
}

fn first_value(df: &DataFrame, column: &str) -> Result<Option<String>, ExportError> {
    let value = df
        .column(column)?
        .str()?
        .get(0)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    Ok(value)
}

// ── Samples ─────────────────────────────────────────────────────────────────

/// Load the sample table.
///
/// All columns are read as strings and blank cells become nulls. Latitude and
/// longitude are parsed to Float64; `date_harvested` is parsed to Date
/// (unparseable values become null). Other columns are
/// preserved.
pub fn load_samples(path: &Path) -> Result<DataFrame, ExportError> {
    if !path.exists() {
        return Err(ExportError::Infrastructure(format!(
            "sample file '{}' not found",
            path.display()
        )));
    }
    let raw = read_csv_as_strings(path)?;
    prepare_samples(raw)
}

/// Apply the load-time typing to an all-string sample frame.
pub fn prepare_samples(raw: DataFrame) -> Result<DataFrame, ExportError> {
    require_columns(&raw, &sample::ALL[1..])?;

    let string_cols: Vec<String> = raw
        .get_column_names_str()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let df = blank_to_null(raw, &string_cols)?;
    let df = parse_float_column(df, sample::LATITUDE)?;
    let df = parse_float_column(df, sample::LONGITUDE)?;
    let df = parse_date_column(df, sample::DATE_HARVESTED)?;

    debug!("Loaded {} samples", df.height());
    Ok(df)
}

// ── Parse helpers ───────────────────────────────────────────────────────────

/// Read a CSV file with all columns as String dtype.
/// Trims whitespace from column names.
pub fn read_csv_as_strings(path: &Path) -> Result<DataFrame, ExportError> {
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;

    Ok(df)
}

/// Write a DataFrame as CSV with a header row.
pub fn write_csv(path: &Path, df: &mut DataFrame) -> Result<(), ExportError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    CsvWriter::new(&mut writer).include_header(true).finish(df)?;
    writer.flush()?;
    Ok(())
}

pub fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), ExportError> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(ExportError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

/// Trim string cells and turn empty strings into nulls.
fn blank_to_null(df: DataFrame, columns: &[String]) -> Result<DataFrame, ExportError> {
    let exprs: Vec<Expr> = columns
        .iter()
        .filter(|c| matches!(df.column(c.as_str()).map(|s| s.dtype()), Ok(DataType::String)))
        .map(|c| {
            let trimmed = col(c.as_str()).str().strip_chars(lit(WHITESPACE));
            when(trimmed.clone().eq(lit("")))
                .then(lit(NULL).cast(DataType::String))
                .otherwise(trimmed)
                .alias(c.as_str())
        })
        .collect();
    Ok(df.lazy().with_columns(exprs).collect()?)
}

/// Parse a string column to Float64; unparseable cells become null.
fn parse_float_column(df: DataFrame, column: &str) -> Result<DataFrame, ExportError> {
    let df = df
        .lazy()
        .with_columns([col(column).cast(DataType::Float64)])
        .collect()?;
    Ok(df)
}

/// Parse a date or timestamp string column to Date.
///
/// Only the leading `YYYY-MM-DD` is read, so warehouse timestamps keep their
/// day. Cells that do not parse become null.
pub fn parse_date_column(df: DataFrame, column: &str) -> Result<DataFrame, ExportError> {
    let present = df.column(column)?.len() - df.column(column)?.null_count();
    let df = df
        .lazy()
        .with_columns([col(column)
            .str()
            .strip_chars(lit(WHITESPACE))
            .str()
            .slice(lit(0), lit(10))
            .str()
            .to_date(StrptimeOptions {
                format: Some(DATE_FORMAT.into()),
                strict: false,
                ..Default::default()
            })])
        .collect()?;

    let kept = df.column(column)?.len() - df.column(column)?.null_count();
    if kept < present {
        warn!(
            "{} '{}' values could not be parsed as dates and were cleared",
            present - kept,
            column
        );
    }
    Ok(df)
}
