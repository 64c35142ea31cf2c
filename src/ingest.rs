//! Warehouse ingestion: turns `params.json` and `sample.ndJson` into the
//! flat parameters and sample tables the export pipeline reads, and starts
//! the run log and attachment manifest.

use std::path::Path;

use chrono::{NaiveDateTime, Utc};
use html_escape::encode_text;
use log::{debug, info};
use polars::prelude::*;
use serde_json::{Map, Value};

use crate::attachments::{self, Attachment};
use crate::config::PipelineConfig;
use crate::error::ExportError;
use crate::model::write_csv;
use crate::pipeline::report_failure;
use crate::run_log::{open_execution_log, HtmlRunLog, RunLog};
use crate::schema::sample;

const MODEL_NAME: &str = "Disease Cluster Analysis Data Export";
const PROVIDER_KEY: &str = "_provider";
const PROVIDER_AREA_POINTER: &str = "/_administrative_area/administrative_area";
const WAREHOUSE_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareSummary {
    pub parameters: usize,
    pub samples: usize,
}

/// Run ingestion for the data directory in `config`.
///
/// The run log and `attachments.json` are reset first so that any failure
/// below is reported to the user.
pub fn prepare(config: &PipelineConfig) -> Result<PrepareSummary, ExportError> {
    let run_log_path = config.run_log_path();
    let mut log = HtmlRunLog::create(&run_log_path)?;

    // Listed in the manifest below; the CLI may already be writing to it.
    let execution_log = config.execution_log_path();
    open_execution_log(&execution_log, false)?;

    let manifest = config.attachments_path();
    attachments::reset(&manifest)?;
    attachments::add(
        &manifest,
        Attachment::new(
            &file_name(&execution_log),
            attachments::CONTENT_TEXT,
            attachments::ROLE_DOWNLOADABLE,
        ),
    )?;
    attachments::add(
        &manifest,
        Attachment::new(
            &file_name(&run_log_path),
            attachments::CONTENT_HTML,
            attachments::ROLE_FEEDBACK,
        ),
    )?;

    log.append("h3", "Model Execution Summary")?;
    log.paragraph(&format!("Model: {MODEL_NAME}"))?;
    log.paragraph(&format!(
        "Date: {} GMT",
        Utc::now().format("%Y-%m-%d %H:%M:%S")
    ))?;

    match ingest(config, &mut log) {
        Ok(summary) => Ok(summary),
        Err(e) => {
            report_failure(&mut log, &e);
            Err(e)
        }
    }
}

fn ingest(config: &PipelineConfig, log: &mut dyn RunLog) -> Result<PrepareSummary, ExportError> {
    let params_path = config.params_json_path();
    let params = read_params_json(&params_path)?;

    let provider_area = params
        .get(PROVIDER_KEY)
        .and_then(|p| p.pointer(PROVIDER_AREA_POINTER))
        .and_then(cell);
    let params: Map<String, Value> = params
        .into_iter()
        .filter(|(key, _)| key != PROVIDER_KEY)
        .collect();

    let mut params_df = parameters_frame(&params)?;
    write_csv(&config.params_path(), &mut params_df)?;
    info!("Wrote {} parameters", params.len());

    if let Some(area) = provider_area {
        log.paragraph(&format!("Provider area: {area}"))?;
    }
    log.heading("User provided parameters")?;
    log.append("div", &html_list(&params))?;

    let sample_path = config.sample_ndjson_path();
    let records = read_ndjson(&sample_path)?;
    log.heading("Warehouse data provided to model")?;
    log.paragraph(&format!("Samples: {}", records.len()))?;

    let mut samples_df = samples_frame(&records)?;
    write_csv(&config.sample_path(), &mut samples_df)?;
    info!("Wrote {} samples", samples_df.height());

    Ok(PrepareSummary {
        parameters: params.len(),
        samples: records.len(),
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn read_params_json(path: &Path) -> Result<Map<String, Value>, ExportError> {
    let content = std::fs::read_to_string(path).map_err(|_| {
        ExportError::Infrastructure(format!(
            "Parameters ({}) file not found",
            file_name(path)
        ))
    })?;
    match serde_json::from_str::<Value>(&content)? {
        Value::Object(map) => Ok(map),
        _ => Err(ExportError::Infrastructure(format!(
            "Parameters ({}) file is not a JSON object",
            file_name(path)
        ))),
    }
}

fn read_ndjson(path: &Path) -> Result<Vec<Value>, ExportError> {
    let content = std::fs::read_to_string(path).map_err(|_| {
        ExportError::Infrastructure(format!(
            "Samples ({}) file not found. Sample data are required to run this model",
            file_name(path)
        ))
    })?;
    let mut records = Vec::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        records.push(serde_json::from_str(line)?);
    }
    debug!("Read {} sample records", records.len());
    Ok(records)
}

/// Flatten a JSON value into a CSV cell. Lists are joined with ", ".
fn cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(cell)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        other => Some(other.to_string()),
    }
}

fn parameters_frame(params: &Map<String, Value>) -> Result<DataFrame, ExportError> {
    let columns: Vec<Column> = params
        .iter()
        .map(|(key, value)| Column::new(key.as_str().into(), &[cell(value)]))
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Render a JSON object as nested HTML lists.
fn html_list(map: &Map<String, Value>) -> String {
    let mut html = String::from("<ul>");
    for (key, value) in map {
        html.push_str(&format!("<li>{}: ", encode_text(key)));
        match value {
            Value::Object(inner) => html.push_str(&html_list(inner)),
            Value::Array(items) => {
                html.push_str("<ul>");
                for item in items {
                    let text = cell(item).unwrap_or_default();
                    html.push_str(&format!("<li>{}</li>", encode_text(&text)));
                }
                html.push_str("</ul>");
            }
            other => {
                let text = cell(other).unwrap_or_else(|| "None".to_string());
                html.push_str(&encode_text(&text));
            }
        }
        html.push_str("</li>");
    }
    html.push_str("</ul>");
    html
}

/// Single definitive test result, if exactly one test is flagged.
fn definitive_result(record: &Value) -> Option<String> {
    let tests = record.get("tests")?.as_array()?;
    let definitive: Vec<&Value> = tests
        .iter()
        .filter(|t| t.get("selected_definitive") == Some(&Value::Bool(true)))
        .collect();
    match definitive.as_slice() {
        [test] => test.get("result").and_then(cell),
        _ => None,
    }
}

fn harvest_date(record: &Value) -> Option<String> {
    match record.get(sample::DATE_HARVESTED)? {
        Value::String(s) => Some(
            NaiveDateTime::parse_from_str(s, WAREHOUSE_TIMESTAMP)
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|_| s.clone()),
        ),
        other => cell(other),
    }
}

/// Flatten one warehouse record into the sample columns, in `sample::ALL`
/// order.
fn sample_row(record: &Value) -> Vec<Option<String>> {
    let field = |key: &str| record.get(key).and_then(cell);
    let id = record.get("_id").and_then(cell).or_else(|| field(sample::ID));
    let area = record
        .pointer("/_sub_administrative_area/_id")
        .and_then(cell)
        .or_else(|| field(sample::SUB_ADMIN_AREA_ID));

    let (precision, longitude, latitude) = match record.get("lat_lng") {
        Some(lat_lng) => {
            let coords = lat_lng.pointer("/geometry/coordinates");
            (
                lat_lng
                    .pointer("/properties/geolocation_precision")
                    .and_then(cell),
                coords.and_then(|c| c.get(0)).and_then(cell),
                coords.and_then(|c| c.get(1)).and_then(cell),
            )
        }
        None => (
            field(sample::GEOLOCATION_PRECISION),
            field(sample::LONGITUDE),
            field(sample::LATITUDE),
        ),
    };
    // Coordinates come as a pair or not at all.
    let (longitude, latitude) = match (longitude, latitude) {
        (Some(lon), Some(lat)) => (Some(lon), Some(lat)),
        _ => (None, None),
    };

    vec![
        id,
        area,
        field(sample::SEASON_YEAR),
        field(sample::SPECIES),
        field(sample::AGE_GROUP),
        field(sample::SEX),
        harvest_date(record),
        definitive_result(record),
        precision,
        latitude,
        longitude,
    ]
}

fn samples_frame(records: &[Value]) -> Result<DataFrame, ExportError> {
    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); sample::ALL.len()];
    for record in records {
        for (i, value) in sample_row(record).into_iter().enumerate() {
            columns[i].push(value);
        }
    }
    let columns: Vec<Column> = sample::ALL
        .iter()
        .zip(columns)
        .map(|(name, values)| Column::new((*name).into(), values))
        .collect();
    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn record() -> Value {
        json!({
            "_id": "s-1",
            "_sub_administrative_area": {"_id": "A1"},
            "season_year": "2020-2021",
            "species": "elk",
            "date_harvested": "2020-11-03T00:00:00.000Z",
            "tests": [
                {"result": "Pending", "selected_definitive": false},
                {"result": "Detected", "selected_definitive": true}
            ],
            "lat_lng": {
                "geometry": {"coordinates": [-73.0, 44.1]},
                "properties": {"geolocation_precision": "Exact"}
            }
        })
    }

    #[test]
    fn test_sample_row_flattens_nested_fields() {
        let row = sample_row(&record());
        assert_eq!(row[0].as_deref(), Some("s-1"));
        assert_eq!(row[1].as_deref(), Some("A1"));
        assert_eq!(row[4], None);
        assert_eq!(row[6].as_deref(), Some("2020-11-03"));
        assert_eq!(row[7].as_deref(), Some("Detected"));
        assert_eq!(row[8].as_deref(), Some("Exact"));
        assert_eq!(row[9].as_deref(), Some("44.1"));
        assert_eq!(row[10].as_deref(), Some("-73.0"));
    }

    #[test]
    fn test_ambiguous_definitive_result_is_null() {
        let mut r = record();
        r["tests"] = json!([
            {"result": "Detected", "selected_definitive": true},
            {"result": "Not Detected", "selected_definitive": true}
        ]);
        assert_eq!(definitive_result(&r), None);

        r["tests"] = json!([]);
        assert_eq!(definitive_result(&r), None);
    }

    #[test]
    fn test_unparseable_timestamp_kept() {
        let mut r = record();
        r["date_harvested"] = json!("Nov 3 2020");
        assert_eq!(harvest_date(&r).as_deref(), Some("Nov 3 2020"));
    }

    #[test]
    fn test_html_list_nests() {
        let params = json!({"species": "elk", "season_year": ["2020-2021", "2021-2022"]});
        let html = html_list(params.as_object().unwrap());
        assert_eq!(
            html,
            "<ul><li>species: elk</li><li>season_year: <ul><li>2020-2021</li><li>2021-2022</li></ul></li></ul>"
        );

        let params = json!({"species": "<i>elk</i>"});
        assert_eq!(
            html_list(params.as_object().unwrap()),
            "<ul><li>species: &lt;i&gt;elk&lt;/i&gt;</li></ul>"
        );
    }

    #[test]
    fn test_prepare_writes_tables_and_log() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig::with_data_dir(dir.path());
        fs::write(
            config.params_json_path(),
            json!({
                "_provider": {"_administrative_area": {"administrative_area": "Vermont"}},
                "species": "elk",
                "scan_type": "Discrete Bernoulli Temporal",
                "season_year": ["2020-2021", "2021-2022"]
            })
            .to_string(),
        )
        .unwrap();
        fs::write(config.sample_ndjson_path(), format!("{}\n{}\n", record(), record())).unwrap();

        let summary = prepare(&config).unwrap();
        assert_eq!(summary.samples, 2);
        assert_eq!(summary.parameters, 3);

        let params = fs::read_to_string(config.params_path()).unwrap();
        let lines: Vec<&str> = params.lines().collect();
        assert_eq!(lines[0], "species,scan_type,season_year");
        assert!(lines[1].contains("\"2020-2021, 2021-2022\""));

        let samples = crate::model::load_samples(&config.sample_path()).unwrap();
        assert_eq!(samples.height(), 2);

        let log = fs::read_to_string(config.run_log_path()).unwrap();
        assert!(log.starts_with("<h3>Model Execution Summary</h3>"));
        assert!(log.contains("<p>Provider area: Vermont</p>"));
        assert!(log.contains("<p>Samples: 2</p>"));

        let manifest = fs::read_to_string(config.attachments_path()).unwrap();
        assert!(manifest.contains("execution_log.log"));
        assert!(manifest.contains("info.html"));
    }

    #[test]
    fn test_manifest_entries_exist_after_prepare() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig::with_data_dir(dir.path());
        fs::write(config.params_json_path(), "{\"species\": \"elk\"}").unwrap();
        fs::write(config.sample_ndjson_path(), format!("{}\n", record())).unwrap();

        prepare(&config).unwrap();

        let manifest = fs::read_to_string(config.attachments_path()).unwrap();
        let entries: Vec<Attachment> = serde_json::from_str(&manifest).unwrap();
        assert_eq!(entries.len(), 2);
        for entry in entries {
            let path = dir.path().join("attachments").join(&entry.filename);
            assert!(path.is_file(), "{} listed but missing", entry.filename);
        }
    }

    #[test]
    fn test_prepare_keeps_execution_log_content() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig::with_data_dir(dir.path());
        let log_path = config.execution_log_path();
        fs::create_dir_all(log_path.parent().unwrap()).unwrap();
        fs::write(&log_path, "INFO started\n").unwrap();
        fs::write(config.params_json_path(), "{\"species\": \"elk\"}").unwrap();
        fs::write(config.sample_ndjson_path(), format!("{}\n", record())).unwrap();

        prepare(&config).unwrap();
        assert_eq!(fs::read_to_string(&log_path).unwrap(), "INFO started\n");
    }

    #[test]
    fn test_prepare_missing_samples() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig::with_data_dir(dir.path());
        fs::write(config.params_json_path(), "{\"species\": \"elk\"}").unwrap();

        let err = prepare(&config).unwrap_err();
        assert_eq!(err.exit_code(), 1);

        let log = fs::read_to_string(config.run_log_path()).unwrap();
        assert!(log.contains("<h4>ERROR</h4>"));
        assert!(log.contains("Samples (sample.ndJson) file not found"));
    }
}
