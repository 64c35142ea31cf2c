use std::fs;
use std::path::Path;

use scan_export::schema::files;
use scan_export::{pipeline, ExportError, Insufficiency, PipelineConfig};
use tempfile::TempDir;

const HEADER: &str = "id,sub_administrative_area_id,season_year,species,age_group,sex,\
date_harvested,result,geolocation_precision,latitude,longitude";

struct Sample<'a> {
    species: &'a str,
    result: &'a str,
    area: &'a str,
    lat: &'a str,
    long: &'a str,
    precision: &'a str,
    date: &'a str,
}

fn elk(
    result: &'static str,
    area: &'static str,
    lat: &'static str,
    long: &'static str,
    date: &'static str,
) -> Sample<'static> {
    Sample {
        species: "elk",
        result,
        area,
        lat,
        long,
        precision: "Exact",
        date,
    }
}

fn scenario_rows() -> Vec<Sample<'static>> {
    vec![
        elk("Detected", "A1", "44.1", "-73.0", "2020-11-03"),
        elk("Not Detected", "A2", "44.2", "-73.1", "2020-11-10"),
    ]
}

fn setup(rows: &[Sample], species: &str, scan_type: &str) -> (TempDir, PipelineConfig) {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig::with_data_dir(dir.path());

    fs::write(
        config.params_path(),
        format!("species,scan_type\n\"{species}\",\"{scan_type}\"\n"),
    )
    .unwrap();

    let mut body = format!("{HEADER}\n");
    for (i, r) in rows.iter().enumerate() {
        body.push_str(&format!(
            "{},{},2020-2021,{},,,{},{},{},{},{}\n",
            i + 1,
            r.area,
            r.species,
            r.date,
            r.result,
            r.precision,
            r.lat,
            r.long
        ));
    }
    fs::write(config.sample_path(), body).unwrap();

    let log_path = config.run_log_path();
    fs::create_dir_all(log_path.parent().unwrap()).unwrap();
    fs::write(&log_path, "<h3>Model Execution Summary</h3>\n").unwrap();
    fs::write(config.attachments_path(), "[]").unwrap();

    (dir, config)
}

fn output_files(dir: &Path) -> Vec<&'static str> {
    files::ALL
        .iter()
        .copied()
        .filter(|name| dir.join(name).exists())
        .collect()
}

fn run_log(config: &PipelineConfig) -> String {
    fs::read_to_string(config.run_log_path()).unwrap()
}

#[test]
fn temporal_scenario_writes_day_precision_files() {
    let (dir, config) = setup(&scenario_rows(), "elk", "Discrete Bernoulli Temporal");

    let summary = pipeline::run(&config).unwrap();
    assert_eq!(summary.cases, 1);
    assert_eq!(summary.controls, 1);
    assert_eq!(output_files(dir.path()).len(), 5);

    let data = fs::read_to_string(dir.path().join(files::ALL_DATA)).unwrap();
    let lines: Vec<&str> = data.lines().collect();
    assert_eq!(
        lines[0],
        "Location,Season-Year,Harvest Date,Longitude,Latitude,Result"
    );
    assert_eq!(lines.len(), 3);
    assert!(lines[1].ends_with(",1"));
    assert!(lines[2].ends_with(",0"));
    assert!(!data.contains("Detected"));

    let inputs = fs::read_to_string(dir.path().join(files::USER_INPUTS)).unwrap();
    assert_eq!(
        inputs.lines().nth(1).unwrap(),
        "Day,2020-11-03,2020-11-10,Lat/Long,Discrete Bernoulli Temporal"
    );

    let manifest = fs::read_to_string(config.attachments_path()).unwrap();
    assert!(manifest.contains("Case_File.csv"));
    assert!(run_log(&config).contains("<p>Elk samples: 2</p>"));
}

#[test]
fn spatial_scenario_uses_season_years() {
    let (dir, config) = setup(&scenario_rows(), "elk", "Discrete Bernoulli Spatial Exact");

    pipeline::run(&config).unwrap();
    let inputs = fs::read_to_string(dir.path().join(files::USER_INPUTS)).unwrap();
    assert_eq!(
        inputs.lines().nth(1).unwrap(),
        "Year,2020,2020,Lat/Long,Discrete Bernoulli Spatial Exact"
    );
}

#[test]
fn missing_precision_blocks_both_scan_types() {
    for scan_type in ["Discrete Bernoulli Temporal", "Discrete Bernoulli Spatial Exact"] {
        let rows: Vec<Sample> = scenario_rows()
            .into_iter()
            .map(|r| Sample { precision: "", ..r })
            .collect();
        let (dir, config) = setup(&rows, "elk", scan_type);

        let err = pipeline::run(&config).unwrap_err();
        assert_eq!(err.exit_code(), 70);
        assert!(matches!(
            err,
            ExportError::Insufficient(Insufficiency::MissingLocations)
        ));
        assert!(output_files(dir.path()).is_empty());

        let log = run_log(&config);
        assert!(log.contains("<h4>ERROR</h4>"));
        assert!(log.contains("exact geolocation precision"));
    }
}

#[test]
fn species_mismatch_exits_before_normalizing() {
    let (dir, config) = setup(&scenario_rows(), "moose", "Discrete Bernoulli Temporal");

    let err = pipeline::run(&config).unwrap_err();
    assert_eq!(err.exit_code(), 70);
    assert!(output_files(dir.path()).is_empty());

    let log = run_log(&config);
    assert!(log.contains("There are no Moose samples"));
    assert!(!log.contains("samples are eligible"));
}

#[test]
fn positives_only_write_nothing() {
    let rows = vec![
        elk("Detected", "A1", "44.1", "-73.0", "2020-11-03"),
        elk("Detected", "A2", "44.2", "-73.1", "2020-11-04"),
        elk("Detected", "A3", "44.3", "-73.2", "2020-11-05"),
    ];
    let (dir, config) = setup(&rows, "elk", "Discrete Bernoulli Temporal");

    let err = pipeline::run(&config).unwrap_err();
    assert_eq!(err.exit_code(), 70);
    assert!(output_files(dir.path()).is_empty());
}

#[test]
fn control_without_date_leaves_no_controls() {
    // Passes the species-level balance check but loses its only control at
    // the harvest-date filter.
    let rows = vec![
        elk("Detected", "A1", "44.1", "-73.0", "2020-11-03"),
        elk("Not Detected", "A2", "44.2", "-73.1", ""),
    ];
    let (dir, config) = setup(&rows, "elk", "Discrete Bernoulli Temporal");

    let err = pipeline::run(&config).unwrap_err();
    assert!(matches!(
        err,
        ExportError::Insufficient(Insufficiency::NoControls)
    ));
    assert!(output_files(dir.path()).is_empty());
    assert!(run_log(&config).contains("negative"));
}

#[test]
fn empty_validation_stage_exits_70() {
    let rows = vec![elk("Pending", "A1", "44.1", "-73.0", "2020-11-03")];
    let (dir, config) = setup(&rows, "elk", "Discrete Bernoulli Temporal");

    let err = pipeline::run(&config).unwrap_err();
    assert!(matches!(
        err,
        ExportError::Insufficient(Insufficiency::UnusableResult)
    ));
    assert!(output_files(dir.path()).is_empty());
}

#[test]
fn unknown_species_is_configuration_error() {
    let (dir, config) = setup(&scenario_rows(), "bison", "Discrete Bernoulli Temporal");

    let err = pipeline::run(&config).unwrap_err();
    assert!(matches!(err, ExportError::UnknownSpecies(_)));
    assert_eq!(err.exit_code(), 78);
    assert!(output_files(dir.path()).is_empty());
    assert!(run_log(&config).contains("not recognized"));
}

#[test]
fn unknown_species_is_escaped_in_run_log() {
    let (_dir, config) = setup(&scenario_rows(), "<b>bison</b>", "Discrete Bernoulli Temporal");

    pipeline::run(&config).unwrap_err();
    let log = run_log(&config);
    assert!(log.contains("'&lt;b&gt;bison&lt;/b&gt;'"));
    assert!(!log.contains("<b>bison"));
}

#[test]
fn failed_run_removes_previous_outputs() {
    let (dir, config) = setup(&scenario_rows(), "elk", "Discrete Bernoulli Temporal");
    pipeline::run(&config).unwrap();
    assert_eq!(output_files(dir.path()).len(), 5);

    fs::write(
        config.params_path(),
        "species,scan_type\nmoose,Discrete Bernoulli Temporal\n",
    )
    .unwrap();
    let err = pipeline::run(&config).unwrap_err();
    assert_eq!(err.exit_code(), 70);
    assert!(output_files(dir.path()).is_empty());
}

#[test]
fn unknown_scan_type_is_configuration_error() {
    let (_dir, config) = setup(&scenario_rows(), "elk", "Space-Time Permutation");

    let err = pipeline::run(&config).unwrap_err();
    assert!(matches!(err, ExportError::UnknownScanType(_)));
    assert_eq!(err.exit_code(), 78);
}

#[test]
fn missing_run_log_is_infrastructure_error() {
    let (_dir, config) = setup(&scenario_rows(), "elk", "Discrete Bernoulli Temporal");
    fs::remove_file(config.run_log_path()).unwrap();

    let err = pipeline::run(&config).unwrap_err();
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn all_species_includes_unlabelled_rows() {
    let mut rows = scenario_rows();
    rows[1].species = "";
    let (_dir, config) = setup(&rows, "All species", "Discrete Bernoulli Temporal");

    let summary = pipeline::run(&config).unwrap();
    assert_eq!(summary.species_label, "All species");
    assert_eq!((summary.cases, summary.controls), (1, 1));
}
