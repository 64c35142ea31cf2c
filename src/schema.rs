/// Column-name constants for scan-export tables.
/// Single source of truth for input, intermediate and output schemas.

// ── Sample columns ──────────────────────────────────────────────────────────
pub mod sample {
    pub const ID: &str = "id";
    pub const SUB_ADMIN_AREA_ID: &str = "sub_administrative_area_id";
    pub const SEASON_YEAR: &str = "season_year";
    pub const SPECIES: &str = "species";
    pub const AGE_GROUP: &str = "age_group";
    pub const SEX: &str = "sex";
    pub const DATE_HARVESTED: &str = "date_harvested";
    pub const RESULT: &str = "result";
    pub const GEOLOCATION_PRECISION: &str = "geolocation_precision";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";

    /// Columns a sample table must carry, in the order ingestion writes them.
    pub const ALL: [&str; 11] = [
        ID,
        SUB_ADMIN_AREA_ID,
        SEASON_YEAR,
        SPECIES,
        AGE_GROUP,
        SEX,
        DATE_HARVESTED,
        RESULT,
        GEOLOCATION_PRECISION,
        LATITUDE,
        LONGITUDE,
    ];
}

// ── Parameter columns ───────────────────────────────────────────────────────
pub mod params {
    pub const SPECIES: &str = "species";
    pub const SCAN_TYPE: &str = "scan_type";
}

// ── Categorical values ──────────────────────────────────────────────────────
pub mod values {
    pub const DETECTED: &str = "Detected";
    pub const NOT_DETECTED: &str = "Not Detected";
    pub const EXACT: &str = "Exact";
    pub const NO_AGE: &str = "No age";
    pub const UNKNOWN: &str = "Unknown";
    /// Species sentinel, matched case-insensitively.
    pub const ALL_SPECIES: &str = "all species";
}

// ── Scan projection (All_SaTScan_Data.csv) ──────────────────────────────────
pub mod projection {
    pub const LOCATION: &str = "Location";
    pub const SEASON_YEAR: &str = "Season-Year";
    pub const HARVEST_DATE: &str = "Harvest Date";
    pub const LONGITUDE: &str = "Longitude";
    pub const LATITUDE: &str = "Latitude";
    pub const RESULT: &str = "Result";
}

// ── Case / control / coordinates files ──────────────────────────────────────
pub mod scan_files {
    pub const IDENTIFIER: &str = "Identifier";
    pub const NUMBER_OF_CASES: &str = "Number of Cases";
    pub const NUMBER_OF_CONTROLS: &str = "Number of Controls";
    pub const YEAR: &str = "Year";
    pub const DATE: &str = "Date";
    pub const LATITUDE: &str = "Latitude";
    pub const LONGITUDE: &str = "Longitude";
}

// ── Parameters echo (SaTScan_user_inputs.csv) ───────────────────────────────
pub mod user_inputs {
    pub const TIME_PRECISION: &str = "Time_Precision";
    pub const STUDY_PERIOD_START: &str = "Study_Period_Start";
    pub const STUDY_PERIOD_END: &str = "Study_Period_End";
    pub const COORDINATES: &str = "Coordinates";
    pub const SCAN_STATISTIC: &str = "Scan_Statistic";

    pub const LAT_LONG: &str = "Lat/Long";
}

// ── Output file names ───────────────────────────────────────────────────────
pub mod files {
    pub const ALL_DATA: &str = "All_SaTScan_Data.csv";
    pub const CASES: &str = "Case_File.csv";
    pub const CONTROLS: &str = "Control_File.csv";
    pub const COORDINATES: &str = "Coordinates_File.csv";
    pub const USER_INPUTS: &str = "SaTScan_user_inputs.csv";

    pub const ALL: [&str; 5] = [ALL_DATA, CASES, CONTROLS, COORDINATES, USER_INPUTS];
}
