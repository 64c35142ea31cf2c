//! Surveillance sample export for spatial cluster detection.
//!
//! Validates disease test samples, selects a species, decides which scan
//! types the data can support and writes the case, control, coordinate and
//! settings files the scan engine reads. Every data-quality decision that
//! ends a run is explained in an HTML run log.
//!
//! # Example
//!
//! ```no_run
//! use scan_export::{pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::with_data_dir("/data");
//! match pipeline::run(&config) {
//!     Ok(summary) => println!("{} cases, {} controls", summary.cases, summary.controls),
//!     Err(e) => std::process::exit(e.exit_code()),
//! }
//! ```

pub mod attachments;
pub mod cli;
pub mod config;
pub mod eligibility;
pub mod emitter;
pub mod error;
pub mod ingest;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod router;
pub mod run_log;
pub mod schema;
pub mod species;
pub mod validation;

pub use config::{PipelineConfig, SpeciesRegistry};
pub use error::{ExportError, Insufficiency};
pub use model::{Parameters, ScanType};
