//! Append-only, human-readable run log.
//!
//! Every line is wrapped in an HTML element (`<p>`, `<h3>`, `<h4>`, ...) so the
//! hosting platform can render the log as the run's feedback page. Stages
//! receive the sink as `&mut dyn RunLog`; tests use [`MemoryRunLog`].

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use html_escape::encode_text;

use crate::error::ExportError;

pub trait RunLog {
    /// Append one line wrapped in `<element>...</element>`. `line` is written
    /// as is and may carry markup.
    fn append(&mut self, element: &str, line: &str) -> Result<(), ExportError>;

    /// Append plain text as a paragraph; `<`, `>` and `&` are escaped.
    fn paragraph(&mut self, text: &str) -> Result<(), ExportError> {
        self.append("p", &encode_text(text))
    }

    fn heading(&mut self, text: &str) -> Result<(), ExportError> {
        self.append("h4", &encode_text(text))
    }
}

/// Run log backed by the `info.html` attachment.
pub struct HtmlRunLog {
    file: File,
}

impl HtmlRunLog {
    /// Create (or truncate) the log target. Used by ingestion, which owns the
    /// start of the log.
    pub fn create(path: &Path) -> Result<Self, ExportError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Self { file })
    }

    /// Open an existing, non-empty log for appending.
    ///
    /// A missing or empty target means ingestion never ran, which is an
    /// infrastructure failure rather than a data problem.
    pub fn open_existing(path: &Path) -> Result<Self, ExportError> {
        let metadata = std::fs::metadata(path).map_err(|_| {
            ExportError::Infrastructure(format!("run log '{}' does not exist", path.display()))
        })?;
        if metadata.len() == 0 {
            return Err(ExportError::Infrastructure(format!(
                "run log '{}' is empty",
                path.display()
            )));
        }
        let file = OpenOptions::new().append(true).open(path)?;
        Ok(Self { file })
    }
}

impl RunLog for HtmlRunLog {
    fn append(&mut self, element: &str, line: &str) -> Result<(), ExportError> {
        writeln!(self.file, "<{element}>{line}</{element}>")?;
        Ok(())
    }
}

/// Open the developer execution log, creating it and its directory.
///
/// `truncate` starts a fresh log; otherwise lines are appended to what an
/// earlier step wrote.
pub fn open_execution_log(path: &Path, truncate: bool) -> Result<File, ExportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut options = OpenOptions::new();
    options.create(true);
    if truncate {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }
    Ok(options.open(path)?)
}

/// In-memory run log for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryRunLog {
    pub lines: Vec<String>,
}

impl MemoryRunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }
}

impl RunLog for MemoryRunLog {
    fn append(&mut self, element: &str, line: &str) -> Result<(), ExportError> {
        self.lines.push(format!("<{element}>{line}</{element}>"));
        Ok(())
    }
}
