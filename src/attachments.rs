//! The `attachments.json` manifest: a JSON list of files the hosting
//! platform should surface after a run.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ExportError;

pub const CONTENT_CSV: &str = "text/csv";
pub const CONTENT_HTML: &str = "text/html";
pub const CONTENT_TEXT: &str = "text/plain";

pub const ROLE_DOWNLOADABLE: &str = "downloadable";
pub const ROLE_FEEDBACK: &str = "feedback";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub role: String,
}

impl Attachment {
    pub fn new(filename: &str, content_type: &str, role: &str) -> Self {
        Self {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            role: role.to_string(),
        }
    }
}

/// Replace the manifest with an empty list.
pub fn reset(path: &Path) -> Result<(), ExportError> {
    write(path, &[])
}

/// Append one entry to the manifest.
pub fn add(path: &Path, attachment: Attachment) -> Result<(), ExportError> {
    let content = std::fs::read_to_string(path)?;
    let mut entries: Vec<Attachment> = serde_json::from_str(&content)?;
    entries.push(attachment);
    write(path, &entries)
}

fn write(path: &Path, entries: &[Attachment]) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(entries)?;
    std::fs::write(path, json)?;
    Ok(())
}
