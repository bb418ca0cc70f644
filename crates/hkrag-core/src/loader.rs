//! Turns a directory of source files into `Document`s.
//!
//! PDFs yield one document per non-empty page, text and CSV files one document
//! each, and JSON facility arrays one synthetic document per record. A file
//! that cannot be read is recorded in `LoadReport::skipped` and loading
//! continues with the remaining files.
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::types::Document;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "csv", "json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
    Csv,
    Json,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Text),
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub files: usize,
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedFile>,
}

#[derive(Default)]
pub struct DocumentLoader;

impl DocumentLoader {
    pub fn new() -> Self { Self }

    /// Supported files under `root`, recursively, in sorted order.
    pub fn discover_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| FileKind::from_path(p).is_some())
            .collect();
        files.sort();
        files
    }

    pub fn load_directory(&self, root: &Path) -> LoadReport {
        let files = self.discover_files(root);
        let mut report = LoadReport { files: files.len(), ..LoadReport::default() };
        for (file_index, path) in files.iter().enumerate() {
            debug!("Loading file {}/{}: {}", file_index + 1, files.len(), path.display());
            match self.load_file(path, root) {
                Ok(docs) => report.documents.extend(docs),
                Err(e) => {
                    warn!("Skipping {}: {:#}", path.display(), e);
                    report.skipped.push(SkippedFile { path: path.clone(), reason: format!("{e:#}") });
                }
            }
        }
        info!(
            "Loaded {} documents from {} files ({} skipped)",
            report.documents.len(),
            report.files,
            report.skipped.len()
        );
        report
    }

    pub fn load_file(&self, path: &Path, root: &Path) -> Result<Vec<Document>> {
        let kind = FileKind::from_path(path)
            .ok_or_else(|| Error::Load { path: path.display().to_string(), message: "unsupported file type".into() })?;
        let source_id = source_id_for(path);
        match kind {
            FileKind::Pdf => self.load_pdf(path, &source_id, &doc_type_from_path(path, root)),
            FileKind::Text => Ok(vec![Document::new(read_utf8(path)?, source_id, doc_type_from_path(path, root))]),
            FileKind::Csv => Ok(vec![Document::new(read_utf8(path)?, source_id, "statistics")]),
            FileKind::Json => self.load_facilities(path, &source_id),
        }
    }

    fn load_pdf(&self, path: &Path, source_id: &str, doc_type: &str) -> Result<Vec<Document>> {
        let pdf = lopdf::Document::load(path).with_context(|| format!("failed to parse PDF {}", path.display()))?;
        let mut docs = Vec::new();
        for page_number in pdf.get_pages().keys() {
            let text = pdf
                .extract_text(&[*page_number])
                .with_context(|| format!("failed to extract page {} of {}", page_number, path.display()))?;
            if text.trim().is_empty() {
                continue;
            }
            docs.push(Document::new(text, source_id, doc_type));
        }
        Ok(docs)
    }

    fn load_facilities(&self, path: &Path, source_id: &str) -> Result<Vec<Document>> {
        let raw = read_utf8(path)?;
        let value: Value = serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))?;
        let records = value.as_array().ok_or_else(|| Error::Load {
            path: path.display().to_string(),
            message: "expected a JSON array of facility records".into(),
        })?;
        Ok(records
            .iter()
            .enumerate()
            .map(|(i, record)| Document::new(facility_text(record), format!("{source_id}#{i}"), "facility"))
            .collect())
    }
}

/// Flatten a facility record into the text block that gets embedded.
pub fn facility_text(record: &Value) -> String {
    format!(
        "Facility: {}\nType: {}\nDistrict: {}\nAddress: {}",
        facility_field(record, "name"),
        facility_field(record, "type"),
        facility_field(record, "district"),
        facility_field(record, "address"),
    )
}

fn facility_field(record: &Value, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        None | Some(Value::Null) => "Unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

fn read_utf8(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    String::from_utf8(bytes).map_err(|e| {
        anyhow::Error::from(Error::Load { path: path.display().to_string(), message: format!("not valid UTF-8: {e}") })
    })
}

fn source_id_for(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| path.display().to_string())
}

/// Nested files take their parent folder as the tag; top-level files are `document`.
fn doc_type_from_path(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    match relative.parent().and_then(|p| p.to_str()) {
        Some(parent) if !parent.is_empty() => parent.replace('\\', "/"),
        _ => "document".to_string(),
    }
}
