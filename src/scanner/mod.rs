//! Result-file scanner and loader.
//!
//! This module discovers per-document result files under an input
//! directory and reads them concurrently. Loading is the only I/O in the
//! pipeline; accumulation stays with a single consumer.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Configuration for file scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to include (e.g., ["json"])
    pub extensions: Vec<String>,
    /// Directory or file names to exclude
    pub excludes: Vec<String>,
    /// Maximum file size in bytes
    pub max_file_size: usize,
    /// Maximum number of files to scan
    pub max_files: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["json".to_string()],
            excludes: Vec::new(),
            max_file_size: 16 * 1024 * 1024,
            max_files: None,
        }
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            excludes: config.excludes.clone(),
            max_file_size: config.max_file_size,
            max_files: Some(config.max_files),
        }
    }
}

/// A discovered result file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Full path on disk
    pub path: PathBuf,
    /// Path relative to the input directory, used as the default document id
    pub doc_id: String,
    /// File size in bytes
    pub size: u64,
}

/// One document's evaluation data after loading.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub doc_id: String,
    /// `None` when the result file carries no evaluation data.
    pub confusion_matrix: Option<Value>,
}

/// Scanner for per-document result files.
pub struct ResultScanner {
    root: PathBuf,
    config: ScanConfig,
}

impl ResultScanner {
    /// Create a new scanner rooted at `root`.
    pub fn new(root: PathBuf, config: ScanConfig) -> Self {
        Self { root, config }
    }

    /// Discover result files, sorted by document id.
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        if !self.root.is_dir() {
            anyhow::bail!("Input path is not a directory: {}", self.root.display());
        }

        let mut files = Vec::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded(e));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("Cannot read entry under {}: {}", self.root.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.matches(entry.path()) {
                continue;
            }

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    debug!("Cannot stat {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            if size > self.config.max_file_size as u64 {
                warn!(
                    "Skipping {} ({} bytes exceeds limit)",
                    entry.path().display(),
                    size
                );
                continue;
            }

            let rel_path = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path());

            files.push(ScannedFile {
                path: entry.path().to_path_buf(),
                doc_id: rel_path.to_string_lossy().replace('\\', "/"),
                size,
            });

            if let Some(max) = self.config.max_files {
                if files.len() >= max {
                    warn!("Reached max_files limit ({}), stopping scan", max);
                    break;
                }
            }
        }

        files.sort_by(|a, b| a.doc_id.cmp(&b.doc_id));
        Ok(files)
    }

    /// Check if a file has an accepted extension.
    pub fn matches(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.config
            .extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }

    /// Check if an entry matches exclusion patterns.
    fn is_excluded(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();

        // Hidden files
        if name.starts_with('.') {
            return true;
        }

        self.config.excludes.iter().any(|pattern| name == pattern.as_str())
    }
}

/// Split a parsed result file into its document id and confusion matrix.
///
/// A result file is either a bare confusion matrix or a wrapper object with
/// a `confusion_matrix` key and an optional `document_id`.
pub fn split_result(value: Value, fallback_id: &str) -> LoadedDocument {
    match value {
        Value::Object(mut map) if map.contains_key("confusion_matrix") => {
            let doc_id = map
                .get("document_id")
                .and_then(Value::as_str)
                .unwrap_or(fallback_id)
                .to_string();
            let confusion_matrix = map
                .remove("confusion_matrix")
                .filter(|matrix| !matrix.is_null());

            LoadedDocument {
                doc_id,
                confusion_matrix,
            }
        }
        other => LoadedDocument {
            doc_id: fallback_id.to_string(),
            confusion_matrix: Some(other),
        },
    }
}

/// Read and parse one result file.
pub async fn load_document(file: &ScannedFile) -> Result<LoadedDocument> {
    let bytes = tokio::fs::read(&file.path)
        .await
        .with_context(|| format!("Failed to read result file: {}", file.path.display()))?;

    let value: Value = serde_json::from_slice(&bytes)
        .with_context(|| format!("Invalid JSON in result file: {}", file.path.display()))?;

    Ok(split_result(value, &file.doc_id))
}

/// Read many result files with bounded concurrency.
///
/// Results come back in the order of `files`, paired with the file they
/// came from.
pub async fn load_documents(
    files: &[ScannedFile],
    concurrency: usize,
    progress: Option<&ProgressBar>,
) -> Vec<(ScannedFile, Result<LoadedDocument>)> {
    let mut loaded: Vec<(usize, Result<LoadedDocument>)> =
        stream::iter(files.iter().enumerate())
            .map(|(index, file)| async move { (index, load_document(file).await) })
            .buffer_unordered(concurrency.max(1))
            .inspect(|_| {
                if let Some(pb) = progress {
                    pb.inc(1);
                }
            })
            .collect()
            .await;

    loaded.sort_by_key(|(index, _)| *index);

    loaded
        .into_iter()
        .map(|(index, result)| (files[index].clone(), result))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn populated_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.json", r#"{"overall": {"tp": 1}}"#);
        write(dir.path(), "a.json", r#"{"overall": {"tp": 2}}"#);
        write(dir.path(), "nested/c.json", r#"{"fields": {}}"#);
        write(dir.path(), "notes.txt", "not a result");
        write(dir.path(), ".hidden/d.json", "{}");
        write(dir.path(), "archive/e.json", "{}");
        dir
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = populated_dir();
        let config = ScanConfig {
            excludes: vec!["archive".to_string()],
            ..ScanConfig::default()
        };
        let scanner = ResultScanner::new(dir.path().to_path_buf(), config);

        let files = scanner.scan().unwrap();
        let ids: Vec<&str> = files.iter().map(|f| f.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["a.json", "b.json", "nested/c.json"]);
    }

    #[test]
    fn test_scan_respects_max_files() {
        let dir = populated_dir();
        let config = ScanConfig {
            max_files: Some(1),
            ..ScanConfig::default()
        };
        let files = ResultScanner::new(dir.path().to_path_buf(), config)
            .scan()
            .unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_scan_rejects_missing_dir() {
        let scanner = ResultScanner::new(PathBuf::from("/no/such/dir"), ScanConfig::default());
        assert!(scanner.scan().is_err());
    }

    #[test]
    fn test_split_result_bare_matrix() {
        let doc = split_result(json!({"overall": {"tp": 1}}), "a.json");
        assert_eq!(doc.doc_id, "a.json");
        assert_eq!(doc.confusion_matrix, Some(json!({"overall": {"tp": 1}})));
    }

    #[test]
    fn test_split_result_wrapper() {
        let doc = split_result(
            json!({
                "document_id": "invoice-17",
                "confusion_matrix": {"overall": {"tp": 3}},
                "model": "extractor-v2"
            }),
            "a.json",
        );
        assert_eq!(doc.doc_id, "invoice-17");
        assert_eq!(doc.confusion_matrix, Some(json!({"overall": {"tp": 3}})));
    }

    #[test]
    fn test_split_result_wrapper_without_data() {
        let doc = split_result(json!({"confusion_matrix": null}), "empty.json");
        assert_eq!(doc.doc_id, "empty.json");
        assert!(doc.confusion_matrix.is_none());
    }

    #[test]
    fn test_load_documents_preserves_order_and_errors() {
        let dir = populated_dir();
        write(dir.path(), "broken.json", "{ not json");

        let files = ResultScanner::new(dir.path().to_path_buf(), ScanConfig::default())
            .scan()
            .unwrap();

        let loaded = tokio_test::block_on(load_documents(&files, 3, None));
        let ids: Vec<&str> = loaded.iter().map(|(f, _)| f.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["a.json", "archive/e.json", "b.json", "broken.json", "nested/c.json"]);

        let broken = loaded
            .iter()
            .find(|(f, _)| f.doc_id == "broken.json")
            .unwrap();
        assert!(broken.1.is_err());

        let a = loaded[0].1.as_ref().unwrap();
        assert_eq!(a.confusion_matrix, Some(json!({"overall": {"tp": 2}})));
    }

    #[test]
    fn test_fixture_corpus_end_to_end() {
        use crate::analysis::Aggregator;
        use crate::models::Counts;

        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/results");
        let files = ResultScanner::new(root, ScanConfig::default()).scan().unwrap();
        assert_eq!(files.len(), 5);

        let mut agg = Aggregator::new();
        for (_, result) in tokio_test::block_on(load_documents(&files, 2, None)) {
            let doc = result.unwrap();
            agg.update(doc.confusion_matrix.as_ref(), Some(doc.doc_id.as_str()));
        }

        let report = agg.compute();
        assert_eq!(report.document_count, 3);
        assert_eq!(
            report.overall.counts,
            Counts {
                tn: 1,
                ..Counts::new(11, 1, 3, 0)
            }
        );
        assert_eq!(report.fields.len(), 9);
        assert_eq!(report.fields["vendor_name"].counts, Counts::new(2, 0, 1, 0));
        assert_eq!(report.fields["line_items"].counts, Counts::new(7, 1, 1, 0));
        assert_eq!(
            report.fields["line_items.amount"].counts,
            Counts::new(3, 1, 1, 0)
        );
        assert_eq!(report.fields["total"].precision, 0.0);
        assert_eq!(report.fields["total"].accuracy, 1.0);

        let error_docs: Vec<_> = report
            .errors
            .iter()
            .filter_map(|e| e.doc_id.as_deref())
            .collect();
        assert_eq!(error_docs, vec!["malformed.json", "partial.json"]);
        assert_eq!(report.errors[1].path.as_deref(), Some("line_items"));
    }
}
