//! Data models for the evaluation aggregator.
//!
//! This module contains the count records, derived metric sets, diagnostics
//! and the final report shape shared by the core and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::AddAssign;

/// The six count keys recognized on input, in canonical order.
///
/// These names are fixed by the upstream comparison engine and must not be
/// renamed at the boundary.
pub const COUNT_KEYS: [&str; 6] = ["tp", "fp", "fn", "tn", "fd", "fa"];

/// Raw confusion counts for one field (or one document).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Counts {
    /// True positives.
    #[serde(default)]
    pub tp: u64,
    /// False positives.
    #[serde(default)]
    pub fp: u64,
    /// False negatives.
    #[serde(default, rename = "fn")]
    pub fn_: u64,
    /// True negatives.
    #[serde(default)]
    pub tn: u64,
    /// Provider-specific counter, carried through opaquely.
    #[serde(default)]
    pub fd: u64,
    /// Provider-specific counter, carried through opaquely.
    #[serde(default)]
    pub fa: u64,
}

impl Counts {
    /// Creates a record from the four ratio-relevant counts.
    pub fn new(tp: u64, fp: u64, fn_: u64, tn: u64) -> Self {
        Self {
            tp,
            fp,
            fn_,
            tn,
            ..Self::default()
        }
    }

    /// Returns a mutable slot for a recognized count key.
    pub fn slot_mut(&mut self, key: &str) -> Option<&mut u64> {
        match key {
            "tp" => Some(&mut self.tp),
            "fp" => Some(&mut self.fp),
            "fn" => Some(&mut self.fn_),
            "tn" => Some(&mut self.tn),
            "fd" => Some(&mut self.fd),
            "fa" => Some(&mut self.fa),
            _ => None,
        }
    }

    /// Returns true if every counter is zero.
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, rhs: Self) {
        self.tp = self.tp.saturating_add(rhs.tp);
        self.fp = self.fp.saturating_add(rhs.fp);
        self.fn_ = self.fn_.saturating_add(rhs.fn_);
        self.tn = self.tn.saturating_add(rhs.tn);
        self.fd = self.fd.saturating_add(rhs.fd);
        self.fa = self.fa.saturating_add(rhs.fa);
    }
}

impl AddAssign<&Counts> for Counts {
    fn add_assign(&mut self, rhs: &Counts) {
        *self += *rhs;
    }
}

/// Counts plus the four ratios derived from them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    #[serde(flatten)]
    pub counts: Counts,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub accuracy: f64,
}

/// A single diagnostic recorded while absorbing malformed input.
///
/// Ordering is by `(doc_id, path, message)`, which is how reports list them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Correlation token of the document that produced the entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    /// Flattened field path the entry refers to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl Diagnostic {
    pub fn new(doc_id: Option<&str>, path: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.map(str::to_string),
            path: path.map(str::to_string),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(doc_id) = &self.doc_id {
            write!(f, "[{}] ", doc_id)?;
        }
        if let Some(path) = &self.path {
            write!(f, "{}: ", path)?;
        }
        write!(f, "{}", self.message)
    }
}

/// Corpus-wide evaluation result.
///
/// The key names are a serialization contract for downstream consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Number of documents that contributed.
    pub document_count: u64,
    /// Derived metrics over the summed document-level counts.
    pub overall: MetricSet,
    /// Derived metrics per flattened field path, sorted by path.
    pub fields: BTreeMap<String, MetricSet>,
    /// Diagnostics accumulated while absorbing malformed input, sorted.
    pub errors: Vec<Diagnostic>,
}

impl EvaluationReport {
    /// Get the `n` fields with the lowest F1 (ties broken by path).
    pub fn worst_fields(&self, n: usize) -> Vec<(&str, &MetricSet)> {
        let mut ranked: Vec<(&str, &MetricSet)> = self
            .fields
            .iter()
            .map(|(path, metrics)| (path.as_str(), metrics))
            .collect();

        ranked.sort_by(|a, b| {
            a.1.f1
                .partial_cmp(&b.1.f1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        ranked.truncate(n);

        ranked
    }

    /// Paths whose F1 falls strictly below `threshold`.
    pub fn fields_below(&self, threshold: f64) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, metrics)| metrics.f1 < threshold)
            .map(|(path, _)| path.as_str())
            .collect()
    }
}

/// Metadata about a CLI evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Directory the per-document results were read from.
    pub input_dir: String,
    /// Date and time of the run.
    pub generated_at: DateTime<Utc>,
    /// Number of result files discovered.
    pub files_scanned: usize,
    /// Number of result files that could not be read or parsed.
    pub files_failed: usize,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// A report as written by the CLI: metadata plus the aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub metadata: ReportMetadata,
    #[serde(flatten)]
    pub evaluation: EvaluationReport,
}
