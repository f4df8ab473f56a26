//! fieldeval - multi-document evaluation aggregation for document extraction.
//!
//! Per-document confusion matrices (true/false positive/negative counts per
//! extraction field) are summed across a corpus and turned into
//! micro-averaged precision, recall, F1 and accuracy, overall and for every
//! flattened field path.
//!
//! ```
//! use fieldeval::analysis::Aggregator;
//! use serde_json::json;
//!
//! let mut agg = Aggregator::new();
//! agg.update(Some(&json!({"overall": {"tp": 1}, "fields": {"total": {"tp": 1}}})), Some("doc-1"));
//! let report = agg.compute();
//! assert_eq!(report.document_count, 1);
//! assert_eq!(report.fields["total"].f1, 1.0);
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod models;
pub mod report;
pub mod scanner;

pub use analysis::Aggregator;
pub use models::{Counts, Diagnostic, EvaluationReport, MetricSet};
