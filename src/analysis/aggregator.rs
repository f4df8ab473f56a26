//! Corpus-wide aggregation of per-document confusion matrices.
//!
//! An [`Aggregator`] sums raw counts across documents and only derives
//! ratios when [`Aggregator::compute`] is called, so results do not depend
//! on the order documents were submitted in.
//!
//! The aggregator assumes a single writer. Callers feeding it from
//! concurrent retrieval must serialize `update` calls themselves.

use crate::analysis::metrics::derive;
use crate::analysis::resolver::resolve;
use crate::analysis::tree::{ConfusionMatrix, NodeIssue};
use crate::models::{Counts, Diagnostic, EvaluationReport};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Running totals for one evaluation run.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    overall_counts: Counts,
    field_counts: BTreeMap<String, Counts>,
    document_count: u64,
    errors: Vec<Diagnostic>,
}

impl Aggregator {
    /// Creates an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all totals, the document count and diagnostics.
    pub fn reset(&mut self) {
        self.overall_counts = Counts::default();
        self.field_counts.clear();
        self.document_count = 0;
        self.errors.clear();
    }

    /// Number of documents that have contributed so far.
    pub fn document_count(&self) -> u64 {
        self.document_count
    }

    /// Adds one document's confusion matrix.
    ///
    /// `None`, `null` and `{}` are no-ops. A value that is not an object is
    /// recorded as a diagnostic and otherwise ignored. Malformed sub-trees
    /// are skipped without affecting the rest of the document.
    pub fn update(&mut self, confusion_matrix: Option<&Value>, doc_id: Option<&str>) {
        let value = match confusion_matrix {
            None | Some(Value::Null) => {
                debug!("No evaluation data for document {:?}", doc_id);
                return;
            }
            Some(Value::Object(map)) if map.is_empty() => {
                debug!("Empty confusion matrix for document {:?}", doc_id);
                return;
            }
            Some(value) => value,
        };

        match ConfusionMatrix::parse(value) {
            Ok((matrix, issues)) => {
                for issue in issues {
                    self.record_issue(doc_id, issue);
                }
                self.update_matrix(&matrix, doc_id);
            }
            Err(e) => self.record_error(Diagnostic::new(
                doc_id,
                None,
                format!("confusion matrix skipped: {}", e),
            )),
        }
    }

    /// Adds an already-parsed confusion matrix as one document.
    pub fn update_matrix(&mut self, matrix: &ConfusionMatrix, doc_id: Option<&str>) {
        self.document_count += 1;

        if let Some(overall) = &matrix.overall {
            self.overall_counts += overall;
        }

        let resolved = resolve(&matrix.fields, None);
        debug!(
            "Document {:?}: {} field entries",
            doc_id.unwrap_or("<unnamed>"),
            resolved.len()
        );

        for (path, counts) in resolved {
            *self.field_counts.entry(path).or_default() += counts;
        }
    }

    /// Folds another aggregator's state into this one.
    pub fn merge(&mut self, other: &Aggregator) {
        self.overall_counts += other.overall_counts;
        for (path, counts) in &other.field_counts {
            *self.field_counts.entry(path.clone()).or_default() += counts;
        }
        self.document_count += other.document_count;
        self.errors.extend(other.errors.iter().cloned());
    }

    /// Derives the report from the current totals without modifying them.
    ///
    /// Diagnostics are sorted so the report does not depend on update order.
    pub fn compute(&self) -> EvaluationReport {
        let mut errors = self.errors.clone();
        errors.sort();

        EvaluationReport {
            document_count: self.document_count,
            overall: derive(&self.overall_counts),
            fields: self
                .field_counts
                .iter()
                .map(|(path, counts)| (path.clone(), derive(counts)))
                .collect(),
            errors,
        }
    }

    fn record_issue(&mut self, doc_id: Option<&str>, issue: NodeIssue) {
        self.record_error(Diagnostic::new(
            doc_id,
            issue.path.as_deref(),
            issue.error.to_string(),
        ));
    }

    /// Appends a diagnostic to the report's error list.
    ///
    /// Used for problems found outside the tree itself, such as a result
    /// file that could not be read.
    pub fn record_error(&mut self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
        self.errors.push(diagnostic);
    }
}

/// Aggregates a batch of `(doc_id, matrix)` pairs in one pass.
pub fn aggregate_documents<'a, I>(documents: I) -> EvaluationReport
where
    I: IntoIterator<Item = (Option<&'a str>, &'a Value)>,
{
    let mut aggregator = Aggregator::new();
    for (doc_id, matrix) in documents {
        aggregator.update(Some(matrix), doc_id);
    }
    aggregator.compute()
}
