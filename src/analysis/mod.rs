//! Evaluation analysis modules.
//!
//! Leaves first: ratio derivation, the typed tree, path resolution, and the
//! stateful aggregator that ties them together.

pub mod aggregator;
pub mod metrics;
pub mod resolver;
pub mod tree;

pub use aggregator::{aggregate_documents, Aggregator};
pub use metrics::derive;
pub use resolver::{join_path, resolve};
pub use tree::{ConfusionMatrix, FieldMap, FieldNode, NodeError, NodeIssue};
