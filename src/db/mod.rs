//! Entity graph construction and the data-access seam it loads through.

pub mod graph;
pub mod source;

pub use graph::{EntityGraph, GraphIssue};
pub use source::{Catalog, EntityKind, EntityRecord, GraphSource, RecordPredicate};
