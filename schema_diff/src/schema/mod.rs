//! Schema module for schema_diff
//!
//! This module handles parsing schema dumps, comparing them, and generating
//! migration scripts.

pub mod diff;
pub mod extractor;
pub mod generator;
pub mod segmenter;
pub mod types;

// Re-export key types
pub use diff::{
    generate_column_alters, generate_constraint_alters, generate_index_alters,
    generate_view_alters, AlterStatement, ChangeAction, DiffSummary, SchemaDiff, TableChange,
    ViewChange, ViewChangeKind,
};
pub use extractor::{
    parse_schema, parse_schema_with_report, ParseReport, SkipReason, SkippedStatement,
};
pub use generator::ScriptGenerator;
pub use segmenter::segment;
pub use types::{Column, Constraint, ConstraintKind, Index, Schema, Table, View, ViewKind};
