//! Type definitions for parsed schema objects
//!
//! Everything except identity names is kept as verbatim source text so that
//! statements the diff does not touch survive unchanged.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The parsed representation of one schema dump
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub tables: IndexMap<String, Table>,
    pub views: IndexMap<String, View>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table to the schema, replacing any table with the same name
    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    /// Get a table, creating an empty shell if it was not seen yet
    pub fn table_entry(&mut self, name: &str) -> &mut Table {
        self.tables
            .entry(name.to_string())
            .or_insert_with(|| Table::new(name))
    }

    /// Get a view, creating a stub without a definition if it was not seen yet
    pub fn view_entry(&mut self, name: &str) -> &mut View {
        self.views
            .entry(name.to_string())
            .or_insert_with(|| View::new(name))
    }
}

/// Represents a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: IndexMap<String, Column>,
    pub indexes: IndexMap<String, Index>,
    pub constraints: IndexMap<String, Constraint>,
    /// Full CREATE TABLE statement; absent for tables only seen through ALTER TABLE
    pub original_sql: Option<String>,
    pub alters: Vec<String>,
}

impl Table {
    /// Create a new table with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: IndexMap::new(),
            indexes: IndexMap::new(),
            constraints: IndexMap::new(),
            original_sql: None,
            alters: Vec::new(),
        }
    }

    /// Add a column to the table
    pub fn add_column(&mut self, column: Column) {
        self.columns.insert(column.name.clone(), column);
    }

    /// Add an index to the table
    pub fn add_index(&mut self, index: Index) {
        self.indexes.insert(index.name.clone(), index);
    }

    /// Add a constraint to the table
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.insert(constraint.name.clone(), constraint);
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }
}

/// Represents a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Column clause with the name canonically backtick-quoted
    pub definition: String,
    pub is_primary_key: bool,
}

impl Column {
    /// The definition without the leading column name
    pub fn type_definition(&self) -> &str {
        let quoted_name = format!("`{}`", self.name);
        self.definition
            .strip_prefix(quoted_name.as_str())
            .unwrap_or(&self.definition)
            .trim()
    }
}

/// Represents a KEY/INDEX clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub definition: String,
}

/// The kinds of constraint tracked separately from plain indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    #[serde(rename = "PRIMARY KEY")]
    PrimaryKey,
    #[serde(rename = "UNIQUE KEY")]
    UniqueKey,
    #[serde(rename = "FOREIGN KEY")]
    ForeignKey,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintKind::PrimaryKey => write!(f, "PRIMARY KEY"),
            ConstraintKind::UniqueKey => write!(f, "UNIQUE KEY"),
            ConstraintKind::ForeignKey => write!(f, "FOREIGN KEY"),
        }
    }
}

/// Represents a table constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// Declared name, or [`Constraint::PRIMARY`] for the primary key
    pub name: String,
    pub kind: ConstraintKind,
    /// Key columns; only populated for primary keys
    pub columns: Vec<String>,
    pub definition: String,
}

impl Constraint {
    /// Name under which a table's primary key is stored
    pub const PRIMARY: &'static str = "PRIMARY";

    /// Create a primary key constraint
    pub fn primary_key(columns: Vec<String>, definition: &str) -> Self {
        Self {
            name: Self::PRIMARY.to_string(),
            kind: ConstraintKind::PrimaryKey,
            columns,
            definition: definition.to_string(),
        }
    }

    /// Create a named UNIQUE KEY or FOREIGN KEY constraint
    pub fn named(name: &str, kind: ConstraintKind, definition: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            columns: Vec::new(),
            definition: definition.to_string(),
        }
    }
}

/// Object type recorded for views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewKind {
    #[default]
    #[serde(rename = "VIEW")]
    View,
}

/// Represents a view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    /// Verbatim CREATE VIEW statement; absent when only a DROP was seen
    pub definition: Option<String>,
    pub drop_statement: Option<String>,
    #[serde(rename = "type")]
    pub kind: ViewKind,
}

impl View {
    /// Create a view stub with neither definition nor drop statement
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            definition: None,
            drop_statement: None,
            kind: ViewKind::View,
        }
    }

    /// Definition with whitespace runs collapsed, empty when absent
    pub fn normalized_definition(&self) -> String {
        self.definition
            .as_deref()
            .map(crate::utils::identifiers::normalize_whitespace)
            .unwrap_or_default()
    }
}
