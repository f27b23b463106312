//! Migration script generator
//!
//! Renders a [`SchemaDiff`] as a commented SQL script in five stages. Every
//! stage header is always written, with an explicit "nothing found" line when
//! the stage is empty, so scripts keep the same shape from run to run.

use crate::schema::diff::{DiffSummary, SchemaDiff, TableChange, ViewChange, ViewChangeKind};
use crate::schema::types::Table;
use crate::utils::identifiers::quote_identifier;

const DIVIDER: &str = "-- ========================================";

/// Migration script generator
#[derive(Debug, Default)]
pub struct ScriptGenerator {
    lines: Vec<String>,
}

impl ScriptGenerator {
    /// Create a new script generator
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the full script for a diff
    pub fn generate(mut self, diff: &SchemaDiff<'_>) -> String {
        self.write_header();
        self.write_new_tables(diff);
        self.write_droppable_tables(diff);
        self.write_table_changes(diff);
        self.write_view_changes(diff);
        self.write_summary(&diff.summary());
        self.lines.join("\n")
    }

    fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn blank(&mut self) {
        self.lines.push(String::new());
    }

    fn stage(&mut self, title: &str) {
        self.push(DIVIDER);
        self.push(format!("-- {}", title));
        self.push(DIVIDER);
        self.blank();
    }

    fn write_header(&mut self) {
        self.push("-- Migration script generated automatically");
        self.push("-- WARNING: Review this script before running it in production");
        self.push("-- Run each command carefully and take a backup first!");
        self.push("-- Running it in a test environment first is recommended");
        self.blank();
    }

    fn write_new_tables(&mut self, diff: &SchemaDiff<'_>) {
        self.stage("STAGE 1: NEW TABLES");

        if diff.tables_to_create.is_empty() {
            self.push("-- No new tables found");
            self.blank();
            return;
        }

        for table in &diff.tables_to_create {
            self.write_new_table(table);
            self.blank();
        }
    }

    fn write_new_table(&mut self, table: &Table) {
        match &table.original_sql {
            Some(sql) => {
                self.push(format!(
                    "-- Creating table '{}' which does not exist in current",
                    table.name
                ));
                self.push(format!("{};", sql));
            }
            None => {
                // Only ALTER TABLE statements were seen for this table
                self.push(format!(
                    "-- Table '{}' has no CREATE TABLE in target; replaying its ALTER statements",
                    table.name
                ));
                for alter in &table.alters {
                    self.push(format!("{};", alter));
                }
            }
        }
    }

    fn write_droppable_tables(&mut self, diff: &SchemaDiff<'_>) {
        self.stage("STAGE 2: TABLES THAT CAN BE REMOVED");

        if diff.tables_to_drop.is_empty() {
            self.push("-- No tables to remove found");
            self.blank();
            return;
        }

        for name in &diff.tables_to_drop {
            self.push(format!("-- WARNING: Table '{}' exists in current but not in target", name));
            self.push("-- Uncomment the line below only if you are sure:");
            self.push(format!("-- DROP TABLE IF EXISTS {};", quote_identifier(name)));
            self.blank();
        }
    }

    fn write_table_changes(&mut self, diff: &SchemaDiff<'_>) {
        self.stage("STAGE 3: CHANGES TO EXISTING TABLES");

        if diff.tables_to_alter.is_empty() {
            self.push("-- No changes to existing tables found");
            self.blank();
            return;
        }

        for change in &diff.tables_to_alter {
            self.write_table_change(change);
        }
    }

    fn write_table_change(&mut self, change: &TableChange<'_>) {
        let (current, target) = (change.current, change.target);

        self.push(format!("-- Changes to table '{}'", change.name));
        self.push(format!(
            "-- Current: {} columns, {} indexes, {} constraints",
            current.columns.len(),
            current.indexes.len(),
            current.constraints.len()
        ));
        self.push(format!(
            "-- Target: {} columns, {} indexes, {} constraints",
            target.columns.len(),
            target.indexes.len(),
            target.constraints.len()
        ));

        if !change.columns.is_empty() {
            self.push(format!("-- Current columns: {}", current.column_names().join(", ")));
            self.push(format!("-- Target columns: {}", target.column_names().join(", ")));
        }
        self.blank();

        for statement in change.ordered_statements() {
            self.push(statement.to_string());
        }

        for alter in change.replayed_alters() {
            self.push("-- ALTER found in target:");
            self.push(format!("{};", alter));
        }
        self.blank();
    }

    fn write_view_changes(&mut self, diff: &SchemaDiff<'_>) {
        self.stage("STAGE 4: VIEW MANAGEMENT");

        if diff.view_changes.is_empty() {
            self.push("-- No view changes found");
            self.blank();
            return;
        }

        self.push("-- View changes:");
        self.push(format!("-- Current: {} views", diff.current.views.len()));
        self.push(format!("-- Target: {} views", diff.target.views.len()));
        self.blank();

        for change in &diff.view_changes {
            self.write_view_change(change);
        }
    }

    fn write_view_change(&mut self, change: &ViewChange) {
        match change.kind {
            ViewChangeKind::Create => {
                self.push(format!(
                    "-- Creating view '{}' which does not exist in current",
                    change.name
                ));
            }
            ViewChangeKind::Remove => {
                self.push(format!(
                    "-- WARNING: View '{}' exists in current but not in target",
                    change.name
                ));
                self.push("-- Removing view that no longer exists in target:");
            }
            ViewChangeKind::Replace => {
                self.push(format!("-- Updating view '{}' which was modified", change.name));
            }
        }

        for statement in &change.statements {
            self.push(statement.as_str());
        }
        self.blank();
    }

    fn write_summary(&mut self, summary: &DiffSummary) {
        self.push(DIVIDER);
        self.push("-- SCRIPT SUMMARY");
        self.push(DIVIDER);
        self.push(format!("-- Tables to create: {}", summary.new_tables));
        self.push(format!("-- Tables to remove: {}", summary.dropped_tables));
        self.push(format!("-- Tables to modify: {}", summary.modified_tables));
        self.push(format!("-- Views to create: {}", summary.new_views));
        self.push(format!("-- Views to remove: {}", summary.dropped_views));
        self.push(format!("-- Views to modify: {}", summary.modified_views));
        self.blank();

        if summary.is_synchronized() {
            self.push(SYNCHRONIZED_LINE);
        } else {
            self.push(REVIEW_LINE);
        }
    }
}

/// Closing line of a script when nothing differs
pub const SYNCHRONIZED_LINE: &str = "-- The schemas are synchronized!";

/// Closing line of a script that contains changes
pub const REVIEW_LINE: &str = "-- REMEMBER: Test this script in a development environment first!";
