//! schema_diff: compares two SQL schema dumps and generates a migration script
//!
//! The core is two pure functions: [`parse_schema`] turns a dump into a
//! structured [`Schema`], and [`diff_schemas`] turns a current and a target dump
//! into a commented, reviewable SQL script. [`SchemaDiffClient`] is the thin
//! file-reading layer around them.

pub mod config;
pub mod error;
pub mod schema;
pub mod utils;


use std::fs;
use std::path::Path;

// Re-export main types for easier access
pub use config::Config;
pub use error::{Error, Result};
pub use schema::diff::SchemaDiff;
pub use schema::extractor::{parse_schema, parse_schema_with_report, ParseReport};
pub use schema::generator::ScriptGenerator;
pub use schema::types::Schema;

/// Diff two schema dumps, returning the migration script that moves `current` towards `target`
///
/// Always returns a complete script, even when the schemas are identical.
pub fn diff_schemas(current: &str, target: &str) -> String {
    let current_schema = parse_schema(current);
    let target_schema = parse_schema(target);

    tracing::info!(
        current_tables = current_schema.tables.len(),
        target_tables = target_schema.tables.len(),
        current_views = current_schema.views.len(),
        target_views = target_schema.views.len(),
        "Parsed schemas"
    );

    let diff = SchemaDiff::generate(&current_schema, &target_schema);
    ScriptGenerator::new().generate(&diff)
}

/// File-based front end for the parser and diff engine
pub struct SchemaDiffClient {
    config: Config,
}

impl SchemaDiffClient {
    /// Create a new client from configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read a schema dump, enforcing the size limit and UTF-8 encoding
    pub fn read_dump<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let limit = self.config.input.max_file_size_bytes;

        let size = fs::metadata(path)?.len();
        if size > limit {
            return Err(Error::InputTooLarge {
                path: shown,
                size,
                limit,
            });
        }

        let bytes = fs::read(path)?;
        tracing::debug!(path = %shown, bytes = bytes.len(), "Read schema dump");

        String::from_utf8(bytes).map_err(|e| Error::EncodingError {
            path: shown,
            message: e.utf8_error().to_string(),
        })
    }

    /// Parse a schema dump file
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<ParseReport> {
        let text = self.read_dump(path)?;
        Ok(parse_schema_with_report(&text))
    }

    /// Diff two schema dump files
    pub fn diff_files<P, Q>(&self, current: P, target: Q) -> Result<String>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let current = self.read_dump(current)?;
        let target = self.read_dump(target)?;
        Ok(diff_schemas(&current, &target))
    }
}
