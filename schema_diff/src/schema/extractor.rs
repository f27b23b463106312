//! Schema extractor
//!
//! Turns segmented DDL statements into the [`Schema`] model. There is no SQL
//! grammar here: each statement kind is recognized by an ordered predicate and
//! handed to a dedicated parser that pulls out names and keeps everything else
//! verbatim. Statements that cannot be parsed are skipped and reported, never
//! treated as errors.

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use serde::Serialize;
use thiserror::Error;

use crate::schema::segmenter::{preview, segment};
use crate::schema::types::{Column, Constraint, ConstraintKind, Index, Schema, Table};
use crate::utils::identifiers::{contains_ignore_case, quote_identifier, strip_quotes};

static CREATE_VIEW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)CREATE\s+(?:OR\s+REPLACE\s+)?(?:ALGORITHM\s*=\s*\w+\s+)?(?:DEFINER\s*=\s*\S+\s+)?(?:SQL\s+SECURITY\s+\w+\s+)?VIEW\s+`?(\w+)`?",
    )
    .unwrap()
});

static DROP_HEAD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*DROP\s+(?:TABLE|VIEW)\b").unwrap());

static DROP_VIEW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)DROP\s+(?:TABLE\s+IF\s+EXISTS|VIEW\s+IF\s+EXISTS|VIEW)\s+`?(\w+)`?").unwrap()
});

static CREATE_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)CREATE\s+(?:TEMPORARY\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(?:[`"]?\w+[`"]?\.)?[`"]?(\w+)[`"]?"#,
    )
    .unwrap()
});

static ALTER_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)ALTER\s+TABLE\s+(?:ONLY\s+)?(?:[`"]?\w+[`"]?\.)?[`"]?(\w+)[`"]?"#).unwrap()
});

static COLUMN_HEAD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^([`"]?)(\w+)[`"]?\s+\w"#).unwrap());

static LEADING_IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[`"]?\w+[`"]?"#).unwrap());

static PRIMARY_KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bPRIMARY\s+KEY\b").unwrap());

static PRIMARY_KEY_COLUMNS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)PRIMARY\s+KEY\s*\(([^)]+)\)").unwrap());

static UNIQUE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bUNIQUE\s+(?:KEY|INDEX)\b").unwrap());

static UNIQUE_KEY_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)UNIQUE\s+(?:KEY|INDEX)\s+[`"]?(\w+)"#).unwrap());

static FOREIGN_KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bFOREIGN\s+KEY\b").unwrap());

static FOREIGN_KEY_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)CONSTRAINT\s+[`"]?(\w+)[`"]?.*?FOREIGN\s+KEY"#).unwrap()
});

static KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(?:KEY|INDEX)\b").unwrap());

static KEY_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\b(?:KEY|INDEX)\s+[`"]?(\w+)"#).unwrap());

/// Leading words that start a table-level clause rather than a column
const CLAUSE_KEYWORDS: &[&str] = &[
    "PRIMARY",
    "UNIQUE",
    "KEY",
    "INDEX",
    "CONSTRAINT",
    "FOREIGN",
    "FULLTEXT",
    "SPATIAL",
    "CHECK",
];

/// Why a statement or table clause was left out of the schema
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum SkipReason {
    #[error("statement does not match any known DDL form")]
    Unclassified,

    #[error("could not find the {0} name")]
    MissingName(&'static str),

    #[error("could not find the table body")]
    MissingBody,

    #[error("could not find the primary key column list")]
    MissingKeyColumns,

    #[error("table clause is not a column, key or constraint")]
    UnrecognizedClause,
}

/// A statement or clause that was dropped during extraction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedStatement {
    /// Owning table, for clauses inside a CREATE TABLE body
    pub table: Option<String>,
    pub fragment: String,
    pub reason: SkipReason,
}

/// Extraction result with the diagnostics collected on the way
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParseReport {
    pub schema: Schema,
    pub statements: usize,
    pub skipped: Vec<SkippedStatement>,
}

/// Statement kinds, in the order they are tested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    CreateView,
    DropView,
    CreateTable,
    AlterTable,
}

impl StatementKind {
    /// Classify a statement; the first matching kind wins
    pub fn classify(statement: &str) -> Option<Self> {
        if CREATE_VIEW_RE.is_match(statement) {
            Some(Self::CreateView)
        } else if DROP_HEAD_RE.is_match(statement) && contains_ignore_case(statement, "VIEW") {
            // A DROP TABLE whose text mentions VIEW is booked as a view drop
            Some(Self::DropView)
        } else if CREATE_TABLE_RE.is_match(statement) {
            Some(Self::CreateTable)
        } else if ALTER_TABLE_RE.is_match(statement) {
            Some(Self::AlterTable)
        } else {
            None
        }
    }
}

/// A classified table body clause
#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Column(Column),
    Index(Index),
    Constraint(Constraint),
}

/// Parse schema text, keeping the diagnostics for skipped statements
pub fn parse_schema_with_report(text: &str) -> ParseReport {
    let statements = segment(text);
    let mut report = ParseReport {
        statements: statements.len(),
        ..ParseReport::default()
    };

    for statement in &statements {
        if let Err(reason) = apply_statement(&mut report, statement) {
            tracing::warn!(
                statement = %preview(statement),
                reason = %reason,
                "Skipping statement"
            );
            report.skipped.push(SkippedStatement {
                table: None,
                fragment: preview(statement),
                reason,
            });
        }
    }

    tracing::debug!(
        statements = report.statements,
        tables = report.schema.tables.len(),
        views = report.schema.views.len(),
        skipped = report.skipped.len(),
        "Extracted schema"
    );

    report
}

/// Parse schema text into a [`Schema`]
pub fn parse_schema(text: &str) -> Schema {
    parse_schema_with_report(text).schema
}

fn apply_statement(report: &mut ParseReport, statement: &str) -> Result<(), SkipReason> {
    let kind = StatementKind::classify(statement).ok_or(SkipReason::Unclassified)?;
    tracing::trace!(?kind, statement = %preview(statement), "Classified statement");

    match kind {
        StatementKind::CreateView => apply_create_view(&mut report.schema, statement),
        StatementKind::DropView => apply_drop_view(&mut report.schema, statement),
        StatementKind::CreateTable => {
            let (table, skipped) = parse_create_table(statement)?;
            report.skipped.extend(skipped);
            report.schema.add_table(table);
            Ok(())
        }
        StatementKind::AlterTable => apply_alter_table(&mut report.schema, statement),
    }
}

fn capture_name(re: &Regex, text: &str, what: &'static str) -> Result<String, SkipReason> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or(SkipReason::MissingName(what))
}

fn apply_create_view(schema: &mut Schema, statement: &str) -> Result<(), SkipReason> {
    let name = capture_name(&CREATE_VIEW_RE, statement, "view")?;
    let view = schema.view_entry(&name);
    view.definition = Some(statement.trim().to_string());
    Ok(())
}

fn apply_drop_view(schema: &mut Schema, statement: &str) -> Result<(), SkipReason> {
    let name = capture_name(&DROP_VIEW_RE, statement, "view")?;
    let view = schema.view_entry(&name);
    view.drop_statement = Some(statement.trim().to_string());
    Ok(())
}

fn apply_alter_table(schema: &mut Schema, statement: &str) -> Result<(), SkipReason> {
    let name = capture_name(&ALTER_TABLE_RE, statement, "table")?;
    schema.table_entry(&name).alters.push(statement.to_string());
    Ok(())
}

/// Parse a CREATE TABLE statement into a table plus any clauses it had to skip
fn parse_create_table(statement: &str) -> Result<(Table, Vec<SkippedStatement>), SkipReason> {
    let name = capture_name(&CREATE_TABLE_RE, statement, "table")?;
    let body = table_body(statement).ok_or(SkipReason::MissingBody)?;

    let mut table = Table::new(&name);
    table.original_sql = Some(statement.to_string());
    let mut skipped = Vec::new();

    for clause in split_clauses(body) {
        match parse_clause(&clause) {
            Ok(Clause::Column(column)) => table.add_column(column),
            Ok(Clause::Index(index)) => table.add_index(index),
            Ok(Clause::Constraint(constraint)) => table.add_constraint(constraint),
            Err(reason) => {
                tracing::warn!(
                    table = %name,
                    clause = %preview(&clause),
                    reason = %reason,
                    "Skipping table clause"
                );
                skipped.push(SkippedStatement {
                    table: Some(name.clone()),
                    fragment: preview(&clause),
                    reason,
                });
            }
        }
    }

    tracing::trace!(
        table = %name,
        columns = table.columns.len(),
        indexes = table.indexes.len(),
        constraints = table.constraints.len(),
        "Parsed table"
    );

    Ok((table, skipped))
}

/// Text between the first `(` of a CREATE TABLE and its matching `)`
///
/// Table options after the body (`COMMENT='...'`, `PARTITION BY ...`) may
/// carry their own parentheses and are left out.
pub fn table_body(statement: &str) -> Option<&str> {
    let start = statement.find('(')?;
    let mut depth = 0i32;
    let mut quote: Option<char> = None;

    for (i, c) in statement[start..].char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&statement[start + 1..start + i]);
                    }
                }
                _ => {}
            },
        }
    }

    None
}

/// Split a table body on top-level commas, ignoring commas inside quotes or parentheses
pub fn split_clauses(body: &str) -> Vec<String> {
    let mut clauses = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;

    for c in body.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' => depth += 1,
                ')' => depth -= 1,
                ',' if depth == 0 => {
                    push_clause(&mut clauses, &current);
                    current.clear();
                    continue;
                }
                _ => {}
            },
        }
        current.push(c);
    }
    push_clause(&mut clauses, &current);

    clauses
}

fn push_clause(clauses: &mut Vec<String>, clause: &str) {
    let clause = clause.trim();
    if !clause.is_empty() {
        clauses.push(clause.to_string());
    }
}

/// Name of the column a clause declares, if it reads like `name type ...`
fn column_name(clause: &str) -> Option<&str> {
    let caps = COLUMN_HEAD_RE.captures(clause)?;
    let quoted = !caps[1].is_empty();
    let name = caps.get(2)?.as_str();

    if !quoted && CLAUSE_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(name)) {
        None
    } else {
        Some(name)
    }
}

fn parse_clause(clause: &str) -> Result<Clause, SkipReason> {
    if let Some(name) = column_name(clause) {
        return Ok(Clause::Column(parse_column(name, clause)));
    }

    if PRIMARY_KEY_RE.is_match(clause) {
        let columns = PRIMARY_KEY_COLUMNS_RE
            .captures(clause)
            .and_then(|caps| caps.get(1))
            .ok_or(SkipReason::MissingKeyColumns)?
            .as_str()
            .split(',')
            .map(strip_quotes)
            .collect();
        Ok(Clause::Constraint(Constraint::primary_key(columns, clause)))
    } else if UNIQUE_KEY_RE.is_match(clause) {
        let name = capture_name(&UNIQUE_KEY_NAME_RE, clause, "unique key")?;
        Ok(Clause::Constraint(Constraint::named(&name, ConstraintKind::UniqueKey, clause)))
    } else if FOREIGN_KEY_RE.is_match(clause) {
        let name = capture_name(&FOREIGN_KEY_NAME_RE, clause, "foreign key")?;
        Ok(Clause::Constraint(Constraint::named(&name, ConstraintKind::ForeignKey, clause)))
    } else if KEY_RE.is_match(clause) {
        let name = capture_name(&KEY_NAME_RE, clause, "index")?;
        Ok(Clause::Index(Index {
            name,
            definition: clause.to_string(),
        }))
    } else {
        Err(SkipReason::UnrecognizedClause)
    }
}

fn parse_column(name: &str, clause: &str) -> Column {
    let definition = LEADING_IDENTIFIER_RE
        .replace(clause, NoExpand(&quote_identifier(name)))
        .into_owned();

    Column {
        name: name.to_string(),
        definition,
        is_primary_key: PRIMARY_KEY_RE.is_match(clause),
    }
}
