//! Statement segmenter
//!
//! Splits a raw schema dump into logical DDL statements. Splitting happens on
//! `;`, but a CREATE TABLE only ends once its parentheses balance again, so
//! fragments are stitched back together until that happens.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::utils::identifiers::{contains_ignore_case, paren_balance};

static LINE_COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)--.*$").unwrap());
static BLOCK_COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static BLANK_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*$\n?").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip comments and collapse whitespace so later matching ignores line breaks
pub fn clean_sql(text: &str) -> String {
    let text = LINE_COMMENT_RE.replace_all(text, "");
    let text = BLOCK_COMMENT_RE.replace_all(&text, "");
    let text = BLANK_LINE_RE.replace_all(&text, "");
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

/// Recognized statement heads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Head {
    CreateTable,
    CreateView,
    Drop,
    AlterTable,
}

fn classify_head(fragment: &str) -> Option<Head> {
    if contains_ignore_case(fragment, "CREATE TABLE") {
        Some(Head::CreateTable)
    } else if contains_ignore_case(fragment, "CREATE") && contains_ignore_case(fragment, "VIEW") {
        Some(Head::CreateView)
    } else if contains_ignore_case(fragment, "DROP TABLE")
        || contains_ignore_case(fragment, "DROP VIEW")
    {
        Some(Head::Drop)
    } else if contains_ignore_case(fragment, "ALTER TABLE") {
        Some(Head::AlterTable)
    } else {
        None
    }
}

/// An unfinished CREATE TABLE carried between fragments
#[derive(Debug)]
struct OpenTable {
    statement: String,
    balance: i64,
}

/// Segmenter state threaded through the fragment walk
#[derive(Debug, Default)]
struct Segmenter {
    statements: Vec<String>,
    open: Option<OpenTable>,
}

impl Segmenter {
    fn feed(mut self, fragment: &str) -> Self {
        if let Some(mut open) = self.open.take() {
            // The split consumed a `;` that sits inside the table body
            open.statement.push(';');
            open.statement.push_str(fragment);
            open.balance += paren_balance(fragment);

            if open.balance == 0 {
                self.statements.push(open.statement.trim().to_string());
            } else {
                self.open = Some(open);
            }
            return self;
        }

        let trimmed = fragment.trim();
        if trimmed.is_empty() {
            return self;
        }

        match classify_head(trimmed) {
            Some(Head::CreateTable) => {
                let balance = paren_balance(trimmed);
                if balance == 0 {
                    self.statements.push(trimmed.to_string());
                } else {
                    self.open = Some(OpenTable {
                        statement: trimmed.to_string(),
                        balance,
                    });
                }
            }
            Some(Head::CreateView) | Some(Head::Drop) | Some(Head::AlterTable) => {
                self.statements.push(trimmed.to_string());
            }
            None => {
                tracing::trace!(fragment = %preview(trimmed), "Ignoring unrecognized fragment");
            }
        }
        self
    }

    fn finish(self) -> Vec<String> {
        if let Some(open) = self.open {
            tracing::warn!(
                statement = %preview(&open.statement),
                balance = open.balance,
                "Unterminated CREATE TABLE discarded"
            );
        }
        self.statements
    }
}

/// Split schema text into an ordered list of DDL statements
pub fn segment(text: &str) -> Vec<String> {
    let cleaned = clean_sql(text);
    cleaned
        .split(';')
        .fold(Segmenter::default(), Segmenter::feed)
        .finish()
}

/// First 100 characters of a statement for log messages
pub(crate) fn preview(statement: &str) -> String {
    statement.chars().take(100).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_comments_and_collapses_whitespace() {
        let sql = "-- header\nCREATE TABLE t (\n  /* inline\n comment */ id int -- trailing\n);\n\n\n";
        assert_eq!(clean_sql(sql), "CREATE TABLE t ( id int );");
    }

    #[test]
    fn emits_recognized_statements_in_order() {
        let sql = r#"
            SET NAMES utf8mb4;
            DROP TABLE IF EXISTS `users`;
            CREATE TABLE `users` (
              `id` int NOT NULL,
              PRIMARY KEY (`id`)
            ) ENGINE=InnoDB;
            INSERT INTO `users` VALUES (1);
            CREATE VIEW `v_users` AS SELECT id FROM users;
            ALTER TABLE `users` ADD COLUMN `age` int;
        "#;

        let statements = segment(sql);
        assert_eq!(statements.len(), 4);
        assert_eq!(statements[0], "DROP TABLE IF EXISTS `users`");
        assert!(statements[1].starts_with("CREATE TABLE `users`"));
        assert!(statements[1].ends_with("ENGINE=InnoDB"));
        assert_eq!(statements[2], "CREATE VIEW `v_users` AS SELECT id FROM users");
        assert_eq!(statements[3], "ALTER TABLE `users` ADD COLUMN `age` int");
    }

    #[test]
    fn reassembles_table_split_by_literal_semicolon() {
        let sql = "CREATE TABLE t (a varchar(10) DEFAULT 'x;y', b int);\nDROP VIEW v;";
        let statements = segment(sql);
        assert_eq!(
            statements,
            vec![
                "CREATE TABLE t (a varchar(10) DEFAULT 'x;y', b int)".to_string(),
                "DROP VIEW v".to_string(),
            ]
        );
    }

    #[test]
    fn nested_default_expression_stays_in_one_statement() {
        let sql = "CREATE TABLE audit (\n  id int,\n  stamp varchar(40) DEFAULT (concat(upper('a'), lower(substr('bc', 1, 1))))\n);";
        let statements = segment(sql);
        assert_eq!(statements.len(), 1);
        assert_eq!(paren_balance(&statements[0]), 0);
        assert!(statements[0].contains("lower(substr('bc', 1, 1))"));
    }

    #[test]
    fn unterminated_table_is_discarded() {
        let statements = segment("CREATE TABLE t (id int");
        assert!(statements.is_empty());
    }

    #[test]
    fn empty_input_yields_no_statements() {
        assert!(segment("").is_empty());
        assert!(segment("  -- only a comment\n/* and another */").is_empty());
    }
}
