//! Schema difference calculator
//!
//! Compares a current schema against a target schema and produces the DDL
//! statements that move current towards target. Every comparison is on the
//! verbatim text kept by the extractor, except views, which are compared
//! after whitespace normalization.

use indexmap::IndexMap;
use std::fmt;

use crate::schema::types::{Constraint, ConstraintKind, Schema, Table, View};
use crate::utils::identifiers::quote_identifier;

/// What a generated statement does, used to order a table's change block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Add,
    Drop,
    Modify,
    /// Emitted only as a SQL comment
    Suggest,
}

/// A single generated ALTER TABLE statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterStatement {
    pub action: ChangeAction,
    pub sql: String,
}

impl AlterStatement {
    fn new(action: ChangeAction, sql: String) -> Self {
        Self { action, sql }
    }
}

impl fmt::Display for AlterStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Compare the columns of two versions of a table
pub fn generate_column_alters(
    table_name: &str,
    current: &Table,
    target: &Table,
) -> Vec<AlterStatement> {
    let table = quote_identifier(table_name);
    let mut alters = Vec::new();

    for (name, column) in &target.columns {
        if !current.columns.contains_key(name) {
            alters.push(AlterStatement::new(
                ChangeAction::Add,
                format!(
                    "ALTER TABLE {} ADD COLUMN {} {};",
                    table,
                    quote_identifier(name),
                    column.type_definition()
                ),
            ));
        }
    }

    for name in current.columns.keys() {
        if !target.columns.contains_key(name) {
            alters.push(AlterStatement::new(
                ChangeAction::Suggest,
                format!(
                    "-- ALTER TABLE {} DROP COLUMN {}; -- WARNING: may cause data loss",
                    table,
                    quote_identifier(name)
                ),
            ));
        }
    }

    for (name, column) in &target.columns {
        if let Some(existing) = current.columns.get(name) {
            if existing.definition != column.definition {
                alters.push(AlterStatement::new(
                    ChangeAction::Modify,
                    format!(
                        "ALTER TABLE {} MODIFY COLUMN {} {};",
                        table,
                        quote_identifier(name),
                        column.type_definition()
                    ),
                ));
            }
        }
    }

    alters
}

/// Compare the plain indexes of two versions of a table
pub fn generate_index_alters(
    table_name: &str,
    current: &Table,
    target: &Table,
) -> Vec<AlterStatement> {
    let table = quote_identifier(table_name);
    let add = |definition: &str| {
        AlterStatement::new(ChangeAction::Add, format!("ALTER TABLE {} ADD {};", table, definition))
    };
    let drop_index = |name: &str| {
        AlterStatement::new(
            ChangeAction::Drop,
            format!("ALTER TABLE {} DROP INDEX {};", table, quote_identifier(name)),
        )
    };
    let mut alters = Vec::new();

    for (name, index) in &target.indexes {
        if !current.indexes.contains_key(name) {
            alters.push(add(&index.definition));
        }
    }

    for name in current.indexes.keys() {
        if !target.indexes.contains_key(name) {
            alters.push(drop_index(name));
        }
    }

    // There is no in-place index modification, so changed indexes are rebuilt
    for (name, index) in &target.indexes {
        if let Some(existing) = current.indexes.get(name) {
            if existing.definition != index.definition {
                alters.push(drop_index(name));
                alters.push(add(&index.definition));
            }
        }
    }

    alters
}

fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    text.get(..keyword.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
}

fn add_constraint_sql(table: &str, constraint: &Constraint) -> String {
    match constraint.kind {
        ConstraintKind::PrimaryKey => {
            let columns: Vec<String> =
                constraint.columns.iter().map(|c| quote_identifier(c)).collect();
            format!("ALTER TABLE {} ADD PRIMARY KEY ({});", table, columns.join(", "))
        }
        // Extracted foreign keys already carry their `CONSTRAINT name` prefix
        ConstraintKind::ForeignKey if starts_with_keyword(&constraint.definition, "CONSTRAINT") => {
            format!("ALTER TABLE {} ADD {};", table, constraint.definition)
        }
        ConstraintKind::ForeignKey => format!(
            "ALTER TABLE {} ADD CONSTRAINT {} {};",
            table,
            quote_identifier(&constraint.name),
            constraint.definition
        ),
        ConstraintKind::UniqueKey => {
            format!("ALTER TABLE {} ADD {};", table, constraint.definition)
        }
    }
}

fn drop_constraint_sql(table: &str, constraint: &Constraint) -> String {
    match constraint.kind {
        ConstraintKind::PrimaryKey => format!("ALTER TABLE {} DROP PRIMARY KEY;", table),
        ConstraintKind::ForeignKey => format!(
            "ALTER TABLE {} DROP FOREIGN KEY {};",
            table,
            quote_identifier(&constraint.name)
        ),
        ConstraintKind::UniqueKey => format!(
            "ALTER TABLE {} DROP INDEX {};",
            table,
            quote_identifier(&constraint.name)
        ),
    }
}

/// Compare the constraints of two versions of a table
///
/// A constraint counts as changed when its verbatim definition differs; this
/// holds for primary keys too, even though only their column list is used
/// when re-adding them.
pub fn generate_constraint_alters(
    table_name: &str,
    current: &Table,
    target: &Table,
) -> Vec<AlterStatement> {
    let table = quote_identifier(table_name);
    let mut alters = Vec::new();

    for (name, constraint) in &target.constraints {
        if !current.constraints.contains_key(name) {
            let sql = add_constraint_sql(&table, constraint);
            alters.push(AlterStatement::new(ChangeAction::Add, sql));
        }
    }

    for (name, constraint) in &current.constraints {
        if !target.constraints.contains_key(name) {
            let sql = drop_constraint_sql(&table, constraint);
            alters.push(AlterStatement::new(ChangeAction::Drop, sql));
        }
    }

    for (name, constraint) in &target.constraints {
        if let Some(existing) = current.constraints.get(name) {
            if existing.definition != constraint.definition {
                let drop_sql = drop_constraint_sql(&table, existing);
                let add_sql = add_constraint_sql(&table, constraint);
                alters.push(AlterStatement::new(ChangeAction::Drop, drop_sql));
                alters.push(AlterStatement::new(ChangeAction::Add, add_sql));
            }
        }
    }

    alters
}

/// How a view differs between the two schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewChangeKind {
    Create,
    Remove,
    Replace,
}

/// Statements for one view, in execution order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewChange {
    pub name: String,
    pub kind: ViewChangeKind,
    pub statements: Vec<String>,
}

fn drop_view_sql(name: &str) -> String {
    format!("DROP VIEW IF EXISTS {};", quote_identifier(name))
}

/// Compare all views of the two schemas
///
/// New and changed views are always dropped first so the script can be
/// re-applied. A target view known only from a DROP statement produces nothing.
pub fn generate_view_alters(
    current: &IndexMap<String, View>,
    target: &IndexMap<String, View>,
) -> Vec<ViewChange> {
    let mut changes = Vec::new();

    for (name, view) in target {
        if current.contains_key(name) {
            continue;
        }
        if let Some(definition) = &view.definition {
            changes.push(ViewChange {
                name: name.clone(),
                kind: ViewChangeKind::Create,
                statements: vec![drop_view_sql(name), format!("{};", definition)],
            });
        }
    }

    for name in current.keys() {
        if !target.contains_key(name) {
            changes.push(ViewChange {
                name: name.clone(),
                kind: ViewChangeKind::Remove,
                statements: vec![drop_view_sql(name)],
            });
        }
    }

    for (name, view) in target {
        let (Some(existing), Some(definition)) = (current.get(name), &view.definition) else {
            continue;
        };
        if existing.normalized_definition() != view.normalized_definition() {
            changes.push(ViewChange {
                name: name.clone(),
                kind: ViewChangeKind::Replace,
                statements: vec![drop_view_sql(name), format!("{};", definition)],
            });
        }
    }

    changes
}

/// All generated statements for a table present in both schemas
#[derive(Debug, Clone)]
pub struct TableChange<'a> {
    pub name: &'a str,
    pub current: &'a Table,
    pub target: &'a Table,
    pub columns: Vec<AlterStatement>,
    pub indexes: Vec<AlterStatement>,
    pub constraints: Vec<AlterStatement>,
}

impl<'a> TableChange<'a> {
    /// Compare two versions of the same table
    pub fn compare(name: &'a str, current: &'a Table, target: &'a Table) -> Self {
        Self {
            name,
            current,
            target,
            columns: generate_column_alters(name, current, target),
            indexes: generate_index_alters(name, current, target),
            constraints: generate_constraint_alters(name, current, target),
        }
    }

    /// ALTER statements recorded in the target dump, replayed as-is
    pub fn replayed_alters(&self) -> &'a [String] {
        &self.target.alters
    }

    /// Whether anything needs to be emitted for this table
    pub fn has_changes(&self) -> bool {
        !self.columns.is_empty()
            || !self.indexes.is_empty()
            || !self.constraints.is_empty()
            || !self.target.alters.is_empty()
    }

    /// Statements in execution order: constraint drops, column changes,
    /// index changes, then constraint additions
    pub fn ordered_statements(&self) -> Vec<&AlterStatement> {
        let constraint_drops = self.constraints.iter().filter(|s| s.action == ChangeAction::Drop);
        let constraint_adds = self.constraints.iter().filter(|s| s.action == ChangeAction::Add);

        constraint_drops
            .chain(self.columns.iter())
            .chain(self.indexes.iter())
            .chain(constraint_adds)
            .collect()
    }
}

/// Structural counts reported at the end of a script
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub new_tables: usize,
    pub dropped_tables: usize,
    pub modified_tables: usize,
    pub new_views: usize,
    pub dropped_views: usize,
    pub modified_views: usize,
}

impl DiffSummary {
    /// True when no table or view differs
    pub fn is_synchronized(&self) -> bool {
        *self == Self::default()
    }
}

/// Represents the changes needed to move the current schema to the target
#[derive(Debug, Clone)]
pub struct SchemaDiff<'a> {
    pub current: &'a Schema,
    pub target: &'a Schema,
    pub tables_to_create: Vec<&'a Table>,
    pub tables_to_drop: Vec<&'a str>,
    /// Tables present in both schemas that need changes, in target order
    pub tables_to_alter: Vec<TableChange<'a>>,
    pub view_changes: Vec<ViewChange>,
}

impl<'a> SchemaDiff<'a> {
    /// Generate a schema diff between two schemas
    pub fn generate(current: &'a Schema, target: &'a Schema) -> Self {
        let tables_to_create = target
            .tables
            .values()
            .filter(|table| !current.tables.contains_key(&table.name))
            .collect();

        let tables_to_drop = current
            .tables
            .keys()
            .filter(|name| !target.tables.contains_key(*name))
            .map(String::as_str)
            .collect();

        let tables_to_alter = target
            .tables
            .iter()
            .filter_map(|(name, target_table)| {
                let current_table = current.tables.get(name)?;
                let change = TableChange::compare(name, current_table, target_table);
                change.has_changes().then_some(change)
            })
            .collect();

        let view_changes = generate_view_alters(&current.views, &target.views);

        Self {
            current,
            target,
            tables_to_create,
            tables_to_drop,
            tables_to_alter,
            view_changes,
        }
    }

    /// Count created, removed and modified tables and views
    ///
    /// Views are counted by name, so a target view known only from a DROP
    /// still counts as new, and a view whose normalized definition differs
    /// counts as modified even when no statement could be generated for it.
    pub fn summary(&self) -> DiffSummary {
        let current_views = &self.current.views;
        let target_views = &self.target.views;

        DiffSummary {
            new_tables: self.tables_to_create.len(),
            dropped_tables: self.tables_to_drop.len(),
            modified_tables: self.tables_to_alter.len(),
            new_views: target_views.keys().filter(|v| !current_views.contains_key(*v)).count(),
            dropped_views: current_views.keys().filter(|v| !target_views.contains_key(*v)).count(),
            modified_views: target_views
                .iter()
                .filter(|(name, view)| {
                    current_views
                        .get(*name)
                        .is_some_and(|existing| {
                            existing.normalized_definition() != view.normalized_definition()
                        })
                })
                .count(),
        }
    }

    /// Check if the diff is empty (no changes needed)
    pub fn is_empty(&self) -> bool {
        self.summary().is_synchronized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::extractor::parse_schema;
    use pretty_assertions::assert_eq;

    fn table(sql: &str) -> Table {
        parse_schema(sql).tables.into_values().next().expect("table")
    }

    fn sql(statements: &[AlterStatement]) -> Vec<&str> {
        statements.iter().map(|s| s.sql.as_str()).collect()
    }

    #[test]
    fn added_column_uses_target_definition() {
        let current = table("CREATE TABLE t (id int)");
        let target = table("CREATE TABLE t (id int, name varchar(50) NOT NULL)");

        let alters = generate_column_alters("t", &current, &target);
        assert_eq!(sql(&alters), vec!["ALTER TABLE `t` ADD COLUMN `name` varchar(50) NOT NULL;"]);
        assert_eq!(alters[0].action, ChangeAction::Add);
    }

    #[test]
    fn dropped_column_is_only_suggested() {
        let current = table("CREATE TABLE t (id int, legacy text)");
        let target = table("CREATE TABLE t (id int)");

        let alters = generate_column_alters("t", &current, &target);
        assert_eq!(alters.len(), 1);
        assert_eq!(alters[0].action, ChangeAction::Suggest);
        assert!(alters[0].sql.starts_with("-- ALTER TABLE `t` DROP COLUMN `legacy`;"));
    }

    #[test]
    fn changed_column_is_modified_in_place() {
        let current = table("CREATE TABLE t (id int, name varchar(50))");
        let target = table("CREATE TABLE t (id int, `name` varchar(100))");

        let alters = generate_column_alters("t", &current, &target);
        assert_eq!(sql(&alters), vec!["ALTER TABLE `t` MODIFY COLUMN `name` varchar(100);"]);
    }

    #[test]
    fn quoting_style_alone_is_not_a_change() {
        let current = table("CREATE TABLE t (id int, name varchar(50))");
        let target = table("CREATE TABLE t (`id` int, \"name\" varchar(50))");
        assert!(generate_column_alters("t", &current, &target).is_empty());
    }

    #[test]
    fn changed_index_is_dropped_then_added() {
        let current = table("CREATE TABLE t (a int, b int, KEY `idx_a` (`a`), KEY `idx_old` (`b`))");
        let target = table("CREATE TABLE t (a int, b int, KEY `idx_a` (`a`, `b`), KEY `idx_new` (`b`))");

        let alters = generate_index_alters("t", &current, &target);
        assert_eq!(
            sql(&alters),
            vec![
                "ALTER TABLE `t` ADD KEY `idx_new` (`b`);",
                "ALTER TABLE `t` DROP INDEX `idx_old`;",
                "ALTER TABLE `t` DROP INDEX `idx_a`;",
                "ALTER TABLE `t` ADD KEY `idx_a` (`a`, `b`);",
            ]
        );
    }

    #[test]
    fn constraint_statements_follow_their_kind() {
        let current = table(
            "CREATE TABLE t (id int, u int, o int, PRIMARY KEY (`id`), CONSTRAINT `fk_o` FOREIGN KEY (`o`) REFERENCES `owners` (`id`))",
        );
        let target = table("CREATE TABLE t (id int, u int, o int, PRIMARY KEY (`id`, `u`), UNIQUE KEY `uq_u` (`u`))");

        let alters = generate_constraint_alters("t", &current, &target);
        assert_eq!(
            sql(&alters),
            vec![
                "ALTER TABLE `t` ADD UNIQUE KEY `uq_u` (`u`);",
                "ALTER TABLE `t` DROP FOREIGN KEY `fk_o`;",
                "ALTER TABLE `t` DROP PRIMARY KEY;",
                "ALTER TABLE `t` ADD PRIMARY KEY (`id`, `u`);",
            ]
        );
    }

    #[test]
    fn new_foreign_key_is_added_by_name() {
        let current = table("CREATE TABLE t (o int)");
        let target = table("CREATE TABLE t (o int, CONSTRAINT `fk_o` FOREIGN KEY (`o`) REFERENCES `owners` (`id`))");

        let alters = generate_constraint_alters("t", &current, &target);
        assert_eq!(
            sql(&alters),
            vec!["ALTER TABLE `t` ADD CONSTRAINT `fk_o` FOREIGN KEY (`o`) REFERENCES `owners` (`id`);"]
        );
    }

    #[test]
    fn unprefixed_foreign_key_gets_constraint_name() {
        let mut target = Table::new("t");
        target.add_constraint(Constraint::named(
            "fk_o",
            ConstraintKind::ForeignKey,
            "FOREIGN KEY (`o`) REFERENCES `owners` (`id`)",
        ));

        let alters = generate_constraint_alters("t", &Table::new("t"), &target);
        assert_eq!(
            sql(&alters),
            vec!["ALTER TABLE `t` ADD CONSTRAINT `fk_o` FOREIGN KEY (`o`) REFERENCES `owners` (`id`);"]
        );
    }

    #[test]
    fn primary_key_change_is_decided_on_definition_text() {
        // Same column set, different spelling: still treated as a change.
        let current = table("CREATE TABLE t (id int, PRIMARY KEY (`id`))");
        let target = table("CREATE TABLE t (id int, PRIMARY KEY (id))");

        let alters = generate_constraint_alters("t", &current, &target);
        assert_eq!(
            sql(&alters),
            vec!["ALTER TABLE `t` DROP PRIMARY KEY;", "ALTER TABLE `t` ADD PRIMARY KEY (`id`);"]
        );
    }

    #[test]
    fn ordered_statements_put_constraint_drops_first_and_adds_last() {
        let current = table("CREATE TABLE t (id int, code int, UNIQUE KEY `uq_code` (`code`))");
        let target = table(
            "CREATE TABLE t (id int, code bigint, extra int, KEY `idx_extra` (`extra`), UNIQUE KEY `uq_code` (`code`, `id`))",
        );

        let change = TableChange::compare("t", &current, &target);
        let ordered: Vec<&str> = change.ordered_statements().iter().map(|s| s.sql.as_str()).collect();
        assert_eq!(
            ordered,
            vec![
                "ALTER TABLE `t` DROP INDEX `uq_code`;",
                "ALTER TABLE `t` ADD COLUMN `extra` int;",
                "ALTER TABLE `t` MODIFY COLUMN `code` bigint;",
                "ALTER TABLE `t` ADD KEY `idx_extra` (`extra`);",
                "ALTER TABLE `t` ADD UNIQUE KEY `uq_code` (`code`, `id`);",
            ]
        );
    }

    #[test]
    fn view_changes_cover_create_remove_and_replace() {
        let current = parse_schema(
            "CREATE VIEW v_same AS SELECT 1;\nCREATE VIEW v_old AS SELECT 2;\nCREATE VIEW v_changed AS SELECT 3;",
        );
        let target = parse_schema(
            "CREATE VIEW v_same AS   SELECT   1;\nCREATE VIEW v_new AS SELECT 4;\nCREATE VIEW v_changed AS SELECT 33;",
        );

        let changes = generate_view_alters(&current.views, &target.views);
        assert_eq!(
            changes,
            vec![
                ViewChange {
                    name: "v_new".to_string(),
                    kind: ViewChangeKind::Create,
                    statements: vec![
                        "DROP VIEW IF EXISTS `v_new`;".to_string(),
                        "CREATE VIEW v_new AS SELECT 4;".to_string(),
                    ],
                },
                ViewChange {
                    name: "v_old".to_string(),
                    kind: ViewChangeKind::Remove,
                    statements: vec!["DROP VIEW IF EXISTS `v_old`;".to_string()],
                },
                ViewChange {
                    name: "v_changed".to_string(),
                    kind: ViewChangeKind::Replace,
                    statements: vec![
                        "DROP VIEW IF EXISTS `v_changed`;".to_string(),
                        "CREATE VIEW v_changed AS SELECT 33;".to_string(),
                    ],
                },
            ]
        );
    }

    #[test]
    fn drop_only_target_view_emits_nothing_but_is_counted() {
        let current = Schema::new();
        let target = parse_schema("DROP VIEW IF EXISTS v_gone;");

        assert!(generate_view_alters(&current.views, &target.views).is_empty());

        let diff = SchemaDiff::generate(&current, &target);
        assert_eq!(diff.summary().new_views, 1);
        assert!(!diff.is_empty());
    }

    #[test]
    fn schema_diff_classifies_tables() {
        let current = parse_schema("CREATE TABLE keep (id int);\nCREATE TABLE old (id int);\nCREATE TABLE same (id int);");
        let target = parse_schema("CREATE TABLE keep (id int, x int);\nCREATE TABLE fresh (id int);\nCREATE TABLE same (id int);");

        let diff = SchemaDiff::generate(&current, &target);
        assert_eq!(diff.tables_to_create.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), vec!["fresh"]);
        assert_eq!(diff.tables_to_drop, vec!["old"]);
        assert_eq!(diff.tables_to_alter.len(), 1);
        assert_eq!(diff.tables_to_alter[0].name, "keep");
        assert_eq!(
            diff.summary(),
            DiffSummary {
                new_tables: 1,
                dropped_tables: 1,
                modified_tables: 1,
                ..DiffSummary::default()
            }
        );
    }

    #[test]
    fn target_alters_mark_table_as_modified() {
        let current = parse_schema("CREATE TABLE t (id int);");
        let target = parse_schema("CREATE TABLE t (id int);\nALTER TABLE t ADD KEY k (id);");

        let diff = SchemaDiff::generate(&current, &target);
        assert_eq!(diff.tables_to_alter.len(), 1);
        assert_eq!(diff.tables_to_alter[0].replayed_alters(), ["ALTER TABLE t ADD KEY k (id)"]);
        assert_eq!(diff.summary().modified_tables, 1);
    }

    #[test]
    fn identical_schemas_are_synchronized() {
        let sql = "CREATE TABLE t (id int, PRIMARY KEY (`id`));\nCREATE VIEW v AS SELECT id FROM t;";
        let current = parse_schema(sql);
        let target = parse_schema(sql);

        let diff = SchemaDiff::generate(&current, &target);
        assert!(diff.tables_to_alter.is_empty());
        assert!(diff.view_changes.is_empty());
        assert!(diff.is_empty());
    }
}
