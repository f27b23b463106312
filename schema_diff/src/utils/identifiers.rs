//! Identifier utilities for schema_diff
//!
//! Small helpers for quoting and normalizing SQL identifiers and text.

/// Quote an identifier with backticks
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name)
}

/// Remove backticks and quotes from an identifier and trim it
pub fn strip_quotes(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !matches!(c, '`' | '\'' | '"'))
        .collect()
}

/// Collapse all whitespace runs into a single space and trim the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-insensitive substring test
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_uppercase()
        .contains(&needle.to_ascii_uppercase())
}

/// Count of `(` minus count of `)` in a piece of text
pub fn paren_balance(text: &str) -> i64 {
    text.chars().fold(0, |balance, c| match c {
        '(' => balance + 1,
        ')' => balance - 1,
        _ => balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("`user_id`", "user_id")]
    #[case(" 'name' ", "name")]
    #[case("\"created_at\"", "created_at")]
    #[case("plain", "plain")]
    fn strips_identifier_quotes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_quotes(input), expected);
    }

    #[test]
    fn normalizes_whitespace_runs() {
        assert_eq!(
            normalize_whitespace("  CREATE   VIEW\n\tv AS\n SELECT 1 "),
            "CREATE VIEW v AS SELECT 1"
        );
    }

    #[rstest]
    #[case("CREATE TABLE t (", 1)]
    #[case("a int, b decimal(10,2))", -1)]
    #[case("DEFAULT (now())", 0)]
    fn counts_paren_balance(#[case] input: &str, #[case] expected: i64) {
        assert_eq!(paren_balance(input), expected);
    }

    #[test]
    fn matches_keywords_regardless_of_case() {
        assert!(contains_ignore_case("create table `t`", "CREATE TABLE"));
        assert!(!contains_ignore_case("ALTER VIEW", "ALTER TABLE"));
        assert_eq!(quote_identifier("t"), "`t`");
    }
}
