//! Token predicates used by query dispatch.

use crate::influxql::tokens::{scan_tokens, split_dotted, unquote};

fn keyword(tokens: &[String], i: usize) -> Option<String> {
    tokens.get(i).map(|t| t.to_ascii_lowercase())
}

fn is(tokens: &[String], i: usize, word: &str) -> bool {
    tokens.get(i).is_some_and(|t| t.eq_ignore_ascii_case(word))
}

fn position_of(tokens: &[String], word: &str) -> Option<usize> {
    tokens.iter().position(|t| t.eq_ignore_ascii_case(word))
}

/// Tokenize and check the statement is one the proxy can dispatch.
///
/// Returns the tokens, whether the statement is supported, and whether it
/// carries a FROM clause.
pub fn check_query(q: &str) -> (Vec<String>, bool, bool) {
    let tokens = scan_tokens(q);
    let from = position_of(&tokens, "from").is_some();

    let valid = match keyword(&tokens, 0).as_deref() {
        Some("select") => from && position_of(&tokens, "into").is_none(),
        Some("show") => matches!(
            keyword(&tokens, 1).as_deref(),
            Some("databases" | "measurements" | "series" | "field" | "tag" | "retention" | "measurement")
        ),
        Some("delete") => true,
        Some("drop") => matches!(
            keyword(&tokens, 1).as_deref(),
            Some("measurement" | "series" | "database" | "retention")
        ),
        Some("create") | Some("alter") => matches!(
            keyword(&tokens, 1).as_deref(),
            Some("database" | "retention")
        ),
        _ => false,
    };
    (tokens, valid, from)
}

/// Database facts carried by the statement itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseClass {
    /// The statement names its database (`ON db`, `CREATE DATABASE db`).
    pub explicit: bool,
    /// `SHOW DATABASES`.
    pub show_databases: bool,
    /// `CREATE DATABASE` or `DROP DATABASE`.
    pub alter_database: bool,
    /// The named database, when `explicit`.
    pub database: Option<String>,
}

/// Classify the statement's relation to databases.
pub fn classify_database(tokens: &[String]) -> DatabaseClass {
    if is(tokens, 0, "show") && is(tokens, 1, "databases") {
        return DatabaseClass {
            show_databases: true,
            ..Default::default()
        };
    }
    if (is(tokens, 0, "create") || is(tokens, 0, "drop")) && is(tokens, 1, "database") {
        let database = tokens.get(2).map(|t| unquote(t));
        return DatabaseClass {
            explicit: database.is_some(),
            alter_database: true,
            database,
            ..Default::default()
        };
    }
    match position_of(tokens, "on").and_then(|i| tokens.get(i + 1)) {
        Some(db) => DatabaseClass {
            explicit: true,
            database: Some(unquote(db)),
            ..Default::default()
        },
        None => DatabaseClass::default(),
    }
}

/// Best-effort database from a fully qualified FROM target
/// (`db.rp.measurement` or `db..measurement`).
pub fn database_from_body(tokens: &[String]) -> Option<String> {
    let target = position_of(tokens, "from").and_then(|i| tokens.get(i + 1))?;
    let parts = split_dotted(target);
    match parts.as_slice() {
        [db, _, _] if !db.is_empty() => Some(db.clone()),
        _ => None,
    }
}

/// Measurement targeted by a FROM clause or `DROP MEASUREMENT`.
pub fn measurement_from_tokens(tokens: &[String]) -> Option<String> {
    let target = if is(tokens, 0, "drop") && is(tokens, 1, "measurement") {
        tokens.get(2)?
    } else {
        position_of(tokens, "from").and_then(|i| tokens.get(i + 1))?
    };
    split_dotted(target).pop().filter(|m| !m.is_empty())
}

pub fn is_select_or_show(tokens: &[String]) -> bool {
    is(tokens, 0, "select") || is(tokens, 0, "show")
}

/// `DELETE`, `DROP MEASUREMENT` or `DROP SERIES`.
pub fn is_delete_or_drop_measurement(tokens: &[String]) -> bool {
    is(tokens, 0, "delete")
        || (is(tokens, 0, "drop") && (is(tokens, 1, "measurement") || is(tokens, 1, "series")))
}

/// `CREATE`, `ALTER` or `DROP RETENTION POLICY`.
pub fn is_retention_policy_statement(tokens: &[String]) -> bool {
    (is(tokens, 0, "create") || is(tokens, 0, "alter") || is(tokens, 0, "drop"))
        && is(tokens, 1, "retention")
        && is(tokens, 2, "policy")
}
