//! Column specifications and their canonical comparison form.
//!
//! A declared column is a free-form definition string — a type keyword
//! followed by constraint text (`"TEXT NOT NULL DEFAULT 'N/A'"`). An
//! introspected column is a structured `PRAGMA table_info` row. The two
//! representations use different token orders and capitalization, so
//! both are reduced to a canonical key and compared byte-for-byte.
//!
//! The canonical form recognizes exactly four clauses: the base type,
//! `NOT NULL`, `DEFAULT`, and `PRIMARY KEY`. Any other constraint text
//! (`CHECK`, `UNIQUE`, foreign keys, `COLLATE`, `AUTOINCREMENT`, …) is
//! preserved in [`ColumnSpec::raw`] for DDL generation but is invisible
//! to comparison. This is a deliberate scope limitation, not an
//! oversight: widening it would reclassify constraint-only edits as
//! changes and trigger rebuilds the engine cannot verify.

use serde::{Deserialize, Serialize};

/// A column as declared in a schema definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Base type keyword as written (e.g. `INTEGER`).
    pub type_name: String,
    /// Whether the column allows NULL values.
    pub nullable: bool,
    /// Default value text, verbatim and unparsed.
    pub default: Option<String>,
    /// Whether the column is declared `PRIMARY KEY`.
    pub primary_key: bool,
    /// Full original type/constraint text, used verbatim when
    /// generating `CREATE TABLE` and `ADD COLUMN` statements.
    pub raw: String,
}

impl ColumnSpec {
    /// Parses a raw declared definition string.
    ///
    /// The first token is the type keyword; the remainder is scanned
    /// case-insensitively for the `NOT NULL`, `DEFAULT` and
    /// `PRIMARY KEY` clauses. Everything else is kept only in `raw`.
    #[must_use]
    pub fn parse(name: impl Into<String>, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let tokens = tokenize(&raw);

        let type_name = tokens.first().cloned().unwrap_or_default();
        let mut nullable = true;
        let mut primary_key = false;
        let mut default = None;

        let mut i = 1;
        while i < tokens.len() {
            if tokens[i].eq_ignore_ascii_case("NOT")
                && tokens.get(i + 1).is_some_and(|t| t.eq_ignore_ascii_case("NULL"))
            {
                nullable = false;
                i += 2;
            } else if tokens[i].eq_ignore_ascii_case("PRIMARY")
                && tokens.get(i + 1).is_some_and(|t| t.eq_ignore_ascii_case("KEY"))
            {
                primary_key = true;
                i += 2;
            } else if tokens[i].eq_ignore_ascii_case("DEFAULT") {
                if let Some(value) = tokens.get(i + 1) {
                    default = Some(strip_outer_parens(value).to_string());
                    i += 2;
                } else {
                    i += 1;
                }
            } else {
                i += 1;
            }
        }

        Self {
            name: name.into(),
            type_name,
            nullable,
            default,
            primary_key,
            raw,
        }
    }

    /// Returns the canonical comparison key for this column.
    #[must_use]
    pub fn canonical_key(&self) -> String {
        canonical_key(
            &self.type_name,
            self.nullable,
            self.default.as_deref(),
            self.primary_key,
        )
    }
}

/// Builds the canonical comparison key from a column's recognized
/// properties: upper-cased type, then `NOT NULL`, `DEFAULT <value>`,
/// and `PRIMARY KEY` in that fixed order. Two column definitions are
/// equivalent iff their keys are byte-identical.
#[must_use]
pub fn canonical_key(
    type_name: &str,
    nullable: bool,
    default: Option<&str>,
    primary_key: bool,
) -> String {
    let mut key = type_name.to_ascii_uppercase();
    if !nullable {
        key.push_str(" NOT NULL");
    }
    if let Some(value) = default {
        key.push_str(" DEFAULT ");
        key.push_str(value);
    }
    if primary_key {
        key.push_str(" PRIMARY KEY");
    }
    key
}

/// Splits a definition string into tokens, keeping single-quoted
/// strings and parenthesized expressions whole so a `DEFAULT` value
/// like `'a b'` or `(datetime('now'))` survives as one token.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut token = String::new();
        if c == '\'' {
            token.push(c);
            chars.next();
            while let Some(ch) = chars.next() {
                token.push(ch);
                if ch == '\'' {
                    // Doubled quote is an escaped quote, not the end.
                    if chars.peek() == Some(&'\'') {
                        token.push('\'');
                        chars.next();
                    } else {
                        break;
                    }
                }
            }
        } else if c == '(' {
            let mut depth = 0_u32;
            for ch in chars.by_ref() {
                token.push(ch);
                match ch {
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                token.push(ch);
                chars.next();
            }
        }
        tokens.push(token);
    }

    tokens
}

/// Strips one layer of outer parentheses from a default value.
/// `PRAGMA table_info` reports `DEFAULT (expr)` as `expr`, so the
/// declared side must shed the parens to compare equal.
fn strip_outer_parens(value: &str) -> &str {
    value
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
        .map_or(value, str::trim)
}
