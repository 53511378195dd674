//! Key-statement grammar.
//!
//! One field carries zero or more comma (or newline) separated statements:
//!
//! ```text
//! [[!][+|-|?][index-name]:](pk|sk)[.position][=literal]
//! ```
//!
//! `!` marks the slot preferred, `+`/`-`/`?` pick ascending, descending or
//! unconstrained order, an empty index name selects the primary index, and
//! `=literal` (optionally single-quoted) pins a constant into the slot.

use crate::{
    error::InternalError,
    model::index::{KeyField, KeyPart, KeySource, SortOrder},
};
use thiserror::Error as ThisError;

/// Highest slot position a statement may target.
pub const MAX_KEY_POSITION: usize = 15;

///
/// KeyStatementError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum KeyStatementError {
    #[error("invalid key statement '{statement}' on field '{field}': {reason}")]
    Invalid {
        field: String,
        statement: String,
        reason: &'static str,
    },

    #[error("undefined index '{index}' referenced by field '{field}'")]
    UndefinedIndex { field: String, index: String },

    #[error("index '{index}' has no sort key (field '{field}')")]
    NoSortKey { field: String, index: String },
}

impl From<KeyStatementError> for InternalError {
    fn from(err: KeyStatementError) -> Self {
        Self::configuration(err.to_string())
    }
}

///
/// KeyAssignment
///
/// One parsed statement: which slot of which key attribute the field fills.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyAssignment {
    pub index: String,
    pub part: KeyPart,
    pub position: usize,
    pub key_field: KeyField,
}

/// Parse all statements declared on one field.
///
/// `index_has_sort_key` answers `None` for an undeclared index name and
/// otherwise whether that index has a sort key.
pub fn parse_key_statements(
    field: &str,
    text: &str,
    index_has_sort_key: impl Fn(&str) -> Option<bool>,
) -> Result<Vec<KeyAssignment>, KeyStatementError> {
    let compact: String = text.chars().filter(|c| *c != ' ' && *c != '\t').collect();

    let mut out = Vec::new();
    for statement in compact.split([',', '\n', '\r']) {
        if statement.is_empty() {
            continue;
        }

        let assignment = parse_statement(field, statement)?;
        match index_has_sort_key(&assignment.index) {
            None => {
                return Err(KeyStatementError::UndefinedIndex {
                    field: field.to_string(),
                    index: assignment.index,
                });
            }
            Some(false) if assignment.part == KeyPart::Sort => {
                return Err(KeyStatementError::NoSortKey {
                    field: field.to_string(),
                    index: assignment.index,
                });
            }
            Some(_) => out.push(assignment),
        }
    }

    Ok(out)
}

fn parse_statement(field: &str, statement: &str) -> Result<KeyAssignment, KeyStatementError> {
    let invalid = |reason| KeyStatementError::Invalid {
        field: field.to_string(),
        statement: statement.to_string(),
        reason,
    };

    let (head, literal) = match statement.split_once('=') {
        Some((head, literal)) => {
            let literal = parse_literal(literal)
                .ok_or_else(|| invalid("literal must be a word, optionally single-quoted"))?;
            (head, Some(literal))
        }
        None => (statement, None),
    };

    let (prefix, target) = match head.split_once(':') {
        Some((prefix, target)) => (prefix, target),
        None => ("", head),
    };

    // prefix: [!][+|-|?][index-name]
    let mut rest = prefix;
    let preferred = if let Some(stripped) = rest.strip_prefix('!') {
        rest = stripped;
        true
    } else {
        false
    };
    let order = match rest.chars().next() {
        Some('+') => {
            rest = &rest[1..];
            SortOrder::Asc
        }
        Some('-') => {
            rest = &rest[1..];
            SortOrder::Desc
        }
        Some('?') => {
            rest = &rest[1..];
            SortOrder::Unconstrained
        }
        _ => SortOrder::Asc,
    };
    if !rest.chars().all(is_index_name_char) {
        return Err(invalid("index name may only hold word characters, '-' or '.'"));
    }
    let index = rest.to_string();

    // target: (pk|sk)[.position]
    let (part_text, position) = match target.split_once('.') {
        Some((part, position)) => {
            if position.is_empty() || !position.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid("position must be an unsigned integer"));
            }
            let position: usize = position
                .parse()
                .map_err(|_| invalid("position must be an unsigned integer"))?;
            if position > MAX_KEY_POSITION {
                return Err(invalid("position exceeds the maximum composite key width"));
            }
            (part, position)
        }
        None => (target, 0),
    };
    let part = match part_text {
        "pk" => KeyPart::Partition,
        "sk" => KeyPart::Sort,
        _ => return Err(invalid("key part must be 'pk' or 'sk'")),
    };

    let source = match literal {
        Some(value) => KeySource::Literal(value),
        None => KeySource::Field(field.to_string()),
    };

    Ok(KeyAssignment {
        index,
        part,
        position,
        key_field: KeyField {
            source,
            preferred,
            order,
        },
    })
}

fn parse_literal(text: &str) -> Option<String> {
    let inner = match text.strip_prefix('\'') {
        Some(quoted) => quoted.strip_suffix('\'')?,
        None => text,
    };

    let valid = !inner.is_empty() && inner.chars().all(|c| c.is_alphanumeric() || c == '_');
    valid.then(|| inner.to_string())
}

fn is_index_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn indexes(name: &str) -> Option<bool> {
        match name {
            "" | "gsi1" => Some(true),
            "by-tenant" => Some(false),
            _ => None,
        }
    }

    fn parse(text: &str) -> Result<Vec<KeyAssignment>, KeyStatementError> {
        parse_key_statements("email", text, indexes)
    }

    #[test]
    fn bare_part_targets_primary_slot_zero() {
        let out = parse("pk").expect("valid");

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].index, "");
        assert_eq!(out[0].part, KeyPart::Partition);
        assert_eq!(out[0].position, 0);
        assert_eq!(out[0].key_field, KeyField::field("email".into()));
    }

    #[test]
    fn full_statement_sets_every_flag() {
        let out = parse("!-gsi1:sk.2").expect("valid");

        assert_eq!(
            out,
            vec![KeyAssignment {
                index: "gsi1".into(),
                part: KeyPart::Sort,
                position: 2,
                key_field: KeyField {
                    source: KeySource::Field("email".into()),
                    preferred: true,
                    order: SortOrder::Desc,
                },
            }]
        );
    }

    #[test]
    fn literals_and_multiple_statements() {
        let out = parse("pk.0='User', ?:sk, by-tenant:pk").expect("valid");

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].key_field.source, KeySource::Literal("User".into()));
        assert_eq!(out[1].key_field.order, SortOrder::Unconstrained);
        assert_eq!(out[1].index, "");
        assert_eq!(out[2].index, "by-tenant");

        let bare = parse("gsi1:pk=Tenant").expect("unquoted literal");
        assert_eq!(bare[0].key_field.source, KeySource::Literal("Tenant".into()));
    }

    #[test]
    fn malformed_statements_name_field_and_text() {
        let err = parse("pk,xk").expect_err("bad part");
        assert_eq!(
            err,
            KeyStatementError::Invalid {
                field: "email".into(),
                statement: "xk".into(),
                reason: "key part must be 'pk' or 'sk'",
            }
        );

        assert!(matches!(parse("pk.x"), Err(KeyStatementError::Invalid { .. })));
        assert!(matches!(parse("pk.99"), Err(KeyStatementError::Invalid { .. })));
        assert!(matches!(parse("pk='a-b'"), Err(KeyStatementError::Invalid { .. })));
        assert!(matches!(parse("pk=''"), Err(KeyStatementError::Invalid { .. })));
    }

    #[test]
    fn unknown_index_and_missing_sort_key_are_rejected() {
        assert_eq!(
            parse("nope:pk"),
            Err(KeyStatementError::UndefinedIndex {
                field: "email".into(),
                index: "nope".into(),
            })
        );
        assert_eq!(
            parse("by-tenant:sk"),
            Err(KeyStatementError::NoSortKey {
                field: "email".into(),
                index: "by-tenant".into(),
            })
        );
    }

    proptest! {
        #[test]
        fn parsing_is_deterministic(
            preferred in any::<bool>(),
            order in prop::sample::select(vec!["", "+", "-", "?"]),
            index in prop::sample::select(vec!["", "gsi1"]),
            part in prop::sample::select(vec!["pk", "sk"]),
            position in 0usize..=MAX_KEY_POSITION,
        ) {
            let bang = if preferred { "!" } else { "" };
            let text = format!("{bang}{order}{index}:{part}.{position}");

            let first = parse(&text).expect("valid statement");
            let second = parse(&text).expect("valid statement");

            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first[0].position, position);
            prop_assert_eq!(first[0].key_field.preferred, preferred);
        }
    }
}
