use crate::error::InternalError;
use thiserror::Error as ThisError;

///
/// ConstraintError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ConstraintError {
    #[error("invalid constraint '{text}' on field '{field}'")]
    Invalid { field: String, text: String },

    #[error("constraint on field '{field}' references unknown field '{other}'")]
    UnknownField { field: String, other: String },
}

impl From<ConstraintError> for InternalError {
    fn from(err: ConstraintError) -> Self {
        Self::configuration(err.to_string())
    }
}

///
/// Constraint
///
/// Field-level validity constraint checked before a write.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Constraint {
    /// The tuple (owning field first) must not match any other stored record.
    Unique { fields: Vec<String> },
}

impl Constraint {
    /// Every field whose change requires re-checking this constraint.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        match self {
            Self::Unique { fields } => fields,
        }
    }
}

/// Parse `unique` / `unique(a,b)` statements declared on one field.
pub fn parse_constraints(field: &str, text: &str) -> Result<Vec<Constraint>, ConstraintError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let invalid = || ConstraintError::Invalid {
        field: field.to_string(),
        text: text.to_string(),
    };

    let mut out = Vec::new();
    let mut rest = compact.as_str();
    while !rest.is_empty() {
        let Some(after) = rest.strip_prefix("unique") else {
            return Err(invalid());
        };

        let mut fields = vec![field.to_string()];
        rest = if let Some(args) = after.strip_prefix('(') {
            let (inner, tail) = args.split_once(')').ok_or_else(invalid)?;
            for other in inner.split(',') {
                if other.is_empty() || !other.chars().all(|c| c.is_alphanumeric() || c == '_') {
                    return Err(invalid());
                }
                fields.push(other.to_string());
            }
            tail
        } else {
            after
        };

        out.push(Constraint::Unique { fields });

        rest = match rest.strip_prefix(',') {
            Some(next) if !next.is_empty() => next,
            Some(_) => return Err(invalid()),
            None if rest.is_empty() => rest,
            None => return Err(invalid()),
        };
    }

    Ok(out)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_unique_covers_the_owning_field() {
        assert_eq!(
            parse_constraints("email", "unique"),
            Ok(vec![Constraint::Unique {
                fields: vec!["email".into()]
            }])
        );
    }

    #[test]
    fn tuple_lists_owner_first() {
        let out = parse_constraints("email", "unique( tenant, region )").expect("valid");
        assert_eq!(out[0].fields(), ["email", "tenant", "region"]);
    }

    #[test]
    fn unknown_statements_are_rejected() {
        for text in ["uniq", "unique(", "unique()", "unique(a,,b)", "unique,", "uniquex"] {
            assert!(
                matches!(parse_constraints("email", text), Err(ConstraintError::Invalid { .. })),
                "'{text}' should be rejected"
            );
        }
    }
}
