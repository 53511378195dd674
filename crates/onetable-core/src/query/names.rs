use crate::query::reserved::is_reserved;
use std::collections::BTreeMap;

///
/// ExpressionNames
///
/// Attribute-name alias table for one request. Names that are reserved,
/// start with a digit, or hold anything outside `[A-Za-z0-9_]` are written
/// as `#a0`, `#a1`, ... in expression text.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExpressionNames {
    aliases: BTreeMap<String, String>,
}

impl ExpressionNames {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expression-safe spelling of `name`, allocating an alias if needed.
    pub fn safe(&mut self, name: &str) -> String {
        if !needs_alias(name) {
            return name.to_string();
        }
        if let Some(alias) = self.aliases.get(name) {
            return alias.clone();
        }

        let alias = format!("#a{}", self.aliases.len());
        self.aliases.insert(name.to_string(), alias.clone());

        alias
    }

    /// Attribute name → alias.
    #[must_use]
    pub const fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Alias → attribute name, the shape the store request expects.
    #[must_use]
    pub fn to_request_names(&self) -> BTreeMap<String, String> {
        self.aliases
            .iter()
            .map(|(name, alias)| (alias.clone(), name.clone()))
            .collect()
    }
}

fn needs_alias(name: &str) -> bool {
    let Some(first) = name.chars().next() else {
        return true;
    };

    first.is_ascii_digit()
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        || is_reserved(name)
}

///
/// TESTS
///
