use crate::{
    consistency::ConsistencyType,
    cursor::TokenCipher,
    error::InternalError,
    key::{KeyChars, VALUE_SEPARATOR_DEFAULT},
    obs::{MetricsSink, NoopSink},
    query::PageLimits,
};
use std::{fmt, sync::Arc};

pub const MAX_RESULTS_DEFAULT: u32 = 25;
pub const MAX_RESULTS_MAX: u32 = 100;

///
/// TableConfig
///
/// Setup-time settings for one table. Only the table name and token cipher
/// are required; everything else has a default.
///

#[derive(Clone)]
pub struct TableConfig {
    pub table_name: String,
    pub max_results_default: u32,
    pub max_results_max: u32,
    pub consistency_default: ConsistencyType,
    pub value_separator: char,
    /// Trailing character marking a prefix match in query values.
    pub query_wildcard: Option<char>,
    /// Prefix composite key values with the record type name.
    pub type_discriminator: bool,
    pub token_cipher: Arc<dyn TokenCipher>,
    pub fail_delete_if_not_present: bool,
    pub metrics: Arc<dyn MetricsSink>,
}

impl TableConfig {
    #[must_use]
    pub fn new(table_name: impl Into<String>, token_cipher: Arc<dyn TokenCipher>) -> Self {
        Self {
            table_name: table_name.into(),
            max_results_default: MAX_RESULTS_DEFAULT,
            max_results_max: MAX_RESULTS_MAX,
            consistency_default: ConsistencyType::default(),
            value_separator: VALUE_SEPARATOR_DEFAULT,
            query_wildcard: None,
            type_discriminator: false,
            token_cipher,
            fail_delete_if_not_present: false,
            metrics: Arc::new(NoopSink),
        }
    }

    #[must_use]
    pub const fn max_results(mut self, default: u32, max: u32) -> Self {
        self.max_results_default = default;
        self.max_results_max = max;
        self
    }

    #[must_use]
    pub const fn consistency_default(mut self, consistency: ConsistencyType) -> Self {
        self.consistency_default = consistency;
        self
    }

    #[must_use]
    pub const fn value_separator(mut self, separator: char) -> Self {
        self.value_separator = separator;
        self
    }

    #[must_use]
    pub const fn query_wildcard(mut self, wildcard: char) -> Self {
        self.query_wildcard = Some(wildcard);
        self
    }

    #[must_use]
    pub const fn type_discriminator(mut self, enabled: bool) -> Self {
        self.type_discriminator = enabled;
        self
    }

    #[must_use]
    pub const fn fail_delete_if_not_present(mut self, enabled: bool) -> Self {
        self.fail_delete_if_not_present = enabled;
        self
    }

    #[must_use]
    pub fn metrics(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = sink;
        self
    }

    pub(crate) fn key_chars(&self) -> Result<KeyChars, InternalError> {
        Ok(KeyChars::new(self.value_separator, self.query_wildcard)?)
    }

    pub(crate) fn page_limits(&self) -> Result<PageLimits, InternalError> {
        if self.table_name.is_empty() {
            return Err(InternalError::configuration("table name is empty"));
        }
        if self.max_results_default == 0 || self.max_results_default > self.max_results_max {
            return Err(InternalError::configuration(format!(
                "page size default {} must be between 1 and the maximum {}",
                self.max_results_default, self.max_results_max
            )));
        }

        Ok(PageLimits {
            default: self.max_results_default,
            max: self.max_results_max,
        })
    }
}

impl fmt::Debug for TableConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableConfig")
            .field("table_name", &self.table_name)
            .field("max_results_default", &self.max_results_default)
            .field("max_results_max", &self.max_results_max)
            .field("consistency_default", &self.consistency_default)
            .field("value_separator", &self.value_separator)
            .field("query_wildcard", &self.query_wildcard)
            .field("type_discriminator", &self.type_discriminator)
            .field("fail_delete_if_not_present", &self.fail_delete_if_not_present)
            .finish_non_exhaustive()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cursor::Aes256GcmCipher, error::ErrorClass};

    fn config() -> TableConfig {
        TableConfig::new("app", Arc::new(Aes256GcmCipher::new(&[0; 32])))
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = config();

        assert_eq!(config.max_results_default, 25);
        assert_eq!(config.max_results_max, 100);
        assert_eq!(config.consistency_default, ConsistencyType::Indifferent);
        assert_eq!(config.value_separator, ':');
        assert_eq!(config.query_wildcard, None);
        assert!(!config.fail_delete_if_not_present);
        assert!(config.key_chars().is_ok());
    }

    #[test]
    fn invalid_characters_and_limits_are_configuration_errors() {
        let err = config().value_separator('a').key_chars().expect_err("not a symbol");
        assert_eq!(err.class, ErrorClass::Configuration);

        let err = config()
            .query_wildcard(':')
            .key_chars()
            .expect_err("same as separator");
        assert_eq!(err.class, ErrorClass::Configuration);

        let err = config().max_results(200, 100).page_limits().expect_err("default > max");
        assert_eq!(err.class, ErrorClass::Configuration);
    }
}
