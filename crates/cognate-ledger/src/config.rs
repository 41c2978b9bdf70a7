use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Configuration for a ledger instance.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// first_sequence = 1000
/// max_page_size = 200
/// read_timeout_ms = 5000
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Sequence assigned to the first (genesis-linked) entry.
    pub first_sequence: u64,
    /// Page size used when a query does not set one.
    pub default_page_size: u32,
    /// Upper bound on page size and cursor limit.
    pub max_page_size: u32,
    /// Check index/entry-set consistency before serving a query from indexes.
    pub index_spot_checks: bool,
    /// Default cooperative deadline for `verify` and `query`.
    pub read_timeout_ms: Option<u64>,
    /// Sign each content hash when a signer is installed.
    pub sign_entries: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            first_sequence: 1,
            default_page_size: 50,
            max_page_size: 500,
            index_spot_checks: true,
            read_timeout_ms: None,
            sign_entries: false,
        }
    }
}

impl LedgerConfig {
    /// Parse a configuration from TOML.
    pub fn from_toml_str(source: &str) -> Result<Self, LedgerError> {
        let config: Self =
            toml::from_str(source).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    /// Reject settings no ledger can run with.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.first_sequence == 0 {
            return Err(LedgerError::Config("first_sequence must be at least 1".into()));
        }
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(LedgerError::Config("page sizes must be at least 1".into()));
        }
        if self.default_page_size > self.max_page_size {
            return Err(LedgerError::Config(format!(
                "default_page_size {} exceeds max_page_size {}",
                self.default_page_size, self.max_page_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = LedgerConfig::default();
        assert_eq!(c.first_sequence, 1);
        assert_eq!(c.default_page_size, 50);
        assert_eq!(c.max_page_size, 500);
        assert!(c.index_spot_checks);
        assert!(c.read_timeout().is_none());
        assert!(!c.sign_entries);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = LedgerConfig::from_toml_str("first_sequence = 1000\nread_timeout_ms = 250\n").unwrap();
        assert_eq!(c.first_sequence, 1000);
        assert_eq!(c.read_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(c.max_page_size, 500);
    }

    #[test]
    fn rejects_inconsistent_page_sizes() {
        let err = LedgerConfig::from_toml_str("default_page_size = 900\n").unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }

    #[test]
    fn rejects_zero_first_sequence() {
        assert!(LedgerConfig::from_toml_str("first_sequence = 0").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.toml");
        std::fs::write(&path, "max_page_size = 20\ndefault_page_size = 10\n").unwrap();
        let c = LedgerConfig::load(&path).unwrap();
        assert_eq!(c.max_page_size, 20);
        assert_eq!(c.default_page_size, 10);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = LedgerConfig::load("/nonexistent/ledger.toml").unwrap_err();
        assert!(matches!(err, LedgerError::Io(_)));
    }
}
