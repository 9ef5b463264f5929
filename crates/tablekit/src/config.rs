//! Data-set configuration.

use serde::{Deserialize, Serialize};

/// Connection and notification policy of a [`crate::DataSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSetConfig {
    /// Leave the handle open after each operation. The caller then owns the
    /// explicit [`crate::DataSet::close`].
    pub keep_connection_open: bool,
    /// Start with listener notifications suppressed.
    pub suppress_update_notifications: bool,
    /// Schema version of the table. A stored version that differs causes the
    /// table to be dropped and recreated.
    pub schema_version: i64,
}

impl Default for DataSetConfig {
    fn default() -> Self {
        Self {
            keep_connection_open: false,
            suppress_update_notifications: false,
            schema_version: 1,
        }
    }
}

impl DataSetConfig {
    /// Config that keeps the connection open between operations.
    pub fn keep_open() -> Self {
        Self {
            keep_connection_open: true,
            ..Self::default()
        }
    }

    pub fn with_keep_connection_open(mut self, keep_open: bool) -> Self {
        self.keep_connection_open = keep_open;
        self
    }

    pub fn with_suppressed_notifications(mut self, suppress: bool) -> Self {
        self.suppress_update_notifications = suppress;
        self
    }

    pub fn with_schema_version(mut self, version: i64) -> Self {
        self.schema_version = version;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: DataSetConfig = serde_json::from_str(r#"{"schema_version": 3}"#).unwrap();
        assert!(!config.keep_connection_open);
        assert!(!config.suppress_update_notifications);
        assert_eq!(config.schema_version, 3);
    }

    #[test]
    fn test_keep_open() {
        let config = DataSetConfig::keep_open().with_schema_version(2);
        assert!(config.keep_connection_open);
        assert_eq!(config.schema_version, 2);
    }
}
