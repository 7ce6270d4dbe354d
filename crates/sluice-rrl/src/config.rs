//! Rate-limiter configuration.

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors, surfaced at limiter construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A configuration value is out of its permitted range.
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        /// Dotted path of the offending field.
        field: String,
        /// What was wrong with it.
        message: String,
    },
}

impl ConfigError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Response Rate Limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RrlConfig {
    /// Initial (pre-allocated) entry table size.
    pub min_table_size: usize,

    /// Hard cap on live entries; must not be smaller than
    /// `min_table_size`.
    pub max_table_size: usize,

    /// Rate for NOERROR responses; 0 disables limiting for them.
    pub responses_per_second: u32,

    /// Rate for NXDOMAIN responses; 0 disables limiting for them.
    pub nxdomains_per_second: u32,

    /// Rate for error responses; 0 disables limiting for them.
    pub errors_per_second: u32,

    /// Seconds of debt retained; caps how long a penalty can outlive a
    /// flood.
    pub window: u32,

    /// 0 = never truncate; N = every Nth penalized response is truncated
    /// instead of dropped.
    pub slip: u32,

    /// Bits kept when masking IPv4 clients.
    pub ipv4_prefix_len: u8,

    /// Bits kept when masking IPv6 clients.
    pub ipv6_prefix_len: u8,

    /// Compute and log verdicts but let the caller send every response.
    pub log_only: bool,

    /// Client networks never rate limited.
    pub exempt: Vec<IpNet>,
}

impl Default for RrlConfig {
    fn default() -> Self {
        Self {
            min_table_size: 500,
            max_table_size: 100_000,
            responses_per_second: 5,
            nxdomains_per_second: 5,
            errors_per_second: 5,
            window: 15,
            slip: 2,
            ipv4_prefix_len: 24,
            ipv6_prefix_len: 56,
            log_only: false,
            exempt: Vec::new(),
        }
    }
}

impl RrlConfig {
    /// Validates ranges and relationships between options.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ipv4_prefix_len > 32 {
            return Err(ConfigError::invalid("rrl.ipv4_prefix_len", "must be 0-32"));
        }
        if self.ipv6_prefix_len > 128 {
            return Err(ConfigError::invalid("rrl.ipv6_prefix_len", "must be 0-128"));
        }
        if self.min_table_size < 1 {
            return Err(ConfigError::invalid("rrl.min_table_size", "must be at least 1"));
        }
        if self.max_table_size < self.min_table_size {
            return Err(ConfigError::invalid(
                "rrl.max_table_size",
                format!(
                    "must not be smaller than min_table_size ({})",
                    self.min_table_size
                ),
            ));
        }
        if self.window < 1 || self.window > 3600 {
            return Err(ConfigError::invalid("rrl.window", "must be 1-3600 seconds"));
        }
        if self.slip > 100 {
            return Err(ConfigError::invalid("rrl.slip", "must be 0-100"));
        }
        for (field, rate) in [
            ("rrl.responses_per_second", self.responses_per_second),
            ("rrl.nxdomains_per_second", self.nxdomains_per_second),
            ("rrl.errors_per_second", self.errors_per_second),
        ] {
            if rate > 1000 {
                return Err(ConfigError::invalid(field, "must be 0-1000"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RrlConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bad_prefix_lengths() {
        let config = RrlConfig {
            ipv4_prefix_len: 33,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "rrl.ipv4_prefix_len"
        ));

        let config = RrlConfig {
            ipv6_prefix_len: 129,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_table_sizes() {
        let config = RrlConfig {
            min_table_size: 1000,
            max_table_size: 100,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "rrl.max_table_size"
        ));
    }

    #[test]
    fn test_window_range() {
        let config = RrlConfig {
            window: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RrlConfig {
            window: 3601,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: RrlConfig =
            serde_json::from_str(r#"{"responses_per_second": 10, "slip": 3}"#).unwrap();
        assert_eq!(config.responses_per_second, 10);
        assert_eq!(config.slip, 3);
        assert_eq!(config.window, 15);
    }
}
