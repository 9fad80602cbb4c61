//! # Sound Engine Configuration
//!
//! Configuration types for the sound manager and decoders.

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};

/// Sound engine configuration.
///
/// Controls decode buffer sizing, handle allocation and instance pooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundConfig {
    /// Bytes reserved up front for each decoded sample buffer.
    ///
    /// The buffer grows past this if the file needs it and is shrunk to the
    /// decoded length once decoding finishes.
    ///
    /// Default: 1 MiB.
    #[serde(default = "default_decode_capacity_bytes")]
    pub decode_capacity_bytes: usize,

    /// Maximum number of candidate handles tried when registering an instance.
    ///
    /// Default: 10 000.
    #[serde(default = "default_handle_probe_limit")]
    pub handle_probe_limit: u32,

    /// Maximum pooled instances per (category, path).
    ///
    /// Bounds how many copies of the same effect can overlap.
    ///
    /// Default: 8.
    #[serde(default = "default_max_instances_per_path")]
    pub max_instances_per_path: usize,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            decode_capacity_bytes: default_decode_capacity_bytes(),
            handle_probe_limit: default_handle_probe_limit(),
            max_instances_per_path: default_max_instances_per_path(),
        }
    }
}

impl SoundConfig {
    /// Create a configuration for memory-constrained hosts.
    ///
    /// - Small initial decode reservation (256 KiB)
    /// - At most two overlapping instances per sound
    pub fn low_memory() -> Self {
        Self {
            decode_capacity_bytes: 256 * 1024,
            max_instances_per_path: 2,
            ..Default::default()
        }
    }

    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PlaybackError::InvalidConfig(format!("malformed JSON: {}", e)))?;
        config.validate().map_err(PlaybackError::InvalidConfig)?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.decode_capacity_bytes == 0 {
            return Err("decode_capacity_bytes must be > 0".to_string());
        }

        if self.handle_probe_limit == 0 {
            return Err("handle_probe_limit must be > 0".to_string());
        }

        if self.max_instances_per_path == 0 {
            return Err("max_instances_per_path must be > 0".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_decode_capacity_bytes() -> usize {
    1024 * 1024 // 1 MiB
}

fn default_handle_probe_limit() -> u32 {
    10_000
}

fn default_max_instances_per_path() -> usize {
    8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SoundConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.decode_capacity_bytes, 1024 * 1024);
        assert_eq!(config.handle_probe_limit, 10_000);
        assert_eq!(config.max_instances_per_path, 8);
    }

    #[test]
    fn test_low_memory_config() {
        let config = SoundConfig::low_memory();
        assert!(config.validate().is_ok());
        assert!(config.decode_capacity_bytes < SoundConfig::default().decode_capacity_bytes);
        assert_eq!(config.handle_probe_limit, SoundConfig::default().handle_probe_limit);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SoundConfig::default();

        config.decode_capacity_bytes = 0;
        assert!(config.validate().is_err());
        config.decode_capacity_bytes = 1024;

        config.handle_probe_limit = 0;
        assert!(config.validate().is_err());
        config.handle_probe_limit = 16;

        config.max_instances_per_path = 0;
        assert!(config.validate().is_err());
        config.max_instances_per_path = 1;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = SoundConfig::from_json_str(r#"{ "max_instances_per_path": 3 }"#).unwrap();
        assert_eq!(config.max_instances_per_path, 3);
        assert_eq!(config.handle_probe_limit, 10_000);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        let result = SoundConfig::from_json_str(r#"{ "handle_probe_limit": 0 }"#);
        assert!(matches!(result, Err(PlaybackError::InvalidConfig(_))));

        let result = SoundConfig::from_json_str("not json");
        assert!(matches!(result, Err(PlaybackError::InvalidConfig(_))));
    }
}
