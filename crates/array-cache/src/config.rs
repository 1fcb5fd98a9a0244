// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Cache configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! max_cache_bytes = "1G"
//! evict_on_exhaustion = false
//! ```

use crate::{ArrayCacheManager, CacheError, CacheLimit};
use buffer_core::RawAllocator;
use std::path::Path;

/// Configuration for one cache instance.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CacheConfig {
    /// Byte ceiling, human-readable (e.g. `"512M"`, `"0"`, `"unbounded"`).
    #[serde(default = "default_max_cache_bytes")]
    pub max_cache_bytes: String,
    /// Purge unreferenced buffers and retry once when the raw allocator is
    /// exhausted on a miss.
    #[serde(default)]
    pub evict_on_exhaustion: bool,
}

fn default_max_cache_bytes() -> String {
    "1G".to_string()
}

impl CacheConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, CacheError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CacheError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, CacheError> {
        toml::from_str(toml_str).map_err(|e| CacheError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, CacheError> {
        toml::to_string_pretty(self)
            .map_err(|e| CacheError::Config(format!("TOML serialise error: {e}")))
    }

    /// Parses the byte ceiling into a [`CacheLimit`].
    pub fn parse_limit(&self) -> Result<CacheLimit, CacheError> {
        CacheLimit::parse(&self.max_cache_bytes)
    }

    /// Builds a cache in front of `allocator` with these settings.
    pub fn build<A: RawAllocator>(&self, allocator: A) -> Result<ArrayCacheManager<A>, CacheError> {
        let limit = self.parse_limit()?;
        Ok(ArrayCacheManager::new(allocator, limit).with_evict_on_exhaustion(self.evict_on_exhaustion))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cache_bytes: default_max_cache_bytes(),
            evict_on_exhaustion: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buffer_core::HostAllocator;

    #[test]
    fn test_default() {
        let c = CacheConfig::default();
        assert_eq!(c.max_cache_bytes, "1G");
        assert!(!c.evict_on_exhaustion);
        assert_eq!(c.parse_limit().unwrap(), CacheLimit::from_gb(1));
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
max_cache_bytes = "256M"
evict_on_exhaustion = true
"#;
        let c = CacheConfig::from_toml(toml).unwrap();
        assert_eq!(c.max_cache_bytes, "256M");
        assert!(c.evict_on_exhaustion);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let c = CacheConfig::from_toml("").unwrap();
        assert_eq!(c, CacheConfig::default());
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let c = CacheConfig {
            max_cache_bytes: "0".into(),
            evict_on_exhaustion: true,
        };
        let back = CacheConfig::from_toml(&c.to_toml().unwrap()).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_invalid_toml() {
        let err = CacheConfig::from_toml("max_cache_bytes = ").unwrap_err();
        assert!(matches!(err, CacheError::Config(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = CacheConfig::from_file(Path::new("/nonexistent/array-cache.toml")).unwrap_err();
        assert!(err.to_string().contains("cannot read config"));
    }

    #[test]
    fn test_build_applies_settings() {
        let c = CacheConfig {
            max_cache_bytes: "4K".into(),
            evict_on_exhaustion: false,
        };
        let cache = c.build(HostAllocator::new()).unwrap();
        assert_eq!(cache.max_cache_bytes(), 4096);
    }

    #[test]
    fn test_build_rejects_bad_limit() {
        let c = CacheConfig {
            max_cache_bytes: "lots".into(),
            ..Default::default()
        };
        assert!(matches!(
            c.build(HostAllocator::new()),
            Err(CacheError::InvalidLimit(_))
        ));
    }
}
