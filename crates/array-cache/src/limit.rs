// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Cache byte ceiling and parsing.
//!
//! A [`CacheLimit`] is the soft upper bound on bytes held by the cache. It
//! supports human-readable string parsing for configuration files and the
//! CLI. Unlike an allocation budget, zero is legal: it disables caching.

use crate::CacheError;
use std::fmt;

const KB: usize = 1024;
const MB: usize = 1024 * 1024;
const GB: usize = 1024 * 1024 * 1024;

/// Maximum number of bytes the cache retains.
///
/// # Parsing
/// Supports human-readable strings with binary suffixes:
/// - `"512M"` or `"512MB"` → 512 × 1024² bytes
/// - `"1G"` or `"1GB"` → 1 × 1024³ bytes
/// - `"2048K"` or `"2048KB"` → 2048 × 1024 bytes
/// - `"1000"` or `"1000B"` → raw byte count
/// - `"0"` → caching disabled
/// - `"unbounded"` → no ceiling
///
/// # Examples
/// ```
/// use array_cache::CacheLimit;
///
/// let l = CacheLimit::from_mb(512);
/// assert_eq!(l.as_bytes(), 512 * 1024 * 1024);
///
/// let l = CacheLimit::parse("1G").unwrap();
/// assert_eq!(l.as_bytes(), 1024 * 1024 * 1024);
///
/// assert!(CacheLimit::parse("0").unwrap().is_disabled());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CacheLimit {
    /// Ceiling in bytes.
    bytes: usize,
}

impl CacheLimit {
    /// Creates a limit from a byte count.
    pub fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    /// Creates a limit from megabytes.
    pub fn from_mb(mb: usize) -> Self {
        Self {
            bytes: mb.saturating_mul(MB),
        }
    }

    /// Creates a limit from gigabytes.
    pub fn from_gb(gb: usize) -> Self {
        Self {
            bytes: gb.saturating_mul(GB),
        }
    }

    /// A ceiling that is never reached.
    pub fn unbounded() -> Self {
        Self { bytes: usize::MAX }
    }

    /// A ceiling of zero: every unreferenced release is closed immediately,
    /// zero-byte buffers included.
    pub fn disabled() -> Self {
        Self { bytes: 0 }
    }

    /// Returns the ceiling in bytes.
    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Returns `true` if caching is disabled.
    pub fn is_disabled(&self) -> bool {
        self.bytes == 0
    }

    /// Returns `true` if there is no ceiling.
    pub fn is_unbounded(&self) -> bool {
        self.bytes == usize::MAX
    }

    /// Parses a human-readable limit string. Case-insensitive.
    pub fn parse(s: &str) -> Result<Self, CacheError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CacheError::InvalidLimit("empty limit string".into()));
        }

        let s_upper = s.to_uppercase();
        if matches!(s_upper.as_str(), "UNBOUNDED" | "UNLIMITED" | "NONE") {
            return Ok(Self::unbounded());
        }

        let (num_str, multiplier) = if s_upper.ends_with("GB") {
            (&s[..s.len() - 2], GB)
        } else if s_upper.ends_with('G') {
            (&s[..s.len() - 1], GB)
        } else if s_upper.ends_with("MB") {
            (&s[..s.len() - 2], MB)
        } else if s_upper.ends_with('M') {
            (&s[..s.len() - 1], MB)
        } else if s_upper.ends_with("KB") {
            (&s[..s.len() - 2], KB)
        } else if s_upper.ends_with('K') {
            (&s[..s.len() - 1], KB)
        } else if s_upper.ends_with('B') {
            (&s[..s.len() - 1], 1)
        } else {
            (s, 1)
        };

        let value: usize = num_str.trim().parse().map_err(|_| {
            CacheError::InvalidLimit(format!(
                "'{s}': expected a number followed by an optional suffix (K, M, G)"
            ))
        })?;

        let bytes = value
            .checked_mul(multiplier)
            .ok_or_else(|| CacheError::InvalidLimit(format!("'{s}' overflows usize")))?;

        Ok(Self { bytes })
    }
}

impl Default for CacheLimit {
    fn default() -> Self {
        Self::from_gb(1)
    }
}

impl fmt::Display for CacheLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unbounded() {
            write!(f, "unbounded")
        } else if self.bytes >= GB && self.bytes % GB == 0 {
            write!(f, "{} GB", self.bytes / GB)
        } else if self.bytes >= MB && self.bytes % MB == 0 {
            write!(f, "{} MB", self.bytes / MB)
        } else if self.bytes >= KB && self.bytes % KB == 0 {
            write!(f, "{} KB", self.bytes / KB)
        } else {
            write!(f, "{} B", self.bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mb() {
        let l = CacheLimit::from_mb(512);
        assert_eq!(l.as_bytes(), 512 * MB);
    }

    #[test]
    fn test_default_is_one_gigabyte() {
        assert_eq!(CacheLimit::default().as_bytes(), GB);
    }

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(CacheLimit::parse("512M").unwrap().as_bytes(), 512 * MB);
        assert_eq!(CacheLimit::parse("512mb").unwrap().as_bytes(), 512 * MB);
        assert_eq!(CacheLimit::parse("2g").unwrap().as_bytes(), 2 * GB);
        assert_eq!(CacheLimit::parse("1024KB").unwrap().as_bytes(), MB);
        assert_eq!(CacheLimit::parse("1000B").unwrap().as_bytes(), 1000);
        assert_eq!(CacheLimit::parse("  1000 ").unwrap().as_bytes(), 1000);
    }

    #[test]
    fn test_parse_zero_disables() {
        let l = CacheLimit::parse("0").unwrap();
        assert!(l.is_disabled());
        assert_eq!(l, CacheLimit::disabled());
    }

    #[test]
    fn test_parse_unbounded() {
        assert!(CacheLimit::parse("unbounded").unwrap().is_unbounded());
        assert!(CacheLimit::parse("Unlimited").unwrap().is_unbounded());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(CacheLimit::parse(""), Err(CacheError::InvalidLimit(_))));
        assert!(CacheLimit::parse("abc").is_err());
        assert!(CacheLimit::parse("-1M").is_err());
        assert!(CacheLimit::parse(&format!("{}G", usize::MAX)).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(CacheLimit::from_gb(1).to_string(), "1 GB");
        assert_eq!(CacheLimit::from_mb(512).to_string(), "512 MB");
        assert_eq!(CacheLimit::from_bytes(2048).to_string(), "2 KB");
        assert_eq!(CacheLimit::from_bytes(1000).to_string(), "1000 B");
        assert_eq!(CacheLimit::unbounded().to_string(), "unbounded");
    }
}
