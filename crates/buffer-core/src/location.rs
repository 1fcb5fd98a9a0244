// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Buffer locations and size-class keys.

use std::fmt;

/// Where a buffer's memory lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Location {
    /// Host (CPU) memory, possibly pinned.
    Host,
    /// Memory on the accelerator with the given ordinal.
    Device(u32),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Host => f.write_str("host"),
            Location::Device(ordinal) => write!(f, "device:{ordinal}"),
        }
    }
}

/// The key under which interchangeable buffers are pooled.
///
/// Two buffers with the same byte size and location can serve each other's
/// requests regardless of the dtype they were created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct SizeClass {
    /// Exact byte size (no bucket rounding).
    pub byte_size: usize,
    /// Memory location.
    pub location: Location,
}

impl SizeClass {
    /// Creates a size class key.
    pub fn new(byte_size: usize, location: Location) -> Self {
        Self {
            byte_size,
            location,
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} B @ {}", self.byte_size, self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        assert_eq!(Location::Host.to_string(), "host");
        assert_eq!(Location::Device(1).to_string(), "device:1");
    }

    #[test]
    fn test_size_class_distinguishes_location() {
        let host = SizeClass::new(100, Location::Host);
        let dev = SizeClass::new(100, Location::Device(0));
        assert_ne!(host, dev);
        assert_eq!(host, SizeClass::new(100, Location::Host));
        assert_eq!(dev.to_string(), "100 B @ device:0");
    }
}
