// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for raw allocation.

use crate::Location;

/// Errors a [`RawAllocator`](crate::RawAllocator) can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    /// The backing memory cannot satisfy the request.
    #[error("allocator exhausted on {location}: requested {requested_bytes} bytes, {available_bytes} available")]
    Exhausted {
        requested_bytes: usize,
        available_bytes: usize,
        location: Location,
    },

    /// The allocator does not serve this location.
    #[error("allocator does not serve location {0}")]
    UnsupportedLocation(Location),
}

impl AllocError {
    /// Returns `true` if freeing memory could let the request succeed.
    pub fn is_exhaustion(&self) -> bool {
        matches!(self, AllocError::Exhausted { .. })
    }
}
