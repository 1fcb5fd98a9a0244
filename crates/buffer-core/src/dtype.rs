// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Supported array element data types.

use std::fmt;

/// Enumerates the numeric types an array buffer can hold.
///
/// The cache itself pools by byte size only; `DType` is used to turn an
/// allocation request `(dtype, element_count)` into an exact byte size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 64-bit IEEE 754 floating point.
    F64,
    /// 32-bit IEEE 754 floating point.
    F32,
    /// 16-bit IEEE 754 floating point.
    F16,
    /// 16-bit brain floating point.
    BF16,
    /// 64-bit signed integer.
    I64,
    /// 32-bit signed integer.
    I32,
    /// 16-bit signed integer.
    I16,
    /// 8-bit signed integer (for quantised weights).
    I8,
    /// 64-bit unsigned integer.
    U64,
    /// 32-bit unsigned integer.
    U32,
    /// 16-bit unsigned integer.
    U16,
    /// 8-bit unsigned integer.
    U8,
    /// Boolean, stored as one byte per element.
    Bool,
}

impl DType {
    /// Returns the size of a single element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            DType::F64 | DType::I64 | DType::U64 => 8,
            DType::F32 | DType::I32 | DType::U32 => 4,
            DType::F16 | DType::BF16 | DType::I16 | DType::U16 => 2,
            DType::I8 | DType::U8 | DType::Bool => 1,
        }
    }

    /// Computes the exact byte size of `element_count` elements.
    ///
    /// Returns `None` on arithmetic overflow. No rounding is applied: the
    /// result is the size class the cache will look up.
    pub fn byte_size_of(self, element_count: usize) -> Option<usize> {
        element_count.checked_mul(self.size_bytes())
    }

    /// Returns a human-readable label for this data type.
    pub fn as_str(self) -> &'static str {
        match self {
            DType::F64 => "f64",
            DType::F32 => "f32",
            DType::F16 => "f16",
            DType::BF16 => "bf16",
            DType::I64 => "i64",
            DType::I32 => "i32",
            DType::I16 => "i16",
            DType::I8 => "i8",
            DType::U64 => "u64",
            DType::U32 => "u32",
            DType::U16 => "u16",
            DType::U8 => "u8",
            DType::Bool => "bool",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_bytes() {
        assert_eq!(DType::F64.size_bytes(), 8);
        assert_eq!(DType::F32.size_bytes(), 4);
        assert_eq!(DType::BF16.size_bytes(), 2);
        assert_eq!(DType::Bool.size_bytes(), 1);
    }

    #[test]
    fn test_byte_size_of() {
        assert_eq!(DType::F32.byte_size_of(25), Some(100));
        assert_eq!(DType::I64.byte_size_of(1), Some(8));
        assert_eq!(DType::U8.byte_size_of(0), Some(0));
    }

    #[test]
    fn test_byte_size_overflow() {
        assert_eq!(DType::F64.byte_size_of(usize::MAX), None);
        assert_eq!(DType::U8.byte_size_of(usize::MAX), Some(usize::MAX));
    }

    #[test]
    fn test_display_and_serde() {
        assert_eq!(DType::BF16.to_string(), "bf16");
        let json = serde_json::to_string(&DType::F32).unwrap();
        assert_eq!(json, "\"f32\"");
        let back: DType = serde_json::from_str("\"i64\"").unwrap();
        assert_eq!(back, DType::I64);
    }
}
