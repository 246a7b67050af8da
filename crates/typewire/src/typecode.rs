// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The 8-bit type tag used in compiled types and on the wire.
//!
//! A `TypeCode` packs four orthogonal pieces of information into one byte:
//! the kind (bits 5-7), the element width as a power of two (bits 0-1), a
//! signedness bit for integers (bit 2), and an is-array bit (bit 3). The
//! byte values are wire-protocol constants and must not change.

use std::fmt;

/// Groups of related type codes, extracted from the top three bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Kind {
    Bool = 0x00,
    Integer = 0x20,
    Real = 0x40,
    String = 0x60,
    Compound = 0x80,
    Null = 0xe0,
}

/// Selector for the storage slot a field of a given `TypeCode` occupies.
///
/// Struct fields map to `Null`: a struct slot carries only the mark bit,
/// its members live inline in the same storage array. Union and Any fields
/// hold a nested value; every array kind holds a typed array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Null,
    Bool,
    UInt,
    Int,
    Real,
    String,
    Compound,
    Array,
}

impl StoreKind {
    pub const fn name(self) -> &'static str {
        match self {
            StoreKind::Null => "null",
            StoreKind::Bool => "bool",
            StoreKind::UInt => "uint",
            StoreKind::Int => "int",
            StoreKind::Real => "real",
            StoreKind::String => "string",
            StoreKind::Compound => "compound",
            StoreKind::Array => "array",
        }
    }
}

/// One complete type tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeCode(u8);

impl TypeCode {
    pub const BOOL: TypeCode = TypeCode(0x00);
    pub const INT8: TypeCode = TypeCode(0x20);
    pub const INT16: TypeCode = TypeCode(0x21);
    pub const INT32: TypeCode = TypeCode(0x22);
    pub const INT64: TypeCode = TypeCode(0x23);
    pub const UINT8: TypeCode = TypeCode(0x24);
    pub const UINT16: TypeCode = TypeCode(0x25);
    pub const UINT32: TypeCode = TypeCode(0x26);
    pub const UINT64: TypeCode = TypeCode(0x27);
    pub const FLOAT32: TypeCode = TypeCode(0x42);
    pub const FLOAT64: TypeCode = TypeCode(0x43);
    pub const STRING: TypeCode = TypeCode(0x60);
    pub const STRUCT: TypeCode = TypeCode(0x80);
    pub const UNION: TypeCode = TypeCode(0x81);
    pub const ANY: TypeCode = TypeCode(0x82);
    pub const STRUCT_ARRAY: TypeCode = TypeCode(0x88);
    pub const UNION_ARRAY: TypeCode = TypeCode(0x89);
    pub const ANY_ARRAY: TypeCode = TypeCode(0x8a);
    // 0xfd and 0xfe are reserved on the wire for the type-cache opcodes.
    pub const NULL: TypeCode = TypeCode(0xff);

    pub const fn from_raw(raw: u8) -> TypeCode {
        TypeCode(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub fn kind(self) -> Kind {
        match self.0 & 0xe0 {
            0x00 => Kind::Bool,
            0x20 => Kind::Integer,
            0x40 => Kind::Real,
            0x60 => Kind::String,
            0x80 => Kind::Compound,
            _ => Kind::Null,
        }
    }

    /// Power-of-two element width exponent; `size() == 1 << order()`.
    pub const fn order(self) -> u8 {
        self.0 & 0x03
    }

    /// Element size in bytes. Only meaningful for Bool, Integer and Real.
    pub const fn size(self) -> usize {
        1usize << self.order()
    }

    /// Signedness bit, meaningful for Integer kinds.
    pub const fn is_unsigned(self) -> bool {
        self.0 & 0x04 != 0
    }

    pub const fn is_array(self) -> bool {
        self.0 & 0x08 != 0 && self.0 != 0xff
    }

    /// The array counterpart of this code.
    pub const fn array_of(self) -> TypeCode {
        TypeCode(self.0 | 0x08)
    }

    /// The scalar counterpart of this code.
    pub const fn scalar_of(self) -> TypeCode {
        TypeCode(self.0 & !0x08)
    }

    /// Whether the byte is a defined wire tag. The fixed-size bit (0x10) is
    /// reserved and rejected for every code except Null.
    pub fn valid(self) -> bool {
        if self.0 & 0x10 != 0 && self != TypeCode::NULL {
            return false;
        }
        matches!(
            self.scalar_of(),
            TypeCode::BOOL
                | TypeCode::INT8
                | TypeCode::INT16
                | TypeCode::INT32
                | TypeCode::INT64
                | TypeCode::UINT8
                | TypeCode::UINT16
                | TypeCode::UINT32
                | TypeCode::UINT64
                | TypeCode::FLOAT32
                | TypeCode::FLOAT64
                | TypeCode::STRING
                | TypeCode::STRUCT
                | TypeCode::UNION
                | TypeCode::ANY
        ) || self == TypeCode::NULL
    }

    /// The storage slot tag a field of this code requires.
    pub fn store_kind(self) -> StoreKind {
        if self.is_array() {
            return StoreKind::Array;
        }
        match self.kind() {
            Kind::Bool => StoreKind::Bool,
            Kind::Integer => {
                if self.is_unsigned() {
                    StoreKind::UInt
                } else {
                    StoreKind::Int
                }
            }
            Kind::Real => StoreKind::Real,
            Kind::String => StoreKind::String,
            Kind::Compound => {
                if self == TypeCode::STRUCT {
                    StoreKind::Null
                } else {
                    StoreKind::Compound
                }
            }
            Kind::Null => StoreKind::Null,
        }
    }

    /// Human-readable name, `"int32_t"`, `"double[]"` and so on.
    pub fn name(self) -> &'static str {
        match self.0 {
            0x00 => "bool",
            0x20 => "int8_t",
            0x21 => "int16_t",
            0x22 => "int32_t",
            0x23 => "int64_t",
            0x24 => "uint8_t",
            0x25 => "uint16_t",
            0x26 => "uint32_t",
            0x27 => "uint64_t",
            0x42 => "float",
            0x43 => "double",
            0x60 => "string",
            0x80 => "struct",
            0x81 => "union",
            0x82 => "any",
            0x08 => "bool[]",
            0x28 => "int8_t[]",
            0x29 => "int16_t[]",
            0x2a => "int32_t[]",
            0x2b => "int64_t[]",
            0x2c => "uint8_t[]",
            0x2d => "uint16_t[]",
            0x2e => "uint32_t[]",
            0x2f => "uint64_t[]",
            0x4a => "float[]",
            0x4b => "double[]",
            0x68 => "string[]",
            0x88 => "struct[]",
            0x89 => "union[]",
            0x8a => "any[]",
            0xff => "null",
            _ => "???_t",
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeCode({:#04x} {})", self.0, self.name())
    }
}

impl Default for TypeCode {
    fn default() -> Self {
        TypeCode::NULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_layout() {
        assert_eq!(TypeCode::INT64.kind(), Kind::Integer);
        assert_eq!(TypeCode::INT64.size(), 8);
        assert!(!TypeCode::INT64.is_unsigned());
        assert!(TypeCode::UINT16.is_unsigned());
        assert_eq!(TypeCode::UINT16.size(), 2);
        assert_eq!(TypeCode::FLOAT32.kind(), Kind::Real);
        assert_eq!(TypeCode::FLOAT32.size(), 4);
        assert_eq!(TypeCode::STRING.kind(), Kind::String);
        assert_eq!(TypeCode::STRUCT.kind(), Kind::Compound);
    }

    #[test]
    fn array_round_trip() {
        for code in [
            TypeCode::BOOL,
            TypeCode::INT32,
            TypeCode::FLOAT64,
            TypeCode::STRING,
            TypeCode::STRUCT,
            TypeCode::UNION,
            TypeCode::ANY,
        ] {
            let arr = code.array_of();
            assert!(arr.is_array());
            assert!(!code.is_array());
            assert_eq!(arr.scalar_of(), code);
            assert_eq!(arr.kind(), code.kind());
        }
    }

    #[test]
    fn validity() {
        assert!(TypeCode::INT32.valid());
        assert!(TypeCode::STRUCT_ARRAY.valid());
        assert!(TypeCode::NULL.valid());
        // fixed-size string codes are reserved
        assert!(!TypeCode::from_raw(0x70).valid());
        assert!(!TypeCode::from_raw(0x13).valid());
        assert!(!TypeCode::from_raw(0xfd).valid());
    }

    #[test]
    fn storage_mapping() {
        assert_eq!(TypeCode::BOOL.store_kind(), StoreKind::Bool);
        assert_eq!(TypeCode::INT8.store_kind(), StoreKind::Int);
        assert_eq!(TypeCode::UINT64.store_kind(), StoreKind::UInt);
        assert_eq!(TypeCode::FLOAT64.store_kind(), StoreKind::Real);
        assert_eq!(TypeCode::STRING.store_kind(), StoreKind::String);
        assert_eq!(TypeCode::STRUCT.store_kind(), StoreKind::Null);
        assert_eq!(TypeCode::UNION.store_kind(), StoreKind::Compound);
        assert_eq!(TypeCode::ANY.store_kind(), StoreKind::Compound);
        assert_eq!(TypeCode::STRUCT_ARRAY.store_kind(), StoreKind::Array);
        assert_eq!(TypeCode::INT32.array_of().store_kind(), StoreKind::Array);
    }

    #[test]
    fn names() {
        assert_eq!(TypeCode::INT32.name(), "int32_t");
        assert_eq!(TypeCode::FLOAT64.array_of().name(), "double[]");
        assert_eq!(TypeCode::STRUCT.name(), "struct");
        assert_eq!(format!("{}", TypeCode::UNION_ARRAY), "union[]");
    }
}
