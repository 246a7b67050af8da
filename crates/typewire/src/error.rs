// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types, one enum per concern.
//!
//! Definition errors (`TypeError`) are raised synchronously while a type is
//! being described, access errors (`AccessError`) at the point of a typed
//! read or write, wire errors (`WireError`) when a buffer fails to encode
//! or decode. None of them is ever deferred past the call that caused it.

use crate::typecode::{StoreKind, TypeCode};
use std::fmt;

/// Malformed type description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// Field name does not match `[A-Za-z_][A-Za-z0-9_]*`.
    InvalidName(String),
    /// Type id supplied for a code that is not (array of) Struct or Union.
    IdOnNonCompound(TypeCode),
    /// Children supplied for a code that is not (array of) Struct or Union.
    ChildrenOnNonCompound(TypeCode),
    /// A merge attempted to change an existing member between compound and
    /// non-compound kind.
    KindChange(String),
    /// Operation requires a Struct or Union top-level code.
    NotCompound(TypeCode),
    /// The scalar constructor was handed a Struct or Union code.
    NotScalar(TypeCode),
    /// The definition holds no type at all.
    Empty,
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName(name) => write!(f, "invalid field name {name:?}"),
            Self::IdOnNonCompound(code) => {
                write!(f, "only Struct or Union may have an id, not {code}")
            }
            Self::ChildrenOnNonCompound(code) => {
                write!(f, "only (array of) Struct or Union may have members, not {code}")
            }
            Self::KindChange(name) => {
                write!(f, "may not change member {name:?} kind to/from compound")
            }
            Self::NotCompound(code) => {
                write!(f, "operation requires Struct or Union, not {code}")
            }
            Self::NotScalar(code) => {
                write!(f, "{code} requires the compound constructor")
            }
            Self::Empty => write!(f, "empty type definition"),
        }
    }
}

impl std::error::Error for TypeError {}

/// Failed typed access on a [`Value`](crate::Value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The value addresses no field.
    NoField,
    /// The stored kind cannot be coerced to or from the requested type.
    NoConvert {
        stored: StoreKind,
        requested: &'static str,
    },
}

impl AccessError {
    pub(crate) fn no_convert(stored: StoreKind, requested: &'static str) -> Self {
        Self::NoConvert { stored, requested }
    }
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoField => write!(f, "no field"),
            Self::NoConvert { stored, requested } => {
                write!(f, "no convert between {} and {}", stored.name(), requested)
            }
        }
    }
}

impl std::error::Error for AccessError {}

/// Failed wire encode or decode.
///
/// Decode errors are expected for hostile or truncated input; the cursor
/// that produced one is poisoned and must not be trusted further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Input ended before the declared shape was consumed.
    Truncated,
    /// Leading byte is neither a valid type tag nor a cache opcode.
    BadOpcode(u8),
    /// A cache fetch referenced an id never defined on this connection.
    UnknownTypeId(u16),
    /// A decoded definition violates the type-tree invariants.
    BadDefinition(TypeError),
    /// A length-prefixed string is not valid UTF-8.
    BadUtf8,
    /// Union selector out of range for the declared alternatives.
    BadSelector { selector: u8, alternatives: usize },
    /// The in-memory value cannot be represented on the wire.
    Unencodable(&'static str),
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "truncated buffer"),
            Self::BadOpcode(op) => write!(f, "malformed opcode {op:#04x}"),
            Self::UnknownTypeId(id) => write!(f, "unknown type cache id {id}"),
            Self::BadDefinition(err) => write!(f, "bad type definition: {err}"),
            Self::BadUtf8 => write!(f, "string is not valid UTF-8"),
            Self::BadSelector {
                selector,
                alternatives,
            } => write!(
                f,
                "union selector {selector} out of range for {alternatives} alternatives"
            ),
            Self::Unencodable(what) => write!(f, "cannot encode {what}"),
        }
    }
}

impl std::error::Error for WireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::BadDefinition(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TypeError> for WireError {
    fn from(err: TypeError) -> Self {
        Self::BadDefinition(err)
    }
}
