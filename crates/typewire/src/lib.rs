// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # typewire - self-describing structured values
//!
//! A runtime for typed, nested data exchanged between peers that share no
//! compiled type definitions, plus the wire codec that moves both the type
//! descriptions and the values themselves.
//!
//! ## Quick Start
//!
//! ```rust
//! use typewire::{Member, TypeDef};
//!
//! let def = TypeDef::structure(
//!     "timeStamp_t",
//!     vec![
//!         Member::int64("secondsPastEpoch")?,
//!         Member::int32("nanoSeconds")?,
//!         Member::int32("userTag")?,
//!     ],
//! )?;
//!
//! let val = def.create()?;
//! val.set_field("secondsPastEpoch", 1_700_000_000i64)?;
//! assert_eq!(val.get_field::<i64>("secondsPastEpoch")?, 1_700_000_000);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Member tree  --compile-->  flat FieldDesc array  --create-->  Value
//!  (builder)                  (immutable, shared)              (storage)
//!                                   |                             |
//!                            encode_type/decode_type       encode_value/
//!                             (TypeStore cache)            decode_value
//! ```
//!
//! A type is described as a [`Member`] tree and compiled into a flat,
//! preorder [`CompiledType`] where every struct subtree is one contiguous
//! index range. Instantiating it yields a [`Value`]: a cheap handle that any
//! number of aliases may share, with typed accessors, dotted-path
//! navigation and per-field change marks. The [`wire`] module moves types
//! and values over a byte stream, caching repeated type definitions per
//! connection in a [`TypeStore`] so a repeat costs three bytes instead of
//! the whole definition.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TypeCode`] | 8-bit tag: kind, width, signedness, is-array |
//! | [`Member`] | Builder-time node of a type description tree |
//! | [`TypeDef`] | Compiles and incrementally extends type definitions |
//! | [`CompiledType`] | Immutable flattened type, shared by reference |
//! | [`Value`] | Handle onto shared instance storage |
//! | [`TypeStore`] | Per-connection wire cache of transmitted types |
//!
//! This crate does no I/O and never blocks: the transport collaborator owns
//! sockets, framing and buffering, and calls in here to decode message
//! bodies or serialize outgoing ones.

/// Error types: definition, access and wire failures.
pub mod error;
/// Compiled, flattened type representation.
pub mod fielddesc;
/// Iteration over compound values.
pub mod iter;
/// Builder-time type description nodes.
pub mod member;
/// Per-instance tagged storage slots.
pub mod storage;
/// The 8-bit type tag.
pub mod typecode;
/// Incremental type builder.
pub mod typedef;
/// Generic data container.
pub mod value;
/// Wire codec for types and values.
pub mod wire;

pub use error::{AccessError, TypeError, WireError};
pub use fielddesc::{CompiledType, FieldDesc};
pub use iter::{Children, Descendants};
pub use member::Member;
pub use storage::{ArrayData, Store};
pub use typecode::{Kind, StoreKind, TypeCode};
pub use typedef::TypeDef;
pub use value::{FromStore, IntoStore, Value};
pub use wire::{
    decode_type, decode_value, encode_type, encode_type_literal, encode_value, ReadCursor,
    TypeStore, WriteCursor,
};
