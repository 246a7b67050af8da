// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire codec for type definitions, with the per-connection type cache.
//!
//! A compiled type travels in one of three forms: a literal definition
//! (leading type tag), a "define and cache" message (`0xfd`, a 16-bit cache
//! id, then the literal definition) or a "fetch" message (`0xfe` and the
//! id alone). The receiver stores defined types in its [`TypeStore`] and
//! substitutes them on fetch, so a type repeated on one connection costs
//! three bytes after the first transmission. Ids are receiver-local and
//! meaningless across connections.

use crate::error::WireError;
use crate::fielddesc::{CompiledType, FieldDesc};
use crate::member::Member;
use crate::typecode::TypeCode;
use crate::wire::{ReadCursor, WriteCursor};
use std::collections::HashMap;

/// Opcode: literal definition follows, receiver caches it under the id.
pub const OP_CACHE_DEFINE: u8 = 0xfd;
/// Opcode: substitute the type previously cached under the id.
pub const OP_CACHE_FETCH: u8 = 0xfe;
/// Opcode: no type (an empty Any).
pub const OP_NULL_TYPE: u8 = 0xff;

/// Per-connection cache of transmitted type definitions.
///
/// Decode populates it from "define" messages; encode consults it to reuse
/// an id for a structurally identical type. A failed decode never commits
/// an entry.
#[derive(Default)]
pub struct TypeStore {
    by_id: HashMap<u16, CompiledType>,
    by_hash: HashMap<u64, u16>,
    next_id: u16,
}

impl TypeStore {
    pub fn new() -> TypeStore {
        TypeStore::default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn lookup(&self, id: u16) -> Option<&CompiledType> {
        self.by_id.get(&id)
    }

    pub fn contains(&self, id: u16) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Register a type under an id, replacing any previous entry.
    pub fn insert(&mut self, id: u16, dtype: CompiledType) {
        self.by_hash.insert(dtype.root().hash(), id);
        self.by_id.insert(id, dtype);
    }

    /// Drop all entries, e.g. when a connection resets.
    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_hash.clear();
        self.next_id = 0;
    }

    fn id_for(&self, hash: u64) -> Option<u16> {
        self.by_hash.get(&hash).copied()
    }

    /// Pick the next free id for an outgoing definition. `None` when the
    /// whole 16-bit space is occupied.
    fn assign(&mut self, dtype: &CompiledType) -> Option<u16> {
        if self.by_id.len() > usize::from(u16::MAX) {
            return None;
        }
        while self.by_id.contains_key(&self.next_id) {
            self.next_id = self.next_id.wrapping_add(1);
        }
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.insert(id, dtype.clone());
        Some(id)
    }
}

/// Encode a compiled type, using the cache: the first transmission is a
/// "define and cache" message, every repeat a three-byte "fetch".
pub fn encode_type(
    w: &mut WriteCursor<'_>,
    dtype: &CompiledType,
    store: &mut TypeStore,
) -> Result<(), WireError> {
    let hash = dtype.root().hash();
    if let Some(id) = store.id_for(hash) {
        log::trace!("type cache fetch id={id}");
        w.write_u8(OP_CACHE_FETCH);
        w.write_u16(id);
        return Ok(());
    }
    match store.assign(dtype) {
        Some(id) => {
            log::debug!("type cache define id={id} {}", dtype.root().code());
            w.write_u8(OP_CACHE_DEFINE);
            w.write_u16(id);
            encode_literal(w, dtype.defs(), 0)
        }
        // cache exhausted; fall back to an uncached literal
        None => encode_literal(w, dtype.defs(), 0),
    }
}

/// Encode a compiled type as a bare literal definition, no cache involved.
pub fn encode_type_literal(
    w: &mut WriteCursor<'_>,
    dtype: &CompiledType,
) -> Result<(), WireError> {
    encode_literal(w, dtype.defs(), 0)
}

pub(crate) fn encode_literal(
    w: &mut WriteCursor<'_>,
    defs: &[FieldDesc],
    idx: usize,
) -> Result<(), WireError> {
    let fld = &defs[idx];
    w.write_u8(fld.code().raw());
    match fld.code() {
        TypeCode::STRUCT => {
            w.write_string(fld.id());
            w.write_size(fld.member_count());
            for (name, rel) in fld.member_names() {
                w.write_string(name);
                encode_literal(w, defs, idx + rel)?;
            }
        }
        TypeCode::UNION => {
            w.write_string(fld.id());
            w.write_size(fld.member_count());
            if let Some(alts) = fld.members() {
                for (name, rel) in fld.member_names() {
                    w.write_string(name);
                    encode_literal(w, alts.defs(), rel)?;
                }
            }
        }
        TypeCode::STRUCT_ARRAY | TypeCode::UNION_ARRAY => {
            let elem = fld
                .members()
                .ok_or(WireError::Unencodable("compound array without element type"))?;
            encode_literal(w, elem.defs(), 0)?;
        }
        _ => {}
    }
    Ok(())
}

/// Decode one type, consulting and updating the cache. A Null tag where a
/// type is required is a decode error.
pub fn decode_type(
    r: &mut ReadCursor<'_>,
    store: &mut TypeStore,
) -> Result<CompiledType, WireError> {
    match decode_type_or_null(r, store)? {
        Some(dtype) => Ok(dtype),
        None => {
            r.fail();
            Err(WireError::BadOpcode(OP_NULL_TYPE))
        }
    }
}

/// Decode one type, mapping the Null tag to `None` (an empty Any).
pub fn decode_type_or_null(
    r: &mut ReadCursor<'_>,
    store: &mut TypeStore,
) -> Result<Option<CompiledType>, WireError> {
    let op = r.peek_u8();
    if !r.good() {
        return Err(WireError::Truncated);
    }
    match op {
        OP_NULL_TYPE => {
            r.read_u8();
            Ok(None)
        }
        OP_CACHE_DEFINE => {
            r.read_u8();
            let id = r.read_u16();
            // fully decode before committing, so a bad message cannot leave
            // a partial cache entry behind
            let member = decode_member(r, String::new())?;
            let dtype = CompiledType::compile(&member);
            log::debug!("type cache define id={id} {}", dtype.root().code());
            store.insert(id, dtype.clone());
            Ok(Some(dtype))
        }
        OP_CACHE_FETCH => {
            r.read_u8();
            let id = r.read_u16();
            if !r.good() {
                return Err(WireError::Truncated);
            }
            match store.lookup(id) {
                Some(dtype) => {
                    log::trace!("type cache fetch id={id}");
                    Ok(Some(dtype.clone()))
                }
                None => {
                    r.fail();
                    Err(WireError::UnknownTypeId(id))
                }
            }
        }
        _ => {
            let member = decode_member(r, String::new())?;
            Ok(Some(CompiledType::compile(&member)))
        }
    }
}

/// Decode one field definition into a validated member tree.
fn decode_member(r: &mut ReadCursor<'_>, name: String) -> Result<Member, WireError> {
    let raw = r.read_u8();
    if !r.good() {
        return Err(WireError::Truncated);
    }
    let code = TypeCode::from_raw(raw);
    match code {
        TypeCode::STRUCT | TypeCode::UNION => {
            let id = r.read_string();
            let count = r.read_size();
            if !r.good() {
                return Err(WireError::Truncated);
            }
            // every member needs at least a name byte and a tag byte
            if count > r.remaining() / 2 {
                r.fail();
                return Err(WireError::Truncated);
            }
            let mut children = Vec::with_capacity(count);
            for _ in 0..count {
                let child_name = r.read_string();
                if !r.good() {
                    return Err(WireError::Truncated);
                }
                children.push(decode_member(r, child_name)?);
            }
            Member::new(code, name, id, children).map_err(|err| {
                r.fail();
                WireError::from(err)
            })
        }
        TypeCode::STRUCT_ARRAY | TypeCode::UNION_ARRAY => {
            let element = decode_member(r, name)?;
            if element.code() != code.scalar_of() {
                r.fail();
                return Err(WireError::BadOpcode(element.code().raw()));
            }
            let name = element.name().to_string();
            let id = element.id().to_string();
            Member::new(code, name, id, element.children().to_vec()).map_err(|err| {
                r.fail();
                WireError::from(err)
            })
        }
        _ if code.valid() && code != TypeCode::NULL => {
            Member::new(code, name, String::new(), Vec::new()).map_err(|err| {
                r.fail();
                WireError::from(err)
            })
        }
        _ => {
            r.fail();
            Err(WireError::BadOpcode(raw))
        }
    }
}
