// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generic data container.
//!
//! A `Value` is a lightweight handle pairing a compiled type with shared
//! instance storage, optionally offset to a sub-field. Any number of handles
//! may alias the same storage; the storage lives as long as the longest
//! lived handle, and the compiled type is kept alive by the instance that
//! references it. A default-constructed `Value` addresses nothing and every
//! typed accessor on it fails with [`AccessError::NoField`].
//!
//! Concurrent read-only traversal is safe. Logical mutation of one live
//! value must be serialized by the caller; the lock here only keeps
//! individual slot accesses coherent.

use crate::error::AccessError;
use crate::fielddesc::{CompiledType, FieldDesc};
use crate::storage::{ArrayData, FieldStorage, Store};
use crate::typecode::{Kind, StoreKind, TypeCode};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// One allocated storage block: a compiled type, the slot it is rooted at,
/// and the parallel storage array for that slot's subtree.
pub(crate) struct Instance {
    pub(crate) dtype: CompiledType,
    pub(crate) base: usize,
    pub(crate) fields: RwLock<Vec<FieldStorage>>,
}

impl Instance {
    fn new(dtype: CompiledType, base: usize) -> Arc<Instance> {
        let size = dtype[base].size();
        let fields = (base..base + size)
            .map(|i| FieldStorage::default_for(&dtype[i]))
            .collect();
        Arc::new(Instance {
            dtype,
            base,
            fields: RwLock::new(fields),
        })
    }

    pub(crate) fn desc(&self, index: usize) -> &FieldDesc {
        &self.dtype[self.base + index]
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("base", &self.base)
            .field("size", &self.dtype[self.base].size())
            .finish_non_exhaustive()
    }
}

/// Handle to one field of an instantiated value.
#[derive(Debug, Clone, Default)]
pub struct Value {
    pub(crate) inst: Option<Arc<Instance>>,
    pub(crate) index: usize,
}

impl PartialEq for Value {
    /// Handle equality: both address the same storage slot.
    fn eq(&self, other: &Self) -> bool {
        match (&self.inst, &other.inst) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b) && self.index == other.index,
            (None, None) => true,
            _ => false,
        }
    }
}

impl Value {
    /// Instantiate a compiled type with fresh, default-valued storage.
    pub fn instantiate(dtype: CompiledType) -> Value {
        Value {
            inst: Some(Instance::new(dtype, 0)),
            index: 0,
        }
    }

    pub(crate) fn instantiate_at(dtype: CompiledType, base: usize) -> Value {
        Value {
            inst: Some(Instance::new(dtype, base)),
            index: 0,
        }
    }

    /// Does this handle reference storage at all.
    pub fn is_valid(&self) -> bool {
        self.inst.is_some()
    }

    fn inst(&self) -> Result<&Arc<Instance>, AccessError> {
        self.inst.as_ref().ok_or(AccessError::NoField)
    }

    pub(crate) fn desc(&self) -> Option<&FieldDesc> {
        self.inst.as_ref().map(|i| i.desc(self.index))
    }

    /// Type of the referenced field, or Null for an invalid handle.
    pub fn type_code(&self) -> TypeCode {
        self.desc().map_or(TypeCode::NULL, FieldDesc::code)
    }

    /// Storage tag the referenced field uses.
    pub fn store_kind(&self) -> StoreKind {
        self.type_code().store_kind()
    }

    /// Type id of a Struct or Union field, empty otherwise.
    pub fn id(&self) -> &str {
        self.desc().map_or("", FieldDesc::id)
    }

    pub fn id_starts_with(&self, prefix: &str) -> bool {
        self.id().starts_with(prefix)
    }

    /// Both handles address the same storage slot.
    pub fn same_instance(&self, other: &Value) -> bool {
        self == other
    }

    /// Both handles address the same slot of the same compiled type.
    pub fn same_type(&self, other: &Value) -> bool {
        match (&self.inst, &other.inst) {
            (Some(a), Some(b)) => {
                a.dtype.same_as(&b.dtype) && a.base + self.index == b.base + other.index
            }
            _ => false,
        }
    }

    /// Structural hash of the referenced field's type.
    pub fn type_hash(&self) -> u64 {
        self.desc().map_or(0, FieldDesc::hash)
    }

    // ---- typed access ------------------------------------------------

    /// Extract the field, coercing to `T` where the stored kind allows.
    pub fn get<T: FromStore>(&self) -> Result<T, AccessError> {
        let inst = self.inst()?;
        let guard = inst.fields.read();
        let store = &guard[self.index].store;
        T::from_store(store).ok_or_else(|| AccessError::no_convert(store.kind(), T::LABEL))
    }

    /// Non-failing twin of [`get`](Self::get).
    pub fn try_get<T: FromStore>(&self) -> Option<T> {
        self.get().ok()
    }

    /// Store into the field, coercing from `T` where the slot allows, and
    /// mark the field changed (ancestors included).
    pub fn set<T: IntoStore>(&self, value: T) -> Result<(), AccessError> {
        let inst = self.inst()?;
        let mut guard = inst.fields.write();
        let desc = inst.desc(self.index);
        {
            let slot = &mut guard[self.index];
            let stored = slot.store.kind();
            if !value.put(desc, &mut slot.store) {
                return Err(AccessError::no_convert(stored, T::LABEL));
            }
            slot.marked = true;
        }
        let mut i = self.index;
        loop {
            let back = inst.desc(i).parent_index();
            if back == 0 {
                break;
            }
            i -= back;
            guard[i].marked = true;
        }
        Ok(())
    }

    /// Non-failing twin of [`set`](Self::set).
    pub fn try_set<T: IntoStore>(&self, value: T) -> bool {
        self.set(value).is_ok()
    }

    // ---- path navigation ---------------------------------------------

    /// Resolve a descendant field expression without modifying anything.
    ///
    /// Segments compose: `"alarm.severity"`, `"dimension[0]size"`,
    /// `"value->booleanValue"`. Returns `None` when any segment is absent,
    /// including an unselected union alternative.
    pub fn field(&self, expr: &str) -> Option<Value> {
        self.traverse(expr, false).ok().filter(Value::is_valid)
    }

    /// Like [`field`](Self::field), but instantiates union alternatives
    /// along the path so the result can be written to.
    pub fn select(&self, expr: &str) -> Result<Value, AccessError> {
        self.traverse(expr, true)
    }

    /// Shorthand for `select(expr)?.set(value)`.
    pub fn set_field<T: IntoStore>(&self, expr: &str, value: T) -> Result<(), AccessError> {
        self.select(expr)?.set(value)
    }

    /// Shorthand for a read-only traversal followed by [`get`](Self::get).
    pub fn get_field<T: FromStore>(&self, expr: &str) -> Result<T, AccessError> {
        self.traverse(expr, false)?.get()
    }

    fn traverse(&self, expr: &str, modify: bool) -> Result<Value, AccessError> {
        let mut cur = self.clone();
        if !cur.is_valid() {
            return Err(AccessError::NoField);
        }
        let mut rest = expr;
        while !rest.is_empty() {
            if let Some(tail) = rest.strip_prefix("->") {
                rest = tail;
                continue;
            }
            if let Some(tail) = rest.strip_prefix('.') {
                rest = tail;
                continue;
            }
            if let Some(tail) = rest.strip_prefix('[') {
                let close = tail.find(']').ok_or(AccessError::NoField)?;
                let idx: usize = tail[..close]
                    .trim()
                    .parse()
                    .map_err(|_| AccessError::NoField)?;
                rest = &tail[close + 1..];
                cur = cur.element(idx)?;
                continue;
            }
            let seg_end = rest
                .find(|c: char| c == '.' || c == '[' || c == '-')
                .unwrap_or(rest.len());
            let (seg, tail) = rest.split_at(seg_end);
            if seg.is_empty() {
                return Err(AccessError::NoField);
            }
            rest = tail;
            cur = cur.descend(seg, modify)?;
        }
        Ok(cur)
    }

    fn descend(&self, seg: &str, modify: bool) -> Result<Value, AccessError> {
        let inst = self.inst()?;
        let desc = inst.desc(self.index);
        match desc.code() {
            TypeCode::STRUCT => {
                let rel = desc.lookup(seg).ok_or(AccessError::NoField)?;
                Ok(Value {
                    inst: self.inst.clone(),
                    index: self.index + rel,
                })
            }
            TypeCode::UNION => {
                let alt = desc.lookup(seg).ok_or(AccessError::NoField)?;
                let members = desc.members().ok_or(AccessError::NoField)?.clone();
                {
                    let guard = inst.fields.read();
                    if let Store::Compound(v) = &guard[self.index].store {
                        if v.aliases_alternative(&members, alt) {
                            return Ok(v.clone());
                        }
                    }
                }
                if !modify {
                    return Err(AccessError::NoField);
                }
                let mut guard = inst.fields.write();
                if let Store::Compound(v) = &guard[self.index].store {
                    if v.aliases_alternative(&members, alt) {
                        return Ok(v.clone());
                    }
                }
                let fresh = Value::instantiate_at(members, alt);
                guard[self.index].store = Store::Compound(fresh.clone());
                guard[self.index].marked = true;
                Ok(fresh)
            }
            TypeCode::ANY => {
                let contained = {
                    let guard = inst.fields.read();
                    match &guard[self.index].store {
                        Store::Compound(v) => v.clone(),
                        _ => Value::default(),
                    }
                };
                if !contained.is_valid() {
                    return Err(AccessError::NoField);
                }
                contained.descend(seg, modify)
            }
            _ => Err(AccessError::NoField),
        }
    }

    /// Element of an instantiated array of compound.
    fn element(&self, idx: usize) -> Result<Value, AccessError> {
        let inst = self.inst()?;
        let desc = inst.desc(self.index);
        if !(desc.code().is_array() && desc.code().kind() == Kind::Compound) {
            return Err(AccessError::NoField);
        }
        let guard = inst.fields.read();
        match &guard[self.index].store {
            Store::Array(ArrayData::Values(elems)) => {
                elems.get(idx).cloned().ok_or(AccessError::NoField)
            }
            _ => Err(AccessError::NoField),
        }
    }

    fn aliases_alternative(&self, members: &CompiledType, alt: usize) -> bool {
        match &self.inst {
            Some(inst) => inst.dtype.same_as(members) && inst.base == alt && self.index == 0,
            None => false,
        }
    }

    // ---- marking -----------------------------------------------------

    /// Mark this field changed. `parents` keeps the ancestor-OR invariant
    /// (every enclosing Struct slot marked); `children` bulk-marks the
    /// whole subtree.
    pub fn mark(&self, parents: bool, children: bool) {
        let Some(inst) = &self.inst else { return };
        let mut guard = inst.fields.write();
        guard[self.index].marked = true;
        if children {
            let size = inst.desc(self.index).size();
            for slot in &mut guard[self.index..self.index + size] {
                slot.marked = true;
            }
        }
        if parents {
            let mut i = self.index;
            loop {
                let back = inst.desc(i).parent_index();
                if back == 0 {
                    break;
                }
                i -= back;
                guard[i].marked = true;
            }
        }
    }

    /// Remove marks; the dual of [`mark`](Self::mark).
    pub fn unmark(&self, parents: bool, children: bool) {
        let Some(inst) = &self.inst else { return };
        let mut guard = inst.fields.write();
        guard[self.index].marked = false;
        if children {
            let size = inst.desc(self.index).size();
            for slot in &mut guard[self.index..self.index + size] {
                slot.marked = false;
            }
        }
        if parents {
            let mut i = self.index;
            loop {
                let back = inst.desc(i).parent_index();
                if back == 0 {
                    break;
                }
                i -= back;
                guard[i].marked = false;
            }
        }
    }

    /// Whether this field is marked; `parents` also accepts a marked
    /// ancestor, `children` a marked descendant.
    pub fn is_marked(&self, parents: bool, children: bool) -> bool {
        let Some(inst) = &self.inst else { return false };
        let guard = inst.fields.read();
        if guard[self.index].marked {
            return true;
        }
        if parents {
            let mut i = self.index;
            loop {
                let back = inst.desc(i).parent_index();
                if back == 0 {
                    break;
                }
                i -= back;
                if guard[i].marked {
                    return true;
                }
            }
        }
        if children {
            let size = inst.desc(self.index).size();
            if guard[self.index..self.index + size]
                .iter()
                .any(|slot| slot.marked)
            {
                return true;
            }
        }
        false
    }

    // ---- copying -----------------------------------------------------

    /// Fresh default storage for the same compiled type.
    pub fn clone_empty(&self) -> Result<Value, AccessError> {
        let inst = self.inst()?;
        Ok(Value::instantiate_at(
            inst.dtype.clone(),
            inst.base + self.index,
        ))
    }

    /// Fresh storage holding a deep copy of this field's subtree.
    pub fn clone_value(&self) -> Result<Value, AccessError> {
        let inst = self.inst()?;
        let base = inst.base + self.index;
        let guard = inst.fields.read();
        let size = inst.dtype[base].size();
        let fields: Vec<FieldStorage> = guard[self.index..self.index + size]
            .iter()
            .map(deep_copy)
            .collect();
        Ok(Value {
            inst: Some(Arc::new(Instance {
                dtype: inst.dtype.clone(),
                base,
                fields: RwLock::new(fields),
            })),
            index: 0,
        })
    }

    /// Copy values field-by-field from a value of matching compiled type.
    pub fn assign(&self, other: &Value) -> Result<(), AccessError> {
        let sd = self.desc().ok_or(AccessError::NoField)?;
        let od = other.desc().ok_or(AccessError::NoField)?;
        if sd.code() != od.code() || sd.hash() != od.hash() {
            return Err(AccessError::no_convert(
                od.code().store_kind(),
                "matching compiled type",
            ));
        }
        // deep snapshot first, so overlapping or aliased handles stay sound
        let snapshot = other.clone_value()?;
        let src_inst = snapshot.inst().map_err(|_| AccessError::NoField)?;
        let inst = self.inst()?;
        let src = src_inst.fields.read();
        let mut dst = inst.fields.write();
        let size = sd.size();
        dst[self.index..self.index + size].clone_from_slice(&src[..size]);
        Ok(())
    }

    /// Allocate an element for an array of Struct or array of Union.
    pub fn alloc_member(&self) -> Result<Value, AccessError> {
        let desc = self.desc().ok_or(AccessError::NoField)?;
        match desc.code() {
            TypeCode::STRUCT_ARRAY | TypeCode::UNION_ARRAY => {
                let members = desc.members().ok_or(AccessError::NoField)?;
                Ok(Value::instantiate_at(members.clone(), 0))
            }
            code => Err(AccessError::no_convert(
                code.store_kind(),
                "array of compound member",
            )),
        }
    }

    /// Our (possibly dotted) name for a descendant field.
    pub fn name_of(&self, descendant: &Value) -> Result<String, AccessError> {
        let inst = self.inst()?;
        let dinst = descendant.inst()?;
        if !Arc::ptr_eq(inst, dinst) {
            return Err(AccessError::NoField);
        }
        let desc = inst.desc(self.index);
        let off = descendant
            .index
            .checked_sub(self.index)
            .ok_or(AccessError::NoField)?;
        if off == 0 || off >= desc.size() {
            return Err(AccessError::NoField);
        }
        for (name, rel) in &desc.mlookup {
            if *rel == off {
                return Ok(name.clone());
            }
        }
        Err(AccessError::NoField)
    }
}

fn deep_copy(slot: &FieldStorage) -> FieldStorage {
    let store = match &slot.store {
        Store::Compound(v) if v.is_valid() => {
            Store::Compound(v.clone_value().unwrap_or_default())
        }
        Store::Array(ArrayData::Values(elems)) => Store::Array(ArrayData::Values(
            elems
                .iter()
                .map(|v| {
                    if v.is_valid() {
                        v.clone_value().unwrap_or_default()
                    } else {
                        Value::default()
                    }
                })
                .collect(),
        )),
        other => other.clone(),
    };
    FieldStorage {
        store,
        marked: slot.marked,
    }
}

// ---- conversion traits ----------------------------------------------

/// Extraction from a storage slot; `None` means no meaningful coercion.
pub trait FromStore: Sized {
    const LABEL: &'static str;
    fn from_store(store: &Store) -> Option<Self>;
}

/// Storage into a slot; the slot keeps its tag, the incoming value is
/// coerced to it. Returns false when no meaningful coercion exists.
pub trait IntoStore {
    const LABEL: &'static str;
    fn put(self, desc: &FieldDesc, store: &mut Store) -> bool;
}

macro_rules! impl_numeric_store {
    ($($ty:ty => $label:expr),* $(,)?) => {
        $(
            impl FromStore for $ty {
                const LABEL: &'static str = $label;
                fn from_store(store: &Store) -> Option<Self> {
                    match store {
                        Store::Bool(b) => Some(u8::from(*b) as $ty),
                        Store::UInt(v) => Some(*v as $ty),
                        Store::Int(v) => Some(*v as $ty),
                        Store::Real(v) => Some(*v as $ty),
                        Store::String(s) => s.trim().parse::<$ty>().ok(),
                        _ => None,
                    }
                }
            }

            impl IntoStore for $ty {
                const LABEL: &'static str = $label;
                fn put(self, _desc: &FieldDesc, store: &mut Store) -> bool {
                    match store {
                        Store::UInt(v) => *v = self as u64,
                        Store::Int(v) => *v = self as i64,
                        Store::Real(v) => *v = self as f64,
                        Store::String(s) => *s = self.to_string(),
                        _ => return false,
                    }
                    true
                }
            }
        )*
    };
}

impl_numeric_store! {
    i8 => "i8", i16 => "i16", i32 => "i32", i64 => "i64",
    u8 => "u8", u16 => "u16", u32 => "u32", u64 => "u64",
    f32 => "f32", f64 => "f64",
}

impl FromStore for bool {
    const LABEL: &'static str = "bool";
    fn from_store(store: &Store) -> Option<Self> {
        match store {
            Store::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl IntoStore for bool {
    const LABEL: &'static str = "bool";
    fn put(self, _desc: &FieldDesc, store: &mut Store) -> bool {
        match store {
            Store::Bool(b) => *b = self,
            Store::UInt(v) => *v = u64::from(self),
            Store::Int(v) => *v = i64::from(self),
            Store::String(s) => *s = self.to_string(),
            _ => return false,
        }
        true
    }
}

impl FromStore for String {
    const LABEL: &'static str = "string";
    fn from_store(store: &Store) -> Option<Self> {
        match store {
            Store::Bool(b) => Some(b.to_string()),
            Store::UInt(v) => Some(v.to_string()),
            Store::Int(v) => Some(v.to_string()),
            Store::Real(v) => Some(v.to_string()),
            Store::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl IntoStore for String {
    const LABEL: &'static str = "string";
    fn put(self, desc: &FieldDesc, store: &mut Store) -> bool {
        self.as_str().put(desc, store)
    }
}

impl IntoStore for &str {
    const LABEL: &'static str = "string";
    fn put(self, _desc: &FieldDesc, store: &mut Store) -> bool {
        match store {
            Store::String(s) => *s = self.to_string(),
            Store::Bool(b) => match self.trim().parse() {
                Ok(v) => *b = v,
                Err(_) => return false,
            },
            Store::UInt(v) => match self.trim().parse() {
                Ok(n) => *v = n,
                Err(_) => return false,
            },
            Store::Int(v) => match self.trim().parse() {
                Ok(n) => *v = n,
                Err(_) => return false,
            },
            Store::Real(v) => match self.trim().parse() {
                Ok(n) => *v = n,
                Err(_) => return false,
            },
            _ => return false,
        }
        true
    }
}

impl FromStore for Value {
    const LABEL: &'static str = "value";
    fn from_store(store: &Store) -> Option<Self> {
        match store {
            Store::Compound(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl IntoStore for Value {
    const LABEL: &'static str = "value";
    fn put(self, desc: &FieldDesc, store: &mut Store) -> bool {
        if !self.is_valid() {
            return false;
        }
        match (desc.code(), &mut *store) {
            (TypeCode::ANY, Store::Compound(slot)) => {
                *slot = self;
                true
            }
            (TypeCode::UNION, Store::Compound(slot)) => {
                let Some(members) = desc.members() else {
                    return false;
                };
                let is_alt = desc
                    .member_names()
                    .any(|(_, alt)| self.aliases_alternative(members, alt));
                if !is_alt {
                    return false;
                }
                *slot = self;
                true
            }
            _ => false,
        }
    }
}

impl FromStore for ArrayData {
    const LABEL: &'static str = "array";
    fn from_store(store: &Store) -> Option<Self> {
        match store {
            Store::Array(data) => Some(data.clone()),
            _ => None,
        }
    }
}

impl IntoStore for ArrayData {
    const LABEL: &'static str = "array";
    fn put(self, desc: &FieldDesc, store: &mut Store) -> bool {
        match store {
            Store::Array(slot) if self.matches(desc.code()) => {
                *slot = self;
                true
            }
            _ => false,
        }
    }
}

macro_rules! impl_vec_store {
    ($($ty:ty => $variant:ident, $label:expr),* $(,)?) => {
        $(
            impl FromStore for Vec<$ty> {
                const LABEL: &'static str = $label;
                fn from_store(store: &Store) -> Option<Self> {
                    match store {
                        Store::Array(ArrayData::$variant(v)) => Some(v.clone()),
                        _ => None,
                    }
                }
            }

            impl IntoStore for Vec<$ty> {
                const LABEL: &'static str = $label;
                fn put(self, desc: &FieldDesc, store: &mut Store) -> bool {
                    ArrayData::$variant(self).put(desc, store)
                }
            }
        )*
    };
}

impl_vec_store! {
    bool => Bool, "bool array",
    i8 => Int8, "i8 array",
    i16 => Int16, "i16 array",
    i32 => Int32, "i32 array",
    i64 => Int64, "i64 array",
    u8 => UInt8, "u8 array",
    u16 => UInt16, "u16 array",
    u32 => UInt32, "u32 array",
    u64 => UInt64, "u64 array",
    f32 => Float32, "f32 array",
    f64 => Float64, "f64 array",
    String => String, "string array",
}

impl FromStore for Vec<Value> {
    const LABEL: &'static str = "value array";
    fn from_store(store: &Store) -> Option<Self> {
        match store {
            Store::Array(ArrayData::Values(v)) => Some(v.clone()),
            _ => None,
        }
    }
}

impl IntoStore for Vec<Value> {
    const LABEL: &'static str = "value array";
    fn put(self, desc: &FieldDesc, store: &mut Store) -> bool {
        let code = desc.code();
        let element_ok = |v: &Value| match code {
            TypeCode::STRUCT_ARRAY | TypeCode::UNION_ARRAY => match (&v.inst, desc.members()) {
                (Some(inst), Some(members)) => {
                    inst.dtype.same_as(members) && inst.base == 0 && v.index == 0
                }
                _ => false,
            },
            // AnyA elements are arbitrary, absent elements included
            TypeCode::ANY_ARRAY => true,
            _ => false,
        };
        if !self.iter().all(element_ok) {
            return false;
        }
        ArrayData::Values(self).put(desc, store)
    }
}

// ---- rendering -------------------------------------------------------

fn fmt_scalar(f: &mut fmt::Formatter<'_>, store: &Store) -> fmt::Result {
    match store {
        Store::Null => write!(f, "(null)"),
        Store::Bool(b) => write!(f, "{b}"),
        Store::UInt(v) => write!(f, "{v}"),
        Store::Int(v) => write!(f, "{v}"),
        Store::Real(v) => write!(f, "{v}"),
        Store::String(s) => write!(f, "{s:?}"),
        Store::Compound(v) => {
            if v.is_valid() {
                write!(f, "{v}")
            } else {
                write!(f, "(empty)")
            }
        }
        Store::Array(data) => write!(f, "[{} elements]", data.len()),
    }
}

fn fmt_value(f: &mut fmt::Formatter<'_>, value: &Value, name: &str, level: usize) -> fmt::Result {
    let Some(inst) = &value.inst else {
        return writeln!(f, "(invalid)");
    };
    let desc = inst.desc(value.index);
    let pad = "    ".repeat(level);
    match desc.code() {
        TypeCode::STRUCT => {
            write!(f, "{pad}struct")?;
            if !desc.id().is_empty() {
                write!(f, " {}", desc.id())?;
            }
            if !name.is_empty() {
                write!(f, " {name}")?;
            }
            writeln!(f, " {{")?;
            for (cname, rel) in desc.member_names() {
                let child = Value {
                    inst: value.inst.clone(),
                    index: value.index + rel,
                };
                fmt_value(f, &child, cname, level + 1)?;
            }
            writeln!(f, "{pad}}}")
        }
        _ => {
            write!(f, "{pad}{}", desc.code())?;
            if !name.is_empty() {
                write!(f, " {name}")?;
            }
            write!(f, " = ")?;
            {
                let guard = inst.fields.read();
                fmt_scalar(f, &guard[value.index].store)?;
            }
            writeln!(f)
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_value(f, self, "", 0)
    }
}
