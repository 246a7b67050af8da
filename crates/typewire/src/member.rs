// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Builder-time description of one type-tree node.
//!
//! A `Member` is the mutable, ordinary-tree form of a type: a code, a field
//! name, an optional type id and ordered children. It exists only to be fed
//! into [`TypeDef`](crate::TypeDef) compilation. All structural rules are
//! enforced at construction, never at compile time.

use crate::error::TypeError;
use crate::typecode::TypeCode;

/// One node of a type description tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub(crate) code: TypeCode,
    pub(crate) name: String,
    pub(crate) id: String,
    pub(crate) children: Vec<Member>,
}

fn validate_name(name: &str) -> Result<(), TypeError> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) => {
            (c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if ok {
        Ok(())
    } else {
        Err(TypeError::InvalidName(name.to_string()))
    }
}

fn is_compound(code: TypeCode) -> bool {
    matches!(code.scalar_of(), TypeCode::STRUCT | TypeCode::UNION)
}

macro_rules! scalar_ctor {
    ($($fn_name:ident => $code:ident),* $(,)?) => {
        $(
            #[doc = concat!("Shorthand for a `", stringify!($code), "` member.")]
            pub fn $fn_name(name: impl Into<String>) -> Result<Member, TypeError> {
                Member::scalar(TypeCode::$code, name)
            }
        )*
    };
}

macro_rules! scalar_array_ctor {
    ($($fn_name:ident => $code:ident),* $(,)?) => {
        $(
            #[doc = concat!("Shorthand for a `", stringify!($code), "` array member.")]
            pub fn $fn_name(name: impl Into<String>) -> Result<Member, TypeError> {
                Member::scalar(TypeCode::$code.array_of(), name)
            }
        )*
    };
}

impl Member {
    /// General constructor; validates all structural rules.
    ///
    /// An empty `name` is permitted only for the anonymous top node of a
    /// [`TypeDef`](crate::TypeDef).
    pub fn new(
        code: TypeCode,
        name: impl Into<String>,
        id: impl Into<String>,
        children: Vec<Member>,
    ) -> Result<Member, TypeError> {
        let name = name.into();
        let id = id.into();
        if !name.is_empty() {
            validate_name(&name)?;
        }
        if !id.is_empty() && !is_compound(code) {
            return Err(TypeError::IdOnNonCompound(code));
        }
        if !children.is_empty() && !is_compound(code) {
            return Err(TypeError::ChildrenOnNonCompound(code));
        }
        Ok(Member {
            code,
            name,
            id,
            children,
        })
    }

    /// A member without id or children. Valid for any non-Struct/Union code,
    /// including `Any` and scalar arrays, and for an empty Struct/Union.
    pub fn scalar(code: TypeCode, name: impl Into<String>) -> Result<Member, TypeError> {
        Member::new(code, name, String::new(), Vec::new())
    }

    /// A Struct member with type id and children.
    pub fn structure(
        name: impl Into<String>,
        id: impl Into<String>,
        children: Vec<Member>,
    ) -> Result<Member, TypeError> {
        Member::new(TypeCode::STRUCT, name, id, children)
    }

    /// A Union member with type id and alternatives.
    pub fn union_of(
        name: impl Into<String>,
        id: impl Into<String>,
        children: Vec<Member>,
    ) -> Result<Member, TypeError> {
        Member::new(TypeCode::UNION, name, id, children)
    }

    /// An array-of-Struct member; `id` and `children` describe the element.
    pub fn struct_array(
        name: impl Into<String>,
        id: impl Into<String>,
        children: Vec<Member>,
    ) -> Result<Member, TypeError> {
        Member::new(TypeCode::STRUCT_ARRAY, name, id, children)
    }

    /// An array-of-Union member; `id` and `children` describe the element.
    pub fn union_array(
        name: impl Into<String>,
        id: impl Into<String>,
        children: Vec<Member>,
    ) -> Result<Member, TypeError> {
        Member::new(TypeCode::UNION_ARRAY, name, id, children)
    }

    scalar_ctor! {
        bool_field => BOOL,
        int8 => INT8,
        int16 => INT16,
        int32 => INT32,
        int64 => INT64,
        uint8 => UINT8,
        uint16 => UINT16,
        uint32 => UINT32,
        uint64 => UINT64,
        float32 => FLOAT32,
        float64 => FLOAT64,
        string => STRING,
        any => ANY,
    }

    scalar_array_ctor! {
        bool_array => BOOL,
        int8_array => INT8,
        int16_array => INT16,
        int32_array => INT32,
        int64_array => INT64,
        uint8_array => UINT8,
        uint16_array => UINT16,
        uint32_array => UINT32,
        uint64_array => UINT64,
        float32_array => FLOAT32,
        float64_array => FLOAT64,
        string_array => STRING,
        any_array => ANY,
    }

    /// Append one child, with the same validation as construction.
    pub fn add_child(&mut self, child: Member) -> Result<(), TypeError> {
        if !is_compound(self.code) {
            return Err(TypeError::ChildrenOnNonCompound(self.code));
        }
        self.children.push(child);
        Ok(())
    }

    pub fn code(&self) -> TypeCode {
        self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn children(&self) -> &[Member] {
        &self.children
    }
}
