// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Incremental type builder.
//!
//! A `TypeDef` owns a member tree and the compiled array built from it.
//! Extending a definition recompiles from scratch into a fresh array; any
//! previously created values keep their own compiled type untouched. The
//! member tree is copy-on-write: when two `TypeDef`s share a top node, the
//! first one to be extended clones it before mutating.

use crate::error::TypeError;
use crate::fielddesc::{CompiledType, FieldDesc};
use crate::member::Member;
use crate::typecode::{Kind, TypeCode};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Define a new type, from scratch or based on an existing [`Value`].
///
/// ```
/// use typewire::{Member, TypeDef};
///
/// let def = TypeDef::structure(
///     "timeStamp_t",
///     vec![
///         Member::int64("secondsPastEpoch")?,
///         Member::int32("nanoSeconds")?,
///         Member::int32("userTag")?,
///     ],
/// )?;
/// let val = def.create()?;
/// val.set_field("nanoSeconds", 42i32)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct TypeDef {
    top: Option<Arc<Member>>,
    compiled: Option<CompiledType>,
}

fn is_compound(code: TypeCode) -> bool {
    matches!(code.scalar_of(), TypeCode::STRUCT | TypeCode::UNION)
}

/// Merge one adopted member into an existing tree. Same-named members merge
/// recursively; a kind change between compound and non-compound is refused.
fn append_tree(node: &mut Member, adopt: Member) -> Result<(), TypeError> {
    match node
        .children
        .iter()
        .position(|c| c.name == adopt.name)
    {
        Some(pos) => {
            let existing = &mut node.children[pos];
            if (existing.code.kind() == Kind::Compound) != (adopt.code.kind() == Kind::Compound) {
                return Err(TypeError::KindChange(adopt.name));
            }
            existing.code = adopt.code;
            if !adopt.id.is_empty() {
                existing.id = adopt.id;
            }
            for grandchild in adopt.children {
                append_tree(existing, grandchild)?;
            }
            Ok(())
        }
        None => {
            node.children.push(adopt);
            Ok(())
        }
    }
}

/// Inverse of compilation: walk a compiled array back into a member tree.
fn member_from(defs: &[FieldDesc], idx: usize, name: &str) -> Member {
    let fld = &defs[idx];
    match fld.code() {
        TypeCode::STRUCT => Member {
            code: fld.code(),
            name: name.to_string(),
            id: fld.id().to_string(),
            children: fld
                .member_names()
                .map(|(n, rel)| member_from(defs, idx + rel, n))
                .collect(),
        },
        TypeCode::UNION => Member {
            code: fld.code(),
            name: name.to_string(),
            id: fld.id().to_string(),
            children: match fld.members() {
                Some(alts) => fld
                    .member_names()
                    .map(|(n, rel)| member_from(alts.defs(), rel, n))
                    .collect(),
                None => Vec::new(),
            },
        },
        TypeCode::STRUCT_ARRAY | TypeCode::UNION_ARRAY => match fld.members() {
            Some(elem) => {
                let element = member_from(elem.defs(), 0, name);
                Member {
                    code: fld.code(),
                    name: name.to_string(),
                    id: element.id,
                    children: element.children,
                }
            }
            None => Member {
                code: fld.code(),
                name: name.to_string(),
                id: String::new(),
                children: Vec::new(),
            },
        },
        code => Member {
            code,
            name: name.to_string(),
            id: String::new(),
            children: Vec::new(),
        },
    }
}

impl TypeDef {
    /// New definition with code, id and children. Fails when children or id
    /// are paired with a code that cannot carry them.
    pub fn new(
        code: TypeCode,
        id: impl Into<String>,
        children: Vec<Member>,
    ) -> Result<TypeDef, TypeError> {
        let top = Member::new(code, "", id, children)?;
        let compiled = CompiledType::compile(&top);
        Ok(TypeDef {
            top: Some(Arc::new(top)),
            compiled: Some(compiled),
        })
    }

    /// New definition for a single non-compound field.
    pub fn scalar(code: TypeCode) -> Result<TypeDef, TypeError> {
        if is_compound(code) {
            return Err(TypeError::NotScalar(code));
        }
        TypeDef::new(code, "", Vec::new())
    }

    /// New Struct definition.
    pub fn structure(id: impl Into<String>, children: Vec<Member>) -> Result<TypeDef, TypeError> {
        TypeDef::new(TypeCode::STRUCT, id, children)
    }

    /// New Union definition.
    pub fn union_of(id: impl Into<String>, children: Vec<Member>) -> Result<TypeDef, TypeError> {
        TypeDef::new(TypeCode::UNION, id, children)
    }

    /// Pre-populate a definition from an existing value's compiled type, so
    /// further edits can be layered on. An invalid value yields an empty
    /// definition.
    pub fn from_value(value: &Value) -> TypeDef {
        let Some(inst) = &value.inst else {
            return TypeDef::default();
        };
        let base = inst.base + value.index;
        let top = member_from(inst.dtype.defs(), base, "");
        let compiled = CompiledType::compile(&top);
        TypeDef {
            top: Some(Arc::new(top)),
            compiled: Some(compiled),
        }
    }

    /// Append additional children, merging with existing ones by name, and
    /// recompile. Only for Struct or Union definitions.
    ///
    /// On error the definition is left empty rather than holding a partially
    /// merged tree.
    pub fn append(&mut self, children: Vec<Member>) -> Result<&mut TypeDef, TypeError> {
        let top = self.top.take().ok_or(TypeError::Empty)?;
        if !matches!(top.code, TypeCode::STRUCT | TypeCode::UNION) {
            let code = top.code;
            self.top = Some(top);
            return Err(TypeError::NotCompound(code));
        }
        self.compiled = None;
        // clone only when another holder shares the tree
        let mut edit = match Arc::try_unwrap(top) {
            Ok(member) => member,
            Err(shared) => (*shared).clone(),
        };
        for child in children {
            append_tree(&mut edit, child)?;
        }
        let compiled = CompiledType::compile(&edit);
        self.top = Some(Arc::new(edit));
        self.compiled = Some(compiled);
        Ok(self)
    }

    /// Instantiate a value with fresh, default-valued storage.
    pub fn create(&self) -> Result<Value, TypeError> {
        let compiled = self.compiled.as_ref().ok_or(TypeError::Empty)?;
        Ok(Value::instantiate(compiled.clone()))
    }

    /// The compiled form, if the definition is non-empty.
    pub fn compiled(&self) -> Option<&CompiledType> {
        self.compiled.as_ref()
    }

    /// The member tree, if the definition is non-empty.
    pub fn top(&self) -> Option<&Member> {
        self.top.as_deref()
    }
}

fn show_node(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    node: &Member,
    level: usize,
) -> fmt::Result {
    write!(f, "{}", node.code)?;
    if !node.id.is_empty() {
        write!(f, " \"{}\"", node.id)?;
    }
    if node.children.is_empty() {
        if !name.is_empty() {
            write!(f, " {name}")?;
        }
        writeln!(f)
    } else {
        writeln!(f, " {{")?;
        for child in &node.children {
            write!(f, "{}", "    ".repeat(level + 1))?;
            show_node(f, &child.name, child, level + 1)?;
        }
        write!(f, "{}}}", "    ".repeat(level))?;
        if !name.is_empty() {
            write!(f, " {name}")?;
        }
        writeln!(f)
    }
}

impl fmt::Display for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.top {
            Some(top) => show_node(f, "", top, 0),
            None => writeln!(f, "<Empty>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timestamp_def() -> TypeDef {
        TypeDef::structure(
            "timeStamp_t",
            vec![
                Member::int64("secondsPastEpoch").expect("member"),
                Member::int32("nanoSeconds").expect("member"),
                Member::int32("userTag").expect("member"),
            ],
        )
        .expect("typedef")
    }

    #[test]
    fn scalar_definition() {
        let def = TypeDef::scalar(TypeCode::INT32).expect("typedef");
        let val = def.create().expect("create");
        assert_eq!(val.type_code(), TypeCode::INT32);
        assert_eq!(val.get::<i32>().expect("get"), 0);

        assert_eq!(
            TypeDef::scalar(TypeCode::STRUCT).unwrap_err(),
            TypeError::NotScalar(TypeCode::STRUCT)
        );
        assert_eq!(
            TypeDef::scalar(TypeCode::UNION_ARRAY).unwrap_err(),
            TypeError::NotScalar(TypeCode::UNION_ARRAY)
        );
    }

    #[test]
    fn empty_definition_cannot_create() {
        let def = TypeDef::default();
        assert_eq!(def.create().unwrap_err(), TypeError::Empty);
    }

    #[test]
    fn append_merges_by_name() {
        let mut def = timestamp_def();
        def.append(vec![
            Member::int32("userTag").expect("member"), // existing, same kind
            Member::string("source").expect("member"), // new
        ])
        .expect("append");
        let compiled = def.compiled().expect("compiled").clone();
        assert_eq!(compiled.len(), 5);
        assert_eq!(compiled.root().lookup("source"), Some(4));
        // merged member keeps its slot
        assert_eq!(compiled.root().lookup("userTag"), Some(3));
    }

    #[test]
    fn append_refuses_kind_change() {
        let mut def = timestamp_def();
        let err = def
            .append(vec![
                Member::structure("userTag", "", vec![]).expect("member")
            ])
            .unwrap_err();
        assert_eq!(err, TypeError::KindChange("userTag".to_string()));
        // failed append leaves the definition empty, not half merged
        assert_eq!(def.create().unwrap_err(), TypeError::Empty);
    }

    #[test]
    fn append_does_not_disturb_other_holders() {
        let base = timestamp_def();
        let shared = base.clone();
        let before = base.compiled().expect("compiled").clone();

        let mut extended = shared;
        extended
            .append(vec![Member::int32("count").expect("member")])
            .expect("append");

        let after = base.compiled().expect("compiled");
        assert!(before.same_as(after));
        assert_eq!(after.len(), 4);
        assert_eq!(after.root().lookup("count"), None);
        assert_eq!(
            extended.compiled().expect("compiled").root().lookup("count"),
            Some(4)
        );
    }

    #[test]
    fn append_to_scalar_fails() {
        let mut def = TypeDef::scalar(TypeCode::INT32).expect("typedef");
        let err = def
            .append(vec![Member::int32("x").expect("member")])
            .unwrap_err();
        assert_eq!(err, TypeError::NotCompound(TypeCode::INT32));
        // still usable
        assert!(def.create().is_ok());
    }

    #[test]
    fn round_trip_through_value() {
        let def = TypeDef::structure(
            "everything_t",
            vec![
                Member::float64_array("value").expect("member"),
                Member::structure(
                    "alarm",
                    "alarm_t",
                    vec![
                        Member::int32("severity").expect("member"),
                        Member::string("message").expect("member"),
                    ],
                )
                .expect("member"),
                Member::union_of(
                    "choice",
                    "",
                    vec![
                        Member::int32("ival").expect("member"),
                        Member::float64("dval").expect("member"),
                    ],
                )
                .expect("member"),
                Member::struct_array(
                    "dimension",
                    "dimension_t",
                    vec![Member::int32("size").expect("member")],
                )
                .expect("member"),
                Member::any("attachment").expect("member"),
            ],
        )
        .expect("typedef");
        let val = def.create().expect("create");

        let mut round = TypeDef::from_value(&val);
        let a = def.compiled().expect("compiled");
        let b = round.compiled().expect("compiled");
        assert_eq!(a.len(), b.len());
        assert_eq!(a.root().hash(), b.root().hash());
        for idx in 0..a.len() {
            assert_eq!(a[idx].code(), b[idx].code());
            assert_eq!(a[idx].id(), b[idx].id());
            assert_eq!(a[idx].parent_index(), b[idx].parent_index());
        }

        // layering an edit on the round-tripped definition works
        round
            .append(vec![Member::int32("extra").expect("member")])
            .expect("append");
        let extended = round.compiled().expect("compiled");
        assert!(extended.root().lookup("extra").is_some());
        assert!(a.root().lookup("extra").is_none());
    }

    #[test]
    fn display_shows_tree() {
        let text = format!("{}", timestamp_def());
        assert!(text.contains("struct \"timeStamp_t\""));
        assert!(text.contains("int64_t secondsPastEpoch"));
        assert!(format!("{}", TypeDef::default()).contains("<Empty>"));
    }
}
