// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compiled type representation.
//!
//! A type tree compiles into a single flat `Vec<FieldDesc>` in preorder: a
//! Struct node at index `i` with subtree size `s` owns exactly the slots
//! `[i, i+s)`, so any field's whole subtree is addressable as a contiguous
//! range and a parent is one subtraction away. Union alternatives and the
//! element type of a compound array are not part of that range; each lives
//! in its own nested compiled array hanging off the owning slot.
//!
//! Compiled arrays are immutable and shared by reference. Rebuilding a type
//! always produces a new array; holders of the old one are unaffected.

use crate::member::Member;
use crate::typecode::TypeCode;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Index;
use std::sync::Arc;

/// One slot of a compiled type.
#[derive(Debug, Clone)]
pub struct FieldDesc {
    pub(crate) code: TypeCode,
    pub(crate) id: String,
    /// Structural identity: folds the code, the id and, recursively, every
    /// child name and child hash. Equal hashes are the cheap precondition
    /// for value assignment between separately compiled types.
    pub(crate) hash: u64,
    /// Distance back to the enclosing Struct's slot; 0 at a subtree root.
    pub(crate) parent_index: usize,
    /// Subtree extent in the owning array, including this slot.
    pub(crate) size: usize,
    /// Name to relative-index lookup. For Structs this includes flattened
    /// dotted paths of inline sub-structs; for Unions the index addresses
    /// the nested alternatives array instead.
    pub(crate) mlookup: HashMap<String, usize>,
    /// Declaration-order (name, relative index) list for iteration.
    pub(crate) miter: Vec<(String, usize)>,
    /// Union alternatives or compound-array element type.
    pub(crate) members: Option<CompiledType>,
}

impl FieldDesc {
    pub fn code(&self) -> TypeCode {
        self.code
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn parent_index(&self) -> usize {
        self.parent_index
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Relative index of a (possibly dotted) member name.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.mlookup.get(name).copied()
    }

    /// Members in declaration order.
    pub fn member_names(&self) -> impl Iterator<Item = (&str, usize)> {
        self.miter.iter().map(|(n, i)| (n.as_str(), *i))
    }

    pub fn member_count(&self) -> usize {
        self.miter.len()
    }

    /// Nested compiled array: Union alternatives, or the element type of a
    /// StructA/UnionA wrapper.
    pub fn members(&self) -> Option<&CompiledType> {
        self.members.as_ref()
    }
}

/// An immutable, reference-counted compiled type.
#[derive(Debug, Clone)]
pub struct CompiledType {
    defs: Arc<Vec<FieldDesc>>,
}

impl CompiledType {
    pub(crate) fn new(defs: Vec<FieldDesc>) -> CompiledType {
        debug_assert!(!defs.is_empty());
        CompiledType {
            defs: Arc::new(defs),
        }
    }

    /// Compile a member tree. The tree must already satisfy the member
    /// invariants, which `Member` construction enforces.
    pub fn compile(top: &Member) -> CompiledType {
        let mut defs = Vec::new();
        build_tree(&mut defs, top);
        CompiledType::new(defs)
    }

    pub fn root(&self) -> &FieldDesc {
        &self.defs[0]
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FieldDesc> {
        self.defs.get(index)
    }

    pub fn defs(&self) -> &[FieldDesc] {
        &self.defs
    }

    /// Same underlying allocation, i.e. compiled by the same build.
    pub fn same_as(&self, other: &CompiledType) -> bool {
        Arc::ptr_eq(&self.defs, &other.defs)
    }
}

impl Index<usize> for CompiledType {
    type Output = FieldDesc;

    fn index(&self, index: usize) -> &FieldDesc {
        &self.defs[index]
    }
}

fn str_hash(s: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// Recursive preorder emission with backfill.
///
/// Children of a Struct append to the parent's own array so the subtree
/// stays contiguous; Union alternatives and compound-array element types go
/// to a fresh nested array so each is self-contained.
pub(crate) fn build_tree(out: &mut Vec<FieldDesc>, node: &Member) {
    let code = node.code;

    if code == TypeCode::STRUCT_ARRAY || code == TypeCode::UNION_ARRAY {
        // A compound array compiles to a one-slot wrapper around the
        // element's scalar compiled type.
        let element = Member {
            code: code.scalar_of(),
            name: node.name.clone(),
            id: node.id.clone(),
            children: node.children.clone(),
        };
        let mut elem_defs = Vec::new();
        build_tree(&mut elem_defs, &element);
        let hash = u64::from(code.raw()) ^ elem_defs[0].hash;
        out.push(FieldDesc {
            code,
            id: String::new(),
            hash,
            parent_index: 0,
            size: 1,
            mlookup: HashMap::new(),
            miter: Vec::new(),
            members: Some(CompiledType::new(elem_defs)),
        });
        return;
    }

    let index = out.len();
    out.push(FieldDesc {
        code,
        id: node.id.clone(),
        hash: u64::from(code.raw()) ^ str_hash(&node.id),
        parent_index: 0,
        size: 1,
        mlookup: HashMap::new(),
        miter: Vec::new(),
        members: None,
    });

    match code {
        TypeCode::STRUCT => {
            for child in &node.children {
                let cindex = out.len();
                build_tree(out, child); // may push many slots
                let rel = cindex - index;
                out[cindex].parent_index = rel;
                let child_hash = out[cindex].hash;
                let child_is_struct = out[cindex].code == TypeCode::STRUCT;
                // Inline sub-structs contribute flattened dotted paths.
                let dotted: Vec<(String, usize)> = if child_is_struct {
                    out[cindex]
                        .mlookup
                        .iter()
                        .map(|(k, v)| (format!("{}.{}", child.name, k), rel + v))
                        .collect()
                } else {
                    Vec::new()
                };
                let fld = &mut out[index];
                fld.hash ^= str_hash(&child.name) ^ child_hash;
                fld.mlookup.insert(child.name.clone(), rel);
                fld.miter.push((child.name.clone(), rel));
                fld.mlookup.extend(dotted);
            }
            out[index].size = out.len() - index;
        }
        TypeCode::UNION => {
            let mut alts = Vec::new();
            for child in &node.children {
                let cindex = alts.len();
                build_tree(&mut alts, child);
                let child_hash = alts[cindex].hash;
                let fld = &mut out[index];
                fld.hash ^= str_hash(&child.name) ^ child_hash;
                fld.mlookup.insert(child.name.clone(), cindex);
                fld.miter.push((child.name.clone(), cindex));
            }
            if !alts.is_empty() {
                out[index].members = Some(CompiledType::new(alts));
            }
        }
        _ => {}
    }
}

fn show_defs(f: &mut fmt::Formatter<'_>, defs: &[FieldDesc], level: usize) -> fmt::Result {
    let mut idx = 0;
    while idx < defs.len() {
        let fld = &defs[idx];
        let pad = "    ".repeat(level);
        writeln!(
            f,
            "{pad}[{idx}] {} {} parent=[{}]  [{idx}:{})",
            fld.code,
            fld.id,
            idx - fld.parent_index,
            idx + fld.size,
        )?;
        match fld.code {
            TypeCode::STRUCT => {
                let mut keys: Vec<_> = fld.mlookup.iter().collect();
                keys.sort();
                for (name, rel) in keys {
                    writeln!(f, "{pad}    {name} -> {rel} [{}]", idx + rel)?;
                }
                for (name, rel) in &fld.miter {
                    writeln!(f, "{pad}    {name} :  {rel} [{}]", idx + rel)?;
                }
            }
            TypeCode::UNION => {
                let mut keys: Vec<_> = fld.mlookup.iter().collect();
                keys.sort();
                for (name, rel) in keys {
                    writeln!(f, "{pad}    {name} -> {rel} [{rel}]")?;
                }
                if let Some(members) = &fld.members {
                    for (name, rel) in &fld.miter {
                        writeln!(f, "{pad}    {name} :  {rel} [{rel}]")?;
                        show_defs(f, &members.defs()[*rel..*rel + members[*rel].size], level + 1)?;
                    }
                }
            }
            TypeCode::STRUCT_ARRAY | TypeCode::UNION_ARRAY => {
                if let Some(members) = &fld.members {
                    show_defs(f, members.defs(), level + 1)?;
                }
            }
            _ => {}
        }
        idx += 1;
    }
    Ok(())
}

impl fmt::Display for CompiledType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        show_defs(f, self.defs(), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timestamp() -> Member {
        Member::structure(
            "",
            "timeStamp_t",
            vec![
                Member::int64("secondsPastEpoch").expect("member"),
                Member::int32("nanoSeconds").expect("member"),
                Member::int32("userTag").expect("member"),
            ],
        )
        .expect("member")
    }

    #[test]
    fn flat_struct_layout() {
        let compiled = CompiledType::compile(&timestamp());
        assert_eq!(compiled.len(), 4);
        let root = compiled.root();
        assert_eq!(root.code(), TypeCode::STRUCT);
        assert_eq!(root.id(), "timeStamp_t");
        assert_eq!(root.size(), 4);
        assert_eq!(root.parent_index(), 0);
        assert_eq!(root.lookup("secondsPastEpoch"), Some(1));
        assert_eq!(root.lookup("nanoSeconds"), Some(2));
        assert_eq!(root.lookup("userTag"), Some(3));
        for idx in 1..4 {
            assert_eq!(compiled[idx].size(), 1);
            assert_eq!(idx - compiled[idx].parent_index(), 0);
        }
        assert_eq!(compiled[1].code(), TypeCode::INT64);
        assert_eq!(compiled[2].code(), TypeCode::INT32);
        let order: Vec<_> = root.member_names().map(|(n, _)| n.to_string()).collect();
        assert_eq!(order, ["secondsPastEpoch", "nanoSeconds", "userTag"]);
    }

    #[test]
    fn nested_struct_contiguous_with_dotted_paths() {
        let top = Member::structure(
            "",
            "outer_t",
            vec![
                Member::float64("value").expect("member"),
                Member::structure(
                    "alarm",
                    "alarm_t",
                    vec![
                        Member::int32("severity").expect("member"),
                        Member::string("message").expect("member"),
                    ],
                )
                .expect("member"),
                Member::int32("count").expect("member"),
            ],
        )
        .expect("member");
        let compiled = CompiledType::compile(&top);
        assert_eq!(compiled.len(), 6);
        let root = compiled.root();
        assert_eq!(root.size(), 6);
        assert_eq!(root.lookup("alarm"), Some(2));
        assert_eq!(root.lookup("alarm.severity"), Some(3));
        assert_eq!(root.lookup("alarm.message"), Some(4));
        assert_eq!(root.lookup("count"), Some(5));
        // alarm subtree is the contiguous range [2, 5)
        assert_eq!(compiled[2].size(), 3);
        assert_eq!(compiled[2].parent_index(), 2);
        assert_eq!(compiled[3].parent_index(), 1);
        assert_eq!(compiled[4].parent_index(), 2);
        assert_eq!(compiled[5].parent_index(), 5);
    }

    #[test]
    fn union_alternatives_not_contiguous() {
        let top = Member::structure(
            "",
            "",
            vec![Member::union_of(
                "value",
                "",
                vec![
                    Member::int32("ival").expect("member"),
                    Member::float64("dval").expect("member"),
                    Member::structure("sval", "s_t", vec![Member::int32("x").expect("member")])
                        .expect("member"),
                ],
            )
            .expect("member")],
        )
        .expect("member");
        let compiled = CompiledType::compile(&top);
        // the union occupies one slot of the outer array
        assert_eq!(compiled.len(), 2);
        let uni = &compiled[1];
        assert_eq!(uni.code(), TypeCode::UNION);
        assert_eq!(uni.size(), 1);
        let alts = uni.members().expect("alternatives");
        assert_eq!(uni.lookup("ival"), Some(0));
        assert_eq!(uni.lookup("dval"), Some(1));
        assert_eq!(uni.lookup("sval"), Some(2));
        assert_eq!(alts[0].code(), TypeCode::INT32);
        assert_eq!(alts[2].code(), TypeCode::STRUCT);
        assert_eq!(alts[2].size(), 2);
        assert_eq!(alts.len(), 4);
    }

    #[test]
    fn struct_array_wraps_element_type() {
        let top = Member::struct_array(
            "",
            "dimension_t",
            vec![
                Member::int32("size").expect("member"),
                Member::int32("offset").expect("member"),
            ],
        )
        .expect("member");
        let compiled = CompiledType::compile(&top);
        assert_eq!(compiled.len(), 1);
        let wrap = compiled.root();
        assert_eq!(wrap.code(), TypeCode::STRUCT_ARRAY);
        assert_eq!(wrap.id(), "");
        let elem = wrap.members().expect("element type");
        assert_eq!(elem.len(), 3);
        assert_eq!(elem.root().code(), TypeCode::STRUCT);
        assert_eq!(elem.root().id(), "dimension_t");
        assert_eq!(elem.root().lookup("offset"), Some(2));
    }

    #[test]
    fn hash_distinguishes_structure() {
        let a = CompiledType::compile(&timestamp());
        let b = CompiledType::compile(&timestamp());
        assert_eq!(a.root().hash(), b.root().hash());
        assert!(!a.same_as(&b));

        let renamed = Member::structure(
            "",
            "timeStamp_t",
            vec![
                Member::int64("secondsPastEpoch").expect("member"),
                Member::int32("nanoSeconds").expect("member"),
                Member::int32("userData").expect("member"),
            ],
        )
        .expect("member");
        let c = CompiledType::compile(&renamed);
        assert_ne!(a.root().hash(), c.root().hash());

        // element type feeds the wrapper hash of a compound array
        let arr_a = CompiledType::compile(
            &Member::struct_array("", "e_t", vec![Member::int32("x").expect("member")])
                .expect("member"),
        );
        let arr_b = CompiledType::compile(
            &Member::struct_array("", "e_t", vec![Member::int64("x").expect("member")])
                .expect("member"),
        );
        assert_ne!(arr_a.root().hash(), arr_b.root().hash());
    }

    #[test]
    fn display_dump_mentions_layout() {
        let compiled = CompiledType::compile(&timestamp());
        let dump = format!("{compiled}");
        assert!(dump.contains("[0] struct timeStamp_t parent=[0]  [0:4)"));
        assert!(dump.contains("userTag -> 3 [3]"));
    }
}
