// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Iteration over compound values.
//!
//! All three modes are forward-only and restartable (obtaining a fresh
//! iterator starts over). They follow the preorder layout of the compiled
//! array, so a depth-first walk is a linear scan. The marked-only walk
//! relies on the ancestor-OR mark invariant: an unmarked compound slot can
//! hide no marked descendant, so its whole subtree is skipped in one step.

use crate::typecode::TypeCode;
use crate::value::Value;

/// Immediate members of a Struct, in declaration order.
pub struct Children {
    parent: Value,
    pos: usize,
}

impl Iterator for Children {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let inst = self.parent.inst.as_ref()?;
        let desc = inst.desc(self.parent.index);
        if desc.code() != TypeCode::STRUCT {
            return None;
        }
        let rel = desc.miter.get(self.pos)?.1;
        self.pos += 1;
        Some(Value {
            inst: self.parent.inst.clone(),
            index: self.parent.index + rel,
        })
    }
}

/// Depth-first walk of a field's subtree, optionally restricted to marked
/// slots.
pub struct Descendants {
    root: Value,
    pos: usize,
    end: usize,
    marked_only: bool,
}

impl Iterator for Descendants {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let inst = self.root.inst.as_ref()?;
        loop {
            if self.pos >= self.end {
                return None;
            }
            let here = self.pos;
            if !self.marked_only {
                self.pos += 1;
                return Some(Value {
                    inst: self.root.inst.clone(),
                    index: self.root.index + here,
                });
            }
            let marked = {
                let guard = inst.fields.read();
                guard[self.root.index + here].marked
            };
            if marked {
                self.pos += 1;
                return Some(Value {
                    inst: self.root.inst.clone(),
                    index: self.root.index + here,
                });
            }
            // unmarked subtree cannot contain marks; jump past it
            self.pos += inst.desc(self.root.index + here).size();
        }
    }
}

impl Value {
    /// Iterate the immediate members of a Struct. Empty for anything else.
    pub fn children(&self) -> Children {
        Children {
            parent: self.clone(),
            pos: 0,
        }
    }

    /// Iterate every descendant field, depth first.
    pub fn descendants(&self) -> Descendants {
        self.walk(false)
    }

    /// Iterate marked descendant fields, skipping untouched branches.
    pub fn marked_descendants(&self) -> Descendants {
        self.walk(true)
    }

    fn walk(&self, marked_only: bool) -> Descendants {
        let end = self.desc().map_or(0, |d| d.size());
        Descendants {
            root: self.clone(),
            pos: 1,
            end,
            marked_only,
        }
    }
}
