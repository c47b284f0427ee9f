//! Markup element tree
//!
//! Elements live in a slotmap arena owned by an `InfoTree`. Each element keeps
//! its children twice: in document order, and in a name index for lookups
//! (sibling names repeat, e.g. several `screen` blocks). Both views are only
//! ever changed through `link` / `unlink`, so they cannot drift apart.
//!
//! ## Shapes
//! ```text
//! Value       name: 5
//! ValueList   name: 1, 2, 3
//! ValueBlock  name 5 { ... }
//! Block       name { ... }
//! ```

use std::collections::BTreeMap;
use std::ops::Index;
use std::path::PathBuf;

use slotmap::{new_key_type, SlotMap};
use thunderstorm_common::{Error, Result};

use crate::enums::{enum_value, EnumEntry};
use crate::variable::{VarType, Variable};

new_key_type! {
    /// Identifies an element inside its `InfoTree`.
    pub struct ElemId;
}

/// What an element carries: a scalar, children, or both
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElemShape {
    Value,
    ValueList,
    ValueBlock,
    Block,
}

impl ElemShape {
    pub fn has_children(self) -> bool {
        self > ElemShape::Value
    }

    pub fn has_value(self) -> bool {
        matches!(self, ElemShape::Value | ElemShape::ValueBlock)
    }

    pub fn name(self) -> &'static str {
        match self {
            ElemShape::Value => "value",
            ElemShape::ValueList => "value-list",
            ElemShape::ValueBlock => "value-block",
            ElemShape::Block => "block",
        }
    }
}

/// A single element
#[derive(Debug, Clone)]
pub struct InfoElem {
    name: String,
    shape: ElemShape,
    value: Variable,
    parent: Option<ElemId>,
    children: Vec<ElemId>,
    index: BTreeMap<String, Vec<ElemId>>,
}

impl InfoElem {
    fn new(name: String, shape: ElemShape) -> Self {
        Self {
            name,
            shape,
            value: Variable::Undefined,
            parent: None,
            children: Vec::new(),
            index: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> ElemShape {
        self.shape
    }

    pub fn value(&self) -> &Variable {
        &self.value
    }

    pub fn parent(&self) -> Option<ElemId> {
        self.parent
    }

    /// Children in document order
    pub fn children(&self) -> &[ElemId] {
        &self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Filter for `InfoTree::find_child_matching`
#[derive(Debug, Clone, Copy)]
pub struct ChildQuery<'a> {
    name: &'a str,
    shape: Option<ElemShape>,
    kind: Option<VarType>,
    recursive: bool,
}

impl<'a> ChildQuery<'a> {
    pub fn named(name: &'a str) -> Self {
        Self {
            name,
            shape: None,
            kind: None,
            recursive: false,
        }
    }

    pub fn shape(mut self, shape: ElemShape) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn kind(mut self, kind: VarType) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Search all descendants when this level has no match
    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    fn accepts(&self, elem: &InfoElem) -> bool {
        self.shape.map_or(true, |s| elem.shape == s)
            && self.kind.map_or(true, |k| elem.value.kind() == k)
    }
}

/// Arena of elements plus the optional document root
#[derive(Debug, Clone, Default)]
pub struct InfoTree {
    nodes: SlotMap<ElemId, InfoElem>,
    root: Option<ElemId>,
}

impl Index<ElemId> for InfoTree {
    type Output = InfoElem;

    fn index(&self, id: ElemId) -> &InfoElem {
        &self.nodes[id]
    }
}

fn stale(id: ElemId) -> Error {
    Error::InvalidPtr(format!("element {id:?} is not part of this tree"))
}

impl InfoTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ElemId) -> Option<&InfoElem> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: ElemId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of live elements, attached or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Read-only view of `id`, if it is still alive
    pub fn elem_ref(&self, id: ElemId) -> Option<ElemRef<'_>> {
        self.nodes
            .contains_key(id)
            .then_some(ElemRef { tree: self, id })
    }

    fn node(&self, id: ElemId) -> Result<&InfoElem> {
        self.nodes.get(id).ok_or_else(|| stale(id))
    }

    fn node_mut(&mut self, id: ElemId) -> Result<&mut InfoElem> {
        self.nodes.get_mut(id).ok_or_else(|| stale(id))
    }

    // ------------------------------------------------------------------------
    // Root
    // ------------------------------------------------------------------------

    pub fn root(&self) -> Option<ElemId> {
        self.root
    }

    pub fn root_ref(&self) -> Option<ElemRef<'_>> {
        self.root.and_then(|id| self.elem_ref(id))
    }

    /// Replace the root with a fresh, empty block
    pub fn create_root(&mut self, name: impl Into<String>) -> ElemId {
        self.release_root();
        let id = self.create(name, ElemShape::Block);
        self.root = Some(id);
        id
    }

    pub fn release_root(&mut self) {
        if let Some(root) = self.root.take() {
            self.destroy(root);
        }
    }

    // ------------------------------------------------------------------------
    // Creation and destruction
    // ------------------------------------------------------------------------

    /// New element that is not attached anywhere yet
    pub fn create(&mut self, name: impl Into<String>, shape: ElemShape) -> ElemId {
        self.nodes.insert(InfoElem::new(name.into(), shape))
    }

    pub fn create_child(
        &mut self,
        parent: ElemId,
        name: impl Into<String>,
        shape: ElemShape,
    ) -> Result<ElemId> {
        self.check_parent(parent)?;
        let child = self.create(name, shape);
        self.link(parent, child, None);
        Ok(child)
    }

    /// Create a plain value child holding `value`
    pub fn create_value(
        &mut self,
        parent: ElemId,
        name: impl Into<String>,
        value: impl Into<Variable>,
    ) -> Result<ElemId> {
        let child = self.create_child(parent, name, ElemShape::Value)?;
        self.nodes[child].value = value.into();
        Ok(child)
    }

    /// Attach a detached element as the last child of `parent`
    pub fn add_child(&mut self, parent: ElemId, child: ElemId) -> Result<()> {
        self.insert_child(parent, usize::MAX, child)
    }

    /// Attach a detached element at `position` (clamped to the child count)
    pub fn insert_child(&mut self, parent: ElemId, position: usize, child: ElemId) -> Result<()> {
        self.check_parent(parent)?;
        let node = self.node(child)?;
        if node.parent.is_some() || self.root == Some(child) {
            return Err(Error::InvalidCall(format!(
                "element \"{}\" is already attached",
                node.name
            )));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(Error::InvalidCall(format!(
                "element \"{}\" cannot become its own descendant",
                node.name
            )));
        }
        self.link(parent, child, Some(position));
        Ok(())
    }

    /// Detach `child` from `parent` and destroy its subtree
    pub fn remove_child(&mut self, parent: ElemId, child: ElemId) -> Result<()> {
        if self.node(child)?.parent != Some(parent) {
            return Err(Error::InvalidParam(format!(
                "{child:?} is not a child of {parent:?}"
            )));
        }
        self.unlink(parent, child);
        self.destroy(child);
        Ok(())
    }

    pub fn remove_all_children(&mut self, parent: ElemId) -> Result<()> {
        let node = self.node_mut(parent)?;
        let children = std::mem::take(&mut node.children);
        node.index.clear();
        for child in children {
            self.destroy(child);
        }
        Ok(())
    }

    /// Detach an element from its parent without destroying it
    pub fn detach(&mut self, id: ElemId) -> Result<()> {
        match self.node(id)?.parent {
            Some(parent) => self.unlink(parent, id),
            None if self.root == Some(id) => self.root = None,
            None => {}
        }
        Ok(())
    }

    /// Detach an element (or clear the root) and destroy its subtree
    pub fn release(&mut self, id: ElemId) -> Result<()> {
        self.detach(id)?;
        self.destroy(id);
        Ok(())
    }

    fn destroy(&mut self, id: ElemId) {
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.remove(next) {
                pending.extend(node.children);
            }
        }
    }

    fn check_parent(&self, parent: ElemId) -> Result<()> {
        let node = self.node(parent)?;
        if node.shape.has_children() {
            Ok(())
        } else {
            Err(Error::InvalidCall(format!(
                "value element \"{}\" cannot hold children",
                node.name
            )))
        }
    }

    fn is_ancestor_or_self(&self, ancestor: ElemId, mut id: ElemId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.nodes.get(id).and_then(|n| n.parent) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    // ------------------------------------------------------------------------
    // Lockstep maintenance of children + name index
    // ------------------------------------------------------------------------

    fn link(&mut self, parent: ElemId, child: ElemId, position: Option<usize>) {
        let name = self.nodes[child].name.clone();
        self.nodes[child].parent = Some(parent);

        let node = &mut self.nodes[parent];
        let at = position.unwrap_or(usize::MAX).min(node.children.len());
        let appended = at == node.children.len();
        node.children.insert(at, child);

        if appended {
            node.index.entry(name).or_default().push(child);
        } else {
            self.reindex_name(parent, &name);
        }
    }

    fn unlink(&mut self, parent: ElemId, child: ElemId) {
        let name = self.nodes[child].name.clone();
        self.nodes[child].parent = None;

        let node = &mut self.nodes[parent];
        node.children.retain(|&c| c != child);
        if let Some(ids) = node.index.get_mut(&name) {
            ids.retain(|&c| c != child);
            if ids.is_empty() {
                node.index.remove(&name);
            }
        }
    }

    /// Rebuild one name's index entry from the document order
    fn reindex_name(&mut self, parent: ElemId, name: &str) {
        let ids: Vec<ElemId> = self.nodes[parent]
            .children
            .iter()
            .copied()
            .filter(|&c| self.nodes[c].name == name)
            .collect();
        let index = &mut self.nodes[parent].index;
        if ids.is_empty() {
            index.remove(name);
        } else {
            index.insert(name.to_string(), ids);
        }
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    pub fn set_name(&mut self, id: ElemId, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        let node = self.node_mut(id)?;
        let old = std::mem::replace(&mut node.name, name.clone());
        if let Some(parent) = node.parent {
            self.reindex_name(parent, &old);
            self.reindex_name(parent, &name);
        }
        Ok(())
    }

    pub fn set_value(&mut self, id: ElemId, value: impl Into<Variable>) -> Result<()> {
        self.node_mut(id)?.value = value.into();
        Ok(())
    }

    /// Edit the scalar in place
    pub fn value_mut(&mut self, id: ElemId) -> Option<&mut Variable> {
        self.nodes.get_mut(id).map(|n| &mut n.value)
    }

    /// Change the shape, fixing up payload and children to match:
    /// a value drops its children, a list keeps only anonymous value
    /// children, a block drops its scalar.
    pub fn set_shape(&mut self, id: ElemId, shape: ElemShape) -> Result<()> {
        let old = self.node(id)?.shape;
        match shape {
            ElemShape::Value => self.remove_all_children(id)?,
            ElemShape::ValueList => {
                if matches!(old, ElemShape::Block | ElemShape::ValueBlock) {
                    let children = self.nodes[id].children.clone();
                    for &child in &children {
                        self.remove_all_children(child)?;
                        let node = &mut self.nodes[child];
                        node.name.clear();
                        node.shape = ElemShape::Value;
                    }
                    let node = &mut self.nodes[id];
                    node.index.clear();
                    if !children.is_empty() {
                        node.index.insert(String::new(), children);
                    }
                }
                self.nodes[id].value = Variable::Undefined;
            }
            ElemShape::Block => self.nodes[id].value = Variable::Undefined,
            ElemShape::ValueBlock => {}
        }
        self.nodes[id].shape = shape;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    pub fn parent(&self, id: ElemId) -> Option<ElemId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: ElemId) -> &[ElemId] {
        self.nodes.get(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Child at `index` in document order
    pub fn child_at(&self, parent: ElemId, index: usize) -> Result<ElemId> {
        let children = &self.node(parent)?.children;
        children.get(index).copied().ok_or(Error::InvalidIndex {
            index,
            count: children.len(),
        })
    }

    /// First direct child called `name`
    pub fn find_child(&self, parent: ElemId, name: &str) -> Option<ElemId> {
        self.find_child_matching(parent, ChildQuery::named(name))
    }

    pub fn find_child_matching(&self, parent: ElemId, query: ChildQuery<'_>) -> Option<ElemId> {
        let node = self.nodes.get(parent)?;
        let here = node
            .index
            .get(query.name)
            .and_then(|ids| ids.iter().copied().find(|&c| query.accepts(&self.nodes[c])));
        if here.is_some() || !query.recursive {
            return here;
        }
        node.children
            .iter()
            .find_map(|&child| self.find_child_matching(child, query))
    }

    /// All direct children called `name`, in document order.
    ///
    /// When `recursive` and this level has none, the result comes from the
    /// first child subtree (in document order) that has any.
    pub fn find_children(&self, parent: ElemId, name: &str, recursive: bool) -> Vec<ElemId> {
        let Some(node) = self.nodes.get(parent) else {
            return Vec::new();
        };
        if let Some(ids) = node.index.get(name) {
            return ids.clone();
        }
        if recursive {
            for &child in &node.children {
                let found = self.find_children(child, name, true);
                if !found.is_empty() {
                    return found;
                }
            }
        }
        Vec::new()
    }

    /// Direct child that must exist
    pub fn required_child(&self, parent: ElemId, name: &str) -> Result<ElemId> {
        self.find_child(parent, name).ok_or_else(|| Error::FileElement {
            path: PathBuf::new(),
            element: name.to_string(),
        })
    }

    /// Scalar of a direct child that must exist and hold a `kind` value
    pub fn required_value(&self, parent: ElemId, name: &str, kind: VarType) -> Result<&Variable> {
        let child = &self.nodes[self.required_child(parent, name)?];
        if child.shape.has_value() && child.value.kind() == kind {
            Ok(&child.value)
        } else {
            Err(Error::FileElementFormat {
                path: PathBuf::new(),
                element: name.to_string(),
                expected: format!("{kind} value"),
            })
        }
    }

    /// Structural equality of two subtrees: name, shape, scalar and children
    pub fn subtree_eq(&self, a: ElemId, other: &InfoTree, b: ElemId) -> bool {
        let (Some(x), Some(y)) = (self.nodes.get(a), other.nodes.get(b)) else {
            return false;
        };
        x.name == y.name
            && x.shape == y.shape
            && x.value == y.value
            && x.children.len() == y.children.len()
            && x.children
                .iter()
                .zip(&y.children)
                .all(|(&ca, &cb)| self.subtree_eq(ca, other, cb))
    }

    // ------------------------------------------------------------------------
    // Arrays
    // ------------------------------------------------------------------------

    fn read_array<T>(
        &self,
        id: ElemId,
        out: &mut [T],
        start: usize,
        convert: impl Fn(&Variable) -> Option<T>,
    ) -> usize {
        let children = self.children(id);
        let mut read = 0;
        for (slot, &child) in out.iter_mut().zip(children.iter().skip(start)) {
            match convert(&self.nodes[child].value) {
                Some(v) => *slot = v,
                None => break,
            }
            read += 1;
        }
        read
    }

    /// Copy child scalars from child `start` on into `out`; returns the count read
    pub fn to_int_array(&self, id: ElemId, out: &mut [i32], start: usize) -> usize {
        self.read_array(id, out, start, Variable::as_int)
    }

    pub fn to_float_array(&self, id: ElemId, out: &mut [f32], start: usize) -> usize {
        self.read_array(id, out, start, Variable::as_float)
    }

    pub fn to_dword_array(&self, id: ElemId, out: &mut [u32], start: usize) -> usize {
        self.read_array(id, out, start, Variable::as_dword)
    }

    /// Turn the element into a value list holding `values`.
    ///
    /// Markup has no spelling for an empty list, and a one-value list is
    /// written as `name: v`, which reads back as a plain value.
    pub fn from_values<I>(&mut self, id: ElemId, values: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Variable>,
    {
        self.remove_all_children(id)?;
        self.set_shape(id, ElemShape::ValueList)?;
        for value in values {
            self.create_value(id, "", value)?;
        }
        Ok(())
    }

    pub fn from_int_array(&mut self, id: ElemId, values: &[i32]) -> Result<()> {
        self.from_values(id, values.iter().copied())
    }

    pub fn from_float_array(&mut self, id: ElemId, values: &[f32]) -> Result<()> {
        self.from_values(id, values.iter().copied())
    }

    pub fn from_dword_array(&mut self, id: ElemId, values: &[u32]) -> Result<()> {
        self.from_values(id, values.iter().copied())
    }

    // ------------------------------------------------------------------------
    // Flags
    // ------------------------------------------------------------------------

    /// Decode a bitmask written as one enum name or a list of them.
    ///
    /// A plain dword value is taken as the raw mask. Anything unknown or of
    /// the wrong shape yields `default`.
    pub fn to_flags(&self, id: ElemId, table: &[EnumEntry<u32>], default: u32) -> u32 {
        let Some(node) = self.nodes.get(id) else {
            return default;
        };
        match (node.shape, &node.value) {
            (ElemShape::Value, Variable::Enum(Some(name))) => {
                enum_value(table, name).unwrap_or(default)
            }
            (ElemShape::Value, Variable::Dword(mask)) => *mask,
            (ElemShape::ValueList, _) => {
                let mut flags = 0;
                for &child in &node.children {
                    match &self.nodes[child].value {
                        Variable::Enum(Some(name)) => match enum_value(table, name) {
                            Some(bit) => flags |= bit,
                            None => return default,
                        },
                        _ => return default,
                    }
                }
                flags
            }
            _ => default,
        }
    }

    /// Encode a bitmask as enum names: a single name for one flag, a list
    /// for several. Bits without a table entry are dropped.
    pub fn from_flags(&mut self, id: ElemId, flags: u32, table: &[EnumEntry<u32>]) -> Result<()> {
        let names: Vec<&'static str> = table
            .iter()
            .filter(|e| e.value != 0 && flags & e.value == e.value)
            .map(|e| e.name)
            .collect();

        match names.as_slice() {
            [] => {
                self.set_shape(id, ElemShape::Value)?;
                let value = Variable::from_enum(table, 0).unwrap_or(Variable::Dword(0));
                self.set_value(id, value)
            }
            [single] => {
                self.set_shape(id, ElemShape::Value)?;
                self.set_value(id, Variable::enum_name(*single))
            }
            many => self.from_values(id, many.iter().map(|n| Variable::enum_name(*n))),
        }
    }
}

// ============================================================================
// Read-only view
// ============================================================================

/// Borrowed handle for walking a tree
#[derive(Clone, Copy)]
pub struct ElemRef<'a> {
    tree: &'a InfoTree,
    id: ElemId,
}

impl<'a> ElemRef<'a> {
    pub fn id(&self) -> ElemId {
        self.id
    }

    fn elem(&self) -> &'a InfoElem {
        &self.tree.nodes[self.id]
    }

    pub fn name(&self) -> &'a str {
        &self.elem().name
    }

    pub fn shape(&self) -> ElemShape {
        self.elem().shape
    }

    pub fn value(&self) -> &'a Variable {
        &self.elem().value
    }

    /// Link to another element of the same tree reached through this one
    fn linked(&self, id: ElemId) -> ElemRef<'a> {
        ElemRef {
            tree: self.tree,
            id,
        }
    }

    pub fn parent(&self) -> Option<ElemRef<'a>> {
        self.elem().parent.map(|id| self.linked(id))
    }

    pub fn children(&self) -> impl Iterator<Item = ElemRef<'a>> + 'a {
        let tree = self.tree;
        self.elem()
            .children
            .iter()
            .map(move |&id| ElemRef { tree, id })
    }

    pub fn find_child(&self, name: &str) -> Option<ElemRef<'a>> {
        self.tree
            .find_child(self.id, name)
            .map(|id| self.linked(id))
    }

    pub fn find_children(&self, name: &str) -> Vec<ElemRef<'a>> {
        self.tree
            .find_children(self.id, name, false)
            .into_iter()
            .map(|id| self.linked(id))
            .collect()
    }
}

impl PartialEq for ElemRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.tree.subtree_eq(self.id, other.tree, other.id)
    }
}

impl std::fmt::Debug for ElemRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("InfoElem");
        s.field("name", &self.name()).field("shape", &self.shape());
        if self.shape().has_value() {
            s.field("value", self.value());
        }
        if self.shape().has_children() {
            s.field("children", &self.children().collect::<Vec<_>>());
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thunderstorm_common::ErrorKind;

    const STYLE: &[EnumEntry<u32>] = &[
        EnumEntry::new("none", 0),
        EnumEntry::new("bold", 1),
        EnumEntry::new("italic", 2),
        EnumEntry::new("underline", 4),
    ];

    fn screens() -> (InfoTree, ElemId, Vec<ElemId>) {
        let mut tree = InfoTree::new();
        let root = tree.create_root("game");
        let a = tree.create_child(root, "screen", ElemShape::Block).unwrap();
        tree.create_value(root, "title", "Hitman").unwrap();
        let b = tree.create_child(root, "screen", ElemShape::Block).unwrap();
        let c = tree.create_child(root, "screen", ElemShape::Block).unwrap();
        (tree, root, vec![a, b, c])
    }

    #[test]
    fn find_children_keeps_insertion_order() {
        let (tree, root, screens) = screens();
        assert_eq!(tree.find_children(root, "screen", false), screens);
        assert_eq!(tree.find_child(root, "screen"), Some(screens[0]));
        assert_eq!(tree.children(root).len(), 4);
    }

    #[test]
    fn index_follows_insert_remove_and_rename() {
        let (mut tree, root, screens) = screens();
        let early = tree.create("screen", ElemShape::Block);
        tree.insert_child(root, 0, early).unwrap();
        assert_eq!(tree.find_child(root, "screen"), Some(early));

        tree.remove_child(root, screens[1]).unwrap();
        assert_eq!(
            tree.find_children(root, "screen", false),
            vec![early, screens[0], screens[2]]
        );

        tree.set_name(screens[0], "menu").unwrap();
        assert_eq!(tree.find_children(root, "screen", false), vec![early, screens[2]]);
        assert_eq!(tree.find_child(root, "menu"), Some(screens[0]));
        assert!(!tree.contains(screens[1]));
    }

    #[test]
    fn query_filters_by_shape_and_kind() {
        let mut tree = InfoTree::new();
        let root = tree.create_root("root");
        let block = tree.create_child(root, "size", ElemShape::Block).unwrap();
        let int = tree.create_value(root, "size", 4).unwrap();
        let deep = tree.create_value(block, "color", 0xFF00FFu32).unwrap();

        let q = ChildQuery::named("size").shape(ElemShape::Value).kind(VarType::Int);
        assert_eq!(tree.find_child_matching(root, q), Some(int));
        assert_eq!(
            tree.find_child_matching(root, ChildQuery::named("size").kind(VarType::Float)),
            None
        );
        assert_eq!(tree.find_child(root, "color"), None);
        assert_eq!(
            tree.find_child_matching(root, ChildQuery::named("color").recursive()),
            Some(deep)
        );
    }

    #[test]
    fn recursive_find_children_uses_first_matching_subtree() {
        let mut tree = InfoTree::new();
        let root = tree.create_root("root");
        let first = tree.create_child(root, "a", ElemShape::Block).unwrap();
        let second = tree.create_child(root, "b", ElemShape::Block).unwrap();
        let x1 = tree.create_value(first, "tab", 1).unwrap();
        tree.create_value(second, "tab", 2).unwrap();
        tree.create_value(second, "tab", 3).unwrap();

        assert_eq!(tree.find_children(root, "tab", true), vec![x1]);
        assert!(tree.find_children(root, "tab", false).is_empty());
    }

    #[test]
    fn release_detaches_and_destroys_subtree() {
        let (mut tree, root, screens) = screens();
        let inner = tree.create_value(screens[0], "x", 1).unwrap();
        tree.release(screens[0]).unwrap();
        assert!(!tree.contains(inner));
        assert_eq!(tree.find_children(root, "screen", false).len(), 2);

        tree.release(root).unwrap();
        assert_eq!(tree.root(), None);
        assert!(tree.is_empty());
    }

    #[test]
    fn cannot_attach_twice_or_into_values() {
        let (mut tree, root, screens) = screens();
        let err = tree.add_child(root, screens[0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCall);

        let title = tree.find_child(root, "title").unwrap();
        let err = tree.create_child(title, "x", ElemShape::Value).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCall);

        let loose = tree.create("loose", ElemShape::Block);
        tree.add_child(screens[1], loose).unwrap();
        let err = tree.add_child(loose, screens[1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCall);
        let err = tree.add_child(loose, root).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCall);
    }

    #[test]
    fn block_to_list_flattens_children() {
        let mut tree = InfoTree::new();
        let root = tree.create_root("root");
        let pos = tree.create_child(root, "pos", ElemShape::Block).unwrap();
        tree.create_value(pos, "x", 3).unwrap();
        let y = tree.create_child(pos, "y", ElemShape::ValueBlock).unwrap();
        tree.set_value(y, 4).unwrap();
        tree.create_value(y, "hidden", 1).unwrap();

        tree.set_shape(pos, ElemShape::ValueList).unwrap();
        let children = tree.children(pos).to_vec();
        assert_eq!(children.len(), 2);
        for &c in &children {
            assert_eq!(tree[c].name(), "");
            assert_eq!(tree[c].shape(), ElemShape::Value);
            assert_eq!(tree[c].child_count(), 0);
        }
        assert_eq!(tree.find_children(pos, "", false), children);

        tree.set_shape(pos, ElemShape::Value).unwrap();
        assert_eq!(tree[pos].child_count(), 0);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn int_array_partial_read() {
        let mut tree = InfoTree::new();
        let root = tree.create_root("root");
        let list = tree.create_child(root, "rect", ElemShape::Block).unwrap();
        tree.from_int_array(list, &[10, 20, 30]).unwrap();
        assert_eq!(tree[list].shape(), ElemShape::ValueList);

        let mut out = [0; 4];
        assert_eq!(tree.to_int_array(list, &mut out, 0), 3);
        assert_eq!(out, [10, 20, 30, 0]);

        let mut tail = [0; 2];
        assert_eq!(tree.to_int_array(list, &mut tail, 1), 2);
        assert_eq!(tail, [20, 30]);

        let mut floats = [0.0f32; 3];
        tree.from_float_array(list, &[0.5, 1.5]).unwrap();
        assert_eq!(tree.to_float_array(list, &mut floats, 0), 2);
        assert_eq!(&floats[..2], &[0.5, 1.5]);

        let mut dwords = [0u32; 1];
        tree.from_dword_array(list, &[0xFF]).unwrap();
        assert_eq!(tree.to_dword_array(list, &mut dwords, 0), 1);
        assert_eq!(dwords, [0xFF]);
    }

    #[test]
    fn flags_roundtrip_through_names() {
        let mut tree = InfoTree::new();
        let root = tree.create_root("root");
        let style = tree.create_child(root, "style", ElemShape::Value).unwrap();

        tree.from_flags(style, 2, STYLE).unwrap();
        assert_eq!(tree[style].shape(), ElemShape::Value);
        assert_eq!(tree[style].value(), &Variable::enum_name("italic"));
        assert_eq!(tree.to_flags(style, STYLE, 99), 2);

        tree.from_flags(style, 1 | 4, STYLE).unwrap();
        assert_eq!(tree[style].shape(), ElemShape::ValueList);
        assert_eq!(tree.to_flags(style, STYLE, 99), 5);

        tree.from_flags(style, 0, STYLE).unwrap();
        assert_eq!(tree[style].value(), &Variable::enum_name("none"));
        assert_eq!(tree.to_flags(style, STYLE, 99), 0);
    }

    #[test]
    fn child_at_checks_the_index() {
        let (tree, root, screens) = screens();
        assert_eq!(tree.child_at(root, 1).unwrap(), tree.children(root)[1]);
        assert_eq!(tree.child_at(root, 0).unwrap(), tree.children(root)[0]);
        match tree.child_at(root, 99).unwrap_err() {
            Error::InvalidIndex { index, count } => {
                assert_eq!(index, 99);
                assert_eq!(count, tree.children(root).len());
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(
            tree.child_at(screens[0], 0).unwrap_err().kind(),
            ErrorKind::InvalidIndex
        );
    }

    #[test]
    fn value_mut_edits_in_place() {
        let mut tree = InfoTree::new();
        let root = tree.create_root("root");
        let count = tree.create_value(root, "count", 1).unwrap();
        if let Some(Variable::Int(v)) = tree.value_mut(count) {
            *v += 41;
        }
        assert_eq!(tree[count].value(), &Variable::Int(42));

        tree.remove_child(root, count).unwrap();
        assert!(tree.value_mut(count).is_none());
    }

    #[test]
    fn short_arrays_do_not_keep_list_form() {
        let mut tree = InfoTree::new();
        let root = tree.create_root("root");
        let empty = tree.create_child(root, "empty", ElemShape::Block).unwrap();
        tree.from_int_array(empty, &[]).unwrap();
        let one = tree.create_child(root, "one", ElemShape::Block).unwrap();
        tree.from_int_array(one, &[7]).unwrap();

        assert_eq!(tree.to_markup_string(one), "one: 7\r\n");
        assert_eq!(tree.to_markup_string(empty), "empty: \r\n");

        let mut single = InfoTree::new();
        let reread = single.create_root("");
        single.parse_into(reread, "one: 7").unwrap();
        assert_eq!(single[reread].shape(), ElemShape::Value);
        let mut out = [0; 1];
        assert_eq!(single.to_int_array(reread, &mut out, 0), 0);

        let mut back = InfoTree::new();
        let back_root = back.create_root("");
        match back.parse_into(back_root, "empty: \r\n").unwrap_err() {
            Error::FileParse { expected, .. } => assert_eq!(expected, "element value"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn flags_fall_back_to_default() {
        let mut tree = InfoTree::new();
        let root = tree.create_root("root");
        let unknown = tree.create_value(root, "style", Variable::enum_name("blink")).unwrap();
        assert_eq!(tree.to_flags(unknown, STYLE, 7), 7);

        let block = tree.create_child(root, "other", ElemShape::Block).unwrap();
        assert_eq!(tree.to_flags(block, STYLE, 7), 7);

        let list = tree.create_child(root, "mixed", ElemShape::ValueList).unwrap();
        tree.from_values(list, [Variable::enum_name("bold"), Variable::Int(3)])
            .unwrap();
        assert_eq!(tree.to_flags(list, STYLE, 7), 7);
    }

    #[test]
    fn required_lookups_report_element_errors() {
        let (tree, root, _) = screens();
        assert_eq!(
            tree.required_value(root, "title", VarType::String).unwrap(),
            &Variable::string("Hitman")
        );
        let missing = tree.required_child(root, "width").unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::FileElement);
        let wrong = tree.required_value(root, "title", VarType::Int).unwrap_err();
        assert_eq!(wrong.kind(), ErrorKind::FileElementFormat);
    }

    #[test]
    fn subtree_equality_is_structural() {
        let (a, ra, _) = screens();
        let (mut b, rb, sb) = screens();
        assert_eq!(a.elem_ref(ra), b.elem_ref(rb));
        b.create_value(sb[2], "extra", true).unwrap();
        assert_ne!(a.elem_ref(ra), b.elem_ref(rb));
    }

    #[test]
    fn released_elements_have_no_view() {
        let mut tree = InfoTree::new();
        let root = tree.create_root("root");
        let child = tree.create_value(root, "x", 1).unwrap();
        assert_eq!(tree.elem_ref(child).unwrap().name(), "x");

        tree.remove_child(root, child).unwrap();
        assert!(tree.elem_ref(child).is_none());
        assert_eq!(tree.set_value(child, 2).unwrap_err().kind(), ErrorKind::InvalidPtr);

        tree.release_root();
        assert!(tree.elem_ref(root).is_none());
        assert!(tree.root_ref().is_none());
    }
}
