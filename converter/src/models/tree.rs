//! Arena-backed labelled tree.
//!
//! Nodes live in a single `Vec` and are addressed by [`NodeId`]. Removing a
//! node only unlinks it from its parent; the slot stays addressable, so
//! splicing subtrees between locations never invalidates another id.
//!
//! ```text
//! _DOC
//! ├── HEAD
//! │   └── GEDC
//! │       └── VERS 5.5.1
//! ├── @I1@ INDI
//! │   ├── NAME John /Smith/
//! │   └── FAMS @F1@
//! └── TRLR
//! ```

use super::{Node, NodeKind};

/// Tag of the synthetic node holding a document's top-level records.
pub const DOCUMENT_TAG: &str = "_DOC";

/// Stable index of a node inside one [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What [`Tree::clone_from`] does with the destination's own identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPolicy {
    /// A destination record keeps its id.
    Keep,
    /// The destination becomes a plain node.
    Discard,
}

#[derive(Debug, Clone)]
struct Slot {
    tag: String,
    kind: NodeKind,
    value: Option<String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl Slot {
    fn new(tag: String) -> Self {
        Self {
            tag,
            kind: NodeKind::Plain,
            value: None,
            children: Vec::new(),
            parent: None,
        }
    }
}

/// Mutable labelled tree.
///
/// `NodeId`s are only meaningful for the tree that issued them; passing a
/// foreign id is a programming error and panics on out-of-range access.
#[derive(Debug, Clone)]
pub struct Tree {
    slots: Vec<Slot>,
    root: NodeId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Empty document: a lone `_DOC` root.
    pub fn new() -> Self {
        Self::with_root(DOCUMENT_TAG)
    }

    pub fn with_root(tag: impl Into<String>) -> Self {
        Self {
            slots: vec![Slot::new(tag.into())],
            root: NodeId(0),
        }
    }

    /// Build a tree whose root is a copy of `node`.
    pub fn from_node(node: &Node) -> Self {
        let mut tree = Self::with_root(node.tag.clone());
        let root = tree.root;
        tree.slots[root.0].kind = node.kind.clone();
        tree.slots[root.0].value = node.value.clone();
        for child in &node.children {
            tree.graft(root, child);
        }
        tree
    }

    /// Document tree with the given top-level records.
    pub fn from_records(records: &[Node]) -> Self {
        let mut tree = Self::new();
        let root = tree.root;
        for record in records {
            tree.graft(root, record);
        }
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn slot(&self, id: NodeId) -> &Slot {
        &self.slots[id.0]
    }

    fn slot_mut(&mut self, id: NodeId) -> &mut Slot {
        &mut self.slots[id.0]
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Create a detached plain node.
    pub fn create(&mut self, tag: impl Into<String>) -> NodeId {
        self.slots.push(Slot::new(tag.into()));
        NodeId(self.slots.len() - 1)
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.slot(id).tag
    }

    pub fn set_tag(&mut self, id: NodeId, tag: impl Into<String>) {
        self.slot_mut(id).tag = tag.into();
    }

    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.slot(id).value.as_deref()
    }

    pub fn set_value(&mut self, id: NodeId, value: Option<String>) {
        self.slot_mut(id).value = value;
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.slot(id).kind
    }

    /// Record id, if `node` is a definition.
    pub fn id_of(&self, node: NodeId) -> Option<&str> {
        self.slot(node).kind.id()
    }

    /// Referenced id, if `node` is a pointer.
    pub fn xref_of(&self, node: NodeId) -> Option<&str> {
        self.slot(node).kind.xref()
    }

    /// Make `node` the definition of record `id`. Drops any xref.
    pub fn set_id(&mut self, node: NodeId, id: impl Into<String>) {
        self.slot_mut(node).kind = NodeKind::Record { id: id.into() };
    }

    /// Make `node` a pointer to `xref`. Drops any id.
    pub fn set_xref(&mut self, node: NodeId, xref: impl Into<String>) {
        self.slot_mut(node).kind = NodeKind::Pointer { xref: xref.into() };
    }

    pub fn make_plain(&mut self, node: NodeId) {
        self.slot_mut(node).kind = NodeKind::Plain;
    }

    pub fn is_record(&self, id: NodeId) -> bool {
        matches!(self.slot(id).kind, NodeKind::Record { .. })
    }

    pub fn is_pointer(&self, id: NodeId) -> bool {
        matches!(self.slot(id).kind, NodeKind::Pointer { .. })
    }

    /// True for a tag-less node.
    pub fn is_empty(&self, id: NodeId) -> bool {
        self.slot(id).tag.is_empty()
    }

    // =========================================================================
    // Structure
    // =========================================================================

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slot(id).children
    }

    /// Children carrying any of `tags`, in order.
    pub fn children_by_tag(&self, id: NodeId, tags: &[&str]) -> Vec<NodeId> {
        self.slot(id)
            .children
            .iter()
            .copied()
            .filter(|c| tags.iter().any(|t| *t == self.slot(*c).tag))
            .collect()
    }

    pub fn first_child(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.slot(id)
            .children
            .iter()
            .copied()
            .find(|c| self.slot(*c).tag == tag)
    }

    /// Value of the first child with `tag`.
    pub fn child_value(&self, id: NodeId, tag: &str) -> Option<&str> {
        self.first_child(id, tag).and_then(|c| self.value(c))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).parent
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.slot(id).parent?;
        self.slot(parent).children.iter().position(|c| *c == id)
    }

    /// Direct child of the root.
    pub fn is_top_level(&self, id: NodeId) -> bool {
        self.slot(id).parent == Some(self.root)
    }

    /// Reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.slot(current).parent {
                Some(p) => current = p,
                None => return false,
            }
        }
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.slot(c).parent;
        }
        false
    }

    /// Append `child` at the end of `parent`'s children, moving it if attached elsewhere.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let len = self.slot(parent).children.len();
        self.insert(parent, len, child);
    }

    /// Insert `child` at `index` (clamped) among `parent`'s children.
    ///
    /// Moving a node under itself or one of its descendants would create a
    /// cycle; such a move is refused and the tree is left unchanged.
    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if self.is_ancestor_or_self(child, parent) {
            log::warn!(
                "Refused to move {} under its own descendant {}",
                self.tag(child),
                self.tag(parent)
            );
            return;
        }
        self.detach(child);
        let children = &mut self.slot_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.slot_mut(child).parent = Some(parent);
    }

    /// Unlink the child at `index`; the node stays addressable.
    pub fn remove(&mut self, parent: NodeId, index: usize) -> Option<NodeId> {
        let children = &mut self.slot_mut(parent).children;
        if index >= children.len() {
            return None;
        }
        let child = children.remove(index);
        self.slot_mut(child).parent = None;
        Some(child)
    }

    /// Unlink `node` from its parent, if any.
    pub fn detach(&mut self, node: NodeId) {
        let parent = self.slot(node).parent;
        if let Some(parent) = parent {
            self.slot_mut(parent).children.retain(|c| *c != node);
            self.slot_mut(node).parent = None;
        }
    }

    /// Unlink every child carrying one of `tags`; returns them in order.
    pub fn remove_children_by_tag(&mut self, parent: NodeId, tags: &[&str]) -> Vec<NodeId> {
        let removed = self.children_by_tag(parent, tags);
        for child in &removed {
            self.detach(*child);
        }
        removed
    }

    /// Unlink every child of `parent`; returns them in order.
    pub fn take_children(&mut self, parent: NodeId) -> Vec<NodeId> {
        let children = std::mem::take(&mut self.slot_mut(parent).children);
        for child in &children {
            self.slot_mut(*child).parent = None;
        }
        children
    }

    /// Pre-order descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.slot(id).children.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.slot(node).children.iter().rev().copied());
        }
        out
    }

    // =========================================================================
    // Copying
    // =========================================================================

    /// Detached copy of the subtree at `src`, ids included.
    pub fn deep_copy(&mut self, src: NodeId) -> NodeId {
        let copy = self.create(self.slot(src).tag.clone());
        self.slot_mut(copy).kind = self.slot(src).kind.clone();
        self.slot_mut(copy).value = self.slot(src).value.clone();
        let children = self.slot(src).children.clone();
        for child in children {
            let child_copy = self.deep_copy(child);
            self.append(copy, child_copy);
        }
        copy
    }

    /// Overwrite `dest` with a deep copy of `src`'s tag, value, xref and children.
    ///
    /// The source's own id is never copied. `policy` decides whether a
    /// destination record keeps its id. `dest`'s previous children are
    /// unlinked.
    pub fn clone_from(&mut self, dest: NodeId, src: NodeId, policy: IdPolicy) {
        let copy = self.deep_copy(src);
        let children = self.take_children(copy);
        let copied = self.slot(copy).clone();

        let kind = match (&copied.kind, policy, &self.slot(dest).kind) {
            (NodeKind::Pointer { xref }, _, _) => NodeKind::Pointer { xref: xref.clone() },
            (_, IdPolicy::Keep, NodeKind::Record { id }) => NodeKind::Record { id: id.clone() },
            _ => NodeKind::Plain,
        };

        self.take_children(dest);
        let slot = self.slot_mut(dest);
        slot.tag = copied.tag;
        slot.value = copied.value;
        slot.kind = kind;
        for child in children {
            self.append(dest, child);
        }
    }

    // =========================================================================
    // Owned conversion
    // =========================================================================

    /// Copy an owned subtree under `parent`; returns the new node.
    pub fn graft(&mut self, parent: NodeId, node: &Node) -> NodeId {
        let id = self.create(node.tag.clone());
        self.slot_mut(id).kind = node.kind.clone();
        self.slot_mut(id).value = node.value.clone();
        self.append(parent, id);
        for child in &node.children {
            self.graft(id, child);
        }
        id
    }

    /// Owned copy of the subtree at `id`.
    pub fn to_node(&self, id: NodeId) -> Node {
        let slot = self.slot(id);
        Node {
            tag: slot.tag.clone(),
            kind: slot.kind.clone(),
            value: slot.value.clone(),
            children: slot.children.iter().map(|c| self.to_node(*c)).collect(),
        }
    }
}
