//! Moving subtrees between "inline under a parent" and "separate record".
//!
//! - [`externalize`] turns an inline subtree into a new record right away and
//!   leaves a pointer where it was.
//! - [`defer_externalize`] parks the subtree in the [`RelocationQueue`] and
//!   leaves a placeholder; [`drain`] finishes the move once the main walk is
//!   over, in category order and first-in first-out within a category.
//! - [`internalize`] copies a referenced record inline in place of its pointer.

use std::collections::{BTreeMap, VecDeque};

use crate::error::{ConvertResult, RelocationError};
use crate::models::{IdPolicy, NodeId, Tree};

use super::pipeline::Conversion;

/// Tag of the record that closes a document.
pub const TRAILER_TAG: &str = "TRLR";

/// A subtree waiting for its final place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending {
    /// Detached subtree that becomes the record
    pub payload: NodeId,
    /// Node left at the original position; becomes the pointer
    pub placeholder: NodeId,
}

/// Pending relocations keyed by destination category
#[derive(Debug, Clone, Default)]
pub struct RelocationQueue {
    pending: BTreeMap<String, VecDeque<Pending>>,
}

impl RelocationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, category: impl Into<String>, entry: Pending) {
        self.pending.entry(category.into()).or_default().push_back(entry);
    }

    /// Oldest entry of the first non-empty category.
    pub fn pop(&mut self) -> Option<(String, Pending)> {
        let category = self
            .pending
            .iter()
            .find(|(_, queue)| !queue.is_empty())
            .map(|(c, _)| c.clone())?;
        let entry = self.pending.get_mut(&category)?.pop_front()?;
        Some((category, entry))
    }

    pub fn len(&self) -> usize {
        self.pending.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fail with the first category that still holds entries.
    pub fn assert_empty(&self) -> Result<(), RelocationError> {
        match self.pending.iter().find(|(_, queue)| !queue.is_empty()) {
            Some((category, queue)) => Err(RelocationError::Undrained {
                category: category.clone(),
                count: queue.len(),
            }),
            None => Ok(()),
        }
    }
}

/// Attach `record` to the document root, keeping the trailer last.
pub fn append_record(tree: &mut Tree, record: NodeId) {
    let root = tree.root();
    let children = tree.children(root);
    let at = match children.last() {
        Some(last) if tree.tag(*last) == TRAILER_TAG => children.len() - 1,
        _ => children.len(),
    };
    tree.insert(root, at, record);
}

/// Turn `node` into a pointer to a new `category` record holding its value
/// and children. Returns the record.
pub fn externalize(cx: &mut Conversion, node: NodeId, category: &str) -> ConvertResult<NodeId> {
    let id = cx.ids.next(category, &cx.target);
    let record = cx.tree.create(category);
    cx.tree.set_id(record, id.clone());
    let value = cx.tree.value(node).map(String::from);
    cx.tree.set_value(record, value);
    for child in cx.tree.take_children(node) {
        cx.tree.append(record, child);
    }
    append_record(&mut cx.tree, record);
    cx.target.register(&cx.tree, record)?;

    cx.tree.set_value(node, None);
    cx.tree.set_xref(node, id.clone());
    cx.stats.externalized += 1;
    cx.log
        .info_indent(format!("{} @{}@ externalized from {}", category, id, cx.tree.tag(node)), 1);
    Ok(record)
}

/// Park `node` for relocation into a `category` record.
///
/// `node` is detached; a childless copy of its tag takes its position and
/// becomes the pointer when the queue is drained. Returns the placeholder.
pub fn defer_externalize(cx: &mut Conversion, node: NodeId, category: &str) -> NodeId {
    let tag = cx.tree.tag(node).to_string();
    let placeholder = cx.tree.create(tag);
    if let (Some(parent), Some(at)) = (cx.tree.parent(node), cx.tree.index_in_parent(node)) {
        cx.tree.insert(parent, at, placeholder);
    }
    cx.tree.detach(node);
    cx.queue.push(
        category,
        Pending {
            payload: node,
            placeholder,
        },
    );
    placeholder
}

/// Finish every pending relocation. Returns how many were drained.
///
/// Each payload becomes a top-level record with a freshly allocated id and
/// is then dispatched, so the record-level rule completes it. Entries queued
/// while draining are drained too.
pub fn drain(cx: &mut Conversion) -> ConvertResult<usize> {
    let mut drained = 0;
    while let Some((category, entry)) = cx.queue.pop() {
        if !cx.tree.is_attached(entry.placeholder) {
            return Err(RelocationError::DetachedPlaceholder { category }.into());
        }

        let id = cx.ids.next(&category, &cx.target);
        cx.tree.set_tag(entry.payload, category.as_str());
        cx.tree.set_id(entry.payload, id.clone());
        append_record(&mut cx.tree, entry.payload);
        cx.target.register(&cx.tree, entry.payload)?;
        cx.tree.set_xref(entry.placeholder, id.clone());
        cx.log.info_indent(format!("{} @{}@ relocated", category, id), 1);

        let registry = cx.registry();
        registry.visit(cx, entry.payload)?;
        drained += 1;
    }
    cx.stats.relocated += drained;
    Ok(drained)
}

/// Replace the pointer `node` with an id-less copy of the record it names.
///
/// The record is looked up in the source store under `node`'s tag and kept in
/// place; [`prune_internalized`] removes it later if nothing points at it.
pub fn internalize(cx: &mut Conversion, node: NodeId) -> ConvertResult<()> {
    let Some(xref) = cx.tree.xref_of(node).map(String::from) else {
        return Ok(());
    };
    let category = cx.tree.tag(node).to_string();
    let record = cx.source.resolve(&cx.tree, &category, &xref)?;

    cx.tree.clone_from(node, record, IdPolicy::Discard);
    cx.internalized.insert(record);
    cx.stats.internalized += 1;
    cx.log
        .info_indent(format!("{} @{}@ internalized", category, xref), 1);
    Ok(())
}

/// Drop internalized records that no pointer references any more.
pub fn prune_internalized(cx: &mut Conversion) -> usize {
    let referenced: std::collections::HashSet<String> = cx
        .tree
        .descendants(cx.tree.root())
        .into_iter()
        .filter_map(|n| cx.tree.xref_of(n).map(String::from))
        .collect();

    let mut candidates: Vec<NodeId> = cx.internalized.iter().copied().collect();
    candidates.sort();

    let mut pruned = 0;
    for record in candidates {
        let unused = cx
            .tree
            .id_of(record)
            .map_or(true, |id| !referenced.contains(id));
        if unused && cx.tree.is_attached(record) {
            cx.tree.detach(record);
            cx.target.unregister(record);
            pruned += 1;
        }
    }
    cx.internalized.clear();
    cx.stats.pruned += pruned;
    pruned
}
