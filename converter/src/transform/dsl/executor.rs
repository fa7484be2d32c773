//! Selector executor
//!
//! Evaluates parsed [`Selector`]s against a [`Tree`]: plain reads, list reads,
//! and "traverse and create" writes that materialize missing steps.

use crate::error::{SelectorError, SelectorResult};
use crate::models::{NodeId, Tree};

use super::path::{Selector, Step, StepIndex};

impl Selector {
    /// Read traversal.
    ///
    /// Returns `None` when any step finds nothing. On a path ending in `[]`
    /// this is the first element of the list.
    pub fn first(&self, tree: &Tree, from: NodeId) -> SelectorResult<Option<NodeId>> {
        let Some(parent) = self.walk_inner(tree, from)? else {
            return Ok(None);
        };
        let step = self.last_step();
        let matches = step.candidates(tree, parent);
        match step.index {
            StepIndex::All => Ok(matches.first().copied()),
            _ => self.pick(step, &matches),
        }
    }

    /// Read-as-list traversal.
    ///
    /// The last step is evaluated as if it ended in `[]`; an explicit `[i]`
    /// yields a list of at most one node.
    pub fn all(&self, tree: &Tree, from: NodeId) -> SelectorResult<Vec<NodeId>> {
        let Some(parent) = self.walk_inner(tree, from)? else {
            return Ok(Vec::new());
        };
        let step = self.last_step();
        let matches = step.candidates(tree, parent);
        match step.index {
            StepIndex::At(i) => Ok(matches.get(i).copied().into_iter().collect()),
            StepIndex::Unique | StepIndex::All => Ok(matches),
        }
    }

    /// Write traversal: like [`Selector::first`], but a step that matches
    /// nothing creates the node it asked for.
    pub fn ensure(&self, tree: &mut Tree, from: NodeId) -> SelectorResult<NodeId> {
        let mut current = from;
        for step in self.steps() {
            let matches = step.candidates(tree, current);
            current = match step.index {
                StepIndex::All => {
                    return Err(SelectorError::ListMarker {
                        path: self.path().to_string(),
                    })
                }
                StepIndex::Unique => match matches.len() {
                    0 => self.create(tree, current, step)?,
                    1 => matches[0],
                    n => return Err(self.ambiguous(step, n)),
                },
                StepIndex::At(i) => match matches.get(i) {
                    Some(node) => *node,
                    None => self.create(tree, current, step)?,
                },
            };
        }
        Ok(current)
    }

    /// Evaluate every step but the last; `None` when something is missing.
    fn walk_inner(&self, tree: &Tree, from: NodeId) -> SelectorResult<Option<NodeId>> {
        let steps = self.steps();
        let mut current = from;
        for step in &steps[..steps.len() - 1] {
            let matches = step.candidates(tree, current);
            match self.pick(step, &matches)? {
                Some(node) => current = node,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    fn pick(&self, step: &Step, matches: &[NodeId]) -> SelectorResult<Option<NodeId>> {
        match step.index {
            StepIndex::At(i) => Ok(matches.get(i).copied()),
            StepIndex::Unique | StepIndex::All => match matches.len() {
                0 => Ok(None),
                1 => Ok(Some(matches[0])),
                n => Err(self.ambiguous(step, n)),
            },
        }
    }

    /// Append a node that satisfies `step` under `parent`.
    fn create(&self, tree: &mut Tree, parent: NodeId, step: &Step) -> SelectorResult<NodeId> {
        let tag = step
            .tags
            .first()
            .ok_or_else(|| self.malformed(step, "cannot create a node without a tag"))?;
        let node = tree.create(tag.clone());
        if let Some(ref id) = step.id {
            tree.set_id(node, id.clone());
        }
        if let Some(ref xref) = step.xref {
            tree.set_xref(node, xref.clone());
        }
        if let Some(ref value) = step.value {
            tree.set_value(node, Some(value.clone()));
        }
        tree.append(parent, node);
        Ok(node)
    }
}

impl Tree {
    /// Parse `path` and run a read traversal from `from`.
    pub fn select(&self, from: NodeId, path: &str) -> SelectorResult<Option<NodeId>> {
        Selector::parse(path)?.first(self, from)
    }

    /// Parse `path` and run a read-as-list traversal from `from`.
    pub fn select_all(&self, from: NodeId, path: &str) -> SelectorResult<Vec<NodeId>> {
        Selector::parse(path)?.all(self, from)
    }

    /// Parse `path` and run a write traversal from `from`.
    pub fn select_or_create(&mut self, from: NodeId, path: &str) -> SelectorResult<NodeId> {
        Selector::parse(path)?.ensure(self, from)
    }

    /// Value at `path`, if the node exists and carries one.
    pub fn select_value(&self, from: NodeId, path: &str) -> SelectorResult<Option<String>> {
        Ok(self
            .select(from, path)?
            .and_then(|node| self.value(node).map(String::from)))
    }
}
