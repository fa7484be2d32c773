//! Transformation dispatch.
//!
//! A [`Transformation`] rewrites one node category in both directions. The
//! [`Registry`] maps tags to transformations, one table per direction, and
//! walks the tree top-down invoking whichever transformation claims a node.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::ConvertResult;
use crate::models::{Direction, NodeId};

use super::pipeline::Conversion;

/// What the walk does after a handler returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Walk the node's children as they are now.
    Descend,
    /// The handler dealt with the whole subtree.
    Skip,
}

/// Bidirectional rewrite of one node category
pub trait Transformation {
    /// Short name shown by `gedshift rules`.
    fn name(&self) -> &'static str;

    /// Tags this transformation claims in the legacy schema.
    fn legacy_tags(&self) -> &'static [&'static str];

    /// Tags this transformation claims in the successor schema.
    fn successor_tags(&self) -> &'static [&'static str];

    /// Rewrite `node` from the legacy into the successor schema.
    fn to(&self, cx: &mut Conversion, node: NodeId) -> ConvertResult<Visit>;

    /// Rewrite `node` from the successor into the legacy schema.
    fn from(&self, cx: &mut Conversion, node: NodeId) -> ConvertResult<Visit>;
}

/// Tag -> transformation tables, built once
#[derive(Default, Clone)]
pub struct Registry {
    to: BTreeMap<&'static str, Rc<dyn Transformation>>,
    from: BTreeMap<&'static str, Rc<dyn Transformation>>,
    all: Vec<Rc<dyn Transformation>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("to", &self.to.keys().collect::<Vec<_>>())
            .field("from", &self.from.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    /// Empty registry: every tag passes through unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in rule.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for rule in super::rules::standard_rules() {
            registry.register(rule);
        }
        registry
    }

    /// Add `rule` under each of its tags. A later rule replaces an earlier
    /// one for the same tag.
    pub fn register(&mut self, rule: Rc<dyn Transformation>) {
        for tag in rule.legacy_tags() {
            self.to.insert(tag, Rc::clone(&rule));
        }
        for tag in rule.successor_tags() {
            self.from.insert(tag, Rc::clone(&rule));
        }
        self.all.push(rule);
    }

    /// Handler for `tag` in the given direction.
    pub fn lookup(&self, direction: Direction, tag: &str) -> Option<&Rc<dyn Transformation>> {
        match direction {
            Direction::ToSuccessor => self.to.get(tag),
            Direction::ToLegacy => self.from.get(tag),
        }
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// One line per rule: name and the tags it claims each way.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for rule in &self.all {
            out.push_str(&format!(
                "{:<10} to: {:<16} from: {}\n",
                rule.name(),
                rule.legacy_tags().join(","),
                rule.successor_tags().join(",")
            ));
        }
        out
    }

    // =========================================================================
    // Walk
    // =========================================================================

    /// Visit every child of `parent`, in order.
    ///
    /// Children are snapshotted first; a child moved elsewhere by an earlier
    /// handler is not visited from here.
    pub fn dispatch(&self, cx: &mut Conversion, parent: NodeId) -> ConvertResult<()> {
        let children = cx.tree.children(parent).to_vec();
        for child in children {
            if cx.tree.parent(child) != Some(parent) {
                continue;
            }
            self.visit(cx, child)?;
        }
        Ok(())
    }

    /// Run the handler for `node`, then descend if it asks to.
    ///
    /// A top-level record is registered in the destination store afterwards,
    /// under its possibly renamed tag.
    pub fn visit(&self, cx: &mut Conversion, node: NodeId) -> ConvertResult<()> {
        let visit = match self.lookup(cx.direction, cx.tree.tag(node)) {
            Some(rule) => {
                let rule = Rc::clone(rule);
                cx.stats.handled += 1;
                match cx.direction {
                    Direction::ToSuccessor => rule.to(cx, node)?,
                    Direction::ToLegacy => rule.from(cx, node)?,
                }
            }
            None => Visit::Descend,
        };
        cx.stats.visited += 1;

        if visit == Visit::Descend {
            self.dispatch(cx, node)?;
        }

        if cx.tree.is_top_level(node) && cx.tree.is_record(node) {
            cx.target.register(&cx.tree, node)?;
        }
        Ok(())
    }
}
