//! Value continuation codec.
//!
//! Line-record formats bound how long one line may be. A long value is stored
//! as the node's own value plus ordered continuation children:
//!
//! ```text
//! 1 NOTE This is the first part of a very long no    <- value, cut at the bound
//! 2 CONC te that goes on                             <- concatenation: no separator
//! 2 CONT and a second line                           <- line break: '\n' separator
//! ```
//!
//! Embedded newlines always become `CONT` children; cuts made only to respect
//! the length bound become `CONC` children and prefer to land after whitespace.

use serde::{Deserialize, Serialize};

use crate::models::{NodeId, Tree};

/// Concatenation continuation tag
pub const CONC_TAG: &str = "CONC";
/// Line-break continuation tag
pub const CONT_TAG: &str = "CONT";

/// Both continuation tags, in the form the tree filters take.
pub const CONTINUATION_TAGS: [&str; 2] = [CONC_TAG, CONT_TAG];

// =============================================================================
// Line Policy
// =============================================================================

/// Line-length policy of one schema side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinePolicy {
    /// Maximum characters per value segment; `None` means unbounded.
    pub max_len: Option<usize>,
    /// How far back from a length cut to look for whitespace.
    pub look_back: usize,
}

impl Default for LinePolicy {
    fn default() -> Self {
        Self::legacy()
    }
}

impl LinePolicy {
    /// Legacy lines: values cut at 200 characters.
    pub fn legacy() -> Self {
        Self {
            max_len: Some(200),
            look_back: 20,
        }
    }

    /// Successor lines: unbounded, only newlines continue a value.
    pub fn successor() -> Self {
        Self {
            max_len: None,
            look_back: 20,
        }
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }

    fn bound(&self) -> Option<usize> {
        self.max_len.map(|m| m.max(1))
    }
}

// =============================================================================
// Pure split / join
// =============================================================================

/// Kind of a continuation segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Joined with no separator
    Conc,
    /// Joined with a newline
    Cont,
}

impl Continuation {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Conc => CONC_TAG,
            Self::Cont => CONT_TAG,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            CONC_TAG => Some(Self::Conc),
            CONT_TAG => Some(Self::Cont),
            _ => None,
        }
    }
}

/// A value broken into its head and continuation segments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub head: String,
    pub continuations: Vec<(Continuation, String)>,
}

impl Encoded {
    /// Rebuild the logical value.
    pub fn join(&self) -> String {
        let mut value = self.head.clone();
        for (kind, text) in &self.continuations {
            if *kind == Continuation::Cont {
                value.push('\n');
            }
            value.push_str(text);
        }
        value
    }
}

/// Split `value` into a head and continuation segments under `policy`.
pub fn split(value: &str, policy: &LinePolicy) -> Encoded {
    let mut head = None;
    let mut continuations = Vec::new();

    for (i, line) in value.split('\n').enumerate() {
        let mut pieces = cut_line(line, policy).into_iter();
        let first = pieces.next().unwrap_or_default();
        if i == 0 {
            head = Some(first);
        } else {
            continuations.push((Continuation::Cont, first));
        }
        continuations.extend(pieces.map(|p| (Continuation::Conc, p)));
    }

    Encoded {
        head: head.unwrap_or_default(),
        continuations,
    }
}

/// Cut one newline-free line into pieces of at most the bound.
fn cut_line(line: &str, policy: &LinePolicy) -> Vec<String> {
    let Some(max) = policy.bound() else {
        return vec![line.to_string()];
    };

    let all: Vec<char> = line.chars().collect();
    let mut chars: &[char] = &all;
    let mut pieces = Vec::new();
    while chars.len() > max {
        let mut cut = max;
        if !chars[max].is_whitespace() {
            let floor = max.saturating_sub(policy.look_back);
            if let Some(p) = (floor..max).rev().find(|&p| chars[p].is_whitespace()) {
                cut = p + 1;
            }
        }
        pieces.push(chars[..cut].iter().collect());
        chars = &chars[cut..];
    }
    pieces.push(chars.iter().collect());
    pieces
}

// =============================================================================
// Tree-level codec
// =============================================================================

fn is_continuation(tree: &Tree, node: NodeId) -> bool {
    Continuation::from_tag(tree.tag(node)).is_some()
}

/// Logical value of `node`: its own value joined with its continuation children.
///
/// `None` when the node has neither a value nor continuations.
pub fn decode(tree: &Tree, node: NodeId) -> Option<String> {
    let parts = tree.children_by_tag(node, &CONTINUATION_TAGS);
    if parts.is_empty() {
        return tree.value(node).map(String::from);
    }

    let encoded = Encoded {
        head: tree.value(node).unwrap_or_default().to_string(),
        continuations: parts
            .into_iter()
            .filter_map(|p| {
                let kind = Continuation::from_tag(tree.tag(p))?;
                Some((kind, tree.value(p).unwrap_or_default().to_string()))
            })
            .collect(),
    };
    Some(encoded.join())
}

/// Replace `node`'s value with its decoded value and drop its continuations.
///
/// Returns whether any continuation was removed.
pub fn collapse(tree: &mut Tree, node: NodeId) -> bool {
    let value = decode(tree, node);
    let removed = tree.remove_children_by_tag(node, &CONTINUATION_TAGS);
    tree.set_value(node, value);
    !removed.is_empty()
}

/// Re-encode `node`'s logical value under `policy`.
///
/// Continuation children are inserted first among the children, in order.
pub fn encode(tree: &mut Tree, node: NodeId, policy: &LinePolicy) {
    collapse(tree, node);
    let Some(value) = tree.value(node).map(String::from) else {
        return;
    };

    let encoded = split(&value, policy);
    tree.set_value(node, Some(encoded.head));
    for (i, (kind, text)) in encoded.continuations.into_iter().enumerate() {
        let child = tree.create(kind.tag());
        if !text.is_empty() {
            tree.set_value(child, Some(text));
        }
        tree.insert(node, i, child);
    }
}

/// Collapse every value in the document. Returns how many nodes changed.
pub fn collapse_all(tree: &mut Tree) -> usize {
    let nodes = tree.descendants(tree.root());
    let mut changed = 0;
    for node in nodes {
        if !is_continuation(tree, node) && collapse(tree, node) {
            changed += 1;
        }
    }
    changed
}

/// Encode every value in the document under `policy`. Returns how many nodes
/// gained continuation children.
pub fn expand_all(tree: &mut Tree, policy: &LinePolicy) -> usize {
    let nodes = tree.descendants(tree.root());
    let mut expanded = 0;
    for node in nodes {
        if is_continuation(tree, node) || !tree.is_attached(node) {
            continue;
        }
        encode(tree, node, policy);
        if !tree.children_by_tag(node, &CONTINUATION_TAGS).is_empty() {
            expanded += 1;
        }
    }
    expanded
}
