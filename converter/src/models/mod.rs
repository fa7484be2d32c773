//! Node model for the conversion engine.
//!
//! This module contains the data structures every pass reads and rewrites:
//!
//! - [`NodeKind`] - plain node, owning record definition, or pointer
//! - [`Node`] - owned, serializable subtree used at the boundaries
//! - [`Tree`] - arena of nodes addressed by [`NodeId`], used during a pass
//! - [`Schema`] / [`Direction`] - which vocabulary a tree speaks and where it goes

use serde::{Deserialize, Serialize};

pub mod tree;

pub use tree::{IdPolicy, NodeId, Tree, DOCUMENT_TAG};

// =============================================================================
// Node Kind
// =============================================================================

/// Whether a node defines a record, points at one, or neither.
///
/// A node is either an owning definition or a pointer, never both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Ordinary node without identity.
    #[default]
    Plain,
    /// Canonical definition of a record other nodes may reference.
    Record { id: String },
    /// Reference to another node's id. Never implies ownership.
    Pointer { xref: String },
}

impl NodeKind {
    /// Build a kind from the optional id/xref pair found in serialized forms.
    pub fn from_parts(id: Option<String>, xref: Option<String>) -> Result<Self, String> {
        match (id, xref) {
            (Some(id), Some(xref)) => Err(format!(
                "node cannot carry both id @{}@ and xref @{}@",
                id, xref
            )),
            (Some(id), None) => Ok(Self::Record { id }),
            (None, Some(xref)) => Ok(Self::Pointer { xref }),
            (None, None) => Ok(Self::Plain),
        }
    }

    /// The record id, if this is a definition.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Record { id } => Some(id),
            _ => None,
        }
    }

    /// The referenced id, if this is a pointer.
    pub fn xref(&self) -> Option<&str> {
        match self {
            Self::Pointer { xref } => Some(xref),
            _ => None,
        }
    }
}

// =============================================================================
// Owned Node
// =============================================================================

/// Owned subtree.
///
/// `Node::default()` has no tag and is the "not found" sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub struct Node {
    pub tag: String,
    pub kind: NodeKind,
    pub value: Option<String>,
    pub children: Vec<Node>,
}

/// Serialized shape of a [`Node`]: id and xref as optional siblings.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawNode {
    tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    xref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<Node>,
}

impl TryFrom<RawNode> for Node {
    type Error = String;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let kind = NodeKind::from_parts(raw.id, raw.xref)
            .map_err(|e| format!("{} ({})", e, raw.tag))?;
        Ok(Node {
            tag: raw.tag,
            kind,
            value: raw.value,
            children: raw.children,
        })
    }
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        let (id, xref) = match node.kind {
            NodeKind::Plain => (None, None),
            NodeKind::Record { id } => (Some(id), None),
            NodeKind::Pointer { xref } => (None, Some(xref)),
        };
        RawNode {
            tag: node.tag,
            id,
            xref,
            value: node.value,
            children: node.children,
        }
    }
}

impl Node {
    /// Create a plain node with a tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.kind = NodeKind::Record { id: id.into() };
        self
    }

    pub fn with_xref(mut self, xref: impl Into<String>) -> Self {
        self.kind = NodeKind::Pointer { xref: xref.into() };
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// True for the tag-less sentinel.
    pub fn is_empty(&self) -> bool {
        self.tag.is_empty()
    }

    pub fn id(&self) -> Option<&str> {
        self.kind.id()
    }

    pub fn xref(&self) -> Option<&str> {
        self.kind.xref()
    }

    /// Children with any of the given tags, in order.
    pub fn children_by_tag(&self, tags: &[&str]) -> Vec<&Node> {
        self.children
            .iter()
            .filter(|c| tags.iter().any(|t| *t == c.tag))
            .collect()
    }

    /// First child with the given tag, or the empty sentinel.
    pub fn child(&self, tag: &str) -> Node {
        self.children
            .iter()
            .find(|c| c.tag == tag)
            .cloned()
            .unwrap_or_default()
    }
}

// =============================================================================
// Schemas
// =============================================================================

/// The two line-record vocabularies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schema {
    Legacy,
    Successor,
}

impl Schema {
    /// Version string written to `HEAD/GEDC/VERS`.
    pub fn version(&self) -> &'static str {
        match self {
            Self::Legacy => "5.5.1",
            Self::Successor => "7.0",
        }
    }
}

/// Which way a pass rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Legacy to successor (the `to` operation).
    ToSuccessor,
    /// Successor to legacy (the `from` operation).
    ToLegacy,
}

impl Direction {
    pub fn source(&self) -> Schema {
        match self {
            Self::ToSuccessor => Schema::Legacy,
            Self::ToLegacy => Schema::Successor,
        }
    }

    pub fn target(&self) -> Schema {
        match self {
            Self::ToSuccessor => Schema::Successor,
            Self::ToLegacy => Schema::Legacy,
        }
    }

    /// Direction that converts documents written in `schema`.
    pub fn from_source(schema: Schema) -> Self {
        match schema {
            Schema::Legacy => Self::ToSuccessor,
            Schema::Successor => Self::ToLegacy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_from_parts_rejects_both() {
        assert!(NodeKind::from_parts(Some("I1".into()), Some("I2".into())).is_err());
        assert_eq!(
            NodeKind::from_parts(Some("I1".into()), None).unwrap(),
            NodeKind::Record { id: "I1".into() }
        );
        assert_eq!(NodeKind::from_parts(None, None).unwrap(), NodeKind::Plain);
    }

    #[test]
    fn test_node_json_shape() {
        let node = Node::new("INDI")
            .with_id("I1")
            .with_child(Node::new("NAME").with_value("John /Smith/"))
            .with_child(Node::new("FAMS").with_xref("F1"));

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["id"], "I1");
        assert!(value.get("xref").is_none());
        assert_eq!(value["children"][0]["value"], "John /Smith/");
        assert_eq!(value["children"][1]["xref"], "F1");
        assert!(value["children"][0].get("children").is_none());

        let back: Node = serde_json::from_value(value).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_node_json_rejects_id_and_xref() {
        let result: Result<Node, _> =
            serde_json::from_value(json!({ "tag": "NOTE", "id": "N1", "xref": "N2" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_sentinel() {
        let node = Node::new("INDI").with_child(Node::new("NAME"));
        assert!(!node.child("NAME").is_empty());
        assert!(node.child("BIRT").is_empty());
        assert!(Node::default().is_empty());
    }

    #[test]
    fn test_direction_schemas() {
        assert_eq!(Direction::ToSuccessor.source(), Schema::Legacy);
        assert_eq!(Direction::ToLegacy.target(), Schema::Legacy);
        assert_eq!(Direction::from_source(Schema::Successor), Direction::ToLegacy);
        assert_eq!(Schema::Successor.version(), "7.0");
    }
}
