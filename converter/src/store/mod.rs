//! Record Store - per-category top-level records and id allocation
//!
//! A [`RecordStore`] remembers which owning nodes exist for each record
//! category (the record's tag). An [`IdAllocator`] hands out new identifiers
//! following a schema's [`IdConvention`], never reusing one already present in
//! the document or issued earlier in the same pass.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{ReferenceError, ReferenceResult};
use crate::models::{NodeId, Schema, Tree};

// =============================================================================
// Record Store
// =============================================================================

/// Registry of owning record nodes for one schema side
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    /// Category -> records, in registration order
    records: BTreeMap<String, Vec<NodeId>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every top-level record below `root`.
    pub fn index(tree: &Tree, root: NodeId) -> ReferenceResult<Self> {
        let mut store = Self::new();
        for child in tree.children(root) {
            if tree.is_record(*child) {
                store.register(tree, *child)?;
            }
        }
        Ok(store)
    }

    /// Register `node` under its tag.
    pub fn register(&mut self, tree: &Tree, node: NodeId) -> ReferenceResult<()> {
        let category = tree.tag(node).to_string();
        self.register_as(tree, &category, node)
    }

    /// Register `node` under an explicit category.
    ///
    /// Plain nodes are accepted and only counted; a second record with the
    /// same id in one category is rejected.
    pub fn register_as(&mut self, tree: &Tree, category: &str, node: NodeId) -> ReferenceResult<()> {
        let list = self.records.entry(category.to_string()).or_default();
        if list.contains(&node) {
            return Ok(());
        }
        if let Some(id) = tree.id_of(node) {
            if list.iter().any(|n| tree.id_of(*n) == Some(id)) {
                return Err(ReferenceError::DuplicateId {
                    id: id.to_string(),
                    category: category.to_string(),
                });
            }
        }
        list.push(node);
        Ok(())
    }

    /// Forget `node`, wherever it was registered.
    pub fn unregister(&mut self, node: NodeId) {
        for list in self.records.values_mut() {
            list.retain(|n| *n != node);
        }
    }

    /// Find the record of `category` whose id is `xref`.
    pub fn resolve(&self, tree: &Tree, category: &str, xref: &str) -> ReferenceResult<NodeId> {
        self.find(tree, category, xref)
            .ok_or_else(|| ReferenceError::Unresolved {
                id: xref.to_string(),
                category: category.to_string(),
            })
    }

    /// Like [`RecordStore::resolve`], but searches every category.
    pub fn resolve_any(&self, tree: &Tree, xref: &str) -> ReferenceResult<NodeId> {
        self.records
            .keys()
            .find_map(|category| self.find(tree, category, xref))
            .ok_or_else(|| ReferenceError::Unresolved {
                id: xref.to_string(),
                category: "*".to_string(),
            })
    }

    fn find(&self, tree: &Tree, category: &str, xref: &str) -> Option<NodeId> {
        self.records
            .get(category)?
            .iter()
            .copied()
            .find(|n| tree.id_of(*n) == Some(xref))
    }

    /// Records of `category`, in registration order.
    pub fn records(&self, category: &str) -> &[NodeId] {
        self.records.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, category: &str) -> usize {
        self.records(category).len()
    }

    /// Number of records across all categories.
    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Category names with at least one record, sorted.
    pub fn categories(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(c, _)| c.as_str())
            .collect()
    }

    /// Per-category counts, sorted by category.
    pub fn summary(&self) -> BTreeMap<String, usize> {
        self.records
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(c, list)| (c.clone(), list.len()))
            .collect()
    }
}

// =============================================================================
// Identifier Convention
// =============================================================================

/// Prefix table used to format identifiers as `{prefix}{n}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdConvention {
    /// Category -> prefix
    #[serde(default)]
    pub prefixes: HashMap<String, String>,
    /// Prefix for categories missing from the table
    #[serde(default = "default_fallback")]
    pub fallback: String,
}

fn default_fallback() -> String {
    "X".to_string()
}

impl IdConvention {
    /// Legacy convention: `M` for multimedia, `N` for notes.
    pub fn legacy() -> Self {
        Self::from_pairs(&[
            ("INDI", "I"),
            ("FAM", "F"),
            ("NOTE", "N"),
            ("OBJE", "M"),
            ("SOUR", "S"),
            ("REPO", "R"),
            ("SUBM", "U"),
        ])
    }

    /// Successor convention: `O` for multimedia, `N` for shared notes.
    pub fn successor() -> Self {
        Self::from_pairs(&[
            ("INDI", "I"),
            ("FAM", "F"),
            ("SNOTE", "N"),
            ("OBJE", "O"),
            ("SOUR", "S"),
            ("REPO", "R"),
            ("SUBM", "U"),
        ])
    }

    /// Default convention of `schema`.
    pub fn for_schema(schema: Schema) -> Self {
        match schema {
            Schema::Legacy => Self::legacy(),
            Schema::Successor => Self::successor(),
        }
    }

    fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            prefixes: pairs
                .iter()
                .map(|(c, p)| (c.to_string(), p.to_string()))
                .collect(),
            fallback: default_fallback(),
        }
    }

    pub fn prefix(&self, category: &str) -> &str {
        self.prefixes
            .get(category)
            .map(String::as_str)
            .unwrap_or(&self.fallback)
    }

    pub fn format(&self, category: &str, serial: usize) -> String {
        format!("{}{}", self.prefix(category), serial)
    }
}

// =============================================================================
// Allocator
// =============================================================================

/// Pass-scoped identifier allocator
#[derive(Debug, Clone)]
pub struct IdAllocator {
    convention: IdConvention,
    /// Last serial issued per category
    serials: HashMap<String, usize>,
    /// Every id present in the document or issued so far
    taken: HashSet<String>,
}

impl IdAllocator {
    /// Allocator over `tree`; every record id already in it is reserved.
    pub fn new(convention: IdConvention, tree: &Tree) -> Self {
        let taken = tree
            .descendants(tree.root())
            .into_iter()
            .filter_map(|n| tree.id_of(n).map(String::from))
            .collect();
        Self {
            convention,
            serials: HashMap::new(),
            taken,
        }
    }

    pub fn convention(&self) -> &IdConvention {
        &self.convention
    }

    /// Next identifier for `category`.
    ///
    /// The serial starts after the store's count for the category (or after
    /// the last serial issued, if higher) and skips anything already taken.
    pub fn next(&mut self, category: &str, store: &RecordStore) -> String {
        let last = self.serials.get(category).copied().unwrap_or(0);
        let mut serial = (store.count(category) + 1).max(last + 1);
        let mut id = self.convention.format(category, serial);
        while self.taken.contains(&id) {
            serial += 1;
            id = self.convention.format(category, serial);
        }
        self.serials.insert(category.to_string(), serial);
        self.taken.insert(id.clone());
        id
    }

    /// Last serial issued for `category` in this pass; 0 if none.
    pub fn last_serial(&self, category: &str) -> usize {
        self.serials.get(category).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Node;

    fn document() -> Tree {
        Tree::from_records(&[
            Node::new("HEAD"),
            Node::new("INDI").with_id("I1"),
            Node::new("INDI").with_id("I2"),
            Node::new("OBJE").with_id("M1"),
            Node::new("OBJE").with_id("M3"),
            Node::new("TRLR"),
        ])
    }

    #[test]
    fn test_index_registers_records_only() {
        let tree = document();
        let store = RecordStore::index(&tree, tree.root()).unwrap();
        assert_eq!(store.count("INDI"), 2);
        assert_eq!(store.count("OBJE"), 2);
        assert_eq!(store.count("HEAD"), 0);
        assert_eq!(store.categories(), vec!["INDI", "OBJE"]);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let tree = Tree::from_records(&[
            Node::new("INDI").with_id("I1"),
            Node::new("INDI").with_id("I1"),
        ]);
        let err = RecordStore::index(&tree, tree.root()).unwrap_err();
        assert_eq!(
            err,
            ReferenceError::DuplicateId {
                id: "I1".into(),
                category: "INDI".into()
            }
        );
    }

    #[test]
    fn test_same_id_in_other_category_is_allowed() {
        let tree = Tree::from_records(&[
            Node::new("NOTE").with_id("X1"),
            Node::new("SOUR").with_id("X1"),
        ]);
        assert!(RecordStore::index(&tree, tree.root()).is_ok());
    }

    #[test]
    fn test_resolve() {
        let tree = document();
        let store = RecordStore::index(&tree, tree.root()).unwrap();
        let m3 = store.resolve(&tree, "OBJE", "M3").unwrap();
        assert_eq!(tree.id_of(m3), Some("M3"));

        let err = store.resolve(&tree, "OBJE", "I1").unwrap_err();
        assert!(matches!(err, ReferenceError::Unresolved { ref id, ref category } if id == "I1" && category == "OBJE"));
        assert!(store.resolve_any(&tree, "I1").is_ok());
        assert!(store.resolve_any(&tree, "Z9").is_err());
    }

    #[test]
    fn test_allocation_skips_taken_ids() {
        let tree = document();
        let store = RecordStore::index(&tree, tree.root()).unwrap();
        let mut ids = IdAllocator::new(IdConvention::legacy(), &tree);

        // two OBJE records: starts at 3, M3 is taken
        assert_eq!(ids.next("OBJE", &store), "M4");
        assert_eq!(ids.next("OBJE", &store), "M5");
        assert_eq!(ids.next("INDI", &store), "I3");
        assert_eq!(ids.next("REPO", &store), "R1");
        assert_eq!(ids.next("_CUSTOM", &store), "X1");
    }

    #[test]
    fn test_allocation_is_monotonic_as_store_grows() {
        let mut tree = document();
        let root = tree.root();
        let mut store = RecordStore::index(&tree, root).unwrap();
        let mut ids = IdAllocator::new(IdConvention::successor(), &tree);

        let mut issued = HashSet::new();
        for _ in 0..5 {
            let id = ids.next("OBJE", &store);
            assert!(id.starts_with('O'));
            assert!(issued.insert(id.clone()), "id {} issued twice", id);
            let node = tree.create("OBJE");
            tree.set_id(node, id);
            tree.append(root, node);
            store.register(&tree, node).unwrap();
        }
        // five ids, the first at serial 3
        assert_eq!(ids.last_serial("OBJE"), 7);
        assert_eq!(ids.last_serial("INDI"), 0);
    }

    #[test]
    fn test_convention_from_json_defaults_fallback() {
        let conv: IdConvention = serde_json::from_str(r#"{"prefixes":{"INDI":"P"}}"#).unwrap();
        assert_eq!(conv.format("INDI", 4), "P4");
        assert_eq!(conv.format("FAM", 1), "X1");
    }
}
