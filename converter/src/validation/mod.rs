//! Reference integrity check.
//!
//! Every pointer in a document must name a top-level record of the category
//! its tag implies. The check runs at the end of every conversion pass and
//! backs the `gedshift check` command.
//!
//! # Example
//!
//! ```rust
//! use gedshift::models::{Node, Tree};
//! use gedshift::validation::check_references;
//!
//! let tree = Tree::from_records(&[
//!     Node::new("INDI").with_id("I1").with_child(Node::new("FAMS").with_xref("F1")),
//!     Node::new("FAM").with_id("F1").with_child(Node::new("HUSB").with_xref("I1")),
//! ]);
//!
//! let report = check_references(&tree).unwrap();
//! assert_eq!(report.records, 2);
//! assert_eq!(report.pointers, 2);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ReferenceResult;
use crate::models::Tree;
use crate::store::RecordStore;

/// Outcome of a successful check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    /// Top-level records indexed
    pub records: usize,
    /// Pointers resolved
    pub pointers: usize,
}

/// Record category a pointer tag must resolve in; `None` accepts any.
pub fn expected_category(tag: &str) -> Option<&'static str> {
    match tag {
        "FAMC" | "FAMS" => Some("FAM"),
        "HUSB" | "WIFE" | "CHIL" | "ASSO" | "ALIA" => Some("INDI"),
        "SUBM" => Some("SUBM"),
        "SUBN" => Some("SUBN"),
        "OBJE" => Some("OBJE"),
        "SOUR" => Some("SOUR"),
        "NOTE" => Some("NOTE"),
        "SNOTE" => Some("SNOTE"),
        "REPO" => Some("REPO"),
        _ => None,
    }
}

/// Resolve every pointer below the root against the top-level records.
///
/// Fails with the first unresolved pointer, in document order, or with a
/// duplicated record id.
pub fn check_references(tree: &Tree) -> ReferenceResult<CheckReport> {
    let store = RecordStore::index(tree, tree.root())?;
    let mut pointers = 0;

    for node in tree.descendants(tree.root()) {
        let Some(xref) = tree.xref_of(node) else {
            continue;
        };
        match expected_category(tree.tag(node)) {
            Some(category) => store.resolve(tree, category, xref)?,
            None => store.resolve_any(tree, xref)?,
        };
        pointers += 1;
    }

    Ok(CheckReport {
        records: store.len(),
        pointers,
    })
}
