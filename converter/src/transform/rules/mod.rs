//! Built-in field-mapping rules.
//!
//! Each rule is a small [`Transformation`] written against the engine: the
//! selector language to find and create nodes, the relocation helpers to move
//! subtrees between inline and record form.
//!
//! | Rule | Legacy | Successor | Exercises |
//! |------|--------|-----------|-----------|
//! | [`header::Header`] | HEAD | HEAD | write traversal, removal |
//! | [`address::Address`] | ADDR | ADDR | merging values, renames |
//! | [`name::PersonalName`] | NAME | NAME | splitting a value into children |
//! | [`note::Note`] | NOTE | SNOTE | renaming records and pointers |
//! | [`media::Media`] | OBJE | OBJE | deferred relocation, internalization |
//! | [`source::SourceCitation`] | SOUR | | immediate externalization |

use std::rc::Rc;

use crate::models::{NodeId, Tree};

use super::dispatch::Transformation;

pub mod address;
pub mod header;
pub mod media;
pub mod name;
pub mod note;
pub mod source;

/// Every built-in rule, in registration order.
pub fn standard_rules() -> Vec<Rc<dyn Transformation>> {
    vec![
        Rc::new(header::Header),
        Rc::new(address::Address),
        Rc::new(name::PersonalName),
        Rc::new(note::Note),
        Rc::new(media::Media),
        Rc::new(source::SourceCitation),
    ]
}

/// Rename children of `node` in place, keeping their position.
///
/// Returns how many children were renamed.
pub(crate) fn rename_children(tree: &mut Tree, node: NodeId, pairs: &[(&str, &str)]) -> usize {
    let mut renamed = 0;
    for child in tree.children(node).to_vec() {
        let to = pairs
            .iter()
            .find(|(from, _)| *from == tree.tag(child))
            .map(|(_, to)| *to);
        if let Some(to) = to {
            tree.set_tag(child, to);
            renamed += 1;
        }
    }
    renamed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Node;
    use crate::transform::dispatch::Registry;

    #[test]
    fn test_standard_registry_claims_tags() {
        let registry = Registry::standard();
        assert_eq!(registry.len(), 6);
        let text = registry.describe();
        for name in ["header", "address", "name", "note", "media", "source"] {
            assert!(text.contains(name), "missing {} in {}", name, text);
        }
    }

    #[test]
    fn test_rename_children_keeps_order() {
        let mut tree = Tree::from_records(&[Node::new("ADDR")
            .with_child(Node::new("CITY"))
            .with_child(Node::new("ADR1"))
            .with_child(Node::new("CTRY"))]);
        let addr = tree.children(tree.root())[0];
        let renamed = rename_children(&mut tree, addr, &[("CITY", "TOWN"), ("CTRY", "LAND")]);
        assert_eq!(renamed, 2);
        let tags: Vec<&str> = tree.children(addr).iter().map(|c| tree.tag(*c)).collect();
        assert_eq!(tags, vec!["TOWN", "ADR1", "LAND"]);
    }
}
