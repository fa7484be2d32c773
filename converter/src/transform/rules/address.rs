//! ADDR: free-form address lines merged into one `DATA` value.

use crate::error::ConvertResult;
use crate::models::NodeId;
use crate::transform::dispatch::{Transformation, Visit};
use crate::transform::pipeline::Conversion;

use super::rename_children;

const ADDRESS_LINES: [&str; 3] = ["ADR1", "ADR2", "ADR3"];

const RENAMES: [(&str, &str); 4] = [
    ("CITY", "TOWN"),
    ("STAE", "REGN"),
    ("POST", "PSTC"),
    ("CTRY", "LAND"),
];

/// Rewrites address structures.
pub struct Address;

impl Transformation for Address {
    fn name(&self) -> &'static str {
        "address"
    }

    fn legacy_tags(&self) -> &'static [&'static str] {
        &["ADDR"]
    }

    fn successor_tags(&self) -> &'static [&'static str] {
        &["ADDR"]
    }

    fn to(&self, cx: &mut Conversion, node: NodeId) -> ConvertResult<Visit> {
        let tree = &mut cx.tree;

        let mut lines: Vec<String> = tree
            .value(node)
            .map(|v| v.split('\n').map(String::from).collect())
            .unwrap_or_default();
        for line in tree.children_by_tag(node, &ADDRESS_LINES) {
            lines.extend(tree.value(line).map(String::from));
        }
        let data: Vec<&str> = lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();

        if !data.is_empty() {
            let merged = tree.create("DATA");
            tree.set_value(merged, Some(data.join(cx.options.address_separator.as_str())));
            tree.insert(node, 0, merged);
        }
        tree.set_value(node, None);
        tree.remove_children_by_tag(node, &ADDRESS_LINES);
        rename_children(tree, node, &RENAMES);

        Ok(Visit::Descend)
    }

    fn from(&self, cx: &mut Conversion, node: NodeId) -> ConvertResult<Visit> {
        let separator = cx.options.address_separator.as_str();
        let tree = &mut cx.tree;

        if let Some(data) = tree.first_child(node, "DATA") {
            let value = tree.value(data).unwrap_or_default();
            let lines = if separator.is_empty() {
                value.to_string()
            } else {
                value.split(separator).collect::<Vec<_>>().join("\n")
            };
            if !lines.is_empty() {
                tree.set_value(node, Some(lines));
            }
            tree.detach(data);
        }

        let reversed: Vec<(&str, &str)> = RENAMES.iter().map(|(l, s)| (*s, *l)).collect();
        rename_children(tree, node, &reversed);

        Ok(Visit::Descend)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::Direction;
    use crate::transform::codec;
    use crate::transform::pipeline::{convert_str, render, ConvertOptions};

    const LEGACY: &str = "\
0 @I1@ INDI
1 RESI
2 ADDR 12 Main Street
3 CONT Apartment 4
3 ADR1 12 Main Street
3 ADR2 Apartment 4
3 ADR3 Building C
3 CITY Springfield
3 STAE Illinois
3 POST 62701
3 CTRY USA
0 TRLR
";

    #[test]
    fn test_address_merges_lines_into_data() {
        let options = ConvertOptions::default();
        let output = convert_str(LEGACY, Direction::ToSuccessor, &options).unwrap();
        let tree = &output.tree;
        let root = tree.root();

        let addr = tree.select(root, "INDI/RESI/ADDR").unwrap().unwrap();
        assert_eq!(tree.value(addr), None);
        assert_eq!(
            tree.select_value(addr, "DATA").unwrap().as_deref(),
            Some("12 Main Street - Apartment 4 - 12 Main Street - Apartment 4 - Building C")
        );
        let tags: Vec<&str> = tree.children(addr).iter().map(|c| tree.tag(*c)).collect();
        assert_eq!(tags, vec!["DATA", "TOWN", "REGN", "PSTC", "LAND"]);
        assert_eq!(tree.select_value(addr, "TOWN").unwrap().as_deref(), Some("Springfield"));
        assert_eq!(tree.select_value(addr, "LAND").unwrap().as_deref(), Some("USA"));
    }

    #[test]
    fn test_address_without_lines() {
        let options = ConvertOptions::default();
        let output = convert_str(
            "0 @R1@ REPO\n1 ADDR\n2 CITY Paris\n0 TRLR\n",
            Direction::ToSuccessor,
            &options,
        )
        .unwrap();
        assert_eq!(
            render(&output, &options),
            "0 @R1@ REPO\n1 ADDR\n2 TOWN Paris\n0 TRLR\n"
        );
    }

    #[test]
    fn test_address_back_to_legacy() {
        let options = ConvertOptions::default();
        let successor = "0 @I1@ INDI\n1 RESI\n2 ADDR\n3 DATA 12 Main Street - Apartment 4\n3 TOWN Springfield\n3 PSTC 62701\n0 TRLR\n";
        let output = convert_str(successor, Direction::ToLegacy, &options).unwrap();
        let tree = &output.tree;
        let addr = tree.select(tree.root(), "INDI/RESI/ADDR").unwrap().unwrap();

        assert_eq!(codec::decode(tree, addr).as_deref(), Some("12 Main Street\nApartment 4"));
        assert_eq!(
            render(&output, &options),
            "0 @I1@ INDI\n1 RESI\n2 ADDR 12 Main Street\n3 CONT Apartment 4\n3 CITY Springfield\n3 POST 62701\n0 TRLR\n"
        );
    }

    #[test]
    fn test_custom_separator() {
        let options = ConvertOptions {
            address_separator: ", ".to_string(),
            ..ConvertOptions::default()
        };
        let output = convert_str(
            "0 @I1@ INDI\n1 ADDR\n2 ADR1 a\n2 ADR2 b\n0 TRLR\n",
            Direction::ToSuccessor,
            &options,
        )
        .unwrap();
        let tree = &output.tree;
        assert_eq!(
            tree.select_value(tree.root(), "INDI/ADDR/DATA").unwrap().as_deref(),
            Some("a, b")
        );
    }
}
