//! HEAD: schema version and character set declarations.

use crate::error::ConvertResult;
use crate::models::{NodeId, Schema};
use crate::transform::dispatch::{Transformation, Visit};
use crate::transform::pipeline::Conversion;

/// Rewrites the header record.
pub struct Header;

impl Header {
    /// Visit the header's children, except that the producing-system `SOUR`
    /// block is only descended into; it is not a citation.
    fn descend(cx: &mut Conversion, head: NodeId) -> ConvertResult<()> {
        for child in cx.tree.children(head).to_vec() {
            if cx.tree.tag(child) == "SOUR" {
                cx.descend(child)?;
            } else {
                cx.visit(child)?;
            }
        }
        Ok(())
    }
}

impl Transformation for Header {
    fn name(&self) -> &'static str {
        "header"
    }

    fn legacy_tags(&self) -> &'static [&'static str] {
        &["HEAD"]
    }

    fn successor_tags(&self) -> &'static [&'static str] {
        &["HEAD"]
    }

    fn to(&self, cx: &mut Conversion, node: NodeId) -> ConvertResult<Visit> {
        let vers = cx.tree.select_or_create(node, "GEDC/VERS")?;
        cx.tree
            .set_value(vers, Some(Schema::Successor.version().to_string()));
        if let Some(gedc) = cx.tree.select(node, "GEDC")? {
            cx.tree.remove_children_by_tag(gedc, &["FORM"]);
        }
        cx.tree.remove_children_by_tag(node, &["CHAR"]);

        Self::descend(cx, node)?;
        Ok(Visit::Skip)
    }

    fn from(&self, cx: &mut Conversion, node: NodeId) -> ConvertResult<Visit> {
        let vers = cx.tree.select_or_create(node, "GEDC/VERS")?;
        cx.tree
            .set_value(vers, Some(Schema::Legacy.version().to_string()));

        let form = cx.tree.select_or_create(node, "GEDC/FORM")?;
        if cx.tree.value(form).is_none() {
            cx.tree.set_value(form, Some("LINEAGE-LINKED".to_string()));
        }
        let charset = cx.tree.select_or_create(node, "CHAR")?;
        if cx.tree.value(charset).is_none() {
            cx.tree.set_value(charset, Some("UTF-8".to_string()));
        }

        Self::descend(cx, node)?;
        Ok(Visit::Skip)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::Direction;
    use crate::transform::pipeline::{convert_str, render, ConvertOptions};

    #[test]
    fn test_to_successor_header() {
        let options = ConvertOptions::default();
        let legacy = "0 HEAD\n1 SOUR MyApp\n2 VERS 3.1\n1 GEDC\n2 VERS 5.5.1\n2 FORM LINEAGE-LINKED\n1 CHAR ANSEL\n0 TRLR\n";
        let output = convert_str(legacy, Direction::ToSuccessor, &options).unwrap();
        assert_eq!(
            render(&output, &options),
            "0 HEAD\n1 SOUR MyApp\n2 VERS 3.1\n1 GEDC\n2 VERS 7.0\n0 TRLR\n"
        );
        // the producing system is not a citation
        assert_eq!(output.stats.externalized, 0);
    }

    #[test]
    fn test_to_legacy_header_creates_declarations() {
        let options = ConvertOptions::default();
        let output = convert_str("0 HEAD\n1 GEDC\n2 VERS 7.0\n0 TRLR\n", Direction::ToLegacy, &options).unwrap();
        assert_eq!(
            render(&output, &options),
            "0 HEAD\n1 GEDC\n2 VERS 5.5.1\n2 FORM LINEAGE-LINKED\n1 CHAR UTF-8\n0 TRLR\n"
        );
    }

    #[test]
    fn test_header_without_gedc() {
        let options = ConvertOptions::default();
        let output = convert_str("0 HEAD\n0 TRLR\n", Direction::ToSuccessor, &options).unwrap();
        assert_eq!(render(&output, &options), "0 HEAD\n1 GEDC\n2 VERS 7.0\n0 TRLR\n");
    }
}
