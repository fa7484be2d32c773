//! SOUR: citations without a source record.
//!
//! A legacy citation may describe its source inline (`SOUR <description>`).
//! The successor schema requires a pointer, so the description moves into a
//! new SOUR record as its title.

use crate::error::ConvertResult;
use crate::models::NodeId;
use crate::transform::dispatch::{Transformation, Visit};
use crate::transform::pipeline::Conversion;
use crate::transform::relocation;

/// Externalizes pointer-less source citations.
pub struct SourceCitation;

impl Transformation for SourceCitation {
    fn name(&self) -> &'static str {
        "source"
    }

    fn legacy_tags(&self) -> &'static [&'static str] {
        &["SOUR"]
    }

    fn successor_tags(&self) -> &'static [&'static str] {
        &[]
    }

    fn to(&self, cx: &mut Conversion, node: NodeId) -> ConvertResult<Visit> {
        let tree = &cx.tree;
        if tree.is_record(node) || tree.is_pointer(node) || tree.is_top_level(node) {
            return Ok(Visit::Descend);
        }

        let record = relocation::externalize(cx, node, "SOUR")?;
        if let Some(description) = cx.tree.value(record).map(String::from) {
            let title = cx.tree.create("TITL");
            cx.tree.set_value(title, Some(description));
            cx.tree.insert(record, 0, title);
            cx.tree.set_value(record, None);
        }

        // the citation's children now live in the record
        cx.descend(record)?;
        Ok(Visit::Skip)
    }

    fn from(&self, _cx: &mut Conversion, _node: NodeId) -> ConvertResult<Visit> {
        Ok(Visit::Descend)
    }
}
