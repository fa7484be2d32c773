//! NOTE / SNOTE: shared notes are their own record category in the successor
//! schema. Inline note text keeps the NOTE tag both ways.

use crate::error::ConvertResult;
use crate::models::NodeId;
use crate::transform::dispatch::{Transformation, Visit};
use crate::transform::pipeline::Conversion;

/// Renames shared note records and the pointers to them.
pub struct Note;

impl Transformation for Note {
    fn name(&self) -> &'static str {
        "note"
    }

    fn legacy_tags(&self) -> &'static [&'static str] {
        &["NOTE"]
    }

    fn successor_tags(&self) -> &'static [&'static str] {
        &["SNOTE"]
    }

    fn to(&self, cx: &mut Conversion, node: NodeId) -> ConvertResult<Visit> {
        if cx.tree.is_record(node) || cx.tree.is_pointer(node) {
            cx.tree.set_tag(node, "SNOTE");
        }
        Ok(Visit::Descend)
    }

    fn from(&self, cx: &mut Conversion, node: NodeId) -> ConvertResult<Visit> {
        cx.tree.set_tag(node, "NOTE");
        Ok(Visit::Descend)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::Direction;
    use crate::transform::pipeline::{convert_str, render, ConvertOptions};

    const LEGACY: &str = "\
0 @I1@ INDI
1 NOTE @N1@
1 NOTE Inline remark
0 @N1@ NOTE Shared remark
1 CONC  continued
0 TRLR
";

    #[test]
    fn test_shared_notes_become_snote() {
        let options = ConvertOptions::default();
        let output = convert_str(LEGACY, Direction::ToSuccessor, &options).unwrap();
        assert_eq!(
            render(&output, &options),
            "0 @I1@ INDI\n1 SNOTE @N1@\n1 NOTE Inline remark\n0 @N1@ SNOTE Shared remark continued\n0 TRLR\n"
        );
        assert_eq!(output.records.get("SNOTE"), Some(&1));
        assert_eq!(output.check.pointers, 1);
    }

    #[test]
    fn test_round_trip_restores_note() {
        let options = ConvertOptions::default();
        let successor = convert_str(LEGACY, Direction::ToSuccessor, &options).unwrap();
        let text = render(&successor, &options);
        let legacy = convert_str(&text, Direction::ToLegacy, &options).unwrap();
        assert_eq!(
            render(&legacy, &options),
            "0 @I1@ INDI\n1 NOTE @N1@\n1 NOTE Inline remark\n0 @N1@ NOTE Shared remark continued\n0 TRLR\n"
        );
    }
}
