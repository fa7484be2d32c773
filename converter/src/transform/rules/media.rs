//! OBJE: multimedia links.
//!
//! The successor schema only knows multimedia records, so inline objects are
//! relocated into records once the walk is over. Going back, pointers can be
//! replaced with an inline copy of their record.

use crate::error::ConvertResult;
use crate::models::{NodeId, Tree};
use crate::transform::dispatch::{Transformation, Visit};
use crate::transform::pipeline::Conversion;
use crate::transform::relocation;

/// File format to media type
const MEDIA_TYPES: [(&str, &str); 11] = [
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("pdf", "application/pdf"),
    ("wav", "audio/wav"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
];

/// Media type for a legacy file format; unknown formats pass through.
pub fn media_type(format: &str) -> String {
    let lower = format.trim().to_lowercase();
    MEDIA_TYPES
        .iter()
        .find(|(ext, _)| *ext == lower)
        .map(|(_, mime)| mime.to_string())
        .unwrap_or_else(|| format.to_string())
}

/// Legacy file format for a media type; unknown types pass through.
pub fn file_format(media_type: &str) -> String {
    let lower = media_type.trim().to_lowercase();
    MEDIA_TYPES
        .iter()
        .find(|(_, mime)| *mime == lower)
        .map(|(ext, _)| ext.to_string())
        .unwrap_or_else(|| media_type.to_string())
}

/// Apply `map` to every `FILE/FORM` value of `node`.
fn map_formats(tree: &mut Tree, node: NodeId, map: fn(&str) -> String) {
    for file in tree.children_by_tag(node, &["FILE"]) {
        for form in tree.children_by_tag(file, &["FORM"]) {
            if let Some(value) = tree.value(form).map(map) {
                tree.set_value(form, Some(value));
            }
        }
    }
}

/// Rewrites multimedia records, links and inline objects.
pub struct Media;

impl Transformation for Media {
    fn name(&self) -> &'static str {
        "media"
    }

    fn legacy_tags(&self) -> &'static [&'static str] {
        &["OBJE"]
    }

    fn successor_tags(&self) -> &'static [&'static str] {
        &["OBJE"]
    }

    fn to(&self, cx: &mut Conversion, node: NodeId) -> ConvertResult<Visit> {
        if cx.tree.is_pointer(node) {
            return Ok(Visit::Descend);
        }
        if !cx.tree.is_record(node) && !cx.tree.is_top_level(node) {
            relocation::defer_externalize(cx, node, "OBJE");
            return Ok(Visit::Skip);
        }

        // a format stated next to FILE belongs under it
        let forms = cx.tree.children_by_tag(node, &["FORM"]);
        if !forms.is_empty() {
            let file = cx.tree.select_or_create(node, "FILE[0]")?;
            let mut at = 0;
            for form in forms {
                if cx.tree.first_child(file, "FORM").is_none() {
                    cx.tree.insert(file, at, form);
                    at += 1;
                } else {
                    cx.tree.detach(form);
                }
            }
        }
        map_formats(&mut cx.tree, node, media_type);

        Ok(Visit::Descend)
    }

    fn from(&self, cx: &mut Conversion, node: NodeId) -> ConvertResult<Visit> {
        if cx.tree.is_pointer(node) {
            if !cx.options.internalize_media {
                return Ok(Visit::Descend);
            }
            relocation::internalize(cx, node)?;
        }
        map_formats(&mut cx.tree, node, file_format);

        Ok(Visit::Descend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;
    use crate::transform::pipeline::{convert_str, render, ConvertOptions};

    #[test]
    fn test_media_type_mapping() {
        assert_eq!(media_type("JPG"), "image/jpeg");
        assert_eq!(media_type("tiff"), "image/tiff");
        assert_eq!(media_type("ole"), "ole");
        assert_eq!(file_format("image/jpeg"), "jpg");
        assert_eq!(file_format("audio/mpeg"), "mp3");
        assert_eq!(file_format("text/html"), "text/html");
    }

    #[test]
    fn test_inline_objects_are_relocated() {
        let options = ConvertOptions::default();
        let legacy = "\
0 @I1@ INDI
1 OBJE
2 FILE portrait.jpg
3 FORM jpg
2 TITL Portrait
1 OBJE @M1@
0 @F1@ FAM
1 OBJE
2 FORM pdf
2 FILE marriage.pdf
0 @M1@ OBJE
1 FILE birth.png
2 FORM PNG
0 TRLR
";
        let output = convert_str(legacy, Direction::ToSuccessor, &options).unwrap();
        // one OBJE record is already registered when the queue drains
        assert_eq!(output.stats.relocated, 2);
        assert_eq!(output.records.get("OBJE"), Some(&3));
        assert_eq!(
            render(&output, &options),
            "\
0 @I1@ INDI
1 OBJE @O2@
1 OBJE @M1@
0 @F1@ FAM
1 OBJE @O3@
0 @M1@ OBJE
1 FILE birth.png
2 FORM image/png
0 @O2@ OBJE
1 FILE portrait.jpg
2 FORM image/jpeg
1 TITL Portrait
0 @O3@ OBJE
1 FILE marriage.pdf
2 FORM application/pdf
0 TRLR
"
        );
    }

    #[test]
    fn test_pointers_internalized_for_legacy() {
        let options = ConvertOptions::default();
        let successor = "\
0 @I1@ INDI
1 OBJE @O1@
0 @O1@ OBJE
1 FILE portrait.jpg
2 FORM image/jpeg
0 TRLR
";
        let output = convert_str(successor, Direction::ToLegacy, &options).unwrap();
        assert_eq!(output.stats.internalized, 1);
        assert_eq!(output.stats.pruned, 1);
        assert_eq!(
            render(&output, &options),
            "0 @I1@ INDI\n1 OBJE\n2 FILE portrait.jpg\n3 FORM jpg\n0 TRLR\n"
        );
    }

    #[test]
    fn test_pointers_kept_when_not_internalizing() {
        let options = ConvertOptions {
            internalize_media: false,
            ..ConvertOptions::default()
        };
        let successor = "0 @I1@ INDI\n1 OBJE @O1@\n0 @O1@ OBJE\n1 FILE a.gif\n2 FORM image/gif\n0 TRLR\n";
        let output = convert_str(successor, Direction::ToLegacy, &options).unwrap();
        assert_eq!(
            render(&output, &options),
            "0 @I1@ INDI\n1 OBJE @O1@\n0 @O1@ OBJE\n1 FILE a.gif\n2 FORM gif\n0 TRLR\n"
        );
    }
}
