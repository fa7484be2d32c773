//! NAME: `Given /Surname/ Suffix` split into name pieces.

use crate::error::ConvertResult;
use crate::models::NodeId;
use crate::transform::dispatch::{Transformation, Visit};
use crate::transform::pipeline::Conversion;

/// Pieces of a personal name value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameParts {
    pub given: Option<String>,
    pub surname: Option<String>,
    pub suffix: Option<String>,
}

impl NameParts {
    /// Parse `Given /Surname/ Suffix`. Every piece is optional.
    pub fn parse(value: &str) -> Self {
        let non_empty = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };

        let mut parts = value.splitn(3, '/');
        let given = parts.next().and_then(non_empty);
        match (parts.next(), parts.next()) {
            (Some(surname), rest) => Self {
                given,
                surname: non_empty(surname),
                suffix: rest.and_then(non_empty),
            },
            (None, _) => Self {
                given,
                ..Self::default()
            },
        }
    }

    /// Rebuild the value; `None` when every piece is missing.
    pub fn format(&self) -> Option<String> {
        let mut out = Vec::new();
        if let Some(ref given) = self.given {
            out.push(given.clone());
        }
        if let Some(ref surname) = self.surname {
            out.push(format!("/{}/", surname));
        }
        if let Some(ref suffix) = self.suffix {
            out.push(suffix.clone());
        }
        (!out.is_empty()).then(|| out.join(" "))
    }
}

/// Rewrites personal names.
pub struct PersonalName;

impl Transformation for PersonalName {
    fn name(&self) -> &'static str {
        "name"
    }

    fn legacy_tags(&self) -> &'static [&'static str] {
        &["NAME"]
    }

    fn successor_tags(&self) -> &'static [&'static str] {
        &["NAME"]
    }

    fn to(&self, cx: &mut Conversion, node: NodeId) -> ConvertResult<Visit> {
        let Some(value) = cx.tree.value(node).map(String::from) else {
            return Ok(Visit::Descend);
        };
        let parts = NameParts::parse(&value);

        let pieces = [
            ("GIVN", parts.given),
            ("SURN", parts.surname),
            ("NSFX", parts.suffix),
        ];
        let mut at = 0;
        for (tag, piece) in pieces {
            let Some(piece) = piece else { continue };
            if cx.tree.first_child(node, tag).is_none() {
                let child = cx.tree.create(tag);
                cx.tree.set_value(child, Some(piece));
                cx.tree.insert(node, at, child);
                at += 1;
            }
        }
        cx.tree.set_value(node, None);

        Ok(Visit::Descend)
    }

    fn from(&self, cx: &mut Conversion, node: NodeId) -> ConvertResult<Visit> {
        if cx.tree.value(node).is_some() {
            return Ok(Visit::Descend);
        }
        let piece = |tag: &str| cx.tree.child_value(node, tag).map(String::from);
        let parts = NameParts {
            given: piece("GIVN"),
            surname: piece("SURN"),
            suffix: piece("NSFX"),
        };
        if let Some(value) = parts.format() {
            cx.tree.set_value(node, Some(value));
        }

        Ok(Visit::Descend)
    }
}
