//! Line-record writer.
//!
//! Depth-first, one line per node: `LEVEL [@ID@ ]TAG[ VALUE|@XREF@]`. Values
//! are split with the schema's [`LinePolicy`] on the way out, so a value
//! holding newlines or exceeding the bound is written as continuation lines.

use crate::models::{NodeId, Schema, Tree};
use crate::transform::codec::{self, LinePolicy};

use super::escape_span_end;

/// Serialize every top-level record of `tree`.
pub fn write(tree: &Tree, schema: Schema, policy: &LinePolicy) -> String {
    let mut out = String::new();
    for child in tree.children(tree.root()) {
        write_node(&mut out, tree, *child, 0, schema, policy);
    }
    out
}

fn write_node(
    out: &mut String,
    tree: &Tree,
    node: NodeId,
    level: usize,
    schema: Schema,
    policy: &LinePolicy,
) {
    let mut continuations = Vec::new();

    out.push_str(&level.to_string());
    if let Some(id) = tree.id_of(node) {
        out.push_str(&format!(" @{}@", id));
    }
    out.push(' ');
    out.push_str(tree.tag(node));

    if let Some(xref) = tree.xref_of(node) {
        out.push_str(&format!(" @{}@", xref));
    } else if let Some(value) = tree.value(node) {
        let encoded = codec::split(value, policy);
        push_value(out, &encoded.head, schema);
        continuations = encoded.continuations;
    }
    out.push('\n');

    for (kind, text) in continuations {
        out.push_str(&format!("{} {}", level + 1, kind.tag()));
        push_value(out, &text, schema);
        out.push('\n');
    }

    for child in tree.children(node) {
        write_node(out, tree, *child, level + 1, schema, policy);
    }
}

fn push_value(out: &mut String, value: &str, schema: Schema) {
    if value.is_empty() {
        return;
    }
    out.push(' ');
    out.push_str(&escape(value, schema));
}

/// Double `@` so the reader restores it. `@#...@` escape sequences are
/// written as they are.
fn escape(value: &str, schema: Schema) -> String {
    let chars: Vec<char> = value.chars().collect();
    match schema {
        Schema::Legacy => {
            let mut out = String::with_capacity(value.len());
            let mut i = 0;
            while i < chars.len() {
                if let Some(end) = escape_span_end(&chars, i) {
                    out.extend(&chars[i..end]);
                    i = end;
                } else {
                    if chars[i] == '@' {
                        out.push('@');
                    }
                    out.push(chars[i]);
                    i += 1;
                }
            }
            out
        }
        Schema::Successor if value.starts_with('@') && escape_span_end(&chars, 0).is_none() => {
            format!("@{}", value)
        }
        Schema::Successor => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Node;
    use crate::parser::read_str;

    #[test]
    fn test_round_trip_normalizes() {
        let text = "0 HEAD\n1 GEDC\n2 VERS 5.5.1\n0 @I1@ INDI\n1 NAME John /Smith/\n1 BIRT\n2 DATE @#DJULIAN@ 1 JAN 1700\n1 NOTE a@@b\n2 CONT second line\n1 FAMS @F1@\n0 @F1@ FAM\n0 TRLR\n";
        let tree = read_str(text, Schema::Legacy).unwrap();
        assert_eq!(write(&tree, Schema::Legacy, &LinePolicy::legacy()), text);

        let messy = "0 HEAD\r\n\r\n  1 GEDC\r\n0 TRLR";
        let tree = read_str(messy, Schema::Legacy).unwrap();
        assert_eq!(
            write(&tree, Schema::Legacy, &LinePolicy::legacy()),
            "0 HEAD\n1 GEDC\n0 TRLR\n"
        );
    }

    #[test]
    fn test_escape_sequences_are_not_doubled() {
        let tree = Tree::from_records(&[
            Node::new("DATE").with_value("@#DJULIAN@ 1 JAN 1700"),
            Node::new("NOTE").with_value("@#open and more"),
        ]);
        let legacy = write(&tree, Schema::Legacy, &LinePolicy::legacy());
        assert_eq!(
            legacy,
            "0 DATE @#DJULIAN@ 1 JAN 1700\n0 NOTE @@#open and more\n"
        );
        let back = read_str(&legacy, Schema::Legacy).unwrap();
        let values: Vec<_> = back.children(back.root()).iter().map(|n| back.value(*n)).collect();
        assert_eq!(values, vec![Some("@#DJULIAN@ 1 JAN 1700"), Some("@#open and more")]);

        let successor = write(&tree, Schema::Successor, &LinePolicy::successor());
        assert_eq!(
            successor,
            "0 DATE @#DJULIAN@ 1 JAN 1700\n0 NOTE @@#open and more\n"
        );
        let back = read_str(&successor, Schema::Successor).unwrap();
        let note = back.children(back.root())[1];
        assert_eq!(back.value(note), Some("@#open and more"));
    }

    #[test]
    fn test_newlines_become_cont_lines() {
        let tree = Tree::from_records(&[Node::new("SNOTE")
            .with_id("N1")
            .with_value("first\n@second")
            .with_child(Node::new("LANG").with_value("en"))]);
        let text = write(&tree, Schema::Successor, &LinePolicy::successor());
        assert_eq!(text, "0 @N1@ SNOTE first\n1 CONT @@second\n1 LANG en\n");

        let back = read_str(&text, Schema::Successor).unwrap();
        let note = back.children(back.root())[0];
        assert_eq!(codec::decode(&back, note).as_deref(), Some("first\n@second"));
    }

    #[test]
    fn test_long_values_are_cut() {
        let value = "word ".repeat(10);
        let tree = Tree::from_records(&[Node::new("NOTE").with_value(value.trim_end())]);
        let text = write(&tree, Schema::Legacy, &LinePolicy::legacy().with_max_len(20));
        for line in text.lines() {
            let payload = line.splitn(3, ' ').nth(2).unwrap_or_default();
            assert!(payload.chars().count() <= 20, "line too long: {:?}", line);
        }
        assert!(text.contains("1 CONC "));
    }
}
