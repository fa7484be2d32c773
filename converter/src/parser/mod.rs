//! Line-record reader with encoding auto-detection.
//!
//! Turns `LEVEL [@ID@] TAG [VALUE]` lines into a [`Tree`] whose root is the
//! synthetic `_DOC` node. No mapping logic here; see [`writer`] for the
//! reverse direction.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use crate::models::{Schema, Tree};

pub mod writer;

static LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<level>[0-9]+) +(?:@(?P<id>[^@ ]+)@ +)?(?P<tag>[A-Za-z0-9_]+)(?: (?P<value>.*))?$")
        .expect("line grammar is a valid regex")
});

static POINTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@(?P<xref>[^@#][^@]*)@$").expect("pointer grammar is a valid regex"));

/// Reader error with context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    pub line: usize,
    pub tag: Option<String>,
    pub message: String,
}

impl std::fmt::Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "Line {}, tag '{}': {}", self.line, tag, self.message),
            None => write!(f, "Line {}: {}", self.line, self.message),
        }
    }
}

impl std::error::Error for LineError {}

impl LineError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            tag: None,
            message: message.into(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Result of reading with metadata
#[derive(Debug, Clone)]
pub struct ReadResult {
    /// Parsed document
    pub tree: Tree,
    /// Detected or used encoding
    pub encoding: String,
    /// Number of non-blank lines read
    pub lines: usize,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).into_owned(),
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.into_owned(),
            // Fallback: lossy UTF-8
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    }
}

/// Read a document from raw bytes, detecting the encoding.
///
/// A UTF-8 byte order mark is stripped and forces UTF-8.
pub fn read_bytes(bytes: &[u8], schema: Schema) -> Result<ReadResult, LineError> {
    let (bytes, encoding) = match bytes.strip_prefix(b"\xEF\xBB\xBF") {
        Some(rest) => (rest, "utf-8".to_string()),
        None => (bytes, detect_encoding(bytes)),
    };
    let content = decode_content(bytes, &encoding);
    let lines = content.lines().filter(|l| !l.trim().is_empty()).count();
    let tree = read_str(&content, schema)?;

    Ok(ReadResult {
        tree,
        encoding,
        lines,
    })
}

/// Read a document file, detecting the encoding.
pub fn read_file<P: AsRef<Path>>(path: P, schema: Schema) -> Result<ReadResult, LineError> {
    let bytes = std::fs::read(path.as_ref())
        .map_err(|e| LineError::new(0, format!("Cannot read file: {}", e)))?;
    read_bytes(&bytes, schema)
}

/// Read a document from text.
///
/// The first line must be level 0 and levels grow by at most one per line.
/// Blank lines are skipped.
pub fn read_str(content: &str, schema: Schema) -> Result<Tree, LineError> {
    let mut tree = Tree::new();
    // stack[level] is the parent of a line at that level
    let mut stack = vec![tree.root()];

    for (idx, line) in content.lines().enumerate() {
        let line_num = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        let caps = LINE_RE
            .captures(line)
            .ok_or_else(|| LineError::new(line_num, format!("Not a record line: '{}'", line)))?;
        let tag = caps["tag"].to_string();

        let level: usize = caps["level"]
            .parse()
            .map_err(|_| LineError::new(line_num, "Level out of range").with_tag(tag.as_str()))?;
        if level >= stack.len() {
            let message = if stack.len() == 1 {
                format!("First line must be level 0, found {}", level)
            } else {
                format!("Level jumps from {} to {}", stack.len() - 2, level)
            };
            return Err(LineError::new(line_num, message).with_tag(tag.as_str()));
        }
        stack.truncate(level + 1);

        let node = tree.create(tag.as_str());
        if let Some(id) = caps.name("id") {
            tree.set_id(node, id.as_str());
        }

        if let Some(raw) = caps.name("value").map(|m| m.as_str()) {
            if let Some(pointer) = POINTER_RE.captures(raw) {
                if tree.is_record(node) {
                    return Err(LineError::new(line_num, "A record cannot also be a pointer")
                        .with_tag(tag.as_str()));
                }
                tree.set_xref(node, &pointer["xref"]);
            } else if !raw.is_empty() {
                tree.set_value(node, Some(unescape(raw, schema)));
            }
        }

        tree.append(stack[level], node);
        stack.push(node);
    }

    Ok(tree)
}

/// End (exclusive) of an `@#...@` escape sequence starting at `at`, such as
/// the calendar escape in `@#DJULIAN@ 1 JAN 1700`. Its `@`s are never doubled.
pub(crate) fn escape_span_end(chars: &[char], at: usize) -> Option<usize> {
    if chars.get(at) != Some(&'@') || chars.get(at + 1) != Some(&'#') {
        return None;
    }
    chars[at + 2..]
        .iter()
        .position(|c| *c == '@')
        .map(|p| at + 2 + p + 1)
}

/// Undo `@` doubling in a value.
fn unescape(raw: &str, schema: Schema) -> String {
    match schema {
        Schema::Legacy => {
            let chars: Vec<char> = raw.chars().collect();
            let mut out = String::with_capacity(raw.len());
            let mut i = 0;
            while i < chars.len() {
                if chars[i] == '@' && chars.get(i + 1) == Some(&'@') {
                    out.push('@');
                    i += 2;
                } else if let Some(end) = escape_span_end(&chars, i) {
                    out.extend(&chars[i..end]);
                    i = end;
                } else {
                    out.push(chars[i]);
                    i += 1;
                }
            }
            out
        }
        Schema::Successor => match raw.strip_prefix("@@") {
            Some(rest) => format!("@{}", rest),
            None => raw.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "0 HEAD\n1 GEDC\n2 VERS 5.5.1\n0 @I1@ INDI\n1 NAME John /Smith/\n1 FAMS @F1@\n0 @F1@ FAM\n1 HUSB @I1@\n0 TRLR\n";

    #[test]
    fn test_read_structure() {
        let tree = read_str(SAMPLE, Schema::Legacy).unwrap();
        let root = tree.root();
        assert_eq!(tree.children(root).len(), 4);

        let indi = tree.select(root, "INDI#I1").unwrap().unwrap();
        assert_eq!(tree.child_value(indi, "NAME"), Some("John /Smith/"));
        let fams = tree.first_child(indi, "FAMS").unwrap();
        assert_eq!(tree.xref_of(fams), Some("F1"));
        assert_eq!(tree.select_value(root, "HEAD/GEDC/VERS").unwrap().as_deref(), Some("5.5.1"));
    }

    #[test]
    fn test_value_keeps_inner_spacing() {
        let tree = read_str("0 NOTE  two  spaces \n", Schema::Legacy).unwrap();
        let note = tree.children(tree.root())[0];
        assert_eq!(tree.value(note), Some(" two  spaces "));
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let tree = read_str("0 HEAD\r\n\r\n1 CHAR UTF-8\r\n0 TRLR\r\n", Schema::Legacy).unwrap();
        assert_eq!(tree.select_value(tree.root(), "HEAD/CHAR").unwrap().as_deref(), Some("UTF-8"));
    }

    #[test]
    fn test_at_escapes() {
        let legacy = read_str("0 NOTE mail a@@b.org @@home\n", Schema::Legacy).unwrap();
        assert_eq!(legacy.value(legacy.children(legacy.root())[0]), Some("mail a@b.org @home"));

        let successor = read_str("0 NOTE @@me and a@@b\n", Schema::Successor).unwrap();
        assert_eq!(
            successor.value(successor.children(successor.root())[0]),
            Some("@me and a@@b")
        );
    }

    #[test]
    fn test_hash_value_is_not_pointer() {
        let tree = read_str("0 DATE @#DJULIAN@ 1 JAN 1700\n", Schema::Legacy).unwrap();
        let date = tree.children(tree.root())[0];
        assert!(!tree.is_pointer(date));
        assert_eq!(tree.value(date), Some("@#DJULIAN@ 1 JAN 1700"));
    }

    #[test]
    fn test_escape_sequence_keeps_doubled_at_after_it() {
        let tree = read_str("0 NOTE @#DGREGORIAN@ and a@@b\n", Schema::Legacy).unwrap();
        let note = tree.children(tree.root())[0];
        assert_eq!(tree.value(note), Some("@#DGREGORIAN@ and a@b"));
    }

    #[test]
    fn test_level_errors() {
        let err = read_str("1 HEAD\n", Schema::Legacy).unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("level 0"));

        let err = read_str("0 HEAD\n2 VERS 5.5.1\n", Schema::Legacy).unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.tag.as_deref(), Some("VERS"));
        assert!(err.to_string().starts_with("Line 2, tag 'VERS': Level jumps from 0 to 2"));
    }

    #[test]
    fn test_malformed_lines() {
        assert!(read_str("HEAD\n", Schema::Legacy).is_err());
        assert!(read_str("0 @N1@ NOTE @N2@\n", Schema::Legacy).is_err());
        assert!(read_str("0 @N1@\n", Schema::Legacy).is_err());
    }

    #[test]
    fn test_bom_and_latin1() {
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice(SAMPLE.as_bytes());
        let result = read_bytes(&bytes, Schema::Legacy).unwrap();
        assert_eq!(result.encoding, "utf-8");
        assert_eq!(result.lines, 9);

        // "Société" in ISO-8859-1
        let decoded = decode_content(&[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9], "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_read_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), SAMPLE).unwrap();
        let result = read_file(file.path(), Schema::Legacy).unwrap();
        assert_eq!(result.tree.children(result.tree.root()).len(), 4);

        let err = read_file(file.path().with_extension("missing"), Schema::Legacy).unwrap_err();
        assert!(err.message.starts_with("Cannot read file"));
    }
}
