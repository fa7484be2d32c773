//! High-level conversion API.
//!
//! A [`Conversion`] is the explicit context of one pass: it owns the tree
//! being rewritten and every pass-scoped collaborator (record stores, id
//! allocator, relocation queue, log). The functions at the bottom of this
//! module combine reading, converting and writing.
//!
//! # Example
//!
//! ```rust
//! use gedshift::models::Direction;
//! use gedshift::transform::pipeline::{convert_str, render, ConvertOptions};
//!
//! let legacy = "0 HEAD\n1 GEDC\n2 VERS 5.5.1\n2 FORM LINEAGE-LINKED\n1 CHAR UTF-8\n0 TRLR\n";
//! let options = ConvertOptions::default();
//! let output = convert_str(legacy, Direction::ToSuccessor, &options).unwrap();
//!
//! assert_eq!(render(&output, &options), "0 HEAD\n1 GEDC\n2 VERS 7.0\n0 TRLR\n");
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::rc::Rc;

use crate::error::ConvertResult;
use crate::logs::{LogEntry, PassLog};
use crate::models::{Direction, Node, NodeId, Schema, Tree};
use crate::parser::{self, writer};
use crate::store::{IdAllocator, IdConvention, RecordStore};
use crate::validation::{check_references, CheckReport};

use super::codec::{self, LinePolicy};
use super::dispatch::Registry;
use super::relocation::{self, RelocationQueue};

// =============================================================================
// Options
// =============================================================================

/// Options for a conversion pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Line policy of legacy documents
    pub legacy_lines: LinePolicy,

    /// Line policy of successor documents
    pub successor_lines: LinePolicy,

    /// Identifier convention of legacy documents
    pub legacy_ids: IdConvention,

    /// Identifier convention of successor documents
    pub successor_ids: IdConvention,

    /// Inline multimedia records when converting to the legacy schema
    pub internalize_media: bool,

    /// Separator placed between merged address lines
    pub address_separator: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            legacy_lines: LinePolicy::legacy(),
            successor_lines: LinePolicy::successor(),
            legacy_ids: IdConvention::legacy(),
            successor_ids: IdConvention::successor(),
            internalize_media: true,
            address_separator: " - ".to_string(),
        }
    }
}

impl ConvertOptions {
    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load options from a JSON file.
    pub fn from_file(path: &Path) -> ConvertResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    pub fn line_policy(&self, schema: Schema) -> &LinePolicy {
        match schema {
            Schema::Legacy => &self.legacy_lines,
            Schema::Successor => &self.successor_lines,
        }
    }

    pub fn id_convention(&self, schema: Schema) -> &IdConvention {
        match schema {
            Schema::Legacy => &self.legacy_ids,
            Schema::Successor => &self.successor_ids,
        }
    }
}

// =============================================================================
// Pass context
// =============================================================================

/// Counters reported at the end of a pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassStats {
    /// Nodes the walk visited
    pub visited: usize,
    /// Nodes a registered transformation handled
    pub handled: usize,
    /// Values whose continuation children were folded in
    pub collapsed: usize,
    /// Values that gained continuation children
    pub expanded: usize,
    /// Records created by immediate externalization
    pub externalized: usize,
    /// Records created by draining the relocation queue
    pub relocated: usize,
    /// Pointers replaced by a copy of their record
    pub internalized: usize,
    /// Internalized records dropped because nothing references them
    pub pruned: usize,
}

/// One conversion pass over one document
pub struct Conversion<'a> {
    /// The document being rewritten in place
    pub tree: Tree,
    pub direction: Direction,
    pub options: &'a ConvertOptions,
    /// Records of the source schema, indexed when the pass starts
    pub source: RecordStore,
    /// Records of the destination schema, filled as they are built
    pub target: RecordStore,
    pub ids: IdAllocator,
    pub queue: RelocationQueue,
    pub log: PassLog,
    pub stats: PassStats,
    /// Source records copied inline by internalization
    pub(crate) internalized: HashSet<NodeId>,
    registry: Rc<Registry>,
}

impl<'a> Conversion<'a> {
    /// Set up a pass: index the source records and reserve their ids.
    pub fn new(
        tree: Tree,
        direction: Direction,
        options: &'a ConvertOptions,
        registry: Rc<Registry>,
    ) -> ConvertResult<Self> {
        let source = RecordStore::index(&tree, tree.root())?;
        let ids = IdAllocator::new(options.id_convention(direction.target()).clone(), &tree);
        Ok(Self {
            tree,
            direction,
            options,
            source,
            target: RecordStore::new(),
            ids,
            queue: RelocationQueue::new(),
            log: PassLog::new(),
            stats: PassStats::default(),
            internalized: HashSet::new(),
            registry,
        })
    }

    pub fn registry(&self) -> Rc<Registry> {
        Rc::clone(&self.registry)
    }

    /// Dispatch every child of `node`.
    pub fn descend(&mut self, node: NodeId) -> ConvertResult<()> {
        let registry = self.registry();
        registry.dispatch(self, node)
    }

    /// Dispatch `node` itself.
    pub fn visit(&mut self, node: NodeId) -> ConvertResult<()> {
        let registry = self.registry();
        registry.visit(self, node)
    }

    /// Run every stage of the pass. Any error aborts it.
    pub fn run(mut self) -> ConvertResult<ConversionOutput> {
        let target = self.direction.target();
        self.log.info(format!(
            "Converting {:?} -> {:?} ({} source records)",
            self.direction.source(),
            target,
            self.source.len()
        ));

        self.stats.collapsed = codec::collapse_all(&mut self.tree);
        if self.stats.collapsed > 0 {
            self.log
                .info_indent(format!("Collapsed {} continued values", self.stats.collapsed), 1);
        }

        let root = self.tree.root();
        self.descend(root)?;
        self.log.success(format!(
            "Dispatched {} nodes ({} handled)",
            self.stats.visited, self.stats.handled
        ));

        let drained = relocation::drain(&mut self)?;
        if drained > 0 {
            self.log.success(format!("Drained {} pending relocation(s)", drained));
        }

        let pruned = relocation::prune_internalized(&mut self);
        if pruned > 0 {
            self.log
                .info_indent(format!("Pruned {} unreferenced internalized record(s)", pruned), 1);
        }
        self.queue.assert_empty()?;

        if target == Schema::Legacy {
            let policy = *self.options.line_policy(target);
            self.stats.expanded = codec::expand_all(&mut self.tree, &policy);
            if self.stats.expanded > 0 {
                self.log
                    .info_indent(format!("Split {} long values", self.stats.expanded), 1);
            }
        }

        let check = check_references(&self.tree)?;
        self.log.success(format!(
            "{} records, {} pointers, all references resolve",
            check.records, check.pointers
        ));

        Ok(ConversionOutput {
            records: self.target.summary(),
            tree: self.tree,
            direction: self.direction,
            stats: self.stats,
            check,
            logs: self.log.into_entries(),
        })
    }
}

// =============================================================================
// Output
// =============================================================================

/// Result of a complete pass
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// The rewritten document, in the destination vocabulary
    pub tree: Tree,
    pub direction: Direction,
    pub stats: PassStats,
    /// Destination records per category
    pub records: BTreeMap<String, usize>,
    /// Reference integrity of the result
    pub check: CheckReport,
    pub logs: Vec<LogEntry>,
}

impl ConversionOutput {
    /// Schema of the rewritten document
    pub fn schema(&self) -> Schema {
        self.direction.target()
    }

    /// Owned copy of the whole document
    pub fn to_node(&self) -> Node {
        self.tree.to_node(self.tree.root())
    }
}

// =============================================================================
// Entry points
// =============================================================================

/// Convert a parsed document with the built-in rules.
pub fn convert_tree(
    tree: Tree,
    direction: Direction,
    options: &ConvertOptions,
) -> ConvertResult<ConversionOutput> {
    convert_with(tree, direction, options, Rc::new(Registry::standard()))
}

/// Convert a parsed document with a custom rule registry.
pub fn convert_with(
    tree: Tree,
    direction: Direction,
    options: &ConvertOptions,
    registry: Rc<Registry>,
) -> ConvertResult<ConversionOutput> {
    Conversion::new(tree, direction, options, registry)?.run()
}

/// Read line-record text in the source schema of `direction`, then convert it.
pub fn convert_str(
    text: &str,
    direction: Direction,
    options: &ConvertOptions,
) -> ConvertResult<ConversionOutput> {
    let tree = parser::read_str(text, direction.source())?;
    convert_tree(tree, direction, options)
}

/// Like [`convert_str`], detecting the text encoding first.
pub fn convert_bytes(
    bytes: &[u8],
    direction: Direction,
    options: &ConvertOptions,
) -> ConvertResult<ConversionOutput> {
    let read = parser::read_bytes(bytes, direction.source())?;
    log::info!("Read {} lines ({})", read.lines, read.encoding);
    convert_tree(read.tree, direction, options)
}

/// Read a file and convert it.
pub fn convert_file(
    path: &Path,
    direction: Direction,
    options: &ConvertOptions,
) -> ConvertResult<ConversionOutput> {
    let bytes = std::fs::read(path)?;
    convert_bytes(&bytes, direction, options)
}

/// Write the converted document as line-record text.
pub fn render(output: &ConversionOutput, options: &ConvertOptions) -> String {
    let schema = output.schema();
    writer::write(&output.tree, schema, options.line_policy(schema))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConvertError, ReferenceError};
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_options() {
        let opts = ConvertOptions::default();
        assert_eq!(opts.legacy_lines.max_len, Some(200));
        assert_eq!(opts.successor_lines.max_len, None);
        assert!(opts.internalize_media);
        assert_eq!(opts.address_separator, " - ");
        assert_eq!(opts.id_convention(Schema::Successor).prefix("OBJE"), "O");
        assert_eq!(opts.id_convention(Schema::Legacy).prefix("OBJE"), "M");
    }

    #[test]
    fn test_partial_options_json() {
        let opts = ConvertOptions::from_json(
            r#"{ "internalize_media": false, "legacy_lines": { "max_len": 80 } }"#,
        )
        .unwrap();
        assert!(!opts.internalize_media);
        assert_eq!(opts.legacy_lines.max_len, Some(80));
        assert_eq!(opts.legacy_lines.look_back, 20);
        assert_eq!(opts.address_separator, " - ");

        let back = ConvertOptions::from_json(&opts.to_json().unwrap()).unwrap();
        assert_eq!(back, opts);
    }

    #[test]
    fn test_options_from_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{ "address_separator": ", " }"#).unwrap();
        let opts = ConvertOptions::from_file(file.path()).unwrap();
        assert_eq!(opts.address_separator, ", ");
    }

    #[test]
    fn test_unresolved_reference_aborts_pass() {
        let tree = Tree::from_records(&[
            Node::new("INDI")
                .with_id("I1")
                .with_child(Node::new("FAMS").with_xref("F9")),
            Node::new("TRLR"),
        ]);
        let err = convert_tree(tree, Direction::ToSuccessor, &ConvertOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Reference(ReferenceError::Unresolved { ref id, ref category })
                if id == "F9" && category == "FAM"
        ));
    }

    #[test]
    fn test_duplicate_source_ids_abort_pass() {
        let tree = Tree::from_records(&[
            Node::new("INDI").with_id("I1"),
            Node::new("INDI").with_id("I1"),
        ]);
        let err = convert_tree(tree, Direction::ToSuccessor, &ConvertOptions::default()).unwrap_err();
        assert!(matches!(err, ConvertError::Reference(ReferenceError::DuplicateId { .. })));
    }

    #[test]
    fn test_empty_registry_passes_through() {
        let tree = Tree::from_records(&[
            Node::new("INDI")
                .with_id("I1")
                .with_child(Node::new("NAME").with_value("John /Smith/")),
            Node::new("TRLR"),
        ]);
        let before = tree.to_node(tree.root());
        let output = convert_with(
            tree,
            Direction::ToSuccessor,
            &ConvertOptions::default(),
            Rc::new(Registry::new()),
        )
        .unwrap();
        assert_eq!(output.to_node(), before);
        assert_eq!(output.records.get("INDI"), Some(&1));
        assert_eq!(output.stats.handled, 0);
        assert_eq!(output.stats.visited, 3);
        assert!(!output.logs.is_empty());
    }

    #[test]
    fn test_convert_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "0 HEAD\n1 GEDC\n2 VERS 7.0\n0 @N1@ SNOTE Shared\n0 TRLR\n").unwrap();
        let options = ConvertOptions::default();
        let output = convert_file(file.path(), Direction::ToLegacy, &options).unwrap();
        assert_eq!(output.schema(), Schema::Legacy);
        let text = render(&output, &options);
        assert!(text.contains("0 @N1@ NOTE Shared\n"));
        assert!(text.contains("2 VERS 5.5.1\n"));
    }
}
