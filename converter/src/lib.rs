//! # Gedshift - legacy and successor genealogical line-record conversion
//!
//! Gedshift reads level-numbered line-record documents, rewrites the tree
//! between the legacy vocabulary and its successor, and writes the result
//! back as text.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Line text  │────▶│   Parser    │────▶│  Transform  │────▶│   Writer    │
//! │ (any enc.)  │     │ (auto-enc)  │     │ (rules+DSL) │     │ (CONC/CONT) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use gedshift::{convert_str, render, ConvertOptions, Direction};
//!
//! let legacy = "0 @N1@ NOTE Shared remark\n0 TRLR\n";
//! let options = ConvertOptions::default();
//! let output = convert_str(legacy, Direction::ToSuccessor, &options).unwrap();
//! assert_eq!(render(&output, &options), "0 @N1@ SNOTE Shared remark\n0 TRLR\n");
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`logs`] - Pass-scoped log entries
//! - [`models`] - Node model (Tree, Node, NodeKind)
//! - [`parser`] - Line-record reading and writing
//! - [`store`] - Record stores and id allocation
//! - [`transform`] - Selectors, codec, dispatch, relocation and pipeline
//! - [`validation`] - Reference integrity checks

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Reading and writing
pub mod parser;

// Records
pub mod store;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConvertError,
    ConvertResult,
    ReferenceError,
    RelocationError,
    SelectorError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Direction,
    IdPolicy,
    Node,
    NodeId,
    NodeKind,
    Schema,
    Tree,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content,
    detect_encoding,
    read_bytes,
    read_file,
    read_str,
    writer::write,
    LineError,
    ReadResult,
};

// =============================================================================
// Re-exports - Records
// =============================================================================

pub use store::{IdAllocator, IdConvention, RecordStore};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::codec::{Continuation, Encoded, LinePolicy};
pub use transform::dispatch::{Registry, Transformation, Visit};
pub use transform::dsl::Selector;

pub use transform::pipeline::{
    convert_bytes,
    convert_file,
    convert_str,
    convert_tree,
    convert_with,
    render,
    Conversion,
    ConversionOutput,
    ConvertOptions,
    PassStats,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{check_references, CheckReport};
