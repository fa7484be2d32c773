//! Transformation module.
//!
//! This module handles rewriting a document between the two schemas:
//! - DSL: path selector language
//! - Codec: long values and continuation lines
//! - Dispatch: tag-keyed transformations and the tree walk
//! - Relocation: externalization, internalization, deferred moves
//! - Rules: the built-in field mappings
//! - Pipeline: pass context and entry points

pub mod codec;
pub mod dispatch;
pub mod dsl;
pub mod pipeline;
pub mod relocation;
pub mod rules;

pub use codec::{LinePolicy, CONC_TAG, CONT_TAG};
pub use dispatch::{Registry, Transformation, Visit};
pub use dsl::{Selector, Step, StepIndex};
pub use pipeline::*;
pub use relocation::{Pending, RelocationQueue};
