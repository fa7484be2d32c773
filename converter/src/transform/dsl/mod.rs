//! Path selector language for addressing nodes in a [`crate::models::Tree`]
//!
//! This module provides:
//! - `path`: Step grammar and the parsed [`Selector`]
//! - `executor`: Read, read-as-list, and traverse-and-create evaluation
//!
//! ## Grammar
//!
//! ```text
//! INDI#I1/NAME{John /Smith/}      one NAME of record I1 with that value
//! FAM/(HUSB|WIFE)[]               every HUSB or WIFE pointer of the only FAM
//! INDI#I1/FAMS@F1                 the FAMS pointer to F1
//! HEAD/GEDC/VERS                  read; with select_or_create, create if missing
//! ```
//!
//! ## Example
//!
//! ```rust
//! use gedshift::models::{Node, Tree};
//!
//! let mut tree = Tree::from_records(&[Node::new("HEAD")]);
//! let root = tree.root();
//!
//! let vers = tree.select_or_create(root, "HEAD/GEDC/VERS").unwrap();
//! tree.set_value(vers, Some("7.0".into()));
//!
//! assert_eq!(tree.select_value(root, "HEAD/GEDC/VERS").unwrap().as_deref(), Some("7.0"));
//! ```

pub mod executor;
pub mod path;

pub use path::{Selector, Step, StepIndex};
