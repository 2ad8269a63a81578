//! Lidy: YAML schemas written in YAML.
//!
//! A schema maps rule names to expressions. Building a [`Parser`] validates the schema
//! against the embedded metaschema and compiles it; parsing a document then checks it
//! against the rule `main` and returns a position-annotated [`LidyResult`] tree, shaped by
//! the [`BuilderRegistry`] callbacks registered per rule.

pub use crate::builders::{BuildError, Builder, BuilderRegistry};
pub use crate::document::{Document, DocumentError, Node, NodeKind, Tag};
pub use crate::errors::{CheckError, ErrorKind, Fatal, LidyError, Violation};
pub use crate::parser::{Parser, ParserOptions};
pub use crate::result::{Data, KeyValue, LidyResult, ListData, MapData, Position, Scalar};

pub mod builders;
pub mod diagnostics;
pub mod document;
pub mod errors;
pub mod parser;
pub mod result;
pub mod runtime;
pub mod schema;
pub mod validation;
