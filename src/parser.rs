//! Parser construction and content validation.
//!
//! ## Usage Workflow
//! ```rust
//! use lidy::{BuilderRegistry, Parser};
//!
//! let parser: Parser<()> = Parser::from_source(
//!     "schema.yaml",
//!     "main: { _map: { name: string }, _mapFacultative: { age: int } }",
//!     BuilderRegistry::new(),
//! )
//! .unwrap();
//!
//! let result = parser.parse_str("content.yaml", "name: Ada\nage: 36\n").unwrap();
//! assert_eq!(result.get("name").unwrap().data.as_str(), Some("Ada"));
//! assert!(parser.parse_str("content.yaml", "age: 36\n").is_err());
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::builders::BuilderRegistry;
use crate::document::Document;
use crate::errors::LidyError;
use crate::result::LidyResult;
use crate::runtime::{apply_rule, EvaluationContext, Outcome};
use crate::schema::{Rule, RuleSet};
use crate::validation;

/// Construction settings of a [`Parser`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Maximum nesting of rule applications while checking content.
    pub max_depth: usize,
    /// Reject schemas declaring rules that nothing reaches from `main`.
    pub report_unused_rules: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_depth: 256,
            report_unused_rules: true,
        }
    }
}

/// A validated schema and its builders, ready to check any number of documents.
#[derive(Debug)]
pub struct Parser<T> {
    rules: Arc<RuleSet>,
    builders: BuilderRegistry<T>,
    options: ParserOptions,
}

impl<T> Parser<T> {
    /// Validates `schema` against the metaschema and compiles it.
    pub fn make(schema: &Document, builders: BuilderRegistry<T>) -> Result<Self, LidyError> {
        Self::with_options(schema, builders, ParserOptions::default())
    }

    pub fn with_options(
        schema: &Document,
        builders: BuilderRegistry<T>,
        options: ParserOptions,
    ) -> Result<Self, LidyError> {
        debug!(schema = %schema.name, "building parser");
        let rules = validation::validate_schema(schema, &options)?;
        for name in builders.names() {
            if !rules.has(name) {
                warn!(rule = name, "builder registered for a rule the schema does not declare");
            }
        }
        Ok(Self {
            rules: Arc::new(rules),
            builders,
            options,
        })
    }

    /// Parses `text` as the schema document and builds a parser from it.
    pub fn from_source(
        name: &str,
        text: &str,
        builders: BuilderRegistry<T>,
    ) -> Result<Self, LidyError> {
        let schema = Document::parse(name, text)?;
        Self::make(&schema, builders)
    }

    /// A parser over an already trusted rule set, skipping validation.
    pub(crate) fn trusted(
        rules: Arc<RuleSet>,
        builders: BuilderRegistry<T>,
        options: ParserOptions,
    ) -> Self {
        Self {
            rules,
            builders,
            options,
        }
    }

    /// Checks `content` against the rule `main`.
    pub fn parse(&self, content: &Document) -> Result<LidyResult<T>, LidyError> {
        self.run(content).map_err(LidyError::content)
    }

    pub fn parse_str(&self, name: &str, text: &str) -> Result<LidyResult<T>, LidyError> {
        let content = Document::parse(name, text)?;
        self.parse(&content)
    }

    pub(crate) fn run(&self, content: &Document) -> Outcome<T> {
        let context = EvaluationContext::new(self, &content.name);
        apply_rule(&context, "main", &content.root)
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.names()
    }

    pub fn builders(&self) -> &BuilderRegistry<T> {
        &self.builders
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }
}
