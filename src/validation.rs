//! Schema validation.
//!
//! A schema goes through three phases before it can check content:
//!
//! 1. **Metaschema**: the schema document is parsed as content of the embedded
//!    [`metaschema`], with [`builders::meta_builders`] adding the checks the metaschema
//!    cannot express (references resolve, merge sources are map checkers, sizes agree).
//! 2. **Compilation**: the now well-formed document becomes a [`RuleSet`].
//! 3. **Rule graph**: [`rule_set::check`] looks for a missing `main`, duplicate, unused and
//!    unreachable rules, and rules that reach themselves without consuming content.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::document::{Document, Node};
use crate::errors::LidyError;
use crate::parser::{Parser, ParserOptions};
use crate::runtime::predefined::Primitive;
use crate::schema::RuleSet;

pub mod builders;
pub mod metaschema;
pub mod rule_set;

/// The raw rule declarations of the schema under validation.
///
/// The meta builders consult it to resolve references before the schema is compiled.
#[derive(Debug)]
pub struct SchemaIndex {
    names: Vec<String>,
    nodes: HashMap<String, Node>,
    used: HashMap<String, AtomicBool>,
}

impl SchemaIndex {
    pub fn new(schema: &Document) -> Self {
        let mut names = Vec::new();
        let mut nodes = HashMap::new();
        let mut used = HashMap::new();
        for (key, value) in schema.root.entries() {
            let Some(name) = key.as_str() else {
                continue;
            };
            if nodes.contains_key(name) {
                continue;
            }
            names.push(name.to_string());
            nodes.insert(name.to_string(), value.clone());
            used.insert(name.to_string(), AtomicBool::new(false));
        }
        Self { names, nodes, used }
    }

    pub fn declares(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// The expression node declared for `name`.
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn mark_used(&self, name: &str) {
        if let Some(flag) = self.used.get(name) {
            flag.store(true, Ordering::Relaxed);
        }
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.used
            .get(name)
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }

    /// Declared rule names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn used_names(&self) -> impl Iterator<Item = &str> {
        self.names().filter(|name| self.is_used(name))
    }

    /// Declared rules followed by the predefined ones, for error messages.
    pub fn known_names(&self) -> Vec<String> {
        self.names()
            .map(str::to_string)
            .chain(Primitive::names().map(str::to_string))
            .collect()
    }
}

/// Runs every validation phase over `schema` and returns its compiled rules.
pub(crate) fn validate_schema(
    schema: &Document,
    options: &ParserOptions,
) -> Result<RuleSet, LidyError> {
    let index = Arc::new(SchemaIndex::new(schema));
    let meta = metaschema::rule_set()?;
    // the metaschema nests a few rules per schema level, so the content limit does not apply
    let bootstrap = Parser::trusted(
        Arc::clone(meta),
        builders::meta_builders(&index),
        ParserOptions::default(),
    );

    debug!(schema = %schema.name, "validating schema against the metaschema");
    bootstrap.run(schema).map_err(LidyError::schema)?;

    debug!(schema = %schema.name, "compiling schema");
    let mut rules = RuleSet::compile(schema)?;
    for name in index.used_names() {
        rules.mark_used(name);
    }

    debug!(schema = %schema.name, rules = rules.len(), "checking rule graph");
    rule_set::check(&rules, options).map_err(LidyError::Schema)?;
    Ok(rules)
}
