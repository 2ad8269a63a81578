//! Compiled schemas.
//!
//! A schema document is compiled into a [`RuleSet`] of typed [`Expression`]s once it has
//! passed metaschema validation. Compilation failures are [`Fatal`](crate::errors::Fatal):
//! they mean the metaschema let a malformed expression through.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::document::{decode_bool, decode_float, decode_int, Node, Tag};
use crate::result::Position;

mod compile;
pub mod range;

pub use range::{NumericKind, RangeSpec};

// ============================================================================
// EXPRESSIONS
// ============================================================================

#[derive(Debug, Clone)]
pub enum Expression {
    /// A rule name, resolved at evaluation time.
    Reference(String),
    Regex(Pattern),
    In(InSet),
    Range(RangeSpec),
    OneOf(Vec<Expression>),
    Map(MapMatcher),
    List(ListMatcher),
}

impl Expression {
    pub fn keyword(&self) -> &'static str {
        match self {
            Expression::Reference(_) => "rule",
            Expression::Regex(_) => "_regex",
            Expression::In(_) => "_in",
            Expression::Range(_) => "_range",
            Expression::OneOf(_) => "_oneOf",
            Expression::Map(_) => "_map*",
            Expression::List(_) => "_list*",
        }
    }
}

/// A compiled `_regex` checker.
#[derive(Clone)]
pub struct Pattern {
    pub source: String,
    pub regex: Regex,
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern(/{}/)", self.source)
    }
}

/// Accepted `_in` values, grouped by tag and compared by canonical value.
#[derive(Debug, Clone, Default)]
pub struct InSet {
    values: HashMap<Tag, HashSet<String>>,
    listing: Vec<String>,
}

impl InSet {
    pub fn insert(&mut self, node: &Node) {
        self.values
            .entry(node.tag.clone())
            .or_default()
            .insert(canonical(node));
        self.listing.push(node.value.clone());
    }

    pub fn contains(&self, node: &Node) -> bool {
        self.values
            .get(&node.tag)
            .map_or(false, |values| values.contains(&canonical(node)))
    }

    /// The accepted values as written in the schema.
    pub fn listing(&self) -> &[String] {
        &self.listing
    }
}

/// Text of a scalar in a form where equal values of one tag compare equal.
fn canonical(node: &Node) -> String {
    let text = node.value.as_str();
    let decoded = match node.tag {
        Tag::Int => decode_int(text).map(|n| n.to_string()),
        Tag::Float => decode_float(text).map(|x| x.to_string()),
        Tag::Bool => decode_bool(text).map(|b| b.to_string()),
        Tag::Null => Some("null".to_string()),
        _ => None,
    };
    decoded.unwrap_or_else(|| text.to_string())
}

/// `_min`, `_max` and `_nb` of a map or list matcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sizing {
    pub min: Option<usize>,
    pub max: Option<usize>,
    pub nb: Option<usize>,
}

impl Sizing {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.nb.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MapMatcher {
    /// `_map` entries, in schema order.
    pub mandatory: Vec<(String, Expression)>,
    /// `_mapFacultative` entries, in schema order.
    pub facultative: Vec<(String, Expression)>,
    /// `_mapOf` key/value patterns, tried in order.
    pub catch_all: Vec<(Expression, Expression)>,
    /// `_merge` sources.
    pub merge: Vec<Expression>,
    pub sizing: Option<Sizing>,
}

#[derive(Debug, Clone, Default)]
pub struct ListMatcher {
    /// `_list`
    pub positional: Vec<Expression>,
    /// `_listFacultative`
    pub optional: Vec<Expression>,
    /// `_listOf`
    pub catch_all: Option<Box<Expression>>,
    pub sizing: Option<Sizing>,
}

// ============================================================================
// RULES
// ============================================================================

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: Arc<str>,
    pub expression: Expression,
    /// Position of the rule's name in the schema.
    pub position: Position,
    pub(crate) used: bool,
}

impl Rule {
    /// Whether some rule reference in the schema names this rule.
    pub fn is_used(&self) -> bool {
        self.used
    }
}

/// Named rules in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    index: HashMap<String, usize>,
    duplicates: Vec<(String, Position)>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a rule. A later rule with an existing name is only remembered as a duplicate.
    pub fn register(&mut self, rule: Rule) {
        match self.index.get(&*rule.name) {
            Some(_) => {
                self.duplicates.push((rule.name.to_string(), rule.position));
            }
            None => {
                self.index.insert(rule.name.to_string(), self.rules.len());
                self.rules.push(rule);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.index.get(name).map(|&i| &self.rules[i])
    }

    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| &*rule.name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Names and positions of rule declarations that repeat an earlier name.
    pub fn duplicates(&self) -> &[(String, Position)] {
        &self.duplicates
    }

    pub(crate) fn mark_used(&mut self, name: &str) {
        if let Some(&i) = self.index.get(name) {
            self.rules[i].used = true;
        }
    }
}
