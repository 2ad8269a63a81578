//! Schema document to [`RuleSet`] compilation.

use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use super::{Expression, InSet, ListMatcher, MapMatcher, Pattern, RangeSpec, Rule, RuleSet, Sizing};
use crate::document::{decode_int, Document, Node, NodeKind, Tag};
use crate::errors::Fatal;
use crate::result::Position;

impl RuleSet {
    /// Compiles every top-level entry of `document` into a rule.
    ///
    /// The document is expected to have passed metaschema validation; anything the
    /// metaschema should have rejected is reported as [`Fatal::MalformedExpression`].
    pub fn compile(document: &Document) -> Result<Self, Fatal> {
        let root = &document.root;
        if !root.is_mapping() {
            return Err(Fatal::malformed(
                root,
                "a schema must map rule names to expressions",
            ));
        }

        let mut rules = RuleSet::new();
        for (key, value) in root.entries() {
            let name = key
                .as_str()
                .ok_or_else(|| Fatal::malformed(key, "rule names must be strings"))?;
            rules.register(Rule {
                name: Arc::from(name),
                expression: compile_expression(value)?,
                position: Position::of(&document.name, key),
                used: false,
            });
        }
        debug!(document = %document.name, rules = rules.len(), "compiled rule set");
        Ok(rules)
    }
}

pub(crate) fn compile_expression(node: &Node) -> Result<Expression, Fatal> {
    match node.kind {
        NodeKind::Scalar => node
            .as_str()
            .map(|name| Expression::Reference(name.to_string()))
            .ok_or_else(|| {
                Fatal::malformed(node, format!("expected a rule name, found {}", node.describe()))
            }),
        NodeKind::Sequence => Err(Fatal::malformed(node, "an expression cannot be a sequence")),
        NodeKind::Mapping => compile_checker(node),
    }
}

fn compile_checker(node: &Node) -> Result<Expression, Fatal> {
    let mut map = MapMatcher::default();
    let mut list = ListMatcher::default();
    let mut sizing = Sizing::default();
    let (mut is_map, mut is_list) = (false, false);
    let mut unknown = None;

    for (key, value) in node.entries() {
        let keyword = key
            .as_str()
            .ok_or_else(|| Fatal::malformed(key, "checker keywords must be strings"))?;
        // a scalar checker decides the match alone
        if let Some(checker) = compile_scalar_checker(keyword, value)? {
            return Ok(checker);
        }
        match keyword {
            "_map" => {
                map.mandatory = compile_entries(value)?;
                is_map = true;
            }
            "_mapFacultative" => {
                map.facultative = compile_entries(value)?;
                is_map = true;
            }
            "_mapOf" => {
                map.catch_all = compile_patterns(value)?;
                is_map = true;
            }
            "_merge" => {
                map.merge = compile_sequence(value)?;
                is_map = true;
            }
            "_list" => {
                list.positional = compile_sequence(value)?;
                is_list = true;
            }
            "_listFacultative" => {
                list.optional = compile_sequence(value)?;
                is_list = true;
            }
            "_listOf" => {
                list.catch_all = Some(Box::new(compile_expression(value)?));
                is_list = true;
            }
            "_min" => sizing.min = Some(compile_size(value)?),
            "_max" => sizing.max = Some(compile_size(value)?),
            "_nb" => sizing.nb = Some(compile_size(value)?),
            other => {
                unknown.get_or_insert((key, other.to_string()));
            }
        }
    }

    if let Some((key, keyword)) = unknown {
        return Err(Fatal::malformed(key, format!("unknown keyword '{keyword}'")));
    }
    let sizing = (!sizing.is_empty()).then_some(sizing);
    match (is_map, is_list) {
        (true, false) => {
            map.sizing = sizing;
            Ok(Expression::Map(map))
        }
        (false, true) => {
            list.sizing = sizing;
            Ok(Expression::List(list))
        }
        (true, true) => Err(Fatal::malformed(
            node,
            "an expression cannot mix map and list keywords",
        )),
        (false, false) => Err(Fatal::malformed(
            node,
            "an expression needs at least one checker keyword",
        )),
    }
}

fn compile_scalar_checker(keyword: &str, value: &Node) -> Result<Option<Expression>, Fatal> {
    let expression = match keyword {
        "_regex" => {
            let source = value
                .as_str()
                .ok_or_else(|| Fatal::malformed(value, "`_regex` expects a string"))?;
            let regex = Regex::new(source)
                .map_err(|err| Fatal::malformed(value, format!("invalid regex: {err}")))?;
            Expression::Regex(Pattern {
                source: source.to_string(),
                regex,
            })
        }
        "_in" => {
            if !value.is_sequence() {
                return Err(Fatal::malformed(value, "`_in` expects a sequence"));
            }
            let mut set = InSet::default();
            for element in value.elements() {
                if !element.is_scalar() {
                    return Err(Fatal::malformed(element, "`_in` accepts only scalars"));
                }
                set.insert(element);
            }
            Expression::In(set)
        }
        "_range" => {
            let text = value
                .as_str()
                .ok_or_else(|| Fatal::malformed(value, "`_range` expects a string"))?;
            let range = RangeSpec::parse(text).ok_or_else(|| {
                Fatal::malformed(value, format!("invalid range pattern '{text}'"))
            })?;
            Expression::Range(range)
        }
        "_oneOf" => Expression::OneOf(compile_sequence(value)?),
        _ => return Ok(None),
    };
    Ok(Some(expression))
}

fn compile_entries(node: &Node) -> Result<Vec<(String, Expression)>, Fatal> {
    if !node.is_mapping() {
        return Err(Fatal::malformed(node, "expected a mapping of keys to expressions"));
    }
    node.entries()
        .map(|(key, value)| {
            if !key.is_scalar() {
                return Err(Fatal::malformed(key, "map keys must be scalars"));
            }
            Ok((key.value.clone(), compile_expression(value)?))
        })
        .collect()
}

fn compile_patterns(node: &Node) -> Result<Vec<(Expression, Expression)>, Fatal> {
    if !node.is_mapping() {
        return Err(Fatal::malformed(node, "`_mapOf` expects a mapping"));
    }
    node.entries()
        .map(|(key, value)| Ok((compile_expression(key)?, compile_expression(value)?)))
        .collect()
}

fn compile_sequence(node: &Node) -> Result<Vec<Expression>, Fatal> {
    if !node.is_sequence() {
        return Err(Fatal::malformed(node, "expected a sequence of expressions"));
    }
    node.elements().iter().map(compile_expression).collect()
}

fn compile_size(node: &Node) -> Result<usize, Fatal> {
    if node.tag != Tag::Int {
        return Err(Fatal::malformed(node, "sizes must be integers"));
    }
    decode_int(&node.value)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| Fatal::malformed(node, "sizes must be non-negative integers"))
}
