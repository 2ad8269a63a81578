//! Map matcher and merge resolution.
//!
//! The matcher first builds a key table out of the merge sources and its own `_map` and
//! `_mapFacultative` entries, then walks the content entries in source order. Keys outside
//! the table go to the `_mapOf` patterns, or are reported as unknown.

use std::collections::HashMap;

use super::{evaluate, size, EvaluationContext, Outcome};
use crate::document::Node;
use crate::errors::{CheckError, ErrorKind, ErrorList, Failure, Fatal, Reporting};
use crate::result::{Data, KeyValue, MapData};
use crate::schema::{Expression, MapMatcher, RuleSet};

pub(super) fn apply<T>(context: &EvaluationContext<'_, T>, matcher: &MapMatcher, node: &Node) -> Outcome<T> {
    if !node.is_mapping() {
        return Err(context.report(ErrorKind::NotAMapping, node).into());
    }

    let mut table = KeyTable::default();
    table.contribute(context.parser.rules(), matcher, false, &mut Vec::new())?;

    let mut errors = ErrorList::new();
    for key in table.mandatory_keys() {
        if node.get(key).is_none() {
            errors.push(context.missing_key(key, node));
        }
    }

    let mut data = MapData::default();
    for (key, value) in node.entries() {
        let entry = if key.is_scalar() {
            table.get(&key.value)
        } else {
            None
        };
        if let Some(expression) = entry {
            let outcome = evaluate(context, expression, value).map_err(|f| f.at_key(&key.value));
            if let Some(result) = errors.absorb(outcome)? {
                data.named.insert(key.value.clone(), result);
            }
        } else if !matcher.catch_all.is_empty() {
            if let Some(pair) = catch_all(context, &matcher.catch_all, key, value, &mut errors)? {
                data.unnamed.push(pair);
            }
        } else if key.is_scalar() {
            errors.push(context.unknown_key(&key.value, key));
        } else {
            errors.push(context.report(ErrorKind::NonScalarKey, key));
        }
    }

    if let Some(sizing) = &matcher.sizing {
        if let Some(error) = size::check(context, sizing, node) {
            errors.push(error);
        }
    }

    errors
        .finish(context.result(node, Data::Map(data)))
        .map_err(Failure::Check)
}

/// Matches one entry against the `_mapOf` patterns. The first pattern accepting both the
/// key and the value wins.
fn catch_all<T>(
    context: &EvaluationContext<'_, T>,
    patterns: &[(Expression, Expression)],
    key: &Node,
    value: &Node,
    errors: &mut ErrorList,
) -> Result<Option<KeyValue<T>>, Fatal> {
    let label = key_label(key);
    if let [(key_pattern, value_pattern)] = patterns {
        let key_result = errors.absorb(evaluate(context, key_pattern, key))?;
        let value_outcome = evaluate(context, value_pattern, value).map_err(|f| f.at_key(&label));
        let value_result = errors.absorb(value_outcome)?;
        return Ok(key_result
            .zip(value_result)
            .map(|(key, value)| KeyValue { key, value }));
    }

    let mut causes = Vec::with_capacity(patterns.len());
    for (key_pattern, value_pattern) in patterns {
        let mut attempt = ErrorList::new();
        let key_result = attempt.absorb(evaluate(context, key_pattern, key))?;
        let value_outcome = evaluate(context, value_pattern, value).map_err(|f| f.at_key(&label));
        let value_result = attempt.absorb(value_outcome)?;
        if let (Some(key), Some(value)) = (key_result, value_result) {
            return Ok(Some(KeyValue { key, value }));
        }
        causes.extend(attempt.into_error());
    }
    errors.push(CheckError::NoMatch {
        keyword: "_mapOf",
        position: context.position(key),
        causes,
    });
    Ok(None)
}

fn key_label(key: &Node) -> String {
    if key.is_scalar() {
        key.value.clone()
    } else {
        key.describe()
    }
}

// ============================================================================
// KEY TABLE
// ============================================================================

struct KeyEntry<'e> {
    expression: &'e Expression,
    mandatory: bool,
}

/// Effective keys of a map matcher, in declaration order.
#[derive(Default)]
struct KeyTable<'e> {
    order: Vec<&'e str>,
    entries: HashMap<&'e str, KeyEntry<'e>>,
}

impl<'e> KeyTable<'e> {
    fn get(&self, key: &str) -> Option<&'e Expression> {
        self.entries.get(key).map(|entry| entry.expression)
    }

    fn is_mandatory(&self, key: &str) -> bool {
        self.entries.get(key).map_or(false, |entry| entry.mandatory)
    }

    fn mandatory_keys(&self) -> impl Iterator<Item = &'e str> + '_ {
        self.order
            .iter()
            .copied()
            .filter(move |key| self.is_mandatory(key))
    }

    fn insert(&mut self, key: &'e str, expression: &'e Expression, mandatory: bool) {
        if !self.entries.contains_key(key) {
            self.order.push(key);
        }
        self.entries.insert(
            key,
            KeyEntry {
                expression,
                mandatory,
            },
        );
    }

    /// Adds the keys of `matcher`: merge sources first, then `_map`, then `_mapFacultative`.
    ///
    /// Mandatory keys of a merged matcher never replace a mandatory key already present.
    /// Facultative keys never replace a mandatory one.
    fn contribute(
        &mut self,
        rules: &'e RuleSet,
        matcher: &'e MapMatcher,
        merged: bool,
        stack: &mut Vec<&'e MapMatcher>,
    ) -> Result<(), Fatal> {
        if stack.iter().any(|seen| std::ptr::eq(*seen, matcher)) {
            return Err(Fatal::InvalidMergeTarget {
                target: "map checker".into(),
                reason: "merge sources form a cycle".into(),
            });
        }
        stack.push(matcher);
        for source in &matcher.merge {
            let target = resolve_merge(rules, source, &mut Vec::new())?;
            self.contribute(rules, target, true, stack)?;
        }
        stack.pop();

        for (key, expression) in &matcher.mandatory {
            if merged && self.is_mandatory(key) {
                continue;
            }
            self.insert(key, expression, true);
        }
        for (key, expression) in &matcher.facultative {
            if !self.is_mandatory(key) {
                self.insert(key, expression, false);
            }
        }
        Ok(())
    }
}

/// Follows rule references from a `_merge` source down to a map matcher.
fn resolve_merge<'e>(
    rules: &'e RuleSet,
    source: &'e Expression,
    seen: &mut Vec<&'e str>,
) -> Result<&'e MapMatcher, Fatal> {
    match source {
        Expression::Map(matcher) => Ok(matcher),
        Expression::Reference(name) => {
            if seen.contains(&name.as_str()) {
                return Err(Fatal::InvalidMergeTarget {
                    target: name.clone(),
                    reason: "rule references form a cycle".into(),
                });
            }
            let rule = rules.get(name).ok_or_else(|| Fatal::InvalidMergeTarget {
                target: name.clone(),
                reason: "is not a rule of the schema".into(),
            })?;
            seen.push(name);
            resolve_merge(rules, &rule.expression, seen)
        }
        other => Err(Fatal::InvalidMergeTarget {
            target: other.keyword().to_string(),
            reason: "is not a map checker".into(),
        }),
    }
}
