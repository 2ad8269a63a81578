//! Rule graph checks over a compiled schema.

use std::collections::{HashSet, VecDeque};

use crate::errors::{CheckError, ErrorKind, ErrorList};
use crate::parser::ParserOptions;
use crate::schema::{Expression, RuleSet};

/// Checks that `main` exists, that no rule is declared twice, that every rule is used and
/// reachable from `main`, and that no rule reaches itself without consuming content.
///
/// Findings are reported in rule declaration order.
pub fn check(rules: &RuleSet, options: &ParserOptions) -> Result<(), CheckError> {
    let mut errors = ErrorList::new();

    for (name, position) in rules.duplicates() {
        errors.push(CheckError::new(
            ErrorKind::DuplicateRule { name: name.clone() },
            Some(position.clone()),
        ));
    }

    if !rules.has("main") {
        errors.push(CheckError::new(ErrorKind::MissingMain, None));
    }

    let reachable = reachable_from_main(rules);
    for rule in rules.iter() {
        let name = &*rule.name;
        if options.report_unused_rules && name != "main" {
            let kind = if !rule.is_used() {
                Some(ErrorKind::UnusedRule { name: name.into() })
            } else if !reachable.contains(name) {
                Some(ErrorKind::UnreachableRule { name: name.into() })
            } else {
                None
            };
            if let Some(kind) = kind {
                errors.push(CheckError::new(kind, Some(rule.position.clone())));
            }
        }

        if let Some(chain) = self_reference(rules, name) {
            errors.push(CheckError::new(
                ErrorKind::SelfReference {
                    name: name.into(),
                    chain,
                },
                Some(rule.position.clone()),
            ));
        }
    }

    errors.finish(())
}

/// Every declared rule some chain of references leads to from `main`, `main` included.
fn reachable_from_main(rules: &RuleSet) -> HashSet<&str> {
    let mut reached = HashSet::new();
    let mut queue = VecDeque::new();
    if let Some(main) = rules.get("main") {
        reached.insert(&*main.name);
        queue.push_back(main);
    }
    while let Some(rule) = queue.pop_front() {
        let mut names = Vec::new();
        references(&rule.expression, &mut names);
        for name in names {
            if let Some(next) = rules.get(name) {
                if reached.insert(&*next.name) {
                    queue.push_back(next);
                }
            }
        }
    }
    reached
}

/// Collects every rule name `expression` refers to, at any depth.
fn references<'e>(expression: &'e Expression, found: &mut Vec<&'e str>) {
    match expression {
        Expression::Reference(name) => found.push(name),
        Expression::Regex(_) | Expression::In(_) | Expression::Range(_) => {}
        Expression::OneOf(options) => options.iter().for_each(|e| references(e, found)),
        Expression::Map(map) => {
            for (_, value) in map.mandatory.iter().chain(&map.facultative) {
                references(value, found);
            }
            for (key, value) in &map.catch_all {
                references(key, found);
                references(value, found);
            }
            map.merge.iter().for_each(|e| references(e, found));
        }
        Expression::List(list) => {
            list.positional
                .iter()
                .chain(&list.optional)
                .chain(list.catch_all.as_deref())
                .for_each(|e| references(e, found));
        }
    }
}

/// The reference chain leading from `name` back to itself through edges that stay on the
/// same content node: plain references, `_oneOf` options and `_merge` sources.
fn self_reference(rules: &RuleSet, name: &str) -> Option<Vec<String>> {
    let rule = rules.get(name)?;
    let mut chain = vec![name.to_string()];
    let mut visited = HashSet::new();
    find_cycle(rules, name, &rule.expression, &mut chain, &mut visited).then_some(chain)
}

fn find_cycle<'r>(
    rules: &'r RuleSet,
    target: &str,
    expression: &'r Expression,
    chain: &mut Vec<String>,
    visited: &mut HashSet<&'r str>,
) -> bool {
    match expression {
        Expression::Reference(next) => {
            if next == target {
                chain.push(next.clone());
                return true;
            }
            if !visited.insert(next.as_str()) {
                return false;
            }
            let Some(rule) = rules.get(next) else {
                return false;
            };
            chain.push(next.clone());
            if find_cycle(rules, target, &rule.expression, chain, visited) {
                return true;
            }
            chain.pop();
            false
        }
        Expression::OneOf(options) => options
            .iter()
            .any(|option| find_cycle(rules, target, option, chain, visited)),
        Expression::Map(map) => map
            .merge
            .iter()
            .any(|source| find_cycle(rules, target, source, chain, visited)),
        _ => false,
    }
}
