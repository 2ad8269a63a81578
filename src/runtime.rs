//! Evaluation of compiled expressions against document nodes.
//!
//! Evaluation is a depth-first descent driven by [`EvaluationContext`]. The context is
//! immutable: entering a rule produces a child context carrying the extended visiting set,
//! so the recursion guard is private to each call stack and a [`Parser`] can be shared
//! across threads.

use std::sync::Arc;

use crate::document::{Node, NodeId};
use crate::errors::{Failure, Fatal, Reporting};
use crate::parser::Parser;
use crate::result::{Data, LidyResult, Position};

mod eval;
mod list;
mod map;
pub mod predefined;
mod rule;
mod scalar;
mod size;

pub(crate) use eval::evaluate;
pub(crate) use rule::apply_rule;

/// Outcome of matching one expression against one node.
pub type Outcome<T> = Result<LidyResult<T>, Failure>;

// ============================================================================
// CORE DATA STRUCTURES: Evaluation Context
// ============================================================================

/// The context for one step of evaluation, passed to every matcher.
pub struct EvaluationContext<'p, T> {
    pub(crate) parser: &'p Parser<T>,
    pub filename: Arc<str>,
    /// Innermost rule being applied; results produced here carry its name.
    pub rule: Arc<str>,
    visiting: im::HashSet<(Arc<str>, NodeId)>,
    pub max_depth: usize,
    pub depth: usize,
}

impl<'p, T> EvaluationContext<'p, T> {
    pub(crate) fn new(parser: &'p Parser<T>, filename: &Arc<str>) -> Self {
        Self {
            parser,
            filename: Arc::clone(filename),
            rule: Arc::from(""),
            visiting: im::HashSet::new(),
            max_depth: parser.options().max_depth,
            depth: 0,
        }
    }

    /// Helper to increment depth for recursive calls.
    pub fn next_depth(&self) -> usize {
        self.depth + 1
    }

    /// Context for applying `rule` to `node`.
    ///
    /// Fails when `rule` is already being applied to this very node further up the stack,
    /// which can only happen if the rule reaches itself without consuming content.
    pub(crate) fn enter(&self, rule: &Arc<str>, node: &Node) -> Result<Self, Fatal> {
        let visit = (Arc::clone(rule), node.id);
        if self.visiting.contains(&visit) {
            return Err(Fatal::InfiniteLoop {
                rule: rule.to_string(),
                line: node.start.line,
                column: node.start.column,
            });
        }
        let depth = self.next_depth();
        if depth > self.max_depth {
            return Err(Fatal::DepthLimit {
                limit: self.max_depth,
                line: node.start.line,
                column: node.start.column,
            });
        }
        Ok(Self {
            parser: self.parser,
            filename: Arc::clone(&self.filename),
            rule: Arc::clone(rule),
            visiting: self.visiting.update(visit),
            max_depth: self.max_depth,
            depth,
        })
    }

    /// Context for a predefined rule, which cannot recurse into rules.
    pub(crate) fn primitive(&self, name: &'static str) -> Self {
        Self {
            parser: self.parser,
            filename: Arc::clone(&self.filename),
            rule: Arc::from(name),
            visiting: self.visiting.clone(),
            max_depth: self.max_depth,
            depth: self.depth,
        }
    }

    pub(crate) fn result(&self, node: &Node, data: Data<T>) -> LidyResult<T> {
        LidyResult {
            position: self.position(node),
            rule_name: Arc::clone(&self.rule),
            data,
        }
    }
}

impl<T> Reporting for EvaluationContext<'_, T> {
    fn position(&self, node: &Node) -> Position {
        Position::of(&self.filename, node)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::builders::BuilderRegistry;
    use crate::document::Document;
    use crate::errors::{Failure, Fatal};
    use crate::parser::{Parser, ParserOptions};
    use crate::schema::RuleSet;

    /// A parser over rules that never went through schema validation.
    fn unchecked(schema: &str) -> Parser<()> {
        let document = Document::parse("schema.yaml", schema).unwrap();
        let rules = RuleSet::compile(&document).unwrap();
        Parser::trusted(Arc::new(rules), BuilderRegistry::new(), ParserOptions::default())
    }

    #[test]
    fn a_rule_revisiting_its_node_is_an_infinite_loop() {
        let parser = unchecked("main: a\na: { _oneOf: [int, main] }\n");
        let content = Document::parse("content.yaml", "text").unwrap();
        match parser.run(&content) {
            Err(Failure::Fatal(Fatal::InfiniteLoop { rule, line, column })) => {
                assert_eq!(rule, "main");
                assert_eq!((line, column), (1, 1));
            }
            other => panic!("expected an infinite loop, got {other:?}"),
        }
    }

    #[test]
    fn the_guard_is_scoped_to_one_call_stack() {
        // the same rule on sibling nodes is not a loop
        let parser = unchecked("main: { _list: [item, item] }\nitem: { _oneOf: [int, string] }\n");
        let content = Document::parse("content.yaml", "[1, x]").unwrap();
        assert!(parser.run(&content).is_ok());
        assert!(parser.run(&content).is_ok());
    }

    #[test]
    fn infinite_loops_are_not_swallowed_by_alternatives() {
        let parser = unchecked("main: { _oneOf: [loop, string] }\nloop: { _oneOf: [loop] }\n");
        let content = Document::parse("content.yaml", "text").unwrap();
        assert!(matches!(
            parser.run(&content),
            Err(Failure::Fatal(Fatal::InfiniteLoop { .. }))
        ));
    }

    #[test]
    fn malformed_merge_targets_are_fatal() {
        let parser = unchecked("main: { _merge: [word], _map: { a: int } }\nword: string\n");
        let content = Document::parse("content.yaml", "a: 1").unwrap();
        assert!(matches!(
            parser.run(&content),
            Err(Failure::Fatal(Fatal::InvalidMergeTarget { .. }))
        ));
    }
}
