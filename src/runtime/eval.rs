//! Expression dispatch.
//!
//! Rule references go through [`apply_rule`](super::apply_rule); every other expression is
//! handed to its matcher. `_oneOf` lives here since it only re-enters [`evaluate`].

use super::{list, map, scalar, EvaluationContext, Outcome};
use crate::document::Node;
use crate::errors::{CheckError, Failure, Reporting};
use crate::schema::Expression;

pub(crate) fn evaluate<T>(
    context: &EvaluationContext<'_, T>,
    expression: &Expression,
    node: &Node,
) -> Outcome<T> {
    match expression {
        Expression::Reference(name) => super::apply_rule(context, name, node),
        Expression::Regex(pattern) => scalar::regex(context, pattern, node),
        Expression::In(set) => scalar::in_set(context, set, node),
        Expression::Range(range) => scalar::range(context, range, node),
        Expression::OneOf(options) => one_of(context, options, node),
        Expression::Map(matcher) => map::apply(context, matcher, node),
        Expression::List(matcher) => list::apply(context, matcher, node),
    }
}

/// First matching option wins. Check errors of the others are kept, one cause per option.
fn one_of<T>(context: &EvaluationContext<'_, T>, options: &[Expression], node: &Node) -> Outcome<T> {
    let mut causes = Vec::with_capacity(options.len());
    for option in options {
        match evaluate(context, option, node) {
            Ok(result) => return Ok(result),
            Err(Failure::Check(error)) => causes.push(error),
            Err(fatal) => return Err(fatal),
        }
    }
    Err(CheckError::NoMatch {
        keyword: "_oneOf",
        position: context.position(node),
        causes,
    }
    .into())
}
