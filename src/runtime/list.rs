//! List matcher.

use super::{evaluate, size, EvaluationContext, Outcome};
use crate::document::Node;
use crate::errors::{ErrorKind, ErrorList, Failure, Reporting};
use crate::result::{Data, ListData};
use crate::schema::ListMatcher;

/// `_list` consumes elements from the front, `_listFacultative` continues while elements
/// remain, and `_listOf` takes whatever is left.
pub(super) fn apply<T>(context: &EvaluationContext<'_, T>, matcher: &ListMatcher, node: &Node) -> Outcome<T> {
    if !node.is_sequence() {
        return Err(context.report(ErrorKind::NotASequence, node).into());
    }

    let elements = node.elements();
    let mut errors = ErrorList::new();
    let mut data = ListData::default();
    let mut offset = 0;

    for expression in &matcher.positional {
        let Some(element) = elements.get(offset) else {
            errors.push(context.report(
                ErrorKind::TooFewElements {
                    expected: matcher.positional.len(),
                    actual: elements.len(),
                },
                node,
            ));
            break;
        };
        if let Some(result) = errors.absorb(evaluate(context, expression, element))? {
            data.positional.push(result);
        }
        offset += 1;
    }

    for expression in &matcher.optional {
        let Some(element) = elements.get(offset) else {
            break;
        };
        if let Some(result) = errors.absorb(evaluate(context, expression, element))? {
            data.positional.push(result);
        }
        offset += 1;
    }

    let rest = &elements[offset..];
    match &matcher.catch_all {
        Some(expression) => {
            for element in rest {
                if let Some(result) = errors.absorb(evaluate(context, expression, element))? {
                    data.rest.push(result);
                }
            }
        }
        None => {
            if let Some(first) = rest.first() {
                errors.push(context.report(
                    ErrorKind::TooManyElements {
                        allowed: matcher.positional.len() + matcher.optional.len(),
                        actual: elements.len(),
                    },
                    first,
                ));
            }
        }
    }

    if let Some(sizing) = &matcher.sizing {
        if let Some(error) = size::check(context, sizing, node) {
            errors.push(error);
        }
    }

    errors
        .finish(context.result(node, Data::List(data)))
        .map_err(Failure::Check)
}
