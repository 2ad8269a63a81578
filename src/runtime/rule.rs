//! Rule resolution and builder invocation.

use tracing::trace;

use super::{evaluate, predefined, EvaluationContext, Outcome};
use crate::builders::BuildError;
use crate::document::Node;
use crate::errors::{CheckError, ErrorKind, Failure};
use crate::result::{LidyResult, Position};
use crate::schema::Rule;

/// Applies the rule `name` to `node`.
///
/// Names the schema does not declare are looked up among the predefined rules. Errors of a
/// declared rule are wrapped with its name so nested failures read as a chain.
pub(crate) fn apply_rule<T>(context: &EvaluationContext<'_, T>, name: &str, node: &Node) -> Outcome<T> {
    let Some(rule) = context.parser.rules().get(name) else {
        return predefined::apply(context, name, node);
    };
    trace!(
        rule = name,
        line = node.start.line,
        column = node.start.column,
        depth = context.depth,
        "applying rule"
    );

    let inner = context.enter(&rule.name, node)?;
    evaluate(&inner, &rule.expression, node)
        .and_then(|result| build(context, rule, result))
        .map_err(|failure| failure.within_rule(name))
}

fn build<T>(context: &EvaluationContext<'_, T>, rule: &Rule, result: LidyResult<T>) -> Outcome<T> {
    let Some(builder) = context.parser.builders().get(&rule.name) else {
        return Ok(result);
    };
    let position = result.position.clone();
    let rule_name = result.rule_name.clone();
    match builder(result) {
        Ok(data) => Ok(LidyResult {
            position,
            rule_name,
            data,
        }),
        Err(error) => Err(Failure::Check(builder_error(error, &rule.name, position))),
    }
}

/// A builder may veto with a ready-made [`CheckError`]; any other error becomes a
/// violation positioned on the built node.
fn builder_error(error: BuildError, rule: &str, position: Position) -> CheckError {
    match error.downcast::<CheckError>() {
        Ok(error) => *error,
        Err(error) => CheckError::new(
            ErrorKind::Builder {
                rule: rule.to_string(),
                message: error.to_string(),
            },
            Some(position),
        ),
    }
}
