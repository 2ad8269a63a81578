//! Scalar checkers: `_regex`, `_in` and `_range`.

use super::{EvaluationContext, Outcome};
use crate::document::{decode_float, decode_int, Node, Tag};
use crate::errors::{ErrorKind, Reporting};
use crate::result::{Data, Scalar};
use crate::schema::{InSet, NumericKind, Pattern, RangeSpec};

pub(super) fn regex<T>(context: &EvaluationContext<'_, T>, pattern: &Pattern, node: &Node) -> Outcome<T> {
    if !node.is_string() {
        return Err(context.report(ErrorKind::NotAString, node).into());
    }
    if !pattern.regex.is_match(&node.value) {
        return Err(context
            .report(
                ErrorKind::RegexMismatch {
                    pattern: pattern.source.clone(),
                },
                node,
            )
            .into());
    }
    Ok(context.result(node, Data::Scalar(Scalar::String(node.value.clone()))))
}

pub(super) fn in_set<T>(context: &EvaluationContext<'_, T>, set: &InSet, node: &Node) -> Outcome<T> {
    if !node.is_scalar() {
        return Err(context
            .report(ErrorKind::NotAScalar { keyword: "_in" }, node)
            .into());
    }
    if !set.contains(node) {
        return Err(context
            .report(
                ErrorKind::NotInSet {
                    accepted: set.listing().to_vec(),
                },
                node,
            )
            .into());
    }
    Ok(context.result(node, Data::Scalar(Scalar::from_node(node))))
}

pub(super) fn range<T>(context: &EvaluationContext<'_, T>, range: &RangeSpec, node: &Node) -> Outcome<T> {
    let decoded = match node.tag {
        Tag::Int => decode_int(&node.value).map(|n| (Some(n), n as f64)),
        Tag::Float => decode_float(&node.value).map(|x| (None, x)),
        _ => None,
    };
    let Some((integer, value)) = decoded else {
        return Err(context.report(ErrorKind::NotANumber, node).into());
    };

    let scalar = match (range.kind, integer) {
        (NumericKind::Int, Some(n)) => Scalar::Int(n),
        (NumericKind::Int, None) => {
            return Err(context.report(ErrorKind::NotAnInteger, node).into());
        }
        (NumericKind::Float, _) => Scalar::Float(value),
    };
    if !range.contains(value) {
        return Err(context
            .report(
                ErrorKind::OutOfRange {
                    range: range.source.clone(),
                },
                node,
            )
            .into());
    }
    Ok(context.result(node, Data::Scalar(scalar)))
}
