//! `_min`, `_max` and `_nb`.

use crate::document::Node;
use crate::errors::{CheckError, ErrorKind, ErrorList, Reporting};
use crate::schema::Sizing;

/// Checks the entry count of a mapping or sequence. Every violated bound is reported.
pub(super) fn check(context: &impl Reporting, sizing: &Sizing, node: &Node) -> Option<CheckError> {
    let count = node.len();
    let mut errors = ErrorList::new();
    if let Some(min) = sizing.min.filter(|&min| count < min) {
        errors.push(context.report(ErrorKind::BelowMin { min, count }, node));
    }
    if let Some(max) = sizing.max.filter(|&max| count > max) {
        errors.push(context.report(ErrorKind::AboveMax { max, count }, node));
    }
    if let Some(nb) = sizing.nb.filter(|&nb| count != nb) {
        errors.push(context.report(ErrorKind::WrongCount { nb, count }, node));
    }
    errors.into_error()
}
