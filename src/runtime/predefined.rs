//! Predefined rules.
//!
//! Every name the schema does not declare is looked up here. The table is closed:
//! an unknown name fails with [`ErrorKind::UnknownRule`].

use std::collections::BTreeMap;

use chrono::DateTime;
use lazy_static::lazy_static;
use regex::Regex;

use super::{EvaluationContext, Outcome};
use crate::document::{decode_bool, decode_float, decode_int, Node, NodeKind, Tag};
use crate::errors::{ErrorKind, Fatal, Reporting};
use crate::result::{Data, KeyValue, LidyResult, ListData, MapData, Scalar};

lazy_static! {
    static ref BASE64: Regex = Regex::new(r"^[a-zA-Z0-9_\- \n]*[= \n]*$").unwrap();
    /// `2006-01-02T15:04:05.999999999Z07:00`: uppercase `T` and `Z`, two-digit fields,
    /// seconds below 60, any number of fraction digits.
    static ref RFC3339_NANO: Regex = Regex::new(
        r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-5][0-9](?:\.[0-9]+)?(?:Z|[+-][0-9]{2}:[0-9]{2})$"
    )
    .unwrap();
}

/// Layout check first, then chrono for calendar and clock ranges.
fn is_timestamp(text: &str) -> bool {
    RFC3339_NANO.is_match(text) && DateTime::parse_from_rfc3339(text).is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    String,
    Int,
    Float,
    Boolean,
    Binary,
    NullType,
    Timestamp,
    Any,
    Never,
}

impl Primitive {
    pub const ALL: [Primitive; 9] = [
        Primitive::String,
        Primitive::Int,
        Primitive::Float,
        Primitive::Boolean,
        Primitive::Binary,
        Primitive::NullType,
        Primitive::Timestamp,
        Primitive::Any,
        Primitive::Never,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Primitive::String => "string",
            Primitive::Int => "int",
            Primitive::Float => "float",
            Primitive::Boolean => "boolean",
            Primitive::Binary => "binary",
            Primitive::NullType => "nullType",
            Primitive::Timestamp => "timestamp",
            Primitive::Any => "any",
            Primitive::Never => "never",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|primitive| primitive.name() == name)
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        Self::ALL.into_iter().map(Primitive::name)
    }

    fn check<T>(self, context: &EvaluationContext<'_, T>, node: &Node) -> Outcome<T> {
        let text = node.value.as_str();
        let scalar = match self {
            Primitive::String => (node.tag == Tag::Str)
                .then(|| Scalar::String(text.to_string()))
                .ok_or_else(|| context.primitive_mismatch("string", "a string", node))?,
            Primitive::Int => (node.tag == Tag::Int)
                .then(|| decode_int(text))
                .flatten()
                .map(Scalar::Int)
                .ok_or_else(|| context.primitive_mismatch("int", "an integer", node))?,
            Primitive::Float => match node.tag {
                Tag::Float => decode_float(text),
                Tag::Int => decode_int(text).map(|n| n as f64),
                _ => None,
            }
            .map(Scalar::Float)
            .ok_or_else(|| context.primitive_mismatch("float", "a float", node))?,
            Primitive::Boolean => (node.tag == Tag::Bool)
                .then(|| decode_bool(text))
                .flatten()
                .map(Scalar::Bool)
                .ok_or_else(|| context.primitive_mismatch("boolean", "a boolean", node))?,
            Primitive::Binary => (matches!(node.tag, Tag::Str | Tag::Binary) && BASE64.is_match(text))
                .then(|| Scalar::String(text.to_string()))
                .ok_or_else(|| context.primitive_mismatch("binary", "a base64 binary string", node))?,
            Primitive::NullType => (node.tag == Tag::Null)
                .then_some(Scalar::Null)
                .ok_or_else(|| context.primitive_mismatch("nullType", "the null value", node))?,
            Primitive::Timestamp => (matches!(node.tag, Tag::Str | Tag::Timestamp)
                && is_timestamp(text))
                .then(|| Scalar::String(text.to_string()))
                .ok_or_else(|| {
                    context.primitive_mismatch("timestamp", "an RFC3339 timestamp", node)
                })?,
            Primitive::Any => return any(context, node, context.depth).map_err(Into::into),
            Primitive::Never => return Err(context.report(ErrorKind::Never, node).into()),
        };
        Ok(context.result(node, Data::Scalar(scalar)))
    }
}

pub(crate) fn apply<T>(context: &EvaluationContext<'_, T>, name: &str, node: &Node) -> Outcome<T> {
    let Some(primitive) = Primitive::from_name(name) else {
        return Err(context
            .report(ErrorKind::UnknownRule { name: name.to_string() }, node)
            .into());
    };
    let context = context.primitive(primitive.name());
    primitive.check(&context, node)
}

/// Mirrors any node as raw data: mapping entries all unnamed, sequence elements all in `rest`.
///
/// Each nested collection counts as one level against the depth limit.
fn any<T>(
    context: &EvaluationContext<'_, T>,
    node: &Node,
    depth: usize,
) -> Result<LidyResult<T>, Fatal> {
    if !node.is_scalar() && depth > context.max_depth {
        return Err(Fatal::DepthLimit {
            limit: context.max_depth,
            line: node.start.line,
            column: node.start.column,
        });
    }
    let data = match node.kind {
        NodeKind::Scalar => Data::Scalar(Scalar::from_node(node)),
        NodeKind::Mapping => Data::Map(MapData {
            named: BTreeMap::new(),
            unnamed: node
                .entries()
                .map(|(key, value)| {
                    Ok(KeyValue {
                        key: any(context, key, depth + 1)?,
                        value: any(context, value, depth + 1)?,
                    })
                })
                .collect::<Result<_, Fatal>>()?,
        }),
        NodeKind::Sequence => Data::List(ListData {
            positional: Vec::new(),
            rest: node
                .elements()
                .iter()
                .map(|element| any(context, element, depth + 1))
                .collect::<Result<_, Fatal>>()?,
        }),
    };
    Ok(context.result(node, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for primitive in Primitive::ALL {
            assert_eq!(Primitive::from_name(primitive.name()), Some(primitive));
        }
        assert_eq!(Primitive::from_name("str"), None);
        assert_eq!(Primitive::names().count(), 9);
    }

    #[test]
    fn base64_charset() {
        assert!(BASE64.is_match("aGVsbG8gd29ybGQ="));
        assert!(BASE64.is_match("aGVs\nbG8=\n"));
        assert!(!BASE64.is_match("a=b"));
        assert!(!BASE64.is_match("héllo"));
    }

    #[test]
    fn rfc3339_with_nanoseconds() {
        assert!(is_timestamp("2006-01-02T15:04:05.999999999+07:00"));
        assert!(is_timestamp("2006-01-02T15:04:05Z"));
        assert!(is_timestamp("2006-01-02T15:04:05.1-00:30"));
        assert!(!is_timestamp("2006-01-02"));
    }

    #[test]
    fn timestamps_follow_the_strict_layout() {
        assert!(!is_timestamp("2006-01-02 15:04:05Z"));
        assert!(!is_timestamp("2006-01-02t15:04:05Z"));
        assert!(!is_timestamp("2006-01-02T15:04:05z"));
        assert!(!is_timestamp("2006-01-02T15:04:60Z"));
        assert!(!is_timestamp("2006-01-02T15:04:05.Z"));
        assert!(!is_timestamp("2006-1-02T15:04:05Z"));
        assert!(!is_timestamp("2006-02-30T15:04:05Z"));
    }
}
