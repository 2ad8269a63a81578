//! Builders attached to the metaschema rules.
//!
//! They never transform their result. They either pass it through or veto it with a
//! [`CheckError`] positioned in the schema document.

use std::sync::Arc;

use regex::Regex;

use super::SchemaIndex;
use crate::builders::{BuildError, BuilderRegistry};
use crate::document::Node;
use crate::errors::{CheckError, ErrorKind, ErrorList};
use crate::result::{Data, LidyResult, MapData, Position};
use crate::runtime::predefined::Primitive;

const MAP_KEYWORDS: [&str; 4] = ["_map", "_mapFacultative", "_mapOf", "_merge"];
const LIST_KEYWORDS: [&str; 3] = ["_list", "_listFacultative", "_listOf"];

type Built = Result<Data<()>, BuildError>;

/// The builders validating a schema declared by `index`.
pub fn meta_builders(index: &Arc<SchemaIndex>) -> BuilderRegistry<()> {
    let mut builders = BuilderRegistry::new();

    let references = Arc::clone(index);
    builders.register("ruleReference", move |result| rule_reference(&references, result));

    let merges = Arc::clone(index);
    builders.register("mapChecker", move |result| map_checker(&merges, result));

    builders.register("listChecker", list_checker);
    builders.register("regexChecker", regex_checker);
    builders
}

fn veto(kind: ErrorKind, position: &Position) -> BuildError {
    Box::new(CheckError::new(kind, Some(position.clone())))
}

fn rule_reference(index: &SchemaIndex, result: LidyResult<()>) -> Built {
    let Some(name) = result.data.as_str() else {
        return Ok(result.data);
    };
    if index.declares(name) {
        index.mark_used(name);
    } else if Primitive::from_name(name).is_none() {
        return Err(veto(
            ErrorKind::UnknownIdentifier {
                name: name.to_string(),
                known: index.known_names(),
            },
            &result.position,
        ));
    }
    Ok(result.data)
}

fn map_checker(index: &SchemaIndex, result: LidyResult<()>) -> Built {
    let Some(map) = result.data.as_map() else {
        return Ok(result.data);
    };
    let mut errors = ErrorList::new();
    if !MAP_KEYWORDS.iter().any(|keyword| map.named.contains_key(*keyword)) {
        errors.push(CheckError::new(
            ErrorKind::EmptyMapChecker,
            Some(result.position.clone()),
        ));
    }
    if let Some(sources) = map.named.get("_merge").and_then(|r| r.data.as_list()) {
        for source in &sources.rest {
            if let Err(error) = check_merge_source(index, source) {
                errors.push(error);
            }
        }
    }
    if let Some(error) = check_sizing(map) {
        errors.push(error);
    }
    match errors.into_error() {
        None => Ok(result.data),
        Some(error) => Err(Box::new(error)),
    }
}

fn list_checker(result: LidyResult<()>) -> Built {
    let Some(map) = result.data.as_map() else {
        return Ok(result.data);
    };
    let mut errors = ErrorList::new();
    if !LIST_KEYWORDS.iter().any(|keyword| map.named.contains_key(*keyword)) {
        errors.push(CheckError::new(
            ErrorKind::EmptyListChecker,
            Some(result.position.clone()),
        ));
    }
    if let Some(error) = check_sizing(map) {
        errors.push(error);
    }
    match errors.into_error() {
        None => Ok(result.data),
        Some(error) => Err(Box::new(error)),
    }
}

fn regex_checker(result: LidyResult<()>) -> Built {
    let Some(pattern) = result.get("_regex") else {
        return Ok(result.data);
    };
    if let Some(source) = pattern.data.as_str() {
        if let Err(err) = Regex::new(source) {
            return Err(veto(
                ErrorKind::InvalidRegex {
                    reason: err.to_string(),
                },
                &pattern.position,
            ));
        }
    }
    Ok(result.data)
}

/// `_nb` excludes `_min` and `_max`, and `_min` may not exceed `_max`.
fn check_sizing(map: &MapData<()>) -> Option<CheckError> {
    let size = |keyword: &str| {
        map.named.get(keyword).and_then(|result| {
            let value = result.data.as_scalar()?.as_i64()?;
            Some((value, &result.position))
        })
    };
    let (min, max, nb) = (size("_min"), size("_max"), size("_nb"));

    let mut errors = ErrorList::new();
    if let Some((_, position)) = nb {
        for (keyword, bound) in [("_min", min), ("_max", max)] {
            if bound.is_some() {
                errors.push(CheckError::new(
                    ErrorKind::ConflictingSizing { other: keyword },
                    Some(position.clone()),
                ));
            }
        }
    }
    if let (Some((min, _)), Some((max, position))) = (min, max) {
        if min > max {
            errors.push(CheckError::new(
                ErrorKind::MinAboveMax { min, max },
                Some(position.clone()),
            ));
        }
    }
    errors.into_error()
}

/// A merge source must be an inline map checker, or name a rule that resolves to one
/// through any number of plain references.
fn check_merge_source(index: &SchemaIndex, source: &LidyResult<()>) -> Result<(), CheckError> {
    let invalid = |target: String, reason: &str| {
        CheckError::new(
            ErrorKind::InvalidMergeTarget {
                target,
                reason: reason.to_string(),
            },
            Some(source.position.clone()),
        )
    };

    let Some(first) = source.data.as_str() else {
        return if &*source.rule_name == "mapChecker" {
            Ok(())
        } else {
            Err(invalid(
                format!("inline {}", source.rule_name),
                "is not a map checker",
            ))
        };
    };

    let mut chain: Vec<&str> = Vec::new();
    let mut current = first;
    loop {
        if chain.contains(&current) {
            return Err(invalid(
                format!("reference '{first}'"),
                "goes through a cycle of rule references",
            ));
        }
        chain.push(current);
        let Some(node) = index.node(current) else {
            let reason = if Primitive::from_name(current).is_some() {
                "resolves to a predefined rule, not a map checker"
            } else {
                "does not name a rule of the schema"
            };
            return Err(invalid(format!("reference '{first}'"), reason));
        };
        match node.as_str() {
            Some(next) => current = next,
            None if is_map_checker(node) => return Ok(()),
            None => {
                return Err(invalid(
                    format!("reference '{first}'"),
                    "does not resolve to a map checker",
                ))
            }
        }
    }
}

fn is_map_checker(node: &Node) -> bool {
    node.is_mapping() && MAP_KEYWORDS.iter().any(|keyword| node.get(keyword).is_some())
}

#[cfg(test)]
mod tests {
    use crate::errors::{ErrorKind, LidyError};
    use crate::{BuilderRegistry, Parser};

    fn schema_error(text: &str) -> crate::errors::CheckError {
        match Parser::<()>::from_source("schema.yaml", text, BuilderRegistry::new()) {
            Err(LidyError::Schema(error)) => error,
            Err(other) => panic!("expected a schema error, got {other}"),
            Ok(_) => panic!("schema should have been rejected:\n{text}"),
        }
    }

    #[test]
    fn unknown_reference_lists_known_rules() {
        let error = schema_error("main: { _map: { a: nowhere } }");
        assert!(error.any(|kind| matches!(
            kind,
            ErrorKind::UnknownIdentifier { name, known }
                if name == "nowhere" && known.contains(&"main".to_string())
        )));
    }

    #[test]
    fn empty_map_checker_is_rejected() {
        let error = schema_error("main: { _min: 1 }");
        assert!(error.any(|kind| matches!(kind, ErrorKind::EmptyMapChecker)));
        assert!(error.any(|kind| matches!(kind, ErrorKind::EmptyListChecker)));
    }

    #[test]
    fn merge_sources_must_be_map_checkers() {
        let error = schema_error("main: { _merge: [word] }\nword: string\n");
        assert!(error.any(|kind| matches!(kind, ErrorKind::InvalidMergeTarget { .. })));

        let error = schema_error("main: { _merge: [{ _listOf: int }] }");
        assert!(error.any(|kind| matches!(
            kind,
            ErrorKind::InvalidMergeTarget { target, .. } if target == "inline listChecker"
        )));

        let parser = Parser::<()>::from_source(
            "schema.yaml",
            "main: { _merge: [alias], _map: { b: int } }\nalias: base\nbase: { _map: { a: int } }\n",
            BuilderRegistry::new(),
        );
        assert!(parser.is_ok());
    }

    #[test]
    fn sizing_keywords_must_agree() {
        let error = schema_error("main: { _listOf: int, _nb: 2, _min: 1 }");
        assert!(error.any(|kind| matches!(kind, ErrorKind::ConflictingSizing { other: "_min" })));

        let error = schema_error("main: { _mapOf: { string: int }, _min: 3, _max: 2 }");
        assert!(error.any(|kind| matches!(kind, ErrorKind::MinAboveMax { min: 3, max: 2 })));

        let error = schema_error("main: { _listOf: int, _max: -1 }");
        assert!(!error.violations().is_empty());
    }

    #[test]
    fn regexes_must_compile() {
        let error = schema_error("main: { _regex: '(unclosed' }");
        assert!(error.any(|kind| matches!(kind, ErrorKind::InvalidRegex { .. })));
    }
}
