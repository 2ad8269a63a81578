//! Parser construction: schema validation, options and introspection.

mod common;

use common::{content_error, schema_error};
use lidy::errors::ErrorKind;
use lidy::schema::range::RANGE_PATTERN;
use lidy::schema::Expression;
use lidy::validation::metaschema;
use lidy::{BuilderRegistry, Document, LidyError, Parser, ParserOptions};
use pretty_assertions::assert_eq;

#[test]
fn the_metaschema_validates_itself() {
    let parser: Parser<()> =
        Parser::from_source("metaschema.yaml", metaschema::source(), BuilderRegistry::new()).unwrap();
    // and then accepts itself as content too
    let result = parser.parse_str("metaschema.yaml", metaschema::source()).unwrap();
    assert!(result.data.as_map().is_some());
}

#[test]
fn the_range_rule_and_the_range_parser_agree() {
    let rules = metaschema::rule_set().unwrap();
    match &rules.get("rangePattern").unwrap().expression {
        Expression::Regex(pattern) => assert_eq!(pattern.source, RANGE_PATTERN),
        other => panic!("unexpected rangePattern expression {other:?}"),
    }
}

#[test]
fn self_reference_is_rejected_before_parsing() {
    let error = schema_error("main: r\nr: { _oneOf: [r] }\n");
    assert!(error.any(|kind| matches!(kind, ErrorKind::SelfReference { name, .. } if name == "r")));
}

#[test]
fn recursion_through_content_is_accepted() {
    let parser = common::parser("main: list\nlist: { _oneOf: [nullType, { _list: [int, list] }] }\n");
    assert!(parser.parse_str("content.yaml", "[1, [2, [3, ~]]]").is_ok());
    assert!(parser.parse_str("content.yaml", "[1, [two, ~]]").is_err());
}

#[test]
fn sizing_exclusivity_does_not_depend_on_content() {
    let error = schema_error("main: { _listOf: any, _nb: 1, _max: 3 }");
    assert!(error.any(|kind| matches!(kind, ErrorKind::ConflictingSizing { other: "_max" })));
}

#[test]
fn unused_rules_fail_construction() {
    let error = schema_error("main: a\na: string\nb: { _listOf: c }\nc: int\n");
    let names: Vec<_> = error
        .violations()
        .into_iter()
        .filter_map(|v| match &v.kind {
            ErrorKind::UnusedRule { name } | ErrorKind::UnreachableRule { name } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["b", "c"]);
}

#[test]
fn unused_rules_can_be_allowed() {
    let options = ParserOptions {
        report_unused_rules: false,
        ..ParserOptions::default()
    };
    let schema = Document::parse("schema.yaml", "main: string\nspare: int\n").unwrap();
    let parser: Parser<()> = Parser::with_options(&schema, BuilderRegistry::new(), options).unwrap();
    assert!(!parser.options().report_unused_rules);
    assert!(parser.rule("spare").is_some());
}

#[test]
fn options_deserialize_with_defaults() {
    let options: ParserOptions = serde_json::from_str(r#"{ "max_depth": 12 }"#).unwrap();
    assert_eq!(
        options,
        ParserOptions {
            max_depth: 12,
            report_unused_rules: true,
        }
    );
}

#[test]
fn depth_limit_stops_deep_documents() {
    let schema = Document::parse("schema.yaml", "main: { _listOf: main }").unwrap();
    let options = ParserOptions {
        max_depth: 3,
        ..ParserOptions::default()
    };
    let parser: Parser<()> = Parser::with_options(&schema, BuilderRegistry::new(), options).unwrap();
    assert!(parser.parse_str("content.yaml", "[[[]]]").is_ok());
    match parser.parse_str("content.yaml", "[[[[]]]]") {
        Err(LidyError::Fatal(lidy::Fatal::DepthLimit { limit: 3, .. })) => {}
        other => panic!("expected the depth limit, got {other:?}"),
    }
}

#[test]
fn invalid_yaml_is_a_document_error() {
    let result = Parser::<()>::from_source("schema.yaml", "main: [int", BuilderRegistry::new());
    match result {
        Err(LidyError::Document(error)) => assert_eq!(error.name, "schema.yaml"),
        other => panic!("expected a document error, got {other:?}"),
    }
}

#[test]
fn rules_can_be_inspected() {
    let parser = common::parser("main: { _listOf: item }\nitem: { _in: [a, b] }\n");
    assert_eq!(parser.rule_names().collect::<Vec<_>>(), vec!["main", "item"]);
    assert!(parser.rule("item").unwrap().is_used());
    assert!(matches!(parser.rule("item").unwrap().expression, Expression::In(_)));
    assert!(parser.rule("missing").is_none());
}

#[test]
fn merge_keeps_the_key_sets_associative() {
    let schema = "main: b\na: { _map: { x: int } }\nb: { _merge: [a], _map: { y: int } }\n";
    assert!(common::parse(schema, "{ x: 1, y: 2 }").is_ok());
    assert!(content_error(schema, "{ y: 2 }").any(|kind| matches!(kind, ErrorKind::MissingKey { key } if key == "x")));
    assert!(content_error(schema, "{ x: 1, y: 2, z: 3 }").any(|kind| matches!(kind, ErrorKind::UnknownKey { key } if key == "z")));
}

#[test]
fn any_counts_nesting_against_the_depth_limit() {
    let schema = Document::parse("schema.yaml", "main: any").unwrap();
    let options = ParserOptions {
        max_depth: 3,
        ..ParserOptions::default()
    };
    let parser: Parser<()> = Parser::with_options(&schema, BuilderRegistry::new(), options).unwrap();
    assert!(parser.parse_str("content.yaml", "[[[1]]]").is_ok());
    assert!(parser.parse_str("content.yaml", "{ a: { b: [1] } }").is_ok());
    match parser.parse_str("content.yaml", "[[[[1]]]]") {
        Err(LidyError::Fatal(lidy::Fatal::DepthLimit { limit: 3, line: 1, column: 4 })) => {}
        other => panic!("expected the depth limit, got {other:?}"),
    }
}
