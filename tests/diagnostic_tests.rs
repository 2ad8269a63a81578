//! `miette` diagnostics built from lidy errors.

mod common;

use lidy::diagnostics::{self, ErrorReport};
use lidy::{BuilderRegistry, Document, LidyError, Parser};
use miette::Diagnostic;
use pretty_assertions::assert_eq;

fn content_report(schema: &str, text: &str) -> (ErrorReport, Document) {
    let parser = common::parser(schema);
    let content = Document::parse("content.yaml", text).unwrap();
    let error = parser.parse(&content).unwrap_err();
    (diagnostics::report(&error, &content), content)
}

#[test]
fn content_errors_get_a_code_per_first_violation() {
    let (report, _) = content_report("main: { _map: { name: string } }", "age: 3");
    assert_eq!(report.code_name(), "lidy::content::missing_key");
    assert_eq!(
        report.code().map(|code| code.to_string()),
        Some("lidy::content::missing_key".to_string())
    );
    assert!(report.help().is_some());
}

#[test]
fn every_violation_is_labelled() {
    let (report, content) = content_report("main: { _listOf: int }", "[1, a, b]");
    let labels: Vec<_> = report.labels().unwrap().collect();
    assert_eq!(labels.len(), 2);

    let offsets: Vec<_> = labels.iter().map(|label| label.offset()).collect();
    assert_eq!(offsets, vec![4, 7]);
    assert_eq!(&content.source[labels[0].offset()..][..labels[0].len()], "a");
    assert_eq!(
        labels[1].label(),
        Some("int: expected an integer")
    );
}

#[test]
fn schema_errors_point_into_the_schema() {
    let schema = Document::parse("schema.yaml", "main: string\nlonely: int\n").unwrap();
    let error = Parser::<()>::make(&schema, BuilderRegistry::new()).unwrap_err();
    assert!(matches!(error, LidyError::Schema(_)));

    let report = diagnostics::report(&error, &schema);
    assert_eq!(report.code_name(), "lidy::schema::unused_rule");
    let label = report.labels().unwrap().next().unwrap();
    assert_eq!(label.offset(), 13);
    assert!(report.source_code().is_some());
}

#[test]
fn reports_render_with_miette() {
    let (report, _) = content_report("main: { _map: { port: int } }", "port: http");
    let rendered = format!("{:?}", miette::Report::new(report));
    assert!(rendered.contains("lidy::content::primitive_mismatch"), "{rendered}");
    assert!(rendered.contains("int: expected an integer"), "{rendered}");
}
