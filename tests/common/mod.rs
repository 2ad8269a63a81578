//! Shared helpers for lidy integration tests.

#![allow(dead_code)]

use lidy::{BuilderRegistry, CheckError, LidyError, LidyResult, Parser};

/// Builds a parser without builders, panicking on an invalid schema.
pub fn parser(schema: &str) -> Parser<()> {
    Parser::from_source("schema.yaml", schema, BuilderRegistry::new())
        .unwrap_or_else(|e| panic!("schema should be valid:\n{schema}\n{e}"))
}

pub fn parse(schema: &str, text: &str) -> Result<LidyResult<()>, LidyError> {
    parser(schema).parse_str("content.yaml", text)
}

/// The schema error raised while building a parser for `schema`.
pub fn schema_error(schema: &str) -> CheckError {
    match Parser::<()>::from_source("schema.yaml", schema, BuilderRegistry::new()) {
        Err(LidyError::Schema(error)) => error,
        Err(other) => panic!("expected a schema error, got: {other}"),
        Ok(_) => panic!("schema should have been rejected:\n{schema}"),
    }
}

/// The content error raised while checking `text` against `schema`.
pub fn content_error(schema: &str, text: &str) -> CheckError {
    match parse(schema, text) {
        Err(LidyError::Content(error)) => error,
        Err(other) => panic!("expected a content error, got: {other}"),
        Ok(result) => panic!("content should have been rejected:\n{text}\n{result:?}"),
    }
}
