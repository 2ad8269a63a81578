//! `miette` rendering of lidy errors.
//!
//! A [`LidyError`] only knows lines and columns. [`report`] pairs it with the document the
//! error is about, so every leaf violation becomes a labelled span in that source.
//!
//! ## Usage
//! ```rust
//! use lidy::{diagnostics, BuilderRegistry, Document, Parser};
//!
//! let parser: Parser<()> =
//!     Parser::from_source("schema.yaml", "main: { _listOf: int }", BuilderRegistry::new()).unwrap();
//! let content = Document::parse("content.yaml", "[1, two, 3]").unwrap();
//! let error = parser.parse(&content).unwrap_err();
//!
//! let report = diagnostics::report(&error, &content);
//! assert_eq!(report.code_name(), "lidy::content::primitive_mismatch");
//! ```

use std::fmt;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

use crate::document::Document;
use crate::errors::{ErrorCategory, Fatal, LidyError, Violation};

pub type SourceArc = Arc<NamedSource<String>>;

/// A lidy error attached to the source it was found in.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ErrorReport {
    message: String,
    code: String,
    help: Option<String>,
    labels: Vec<LabeledSpan>,
    src: SourceArc,
}

impl ErrorReport {
    pub fn new(error: &LidyError, document: &Document) -> Self {
        let src = Arc::new(NamedSource::new(
            document.name.to_string(),
            document.source.to_string(),
        ));
        let phase = error.phase();
        let text = &document.source;

        let (code, help, labels) = match error {
            LidyError::Document(error) => (
                "syntax",
                Some("the document is not well-formed YAML".to_string()),
                vec![LabeledSpan::new(
                    Some(error.message.clone()),
                    offset_of(text, error.line, error.column),
                    1,
                )],
            ),
            LidyError::Schema(error) | LidyError::Content(error) => {
                let violations = error.violations();
                let code = violations
                    .first()
                    .map_or("no_match", |violation| violation.kind.code_suffix());
                let help = violations.first().map(|violation| help_for(violation.kind.category()));
                let labels = violations.iter().filter_map(|v| label(v)).collect();
                (code, help.map(str::to_string), labels)
            }
            LidyError::Fatal(fatal) => {
                let (code, position) = match fatal {
                    Fatal::InfiniteLoop { line, column, .. } => ("infinite_loop", Some((*line, *column))),
                    Fatal::DepthLimit { line, column, .. } => ("depth_limit", Some((*line, *column))),
                    Fatal::MalformedExpression { line, column, .. } => {
                        ("malformed_expression", Some((*line, *column)))
                    }
                    Fatal::InvalidMergeTarget { .. } => ("invalid_merge_target", None),
                };
                let labels = position
                    .map(|(line, column)| {
                        LabeledSpan::new(Some(fatal.to_string()), offset_of(text, line, column), 1)
                    })
                    .into_iter()
                    .collect();
                (
                    code,
                    Some("the schema should have been rejected when the parser was built".to_string()),
                    labels,
                )
            }
        };

        Self {
            message: error.to_string(),
            code: format!("lidy::{phase}::{code}"),
            help,
            labels,
            src,
        }
    }

    /// The diagnostic code, e.g. `lidy::content::missing_key`.
    pub fn code_name(&self) -> &str {
        &self.code
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }
}

impl Diagnostic for ErrorReport {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(self.src.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        if self.labels.is_empty() {
            None
        } else {
            Some(Box::new(self.labels.iter().cloned()))
        }
    }
}

pub fn report(error: &LidyError, document: &Document) -> ErrorReport {
    ErrorReport::new(error, document)
}

/// Prints `error` to stderr with `miette`'s graphical handler.
pub fn print_error(error: &LidyError, document: &Document) {
    let report = miette::Report::new(report(error, document));
    eprintln!("{report:?}");
}

fn label(violation: &Violation) -> Option<LabeledSpan> {
    let position = violation.position.as_ref()?;
    Some(LabeledSpan::new(
        Some(format!("{}: {}", violation.kind.keyword(), violation.kind.description())),
        position.offset,
        position.length.max(1),
    ))
}

fn help_for(category: ErrorCategory) -> &'static str {
    match category {
        ErrorCategory::Structure => "the node does not have the shape the schema expects",
        ErrorCategory::Size => "the container has the wrong number of entries",
        ErrorCategory::Scalar => "the value is not accepted by the rule applied to it",
        ErrorCategory::Schema => "the schema does not follow the lidy schema language",
        ErrorCategory::RuleSet => "the rules of the schema do not form a valid rule graph",
    }
}

/// Byte offset of a 1-based line and character column, clamped to the source.
fn offset_of(text: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;
    for (index, content) in text.split_inclusive('\n').enumerate() {
        if index + 1 == line {
            let within = content
                .char_indices()
                .nth(column.saturating_sub(1))
                .map_or(content.len(), |(byte, _)| byte);
            return offset + within;
        }
        offset += content.len();
    }
    text.len()
}
