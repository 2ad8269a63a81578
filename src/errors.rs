//! Lidy error model.
//!
//! Two tiers:
//! - [`CheckError`]: recoverable content failures. They are aggregated, wrapped with the rule
//!   and key they happened under, and swallowed by `_oneOf` when another option matches.
//! - [`Fatal`]: schema-authoring invariant violations. They abort evaluation outright.
//!
//! [`LidyError`] is what the public API returns.

use std::fmt;

use thiserror::Error;

use crate::document::{DocumentError, Node};
use crate::result::Position;

mod list;

pub use list::ErrorList;

// ============================================================================
// ERROR KINDS
// ============================================================================

/// What a single check found wrong.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Structural errors - the content has the wrong shape
    NotAMapping,
    NotASequence,
    NotAScalar {
        keyword: &'static str,
    },
    MissingKey {
        key: String,
    },
    UnknownKey {
        key: String,
    },
    NonScalarKey,
    TooFewElements {
        expected: usize,
        actual: usize,
    },
    TooManyElements {
        allowed: usize,
        actual: usize,
    },

    // Size errors
    BelowMin {
        min: usize,
        count: usize,
    },
    AboveMax {
        max: usize,
        count: usize,
    },
    WrongCount {
        nb: usize,
        count: usize,
    },

    // Scalar errors
    NotAString,
    RegexMismatch {
        pattern: String,
    },
    NotInSet {
        accepted: Vec<String>,
    },
    NotANumber,
    NotAnInteger,
    OutOfRange {
        range: String,
    },
    PrimitiveMismatch {
        rule: &'static str,
        expected: &'static str,
    },
    UnknownRule {
        name: String,
    },
    Never,
    Builder {
        rule: String,
        message: String,
    },

    // Schema errors - raised while validating a schema against the metaschema
    UnknownIdentifier {
        name: String,
        known: Vec<String>,
    },
    EmptyMapChecker,
    EmptyListChecker,
    InvalidMergeTarget {
        target: String,
        reason: String,
    },
    ConflictingSizing {
        other: &'static str,
    },
    MinAboveMax {
        min: i64,
        max: i64,
    },
    InvalidRegex {
        reason: String,
    },

    // Rule set errors - raised by the rule graph check
    MissingMain,
    DuplicateRule {
        name: String,
    },
    UnusedRule {
        name: String,
    },
    UnreachableRule {
        name: String,
    },
    SelfReference {
        name: String,
        chain: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Structure,
    Size,
    Scalar,
    Schema,
    RuleSet,
}

impl ErrorKind {
    /// The schema keyword (or rule name) the check belongs to.
    pub fn keyword(&self) -> &str {
        match self {
            Self::NotAMapping | Self::UnknownKey { .. } | Self::NonScalarKey => "_map*",
            Self::NotASequence | Self::TooManyElements { .. } => "_list*",
            Self::NotAScalar { keyword } => *keyword,
            Self::MissingKey { .. } => "_map",
            Self::TooFewElements { .. } => "_list",
            Self::BelowMin { .. } => "_min",
            Self::AboveMax { .. } => "_max",
            Self::WrongCount { .. } => "_nb",
            Self::NotAString | Self::RegexMismatch { .. } | Self::InvalidRegex { .. } => "_regex",
            Self::NotInSet { .. } => "_in",
            Self::NotANumber | Self::NotAnInteger | Self::OutOfRange { .. } => "_range",
            Self::PrimitiveMismatch { rule, .. } => *rule,
            Self::UnknownRule { name } => name.as_str(),
            Self::Never => "never",
            Self::Builder { rule, .. } => rule.as_str(),
            Self::UnknownIdentifier { .. } => "identifier",
            Self::EmptyMapChecker => "_map*",
            Self::EmptyListChecker => "_list*",
            Self::InvalidMergeTarget { .. } => "_merge",
            Self::ConflictingSizing { .. } => "_nb",
            Self::MinAboveMax { .. } => "_min",
            Self::MissingMain
            | Self::DuplicateRule { .. }
            | Self::UnusedRule { .. }
            | Self::UnreachableRule { .. }
            | Self::SelfReference { .. } => "ruleSet",
        }
    }

    pub fn description(&self) -> String {
        match self {
            Self::NotAMapping => "must be a mapping node".into(),
            Self::NotASequence => "must be a sequence node".into(),
            Self::NotAScalar { .. } => "must be a scalar node".into(),
            Self::MissingKey { key } => format!("missing key '{key}' in mapping"),
            Self::UnknownKey { key } => format!("unknown key '{key}'"),
            Self::NonScalarKey => "expected a scalar key in mapping".into(),
            Self::TooFewElements { expected, actual } => format!(
                "not enough entries: expected at least {expected} but found {actual}"
            ),
            Self::TooManyElements { allowed, actual } => {
                format!("too many entries: expected at most {allowed} but found {actual}")
            }
            Self::BelowMin { min, count } => format!(
                "expected container to have at least {min} entries but it has only {count}"
            ),
            Self::AboveMax { max, count } => format!(
                "expected container to have at most {max} entries but it has {count}"
            ),
            Self::WrongCount { nb, count } => format!(
                "expected container to have exactly {nb} entries but it has {count}"
            ),
            Self::NotAString => "must be a string".into(),
            Self::RegexMismatch { pattern } => format!("must match regex /{pattern}/"),
            Self::NotInSet { accepted } => format!(
                "must be one of the accepted values [{}]",
                accepted.join(", ")
            ),
            Self::NotANumber => "must be an int or a float".into(),
            Self::NotAnInteger => "must be an integer".into(),
            Self::OutOfRange { range } => {
                format!("must be inside the specified range '{range}'")
            }
            Self::PrimitiveMismatch { expected, .. } => format!("expected {expected}"),
            Self::UnknownRule { name } => format!("rule '{name}' not found in the schema"),
            Self::Never => "no value is accepted here".into(),
            Self::Builder { message, .. } => message.clone(),
            Self::UnknownIdentifier { name, known } => format!(
                "encountered unknown rule identifier '{name}'. Known rules are: [{}]",
                known.join(", ")
            ),
            Self::EmptyMapChecker => {
                "a map checker needs one of `_map`, `_mapFacultative`, `_mapOf` or `_merge`".into()
            }
            Self::EmptyListChecker => {
                "a list checker needs one of `_list`, `_listFacultative` or `_listOf`".into()
            }
            Self::InvalidMergeTarget { target, reason } => format!("{target} {reason}"),
            Self::ConflictingSizing { other } => {
                format!("it makes no sense to use the `_nb` and `{other}` together")
            }
            Self::MinAboveMax { min, max } => {
                format!("`_max` ({max}) cannot be lower than `_min` ({min})")
            }
            Self::InvalidRegex { reason } => format!("invalid regular expression: {reason}"),
            Self::MissingMain => "could not find the 'main' rule".into(),
            Self::DuplicateRule { name } => format!("rule '{name}' is defined more than once"),
            Self::UnusedRule { name } => format!("rule '{name}' is defined but never used"),
            Self::UnreachableRule { name } => {
                format!("rule '{name}' is never reached from 'main'")
            }
            Self::SelfReference { name, chain } => format!(
                "rule '{name}' references itself without consuming input ({})",
                chain.join(" -> ")
            ),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotAMapping
            | Self::NotASequence
            | Self::NotAScalar { .. }
            | Self::MissingKey { .. }
            | Self::UnknownKey { .. }
            | Self::NonScalarKey
            | Self::TooFewElements { .. }
            | Self::TooManyElements { .. } => ErrorCategory::Structure,

            Self::BelowMin { .. } | Self::AboveMax { .. } | Self::WrongCount { .. } => {
                ErrorCategory::Size
            }

            Self::NotAString
            | Self::RegexMismatch { .. }
            | Self::NotInSet { .. }
            | Self::NotANumber
            | Self::NotAnInteger
            | Self::OutOfRange { .. }
            | Self::PrimitiveMismatch { .. }
            | Self::UnknownRule { .. }
            | Self::Never
            | Self::Builder { .. } => ErrorCategory::Scalar,

            Self::UnknownIdentifier { .. }
            | Self::EmptyMapChecker
            | Self::EmptyListChecker
            | Self::InvalidMergeTarget { .. }
            | Self::ConflictingSizing { .. }
            | Self::MinAboveMax { .. }
            | Self::InvalidRegex { .. } => ErrorCategory::Schema,

            Self::MissingMain
            | Self::DuplicateRule { .. }
            | Self::UnusedRule { .. }
            | Self::UnreachableRule { .. }
            | Self::SelfReference { .. } => ErrorCategory::RuleSet,
        }
    }

    /// Error code suffix for diagnostic codes
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::NotAMapping => "not_a_mapping",
            Self::NotASequence => "not_a_sequence",
            Self::NotAScalar { .. } => "not_a_scalar",
            Self::MissingKey { .. } => "missing_key",
            Self::UnknownKey { .. } => "unknown_key",
            Self::NonScalarKey => "non_scalar_key",
            Self::TooFewElements { .. } => "too_few_elements",
            Self::TooManyElements { .. } => "too_many_elements",
            Self::BelowMin { .. } => "below_min",
            Self::AboveMax { .. } => "above_max",
            Self::WrongCount { .. } => "wrong_count",
            Self::NotAString => "not_a_string",
            Self::RegexMismatch { .. } => "regex_mismatch",
            Self::NotInSet { .. } => "not_in_set",
            Self::NotANumber => "not_a_number",
            Self::NotAnInteger => "not_an_integer",
            Self::OutOfRange { .. } => "out_of_range",
            Self::PrimitiveMismatch { .. } => "primitive_mismatch",
            Self::UnknownRule { .. } => "unknown_rule",
            Self::Never => "never",
            Self::Builder { .. } => "builder",
            Self::UnknownIdentifier { .. } => "unknown_identifier",
            Self::EmptyMapChecker => "empty_map_checker",
            Self::EmptyListChecker => "empty_list_checker",
            Self::InvalidMergeTarget { .. } => "invalid_merge_target",
            Self::ConflictingSizing { .. } => "conflicting_sizing",
            Self::MinAboveMax { .. } => "min_above_max",
            Self::InvalidRegex { .. } => "invalid_regex",
            Self::MissingMain => "missing_main",
            Self::DuplicateRule { .. } => "duplicate_rule",
            Self::UnusedRule { .. } => "unused_rule",
            Self::UnreachableRule { .. } => "unreachable_rule",
            Self::SelfReference { .. } => "self_reference",
        }
    }
}

// ============================================================================
// CHECK ERRORS
// ============================================================================

/// A single positioned failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub kind: ErrorKind,
    pub position: Option<Position>,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.keyword(), self.kind.description())?;
        if let Some(position) = &self.position {
            write!(f, " {}:{}", position.line, position.column)?;
        }
        Ok(())
    }
}

/// A recoverable failure, possibly bundling several independent causes.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckError {
    Violation(Violation),
    /// Independent failures, in encounter order.
    Joined(Vec<CheckError>),
    /// A failure inside a named rule.
    Rule {
        rule: String,
        cause: Box<CheckError>,
    },
    /// A failure on the value of a mapping entry.
    Key {
        key: String,
        cause: Box<CheckError>,
    },
    /// No alternative of `_oneOf` (or of several `_mapOf` patterns) matched.
    NoMatch {
        keyword: &'static str,
        position: Position,
        causes: Vec<CheckError>,
    },
}

impl CheckError {
    pub fn new(kind: ErrorKind, position: Option<Position>) -> Self {
        CheckError::Violation(Violation { kind, position })
    }

    pub fn within_rule(self, rule: &str) -> Self {
        CheckError::Rule {
            rule: rule.to_string(),
            cause: Box::new(self),
        }
    }

    pub fn at_key(self, key: &str) -> Self {
        CheckError::Key {
            key: key.to_string(),
            cause: Box::new(self),
        }
    }

    /// Every leaf violation, depth first, in encounter order.
    pub fn violations(&self) -> Vec<&Violation> {
        let mut found = Vec::new();
        self.collect_violations(&mut found);
        found
    }

    fn collect_violations<'a>(&'a self, found: &mut Vec<&'a Violation>) {
        match self {
            CheckError::Violation(violation) => found.push(violation),
            CheckError::Joined(errors) => errors.iter().for_each(|e| e.collect_violations(found)),
            CheckError::Rule { cause, .. } | CheckError::Key { cause, .. } => {
                cause.collect_violations(found)
            }
            CheckError::NoMatch { causes, .. } => {
                causes.iter().for_each(|e| e.collect_violations(found))
            }
        }
    }

    /// True if any leaf violation satisfies `predicate`.
    pub fn any(&self, predicate: impl Fn(&ErrorKind) -> bool) -> bool {
        self.violations().iter().any(|v| predicate(&v.kind))
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::Violation(violation) => write!(f, "{violation}"),
            CheckError::Joined(errors) => {
                for (i, error) in errors.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{error}")?;
                }
                Ok(())
            }
            CheckError::Rule { rule, cause } => {
                let text = cause.to_string().replace('\n', "\n  ");
                write!(f, "{rule} failed (\n  {text}\n)")
            }
            CheckError::Key { key, cause } => write!(f, "key {key}: {cause}"),
            CheckError::NoMatch {
                keyword,
                position,
                causes,
            } => {
                let what = if *keyword == "_oneOf" {
                    "expressions"
                } else {
                    "patterns"
                };
                write!(
                    f,
                    "{keyword}: none of the {} {what} matched {}:{}",
                    causes.len(),
                    position.line,
                    position.column
                )?;
                for cause in causes {
                    write!(f, "\n{cause}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for CheckError {}

// ============================================================================
// FATAL ERRORS
// ============================================================================

/// Conditions that abort evaluation instead of being aggregated.
///
/// Apart from [`Fatal::DepthLimit`] these can only happen if a schema reached the evaluator
/// without passing metaschema validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fatal {
    #[error("infinite loop: rule '{rule}' encountered multiple times for the same node at {line}:{column}")]
    InfiniteLoop {
        rule: String,
        line: usize,
        column: usize,
    },
    #[error("rule nesting deeper than {limit} at {line}:{column}")]
    DepthLimit {
        limit: usize,
        line: usize,
        column: usize,
    },
    #[error("malformed schema expression at {line}:{column}: {reason}")]
    MalformedExpression {
        reason: String,
        line: usize,
        column: usize,
    },
    #[error("merge source '{target}' does not resolve to a map checker: {reason}")]
    InvalidMergeTarget { target: String, reason: String },
}

impl Fatal {
    pub(crate) fn malformed(node: &Node, reason: impl Into<String>) -> Self {
        Fatal::MalformedExpression {
            reason: reason.into(),
            line: node.start.line,
            column: node.start.column,
        }
    }
}

/// Evaluation outcome of a failed match.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    Check(CheckError),
    Fatal(Fatal),
}

impl Failure {
    pub fn within_rule(self, rule: &str) -> Self {
        match self {
            Failure::Check(error) => Failure::Check(error.within_rule(rule)),
            fatal => fatal,
        }
    }

    pub fn at_key(self, key: &str) -> Self {
        match self {
            Failure::Check(error) => Failure::Check(error.at_key(key)),
            fatal => fatal,
        }
    }
}

impl From<CheckError> for Failure {
    fn from(error: CheckError) -> Self {
        Failure::Check(error)
    }
}

impl From<Fatal> for Failure {
    fn from(fatal: Fatal) -> Self {
        Failure::Fatal(fatal)
    }
}

// ============================================================================
// PUBLIC ERROR
// ============================================================================

#[derive(Debug, Error)]
pub enum LidyError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// The schema does not conform to the metaschema, or its rule graph is invalid.
    #[error("invalid schema:\n{0}")]
    Schema(CheckError),
    /// The content does not conform to the schema.
    #[error("{0}")]
    Content(CheckError),
    #[error(transparent)]
    Fatal(#[from] Fatal),
}

impl LidyError {
    pub(crate) fn schema(failure: Failure) -> Self {
        match failure {
            Failure::Check(error) => LidyError::Schema(error),
            Failure::Fatal(fatal) => LidyError::Fatal(fatal),
        }
    }

    pub(crate) fn content(failure: Failure) -> Self {
        match failure {
            Failure::Check(error) => LidyError::Content(error),
            Failure::Fatal(fatal) => LidyError::Fatal(fatal),
        }
    }

    /// The check error carried by a schema or content failure.
    pub fn check_error(&self) -> Option<&CheckError> {
        match self {
            LidyError::Schema(error) | LidyError::Content(error) => Some(error),
            _ => None,
        }
    }

    pub fn phase(&self) -> &'static str {
        match self {
            LidyError::Document(_) => "document",
            LidyError::Schema(_) => "schema",
            LidyError::Content(_) => "content",
            LidyError::Fatal(_) => "fatal",
        }
    }
}

// ============================================================================
// REPORTING
// ============================================================================

/// Context-aware creation of positioned violations.
pub trait Reporting {
    /// Position of `node` in the document being checked.
    fn position(&self, node: &Node) -> Position;

    fn report(&self, kind: ErrorKind, node: &Node) -> CheckError {
        CheckError::new(kind, Some(self.position(node)))
    }

    fn missing_key(&self, key: &str, node: &Node) -> CheckError {
        self.report(ErrorKind::MissingKey { key: key.into() }, node)
    }

    fn unknown_key(&self, key: &str, node: &Node) -> CheckError {
        self.report(ErrorKind::UnknownKey { key: key.into() }, node)
    }

    fn primitive_mismatch(
        &self,
        rule: &'static str,
        expected: &'static str,
        node: &Node,
    ) -> CheckError {
        self.report(ErrorKind::PrimitiveMismatch { rule, expected }, node)
    }
}
