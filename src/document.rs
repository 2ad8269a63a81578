//! Document model consumed by the engine.
//!
//! A [`Document`] is an immutable tree of [`Node`]s with a kind, a tag, the raw scalar text,
//! ordered children and a source span. Mapping children are flattened as `key, value, key,
//! value, ...`. Every node carries a [`NodeId`] unique within its document, which the
//! evaluator uses as node identity for loop detection.
//!
//! YAML text is turned into this model by [`Document::parse`], see [`loader`].

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

mod loader;

/// Identity of a node inside one document.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Scalar,
    Mapping,
    Sequence,
}

impl NodeKind {
    pub const fn name(self) -> &'static str {
        match self {
            NodeKind::Scalar => "scalar",
            NodeKind::Mapping => "mapping",
            NodeKind::Sequence => "sequence",
        }
    }
}

/// Type hint of a node, either explicit (`!!int`) or resolved from a plain scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Str,
    Int,
    Float,
    Bool,
    Null,
    Binary,
    Timestamp,
    Map,
    Seq,
    Custom(String),
}

impl Tag {
    pub fn as_str(&self) -> &str {
        match self {
            Tag::Str => "!!str",
            Tag::Int => "!!int",
            Tag::Float => "!!float",
            Tag::Bool => "!!bool",
            Tag::Null => "!!null",
            Tag::Binary => "!!binary",
            Tag::Timestamp => "!!timestamp",
            Tag::Map => "!!map",
            Tag::Seq => "!!seq",
            Tag::Custom(tag) => tag,
        }
    }

    /// Maps an explicit tag (`handle` + `suffix` as written in the source) to a [`Tag`].
    pub fn from_explicit(handle: &str, suffix: &str) -> Tag {
        let core = if handle == "!!" {
            Some(suffix)
        } else {
            suffix.strip_prefix("tag:yaml.org,2002:")
        };
        match core {
            Some("str") => Tag::Str,
            Some("int") => Tag::Int,
            Some("float") => Tag::Float,
            Some("bool") => Tag::Bool,
            Some("null") => Tag::Null,
            Some("binary") => Tag::Binary,
            Some("timestamp") => Tag::Timestamp,
            Some("map") => Tag::Map,
            Some("seq") => Tag::Seq,
            // the non-specific tag `!` forces a string
            _ if handle == "!" && suffix.is_empty() => Tag::Str,
            _ => Tag::Custom(format!("{handle}{suffix}")),
        }
    }

    /// Resolves the tag of an untagged plain scalar.
    pub fn resolve_plain(value: &str) -> Tag {
        if PLAIN_NULL.is_match(value) {
            Tag::Null
        } else if PLAIN_BOOL.is_match(value) {
            Tag::Bool
        } else if PLAIN_INT.is_match(value) {
            Tag::Int
        } else if PLAIN_FLOAT.is_match(value) {
            Tag::Float
        } else if PLAIN_TIMESTAMP.is_match(value) {
            Tag::Timestamp
        } else {
            Tag::Str
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// PLAIN SCALAR RESOLUTION
// ============================================================================

static PLAIN_NULL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:~|null|Null|NULL)?$").unwrap());
static PLAIN_BOOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:true|True|TRUE|false|False|FALSE)$").unwrap());
static PLAIN_INT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-+]?[0-9]+|0o[0-7]+|0x[0-9a-fA-F]+)$").unwrap());
static PLAIN_FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[-+]?(?:\.[0-9]+|[0-9]+(?:\.[0-9]*)?)(?:[eE][-+]?[0-9]+)?|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN))$",
    )
    .unwrap()
});
static PLAIN_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[0-9]{4}-[0-9]{1,2}-[0-9]{1,2}(?:(?:[Tt]|[ \t]+)[0-9]{1,2}:[0-9]{2}:[0-9]{2}(?:\.[0-9]*)?(?:[ \t]*(?:Z|[-+][0-9]{1,2}(?::[0-9]{2})?))?)?$",
    )
    .unwrap()
});

/// Decodes the text of an int scalar (decimal, `0x` hexadecimal or `0o` octal).
pub fn decode_int(text: &str) -> Option<i64> {
    let text = text.strip_prefix('+').unwrap_or(text);
    if let Some(hex) = text.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(octal) = text.strip_prefix("0o") {
        i64::from_str_radix(octal, 8).ok()
    } else {
        text.parse().ok()
    }
}

/// Decodes the text of a float scalar, including the YAML spellings of infinity and NaN.
pub fn decode_float(text: &str) -> Option<f64> {
    match text {
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => Some(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => Some(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => Some(f64::NAN),
        _ => text.parse().ok(),
    }
}

pub fn decode_bool(text: &str) -> Option<bool> {
    match text {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

// ============================================================================
// NODES
// ============================================================================

/// A point in the source text. Lines and columns are 1-based, `offset` is a byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mark {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub tag: Tag,
    /// Raw text for scalars, empty for collections.
    pub value: String,
    pub children: Vec<Node>,
    pub start: Mark,
    pub end: Mark,
}

impl Node {
    pub fn is_scalar(&self) -> bool {
        self.kind == NodeKind::Scalar
    }

    pub fn is_mapping(&self) -> bool {
        self.kind == NodeKind::Mapping
    }

    pub fn is_sequence(&self) -> bool {
        self.kind == NodeKind::Sequence
    }

    /// True for a scalar tagged as a string.
    pub fn is_string(&self) -> bool {
        self.is_scalar() && self.tag == Tag::Str
    }

    /// The text of a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        self.is_string().then_some(self.value.as_str())
    }

    /// Key/value pairs of a mapping, in source order. Empty for other kinds.
    pub fn entries(&self) -> impl Iterator<Item = (&Node, &Node)> + '_ {
        let children: &[Node] = if self.is_mapping() { &self.children } else { &[] };
        children.chunks_exact(2).map(|pair| (&pair[0], &pair[1]))
    }

    /// Elements of a sequence. Empty for other kinds.
    pub fn elements(&self) -> &[Node] {
        if self.is_sequence() {
            &self.children
        } else {
            &[]
        }
    }

    /// Looks up the value of a mapping entry whose key is the given scalar text.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries()
            .find(|(k, _)| k.is_scalar() && k.value == key)
            .map(|(_, v)| v)
    }

    /// Number of entries of a mapping or elements of a sequence.
    pub fn len(&self) -> usize {
        match self.kind {
            NodeKind::Mapping => self.children.len() / 2,
            NodeKind::Sequence => self.children.len(),
            NodeKind::Scalar => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Byte length of the node's source text, at least one so labels stay visible.
    pub fn span_len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset).max(1)
    }

    /// Short human description used in error messages.
    pub fn describe(&self) -> String {
        match self.kind {
            NodeKind::Scalar => format!("{} '{}'", self.tag, self.value),
            kind => format!("{} of {} entries", kind.name(), self.len()),
        }
    }
}

// ============================================================================
// DOCUMENTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name}:{line}:{column}: {message}")]
pub struct DocumentError {
    pub name: String,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// A parsed document: its name (usually a file name), its source text and its root node.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: Arc<str>,
    pub source: Arc<str>,
    pub root: Node,
}

impl Document {
    /// Parses the first YAML document of `source`.
    pub fn parse(name: impl Into<String>, source: impl Into<String>) -> Result<Self, DocumentError> {
        let name = name.into();
        let source = source.into();
        let root = loader::load(&name, &source)?;
        Ok(Self {
            name: Arc::from(name),
            source: Arc::from(source),
            root,
        })
    }

    /// Wraps an already-built node tree, for callers that produce nodes themselves.
    ///
    /// Node ids are reassigned depth-first, so the tree may come with any ids.
    pub fn from_root(name: impl Into<String>, mut root: Node) -> Self {
        let mut next = 0;
        renumber(&mut root, &mut next);
        Self {
            name: Arc::from(name.into()),
            source: Arc::from(""),
            root,
        }
    }
}

fn renumber(node: &mut Node, next: &mut NodeId) {
    node.id = *next;
    *next += 1;
    for child in &mut node.children {
        renumber(child, next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_scalars_resolve_yaml_style() {
        assert_eq!(Tag::resolve_plain("~"), Tag::Null);
        assert_eq!(Tag::resolve_plain(""), Tag::Null);
        assert_eq!(Tag::resolve_plain("True"), Tag::Bool);
        assert_eq!(Tag::resolve_plain("-12"), Tag::Int);
        assert_eq!(Tag::resolve_plain("0x1F"), Tag::Int);
        assert_eq!(Tag::resolve_plain("1.5e3"), Tag::Float);
        assert_eq!(Tag::resolve_plain("-.inf"), Tag::Float);
        assert_eq!(Tag::resolve_plain("2001-12-14T21:59:43.10Z"), Tag::Timestamp);
        assert_eq!(Tag::resolve_plain("2001-12-14"), Tag::Timestamp);
        assert_eq!(Tag::resolve_plain("hello"), Tag::Str);
        assert_eq!(Tag::resolve_plain("1.2.3"), Tag::Str);
    }

    #[test]
    fn explicit_tags() {
        assert_eq!(Tag::from_explicit("!!", "binary"), Tag::Binary);
        assert_eq!(Tag::from_explicit("!", ""), Tag::Str);
        assert_eq!(
            Tag::from_explicit("", "tag:yaml.org,2002:int"),
            Tag::Int
        );
        assert_eq!(
            Tag::from_explicit("!", "color"),
            Tag::Custom("!color".to_string())
        );
    }

    fn built(kind: NodeKind, tag: Tag, value: &str, children: Vec<Node>) -> Node {
        let at = Mark {
            line: 1,
            column: 1,
            offset: 0,
        };
        Node {
            id: 0,
            kind,
            tag,
            value: value.to_string(),
            children,
            start: at,
            end: at,
        }
    }

    #[test]
    fn built_trees_get_distinct_ids() {
        let leaf = built(NodeKind::Scalar, Tag::Int, "1", Vec::new());
        let inner = built(NodeKind::Sequence, Tag::Seq, "", vec![leaf.clone(), leaf]);
        let root = built(NodeKind::Sequence, Tag::Seq, "", vec![inner]);

        let document = Document::from_root("built", root);
        let root = &document.root;
        let inner = &root.children[0];
        let ids = [root.id, inner.id, inner.children[0].id, inner.children[1].id];
        assert_eq!(ids, [0, 1, 2, 3]);
    }

    #[test]
    fn numeric_decoding() {
        assert_eq!(decode_int("0x10"), Some(16));
        assert_eq!(decode_int("0o17"), Some(15));
        assert_eq!(decode_int("+7"), Some(7));
        assert_eq!(decode_int("99999999999999999999"), None);
        assert_eq!(decode_float("-.inf"), Some(f64::NEG_INFINITY));
        assert_eq!(decode_float("2.5"), Some(2.5));
        assert_eq!(decode_bool("FALSE"), Some(false));
    }
}
