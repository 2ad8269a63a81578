//! Result trees produced by a successful parse.
//!
//! Every [`LidyResult`] carries the [`Position`] of the content node it describes and the
//! name of the innermost rule whose expression produced it. Its [`Data`] is a closed enum,
//! so builders pattern-match exhaustively on the shape they receive.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::document::{decode_bool, decode_float, decode_int, Node, Tag};

/// Where a matched node came from. Lines and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub filename: Arc<str>,
    pub line: usize,
    pub column: usize,
    pub line_end: usize,
    pub column_end: usize,
    /// Byte offset of the node in its source, for diagnostic labels.
    #[serde(skip)]
    pub offset: usize,
    #[serde(skip)]
    pub length: usize,
}

impl Position {
    pub fn of(filename: &Arc<str>, node: &Node) -> Self {
        Self {
            filename: Arc::clone(filename),
            line: node.start.line,
            column: node.start.column,
            line_end: node.end.line,
            column_end: node.end.column,
            offset: node.start.offset,
            length: node.span_len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Scalar {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl Scalar {
    /// Typed value of a scalar node, following its tag. Text that fails to decode stays a string.
    pub fn from_node(node: &Node) -> Self {
        let text = node.value.as_str();
        let decoded = match node.tag {
            Tag::Int => decode_int(text).map(Scalar::Int),
            Tag::Float => decode_float(text).map(Scalar::Float),
            Tag::Bool => decode_bool(text).map(Scalar::Bool),
            Tag::Null => Some(Scalar::Null),
            _ => None,
        };
        decoded.unwrap_or_else(|| Scalar::String(text.to_string()))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(n) => Some(*n as f64),
            Scalar::Float(x) => Some(*x),
            _ => None,
        }
    }
}

/// A catch-all mapping entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(bound(serialize = "T: Serialize"))]
pub struct KeyValue<T> {
    pub key: LidyResult<T>,
    pub value: LidyResult<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(bound(serialize = "T: Serialize"))]
pub struct MapData<T> {
    /// Entries matched by `_map`, `_mapFacultative` or a merged key.
    pub named: BTreeMap<String, LidyResult<T>>,
    /// Entries matched by `_mapOf`, in document order.
    pub unnamed: Vec<KeyValue<T>>,
}

impl<T> Default for MapData<T> {
    fn default() -> Self {
        Self {
            named: BTreeMap::new(),
            unnamed: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(bound(serialize = "T: Serialize"))]
pub struct ListData<T> {
    /// Elements matched by `_list` and `_listFacultative`.
    pub positional: Vec<LidyResult<T>>,
    /// Elements matched by `_listOf`.
    pub rest: Vec<LidyResult<T>>,
}

impl<T> Default for ListData<T> {
    fn default() -> Self {
        Self {
            positional: Vec::new(),
            rest: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", bound(serialize = "T: Serialize"))]
pub enum Data<T> {
    Scalar(Scalar),
    Map(MapData<T>),
    List(ListData<T>),
    /// Application value returned by a builder.
    Built(T),
}

impl<T> Data<T> {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Data::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    pub fn as_map(&self) -> Option<&MapData<T>> {
        match self {
            Data::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListData<T>> {
        match self {
            Data::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_built(&self) -> Option<&T> {
        match self {
            Data::Built(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_built(self) -> Option<T> {
        match self {
            Data::Built(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", bound(serialize = "T: Serialize"))]
pub struct LidyResult<T> {
    pub position: Position,
    pub rule_name: Arc<str>,
    pub data: Data<T>,
}

impl<T> LidyResult<T> {
    /// Named entry of a map result.
    pub fn get(&self, key: &str) -> Option<&LidyResult<T>> {
        self.data.as_map().and_then(|map| map.named.get(key))
    }
}

impl<T: Serialize> LidyResult<T> {
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}
