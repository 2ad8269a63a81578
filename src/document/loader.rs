//! Builds a [`Node`] tree from `yaml-rust` parser events.
//!
//! The event API is used instead of `YamlLoader` because it exposes source markers,
//! scalar styles and explicit tags, all of which the engine needs.

use std::collections::HashMap;

use yaml_rust::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust::scanner::{Marker, TScalarStyle, TokenType};

use super::{DocumentError, Mark, Node, NodeId, NodeKind, Tag};

pub(super) fn load(name: &str, source: &str) -> Result<Node, DocumentError> {
    let mut loader = Loader::new(source);
    let mut parser = Parser::new(source.chars());
    parser
        .load(&mut loader, false)
        .map_err(|err| DocumentError {
            name: name.to_string(),
            message: err.to_string(),
            line: err.marker().line(),
            column: err.marker().col() + 1,
        })?;
    Ok(loader.finish())
}

struct Loader {
    chars: Vec<char>,
    /// Byte offset of every char index, plus the source length as sentinel.
    offsets: Vec<usize>,
    /// Char index at which each line starts.
    line_starts: Vec<usize>,
    stack: Vec<(Node, usize)>,
    anchors: HashMap<usize, Node>,
    root: Option<Node>,
    next_id: NodeId,
}

impl Loader {
    fn new(source: &str) -> Self {
        let chars: Vec<char> = source.chars().collect();
        let mut offsets: Vec<usize> = source.char_indices().map(|(byte, _)| byte).collect();
        offsets.push(source.len());
        let line_starts = std::iter::once(0)
            .chain(
                chars
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| **c == '\n')
                    .map(|(i, _)| i + 1),
            )
            .collect();
        Self {
            chars,
            offsets,
            line_starts,
            stack: Vec::new(),
            anchors: HashMap::new(),
            root: None,
            next_id: 0,
        }
    }

    /// Position of the char at `index`, clamped to the end of the source.
    fn mark_of(&self, index: usize) -> Mark {
        let index = index.min(self.chars.len());
        let line = self.line_starts.partition_point(|&start| start <= index);
        Mark {
            line,
            column: index - self.line_starts[line - 1] + 1,
            offset: self.offsets[index],
        }
    }

    /// Char index just past the source text of a scalar starting at `start`.
    fn scalar_end(&self, start: usize, style: &TScalarStyle, value: &str) -> usize {
        let width = value.chars().count();
        match style {
            TScalarStyle::SingleQuoted => self
                .closing_quote(start, '\'', None)
                .unwrap_or(start + width + 2),
            TScalarStyle::DoubleQuoted => self
                .closing_quote(start, '"', Some('\\'))
                .unwrap_or(start + width + 2),
            TScalarStyle::Plain | TScalarStyle::Any => start + width,
            // literal and folded block scalars
            _ => self.block_end(start),
        }
    }

    fn closing_quote(&self, start: usize, quote: char, escape: Option<char>) -> Option<usize> {
        if self.chars.get(start) != Some(&quote) {
            return None;
        }
        let mut i = start + 1;
        while let Some(&c) = self.chars.get(i) {
            if Some(c) == escape {
                i += 2;
            } else if c == quote && escape.is_none() && self.chars.get(i + 1) == Some(&quote) {
                i += 2;
            } else if c == quote {
                return Some(i + 1);
            } else {
                i += 1;
            }
        }
        None
    }

    /// End of the last content line of a block scalar whose indicator is at `start`.
    /// Content lines are blank or indented deeper than the indicator's line.
    fn block_end(&self, start: usize) -> usize {
        let header = self.line_starts.partition_point(|&s| s <= start) - 1;
        let indent = self.indent_of(header);
        let mut end = self.line_end(header);
        for line in header + 1..self.line_starts.len() {
            let first = self.line_starts[line];
            let text_end = self.line_end(line);
            if self.chars[first..text_end].iter().all(|c| c.is_whitespace()) {
                continue;
            }
            if self.indent_of(line) <= indent {
                break;
            }
            end = text_end;
        }
        end
    }

    fn indent_of(&self, line: usize) -> usize {
        self.chars[self.line_starts[line]..self.line_end(line)]
            .iter()
            .take_while(|&&c| c == ' ')
            .count()
    }

    /// Char index of the line break ending `line`, or the source length.
    fn line_end(&self, line: usize) -> usize {
        self.line_starts
            .get(line + 1)
            .map_or(self.chars.len(), |next| next - 1)
    }

    fn node(&mut self, kind: NodeKind, tag: Tag, value: String, start: Mark) -> Node {
        let id = self.next_id;
        self.next_id += 1;
        Node {
            id,
            kind,
            tag,
            value,
            children: Vec::new(),
            start,
            end: start,
        }
    }

    fn attach(&mut self, node: Node, anchor: usize) {
        if anchor > 0 {
            self.anchors.insert(anchor, node.clone());
        }
        match self.stack.last_mut() {
            Some((parent, _)) => parent.children.push(node),
            None => {
                if self.root.is_none() {
                    self.root = Some(node);
                }
            }
        }
    }

    /// Closes the innermost collection.
    ///
    /// A block mapping is announced at its first `:`, so it starts at its first key
    /// instead. Flow collections end past their closing bracket, block ones with their
    /// last child.
    fn close(&mut self, marker: &Marker) {
        let Some((mut node, anchor)) = self.stack.pop() else {
            return;
        };
        if let Some(first) = node.children.first() {
            if first.start.offset < node.start.offset {
                node.start = first.start;
            }
        }
        node.end = match self.chars.get(marker.index()) {
            Some(']') | Some('}') => self.mark_of(marker.index() + 1),
            _ => node
                .children
                .last()
                .map_or_else(|| self.mark_of(marker.index()), |last| last.end),
        };
        self.attach(node, anchor);
    }

    fn finish(mut self) -> Node {
        match self.root.take() {
            Some(root) => root,
            None => {
                let start = self.mark_of(0);
                self.node(NodeKind::Scalar, Tag::Null, String::new(), start)
            }
        }
    }
}

impl MarkedEventReceiver for Loader {
    fn on_event(&mut self, event: Event, marker: Marker) {
        match event {
            Event::Scalar(value, style, anchor, tag) => {
                let tag = match tag {
                    Some(TokenType::Tag(handle, suffix)) => Tag::from_explicit(&handle, &suffix),
                    _ if matches!(style, TScalarStyle::Plain) => Tag::resolve_plain(&value),
                    _ => Tag::Str,
                };
                let end = self.scalar_end(marker.index(), &style, &value);
                let start = self.mark_of(marker.index());
                let mut node = self.node(NodeKind::Scalar, tag, value, start);
                node.end = self.mark_of(end);
                self.attach(node, anchor);
            }
            Event::SequenceStart(anchor) => {
                let start = self.mark_of(marker.index());
                let node = self.node(NodeKind::Sequence, Tag::Seq, String::new(), start);
                self.stack.push((node, anchor));
            }
            Event::MappingStart(anchor) => {
                let start = self.mark_of(marker.index());
                let node = self.node(NodeKind::Mapping, Tag::Map, String::new(), start);
                self.stack.push((node, anchor));
            }
            Event::SequenceEnd | Event::MappingEnd => self.close(&marker),
            Event::Alias(anchor) => {
                // an alias is the anchored node itself, identity included
                let node = match self.anchors.get(&anchor) {
                    Some(node) => node.clone(),
                    None => {
                        let start = self.mark_of(marker.index());
                        self.node(NodeKind::Scalar, Tag::Null, String::new(), start)
                    }
                };
                self.attach(node, 0);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_carry_positions_and_tags() {
        let root = load("t.yaml", "a: 1\nb: \"2\"\n").unwrap();
        assert_eq!(root.kind, NodeKind::Mapping);
        assert_eq!(root.len(), 2);

        let (key, value) = root.entries().nth(1).unwrap();
        assert_eq!(key.value, "b");
        assert_eq!(key.start.line, 2);
        assert_eq!(key.start.column, 1);
        assert_eq!(value.tag, Tag::Str);
        assert_eq!(root.get("a").unwrap().tag, Tag::Int);
    }

    fn span(node: &Node) -> ((usize, usize), (usize, usize)) {
        (
            (node.start.line, node.start.column),
            (node.end.line, node.end.column),
        )
    }

    #[test]
    fn block_mappings_start_at_their_first_key() {
        let root = load("t.yaml", "outer:\n  inner: 1\n  other: 22\n").unwrap();
        assert_eq!(span(&root), ((1, 1), (3, 12)));
        let outer = root.get("outer").unwrap();
        assert_eq!(span(outer), ((2, 3), (3, 12)));
        assert_eq!(outer.start.offset, 9);
    }

    #[test]
    fn flow_collections_span_their_brackets() {
        let root = load("t.yaml", "a: { b: 1 }\nc: [x, y]\n").unwrap();
        assert_eq!(span(root.get("a").unwrap()), ((1, 4), (1, 12)));
        assert_eq!(span(root.get("c").unwrap()), ((2, 4), (2, 10)));
    }

    #[test]
    fn block_sequences_start_at_their_dash() {
        let root = load("t.yaml", "items:\n  - one\n  - two\n").unwrap();
        let items = root.get("items").unwrap();
        assert_eq!(span(items), ((2, 3), (3, 8)));
        assert_eq!(span(&items.elements()[1]), ((3, 5), (3, 8)));
    }

    #[test]
    fn quoted_scalars_include_their_quotes() {
        let root = load("t.yaml", "a: 'it''s'\nb: \"x\\\"y\"\n").unwrap();
        let a = root.get("a").unwrap();
        assert_eq!(a.value, "it's");
        assert_eq!(span(a), ((1, 4), (1, 11)));
        let b = root.get("b").unwrap();
        assert_eq!(b.value, "x\"y");
        assert_eq!(span(b), ((2, 4), (2, 10)));
    }

    #[test]
    fn block_scalars_end_with_their_last_line() {
        let root = load("t.yaml", "text: |\n  one\n\n  two\nnext: 1\n").unwrap();
        let text = root.get("text").unwrap();
        assert_eq!(text.value, "one\n\ntwo\n");
        assert_eq!(span(text), ((1, 7), (4, 6)));
        assert_eq!(span(root.get("next").unwrap()), ((5, 7), (5, 8)));
    }

    #[test]
    fn multibyte_text_keeps_char_columns() {
        let root = load("t.yaml", "é: ü\n").unwrap();
        let value = root.get("é").unwrap();
        assert_eq!(span(value), ((1, 4), (1, 5)));
        assert_eq!(value.start.offset, 4);
    }

    #[test]
    fn node_ids_are_unique() {
        let root = load("t.yaml", "[a, [b, c], {d: e}]").unwrap();
        let mut ids = Vec::new();
        fn collect(node: &Node, ids: &mut Vec<NodeId>) {
            ids.push(node.id);
            node.children.iter().for_each(|child| collect(child, ids));
        }
        collect(&root, &mut ids);
        let count = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), count);
    }

    #[test]
    fn aliases_share_identity() {
        let root = load("t.yaml", "a: &x {k: v}\nb: *x\n").unwrap();
        assert_eq!(root.get("a").unwrap().id, root.get("b").unwrap().id);
    }

    #[test]
    fn empty_values_are_null() {
        let root = load("t.yaml", "key:\n").unwrap();
        assert_eq!(root.get("key").unwrap().tag, Tag::Null);
        assert_eq!(load("t.yaml", "").unwrap().tag, Tag::Null);
    }

    #[test]
    fn explicit_tags_are_kept() {
        let root = load("t.yaml", "- !!binary aGVsbG8=\n- !!str 12\n").unwrap();
        assert_eq!(root.elements()[0].tag, Tag::Binary);
        assert_eq!(root.elements()[1].tag, Tag::Str);
    }

    #[test]
    fn syntax_errors_report_location() {
        let err = load("bad.yaml", "a: [1, 2\n").unwrap_err();
        assert_eq!(err.name, "bad.yaml");
        assert!(err.line >= 1);
    }
}
