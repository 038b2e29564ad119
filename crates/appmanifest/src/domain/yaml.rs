//! YAML node trees with character spans, composed from `saphyr_parser` events.

use std::collections::HashMap;

use saphyr_parser::{Event, Parser, ScalarStyle, Span as EventSpan};

use crate::domain::errors::LocateError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Scalar(String),
    Sequence(Vec<YamlNode>),
    Mapping(Vec<(YamlNode, YamlNode)>),
}

/// A composed node. `start`/`end` are the raw parser marks, in chars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YamlNode {
    pub kind: NodeKind,
    pub start: usize,
    pub end: usize,
}

impl YamlNode {
    pub fn as_scalar(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[YamlNode]> {
        match &self.kind {
            NodeKind::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[(YamlNode, YamlNode)]> {
        match &self.kind {
            NodeKind::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Value of the first entry whose key is the scalar `key`.
    pub fn get(&self, key: &str) -> Option<&YamlNode> {
        self.as_mapping()?
            .iter()
            .find(|(k, _)| k.as_scalar() == Some(key))
            .map(|(_, value)| value)
    }
}

/// Root nodes of every document in a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YamlStream {
    pub documents: Vec<YamlNode>,
}

impl YamlStream {
    /// The single root node, or an error for empty and multi-document streams.
    pub fn single_root(&self) -> Result<&YamlNode, LocateError> {
        match self.documents.as_slice() {
            [root] => Ok(root),
            other => Err(LocateError::UnsupportedShape {
                documents: other.len(),
            }),
        }
    }
}

pub fn parse(source: &str) -> Result<YamlStream, LocateError> {
    let events = collect_events(source)?;
    Composer::new(&events).compose_stream()
}

fn collect_events(source: &str) -> Result<Vec<(Event<'_>, EventSpan)>, LocateError> {
    let mut events = Vec::new();
    for result in Parser::new_from_str(source) {
        events.push(result?);
    }
    Ok(events)
}

struct Composer<'a> {
    events: &'a [(Event<'a>, EventSpan)],
    pos: usize,
    anchors: HashMap<usize, YamlNode>,
}

impl<'a> Composer<'a> {
    fn new(events: &'a [(Event<'a>, EventSpan)]) -> Self {
        Self {
            events,
            pos: 0,
            anchors: HashMap::new(),
        }
    }

    fn peek(&self) -> Option<&'a (Event<'a>, EventSpan)> {
        self.events.get(self.pos)
    }

    fn advance(&mut self) -> Result<&'a (Event<'a>, EventSpan), LocateError> {
        let item = self
            .events
            .get(self.pos)
            .ok_or_else(|| LocateError::compose("event stream ended inside a node"))?;
        self.pos += 1;
        Ok(item)
    }

    fn compose_stream(mut self) -> Result<YamlStream, LocateError> {
        let mut documents = Vec::new();
        while let Some((event, _)) = self.peek() {
            match event {
                Event::StreamStart | Event::DocumentEnd | Event::Nothing => {
                    self.pos += 1;
                }
                Event::DocumentStart(..) => {
                    self.pos += 1;
                    self.anchors.clear();
                    if !matches!(self.peek(), Some((Event::DocumentEnd, _))) {
                        documents.push(self.compose_node()?);
                    }
                }
                Event::StreamEnd => break,
                other => {
                    return Err(LocateError::compose(format!(
                        "unexpected {other:?} outside a document"
                    )));
                }
            }
        }
        Ok(YamlStream { documents })
    }

    fn compose_node(&mut self) -> Result<YamlNode, LocateError> {
        let (event, span) = self.advance()?;
        let start = span.start.index();
        match event {
            Event::Scalar(value, style, anchor, _) => {
                // An absent value comes through as an empty plain scalar
                // with a zero-width span.
                let absent =
                    matches!(style, ScalarStyle::Plain) && span.start.index() == span.end.index();
                let value = if absent {
                    String::new()
                } else {
                    value.to_string()
                };
                let node = YamlNode {
                    kind: NodeKind::Scalar(value),
                    start,
                    end: span.end.index(),
                };
                Ok(self.remember(*anchor, node))
            }
            Event::SequenceStart(anchor, ..) => {
                let mut items = Vec::new();
                let end = loop {
                    match self.peek() {
                        Some((Event::SequenceEnd, end_span)) => {
                            self.pos += 1;
                            break end_span.end.index();
                        }
                        Some(_) => items.push(self.compose_node()?),
                        None => return Err(LocateError::compose("unterminated sequence")),
                    }
                };
                let node = YamlNode {
                    kind: NodeKind::Sequence(items),
                    start,
                    end,
                };
                Ok(self.remember(*anchor, node))
            }
            Event::MappingStart(anchor, ..) => {
                let mut entries = Vec::new();
                let end = loop {
                    match self.peek() {
                        Some((Event::MappingEnd, end_span)) => {
                            self.pos += 1;
                            break end_span.end.index();
                        }
                        Some(_) => {
                            let key = self.compose_node()?;
                            let value = self.compose_node()?;
                            entries.push((key, value));
                        }
                        None => return Err(LocateError::compose("unterminated mapping")),
                    }
                };
                let node = YamlNode {
                    kind: NodeKind::Mapping(entries),
                    start,
                    end,
                };
                Ok(self.remember(*anchor, node))
            }
            Event::Alias(id) => self
                .anchors
                .get(id)
                .cloned()
                .ok_or_else(|| LocateError::compose(format!("unknown alias #{id}"))),
            other => Err(LocateError::compose(format!(
                "expected a node, found {other:?}"
            ))),
        }
    }

    fn remember(&mut self, anchor: usize, node: YamlNode) -> YamlNode {
        if anchor > 0 {
            self.anchors.insert(anchor, node.clone());
        }
        node
    }
}
