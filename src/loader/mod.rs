//! Tokenizes and parses YAML source bytes into a [`TreeValue`], recognizing
//! the closed set of custom tags and materializing them as
//! [`PlaceholderNode`] variants. Built as a [`SpannedEventReceiver`] over
//! `saphyr-parser`'s event stream rather than on top of a high-level
//! deserializer, the same way `saphyr`'s own default loader is built, so
//! that custom tags, anchors/aliases, and exact source spans stay
//! observable (a `serde_yaml`-style deserializer hides all three).

pub mod locator;

pub use locator::SourceLocator;

use std::collections::HashMap;

use saphyr_parser::{Event, Parser, ScanError, Span, SpannedEventReceiver, Tag, TScalarStyle};

use crate::error::LoadError;
use crate::tree::{PlaceholderKind, PlaceholderNode, SourceSpan, SubstitutionPattern, TreeMap, TreeValue};
use crate::urlenc;

/// Parses `source` (the full text of one file) into a `TreeValue` plus a
/// [`SourceLocator`] for the root mapping's keys.
pub fn load(relative_path: &str, source: &str) -> Result<(TreeValue, SourceLocator), LoadError> {
    let mut receiver = Receiver::new();
    let mut parser = Parser::new_from_str(source);
    parser.load(&mut receiver, false).map_err(|e| {
        let marker = e.marker();
        LoadError::located(
            relative_path,
            marker.line(),
            marker.col() + 1,
            "YamlSyntaxError",
            scan_error_message(&e),
        )
    })?;

    let root = receiver.docs.pop().unwrap_or(TreeValue::Null);
    Ok((root, receiver.locator))
}

fn scan_error_message(err: &ScanError) -> String {
    err.info().to_string()
}

/// Pending state for one mapping currently being built.
enum PendingKey {
    /// Waiting for the next scalar/collection event to become a key.
    AwaitingKey,
    /// Key has been produced; the next event is the associated value.
    AwaitingValue(TreeValue),
}

struct Receiver {
    /// (node under construction, anchor id, optional enclosing mapping's
    /// pending-key state before this node was pushed)
    stack: Vec<(TreeValue, usize)>,
    keys: Vec<PendingKey>,
    starts: Vec<Span>,
    anchors: HashMap<usize, TreeValue>,
    docs: Vec<TreeValue>,
    locator: SourceLocator,
}

impl Receiver {
    fn new() -> Self {
        Self {
            stack: Vec::new(),
            keys: Vec::new(),
            starts: Vec::new(),
            anchors: HashMap::new(),
            docs: Vec::new(),
            locator: SourceLocator::new(),
        }
    }

    fn finish_collection(&mut self, aid: usize, span: Span, value: TreeValue) {
        self.starts.pop();
        self.insert_node(aid, value, span);
    }

    fn insert_node(&mut self, aid: usize, value: TreeValue, span: Span) {
        if aid > 0 {
            self.anchors.insert(aid, value.clone());
        }

        match self.stack.last_mut() {
            None => self.stack.push((value, aid)),
            Some((parent, _)) => match parent {
                TreeValue::Seq(items) => items.push(value),
                TreeValue::Map(map) => {
                    let is_root_map = self.stack.len() == 1;
                    match self.keys.last_mut() {
                        Some(slot @ PendingKey::AwaitingKey) => {
                            *slot = PendingKey::AwaitingValue(value);
                        }
                        Some(slot) => {
                            let PendingKey::AwaitingValue(key) =
                                std::mem::replace(slot, PendingKey::AwaitingKey)
                            else {
                                unreachable!()
                            };
                            if is_root_map {
                                if let Some(k) = key.as_str() {
                                    self.locator.record(
                                        k.to_string(),
                                        SourceSpan::new(span.start.line(), span.start.col() + 1),
                                    );
                                }
                            }
                            map.insert(key, value);
                        }
                        None => unreachable!("map node without a key slot"),
                    }
                }
                _ => unreachable!("non-container parent on stack"),
            },
        }
    }
}

impl SpannedEventReceiver for Receiver {
    fn on_event(&mut self, ev: Event, span: Span) {
        match ev {
            Event::Nothing | Event::StreamStart | Event::StreamEnd | Event::DocumentStart(_) => {}
            Event::DocumentEnd => {
                let doc = if let Some((node, _)) = self.stack.pop() {
                    node
                } else {
                    TreeValue::Null
                };
                self.docs.push(doc);
            }
            Event::SequenceStart(aid, tag) => {
                self.starts.push(span);
                self.stack.push((
                    wrap_tag(TreeValue::Seq(Vec::new()), tag.as_ref(), span),
                    aid,
                ));
            }
            Event::SequenceEnd => {
                let (node, aid) = self.stack.pop().expect("sequence start pushed a frame");
                let start = self.starts.last().copied().unwrap_or(span);
                self.finish_collection(aid, Span::new(start.start, span.end), node);
            }
            Event::MappingStart(aid, tag) => {
                self.starts.push(span);
                self.keys.push(PendingKey::AwaitingKey);
                self.stack.push((
                    wrap_tag(TreeValue::Map(TreeMap::new()), tag.as_ref(), span),
                    aid,
                ));
            }
            Event::MappingEnd => {
                self.keys.pop();
                let (node, aid) = self.stack.pop().expect("mapping start pushed a frame");
                let start = self.starts.last().copied().unwrap_or(span);
                self.finish_collection(aid, Span::new(start.start, span.end), node);
            }
            Event::Scalar(value, style, aid, tag) => {
                let is_key_position = matches!(
                    self.stack.last(),
                    Some((TreeValue::Map(_), _))
                ) && matches!(self.keys.last(), Some(PendingKey::AwaitingKey));

                if is_key_position && style == TScalarStyle::Plain && value == "<<" {
                    let node = TreeValue::Placeholder(Box::new(PlaceholderNode::new(
                        PlaceholderKind::MergeKeyToken,
                        TreeValue::Null,
                        source_span(span),
                    )));
                    self.insert_node(0, node, span);
                    return;
                }

                let base = resolve_scalar(&value, style, tag.as_ref());
                let node = wrap_tag(base, tag.as_ref(), span);
                self.insert_node(aid, node, span);
            }
            Event::Alias(id) => {
                let node = self.anchors.get(&id).cloned().unwrap_or(TreeValue::Null);
                self.insert_node(0, node, span);
            }
        }
    }
}

fn source_span(span: Span) -> SourceSpan {
    SourceSpan::new(span.start.line(), span.start.col() + 1)
}

/// If `tag` names one of the closed custom tags, wraps `base` in the
/// corresponding `PlaceholderNode`; otherwise returns `base` unchanged.
fn wrap_tag(base: TreeValue, tag: Option<&Tag>, span: Span) -> TreeValue {
    let Some(tag) = tag else { return base };
    if tag.handle != "!" {
        return base;
    }

    let span = source_span(span);
    let suffix = tag.suffix.as_str();

    if suffix == "sub" {
        return TreeValue::Placeholder(Box::new(PlaceholderNode::new(
            PlaceholderKind::Sub,
            base,
            span,
        )));
    }
    if let Some(rest) = suffix.strip_prefix("sub:pattern=") {
        if let Some((open, close)) = rest.split_once("..") {
            let pattern = SubstitutionPattern {
                open: urlenc::decode(open),
                close: urlenc::decode(close),
            };
            return TreeValue::Placeholder(Box::new(
                PlaceholderNode::new(PlaceholderKind::Sub, base, span).with_pattern(pattern),
            ));
        }
    }

    let kind = match suffix {
        "nosub" => PlaceholderKind::NoSub,
        "if" => PlaceholderKind::If,
        "include" => PlaceholderKind::Include,
        "insert" => PlaceholderKind::Insert,
        "remove" => PlaceholderKind::Remove,
        "replace" => PlaceholderKind::Replace,
        _ => return base,
    };
    TreeValue::Placeholder(Box::new(PlaceholderNode::new(kind, base, span)))
}

/// Core-schema-ish scalar resolution with the spec's boolean override:
/// only `true`/`false` (any casing) become `Bool`; `yes/no/on/off` stay
/// `Str` even when the scanner's own implicit resolver tagged them `bool`.
fn resolve_scalar(value: &str, style: TScalarStyle, tag: Option<&Tag>) -> TreeValue {
    if style != TScalarStyle::Plain {
        return TreeValue::Str(value.to_string());
    }

    if let Some(tag) = tag {
        if tag.handle == "tag:yaml.org,2002:" {
            return match tag.suffix.as_str() {
                "bool" => resolve_bool_or_str(value),
                "int" => value
                    .parse::<i64>()
                    .map(TreeValue::Int)
                    .unwrap_or_else(|_| TreeValue::Str(value.to_string())),
                "float" => value
                    .parse::<f64>()
                    .map(TreeValue::Float)
                    .unwrap_or_else(|_| TreeValue::Str(value.to_string())),
                "null" => TreeValue::Null,
                _ => TreeValue::Str(value.to_string()),
            };
        }
        if tag.handle == "!" {
            // Custom tag: leave the bare scalar as a string; `wrap_tag`
            // attaches the Placeholder around it.
            return TreeValue::Str(value.to_string());
        }
    }

    resolve_plain_scalar(value)
}

fn resolve_bool_or_str(value: &str) -> TreeValue {
    match value.to_ascii_lowercase().as_str() {
        "true" => TreeValue::Bool(true),
        "false" => TreeValue::Bool(false),
        _ => TreeValue::Str(value.to_string()),
    }
}

fn resolve_plain_scalar(value: &str) -> TreeValue {
    match value.to_ascii_lowercase().as_str() {
        "true" => return TreeValue::Bool(true),
        "false" => return TreeValue::Bool(false),
        "" | "~" | "null" => return TreeValue::Null,
        _ => {}
    }
    if let Ok(i) = value.parse::<i64>() {
        return TreeValue::Int(i);
    }
    if looks_numeric(value) {
        if let Ok(f) = value.parse::<f64>() {
            return TreeValue::Float(f);
        }
    }
    TreeValue::Str(value.to_string())
}

fn looks_numeric(value: &str) -> bool {
    let trimmed = value.trim_start_matches(['+', '-']);
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || c == '+' || c == '-')
        && trimmed.chars().any(|c| c.is_ascii_digit())
}
