//! The in-memory value tree produced by the loader and rewritten by the
//! resolution pipeline.

mod map;

pub use map::TreeMap;

use ordered_float::OrderedFloat;
use std::fmt;

/// A single YAML node after parsing, before or after placeholder resolution.
#[derive(Debug, Clone)]
pub enum TreeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<TreeValue>),
    Map(TreeMap),
    Placeholder(Box<PlaceholderNode>),
}

impl TreeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TreeValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TreeValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&TreeMap> {
        match self {
            TreeValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut TreeMap> {
        match self {
            TreeValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[TreeValue]> {
        match self {
            TreeValue::Seq(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_placeholder(&self) -> Option<&PlaceholderNode> {
        match self {
            TreeValue::Placeholder(p) => Some(p),
            _ => None,
        }
    }

    /// Truthiness rule used by `!if` conditions and implicit string coercions.
    pub fn is_truthy(&self) -> bool {
        match self {
            TreeValue::Null => false,
            TreeValue::Bool(b) => *b,
            TreeValue::Int(i) => *i != 0,
            TreeValue::Float(f) => *f != 0.0,
            TreeValue::Str(s) => !s.trim().is_empty() && s.trim() != "false",
            TreeValue::Seq(s) => !s.is_empty(),
            TreeValue::Map(m) => !m.is_empty(),
            TreeValue::Placeholder(_) => true,
        }
    }

    /// Standard stringification used when interpolation coerces a value into
    /// a surrounding string template.
    pub fn to_display_string(&self) -> String {
        match self {
            TreeValue::Null => String::new(),
            TreeValue::Bool(b) => b.to_string(),
            TreeValue::Int(i) => i.to_string(),
            TreeValue::Float(f) => f.to_string(),
            TreeValue::Str(s) => s.clone(),
            TreeValue::Seq(_) | TreeValue::Map(_) => format!("{self}"),
            TreeValue::Placeholder(_) => String::new(),
        }
    }

    /// Converts the tree into a `serde_json::Value`, used by the CLI's JSON
    /// output mode and by tests. Keys that are not strings are stringified.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            TreeValue::Null => serde_json::Value::Null,
            TreeValue::Bool(b) => serde_json::Value::Bool(*b),
            TreeValue::Int(i) => serde_json::Value::from(*i),
            TreeValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            TreeValue::Str(s) => serde_json::Value::String(s.clone()),
            TreeValue::Seq(items) => {
                serde_json::Value::Array(items.iter().map(TreeValue::to_json).collect())
            }
            TreeValue::Map(map) => {
                let mut obj = serde_json::Map::new();
                for (k, v) in map.iter() {
                    obj.insert(k.to_display_string(), v.to_json());
                }
                serde_json::Value::Object(obj)
            }
            TreeValue::Placeholder(p) => p.payload.to_json(),
        }
    }
}

impl fmt::Display for TreeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeValue::Null => write!(f, "null"),
            TreeValue::Bool(b) => write!(f, "{b}"),
            TreeValue::Int(i) => write!(f, "{i}"),
            TreeValue::Float(v) => write!(f, "{v}"),
            TreeValue::Str(s) => write!(f, "{s}"),
            TreeValue::Seq(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            TreeValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            TreeValue::Placeholder(p) => write!(f, "{:?}", p.kind),
        }
    }
}

impl PartialEq for TreeValue {
    fn eq(&self, other: &Self) -> bool {
        use TreeValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => OrderedFloat(*a) == OrderedFloat(*b),
            (Str(a), Str(b)) => a == b,
            (Seq(a), Seq(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Placeholder(_), Placeholder(_)) => false,
            _ => false,
        }
    }
}
impl Eq for TreeValue {}

impl std::hash::Hash for TreeValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            TreeValue::Null => {}
            TreeValue::Bool(b) => b.hash(state),
            TreeValue::Int(i) => i.hash(state),
            TreeValue::Float(f) => OrderedFloat(*f).hash(state),
            TreeValue::Str(s) => s.hash(state),
            TreeValue::Seq(items) => items.hash(state),
            TreeValue::Map(map) => {
                for (k, v) in map.iter() {
                    k.hash(state);
                    v.hash(state);
                }
            }
            TreeValue::Placeholder(p) => (p.kind as u8).hash(state),
        }
    }
}

/// A source location in the original file, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceSpan {
    pub line: usize,
    pub column: usize,
}

impl SourceSpan {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Custom delimiter pair carried by `!sub:pattern=<open>..<close>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionPattern {
    pub open: String,
    pub close: String,
}

impl Default for SubstitutionPattern {
    fn default() -> Self {
        Self {
            open: "${".to_string(),
            close: "}".to_string(),
        }
    }
}

/// Which placeholder processor a tagged subtree should be dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    Sub,
    NoSub,
    If,
    Include,
    Insert,
    Remove,
    Replace,
    MergeKeyToken,
}

impl fmt::Display for PlaceholderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaceholderKind::Sub => "!sub",
            PlaceholderKind::NoSub => "!nosub",
            PlaceholderKind::If => "!if",
            PlaceholderKind::Include => "!include",
            PlaceholderKind::Insert => "!insert",
            PlaceholderKind::Remove => "!remove",
            PlaceholderKind::Replace => "!replace",
            PlaceholderKind::MergeKeyToken => "<<",
        };
        write!(f, "{name}")
    }
}

/// A subtree carrying a recognized custom tag, awaiting rewriting.
#[derive(Debug, Clone)]
pub struct PlaceholderNode {
    pub kind: PlaceholderKind,
    pub payload: TreeValue,
    pub pattern: Option<SubstitutionPattern>,
    pub span: SourceSpan,
}

impl PlaceholderNode {
    pub fn new(kind: PlaceholderKind, payload: TreeValue, span: SourceSpan) -> Self {
        Self {
            kind,
            payload,
            pattern: None,
            span,
        }
    }

    pub fn with_pattern(mut self, pattern: SubstitutionPattern) -> Self {
        self.pattern = Some(pattern);
        self
    }
}

/// Sentinel returned by a placeholder processor to mean "delete my parent
/// entry" rather than "substitute this value". The recursive walker
/// interprets it contextually (map key, sequence element, or document root).
pub struct Remove;

/// The outcome of running a placeholder through its processor.
pub enum Resolution {
    Value(TreeValue),
    Remove,
}

impl From<TreeValue> for Resolution {
    fn from(value: TreeValue) -> Self {
        Resolution::Value(value)
    }
}

impl Resolution {
    /// Collapses `Remove` to `Null`, for call sites (e.g. an `!if` condition)
    /// that need a plain value rather than a removal instruction.
    pub fn into_value(self) -> TreeValue {
        match self {
            Resolution::Value(v) => v,
            Resolution::Remove => TreeValue::Null,
        }
    }
}
