//! Per-file state threaded through one `load()` call and its recursive
//! includes: [`PreprocessorContext`], the shared [`LogSession`], and the
//! small ordered-by-name maps used for `variables`/`templates`.

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;

use crate::cache::IncludeCache;
use crate::error::LoadError;
use crate::tree::{TreeMap, TreeValue};

/// A buffered, deduplicating warning sink. Repeated identical warnings are
/// counted, not repeated; `tracing::warn!` is still emitted on every call so
/// operational logs see every occurrence even when `LogSession` dedupes the
/// host-facing summary.
#[derive(Debug, Default)]
pub struct LogSession {
    order: Vec<String>,
    counts: Vec<(String, usize)>,
}

impl LogSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(message = %message, "preprocessor warning");
        match self.counts.iter_mut().find(|(m, _)| m == &message) {
            Some((_, n)) => *n += 1,
            None => {
                self.order.push(message.clone());
                self.counts.push((message, 1));
            }
        }
    }

    pub fn tracked_warnings(&self) -> &[String] {
        &self.order
    }

    pub fn total_warning_count(&self) -> usize {
        self.counts.iter().map(|(_, n)| *n).sum()
    }

    pub fn unique_warning_count(&self) -> usize {
        self.order.len()
    }

    /// "Loading YAML model <relative_path>: Preprocessing completed with N
    /// warning(s) (M unique issue(s))." -- omitted entirely when there were
    /// no warnings.
    pub fn summary_line(&self, relative_path: &str) -> Option<String> {
        if self.order.is_empty() {
            return None;
        }
        Some(format!(
            "Loading YAML model {relative_path}: Preprocessing completed with {} warning(s) ({} unique issue(s)).",
            self.total_warning_count(),
            self.unique_warning_count(),
        ))
    }
}

/// An insertion-ordered `String -> TreeValue` map, used for both the
/// `variables` and `templates` top-level blocks. Plain `String` keys (not
/// `TreeValue`) because both blocks are always keyed by plain identifiers.
#[derive(Debug, Clone, Default)]
pub struct NamedMap {
    entries: Vec<(String, TreeValue)>,
}

impl NamedMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&TreeValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == name)
    }

    /// Inserts or overwrites, preserving first-insertion position.
    pub fn insert(&mut self, name: impl Into<String>, value: TreeValue) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<TreeValue> {
        let idx = self.entries.iter().position(|(k, _)| k == name)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TreeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders as a `TreeValue::Map`, used to evaluate the bare `VARS`
    /// identifier in expressions.
    pub fn as_tree_map(&self) -> TreeMap {
        self.entries
            .iter()
            .map(|(k, v)| (TreeValue::Str(k.clone()), v.clone()))
            .collect()
    }

    /// Overlays `other` on top of `self`, `other` winning on shared keys;
    /// used to merge `!include`/`!insert` `vars:` onto the inherited scope.
    pub fn overlaid_with(&self, other: &NamedMap) -> NamedMap {
        let mut merged = self.clone();
        for (k, v) in other.iter() {
            merged.insert(k, v.clone());
        }
        merged
    }
}

/// Names that are always computed from the current file and may never be
/// overridden by user `variables:` blocks or `vars:` overlays.
pub const PREDEFINED_VARIABLE_NAMES: &[&str] = &[
    "OPENHAB_CONF",
    "OPENHAB_USERDATA",
    "__FILE__",
    "__FILE_NAME__",
    "__FILE_EXT__",
    "__DIRECTORY__",
    "__DIR__",
];

/// Per-file state created at file entry and discarded on return.
pub struct PreprocessorContext {
    pub absolute_path: PathBuf,
    pub relative_path: String,
    pub variables: NamedMap,
    pub templates: NamedMap,
    pub include_stack: Vec<PathBuf>,
    pub max_include_depth: usize,
    pub log: Rc<RefCell<LogSession>>,
    pub cache: Rc<RefCell<IncludeCache>>,
    /// Canonical absolute paths already handed to the host's `include_observer`
    /// -- shared across the whole `load()` call so a diamond include graph
    /// notifies the host once per distinct file (spec.md §6).
    pub observed_includes: Rc<RefCell<HashSet<PathBuf>>>,
}

impl PreprocessorContext {
    pub fn root(
        absolute_path: PathBuf,
        relative_path: String,
        max_include_depth: usize,
    ) -> Self {
        Self {
            absolute_path,
            relative_path,
            variables: NamedMap::new(),
            templates: NamedMap::new(),
            include_stack: Vec::new(),
            max_include_depth,
            log: Rc::new(RefCell::new(LogSession::new())),
            cache: Rc::new(RefCell::new(IncludeCache::new())),
            observed_includes: Rc::new(RefCell::new(HashSet::new())),
        }
    }

    /// Builds the child context for a `!include`/`!insert` target, enforcing
    /// the circular-inclusion and max-depth invariants from spec.md §3/§4.4.
    pub fn enter_include(
        &self,
        target_absolute: PathBuf,
        target_relative: String,
        overlay_vars: NamedMap,
    ) -> Result<PreprocessorContext, LoadError> {
        if self.include_stack.contains(&target_absolute) || self.absolute_path == target_absolute
        {
            let mut chain: Vec<String> = self
                .include_stack
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            chain.push(self.absolute_path.display().to_string());
            chain.push(target_absolute.display().to_string());
            return Err(LoadError::CircularInclusion {
                chain: chain.join(" -> "),
            });
        }
        if self.include_stack.len() + 1 > self.max_include_depth {
            return Err(LoadError::MaxIncludeDepthExceeded {
                max_depth: self.max_include_depth,
                file: target_relative,
            });
        }

        let mut include_stack = self.include_stack.clone();
        include_stack.push(self.absolute_path.clone());

        Ok(PreprocessorContext {
            absolute_path: target_absolute,
            relative_path: target_relative,
            variables: self.variables.overlaid_with(&overlay_vars),
            templates: NamedMap::new(),
            include_stack,
            max_include_depth: self.max_include_depth,
            log: Rc::clone(&self.log),
            cache: Rc::clone(&self.cache),
            observed_includes: Rc::clone(&self.observed_includes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_session_deduplicates() {
        let mut log = LogSession::new();
        log.warn("No such file");
        log.warn("No such file");
        log.warn("template not found");
        assert_eq!(log.unique_warning_count(), 2);
        assert_eq!(log.total_warning_count(), 3);
        assert!(log
            .summary_line("things/demo.yml")
            .unwrap()
            .contains("3 warning(s) (2 unique issue(s))"));
    }

    #[test]
    fn log_session_empty_has_no_summary() {
        let log = LogSession::new();
        assert!(log.summary_line("demo.yml").is_none());
    }

    #[test]
    fn named_map_preserves_insertion_order_on_overwrite() {
        let mut map = NamedMap::new();
        map.insert("a", TreeValue::Int(1));
        map.insert("b", TreeValue::Int(2));
        map.insert("a", TreeValue::Int(3));
        let names: Vec<_> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(map.get("a"), Some(&TreeValue::Int(3)));
    }

    #[test]
    fn enter_include_detects_cycle() {
        let ctx = PreprocessorContext::root(
            PathBuf::from("/conf/a.yml"),
            "a.yml".to_string(),
            10,
        );
        let err = ctx
            .enter_include(
                PathBuf::from("/conf/a.yml"),
                "a.yml".to_string(),
                NamedMap::new(),
            )
            .unwrap_err();
        assert!(matches!(err, LoadError::CircularInclusion { .. }));
    }

    #[test]
    fn enter_include_enforces_max_depth() {
        let mut ctx = PreprocessorContext::root(
            PathBuf::from("/conf/a0.yml"),
            "a0.yml".to_string(),
            2,
        );
        for i in 1..=2 {
            ctx = ctx
                .enter_include(
                    PathBuf::from(format!("/conf/a{i}.yml")),
                    format!("a{i}.yml"),
                    NamedMap::new(),
                )
                .unwrap();
        }
        let err = ctx
            .enter_include(
                PathBuf::from("/conf/a3.yml"),
                "a3.yml".to_string(),
                NamedMap::new(),
            )
            .unwrap_err();
        assert!(matches!(err, LoadError::MaxIncludeDepthExceeded { .. }));
    }
}
