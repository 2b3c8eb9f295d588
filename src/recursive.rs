//! The depth-first rewrite engine that drives every placeholder processor
//! over a loaded tree (spec.md §4.7, §4.8 steps 9-10).
//!
//! Two passes run over the whole document: the first dispatches
//! `!sub`/`!nosub`/`!if`/`!include`/`!insert`, the second dispatches
//! `!remove`/`!replace`. A placeholder kind the current pass does not own is
//! left untouched (still wrapped) for the other pass to find later.
//!
//! Substitution scope is carried positionally rather than stored on nodes:
//! `!sub`/`!nosub` push a new entry onto `scopes` for the duration of their
//! payload's walk, `!if`/`!replace` are transparent (no push), and anything
//! reached through a fresh `pipeline::load()` call (an `!include`) or a
//! freshly-interpolated template body (an `!insert`) starts its own stack
//! from scratch -- that is how the "opaque boundary" rules in spec.md §4.7
//! fall out of the walker without extra bookkeeping.

use std::path::Path;

use crate::context::PreprocessorContext;
use crate::error::LoadError;
use crate::processors;
use crate::tree::{PlaceholderKind, PlaceholderNode, Resolution, SubstitutionPattern, TreeMap, TreeValue};

#[derive(Debug, Clone)]
pub enum PatternScope {
    Active(SubstitutionPattern),
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    SubIfIncludeInsert,
    RemoveReplace,
}

impl Pass {
    fn handles(self, kind: PlaceholderKind) -> bool {
        use PlaceholderKind::*;
        match self {
            Pass::SubIfIncludeInsert => matches!(kind, Sub | NoSub | If | Include | Insert),
            Pass::RemoveReplace => matches!(kind, Remove | Replace),
        }
    }
}

/// Carries the mutable state a placeholder processor needs: the owning
/// file's context and a callback notified of every file actually opened
/// through `!include` (used by the CLI's `--verbose` file list and by tests).
pub struct Walker<'a> {
    pub ctx: &'a mut PreprocessorContext,
    pub observer: &'a mut dyn FnMut(&Path),
    pub pass: Pass,
}

impl<'a> Walker<'a> {
    pub fn new(ctx: &'a mut PreprocessorContext, observer: &'a mut dyn FnMut(&Path), pass: Pass) -> Self {
        Self { ctx, observer, pass }
    }

    /// Runs one full pass over `value`, starting from the document's
    /// top-level scope (no active `!sub` pattern).
    pub fn run(&mut self, value: TreeValue) -> Result<TreeValue, LoadError> {
        let mut scopes = vec![PatternScope::Disabled];
        Ok(self.walk(value, &mut scopes)?.into_value())
    }

    pub fn walk(&mut self, value: TreeValue, scopes: &mut Vec<PatternScope>) -> Result<Resolution, LoadError> {
        match value {
            TreeValue::Map(map) => {
                let mut result = TreeMap::new();
                for (k, v) in map.into_iter() {
                    match self.walk(v, scopes)? {
                        Resolution::Value(v) => {
                            result.insert(k, v);
                        }
                        Resolution::Remove => {}
                    }
                }
                Ok(Resolution::Value(TreeValue::Map(result)))
            }
            TreeValue::Seq(items) => {
                let mut result = Vec::with_capacity(items.len());
                for item in items {
                    if let Resolution::Value(v) = self.walk(item, scopes)? {
                        result.push(v);
                    }
                }
                Ok(Resolution::Value(TreeValue::Seq(result)))
            }
            TreeValue::Str(s) => match scopes.last() {
                Some(PatternScope::Active(pattern)) => {
                    let pattern = pattern.clone();
                    let mut log = self.ctx.log.borrow_mut();
                    Ok(Resolution::Value(crate::interpolate::interpolate(
                        &s,
                        &pattern,
                        &self.ctx.variables,
                        &mut log,
                    )))
                }
                _ => Ok(Resolution::Value(TreeValue::Str(s))),
            },
            TreeValue::Placeholder(node) => self.dispatch(*node, scopes),
            other => Ok(Resolution::Value(other)),
        }
    }

    fn dispatch(&mut self, node: PlaceholderNode, scopes: &mut Vec<PatternScope>) -> Result<Resolution, LoadError> {
        if !self.pass.handles(node.kind) {
            return Ok(Resolution::Value(TreeValue::Placeholder(Box::new(node))));
        }
        match node.kind {
            PlaceholderKind::Sub => processors::sub::process(self, node, scopes),
            PlaceholderKind::NoSub => processors::nosub::process(self, node, scopes),
            PlaceholderKind::If => processors::if_::process(self, node, scopes),
            PlaceholderKind::Include => processors::include::process(self, node, scopes),
            PlaceholderKind::Insert => processors::insert::process(self, node, scopes),
            PlaceholderKind::Remove => processors::remove::process(self, node),
            PlaceholderKind::Replace => processors::replace::process(self, node, scopes),
            PlaceholderKind::MergeKeyToken => Ok(Resolution::Value(TreeValue::Placeholder(Box::new(node)))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::SourceSpan;
    use std::path::PathBuf;

    fn ctx() -> PreprocessorContext {
        PreprocessorContext::root(PathBuf::from("/conf/demo.yml"), "demo.yml".to_string(), 10)
    }

    #[test]
    fn sub_scope_interpolates_only_inside_its_payload() {
        let mut ctx = ctx();
        ctx.variables.insert("name", TreeValue::Str("Kitchen".to_string()));
        let mut observer = |_: &Path| {};

        let tagged = TreeValue::Placeholder(Box::new(PlaceholderNode::new(
            PlaceholderKind::Sub,
            TreeValue::Str("Light ${name}".to_string()),
            SourceSpan::default(),
        )));
        let out = Walker::new(&mut ctx, &mut observer, Pass::SubIfIncludeInsert)
            .run(tagged)
            .unwrap();
        assert_eq!(out, TreeValue::Str("Light Kitchen".to_string()));
    }

    #[test]
    fn untagged_string_is_left_literal() {
        let mut ctx = ctx();
        ctx.variables.insert("name", TreeValue::Str("Kitchen".to_string()));
        let mut observer = |_: &Path| {};
        let out = Walker::new(&mut ctx, &mut observer, Pass::SubIfIncludeInsert)
            .run(TreeValue::Str("Light ${name}".to_string()))
            .unwrap();
        assert_eq!(out, TreeValue::Str("Light ${name}".to_string()));
    }

    #[test]
    fn if_without_else_removes_the_entry() {
        let mut ctx = ctx();
        let mut observer = |_: &Path| {};
        let mut branch = TreeMap::new();
        branch.insert(TreeValue::Str("if".to_string()), TreeValue::Bool(false));
        branch.insert(TreeValue::Str("then".to_string()), TreeValue::Int(1));
        let tagged = TreeValue::Placeholder(Box::new(PlaceholderNode::new(
            PlaceholderKind::If,
            TreeValue::Map(branch),
            SourceSpan::default(),
        )));
        let out = Walker::new(&mut ctx, &mut observer, Pass::SubIfIncludeInsert)
            .run(tagged)
            .unwrap();
        assert_eq!(out, TreeValue::Map(TreeMap::new()));
    }

    #[test]
    fn remove_pass_does_not_touch_sub_nodes_and_vice_versa() {
        let mut ctx = ctx();
        let mut observer = |_: &Path| {};
        let node = TreeValue::Placeholder(Box::new(PlaceholderNode::new(
            PlaceholderKind::Remove,
            TreeValue::Null,
            SourceSpan::default(),
        )));
        // Pass 1 must not consume a `!remove` node.
        let after_pass1 = Walker::new(&mut ctx, &mut observer, Pass::SubIfIncludeInsert)
            .walk(node, &mut vec![PatternScope::Disabled])
            .unwrap()
            .into_value();
        assert!(matches!(after_pass1, TreeValue::Placeholder(_)));
    }

}
