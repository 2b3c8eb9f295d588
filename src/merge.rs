//! Resolves YAML merge keys (`<<`) everywhere in the tree, before either
//! recursive pass runs (spec.md §4.6). Because `TreeMap` stores each `<<`
//! occurrence as its own [`crate::tree::PlaceholderKind::MergeKeyToken`] key
//! (rather than colliding on a shared `"<<"` string key), multiple merge
//! entries in one mapping survive as an ordered list to drain here: earlier
//! entries win over later ones, and any already-present explicit key always
//! wins over anything merged in.

use std::path::Path;

use crate::context::PreprocessorContext;
use crate::error::LoadError;
use crate::recursive::{PatternScope, Pass, Walker};
use crate::tree::{PlaceholderKind, PlaceholderNode, TreeMap, TreeValue};

pub fn resolve(
    ctx: &mut PreprocessorContext,
    observer: &mut dyn FnMut(&Path),
    value: TreeValue,
) -> Result<TreeValue, LoadError> {
    match value {
        TreeValue::Map(map) => resolve_map(ctx, observer, map),
        TreeValue::Seq(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(resolve(ctx, observer, item)?);
            }
            Ok(TreeValue::Seq(out))
        }
        TreeValue::Placeholder(node) => {
            let PlaceholderNode {
                kind,
                payload,
                pattern,
                span,
            } = *node;
            let resolved_payload = resolve(ctx, observer, payload)?;
            Ok(TreeValue::Placeholder(Box::new(PlaceholderNode {
                kind,
                payload: resolved_payload,
                pattern,
                span,
            })))
        }
        other => Ok(other),
    }
}

fn resolve_map(
    ctx: &mut PreprocessorContext,
    observer: &mut dyn FnMut(&Path),
    map: TreeMap,
) -> Result<TreeValue, LoadError> {
    let mut merge_raw = Vec::new();
    let mut result = TreeMap::new();

    for (k, v) in map.into_iter() {
        let is_merge_key = matches!(&k, TreeValue::Placeholder(p) if p.kind == PlaceholderKind::MergeKeyToken);
        if is_merge_key {
            merge_raw.push(v);
        } else {
            result.insert(k, resolve(ctx, observer, v)?);
        }
    }

    for raw in merge_raw {
        let resolved = resolve_merge_source(ctx, observer, raw)?;
        apply_merge_source(ctx, &mut result, resolved);
    }

    Ok(TreeValue::Map(result))
}

fn resolve_merge_source(
    ctx: &mut PreprocessorContext,
    observer: &mut dyn FnMut(&Path),
    raw: TreeValue,
) -> Result<TreeValue, LoadError> {
    let walked = if matches!(raw, TreeValue::Placeholder(_)) {
        Walker::new(ctx, observer, Pass::SubIfIncludeInsert).walk(raw, &mut vec![PatternScope::Disabled])?
            .into_value()
    } else {
        raw
    };
    resolve(ctx, observer, walked)
}

fn apply_merge_source(ctx: &mut PreprocessorContext, result: &mut TreeMap, resolved: TreeValue) {
    match resolved {
        TreeValue::Null => {}
        TreeValue::Map(merged) => merge_one(result, merged),
        TreeValue::Seq(items) => {
            for item in items {
                match item {
                    TreeValue::Map(merged) => merge_one(result, merged),
                    _ => ctx
                        .log
                        .borrow_mut()
                        .warn("merge key sequence entry is not a mapping, skipped".to_string()),
                }
            }
        }
        _ => ctx
            .log
            .borrow_mut()
            .warn("merge key value is not a mapping".to_string()),
    }
}

fn merge_one(result: &mut TreeMap, merged: TreeMap) {
    for (k, v) in merged.into_iter() {
        result.insert_if_absent(k, v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ctx() -> PreprocessorContext {
        PreprocessorContext::root(PathBuf::from("/conf/demo.yml"), "demo.yml".to_string(), 10)
    }

    fn str_key(s: &str) -> TreeValue {
        TreeValue::Str(s.to_string())
    }

    #[test]
    fn explicit_key_wins_over_merge() {
        let mut base = TreeMap::new();
        base.insert(str_key("a"), TreeValue::Int(1));
        base.insert(str_key("b"), TreeValue::Int(2));

        let mut doc = TreeMap::new();
        doc.insert(
            TreeValue::Placeholder(Box::new(PlaceholderNode::new(
                PlaceholderKind::MergeKeyToken,
                TreeValue::Map(base),
                Default::default(),
            ))),
            TreeValue::Null,
        );
        doc.insert(str_key("a"), TreeValue::Int(99));

        let mut ctx = ctx();
        let mut observer = |_: &Path| {};
        let out = resolve(&mut ctx, &mut observer, TreeValue::Map(doc)).unwrap();
        let map = out.as_map().unwrap();
        assert_eq!(map.get_str("a"), Some(&TreeValue::Int(99)));
        assert_eq!(map.get_str("b"), Some(&TreeValue::Int(2)));
    }

    #[test]
    fn multiple_merge_keys_first_one_wins() {
        let mut first = TreeMap::new();
        first.insert(str_key("x"), TreeValue::Int(1));
        let mut second = TreeMap::new();
        second.insert(str_key("x"), TreeValue::Int(2));
        second.insert(str_key("y"), TreeValue::Int(3));

        let mut doc = TreeMap::new();
        doc.insert(
            TreeValue::Placeholder(Box::new(PlaceholderNode::new(
                PlaceholderKind::MergeKeyToken,
                TreeValue::Map(first),
                Default::default(),
            ))),
            TreeValue::Null,
        );
        doc.insert(
            TreeValue::Placeholder(Box::new(PlaceholderNode::new(
                PlaceholderKind::MergeKeyToken,
                TreeValue::Map(second),
                Default::default(),
            ))),
            TreeValue::Null,
        );

        let mut ctx = ctx();
        let mut observer = |_: &Path| {};
        let out = resolve(&mut ctx, &mut observer, TreeValue::Map(doc)).unwrap();
        let map = out.as_map().unwrap();
        assert_eq!(map.get_str("x"), Some(&TreeValue::Int(1)));
        assert_eq!(map.get_str("y"), Some(&TreeValue::Int(3)));
    }

    #[test]
    fn non_mapping_merge_value_warns() {
        let mut doc = TreeMap::new();
        doc.insert(
            TreeValue::Placeholder(Box::new(PlaceholderNode::new(
                PlaceholderKind::MergeKeyToken,
                TreeValue::Int(5),
                Default::default(),
            ))),
            TreeValue::Null,
        );

        let mut ctx = ctx();
        let mut observer = |_: &Path| {};
        let out = resolve(&mut ctx, &mut observer, TreeValue::Map(doc)).unwrap();
        assert!(out.as_map().unwrap().is_empty());
        assert_eq!(ctx.log.borrow().total_warning_count(), 1);
    }
}
