//! PackageProcessor: merges a top-level `packages:` map into the main
//! document via deep-merge-with-directives (spec.md §4.9, §4.8 step 11).
//! Runs after the main document's own pass 1 and merge-key resolution, but
//! before pass 2 -- `!remove`/`!replace` tags are still intact at this
//! point, which is exactly what lets this processor treat them as merge
//! directives rather than ordinary structural tags.

use std::path::Path;

use crate::context::PreprocessorContext;
use crate::error::LoadError;
use crate::recursive::{Pass, PatternScope, Walker};
use crate::tree::{PlaceholderKind, PlaceholderNode, TreeMap, TreeValue};

pub fn merge_packages(
    ctx: &mut PreprocessorContext,
    observer: &mut dyn FnMut(&Path),
    packages_raw: TreeMap,
    mut main: TreeMap,
) -> Result<TreeMap, LoadError> {
    for (id_key, subtree) in packages_raw.into_iter() {
        let Some(package_id) = id_key.as_str().map(str::to_string) else {
            continue;
        };
        let resolved = resolve_package_subtree(ctx, observer, subtree, &package_id)?;
        match resolved {
            TreeValue::Map(pkg_map) => {
                main = merge_map(main, pkg_map);
            }
            TreeValue::Null => {}
            _ => ctx
                .log
                .borrow_mut()
                .warn(format!("package '{package_id}' did not resolve to a mapping")),
        }
    }
    Ok(main)
}

fn resolve_package_subtree(
    ctx: &mut PreprocessorContext,
    observer: &mut dyn FnMut(&Path),
    subtree: TreeValue,
    package_id: &str,
) -> Result<TreeValue, LoadError> {
    let injected = inject_package_id(subtree, package_id);
    let resolved = Walker::new(ctx, observer, Pass::SubIfIncludeInsert)
        .walk(injected, &mut vec![PatternScope::Disabled])?
        .into_value();
    crate::merge::resolve(ctx, observer, resolved)
}

/// Adds `vars.package_id = <id>` (or the scalar-form `&package_id=<id>`
/// query parameter) to an `!include`/`!insert` reference, unless the user
/// already supplied one explicitly.
fn inject_package_id(subtree: TreeValue, package_id: &str) -> TreeValue {
    let TreeValue::Placeholder(node) = subtree else {
        return subtree;
    };
    if !matches!(node.kind, PlaceholderKind::Include | PlaceholderKind::Insert) {
        return TreeValue::Placeholder(node);
    }
    let PlaceholderNode { kind, payload, pattern, span } = *node;
    let payload = match payload {
        TreeValue::Str(reference) => {
            let (base, pairs) = crate::urlenc::split_query(&reference);
            if pairs.iter().any(|(k, _)| k == "package_id") {
                TreeValue::Str(reference)
            } else {
                let mut parts: Vec<String> =
                    pairs.into_iter().map(|(k, v)| format!("{k}={v}")).collect();
                parts.push(format!("package_id={package_id}"));
                TreeValue::Str(format!("{base}?{}", parts.join("&")))
            }
        }
        TreeValue::Map(mut map) => {
            let mut vars = match map.remove_str("vars") {
                Some(TreeValue::Map(existing)) => existing,
                _ => TreeMap::new(),
            };
            vars.insert_if_absent(
                TreeValue::Str("package_id".to_string()),
                TreeValue::Str(package_id.to_string()),
            );
            map.insert(TreeValue::Str("vars".to_string()), TreeValue::Map(vars));
            TreeValue::Map(map)
        }
        other => other,
    };
    TreeValue::Placeholder(Box::new(PlaceholderNode { kind, payload, pattern, span }))
}

/// Merges `incoming` (a resolved package body) into `accum` (the main
/// document, possibly already carrying earlier packages): scalars keep
/// whatever is already accumulated, maps recurse, sequences concatenate
/// package-then-accumulated. A `!replace`/`!remove` tag already present in
/// `accum` at a key is consumed here as a merge directive rather than left
/// for pass 2.
fn merge_map(mut accum: TreeMap, incoming: TreeMap) -> TreeMap {
    for (key, incoming_value) in incoming.into_iter() {
        match accum.get(&key).cloned() {
            None => {
                accum.insert(key, incoming_value);
            }
            Some(TreeValue::Placeholder(node)) if node.kind == PlaceholderKind::Replace => {
                accum.insert(key, node.payload);
            }
            Some(TreeValue::Placeholder(node)) if node.kind == PlaceholderKind::Remove => {
                accum.remove(&key);
            }
            Some(existing) => {
                let merged = deep_merge_value(existing, incoming_value);
                accum.insert(key, merged);
            }
        }
    }
    accum
}

fn deep_merge_value(existing: TreeValue, incoming: TreeValue) -> TreeValue {
    match (existing, incoming) {
        (TreeValue::Map(existing_map), TreeValue::Map(incoming_map)) => {
            TreeValue::Map(merge_map(existing_map, incoming_map))
        }
        (TreeValue::Seq(existing_seq), TreeValue::Seq(incoming_seq)) => {
            let mut combined = incoming_seq;
            combined.extend(existing_seq);
            TreeValue::Seq(combined)
        }
        (existing, _incoming) => existing,
    }
}
