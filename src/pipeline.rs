//! Orchestrates the full load pipeline (spec.md §4.8). `load` is the public
//! entry point for a top-level file; `load_with_context` is shared between
//! that and every recursive `!include`, which is how steps 3-15 end up
//! identical for both call sites.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::context::{LogSession, PreprocessorContext};
use crate::error::LoadError;
use crate::loader;
use crate::merge;
use crate::packages;
use crate::recursive::{Pass, Walker};
use crate::settings;
use crate::templates;
use crate::tree::{TreeMap, TreeValue};
use crate::variables;

/// Loads `absolute_path` (a file under `conf_root`) end to end. `observer` is
/// notified with the absolute path of every file `!include` actually opens.
pub fn load(
    absolute_path: PathBuf,
    conf_root: &Path,
    max_include_depth: usize,
    observer: &mut dyn FnMut(&Path),
) -> Result<(TreeValue, Rc<RefCell<LogSession>>), LoadError> {
    // Canonicalize so the root file's path compares equal to however a
    // `!include` elsewhere in the chain resolves back to it (spec.md §3/§6);
    // a missing file falls back to the given path so the read below still
    // fails with a normal IO error instead of a confusing cycle message.
    let absolute_path = absolute_path.canonicalize().unwrap_or(absolute_path);
    // `conf_root` is canonicalized too (falling back the same way) so
    // `strip_prefix` still matches when a caller passes a root that differs
    // from `absolute_path` only by a symlink or a `.`/`..` component.
    let conf_root_canonical = conf_root.canonicalize().unwrap_or_else(|_| conf_root.to_path_buf());
    let relative_path = absolute_path
        .strip_prefix(&conf_root_canonical)
        .unwrap_or(&absolute_path)
        .to_string_lossy()
        .into_owned();
    let ctx = PreprocessorContext::root(absolute_path, relative_path, max_include_depth);
    let log = Rc::clone(&ctx.log);
    let value = load_with_context(ctx, observer)?;
    Ok((value, log))
}

/// Runs the full pipeline for one file, given an already-constructed
/// context (root, or a child built by `PreprocessorContext::enter_include`).
pub fn load_with_context(
    mut ctx: PreprocessorContext,
    observer: &mut dyn FnMut(&Path),
) -> Result<TreeValue, LoadError> {
    let is_root = ctx.include_stack.is_empty();

    let source = {
        let cache = Rc::clone(&ctx.cache);
        let mut cache = cache.borrow_mut();
        cache.read(&ctx.absolute_path)?
    };

    let (parsed, _locator) = loader::load(&ctx.relative_path, &source)?;

    variables::inject_predefined(&mut ctx);

    let TreeValue::Map(mut doc) = parsed else {
        return Ok(parsed);
    };

    variables::process(&mut ctx, observer, &mut doc)?;
    templates::process(&mut ctx, &mut doc);
    let packages_raw = doc.remove_str("packages");

    let after_pass1 =
        Walker::new(&mut ctx, observer, Pass::SubIfIncludeInsert).run(TreeValue::Map(doc))?;
    let merged = merge::resolve(&mut ctx, observer, after_pass1)?;
    let TreeValue::Map(mut doc) = merged else {
        unreachable!("the root document stays a mapping through pass 1 and merge resolution")
    };

    if let Some(TreeValue::Map(packages_raw)) = packages_raw {
        doc = packages::merge_packages(&mut ctx, observer, packages_raw, doc)?;
    }

    let after_pass2 =
        Walker::new(&mut ctx, observer, Pass::RemoveReplace).run(TreeValue::Map(doc))?;

    let mut cleaned = cleanup(after_pass2);

    if is_root {
        if let TreeValue::Map(ref mut map) = cleaned {
            let file_settings = settings::extract(map);
            if !file_settings.load_into_openhab {
                return Err(LoadError::ProcessingSkipped {
                    relative_path: ctx.relative_path.clone(),
                });
            }
            if file_settings.generate_resolved_file {
                write_resolved_sidecar(&mut ctx, &cleaned);
            }
        }
    }

    Ok(cleaned)
}

/// Best-effort: a failed sidecar write is a warning, not an aborted load.
/// Emitted as pretty JSON -- the pack carries no YAML *emitter*, only the
/// `saphyr-parser` reader, and `serde_json` is already a teacher dependency.
fn write_resolved_sidecar(ctx: &mut PreprocessorContext, value: &TreeValue) {
    let sidecar = ctx.absolute_path.with_extension("resolved.json");
    let json = value.to_json();
    match serde_json::to_string_pretty(&json) {
        Ok(pretty) => {
            if let Err(e) = std::fs::write(&sidecar, pretty) {
                ctx.log.borrow_mut().warn(format!(
                    "failed to write resolved sidecar file '{}': {e}",
                    sidecar.display()
                ));
            }
        }
        Err(e) => ctx
            .log
            .borrow_mut()
            .warn(format!("failed to serialize resolved sidecar file: {e}")),
    }
}

/// Drops `Null` map keys and keys beginning with `.`, recursively, after
/// both recursive passes have run (spec.md §4.8 step 13, §3 invariants).
fn cleanup(value: TreeValue) -> TreeValue {
    match value {
        TreeValue::Map(map) => {
            let mut result = TreeMap::new();
            for (key, value) in map.into_iter() {
                if key.is_null() {
                    continue;
                }
                if let Some(name) = key.as_str() {
                    if name.starts_with('.') {
                        continue;
                    }
                }
                result.insert(key, cleanup(value));
            }
            TreeValue::Map(result)
        }
        TreeValue::Seq(items) => TreeValue::Seq(items.into_iter().map(cleanup).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_a_simple_mapping_with_variables_and_sub() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demo.yml");
        std::fs::write(
            &path,
            "variables:\n  room: Kitchen\nlabel: !sub \"${room} Light\"\n",
        )
        .unwrap();

        let mut observer = |_: &Path| {};
        let (value, log) = load(path, dir.path(), 10, &mut observer).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(
            map.get_str("label"),
            Some(&TreeValue::Str("Kitchen Light".to_string()))
        );
        assert_eq!(log.borrow().total_warning_count(), 0);
    }

    #[test]
    fn hidden_keys_and_null_keys_are_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demo.yml");
        std::fs::write(&path, ".comment: ignored\nvisible: yes please\n").unwrap();

        let mut observer = |_: &Path| {};
        let (value, _log) = load(path, dir.path(), 10, &mut observer).unwrap();
        let map = value.as_map().unwrap();
        assert!(!map.contains_key_str(".comment"));
        assert!(map.contains_key_str("visible"));
    }

    #[test]
    fn load_into_openhab_false_aborts_the_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demo.yml");
        std::fs::write(&path, "preprocessor:\n  load_into_openhab: false\nkey: value\n").unwrap();

        let mut observer = |_: &Path| {};
        let err = load(path, dir.path(), 10, &mut observer).unwrap_err();
        assert!(matches!(err, LoadError::ProcessingSkipped { .. }));
    }
}
