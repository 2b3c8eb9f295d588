//! VariableProcessor: extracts the top-level `variables:` block with
//! incremental self-referential resolution, and computes the closed set of
//! predefined, read-only variables for the current file (spec.md §3, §4.8
//! step 6).

use std::path::Path;

use crate::context::{PreprocessorContext, PREDEFINED_VARIABLE_NAMES};
use crate::error::LoadError;
use crate::merge;
use crate::recursive::{Pass, PatternScope, Walker};
use crate::tree::{TreeMap, TreeValue};

/// Computes `OPENHAB_CONF`, `OPENHAB_USERDATA`, `__FILE__`, `__FILE_NAME__`,
/// `__FILE_EXT__`, `__DIRECTORY__`, `__DIR__` from the current file and
/// (re-)inserts them, overwriting anything an `!include`/`!insert` `vars:`
/// overlay may have tried to set for these reserved names.
pub fn inject_predefined(ctx: &mut PreprocessorContext) {
    let relative = ctx.relative_path.clone();
    let path = Path::new(&relative);
    let file_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let dir = path
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();

    ctx.variables.insert(
        "OPENHAB_CONF",
        TreeValue::Str(std::env::var("OPENHAB_CONF").unwrap_or_default()),
    );
    ctx.variables.insert(
        "OPENHAB_USERDATA",
        TreeValue::Str(std::env::var("OPENHAB_USERDATA").unwrap_or_default()),
    );
    ctx.variables.insert("__FILE__", TreeValue::Str(relative));
    ctx.variables.insert("__FILE_NAME__", TreeValue::Str(file_name));
    ctx.variables.insert("__FILE_EXT__", TreeValue::Str(ext));
    ctx.variables.insert("__DIRECTORY__", TreeValue::Str(dir.clone()));
    ctx.variables.insert("__DIR__", TreeValue::Str(dir));
}

/// Removes the top-level `variables:` mapping from `doc` and resolves each
/// entry in declaration order, so that variable N can reference variable
/// N-1 through the current `VARS`/bare-identifier lookup. Merge keys inside
/// the block are drained first, same as anywhere else in the document.
pub fn process(
    ctx: &mut PreprocessorContext,
    observer: &mut dyn FnMut(&Path),
    doc: &mut TreeMap,
) -> Result<(), LoadError> {
    let Some(raw) = doc.remove_str("variables") else {
        return Ok(());
    };
    let merged = merge::resolve(ctx, observer, raw)?;
    let TreeValue::Map(raw_map) = merged else {
        return Ok(());
    };

    for (key, value) in raw_map.into_iter() {
        let Some(name) = key.as_str() else { continue };
        if PREDEFINED_VARIABLE_NAMES.contains(&name) {
            ctx.log.borrow_mut().warn(format!(
                "variable '{name}' is predefined and cannot be overridden"
            ));
            continue;
        }
        let resolved = Walker::new(ctx, observer, Pass::SubIfIncludeInsert)
            .walk(value, &mut vec![PatternScope::Disabled])?
            .into_value();
        ctx.variables.insert(name, resolved);
    }
    Ok(())
}
