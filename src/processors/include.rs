//! `!include`: loads another YAML file in place, merging it with the
//! current variable scope (spec.md §4.4). Circular inclusion and
//! max-depth violations are fatal and abort the whole `load()`; any other
//! loader/IO failure is downgraded to a warning and the node resolves to
//! `Null`, matching the error taxonomy in spec.md §7.

use std::path::PathBuf;

use crate::error::LoadError;
use crate::processors::reference;
use crate::recursive::{PatternScope, Walker};
use crate::tree::{PlaceholderNode, Resolution, TreeValue};

pub fn process(
    walker: &mut Walker,
    node: PlaceholderNode,
    scopes: &mut Vec<PatternScope>,
) -> Result<Resolution, LoadError> {
    let span = node.span;
    let Some((target, overlay)) = reference::extract(walker, node.payload, scopes, "file")? else {
        walker
            .ctx
            .log
            .borrow_mut()
            .warn(format!("{span}: malformed !include directive, missing 'file'"));
        return Ok(Resolution::Value(TreeValue::Null));
    };

    let joined = walker
        .ctx
        .absolute_path
        .parent()
        .map(|p| p.join(&target))
        .unwrap_or_else(|| PathBuf::from(&target));
    // Canonicalize so `./foo.yml`, `foo.yml`, and `../dir/foo.yml` all land on
    // the same key for cache lookup and circular-inclusion detection (spec.md
    // §3/§6). A missing target can't be canonicalized; fall back to the
    // joined path so the load attempt still happens and warns with a
    // friendly IO message below.
    let target_absolute = joined.canonicalize().unwrap_or(joined);
    let target_relative = target.clone();

    let child_ctx = walker
        .ctx
        .enter_include(target_absolute.clone(), target_relative.clone(), overlay)?;

    let first_time = walker
        .ctx
        .observed_includes
        .borrow_mut()
        .insert(target_absolute.clone());
    if first_time {
        (walker.observer)(&target_absolute);
    }

    match crate::pipeline::load_with_context(child_ctx, walker.observer) {
        Ok(value) => Ok(Resolution::Value(value)),
        Err(LoadError::Io(io_err)) => {
            walker.ctx.log.borrow_mut().warn(format!(
                "{span}: could not include '{target_relative}': {}",
                friendly_io_message(&io_err)
            ));
            Ok(Resolution::Value(TreeValue::Null))
        }
        Err(other) => Err(other),
    }
}

fn friendly_io_message(err: &std::io::Error) -> String {
    match err.kind() {
        std::io::ErrorKind::NotFound => "No such file".to_string(),
        std::io::ErrorKind::PermissionDenied => "Permission denied".to_string(),
        _ => err.to_string(),
    }
}
