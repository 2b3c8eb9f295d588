//! A YAML configuration preprocessor: templating, variable substitution,
//! conditional evaluation, file inclusion, template insertion, package
//! composition, and merge-key resolution over a YAML document, modeled on
//! openHAB's config preprocessor.
//!
//! The public surface is deliberately small: [`load`] runs the whole
//! pipeline described in `SPEC_FULL.md` §4.8 over one file and returns the
//! resolved [`TreeValue`] tree plus the shared warning log.

pub mod cache;
pub mod context;
pub mod error;
pub mod expr;
pub mod interpolate;
pub mod loader;
pub mod merge;
pub mod packages;
pub mod pipeline;
pub mod processors;
pub mod recursive;
pub mod settings;
pub mod templates;
pub mod tree;
pub mod urlenc;
pub mod variables;

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub use context::LogSession;
pub use error::LoadError;
pub use tree::{PlaceholderKind, PlaceholderNode, TreeMap, TreeValue};

/// Default recursion limit for `!include`/`!insert` chains (spec.md §3).
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 64;

/// Loads and fully resolves `absolute_path`, a YAML file under `conf_root`.
/// Returns the resolved tree and the shared [`LogSession`] that accumulated
/// every non-fatal warning raised while processing it and its includes.
///
/// `observer` is called with the absolute path of every file a `!include`
/// directive actually opens (not `!insert`, which never leaves the current
/// file). Pass a no-op closure when the caller does not need the list.
pub fn load(
    absolute_path: impl Into<PathBuf>,
    conf_root: impl AsRef<Path>,
    observer: &mut dyn FnMut(&Path),
) -> Result<(TreeValue, Rc<RefCell<LogSession>>), LoadError> {
    pipeline::load(
        absolute_path.into(),
        conf_root.as_ref(),
        DEFAULT_MAX_INCLUDE_DEPTH,
        observer,
    )
}

/// Like [`load`], but with an explicit `!include`/`!insert` depth limit.
pub fn load_with_depth(
    absolute_path: impl Into<PathBuf>,
    conf_root: impl AsRef<Path>,
    max_include_depth: usize,
    observer: &mut dyn FnMut(&Path),
) -> Result<(TreeValue, Rc<RefCell<LogSession>>), LoadError> {
    pipeline::load(absolute_path.into(), conf_root.as_ref(), max_include_depth, observer)
}
