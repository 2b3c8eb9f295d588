//! `!remove`: unconditionally drops the enclosing map entry or sequence
//! element (spec.md §4.1). Resolved in the second pass so a `!sub` in the
//! first pass never has to reason about entries vanishing out from under it.

use crate::error::LoadError;
use crate::tree::{PlaceholderNode, Resolution};

pub fn process(_walker: &mut crate::recursive::Walker, _node: PlaceholderNode) -> Result<Resolution, LoadError> {
    Ok(Resolution::Remove)
}
