//! `!sub` / `!sub:pattern=<open>..<close>` (spec.md §4.1, §4.3).

use crate::error::LoadError;
use crate::recursive::{PatternScope, Walker};
use crate::tree::{PlaceholderNode, Resolution};

pub fn process(
    walker: &mut Walker,
    node: PlaceholderNode,
    scopes: &mut Vec<PatternScope>,
) -> Result<Resolution, LoadError> {
    let pattern = node.pattern.unwrap_or_default();
    scopes.push(PatternScope::Active(pattern));
    let result = walker.walk(node.payload, scopes);
    scopes.pop();
    result
}
