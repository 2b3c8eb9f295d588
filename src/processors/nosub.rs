//! `!nosub`: suppresses interpolation for its payload even inside an
//! enclosing `!sub` scope (spec.md §4.1).

use crate::error::LoadError;
use crate::recursive::{PatternScope, Walker};
use crate::tree::{PlaceholderNode, Resolution};

pub fn process(
    walker: &mut Walker,
    node: PlaceholderNode,
    scopes: &mut Vec<PatternScope>,
) -> Result<Resolution, LoadError> {
    scopes.push(PatternScope::Disabled);
    let result = walker.walk(node.payload, scopes);
    scopes.pop();
    result
}
