//! `!replace`: transparently substitutes its payload for itself (spec.md
//! §4.1); its only job relative to a plain value is running in the second
//! pass, after package merging has decided which side of a merge wins.

use crate::error::LoadError;
use crate::recursive::{PatternScope, Walker};
use crate::tree::{PlaceholderNode, Resolution};

pub fn process(
    walker: &mut Walker,
    node: PlaceholderNode,
    scopes: &mut Vec<PatternScope>,
) -> Result<Resolution, LoadError> {
    walker.walk(node.payload, scopes)
}
