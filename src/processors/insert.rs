//! `!insert`: resolves a named template body at the insertion site,
//! overlaying insertion-site `vars:` onto the current variable scope
//! (spec.md §4.5). The template body starts from a fresh, inactive
//! substitution scope -- it is only ever reached through this processor, so
//! any `!sub` it contains is scoped to the template body itself rather than
//! inherited from whatever surrounded the `!insert` tag.

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
    let Some((name, overlay)) = reference::extract(walker, node.payload, scopes, "template")? else {
        walker
            .ctx
            .log
            .borrow_mut()
            .warn(format!("{span}: malformed !insert directive, missing 'template'"));
        return Ok(Resolution::Value(TreeValue::Null));
    };

    let Some(body) = walker.ctx.templates.get(&name).cloned() else {
        walker
            .ctx
            .log
            .borrow_mut()
            .warn(format!("{span}: template not found: '{name}'"));
        return Ok(Resolution::Value(TreeValue::Null));
    };

    let saved = std::mem::replace(&mut walker.ctx.variables, walker.ctx.variables.overlaid_with(&overlay));
    let mut fresh_scopes = vec![PatternScope::Disabled];
    let result = walker.walk(body, &mut fresh_scopes);
    walker.ctx.variables = saved;
    result
}
