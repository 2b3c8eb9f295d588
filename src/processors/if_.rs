//! `!if`: mapping form (`if`/`then`/`else`) and sequence form (an ordered
//! list of `if`/`elseif`/`then`/`else` branches), spec.md §4.1. Only the
//! taken branch is ever walked, so a skipped branch's own `!include` or
//! undefined variable never fires a warning -- the short-circuit falls out
//! of simply never calling `walk` on it.

use crate::error::LoadError;
use crate::recursive::{PatternScope, Walker};
use crate::tree::{PlaceholderNode, Resolution, TreeMap, TreeValue};

pub fn process(
    walker: &mut Walker,
    node: PlaceholderNode,
    scopes: &mut Vec<PatternScope>,
) -> Result<Resolution, LoadError> {
    match node.payload {
        TreeValue::Map(map) => process_branch(walker, map, scopes),
        TreeValue::Seq(branches) => process_sequence(walker, branches, scopes),
        _ => Ok(Resolution::Remove),
    }
}

fn process_branch(
    walker: &mut Walker,
    mut map: TreeMap,
    scopes: &mut Vec<PatternScope>,
) -> Result<Resolution, LoadError> {
    let cond = map.remove_str("if");
    let then_v = map.remove_str("then");
    let else_v = map.remove_str("else");

    let truthy = match cond {
        Some(c) => walker.walk(c, scopes)?.into_value().is_truthy(),
        None => false,
    };

    if truthy {
        match then_v {
            Some(v) => walker.walk(v, scopes),
            None => Ok(Resolution::Remove),
        }
    } else {
        match else_v {
            Some(v) => walker.walk(v, scopes),
            None => Ok(Resolution::Remove),
        }
    }
}

fn process_sequence(
    walker: &mut Walker,
    branches: Vec<TreeValue>,
    scopes: &mut Vec<PatternScope>,
) -> Result<Resolution, LoadError> {
    for branch in branches {
        let TreeValue::Map(mut bmap) = branch else {
            continue;
        };
        if let Some(cond) = bmap.remove_str("if").or_else(|| bmap.remove_str("elseif")) {
            let truthy = walker.walk(cond, scopes)?.into_value().is_truthy();
            if !truthy {
                continue;
            }
            return match bmap.remove_str("then") {
                Some(v) => walker.walk(v, scopes),
                None => Ok(Resolution::Remove),
            };
        }
        if let Some(v) = bmap.remove_str("else") {
            return walker.walk(v, scopes);
        }
    }
    Ok(Resolution::Remove)
}
