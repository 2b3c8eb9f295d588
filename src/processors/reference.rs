//! Shared extraction logic for `!include` and `!insert`: both accept either
//! a bare scalar (`target?k=v&flag`) or a mapping (`{file|template, vars}`),
//! and both treat the reference/vars fields as transparent to the
//! surrounding `!sub` scope (spec.md §4.4/§4.5).

use crate::context::NamedMap;
use crate::error::LoadError;
use crate::recursive::{PatternScope, Walker};
use crate::tree::TreeValue;

/// Resolves the reference payload down to `(target_string, overlay_vars)`.
/// `key_name` is `"file"` for `!include`, `"template"` for `!insert`.
pub fn extract(
    walker: &mut Walker,
    payload: TreeValue,
    scopes: &mut Vec<PatternScope>,
    key_name: &str,
) -> Result<Option<(String, NamedMap)>, LoadError> {
    match payload {
        TreeValue::Map(map) => {
            let mut map = map;
            let target = match map.remove_str(key_name) {
                Some(v) => walker.walk(v, scopes)?.into_value(),
                None => return Ok(None),
            };
            let Some(target) = target.as_str().map(str::to_string) else {
                return Ok(None);
            };
            let mut overlay = NamedMap::new();
            if let Some(TreeValue::Map(vars_map)) = map.remove_str("vars") {
                for (k, v) in vars_map.iter() {
                    let Some(name) = k.as_str() else { continue };
                    let resolved = walker.walk(v.clone(), scopes)?.into_value();
                    overlay.insert(name, resolved);
                }
            }
            Ok(Some((target, overlay)))
        }
        other => {
            let resolved = walker.walk(other, scopes)?.into_value();
            let Some(raw) = resolved.as_str() else {
                return Ok(None);
            };
            let (base, pairs) = crate::urlenc::split_query(raw);
            let mut overlay = NamedMap::new();
            for (k, v) in pairs {
                overlay.insert(k, TreeValue::Str(v));
            }
            Ok(Some((base.to_string(), overlay)))
        }
    }
}
