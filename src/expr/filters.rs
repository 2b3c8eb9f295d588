//! The filter pipeline (`|`): `default`, `label`, `dig` (spec.md §4.2).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::LogSession;
use crate::tree::TreeValue;

pub fn apply(
    name: &str,
    value: TreeValue,
    args: &[(Option<String>, TreeValue)],
    log: &mut LogSession,
) -> TreeValue {
    match name {
        "default" => default(value, args),
        "label" => label(&value),
        "dig" => dig(value, args),
        other => {
            log.warn(format!("Unknown filter '{other}'"));
            TreeValue::Null
        }
    }
}

fn positional(args: &[(Option<String>, TreeValue)], index: usize) -> Option<&TreeValue> {
    args.iter()
        .filter(|(name, _)| name.is_none())
        .nth(index)
        .map(|(_, v)| v)
}

fn named<'a>(args: &'a [(Option<String>, TreeValue)], name: &str) -> Option<&'a TreeValue> {
    args.iter()
        .find(|(n, _)| n.as_deref() == Some(name))
        .map(|(_, v)| v)
}

/// `default(fallback, strict=false)`.
fn default(value: TreeValue, args: &[(Option<String>, TreeValue)]) -> TreeValue {
    let fallback = positional(args, 0).cloned().unwrap_or(TreeValue::Null);
    let strict = named(args, "strict").is_some_and(TreeValue::is_truthy);

    let undefined = value.is_null();
    let empty = match &value {
        TreeValue::Str(s) => s.trim().is_empty(),
        TreeValue::Seq(items) => items.is_empty(),
        TreeValue::Map(map) => map.is_empty(),
        _ => false,
    };

    if undefined || (strict && empty) {
        fallback
    } else {
        value
    }
}

/// `dig(key1, key2, ...)`: safe nested indexing. Negative string indices
/// count from the end of a sequence; missing keys, out-of-bounds indices,
/// and digging into a primitive all silently yield `Null`.
fn dig(value: TreeValue, args: &[(Option<String>, TreeValue)]) -> TreeValue {
    let mut current = value;
    for (_, key) in args {
        current = dig_one(&current, key);
    }
    current
}

fn dig_one(value: &TreeValue, key: &TreeValue) -> TreeValue {
    match value {
        TreeValue::Map(map) => match key.as_str() {
            Some(s) => map.get_str(s).cloned().unwrap_or(TreeValue::Null),
            None => map.get(key).cloned().unwrap_or(TreeValue::Null),
        },
        TreeValue::Seq(items) => {
            let idx = match key {
                TreeValue::Int(i) => Some(*i),
                TreeValue::Str(s) => s.parse::<i64>().ok(),
                _ => None,
            };
            let Some(idx) = idx else {
                return TreeValue::Null;
            };
            let len = items.len() as i64;
            let resolved = if idx < 0 { len + idx } else { idx };
            if resolved < 0 || resolved >= len {
                TreeValue::Null
            } else {
                items[resolved as usize].clone()
            }
        }
        _ => TreeValue::Null,
    }
}

static CAMEL_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Z]+(?:(?=[A-Z][a-z])|$)|[A-Z]?[a-z0-9]+|[A-Z]+|[0-9]+").unwrap()
});

/// Converts camelCase/snake_case/kebab-case/space-separated tokens into
/// Title Case, preserving all-caps acronyms (`StatusLED` -> `Status LED`).
fn label(value: &TreeValue) -> TreeValue {
    let Some(s) = value.as_str() else {
        return TreeValue::Null;
    };
    TreeValue::Str(label_text(s))
}

fn label_text(input: &str) -> String {
    let normalized = input.replace(['_', '-'], " ");
    let mut tokens = Vec::new();
    for word in normalized.split_whitespace() {
        for m in CAMEL_TOKEN.find_iter(word) {
            tokens.push(m.as_str().to_string());
        }
    }
    tokens
        .iter()
        .map(|t| titlecase_token(t))
        .collect::<Vec<_>>()
        .join(" ")
}

fn titlecase_token(token: &str) -> String {
    let alpha_count = token.chars().filter(|c| c.is_alphabetic()).count();
    let all_upper = token.chars().all(|c| !c.is_alphabetic() || c.is_uppercase());
    if all_upper && alpha_count > 1 {
        return token.to_string();
    }
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TreeMap;

    #[test]
    fn default_replaces_null() {
        let mut log = LogSession::new();
        let out = apply(
            "default",
            TreeValue::Null,
            &[(None, TreeValue::Str("fallback".to_string()))],
            &mut log,
        );
        assert_eq!(out, TreeValue::Str("fallback".to_string()));
    }

    #[test]
    fn default_strict_replaces_empty_string() {
        let mut log = LogSession::new();
        let out = apply(
            "default",
            TreeValue::Str(String::new()),
            &[
                (None, TreeValue::Str("fallback".to_string())),
                (Some("strict".to_string()), TreeValue::Bool(true)),
            ],
            &mut log,
        );
        assert_eq!(out, TreeValue::Str("fallback".to_string()));
    }

    #[test]
    fn default_non_strict_keeps_empty_string() {
        let mut log = LogSession::new();
        let out = apply(
            "default",
            TreeValue::Str(String::new()),
            &[(None, TreeValue::Str("fallback".to_string()))],
            &mut log,
        );
        assert_eq!(out, TreeValue::Str(String::new()));
    }

    #[test]
    fn label_preserves_acronyms() {
        assert_eq!(label_text("StatusLED"), "Status LED");
        assert_eq!(label_text("wifi_signal_strength"), "Wifi Signal Strength");
        assert_eq!(label_text("kebab-case-name"), "Kebab Case Name");
    }

    #[test]
    fn dig_walks_nested_and_negative_index() {
        let mut map = TreeMap::new();
        map.insert(
            TreeValue::Str("tags".to_string()),
            TreeValue::Seq(vec![
                TreeValue::Str("alpha".to_string()),
                TreeValue::Str("beta".to_string()),
                TreeValue::Str("gamma".to_string()),
            ]),
        );
        let mut log = LogSession::new();
        let out = apply(
            "dig",
            TreeValue::Map(map),
            &[
                (None, TreeValue::Str("tags".to_string())),
                (None, TreeValue::Str("-1".to_string())),
            ],
            &mut log,
        );
        assert_eq!(out, TreeValue::Str("gamma".to_string()));
    }

    #[test]
    fn dig_missing_key_is_null_without_warning() {
        let mut log = LogSession::new();
        let out = apply(
            "dig",
            TreeValue::Map(TreeMap::new()),
            &[(None, TreeValue::Str("missing".to_string()))],
            &mut log,
        );
        assert_eq!(out, TreeValue::Null);
        assert_eq!(log.total_warning_count(), 0);
    }
}
