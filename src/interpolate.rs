//! Applies the expression evaluator to substitution-delimited patterns
//! within a template string (spec.md §4.3).

use crate::context::{LogSession, NamedMap};
use crate::expr;
use crate::tree::{SubstitutionPattern, TreeValue};

struct Occurrence {
    start: usize,
    end: usize,
    expr: String,
}

/// Scans `template` once, left to right, for balanced `pattern` delimiter
/// pairs (quote-aware: braces inside single/double-quoted substrings do not
/// close the substitution), evaluates each occurrence, and splices the
/// results back. A template consisting of exactly one top-level
/// substitution with no surrounding literal text returns the evaluator's
/// `TreeValue` directly, preserving its original type.
pub fn interpolate(
    template: &str,
    pattern: &SubstitutionPattern,
    variables: &NamedMap,
    log: &mut LogSession,
) -> TreeValue {
    let chars: Vec<char> = template.chars().collect();
    let open: Vec<char> = pattern.open.chars().collect();
    let close: Vec<char> = pattern.close.chars().collect();

    if open.is_empty() {
        return TreeValue::Str(template.to_string());
    }

    let occurrences = scan(&chars, &open, &close);

    if occurrences.is_empty() {
        return TreeValue::Str(template.to_string());
    }

    if occurrences.len() == 1 && occurrences[0].start == 0 && occurrences[0].end == chars.len() {
        let value = expr::evaluate(&occurrences[0].expr, variables, log);
        return match value {
            TreeValue::Seq(items) => {
                TreeValue::Seq(items.into_iter().filter(|v| !v.is_null()).collect())
            }
            other => other,
        };
    }

    let mut result = String::new();
    let mut last = 0;
    for occ in &occurrences {
        result.extend(chars[last..occ.start].iter());
        let value = expr::evaluate(&occ.expr, variables, log);
        result.push_str(&value.to_display_string());
        last = occ.end;
    }
    result.extend(chars[last..].iter());
    TreeValue::Str(result)
}

fn scan(chars: &[char], open: &[char], close: &[char]) -> Vec<Occurrence> {
    let mut occurrences = Vec::new();
    let mut i = 0;
    while i + open.len() <= chars.len() {
        if chars[i..i + open.len()] == *open {
            let expr_start = i + open.len();
            match find_close(chars, expr_start, open, close) {
                Some(end) => {
                    let expr: String = chars[expr_start..end].iter().collect();
                    occurrences.push(Occurrence {
                        start: i,
                        end: end + close.len(),
                        expr,
                    });
                    i = end + close.len();
                }
                None => break,
            }
        } else {
            i += 1;
        }
    }
    occurrences
}

fn find_close(chars: &[char], start: usize, open: &[char], close: &[char]) -> Option<usize> {
    let mut depth = 1;
    let mut j = start;
    let mut in_single = false;
    let mut in_double = false;

    while j < chars.len() {
        let c = chars[j];
        if in_single {
            if c == '\'' {
                in_single = false;
            }
            j += 1;
            continue;
        }
        if in_double {
            if c == '"' {
                in_double = false;
            }
            j += 1;
            continue;
        }
        if c == '\'' {
            in_single = true;
            j += 1;
            continue;
        }
        if c == '"' {
            in_double = true;
            j += 1;
            continue;
        }
        if j + open.len() <= chars.len() && chars[j..j + open.len()] == *open {
            depth += 1;
            j += open.len();
            continue;
        }
        if j + close.len() <= chars.len() && chars[j..j + close.len()] == *close {
            depth -= 1;
            if depth == 0 {
                return Some(j);
            }
            j += close.len();
            continue;
        }
        j += 1;
    }
    None
}
