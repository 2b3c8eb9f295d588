//! Evaluates a parsed [`Expr`] against the current variables map and
//! environment, per spec.md §4.2.

use super::ast::{Arg, BinOp, Expr, UnOp};
use super::filters;
use crate::context::{LogSession, NamedMap};
use crate::tree::TreeValue;

pub struct EvalContext<'a> {
    pub variables: &'a NamedMap,
    pub log: &'a mut LogSession,
}

pub fn eval(expr: &Expr, ctx: &mut EvalContext) -> TreeValue {
    match expr {
        Expr::Null => TreeValue::Null,
        Expr::Bool(b) => TreeValue::Bool(*b),
        Expr::Int(n) => TreeValue::Int(*n),
        Expr::Float(f) => TreeValue::Float(*f),
        Expr::Str(s) => TreeValue::Str(s.clone()),

        Expr::Ident(name) if name == "VARS" => TreeValue::Map(ctx.variables.as_tree_map()),
        Expr::Ident(name) => lookup_variable(name, ctx),

        Expr::Field(base, name) if is_ident(base, "ENV") => env_lookup(name),
        Expr::Index(base, index) if is_ident(base, "VARS") => {
            let key = eval(index, ctx);
            match key.as_str() {
                Some(name) => ctx.variables.get(name).cloned().unwrap_or(TreeValue::Null),
                None => TreeValue::Null,
            }
        }

        Expr::Field(base, name) => {
            let value = eval(base, ctx);
            field_access(&value, name)
        }
        Expr::Index(base, index) => {
            let value = eval(base, ctx);
            let key = eval(index, ctx);
            index_access(&value, &key)
        }

        Expr::Unary(UnOp::Not, inner) => TreeValue::Bool(!eval(inner, ctx).is_truthy()),
        Expr::Unary(UnOp::Neg, inner) => match eval(inner, ctx) {
            TreeValue::Int(i) => TreeValue::Int(-i),
            TreeValue::Float(f) => TreeValue::Float(-f),
            _ => TreeValue::Null,
        },

        Expr::Binary(BinOp::And, lhs, rhs) => {
            let l = eval(lhs, ctx);
            if !l.is_truthy() {
                l
            } else {
                eval(rhs, ctx)
            }
        }
        Expr::Binary(BinOp::Or, lhs, rhs) => {
            let l = eval(lhs, ctx);
            if l.is_truthy() {
                l
            } else {
                eval(rhs, ctx)
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let l = eval(lhs, ctx);
            let r = eval(rhs, ctx);
            apply_binop(*op, l, r)
        }

        Expr::Ternary(cond, test, alt) => {
            if eval(test, ctx).is_truthy() {
                eval(cond, ctx)
            } else if let Some(alt) = alt {
                eval(alt, ctx)
            } else {
                TreeValue::Null
            }
        }

        Expr::MethodCall(base, name, args) => {
            let value = eval(base, ctx);
            let args: Vec<TreeValue> = args.iter().map(|a| eval(arg_expr(a), ctx)).collect();
            method_call(&value, name, &args)
        }

        Expr::Filter(base, name, args) => {
            let value = eval(base, ctx);
            let evaluated: Vec<(Option<String>, TreeValue)> = args
                .iter()
                .map(|a| match a {
                    Arg::Positional(e) => (None, eval(e, ctx)),
                    Arg::Named(n, e) => (Some(n.clone()), eval(e, ctx)),
                })
                .collect();
            filters::apply(name, value, &evaluated, ctx.log)
        }

        Expr::List(items) => TreeValue::Seq(items.iter().map(|e| eval(e, ctx)).collect()),
        Expr::Map(pairs) => {
            let mut map = crate::tree::TreeMap::new();
            for (k, v) in pairs {
                map.insert(eval(k, ctx), eval(v, ctx));
            }
            TreeValue::Map(map)
        }
    }
}

fn arg_expr(arg: &Arg) -> &Expr {
    match arg {
        Arg::Positional(e) => e,
        Arg::Named(_, e) => e,
    }
}

fn is_ident(expr: &Expr, name: &str) -> bool {
    matches!(expr, Expr::Ident(n) if n == name)
}

fn lookup_variable(name: &str, ctx: &mut EvalContext) -> TreeValue {
    if let Some(value) = ctx.variables.get(name) {
        return value.clone();
    }
    let mut message = format!("Undefined variable '{name}'");
    if let Some(suggestion) = closest_name(name, ctx.variables) {
        message.push_str(&format!(". Did you mean '{suggestion}'?"));
    }
    ctx.log.warn(message);
    TreeValue::Null
}

fn closest_name(name: &str, variables: &NamedMap) -> Option<String> {
    variables
        .iter()
        .map(|(k, _)| (k.to_string(), edit_distance(name, k)))
        .filter(|(_, d)| *d <= 2)
        .min_by_key(|(_, d)| *d)
        .map(|(k, _)| k)
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for i in 1..=a.len() {
        let mut prev = row[0];
        row[0] = i;
        for j in 1..=b.len() {
            let tmp = row[j];
            row[j] = if a[i - 1] == b[j - 1] {
                prev
            } else {
                1 + prev.min(row[j]).min(row[j - 1])
            };
            prev = tmp;
        }
    }
    row[b.len()]
}

/// `ENV.NAME` resolves only when `NAME` starts with `OPENHAB_`; everything
/// else is undefined per the closed environment sandbox (spec.md §9).
fn env_lookup(name: &str) -> TreeValue {
    if !name.starts_with("OPENHAB_") {
        return TreeValue::Null;
    }
    match std::env::var(name) {
        Ok(v) => TreeValue::Str(v),
        Err(_) => TreeValue::Null,
    }
}

fn field_access(value: &TreeValue, name: &str) -> TreeValue {
    match value {
        TreeValue::Map(map) => map.get_str(name).cloned().unwrap_or(TreeValue::Null),
        _ => TreeValue::Null,
    }
}

fn index_access(value: &TreeValue, key: &TreeValue) -> TreeValue {
    match value {
        TreeValue::Map(map) => map.get(key).cloned().unwrap_or(TreeValue::Null),
        TreeValue::Seq(items) => {
            let idx = match key {
                TreeValue::Int(i) => *i,
                TreeValue::Str(s) => match s.parse::<i64>() {
                    Ok(i) => i,
                    Err(_) => return TreeValue::Null,
                },
                _ => return TreeValue::Null,
            };
            let len = items.len() as i64;
            let resolved = if idx < 0 { len + idx } else { idx };
            if resolved < 0 || resolved >= len {
                return TreeValue::Null;
            }
            items[resolved as usize].clone()
        }
        _ => TreeValue::Null,
    }
}

fn apply_binop(op: BinOp, l: TreeValue, r: TreeValue) -> TreeValue {
    use TreeValue::*;
    match op {
        BinOp::Add => match (&l, &r) {
            (Int(a), Int(b)) => Int(a + b),
            (Int(a), Float(b)) => Float(*a as f64 + b),
            (Float(a), Int(b)) => Float(a + *b as f64),
            (Float(a), Float(b)) => Float(a + b),
            (Str(_), _) | (_, Str(_)) => Str(format!(
                "{}{}",
                l.to_display_string(),
                r.to_display_string()
            )),
            _ => Null,
        },
        BinOp::Sub => numeric_op(&l, &r, |a, b| a - b, |a, b| a - b),
        BinOp::Mul => numeric_op(&l, &r, |a, b| a * b, |a, b| a * b),
        BinOp::Div => match (&l, &r) {
            (Int(a), Int(b)) if *b != 0 => Int(a / b),
            _ => numeric_op(&l, &r, |_, _| 0, |a, b| a / b),
        },
        BinOp::Mod => match (&l, &r) {
            (Int(a), Int(b)) if *b != 0 => Int(a % b),
            _ => Null,
        },
        BinOp::Eq => Bool(l == r),
        BinOp::Ne => Bool(l != r),
        BinOp::Lt => Bool(compare(&l, &r) == Some(std::cmp::Ordering::Less)),
        BinOp::Le => Bool(matches!(
            compare(&l, &r),
            Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)
        )),
        BinOp::Gt => Bool(compare(&l, &r) == Some(std::cmp::Ordering::Greater)),
        BinOp::Ge => Bool(matches!(
            compare(&l, &r),
            Some(std::cmp::Ordering::Greater) | Some(std::cmp::Ordering::Equal)
        )),
        BinOp::And | BinOp::Or => unreachable!("handled with short-circuit above"),
    }
}

fn numeric_op(
    l: &TreeValue,
    r: &TreeValue,
    int_op: impl Fn(i64, i64) -> i64,
    float_op: impl Fn(f64, f64) -> f64,
) -> TreeValue {
    match (l, r) {
        (TreeValue::Int(a), TreeValue::Int(b)) => TreeValue::Int(int_op(*a, *b)),
        (TreeValue::Int(a), TreeValue::Float(b)) => TreeValue::Float(float_op(*a as f64, *b)),
        (TreeValue::Float(a), TreeValue::Int(b)) => TreeValue::Float(float_op(*a, *b as f64)),
        (TreeValue::Float(a), TreeValue::Float(b)) => TreeValue::Float(float_op(*a, *b)),
        _ => TreeValue::Null,
    }
}

fn compare(l: &TreeValue, r: &TreeValue) -> Option<std::cmp::Ordering> {
    match (l, r) {
        (TreeValue::Int(a), TreeValue::Int(b)) => a.partial_cmp(b),
        (TreeValue::Float(a), TreeValue::Float(b)) => a.partial_cmp(b),
        (TreeValue::Int(a), TreeValue::Float(b)) => (*a as f64).partial_cmp(b),
        (TreeValue::Float(a), TreeValue::Int(b)) => a.partial_cmp(&(*b as f64)),
        (TreeValue::Str(a), TreeValue::Str(b)) => a.partial_cmp(b),
        _ => None,
    }
}

/// Whitelisted string methods -- no reflection into arbitrary host types.
fn method_call(value: &TreeValue, name: &str, args: &[TreeValue]) -> TreeValue {
    let Some(s) = value.as_str() else {
        return TreeValue::Null;
    };
    match name {
        "upper" => TreeValue::Str(s.to_uppercase()),
        "lower" => TreeValue::Str(s.to_lowercase()),
        "trim" => TreeValue::Str(s.trim().to_string()),
        "repeat" => match args.first() {
            Some(TreeValue::Int(n)) if *n >= 0 => TreeValue::Str(s.repeat(*n as usize)),
            _ => TreeValue::Null,
        },
        "split" => {
            let sep = args.first().and_then(TreeValue::as_str).unwrap_or(" ");
            TreeValue::Seq(
                s.split(sep)
                    .map(|p| TreeValue::Str(p.to_string()))
                    .collect(),
            )
        }
        "replace" => match (args.first().and_then(TreeValue::as_str), args.get(1).and_then(TreeValue::as_str)) {
            (Some(from), Some(to)) => TreeValue::Str(s.replace(from, to)),
            _ => TreeValue::Null,
        },
        "starts_with" => match args.first().and_then(TreeValue::as_str) {
            Some(prefix) => TreeValue::Bool(s.starts_with(prefix)),
            None => TreeValue::Bool(false),
        },
        "ends_with" => match args.first().and_then(TreeValue::as_str) {
            Some(suffix) => TreeValue::Bool(s.ends_with(suffix)),
            None => TreeValue::Bool(false),
        },
        "contains" => match args.first().and_then(TreeValue::as_str) {
            Some(needle) => TreeValue::Bool(s.contains(needle)),
            None => TreeValue::Bool(false),
        },
        _ => TreeValue::Null,
    }
}
