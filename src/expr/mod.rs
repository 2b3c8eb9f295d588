//! Parses and evaluates `${...}` expressions (spec.md §4.2).

pub mod ast;
pub mod eval;
pub mod filters;
pub mod lexer;
pub mod parser;

use crate::context::{LogSession, NamedMap};
use crate::tree::TreeValue;

/// Parses and evaluates `source` against `variables`, logging any syntax
/// error or undefined-variable warning through `log`. A syntax error yields
/// `Null` (spec.md §4.2's "Syntax errors log 'Error parsing ...' and yield
/// Null").
pub fn evaluate(source: &str, variables: &NamedMap, log: &mut LogSession) -> TreeValue {
    let expr = match parser::parse(source) {
        Ok(expr) => expr,
        Err(e) => {
            log.warn(format!("Error parsing '{source}': {}", e.0));
            return TreeValue::Null;
        }
    };
    let mut ctx = eval::EvalContext { variables, log };
    eval::eval(&expr, &mut ctx)
}
