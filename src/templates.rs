//! TemplateProcessor: extracts the top-level `templates:` block. Bodies are
//! stored unresolved -- interpolation is deferred to `!insert` time, against
//! whatever variable scope is active at the insertion site (spec.md §4.8
//! step 7).

use crate::context::PreprocessorContext;
use crate::tree::{TreeMap, TreeValue};

pub fn process(ctx: &mut PreprocessorContext, doc: &mut TreeMap) {
    let Some(TreeValue::Map(raw)) = doc.remove_str("templates") else {
        return;
    };
    for (key, value) in raw.into_iter() {
        if let Some(name) = key.as_str() {
            ctx.templates.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn stores_template_bodies_unresolved() {
        let mut ctx = PreprocessorContext::root(PathBuf::from("/conf/demo.yml"), "demo.yml".to_string(), 10);
        let mut templates = TreeMap::new();
        templates.insert(
            TreeValue::Str("dimmer".to_string()),
            TreeValue::Str("${label}".to_string()),
        );
        let mut doc = TreeMap::new();
        doc.insert(TreeValue::Str("templates".to_string()), TreeValue::Map(templates));

        process(&mut ctx, &mut doc);
        assert!(!doc.contains_key_str("templates"));
        assert_eq!(
            ctx.templates.get("dimmer"),
            Some(&TreeValue::Str("${label}".to_string()))
        );
    }
}
