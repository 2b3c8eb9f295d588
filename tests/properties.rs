//! Quantified invariants from spec.md §8, run against the real pipeline.
//! Hand-written cases stand in for the ones that only make sense over a
//! small discrete domain (boolean casing, circular detection); `proptest`
//! drives the ones with a genuinely open input space (round-trip/purity,
//! variable resolution, predefined protection).

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use proptest::prelude::*;
use tempfile::tempdir;
use yamlprep::{LoadError, LogSession, TreeValue};

fn load_str(dir: &Path, name: &str, source: &str) -> Result<(TreeValue, Rc<RefCell<LogSession>>), LoadError> {
    let path = dir.join(name);
    std::fs::write(&path, source).unwrap();
    let mut observer = |_: &Path| {};
    yamlprep::load(path, dir, &mut observer)
}

fn ident(seed: &str) -> String {
    let cleaned: String = seed
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if cleaned.is_empty() || !cleaned.chars().next().unwrap().is_ascii_alphabetic() {
        format!("v{cleaned}")
    } else {
        cleaned
    }
}

proptest! {
    /// Round-trip / purity: an ordinary mapping with no custom tags survives
    /// unchanged except for `null`/`.`-prefixed key removal.
    #[test]
    fn round_trip_purity(label in "[a-zA-Z][a-zA-Z0-9_]{0,12}", value in "[a-zA-Z0-9 ]{0,20}") {
        let dir = tempdir().unwrap();
        let label = ident(&label);
        let source = format!("{label}: \"{value}\"\n.hidden: dropped\n");
        let (out, _log) = load_str(&dir, "rt.yml", &source).unwrap();
        let map = out.as_map().unwrap();
        prop_assert_eq!(map.get_str(&label), Some(&TreeValue::Str(value)));
        prop_assert!(!map.contains_key_str(".hidden"));
    }

    /// Variable resolution: for all `variables.X = v` and `!sub "${X}"`, the
    /// result equals `v`.
    #[test]
    fn variable_resolution(name in "[a-zA-Z][a-zA-Z0-9_]{0,10}", value in "[a-zA-Z0-9]{1,20}") {
        let dir = tempdir().unwrap();
        let name = ident(&name);
        let source = format!("variables:\n  {name}: {value}\nout: !sub \"${{{name}}}\"\n");
        let (out, _log) = load_str(&dir, "vr.yml", &source).unwrap();
        let map = out.as_map().unwrap();
        prop_assert_eq!(map.get_str("out"), Some(&TreeValue::Str(value)));
    }

    /// Predefined protection: `__FILE_NAME__` always resolves to the file's
    /// basename without extension, regardless of a user override attempt.
    #[test]
    fn predefined_protection(stem in "[a-zA-Z][a-zA-Z0-9_]{0,10}", bogus in "[a-zA-Z0-9]{1,10}") {
        let dir = tempdir().unwrap();
        let filename = format!("{stem}.yml");
        let source = format!(
            "variables:\n  __FILE_NAME__: {bogus}\nout: !sub \"${{__FILE_NAME__}}\"\n"
        );
        let (out, _log) = load_str(&dir, &filename, &source).unwrap();
        let map = out.as_map().unwrap();
        prop_assert_eq!(map.get_str("out"), Some(&TreeValue::Str(stem)));
    }
}

#[test]
fn boolean_discipline() {
    let dir = tempdir().unwrap();
    for (casing, expect_bool) in [
        ("true", true),
        ("True", true),
        ("TRUE", true),
        ("false", true),
        ("False", true),
        ("yes", false),
        ("Yes", false),
        ("no", false),
        ("on", false),
        ("off", false),
    ] {
        let source = format!("v: {casing}\n");
        let (out, _log) = load_str(&dir, "bool.yml", &source).unwrap();
        let map = out.as_map().unwrap();
        let value = map.get_str("v").unwrap();
        if expect_bool {
            assert!(matches!(value, TreeValue::Bool(_)), "{casing} should load as Bool");
        } else {
            assert!(matches!(value, TreeValue::Str(_)), "{casing} should load as Str");
        }
    }
}

#[test]
fn scope_isolation_across_an_include() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("child.yml"), "literal: \"${x}\"\n").unwrap();
    let (out, _log) = load_str(
        &dir,
        "parent.yml",
        "variables:\n  x: parent-value\nchild: !include child.yml\n",
    )
    .unwrap();
    let map = out.as_map().unwrap();
    let child = map.get_str("child").unwrap().as_map().unwrap();
    assert_eq!(
        child.get_str("literal"),
        Some(&TreeValue::Str("${x}".to_string()))
    );
}

#[test]
fn merge_key_precedence_local_key_wins() {
    let dir = tempdir().unwrap();
    let (out, _log) = load_str(
        &dir,
        "merge.yml",
        "a: &a {local_k: v2}\ntarget: {local_k: v1, <<: *a}\n",
    )
    .unwrap();
    let map = out.as_map().unwrap();
    let target = map.get_str("target").unwrap().as_map().unwrap();
    assert_eq!(
        target.get_str("local_k"),
        Some(&TreeValue::Str("v1".to_string()))
    );
}

#[test]
fn circular_detection() {
    let dir = tempdir().unwrap();
    let err = load_str(&dir, "a.yml", "child: !include a.yml\n").unwrap_err();
    assert!(matches!(err, LoadError::CircularInclusion { .. }));
}

#[test]
fn cache_refresh_after_mtime_bump() {
    let dir = tempdir().unwrap();
    let child_path = dir.path().join("child.yml");
    let parent_path = dir.path().join("parent.yml");
    std::fs::write(&child_path, "v: first\n").unwrap();
    std::fs::write(&parent_path, "child: !include child.yml\n").unwrap();

    let mut observer1 = |_: &Path| {};
    let (out1, _log1) = yamlprep::load(parent_path.clone(), dir.path(), &mut observer1).unwrap();
    let map1 = out1.as_map().unwrap();
    assert_eq!(
        map1.get_str("child").unwrap().as_map().unwrap().get_str("v"),
        Some(&TreeValue::Str("first".to_string()))
    );

    std::thread::sleep(std::time::Duration::from_millis(1100));
    std::fs::write(&child_path, "v: second\n").unwrap();

    let mut observer2 = |_: &Path| {};
    let (out2, _log2) = yamlprep::load(parent_path, dir.path(), &mut observer2).unwrap();
    let map2 = out2.as_map().unwrap();
    assert_eq!(
        map2.get_str("child").unwrap().as_map().unwrap().get_str("v"),
        Some(&TreeValue::Str("second".to_string()))
    );
}

#[test]
fn short_circuit_skips_the_untaken_branch_entirely() {
    let dir = tempdir().unwrap();
    let (out, log) = load_str(
        &dir,
        "shortcircuit.yml",
        "v: !if {if: true, then: kept, else: !include non_existent_file.yaml}\n",
    )
    .unwrap();
    let map = out.as_map().unwrap();
    assert_eq!(map.get_str("v"), Some(&TreeValue::Str("kept".to_string())));
    assert_eq!(log.borrow().total_warning_count(), 0);
}
