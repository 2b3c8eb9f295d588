//! Reads the optional top-level `preprocessor:` block (top-level file only,
//! spec.md §4.8 step 14): `generate_resolved_file` and `load_into_openhab`.

use crate::tree::TreeMap;

#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub generate_resolved_file: bool,
    pub load_into_openhab: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            generate_resolved_file: false,
            load_into_openhab: true,
        }
    }
}

/// Removes the `preprocessor:` key from `doc` (it is preprocessor-internal
/// metadata, not application data) and returns the settings it carried.
pub fn extract(doc: &mut TreeMap) -> Settings {
    let mut settings = Settings::default();
    let Some(block) = doc.remove_str("preprocessor") else {
        return settings;
    };
    let Some(block) = block.as_map() else {
        return settings;
    };
    if let Some(v) = block.get_str("generate_resolved_file") {
        settings.generate_resolved_file = v.is_truthy();
    }
    if let Some(v) = block.get_str("load_into_openhab") {
        settings.load_into_openhab = v.is_truthy();
    }
    settings
}
