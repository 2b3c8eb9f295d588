use crate::tree::SourceSpan;

/// Maps the top-level document's mapping keys to their `(line, column)` in
/// the original source, for diagnostics that reference "this file, around
/// key X" without re-scanning the byte stream.
#[derive(Debug, Clone, Default)]
pub struct SourceLocator {
    entries: Vec<(String, SourceSpan)>,
}

impl SourceLocator {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, key: String, span: SourceSpan) {
        self.entries.push((key, span));
    }

    pub fn span_of(&self, key: &str) -> Option<SourceSpan> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, s)| *s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_looks_up() {
        let mut loc = SourceLocator::new();
        loc.record("things".to_string(), SourceSpan::new(3, 1));
        assert_eq!(loc.span_of("things"), Some(SourceSpan::new(3, 1)));
        assert_eq!(loc.span_of("missing"), None);
    }
}
