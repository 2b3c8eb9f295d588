use thiserror::Error;

/// Error taxonomy for `load()`. Most diagnostics during resolution are
/// non-fatal and go through [`crate::context::LogSession`] instead; this type
/// covers the handful of conditions that abort the whole pipeline (see
/// section 7 of the preprocessor design: YAML syntax errors, circular/overly
/// deep includes, and the `load_into_openhab: false` escape hatch).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{relative_path}: line {line}, column {column}: {class_name}: {message}")]
    Located {
        relative_path: String,
        line: usize,
        column: usize,
        class_name: String,
        message: String,
    },

    #[error("{0}")]
    Message(String),

    #[error("Circular inclusion detected: {chain}")]
    CircularInclusion { chain: String },

    #[error("maximum include depth ({max_depth}) exceeded at '{file}'")]
    MaxIncludeDepthExceeded { max_depth: usize, file: String },

    #[error("processing skipped for '{relative_path}': load_into_openhab is false")]
    ProcessingSkipped { relative_path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    pub fn located(
        relative_path: impl Into<String>,
        line: usize,
        column: usize,
        class_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        LoadError::Located {
            relative_path: relative_path.into(),
            line,
            column,
            class_name: class_name.into(),
            message: message.into(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        LoadError::Message(message.into())
    }
}
