//! Custom error types for plandiff.

/// Errors raised while computing a structured diff.
///
/// Every variant is deterministic given the same input, so none of them are
/// worth retrying.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("unrecognized type expression: {expression}")]
    UnknownType { expression: String },

    #[error("unrecognized nesting mode: {mode}")]
    UnknownNestingMode { mode: String },

    #[error("unsupported resource mode: {mode}")]
    UnsupportedMode { mode: String },

    #[error("no schema for {mode} {resource_type} in provider {provider}")]
    MissingSchema {
        provider: String,
        mode: String,
        resource_type: String,
    },

    #[error("found invalid type within attribute path: {segment}")]
    InvalidPathSegment { segment: String },

    #[error("failed to unmarshal attribute paths: {message}")]
    AttributePaths { message: String },

    #[error("unsupported change actions: {actions}")]
    UnsupportedActions { actions: String },

    #[error("unsupported plan format version {version}, expected {accepted}")]
    UnsupportedFormatVersion { version: String, accepted: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to read file {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    JsonError {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Unknown output format: {format}")]
    UnknownFormat { format: String },

    #[error("Failed to serialize to JSON: {source}")]
    JsonSerializationError {
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum PlanDiffError {
    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("failed to diff {address}: {source}")]
    Resource {
        address: String,
        #[source]
        source: DiffError,
    },
}

pub type Result<T, E = DiffError> = std::result::Result<T, E>;

impl DiffError {
    pub fn unknown_type(expression: impl Into<String>) -> Self {
        Self::UnknownType {
            expression: expression.into(),
        }
    }

    pub fn unknown_nesting_mode(mode: impl Into<String>) -> Self {
        Self::UnknownNestingMode { mode: mode.into() }
    }

    pub fn invalid_path_segment(segment: impl Into<String>) -> Self {
        Self::InvalidPathSegment {
            segment: segment.into(),
        }
    }

    pub fn attribute_paths(message: impl Into<String>) -> Self {
        Self::AttributePaths {
            message: message.into(),
        }
    }
}

impl ParseError {
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn read_error(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    pub fn json_error(path: impl Into<String>, source: serde_json::Error) -> Self {
        Self::JsonError {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::file_not_found("plan.json");
        assert_eq!(err.to_string(), "File not found: plan.json");
    }

    #[test]
    fn test_unknown_type_display() {
        let err = DiffError::unknown_type("\"capsule\"");
        assert_eq!(err.to_string(), "unrecognized type expression: \"capsule\"");
    }

    #[test]
    fn test_attribute_paths_display() {
        let err = DiffError::attribute_paths("expected an array");
        assert!(err
            .to_string()
            .starts_with("failed to unmarshal attribute paths"));
    }

    #[test]
    fn test_format_version_display() {
        let err = DiffError::UnsupportedFormatVersion {
            version: "2.1".to_string(),
            accepted: ">= 0.1, < 2.0".to_string(),
        };
        assert!(err.to_string().contains("2.1"));
        assert!(err.to_string().contains(">= 0.1, < 2.0"));
    }

    #[test]
    fn test_plandiff_error_from_diff_error() {
        let err: PlanDiffError = DiffError::unknown_nesting_mode("bag").into();
        assert!(matches!(err, PlanDiffError::Diff(_)));
    }
}
