//! Loading plan and provider-schema documents.
//!
//! Both documents are the JSON produced by `terraform show -json` and
//! `terraform providers schema -json`. Failures carry the path they came from.
//!
//! # Examples
//!
//! ```no_run
//! use plandiff_rs::parser::{parse_plan_file, parse_schemas_file};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let plan = parse_plan_file(Path::new("plan.json"))?;
//! let schemas = parse_schemas_file(Path::new("schemas.json"))?;
//! # Ok(())
//! # }
//! ```

use crate::error::ParseError;
use crate::plan::Plan;
use crate::schema::ProviderSchemas;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Parses a plan file.
///
/// # Errors
///
/// This function will return an error if:
/// - The file does not exist (`ParseError::FileNotFound`)
/// - The file cannot be read (`ParseError::ReadError`)
/// - The file is not a valid plan document (`ParseError::JsonError`)
pub fn parse_plan_file(path: &Path) -> Result<Plan, ParseError> {
    parse_file(path)
}

/// Parses a provider-schema file. Errors as for [`parse_plan_file`].
pub fn parse_schemas_file(path: &Path) -> Result<ProviderSchemas, ParseError> {
    parse_file(path)
}

/// Parses a plan document from a JSON string.
///
/// ```
/// use plandiff_rs::parser::parse_plan_json;
///
/// let plan = parse_plan_json(r#"{"format_version": "1.2"}"#).unwrap();
/// assert!(plan.resource_changes.is_empty());
/// ```
pub fn parse_plan_json(content: &str) -> Result<Plan, serde_json::Error> {
    serde_json::from_str(content)
}

pub fn parse_schemas_json(content: &str) -> Result<ProviderSchemas, serde_json::Error> {
    serde_json::from_str(content)
}

fn parse_file<T: DeserializeOwned>(path: &Path) -> Result<T, ParseError> {
    let display = path.to_string_lossy().to_string();
    if !path.exists() {
        return Err(ParseError::file_not_found(display));
    }

    debug!(path = %path.display(), "reading document");
    let content = fs::read_to_string(path).map_err(|e| ParseError::read_error(display.clone(), e))?;
    serde_json::from_str(&content).map_err(|e| ParseError::json_error(display, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_plan_json() {
        let plan = parse_plan_json(
            r#"{
                "format_version": "1.2",
                "resource_changes": [{
                    "address": "null_resource.a",
                    "mode": "managed",
                    "type": "null_resource",
                    "name": "a",
                    "provider_name": "registry.terraform.io/hashicorp/null",
                    "change": {"actions": ["create"], "before": null, "after": {}}
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(plan.format_version, "1.2");
        assert_eq!(plan.resource_changes[0].resource_type, "null_resource");
        assert_eq!(plan.resource_changes[0].change.actions, vec!["create"]);
    }

    #[test]
    fn test_parse_schemas_json() {
        let schemas = parse_schemas_json(
            r#"{"provider_schemas": {"p": {"resource_schemas": {"t": {"block": {}}}}}}"#,
        )
        .unwrap();
        assert!(schemas.schema_for("p", "managed", "t").is_ok());
    }

    #[test]
    fn test_parse_plan_json_invalid() {
        assert!(parse_plan_json("{invalid json}").is_err());
        assert!(parse_plan_json(r#"{"resource_changes": 3}"#).is_err());
    }

    #[test]
    fn test_parse_plan_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"format_version": "1.0"}}"#).unwrap();

        let plan = parse_plan_file(file.path()).unwrap();
        assert_eq!(plan.format_version, "1.0");
    }

    #[test]
    fn test_parse_file_not_found() {
        let result = parse_plan_file(Path::new("/nonexistent/plan.json"));
        match result.unwrap_err() {
            ParseError::FileNotFound { path } => assert_eq!(path, "/nonexistent/plan.json"),
            _ => panic!("Expected FileNotFound error"),
        }
    }

    #[test]
    fn test_parse_file_invalid_json_carries_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not json").unwrap();

        let err = parse_schemas_file(file.path()).unwrap_err();
        assert!(matches!(err, ParseError::JsonError { .. }));
        assert!(err.to_string().contains(&*file.path().to_string_lossy()));
    }
}
