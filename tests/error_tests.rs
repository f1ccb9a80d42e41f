use plandiff_rs::{DiffError, OutputError, ParseError, PlanDiffError};

#[test]
fn test_parse_error_display() {
    let err = ParseError::file_not_found("plan.json");
    assert_eq!(err.to_string(), "File not found: plan.json");
}

#[test]
fn test_output_error_display() {
    let err = OutputError::UnknownFormat {
        format: "xml".to_string(),
    };
    assert_eq!(err.to_string(), "Unknown output format: xml");
}

#[test]
fn test_missing_schema_display() {
    let err = DiffError::MissingSchema {
        provider: "registry.terraform.io/example/demo".to_string(),
        mode: "managed".to_string(),
        resource_type: "demo_thing".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "no schema for managed demo_thing in provider registry.terraform.io/example/demo"
    );
}

#[test]
fn test_plandiff_error_from_parse_error() {
    let parse_err = ParseError::file_not_found("plan.json");
    let err: PlanDiffError = parse_err.into();
    assert!(matches!(err, PlanDiffError::Parse(_)));
    assert_eq!(err.to_string(), "File not found: plan.json");
}

#[test]
fn test_resource_error_names_address() {
    let err = PlanDiffError::Resource {
        address: "demo_instance.web".to_string(),
        source: DiffError::unknown_nesting_mode("bag"),
    };
    assert_eq!(
        err.to_string(),
        "failed to diff demo_instance.web: unrecognized nesting mode: bag"
    );
}
