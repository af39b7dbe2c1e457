//! JSON Schema checks for federation documents

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use std::path::PathBuf;

fn schema_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/schemas")
        .join(format!("{name}.json"))
}

/// Compile `tests/schemas/<name>.json` (draft 7)
pub fn load_test_schema(name: &str) -> JSONSchema {
    let path = schema_path(name);
    let raw = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    let schema: Value = serde_json::from_str(&raw)
        .unwrap_or_else(|e| panic!("{} is not JSON: {e}", path.display()));

    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&schema)
        .unwrap_or_else(|e| panic!("{} does not compile: {e}", path.display()))
}

/// Every violation as "<message> at <pointer>"
pub fn validate_against_schema(document: &Value, schema: &JSONSchema) -> Result<(), Vec<String>> {
    schema.validate(document).map_err(|errors| {
        errors
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect()
    })
}

/// Panic with all violations when `document` does not match schema `name`
pub fn assert_matches_schema(document: &Value, name: &str) {
    let schema = load_test_schema(name);
    if let Err(errors) = validate_against_schema(document, &schema) {
        panic!("document does not match {name} schema: {errors:#?}\n{document:#}");
    }
}
