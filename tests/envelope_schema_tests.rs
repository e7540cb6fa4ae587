use jsonschema::JSONSchema;
use roster_sync::envelope::{decode_rows, ApiEnvelope};
use roster_sync::error::RosterError;
use serde_json::json;

fn compiled_schema() -> JSONSchema {
    let schema = include_str!("../schemas/api_envelope.json");
    let schema_json: serde_json::Value = serde_json::from_str(schema).unwrap();
    let schema_static: &'static serde_json::Value = Box::leak(Box::new(schema_json));
    JSONSchema::options().compile(schema_static).unwrap()
}

#[test]
fn places_example_is_valid() {
    let instance: serde_json::Value =
        serde_json::from_str(include_str!("resources/places_envelope.json")).unwrap();
    assert!(compiled_schema().is_valid(&instance));
}

#[test]
fn roster_example_is_valid() {
    let instance: serde_json::Value =
        serde_json::from_str(include_str!("resources/roster_envelope.json")).unwrap();
    assert!(compiled_schema().is_valid(&instance));
}

#[test]
fn failure_envelope_without_data_is_valid() {
    let instance = json!({"success": false, "error": "Token inválido"});
    assert!(compiled_schema().is_valid(&instance));
}

#[test]
fn object_data_is_rejected() {
    let instance = json!({"success": true, "data": {"MUNICIPIO": "Soledad"}});
    assert!(!compiled_schema().is_valid(&instance), "data must be an array");
}

#[test]
fn decoded_rows_keep_malformed_rows_for_the_row_gate() {
    // The envelope schema does not constrain row shape; row validation reports those.
    let rows = decode_rows(include_bytes!("resources/places_envelope.json")).unwrap();
    assert_eq!(rows.len(), 6);
}

#[test]
fn string_success_flag_is_schema_error() {
    let err = ApiEnvelope::from_value(json!({"success": "true", "data": []})).unwrap_err();
    assert!(matches!(err, RosterError::Schema { .. }));
}
