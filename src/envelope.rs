//! Backend response envelope: `{success, data, message?, error?}`.
//!
//! Every body is checked against `schemas/api_envelope.json` before it is trusted, then unwrapped into
//! its untyped data rows. Row-level validation happens later in the quality gate.

use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, RosterError};

static SCHEMA_JSON: Lazy<std::result::Result<Value, String>> = Lazy::new(|| {
    serde_json::from_str(include_str!("../schemas/api_envelope.json"))
        .map_err(|e| format!("Envelope schema is not valid JSON: {}", e))
});

static COMPILED_SCHEMA: Lazy<std::result::Result<JSONSchema, String>> =
    Lazy::new(|| match SCHEMA_JSON.as_ref() {
        Ok(schema) => JSONSchema::options()
            .compile(schema)
            .map_err(|e| format!("Failed to compile envelope schema: {}", e)),
        Err(e) => Err(e.clone()),
    });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Vec<Value>>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiEnvelope {
    /// Validates and decodes an envelope from an already-parsed JSON body.
    pub fn from_value(body: Value) -> Result<Self> {
        validate(&body)?;
        Ok(serde_json::from_value(body)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let body: Value = serde_json::from_slice(bytes)?;
        Self::from_value(body)
    }

    /// Data rows of a successful envelope. A missing `data` field on success reads as no rows.
    pub fn into_rows(self) -> Result<Vec<Value>> {
        if !self.success {
            let message = self
                .error
                .or(self.message)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "request was not successful".to_string());
            return Err(RosterError::Backend { message });
        }
        Ok(self.data.unwrap_or_default())
    }
}

/// Decode a raw response body straight into its data rows.
pub fn decode_rows(bytes: &[u8]) -> Result<Vec<Value>> {
    ApiEnvelope::from_slice(bytes)?.into_rows()
}

/// Check a body against the envelope schema, collecting every violation.
pub fn validate(body: &Value) -> Result<()> {
    let compiled = COMPILED_SCHEMA
        .as_ref()
        .map_err(|e| RosterError::Config(e.clone()))?;

    let violations: Vec<String> = match compiled.validate(body) {
        Ok(()) => return Ok(()),
        Err(errors) => errors
            .map(|error| format!("{} at '{}'", error, error.instance_path))
            .collect(),
    };
    Err(RosterError::Schema { violations })
}
