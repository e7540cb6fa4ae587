//! Row validation at the fetch boundary.
//!
//! Backend rows arrive as untyped JSON. Every row goes through a gate that either accepts it as a
//! typed record or rejects it with a [`RowIssue`]; a rejected row never aborts the batch.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::constants::*;
use crate::observability::metrics::{emit_counter, MetricName};
use crate::types::{NamedOption, RawPlaceRecord, VoterRecord};

/// Decision for a single row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowDecision<T> {
    Accept(T),
    Reject(RowIssue),
}

/// Why a row was dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowIssue {
    /// Position of the row in the fetched batch
    pub index: usize,
    pub issue_type: RowIssueType,
    pub field: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowIssueType {
    /// Row is not a JSON object
    NotAnObject,
    /// Required field absent, null or blank
    MissingData,
    /// Field present with the wrong type or shape
    InvalidFormat,
    /// Numeric field outside its allowed range
    OutOfRange,
}

impl RowIssue {
    fn new(index: usize, issue_type: RowIssueType, field: &str, description: String) -> Self {
        Self {
            index,
            issue_type,
            field: Some(field.to_string()),
            description,
        }
    }
}

/// Accepted records in input order plus every rejected row.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRows<T> {
    pub accepted: Vec<T>,
    pub rejected: Vec<RowIssue>,
}

/// Turns one untyped row into a typed record.
pub trait RowGate {
    type Output;

    /// Dataset label used in diagnostics.
    fn dataset(&self) -> &'static str;

    fn assess(&self, index: usize, row: &Value) -> RowDecision<Self::Output>;
}

/// Runs every row through `gate`, keeping input order for the accepted ones.
pub fn validate_rows<G: RowGate>(gate: &G, rows: &[Value]) -> ValidatedRows<G::Output> {
    let mut accepted = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        match gate.assess(index, row) {
            RowDecision::Accept(record) => accepted.push(record),
            RowDecision::Reject(issue) => {
                warn!(
                    dataset = gate.dataset(),
                    index = issue.index,
                    field = issue.field.as_deref().unwrap_or("-"),
                    "Dropping malformed row: {}",
                    issue.description
                );
                rejected.push(issue);
            }
        }
    }

    if !rejected.is_empty() {
        emit_counter(MetricName::RowsRejected, rejected.len() as u64);
    }

    ValidatedRows { accepted, rejected }
}

/// Gate for per-municipality aggregate rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceRowGate;

impl RowGate for PlaceRowGate {
    type Output = RawPlaceRecord;

    fn dataset(&self) -> &'static str {
        "places"
    }

    fn assess(&self, index: usize, row: &Value) -> RowDecision<RawPlaceRecord> {
        if !row.is_object() {
            return RowDecision::Reject(RowIssue {
                index,
                issue_type: RowIssueType::NotAnObject,
                field: None,
                description: format!("expected an object, got {}", json_kind(row)),
            });
        }

        let place_name = match required_text(index, row, FIELD_PLACE_NAME) {
            Ok(name) => name,
            Err(issue) => return RowDecision::Reject(issue),
        };
        let voter_count = match required_count(index, row, FIELD_VOTER_TOTAL) {
            Ok(count) => count,
            Err(issue) => return RowDecision::Reject(issue),
        };
        let leader_id = match optional_id(index, row, FIELD_LEADER_ID) {
            Ok(id) => id,
            Err(issue) => return RowDecision::Reject(issue),
        };
        let leader_name = optional_text(row, FIELD_LEADER_NAME).filter(|s| !s.trim().is_empty());

        RowDecision::Accept(RawPlaceRecord {
            place_name,
            department_name: optional_text(row, FIELD_DEPARTMENT_NAME).unwrap_or_default(),
            voter_count,
            leader_id,
            leader_name,
        })
    }
}

/// Gate for voter roster rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoterRowGate;

impl RowGate for VoterRowGate {
    type Output = VoterRecord;

    fn dataset(&self) -> &'static str {
        "roster"
    }

    fn assess(&self, index: usize, row: &Value) -> RowDecision<VoterRecord> {
        if !row.is_object() {
            return RowDecision::Reject(RowIssue {
                index,
                issue_type: RowIssueType::NotAnObject,
                field: None,
                description: format!("expected an object, got {}", json_kind(row)),
            });
        }

        let doc_id = match required_text(index, row, FIELD_DOC_ID) {
            Ok(v) => v,
            Err(issue) => return RowDecision::Reject(issue),
        };
        let full_name = match required_text(index, row, FIELD_FULL_NAME) {
            Ok(v) => v,
            Err(issue) => return RowDecision::Reject(issue),
        };

        let text = |field: &str| optional_text(row, field).unwrap_or_default();
        RowDecision::Accept(VoterRecord {
            doc_id,
            full_name,
            table_id: text(FIELD_TABLE),
            precinct_name: text(FIELD_PRECINCT),
            polling_place: text(FIELD_POLLING_PLACE),
            zone_name: text(FIELD_ZONE_NAME),
            assigned_user_name: text(FIELD_ASSIGNED_USER),
            created_at: text(FIELD_CREATED_AT),
        })
    }
}

/// Gate for `{id, nombre}` catalogs. Alternate field names are tried in order.
#[derive(Debug, Clone)]
pub struct CatalogRowGate {
    dataset: &'static str,
    id_fields: &'static [&'static str],
    name_fields: &'static [&'static str],
}

impl CatalogRowGate {
    pub fn zones() -> Self {
        Self {
            dataset: "zones",
            id_fields: &["id", "ID_MUNICIPIO", "ID_ZONA"],
            name_fields: &["nombre", "NOMBRE_MUNICIPIO", "NOMBRE_ZONA"],
        }
    }

    pub fn users() -> Self {
        Self {
            dataset: "users",
            id_fields: &["id", "ID_USUARIO"],
            name_fields: &["nombre", "USUARIO"],
        }
    }
}

impl RowGate for CatalogRowGate {
    type Output = NamedOption;

    fn dataset(&self) -> &'static str {
        self.dataset
    }

    fn assess(&self, index: usize, row: &Value) -> RowDecision<NamedOption> {
        if !row.is_object() {
            return RowDecision::Reject(RowIssue {
                index,
                issue_type: RowIssueType::NotAnObject,
                field: None,
                description: format!("expected an object, got {}", json_kind(row)),
            });
        }

        let id_field = self
            .id_fields
            .iter()
            .copied()
            .find(|f| row.get(*f).is_some_and(|v| !v.is_null()))
            .unwrap_or(self.id_fields[0]);
        let id = match optional_id(index, row, id_field) {
            Ok(Some(id)) => id,
            Ok(None) => {
                return RowDecision::Reject(RowIssue::new(
                    index,
                    RowIssueType::MissingData,
                    id_field,
                    "catalog entry has no id".to_string(),
                ))
            }
            Err(issue) => return RowDecision::Reject(issue),
        };

        let name = self
            .name_fields
            .iter()
            .find_map(|f| optional_text(row, f))
            .filter(|s| !s.trim().is_empty());
        match name {
            Some(name) => RowDecision::Accept(NamedOption { id, name }),
            None => RowDecision::Reject(RowIssue::new(
                index,
                RowIssueType::MissingData,
                self.name_fields[0],
                "catalog entry has no name".to_string(),
            )),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Strings are taken as-is; numbers are rendered (backends send `MESA` either way).
fn optional_text(row: &Value, field: &str) -> Option<String> {
    match row.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn required_text(index: usize, row: &Value, field: &str) -> Result<String, RowIssue> {
    match row.get(field) {
        None | Some(Value::Null) => Err(RowIssue::new(
            index,
            RowIssueType::MissingData,
            field,
            format!("required field {} is missing", field),
        )),
        Some(_) => match optional_text(row, field) {
            Some(s) if !s.trim().is_empty() => Ok(s),
            Some(_) => Err(RowIssue::new(
                index,
                RowIssueType::MissingData,
                field,
                format!("required field {} is blank", field),
            )),
            None => Err(RowIssue::new(
                index,
                RowIssueType::InvalidFormat,
                field,
                format!("field {} must be text", field),
            )),
        },
    }
}

fn required_count(index: usize, row: &Value, field: &str) -> Result<u32, RowIssue> {
    let value = match row.get(field) {
        None | Some(Value::Null) => {
            return Err(RowIssue::new(
                index,
                RowIssueType::MissingData,
                field,
                format!("required field {} is missing", field),
            ))
        }
        Some(v) => v,
    };

    let parsed: Option<i64> = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    let Some(n) = parsed else {
        return Err(RowIssue::new(
            index,
            RowIssueType::InvalidFormat,
            field,
            format!("field {} must be an integer, got {}", field, value),
        ));
    };
    u32::try_from(n).map_err(|_| {
        RowIssue::new(
            index,
            RowIssueType::OutOfRange,
            field,
            format!("field {} must be a non-negative count, got {}", field, n),
        )
    })
}

/// Ids arrive as numbers or numeric strings; null and blank mean "no id".
fn optional_id(index: usize, row: &Value, field: &str) -> Result<Option<i64>, RowIssue> {
    match row.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| {
            RowIssue::new(
                index,
                RowIssueType::InvalidFormat,
                field,
                format!("field {} must be an integer id, got {}", field, n),
            )
        }),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|_| {
            RowIssue::new(
                index,
                RowIssueType::InvalidFormat,
                field,
                format!("field {} must be an integer id, got {:?}", field, s),
            )
        }),
        Some(other) => Err(RowIssue::new(
            index,
            RowIssueType::InvalidFormat,
            field,
            format!("field {} must be an integer id, got {}", field, json_kind(other)),
        )),
    }
}
