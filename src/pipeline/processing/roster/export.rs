use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::UNASSIGNED_USER;
use crate::types::VoterRecord;

/// Detail columns of one exported voter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub doc_id: String,
    pub full_name: String,
    pub table_id: String,
    pub precinct_name: String,
    pub polling_place: String,
    pub zone_name: String,
    pub created_at: String,
}

impl From<&VoterRecord> for ExportRow {
    fn from(record: &VoterRecord) -> Self {
        Self {
            doc_id: record.doc_id.clone(),
            full_name: record.full_name.clone(),
            table_id: record.table_id.clone(),
            precinct_name: record.precinct_name.clone(),
            polling_place: record.polling_place.clone(),
            zone_name: record.zone_name.clone(),
            created_at: record.created_at.clone(),
        }
    }
}

/// All exported voters assigned to one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportGroup {
    pub user_name: String,
    pub count: usize,
    pub rows: Vec<ExportRow>,
}

impl ExportGroup {
    /// Section title written above the group's rows.
    pub fn heading(&self) -> String {
        format!(
            "VOTANTES ASIGNADOS A: {} (TOTAL: {})",
            self.user_name.to_uppercase(),
            self.count
        )
    }
}

/// Export artifact handed to the spreadsheet writer.
///
/// Groups appear in the order their user is first encountered in the filtered rows; voters with no
/// assigned user land in the `SIN ASIGNAR` bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportReport {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub groups: Vec<ExportGroup>,
}

impl ExportReport {
    pub fn build(records: &[&VoterRecord], generated_at: DateTime<Utc>) -> Self {
        let mut groups: Vec<ExportGroup> = Vec::new();

        for record in records {
            let user = if record.assigned_user_name.is_empty() {
                UNASSIGNED_USER
            } else {
                record.assigned_user_name.as_str()
            };
            match groups.iter_mut().find(|g| g.user_name == user) {
                Some(group) => {
                    group.count += 1;
                    group.rows.push(ExportRow::from(*record));
                }
                None => groups.push(ExportGroup {
                    user_name: user.to_string(),
                    count: 1,
                    rows: vec![ExportRow::from(*record)],
                }),
            }
        }

        Self {
            generated_at,
            total: records.len(),
            groups,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// `(user, count)` rows of the summary sheet.
    pub fn summary_rows(&self) -> Vec<(&str, usize)> {
        self.groups
            .iter()
            .map(|g| (g.user_name.as_str(), g.count))
            .collect()
    }

    /// Suggested artifact name, e.g. `reporte_votantes_2024-05-01.json`.
    pub fn file_name(&self) -> String {
        format!("reporte_votantes_{}.json", self.generated_at.format("%Y-%m-%d"))
    }
}
