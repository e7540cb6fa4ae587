use crate::constants::{CREATED_AT_FORMATS, ELEVATED_ROLE_CODE, PAGE_SIZE};
use crate::pipeline::processing::normalize::normalize;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical join key for a place name. Only obtainable through normalization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PlaceKey(String);

impl PlaceKey {
    pub fn from_name(raw: &str) -> Self {
        PlaceKey(normalize(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PlaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A WGS84 point. Serialized as `[latitude, longitude]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from(pair: [f64; 2]) -> Self {
        Coordinate::new(pair[0], pair[1])
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(c: Coordinate) -> Self {
        [c.latitude, c.longitude]
    }
}

/// One per-place row as delivered by the backend, after validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPlaceRecord {
    pub place_name: String,
    pub department_name: String,
    pub voter_count: u32,
    pub leader_id: Option<i64>,
    pub leader_name: Option<String>,
}

/// Merged totals for every raw record sharing a canonical key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedPlace {
    pub key: PlaceKey,
    pub display_name: String,
    pub department_name: String,
    pub total_voters: u64,
    pub leader_id: Option<i64>,
    pub leader_name: Option<String>,
    pub source_count: usize,
}

impl AggregatedPlace {
    pub fn has_leader(&self) -> bool {
        self.leader_id.is_some()
    }
}

/// One voter roster row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoterRecord {
    pub doc_id: String,
    pub full_name: String,
    pub table_id: String,
    pub precinct_name: String,
    pub polling_place: String,
    pub zone_name: String,
    pub assigned_user_name: String,
    pub created_at: String,
}

impl VoterRecord {
    /// Parses `created_at` using the layouts the backend emits.
    pub fn created_at_parsed(&self) -> Option<NaiveDateTime> {
        let raw = self.created_at.trim();
        CREATED_AT_FORMATS.iter().find_map(|fmt| {
            NaiveDateTime::parse_from_str(raw, fmt).ok().or_else(|| {
                NaiveDate::parse_from_str(raw, fmt)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
        })
    }
}

/// Roster filter state driven by the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub text_query: String,
    pub zone_id: Option<i64>,
    pub user_id: Option<i64>,
    pub table_id: Option<String>,
}

/// Current page position. The page size is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    page_index: usize,
    page_size: usize,
}

impl PageWindow {
    pub fn first() -> Self {
        Self::at(1)
    }

    pub fn at(page_index: usize) -> Self {
        Self {
            page_index: page_index.max(1),
            page_size: PAGE_SIZE,
        }
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of pages needed for `count` rows.
    pub fn total_pages(&self, count: usize) -> usize {
        count.div_ceil(self.page_size)
    }

    /// Returns this window with its index clamped into `[1, max(total_pages, 1)]`.
    pub fn clamped(self, count: usize) -> Self {
        let last = self.total_pages(count).max(1);
        Self::at(self.page_index.clamp(1, last))
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self::first()
    }
}

/// Catalog entry (zone or user) used for name-based joins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedOption {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Elevated,
    Standard(i64),
}

impl Role {
    pub fn from_code(code: i64) -> Self {
        if code == ELEVATED_ROLE_CODE {
            Role::Elevated
        } else {
            Role::Standard(code)
        }
    }

    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Elevated)
    }
}

/// Already-validated caller identity handed over by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject_id: i64,
    pub role: Role,
}

impl Identity {
    pub fn new(subject_id: i64, role_code: i64) -> Self {
        Self {
            subject_id,
            role: Role::from_code(role_code),
        }
    }

    pub fn is_elevated(&self) -> bool {
        self.role.is_elevated()
    }
}

/// Opaque marker reference issued by a map surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(u64);

impl MarkerHandle {
    pub fn from_raw(raw: u64) -> Self {
        MarkerHandle(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}
