//! Merging of per-place rows that refer to the same municipality.
//!
//! Rows are grouped by canonical key in a single pass. Totals are summed and the leader attribution
//! is resolved record by record in input order.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::observability::metrics::{emit_gauge, MetricName};
use crate::pipeline::processing::quality_gate::{validate_rows, PlaceRowGate, RowIssue};
use crate::types::{AggregatedPlace, PlaceKey, RawPlaceRecord};

/// What a single record did to its accumulator's leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderResolution {
    /// Record had voters and a leader: it replaced whatever was there
    Overwrote,
    /// Record had a leader but no voters, and the place had no leader yet
    Adopted,
    Unchanged,
}

/// Aggregated places plus the rows that were dropped before aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationOutcome {
    pub places: Vec<AggregatedPlace>,
    pub rejected: Vec<RowIssue>,
}

/// Merge records sharing a canonical key.
///
/// Output keeps first-seen key order. `display_name` is the first spelling seen for the key, and the
/// sum of `total_voters` over the output always equals the sum of `voter_count` over the input.
pub fn aggregate(records: &[RawPlaceRecord]) -> Vec<AggregatedPlace> {
    let mut slots: HashMap<PlaceKey, usize> = HashMap::with_capacity(records.len());
    let mut places: Vec<AggregatedPlace> = Vec::new();

    for record in records {
        let key = PlaceKey::from_name(&record.place_name);
        let slot = match slots.get(&key) {
            Some(&slot) => slot,
            None => {
                slots.insert(key.clone(), places.len());
                places.push(AggregatedPlace {
                    key,
                    display_name: record.place_name.clone(),
                    department_name: String::new(),
                    total_voters: 0,
                    leader_id: None,
                    leader_name: None,
                    source_count: 0,
                });
                places.len() - 1
            }
        };

        let place = &mut places[slot];
        place.total_voters += u64::from(record.voter_count);
        place.source_count += 1;
        if place.department_name.is_empty() && !record.department_name.trim().is_empty() {
            place.department_name = record.department_name.clone();
        }

        let previous = place.leader_id;
        if resolve_leader(place, record) == LeaderResolution::Overwrote
            && previous.is_some()
            && previous != place.leader_id
        {
            debug!(
                "Leader for {} changed from {:?} to {:?} by a later record",
                place.key, previous, place.leader_id
            );
        }
    }

    emit_gauge(MetricName::AggregatedPlaces, places.len() as f64);
    places
}

/// Validate untyped backend rows, then aggregate the accepted ones.
pub fn aggregate_rows(rows: &[Value]) -> AggregationOutcome {
    let validated = validate_rows(&PlaceRowGate, rows);
    AggregationOutcome {
        places: aggregate(&validated.accepted),
        rejected: validated.rejected,
    }
}

/// Apply one record's leader to the accumulator.
///
/// A record with voters and a leader always wins (the latest such record is kept). A leader from a
/// record without voters is only taken when the place has no leader yet.
pub fn resolve_leader(place: &mut AggregatedPlace, record: &RawPlaceRecord) -> LeaderResolution {
    let Some(leader_id) = record.leader_id else {
        return LeaderResolution::Unchanged;
    };

    if record.voter_count > 0 {
        place.leader_id = Some(leader_id);
        place.leader_name = record.leader_name.clone();
        LeaderResolution::Overwrote
    } else if place.leader_id.is_none() {
        place.leader_id = Some(leader_id);
        place.leader_name = record.leader_name.clone();
        LeaderResolution::Adopted
    } else {
        LeaderResolution::Unchanged
    }
}

/// Headline numbers for the place list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlaceSummary {
    /// Places with at least one voter
    pub listed_places: usize,
    /// Sum over listed places
    pub total_voters: u64,
    pub places_with_leader: usize,
    pub places_without_leader: usize,
}

impl PlaceSummary {
    pub fn from_places(places: &[AggregatedPlace]) -> Self {
        let mut summary = PlaceSummary::default();
        for place in listed(places) {
            summary.listed_places += 1;
            summary.total_voters += place.total_voters;
            if place.has_leader() {
                summary.places_with_leader += 1;
            } else {
                summary.places_without_leader += 1;
            }
        }
        summary
    }

    /// Share of listed places with a leader, in percent.
    pub fn leader_coverage_pct(&self) -> f64 {
        if self.listed_places == 0 {
            0.0
        } else {
            self.places_with_leader as f64 * 100.0 / self.listed_places as f64
        }
    }
}

/// Places shown in list views: those with at least one voter, in aggregation order.
pub fn listed(places: &[AggregatedPlace]) -> impl Iterator<Item = &AggregatedPlace> {
    places.iter().filter(|p| p.total_voters > 0)
}
