//! Keeps the host map's markers in step with the aggregated place list.
//!
//! Markers are reconciled against each new aggregation rather than recreated, so a handle (and any
//! popup open on it) survives as long as its place keeps qualifying.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::app::ports::MapSurfacePort;
use crate::gazetteer::Gazetteer;
use crate::observability::metrics::{emit_counter, MetricName};
use crate::types::{AggregatedPlace, Coordinate, MarkerHandle, PlaceKey};

/// Popup content for one marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerLabel {
    pub title: String,
    pub department: String,
    pub total_voters: u64,
    pub leader_name: Option<String>,
}

impl MarkerLabel {
    pub fn for_place(place: &AggregatedPlace) -> Self {
        Self {
            title: place.display_name.clone(),
            department: place.department_name.clone(),
            total_voters: place.total_voters,
            leader_name: place.leader_name.clone(),
        }
    }

    pub fn popup_text(&self) -> String {
        let mut text = self.title.clone();
        if !self.department.is_empty() {
            text.push_str(&format!(" ({})", self.department));
        }
        text.push_str(&format!("\nVotantes: {}", self.total_voters));
        if let Some(leader) = &self.leader_name {
            text.push_str(&format!("\nLíder: {}", leader));
        }
        text
    }
}

/// What one reconciliation did to the marker set. Key lists are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub added: Vec<PlaceKey>,
    pub removed: Vec<PlaceKey>,
    pub retained: Vec<PlaceKey>,
    /// Retained markers whose label changed
    pub relabeled: Vec<PlaceKey>,
    /// Places with voters but no gazetteer coordinate
    pub unresolved: Vec<PlaceKey>,
}

#[derive(Debug, Clone)]
struct PlacedMarker {
    handle: MarkerHandle,
    coordinate: Coordinate,
    label: MarkerLabel,
}

pub struct MapSyncController<M: MapSurfacePort> {
    surface: M,
    gazetteer: Arc<Gazetteer>,
    markers: HashMap<PlaceKey, PlacedMarker>,
    focus_zoom: u8,
    active: Option<PlaceKey>,
}

impl<M: MapSurfacePort> MapSyncController<M> {
    pub fn new(surface: M, gazetteer: Arc<Gazetteer>, focus_zoom: u8) -> Self {
        Self {
            surface,
            gazetteer,
            markers: HashMap::new(),
            focus_zoom,
            active: None,
        }
    }

    /// Bring the marker set in line with `places`.
    ///
    /// Afterwards exactly one marker exists per place with voters and a known coordinate. Markers of
    /// places that stopped qualifying are removed; the rest keep their handle.
    pub fn reconcile(&mut self, places: &[AggregatedPlace]) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut wanted: HashSet<PlaceKey> = HashSet::new();

        for place in places.iter().filter(|p| p.total_voters > 0) {
            let Some(coordinate) = self.gazetteer.lookup(&place.key) else {
                report.unresolved.push(place.key.clone());
                continue;
            };
            if !wanted.insert(place.key.clone()) {
                continue;
            }

            let label = MarkerLabel::for_place(place);
            match self.markers.get_mut(&place.key) {
                Some(marker) => {
                    if marker.label != label {
                        self.surface.update_marker(marker.handle, &label);
                        marker.label = label;
                        report.relabeled.push(place.key.clone());
                    }
                    report.retained.push(place.key.clone());
                }
                None => {
                    let handle = self.surface.add_marker(coordinate, &label);
                    self.markers.insert(
                        place.key.clone(),
                        PlacedMarker {
                            handle,
                            coordinate,
                            label,
                        },
                    );
                    report.added.push(place.key.clone());
                }
            }
        }

        let stale: Vec<PlaceKey> = self
            .markers
            .keys()
            .filter(|key| !wanted.contains(*key))
            .cloned()
            .collect();
        for key in stale {
            if let Some(marker) = self.markers.remove(&key) {
                self.surface.remove_marker(marker.handle);
            }
            if self.active.as_ref() == Some(&key) {
                debug!("Active place {} lost its marker", key);
                self.active = None;
            }
            report.removed.push(key);
        }

        report.added.sort();
        report.removed.sort();
        report.retained.sort();
        report.relabeled.sort();
        report.unresolved.sort();

        emit_counter(MetricName::MarkersAdded, report.added.len() as u64);
        emit_counter(MetricName::MarkersRemoved, report.removed.len() as u64);
        emit_counter(
            MetricName::CoordinatesUnresolved,
            report.unresolved.len() as u64,
        );
        info!(
            "Map reconciled: {} added, {} removed, {} retained, {} without coordinates",
            report.added.len(),
            report.removed.len(),
            report.retained.len(),
            report.unresolved.len()
        );
        report
    }

    /// Center the map on a place and open its popup. Returns false when the place has no coordinate.
    pub fn focus(&mut self, key: &PlaceKey) -> bool {
        let Some(coordinate) = self.gazetteer.lookup(key) else {
            return false;
        };
        self.surface.set_view(coordinate, self.focus_zoom);
        if let Some(marker) = self.markers.get(key) {
            self.surface.open_popup(marker.handle);
            self.active = Some(key.clone());
        }
        true
    }

    pub fn handle_for(&self, key: &PlaceKey) -> Option<MarkerHandle> {
        self.markers.get(key).map(|m| m.handle)
    }

    pub fn coordinate_for(&self, key: &PlaceKey) -> Option<Coordinate> {
        self.markers.get(key).map(|m| m.coordinate)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn active_key(&self) -> Option<&PlaceKey> {
        self.active.as_ref()
    }

    pub fn gazetteer(&self) -> &Gazetteer {
        &self.gazetteer
    }

    pub fn surface(&self) -> &M {
        &self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::map_surface::InMemoryMap;

    fn place(name: &str, total: u64) -> AggregatedPlace {
        AggregatedPlace {
            key: PlaceKey::from_name(name),
            display_name: name.to_string(),
            department_name: "Atlántico".to_string(),
            total_voters: total,
            leader_id: None,
            leader_name: None,
            source_count: 1,
        }
    }

    fn controller() -> MapSyncController<InMemoryMap> {
        let gazetteer = Gazetteer::from_entries([
            ("BARRANQUILLA", Coordinate::new(10.9685, -74.7813)),
            ("SOLEDAD", Coordinate::new(10.9184, -74.7646)),
            ("PIVIJAY", Coordinate::new(10.4833, -74.6333)),
        ]);
        MapSyncController::new(InMemoryMap::default(), Arc::new(gazetteer), 9)
    }

    #[test]
    fn test_places_markers_for_resolvable_places_with_voters() {
        let mut map = controller();
        let report = map.reconcile(&[place("Barranquilla", 4), place("Soledad", 0)]);
        assert_eq!(report.added, vec![PlaceKey::from_name("BARRANQUILLA")]);
        assert_eq!(map.marker_count(), 1);
        assert_eq!(map.surface().marker_count(), 1);
        assert_eq!(
            map.coordinate_for(&PlaceKey::from_name("barranquilla")),
            Some(Coordinate::new(10.9685, -74.7813))
        );
        assert_eq!(map.coordinate_for(&PlaceKey::from_name("Soledad")), None);
    }

    #[test]
    fn test_unresolvable_place_gets_no_marker_and_no_error() {
        let mut map = controller();
        let report = map.reconcile(&[place("Atlantis", 12)]);
        assert_eq!(report.unresolved, vec![PlaceKey::from_name("Atlantis")]);
        assert!(report.added.is_empty());
        assert_eq!(map.surface().marker_count(), 0);
    }

    #[test]
    fn test_reconcile_keeps_handles_and_removes_stale_markers() {
        let mut map = controller();
        map.reconcile(&[place("Barranquilla", 4), place("Soledad", 2)]);
        let handle = map.handle_for(&PlaceKey::from_name("Barranquilla")).unwrap();

        let report = map.reconcile(&[place("Barranquilla", 7), place("Soledad", 0)]);
        assert_eq!(report.retained, vec![PlaceKey::from_name("BARRANQUILLA")]);
        assert_eq!(report.relabeled, vec![PlaceKey::from_name("BARRANQUILLA")]);
        assert_eq!(report.removed, vec![PlaceKey::from_name("SOLEDAD")]);
        assert_eq!(map.handle_for(&PlaceKey::from_name("Barranquilla")), Some(handle));
        assert_eq!(map.surface().label_of(handle).unwrap().total_voters, 7);
        assert_eq!(map.surface().marker_count(), 1);
    }

    #[test]
    fn test_unchanged_snapshot_is_a_noop() {
        let mut map = controller();
        let places = vec![place("Barranquilla", 4)];
        map.reconcile(&places);
        let report = map.reconcile(&places);
        assert!(report.added.is_empty());
        assert!(report.removed.is_empty());
        assert!(report.relabeled.is_empty());
        assert_eq!(report.retained.len(), 1);
    }

    #[test]
    fn test_focus_sets_view_and_opens_popup() {
        let mut map = controller();
        map.reconcile(&[place("Pívijay", 3)]);
        let key = PlaceKey::from_name("Pívijay");
        assert!(map.focus(&key));
        assert_eq!(map.surface().view(), Some((Coordinate::new(10.4833, -74.6333), 9)));
        assert_eq!(map.surface().popup_handle(), map.handle_for(&key));
        assert_eq!(map.active_key(), Some(&key));
    }

    #[test]
    fn test_focus_on_unknown_place_is_noop() {
        let mut map = controller();
        assert!(!map.focus(&PlaceKey::from_name("Atlantis")));
        assert_eq!(map.surface().view(), None);
    }

    #[test]
    fn test_removing_active_marker_clears_focus() {
        let mut map = controller();
        map.reconcile(&[place("Soledad", 1)]);
        map.focus(&PlaceKey::from_name("Soledad"));
        map.reconcile(&[]);
        assert_eq!(map.active_key(), None);
        assert_eq!(map.surface().popup_handle(), None);
    }

    #[test]
    fn test_popup_text() {
        let mut p = place("Soledad", 3);
        p.leader_name = Some("María".to_string());
        let text = MarkerLabel::for_place(&p).popup_text();
        assert_eq!(text, "Soledad (Atlántico)\nVotantes: 3\nLíder: María");
    }
}
