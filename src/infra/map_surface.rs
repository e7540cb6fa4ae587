use std::collections::BTreeMap;

use crate::app::ports::MapSurfacePort;
use crate::map_sync::MarkerLabel;
use crate::types::{Coordinate, MarkerHandle};

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMarker {
    pub coordinate: Coordinate,
    pub label: MarkerLabel,
}

/// Map surface that keeps markers in memory. Used by the CLI, where tile rendering is external.
#[derive(Debug, Default)]
pub struct InMemoryMap {
    next_handle: u64,
    markers: BTreeMap<MarkerHandle, RenderedMarker>,
    view: Option<(Coordinate, u8)>,
    open_popup: Option<MarkerHandle>,
}

impl InMemoryMap {
    pub fn with_view(center: Coordinate, zoom: u8) -> Self {
        Self {
            view: Some((center, zoom)),
            ..Self::default()
        }
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Markers in handle (creation) order.
    pub fn markers(&self) -> impl Iterator<Item = (MarkerHandle, &RenderedMarker)> {
        self.markers.iter().map(|(handle, marker)| (*handle, marker))
    }

    pub fn label_of(&self, handle: MarkerHandle) -> Option<&MarkerLabel> {
        self.markers.get(&handle).map(|m| &m.label)
    }

    pub fn view(&self) -> Option<(Coordinate, u8)> {
        self.view
    }

    pub fn popup_handle(&self) -> Option<MarkerHandle> {
        self.open_popup
    }
}

impl MapSurfacePort for InMemoryMap {
    fn add_marker(&mut self, at: Coordinate, label: &MarkerLabel) -> MarkerHandle {
        self.next_handle += 1;
        let handle = MarkerHandle::from_raw(self.next_handle);
        self.markers.insert(
            handle,
            RenderedMarker {
                coordinate: at,
                label: label.clone(),
            },
        );
        handle
    }

    fn update_marker(&mut self, handle: MarkerHandle, label: &MarkerLabel) {
        if let Some(marker) = self.markers.get_mut(&handle) {
            marker.label = label.clone();
        }
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        self.markers.remove(&handle);
        if self.open_popup == Some(handle) {
            self.open_popup = None;
        }
    }

    fn set_view(&mut self, center: Coordinate, zoom: u8) {
        self.view = Some((center, zoom));
    }

    fn open_popup(&mut self, handle: MarkerHandle) {
        if self.markers.contains_key(&handle) {
            self.open_popup = Some(handle);
        }
    }
}
