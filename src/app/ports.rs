use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::map_sync::MarkerLabel;
use crate::types::{Coordinate, Identity, MarkerHandle};

// Fetch-side ports
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(&self, url: &str) -> std::result::Result<HttpGetResult, String>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl HttpGetResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Slice of the roster a caller is allowed to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterScope {
    All,
    AssignedTo(i64),
}

impl RosterScope {
    pub fn for_identity(identity: &Identity) -> Self {
        if identity.is_elevated() {
            RosterScope::All
        } else {
            RosterScope::AssignedTo(identity.subject_id)
        }
    }
}

/// Backend datasets, each returned as the untyped rows of a validated envelope.
#[async_trait]
pub trait BackendPort: Send + Sync {
    async fn fetch_places(&self) -> Result<Vec<Value>>;
    async fn fetch_roster(&self, scope: RosterScope) -> Result<Vec<Value>>;
    async fn fetch_zones(&self) -> Result<Vec<Value>>;
    async fn fetch_users(&self) -> Result<Vec<Value>>;
}

// Presentation-side ports

/// Host map that owns marker rendering. Handles are issued by the surface.
pub trait MapSurfacePort: Send {
    fn add_marker(&mut self, at: Coordinate, label: &MarkerLabel) -> MarkerHandle;
    fn update_marker(&mut self, handle: MarkerHandle, label: &MarkerLabel);
    fn remove_marker(&mut self, handle: MarkerHandle);
    fn set_view(&mut self, center: Coordinate, zoom: u8);
    fn open_popup(&mut self, handle: MarkerHandle);
}

/// Supplies the already-verified caller identity. Token handling lives behind this port.
pub trait IdentityPort: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;
}

/// User-facing notifications (toasts in a UI, log lines in the CLI).
pub trait NotifierPort: Send + Sync {
    fn notify_error(&self, message: &str);
    fn notify_info(&self, message: &str);
}
