use async_trait::async_trait;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};

use crate::app::ports::{BackendPort, HttpClientPort, RosterScope};
use crate::config::BackendConfig;
use crate::envelope::decode_rows;
use crate::error::{Result, RosterError};
use crate::observability::metrics::fetch;

/// Backend reached over HTTP; every body is an envelope checked against the schema.
pub struct HttpBackend {
    config: BackendConfig,
    http: Box<dyn HttpClientPort>,
}

impl HttpBackend {
    pub fn new(config: BackendConfig, http: Box<dyn HttpClientPort>) -> Self {
        Self { config, http }
    }

    pub fn roster_url(&self, scope: RosterScope) -> String {
        let url = self.config.endpoint(&self.config.roster_path);
        match scope {
            RosterScope::All => url,
            RosterScope::AssignedTo(subject_id) => format!("{}?usuario={}", url, subject_id),
        }
    }

    async fn fetch_rows(&self, dataset: &'static str, url: String) -> Result<Vec<Value>> {
        let start = Instant::now();
        let result = self.get_rows(&url).await;
        match &result {
            Ok(rows) => {
                debug!("Fetched {} {} rows from {}", rows.len(), dataset, url);
                fetch::success(dataset, start.elapsed().as_secs_f64());
            }
            Err(e) => {
                warn!("Fetch of {} from {} failed: {}", dataset, url, e);
                fetch::error(dataset);
            }
        }
        result
    }

    async fn get_rows(&self, url: &str) -> Result<Vec<Value>> {
        let response = self.http.get(url).await.map_err(|message| RosterError::Network {
            url: url.to_string(),
            message,
        })?;
        if !response.is_success() {
            return Err(RosterError::Network {
                url: url.to_string(),
                message: format!("HTTP status {}", response.status),
            });
        }
        decode_rows(&response.bytes)
    }
}

#[async_trait]
impl BackendPort for HttpBackend {
    async fn fetch_places(&self) -> Result<Vec<Value>> {
        let url = self.config.endpoint(&self.config.places_path);
        self.fetch_rows("places", url).await
    }

    async fn fetch_roster(&self, scope: RosterScope) -> Result<Vec<Value>> {
        let url = self.roster_url(scope);
        self.fetch_rows("roster", url).await
    }

    async fn fetch_zones(&self) -> Result<Vec<Value>> {
        let url = self.config.endpoint(&self.config.zones_path);
        self.fetch_rows("zones", url).await
    }

    async fn fetch_users(&self) -> Result<Vec<Value>> {
        let url = self.config.endpoint(&self.config.users_path);
        self.fetch_rows("users", url).await
    }
}
