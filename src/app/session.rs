//! Application root: owns every snapshot and the views derived from them.
//!
//! Fetch responses only reach state through [`Session::complete`]. Installing place rows
//! re-aggregates and reconciles the map in the same call, so the place list and the markers always
//! describe one snapshot.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::app::ports::{BackendPort, MapSurfacePort, NotifierPort, RosterScope};
use crate::app::snapshot::{FetchTicket, InstallOutcome, SnapshotSlot};
use crate::error::Result;
use crate::map_sync::{MapSyncController, ReconcileReport};
use crate::observability::metrics::fetch;
use crate::pipeline::processing::conflation::{aggregate, listed, PlaceSummary};
use crate::pipeline::processing::quality_gate::{
    validate_rows, CatalogRowGate, PlaceRowGate, RowIssue, VoterRowGate,
};
use crate::pipeline::processing::roster::{
    ExportReport, PageView, RosterContext, RosterFilterIndex, RosterSummary,
};
use crate::types::{
    AggregatedPlace, FilterCriteria, Identity, NamedOption, PageWindow, PlaceKey, RawPlaceRecord,
    VoterRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Places,
    Roster,
    Zones,
    Users,
}

impl Dataset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::Places => "places",
            Dataset::Roster => "roster",
            Dataset::Zones => "zones",
            Dataset::Users => "users",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of handing one fetch response to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Installed {
        accepted: usize,
        rejected: Vec<RowIssue>,
    },
    /// Arrived after a newer snapshot was installed and was dropped
    Stale,
    /// The fetch failed; the previous snapshot stays in place
    Failed { message: String },
}

impl FetchOutcome {
    pub fn is_installed(&self) -> bool {
        matches!(self, FetchOutcome::Installed { .. })
    }
}

pub struct Session<M: MapSurfacePort> {
    ctx: RosterContext,
    notifier: Arc<dyn NotifierPort>,
    place_rows: SnapshotSlot<RawPlaceRecord>,
    places: Vec<AggregatedPlace>,
    map: MapSyncController<M>,
    last_reconcile: ReconcileReport,
    voters: SnapshotSlot<VoterRecord>,
    roster: RosterFilterIndex,
    zones: SnapshotSlot<NamedOption>,
    users: SnapshotSlot<NamedOption>,
}

impl<M: MapSurfacePort> Session<M> {
    pub fn new(identity: Identity, map: MapSyncController<M>, notifier: Arc<dyn NotifierPort>) -> Self {
        Self {
            ctx: RosterContext::new(identity),
            notifier,
            place_rows: SnapshotSlot::new(),
            places: Vec::new(),
            map,
            last_reconcile: ReconcileReport::default(),
            voters: SnapshotSlot::new(),
            roster: RosterFilterIndex::new(),
            zones: SnapshotSlot::new(),
            users: SnapshotSlot::new(),
        }
    }

    /// Start a fetch of `dataset`; the ticket must come back with the response.
    pub fn begin_fetch(&mut self, dataset: Dataset) -> FetchTicket {
        match dataset {
            Dataset::Places => self.place_rows.begin(),
            Dataset::Roster => self.voters.begin(),
            Dataset::Zones => self.zones.begin(),
            Dataset::Users => self.users.begin(),
        }
    }

    fn is_stale(&self, dataset: Dataset, ticket: FetchTicket) -> bool {
        match dataset {
            Dataset::Places => self.place_rows.is_stale(ticket),
            Dataset::Roster => self.voters.is_stale(ticket),
            Dataset::Zones => self.zones.is_stale(ticket),
            Dataset::Users => self.users.is_stale(ticket),
        }
    }

    /// Install a fetch response, or record its failure.
    ///
    /// Failures keep the previous snapshot and go to the notifier. Responses (successful or not)
    /// older than the installed snapshot are discarded without notification.
    pub fn complete(
        &mut self,
        dataset: Dataset,
        ticket: FetchTicket,
        response: Result<Vec<Value>>,
    ) -> FetchOutcome {
        if self.is_stale(dataset, ticket) {
            debug!(
                "Discarding stale {} response for ticket {}",
                dataset,
                ticket.sequence()
            );
            fetch::stale(dataset.as_str());
            return FetchOutcome::Stale;
        }

        let rows = match response {
            Ok(rows) => rows,
            Err(e) => {
                if e.is_network_failure() {
                    warn!("Fetching {} failed: {}", dataset, e);
                } else {
                    error!("Fetching {} failed unexpectedly: {}", dataset, e);
                }
                self.notifier
                    .notify_error(&format!("Failed to load {}: {}", dataset, e));
                return FetchOutcome::Failed {
                    message: e.to_string(),
                };
            }
        };

        let (accepted, rejected, installed) = match dataset {
            Dataset::Places => {
                let validated = validate_rows(&PlaceRowGate, &rows);
                let accepted = validated.accepted.len();
                let outcome = self.place_rows.install(ticket, validated.accepted);
                if outcome == InstallOutcome::Installed {
                    self.refresh_places();
                }
                (accepted, validated.rejected, outcome)
            }
            Dataset::Roster => {
                let validated = validate_rows(&VoterRowGate, &rows);
                let accepted = validated.accepted.len();
                let outcome = self.voters.install(ticket, validated.accepted);
                if outcome == InstallOutcome::Installed {
                    self.roster.install_snapshot(self.voters.records(), &self.ctx);
                }
                (accepted, validated.rejected, outcome)
            }
            Dataset::Zones => {
                let validated = validate_rows(&CatalogRowGate::zones(), &rows);
                let accepted = validated.accepted.len();
                let outcome = self.zones.install(ticket, validated.accepted);
                if outcome == InstallOutcome::Installed {
                    self.ctx.zones = self.zones.records().to_vec();
                    self.roster.reclamp(&self.ctx);
                }
                (accepted, validated.rejected, outcome)
            }
            Dataset::Users => {
                let validated = validate_rows(&CatalogRowGate::users(), &rows);
                let accepted = validated.accepted.len();
                let outcome = self.users.install(ticket, validated.accepted);
                if outcome == InstallOutcome::Installed {
                    self.ctx.users = self.users.records().to_vec();
                    self.roster.reclamp(&self.ctx);
                }
                (accepted, validated.rejected, outcome)
            }
        };

        if installed == InstallOutcome::Stale {
            fetch::stale(dataset.as_str());
            return FetchOutcome::Stale;
        }
        info!(
            "Installed {} snapshot: {} rows accepted, {} rejected",
            dataset,
            accepted,
            rejected.len()
        );
        FetchOutcome::Installed { accepted, rejected }
    }

    fn refresh_places(&mut self) {
        self.places = aggregate(&self.place_rows.records());
        self.last_reconcile = self.map.reconcile(&self.places);
    }

    /// Fetch every dataset concurrently and install the results.
    ///
    /// Catalogs are installed before the roster so the first roster view already resolves ids.
    #[instrument(skip_all)]
    pub async fn refresh(&mut self, backend: &dyn BackendPort) -> Vec<(Dataset, FetchOutcome)> {
        let zones_ticket = self.begin_fetch(Dataset::Zones);
        let users_ticket = self.begin_fetch(Dataset::Users);
        let places_ticket = self.begin_fetch(Dataset::Places);
        let roster_ticket = self.begin_fetch(Dataset::Roster);
        let scope = RosterScope::for_identity(&self.ctx.identity);

        let (zones, users, places, roster) = tokio::join!(
            backend.fetch_zones(),
            backend.fetch_users(),
            backend.fetch_places(),
            backend.fetch_roster(scope),
        );

        vec![
            (Dataset::Zones, self.complete(Dataset::Zones, zones_ticket, zones)),
            (Dataset::Users, self.complete(Dataset::Users, users_ticket, users)),
            (Dataset::Places, self.complete(Dataset::Places, places_ticket, places)),
            (Dataset::Roster, self.complete(Dataset::Roster, roster_ticket, roster)),
        ]
    }

    pub fn identity(&self) -> &Identity {
        &self.ctx.identity
    }

    pub fn context(&self) -> &RosterContext {
        &self.ctx
    }

    pub fn fetched_at(&self, dataset: Dataset) -> Option<DateTime<Utc>> {
        match dataset {
            Dataset::Places => self.place_rows.current().map(|s| s.fetched_at),
            Dataset::Roster => self.voters.current().map(|s| s.fetched_at),
            Dataset::Zones => self.zones.current().map(|s| s.fetched_at),
            Dataset::Users => self.users.current().map(|s| s.fetched_at),
        }
    }

    // Places and map

    pub fn places(&self) -> &[AggregatedPlace] {
        &self.places
    }

    pub fn listed_places(&self) -> Vec<&AggregatedPlace> {
        listed(&self.places).collect()
    }

    pub fn place_summary(&self) -> PlaceSummary {
        PlaceSummary::from_places(&self.places)
    }

    pub fn last_reconcile(&self) -> &ReconcileReport {
        &self.last_reconcile
    }

    pub fn map(&self) -> &MapSyncController<M> {
        &self.map
    }

    /// Focus the map on a place given by any spelling of its name.
    pub fn focus_place(&mut self, name: &str) -> bool {
        let key = PlaceKey::from_name(name);
        let focused = self.map.focus(&key);
        if !focused {
            self.notifier
                .notify_info(&format!("No coordinates known for {}", name));
        }
        focused
    }

    // Roster

    pub fn roster(&self) -> &RosterFilterIndex {
        &self.roster
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) -> bool {
        self.roster.set_criteria(criteria)
    }

    pub fn go_to_page(&mut self, page_index: usize) -> PageWindow {
        self.roster.go_to_page(page_index, &self.ctx)
    }

    pub fn next_page(&mut self) -> PageWindow {
        self.roster.next_page(&self.ctx)
    }

    pub fn previous_page(&mut self) -> PageWindow {
        self.roster.previous_page(&self.ctx)
    }

    pub fn current_page(&self) -> PageView<'_> {
        self.roster.current_page(&self.ctx)
    }

    pub fn user_facets(&self) -> Vec<NamedOption> {
        self.roster.derived_user_facets(&self.ctx)
    }

    pub fn zone_options(&self) -> &[NamedOption] {
        &self.ctx.zones
    }

    pub fn roster_summary(&self) -> RosterSummary {
        self.roster.summary(&self.ctx)
    }

    pub fn export(&self) -> ExportReport {
        self.roster.export_groups(&self.ctx)
    }

    pub fn recent_entries(&self, limit: usize) -> Vec<&VoterRecord> {
        self.roster.recent_entries(limit)
    }
}
