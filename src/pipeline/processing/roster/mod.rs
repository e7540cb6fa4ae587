//! Filterable, paginated view over a voter roster snapshot.
//!
//! The index owns the snapshot and the UI filter state. Catalogs and the caller's identity are not
//! held here; they come in through [`RosterContext`] on every call.

pub mod export;

use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::constants::UNASSIGNED_USER;
use crate::observability::metrics::{emit_gauge, MetricName};
use crate::pipeline::processing::normalize::normalize;
use crate::types::{FilterCriteria, Identity, NamedOption, PageWindow, VoterRecord};

pub use export::{ExportGroup, ExportReport, ExportRow};

/// Catalogs and identity needed to evaluate filters.
#[derive(Debug, Clone)]
pub struct RosterContext {
    pub identity: Identity,
    pub zones: Vec<NamedOption>,
    pub users: Vec<NamedOption>,
}

impl RosterContext {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            zones: Vec::new(),
            users: Vec::new(),
        }
    }

    pub fn with_catalogs(identity: Identity, zones: Vec<NamedOption>, users: Vec<NamedOption>) -> Self {
        Self { identity, zones, users }
    }

    pub fn zone_name(&self, zone_id: i64) -> Option<&str> {
        first_match(&self.zones, "zone", |z| z.id == zone_id).map(|z| z.name.as_str())
    }

    pub fn user_name(&self, user_id: i64) -> Option<&str> {
        first_match(&self.users, "user", |u| u.id == user_id).map(|u| u.name.as_str())
    }

    pub fn user_id_for_name(&self, name: &str) -> Option<i64> {
        first_match(&self.users, "user", |u| u.name == name).map(|u| u.id)
    }
}

/// Name joins resolve to the first match; zero or several matches are only logged.
fn first_match<'a>(
    options: &'a [NamedOption],
    catalog: &str,
    pred: impl Fn(&NamedOption) -> bool,
) -> Option<&'a NamedOption> {
    let mut matches = options.iter().filter(|o| pred(*o));
    let first = matches.next();
    match first {
        None => debug!("No {} catalog entry matched", catalog),
        Some(found) => {
            let extra = matches.count();
            if extra > 0 {
                debug!(
                    "{} catalog lookup is ambiguous ({} more matches); using id {} '{}'",
                    catalog, extra, found.id, found.name
                );
            }
        }
    }
    first
}

/// Filter criteria after resolving ids against the catalogs.
#[derive(Debug)]
struct ActiveFilters<'a> {
    text: Option<(&'a str, String)>,
    zone_name: Option<&'a str>,
    user_name: Option<&'a str>,
    table_id: Option<&'a str>,
}

impl<'a> ActiveFilters<'a> {
    fn resolve(criteria: &'a FilterCriteria, ctx: &'a RosterContext) -> Self {
        let text = (!criteria.text_query.is_empty())
            .then(|| (criteria.text_query.as_str(), criteria.text_query.to_lowercase()));

        let zone_name = criteria.zone_id.and_then(|id| ctx.zone_name(id));

        // Cross-user filtering is an elevated-role capability only.
        let user_name = match criteria.user_id {
            Some(id) if ctx.identity.is_elevated() => ctx.user_name(id),
            Some(_) => {
                debug!("Ignoring user filter for non-elevated caller");
                None
            }
            None => None,
        };

        let table_id = criteria.table_id.as_deref().filter(|t| !t.is_empty());

        Self {
            text,
            zone_name,
            user_name,
            table_id,
        }
    }

    fn matches(&self, record: &VoterRecord) -> bool {
        if let Some((raw, lower)) = &self.text {
            let hit = record.doc_id.contains(raw) || record.full_name.to_lowercase().contains(lower);
            if !hit {
                return false;
            }
        }
        if let Some(zone) = self.zone_name {
            if record.zone_name != zone {
                return false;
            }
        }
        if let Some(user) = self.user_name {
            if record.assigned_user_name != user {
                return false;
            }
        }
        if let Some(table) = self.table_id {
            if record.table_id != table {
                return false;
            }
        }
        true
    }
}

/// Pure AND-filter over `records`, preserving their order.
pub fn filter_records<'r>(
    records: &'r [VoterRecord],
    criteria: &FilterCriteria,
    ctx: &RosterContext,
) -> Vec<&'r VoterRecord> {
    let active = ActiveFilters::resolve(criteria, ctx);
    records.iter().filter(|r| active.matches(r)).collect()
}

/// Slice `[(page-1)*size, page*size)` out of `filtered`; out-of-range pages are empty.
pub fn paginate<T>(filtered: &[T], window: PageWindow) -> &[T] {
    let start = (window.page_index() - 1).saturating_mul(window.page_size());
    if start >= filtered.len() {
        return &[];
    }
    let end = (start + window.page_size()).min(filtered.len());
    &filtered[start..end]
}

/// One rendered page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageView<'a> {
    pub items: Vec<&'a VoterRecord>,
    pub page_index: usize,
    pub total_pages: usize,
    pub filtered_count: usize,
}

/// Distinct-value counts over the filtered set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RosterSummary {
    pub total_voters: usize,
    pub distinct_tables: usize,
    pub distinct_zones: usize,
    pub distinct_users: usize,
    pub distinct_precincts: usize,
    pub distinct_polling_places: usize,
}

impl RosterSummary {
    pub fn from_records(records: &[&VoterRecord]) -> Self {
        fn distinct<'a>(records: &[&'a VoterRecord], field: impl Fn(&'a VoterRecord) -> &'a str) -> usize {
            records
                .iter()
                .map(|r| field(*r))
                .filter(|v| !v.trim().is_empty())
                .collect::<HashSet<_>>()
                .len()
        }

        Self {
            total_voters: records.len(),
            distinct_tables: distinct(records, |r| r.table_id.as_str()),
            distinct_zones: distinct(records, |r| r.zone_name.as_str()),
            distinct_users: distinct(records, |r| r.assigned_user_name.as_str()),
            distinct_precincts: distinct(records, |r| r.precinct_name.as_str()),
            distinct_polling_places: distinct(records, |r| r.polling_place.as_str()),
        }
    }
}

/// Holds a roster snapshot together with the current filter and page state.
#[derive(Debug, Clone, Default)]
pub struct RosterFilterIndex {
    records: Arc<Vec<VoterRecord>>,
    criteria: FilterCriteria,
    window: PageWindow,
}

impl RosterFilterIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<VoterRecord>) -> Self {
        Self {
            records: Arc::new(records),
            ..Self::default()
        }
    }

    /// Replace the snapshot wholesale. Filter state is kept; the page is re-clamped.
    pub fn install_snapshot(&mut self, records: Arc<Vec<VoterRecord>>, ctx: &RosterContext) {
        self.records = records;
        self.reclamp(ctx);
    }

    pub fn records(&self) -> &[VoterRecord] {
        &self.records
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn window(&self) -> PageWindow {
        self.window
    }

    /// Replace all criteria. Any change sends the view back to page 1.
    pub fn set_criteria(&mut self, criteria: FilterCriteria) -> bool {
        if self.criteria == criteria {
            return false;
        }
        self.criteria = criteria;
        self.window = PageWindow::first();
        true
    }

    pub fn set_text_query(&mut self, query: impl Into<String>) -> bool {
        let criteria = FilterCriteria {
            text_query: query.into(),
            ..self.criteria.clone()
        };
        self.set_criteria(criteria)
    }

    pub fn set_zone(&mut self, zone_id: Option<i64>) -> bool {
        let criteria = FilterCriteria {
            zone_id,
            ..self.criteria.clone()
        };
        self.set_criteria(criteria)
    }

    pub fn set_user(&mut self, user_id: Option<i64>) -> bool {
        let criteria = FilterCriteria {
            user_id,
            ..self.criteria.clone()
        };
        self.set_criteria(criteria)
    }

    pub fn set_table(&mut self, table_id: Option<String>) -> bool {
        let criteria = FilterCriteria {
            table_id,
            ..self.criteria.clone()
        };
        self.set_criteria(criteria)
    }

    pub fn clear_filters(&mut self) -> bool {
        self.set_criteria(FilterCriteria::default())
    }

    pub fn apply_filters(&self, ctx: &RosterContext) -> Vec<&VoterRecord> {
        let filtered = filter_records(&self.records, &self.criteria, ctx);
        emit_gauge(MetricName::FilteredVoters, filtered.len() as f64);
        filtered
    }

    /// Assigned users present anywhere in the snapshot that resolve to a known user id, by name.
    pub fn derived_user_facets(&self, ctx: &RosterContext) -> Vec<NamedOption> {
        let mut seen = HashSet::new();
        let mut facets: Vec<NamedOption> = self
            .records
            .iter()
            .map(|r| r.assigned_user_name.as_str())
            .filter(|name| !name.is_empty() && *name != UNASSIGNED_USER)
            .filter(|name| seen.insert(*name))
            .filter_map(|name| {
                ctx.user_id_for_name(name).map(|id| NamedOption {
                    id,
                    name: name.to_string(),
                })
            })
            .collect();
        facets.sort_by_cached_key(|f| (normalize(&f.name), f.name.clone()));
        facets
    }

    pub fn go_to_page(&mut self, page_index: usize, ctx: &RosterContext) -> PageWindow {
        let count = self.apply_filters(ctx).len();
        self.window = PageWindow::at(page_index).clamped(count);
        self.window
    }

    pub fn next_page(&mut self, ctx: &RosterContext) -> PageWindow {
        self.go_to_page(self.window.page_index() + 1, ctx)
    }

    pub fn previous_page(&mut self, ctx: &RosterContext) -> PageWindow {
        self.go_to_page(self.window.page_index().saturating_sub(1), ctx)
    }

    /// Re-clamp the page after the snapshot or catalogs changed.
    pub fn reclamp(&mut self, ctx: &RosterContext) {
        let count = self.apply_filters(ctx).len();
        self.window = self.window.clamped(count);
    }

    pub fn current_page(&self, ctx: &RosterContext) -> PageView<'_> {
        let filtered = self.apply_filters(ctx);
        let window = self.window.clamped(filtered.len());
        PageView {
            items: paginate(&filtered, window).to_vec(),
            page_index: window.page_index(),
            total_pages: window.total_pages(filtered.len()),
            filtered_count: filtered.len(),
        }
    }

    pub fn summary(&self, ctx: &RosterContext) -> RosterSummary {
        RosterSummary::from_records(&self.apply_filters(ctx))
    }

    /// Filtered rows grouped by assigned user, for the spreadsheet writer.
    pub fn export_groups(&self, ctx: &RosterContext) -> ExportReport {
        ExportReport::build(&self.apply_filters(ctx), chrono::Utc::now())
    }

    /// Most recently created rows of the full snapshot, newest first.
    ///
    /// Rows with unparseable timestamps sort last; equal timestamps keep fetch order.
    pub fn recent_entries(&self, limit: usize) -> Vec<&VoterRecord> {
        let mut rows: Vec<&VoterRecord> = self.records.iter().collect();
        rows.sort_by_key(|r| Reverse(r.created_at_parsed()));
        rows.truncate(limit);
        rows
    }
}
