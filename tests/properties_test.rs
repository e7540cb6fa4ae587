use proptest::prelude::*;
use std::collections::HashSet;

use roster_sync::constants::PAGE_SIZE;
use roster_sync::pipeline::processing::conflation::aggregate;
use roster_sync::pipeline::processing::normalize::normalize;
use roster_sync::pipeline::processing::roster::{filter_records, paginate, RosterContext};
use roster_sync::types::{FilterCriteria, Identity, NamedOption, PageWindow, RawPlaceRecord, VoterRecord};

const PLACE_NAMES: &[&str] = &[
    "Barranquilla",
    "BARRANQUILLA",
    "barranquilla ",
    "Pívijay",
    "PIVIJAY",
    "Ciénaga",
    "CIENAGA",
    "Puerto  Colombia",
    "El Banco",
];

fn raw_record() -> impl Strategy<Value = RawPlaceRecord> {
    (
        prop::sample::select(PLACE_NAMES),
        0u32..500,
        prop::option::of(1i64..6),
    )
        .prop_map(|(name, count, leader)| RawPlaceRecord {
            place_name: name.to_string(),
            department_name: String::new(),
            voter_count: count,
            leader_id: leader,
            leader_name: leader.map(|id| format!("Leader {}", id)),
        })
}

fn voter_record() -> impl Strategy<Value = VoterRecord> {
    (
        "[0-9]{1,4}",
        prop::sample::select(&["Ana Gómez", "ANA Torres", "Luis Pérez", "Carlos Ruiz"][..]),
        prop::sample::select(&["1", "2", "3"][..]),
        prop::sample::select(&["Soledad", "Malambo"][..]),
        prop::sample::select(&["maria", "pedro", "SIN ASIGNAR", ""][..]),
    )
        .prop_map(|(doc, name, table, zone, user)| VoterRecord {
            doc_id: doc,
            full_name: name.to_string(),
            table_id: table.to_string(),
            precinct_name: String::new(),
            polling_place: String::new(),
            zone_name: zone.to_string(),
            assigned_user_name: user.to_string(),
            created_at: String::new(),
        })
}

fn criteria() -> impl Strategy<Value = FilterCriteria> {
    (
        prop::sample::select(&["", "ana", "1", "PÉREZ", "zz"][..]),
        prop::option::of(1i64..4),
        prop::option::of(10i64..13),
        prop::option::of(prop::sample::select(&["1", "2", "3"][..])),
    )
        .prop_map(|(text, zone, user, table)| FilterCriteria {
            text_query: text.to_string(),
            zone_id: zone,
            user_id: user,
            table_id: table.map(str::to_string),
        })
}

fn admin_ctx() -> RosterContext {
    RosterContext::with_catalogs(
        Identity::new(1, 1),
        vec![
            NamedOption { id: 1, name: "Soledad".into() },
            NamedOption { id: 2, name: "Malambo".into() },
        ],
        vec![
            NamedOption { id: 10, name: "maria".into() },
            NamedOption { id: 11, name: "pedro".into() },
        ],
    )
}

fn standard_ctx() -> RosterContext {
    let admin = admin_ctx();
    RosterContext::with_catalogs(Identity::new(10, 2), admin.zones, admin.users)
}

/// One criterion added on top of a base filter.
#[derive(Debug, Clone)]
enum ExtraCriterion {
    Text(&'static str),
    Zone(i64),
    User(i64),
    Table(&'static str),
}

impl ExtraCriterion {
    /// The base with this criterion's field cleared, and the same filter with the criterion set.
    fn widen_and_narrow(&self, base: &FilterCriteria) -> (FilterCriteria, FilterCriteria) {
        let mut wide = base.clone();
        let mut narrow = base.clone();
        match self {
            ExtraCriterion::Text(text) => {
                wide.text_query = String::new();
                narrow.text_query = text.to_string();
            }
            ExtraCriterion::Zone(id) => {
                wide.zone_id = None;
                narrow.zone_id = Some(*id);
            }
            ExtraCriterion::User(id) => {
                wide.user_id = None;
                narrow.user_id = Some(*id);
            }
            ExtraCriterion::Table(table) => {
                wide.table_id = None;
                narrow.table_id = Some(table.to_string());
            }
        }
        (wide, narrow)
    }
}

fn extra_criterion() -> impl Strategy<Value = ExtraCriterion> {
    prop_oneof![
        prop::sample::select(&["ana", "1", "PÉREZ", "zz"][..]).prop_map(ExtraCriterion::Text),
        (1i64..4).prop_map(ExtraCriterion::Zone),
        (10i64..13).prop_map(ExtraCriterion::User),
        prop::sample::select(&["1", "2", "3"][..]).prop_map(ExtraCriterion::Table),
    ]
}

proptest! {
    /// Property: aggregation conserves the voter total and yields one place per key
    #[test]
    fn prop_aggregation_conserves_totals(records in prop::collection::vec(raw_record(), 0..40)) {
        let places = aggregate(&records);
        let input: u64 = records.iter().map(|r| u64::from(r.voter_count)).sum();
        let output: u64 = places.iter().map(|p| p.total_voters).sum();
        prop_assert_eq!(input, output);

        let keys: HashSet<_> = places.iter().map(|p| p.key.clone()).collect();
        prop_assert_eq!(keys.len(), places.len());
        let sources: usize = places.iter().map(|p| p.source_count).sum();
        prop_assert_eq!(sources, records.len());
    }

    /// Property: a leader is only set when some contributing record carried one
    #[test]
    fn prop_leader_requires_a_source(records in prop::collection::vec(raw_record(), 0..40)) {
        for place in aggregate(&records) {
            let any_leader = records
                .iter()
                .filter(|r| normalize(&r.place_name) == place.key.as_str())
                .any(|r| r.leader_id.is_some());
            prop_assert_eq!(place.leader_id.is_some(), any_leader);
        }
    }

    /// Property: aggregation is deterministic
    #[test]
    fn prop_aggregation_deterministic(records in prop::collection::vec(raw_record(), 0..40)) {
        prop_assert_eq!(aggregate(&records), aggregate(&records));
    }

    /// Property: normalization is idempotent
    #[test]
    fn prop_normalize_idempotent(raw in any::<String>()) {
        let once = normalize(&raw);
        prop_assert_eq!(normalize(&once), once.clone());
        prop_assert_eq!(once.trim(), once.as_str());
        prop_assert!(!once.contains("  "));
    }

    /// Property: adding any one criterion to a filter that lacks it never widens the result
    #[test]
    fn prop_filter_monotonic(
        records in prop::collection::vec(voter_record(), 0..60),
        base in criteria(),
        added in extra_criterion(),
    ) {
        let (wide, narrow) = added.widen_and_narrow(&base);
        for ctx in [admin_ctx(), standard_ctx()] {
            let wide_set: Vec<&VoterRecord> = filter_records(&records, &wide, &ctx);
            let narrow_set: Vec<&VoterRecord> = filter_records(&records, &narrow, &ctx);
            prop_assert!(narrow_set.len() <= wide_set.len());
            for record in &narrow_set {
                prop_assert!(wide_set.iter().any(|w| std::ptr::eq(*w, *record)));
            }
        }
    }

    /// Property: pages cover the filtered set exactly once, in order
    #[test]
    fn prop_pagination_covers_filtered(
        records in prop::collection::vec(voter_record(), 0..60),
        criteria in criteria(),
    ) {
        let ctx = admin_ctx();
        let filtered = filter_records(&records, &criteria, &ctx);
        let total_pages = PageWindow::first().total_pages(filtered.len());
        prop_assert_eq!(total_pages, filtered.len().div_ceil(PAGE_SIZE));

        let mut stitched: Vec<&VoterRecord> = Vec::new();
        for page in 1..=total_pages {
            let slice = paginate(&filtered, PageWindow::at(page));
            prop_assert!(!slice.is_empty() && slice.len() <= PAGE_SIZE);
            stitched.extend_from_slice(slice);
        }
        prop_assert_eq!(stitched, filtered);
    }
}
