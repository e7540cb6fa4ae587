use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use roster_sync::app::ports::{BackendPort, NotifierPort, RosterScope};
use roster_sync::app::search_debounce::FilterDebouncer;
use roster_sync::app::session::{Dataset, FetchOutcome, Session};
use roster_sync::error::{Result, RosterError};
use roster_sync::gazetteer::Gazetteer;
use roster_sync::infra::map_surface::InMemoryMap;
use roster_sync::map_sync::MapSyncController;
use roster_sync::types::{FilterCriteria, Identity, PlaceKey};

#[derive(Default)]
struct RecordingNotifier {
    errors: Mutex<Vec<String>>,
}

impl NotifierPort for RecordingNotifier {
    fn notify_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn notify_info(&self, _message: &str) {}
}

/// Backend serving fixed rows and remembering the requested roster scope.
struct FixedBackend {
    places: Vec<Value>,
    roster: Vec<Value>,
    fail_roster: bool,
    scopes: Mutex<Vec<RosterScope>>,
}

impl FixedBackend {
    fn new() -> Self {
        Self {
            places: vec![
                json!({"MUNICIPIO": "Barranquilla", "DEPARTAMENTO": "Atlántico", "TOTAL": 3}),
                json!({"MUNICIPIO": "SOLEDAD", "DEPARTAMENTO": "Atlántico", "TOTAL": 2, "LIDER_MUNICIPIO": 4}),
            ],
            roster: (0..12)
                .map(|i| {
                    json!({
                        "NUM_DOC": format!("{}", 1000 + i),
                        "NOMBRE_COMPLETO": format!("Votante {}", i),
                        "MESA": if i % 2 == 0 { "1" } else { "2" },
                        "ZONA_NOMBRE": "Soledad",
                        "USUARIO_NOMBRE": if i < 4 { "maria" } else { "pedro" },
                    })
                })
                .collect(),
            fail_roster: false,
            scopes: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BackendPort for FixedBackend {
    async fn fetch_places(&self) -> Result<Vec<Value>> {
        Ok(self.places.clone())
    }

    async fn fetch_roster(&self, scope: RosterScope) -> Result<Vec<Value>> {
        self.scopes.lock().unwrap().push(scope);
        if self.fail_roster {
            return Err(RosterError::Network {
                url: "http://backend.test/votantes_list.php".to_string(),
                message: "HTTP status 503".to_string(),
            });
        }
        Ok(self.roster.clone())
    }

    async fn fetch_zones(&self) -> Result<Vec<Value>> {
        Ok(vec![json!({"id": "1", "nombre": "Soledad"})])
    }

    async fn fetch_users(&self) -> Result<Vec<Value>> {
        Ok(vec![json!({"id": 10, "nombre": "maria"}), json!({"id": 11, "nombre": "pedro"})])
    }
}

fn session(identity: Identity, notifier: Arc<RecordingNotifier>) -> Session<InMemoryMap> {
    let map = MapSyncController::new(
        InMemoryMap::default(),
        Arc::new(Gazetteer::builtin().unwrap()),
        9,
    );
    Session::new(identity, map, notifier)
}

#[tokio::test]
async fn test_refresh_installs_every_dataset() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut session = session(Identity::new(1, 1), notifier.clone());
    let backend = FixedBackend::new();

    let outcomes = session.refresh(&backend).await;
    assert!(outcomes.iter().all(|(_, o)| o.is_installed()));
    assert_eq!(*backend.scopes.lock().unwrap(), vec![RosterScope::All]);

    assert_eq!(session.places().len(), 2);
    assert_eq!(session.map().marker_count(), 2);
    assert_eq!(session.current_page().filtered_count, 12);
    assert_eq!(session.current_page().total_pages, 2);
    assert_eq!(session.user_facets().len(), 2);
    assert!(session.fetched_at(Dataset::Places).is_some());
    assert!(notifier.errors.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_standard_caller_requests_own_roster() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut session = session(Identity::new(11, 3), notifier);
    let backend = FixedBackend::new();
    session.refresh(&backend).await;
    assert_eq!(*backend.scopes.lock().unwrap(), vec![RosterScope::AssignedTo(11)]);
}

#[tokio::test]
async fn test_failed_fetch_keeps_previous_snapshot_and_notifies() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut session = session(Identity::new(1, 1), notifier.clone());
    let mut backend = FixedBackend::new();
    session.refresh(&backend).await;
    assert_eq!(session.roster().records().len(), 12);

    backend.fail_roster = true;
    let outcomes = session.refresh(&backend).await;
    let roster = outcomes.iter().find(|(d, _)| *d == Dataset::Roster).unwrap();
    assert!(matches!(roster.1, FetchOutcome::Failed { .. }));
    assert_eq!(session.roster().records().len(), 12);
    assert_eq!(notifier.errors.lock().unwrap().len(), 1);
}

#[test]
fn test_stale_places_response_is_discarded() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut session = session(Identity::new(1, 1), notifier.clone());

    let old = session.begin_fetch(Dataset::Places);
    let new = session.begin_fetch(Dataset::Places);

    let fresh = vec![json!({"MUNICIPIO": "Soledad", "TOTAL": 8})];
    assert!(session.complete(Dataset::Places, new, Ok(fresh)).is_installed());

    let late = vec![json!({"MUNICIPIO": "Malambo", "TOTAL": 1})];
    assert_eq!(session.complete(Dataset::Places, old, Ok(late)), FetchOutcome::Stale);

    let late_failure = Err(RosterError::Backend { message: "timeout".into() });
    assert_eq!(session.complete(Dataset::Places, old, late_failure), FetchOutcome::Stale);

    assert_eq!(session.places().len(), 1);
    assert_eq!(session.places()[0].key, PlaceKey::from_name("Soledad"));
    assert!(session.map().handle_for(&PlaceKey::from_name("Soledad")).is_some());
    assert!(session.map().handle_for(&PlaceKey::from_name("Malambo")).is_none());
    assert!(notifier.errors.lock().unwrap().is_empty());
}

#[test]
fn test_new_place_snapshot_reconciles_markers() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut session = session(Identity::new(1, 1), notifier);

    let t1 = session.begin_fetch(Dataset::Places);
    session.complete(
        Dataset::Places,
        t1,
        Ok(vec![
            json!({"MUNICIPIO": "Soledad", "TOTAL": 8}),
            json!({"MUNICIPIO": "Malambo", "TOTAL": 1}),
        ]),
    );
    let soledad = session.map().handle_for(&PlaceKey::from_name("Soledad")).unwrap();
    assert!(session.focus_place("soledad"));

    let t2 = session.begin_fetch(Dataset::Places);
    session.complete(
        Dataset::Places,
        t2,
        Ok(vec![
            json!({"MUNICIPIO": "SOLEDAD", "TOTAL": 9}),
            json!({"MUNICIPIO": "Malambo", "TOTAL": 0}),
        ]),
    );
    let report = session.last_reconcile();
    assert_eq!(report.removed, vec![PlaceKey::from_name("Malambo")]);
    assert_eq!(session.map().handle_for(&PlaceKey::from_name("Soledad")), Some(soledad));
    assert_eq!(session.map().surface().popup_handle(), Some(soledad));
    assert_eq!(session.listed_places().len(), 1);
}

#[tokio::test]
async fn test_filter_change_resets_page() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut session = session(Identity::new(1, 1), notifier);
    session.refresh(&FixedBackend::new()).await;

    assert_eq!(session.next_page().page_index(), 2);
    session.set_criteria(FilterCriteria {
        table_id: Some("1".to_string()),
        ..FilterCriteria::default()
    });
    let page = session.current_page();
    assert_eq!(page.page_index, 1);
    assert_eq!(page.filtered_count, 6);
}

#[tokio::test(start_paused = true)]
async fn test_debounced_typing_applies_last_query_only() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut session = session(Identity::new(1, 1), notifier);
    session.refresh(&FixedBackend::new()).await;

    let (mut debouncer, mut settled) = FilterDebouncer::channel(Duration::from_millis(300));
    for query in ["1", "10", "100", "1001"] {
        debouncer.submit(FilterCriteria {
            text_query: query.to_string(),
            ..FilterCriteria::default()
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let criteria = settled.recv().await.unwrap();
    assert_eq!(criteria.text_query, "1001");
    session.set_criteria(criteria);
    assert_eq!(session.current_page().filtered_count, 1);
    assert!(settled.try_recv().is_err());
}
