use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use roster_sync::app::ports::IdentityPort;
use roster_sync::app::search_debounce::FilterDebouncer;
use roster_sync::app::session::{Dataset, FetchOutcome, Session};
use roster_sync::config::{Config, DEFAULT_CONFIG_PATH};
use roster_sync::constants::RECENT_ENTRIES_LIMIT;
use roster_sync::gazetteer::Gazetteer;
use roster_sync::infra::backend_adapter::HttpBackend;
use roster_sync::infra::http_client::ReqwestHttp;
use roster_sync::infra::identity_adapter::StaticIdentity;
use roster_sync::infra::map_surface::InMemoryMap;
use roster_sync::infra::notifier::LogNotifier;
use roster_sync::map_sync::MapSyncController;
use roster_sync::observability::{init_logging, metrics};
use roster_sync::types::{Coordinate, FilterCriteria, Identity};

#[derive(Parser)]
#[command(name = "roster_sync")]
#[command(about = "Place reconciliation and voter roster views")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Subject id of the already-authenticated caller
    #[arg(long, global = true, default_value_t = 1)]
    subject_id: i64,

    /// Role code of the caller (1 = administrator)
    #[arg(long, global = true, default_value_t = 1)]
    role: i64,

    /// Print Prometheus metrics after the command finishes
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List municipalities with voters and place their map markers
    Places {
        /// Center the map on this municipality (any spelling)
        #[arg(long)]
        focus: Option<String>,
    },
    /// Show one page of the filtered voter roster
    Roster {
        #[command(flatten)]
        filters: FilterArgs,
        /// 1-based page number (clamped to the available pages)
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Also list the most recent entries
        #[arg(long)]
        recent: bool,
    },
    /// Write the filtered roster grouped by assigned user as JSON
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        /// Output file (defaults to reporte_votantes_<date>.json)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Clone, Default)]
struct FilterArgs {
    /// Document number substring or case-insensitive name fragment
    #[arg(long)]
    query: Option<String>,
    /// Zone id
    #[arg(long)]
    zone: Option<i64>,
    /// Assigned user id (administrators only)
    #[arg(long)]
    user: Option<i64>,
    /// Exact table (mesa) id
    #[arg(long)]
    table: Option<String>,
}

impl From<FilterArgs> for FilterCriteria {
    fn from(args: FilterArgs) -> Self {
        FilterCriteria {
            text_query: args.query.unwrap_or_default(),
            zone_id: args.zone,
            user_id: args.user,
            table_id: args.table,
        }
    }
}

/// Push the criteria through the debouncer the way typed input would arrive.
async fn settle_criteria(criteria: FilterCriteria, window: Duration) -> Result<FilterCriteria> {
    let (mut debouncer, mut settled) = FilterDebouncer::channel(window);
    debouncer.submit(criteria);
    settled
        .recv()
        .await
        .context("Filter debouncer closed before delivering criteria")
}

fn report_fetches(outcomes: &[(Dataset, FetchOutcome)]) {
    for (dataset, outcome) in outcomes {
        match outcome {
            FetchOutcome::Installed { accepted, rejected } => {
                info!("{}: {} rows loaded", dataset, accepted);
                if !rejected.is_empty() {
                    println!("⚠️  {}: {} malformed rows skipped", dataset, rejected.len());
                    for issue in rejected {
                        println!("   - row {}: {}", issue.index, issue.description);
                    }
                }
            }
            FetchOutcome::Stale => info!("{}: stale response discarded", dataset),
            FetchOutcome::Failed { message } => {
                println!("❌ {} could not be loaded: {}", dataset, message);
            }
        }
    }
}

fn print_places(session: &Session<InMemoryMap>) {
    let summary = session.place_summary();
    println!("\n📍 Municipalities with voters: {}", summary.listed_places);
    println!("   Total voters: {}", summary.total_voters);
    println!(
        "   With leader: {} / without leader: {} ({:.1}% coverage)",
        summary.places_with_leader,
        summary.places_without_leader,
        summary.leader_coverage_pct()
    );
    println!();
    for place in session.listed_places() {
        let (marker, position) = match session.map().coordinate_for(&place.key) {
            Some(c) => ("📌", format!("({:.4}, {:.4})", c.latitude, c.longitude)),
            None => ("  ", String::new()),
        };
        println!(
            "{} {:<28} {:<16} {:>6}  {:<24} {}",
            marker,
            place.display_name,
            place.department_name,
            place.total_voters,
            place.leader_name.as_deref().unwrap_or("-"),
            position
        );
    }

    let reconcile = session.last_reconcile();
    println!(
        "\n🗺️  Markers: {} on map ({} added, {} removed)",
        session.map().marker_count(),
        reconcile.added.len(),
        reconcile.removed.len()
    );
    if !reconcile.unresolved.is_empty() {
        let names: Vec<&str> = reconcile.unresolved.iter().map(|k| k.as_str()).collect();
        println!("   Without coordinates: {}", names.join(", "));
    }
}

fn print_roster(session: &Session<InMemoryMap>, recent: bool) {
    let view = session.current_page();
    println!(
        "\n🗳️  Voters: {} matching, page {}/{}",
        view.filtered_count,
        view.page_index,
        view.total_pages.max(1)
    );
    for voter in &view.items {
        println!(
            "   {:<12} {:<32} mesa {:<4} {:<16} {}",
            voter.doc_id, voter.full_name, voter.table_id, voter.zone_name, voter.assigned_user_name
        );
    }

    let summary = session.roster_summary();
    println!(
        "\n   Tables: {}  Zones: {}  Users: {}  Precincts: {}  Polling places: {}",
        summary.distinct_tables,
        summary.distinct_zones,
        summary.distinct_users,
        summary.distinct_precincts,
        summary.distinct_polling_places
    );

    if session.identity().is_elevated() {
        let facets = session.user_facets();
        if !facets.is_empty() {
            let names: Vec<String> = facets.iter().map(|f| format!("{} ({})", f.name, f.id)).collect();
            println!("   Users with voters: {}", names.join(", "));
        }
    }

    if recent {
        println!("\n🕒 Latest entries:");
        for voter in session.recent_entries(RECENT_ENTRIES_LIMIT) {
            println!("   {:<20} {:<12} {}", voter.created_at, voter.doc_id, voter.full_name);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let cli = Cli::parse();

    if cli.metrics {
        metrics::init()?;
    }

    let config = Config::load_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    let gazetteer = match &config.map.gazetteer_path {
        Some(path) => Gazetteer::load(path)?,
        None => Gazetteer::builtin()?,
    };

    let identity_port = StaticIdentity::new(Identity::new(cli.subject_id, cli.role));
    let identity = identity_port
        .current_identity()
        .context("No authenticated identity available")?;

    let [lat, lon] = config.map.initial_center;
    let surface = InMemoryMap::with_view(Coordinate::new(lat, lon), config.map.initial_zoom);
    let map = MapSyncController::new(surface, Arc::new(gazetteer), config.map.focus_zoom);
    let mut session = Session::new(identity, map, Arc::new(LogNotifier));

    let backend = HttpBackend::new(config.backend.clone(), Box::new(ReqwestHttp::new()));
    let outcomes = session.refresh(&backend).await;
    report_fetches(&outcomes);

    match cli.command {
        Commands::Places { focus } => {
            print_places(&session);
            if let Some(name) = focus {
                if session.focus_place(&name) {
                    if let Some((center, zoom)) = session.map().surface().view() {
                        println!(
                            "\n🔎 Focused {} at ({:.4}, {:.4}) zoom {}",
                            name, center.latitude, center.longitude, zoom
                        );
                    }
                } else {
                    println!("\n⚠️  No coordinates known for {}", name);
                }
            }
        }
        Commands::Roster {
            filters,
            page,
            recent,
        } => {
            let window = Duration::from_millis(config.roster.search_debounce_ms);
            let criteria = settle_criteria(filters.into(), window).await?;
            if criteria.user_id.is_some() && !session.identity().is_elevated() {
                warn!("User filter ignored for non-administrator caller");
            }
            session.set_criteria(criteria);
            session.go_to_page(page);
            print_roster(&session, recent);
        }
        Commands::Export { filters, output } => {
            let window = Duration::from_millis(config.roster.search_debounce_ms);
            let criteria = settle_criteria(filters.into(), window).await?;
            session.set_criteria(criteria);
            let report = session.export();
            let path = output.unwrap_or_else(|| PathBuf::from(report.file_name()));
            let json = serde_json::to_string_pretty(&report)?;
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write export to {}", path.display()))?;
            println!("\n📄 Exported {} voters to {}", report.total, path.display());
            for group in &report.groups {
                println!("   {}", group.heading());
            }
        }
    }

    if cli.metrics {
        if let Some(rendered) = metrics::render() {
            println!("\n{}", rendered);
        }
    }

    Ok(())
}
