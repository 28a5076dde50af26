/* src/main.rs */

mod cli;

use crate::cli::{Args, CascadeAction, CascadeArgs, Command, CreateArgs};
use clap::Parser;
use dotenvy::dotenv;
use fancy_log::{LogLevel, log, set_log_level};
use lazy_motd::lazy_motd;
use std::env;
use std::fs;
use std::sync::Arc;
use zone_tree::config::AppConfig;
use zone_tree::expansion::resolve_zone_ids;
use zone_tree::failover::FailoverStorage;
use zone_tree::file_store::FileStorage;
use zone_tree::inheritance::suggest_ancestor;
use zone_tree::{
    CascadeExecutor, CascadeOperation, CascadeScope, CascadeSelection, ExpansionStateStore,
    Hierarchy, InheritanceResolver, InheritanceToggles, ZoneDirectory, ZoneDraft, ZoneError,
    ZoneSnapshot, ZoneStorage,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // --- Initialization ---
    dotenv().ok();
    let args = Args::parse();
    let level = env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase();
    let log_level = match level.as_str() {
        "debug" => LogLevel::Debug,
        "warn" => LogLevel::Warn,
        "error" => LogLevel::Error,
        _ => LogLevel::Info,
    };
    set_log_level(log_level);
    lazy_motd!();

    // --- Load Config ---
    let config = match AppConfig::load_or_create_default() {
        Ok(cfg) => cfg,
        Err(e) => {
            log(LogLevel::Error, &format!("Failed to load config: {}", e));
            return Err(e.into());
        }
    };

    // --- Initialize Backends ---
    let primary: Arc<dyn ZoneStorage> = Arc::new(FileStorage::load_or_create(&config.zones_path)?);
    let fallback: Option<Arc<dyn ZoneStorage>> = match &config.fallback_zones_path {
        Some(path) => match FileStorage::open(path) {
            Ok(store) => Some(Arc::new(store) as Arc<dyn ZoneStorage>),
            Err(e) => {
                log(
                    LogLevel::Warn,
                    &format!("Fallback zone file {:?} unusable: {}", path, e),
                );
                None
            }
        },
        None => None,
    };
    let storage = FailoverStorage::new(primary, fallback);
    storage.check_now().await;
    let health_task = storage.start_health_task(config.health_check_interval);

    let prefs = ExpansionStateStore::open(&config.preferences_path);

    let outcome = match args.command {
        Command::Tree { all, json } => print_tree(&storage, &prefs, all, json).await,
        Command::Expand { zones } => set_expansion(&storage, &prefs, &zones, true).await,
        Command::Collapse { zone } => set_expansion(&storage, &prefs, &[zone], false).await,
        Command::ExpandAll => expand_all(&storage, &prefs).await,
        Command::CollapseAll => prefs.collapse_all(),
        Command::Cascade(cascade) => run_cascade(&storage, cascade).await,
        Command::Create(create) => create_zone(&storage, create).await,
        Command::Status => {
            let status = storage.status();
            println!(
                "active backend: {} (checked {})",
                status.active,
                status
                    .last_checked
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string())
            );
            Ok(())
        }
    };

    health_task.abort();
    if let Err(e) = &outcome {
        log(LogLevel::Error, &e.to_string());
    }
    Ok(outcome?)
}

async fn print_tree(
    storage: &dyn ZoneStorage,
    prefs: &ExpansionStateStore,
    all: bool,
    json: bool,
) -> zone_tree::Result<()> {
    let snapshot = ZoneSnapshot::load(storage).await?;
    let hierarchy = Hierarchy::from_directory(&snapshot);
    let rows = hierarchy.view(&prefs.state());

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let flat = !prefs.hierarchy_view();
    for row in rows.iter().filter(|r| all || flat || r.is_visible) {
        let indent = if flat { 0 } else { row.level * 2 };
        let marker = match (row.child_count, row.is_expanded || all) {
            (0, _) => "  ".to_string(),
            (_, true) => "- ".to_string(),
            (n, false) => format!("+ ({n}) "),
        };
        println!("{:indent$}{}{}", "", marker, row.name, indent = indent);
    }
    Ok(())
}

async fn set_expansion(
    storage: &dyn ZoneStorage,
    prefs: &ExpansionStateStore,
    names: &[String],
    expanded: bool,
) -> zone_tree::Result<()> {
    let snapshot = ZoneSnapshot::load(storage).await?;
    for id in resolve_zone_ids(&snapshot, names) {
        prefs.set_expansion(&id, expanded)?;
    }
    Ok(())
}

async fn expand_all(storage: &dyn ZoneStorage, prefs: &ExpansionStateStore) -> zone_tree::Result<()> {
    let snapshot = ZoneSnapshot::load(storage).await?;
    let hierarchy = Hierarchy::from_directory(&snapshot);
    prefs.expand_all(hierarchy.parent_ids())
}

async fn run_cascade(storage: &dyn ZoneStorage, args: CascadeArgs) -> zone_tree::Result<()> {
    let scope = if args.descendants {
        CascadeScope::SelfAndDescendants
    } else {
        CascadeScope::SelfOnly
    };
    let (operation, out) = match args.action {
        CascadeAction::Delete => (CascadeOperation::Delete, None),
        CascadeAction::Export { out } => (CascadeOperation::Export, out),
        CascadeAction::SetNs { nameservers } => {
            (CascadeOperation::ReplaceNameservers(nameservers), None)
        }
    };

    let snapshot = ZoneSnapshot::load(storage).await?;
    let selection = CascadeSelection::select(&snapshot, &args.zone, scope)?;
    log(
        LogLevel::Info,
        &format!(
            "Running {} on {} zone(s) starting at {}",
            operation,
            selection.len(),
            selection.root_id
        ),
    );

    let report = CascadeExecutor::new(storage)
        .execute_with_progress(&operation, &selection.ids, |p| {
            log(
                LogLevel::Info,
                &format!("Progress {}/{}", p.completed, p.total),
            );
        })
        .await;

    if operation == CascadeOperation::Export {
        let exported = serde_json::to_string_pretty(&report.exported)?;
        match out {
            Some(path) => fs::write(path, exported)?,
            None => println!("{exported}"),
        }
    }
    for item in &report.failed_items {
        eprintln!("failed: {} ({})", item.id, item.error);
    }
    eprintln!(
        "{} succeeded, {} failed",
        report.succeeded_ids.len(),
        report.failed_items.len()
    );
    report.into_result().map(|_| ())
}

async fn create_zone(storage: &dyn ZoneStorage, args: CreateArgs) -> zone_tree::Result<()> {
    let snapshot = ZoneSnapshot::load(storage).await?;
    if snapshot.get_by_name(&args.name).is_some() {
        return Err(ZoneError::validation(format!(
            "zone {} already exists",
            args.name
        )));
    }

    let mut draft = ZoneDraft::new(&args.name);
    draft.nameservers = args.nameservers.clone();

    let ancestor_id = match (&args.inherit_from, args.auto_inherit) {
        (Some(id), _) => Some(id.clone()),
        (None, true) => suggest_ancestor(&args.name, &snapshot).map(|z| z.id.clone()),
        (None, false) => None,
    };

    if let Some(ancestor_id) = ancestor_id {
        let mut toggles = InheritanceToggles {
            nameservers: args.ns,
            soa: args.soa,
            ttl: args.ttl,
        };
        if !toggles.any() {
            toggles = InheritanceToggles {
                nameservers: args.nameservers.is_empty(),
                ..InheritanceToggles::all()
            };
        }
        let prefill = InheritanceResolver::new(storage)
            .prefill(&draft, &ancestor_id, toggles)
            .await;
        if let Some(e) = &prefill.error {
            eprintln!("not inheriting from {ancestor_id}: {e}");
        }
        draft = prefill.draft;
    }

    let zone = storage.create_zone(draft.into_spec()?).await?;
    println!(
        "created {} ({} records, nameservers: {})",
        zone.name,
        zone.record_count,
        zone.nameservers.join(", ")
    );
    Ok(())
}
