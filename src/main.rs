//! Hazard Map console client
//!
//! Line-oriented front end over `HazardApp`: sign in, pick a placement mode,
//! click the map by coordinates, submit and triage reports.

use anyhow::{Context, Result};
use chrono::Duration;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{info, warn};

use hazard_map::identity::InMemoryIdentityService;
use hazard_map::interaction::{ClickOutcome, MarkerRoute};
use hazard_map::lifecycle::Submission;
use hazard_map::map::RecordingMap;
use hazard_map::session::Credentials;
use hazard_map::store::SqliteReportStore;
use hazard_map::{telemetry, HazardApp, HazardConfig, Location, Report, ReportKind, ReportView};

const HELP: &str = "\
Commands:
  login <id> <secret> [remember]   sign in as staff
  logout | whoami
  mode <kind|none>                 kinds: debris_rubble organic_waste overgrown_vegetation dry_vegetation unknown
  click <lat> <lng>                click the map
  submit <draft> <priority|-> <description...>
  cancel <draft> | drafts
  list | reload
  marker <report>                  click a marker
  ack <report> | complete <report> | remove <report>
  goto <lat> <lng> [label] | locate
  quit";

// ──────────────────────────────────────────────────────────────────────────────
// MAIN ENTRY POINT
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();
    let config = HazardConfig::from_env();

    println!("\n{}", "═".repeat(60));
    println!("🗺️  Hazard Map v0.2.0");
    println!("{}\n", "═".repeat(60));

    let identity = Arc::new(InMemoryIdentityService::new(Duration::seconds(config.session_ttl_secs)));
    let seeded = identity.seed(&config.seed_accounts).await;
    if seeded == 0 {
        warn!("No staff accounts configured; set HAZARD_SEED_ACCOUNTS to enable sign-in");
    }

    let store = Arc::new(
        SqliteReportStore::new(&config.db_path)
            .await
            .with_context(|| format!("Failed to open report store at {:?}", config.db_path))?,
    );
    let map = Arc::new(RecordingMap::new());
    let app = HazardApp::new(&config, identity, store, map, None).await;

    match app.start().await {
        Ok(Some(principal)) => println!("💾 Session restored: {} ({})", principal.display_name, principal.role),
        Ok(None) => println!("👀 Public map"),
        Err(e) => println!("⚠️  {}", e.user_message()),
    }
    println!("📍 {} reports on the map\n", app.registry().len().await);
    println!("{}\n", HELP);

    loop {
        print!("🗺️  > ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let words: Vec<&str> = input.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            continue;
        };

        if matches!(command, "quit" | "exit" | "q") {
            println!("\n👋 Goodbye!\n");
            break;
        }
        if let Err(e) = dispatch(&app, command, args).await {
            println!("❌ {}", e);
        }
    }

    Ok(())
}

async fn dispatch(app: &HazardApp, command: &str, args: &[&str]) -> Result<()> {
    let principal = app.current().await;
    match (command, args) {
        ("help", _) => println!("{}", HELP),
        ("login", [id, secret, rest @ ..]) => {
            let mut credentials = Credentials::new(*id, *secret);
            if rest.first() == Some(&"remember") {
                credentials = credentials.remembered();
            }
            match app.sign_in(&credentials).await {
                Ok(p) => println!("✅ Signed in as {} ({})", p.display_name, p.role),
                Err(e) => println!("⛔ {}", e.user_message()),
            }
        }
        ("logout", _) => {
            app.sign_out().await;
            println!("👋 Signed out");
        }
        ("whoami", _) => match principal {
            Some(p) => println!("{} <{}> {}", p.display_name, p.id, p.role),
            None => println!("anonymous (citizen)"),
        },
        ("mode", [kind]) => {
            let mode = if *kind == "none" { None } else { Some(kind.parse::<ReportKind>().map_err(anyhow::Error::msg)?) };
            if app.interaction().set_mode(mode).await {
                println!("🎯 Placement mode: {}", mode.map_or("none".to_string(), |k| k.glyph().label.to_string()));
            } else {
                println!("ℹ️  Sign in as staff to place reports");
            }
        }
        ("click", [lat, lng]) => {
            let location = parse_location(lat, lng)?;
            match app.interaction().on_map_click(location).await {
                Ok(ClickOutcome::DraftOpened(draft)) => {
                    println!("📝 Draft {} ({}) at {}", draft.id, draft.kind.glyph().label, draft.location);
                    println!("   submit {} <priority|-> <description...>", draft.id);
                }
                Ok(ClickOutcome::Ignored) => println!("(click ignored)"),
                Err(e) => println!("⛔ {}", e.user_message()),
            }
        }
        ("submit", [draft_id, priority, description @ ..]) => {
            let mut submission = Submission::new(description.join(" "));
            if *priority != "-" {
                submission = submission.with_priority(*priority);
            }
            match app.controller().submit(draft_id, submission).await {
                Ok(report) => {
                    println!("✅ Report submitted");
                    print_report(&report);
                }
                Err(e) => println!("⛔ {}", e.user_message()),
            }
        }
        ("cancel", [draft_id]) => {
            if app.controller().abandon(draft_id).await {
                println!("🗑️  Draft discarded");
            } else {
                println!("No such draft");
            }
        }
        ("drafts", _) => {
            for draft in app.controller().drafts().await {
                println!("{}  {} {}", draft.id, draft.kind.glyph().icon, draft.location);
            }
        }
        ("list", _) => {
            let role = hazard_map::model::role_of(principal.as_ref());
            for report in app.registry().reports().await {
                print_view(&ReportView::for_role(&report, role));
            }
        }
        ("reload", _) => {
            let count = app.reload().await?;
            println!("📍 {} reports on the map", count);
        }
        ("marker", [report_id]) => match app.interaction().on_marker_click(report_id).await? {
            MarkerRoute::Triage { view, actions } => {
                print_view(&view);
                let names: Vec<String> = actions.iter().map(|a| format!("{:?}", a).to_lowercase()).collect();
                println!("   actions: {}", names.join(", "));
            }
            MarkerRoute::ReadOnly(view) => print_view(&view),
        },
        ("ack", [report_id]) => {
            let report = app.controller().acknowledge(report_id, principal.as_ref()).await?;
            print_report(&report);
        }
        ("complete", [report_id]) => {
            let report = app.controller().complete(report_id, principal.as_ref()).await?;
            print_report(&report);
        }
        ("remove", [report_id]) => {
            app.controller().remove(report_id, principal.as_ref()).await?;
            println!("🗑️  Report removed");
        }
        ("goto", [lat, lng, label @ ..]) => {
            let location = parse_location(lat, lng)?;
            let label = if label.is_empty() { "destination".to_string() } else { label.join(" ") };
            app.interaction().go_to(location, &label).await?;
            println!("📍 {}", label);
        }
        ("locate", _) => {
            let fix = app.interaction().locate().await?;
            println!("📍 You are at {} (±{:.0} m)", fix.location, fix.accuracy_m);
        }
        _ => println!("Unknown command. Type 'help'."),
    }
    info!("Handled '{}'", command);
    Ok(())
}

fn parse_location(lat: &str, lng: &str) -> Result<Location> {
    let location = Location::new(
        lat.parse().context("latitude must be a number")?,
        lng.parse().context("longitude must be a number")?,
    );
    anyhow::ensure!(location.is_valid(), "{} is outside the map", location);
    Ok(location)
}

fn print_report(report: &Report) {
    print_view(&ReportView::Full(report.clone()));
}

fn print_view(view: &ReportView) {
    match view {
        ReportView::Public { id, kind, status, created_at } => {
            println!("{} {}  {}  {}  {}", kind.glyph().icon, id, kind.glyph().label, status, created_at.format("%Y-%m-%d %H:%M"));
        }
        ReportView::Full(report) => {
            let glyph = report.glyph();
            println!(
                "{} {}  {}  {}  {}  by {}",
                glyph.icon,
                report.id,
                glyph.label,
                report.status,
                report.created_at.format("%Y-%m-%d %H:%M"),
                report.created_by
            );
            println!(
                "   {} | priority: {} | {}",
                report.description,
                report.priority.as_deref().unwrap_or("-"),
                report.location
            );
            if let Some(photo) = &report.photo_ref {
                println!("   photo: {}", photo);
            }
        }
    }
}
