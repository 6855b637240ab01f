use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use chrono::Utc;

use crate::app::control::{self, ControlState};
use crate::app::cycle::{CycleReport, FetchCycle};
use crate::app::follow;
use crate::app::store::{LocalFsStore, SnapshotStore};
use crate::cli::{HideArgs, ParseHtmlArgs, PortalArgs, RefreshArgs, ShowArgs, WatchArgs};
use crate::config::{self, PortalConfig, ScheduleConfig, UrgencyScale};
use crate::portal::PortalClient;
use crate::{badge, panel, scrape};

fn open_store(data_dir: Option<PathBuf>) -> Arc<LocalFsStore> {
    let dir = data_dir.unwrap_or_else(config::data_dir_from_env);
    tracing::debug!(data_dir = %dir.display(), "using local store");
    Arc::new(LocalFsStore::new(dir))
}

fn portal_config(args: &PortalArgs) -> anyhow::Result<PortalConfig> {
    let mut portal = PortalConfig::from_env()?;
    if let Some(raw) = args.portal_url.as_deref() {
        portal.base_url = config::parse_portal_url(raw).context("parse --portal-url")?;
    }
    if let Some(cookie) = args.cookie.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        portal.session_cookie = Some(cookie.to_owned());
    }
    if portal.session_cookie.is_none() {
        tracing::warn!("no session cookie configured; the portal will likely ask for login");
    }
    Ok(portal)
}

fn scale_or_env(scale: Option<UrgencyScale>) -> anyhow::Result<UrgencyScale> {
    match scale {
        Some(scale) => Ok(scale),
        None => UrgencyScale::from_env(),
    }
}

fn print_report(report: &CycleReport) {
    println!("status: {}", report.status);
    println!("badge: {}", report.badge);
    println!(
        "deadlines: {} (urgent: {})",
        report.deadline_count, report.urgent_count
    );
    if let Some(error) = report.error.as_deref() {
        println!("error: {error}");
    }
}

pub async fn fetch(data_dir: Option<PathBuf>, args: PortalArgs) -> anyhow::Result<()> {
    let client = PortalClient::new(portal_config(&args)?)?;
    let cycle = FetchCycle::new(client, open_store(data_dir));
    let report = cycle.trigger("manual").await?;
    print_report(&report);
    Ok(())
}

pub async fn watch(data_dir: Option<PathBuf>, args: WatchArgs) -> anyhow::Result<()> {
    let portal = portal_config(&args.portal)?;
    let portal_url = portal.base_url.to_string();
    let mut schedule = ScheduleConfig::from_env()?;
    if let Some(minutes) = args.interval_minutes {
        if minutes == 0 {
            anyhow::bail!("--interval-minutes must be at least 1");
        }
        schedule.interval =
            config::minutes_to_duration(minutes).context("invalid --interval-minutes")?;
    }
    if let Some(minutes) = args.initial_delay_minutes {
        schedule.initial_delay =
            config::minutes_to_duration(minutes).context("invalid --initial-delay-minutes")?;
    }
    let scale = scale_or_env(args.scale)?;

    let store: Arc<dyn SnapshotStore> = open_store(data_dir);
    let cycle = Arc::new(FetchCycle::new(PortalClient::new(portal)?, Arc::clone(&store)));

    if args.render {
        tokio::spawn(follow::follow_panel(Arc::clone(&store), scale, portal_url));
    }

    if !args.no_server {
        let state = ControlState {
            cycle: Arc::clone(&cycle),
            scale,
        };
        let addr = args.addr;
        tokio::spawn(async move {
            if let Err(err) = control::serve(addr, state, shutdown_signal()).await {
                tracing::error!(?err, "control endpoint stopped");
            }
        });
    }

    crate::app::scheduler::run(cycle, schedule, shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(?err, "listen for ctrl-c failed");
        std::future::pending::<()>().await;
    }
}

pub async fn refresh(args: RefreshArgs) -> anyhow::Result<()> {
    let url = format!("http://{}/refresh", args.addr);
    let response = reqwest::Client::new()
        .post(&url)
        .send()
        .await
        .with_context(|| format!("POST {url}"))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("refresh failed ({status}): {body}");
    }
    let ack: serde_json::Value = response
        .json()
        .await
        .context("parse refresh acknowledgement")?;
    let report = &ack["report"];
    println!("status: {}", report["status"].as_str().unwrap_or("UNKNOWN"));
    println!(
        "badge: {}",
        report["badge"]["text"].as_str().unwrap_or_default()
    );
    println!(
        "deadlines: {} (urgent: {})",
        report["deadlineCount"], report["urgentCount"]
    );
    if let Some(error) = report["error"].as_str() {
        println!("error: {error}");
    }
    Ok(())
}

pub async fn show(data_dir: Option<PathBuf>, args: ShowArgs) -> anyhow::Result<()> {
    let store = open_store(data_dir);
    let scale = scale_or_env(args.scale)?;
    let view = follow::load_view(store.as_ref(), scale).await?;
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&view).context("serialize panel")?
        );
    } else {
        let portal = PortalConfig::from_env()?;
        let text = panel::render_text(&view, portal.base_url.as_str()).context("render panel")?;
        print!("{text}");
    }
    Ok(())
}

pub async fn badge(data_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let snapshot = open_store(data_dir).load_snapshot().await?;
    println!("{}", badge::from_snapshot(&snapshot, Utc::now()));
    Ok(())
}

pub async fn hide(data_dir: Option<PathBuf>, args: HideArgs) -> anyhow::Result<()> {
    let id = args.id.trim();
    if id.is_empty() {
        anyhow::bail!("--id must not be empty");
    }
    let hidden = open_store(data_dir).hide(id).await?;
    println!("hidden: {}", hidden.len());
    Ok(())
}

pub async fn unhide_all(data_dir: Option<PathBuf>) -> anyhow::Result<()> {
    open_store(data_dir).clear_hidden().await?;
    println!("hidden: 0");
    Ok(())
}

pub fn parse_html(args: ParseHtmlArgs) -> anyhow::Result<()> {
    let html = std::fs::read_to_string(&args.input)
        .with_context(|| format!("read html: {}", args.input.display()))?;
    let origin = match args.origin.as_deref() {
        Some(raw) => config::parse_portal_url(raw)
            .context("parse --origin")?
            .origin()
            .ascii_serialization(),
        None => PortalConfig::from_env()?.origin(),
    };
    let deadlines = scrape::scrape_deadlines(&html, &origin, Utc::now());
    tracing::info!(count = deadlines.len(), "scraped deadlines");
    println!(
        "{}",
        serde_json::to_string_pretty(&deadlines).context("serialize deadlines")?
    );
    Ok(())
}
