use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::UrgencyScale;

pub const DEFAULT_CONTROL_ADDR: &str = "127.0.0.1:7878";

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory holding `state.json` and `hidden.json` (default: $SPECTRUM_BUDDY_DATA_DIR).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one fetch cycle now.
    Fetch(PortalArgs),
    /// Poll on a schedule and serve the local control endpoint.
    Watch(WatchArgs),
    /// Ask a running `watch` daemon to refresh and wait for it.
    Refresh(RefreshArgs),
    /// Render the deadline panel from the stored snapshot.
    Show(ShowArgs),
    /// Print the badge for the stored snapshot.
    Badge,
    /// Hide one deadline by id.
    Hide(HideArgs),
    /// Clear the hidden set.
    UnhideAll,
    /// Scrape deadlines out of a saved dashboard page.
    ParseHtml(ParseHtmlArgs),
}

#[derive(Debug, Clone, Args)]
pub struct PortalArgs {
    /// Portal base URL (default: $SPECTRUM_BUDDY_PORTAL_URL).
    #[arg(long)]
    pub portal_url: Option<String>,

    /// Session `Cookie` header value (default: $SPECTRUM_BUDDY_SESSION_COOKIE).
    #[arg(long)]
    pub cookie: Option<String>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub portal: PortalArgs,

    /// Control endpoint address.
    #[arg(long, default_value = DEFAULT_CONTROL_ADDR)]
    pub addr: SocketAddr,

    /// Do not start the control endpoint.
    #[arg(long)]
    pub no_server: bool,

    /// Print the panel after every store change.
    #[arg(long)]
    pub render: bool,

    /// Minutes between cycles (default: $SPECTRUM_BUDDY_INTERVAL_MINUTES or 30).
    #[arg(long)]
    pub interval_minutes: Option<u64>,

    /// Minutes before the first periodic cycle (default: $SPECTRUM_BUDDY_INITIAL_DELAY_MINUTES or 1).
    #[arg(long)]
    pub initial_delay_minutes: Option<u64>,

    #[arg(long, value_enum)]
    pub scale: Option<UrgencyScale>,
}

#[derive(Debug, Args)]
pub struct RefreshArgs {
    /// Control endpoint address of the running daemon.
    #[arg(long, default_value = DEFAULT_CONTROL_ADDR)]
    pub addr: SocketAddr,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Print the panel as JSON.
    #[arg(long)]
    pub json: bool,

    /// Medium-urgency window (default: $SPECTRUM_BUDDY_URGENCY_SCALE or week).
    #[arg(long, value_enum)]
    pub scale: Option<UrgencyScale>,
}

#[derive(Debug, Args)]
pub struct HideArgs {
    #[arg(long)]
    pub id: String,
}

#[derive(Debug, Args)]
pub struct ParseHtmlArgs {
    /// Saved dashboard HTML.
    #[arg(long)]
    pub input: PathBuf,

    /// Origin used to resolve relative links (default: portal url).
    #[arg(long)]
    pub origin: Option<String>,
}
