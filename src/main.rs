use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

use spectrum_buddy::cli::{Cli, Command};
use spectrum_buddy::commands;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    spectrum_buddy::logging::init().context("init logging")?;

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed cli");
    let data_dir = cli.data_dir;

    match cli.command {
        Command::Fetch(args) => commands::fetch(data_dir, args).await.context("fetch")?,
        Command::Watch(args) => commands::watch(data_dir, args).await.context("watch")?,
        Command::Refresh(args) => commands::refresh(args).await.context("refresh")?,
        Command::Show(args) => commands::show(data_dir, args).await.context("show")?,
        Command::Badge => commands::badge(data_dir).await.context("badge")?,
        Command::Hide(args) => commands::hide(data_dir, args).await.context("hide")?,
        Command::UnhideAll => commands::unhide_all(data_dir).await.context("unhide-all")?,
        Command::ParseHtml(args) => commands::parse_html(args).context("parse-html")?,
    }

    Ok(())
}
