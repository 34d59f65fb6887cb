// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! fit-upload
//!
//! Uploads every `.fit` file in a resources directory to Strava, skipping
//! files recorded as delivered by earlier runs.
//!
//! Exit codes: 0 when the batch ran to the end (even if some files failed),
//! 1 on a fatal condition or a rate-limit halt, 2 on invalid arguments.

mod console;
mod credentials;

use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use fit_uploader::{
    ActivityType, BatchOrchestrator, LedgerOrigin, RunSummary, StravaGateway, UploadError,
    UploadLedger, UploaderConfig,
};

use console::{ConsoleReporter, render_summary};
use credentials::{CredentialStore, DEFAULT_CREDENTIALS_FILE, TokenSource};

#[derive(Debug, Parser)]
#[command(name = "fit-upload", version)]
#[command(about = "Upload FIT activity files to Strava, each file at most once")]
struct Args {
    /// Directory scanned for .fit files
    #[arg(long)]
    resources: Option<PathBuf>,

    /// Ledger of already uploaded files
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Credential file holding the access token
    #[arg(long, env = "FIT_UPLOADER_CREDENTIALS", default_value = DEFAULT_CREDENTIALS_FILE)]
    credentials: PathBuf,

    /// Strava API base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Activity type sent with every upload (default: detected from the file)
    #[arg(long, value_parser = ActivityType::from_str)]
    activity_type: Option<ActivityType>,

    /// Access token; takes precedence over the credential file
    #[arg(long, env = "STRAVA_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Log engine activity at info level
    #[arg(short, long)]
    verbose: bool,

    /// Fail instead of asking for a missing access token
    #[arg(long)]
    no_prompt: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "fit_uploader=info,fit_upload=info"
    } else {
        "fit_uploader=warn,fit_upload=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn prompt_for_token() -> std::io::Result<String> {
    println!("No access token found. Please enter your Strava access token:");
    rpassword::prompt_password("Access token: ")
}

fn build_config(args: &Args) -> anyhow::Result<UploaderConfig> {
    let mut config = UploaderConfig::from_env()?;
    if let Some(dir) = &args.resources {
        config = config.with_resources_dir(dir);
    }
    if let Some(path) = &args.ledger {
        config = config.with_ledger_path(path);
    }
    if let Some(url) = &args.api_url {
        config = config.with_api_url(url);
    }
    if args.activity_type.is_some() {
        config = config.with_activity_type(args.activity_type);
    }
    Ok(config)
}

async fn run(args: Args) -> anyhow::Result<RunSummary> {
    let mut config = build_config(&args)?;

    let mut store = CredentialStore::load(&args.credentials);
    let prompt = (!args.no_prompt).then_some(prompt_for_token);
    let (token, source) = store.resolve_token(args.access_token.as_deref(), prompt)?;
    match source {
        TokenSource::Prompt => {
            println!("Access token saved to: {}\n", store.path().display());
        }
        TokenSource::File => {
            println!("Access token loaded successfully.");
            println!("Config location: {}\n", store.path().display());
        }
        TokenSource::Environment => info!("Using access token from environment"),
    }
    if config.activity_type.is_none() {
        config = config.with_activity_type(store.activity_type());
    }

    let ledger = UploadLedger::open(&config.ledger_path);
    match ledger.origin() {
        LedgerOrigin::Created => {
            println!("Created upload tracker at: {}\n", ledger.path().display());
        }
        LedgerOrigin::Loaded => {
            println!(
                "Loaded {} previously uploaded files from tracker.",
                ledger.count()
            );
            println!("Tracker location: {}\n", ledger.path().display());
        }
        LedgerOrigin::Recovered => {
            println!(
                "Warning: Could not load upload tracker at {}, starting empty\n",
                ledger.path().display()
            );
        }
    }

    let gateway = StravaGateway::new(&config, &token)?;
    info!(
        api_url = gateway.base_url(),
        resources = %config.resources_dir.display(),
        ledger = %config.ledger_path.display(),
        "Starting upload run"
    );

    println!("Validating Strava access token...");
    let mut orchestrator = BatchOrchestrator::new(
        config,
        Arc::new(gateway),
        ledger,
        Arc::new(ConsoleReporter::stdout()),
    );
    let summary = orchestrator.run().await?;
    Ok(summary)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Loaded before logging so RUST_LOG may come from .env.
    let dotenv = dotenvy::dotenv();
    let args = Args::parse();
    init_tracing(args.verbose);
    if let Err(e) = dotenv {
        info!("No .env file loaded: {}", e);
    }

    println!("=== Strava Uploader ===\n");

    match run(args).await {
        Ok(summary) => {
            println!("{}", render_summary(&summary));
            if summary.halted {
                warn!("Batch halted before all files were attempted");
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            if let Some(UploadError::Unauthorized) = e.downcast_ref::<UploadError>() {
                eprintln!("Token validation failed. Please check your access token and try again.");
                eprintln!("Make sure your token has 'activity:write' scope.");
            }
            error!(error = %e, "Fatal error");
            eprintln!("Fatal error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "fit-upload",
            "--resources",
            "/data/rides",
            "--ledger",
            "/data/ledger.json",
            "--api-url",
            "http://localhost:9000/",
            "--activity-type",
            "ride",
        ])
        .unwrap();

        let config = build_config(&args).unwrap();
        assert_eq!(config.resources_dir, PathBuf::from("/data/rides"));
        assert_eq!(config.ledger_path, PathBuf::from("/data/ledger.json"));
        assert_eq!(config.api_url, "http://localhost:9000");
        assert_eq!(config.activity_type, Some(ActivityType::Ride));
    }

    #[test]
    fn test_invalid_activity_type_is_usage_error() {
        let err = Args::try_parse_from(["fit-upload", "--activity-type", "jetpack"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_default_credentials_file() {
        let args = Args::try_parse_from(["fit-upload", "--no-prompt"]).unwrap();
        assert!(args.no_prompt);
        assert!(!args.verbose);
        if std::env::var_os("FIT_UPLOADER_CREDENTIALS").is_none() {
            assert_eq!(args.credentials, PathBuf::from(DEFAULT_CREDENTIALS_FILE));
        }
    }
}
