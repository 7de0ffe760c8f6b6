//! `drivectl` — upload, download, and list Google Drive files from the
//! terminal.
//!
//! One invocation runs one operation: authenticate (stored credential,
//! refresh, or interactive consent), build the Drive client, dispatch.
//! Everything runs sequentially on a current-thread runtime.

mod args;
mod commands;
mod ui;

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use bridge_http::{HttpClient, ReqwestHttpClient};
use core_auth::{AuthFlow, ClientSecrets, CredentialStore, LoopbackListener, OAuthClient};
use provider_google_drive::{DriveClient, DRIVE_SCOPE};

use args::{Cli, Command};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new()?);

    let secrets = ClientSecrets::load(&cli.client_secret)?;
    let oauth = OAuthClient::new(secrets, vec![DRIVE_SCOPE.to_string()], http.clone());
    let store = CredentialStore::new(&cli.token_file);

    let mut flow = AuthFlow::new(store, oauth, Box::new(LoopbackListener::new()))
        .on_authorize_url(|url| {
            println!("Open this URL in your browser to authorize access:");
            println!();
            println!("  {}", url);
            println!();
            println!("Waiting for the consent to complete...");
        });
    if cli.non_interactive {
        flow = flow.non_interactive();
    }

    let credential = flow.obtain().await.context("authentication failed")?;
    let drive = DriveClient::new(http, credential.access_token.clone());

    match cli.command {
        Command::Upload(args) => commands::upload::run(&drive, args).await,
        Command::Download(args) => commands::download::run(&drive, args).await,
        Command::List(args) => commands::list::run(&drive, args).await,
    }
}
