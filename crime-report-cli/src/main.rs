//! crime-report: command-line front-end for the crime report client
//!
//! Connects to a wallet provider over JSON-RPC, or to an in-memory devnet
//! with `--devnet`, and runs one command.

mod args;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crime_report::dashboard::{display_description, display_location};
use crime_report::mock::{Devnet, MockWallet};
use crime_report::{
    authenticate, load_dashboard, submit_report, Address, ClientConfig, Dashboard, Media, Report,
    ReportClient, ReportDraft,
};

use args::{Args, Command};

/// Registry owner on the devnet.
const DEVNET_OWNER: Address = Address::from_bytes([
    0xf3, 0x9f, 0xd6, 0xe5, 0x1a, 0xad, 0x88, 0xf6, 0xf4, 0xce, 0x6a, 0xb8, 0x82, 0x72, 0x79, 0xcf,
    0xff, 0xb9, 0x22, 0x66,
]);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("crime_report={},crime_report_cli={}", args.log_level, args.log_level)
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let client = build_client(&args)?;
    run(&client, args.command).await
}

fn build_client(args: &Args) -> anyhow::Result<ReportClient> {
    if args.devnet {
        let account = args.devnet_account.unwrap_or(DEVNET_OWNER);
        info!(owner = %DEVNET_OWNER, %account, "Using in-memory devnet");
        let devnet = Devnet::with_wallet(DEVNET_OWNER, MockWallet::single(account));
        return Ok(devnet.client());
    }

    let mut config = ClientConfig::from_env().context("Invalid configuration")?;
    args.apply(&mut config);
    if config.rpc_url.is_none() {
        bail!("No wallet provider configured - set RPC_URL or use --devnet");
    }
    Ok(ReportClient::from_config(config)?)
}

async fn run(client: &ReportClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Status => {
            let status = client.check_ipfs_status().await;
            print_json(&status)?;
            if !status.is_ok() {
                bail!("IPFS is not available");
            }
        }

        Command::Login => {
            let outcome = authenticate(client, crime_report::AuthIntent::Login).await?;
            println!("Logged in as {:?}", outcome);
        }

        Command::Register => {
            let outcome = authenticate(client, crime_report::AuthIntent::Register).await?;
            println!("Registered as {:?}", outcome);
        }

        Command::Report {
            description,
            location,
            name,
            anonymous,
            media,
        } => {
            client.initialize().await?;
            let media = match media {
                Some(path) => Some(
                    Media::from_path(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                ),
                None => None,
            };
            let draft = ReportDraft {
                name,
                description,
                location,
                is_anonymous: anonymous,
                media,
            };
            let status = client.check_ipfs_status().await;
            let tx = submit_report(client, &draft, Some(&status)).await?;
            println!("Report submitted: {}", tx);
        }

        Command::Show { id } => {
            client.initialize().await?;
            print_json(&client.get_report(id).await?)?;
        }

        Command::Mine { lenient } => {
            let account = client.initialize().await?;
            let reports = if lenient {
                client.get_user_reports_lenient(account).await?
            } else {
                client.get_user_reports(account).await?
            };
            print_json(&reports)?;
        }

        Command::Count => {
            client.initialize().await?;
            println!("{}", client.get_report_count().await?);
        }

        Command::Resolve { id, message } => {
            client.initialize().await?;
            let tx = client.resolve_case(id, &message).await?;
            println!("Case {} resolved: {}", id, tx);
        }

        Command::Dashboard { search } => {
            let account = client.initialize().await?;
            if !client.is_admin(account).await {
                bail!("Access denied - admin privileges required");
            }
            let dashboard = load_dashboard(client).await?;
            let term = search.unwrap_or_default();

            print_bucket("Unresolved", Dashboard::search(&dashboard.unresolved, &term));
            print_bucket("Resolved", Dashboard::search(&dashboard.resolved, &term));
            if !dashboard.skipped.is_empty() {
                println!("Skipped (failed to load): {:?}", dashboard.skipped);
            }
        }

        Command::AddAdmin { address, name } => {
            client.initialize().await?;
            let tx = client.add_admin(address, &name).await?;
            println!("Admin {} added: {}", address, tx);
        }

        Command::Deregister { address } => {
            client.initialize().await?;
            let tx = client.deregister_user(address).await?;
            println!("User {} deregistered: {}", address, tx);
        }

        Command::Owner => {
            client.initialize().await?;
            println!("{}", client.get_owner().await?);
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_bucket(title: &str, reports: Vec<&Report>) {
    println!("{} ({})", title, reports.len());
    for report in reports {
        println!(
            "  #{} [{}] {} - {} ({})",
            report.id,
            report.timestamp,
            display_location(report),
            display_description(report),
            report.display_name(),
        );
        if report.resolved && !report.resolution_details.is_empty() {
            println!("      resolution: {}", report.resolution_details);
        }
    }
}
