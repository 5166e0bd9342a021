use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;

use jobs_catalog_sync::config::AppConfig;
use jobs_catalog_sync::models::listing::{ListingId, NewListing};
use jobs_catalog_sync::services::{
    applications::{render_applications, ApplicationClient},
    catalog::CanonicalCatalog,
    gateway::ApiGateway,
    listings::ListingClient,
    reconcile::CatalogReconciler,
    snapshot::SnapshotStore,
    verifier::{EndpointVerifier, ProbeFixtures},
};
use jobs_catalog_sync::telemetry;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser, Debug)]
#[command(
    name = "jobs-sync",
    about = "Keep a jobs API catalog in line with a canonical set and inspect its applications",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Delete every remote listing, then create the canonical set
    Reconcile {
        /// Canonical listing file (JSON array); overrides JOBS_CATALOG_PATH
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Fetch applications, print them and write a snapshot
    Applications {
        /// Only applications for this listing
        #[arg(long)]
        job_id: Option<ListingId>,
        /// Snapshot directory; overrides JOBS_SNAPSHOT_DIR
        #[arg(long)]
        snapshot_dir: Option<PathBuf>,
    },
    /// Probe every API endpoint and report pass/fail
    Verify,
    /// Single listing operations
    Jobs {
        #[command(subcommand)]
        command: JobsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum JobsCommand {
    /// List every listing
    List,
    /// Show one listing
    Get { id: ListingId },
    /// Create one listing from a JSON file
    Create { file: PathBuf },
    /// Delete one listing
    Delete { id: ListingId },
}

#[tokio::main]
async fn main() {
    if let Err(err) = telemetry::init() {
        eprintln!("failed to initialize logging: {err}");
    }

    match run(Cli::parse()).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            tracing::error!(error = %err, "Command failed");
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

/// Returns whether the command fully succeeded.
async fn run(cli: Cli) -> CliResult<bool> {
    let config = AppConfig::from_env()?;
    let gateway = ApiGateway::new(
        &config.api_url,
        config.api_key.clone(),
        config.request_timeout(),
    )?;

    match cli.command {
        Command::Reconcile { catalog } => {
            let catalog_path = catalog.or_else(|| config.catalog_path.clone());
            let catalog = CanonicalCatalog::load(catalog_path.as_deref())?;

            println!("Replacing all listings at {}", gateway.base_url());
            let reconciler = CatalogReconciler::new(&gateway, config.pacing());
            let outcome = reconciler.reconcile(&catalog).await;
            println!("{outcome}");

            if outcome.failed() == 0 {
                println!("✓ All listings replaced successfully");
                Ok(true)
            } else {
                println!("⚠ Completed with {} error(s)", outcome.failed());
                Ok(false)
            }
        }
        Command::Applications {
            job_id,
            snapshot_dir,
        } => {
            let store =
                SnapshotStore::new(snapshot_dir.unwrap_or_else(|| config.snapshot_dir.clone()));
            let client = ApplicationClient::new(&gateway, &store);
            let fetched = match job_id {
                Some(id) => client.fetch_by_listing(id).await?,
                None => client.fetch_all().await?,
            };

            match fetched.listing_id {
                Some(id) => println!(
                    "✓ Found {} application(s) for listing {}",
                    fetched.applications.len(),
                    id
                ),
                None => println!(
                    "✓ Successfully fetched {} application(s)",
                    fetched.applications.len()
                ),
            }
            print!("{}", render_applications(&fetched.applications));
            println!("✓ Applications saved to {}", fetched.snapshot.display());
            Ok(true)
        }
        Command::Verify => {
            let probing = gateway.with_timeout(config.probe_timeout());
            let verifier = EndpointVerifier::new(&probing, ProbeFixtures::default());
            println!("Testing: {}", probing.base_url());
            let report = verifier.run().await;
            println!("{report}");
            Ok(report.all_passed())
        }
        Command::Jobs { command } => {
            run_jobs(&ListingClient::new(&gateway), command).await?;
            Ok(true)
        }
    }
}

async fn run_jobs(client: &ListingClient<'_>, command: JobsCommand) -> CliResult<()> {
    match command {
        JobsCommand::List => {
            let listings = client.list().await?;
            println!("✓ Found {} listing(s)", listings.len());
            for listing in &listings {
                let id = listing
                    .id
                    .map_or_else(|| "N/A".to_string(), |id| id.to_string());
                println!();
                println!("Job ID: {}", id);
                println!("  Title: {}", listing.details.title);
                println!("  Company: {}", listing.details.company);
                println!("  Location: {}", listing.details.location);
                println!("  Skills: {}", listing.details.required_skills.join(", "));
            }
        }
        JobsCommand::Get { id } => {
            let listing = client.get(id).await?;
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        JobsCommand::Create { file } => {
            let raw = std::fs::read_to_string(&file)?;
            let listing: NewListing = serde_json::from_str(&raw)?;
            // Reuse catalog validation for a single entry.
            CanonicalCatalog::new(vec![listing.clone()])?;
            let id = client.create(&listing).await?;
            println!("✓ Listing posted successfully");
            println!("  Job ID: {}", id);
            println!("  Title: {}", listing.title);
        }
        JobsCommand::Delete { id } => {
            let message = client.delete(id).await?;
            println!("✓ Listing deleted successfully");
            println!("  {}", message);
        }
    }
    Ok(())
}
