// ABOUTME: Entry point for the skylift CLI application.
// ABOUTME: Parses arguments and dispatches to the deployment orchestrator.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use skylift::config;
use skylift::deploy::{Orchestrator, StatusReport};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = Orchestrator::new(&cli.presets_dir, &cli.state_dir);

    match cli.command {
        Commands::Deploy { preset } => {
            println!("Deploying preset '{preset}'...");
            let record = orchestrator.deploy(&preset).await?;
            println!(
                "Deployed '{}' to instance {} at {}",
                record.preset, record.instance_id, record.address
            );
        }
        Commands::Status { preset } => match orchestrator.status(&preset).await? {
            StatusReport::NotDeployed => {
                println!("'{preset}' is not deployed");
            }
            StatusReport::Up {
                address,
                status,
                latency_ms,
            } => {
                println!("'{preset}' is up at {address} (status: {status}, {latency_ms}ms)");
            }
            StatusReport::Down { address, reason } => {
                println!("'{preset}' is deployed at {address} but not responding: {reason}");
            }
        },
        Commands::Shutdown { preset } => {
            println!("Shutting down preset '{preset}'...");
            orchestrator.shutdown(&preset).await?;
            println!("Shutdown complete");
        }
        Commands::ListPresets => {
            for name in config::list_presets(&cli.presets_dir)? {
                println!("{name}");
            }
        }
    }

    Ok(())
}
