use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use crm_api::{deals, sales_teams, CrmContext, DEFAULT_EVENT_BUFFER};
use shared::domain::DealId;
use storage::Storage;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/crm.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates the named sales teams that do not exist yet.
    SeedSalesTeams {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Prints pipeline metrics as JSON.
    PipelineReport,
    /// Moves a deal to another stage, running the usual post-transition hooks.
    MoveDeal { deal_id: i64, stage: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;
    let (events, _) = broadcast::channel(DEFAULT_EVENT_BUFFER);
    let ctx = CrmContext::new(Arc::new(storage), events);

    match cli.command {
        Command::SeedSalesTeams { names } => {
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            let teams = sales_teams::ensure_sales_teams(&ctx, &names).await?;
            for team in teams {
                println!("sales_team_id={} name={}", team.id, team.name);
            }
        }
        Command::PipelineReport => {
            let metrics = deals::pipeline_metrics(&ctx).await?;
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }
        Command::MoveDeal { deal_id, stage } => {
            let deal = deals::change_stage(&ctx, DealId(deal_id), &stage).await?;
            println!(
                "deal_id={} stage={} status={:?}",
                deal.id, deal.stage, deal.status
            );
        }
    }

    Ok(())
}
