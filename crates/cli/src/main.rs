//! Churn prediction CLI
//!
//! A command-line tool for scoring customers, browsing prediction
//! history and checking the churn prediction service.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{health, history, predict, stats};

/// Churn prediction CLI
#[derive(Parser)]
#[command(name = "churnctl")]
#[command(author, version, about = "CLI for the Churn Prediction service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (defaults to the config file, then http://localhost:5000)
    #[arg(long, env = "CHURN_API_URL")]
    pub api_url: Option<String>,

    /// User identity sent as X-User-Id
    #[arg(long, env = "CHURN_USER_ID")]
    pub user_id: Option<String>,

    /// Role sent as X-User-Role (admin is needed for purge)
    #[arg(long, env = "CHURN_USER_ROLE")]
    pub role: Option<String>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score a customer record
    Predict(predict::CustomerArgs),

    /// Show your prediction history
    History {
        /// Filter by label (Churn, No Churn or All)
        #[arg(long)]
        prediction: Option<String>,

        /// Only predictions at or after this RFC 3339 time
        #[arg(long)]
        start_date: Option<String>,

        /// Only predictions at or before this RFC 3339 time
        #[arg(long)]
        end_date: Option<String>,

        #[arg(long)]
        min_probability: Option<f64>,

        #[arg(long)]
        max_probability: Option<f64>,

        /// Sort field (timestamp, probability, prediction)
        #[arg(long)]
        sort_by: Option<String>,

        /// Sort order (asc, desc)
        #[arg(long)]
        order: Option<String>,

        #[arg(long)]
        page: Option<usize>,

        /// Page size (1-100)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show dashboard statistics
    Stats,

    /// Delete the prediction history of every user (admin only)
    Purge {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Check service health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let file_config = config::Config::load()?;

    // Initialize client
    let identity = client::Identity {
        user_id: file_config.user_id(cli.user_id),
        role: file_config.role(cli.role),
    };
    let client = client::ApiClient::new(&file_config.api_url(cli.api_url), identity)?;

    // Execute command
    match cli.command {
        Commands::Predict(args) => {
            predict::predict(&client, args, cli.format).await?;
        }
        Commands::History {
            prediction,
            start_date,
            end_date,
            min_probability,
            max_probability,
            sort_by,
            order,
            page,
            limit,
        } => {
            let query = client::HistoryQuery {
                prediction,
                start_date,
                end_date,
                min_probability,
                max_probability,
                sort_by,
                sort_order: order,
                page,
                limit,
            };
            history::show_history(&client, query, cli.format).await?;
        }
        Commands::Stats => {
            stats::show_stats(&client, cli.format).await?;
        }
        Commands::Purge { yes } => {
            history::purge(&client, yes, cli.format).await?;
        }
        Commands::Health => {
            health::show_health(&client, cli.format).await?;
        }
    }

    Ok(())
}
