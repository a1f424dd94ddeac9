mod alerts;
mod coupons;
mod report;
mod schedule;
mod services;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::alerts::AlertOptions;
use crate::report::ReportOptions;

#[derive(Debug, Parser)]
#[command(name = "cmt")]
#[command(about = "Track coupon code mentions in scraped AI Overviews")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate the weekly coupon mention report (default)
    Report {
        /// Lookback window in days (defaults to `CMT_REPORT_LOOKBACK_DAYS`)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        days: Option<u32>,
        /// Only include prompts carrying this tag; repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Log the report without posting to Slack
        #[arg(long)]
        no_slack: bool,
        /// Upsert rows into the tracking history table
        #[arg(long)]
        persist: bool,
        /// Confirm matches against cited source pages
        #[arg(long)]
        with_sources: bool,
    },
    /// Alert on coupon-shaped codes that are not on the allow-list
    Alerts {
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        days: Option<u32>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        no_slack: bool,
    },
    /// Print the current tracked coupon list
    Coupons,
    /// Run the report on a cron schedule until interrupted
    Schedule {
        /// Six-field cron expression (defaults to `CMT_REPORT_SCHEDULE`)
        #[arg(long)]
        cron: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = cmt_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(Commands::Report {
            days,
            tags,
            no_slack,
            persist,
            with_sources,
        }) => {
            let options = ReportOptions {
                days,
                tags,
                send_to_slack: !no_slack,
                persist,
                with_sources,
            };
            report::run_report(&config, &options).await
        }
        None => report::run_report(&config, &ReportOptions::default()).await,
        Some(Commands::Alerts {
            days,
            tags,
            no_slack,
        }) => {
            let options = AlertOptions {
                days,
                tags,
                send_to_slack: !no_slack,
            };
            alerts::run_alerts(&config, &options).await
        }
        Some(Commands::Coupons) => coupons::run_coupons(&config).await,
        Some(Commands::Schedule { cron }) => schedule::run_schedule(config, cron).await,
    }
}
