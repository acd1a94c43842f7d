use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// `shortlinks` - request-log capture, daily aggregation and retention.
#[derive(Parser, Debug)]
#[command(name = "shortlinks")]
#[command(version = "0.1.0")]
#[command(about = "Request-log capture and retention for the shortlinks service.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP gateway with request logging and scheduled retention
    Serve {
        /// Port to listen on (use 0 for random available port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Run one retention cleanup pass now and print its report
    Cleanup,

    /// Recompute the daily aggregate for one date (YYYY-MM-DD)
    Aggregate {
        date: NaiveDate,
    },
}
