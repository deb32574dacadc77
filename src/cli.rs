use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "verokarhu")]
#[command(
    version,
    about = "Finnish capital gains tax calculator for broker CSV exports"
)]
#[command(
    long_about = "Calculate realized capital gains and losses, dividend and interest income, \
and an estimated capital tax from Trading 212, Revolut, Interactive Brokers or manual CSV \
exports, using FIFO lot matching and the Finnish deemed acquisition cost rule."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Calculate taxes for one broker CSV export
    Calculate {
        /// Path to the CSV file
        file: String,

        /// Tax year (defaults to the current year)
        #[arg(short, long)]
        year: Option<i32>,

        /// Import format (trading212, manual, revolut, ibkr); auto-detected
        /// from the header row when possible
        #[arg(short, long)]
        format: Option<String>,

        /// Fail on sells exceeding the held quantity instead of skipping
        /// the row with a warning
        #[arg(long)]
        strict_sells: bool,

        /// Print the full result as JSON instead of tables
        #[arg(long)]
        json: bool,

        /// Write the CSV/JSON export files into this directory
        #[arg(long)]
        export_dir: Option<String>,
    },

    /// List supported import formats and their required columns
    Formats,

    /// Show the tax rule set applied for a year
    Rules {
        /// Tax year
        #[arg(short, long)]
        year: i32,
    },
}
