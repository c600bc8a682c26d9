mod commands;

use std::path::PathBuf;

use almanac_core::config::load_config;
use almanac_core::constants::{PRODUCT_NAME, PRODUCT_VERSION};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "almanac")]
#[command(about = "Expand recurring iCalendar components and evaluate calendar-query filters")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the instances of every component in a calendar file
    Expand {
        file: PathBuf,

        /// Range start, UTC (e.g. 20060102T000000Z)
        #[arg(long)]
        start: String,

        /// Range end, UTC
        #[arg(long)]
        end: String,

        /// Print instance times in UTC
        #[arg(long)]
        utc: bool,

        /// Zone for floating times
        #[arg(long)]
        tz: Option<String>,
    },
    /// Test a calendar file against a component filter
    Match {
        file: PathBuf,

        /// Component to look for under VCALENDAR (e.g. VEVENT)
        #[arg(short, long)]
        component: String,

        /// Time-range start, UTC
        #[arg(long)]
        start: Option<String>,

        /// Time-range end, UTC
        #[arg(long)]
        end: Option<String>,

        /// Text SUMMARY must contain
        #[arg(long)]
        summary: Option<String>,

        /// Collation for --summary (i;ascii-casemap, i;unicode-casemap, i;octet)
        #[arg(long)]
        collation: Option<String>,

        /// Zone for floating times
        #[arg(long)]
        tz: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config()?;

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping info");
    }

    tracing::debug!(product = PRODUCT_NAME, version = PRODUCT_VERSION, "Starting");

    match cli.command {
        Commands::Expand {
            file,
            start,
            end,
            utc,
            tz,
        } => commands::expand(&config, &file, &start, &end, utc, tz.as_deref()),
        Commands::Match {
            file,
            component,
            start,
            end,
            summary,
            collation,
            tz,
        } => commands::matches(
            &config,
            &file,
            &commands::MatchArgs {
                component,
                start,
                end,
                summary,
                collation,
                tz,
            },
        ),
    }
}
