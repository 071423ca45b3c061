//! orderdesk CLI - order management console.
//!
//! # Usage
//!
//! ```bash
//! # First page of orders, newest first
//! orderdesk list
//!
//! # Delivered orders matching a phone number, by amount
//! orderdesk list --status delivered --search 98765 --sort amount --order asc
//!
//! # Change one order's status
//! orderdesk set-status ORD-1042 shipped
//!
//! # Mark several orders shipped in one request
//! orderdesk bulk-status shipped 665f1c2e9a 665f1c2e9b 665f1c2e9c
//!
//! # Export the filtered list to ./orders-YYYY-MM-DD.csv
//! orderdesk export --status out_for_delivery
//!
//! # Demo mode, refreshing every 10 seconds until Ctrl+C
//! orderdesk --synthetic watch --interval 10
//! ```
//!
//! # Commands
//!
//! - `list` - Filtered, sorted, paginated listing
//! - `show` - One order with its progress timeline
//! - `stats` - Headline metrics
//! - `set-status` - Change one order's status
//! - `edit` - Change status and/or payment method
//! - `bulk-status` - Change many orders' status at once
//! - `export` - Write the filtered list as CSV
//! - `watch` - Keep the listing fresh with the background poller

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use orderdesk_admin::AdminConfig;
use orderdesk_admin::config::DataSourceMode;
use orderdesk_core::{OrderStatus, PaymentMethod};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::QueryArgs;

#[derive(Parser)]
#[command(name = "orderdesk")]
#[command(author, version, about = "Order management console")]
struct Cli {
    /// Use deterministic demo data instead of the backend
    #[arg(long, global = true)]
    synthetic: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List orders
    List {
        #[command(flatten)]
        query: QueryArgs,

        /// Client-side page (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one order
    Show {
        /// Order id or display id
        order: String,
    },
    /// Show order statistics
    Stats,
    /// Set one order's status
    SetStatus {
        /// Order id or display id
        order: String,
        /// New status (e.g. `shipped`, `out_for_delivery`)
        status: OrderStatus,
    },
    /// Edit an order's status and/or payment method
    Edit {
        /// Order id or display id
        order: String,

        #[arg(short, long)]
        status: Option<OrderStatus>,

        /// `cash`, `wallet`, `card` or `upi`
        #[arg(short = 'm', long)]
        payment_method: Option<PaymentMethod>,
    },
    /// Set the status of several orders in one request
    BulkStatus {
        /// New status
        status: OrderStatus,
        /// Order ids or display ids
        #[arg(required = true)]
        orders: Vec<String>,
    },
    /// Export the filtered list as CSV
    Export {
        #[command(flatten)]
        query: QueryArgs,

        /// Directory to write into
        #[arg(short, long, default_value = ".")]
        dir: std::path::PathBuf,
    },
    /// Refresh orders in the background until interrupted
    Watch {
        /// Poll interval in seconds (defaults to `ORDERDESK_POLL_INTERVAL_SECS`)
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &AdminConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(config: &AdminConfig) {
    // Logs go to stderr so command output on stdout stays clean.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "orderdesk_admin=info,orderdesk_cli=info".into());

    let json_layer = config.log_json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!config.log_json)
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mode = cli.synthetic.then_some(DataSourceMode::Synthetic);
    let config = match AdminConfig::from_env_with_mode(mode) {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt().with_writer(std::io::stderr).init();
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing(&config);

    let result: Result<(), Box<dyn std::error::Error>> = run(cli.command, &config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &AdminConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::List { query, page, json } => {
            commands::orders::list(config, &query, page, json).await?;
        }
        Commands::Show { order } => commands::orders::show(config, &order).await?,
        Commands::Stats => commands::orders::stats(config).await?,
        Commands::SetStatus { order, status } => {
            commands::orders::set_status(config, &order, status).await?;
        }
        Commands::Edit {
            order,
            status,
            payment_method,
        } => {
            commands::orders::edit(config, &order, status, payment_method).await?;
        }
        Commands::BulkStatus { status, orders } => {
            commands::orders::bulk_status(config, status, &orders).await?;
        }
        Commands::Export { query, dir } => commands::orders::export(config, &query, &dir).await?,
        Commands::Watch { interval } => commands::watch::run(config, interval).await?,
    }
    Ok(())
}
