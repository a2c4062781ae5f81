//! Crust CLI - cart inspection, capability tables and a demo session.
//!
//! # Usage
//!
//! ```bash
//! # Show the menu a signed-in client sees
//! crust routes --audience user --set menu
//!
//! # Check a custom capability table for dead entries and duplicate paths
//! crust validate-routes --table routes.json
//!
//! # Reconcile the persisted cart against a catalog export and rewrite it
//! crust cart reconcile --catalog products.json --write
//!
//! # List cooking orders from JSON exports
//! crust orders --orders orders.json --clients clients.json --status cooking
//!
//! # Run a scripted session against the in-memory store
//! crust demo
//! ```
//!
//! # Commands
//!
//! - `routes` - Print the capabilities visible to an audience
//! - `validate-routes` - Validate a capability table
//! - `landing` - Print the landing path after sign-in
//! - `cart show|add|reconcile` - Work with the persisted cart
//! - `orders` - Print admin order rows from JSON exports
//! - `demo` - Run an orchestrated session in memory

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use crust_client::config::ClientConfig;
use crust_core::OrderStatus;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{AudienceArg, CapabilitySet};

#[derive(Parser)]
#[command(name = "crust")]
#[command(author, version, about = "Crust storefront client tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the capabilities visible to an audience
    Routes {
        #[arg(short, long, value_enum, default_value = "guest")]
        audience: AudienceArg,

        /// Descriptor set to filter
        #[arg(short, long, value_enum, default_value = "routes")]
        set: CapabilitySet,

        /// Capability table (JSON); the built-in table when omitted
        #[arg(short, long)]
        table: Option<PathBuf>,
    },
    /// Report dead entries and duplicate paths in a capability table
    ValidateRoutes {
        #[arg(short, long)]
        table: Option<PathBuf>,
    },
    /// Print where an identity lands after signing in
    Landing {
        #[arg(short, long, value_enum, default_value = "user")]
        audience: AudienceArg,

        #[arg(long)]
        first_login: bool,

        #[arg(long, default_value_t = 0)]
        cart_count: u64,
    },
    /// Work with the persisted cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Print admin order rows joined from JSON exports
    Orders {
        /// JSON array of orders
        #[arg(short, long)]
        orders: PathBuf,

        /// JSON array of client identities
        #[arg(long)]
        clients: Option<PathBuf>,

        /// JSON array of products
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Only show orders in this status
        #[arg(short, long)]
        status: Option<OrderStatus>,
    },
    /// Run a scripted session against the in-memory document store
    Demo,
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the persisted cart
    Show,
    /// Add a batch to the persisted cart
    Add {
        #[arg(short, long)]
        product: i64,

        #[arg(short, long, default_value_t = 1)]
        quantity: i64,

        /// Option key (repeatable)
        #[arg(short, long = "option")]
        options: Vec<String>,
    },
    /// Reconcile the persisted cart against a catalog export
    Reconcile {
        /// JSON array of products
        #[arg(short, long)]
        catalog: PathBuf,

        /// Rewrite the persisted cart when reconciliation changed it
        #[arg(short, long)]
        write: bool,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
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
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Configuration is needed for Sentry init, which must precede tracing
    let config = ClientConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "crust_cli=info,crust_client=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, &config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Routes {
            audience,
            set,
            table,
        } => commands::routes::show(audience, set, table.as_deref())?,
        Commands::ValidateRoutes { table } => commands::routes::validate(table.as_deref())?,
        Commands::Landing {
            audience,
            first_login,
            cart_count,
        } => commands::routes::landing(audience, first_login, cart_count),
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(config)?,
            CartAction::Add {
                product,
                quantity,
                options,
            } => commands::cart::add(config, product, quantity, options)?,
            CartAction::Reconcile { catalog, write } => {
                commands::cart::reconcile(config, &catalog, write)?;
            }
        },
        Commands::Orders {
            orders,
            clients,
            catalog,
            status,
        } => commands::orders::list(&orders, clients.as_deref(), catalog.as_deref(), status)?,
        Commands::Demo => commands::demo::run(config).await?,
    }
    Ok(())
}
