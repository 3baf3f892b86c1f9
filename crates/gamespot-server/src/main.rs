//! `GameSpot` kiosk server
//!
//! Console booking, payment ledger and relay power control over HTTP.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use tracing::{info, warn};

use gamespot_core::SiteConfig;
use gamespot_core::tracing_init::init_tracing;
use gamespot_relay::RelayClient;
use gamespot_server::api::{AppState, build_router};
use gamespot_server::booking::BookingEngine;
use gamespot_server::storage::KioskDatabase;

#[derive(Parser, Debug)]
#[command(name = "gamespot-server")]
#[command(version, about = "GameSpot kiosk server - console booking, payments, relay power")]
struct Args {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Path to SQLite database file.
    #[arg(long, env = "DB_PATH", default_value = "gamespot.db")]
    db_path: PathBuf,

    /// Simulate every relay action instead of calling controllers.
    #[arg(
        long,
        env = "TEST_MODE",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    test_mode: bool,

    /// Site config (TOML) with roster, relay table and relay timing.
    #[arg(long, env = "GAMESPOT_CONFIG")]
    config: Option<PathBuf>,

    /// Payer identity recorded on payments. Overrides the site config.
    #[arg(long, env = "GAMESPOT_DEFAULT_USER")]
    default_user: Option<String>,

    /// Allowed CORS origins, comma separated. Any origin when unset.
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    cors_origin: Vec<String>,

    /// How long pay/reset wait for a relay action before answering.
    #[arg(long, env = "RELAY_DEADLINE_MS", default_value_t = 5_000)]
    relay_deadline_ms: u64,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing("gamespot_server=info,gamespot_relay=info,tower_http=info", args.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        test_mode = args.test_mode,
        "Starting gamespot-server"
    );

    let mut site = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "Loading site config");
            SiteConfig::load(path)?
        }
        None => SiteConfig::default(),
    };
    if let Some(user) = args.default_user {
        site.default_user = user;
        site.validate()?;
    }

    info!(path = %args.db_path.display(), "Opening kiosk database");
    let db = KioskDatabase::open(&args.db_path).await?;
    let seeded = db.seed_roster(&site.roster).await?;
    info!(consoles = site.roster.len(), seeded, "Console roster ready");

    let relay = RelayClient::new(&site, args.test_mode)?;
    for target in relay.targets() {
        info!(
            console = %target.console,
            host = %target.host,
            port = target.port,
            live = !args.test_mode,
            "Relay controller configured"
        );
    }

    let relay_deadline = Duration::from_millis(args.relay_deadline_ms);
    if let Some((console, worst)) = relay.slowest_press()
        && worst > relay_deadline
    {
        warn!(
            console,
            worst_case_ms = u64::try_from(worst.as_millis()).unwrap_or(u64::MAX),
            deadline_ms = args.relay_deadline_ms,
            "Relay presses can outlast the response deadline and will be reported pending"
        );
    }

    let engine = BookingEngine::new(db, relay, &site.default_user, relay_deadline);
    let app = build_router(AppState { engine }, &args.cors_origin);

    let addr = SocketAddr::new(args.host, args.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, mode = if args.test_mode { "TEST_MODE" } else { "LIVE" }, "Kiosk API listening");

    #[cfg(unix)]
    sd_notify::notify(false, &[sd_notify::NotifyState::Ready])?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Kiosk server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C shutdown signal");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM shutdown signal");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
