use std::{
    env::{self},
    fs::OpenOptions,
    net::SocketAddr,
    sync::Arc,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use moneytor::{
    AppState, PlaidClient, PlaidConfig, build_router, get_local_offset, graceful_shutdown,
};

/// The REST API server for moneytor.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    #[arg(long, default_value = "Etc/UTC")]
    timezone: String,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    if get_local_offset(&args.timezone).is_none() {
        eprintln!(
            "'{}' is not a valid canonical timezone name.",
            args.timezone
        );
        std::process::exit(1);
    }

    let secret = env::var("SECRET").expect("The environment variable 'SECRET' must be set");

    let conn = Connection::open(&args.db_path).expect("Could not open the database file.");
    let app_state = AppState::new(conn, &secret, &args.timezone, create_plaid_client())
        .expect("Could not create the application state.");

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(app_state));

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .unwrap();
}

/// Build the banking provider client from the `PLAID_*` environment variables.
///
/// The server still starts without the Plaid credentials, the sync endpoints
/// will fail until they are set.
fn create_plaid_client() -> PlaidClient {
    let client_id = env::var("PLAID_CLIENT_ID").unwrap_or_else(|_| {
        tracing::warn!(
            "The environment variable 'PLAID_CLIENT_ID' is not set, account syncing will not work."
        );
        String::new()
    });

    let secret = env::var("PLAID_SECRET").unwrap_or_else(|_| {
        tracing::warn!(
            "The environment variable 'PLAID_SECRET' is not set, account syncing will not work."
        );
        String::new()
    });

    let base_url = match env::var("PLAID_ENV").as_deref() {
        Ok("production") => "https://production.plaid.com",
        Ok("sandbox") | Err(_) => "https://sandbox.plaid.com",
        Ok(other) => {
            tracing::warn!("Unknown PLAID_ENV '{other}', falling back to the sandbox environment.");
            "https://sandbox.plaid.com"
        }
    };

    PlaidClient::new(PlaidConfig {
        client_id,
        secret,
        base_url: base_url.to_owned(),
    })
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
