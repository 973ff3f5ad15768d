use std::{env, future, io};

use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use phonebox_calendar::{
    cli,
    google::GoogleCalendarSource,
    server::{self, AppState},
};

const DEFAULT_LOG_FILTER: &str = "phonebox_calendar=info";

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = cli::parse(env::args().skip(1).collect());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let router = server::router(AppState {
        source: GoogleCalendarSource::new(args.api_url, args.token),
        calendar: args.calendar,
    });

    let listener = TcpListener::bind(args.address).await?;
    info!(address = %args.address, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!(%err, "cannot listen for ctrl-c");
        future::pending::<()>().await;
    }

    info!("shutting down");
}
