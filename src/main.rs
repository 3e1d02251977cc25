//! Hallux HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use hallux::config::Config;
use hallux::gateway::{HandlerState, create_router_with_state};
use hallux::pipeline::Verifier;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!(
        r#"
██╗  ██╗ █████╗ ██╗     ██╗     ██╗   ██╗██╗  ██╗
██║  ██║██╔══██╗██║     ██║     ██║   ██║╚██╗██╔╝
███████║███████║██║     ██║     ██║   ██║ ╚███╔╝
██╔══██║██╔══██║██║     ██║     ██║   ██║ ██╔██╗
██║  ██║██║  ██║███████╗███████╗╚██████╔╝██╔╝ ██╗
╚═╝  ╚═╝╚═╝  ╚═╝╚══════╝╚══════╝ ╚═════╝ ╚═╝  ╚═╝

        CITE. CHECK. CORROBORATE.
                                        AGPL-3.0
"#
    );

    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.server.bind_addr,
        port = config.server.port,
        max_in_flight = config.pipeline.max_in_flight,
        request_deadline_ms = config.pipeline.request_deadline.as_millis() as u64,
        "Hallux starting"
    );

    let verifier = Verifier::from_config(&config)?;
    for judge in verifier.judge_statuses() {
        if judge.configured {
            tracing::info!(judge = %judge.name, "Judge configured");
        } else {
            tracing::warn!(judge = %judge.name, "Judge not configured, it will be skipped");
        }
    }
    tracing::info!(sources = ?verifier.source_names(), "Metadata sources");

    let state = HandlerState::new(Arc::new(verifier));
    let app = create_router_with_state(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Hallux shutdown complete");
    Ok(())
}

fn run_health_check() -> i32 {
    let port = std::env::var("HALLUX_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8000);

    let url = format!("http://127.0.0.1:{}/healthz", port);

    let Ok(rt) = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    else {
        return 1;
    };

    rt.block_on(async {
        let Ok(client) = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
        else {
            return 1;
        };

        match client.get(&url).send().await {
            Ok(res) if res.status().is_success() => 0,
            _ => 1,
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
