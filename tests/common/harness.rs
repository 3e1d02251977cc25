//! Test server harness.

use hallux::gateway::{HandlerState, create_router_with_state};
use hallux::judge::{Judge, JudgeChain, MockJudge};
use hallux::pipeline::{Backends, PipelineConfig, Verifier};
use hallux::retry::RetryPolicy;
use hallux::sources::{CrossrefSource, LookupConfig, MetadataSource};
use hallux::{Aggregator, ReqwestHttp};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::upstream::Upstream;

const STARTUP_WAIT_TIMEOUT_SECS: u64 = 5;
const STARTUP_POLL_INTERVAL_MS: u64 = 50;

pub struct TestServerConfig {
    pub layer_timeout: Duration,
    pub request_deadline: Duration,
    pub judges: Vec<Arc<dyn Judge>>,
    pub judge_timeout: Duration,
    pub retry: RetryPolicy,
    /// Crossref base URL; the upstream itself when unset.
    pub crossref_url: Option<String>,
}

impl Default for TestServerConfig {
    fn default() -> Self {
        Self {
            layer_timeout: Duration::from_millis(800),
            request_deadline: Duration::from_secs(4),
            judges: vec![Arc::new(MockJudge::scoring("primary", 0.9))],
            judge_timeout: Duration::from_millis(200),
            retry: RetryPolicy::none(),
            crossref_url: None,
        }
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerStartupError {
    #[error("Server failed to start within timeout")]
    Timeout,
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Server startup failed: {0}")]
    StartupFailed(String),
}

pub async fn wait_for_server_ready(
    addr: SocketAddr,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ServerStartupError> {
    let start = std::time::Instant::now();

    loop {
        if start.elapsed() > timeout {
            return Err(ServerStartupError::Timeout);
        }

        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => return Ok(()),
            Err(_) => tokio::time::sleep(interval).await,
        }
    }
}

/// A verifier wired to real HTTP and a Crossref client pointed at `upstream`.
pub fn build_verifier(
    upstream: &Upstream,
    config: &TestServerConfig,
) -> Result<Verifier, ServerStartupError> {
    let pipeline = PipelineConfig {
        layer_timeout: config.layer_timeout,
        request_deadline: config.request_deadline,
        retry: config.retry,
        ..Default::default()
    };

    let http = Arc::new(
        ReqwestHttp::new(pipeline.layer_timeout, pipeline.max_redirects)
            .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?,
    );
    let lookup = LookupConfig {
        crossref_url: config
            .crossref_url
            .clone()
            .unwrap_or_else(|| upstream.base_url()),
        timeout: pipeline.lookup_attempt_timeout(),
        ..Default::default()
    };
    let crossref: Arc<dyn MetadataSource> = Arc::new(
        CrossrefSource::new(&lookup).map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?,
    );

    Ok(Verifier::new(
        pipeline,
        Aggregator::default(),
        Backends {
            probe: http.clone(),
            fetcher: http,
            sources: vec![crossref],
            judges: JudgeChain::new(config.judges.clone(), config.judge_timeout),
        },
    ))
}

/// Spawns the gateway on an ephemeral port. Judges are mocks; URL, content and
/// metadata traffic goes over real HTTP to `upstream`.
pub async fn spawn_test_server(
    upstream: &Upstream,
    config: TestServerConfig,
) -> Result<TestServer, ServerStartupError> {
    let verifier = build_verifier(upstream, &config)?;
    let app = create_router_with_state(HandlerState::new(Arc::new(verifier)));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    wait_for_server_ready(
        addr,
        Duration::from_secs(STARTUP_WAIT_TIMEOUT_SECS),
        Duration::from_millis(STARTUP_POLL_INTERVAL_MS),
    )
    .await?;

    Ok(TestServer {
        addr,
        _server_handle: server_handle,
        shutdown_tx: Some(shutdown_tx),
    })
}
