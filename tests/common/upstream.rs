//! Local stand-in for the outside world: a paper host and a Crossref-shaped
//! `/works` API on one listener.

use axum::{
    Json, Router,
    extract::Path,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const KNOWN_DOI: &str = "10.5555/3295222.3295349";

pub const PAPER_HTML: &str = "<html><head><title>Attention</title></head><body><article>\
<h1>Attention Is All You Need</h1>\
<p>We propose the Transformer, a model architecture based solely on attention \
mechanisms, dispensing with recurrence and convolutions entirely. Experiments on \
two machine translation tasks show these models to be superior in quality while \
being more parallelizable. Our model achieves 28.4 BLEU on the WMT 2014 \
English-to-German translation task.</p></article></body></html>";

pub const SUPPORTED_CLAIM: &str =
    "The Transformer relies solely on attention mechanisms and achieves 28.4 BLEU on translation.";

pub struct Upstream {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl Upstream {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn paper_url(&self) -> String {
        format!("{}/papers/attention", self.base_url())
    }

    pub fn missing_url(&self) -> String {
        format!("{}/papers/missing", self.base_url())
    }

    pub fn slow_url(&self) -> String {
        format!("{}/papers/slow", self.base_url())
    }
}

impl Drop for Upstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn work(Path((prefix, suffix)): Path<(String, String)>) -> Response {
    let doi = format!("{}/{}", prefix, suffix);
    if doi != KNOWN_DOI {
        return (StatusCode::NOT_FOUND, "Resource not found.").into_response();
    }

    Json(serde_json::json!({
        "status": "ok",
        "message": {
            "DOI": KNOWN_DOI,
            "title": ["Attention is all you need"],
            "author": [
                {"given": "Ashish", "family": "Vaswani"},
                {"given": "Noam", "family": "Shazeer"},
                {"given": "Niki", "family": "Parmar"}
            ],
            "issued": {"date-parts": [[2017, 12]]},
            "container-title": ["Advances in Neural Information Processing Systems"]
        }
    }))
    .into_response()
}

async fn slow() -> Html<&'static str> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Html(PAPER_HTML)
}

pub async fn spawn_upstream() -> std::io::Result<Upstream> {
    let app = Router::new()
        .route("/papers/attention", get(|| async { Html(PAPER_HTML) }))
        .route("/papers/slow", get(slow))
        .route("/works/{prefix}/{suffix}", get(work));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(Upstream { addr, handle })
}

/// An address nothing is listening on.
pub async fn closed_url() -> std::io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{}/gone", addr))
}

/// A listener that accepts connections and never writes a byte back.
pub struct SilentUpstream {
    pub addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl SilentUpstream {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn connections(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

impl Drop for SilentUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_silent_upstream() -> std::io::Result<SilentUpstream> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();

    let handle = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(stream);
        }
    });

    Ok(SilentUpstream {
        addr,
        accepted,
        handle,
    })
}
