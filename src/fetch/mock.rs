//! In-memory HTTP double for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use super::{ContentFetcher, FetchError, FetchedPage, HttpProbe, ProbeOutcome, page_text};

/// Canned response for one URL.
#[derive(Debug, Clone)]
pub struct MockRoute {
    pub result: Result<MockPage, FetchError>,
    pub delay: Duration,
}

#[derive(Debug, Clone)]
pub struct MockPage {
    pub status: u16,
    pub final_url: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl MockRoute {
    pub fn page(status: u16, body: impl Into<String>) -> Self {
        Self {
            result: Ok(MockPage {
                status,
                final_url: None,
                content_type: Some("text/html".to_string()),
                body: body.into(),
            }),
            delay: Duration::ZERO,
        }
    }

    pub fn error(error: FetchError) -> Self {
        Self {
            result: Err(error),
            delay: Duration::ZERO,
        }
    }

    pub fn redirected_to(mut self, final_url: impl Into<String>) -> Self {
        if let Ok(page) = &mut self.result {
            page.final_url = Some(final_url.into());
        }
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        if let Ok(page) = &mut self.result {
            page.content_type = Some(content_type.into());
        }
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Routes URLs to canned responses. Unknown URLs fail with [`FetchError::Connect`].
#[derive(Debug, Clone, Default)]
pub struct MockHttp {
    routes: Arc<RwLock<HashMap<String, MockRoute>>>,
    probes: Arc<AtomicUsize>,
    fetches: Arc<AtomicUsize>,
}

impl MockHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: impl Into<String>, route: MockRoute) -> Self {
        self.insert(url, route);
        self
    }

    pub fn insert(&self, url: impl Into<String>, route: MockRoute) {
        self.routes
            .write()
            .expect("lock poisoned")
            .insert(url.into(), route);
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    async fn resolve(&self, url: &str) -> Result<MockPage, FetchError> {
        let route = self.routes.read().expect("lock poisoned").get(url).cloned();
        let Some(route) = route else {
            return Err(FetchError::Connect(format!("no route to {}", url)));
        };
        if !route.delay.is_zero() {
            tokio::time::sleep(route.delay).await;
        }
        route.result
    }
}

#[async_trait]
impl HttpProbe for MockHttp {
    async fn probe(&self, url: &str) -> Result<ProbeOutcome, FetchError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let page = self.resolve(url).await?;
        let final_url = page.final_url.unwrap_or_else(|| url.to_string());
        Ok(ProbeOutcome {
            status: page.status,
            redirected: final_url != url,
            final_url,
        })
    }
}

#[async_trait]
impl ContentFetcher for MockHttp {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let page = self.resolve(url).await?;
        if !(200..300).contains(&page.status) {
            return Err(FetchError::Status(page.status));
        }
        Ok(FetchedPage {
            text: page_text(page.content_type.as_deref(), &page.body),
            final_url: page.final_url.unwrap_or_else(|| url.to_string()),
            content_type: page.content_type,
        })
    }
}
