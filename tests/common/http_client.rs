//! HTTP client helpers for tests.

use std::time::Duration;

use hallux::HALLUX_STATUS_HEADER;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TestClient {
    client: reqwest::Client,
    base_url: String,
}

/// Status code, `X-Hallux-Status` header and JSON body of a response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: u16,
    pub hallux_status: String,
    pub body: serde_json::Value,
}

impl TestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url, path)
    }

    async fn into_test_response(resp: reqwest::Response) -> Result<TestResponse, reqwest::Error> {
        let status = resp.status().as_u16();
        let hallux_status = resp
            .headers()
            .get(HALLUX_STATUS_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        let body = resp.json().await.unwrap_or(serde_json::Value::Null);
        Ok(TestResponse {
            status,
            hallux_status,
            body,
        })
    }

    pub async fn get(&self, path: &str) -> Result<TestResponse, reqwest::Error> {
        let resp = self.client.get(self.url(path)).send().await?;
        Self::into_test_response(resp).await
    }

    pub async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<TestResponse, reqwest::Error> {
        let resp = self
            .client
            .post(self.url(path))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;
        Self::into_test_response(resp).await
    }

    pub async fn verify_citation(
        &self,
        body: serde_json::Value,
    ) -> Result<TestResponse, reqwest::Error> {
        self.post("/v1/verify/citation", body).await
    }

    pub async fn verify_text(
        &self,
        body: serde_json::Value,
    ) -> Result<TestResponse, reqwest::Error> {
        self.post("/v1/verify/text", body).await
    }

    pub async fn verify_batch(
        &self,
        body: serde_json::Value,
    ) -> Result<TestResponse, reqwest::Error> {
        self.post("/v1/verify/batch", body).await
    }
}
