//! Library-level runs against real HTTP: no gateway, mock judges only.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use hallux::judge::MockJudge;
use hallux::retry::RetryPolicy;
use hallux::{CitationFields, LayerKind, LayerStatus, VerdictLabel, VerifyOptions};

use common::harness::{TestServerConfig, build_verifier};
use common::upstream::{
    KNOWN_DOI, SUPPORTED_CLAIM, closed_url, spawn_silent_upstream, spawn_upstream,
};

fn known_fields(url: String) -> CitationFields {
    CitationFields {
        author: Some("Vaswani, A., Shazeer, N.".into()),
        year: Some(2017),
        title: Some("Attention Is All You Need".into()),
        doi: Some(KNOWN_DOI.into()),
        url: Some(url),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_exact_doi_without_ai_is_verified() {
    let upstream = spawn_upstream().await.expect("Upstream should start");
    let judge = MockJudge::scoring("primary", 0.9);
    let config = TestServerConfig {
        judges: vec![Arc::new(judge.clone())],
        ..Default::default()
    };
    let verifier = build_verifier(&upstream, &config).expect("verifier");

    let verdict = verifier
        .verify_citation(
            known_fields(upstream.paper_url()),
            Some(SUPPORTED_CLAIM.into()),
            &VerifyOptions::default().without_ai(),
        )
        .await;

    let metadata = verdict.layer(LayerKind::Metadata).expect("metadata result");
    assert_eq!(metadata.status(), LayerStatus::Passed);
    assert_eq!(metadata.score(), Some(1.0));
    assert_eq!(
        verdict.layer(LayerKind::Url).map(|r| r.status()),
        Some(LayerStatus::Passed)
    );
    assert_eq!(
        verdict.layer(LayerKind::Ai).map(|r| r.status()),
        Some(LayerStatus::Unavailable)
    );
    assert_eq!(judge.calls(), 0);
    assert_eq!(verdict.label(), VerdictLabel::Verified);
}

#[tokio::test]
async fn test_primary_judge_timeout_falls_back() {
    let upstream = spawn_upstream().await.expect("Upstream should start");
    let primary = MockJudge::scoring("primary", 0.95).with_delay(Duration::from_secs(2));
    let fallback = MockJudge::scoring("fallback", 0.2);
    let config = TestServerConfig {
        judges: vec![Arc::new(primary.clone()), Arc::new(fallback.clone())],
        judge_timeout: Duration::from_millis(150),
        ..Default::default()
    };
    let verifier = build_verifier(&upstream, &config).expect("verifier");

    let verdict = verifier
        .verify_citation(
            known_fields(upstream.paper_url()),
            Some(SUPPORTED_CLAIM.into()),
            &VerifyOptions::default(),
        )
        .await;

    let ai = verdict.layer(LayerKind::Ai).expect("ai result");
    assert_eq!(ai.status(), LayerStatus::Passed);
    assert_eq!(ai.score(), Some(0.2));
    assert_eq!(ai.backend(), Some("fallback"));
    assert_eq!(primary.calls(), 1);
    assert_eq!(fallback.calls(), 1);
}

#[tokio::test]
async fn test_request_deadline_cuts_slow_layers() {
    let upstream = spawn_upstream().await.expect("Upstream should start");
    let config = TestServerConfig {
        layer_timeout: Duration::from_secs(3),
        request_deadline: Duration::from_secs(10),
        ..Default::default()
    };
    let verifier = build_verifier(&upstream, &config).expect("verifier");

    let fields = CitationFields {
        title: Some("Attention Is All You Need".into()),
        url: Some(upstream.slow_url()),
        ..Default::default()
    };
    let options = VerifyOptions::default().without_ai().with_timeout_secs(1);

    let started = Instant::now();
    let verdict = verifier.verify_citation(fields, None, &options).await;

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(
        verdict.layer(LayerKind::Url).map(|r| r.status()),
        Some(LayerStatus::TimedOut)
    );
    assert_eq!(verdict.label(), VerdictLabel::Unverifiable);
}

#[tokio::test]
async fn test_dead_link_fails_url_layer() {
    let upstream = spawn_upstream().await.expect("Upstream should start");
    let verifier = build_verifier(&upstream, &TestServerConfig::default()).expect("verifier");
    let dead = closed_url().await.expect("port");

    let fields = CitationFields {
        title: Some("Nowhere".into()),
        url: Some(dead),
        ..Default::default()
    };
    let verdict = verifier
        .verify_citation(fields, None, &VerifyOptions::default().without_ai())
        .await;

    let url = verdict.layer(LayerKind::Url).expect("url result");
    assert_eq!(url.status(), LayerStatus::Failed);
    assert_eq!(url.score(), Some(0.0));
}

#[tokio::test]
async fn test_text_run_over_real_http() {
    let upstream = spawn_upstream().await.expect("Upstream should start");
    let verifier = build_verifier(&upstream, &TestServerConfig::default()).expect("verifier");

    let text = format!(
        "The Transformer relies solely on attention mechanisms (Vaswani et al., 2017; doi:{}).\n\
         A missing page is cited here: {}.\n",
        KNOWN_DOI,
        upstream.missing_url()
    );
    let run = verifier
        .verify_text(&text, &VerifyOptions::default().without_ai())
        .await
        .expect("run should complete");

    assert_eq!(run.verdicts().len(), 2);
    assert_eq!(run.summary().total, 2);
    let missing = &run.verdicts()[1];
    assert_eq!(
        missing.layer(LayerKind::Url).map(|r| r.status()),
        Some(LayerStatus::Failed)
    );
    assert!(run.metadata().state.is_terminal());
    assert_eq!(
        run.metadata().enabled_layers,
        vec![LayerKind::Url, LayerKind::Metadata, LayerKind::Content]
    );
}

#[tokio::test]
async fn test_hanging_lookup_is_retried_within_layer_budget() {
    let upstream = spawn_upstream().await.expect("Upstream should start");
    let silent = spawn_silent_upstream().await.expect("Listener should start");
    let config = TestServerConfig {
        layer_timeout: Duration::from_millis(1_000),
        retry: RetryPolicy::new(1, Duration::from_millis(50)),
        crossref_url: Some(silent.base_url()),
        ..Default::default()
    };
    let verifier = build_verifier(&upstream, &config).expect("verifier");

    let fields = CitationFields {
        title: Some("Attention Is All You Need".into()),
        doi: Some(KNOWN_DOI.into()),
        ..Default::default()
    };
    let verdict = verifier
        .verify_citation(fields, None, &VerifyOptions::default().without_ai())
        .await;

    let metadata = verdict.layer(LayerKind::Metadata).expect("metadata result");
    assert_eq!(
        metadata.status(),
        LayerStatus::Unavailable,
        "evidence: {}",
        metadata.evidence()
    );
    assert!(metadata.evidence().contains("after 2 attempts"));
    assert_eq!(silent.connections(), 2);
}
