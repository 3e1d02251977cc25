use super::*;
use std::sync::Arc;
use std::time::Duration;

use crate::aggregate::{Aggregator, VerdictLabel};
use crate::citation::CitationFields;
use crate::extract::ExtractionError;
use crate::fetch::{MockHttp, MockRoute};
use crate::judge::{Judge, JudgeChain, MockJudge};
use crate::layers::{LayerKind, LayerStatus};
use crate::retry::RetryPolicy;
use crate::sources::{BibRecord, MetadataQuery, MockMetadataSource};

const PAPER_URL: &str = "https://papers.test/attention";

const PAGE: &str = "<html><body><article><h1>Attention Is All You Need</h1>\
<p>We propose the Transformer, a model architecture based solely on attention \
mechanisms, dispensing with recurrence and convolutions entirely. Experiments on \
two machine translation tasks show these models to be superior in quality while \
being more parallelizable. Our model achieves 28.4 BLEU on the WMT 2014 \
English-to-German translation task.</p></article></body></html>";

const CLAIM: &str =
    "The Transformer relies solely on attention mechanisms and achieves 28.4 BLEU on translation.";

fn test_config() -> PipelineConfig {
    PipelineConfig {
        layer_timeout: Duration::from_millis(500),
        request_deadline: Duration::from_secs(5),
        retry: RetryPolicy::none(),
        ..Default::default()
    }
}

fn verifier_with(
    config: PipelineConfig,
    http: MockHttp,
    source: MockMetadataSource,
    judges: Vec<Arc<dyn Judge>>,
) -> Verifier {
    Verifier::new(
        config,
        Aggregator::default(),
        Backends {
            probe: Arc::new(http.clone()),
            fetcher: Arc::new(http),
            sources: vec![Arc::new(source)],
            judges: JudgeChain::new(judges, Duration::from_millis(100)),
        },
    )
}

fn verifier(http: MockHttp, source: MockMetadataSource, judges: Vec<Arc<dyn Judge>>) -> Verifier {
    verifier_with(test_config(), http, source, judges)
}

fn vaswani_fields() -> CitationFields {
    CitationFields {
        author: Some("Vaswani, A., Shazeer, N.".into()),
        year: Some(2017),
        title: Some("Attention Is All You Need".into()),
        venue: Some("Advances in Neural Information Processing Systems".into()),
        doi: Some("10.5555/3295222.3295349".into()),
        url: Some(PAPER_URL.into()),
        ..Default::default()
    }
}

fn vaswani_record() -> BibRecord {
    BibRecord {
        title: Some("Attention is all you need".into()),
        authors: vec!["Vaswani".into(), "Shazeer".into(), "Parmar".into()],
        year: Some(2017),
        venue: Some("Advances in Neural Information Processing Systems 30".into()),
        doi: Some("10.5555/3295222.3295349".into()),
        source: "mock".into(),
        ..Default::default()
    }
}

fn vaswani_source() -> MockMetadataSource {
    MockMetadataSource::new().with_record(
        MetadataQuery::Doi("10.5555/3295222.3295349".into()),
        vaswani_record(),
    )
}

#[tokio::test]
async fn test_exact_doi_citation_is_verified_without_ai() {
    let http = MockHttp::new().route(PAPER_URL, MockRoute::page(200, PAGE));
    let judge = MockJudge::scoring("primary", 0.9);
    let v = verifier(http, vaswani_source(), vec![Arc::new(judge.clone())]);

    let verdict = v
        .verify_citation(
            vaswani_fields(),
            Some(CLAIM.into()),
            &VerifyOptions::default().without_ai(),
        )
        .await;

    let metadata = verdict.layer(LayerKind::Metadata).unwrap();
    assert_eq!(metadata.status(), LayerStatus::Passed);
    assert_eq!(metadata.score(), Some(1.0));
    assert_eq!(
        verdict.layer(LayerKind::Url).unwrap().status(),
        LayerStatus::Passed
    );
    assert_eq!(
        verdict.layer(LayerKind::Content).unwrap().status(),
        LayerStatus::Passed
    );

    let ai = verdict.layer(LayerKind::Ai).unwrap();
    assert_eq!(ai.status(), LayerStatus::Unavailable);
    assert_eq!(ai.evidence(), DISABLED_EVIDENCE);
    assert_eq!(judge.calls(), 0);

    assert_eq!(verdict.label(), VerdictLabel::Verified);
}

#[tokio::test]
async fn test_unreachable_url_without_doi_and_judges_down() {
    let v = verifier(
        MockHttp::new(),
        MockMetadataSource::new(),
        vec![
            Arc::new(MockJudge::failing("primary", "503 from upstream")),
            Arc::new(MockJudge::failing("fallback", "quota exceeded")),
        ],
    );

    let verdict = v
        .verify_citation(
            CitationFields {
                author: Some("Smith".into()),
                url: Some("https://gone.test/paper".into()),
                ..Default::default()
            },
            Some("Smith showed something remarkable about memory.".into()),
            &VerifyOptions::default(),
        )
        .await;

    let status = |kind| verdict.layer(kind).unwrap().status();
    assert_eq!(status(LayerKind::Url), LayerStatus::Failed);
    assert_eq!(status(LayerKind::Metadata), LayerStatus::Unavailable);
    assert_eq!(status(LayerKind::Content), LayerStatus::Unavailable);
    assert_eq!(status(LayerKind::Ai), LayerStatus::Unavailable);
    assert_eq!(verdict.label(), VerdictLabel::Unverifiable);
}

#[tokio::test]
async fn test_primary_judge_timeout_falls_back() {
    let primary = MockJudge::scoring("primary", 0.9).with_delay(Duration::from_millis(1_000));
    let fallback = MockJudge::scoring("fallback", 0.2);
    let v = verifier(
        MockHttp::new().route(PAPER_URL, MockRoute::page(200, PAGE)),
        vaswani_source(),
        vec![Arc::new(primary), Arc::new(fallback.clone())],
    );

    let verdict = v
        .verify_citation(vaswani_fields(), None, &VerifyOptions::default())
        .await;

    let ai = verdict.layer(LayerKind::Ai).unwrap();
    assert_eq!(ai.status(), LayerStatus::Passed);
    assert_eq!(ai.score(), Some(0.2));
    assert_eq!(ai.backend(), Some("fallback"));
    assert_eq!(fallback.calls(), 1);
}

#[tokio::test]
async fn test_disabled_layers_are_unavailable_for_every_candidate() {
    let http = MockHttp::new();
    let v = verifier(
        http.clone(),
        MockMetadataSource::new(),
        vec![Arc::new(MockJudge::scoring("primary", 0.9))],
    );

    let options = VerifyOptions::default().without_ai().without_content();
    let run = v
        .verify_text(
            "First claim (Smith, 2020) https://a.test/one.\nSecond claim (Lee, 2021) https://a.test/two.",
            &options,
        )
        .await
        .unwrap();

    assert_eq!(run.verdicts().len(), 2);
    for verdict in run.verdicts() {
        for kind in [LayerKind::Content, LayerKind::Ai] {
            let result = verdict.layer(kind).unwrap();
            assert_eq!(result.status(), LayerStatus::Unavailable);
            assert_eq!(result.evidence(), DISABLED_EVIDENCE);
        }
    }
    assert_eq!(http.fetch_count(), 0);
    assert_eq!(
        run.metadata().enabled_layers,
        vec![LayerKind::Url, LayerKind::Metadata]
    );
}

#[tokio::test]
async fn test_every_candidate_gets_one_verdict_in_order() {
    let v = verifier(MockHttp::new(), MockMetadataSource::new(), Vec::new());

    let text = "Early work (Hinton, 2006) set the stage.\n\
                Later (LeCun et al., 2015) summarized it.\n\
                Finally https://a.test/review wrapped up.";
    let run = v.verify_text(text, &VerifyOptions::default()).await.unwrap();

    let authors: Vec<Option<&str>> = run
        .candidates()
        .map(|c| c.fields().author.as_deref())
        .collect();
    assert_eq!(authors, vec![Some("Hinton"), Some("LeCun et al."), None]);
    assert_eq!(run.summary().total, 3);
    assert_eq!(run.metadata().state, RunState::Complete);
    for verdict in run.verdicts() {
        assert_eq!(verdict.results().count(), 4);
    }
}

#[tokio::test]
async fn test_text_without_citations_is_an_empty_run() {
    let v = verifier(MockHttp::new(), MockMetadataSource::new(), Vec::new());
    let run = v
        .verify_text("Nothing to see here.", &VerifyOptions::default())
        .await
        .unwrap();

    assert!(run.verdicts().is_empty());
    assert_eq!(run.confidence(), None);
    assert_eq!(run.summary(), RunSummary::default());
    assert_eq!(run.metadata().state, RunState::Complete);
}

#[tokio::test]
async fn test_extraction_failure_fails_the_run() {
    let v = verifier(MockHttp::new(), MockMetadataSource::new(), Vec::new());
    let err = v
        .verify_text("bad\u{7}input", &VerifyOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        VerifyError::Extraction(ExtractionError::Binary { offset: 3, .. })
    ));
}

#[tokio::test]
async fn test_slow_layer_times_out_alone() {
    let config = PipelineConfig {
        layer_timeout: Duration::from_millis(100),
        ..test_config()
    };
    let http = MockHttp::new().route(
        PAPER_URL,
        MockRoute::page(200, PAGE).with_delay(Duration::from_millis(800)),
    );
    let v = verifier_with(config, http, vaswani_source(), Vec::new());

    let verdict = v
        .verify_citation(vaswani_fields(), None, &VerifyOptions::default())
        .await;

    let url = verdict.layer(LayerKind::Url).unwrap();
    assert_eq!(url.status(), LayerStatus::TimedOut);
    assert_eq!(url.score(), None);
    assert_eq!(url.evidence(), "no result within 100 ms");
    assert_eq!(
        verdict.layer(LayerKind::Metadata).unwrap().status(),
        LayerStatus::Passed
    );
}

#[tokio::test]
async fn test_request_deadline_times_out_in_flight_layers() {
    let config = PipelineConfig {
        layer_timeout: Duration::from_secs(5),
        request_deadline: Duration::from_millis(200),
        ..test_config()
    };
    let source = vaswani_source().with_delay(Duration::from_secs(2));
    let http = MockHttp::new().route(PAPER_URL, MockRoute::page(200, PAGE));
    let v = verifier_with(config, http, source, Vec::new());

    let started = std::time::Instant::now();
    let verdict = v
        .verify_citation(vaswani_fields(), None, &VerifyOptions::default())
        .await;

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(
        verdict.layer(LayerKind::Metadata).unwrap().status(),
        LayerStatus::TimedOut
    );
    assert_eq!(
        verdict.layer(LayerKind::Url).unwrap().status(),
        LayerStatus::Passed
    );
}

#[tokio::test]
async fn test_single_permit_still_completes_every_candidate() {
    let config = PipelineConfig {
        max_in_flight: 1,
        ..test_config()
    };
    let http = MockHttp::new()
        .route("https://a.test/one", MockRoute::page(200, "ok"))
        .route("https://a.test/two", MockRoute::page(404, "missing"));
    let v = verifier_with(config, http.clone(), MockMetadataSource::new(), Vec::new());

    let run = v
        .verify_text(
            "One https://a.test/one here.\nTwo https://a.test/two there.",
            &VerifyOptions::default().without_content(),
        )
        .await
        .unwrap();

    assert_eq!(run.verdicts().len(), 2);
    assert_eq!(http.probe_count(), 2);
    let url_status: Vec<LayerStatus> = run
        .verdicts()
        .iter()
        .map(|v| v.layer(LayerKind::Url).unwrap().status())
        .collect();
    assert_eq!(url_status, vec![LayerStatus::Passed, LayerStatus::Failed]);
}

#[tokio::test]
async fn test_verify_batch_parses_each_citation() {
    let http = MockHttp::new().route(PAPER_URL, MockRoute::page(200, PAGE));
    let v = verifier(http, vaswani_source(), Vec::new());

    let citations = vec![
        "https://doi.org/10.5555/3295222.3295349".to_string(),
        "Smith, J. (2020). A paper nobody wrote. Journal of Nothing.".to_string(),
    ];
    let verdicts = v
        .verify_batch(&citations, &VerifyOptions::default().without_ai())
        .await;

    assert_eq!(verdicts.len(), 2);
    assert_eq!(
        verdicts[0].candidate().fields().doi.as_deref(),
        Some("10.5555/3295222.3295349")
    );
    assert_eq!(
        verdicts[1].candidate().fields().title.as_deref(),
        Some("A paper nobody wrote")
    );
    assert_eq!(
        verdicts[1].layer(LayerKind::Metadata).unwrap().status(),
        LayerStatus::Failed
    );
}

#[tokio::test]
async fn test_heuristic_flags_reach_the_verdict() {
    let v = verifier(MockHttp::new(), MockMetadataSource::new(), Vec::new());
    let verdict = v
        .verify_citation(
            CitationFields {
                author: Some("Nobody".into()),
                year: Some(2999),
                title: Some("A Paper From The Future".into()),
                ..Default::default()
            },
            None,
            &VerifyOptions::default(),
        )
        .await;

    assert!(!verdict.flags().is_empty());
    assert!(verdict.explanation().contains("red flags"));
}

#[test]
fn test_effective_deadline_only_shortens() {
    let v = verifier(MockHttp::new(), MockMetadataSource::new(), Vec::new());
    let base = v.config().request_deadline;

    assert_eq!(v.effective_deadline(&VerifyOptions::default()), base);
    assert_eq!(
        v.effective_deadline(&VerifyOptions::default().with_timeout_secs(1)),
        Duration::from_secs(1)
    );
    assert_eq!(
        v.effective_deadline(&VerifyOptions::default().with_timeout_secs(600)),
        base
    );
    assert_eq!(
        v.effective_deadline(&VerifyOptions::default().with_timeout_secs(0)),
        base
    );
}

#[test]
fn test_options_deserialize_with_defaults() {
    let options: VerifyOptions = serde_json::from_str(r#"{"check_content": false}"#).unwrap();
    assert!(options.enable_ai_scoring);
    assert!(!options.check_content);
    assert_eq!(options.timeout_secs, None);
    assert_eq!(
        options.enabled_layers(),
        vec![LayerKind::Url, LayerKind::Metadata, LayerKind::Ai]
    );
}

#[test]
fn test_run_states_only_move_forward() {
    assert!(RunState::Received.can_advance_to(RunState::Extracting));
    assert!(RunState::Extracting.can_advance_to(RunState::Failed));
    assert!(RunState::Aggregating.can_advance_to(RunState::Complete));
    assert!(!RunState::RunningLayers.can_advance_to(RunState::Failed));
    assert!(!RunState::Complete.can_advance_to(RunState::Extracting));
    assert!(RunState::Failed.is_terminal());
}

#[test]
fn test_pipeline_config_validation() {
    assert!(PipelineConfig::default().validate().is_ok());

    let zero_in_flight = PipelineConfig {
        max_in_flight: 0,
        ..Default::default()
    };
    assert!(zero_in_flight.validate().is_err());

    let deadline_too_short = PipelineConfig {
        layer_timeout: Duration::from_secs(10),
        request_deadline: Duration::from_secs(5),
        ..Default::default()
    };
    assert!(deadline_too_short.validate().is_err());
}

#[test]
fn test_lookup_attempts_fit_in_layer_budget() {
    let config = PipelineConfig {
        layer_timeout: Duration::from_millis(1_000),
        retry: RetryPolicy::new(1, Duration::from_millis(50)),
        ..Default::default()
    };
    let attempt = config.lookup_attempt_timeout();
    assert_eq!(attempt, Duration::from_millis(425));
    assert!(attempt * 2 + config.retry.delay_for(1) < config.layer_timeout);

    let single = PipelineConfig {
        layer_timeout: Duration::from_millis(1_000),
        retry: RetryPolicy::none(),
        ..Default::default()
    };
    assert_eq!(single.lookup_attempt_timeout(), Duration::from_millis(900));

    let starved = PipelineConfig {
        layer_timeout: Duration::from_millis(100),
        retry: RetryPolicy::new(3, Duration::from_millis(100)),
        ..Default::default()
    };
    assert_eq!(starved.lookup_attempt_timeout(), Duration::from_millis(50));
}
