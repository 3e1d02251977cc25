use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::config::PipelineConfig;
use super::error::VerifyError;
use super::options::VerifyOptions;
use super::run::{RunMetadata, RunState, VerificationRun};
use crate::aggregate::{Aggregator, VerificationVerdict};
use crate::citation::{CitationCandidate, CitationFields, SourceSpan};
use crate::config::Config;
use crate::extract::{Extractor, parse_citation};
use crate::fetch::{ContentFetcher, HttpProbe, ReqwestHttp};
use crate::heuristics::{self, RedFlag};
use crate::judge::{JudgeChain, JudgeStatus};
use crate::layers::{
    AiLayer, ContentLayer, LayerKind, LayerResult, MetadataLayer, UrlLayer, VerificationLayer,
};
use crate::sources::{ArxivSource, CachedSource, CrossrefSource, MetadataSource};

/// Evidence recorded for a layer switched off in the request options.
pub const DISABLED_EVIDENCE: &str = "disabled by request options";

/// External collaborators the layers talk to.
pub struct Backends {
    pub probe: Arc<dyn HttpProbe>,
    pub fetcher: Arc<dyn ContentFetcher>,
    /// Tried in order; the first that supports a query answers it.
    pub sources: Vec<Arc<dyn MetadataSource>>,
    pub judges: JudgeChain,
}

impl Backends {
    /// Real HTTP, Crossref, arXiv and the configured judges.
    pub fn from_config(config: &Config) -> Result<Self, VerifyError> {
        let http = Arc::new(ReqwestHttp::new(
            config.pipeline.layer_timeout,
            config.pipeline.max_redirects,
        )?);

        let mut sources: Vec<Arc<dyn MetadataSource>> = vec![
            Arc::new(CrossrefSource::new(&config.lookup)?),
            Arc::new(ArxivSource::new(&config.lookup)?),
        ];
        if config.lookup.cache_enabled() {
            sources = sources
                .into_iter()
                .map(|source| {
                    Arc::new(CachedSource::new(
                        source,
                        config.lookup.cache_ttl,
                        config.lookup.cache_capacity,
                    )) as Arc<dyn MetadataSource>
                })
                .collect();
        }

        Ok(Self {
            probe: http.clone(),
            fetcher: http,
            sources,
            judges: JudgeChain::from_config(&config.judges)?,
        })
    }
}

/// Layer outcomes for one candidate before aggregation.
struct Collected {
    candidate: CitationCandidate,
    results: Vec<LayerResult>,
    flags: Vec<RedFlag>,
}

/// Tracks the run state and logs each transition.
struct RunProgress {
    run_id: Uuid,
    state: RunState,
}

impl RunProgress {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            state: RunState::Received,
        }
    }

    fn advance(&mut self, next: RunState) {
        if !self.state.can_advance_to(next) {
            warn!(run_id = %self.run_id, from = ?self.state, to = ?next, "Unexpected run transition");
        }
        debug!(run_id = %self.run_id, from = ?self.state, to = ?next, "Run state");
        self.state = next;
    }
}

/// Runs extraction, the four layers and aggregation.
///
/// The three technical layers of a candidate run concurrently; the AI layer
/// starts once they settle. Candidates run concurrently. Each technical call
/// is bounded by the layer timeout, and everything by the request deadline.
pub struct Verifier {
    config: PipelineConfig,
    extractor: Extractor,
    url: UrlLayer,
    metadata: MetadataLayer,
    content: ContentLayer,
    ai: AiLayer,
    aggregator: Aggregator,
}

impl Verifier {
    pub fn new(config: PipelineConfig, aggregator: Aggregator, backends: Backends) -> Self {
        Self {
            extractor: Extractor::new(config.extraction_limits()),
            url: UrlLayer::new(backends.probe, config.layer_timeout),
            metadata: MetadataLayer::new(backends.sources, config.retry),
            content: ContentLayer::new(backends.fetcher, config.layer_timeout),
            ai: AiLayer::new(backends.judges),
            aggregator,
            config,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, VerifyError> {
        let aggregator = Aggregator::new(config.policy)?;
        let backends = Backends::from_config(config)?;
        Ok(Self::new(config.pipeline, aggregator, backends))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn judge_statuses(&self) -> Vec<JudgeStatus> {
        self.ai.chain().statuses()
    }

    pub fn source_names(&self) -> Vec<String> {
        self.metadata.source_names()
    }

    /// Deadline for a request: the configured one, or shorter if asked.
    pub fn effective_deadline(&self, options: &VerifyOptions) -> Duration {
        match options.timeout_secs.filter(|secs| *secs > 0) {
            Some(secs) => Duration::from_secs(secs).min(self.config.request_deadline),
            None => self.config.request_deadline,
        }
    }

    /// Verifies one citation given as fields.
    #[instrument(skip_all)]
    pub async fn verify_citation(
        &self,
        fields: CitationFields,
        context: Option<String>,
        options: &VerifyOptions,
    ) -> VerificationVerdict {
        let candidate = CitationCandidate::from_fields(fields, context);
        let deadline = Instant::now() + self.effective_deadline(options);
        let permits = Semaphore::new(self.config.max_in_flight);

        let collected = self.collect(candidate, options, deadline, &permits).await;
        self.aggregate(collected)
    }

    /// Verifies raw citation strings, each parsed on its own.
    #[instrument(skip_all, fields(citations = citations.len()))]
    pub async fn verify_batch(
        &self,
        citations: &[String],
        options: &VerifyOptions,
    ) -> Vec<VerificationVerdict> {
        let deadline = Instant::now() + self.effective_deadline(options);
        let permits = Semaphore::new(self.config.max_in_flight);

        let candidates = citations.iter().map(|raw| {
            let raw = raw.trim();
            CitationCandidate::new(
                raw,
                parse_citation(raw),
                SourceSpan::new(0, raw.len()),
                None,
            )
        });
        let collected = join_all(
            candidates.map(|candidate| self.collect(candidate, options, deadline, &permits)),
        )
        .await;

        collected.into_iter().map(|c| self.aggregate(c)).collect()
    }

    /// Extracts every citation in `text` and verifies them.
    ///
    /// # Errors
    ///
    /// Only extraction can fail a run; layer failures end up in the verdicts.
    #[instrument(skip_all, fields(bytes = text.len()))]
    pub async fn verify_text(
        &self,
        text: &str,
        options: &VerifyOptions,
    ) -> Result<VerificationRun, VerifyError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();
        let mut progress = RunProgress::new(run_id);

        progress.advance(RunState::Extracting);
        let candidates = match self.extractor.extract(text, options.format) {
            Ok(candidates) => candidates,
            Err(err) => {
                progress.advance(RunState::Failed);
                warn!(run_id = %run_id, error = %err, "Extraction failed");
                return Err(err.into());
            }
        };

        progress.advance(RunState::RunningLayers);
        let deadline = started + self.effective_deadline(options);
        let permits = Semaphore::new(self.config.max_in_flight);
        let collected = join_all(
            candidates
                .into_iter()
                .map(|candidate| self.collect(candidate, options, deadline, &permits)),
        )
        .await;

        progress.advance(RunState::Aggregating);
        let verdicts: Vec<VerificationVerdict> =
            collected.into_iter().map(|c| self.aggregate(c)).collect();

        progress.advance(RunState::Complete);
        let metadata = RunMetadata {
            run_id,
            started_at,
            duration_ms: started.elapsed().as_millis() as u64,
            enabled_layers: options.enabled_layers(),
            state: progress.state,
        };
        let run = VerificationRun::new(verdicts, metadata);

        info!(
            run_id = %run_id,
            citations = run.verdicts().len(),
            verified = run.summary().verified,
            suspicious = run.summary().suspicious,
            unverifiable = run.summary().unverifiable,
            duration_ms = run.metadata().duration_ms,
            "Verification run complete"
        );
        Ok(run)
    }

    fn aggregate(&self, collected: Collected) -> VerificationVerdict {
        self.aggregator
            .aggregate(collected.candidate, collected.results, collected.flags)
    }

    async fn collect(
        &self,
        candidate: CitationCandidate,
        options: &VerifyOptions,
        deadline: Instant,
        permits: &Semaphore,
    ) -> Collected {
        let flags = heuristics::detect(&candidate);

        let (url, metadata, content) = tokio::join!(
            self.run_layer(&self.url, &candidate, options, deadline, permits),
            self.run_layer(&self.metadata, &candidate, options, deadline, permits),
            self.run_layer(&self.content, &candidate, options, deadline, permits),
        );
        let mut results = vec![url, metadata, content];

        let ai = self
            .run_ai(&candidate, &results, &flags, options, deadline, permits)
            .await;
        results.push(ai);

        debug!(
            candidate = candidate.id(),
            flags = flags.len(),
            "Layers settled"
        );
        Collected {
            candidate,
            results,
            flags,
        }
    }

    async fn run_layer(
        &self,
        layer: &dyn VerificationLayer,
        candidate: &CitationCandidate,
        options: &VerifyOptions,
        deadline: Instant,
        permits: &Semaphore,
    ) -> LayerResult {
        let kind = layer.kind();
        if !options.is_enabled(kind) {
            return LayerResult::unavailable(kind, DISABLED_EVIDENCE);
        }

        let started = Instant::now();
        let budget = self.config.layer_timeout;
        let work = async {
            let Ok(_permit) = permits.acquire().await else {
                return LayerResult::unavailable(kind, "admission closed");
            };
            match tokio::time::timeout(budget, layer.check(candidate)).await {
                Ok(result) => result,
                Err(_) => LayerResult::timed_out(kind, budget.as_millis() as u64),
            }
        };

        let result = match tokio::time::timeout_at(deadline, work).await {
            Ok(result) => result,
            Err(_) => LayerResult::timed_out(kind, started.elapsed().as_millis() as u64),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        debug!(
            candidate = candidate.id(),
            layer = %kind,
            status = %result.status(),
            elapsed_ms,
            "Layer finished"
        );
        result.with_elapsed_ms(elapsed_ms)
    }

    async fn run_ai(
        &self,
        candidate: &CitationCandidate,
        prior: &[LayerResult],
        flags: &[RedFlag],
        options: &VerifyOptions,
        deadline: Instant,
        permits: &Semaphore,
    ) -> LayerResult {
        if !options.is_enabled(LayerKind::Ai) {
            return LayerResult::unavailable(LayerKind::Ai, DISABLED_EVIDENCE);
        }

        let started = Instant::now();
        let work = async {
            let Ok(_permit) = permits.acquire().await else {
                return LayerResult::unavailable(LayerKind::Ai, "admission closed");
            };
            self.ai.check(candidate, prior, flags).await
        };

        let result = match tokio::time::timeout_at(deadline, work).await {
            Ok(result) => result,
            Err(_) => LayerResult::timed_out(LayerKind::Ai, started.elapsed().as_millis() as u64),
        };
        result.with_elapsed_ms(started.elapsed().as_millis() as u64)
    }
}
