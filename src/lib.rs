//! Hallux library crate (used by the server and integration tests).
//!
//! Checks whether the citations in a piece of text are real and whether they
//! support the claim made next to them. Each citation goes through four
//! independent layers, and the aggregator folds their results into one label.
//!
//! # Public API Surface
//!
//! ## Pipeline
//! - [`Verifier`]: `verify_citation`, `verify_text`, `verify_batch`
//! - [`VerifyOptions`]: per-request layer switches
//! - [`VerificationRun`], [`VerificationVerdict`], [`VerdictLabel`]: outputs
//!
//! ## Layers
//! - [`UrlLayer`], [`MetadataLayer`], [`ContentLayer`], [`AiLayer`]
//! - [`LayerResult`], [`LayerKind`], [`LayerStatus`]
//!
//! ## Collaborators
//! - [`HttpProbe`], [`ContentFetcher`]: outbound HTTP ([`ReqwestHttp`])
//! - [`MetadataSource`]: [`CrossrefSource`], [`ArxivSource`], [`CachedSource`]
//! - [`Judge`]: [`OpenAiJudge`], [`GenaiJudge`], tried in order by [`JudgeChain`]
//!
//! ## Extraction and Aggregation
//! - [`Extractor`], [`parse_citation`]
//! - [`Aggregator`], [`AggregationPolicy`]
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod aggregate;
pub mod citation;
pub mod config;
pub mod constants;
pub mod extract;
pub mod fetch;
pub mod gateway;
pub mod hashing;
pub mod heuristics;
pub mod judge;
pub mod layers;
pub mod pipeline;
pub mod retry;
pub mod similarity;
pub mod sources;

pub use aggregate::{
    AggregationPolicy, Aggregator, LayerWeights, PolicyError, VerdictLabel, VerificationVerdict,
};
pub use citation::{CitationCandidate, CitationFields, SourceSpan, TextFormat};
pub use config::{Config, ConfigError, ServerConfig};
pub use constants::{
    HALLUX_STATUS_ERROR, HALLUX_STATUS_HEADER, HALLUX_STATUS_HEALTHY, HALLUX_STATUS_READY,
};
pub use extract::{ExtractionError, ExtractionLimits, Extractor, parse_citation};
pub use fetch::{ContentFetcher, FetchError, FetchedPage, HttpProbe, ProbeOutcome, ReqwestHttp};
#[cfg(any(test, feature = "mock"))]
pub use fetch::{MockHttp, MockRoute};
pub use heuristics::{FlagKind, RedFlag, Severity};
pub use judge::{
    GenaiJudge, Judge, JudgeBackend, JudgeChain, JudgeConfig, JudgeError, JudgeStatus,
    JudgeVerdict, OpenAiJudge,
};
#[cfg(any(test, feature = "mock"))]
pub use judge::MockJudge;
pub use layers::{
    AiLayer, ContentLayer, LayerError, LayerKind, LayerResult, LayerStatus, MetadataLayer,
    UrlLayer, VerificationLayer,
};
pub use pipeline::{
    Backends, PipelineConfig, RunMetadata, RunState, RunSummary, VerificationRun, VerifyError,
    VerifyOptions, Verifier,
};
pub use retry::RetryPolicy;
pub use sources::{
    ArxivSource, BibRecord, CachedSource, CrossrefSource, LookupConfig, MetadataQuery,
    MetadataSource,
};
#[cfg(any(test, feature = "mock"))]
pub use sources::MockMetadataSource;
