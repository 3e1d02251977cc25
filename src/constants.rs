//! Cross-cutting, shared constants.
//!
//! Defaults here are the values a deployment starts from; every one of them can be
//! overridden through the `HALLUX_*` environment (see [`crate::config`]).
//!
//! # Policy Invariants
//!
//! The aggregation defaults must satisfy the same checks enforced at runtime by
//! [`AggregationPolicy::validate`](crate::aggregate::AggregationPolicy::validate):
//!
//! 1. `DEFAULT_LOW_THRESHOLD < DEFAULT_HIGH_THRESHOLD`, both inside `[0, 1]`
//! 2. `DEFAULT_AI_WEIGHT` is at least each technical layer weight
//! 3. All weights are strictly positive

use std::time::Duration;

pub const DEFAULT_URL_WEIGHT: f64 = 0.20;
pub const DEFAULT_METADATA_WEIGHT: f64 = 0.25;
pub const DEFAULT_CONTENT_WEIGHT: f64 = 0.20;
pub const DEFAULT_AI_WEIGHT: f64 = 0.35;

pub const DEFAULT_HIGH_THRESHOLD: f64 = 0.70;
pub const DEFAULT_LOW_THRESHOLD: f64 = 0.40;

/// A lone scored layer is not enough evidence for either extreme label.
pub const DEFAULT_MIN_SCORED_LAYERS: usize = 2;

pub const DEFAULT_LAYER_TIMEOUT: Duration = Duration::from_millis(4_000);
pub const DEFAULT_JUDGE_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_REQUEST_DEADLINE: Duration = Duration::from_millis(30_000);

pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;
pub const DEFAULT_MAX_CITATIONS: usize = 100;
pub const DEFAULT_MAX_TEXT_BYTES: usize = 1024 * 1024;

pub const DEFAULT_RETRY_MAX: u32 = 1;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);

pub const DEFAULT_MAX_REDIRECTS: usize = 5;

pub const DEFAULT_METADATA_CACHE_TTL: Duration = Duration::from_secs(3_600);
pub const DEFAULT_METADATA_CACHE_CAPACITY: u64 = 10_000;

/// Page text shorter than this is considered too thin to align against.
pub const MIN_ALIGNABLE_CONTENT_CHARS: usize = 100;

/// Both sides of an alignment are truncated to this many characters.
pub const MAX_ALIGNMENT_CHARS: usize = 20_000;

pub const USER_AGENT: &str = concat!(
    "Hallux/",
    env!("CARGO_PKG_VERSION"),
    " (citation verification)"
);

pub const HALLUX_STATUS_HEADER: &str = "X-Hallux-Status";
pub const HALLUX_STATUS_HEALTHY: &str = "healthy";
pub const HALLUX_STATUS_READY: &str = "ready";
pub const HALLUX_STATUS_ERROR: &str = "error";

/// Upper bound on raw citations accepted by one batch request.
pub const MAX_BATCH_CITATIONS: usize = 100;
