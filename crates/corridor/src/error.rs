//! Error types for the corridor pipeline

use crate::tiers::TierKind;
use crate::pipeline::Stage;
use thiserror::Error;

/// Errors raised by the valley-bottom pipeline.
///
/// Every variant except `EmptyTierResult` is fatal: the run stops and no
/// partial corridor is produced.
#[derive(Error, Debug)]
pub enum CorridorError {
    #[error("Invalid coordinate system: {0}")]
    InvalidCoordinateSystem(String),

    #[error("Insufficient segmentation: network has {count} segments, more than {minimum} are required")]
    InsufficientSegmentation { count: usize, minimum: usize },

    #[error("Drainage area thresholds out of range: {0}")]
    ThresholdRangeError(String),

    /// A tier admitted no terrain. Absorbed by the tier builder.
    #[error("{0} tier produced no admitted area")]
    EmptyTierResult(TierKind),

    #[error("Engine failure: {0}")]
    EngineFailure(#[from] floodplain_core::Error),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Invalid stream network: {0}")]
    InvalidNetwork(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Cancelled before {0}")]
    Cancelled(Stage),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, CorridorError>;
