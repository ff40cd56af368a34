//! # Floodplain Corridor
//!
//! Valley-bottom extraction for stream networks.
//!
//! Each segment of a network is classified by upstream drainage area into
//! one of three tiers. Every tier pairs a search buffer with a slope
//! threshold; terrain inside the buffer and below the threshold becomes
//! valley bottom. The tier polygons are merged with a minimum buffer,
//! filtered to the parts that touch the network, then aggregated and
//! smoothed into one corridor polygon.
//!
//! ```ignore
//! use floodplain_corridor::prelude::*;
//!
//! let output = Pipeline::new(CorridorParams::default())
//!     .run(&dem, &mut network, DrainageAreaSource::Derive)?;
//! ```

pub mod assemble;
pub mod classify;
pub mod drainage;
pub mod engine;
pub mod error;
pub mod execution;
pub mod network;
pub mod params;
pub mod pipeline;
pub mod tiers;
pub mod validate;

pub use classify::{ClassifiedNetwork, ClassifiedSegment};
pub use drainage::{DrainageAreaCache, DrainageAreaSource};
pub use engine::{Engine, NativeEngine};
pub use error::{CorridorError, Result};
pub use execution::ProcessingMode;
pub use network::{Segment, SegmentId, StreamNetwork, DRAINAGE_AREA_FIELD};
pub use params::{
    AggregationParameters, CorridorParams, SmoothingParameters, ThresholdPolicy, TierParameters,
    TierThresholds,
};
pub use pipeline::{CancelToken, CorridorOutput, Pipeline, Stage};
pub use tiers::{Tier, TierKind, TierOutcome};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AggregationParameters, CancelToken, ClassifiedNetwork, CorridorError, CorridorOutput, CorridorParams,
        DrainageAreaCache, DrainageAreaSource, Engine, NativeEngine, Pipeline, ProcessingMode,
        SmoothingParameters, Stage, StreamNetwork, ThresholdPolicy, TierKind, TierParameters, TierThresholds,
    };
    pub use floodplain_core::prelude::*;
}
