//! Valley-bottom pipeline
//!
//! Validate → DrainageArea → Classify → ValidateRange → BuildTiers →
//! Merge → Filter → Dissolve → Aggregate → Smooth → Done
//!
//! Stages run strictly in this order. Intermediates are plain owned values
//! handed from one stage to the next; a failure or cancellation drops
//! them all. Cancellation is checked on entry to every stage, never inside
//! one.

use crate::assemble;
use crate::classify::{classify, ClassifiedNetwork};
use crate::drainage::{self, DrainageAreaSource};
use crate::engine::{Engine, NativeEngine};
use crate::error::{CorridorError, Result};
use crate::execution::ProcessingMode;
use crate::network::StreamNetwork;
use crate::params::CorridorParams;
use crate::tiers::{build_tiers, minimum_buffer, TierOutcome};
use crate::validate::{validate_drainage_range, validate_inputs};
use floodplain_core::vector::{AttributeValue, Feature, FeatureCollection};
use floodplain_core::Raster;
use geo::{Area, Geometry, MultiPolygon};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Validate,
    DrainageArea,
    Classify,
    ValidateRange,
    BuildTiers,
    Merge,
    Filter,
    Dissolve,
    Aggregate,
    Smooth,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Validate => "input validation",
            Stage::DrainageArea => "drainage area",
            Stage::Classify => "segment classification",
            Stage::ValidateRange => "drainage range validation",
            Stage::BuildTiers => "tier construction",
            Stage::Merge => "merge",
            Stage::Filter => "connectivity filter",
            Stage::Dissolve => "dissolve",
            Stage::Aggregate => "aggregation",
            Stage::Smooth => "smoothing",
            Stage::Done => "completion",
        })
    }
}

/// Shared flag requesting a pipeline stop at the next stage boundary
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of a pipeline run
#[derive(Debug, Clone)]
pub struct CorridorOutput {
    /// The valley-bottom polygon
    pub corridor: MultiPolygon<f64>,
    /// Per-segment drainage area and tier
    pub classified: ClassifiedNetwork,
    /// What each present tier contributed
    pub tiers: Vec<TierOutcome>,
    /// The unconditional floor corridor
    pub minimum_buffer: MultiPolygon<f64>,
}

impl CorridorOutput {
    /// Corridor area in CRS units squared
    pub fn area(&self) -> f64 {
        self.corridor.unsigned_area()
    }

    /// Number of disjoint parts
    pub fn parts(&self) -> usize {
        self.corridor.0.len()
    }

    /// The corridor as a one-feature collection carrying `area_m2` and `parts`
    pub fn to_features(&self) -> FeatureCollection {
        let mut feature = Feature::new(Geometry::MultiPolygon(self.corridor.clone()));
        feature.set_property("area_m2", AttributeValue::Float(self.area()));
        feature.set_property("parts", AttributeValue::Int(self.parts() as i64));
        std::iter::once(feature).collect()
    }
}

type StageObserver = Box<dyn Fn(Stage) + Send + Sync>;

/// Configured valley-bottom pipeline
pub struct Pipeline<E: Engine = NativeEngine> {
    params: CorridorParams,
    engine: E,
    cancel: CancelToken,
    mode: ProcessingMode,
    observer: Option<StageObserver>,
}

impl Pipeline<NativeEngine> {
    pub fn new(params: CorridorParams) -> Self {
        Self {
            params,
            engine: NativeEngine::new(),
            cancel: CancelToken::new(),
            mode: ProcessingMode::default(),
            observer: None,
        }
    }
}

impl<E: Engine> Pipeline<E> {
    /// Use another geometry & raster engine
    pub fn with_engine<F: Engine>(self, engine: F) -> Pipeline<F> {
        Pipeline {
            params: self.params,
            engine,
            cancel: self.cancel,
            mode: self.mode,
            observer: self.observer,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Scheduling of the tier builds
    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Called on entry to every stage, before the cancellation check
    pub fn with_observer(mut self, observer: impl Fn(Stage) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn params(&self) -> &CorridorParams {
        &self.params
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn enter(&self, stage: Stage) -> Result<()> {
        if let Some(observer) = &self.observer {
            observer(stage);
        }
        if self.cancel.is_cancelled() {
            return Err(CorridorError::Cancelled(stage));
        }
        info!("Stage: {}", stage);
        Ok(())
    }

    /// Run the pipeline.
    ///
    /// On success the network carries `DrainageAreaSqKm` on every segment.
    /// A failed or cancelled run leaves the network as it was.
    pub fn run(
        &self,
        dem: &Raster<f64>,
        network: &mut StreamNetwork,
        source: DrainageAreaSource,
    ) -> Result<CorridorOutput> {
        let engine = &self.engine;
        let params = &self.params;

        self.enter(Stage::Validate)?;
        validate_inputs(network, dem, params)?;

        self.enter(Stage::DrainageArea)?;
        let drainage_area = drainage::provide(engine, dem, source)?;

        self.enter(Stage::Classify)?;
        let classified = classify(
            engine,
            network,
            &drainage_area,
            &params.thresholds,
            params.sample_radius,
        )?;
        drop(drainage_area);

        self.enter(Stage::ValidateRange)?;
        validate_drainage_range(&classified.drainage_areas(), &params.thresholds, params.threshold_policy)?;
        for (kind, count) in classified.tier_counts() {
            info!("  {} tier: {} segments", kind, count);
        }

        self.enter(Stage::BuildTiers)?;
        let slope = engine.slope(dem)?;
        let tiers = build_tiers(engine, &params.tiers(), network, &classified, &slope, self.mode)?;
        drop(slope);
        let lines = network.geometry();
        let floor = minimum_buffer(engine, network, params.minimum_buffer)?;

        self.enter(Stage::Merge)?;
        let merged = assemble::merge(engine, &tiers, &floor)?;

        self.enter(Stage::Filter)?;
        let connected = assemble::filter_connected(engine, &merged, &lines)?;

        self.enter(Stage::Dissolve)?;
        let dissolved = assemble::dissolve(engine, &connected)?;

        self.enter(Stage::Aggregate)?;
        let aggregated = assemble::aggregate(engine, &dissolved, &params.aggregation)?;

        self.enter(Stage::Smooth)?;
        let smoothed = assemble::smooth(engine, &aggregated, &params.smoothing)?;
        let corridor = assemble::reassert_floor(engine, &smoothed, &floor, &lines)?;

        self.enter(Stage::Done)?;
        classified.write_to(network);
        let output = CorridorOutput {
            corridor,
            classified,
            tiers,
            minimum_buffer: floor,
        };
        info!("Corridor: {} parts, {:.0} m2", output.parts(), output.area());
        Ok(output)
    }
}
