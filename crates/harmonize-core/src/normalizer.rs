//! Run orchestration.
//!
//! The normalizer walks the processing order once, runs the entity pipeline
//! for each entity and publishes the result to the table store. The first
//! fatal error aborts the run and the partially filled store is dropped.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use harmonize_model::EntityDescriptor;
use polars::prelude::DataFrame;
use tracing::{debug, info, info_span, warn};

use crate::constraints::{ValidatorRegistry, default_registry};
use crate::error::PipelineError;
use crate::extract::{DefaultExtractor, Extractor};
use crate::graph::ProcessState;
use crate::pipeline::{EntityPipeline, StepContext, StepState, build_default_pipeline};
use crate::store::TableStore;

/// What happened to one entity during a successful run.
#[derive(Debug, Clone)]
pub struct EntityReport {
    pub entity: String,
    /// Source type (`fixed`, `csv`, `entity`).
    pub source: &'static str,
    pub rows: usize,
    pub columns: usize,
    pub warnings: Vec<String>,
    pub steps: Vec<String>,
    pub generated_surrogate_id: bool,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub store: TableStore,
    /// One report per entity, in processing order.
    pub reports: Vec<EntityReport>,
}

impl RunOutput {
    pub fn warning_count(&self) -> usize {
        self.reports.iter().map(|r| r.warnings.len()).sum()
    }
}

pub struct Normalizer {
    pipeline: EntityPipeline,
    registry: Option<ValidatorRegistry>,
    extractor: Box<dyn Extractor>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    /// Default pipeline, built-in validators and the file/fixed loader.
    pub fn new() -> Self {
        Self {
            pipeline: build_default_pipeline(),
            registry: None,
            extractor: Box::new(DefaultExtractor),
        }
    }

    pub fn with_pipeline(mut self, pipeline: EntityPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Replaces the built-in validator registry.
    pub fn with_registry(mut self, registry: ValidatorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_extractor(mut self, extractor: Box<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        match &self.registry {
            Some(registry) => registry,
            None => default_registry(),
        }
    }

    pub fn pipeline(&self) -> &EntityPipeline {
        &self.pipeline
    }

    /// Processes every entity in `state` order and returns the filled store.
    pub fn run(
        &self,
        state: &ProcessState,
        entities: &[EntityDescriptor],
        store: TableStore,
    ) -> Result<TableStore, PipelineError> {
        self.run_with_report(state, entities, store)
            .map(|output| output.store)
    }

    /// Like [`Normalizer::run`], also returning per-entity reports.
    pub fn run_with_report(
        &self,
        state: &ProcessState,
        entities: &[EntityDescriptor],
        mut store: TableStore,
    ) -> Result<RunOutput, PipelineError> {
        let run_span = info_span!("run", entity_count = state.len());
        let _run_guard = run_span.enter();
        let run_start = Instant::now();

        let descriptors: BTreeMap<&str, &EntityDescriptor> = entities
            .iter()
            .map(|entity| (entity.name.as_str(), entity))
            .collect();
        let mut reports = Vec::with_capacity(state.len());

        for name in state.order() {
            let entity = descriptors
                .get(name.as_str())
                .copied()
                .ok_or_else(|| PipelineError::UnknownEntity {
                    entity: name.clone(),
                })?;
            let report = self.process_entity(entity, &descriptors, &mut store)?;
            reports.push(report);
        }

        info!(
            entity_count = reports.len(),
            duration_ms = run_start.elapsed().as_millis(),
            "run complete"
        );
        Ok(RunOutput { store, reports })
    }

    fn process_entity(
        &self,
        entity: &EntityDescriptor,
        descriptors: &BTreeMap<&str, &EntityDescriptor>,
        store: &mut TableStore,
    ) -> Result<EntityReport, PipelineError> {
        let entity_span = info_span!("entity", entity = %entity.name);
        let _entity_guard = entity_span.enter();
        let start = Instant::now();
        debug!(source = entity.source.kind(), "processing entity");

        let mut df = DataFrame::empty();
        let mut step_state = StepState::new();
        {
            let ctx = StepContext {
                store,
                entities: descriptors,
                registry: self.registry(),
                extractor: self.extractor.as_ref(),
            };
            self.pipeline
                .execute(entity, &mut df, &ctx, &mut step_state)?;
        }
        for warning in &step_state.warnings {
            warn!(warning = %warning, "data quality warning");
        }

        let rows = df.height();
        let columns = df.width();
        store
            .insert(entity.name.clone(), df)
            .map_err(|source| PipelineError::Store {
                entity: entity.name.clone(),
                source,
            })?;
        let duration = start.elapsed();
        info!(
            rows,
            columns,
            warnings = step_state.warnings.len(),
            duration_ms = duration.as_millis(),
            "entity stored"
        );

        Ok(EntityReport {
            entity: entity.name.clone(),
            source: entity.source.kind(),
            rows,
            columns,
            warnings: step_state.warnings,
            steps: step_state.executed_steps,
            generated_surrogate_id: step_state.generated_surrogate_id,
            duration,
        })
    }
}
