//! Per-entity processing pipeline with ordered step execution.
//!
//! Each step implements the [`EntityStep`] trait and is executed in order.
//!
//! # Standard Pipeline Order
//!
//! 1. **ExtractStep** - Load the source and append constant extra columns
//! 2. **FilterStep** - Apply row filters
//! 3. **DedupeStep** - Drop duplicate rows
//! 4. **LinkStep** - Execute foreign keys in declaration order
//! 5. **UnnestStep** - Reshape wide columns into long form
//! 6. **TranslateStep** - Rename and select output columns
//! 7. **SurrogateIdStep** - Generate the identity column when absent
//! 8. **KeyCheckStep** - Enforce natural key and surrogate id uniqueness
//!
//! Storing the result is left to the caller, so a table that fails any step is
//! never published.

use std::collections::BTreeMap;

use harmonize_ingest::scalar_column;
use harmonize_model::EntityDescriptor;
use polars::prelude::DataFrame;
use tracing::debug;

use crate::constraints::ValidatorRegistry;
use crate::dedupe::drop_duplicates;
use crate::error::{PipelineError, PipelineStage};
use crate::extract::Extractor;
use crate::filter::apply_filter;
use crate::frame_utils::has_column;
use crate::keys::{check_surrogate_id, check_unique, ensure_surrogate_id};
use crate::linker::{LinkRequest, Linker};
use crate::store::TableStore;
use crate::translate::translate;
use crate::unnest::unnest;

/// Read-only inputs shared by every step of a run.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub store: &'a TableStore,
    /// Every descriptor of the run, by entity name.
    pub entities: &'a BTreeMap<&'a str, &'a EntityDescriptor>,
    pub registry: &'a ValidatorRegistry,
    pub extractor: &'a dyn Extractor,
}

/// Mutable state shared across the steps of one entity.
#[derive(Debug, Default)]
pub struct StepState {
    /// Non-fatal findings, logged by the caller.
    pub warnings: Vec<String>,
    /// Step execution log for debugging.
    pub executed_steps: Vec<String>,
    /// Whether the surrogate id column was generated rather than loaded.
    pub generated_surrogate_id: bool,
}

impl StepState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A single processing step in the entity pipeline.
pub trait EntityStep: Send + Sync {
    /// Execute this step on the entity table (modified in place).
    fn execute(
        &self,
        entity: &EntityDescriptor,
        df: &mut DataFrame,
        ctx: &StepContext<'_>,
        state: &mut StepState,
    ) -> Result<(), PipelineError>;

    fn stage(&self) -> PipelineStage;

    /// Human-readable name for this step (for logging/debugging).
    fn step_name(&self) -> &str {
        self.stage().as_str()
    }

    /// Whether this step has nothing to do for `entity`.
    fn should_skip(&self, _entity: &EntityDescriptor) -> bool {
        false
    }
}

/// An ordered pipeline of entity steps.
pub struct EntityPipeline {
    steps: Vec<Box<dyn EntityStep>>,
}

impl Default for EntityPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Add a step to the end of the pipeline.
    pub fn add_step(mut self, step: Box<dyn EntityStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Insert a step at a specific position.
    pub fn insert_step(mut self, index: usize, step: Box<dyn EntityStep>) -> Self {
        self.steps.insert(index, step);
        self
    }

    /// Remove a step by name.
    pub fn remove_step(mut self, step_name: &str) -> Self {
        self.steps.retain(|s| s.step_name() != step_name);
        self
    }

    /// Execute all steps in order.
    pub fn execute(
        &self,
        entity: &EntityDescriptor,
        df: &mut DataFrame,
        ctx: &StepContext<'_>,
        state: &mut StepState,
    ) -> Result<(), PipelineError> {
        for step in &self.steps {
            if step.should_skip(entity) {
                continue;
            }
            step.execute(entity, df, ctx, state)?;
            debug!(
                entity = %entity.name,
                step = step.step_name(),
                rows = df.height(),
                columns = df.width(),
                "step complete"
            );
            state.executed_steps.push(step.step_name().to_string());
        }
        Ok(())
    }

    /// List step names in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.step_name()).collect()
    }
}

// ============================================================================
// Standard Processing Steps
// ============================================================================

/// Step 1: load the source, then append constant extra columns by name order.
pub struct ExtractStep;

impl EntityStep for ExtractStep {
    fn execute(
        &self,
        entity: &EntityDescriptor,
        df: &mut DataFrame,
        ctx: &StepContext<'_>,
        _state: &mut StepState,
    ) -> Result<(), PipelineError> {
        let mut table =
            ctx.extractor
                .extract(entity, ctx.store)
                .map_err(|source| PipelineError::Extract {
                    entity: entity.name.clone(),
                    source,
                })?;
        for (name, value) in &entity.extra_columns {
            if has_column(&table, name) {
                return Err(PipelineError::ColumnCollision {
                    entity: entity.name.clone(),
                    stage: PipelineStage::Extract,
                    column: name.clone(),
                });
            }
            let column = scalar_column(name, value, table.height());
            table
                .with_column(column)
                .map_err(|e| PipelineError::frame(&entity.name, PipelineStage::Extract, e))?;
        }
        *df = table;
        Ok(())
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::Extract
    }
}

/// Step 2: apply row filters in declaration order.
pub struct FilterStep;

impl EntityStep for FilterStep {
    fn execute(
        &self,
        entity: &EntityDescriptor,
        df: &mut DataFrame,
        ctx: &StepContext<'_>,
        _state: &mut StepState,
    ) -> Result<(), PipelineError> {
        for filter in &entity.filters {
            let before = df.height();
            *df = apply_filter(&entity.name, df, filter, ctx.store).map_err(|source| {
                PipelineError::Filter {
                    entity: entity.name.clone(),
                    source,
                }
            })?;
            debug!(
                entity = %entity.name,
                filter = filter.kind(),
                removed = before - df.height(),
                "filter applied"
            );
        }
        Ok(())
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::Filter
    }

    fn should_skip(&self, entity: &EntityDescriptor) -> bool {
        entity.filters.is_empty()
    }
}

/// Step 3: drop duplicate rows.
pub struct DedupeStep;

impl EntityStep for DedupeStep {
    fn execute(
        &self,
        entity: &EntityDescriptor,
        df: &mut DataFrame,
        _ctx: &StepContext<'_>,
        _state: &mut StepState,
    ) -> Result<(), PipelineError> {
        *df = drop_duplicates(&entity.name, df, &entity.drop_duplicates)?;
        Ok(())
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::Dedupe
    }

    fn should_skip(&self, entity: &EntityDescriptor) -> bool {
        !entity.drop_duplicates.is_enabled()
    }
}

/// Step 4: execute every foreign key against the stored remote tables.
pub struct LinkStep;

impl EntityStep for LinkStep {
    fn execute(
        &self,
        entity: &EntityDescriptor,
        df: &mut DataFrame,
        ctx: &StepContext<'_>,
        state: &mut StepState,
    ) -> Result<(), PipelineError> {
        let linker = Linker::new(ctx.registry);
        for fk in &entity.foreign_keys {
            let remote = ctx
                .store
                .require(&fk.entity)
                .map_err(|source| PipelineError::Store {
                    entity: entity.name.clone(),
                    source,
                })?;
            let remote_id = ctx
                .entities
                .get(fk.entity.as_str())
                .and_then(|descriptor| descriptor.surrogate_id.as_deref());
            let outcome = linker
                .link(&LinkRequest {
                    entity: &entity.name,
                    local: df,
                    remote,
                    foreign_key: fk,
                    remote_id,
                })
                .map_err(|source| PipelineError::Link {
                    entity: entity.name.clone(),
                    source,
                })?;
            *df = outcome.table;
            state.warnings.extend(outcome.warnings);
        }
        Ok(())
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::Link
    }

    fn should_skip(&self, entity: &EntityDescriptor) -> bool {
        entity.foreign_keys.is_empty()
    }
}

/// Step 5: reshape wide to long.
pub struct UnnestStep;

impl EntityStep for UnnestStep {
    fn execute(
        &self,
        entity: &EntityDescriptor,
        df: &mut DataFrame,
        _ctx: &StepContext<'_>,
        state: &mut StepState,
    ) -> Result<(), PipelineError> {
        let Some(spec) = &entity.unnest else {
            return Ok(());
        };
        let unnested = unnest(&entity.name, df, spec).map_err(|source| PipelineError::Unnest {
            entity: entity.name.clone(),
            source,
        })?;
        *df = unnested.table;
        state.warnings.extend(unnested.warnings);
        Ok(())
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::Unnest
    }

    fn should_skip(&self, entity: &EntityDescriptor) -> bool {
        entity.unnest.is_none()
    }
}

/// Step 6: rename, then select output columns.
pub struct TranslateStep;

impl EntityStep for TranslateStep {
    fn execute(
        &self,
        entity: &EntityDescriptor,
        df: &mut DataFrame,
        _ctx: &StepContext<'_>,
        _state: &mut StepState,
    ) -> Result<(), PipelineError> {
        *df = translate(entity, df)?;
        Ok(())
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::Translate
    }

    fn should_skip(&self, entity: &EntityDescriptor) -> bool {
        entity.rename.is_empty() && entity.columns.is_empty()
    }
}

/// Step 7: generate the surrogate id column when the table lacks it.
pub struct SurrogateIdStep;

impl EntityStep for SurrogateIdStep {
    fn execute(
        &self,
        entity: &EntityDescriptor,
        df: &mut DataFrame,
        _ctx: &StepContext<'_>,
        state: &mut StepState,
    ) -> Result<(), PipelineError> {
        if let Some(column) = &entity.surrogate_id {
            state.generated_surrogate_id = ensure_surrogate_id(&entity.name, df, column)?;
        }
        Ok(())
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::SurrogateId
    }

    fn should_skip(&self, entity: &EntityDescriptor) -> bool {
        entity.surrogate_id.is_none()
    }
}

/// Step 8: the natural key and the surrogate id must be unique.
pub struct KeyCheckStep;

impl EntityStep for KeyCheckStep {
    fn execute(
        &self,
        entity: &EntityDescriptor,
        df: &mut DataFrame,
        _ctx: &StepContext<'_>,
        _state: &mut StepState,
    ) -> Result<(), PipelineError> {
        check_unique(&entity.name, df, &entity.keys, PipelineStage::KeyCheck)?;
        if let Some(column) = &entity.surrogate_id {
            check_surrogate_id(&entity.name, df, column)?;
        }
        Ok(())
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::KeyCheck
    }

    fn should_skip(&self, entity: &EntityDescriptor) -> bool {
        entity.keys.is_empty() && entity.surrogate_id.is_none()
    }
}

/// Build the default entity pipeline.
pub fn build_default_pipeline() -> EntityPipeline {
    EntityPipeline::new()
        .add_step(Box::new(ExtractStep))
        .add_step(Box::new(FilterStep))
        .add_step(Box::new(DedupeStep))
        .add_step(Box::new(LinkStep))
        .add_step(Box::new(UnnestStep))
        .add_step(Box::new(TranslateStep))
        .add_step(Box::new(SurrogateIdStep))
        .add_step(Box::new(KeyCheckStep))
}
