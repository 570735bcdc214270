//! Foreign key linking with staged constraint validation.
//!
//! A link runs in this order:
//!
//! 1. Shape and column checks (fatal configuration errors)
//! 2. Pre-merge validators against both tables
//! 3. Join execution
//! 4. Post-merge validators against row counts
//! 5. Post-merge-match validators against match statistics
//!
//! All violations raised within one stage are reported together; the first
//! failing stage stops the link.

use harmonize_model::{ConstraintKey, ForeignKeyDescriptor, JoinHow, ModelError, Side};
use polars::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::constraints::{
    ConstraintViolation, ValidationContext, ValidationStage, ValidatorRegistry, default_registry,
    null_key_rows,
};
use crate::frame_utils::{has_column, missing_columns};
use crate::merge::{JoinKeys, MergeSpec, merge_with_keys};

#[derive(Debug, Error)]
pub enum LinkError {
    #[error(transparent)]
    Shape(#[from] ModelError),

    #[error("foreign key {entity} -> {remote}: {side} table is missing column(s) {}", columns.join(", "))]
    MissingColumns {
        entity: String,
        remote: String,
        side: Side,
        columns: Vec<String>,
    },

    #[error("foreign key {entity} -> {remote}: carried column {column} already exists in {entity}")]
    ColumnCollision {
        entity: String,
        remote: String,
        column: String,
    },

    #[error(
        "foreign key {entity} -> {remote}: {} constraint violation(s) at {stage}: {}",
        violations.len(),
        violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    Violations {
        entity: String,
        remote: String,
        stage: ValidationStage,
        violations: Vec<ConstraintViolation>,
    },

    #[error(transparent)]
    Frame(#[from] PolarsError),
}

impl LinkError {
    /// Constraint violations carried by this error, if any.
    pub fn violations(&self) -> &[ConstraintViolation] {
        match self {
            LinkError::Violations { violations, .. } => violations,
            _ => &[],
        }
    }
}

/// One foreign key to execute.
#[derive(Debug, Clone, Copy)]
pub struct LinkRequest<'a> {
    pub entity: &'a str,
    pub local: &'a DataFrame,
    pub remote: &'a DataFrame,
    pub foreign_key: &'a ForeignKeyDescriptor,
    /// Surrogate id column declared by the remote entity.
    pub remote_id: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct LinkOutcome {
    pub table: DataFrame,
    /// Data-quality findings that did not abort the link.
    pub warnings: Vec<String>,
}

/// Executes foreign keys against a validator registry.
#[derive(Clone, Copy)]
pub struct Linker<'r> {
    registry: &'r ValidatorRegistry,
}

impl Default for Linker<'static> {
    fn default() -> Self {
        Self::new(default_registry())
    }
}

impl<'r> Linker<'r> {
    pub fn new(registry: &'r ValidatorRegistry) -> Self {
        Self { registry }
    }

    pub fn link(&self, request: &LinkRequest<'_>) -> Result<LinkOutcome, LinkError> {
        let fk = request.foreign_key;
        fk.validate_shape(request.entity)?;
        let carried = self.carried_columns(request)?;

        let keys = if fk.how == JoinHow::Cross {
            JoinKeys::default()
        } else {
            JoinKeys::compute(request.local, &fk.local_keys, request.remote, &fk.remote_keys)?
        };
        let mut warnings = self.advisories(request);
        warnings.extend(null_key_warnings(request, &keys));

        let mut ctx = ValidationContext {
            entity: request.entity,
            foreign_key: fk,
            local: request.local,
            remote: request.remote,
            keys: &keys,
            merge: None,
        };
        self.run_stage(ValidationStage::PreMerge, &ctx)?;

        let spec = MergeSpec {
            how: fk.how,
            local_keys: &fk.local_keys,
            remote_keys: &fk.remote_keys,
            carried: &carried,
        };
        let merged = merge_with_keys(request.local, request.remote, &spec, &keys)?;
        ctx.merge = Some(&merged);
        self.run_stage(ValidationStage::PostMerge, &ctx)?;
        self.run_stage(ValidationStage::PostMergeMatch, &ctx)?;

        debug!(
            entity = request.entity,
            remote = %fk.entity,
            how = %fk.how,
            rows_local = request.local.height(),
            rows_remote = request.remote.height(),
            rows_out = merged.height(),
            carried = carried.len(),
            "linked foreign key"
        );
        Ok(LinkOutcome {
            table: merged.table,
            warnings,
        })
    }

    /// Remote surrogate id (when present) followed by the declared extras.
    fn carried_columns(&self, request: &LinkRequest<'_>) -> Result<Vec<String>, LinkError> {
        let fk = request.foreign_key;
        let missing_local = missing_columns(request.local, &fk.local_keys);
        if !missing_local.is_empty() {
            return Err(LinkError::MissingColumns {
                entity: request.entity.to_string(),
                remote: fk.entity.clone(),
                side: Side::Left,
                columns: missing_local,
            });
        }
        let mut wanted = fk.remote_keys.clone();
        wanted.extend(fk.extra_columns.iter().cloned());
        let missing_remote = missing_columns(request.remote, &wanted);
        if !missing_remote.is_empty() {
            return Err(LinkError::MissingColumns {
                entity: request.entity.to_string(),
                remote: fk.entity.clone(),
                side: Side::Right,
                columns: missing_remote,
            });
        }

        let mut carried: Vec<String> = Vec::new();
        if let Some(id) = request.remote_id
            && has_column(request.remote, id)
        {
            carried.push(id.to_string());
        }
        for column in &fk.extra_columns {
            if !carried.contains(column) {
                carried.push(column.clone());
            }
        }

        for column in &carried {
            let shared_key = fk
                .key_pairs()
                .any(|(local, remote)| local == remote && local == column.as_str());
            if has_column(request.local, column) && !shared_key {
                return Err(LinkError::ColumnCollision {
                    entity: request.entity.to_string(),
                    remote: fk.entity.clone(),
                    column: column.clone(),
                });
            }
        }
        Ok(carried)
    }

    fn run_stage(
        &self,
        stage: ValidationStage,
        ctx: &ValidationContext<'_>,
    ) -> Result<(), LinkError> {
        let constraints = ctx.constraints();
        let violations: Vec<ConstraintViolation> = self
            .registry
            .for_stage(stage)
            .filter(|validator| constraints.is_active(validator.key()))
            .filter(|validator| validator.applies_to(ctx.how()))
            .filter_map(|validator| validator.check(ctx))
            .collect();
        if violations.is_empty() {
            return Ok(());
        }
        Err(LinkError::Violations {
            entity: ctx.entity.to_string(),
            remote: ctx.remote_entity().to_string(),
            stage,
            violations,
        })
    }

    /// Active constraints that will not be checked, with the reason.
    fn advisories(&self, request: &LinkRequest<'_>) -> Vec<String> {
        let fk = request.foreign_key;
        let mut warnings = Vec::new();
        for validator in self.registry.iter() {
            let key = validator.key();
            if fk.constraints.is_active(key) && !validator.applies_to(fk.how) {
                warnings.push(format!(
                    "foreign key {} -> {}: constraint {key} never applies to a {} join; ignored",
                    request.entity, fk.entity, fk.how
                ));
            }
        }
        for key in fk.constraints.active_keys() {
            if !self.registry.handles(&key) {
                warnings.push(format!(
                    "foreign key {} -> {}: no validator registered for constraint {key}; ignored",
                    request.entity, fk.entity
                ));
            }
        }
        warnings
    }
}

/// Null keys are allowed unless `allow_null_keys = false`; they are reported
/// because such rows never match.
fn null_key_warnings(request: &LinkRequest<'_>, keys: &JoinKeys) -> Vec<String> {
    let fk = request.foreign_key;
    if fk.how == JoinHow::Cross || fk.constraints.is_active(ConstraintKey::ALLOW_NULL_KEYS) {
        return Vec::new();
    }
    let mut warnings = Vec::new();
    let local = null_key_rows(&keys.local);
    if local > 0 {
        warnings.push(format!(
            "foreign key {} -> {}: {local} local row(s) have a null key and never match",
            request.entity, fk.entity
        ));
    }
    let remote = null_key_rows(&keys.remote);
    if remote > 0 {
        warnings.push(format!(
            "foreign key {} -> {}: {remote} remote row(s) have a null key and never match",
            request.entity, fk.entity
        ));
    }
    warnings
}
