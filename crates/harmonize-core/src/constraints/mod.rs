//! Relational-integrity validators for foreign key joins.
//!
//! Each validator checks one constraint key at one [`ValidationStage`] and
//! reports through its return value; validators never log. The linker selects
//! validators from a [`ValidatorRegistry`] by the keys active on the foreign
//! key, so a new constraint only needs a registered validator.
//!
//! # Example
//!
//! ```ignore
//! struct MaxFanout;
//!
//! impl ConstraintValidator for MaxFanout {
//!     fn key(&self) -> ConstraintKey {
//!         ConstraintKey::custom("max_fanout")
//!     }
//!
//!     fn stage(&self) -> ValidationStage {
//!         ValidationStage::PostMergeMatch
//!     }
//!
//!     fn check(&self, ctx: &ValidationContext<'_>) -> Option<ConstraintViolation> {
//!         // ...
//!     }
//! }
//!
//! let mut registry = build_default_registry();
//! registry.register(Box::new(MaxFanout));
//! ```

mod cardinality;
mod null_keys;
mod registry;
mod row_count;
mod uniqueness;
mod unmatched;
mod violation;

use std::fmt;

use harmonize_model::{ConstraintKey, ConstraintSet, ForeignKeyDescriptor, JoinHow};
use polars::prelude::DataFrame;
use serde::Serialize;

use crate::merge::{JoinKeys, MergeResult};

pub use cardinality::CardinalityValidator;
pub use null_keys::NullKeysValidator;
pub(crate) use null_keys::null_key_rows;
pub use registry::{ValidatorRegistry, build_default_registry, default_registry};
pub use row_count::RowDecreaseValidator;
pub use uniqueness::UniqueKeysValidator;
pub use unmatched::{UnmatchedLeftValidator, UnmatchedRightValidator};
pub use violation::{ConstraintViolation, ViolationDetail};

/// Number of offending key values quoted in a violation.
pub const SAMPLE_LIMIT: usize = 5;

/// When a validator runs relative to the join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStage {
    /// Against the local and remote tables, before joining.
    PreMerge,
    /// Against row counts of the join.
    PostMerge,
    /// Against per-row match statistics of the join.
    PostMergeMatch,
}

impl ValidationStage {
    pub const ALL: [Self; 3] = [Self::PreMerge, Self::PostMerge, Self::PostMergeMatch];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStage::PreMerge => "pre_merge",
            ValidationStage::PostMerge => "post_merge",
            ValidationStage::PostMergeMatch => "post_merge_match",
        }
    }
}

impl fmt::Display for ValidationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a validator may inspect.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub entity: &'a str,
    pub foreign_key: &'a ForeignKeyDescriptor,
    pub local: &'a DataFrame,
    pub remote: &'a DataFrame,
    pub keys: &'a JoinKeys,
    /// Present from the post-merge stage on.
    pub merge: Option<&'a MergeResult>,
}

impl ValidationContext<'_> {
    pub fn remote_entity(&self) -> &str {
        &self.foreign_key.entity
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.foreign_key.constraints
    }

    pub fn how(&self) -> JoinHow {
        self.foreign_key.how
    }

    pub fn violation(
        &self,
        key: ConstraintKey,
        stage: ValidationStage,
        detail: ViolationDetail,
    ) -> ConstraintViolation {
        ConstraintViolation {
            entity: self.entity.to_string(),
            remote_entity: self.remote_entity().to_string(),
            key,
            stage,
            detail,
        }
    }
}

/// A check for a single constraint key.
pub trait ConstraintValidator: Send + Sync {
    /// Constraint key that activates this validator.
    fn key(&self) -> ConstraintKey;

    fn stage(&self) -> ValidationStage;

    fn description(&self) -> &'static str {
        "Constraint validator"
    }

    /// Whether the check can ever fail for this join type.
    ///
    /// Defaults to every keyed join; cross joins have no keys to inspect.
    fn applies_to(&self, how: JoinHow) -> bool {
        how != JoinHow::Cross
    }

    /// Returns a violation, or `None` when the constraint holds.
    fn check(&self, ctx: &ValidationContext<'_>) -> Option<ConstraintViolation>;
}
