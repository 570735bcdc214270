use std::collections::HashSet;

use harmonize_model::{ConstraintKey, Side};

use super::{
    ConstraintValidator, ConstraintViolation, SAMPLE_LIMIT, ValidationContext, ValidationStage,
    ViolationDetail,
};
use crate::frame_utils::display_key;

/// Counts rows whose key already appeared, skipping null keys.
///
/// Returns the count and up to [`SAMPLE_LIMIT`] distinct duplicated keys.
pub(crate) fn duplicate_keys(keys: &[Option<String>]) -> (usize, Vec<String>) {
    let mut seen = HashSet::new();
    let mut sampled = HashSet::new();
    let mut count = 0;
    let mut sample = Vec::new();
    for key in keys.iter().flatten() {
        if seen.insert(key.as_str()) {
            continue;
        }
        count += 1;
        if sample.len() < SAMPLE_LIMIT && sampled.insert(key.as_str()) {
            sample.push(display_key(key));
        }
    }
    (count, sample)
}

/// `require_unique_left` / `require_unique_right`: no duplicate key combination
/// on that side before the join.
pub struct UniqueKeysValidator {
    side: Side,
}

impl UniqueKeysValidator {
    pub fn new(side: Side) -> Self {
        Self { side }
    }
}

impl ConstraintValidator for UniqueKeysValidator {
    fn key(&self) -> ConstraintKey {
        match self.side {
            Side::Left => ConstraintKey::REQUIRE_UNIQUE_LEFT,
            Side::Right => ConstraintKey::REQUIRE_UNIQUE_RIGHT,
        }
    }

    fn stage(&self) -> ValidationStage {
        ValidationStage::PreMerge
    }

    fn description(&self) -> &'static str {
        match self.side {
            Side::Left => "Local key columns hold no duplicate combination",
            Side::Right => "Remote key columns hold no duplicate combination",
        }
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Option<ConstraintViolation> {
        let (keys, columns) = match self.side {
            Side::Left => (&ctx.keys.local, &ctx.foreign_key.local_keys),
            Side::Right => (&ctx.keys.remote, &ctx.foreign_key.remote_keys),
        };
        let (duplicate_rows, sample) = duplicate_keys(keys);
        if duplicate_rows == 0 {
            return None;
        }
        Some(ctx.violation(
            self.key(),
            self.stage(),
            ViolationDetail::DuplicateKeys {
                side: self.side,
                columns: columns.clone(),
                duplicate_rows,
                sample,
            },
        ))
    }
}
