use harmonize_model::ConstraintKey;

use super::{
    ConstraintValidator, ConstraintViolation, SAMPLE_LIMIT, ValidationContext, ValidationStage,
    ViolationDetail,
};
use crate::frame_utils::display_optional_key;

fn sample_keys(rows: &[usize], keys: &[Option<String>]) -> Vec<String> {
    rows.iter()
        .take(SAMPLE_LIMIT)
        .map(|&row| display_optional_key(keys.get(row).and_then(Option::as_ref)))
        .collect()
}

/// `allow_unmatched_left = false`: every local row matched a remote row.
///
/// Uses match statistics, so rows an inner join would drop are still counted.
pub struct UnmatchedLeftValidator;

impl ConstraintValidator for UnmatchedLeftValidator {
    fn key(&self) -> ConstraintKey {
        ConstraintKey::ALLOW_UNMATCHED_LEFT
    }

    fn stage(&self) -> ValidationStage {
        ValidationStage::PostMergeMatch
    }

    fn description(&self) -> &'static str {
        "Every local row matches at least one remote row"
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Option<ConstraintViolation> {
        let merge = ctx.merge?;
        let rows: Vec<usize> = merge.unmatched_left().collect();
        if rows.is_empty() {
            return None;
        }
        Some(ctx.violation(
            self.key(),
            self.stage(),
            ViolationDetail::UnmatchedLeft {
                count: rows.len(),
                sample: sample_keys(&rows, &ctx.keys.local),
            },
        ))
    }
}

/// `allow_unmatched_right = false`: every remote row was consumed by the join.
pub struct UnmatchedRightValidator;

impl ConstraintValidator for UnmatchedRightValidator {
    fn key(&self) -> ConstraintKey {
        ConstraintKey::ALLOW_UNMATCHED_RIGHT
    }

    fn stage(&self) -> ValidationStage {
        ValidationStage::PostMerge
    }

    fn description(&self) -> &'static str {
        "Every remote row matches at least one local row"
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Option<ConstraintViolation> {
        let merge = ctx.merge?;
        let rows: Vec<usize> = merge.unmatched_right().collect();
        if rows.is_empty() {
            return None;
        }
        Some(ctx.violation(
            self.key(),
            self.stage(),
            ViolationDetail::UnmatchedRight {
                count: rows.len(),
                sample: sample_keys(&rows, &ctx.keys.remote),
            },
        ))
    }
}
