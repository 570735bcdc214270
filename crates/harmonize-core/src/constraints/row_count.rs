use harmonize_model::{ConstraintKey, JoinHow};

use super::{
    ConstraintValidator, ConstraintViolation, ValidationContext, ValidationStage, ViolationDetail,
};

/// `allow_row_decrease = false`: the join keeps at least as many rows as the
/// local table had.
pub struct RowDecreaseValidator;

impl ConstraintValidator for RowDecreaseValidator {
    fn key(&self) -> ConstraintKey {
        ConstraintKey::ALLOW_ROW_DECREASE
    }

    fn stage(&self) -> ValidationStage {
        ValidationStage::PostMerge
    }

    fn description(&self) -> &'static str {
        "Joined row count is not below the local row count"
    }

    // An empty remote table empties a cross join.
    fn applies_to(&self, _how: JoinHow) -> bool {
        true
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Option<ConstraintViolation> {
        let merge = ctx.merge?;
        let before = ctx.local.height();
        let after = merge.height();
        if after >= before {
            return None;
        }
        Some(ctx.violation(
            self.key(),
            self.stage(),
            ViolationDetail::RowDecrease { before, after },
        ))
    }
}
