use harmonize_model::ConstraintKey;
use polars::prelude::DataFrame;

use super::{
    ConstraintValidator, ConstraintViolation, ValidationContext, ValidationStage, ViolationDetail,
};

/// Key columns of `df` holding at least one null, as `entity.column`.
pub(crate) fn null_key_columns(entity: &str, df: &DataFrame, columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .filter(|name| {
            df.column(name)
                .map(|column| column.null_count() > 0)
                .unwrap_or(false)
        })
        .map(|name| format!("{entity}.{name}"))
        .collect()
}

/// Rows with a null in any key column (a row whose rendered key is missing).
pub(crate) fn null_key_rows(keys: &[Option<String>]) -> usize {
    keys.iter().filter(|key| key.is_none()).count()
}

/// `allow_null_keys = false`: no key column on either side may hold a null.
pub struct NullKeysValidator;

impl ConstraintValidator for NullKeysValidator {
    fn key(&self) -> ConstraintKey {
        ConstraintKey::ALLOW_NULL_KEYS
    }

    fn stage(&self) -> ValidationStage {
        ValidationStage::PreMerge
    }

    fn description(&self) -> &'static str {
        "No null values in local or remote key columns"
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Option<ConstraintViolation> {
        let left_rows = null_key_rows(&ctx.keys.local);
        let right_rows = null_key_rows(&ctx.keys.remote);
        if left_rows == 0 && right_rows == 0 {
            return None;
        }
        let mut columns = null_key_columns(ctx.entity, ctx.local, &ctx.foreign_key.local_keys);
        columns.extend(null_key_columns(
            ctx.remote_entity(),
            ctx.remote,
            &ctx.foreign_key.remote_keys,
        ));
        Some(ctx.violation(
            self.key(),
            self.stage(),
            ViolationDetail::NullKeys {
                left_rows,
                right_rows,
                columns,
            },
        ))
    }
}
