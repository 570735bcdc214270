use std::collections::HashSet;

use harmonize_model::{Cardinality, ConstraintKey};

use super::uniqueness::duplicate_keys;
use super::{
    ConstraintValidator, ConstraintViolation, ValidationContext, ValidationStage, ViolationDetail,
};
use crate::merge::MergeResult;

fn multiplied_rows(merge: &MergeResult) -> usize {
    merge.left_matches.iter().filter(|count| **count > 1).count()
}

/// The join must neither drop nor add rows relative to the local table.
fn row_count_changed(ctx: &ValidationContext<'_>, merge: &MergeResult) -> Option<String> {
    let (local, output) = (ctx.local.height(), merge.height());
    (output != local).then(|| format!("join returned {output} row(s) for {local} local row(s)"))
}

fn reused_remote_rows(merge: &MergeResult) -> usize {
    merge.right_matches.iter().filter(|count| **count > 1).count()
}

/// Distinct local keys (null counted once) among the given local rows.
fn distinct_local_keys<'a>(
    keys: &'a [Option<String>],
    rows: impl Iterator<Item = usize>,
) -> HashSet<Option<&'a str>> {
    rows.filter_map(|row| keys.get(row))
        .map(Option::as_deref)
        .collect()
}

/// `cardinality`: the declared multiplicity holds for the join.
///
/// * `many_to_one`: no local row matched more than one remote row and the
///   join returned exactly one row per local row.
/// * `one_to_one`: as `many_to_one`, remote keys are unique and no remote row
///   was matched by more than one local row.
/// * `one_to_many`: every distinct local key survives the join.
/// * `many_to_many`: no check (never active).
pub struct CardinalityValidator;

impl CardinalityValidator {
    fn reason(ctx: &ValidationContext<'_>, merge: &MergeResult) -> Option<String> {
        match ctx.constraints().cardinality() {
            Cardinality::ManyToMany => None,
            Cardinality::ManyToOne => {
                let multiplied = multiplied_rows(merge);
                if multiplied > 0 {
                    return Some(format!(
                        "{multiplied} local row(s) matched more than one remote row"
                    ));
                }
                row_count_changed(ctx, merge)
            }
            Cardinality::OneToOne => {
                let multiplied = multiplied_rows(merge);
                if multiplied > 0 {
                    return Some(format!(
                        "{multiplied} local row(s) matched more than one remote row"
                    ));
                }
                if let Some(reason) = row_count_changed(ctx, merge) {
                    return Some(reason);
                }
                let (duplicates, sample) = duplicate_keys(&ctx.keys.remote);
                if duplicates > 0 {
                    return Some(format!(
                        "remote keys are not unique ({duplicates} duplicate row(s), e.g. {})",
                        sample.join("; ")
                    ));
                }
                let reused = reused_remote_rows(merge);
                (reused > 0)
                    .then(|| format!("{reused} remote row(s) matched more than one local row"))
            }
            Cardinality::OneToMany => {
                let before = distinct_local_keys(&ctx.keys.local, 0..ctx.local.height());
                let kept = merge.local_rows.iter().flatten().copied();
                let after = distinct_local_keys(&ctx.keys.local, kept);
                (after.len() < before.len()).then(|| {
                    format!(
                        "distinct local keys decreased from {} to {}",
                        before.len(),
                        after.len()
                    )
                })
            }
        }
    }
}

impl ConstraintValidator for CardinalityValidator {
    fn key(&self) -> ConstraintKey {
        ConstraintKey::CARDINALITY
    }

    fn stage(&self) -> ValidationStage {
        ValidationStage::PostMergeMatch
    }

    fn description(&self) -> &'static str {
        "Declared relationship multiplicity holds"
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Option<ConstraintViolation> {
        let merge = ctx.merge?;
        let reason = Self::reason(ctx, merge)?;
        Some(ctx.violation(
            self.key(),
            self.stage(),
            ViolationDetail::Cardinality {
                expected: ctx.constraints().cardinality(),
                local_rows: ctx.local.height(),
                output_rows: merge.height(),
                reason,
            },
        ))
    }
}
