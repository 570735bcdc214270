use std::fmt;

use harmonize_model::{Cardinality, ConstraintKey, Side};
use serde::Serialize;

use super::ValidationStage;

/// Numeric and key-level evidence for a violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationDetail {
    DuplicateKeys {
        side: Side,
        columns: Vec<String>,
        /// Rows whose key already appeared earlier on that side.
        duplicate_rows: usize,
        sample: Vec<String>,
    },
    NullKeys {
        left_rows: usize,
        right_rows: usize,
        /// `entity.column` for every key column holding a null.
        columns: Vec<String>,
    },
    RowDecrease {
        before: usize,
        after: usize,
    },
    UnmatchedLeft {
        count: usize,
        sample: Vec<String>,
    },
    UnmatchedRight {
        count: usize,
        sample: Vec<String>,
    },
    Cardinality {
        expected: Cardinality,
        local_rows: usize,
        output_rows: usize,
        reason: String,
    },
    Custom {
        message: String,
    },
}

fn sample_suffix(sample: &[String]) -> String {
    if sample.is_empty() {
        String::new()
    } else {
        format!(" (e.g. {})", sample.join("; "))
    }
}

impl fmt::Display for ViolationDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationDetail::DuplicateKeys {
                side,
                columns,
                duplicate_rows,
                sample,
            } => write!(
                f,
                "{duplicate_rows} duplicate {side} key row(s) on [{}]{}",
                columns.join(", "),
                sample_suffix(sample)
            ),
            ViolationDetail::NullKeys {
                left_rows,
                right_rows,
                columns,
            } => write!(
                f,
                "null keys in {left_rows} local and {right_rows} remote row(s) [{}]",
                columns.join(", ")
            ),
            ViolationDetail::RowDecrease { before, after } => {
                write!(f, "row count decreased from {before} to {after}")
            }
            ViolationDetail::UnmatchedLeft { count, sample } => {
                write!(f, "{count} unmatched left row(s){}", sample_suffix(sample))
            }
            ViolationDetail::UnmatchedRight { count, sample } => {
                write!(f, "{count} unmatched right row(s){}", sample_suffix(sample))
            }
            ViolationDetail::Cardinality {
                expected,
                local_rows,
                output_rows,
                reason,
            } => write!(
                f,
                "{expected} violated: {reason} ({local_rows} local row(s), {output_rows} output row(s))"
            ),
            ViolationDetail::Custom { message } => f.write_str(message),
        }
    }
}

/// One failed constraint on one foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintViolation {
    pub entity: String,
    pub remote_entity: String,
    pub key: ConstraintKey,
    pub stage: ValidationStage,
    pub detail: ViolationDetail,
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} [{}]: {}",
            self.entity, self.remote_entity, self.key, self.detail
        )
    }
}
