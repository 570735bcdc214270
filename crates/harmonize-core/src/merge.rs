//! Join execution for a single foreign key.
//!
//! Keys are matched on their textual rendering through a hash index over the
//! remote table. Output rows follow local row order; a local row matching
//! several remote rows yields them in remote row order. Unmatched remote rows
//! of an outer join come last, in remote order.

use std::collections::HashMap;

use harmonize_model::JoinHow;
use polars::prelude::*;

use crate::frame_utils::key_values;

/// Provenance of one output row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeIndicator {
    LeftOnly,
    RightOnly,
    Both,
}

impl MergeIndicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeIndicator::LeftOnly => "left_only",
            MergeIndicator::RightOnly => "right_only",
            MergeIndicator::Both => "both",
        }
    }
}

/// Rendered join keys of both sides. `None` marks a row with a null component.
#[derive(Debug, Clone, Default)]
pub struct JoinKeys {
    pub local: Vec<Option<String>>,
    pub remote: Vec<Option<String>>,
}

impl JoinKeys {
    pub fn compute(
        local: &DataFrame,
        local_keys: &[String],
        remote: &DataFrame,
        remote_keys: &[String],
    ) -> PolarsResult<Self> {
        Ok(Self {
            local: key_values(local, local_keys)?,
            remote: key_values(remote, remote_keys)?,
        })
    }
}

/// What to join and which remote columns to bring along.
#[derive(Debug, Clone, Copy)]
pub struct MergeSpec<'a> {
    pub how: JoinHow,
    pub local_keys: &'a [String],
    pub remote_keys: &'a [String],
    /// Remote columns appended to the local columns.
    pub carried: &'a [String],
}

impl MergeSpec<'_> {
    fn shared_key_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.local_keys
            .iter()
            .zip(self.remote_keys.iter())
            .filter(|(local, remote)| local == remote)
            .map(|(local, _)| local.as_str())
    }
}

/// Output of a join plus the statistics validators consume.
#[derive(Debug, Clone)]
pub struct MergeResult {
    pub table: DataFrame,
    /// One tag per output row.
    pub indicator: Vec<MergeIndicator>,
    /// Per local row, the number of remote rows it matched.
    pub left_matches: Vec<usize>,
    /// Per remote row, the number of local rows it matched.
    pub right_matches: Vec<usize>,
    /// Local row index behind each output row.
    pub local_rows: Vec<Option<usize>>,
    /// Remote row index behind each output row.
    pub remote_rows: Vec<Option<usize>>,
}

impl MergeResult {
    pub fn height(&self) -> usize {
        self.table.height()
    }

    pub fn count(&self, tag: MergeIndicator) -> usize {
        self.indicator.iter().filter(|value| **value == tag).count()
    }

    /// Local rows that matched no remote row.
    pub fn unmatched_left(&self) -> impl Iterator<Item = usize> + '_ {
        self.left_matches
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(idx, _)| idx)
    }

    /// Remote rows that matched no local row.
    pub fn unmatched_right(&self) -> impl Iterator<Item = usize> + '_ {
        self.right_matches
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(idx, _)| idx)
    }
}

/// Joins `local` with `remote`, rendering keys first.
pub fn merge(local: &DataFrame, remote: &DataFrame, spec: &MergeSpec<'_>) -> PolarsResult<MergeResult> {
    let keys = if spec.how == JoinHow::Cross {
        JoinKeys::default()
    } else {
        JoinKeys::compute(local, spec.local_keys, remote, spec.remote_keys)?
    };
    merge_with_keys(local, remote, spec, &keys)
}

/// Joins using keys the caller already rendered.
///
/// Fails when a carried column already exists on the local side, unless it is
/// a key shared by name on both sides (that column is kept once).
pub fn merge_with_keys(
    local: &DataFrame,
    remote: &DataFrame,
    spec: &MergeSpec<'_>,
    keys: &JoinKeys,
) -> PolarsResult<MergeResult> {
    let mut left_matches = vec![0usize; local.height()];
    let mut right_matches = vec![0usize; remote.height()];
    let mut local_rows: Vec<Option<usize>> = Vec::new();
    let mut remote_rows: Vec<Option<usize>> = Vec::new();
    let mut indicator = Vec::new();

    if spec.how == JoinHow::Cross {
        for (i, matches) in left_matches.iter_mut().enumerate() {
            for (j, hits) in right_matches.iter_mut().enumerate() {
                local_rows.push(Some(i));
                remote_rows.push(Some(j));
                indicator.push(MergeIndicator::Both);
                *matches += 1;
                *hits += 1;
            }
        }
    } else {
        let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
        for (j, key) in keys.remote.iter().enumerate() {
            if let Some(key) = key {
                index.entry(key.as_str()).or_default().push(j);
            }
        }
        for (i, key) in keys.local.iter().enumerate() {
            let hits = key
                .as_deref()
                .and_then(|key| index.get(key))
                .map(Vec::as_slice)
                .unwrap_or_default();
            left_matches[i] = hits.len();
            for &j in hits {
                right_matches[j] += 1;
                local_rows.push(Some(i));
                remote_rows.push(Some(j));
                indicator.push(MergeIndicator::Both);
            }
            if hits.is_empty() && spec.how.keeps_unmatched_left() {
                local_rows.push(Some(i));
                remote_rows.push(None);
                indicator.push(MergeIndicator::LeftOnly);
            }
        }
        if spec.how.keeps_unmatched_right() {
            for (j, hits) in right_matches.iter().enumerate() {
                if *hits == 0 {
                    local_rows.push(None);
                    remote_rows.push(Some(j));
                    indicator.push(MergeIndicator::RightOnly);
                }
            }
        }
    }

    let local_idx = IdxCa::from_iter_options(
        "local_idx".into(),
        local_rows.iter().map(|row| row.map(|i| i as IdxSize)),
    );
    let remote_idx = IdxCa::from_iter_options(
        "remote_idx".into(),
        remote_rows.iter().map(|row| row.map(|j| j as IdxSize)),
    );
    let mut table = local.take(&local_idx)?;

    if spec.how == JoinHow::Outer && indicator.contains(&MergeIndicator::RightOnly) {
        let present = BooleanChunked::from_iter_values(
            "present".into(),
            local_rows.iter().map(Option::is_some),
        );
        for name in spec.shared_key_names() {
            let kept = table.column(name)?.as_materialized_series().clone();
            let incoming = remote
                .column(name)?
                .as_materialized_series()
                .take(&remote_idx)?
                .cast(kept.dtype())?;
            let coalesced = kept.zip_with(&present, &incoming)?;
            table.with_column(coalesced)?;
        }
    }

    let shared: Vec<&str> = spec.shared_key_names().collect();
    let mut appended: Vec<Column> = Vec::with_capacity(spec.carried.len());
    for name in spec.carried {
        if shared.contains(&name.as_str()) {
            continue;
        }
        let series = remote
            .column(name)?
            .as_materialized_series()
            .take(&remote_idx)?;
        appended.push(series.into());
    }
    table.hstack_mut(&appended)?;

    Ok(MergeResult {
        table,
        indicator,
        left_matches,
        right_matches,
        local_rows,
        remote_rows,
    })
}
