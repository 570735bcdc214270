use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constraint::ConstraintSet;
use crate::error::{ModelError, Result};

/// Join type used to execute a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinHow {
    #[default]
    Inner,
    Left,
    Outer,
    Cross,
}

impl JoinHow {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinHow::Inner => "inner",
            JoinHow::Left => "left",
            JoinHow::Outer => "outer",
            JoinHow::Cross => "cross",
        }
    }

    /// Whether unmatched local rows survive the join.
    pub fn keeps_unmatched_left(&self) -> bool {
        matches!(self, JoinHow::Left | JoinHow::Outer)
    }

    /// Whether unmatched remote rows survive the join.
    pub fn keeps_unmatched_right(&self) -> bool {
        matches!(self, JoinHow::Outer)
    }
}

impl fmt::Display for JoinHow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared relationship from the owning entity to `entity`.
///
/// `local_keys[i]` is paired with `remote_keys[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyDescriptor {
    /// Remote (target) entity name.
    pub entity: String,
    #[serde(default)]
    pub local_keys: Vec<String>,
    #[serde(default)]
    pub remote_keys: Vec<String>,
    #[serde(default)]
    pub how: JoinHow,
    #[serde(default)]
    pub constraints: ConstraintSet,
    /// Remote columns carried into the local table besides the remote surrogate id.
    #[serde(default)]
    pub extra_columns: Vec<String>,
}

impl ForeignKeyDescriptor {
    pub fn new<L, R>(entity: impl Into<String>, local_keys: L, remote_keys: R) -> Self
    where
        L: IntoIterator,
        L::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            entity: entity.into(),
            local_keys: local_keys.into_iter().map(Into::into).collect(),
            remote_keys: remote_keys.into_iter().map(Into::into).collect(),
            how: JoinHow::default(),
            constraints: ConstraintSet::default(),
            extra_columns: Vec::new(),
        }
    }

    /// Cross join against `entity`; no keys.
    pub fn cross(entity: impl Into<String>) -> Self {
        Self {
            how: JoinHow::Cross,
            ..Self::new(entity, Vec::<String>::new(), Vec::<String>::new())
        }
    }

    pub fn with_how(mut self, how: JoinHow) -> Self {
        self.how = how;
        self
    }

    pub fn with_constraints(mut self, constraints: ConstraintSet) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_extra_columns<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.extra_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Key pairs in positional order.
    pub fn key_pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.local_keys
            .iter()
            .zip(self.remote_keys.iter())
            .map(|(local, remote)| (local.as_str(), remote.as_str()))
    }

    /// Checks that the key lists fit the join type.
    pub fn validate_shape(&self, owner: &str) -> Result<()> {
        if self.how == JoinHow::Cross {
            if !self.local_keys.is_empty() || !self.remote_keys.is_empty() {
                return Err(ModelError::CrossJoinKeys {
                    entity: owner.to_string(),
                    remote: self.entity.clone(),
                });
            }
            return Ok(());
        }
        if self.local_keys.len() != self.remote_keys.len() {
            return Err(ModelError::KeyArity {
                entity: owner.to_string(),
                remote: self.entity.clone(),
                local: self.local_keys.len(),
                remote_len: self.remote_keys.len(),
            });
        }
        if self.local_keys.is_empty() {
            return Err(ModelError::MissingJoinKeys {
                entity: owner.to_string(),
                remote: self.entity.clone(),
                how: self.how.to_string(),
            });
        }
        Ok(())
    }
}
