//! Relational-integrity constraints attached to a foreign key.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared multiplicity of a foreign key relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    OneToOne,
    ManyToOne,
    OneToMany,
    /// No multiplicity check.
    #[default]
    ManyToMany,
}

impl Cardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::OneToOne => "one_to_one",
            Cardinality::ManyToOne => "many_to_one",
            Cardinality::OneToMany => "one_to_many",
            Cardinality::ManyToMany => "many_to_many",
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of a join: the local (left) entity or the remote (right) entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// Machine-checkable name of a constraint.
///
/// Built-in keys are associated constants. Third-party validators use
/// [`ConstraintKey::custom`] with the same name they expect to find in the
/// constraint table of a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConstraintKey(&'static str);

impl ConstraintKey {
    pub const CARDINALITY: Self = Self("cardinality");
    pub const REQUIRE_UNIQUE_LEFT: Self = Self("require_unique_left");
    pub const REQUIRE_UNIQUE_RIGHT: Self = Self("require_unique_right");
    pub const ALLOW_NULL_KEYS: Self = Self("allow_null_keys");
    pub const ALLOW_ROW_DECREASE: Self = Self("allow_row_decrease");
    pub const ALLOW_UNMATCHED_LEFT: Self = Self("allow_unmatched_left");
    pub const ALLOW_UNMATCHED_RIGHT: Self = Self("allow_unmatched_right");

    pub const BUILT_IN: [Self; 7] = [
        Self::CARDINALITY,
        Self::REQUIRE_UNIQUE_LEFT,
        Self::REQUIRE_UNIQUE_RIGHT,
        Self::ALLOW_NULL_KEYS,
        Self::ALLOW_ROW_DECREASE,
        Self::ALLOW_UNMATCHED_LEFT,
        Self::ALLOW_UNMATCHED_RIGHT,
    ];

    /// Key for a constraint that is not built in.
    pub const fn custom(name: &'static str) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    pub fn is_built_in(&self) -> bool {
        Self::BUILT_IN.contains(self)
    }
}

impl fmt::Display for ConstraintKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Constraints declared on one foreign key.
///
/// Every constraint is optional. A constraint only takes part in validation
/// when it is *active* (see [`ConstraintSet::is_active`]); an absent key means
/// "no check", whatever its nominal default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<Cardinality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_unmatched_left: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_unmatched_right: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_row_decrease: Option<bool>,
    pub require_unique_left: bool,
    pub require_unique_right: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_null_keys: Option<bool>,
    /// Constraint keys not known to this crate, kept for third-party validators.
    #[serde(flatten)]
    pub custom: BTreeMap<String, serde_json::Value>,
}

impl ConstraintSet {
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = Some(cardinality);
        self
    }

    pub fn with_allow_unmatched_left(mut self, allow: bool) -> Self {
        self.allow_unmatched_left = Some(allow);
        self
    }

    pub fn with_allow_unmatched_right(mut self, allow: bool) -> Self {
        self.allow_unmatched_right = Some(allow);
        self
    }

    pub fn with_allow_row_decrease(mut self, allow: bool) -> Self {
        self.allow_row_decrease = Some(allow);
        self
    }

    pub fn with_require_unique_left(mut self, require: bool) -> Self {
        self.require_unique_left = require;
        self
    }

    pub fn with_require_unique_right(mut self, require: bool) -> Self {
        self.require_unique_right = require;
        self
    }

    pub fn with_allow_null_keys(mut self, allow: bool) -> Self {
        self.allow_null_keys = Some(allow);
        self
    }

    pub fn with_custom(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom.insert(key.into(), value);
        self
    }

    /// Effective cardinality (`many_to_many` when unset).
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality.unwrap_or_default()
    }

    /// Whether the validator registered under `key` must run for this set.
    pub fn is_active(&self, key: ConstraintKey) -> bool {
        match key {
            ConstraintKey::CARDINALITY => self.cardinality() != Cardinality::ManyToMany,
            ConstraintKey::REQUIRE_UNIQUE_LEFT => self.require_unique_left,
            ConstraintKey::REQUIRE_UNIQUE_RIGHT => self.require_unique_right,
            ConstraintKey::ALLOW_NULL_KEYS => self.allow_null_keys == Some(false),
            ConstraintKey::ALLOW_ROW_DECREASE => self.allow_row_decrease == Some(false),
            ConstraintKey::ALLOW_UNMATCHED_LEFT => self.allow_unmatched_left == Some(false),
            ConstraintKey::ALLOW_UNMATCHED_RIGHT => self.allow_unmatched_right == Some(false),
            other => self
                .custom
                .get(other.as_str())
                .is_some_and(|value| !matches!(value, serde_json::Value::Null | serde_json::Value::Bool(false))),
        }
    }

    /// Value of a custom constraint entry.
    pub fn custom_value(&self, key: ConstraintKey) -> Option<&serde_json::Value> {
        self.custom.get(key.as_str())
    }

    /// Keys that are active on this set, built-in keys first, then custom keys
    /// in name order.
    pub fn active_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = ConstraintKey::BUILT_IN
            .iter()
            .filter(|key| self.is_active(**key))
            .map(|key| key.as_str().to_string())
            .collect();
        keys.extend(
            self.custom
                .iter()
                .filter(|(_, value)| {
                    !matches!(value, serde_json::Value::Null | serde_json::Value::Bool(false))
                })
                .map(|(key, _)| key.clone()),
        );
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.active_keys().is_empty()
    }
}
