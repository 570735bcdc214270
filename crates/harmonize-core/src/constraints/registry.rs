use std::collections::BTreeMap;
use std::sync::OnceLock;

use harmonize_model::{ConstraintKey, Side};

use super::{
    CardinalityValidator, ConstraintValidator, NullKeysValidator, RowDecreaseValidator,
    UniqueKeysValidator, UnmatchedLeftValidator, UnmatchedRightValidator, ValidationStage,
};

/// Validators indexed by `(stage, constraint key)`.
///
/// Registering a validator under an existing `(stage, key)` replaces it.
/// Lookups iterate in stage order, then key order.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: BTreeMap<(ValidationStage, ConstraintKey), Box<dyn ConstraintValidator>>,
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, validator: Box<dyn ConstraintValidator>) {
        self.validators
            .insert((validator.stage(), validator.key()), validator);
    }

    pub fn get(&self, stage: ValidationStage, key: ConstraintKey) -> Option<&dyn ConstraintValidator> {
        self.validators.get(&(stage, key)).map(|v| v.as_ref())
    }

    /// Validators registered for `stage`, in key order.
    pub fn for_stage(
        &self,
        stage: ValidationStage,
    ) -> impl Iterator<Item = &dyn ConstraintValidator> + '_ {
        self.validators
            .iter()
            .filter(move |((registered, _), _)| *registered == stage)
            .map(|(_, validator)| validator.as_ref())
    }

    /// Whether any stage has a validator for `key`.
    pub fn handles(&self, key: &str) -> bool {
        self.validators.keys().any(|(_, registered)| registered.as_str() == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ConstraintValidator> + '_ {
        self.validators.values().map(|v| v.as_ref())
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

static DEFAULT_REGISTRY: OnceLock<ValidatorRegistry> = OnceLock::new();

/// Returns the registry holding the built-in validators.
///
/// Built on first access and shared afterwards.
pub fn default_registry() -> &'static ValidatorRegistry {
    DEFAULT_REGISTRY.get_or_init(build_default_registry)
}

/// Builds a fresh registry with every built-in validator.
///
/// Start from this when adding third-party validators.
pub fn build_default_registry() -> ValidatorRegistry {
    let mut registry = ValidatorRegistry::new();
    registry.register(Box::new(UniqueKeysValidator::new(Side::Left)));
    registry.register(Box::new(UniqueKeysValidator::new(Side::Right)));
    registry.register(Box::new(NullKeysValidator));
    registry.register(Box::new(RowDecreaseValidator));
    registry.register(Box::new(UnmatchedRightValidator));
    registry.register(Box::new(UnmatchedLeftValidator));
    registry.register(Box::new(CardinalityValidator));
    registry
}
