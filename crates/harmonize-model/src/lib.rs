//! Descriptor types for the harmonize engine.
//!
//! Everything in this crate is static, configuration-derived data: it is
//! built once at run start and read-only afterwards.

pub mod constraint;
pub mod entity;
pub mod error;
pub mod foreign_key;
pub mod source;
pub mod value;

pub use constraint::{Cardinality, ConstraintKey, ConstraintSet, Side};
pub use entity::{
    DropDuplicates, EntityDescriptor, EntityReference, ReferenceKind, UnnestDescriptor,
};
pub use error::{ModelError, Result};
pub use foreign_key::{ForeignKeyDescriptor, JoinHow};
pub use source::{FilterDescriptor, SourceDescriptor};
pub use value::ScalarValue;
