use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error(
        "foreign key {entity} -> {remote}: local_keys has {local} column(s) but remote_keys has {remote_len}"
    )]
    KeyArity {
        entity: String,
        remote: String,
        local: usize,
        remote_len: usize,
    },
    #[error("foreign key {entity} -> {remote}: {how} join requires at least one key pair")]
    MissingJoinKeys {
        entity: String,
        remote: String,
        how: String,
    },
    #[error("foreign key {entity} -> {remote}: cross join must not declare keys")]
    CrossJoinKeys { entity: String, remote: String },
    #[error("entity {entity}: unnest var_name and value_name must differ (both are {name:?})")]
    UnnestNameClash { entity: String, name: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
