use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::foreign_key::ForeignKeyDescriptor;
use crate::source::{FilterDescriptor, SourceDescriptor};
use crate::value::ScalarValue;

/// Duplicate-row policy applied right after filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DropDuplicates {
    /// `true` compares whole rows; `false` disables the step.
    All(bool),
    /// Compare only these columns.
    Columns(Vec<String>),
}

impl Default for DropDuplicates {
    fn default() -> Self {
        Self::All(false)
    }
}

impl DropDuplicates {
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::All(enabled) => *enabled,
            Self::Columns(columns) => !columns.is_empty(),
        }
    }
}

fn default_var_name() -> String {
    "variable".to_string()
}

fn default_value_name() -> String {
    "value".to_string()
}

/// Wide-to-long reshape applied after linking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnnestDescriptor {
    #[serde(default)]
    pub id_vars: Vec<String>,
    #[serde(default)]
    pub value_vars: Vec<String>,
    #[serde(default = "default_var_name")]
    pub var_name: String,
    #[serde(default = "default_value_name")]
    pub value_name: String,
}

impl UnnestDescriptor {
    pub fn new<I, V>(id_vars: I, value_vars: V) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        Self {
            id_vars: id_vars.into_iter().map(Into::into).collect(),
            value_vars: value_vars.into_iter().map(Into::into).collect(),
            var_name: default_var_name(),
            value_name: default_value_name(),
        }
    }

    pub fn with_names(mut self, var_name: impl Into<String>, value_name: impl Into<String>) -> Self {
        self.var_name = var_name.into();
        self.value_name = value_name.into();
        self
    }
}

/// Why an entity refers to another entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    DependsOn,
    ForeignKey,
    Filter,
    Source,
}

impl ReferenceKind {
    /// Descriptor field the reference was declared in.
    pub fn field(&self) -> &'static str {
        match self {
            ReferenceKind::DependsOn => "depends_on",
            ReferenceKind::ForeignKey => "foreign_keys",
            ReferenceKind::Filter => "filters",
            ReferenceKind::Source => "source",
        }
    }
}

/// One outgoing edge of the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityReference<'a> {
    pub kind: ReferenceKind,
    pub target: &'a str,
}

/// Static description of one entity, built once from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub name: String,
    pub source: SourceDescriptor,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Identity column downstream foreign keys carry.
    #[serde(default)]
    pub surrogate_id: Option<String>,
    /// Natural key; unique in the stored table.
    #[serde(default)]
    pub keys: Vec<String>,
    /// Constant columns appended at extract time.
    #[serde(default)]
    pub extra_columns: BTreeMap<String, ScalarValue>,
    #[serde(default)]
    pub filters: Vec<FilterDescriptor>,
    #[serde(default)]
    pub drop_duplicates: DropDuplicates,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
    #[serde(default)]
    pub unnest: Option<UnnestDescriptor>,
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    /// Output columns in order; empty keeps every column.
    #[serde(default)]
    pub columns: Vec<String>,
}

impl EntityDescriptor {
    pub fn new(name: impl Into<String>, source: SourceDescriptor) -> Self {
        Self {
            name: name.into(),
            source,
            depends_on: Vec::new(),
            surrogate_id: None,
            keys: Vec::new(),
            extra_columns: BTreeMap::new(),
            filters: Vec::new(),
            drop_duplicates: DropDuplicates::default(),
            foreign_keys: Vec::new(),
            unnest: None,
            rename: BTreeMap::new(),
            columns: Vec::new(),
        }
    }

    pub fn with_depends_on<I>(mut self, entities: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.depends_on.extend(entities.into_iter().map(Into::into));
        self
    }

    pub fn with_surrogate_id(mut self, column: impl Into<String>) -> Self {
        self.surrogate_id = Some(column.into());
        self
    }

    pub fn with_keys<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_extra_column(mut self, name: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.extra_columns.insert(name.into(), value.into());
        self
    }

    pub fn with_filter(mut self, filter: FilterDescriptor) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_drop_duplicates(mut self, policy: DropDuplicates) -> Self {
        self.drop_duplicates = policy;
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: ForeignKeyDescriptor) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn with_unnest(mut self, unnest: UnnestDescriptor) -> Self {
        self.unnest = Some(unnest);
        self
    }

    pub fn with_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rename.insert(from.into(), to.into());
        self
    }

    pub fn with_columns<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Every entity this one refers to, in field order: `depends_on`, foreign
    /// keys, `exists_in` filters, then the source.
    pub fn references(&self) -> impl Iterator<Item = EntityReference<'_>> + '_ {
        let depends_on = self.depends_on.iter().map(|target| EntityReference {
            kind: ReferenceKind::DependsOn,
            target: target.as_str(),
        });
        let foreign_keys = self.foreign_keys.iter().map(|fk| EntityReference {
            kind: ReferenceKind::ForeignKey,
            target: fk.entity.as_str(),
        });
        let filters = self
            .filters
            .iter()
            .filter_map(FilterDescriptor::entity_reference)
            .map(|target| EntityReference {
                kind: ReferenceKind::Filter,
                target,
            });
        let source = self
            .source
            .entity_reference()
            .map(|target| EntityReference {
                kind: ReferenceKind::Source,
                target,
            });
        depends_on.chain(foreign_keys).chain(filters).chain(source)
    }

    /// Shape checks that need no data: foreign key arity and unnest names.
    pub fn validate(&self) -> Result<()> {
        for fk in &self.foreign_keys {
            fk.validate_shape(&self.name)?;
        }
        if let Some(unnest) = &self.unnest
            && unnest.var_name == unnest.value_name
        {
            return Err(ModelError::UnnestNameClash {
                entity: self.name.clone(),
                name: unnest.var_name.clone(),
            });
        }
        Ok(())
    }
}
