//! Project configuration for the harmonize engine.
//!
//! A project file is plain TOML:
//!
//! ```toml
//! [project]
//! name = "field-survey"
//!
//! [[entities]]
//! name = "site"
//! source = { type = "csv", path = "data/site.csv" }
//! surrogate_id = "site_id"
//! keys = ["site_code"]
//! ```
//!
//! Relative CSV paths are resolved against the directory holding the file.

pub mod error;

use std::path::Path;

use harmonize_model::EntityDescriptor;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use error::{ConfigError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMeta {
    #[serde(default)]
    pub name: String,
}

/// A loaded project: metadata plus entity descriptors in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub project: ProjectMeta,
    #[serde(default)]
    pub entities: Vec<EntityDescriptor>,
}

impl Project {
    /// Parses and validates an in-memory project. Paths are left as written.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let project: Project =
            toml::from_str(contents).map_err(|source| ConfigError::Parse { source })?;
        project.validate()?;
        Ok(project)
    }

    pub fn name(&self) -> &str {
        &self.project.name
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.iter().find(|entity| entity.name == name)
    }

    fn validate(&self) -> Result<()> {
        if self.entities.is_empty() {
            return Err(ConfigError::NoEntities {
                project: self.project.name.clone(),
            });
        }
        for entity in &self.entities {
            entity.validate()?;
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        for entity in &mut self.entities {
            entity.source.resolve_relative_to(base);
        }
    }
}

/// Loads a project file from disk.
pub fn load_project(path: &Path) -> Result<Project> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    let mut project: Project = toml::from_str(&contents).map_err(|e| ConfigError::Toml {
        path: path.to_path_buf(),
        source: e,
    })?;
    project.validate()?;
    if let Some(base) = path.parent() {
        project.resolve_paths(base);
    }
    debug!(
        path = %path.display(),
        project = %project.project.name,
        entities = project.entities.len(),
        "loaded project"
    );
    Ok(project)
}
