use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{Config, Profile};
use crate::domain::Template;
use crate::rules::{defaults, ConfigurationError, RuleTable};

/// Errors that can occur during rule table loading.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid rule table: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// On-disk shape of a rule table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableFile {
    table_version: String,

    /// Built-in table the file's templates are appended to
    #[serde(default)]
    extends: Option<Profile>,

    #[serde(default)]
    templates: Vec<Template>,
}

/// Built-in templates for a profile.
pub fn builtin_templates(profile: Profile) -> Vec<Template> {
    match profile {
        Profile::Desktop => defaults::desktop_templates(),
        Profile::Mobile => defaults::mobile_templates(),
    }
}

/// Built-in table for a profile.
pub fn builtin_table(profile: Profile) -> Result<RuleTable, ConfigurationError> {
    match profile {
        Profile::Desktop => defaults::desktop_table(),
        Profile::Mobile => defaults::mobile_table(),
    }
}

/// Parse and validate a rule table from YAML text.
pub fn parse_table(content: &str) -> Result<RuleTable, TableError> {
    let file: TableFile = serde_yaml::from_str(content)?;

    let templates = match file.extends {
        Some(profile) => {
            let mut templates = builtin_templates(profile);
            templates.extend(file.templates);
            templates
        }
        None => file.templates,
    };

    Ok(RuleTable::new(file.table_version, templates)?)
}

/// Load a rule table from a YAML file.
pub fn load_table(path: impl AsRef<Path>) -> Result<RuleTable, TableError> {
    let content = fs::read_to_string(path)?;
    parse_table(&content)
}

/// Where a rule table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    File(PathBuf),
    Builtin(Profile),
}

/// Loads the rule table from its configured source.
#[derive(Debug, Clone)]
pub struct TableLoader {
    source: TableSource,
}

impl TableLoader {
    pub fn new(source: TableSource) -> Self {
        TableLoader { source }
    }

    /// Load from a YAML file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        TableLoader::new(TableSource::File(path.into()))
    }

    /// Use a built-in table.
    pub fn builtin(profile: Profile) -> Self {
        TableLoader::new(TableSource::Builtin(profile))
    }

    /// File table when a path is configured, else the profile's built-in table.
    pub fn from_config(config: &Config) -> Self {
        match &config.table_path {
            Some(path) => TableLoader::file(path.clone()),
            None => TableLoader::builtin(config.profile),
        }
    }

    pub fn load(&self) -> Result<RuleTable, TableError> {
        match &self.source {
            TableSource::File(path) => load_table(path),
            TableSource::Builtin(profile) => Ok(builtin_table(*profile)?),
        }
    }

    pub fn source(&self) -> &TableSource {
        &self.source
    }

    /// Built-in tables never change, so only file sources are worth polling.
    pub fn is_reloadable(&self) -> bool {
        matches!(self.source, TableSource::File(_))
    }
}
