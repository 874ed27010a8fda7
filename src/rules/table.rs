use std::collections::HashSet;
use thiserror::Error;

use crate::domain::Template;

use super::priority::UNRANKED;

/// A rule table was built from malformed templates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Template at position {index} has an empty code")]
    EmptyCode { index: usize },

    #[error("Duplicate template code: {code}")]
    DuplicateCode { code: String },

    #[error("Template {code}: condition '{dimension}' lists no values and can never match")]
    EmptyCondition { code: String, dimension: &'static str },

    #[error("Template {code}: priority {priority} is reserved for unranked templates")]
    ReservedPriority { code: String, priority: u32 },

    #[error("Rule table version cannot be empty")]
    EmptyVersion,
}

/// Validated, ordered collection of templates.
///
/// Declaration order is significant: it breaks ties between templates of
/// equal priority.
#[derive(Debug, Clone)]
pub struct RuleTable {
    version: String,
    templates: Vec<Template>,
}

impl RuleTable {
    /// Build a table, validating every template.
    pub fn new(version: impl Into<String>, templates: Vec<Template>) -> Result<Self, ConfigurationError> {
        let version = version.into();
        if version.is_empty() {
            return Err(ConfigurationError::EmptyVersion);
        }

        validate_templates(&templates)?;

        Ok(RuleTable { version, templates })
    }

    /// Create an empty table.
    pub fn empty() -> Self {
        RuleTable {
            version: "0.0.0".to_string(),
            templates: Vec::new(),
        }
    }

    /// Append custom templates after the existing ones.
    ///
    /// The result is validated as a whole, so a custom template may not reuse
    /// a built-in code.
    pub fn extended(&self, custom: Vec<Template>) -> Result<Self, ConfigurationError> {
        let mut templates = self.templates.clone();
        templates.extend(custom);
        RuleTable::new(self.version.clone(), templates)
    }

    /// Table version, used as the cache version tag for derived decisions.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn get(&self, code: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.code == code)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Check codes, conditions and priorities of a template list.
pub fn validate_templates(templates: &[Template]) -> Result<(), ConfigurationError> {
    let mut seen = HashSet::new();

    for (index, template) in templates.iter().enumerate() {
        if template.code.trim().is_empty() {
            return Err(ConfigurationError::EmptyCode { index });
        }

        if !seen.insert(template.code.as_str()) {
            return Err(ConfigurationError::DuplicateCode {
                code: template.code.clone(),
            });
        }

        if let Some((dimension, _)) = template.conditions.dimensions().find(|(_, v)| v.is_empty()) {
            return Err(ConfigurationError::EmptyCondition {
                code: template.code.clone(),
                dimension,
            });
        }

        if let Some(priority) = template.priority.filter(|p| *p == UNRANKED) {
            return Err(ConfigurationError::ReservedPriority {
                code: template.code.clone(),
                priority,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActionSpec, Conditions};

    fn action(code: &str) -> Template {
        Template::action(code, ActionSpec::new(code))
    }

    #[test]
    fn test_valid_table() {
        let table = RuleTable::new("v1", vec![action("approve"), action("reject")]).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.version(), "v1");
        assert!(table.get("reject").is_some());
        assert!(table.get("claim").is_none());
    }

    #[test]
    fn test_duplicate_code() {
        let err = RuleTable::new("v1", vec![action("approve"), action("approve")]).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::DuplicateCode {
                code: "approve".to_string()
            }
        );
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn test_empty_code() {
        let err = RuleTable::new("v1", vec![action("approve"), action(" ")]).unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyCode { index: 1 });
    }

    #[test]
    fn test_empty_condition_set() {
        let template = action("approve").with_conditions(Conditions::any().status(Vec::<String>::new()));
        let err = RuleTable::new("v1", vec![template]).unwrap_err();

        assert!(matches!(
            err,
            ConfigurationError::EmptyCondition { dimension: "status", .. }
        ));
    }

    #[test]
    fn test_reserved_priority() {
        let template = action("approve").with_priority(UNRANKED);
        let err = RuleTable::new("v1", vec![template]).unwrap_err();

        assert!(matches!(err, ConfigurationError::ReservedPriority { .. }));
    }

    #[test]
    fn test_empty_version() {
        assert_eq!(
            RuleTable::new("", vec![]).unwrap_err(),
            ConfigurationError::EmptyVersion
        );
    }

    #[test]
    fn test_extended_appends_and_validates() {
        let base = RuleTable::new("v1", vec![action("approve")]).unwrap();

        let extended = base.extended(vec![action("escalate")]).unwrap();
        assert_eq!(extended.templates()[1].code, "escalate");

        assert!(base.extended(vec![action("approve")]).is_err());
    }
}
