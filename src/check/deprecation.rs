//! API version deprecation catalog
//!
//! Deprecations are matched against every API version an object was written
//! with, as recorded in its managed fields, not just its current version.

use super::rule::{Rule, RuleResult, Violation};
use super::CheckError;
use crate::models::Resource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Catalog shipped with the binary
const EMBEDDED_CATALOG: &str = include_str!("../../data/deprecated-versions.yaml");

/// Severity of every deprecation finding
pub const DEPRECATION_SEVERITY: u8 = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deprecation {
    #[serde(default)]
    pub component: String,
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub deprecated_in: String,
    #[serde(default)]
    pub removed_in: String,
    #[serde(default)]
    pub new_api_version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
}

impl Deprecation {
    /// `apiVersion/kind`
    pub fn key(&self) -> String {
        format!("{}/{}", self.api_version, self.kind)
    }
}

/// Deprecations keyed by `apiVersion/kind`
#[derive(Debug, Clone, Default)]
pub struct DeprecationCatalog {
    entries: HashMap<String, Deprecation>,
}

impl DeprecationCatalog {
    /// Build a catalog, rejecting incomplete or duplicate entries
    pub fn from_entries(deprecations: Vec<Deprecation>) -> Result<Self, CheckError> {
        let mut entries = HashMap::new();
        for deprecation in deprecations {
            if deprecation.link.is_empty() {
                return Err(CheckError::Catalog(format!(
                    "link cannot be empty for {}",
                    deprecation.key()
                )));
            }
            if deprecation.kind.is_empty() {
                return Err(CheckError::Catalog(format!(
                    "kind cannot be empty for api version {}",
                    deprecation.api_version
                )));
            }
            if deprecation.api_version == deprecation.new_api_version {
                return Err(CheckError::Catalog(format!(
                    "deprecated api version {} and new api version {} cannot be the same",
                    deprecation.api_version, deprecation.new_api_version
                )));
            }
            let key = deprecation.key();
            if entries.contains_key(&key) {
                return Err(CheckError::Catalog(format!("duplicate key found: {}", key)));
            }
            entries.insert(key, deprecation);
        }
        Ok(Self { entries })
    }

    pub fn from_yaml(contents: &str) -> Result<Self, CheckError> {
        let deprecations: Vec<Deprecation> = serde_yaml::from_str(contents).map_err(|e| {
            CheckError::Catalog(format!("could not parse deprecated versions: {}", e))
        })?;
        Self::from_entries(deprecations)
    }

    pub fn from_path(path: &Path) -> Result<Self, CheckError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CheckError::Catalog(format!(
                "could not read deprecated versions file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&contents)
    }

    /// The catalog bundled with the binary
    pub fn embedded() -> Result<Self, CheckError> {
        Self::from_yaml(EMBEDDED_CATALOG)
    }

    pub fn get(&self, key: &str) -> Option<&Deprecation> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deprecation finding for a resource, if any recorded write used a deprecated version
    ///
    /// The first matching managed field wins. The violation is attributed to
    /// the resource itself.
    pub fn check(&self, resource: &Resource) -> Option<RuleResult> {
        let (field, deprecation) = resource.managed_fields().iter().find_map(|field| {
            self.get(&format!("{}/{}", field.api_version, resource.kind()))
                .map(|deprecation| (field, deprecation))
        })?;

        let rule = Rule::new(
            format!("APIVersionDeprecated/{}", resource.reference().gvk()),
            DEPRECATION_SEVERITY,
            format!(
                "Api version {:?} has been deprecated since version {} and will be removed in {}, please switch to {:?}",
                deprecation.api_version,
                deprecation.deprecated_in,
                deprecation.removed_in,
                deprecation.new_api_version
            ),
            deprecation.link.clone(),
        );

        let mut result = RuleResult::new(rule);
        result.add_violation(Violation {
            reference: resource.reference().clone(),
            message: format!("written by {} using {}", field.manager, field.api_version),
        });
        Some(result)
    }
}
