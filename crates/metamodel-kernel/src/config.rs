//! Metamodel configuration.
//!
//! Loaded from TOML; every key is optional.
//!
//! ```toml
//! [validation]
//! check_conflicting_optionality = true
//!
//! [model]
//! collection_types = ["List", "Set"]
//! ```

use crate::error::MetamodelError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetamodelConfig {
    pub validation: ValidationConfig,
    pub model: ModelConfig,
}

/// Switches for the built-in validators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Report properties and parameters whose mandatory/optional facts
    /// disagree at the same precedence. Off by default: column metadata and
    /// member markers legitimately disagree in some mappings.
    pub check_conflicting_optionality: bool,
    pub check_member_id_clash: bool,
    pub check_element_types: bool,
    pub check_ambiguous_mixins: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            check_conflicting_optionality: false,
            check_member_id_clash: true,
            check_element_types: true,
            check_ambiguous_mixins: true,
        }
    }
}

/// Which raw type names the model builder treats specially.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub collection_types: Vec<String>,
    pub value_types: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let collection_types = ["List", "Set", "Collection", "SortedSet"];
        let value_types = [
            "String", "boolean", "byte", "short", "int", "long", "float", "double", "char",
            "Boolean", "Byte", "Short", "Integer", "Long", "Float", "Double", "Character",
            "BigDecimal", "BigInteger", "LocalDate", "LocalDateTime", "Instant", "UUID",
        ];
        Self {
            collection_types: collection_types.iter().map(|s| s.to_string()).collect(),
            value_types: value_types.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ModelConfig {
    pub fn is_collection(&self, raw_name: &str) -> bool {
        self.collection_types.iter().any(|t| t == raw_name)
    }

    pub fn is_value_type(&self, raw_name: &str) -> bool {
        self.value_types.iter().any(|t| t == raw_name)
    }
}

impl MetamodelConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, MetamodelError> {
        Self::parse(text, "<inline>")
    }

    pub fn load(path: &Path) -> Result<Self, MetamodelError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| MetamodelError::ReadFile {
            path: display.clone(),
            source,
        })?;
        Self::parse(&text, &display)
    }

    fn parse(text: &str, path: &str) -> Result<Self, MetamodelError> {
        toml::from_str(text).map_err(|source| MetamodelError::ParseToml {
            path: path.to_string(),
            source,
        })
    }
}
