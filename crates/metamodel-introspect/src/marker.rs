//! Declarative markers as plain tagged data.
//!
//! A marker is attached to a type, method, parameter or field. Marker kinds
//! are themselves declared as types of kind `Marker`; markers attached to
//! such a definition are meta-markers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A marker attachment: its kind and the attribute values given at the
/// attachment site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub kind: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
}

impl Marker {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(attribute.into(), value.into());
        self
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_are_optional_in_json() {
        let marker: Marker = serde_json::from_str(r#"{"kind":"Programmatic"}"#).unwrap();
        assert!(marker.is("Programmatic"));
        assert!(marker.attributes.is_empty());

        let json = serde_json::to_value(Marker::new("Named").with("value", "Given Name")).unwrap();
        assert_eq!(json["attributes"]["value"], "Given Name");
    }
}
