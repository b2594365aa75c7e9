//! Stable identifiers of model elements.
//!
//! A feature id names the element a facet holder belongs to. It orders by
//! type, then member, then parameter index, so failures and listings sort
//! the same way on every run.

use crate::error::MetamodelError;
use metamodel_introspect::is_identifier;
use serde::Serialize;
use std::fmt;

/// What kind of model element a feature is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Object,
    Action,
    Parameter,
    Property,
    Collection,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => write!(f, "object"),
            Self::Action => write!(f, "action"),
            Self::Parameter => write!(f, "parameter"),
            Self::Property => write!(f, "property"),
            Self::Collection => write!(f, "collection"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureId {
    logical_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    member: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameter: Option<usize>,
    kind: FeatureKind,
}

impl FeatureId {
    pub fn object(logical_type: impl Into<String>) -> Result<Self, MetamodelError> {
        let logical_type = checked(logical_type.into(), "type")?;
        Ok(Self {
            logical_type,
            member: None,
            parameter: None,
            kind: FeatureKind::Object,
        })
    }

    /// An action, property or collection of `logical_type`.
    pub fn member(
        logical_type: impl Into<String>,
        member: impl Into<String>,
        kind: FeatureKind,
    ) -> Result<Self, MetamodelError> {
        if matches!(kind, FeatureKind::Object | FeatureKind::Parameter) {
            return Err(MetamodelError::InvalidArgument(format!(
                "{kind} is not a member feature kind"
            )));
        }
        Ok(Self {
            logical_type: checked(logical_type.into(), "type")?,
            member: Some(checked(member.into(), "member")?),
            parameter: None,
            kind,
        })
    }

    /// The `index`-th parameter of this action.
    pub fn parameter(&self, index: usize) -> Result<Self, MetamodelError> {
        if self.kind != FeatureKind::Action {
            return Err(MetamodelError::InvalidArgument(format!(
                "{self} is not an action and has no parameters"
            )));
        }
        Ok(Self {
            logical_type: self.logical_type.clone(),
            member: self.member.clone(),
            parameter: Some(index),
            kind: FeatureKind::Parameter,
        })
    }

    pub fn logical_type(&self) -> &str {
        &self.logical_type
    }

    pub fn member_name(&self) -> Option<&str> {
        self.member.as_deref()
    }

    pub fn parameter_index(&self) -> Option<usize> {
        self.parameter
    }

    pub fn kind(&self) -> FeatureKind {
        self.kind
    }
}

fn checked(value: String, what: &str) -> Result<String, MetamodelError> {
    if is_identifier(&value) {
        Ok(value)
    } else {
        Err(MetamodelError::InvalidArgument(format!(
            "{what} identifier `{value}` is empty or malformed"
        )))
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.logical_type)?;
        if let Some(member) = &self.member {
            write!(f, "#{member}")?;
        }
        if let Some(index) = self.parameter {
            write!(f, "[{index}]")?;
        }
        Ok(())
    }
}
