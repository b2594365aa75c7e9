//! Declarative-marker synthesis.
//!
//! The effective marker of a kind on an element is found by a breadth-first
//! walk over the markers attached to it and, through marker definitions,
//! the meta-markers attached to those:
//!
//! ```text
//! depth 0   @Optional @Audited          ← attached to the element
//!               │         │
//! depth 1       …     @Property(optionality = "OPTIONAL")   ← on Audited's definition
//! ```
//!
//! The smallest depth wins; within one depth the first in declaration order
//! wins. Each marker kind is expanded at most once, so self-referencing
//! definitions terminate. Attribute values come wholesale from the winner,
//! completed by the winning kind's declared defaults.
//!
//! Resolved members synthesize over their declarations nearest-first: a
//! marker on an override hides the overridden declaration's markers.

use crate::error::MetamodelError;
use crate::members::ResolvedMember;
use metamodel_introspect::{FieldDecl, Marker, MethodDecl, TypeDecl, TypeRegistry};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::trace;

/// Marker kinds interpreted by the built-in facet factories.
pub mod kinds {
    pub const ACTION: &str = "Action";
    pub const PROPERTY: &str = "Property";
    pub const COLLECTION: &str = "Collection";
    pub const PARAMETER: &str = "Parameter";
    pub const NAMED: &str = "Named";
    pub const COLUMN: &str = "Column";
    pub const MIXIN: &str = "Mixin";
}

/// The resolved value of a marker: its kind and effective attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerInstance {
    pub kind: String,
    pub attributes: BTreeMap<String, Value>,
}

impl MarkerInstance {
    fn resolve(marker: &Marker, registry: &TypeRegistry) -> Self {
        let mut attributes = registry
            .marker_definition(&marker.kind)
            .map(|definition| definition.defaults.clone())
            .unwrap_or_default();
        attributes.extend(
            marker
                .attributes
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        Self {
            kind: marker.kind.clone(),
            attributes,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn str_attr(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Value::as_str)
    }

    pub fn bool_attr(&self, name: &str) -> Option<bool> {
        self.attribute(name).and_then(Value::as_bool)
    }

    pub fn int_attr(&self, name: &str) -> Option<i64> {
        self.attribute(name).and_then(Value::as_i64)
    }
}

/// Something markers can be attached to.
#[derive(Debug, Clone, Copy)]
pub enum AnnotatedElement<'a> {
    Type(&'a TypeDecl),
    /// A single raw declaration, without inheritance.
    Method(&'a MethodDecl),
    /// A resolved member, searched over its declarations nearest-first.
    Member(&'a ResolvedMember),
    Parameter {
        member: &'a ResolvedMember,
        index: usize,
    },
    Field(&'a FieldDecl),
}

impl<'a> AnnotatedElement<'a> {
    /// A parameter of `member`; the index must be in range.
    pub fn parameter(member: &'a ResolvedMember, index: usize) -> Result<Self, MetamodelError> {
        if index >= member.param_count() {
            return Err(MetamodelError::InvalidArgument(format!(
                "parameter index {index} out of range for {member}"
            )));
        }
        Ok(Self::Parameter { member, index })
    }

    /// Marker lists to search, nearest first.
    fn layers(&self) -> Vec<&'a [Marker]> {
        match *self {
            Self::Type(decl) => vec![decl.markers.as_slice()],
            Self::Method(method) => vec![method.markers.as_slice()],
            Self::Field(field) => vec![field.markers.as_slice()],
            Self::Member(member) => member
                .declarations()
                .iter()
                .map(|decl| decl.markers.as_slice())
                .collect(),
            Self::Parameter { member, index } => member
                .declarations()
                .iter()
                .filter_map(|decl| decl.params.get(index))
                .map(|param| param.markers.as_slice())
                .collect(),
        }
    }
}

/// One marker of the requested kind found during synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerCandidate {
    /// Index of the declaration the marker was found on (0 = nearest).
    pub layer: usize,
    /// 0 for a directly attached marker, n for an n-th level meta-marker.
    pub meta_depth: usize,
    pub marker: MarkerInstance,
}

pub struct MarkerSynthesizer<'r> {
    registry: &'r TypeRegistry,
}

impl<'r> MarkerSynthesizer<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry }
    }

    /// The effective marker of `kind` on `element`, if any.
    pub fn synthesize(&self, element: &AnnotatedElement<'_>, kind: &str) -> Option<MarkerInstance> {
        element.layers().into_iter().find_map(|markers| {
            self.walk(markers, kind, true)
                .first()
                .map(|(_, marker)| MarkerInstance::resolve(marker, self.registry))
        })
    }

    pub fn is_present(&self, element: &AnnotatedElement<'_>, kind: &str) -> bool {
        self.synthesize(element, kind).is_some()
    }

    /// Every marker of `kind` reachable from `element`, in resolution order.
    /// The first entry is the one [`MarkerSynthesizer::synthesize`] returns.
    pub fn candidates(&self, element: &AnnotatedElement<'_>, kind: &str) -> Vec<MarkerCandidate> {
        element
            .layers()
            .into_iter()
            .enumerate()
            .flat_map(|(layer, markers)| {
                self.walk(markers, kind, false)
                    .into_iter()
                    .map(move |(meta_depth, marker)| (layer, meta_depth, marker))
            })
            .map(|(layer, meta_depth, marker)| MarkerCandidate {
                layer,
                meta_depth,
                marker: MarkerInstance::resolve(marker, self.registry),
            })
            .collect()
    }

    /// Whether the definition of `kind` reaches itself through its
    /// meta-markers.
    pub fn is_self_referencing(&self, kind: &str) -> bool {
        let Some(definition) = self.registry.marker_definition(kind) else {
            return false;
        };
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&Marker> = definition.markers.iter().collect();
        while let Some(marker) = stack.pop() {
            if marker.kind == kind {
                return true;
            }
            if !visited.insert(marker.kind.as_str()) {
                continue;
            }
            if let Some(meta) = self.registry.marker_definition(&marker.kind) {
                stack.extend(meta.markers.iter());
            }
        }
        false
    }

    fn walk<'m>(&self, markers: &'m [Marker], kind: &str, first_only: bool) -> Vec<(usize, &'m Marker)>
    where
        'r: 'm,
    {
        let registry: &'r TypeRegistry = self.registry;
        let mut found = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut frontier: Vec<&'m Marker> = markers.iter().collect();
        let mut depth = 0;

        while !frontier.is_empty() {
            let mut next = Vec::new();
            for marker in frontier {
                if marker.kind == kind {
                    found.push((depth, marker));
                    if first_only {
                        return found;
                    }
                    continue;
                }
                if !visited.insert(marker.kind.as_str()) {
                    trace!(marker = %marker.kind, depth, "marker kind already expanded");
                    continue;
                }
                if let Some(definition) = registry.marker_definition(&marker.kind) {
                    next.extend(definition.markers.iter());
                }
            }
            frontier = next;
            depth += 1;
        }
        found
    }
}
