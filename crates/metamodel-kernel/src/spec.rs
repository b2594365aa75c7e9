//! The built metamodel: one object spec per domain type, each owning the
//! feature holders of its actions, parameters, properties and collections.
//!
//! A model is frozen once built. Validation only reads it.

use crate::facet::FacetHolder;
use crate::feature::{FeatureId, FeatureKind};
use crate::members::ResolvedMember;
use crate::validation::ValidationFailure;
use metamodel_introspect::{FieldDecl, TypeRef};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ParameterSpec {
    pub holder: FacetHolder,
    pub index: usize,
    pub name: Option<String>,
    pub ty: TypeRef,
}

#[derive(Debug, Clone)]
pub struct ActionSpec {
    pub holder: FacetHolder,
    pub member: Arc<ResolvedMember>,
    pub parameters: Vec<ParameterSpec>,
    /// The helper type contributing this action, if any.
    pub mixin: Option<String>,
}

impl ActionSpec {
    pub fn id(&self) -> &FeatureId {
        self.holder.id()
    }

    pub fn name(&self) -> &str {
        self.holder.id().member_name().unwrap_or(&self.member.name)
    }
}

/// A property or a collection.
#[derive(Debug, Clone)]
pub struct AssociationSpec {
    pub holder: FacetHolder,
    pub accessor: Arc<ResolvedMember>,
    /// Backing field on the accessor's declaring type, when one exists.
    pub field: Option<FieldDecl>,
    pub mixin: Option<String>,
}

impl AssociationSpec {
    pub fn id(&self) -> &FeatureId {
        self.holder.id()
    }

    pub fn name(&self) -> &str {
        self.holder.id().member_name().unwrap_or(&self.accessor.name)
    }

    pub fn is_collection(&self) -> bool {
        self.holder.id().kind() == FeatureKind::Collection
    }

    /// Declared type of the value, with generics.
    pub fn value_type(&self) -> &TypeRef {
        &self.accessor.generic_return_type
    }
}

#[derive(Debug, Clone)]
pub struct ObjectSpec {
    pub holder: FacetHolder,
    pub actions: Vec<ActionSpec>,
    pub properties: BTreeMap<String, AssociationSpec>,
    pub collections: BTreeMap<String, AssociationSpec>,
}

impl ObjectSpec {
    pub fn new(holder: FacetHolder) -> Self {
        Self {
            holder,
            actions: Vec::new(),
            properties: BTreeMap::new(),
            collections: BTreeMap::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        self.holder.id().logical_type()
    }

    pub fn action(&self, name: &str) -> Option<&ActionSpec> {
        self.actions.iter().find(|action| action.name() == name)
    }

    pub fn property(&self, name: &str) -> Option<&AssociationSpec> {
        self.properties.get(name)
    }

    pub fn collection(&self, name: &str) -> Option<&AssociationSpec> {
        self.collections.get(name)
    }

    /// Properties then collections, each in name order.
    pub fn associations(&self) -> impl Iterator<Item = &AssociationSpec> {
        self.properties.values().chain(self.collections.values())
    }

    /// The holder of the member called `name`, of whichever kind.
    pub fn member_holder_mut(&mut self, name: &str) -> Option<&mut FacetHolder> {
        if let Some(property) = self.properties.get_mut(name) {
            return Some(&mut property.holder);
        }
        if let Some(collection) = self.collections.get_mut(name) {
            return Some(&mut collection.holder);
        }
        self.actions
            .iter_mut()
            .find(|action| action.name() == name)
            .map(|action| &mut action.holder)
    }

    /// Every holder owned by this spec: itself, then its members and
    /// their parameters.
    pub fn holders(&self) -> Vec<&FacetHolder> {
        let mut holders = vec![&self.holder];
        for action in &self.actions {
            holders.push(&action.holder);
            holders.extend(action.parameters.iter().map(|p| &p.holder));
        }
        holders.extend(self.associations().map(|a| &a.holder));
        holders
    }
}

/// All object specs, keyed and iterated by type name.
#[derive(Debug, Clone, Default)]
pub struct MetaModel {
    specs: BTreeMap<String, ObjectSpec>,
    deferred: Vec<ValidationFailure>,
}

impl MetaModel {
    pub(crate) fn new(specs: BTreeMap<String, ObjectSpec>, deferred: Vec<ValidationFailure>) -> Self {
        Self { specs, deferred }
    }

    pub fn get(&self, type_name: &str) -> Option<&ObjectSpec> {
        self.specs.get(type_name)
    }

    pub fn specs(&self) -> impl Iterator<Item = &ObjectSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Problems noticed while building, raised when validation starts.
    pub fn deferred_failures(&self) -> &[ValidationFailure] {
        &self.deferred
    }
}
