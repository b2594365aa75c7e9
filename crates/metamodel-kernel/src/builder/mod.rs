//! Metamodel construction.
//!
//! For each requested domain type the builder resolves its members,
//! classifies them by naming convention, and hands every resulting feature
//! to the registered facet factories:
//!
//! ```text
//! getX() / isX()        → property x (collection x if the type is a collection)
//! setX(..)              → consumed
//! hideX() / disableX()  → hidden / disabled facet on the existing holder x
//! anything else         → action, with one parameter spec per parameter
//! Type_x (nested, @Mixin) → member x of Type, contributed by the helper
//! ```
//!
//! Problems a factory notices (an unknown attribute value, a supporting
//! method with nothing to support) are deferred onto the model and raised
//! when validation starts.

pub mod factories;

use crate::config::{MetamodelConfig, ModelConfig};
use crate::error::MetamodelError;
use crate::facet::kinds::{Condition, Contributed, DisabledFacet, HiddenFacet};
use crate::facet::{Facet, FacetHolder, Precedence};
use crate::feature::{FeatureId, FeatureKind};
use crate::markers::{AnnotatedElement, MarkerInstance, MarkerSynthesizer, kinds};
use crate::members::{MemberCache, ResolvedMember};
use crate::spec::{ActionSpec, AssociationSpec, MetaModel, ObjectSpec, ParameterSpec};
use crate::validation::ValidationFailure;
use factories::{FacetFactory, builtin_factories, contributions, is_collection_type};
use metamodel_introspect::{FieldDecl, ROOT_TYPE, TypeDecl, TypeRef, is_identifier};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// The element a factory is asked about.
#[derive(Debug, Clone, Copy)]
pub enum Feature<'a> {
    Object {
        decl: &'a TypeDecl,
    },
    Action {
        member: &'a ResolvedMember,
        mixin: Option<&'a TypeDecl>,
    },
    Parameter {
        member: &'a ResolvedMember,
        index: usize,
    },
    Property {
        accessor: &'a ResolvedMember,
        field: Option<&'a FieldDecl>,
        mixin: Option<&'a TypeDecl>,
    },
    Collection {
        accessor: &'a ResolvedMember,
        field: Option<&'a FieldDecl>,
        mixin: Option<&'a TypeDecl>,
    },
}

impl<'a> Feature<'a> {
    pub fn kind(self) -> FeatureKind {
        match self {
            Self::Object { .. } => FeatureKind::Object,
            Self::Action { .. } => FeatureKind::Action,
            Self::Parameter { .. } => FeatureKind::Parameter,
            Self::Property { .. } => FeatureKind::Property,
            Self::Collection { .. } => FeatureKind::Collection,
        }
    }

    /// Where markers for this feature are looked up.
    pub fn element(self) -> AnnotatedElement<'a> {
        match self {
            Self::Object { decl } => AnnotatedElement::Type(decl),
            Self::Action { member, .. } => AnnotatedElement::Member(member),
            Self::Parameter { member, index } => AnnotatedElement::Parameter { member, index },
            Self::Property { accessor, .. } | Self::Collection { accessor, .. } => {
                AnnotatedElement::Member(accessor)
            }
        }
    }

    /// The member behind an action, property or collection, and the mixin
    /// contributing it.
    pub fn member_and_mixin(self) -> Option<(&'a ResolvedMember, Option<&'a TypeDecl>)> {
        match self {
            Self::Action { member, mixin } => Some((member, mixin)),
            Self::Property { accessor, mixin, .. } | Self::Collection { accessor, mixin, .. } => {
                Some((accessor, mixin))
            }
            Self::Object { .. } | Self::Parameter { .. } => None,
        }
    }

    /// Declared type of the value a feature holds or returns.
    pub fn value_type(self) -> Option<&'a TypeRef> {
        match self {
            Self::Object { .. } => None,
            Self::Action { member, .. } => Some(&member.generic_return_type),
            Self::Parameter { member, index } => member.generic_parameter_types.get(index),
            Self::Property { accessor, .. } | Self::Collection { accessor, .. } => {
                Some(&accessor.generic_return_type)
            }
        }
    }
}

/// What a factory sees while processing one feature.
pub struct ProcessContext<'a> {
    pub feature: Feature<'a>,
    pub synthesizer: &'a MarkerSynthesizer<'a>,
    pub config: &'a MetamodelConfig,
    holder: &'a mut FacetHolder,
    deferred: &'a mut Vec<ValidationFailure>,
}

impl ProcessContext<'_> {
    pub fn holder(&self) -> &FacetHolder {
        self.holder
    }

    pub fn synthesize(&self, element: &AnnotatedElement<'_>, kind: &str) -> Option<MarkerInstance> {
        self.synthesizer.synthesize(element, kind)
    }

    pub fn install(&mut self, facet: impl Facet) -> bool {
        self.holder.add_facet(facet)
    }

    /// Report a problem with this feature when validation starts.
    pub fn defer(&mut self, message: impl Into<String>) {
        let origin = self.holder.id().clone();
        self.deferred.push(ValidationFailure::new(Some(origin), message));
    }
}

/// How a resolved member participates in the model.
#[derive(Debug, PartialEq, Eq)]
enum Role {
    Property(String),
    Collection(String),
    Hide(String),
    Disable(String),
    Mutator,
    Action,
}

fn classify(member: &ResolvedMember, model: &ModelConfig) -> Role {
    let returns_boolean = matches!(member.return_type.raw_name(), Some("boolean" | "Boolean"));
    let params = member.param_count();
    if params == 0 && !member.return_type.is_void() {
        if let Some(name) = strip_accessor_prefix(&member.name, "get") {
            return if is_collection_type(model, &member.return_type) {
                Role::Collection(name)
            } else {
                Role::Property(name)
            };
        }
        if returns_boolean {
            if let Some(name) = strip_accessor_prefix(&member.name, "is") {
                return Role::Property(name);
            }
            if let Some(name) = strip_accessor_prefix(&member.name, "hide") {
                return Role::Hide(name);
            }
            if let Some(name) = strip_accessor_prefix(&member.name, "disable") {
                return Role::Disable(name);
            }
        }
    }
    if params == 1 && strip_accessor_prefix(&member.name, "set").is_some() {
        return Role::Mutator;
    }
    Role::Action
}

/// "getFirstName" with prefix "get" → "firstName".
fn strip_accessor_prefix(name: &str, prefix: &str) -> Option<String> {
    let rest = name.strip_prefix(prefix)?;
    let mut chars = rest.chars();
    let first = chars.next().filter(|c| c.is_uppercase())?;
    Some(first.to_lowercase().chain(chars).collect())
}

/// Name of the member a mixin contributes: the marker's `member`
/// attribute, or whatever follows the last `_` of the helper's name.
///
/// The error is the message to defer when no usable name comes out. A
/// usable name is a single undotted identifier.
pub(crate) fn mixin_member_name(
    helper: &TypeDecl,
    marker: &MarkerInstance,
) -> Result<String, String> {
    let name = match marker.str_attr("member").filter(|m| !m.is_empty()) {
        Some(member) => member.to_string(),
        None => {
            let simple = helper.name.rsplit('.').next().unwrap_or(&helper.name);
            match simple.rsplit_once('_').map(|(_, suffix)| suffix) {
                Some(suffix) if !suffix.is_empty() => suffix.to_string(),
                _ => {
                    return Err(format!(
                        "{}: cannot derive the contributed member name of mixin",
                        helper.name
                    ));
                }
            }
        }
    };
    if is_identifier(&name) && !name.contains('.') {
        Ok(name)
    } else {
        Err(format!(
            "{}: mixin member name '{name}' is not an identifier",
            helper.name
        ))
    }
}

/// Builds a [`MetaModel`] from the types the member cache can see.
pub struct MetaModelBuilder {
    cache: Arc<MemberCache>,
    config: MetamodelConfig,
    factories: Vec<Box<dyn FacetFactory>>,
}

impl MetaModelBuilder {
    /// A builder with the built-in factories.
    pub fn new(cache: Arc<MemberCache>, config: MetamodelConfig) -> Self {
        Self {
            cache,
            config,
            factories: builtin_factories(),
        }
    }

    /// A builder with no factories registered.
    pub fn bare(cache: Arc<MemberCache>, config: MetamodelConfig) -> Self {
        Self {
            cache,
            config,
            factories: Vec::new(),
        }
    }

    pub fn with_factory(mut self, factory: impl FacetFactory + 'static) -> Self {
        self.factories.push(Box::new(factory));
        self
    }

    pub fn config(&self) -> &MetamodelConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<MemberCache> {
        &self.cache
    }

    /// Every declared domain type: not a marker, not the root, not nested
    /// inside another type.
    pub fn build_all(&self) -> Result<MetaModel, MetamodelError> {
        let names: Vec<String> = self
            .cache
            .registry()
            .types()
            .filter(|decl| {
                !decl.is_marker() && decl.name != ROOT_TYPE && decl.declaring_type.is_none()
            })
            .map(|decl| decl.name.clone())
            .collect();
        self.build(names)
    }

    pub fn build<I, S>(&self, type_names: I) -> Result<MetaModel, MetamodelError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let synthesizer = MarkerSynthesizer::new(self.cache.registry());
        let mut specs = BTreeMap::new();
        let mut deferred = Vec::new();
        for name in type_names {
            let name = name.as_ref();
            if specs.contains_key(name) {
                continue;
            }
            self.build_object(name, &synthesizer, &mut specs, &mut deferred)?;
        }
        info!(
            specs = specs.len(),
            deferred = deferred.len(),
            "metamodel built"
        );
        Ok(MetaModel::new(specs, deferred))
    }

    fn process(
        &self,
        feature: Feature<'_>,
        synthesizer: &MarkerSynthesizer<'_>,
        holder: &mut FacetHolder,
        deferred: &mut Vec<ValidationFailure>,
    ) {
        let mut ctx = ProcessContext {
            feature,
            synthesizer,
            config: &self.config,
            holder,
            deferred,
        };
        for factory in &self.factories {
            if factory.feature_kinds().contains(&feature.kind()) {
                factory.process(&mut ctx);
            }
        }
    }

    fn build_object(
        &self,
        type_name: &str,
        synthesizer: &MarkerSynthesizer<'_>,
        specs: &mut BTreeMap<String, ObjectSpec>,
        deferred: &mut Vec<ValidationFailure>,
    ) -> Result<(), MetamodelError> {
        let registry = self.cache.registry();
        let decl = registry.get(type_name)?;
        let members = self.cache.resolve_members(type_name)?;

        let mut spec = ObjectSpec::new(FacetHolder::new(FeatureId::object(type_name)?));
        self.process(Feature::Object { decl }, synthesizer, &mut spec.holder, deferred);

        let mut supporting = Vec::new();
        for member in members.methods() {
            if member.is_static() {
                continue;
            }
            match classify(member, &self.config.model) {
                Role::Property(name) => {
                    if !spec.properties.contains_key(&name) {
                        let property = self.build_association(
                            type_name,
                            &name,
                            FeatureKind::Property,
                            member,
                            None,
                            synthesizer,
                            deferred,
                        )?;
                        spec.properties.insert(name, property);
                    }
                }
                Role::Collection(name) => {
                    if !spec.collections.contains_key(&name) {
                        let collection = self.build_association(
                            type_name,
                            &name,
                            FeatureKind::Collection,
                            member,
                            None,
                            synthesizer,
                            deferred,
                        )?;
                        spec.collections.insert(name, collection);
                    }
                }
                Role::Hide(target) | Role::Disable(target) => {
                    supporting.push((Arc::clone(member), target));
                }
                Role::Mutator => {}
                Role::Action => {
                    let action = self.build_action(
                        type_name,
                        &member.name,
                        member,
                        None,
                        synthesizer,
                        deferred,
                    )?;
                    spec.actions.push(action);
                }
            }
        }

        for helper_name in members.nested() {
            let helper = registry.get(helper_name)?;
            let Some(marker) = synthesizer.synthesize(&AnnotatedElement::Type(helper), kinds::MIXIN)
            else {
                continue;
            };
            self.contribute_mixin(&mut spec, helper, &marker, synthesizer, specs, deferred)?;
        }

        for (member, target) in supporting {
            attach_supporting(&mut spec, &member, &target, &self.config.model, deferred);
        }

        debug!(
            type_name,
            actions = spec.actions.len(),
            properties = spec.properties.len(),
            collections = spec.collections.len(),
            "built object spec"
        );
        specs.insert(type_name.to_string(), spec);
        Ok(())
    }

    fn contribute_mixin(
        &self,
        spec: &mut ObjectSpec,
        helper: &TypeDecl,
        marker: &MarkerInstance,
        synthesizer: &MarkerSynthesizer<'_>,
        specs: &mut BTreeMap<String, ObjectSpec>,
        deferred: &mut Vec<ValidationFailure>,
    ) -> Result<(), MetamodelError> {
        let mut helper_spec = ObjectSpec::new(FacetHolder::new(FeatureId::object(&helper.name)?));
        self.process(
            Feature::Object { decl: helper },
            synthesizer,
            &mut helper_spec.holder,
            deferred,
        );
        specs.insert(helper.name.clone(), helper_spec);

        let member_name = match mixin_member_name(helper, marker) {
            Ok(name) => name,
            Err(message) => {
                let origin = FeatureId::object(&helper.name).ok();
                deferred.push(ValidationFailure::new(origin, message));
                return Ok(());
            }
        };
        let helper_members = self.cache.resolve_members(&helper.name)?;
        let wanted = marker.str_attr("method");
        let candidates: Vec<&Arc<ResolvedMember>> = helper_members
            .methods()
            .iter()
            .filter(|m| !m.is_static() && wanted.is_none_or(|w| m.name == w))
            .collect();
        let [method] = candidates.as_slice() else {
            deferred.push(ValidationFailure::new(
                FeatureId::object(&helper.name).ok(),
                format!(
                    "{}: mixin must declare exactly one public method, found {}",
                    helper.name,
                    candidates.len()
                ),
            ));
            return Ok(());
        };

        if spec.member_holder_mut(&member_name).is_some() {
            deferred.push(ValidationFailure::new(
                Some(spec.holder.id().clone()),
                format!(
                    "{}#{member_name}: contributed by mixin {} but already declared",
                    spec.type_name(),
                    helper.name
                ),
            ));
            return Ok(());
        }

        let contributed = contributions(synthesizer, &self.config.model, method)
            .first()
            .map(|facet| facet.contributed)
            .unwrap_or(Contributed::Action);
        let type_name = spec.type_name().to_string();
        match contributed {
            Contributed::Action => {
                let action = self.build_action(
                    &type_name,
                    &member_name,
                    method,
                    Some(helper),
                    synthesizer,
                    deferred,
                )?;
                spec.actions.push(action);
            }
            Contributed::Property => {
                let property = self.build_association(
                    &type_name,
                    &member_name,
                    FeatureKind::Property,
                    method,
                    Some(helper),
                    synthesizer,
                    deferred,
                )?;
                spec.properties.insert(member_name, property);
            }
            Contributed::Collection => {
                let collection = self.build_association(
                    &type_name,
                    &member_name,
                    FeatureKind::Collection,
                    method,
                    Some(helper),
                    synthesizer,
                    deferred,
                )?;
                spec.collections.insert(member_name, collection);
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn build_association(
        &self,
        type_name: &str,
        name: &str,
        kind: FeatureKind,
        accessor: &Arc<ResolvedMember>,
        mixin: Option<&TypeDecl>,
        synthesizer: &MarkerSynthesizer<'_>,
        deferred: &mut Vec<ValidationFailure>,
    ) -> Result<AssociationSpec, MetamodelError> {
        let field = match mixin {
            Some(_) => None,
            None => self
                .cache
                .registry()
                .find(&accessor.declaring_type)
                .and_then(|owner| owner.field(name)),
        };
        let mut holder = FacetHolder::new(FeatureId::member(type_name, name, kind)?);
        let feature = if kind == FeatureKind::Collection {
            Feature::Collection {
                accessor,
                field,
                mixin,
            }
        } else {
            Feature::Property {
                accessor,
                field,
                mixin,
            }
        };
        self.process(feature, synthesizer, &mut holder, deferred);
        Ok(AssociationSpec {
            holder,
            accessor: Arc::clone(accessor),
            field: field.cloned(),
            mixin: mixin.map(|helper| helper.name.clone()),
        })
    }

    fn build_action(
        &self,
        type_name: &str,
        name: &str,
        member: &Arc<ResolvedMember>,
        mixin: Option<&TypeDecl>,
        synthesizer: &MarkerSynthesizer<'_>,
        deferred: &mut Vec<ValidationFailure>,
    ) -> Result<ActionSpec, MetamodelError> {
        let id = FeatureId::member(type_name, name, FeatureKind::Action)?;
        let mut parameters = Vec::with_capacity(member.param_count());
        for (index, ty) in member.generic_parameter_types.iter().enumerate() {
            let mut holder = FacetHolder::new(id.parameter(index)?);
            self.process(
                Feature::Parameter { member, index },
                synthesizer,
                &mut holder,
                deferred,
            );
            parameters.push(ParameterSpec {
                holder,
                index,
                name: member
                    .declaration()
                    .and_then(|decl| decl.params.get(index))
                    .and_then(|param| param.name.clone()),
                ty: ty.clone(),
            });
        }

        let mut holder = FacetHolder::new(id);
        self.process(
            Feature::Action { member, mixin },
            synthesizer,
            &mut holder,
            deferred,
        );
        Ok(ActionSpec {
            holder,
            member: Arc::clone(member),
            parameters,
            mixin: mixin.map(|helper| helper.name.clone()),
        })
    }
}

/// Attach a hide/disable supporting method to the member it supports.
fn attach_supporting(
    spec: &mut ObjectSpec,
    member: &ResolvedMember,
    target: &str,
    model: &ModelConfig,
    deferred: &mut Vec<ValidationFailure>,
) {
    let role = classify(member, model);
    let origin = format!("{}()", member.name);
    let condition = Condition::Method(member.name.clone());
    let type_name = spec.type_name().to_string();
    let Some(holder) = spec.member_holder_mut(target) else {
        deferred.push(ValidationFailure::new(
            FeatureId::object(&type_name).ok(),
            format!("{type_name}#{}(): no member '{target}' to support", member.name),
        ));
        return;
    };
    match role {
        Role::Hide(_) => holder.add_facet(HiddenFacet::new(condition, Precedence::Inferred, origin)),
        _ => holder.add_facet(DisabledFacet::new(condition, Precedence::Inferred, origin)),
    };
}
