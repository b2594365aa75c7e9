//! Built-in validators.

use super::{ValidationFailures, ValidatorDescriptor};
use crate::config::{MetamodelConfig, ModelConfig};
use crate::facet::kinds::{ContributingFacet, ElementTypeFacet, MandatoryFacet, MemberIdFacet};
use crate::facet::{FacetHolder, FacetKind, TypedFacet};
use crate::spec::{MetaModel, ObjectSpec};
use metamodel_introspect::{ROOT_TYPE, TypeRef};
use std::collections::BTreeMap;

/// The built-in validators enabled by `config`, in registration order.
pub fn builtin(config: &MetamodelConfig) -> Vec<ValidatorDescriptor> {
    let checks = &config.validation;
    let mut validators = vec![deferred_failures()];
    if checks.check_conflicting_optionality {
        validators.push(conflicting_facets(
            "conflicting_optionality",
            MandatoryFacet::KIND,
            "conflicting optionality",
        ));
    }
    if checks.check_ambiguous_mixins {
        validators.push(conflicting_facets(
            "ambiguous_mixins",
            ContributingFacet::KIND,
            "ambiguous mixin contribution",
        ));
    }
    if checks.check_member_id_clash {
        validators.push(member_id_clash());
    }
    if checks.check_element_types {
        validators.push(invalid_element_type(config.model.clone()));
    }
    validators
}

/// Raises the problems the builder deferred.
pub fn deferred_failures() -> ValidatorDescriptor {
    ValidatorDescriptor::new("deferred_failures").on_enter(|model, failures| {
        for failure in model.deferred_failures() {
            failures.insert(failure.clone());
        }
    })
}

/// Reports every holder whose top-ranked facets of `kind` disagree.
pub fn conflicting_facets(
    name: &str,
    kind: FacetKind,
    problem: &'static str,
) -> ValidatorDescriptor {
    ValidatorDescriptor::new(name)
        .on_object_enter(move |spec, failures| {
            report_conflicts(&spec.holder, kind, problem, failures)
        })
        .on_action(move |_, action, failures| {
            report_conflicts(&action.holder, kind, problem, failures)
        })
        .on_parameter(move |_, _, parameter, failures| {
            report_conflicts(&parameter.holder, kind, problem, failures)
        })
        .on_property(move |_, property, failures| {
            report_conflicts(&property.holder, kind, problem, failures)
        })
        .on_collection(move |_, collection, failures| {
            report_conflicts(&collection.holder, kind, problem, failures)
        })
}

fn report_conflicts(
    holder: &FacetHolder,
    kind: FacetKind,
    problem: &str,
    failures: &ValidationFailures,
) {
    let Some(ranking) = holder.ranking(kind) else {
        return;
    };
    for (winner, other) in ranking.conflicts() {
        failures.raise_formatted(
            Some(holder.id()),
            format_args!(
                "{}: {problem}: {} conflicts with {}",
                holder.id(),
                winner.describe(),
                other.describe()
            ),
        );
    }
}

/// Reports members of one type that expose the same member id.
pub fn member_id_clash() -> ValidatorDescriptor {
    ValidatorDescriptor::new("member_id_clash").on_object_enter(|spec, failures| {
        let mut first_with_id: BTreeMap<&str, String> = BTreeMap::new();
        for (label, holder) in member_labels(spec) {
            let Some(member_id) = holder.get::<MemberIdFacet>() else {
                continue;
            };
            match first_with_id.get(member_id.id.as_str()) {
                Some(first) => {
                    failures.raise_member_id_clash(spec.holder.id(), &member_id.id, first, &label);
                }
                None => {
                    first_with_id.insert(&member_id.id, label);
                }
            }
        }
    })
}

/// Every member holder of `spec` with a label naming it uniquely:
/// actions carry their parameter types so that overloads differ.
fn member_labels(spec: &ObjectSpec) -> Vec<(String, &FacetHolder)> {
    let actions = spec.actions.iter().map(|action| {
        let params: Vec<String> = action
            .member
            .parameter_types
            .iter()
            .map(ToString::to_string)
            .collect();
        (format!("{}({})", action.id(), params.join(", ")), &action.holder)
    });
    let associations = spec
        .associations()
        .map(|association| (association.id().to_string(), &association.holder));
    actions.chain(associations).collect()
}

/// Reports collections whose element type is not an object type of the
/// model.
pub fn invalid_element_type(model_config: ModelConfig) -> ValidatorDescriptor {
    ValidatorDescriptor::new("invalid_element_type").on_exit(move |model, failures| {
        for spec in model.specs() {
            for collection in spec.collections.values() {
                let Some(facet) = collection.holder.get::<ElementTypeFacet>() else {
                    continue;
                };
                if let Some(reason) = element_type_problem(model, &model_config, &facet.element_type)
                {
                    failures.raise_invalid_element_type(
                        collection.id(),
                        &facet.element_type,
                        reason,
                    );
                }
            }
        }
    })
}

fn element_type_problem(
    model: &MetaModel,
    model_config: &ModelConfig,
    element_type: &TypeRef,
) -> Option<&'static str> {
    let Some(raw) = element_type.raw_name() else {
        return Some("arrays and type variables are not object types");
    };
    if raw == ROOT_TYPE {
        return Some("raw collections have no element type");
    }
    if element_type.is_primitive() || model_config.is_value_type(raw) {
        return Some("value types are not object types");
    }
    if model_config.is_collection(raw) {
        return Some("nested collections are not supported");
    }
    if model.get(raw).is_none() {
        return Some("not an object type of this model");
    }
    None
}
