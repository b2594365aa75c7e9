//! Facet factories: each inspects one feature and installs the facets of
//! one concern on its holder.

use super::{Feature, ProcessContext};
use crate::config::ModelConfig;
use crate::facet::Precedence;
use crate::facet::kinds::{
    Condition, Contributed, ContributingFacet, DisabledFacet, ElementTypeFacet, HiddenFacet,
    MandatoryFacet, MemberIdFacet, MixinFacet, NamedFacet, Optionality,
};
use crate::feature::FeatureKind;
use crate::markers::{AnnotatedElement, MarkerSynthesizer, kinds};
use crate::members::ResolvedMember;
use metamodel_introspect::TypeRef;

const MEMBERS: &[FeatureKind] = &[
    FeatureKind::Action,
    FeatureKind::Property,
    FeatureKind::Collection,
];

/// Installs facets for the features it applies to.
pub trait FacetFactory: Send + Sync {
    fn name(&self) -> &'static str;

    /// Feature kinds this factory is consulted for.
    fn feature_kinds(&self) -> &'static [FeatureKind];

    fn process(&self, ctx: &mut ProcessContext<'_>);
}

/// The factories a builder registers unless told otherwise, in order.
pub fn builtin_factories() -> Vec<Box<dyn FacetFactory>> {
    vec![
        Box::new(MixinFacetFactory),
        Box::new(ContributingFacetFactory),
        Box::new(NamedFacetFactory),
        Box::new(MemberIdFacetFactory),
        Box::new(OptionalityFacetFactory),
        Box::new(VisibilityFacetFactory),
        Box::new(ElementTypeFacetFactory),
    ]
}

/// Marker kind that configures a member of `kind`.
fn member_marker(kind: FeatureKind) -> Option<&'static str> {
    match kind {
        FeatureKind::Action => Some(kinds::ACTION),
        FeatureKind::Property => Some(kinds::PROPERTY),
        FeatureKind::Collection => Some(kinds::COLLECTION),
        FeatureKind::Parameter => Some(kinds::PARAMETER),
        FeatureKind::Object => None,
    }
}

/// "firstName" → "First Name", "com.acme.CustomerEx" → "Customer Ex".
pub fn friendly_name(identifier: &str) -> String {
    let simple = identifier.rsplit('.').next().unwrap_or(identifier);
    let mut words = String::with_capacity(simple.len() + 4);
    let mut previous: Option<char> = None;
    for c in simple.chars() {
        if c == '_' {
            words.push(' ');
            previous = Some(' ');
            continue;
        }
        if c.is_uppercase() && previous.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
            words.push(' ');
        }
        if previous.is_none_or(|p| p == ' ') {
            words.extend(c.to_uppercase());
        } else {
            words.push(c);
        }
        previous = Some(c);
    }
    words
}

/// What a mixin method contributes as, most authoritative first.
///
/// One facet per contributing marker present; when none is present the
/// kind is inferred from the signature.
pub fn contributions(
    synthesizer: &MarkerSynthesizer<'_>,
    model: &ModelConfig,
    method: &ResolvedMember,
) -> Vec<ContributingFacet> {
    let element = AnnotatedElement::Member(method);
    let declared: Vec<ContributingFacet> = [
        (kinds::ACTION, Contributed::Action),
        (kinds::PROPERTY, Contributed::Property),
        (kinds::COLLECTION, Contributed::Collection),
    ]
    .into_iter()
    .filter(|(kind, _)| synthesizer.is_present(&element, kind))
    .map(|(kind, contributed)| {
        ContributingFacet::new(contributed, Precedence::Default, format!("@{kind}"))
    })
    .collect();
    if !declared.is_empty() {
        return declared;
    }

    let inferred = if method.param_count() > 0 || method.return_type.is_void() {
        Contributed::Action
    } else if is_collection_type(model, &method.return_type) {
        Contributed::Collection
    } else {
        Contributed::Property
    };
    vec![ContributingFacet::new(inferred, Precedence::Inferred, "signature")]
}

pub(crate) fn is_collection_type(model: &ModelConfig, ty: &TypeRef) -> bool {
    match ty {
        TypeRef::Array(_) => true,
        _ => ty.raw_name().is_some_and(|name| model.is_collection(name)),
    }
}

/// Marks nested helper types carrying a `Mixin` marker.
pub struct MixinFacetFactory;

impl FacetFactory for MixinFacetFactory {
    fn name(&self) -> &'static str {
        "mixin"
    }

    fn feature_kinds(&self) -> &'static [FeatureKind] {
        &[FeatureKind::Object]
    }

    fn process(&self, ctx: &mut ProcessContext<'_>) {
        let Feature::Object { decl } = ctx.feature else {
            return;
        };
        let Some(declaring) = decl.declaring_type.as_deref() else {
            return;
        };
        let Some(marker) = ctx.synthesize(&AnnotatedElement::Type(decl), kinds::MIXIN) else {
            return;
        };
        // The builder defers the failure when no usable name comes out.
        if let Ok(member) = super::mixin_member_name(decl, &marker) {
            ctx.install(MixinFacet::new(declaring, member, Precedence::Default, "@Mixin"));
        }
    }
}

/// Records what a mixin method contributes as.
pub struct ContributingFacetFactory;

impl FacetFactory for ContributingFacetFactory {
    fn name(&self) -> &'static str {
        "contributing"
    }

    fn feature_kinds(&self) -> &'static [FeatureKind] {
        MEMBERS
    }

    fn process(&self, ctx: &mut ProcessContext<'_>) {
        let Some((member, Some(_))) = ctx.feature.member_and_mixin() else {
            return;
        };
        for facet in contributions(ctx.synthesizer, &ctx.config.model, member) {
            ctx.install(facet);
        }
    }
}

/// Friendly names from `Named` markers, derived otherwise.
pub struct NamedFacetFactory;

impl FacetFactory for NamedFacetFactory {
    fn name(&self) -> &'static str {
        "named"
    }

    fn feature_kinds(&self) -> &'static [FeatureKind] {
        &[
            FeatureKind::Object,
            FeatureKind::Action,
            FeatureKind::Parameter,
            FeatureKind::Property,
            FeatureKind::Collection,
        ]
    }

    fn process(&self, ctx: &mut ProcessContext<'_>) {
        let feature = ctx.feature;
        let element = feature.element();
        let declared = ctx
            .synthesize(&element, kinds::NAMED)
            .and_then(|marker| marker.str_attr("value").map(str::to_string));
        if let Some(name) = declared {
            ctx.install(NamedFacet::new(name, Precedence::Default, "@Named"));
            return;
        }

        let derived = match feature {
            Feature::Object { decl } => friendly_name(&decl.name),
            Feature::Parameter { member, index } => member
                .declaration()
                .and_then(|decl| decl.params.get(index))
                .and_then(|param| param.name.as_deref())
                .map(friendly_name)
                .or_else(|| {
                    member
                        .parameter_types
                        .get(index)
                        .and_then(TypeRef::raw_name)
                        .map(friendly_name)
                })
                .unwrap_or_else(|| format!("Parameter {}", index + 1)),
            _ => friendly_name(ctx.holder().id().member_name().unwrap_or_default()),
        };
        ctx.install(NamedFacet::new(derived, Precedence::Fallback, "derived"));
    }
}

/// Externally visible member identifiers.
pub struct MemberIdFacetFactory;

impl FacetFactory for MemberIdFacetFactory {
    fn name(&self) -> &'static str {
        "member_id"
    }

    fn feature_kinds(&self) -> &'static [FeatureKind] {
        MEMBERS
    }

    fn process(&self, ctx: &mut ProcessContext<'_>) {
        let kind = ctx.holder().id().kind();
        let element = ctx.feature.element();
        let declared = member_marker(kind)
            .and_then(|marker_kind| ctx.synthesize(&element, marker_kind))
            .and_then(|marker| {
                marker
                    .str_attr("id")
                    .filter(|id| !id.is_empty())
                    .map(|id| (id.to_string(), format!("@{}", marker.kind)))
            });
        match declared {
            Some((id, origin)) => ctx.install(MemberIdFacet::new(id, Precedence::Default, origin)),
            None => {
                let name = ctx.holder().id().member_name().unwrap_or_default().to_string();
                ctx.install(MemberIdFacet::new(name, Precedence::Fallback, "member name"))
            }
        };
    }
}

/// Mandatory/optional facts for properties and parameters.
///
/// Sources: the `optionality` attribute of the member's own marker, the
/// `allowsNull` attribute of a `Column` marker on the backing field, and a
/// fallback by type. Marker and column sit at the same precedence, so when
/// they disagree the ranking holds a conflict.
pub struct OptionalityFacetFactory;

impl FacetFactory for OptionalityFacetFactory {
    fn name(&self) -> &'static str {
        "optionality"
    }

    fn feature_kinds(&self) -> &'static [FeatureKind] {
        &[FeatureKind::Property, FeatureKind::Parameter]
    }

    fn process(&self, ctx: &mut ProcessContext<'_>) {
        let feature = ctx.feature;
        let Some(marker_kind) = member_marker(feature.kind()) else {
            return;
        };
        let mut declared = false;

        if let Some(marker) = ctx.synthesize(&feature.element(), marker_kind) {
            match marker.str_attr("optionality") {
                None => {}
                Some(value) if value.is_empty() || value.eq_ignore_ascii_case("default") => {}
                Some(value) => match Optionality::parse(value) {
                    Some(optionality) => {
                        ctx.install(MandatoryFacet::new(
                            optionality,
                            Precedence::Default,
                            format!("@{marker_kind}"),
                        ));
                        declared = true;
                    }
                    None => {
                        let id = ctx.holder().id().clone();
                        ctx.defer(format!("{id}: unknown optionality '{value}'"));
                    }
                },
            }
        }

        if let Feature::Property { field: Some(field), .. } = feature {
            let allows_null = ctx
                .synthesize(&AnnotatedElement::Field(field), kinds::COLUMN)
                .and_then(|column| column.bool_attr("allowsNull"));
            if let Some(allows_null) = allows_null {
                let optionality = if allows_null {
                    Optionality::Optional
                } else {
                    Optionality::Mandatory
                };
                ctx.install(MandatoryFacet::new(optionality, Precedence::Default, "@Column"));
                declared = true;
            }
        }

        if declared {
            return;
        }
        let primitive = feature.value_type().is_some_and(TypeRef::is_primitive);
        if primitive {
            ctx.install(MandatoryFacet::new(
                Optionality::Mandatory,
                Precedence::Inferred,
                "primitive type",
            ));
        } else {
            ctx.install(MandatoryFacet::new(
                Optionality::Mandatory,
                Precedence::Fallback,
                "default",
            ));
        }
    }
}

/// `hidden`/`disabled` attributes of member markers.
pub struct VisibilityFacetFactory;

impl FacetFactory for VisibilityFacetFactory {
    fn name(&self) -> &'static str {
        "visibility"
    }

    fn feature_kinds(&self) -> &'static [FeatureKind] {
        MEMBERS
    }

    fn process(&self, ctx: &mut ProcessContext<'_>) {
        let kind = ctx.holder().id().kind();
        let Some(marker_kind) = member_marker(kind) else {
            return;
        };
        let Some(marker) = ctx.synthesize(&ctx.feature.element(), marker_kind) else {
            return;
        };
        let origin = format!("@{marker_kind}");
        if marker.bool_attr("hidden") == Some(true) {
            ctx.install(HiddenFacet::new(Condition::Always, Precedence::Default, origin.clone()));
        }
        if marker.bool_attr("disabled") == Some(true) {
            ctx.install(DisabledFacet::new(Condition::Always, Precedence::Default, origin));
        }
    }
}

/// Element types of collections: declared through the `Collection`
/// marker, or taken from the accessor's generic return type.
pub struct ElementTypeFacetFactory;

impl FacetFactory for ElementTypeFacetFactory {
    fn name(&self) -> &'static str {
        "element_type"
    }

    fn feature_kinds(&self) -> &'static [FeatureKind] {
        &[FeatureKind::Collection]
    }

    fn process(&self, ctx: &mut ProcessContext<'_>) {
        let feature = ctx.feature;
        let declared = ctx
            .synthesize(&feature.element(), kinds::COLLECTION)
            .and_then(|marker| marker.str_attr("elementType").map(str::to_string));
        if let Some(text) = declared {
            match TypeRef::parse(&text) {
                Ok(element_type) => {
                    ctx.install(ElementTypeFacet::new(
                        element_type,
                        Precedence::Default,
                        "@Collection",
                    ));
                    return;
                }
                Err(err) => {
                    let id = ctx.holder().id().clone();
                    ctx.defer(format!("{id}: malformed elementType: {err}"));
                }
            }
        }

        let Some(value_type) = feature.value_type() else {
            return;
        };
        let inferred = match value_type {
            TypeRef::Array(element) => Some(element.as_ref().clone()),
            other => other.type_args().first().cloned(),
        };
        match inferred {
            Some(element_type) => ctx.install(ElementTypeFacet::new(
                element_type,
                Precedence::Inferred,
                "generic return type",
            )),
            None => ctx.install(ElementTypeFacet::new(
                TypeRef::root(),
                Precedence::Fallback,
                "raw collection",
            )),
        };
    }
}
