//! Built-in facet kinds.
//!
//! Every facet records the mechanism that produced it (`origin`) so that
//! conflict messages can name both sides.

use super::{Facet, FacetKind, Precedence, TypedFacet};
use metamodel_introspect::TypeRef;
use serde::Serialize;
use std::any::Any;
use std::fmt;

macro_rules! impl_facet {
    ($ty:ty, $kind:literal, |$this:ident, $other:ident| $equal:expr, |$me:ident| $describe:expr) => {
        impl TypedFacet for $ty {
            const KIND: FacetKind = FacetKind($kind);
        }

        impl Facet for $ty {
            fn kind(&self) -> FacetKind {
                Self::KIND
            }

            fn precedence(&self) -> Precedence {
                self.precedence
            }

            fn semantically_equals(&self, other: &dyn Facet) -> bool {
                let $this = self;
                match other.as_any().downcast_ref::<$ty>() {
                    Some($other) => $equal,
                    None => false,
                }
            }

            fn describe(&self) -> String {
                let $me = self;
                $describe
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Optionality {
    Mandatory,
    Optional,
}

impl Optionality {
    /// Parse a marker attribute value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "mandatory" | "required" => Some(Self::Mandatory),
            "optional" => Some(Self::Optional),
            _ => None,
        }
    }
}

impl fmt::Display for Optionality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mandatory => write!(f, "mandatory"),
            Self::Optional => write!(f, "optional"),
        }
    }
}

/// Whether a property or parameter must be supplied.
#[derive(Debug, Clone)]
pub struct MandatoryFacet {
    pub optionality: Optionality,
    pub precedence: Precedence,
    pub origin: String,
}

impl MandatoryFacet {
    pub fn new(optionality: Optionality, precedence: Precedence, origin: impl Into<String>) -> Self {
        Self {
            optionality,
            precedence,
            origin: origin.into(),
        }
    }

    pub fn is_mandatory(&self) -> bool {
        self.optionality == Optionality::Mandatory
    }
}

impl_facet!(
    MandatoryFacet,
    "mandatory",
    |this, other| this.optionality == other.optionality,
    |me| format!("{} (from {})", me.optionality, me.origin)
);

/// Friendly name shown to users.
#[derive(Debug, Clone)]
pub struct NamedFacet {
    pub name: String,
    pub precedence: Precedence,
    pub origin: String,
}

impl NamedFacet {
    pub fn new(name: impl Into<String>, precedence: Precedence, origin: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            precedence,
            origin: origin.into(),
        }
    }
}

impl_facet!(
    NamedFacet,
    "named",
    |this, other| this.name == other.name,
    |me| format!("'{}' (from {})", me.name, me.origin)
);

/// Externally visible identifier of a member.
#[derive(Debug, Clone)]
pub struct MemberIdFacet {
    pub id: String,
    pub precedence: Precedence,
    pub origin: String,
}

impl MemberIdFacet {
    pub fn new(id: impl Into<String>, precedence: Precedence, origin: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            precedence,
            origin: origin.into(),
        }
    }
}

impl_facet!(
    MemberIdFacet,
    "member_id",
    |this, other| this.id == other.id,
    |me| format!("'{}' (from {})", me.id, me.origin)
);

/// When a hidden or disabled facet applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Always,
    /// Decided at runtime by the named supporting method.
    Method(String),
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "always"),
            Self::Method(name) => write!(f, "via {name}()"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HiddenFacet {
    pub condition: Condition,
    pub precedence: Precedence,
    pub origin: String,
}

impl HiddenFacet {
    pub fn new(condition: Condition, precedence: Precedence, origin: impl Into<String>) -> Self {
        Self {
            condition,
            precedence,
            origin: origin.into(),
        }
    }
}

impl_facet!(
    HiddenFacet,
    "hidden",
    |this, other| this.condition == other.condition,
    |me| format!("hidden {} (from {})", me.condition, me.origin)
);

#[derive(Debug, Clone)]
pub struct DisabledFacet {
    pub condition: Condition,
    pub precedence: Precedence,
    pub origin: String,
}

impl DisabledFacet {
    pub fn new(condition: Condition, precedence: Precedence, origin: impl Into<String>) -> Self {
        Self {
            condition,
            precedence,
            origin: origin.into(),
        }
    }
}

impl_facet!(
    DisabledFacet,
    "disabled",
    |this, other| this.condition == other.condition,
    |me| format!("disabled {} (from {})", me.condition, me.origin)
);

/// Element type of a collection.
#[derive(Debug, Clone)]
pub struct ElementTypeFacet {
    pub element_type: TypeRef,
    pub precedence: Precedence,
    pub origin: String,
}

impl ElementTypeFacet {
    pub fn new(element_type: TypeRef, precedence: Precedence, origin: impl Into<String>) -> Self {
        Self {
            element_type,
            precedence,
            origin: origin.into(),
        }
    }
}

impl_facet!(
    ElementTypeFacet,
    "element_type",
    |this, other| this.element_type == other.element_type,
    |me| format!("{} (from {})", me.element_type, me.origin)
);

/// What a mixin member is contributed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Contributed {
    Action,
    Property,
    Collection,
}

impl fmt::Display for Contributed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action => write!(f, "action"),
            Self::Property => write!(f, "property"),
            Self::Collection => write!(f, "collection"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContributingFacet {
    pub contributed: Contributed,
    pub precedence: Precedence,
    pub origin: String,
}

impl ContributingFacet {
    pub fn new(contributed: Contributed, precedence: Precedence, origin: impl Into<String>) -> Self {
        Self {
            contributed,
            precedence,
            origin: origin.into(),
        }
    }
}

impl_facet!(
    ContributingFacet,
    "contributing",
    |this, other| this.contributed == other.contributed,
    |me| format!("{} (from {})", me.contributed, me.origin)
);

/// Marks an object spec as a mixin of `mixed_into`.
#[derive(Debug, Clone)]
pub struct MixinFacet {
    pub mixed_into: String,
    pub member: String,
    pub precedence: Precedence,
    pub origin: String,
}

impl MixinFacet {
    pub fn new(
        mixed_into: impl Into<String>,
        member: impl Into<String>,
        precedence: Precedence,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            mixed_into: mixed_into.into(),
            member: member.into(),
            precedence,
            origin: origin.into(),
        }
    }
}

impl_facet!(
    MixinFacet,
    "mixin",
    |this, other| this.mixed_into == other.mixed_into && this.member == other.member,
    |me| format!("mixin of {} as '{}' (from {})", me.mixed_into, me.member, me.origin)
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_origin_and_precedence() {
        let a = MandatoryFacet::new(Optionality::Optional, Precedence::Default, "marker");
        let b = MandatoryFacet::new(Optionality::Optional, Precedence::Inferred, "column");
        let c = MandatoryFacet::new(Optionality::Mandatory, Precedence::Default, "column");
        assert!(a.semantically_equals(&b));
        assert!(!a.semantically_equals(&c));
    }

    #[test]
    fn different_kinds_are_never_equal() {
        let named = NamedFacet::new("id", Precedence::Default, "marker");
        let member_id = MemberIdFacet::new("id", Precedence::Default, "marker");
        assert!(!named.semantically_equals(&member_id));
        assert_ne!(named.kind(), member_id.kind());
    }

    #[test]
    fn conditions_compare_by_supporting_method() {
        let always = HiddenFacet::new(Condition::Always, Precedence::Default, "marker");
        let method = HiddenFacet::new(Condition::Method("hideName".into()), Precedence::Default, "hideName");
        assert!(!always.semantically_equals(&method));
        assert_eq!(method.describe(), "hidden via hideName() (from hideName)");
    }

    #[test]
    fn optionality_parse() {
        assert_eq!(Optionality::parse("MANDATORY"), Some(Optionality::Mandatory));
        assert_eq!(Optionality::parse("optional"), Some(Optionality::Optional));
        assert_eq!(Optionality::parse("sometimes"), None);
    }

    #[test]
    fn downcast_through_trait_object() {
        let facet: Box<dyn Facet> = Box::new(ContributingFacet::new(
            Contributed::Property,
            Precedence::Default,
            "Property",
        ));
        let contributing = facet.as_ref().downcast_ref::<ContributingFacet>().unwrap();
        assert_eq!(contributing.contributed, Contributed::Property);
        assert!(facet.as_ref().downcast_ref::<MixinFacet>().is_none());
    }
}
