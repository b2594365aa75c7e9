//! # Metamodel Kernel
//!
//! Builds and validates the runtime metamodel of a set of domain types: for
//! every type, the effective members it exposes and the facts (facets) that
//! conventions and declarative markers attach to them.
//!
//! This crate is **domain-agnostic**: it does not prescribe what domain
//! types mean. It only prescribes how their declared shape is resolved,
//! ranked, and checked for consistency.
//!
//! ## Architecture
//!
//! ```text
//! MemberCache          ← Effective members per type, deduplicated, generics-aware
//!     │
//! MarkerSynthesizer    ← Nearest-wins markers through meta-marker chains
//!     │
//! MetaModelBuilder     ← Conventions + facet factories → ObjectSpec graph
//!     │
//! FacetHolder          ← Facets ranked by precedence, per kind
//!     │
//! ValidationEngine     ← Pluggable validators → deduplicated failures
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod facet;
pub mod feature;
pub mod markers;
pub mod members;
pub mod spec;
pub mod validation;

pub use builder::factories::FacetFactory;
pub use builder::{Feature, MetaModelBuilder, ProcessContext};
pub use config::{MetamodelConfig, ModelConfig, ValidationConfig};
pub use error::MetamodelError;
pub use facet::{Facet, FacetHolder, FacetKind, FacetRanking, Precedence, TypedFacet};
pub use feature::{FeatureId, FeatureKind};
pub use markers::{AnnotatedElement, MarkerCandidate, MarkerInstance, MarkerSynthesizer};
pub use members::{MemberCache, ResolvedConstructor, ResolvedMember, TypeMembers};
pub use spec::{ActionSpec, AssociationSpec, MetaModel, ObjectSpec, ParameterSpec};
pub use validation::{
    ValidationEngine, ValidationFailure, ValidationFailures, ValidationReport, ValidatorDescriptor,
};
