//! # Metamodel Introspect
//!
//! Raw introspection primitives supplied by the host environment: the shape
//! of domain types as plain data. Nothing here interprets conventions or
//! builds facets; it only describes what is declared.
//!
//! ## Architecture
//!
//! ```text
//! TypeRef          ← Generic type expressions (Name<A, B>, T, E[])
//!     │
//! Marker           ← Declarative attachments (kind + attribute map)
//!     │
//! TypeDecl         ← Declared supertypes, fields, constructors, methods
//!     │
//! TypeRegistry     ← Lookup by name, supertype walk, assignability
//! ```

pub mod decl;
pub mod error;
pub mod marker;
pub mod registry;
pub mod type_ref;

pub use decl::{
    ConstructorDecl, FieldDecl, MethodDecl, MethodFlags, ParamDecl, TypeDecl, TypeKind, TypeParam,
};
pub use error::IntrospectError;
pub use marker::Marker;
pub use registry::{RegistryDocument, TypeRegistry, is_identifier};
pub use type_ref::{ROOT_TYPE, TypeRef, VOID, is_primitive};
