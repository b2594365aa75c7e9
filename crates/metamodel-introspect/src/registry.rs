//! The registry of declared types.
//!
//! This is the host-supplied data source the metamodel is built from. It is
//! synchronous and total except for lookups of undeclared names, which fail
//! with [`IntrospectError::TypeNotFound`].

use crate::decl::{MethodDecl, TypeDecl};
use crate::error::IntrospectError;
use crate::type_ref::{ROOT_TYPE, TypeRef};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::OnceLock;

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(?:\.[A-Za-z_$][A-Za-z0-9_$]*)*$")
            .expect("identifier regex must compile")
    })
}

/// Whether `name` is a non-empty, possibly dot-qualified identifier.
pub fn is_identifier(name: &str) -> bool {
    identifier_re().is_match(name)
}

/// On-disk form of a registry: a flat list of type declarations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(default)]
    pub types: Vec<TypeDecl>,
}

/// All declared types, keyed by name.
///
/// The root type is always present.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: BTreeMap<String, TypeDecl>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut types = BTreeMap::new();
        types.insert(ROOT_TYPE.to_string(), root_decl());
        Self { types }
    }

    pub fn from_document(document: RegistryDocument) -> Result<Self, IntrospectError> {
        let mut registry = Self::new();
        for decl in document.types {
            registry.insert(decl)?;
        }
        Ok(registry)
    }

    pub fn from_json_str(json: &str) -> Result<Self, IntrospectError> {
        let document: RegistryDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    /// Register a declaration. Names must be identifiers and unique.
    pub fn insert(&mut self, mut decl: TypeDecl) -> Result<(), IntrospectError> {
        if !is_identifier(&decl.name) {
            return Err(IntrospectError::InvalidIdentifier(decl.name));
        }
        let member_names = decl
            .methods
            .iter()
            .map(|m| m.name.as_str())
            .chain(decl.fields.iter().map(|f| f.name.as_str()));
        for name in member_names {
            if !is_identifier(name) {
                return Err(IntrospectError::InvalidIdentifier(format!(
                    "{}#{name}",
                    decl.name
                )));
            }
        }
        if self.types.contains_key(&decl.name) {
            return Err(IntrospectError::DuplicateType(decl.name));
        }
        decl.normalize();
        self.types.insert(decl.name.clone(), decl);
        Ok(())
    }

    /// Look up a type by name.
    pub fn get(&self, name: &str) -> Result<&TypeDecl, IntrospectError> {
        self.types
            .get(name)
            .ok_or_else(|| IntrospectError::TypeNotFound(name.to_string()))
    }

    pub fn find(&self, name: &str) -> Option<&TypeDecl> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All declarations in name order.
    pub fn types(&self) -> impl Iterator<Item = &TypeDecl> {
        self.types.values()
    }

    /// The definition of a marker kind, if declared as a marker type.
    pub fn marker_definition(&self, kind: &str) -> Option<&TypeDecl> {
        self.types.get(kind).filter(|decl| decl.is_marker())
    }

    /// Helper types lexically declared inside `declaring_type`.
    pub fn nested_types(&self, declaring_type: &str) -> Vec<&TypeDecl> {
        self.types
            .values()
            .filter(|decl| decl.declaring_type.as_deref() == Some(declaring_type))
            .collect()
    }

    /// Direct supertypes as written: superclass first, then contracts in
    /// declaration order.
    pub fn direct_supertypes<'a>(&self, decl: &'a TypeDecl) -> impl Iterator<Item = &'a TypeRef> {
        decl.superclass.iter().chain(decl.interfaces.iter())
    }

    /// Whether a value of type `from` may be passed where `to` is expected.
    ///
    /// Reflexive, transitive over declared supertypes, and every reference
    /// type is assignable to the root. Undeclared names are leaves.
    pub fn is_assignable(&self, from: &TypeRef, to: &TypeRef) -> bool {
        match (from, to) {
            (TypeRef::Array(from_elem), TypeRef::Array(to_elem)) => {
                if from_elem.is_primitive() || to_elem.is_primitive() {
                    from_elem.raw_name() == to_elem.raw_name()
                } else {
                    self.is_assignable(from_elem, to_elem)
                }
            }
            (_, TypeRef::Named { name, .. }) if name == ROOT_TYPE => {
                !from.is_primitive() && !from.is_void()
            }
            (TypeRef::Named { name: from, .. }, TypeRef::Named { name: to, .. }) => {
                self.is_subtype(from, to)
            }
            (TypeRef::Var(_), _) => self.is_assignable(&TypeRef::root(), to),
            _ => false,
        }
    }

    fn is_subtype(&self, from: &str, to: &str) -> bool {
        let mut queue = VecDeque::from([from.to_string()]);
        let mut seen = BTreeSet::new();
        while let Some(current) = queue.pop_front() {
            if current == to {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(decl) = self.types.get(&current) {
                queue.extend(
                    self.direct_supertypes(decl)
                        .filter_map(TypeRef::raw_name)
                        .map(str::to_string),
                );
            }
        }
        false
    }
}

fn root_decl() -> TypeDecl {
    TypeDecl::class(ROOT_TYPE)
        .with_method(MethodDecl::new("toString").returns(TypeRef::named("String")))
        .with_method(MethodDecl::new("hashCode").returns(TypeRef::named("int")))
        .with_method(
            MethodDecl::new("equals")
                .param(TypeRef::root())
                .returns(TypeRef::named("boolean")),
        )
        .with_method(MethodDecl::new("getClass").returns(TypeRef::named("Class")))
}
