//! Raw type and member declarations.
//!
//! These mirror what a domain type declares, before any convention is
//! applied. Generic information is kept as written; inherited members are
//! not copied into subtypes.

use crate::marker::Marker;
use crate::type_ref::TypeRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// What kind of type a declaration describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
    /// A marker definition. Markers attached to it are meta-markers.
    Marker,
}

/// A declared type parameter with its optional upper bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeParam {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound: Option<TypeRef>,
}

/// Method modifiers that influence member resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodFlags {
    /// Introduced to satisfy a generic contract with erased signature.
    #[serde(default)]
    pub bridge: bool,

    /// Introduced by the compiler, not by the author.
    #[serde(default)]
    pub synthetic: bool,

    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,

    #[serde(default, rename = "static")]
    pub is_static: bool,
}

impl MethodFlags {
    pub fn is_generated(&self) -> bool {
        self.bridge || self.synthetic
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type")]
    pub ty: TypeRef,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<Marker>,
}

impl ParamDecl {
    pub fn new(ty: TypeRef) -> Self {
        Self {
            name: None,
            ty,
            markers: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDecl {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_params: Vec<TypeParam>,

    #[serde(default)]
    pub params: Vec<ParamDecl>,

    #[serde(default = "TypeRef::void")]
    pub return_type: TypeRef,

    #[serde(flatten)]
    pub flags: MethodFlags,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<Marker>,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_params: Vec::new(),
            params: Vec::new(),
            return_type: TypeRef::void(),
            flags: MethodFlags::default(),
            markers: Vec::new(),
        }
    }

    pub fn param(self, ty: TypeRef) -> Self {
        self.param_with(ParamDecl::new(ty))
    }

    pub fn param_with(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.return_type = ty;
        self
    }

    pub fn type_param(mut self, name: impl Into<String>, bound: Option<TypeRef>) -> Self {
        self.type_params.push(TypeParam {
            name: name.into(),
            bound,
        });
        self
    }

    pub fn bridge(mut self) -> Self {
        self.flags.bridge = true;
        self
    }

    pub fn synthetic(mut self) -> Self {
        self.flags.synthetic = true;
        self
    }

    pub fn abstract_method(mut self) -> Self {
        self.flags.is_abstract = true;
        self
    }

    pub fn static_method(mut self) -> Self {
        self.flags.is_static = true;
        self
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn param_types(&self) -> impl Iterator<Item = &TypeRef> {
        self.params.iter().map(|p| &p.ty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: TypeRef,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<Marker>,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            markers: Vec::new(),
        }
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorDecl {
    #[serde(default)]
    pub params: Vec<ParamDecl>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<Marker>,
}

impl ConstructorDecl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, ty: TypeRef) -> Self {
        self.params.push(ParamDecl::new(ty));
        self
    }
}

/// A declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDecl {
    pub name: String,

    #[serde(default)]
    pub kind: TypeKind,

    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_params: Vec<TypeParam>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superclass: Option<TypeRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<TypeRef>,

    /// The type lexically enclosing this one, for nested helper types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaring_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<Marker>,

    /// Attribute defaults of a marker definition.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub defaults: BTreeMap<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDecl>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constructors: Vec<ConstructorDecl>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<MethodDecl>,
}

impl TypeDecl {
    fn with_kind(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            is_abstract: false,
            type_params: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            declaring_type: None,
            markers: Vec::new(),
            defaults: BTreeMap::new(),
            fields: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::with_kind(name, TypeKind::Class)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        let mut decl = Self::with_kind(name, TypeKind::Interface);
        decl.is_abstract = true;
        decl
    }

    pub fn marker_type(name: impl Into<String>) -> Self {
        Self::with_kind(name, TypeKind::Marker)
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn type_param(mut self, name: impl Into<String>, bound: Option<TypeRef>) -> Self {
        self.type_params.push(TypeParam {
            name: name.into(),
            bound,
        });
        self
    }

    pub fn extends(mut self, superclass: TypeRef) -> Self {
        self.superclass = Some(superclass);
        self
    }

    pub fn implements(mut self, contract: TypeRef) -> Self {
        self.interfaces.push(contract);
        self
    }

    pub fn declared_in(mut self, declaring_type: impl Into<String>) -> Self {
        self.declaring_type = Some(declaring_type.into());
        self
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn with_default(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(attribute.into(), value.into());
        self
    }

    pub fn with_field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_constructor(mut self, constructor: ConstructorDecl) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn with_method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_marker(&self) -> bool {
        self.kind == TypeKind::Marker
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn type_param_names(&self) -> BTreeSet<String> {
        self.type_params.iter().map(|p| p.name.clone()).collect()
    }

    /// Declared bounds of the type's own parameters.
    pub fn bounds(&self) -> BTreeMap<String, TypeRef> {
        collect_bounds(&self.type_params, BTreeMap::new())
    }

    /// Bounds visible inside `method`: method parameters shadow type parameters.
    pub fn method_bounds(&self, method: &MethodDecl) -> BTreeMap<String, TypeRef> {
        collect_bounds(&method.type_params, self.bounds())
    }

    /// Turn bare names that refer to declared type parameters into type
    /// variables, throughout the declaration.
    pub(crate) fn normalize(&mut self) {
        let scope = self.type_param_names();

        for param in &mut self.type_params {
            param.bound = param.bound.as_ref().map(|b| b.bind_vars(&scope));
        }
        self.superclass = self.superclass.as_ref().map(|s| s.bind_vars(&scope));
        for contract in &mut self.interfaces {
            *contract = contract.bind_vars(&scope);
        }
        for field in &mut self.fields {
            field.ty = field.ty.bind_vars(&scope);
        }
        for constructor in &mut self.constructors {
            for param in &mut constructor.params {
                param.ty = param.ty.bind_vars(&scope);
            }
        }
        for method in &mut self.methods {
            let mut method_scope = scope.clone();
            method_scope.extend(method.type_params.iter().map(|p| p.name.clone()));
            for param in &mut method.type_params {
                param.bound = param.bound.as_ref().map(|b| b.bind_vars(&method_scope));
            }
            for param in &mut method.params {
                param.ty = param.ty.bind_vars(&method_scope);
            }
            method.return_type = method.return_type.bind_vars(&method_scope);
        }
    }
}

fn collect_bounds(
    params: &[TypeParam],
    mut bounds: BTreeMap<String, TypeRef>,
) -> BTreeMap<String, TypeRef> {
    for param in params {
        match &param.bound {
            Some(bound) => {
                bounds.insert(param.name.clone(), bound.clone());
            }
            None => {
                bounds.remove(&param.name);
            }
        }
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_binds_type_and_method_vars() {
        let mut decl = TypeDecl::interface("Repository")
            .type_param("T", None)
            .with_method(
                MethodDecl::new("save")
                    .param(TypeRef::named("T"))
                    .returns(TypeRef::named("T")),
            )
            .with_method(
                MethodDecl::new("convert")
                    .type_param("R", None)
                    .param(TypeRef::named("R"))
                    .returns(TypeRef::generic("List", vec![TypeRef::named("R")])),
            );
        decl.normalize();

        assert_eq!(decl.methods[0].params[0].ty, TypeRef::var("T"));
        assert_eq!(decl.methods[0].return_type, TypeRef::var("T"));
        assert_eq!(decl.methods[1].params[0].ty, TypeRef::var("R"));
        assert_eq!(decl.methods[1].return_type.to_string(), "List<R>");
    }

    #[test]
    fn method_bounds_shadow_type_bounds() {
        let decl = TypeDecl::class("Box").type_param("T", Some(TypeRef::named("Number")));
        let shadowing = MethodDecl::new("map").type_param("T", None);
        assert_eq!(decl.bounds()["T"], TypeRef::named("Number"));
        assert!(decl.method_bounds(&shadowing).get("T").is_none());
    }

    #[test]
    fn method_json_defaults() {
        let method: MethodDecl =
            serde_json::from_str(r#"{"name":"save","params":[{"type":"String"}],"bridge":true}"#)
                .unwrap();
        assert!(method.return_type.is_void());
        assert!(method.flags.bridge);
        assert!(!method.flags.is_abstract);
        assert!(method.flags.is_generated());
    }
}
