//! Generic type expressions.
//!
//! A `TypeRef` is a type as written in a declaration: a raw name with
//! optional type arguments, a type variable, or an array. Declarations keep
//! the generic form; matching and identity use the erased form.
//!
//! Text syntax: `Name`, `Name<A, B>`, `Elem[]`. Whether a bare name denotes a
//! type variable is decided by the declaration that mentions it, see
//! [`TypeRef::bind_vars`].

use crate::error::IntrospectError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The universal root type. Every type is assignable to it and members it
/// declares are never modelled.
pub const ROOT_TYPE: &str = "Object";

/// Return type of operations that produce nothing.
pub const VOID: &str = "void";

const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "short", "int", "long", "float", "double", "char",
];

/// Bounds referring to bounds deeper than this are treated as unbounded.
const MAX_BOUND_DEPTH: usize = 16;

/// Whether `name` is a primitive value type (never null).
pub fn is_primitive(name: &str) -> bool {
    PRIMITIVES.contains(&name)
}

/// A generic type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    /// A named type, possibly parameterized.
    Named { name: String, args: Vec<TypeRef> },

    /// A type variable declared by the enclosing type or method.
    Var(String),

    /// An array of the element type.
    Array(Box<TypeRef>),
}

impl TypeRef {
    /// A raw named type without arguments.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// A parameterized type.
    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self::Named {
            name: name.into(),
            args,
        }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    pub fn array(elem: TypeRef) -> Self {
        Self::Array(Box::new(elem))
    }

    pub fn void() -> Self {
        Self::named(VOID)
    }

    pub fn root() -> Self {
        Self::named(ROOT_TYPE)
    }

    /// Parse a type expression.
    pub fn parse(input: &str) -> Result<Self, IntrospectError> {
        let mut parser = Parser {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        };
        let parsed = parser.parse_type()?;
        parser.skip_ws();
        if parser.pos != parser.bytes.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(parsed)
    }

    /// The raw name of a named type.
    pub fn raw_name(&self) -> Option<&str> {
        match self {
            Self::Named { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Type arguments of a parameterized type (empty otherwise).
    pub fn type_args(&self) -> &[TypeRef] {
        match self {
            Self::Named { args, .. } => args,
            _ => &[],
        }
    }

    pub fn is_void(&self) -> bool {
        self.raw_name() == Some(VOID)
    }

    pub fn is_primitive(&self) -> bool {
        self.raw_name().is_some_and(is_primitive)
    }

    /// Whether any type variable occurs in this expression.
    pub fn mentions_vars(&self) -> bool {
        match self {
            Self::Var(_) => true,
            Self::Array(elem) => elem.mentions_vars(),
            Self::Named { args, .. } => args.iter().any(TypeRef::mentions_vars),
        }
    }

    /// The erased form: variables become their bound (or the root type),
    /// parameterized types lose their arguments.
    pub fn erasure(&self, bounds: &BTreeMap<String, TypeRef>) -> TypeRef {
        self.erase_with(bounds, 0)
    }

    fn erase_with(&self, bounds: &BTreeMap<String, TypeRef>, depth: usize) -> TypeRef {
        match self {
            Self::Named { name, .. } => Self::named(name.clone()),
            Self::Array(elem) => Self::array(elem.erase_with(bounds, depth)),
            Self::Var(var) => match bounds.get(var) {
                Some(bound) if depth < MAX_BOUND_DEPTH => bound.erase_with(bounds, depth + 1),
                _ => Self::root(),
            },
        }
    }

    /// Replace type variables by their bindings. Unbound variables are kept.
    pub fn substitute(&self, bindings: &BTreeMap<String, TypeRef>) -> TypeRef {
        match self {
            Self::Var(var) => bindings.get(var).cloned().unwrap_or_else(|| self.clone()),
            Self::Array(elem) => Self::array(elem.substitute(bindings)),
            Self::Named { name, args } => Self::Named {
                name: name.clone(),
                args: args.iter().map(|arg| arg.substitute(bindings)).collect(),
            },
        }
    }

    /// Reinterpret bare names that match a type parameter in scope as
    /// type variables.
    pub fn bind_vars(&self, params: &BTreeSet<String>) -> TypeRef {
        match self {
            Self::Named { name, args } if args.is_empty() && params.contains(name) => {
                Self::Var(name.clone())
            }
            Self::Named { name, args } => Self::Named {
                name: name.clone(),
                args: args.iter().map(|arg| arg.bind_vars(params)).collect(),
            },
            Self::Array(elem) => Self::array(elem.bind_vars(params)),
            Self::Var(_) => self.clone(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(var) => write!(f, "{var}"),
            Self::Array(elem) => write!(f, "{elem}[]"),
            Self::Named { name, args } if args.is_empty() => write!(f, "{name}"),
            Self::Named { name, args } => {
                write!(f, "{name}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
        }
    }
}

impl std::str::FromStr for TypeRef {
    type Err = IntrospectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TypeRef {
    type Error = IntrospectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn parse_type(&mut self) -> Result<TypeRef, IntrospectError> {
        self.skip_ws();
        let name = self.ident()?;
        self.skip_ws();

        let mut args = Vec::new();
        if self.eat(b'<') {
            loop {
                args.push(self.parse_type()?);
                self.skip_ws();
                if self.eat(b',') {
                    continue;
                }
                if self.eat(b'>') {
                    break;
                }
                return Err(self.error("expected `,` or `>`"));
            }
            if args.is_empty() {
                return Err(self.error("empty type argument list"));
            }
        }

        let mut parsed = TypeRef::Named { name, args };
        loop {
            self.skip_ws();
            if self.eat(b'[') {
                self.skip_ws();
                if !self.eat(b']') {
                    return Err(self.error("expected `]`"));
                }
                parsed = TypeRef::array(parsed);
            } else {
                return Ok(parsed);
            }
        }
    }

    fn ident(&mut self) -> Result<String, IntrospectError> {
        let start = self.pos;
        while let Some(&b) = self.bytes.get(self.pos) {
            let allowed = if self.pos == start {
                b.is_ascii_alphabetic() || b == b'_' || b == b'$'
            } else {
                b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'.'
            };
            if !allowed {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected a type name"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.bytes.get(self.pos) == Some(&expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.bytes.get(self.pos).is_some_and(u8::is_ascii_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, reason: &str) -> IntrospectError {
        IntrospectError::MalformedTypeRef {
            input: self.input.to_string(),
            reason: format!("{reason} at offset {}", self.pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TypeRef {
        TypeRef::parse(s).unwrap()
    }

    #[test]
    fn parse_and_display() {
        for src in ["String", "List<String>", "Map<String, List<Order>>", "int[]", "List<T>[][]"] {
            assert_eq!(t(src).to_string(), src);
        }
        assert_eq!(t(" Map < K ,V > ").to_string(), "Map<K, V>");
    }

    #[test]
    fn parse_rejects_malformed() {
        for src in ["", "List<", "List<>", "Map<String,>", "int[", "List<String> x", "9abc"] {
            assert!(TypeRef::parse(src).is_err(), "expected error for `{src}`");
        }
    }

    #[test]
    fn bind_vars_only_touches_bare_names_in_scope() {
        let params: BTreeSet<String> = ["T".to_string()].into_iter().collect();
        let bound = t("Map<T, List<T>>").bind_vars(&params);
        assert_eq!(
            bound,
            TypeRef::generic(
                "Map",
                vec![
                    TypeRef::var("T"),
                    TypeRef::generic("List", vec![TypeRef::var("T")])
                ]
            )
        );
        assert_eq!(t("U").bind_vars(&params), TypeRef::named("U"));
    }

    #[test]
    fn erasure_uses_bounds_and_drops_arguments() {
        let mut bounds = BTreeMap::new();
        bounds.insert("E".to_string(), TypeRef::generic("Comparable", vec![TypeRef::var("E")]));

        assert_eq!(TypeRef::var("T").erasure(&bounds), TypeRef::root());
        assert_eq!(TypeRef::var("E").erasure(&bounds), TypeRef::named("Comparable"));
        assert_eq!(t("List<String>").erasure(&bounds), TypeRef::named("List"));
        assert_eq!(
            TypeRef::array(TypeRef::var("E")).erasure(&bounds),
            TypeRef::array(TypeRef::named("Comparable"))
        );
    }

    #[test]
    fn self_referential_bound_terminates() {
        let mut bounds = BTreeMap::new();
        bounds.insert("T".to_string(), TypeRef::var("T"));
        assert_eq!(TypeRef::var("T").erasure(&bounds), TypeRef::root());
    }

    #[test]
    fn substitute_replaces_bound_vars() {
        let mut bindings = BTreeMap::new();
        bindings.insert("T".to_string(), TypeRef::named("String"));
        let ty = TypeRef::generic("List", vec![TypeRef::var("T"), TypeRef::var("U")]);
        assert_eq!(ty.substitute(&bindings).to_string(), "List<String, U>");
        assert!(ty.substitute(&bindings).mentions_vars());
    }

    #[test]
    fn serde_uses_display_form() {
        let json = serde_json::to_string(&t("List<Order>")).unwrap();
        assert_eq!(json, "\"List<Order>\"");
        let back: TypeRef = serde_json::from_str("\"Order[]\"").unwrap();
        assert_eq!(back, TypeRef::array(TypeRef::named("Order")));
        assert!(serde_json::from_str::<TypeRef>("\"List<\"").is_err());
    }
}
