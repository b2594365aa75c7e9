//! Member resolution and the member cache.
//!
//! For a type, the effective operations are collected from the type and all
//! of its supertypes, grouped by (name, erased parameter types) as seen from
//! the resolved type, and reduced to one canonical member per group:
//!
//! 1. Authored declarations beat bridge/synthetic ones.
//! 2. Class declarations beat contract (interface) declarations.
//! 3. Nearer declarations beat farther ones; walk order breaks ties.
//!
//! Generic parameter and return types are taken from the first declaration
//! in the group that mentions type variables, specialized with the type
//! arguments the resolved type supplies. Groups made only of generated
//! variants are dropped when an authored member with the same name and
//! arity accepts narrower parameters, since they are erased copies of it.
//!
//! Members declared by the root type are never resolved.

use crate::error::MetamodelError;
use metamodel_introspect::{
    ConstructorDecl, MethodDecl, MethodFlags, ROOT_TYPE, TypeDecl, TypeRef, TypeRegistry,
};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// The canonical representation of an invocable operation of a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMember {
    /// The type declaring the kept representative.
    pub declaring_type: String,
    pub name: String,
    /// Erased parameter types, as seen from the resolved type.
    pub parameter_types: Vec<TypeRef>,
    pub generic_parameter_types: Vec<TypeRef>,
    pub return_type: TypeRef,
    pub generic_return_type: TypeRef,
    pub flags: MethodFlags,

    /// The representative first, then every overridden authored
    /// declaration nearest-first, then generated variants.
    #[serde(skip)]
    pub(crate) declarations: Vec<MethodDecl>,
}

impl ResolvedMember {
    pub fn is_bridge(&self) -> bool {
        self.flags.bridge
    }

    pub fn is_synthetic(&self) -> bool {
        self.flags.synthetic
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.is_abstract
    }

    pub fn is_static(&self) -> bool {
        self.flags.is_static
    }

    /// The kept representative declaration.
    pub fn declaration(&self) -> Option<&MethodDecl> {
        self.declarations.first()
    }

    /// The representative first, then the declarations it overrides.
    pub fn declarations(&self) -> &[MethodDecl] {
        &self.declarations
    }

    pub fn param_count(&self) -> usize {
        self.parameter_types.len()
    }

    /// `name(T1, T2)` with erased parameter types.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, join_types(&self.parameter_types))
    }
}

impl fmt::Display for ResolvedMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.declaring_type, self.signature())
    }
}

/// A constructor of a type. Constructors are never inherited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConstructor {
    pub declaring_type: String,
    pub parameter_types: Vec<TypeRef>,
    pub generic_parameter_types: Vec<TypeRef>,

    #[serde(skip)]
    pub declaration: ConstructorDecl,
}

/// The resolved member set of one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMembers {
    pub type_name: String,
    methods: Vec<Arc<ResolvedMember>>,
    constructors: Vec<Arc<ResolvedConstructor>>,
    nested: Vec<String>,
}

impl TypeMembers {
    /// Members ordered by name, then erased parameter types.
    pub fn methods(&self) -> &[Arc<ResolvedMember>] {
        &self.methods
    }

    pub fn constructors(&self) -> &[Arc<ResolvedConstructor>] {
        &self.constructors
    }

    /// Helper types declared inside this type.
    pub fn nested(&self) -> &[String] {
        &self.nested
    }

    /// All overloads named `name`.
    pub fn find(&self, name: &str) -> impl Iterator<Item = &Arc<ResolvedMember>> {
        self.methods.iter().filter(move |m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Lazily computed, shared map from type name to resolved members.
///
/// Computation runs outside the lock; only publication is exclusive and the
/// first published result for a type is the one every caller observes.
#[derive(Debug)]
pub struct MemberCache {
    registry: Arc<TypeRegistry>,
    entries: RwLock<HashMap<String, Arc<TypeMembers>>>,
}

impl MemberCache {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Resolve, or fetch the memoized, member set of `type_name`.
    pub fn resolve_members(&self, type_name: &str) -> Result<Arc<TypeMembers>, MetamodelError> {
        if type_name.is_empty() {
            return Err(MetamodelError::invalid_argument("type name must not be empty"));
        }
        if let Some(hit) = self.entries.read().get(type_name) {
            return Ok(Arc::clone(hit));
        }

        let computed = Arc::new(resolve(&self.registry, type_name)?);

        let published = Arc::clone(
            self.entries
                .write()
                .entry(type_name.to_string())
                .or_insert_with(|| Arc::clone(&computed)),
        );
        debug!(
            type_name,
            members = published.len(),
            won_race = Arc::ptr_eq(&published, &computed),
            "member cache entry published"
        );
        Ok(published)
    }

    /// Find the member `name` accepting `param_types`.
    ///
    /// An exact erased-signature match wins; otherwise exactly one member
    /// whose parameters accept the requested types must exist.
    pub fn lookup(
        &self,
        type_name: &str,
        name: &str,
        param_types: &[TypeRef],
    ) -> Result<Arc<ResolvedMember>, MetamodelError> {
        if name.is_empty() {
            return Err(MetamodelError::invalid_argument("member name must not be empty"));
        }
        let members = self.resolve_members(type_name)?;
        let requested = erase_request(param_types);

        if let Some(exact) = members.find(name).find(|m| m.parameter_types == requested) {
            return Ok(Arc::clone(exact));
        }

        let compatible: Vec<&Arc<ResolvedMember>> = members
            .find(name)
            .filter(|m| self.accepts(&m.parameter_types, &requested))
            .collect();
        match compatible.as_slice() {
            [single] => Ok(Arc::clone(*single)),
            _ => Err(MetamodelError::NotFound {
                type_name: type_name.to_string(),
                name: name.to_string(),
                params: join_types(&requested),
                candidates: compatible.len(),
            }),
        }
    }

    /// Find the constructor accepting `param_types`, by the same rule as
    /// [`MemberCache::lookup`].
    pub fn lookup_constructor(
        &self,
        type_name: &str,
        param_types: &[TypeRef],
    ) -> Result<Arc<ResolvedConstructor>, MetamodelError> {
        let members = self.resolve_members(type_name)?;
        let requested = erase_request(param_types);

        if let Some(exact) = members
            .constructors()
            .iter()
            .find(|c| c.parameter_types == requested)
        {
            return Ok(Arc::clone(exact));
        }

        let compatible: Vec<&Arc<ResolvedConstructor>> = members
            .constructors()
            .iter()
            .filter(|c| self.accepts(&c.parameter_types, &requested))
            .collect();
        match compatible.as_slice() {
            [single] => Ok(Arc::clone(*single)),
            _ => Err(MetamodelError::NotFound {
                type_name: type_name.to_string(),
                name: "<init>".to_string(),
                params: join_types(&requested),
                candidates: compatible.len(),
            }),
        }
    }

    /// Drop every memoized entry. Meant for isolating independent builds
    /// within one process.
    pub fn invalidate_all(&self) {
        let mut entries = self.entries.write();
        debug!(dropped = entries.len(), "member cache invalidated");
        entries.clear();
    }

    pub fn is_cached(&self, type_name: &str) -> bool {
        self.entries.read().contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn accepts(&self, declared: &[TypeRef], requested: &[TypeRef]) -> bool {
        declared.len() == requested.len()
            && requested
                .iter()
                .zip(declared)
                .all(|(req, decl)| self.registry.is_assignable(req, decl))
    }
}

fn erase_request(param_types: &[TypeRef]) -> Vec<TypeRef> {
    let no_bounds = BTreeMap::new();
    param_types.iter().map(|t| t.erasure(&no_bounds)).collect()
}

fn join_types(types: &[TypeRef]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A type in the supertype walk, with its type variables expressed in
/// terms of the resolved type.
struct Declaration<'r> {
    owner: &'r TypeDecl,
    bindings: BTreeMap<String, TypeRef>,
    depth: usize,
}

struct Candidate<'r> {
    owner: &'r TypeDecl,
    method: &'r MethodDecl,
    depth: usize,
    order: usize,
    generic_params: Vec<TypeRef>,
    generic_return: TypeRef,
    params: Vec<TypeRef>,
    return_type: TypeRef,
}

impl Candidate<'_> {
    fn rank(&self) -> (bool, bool, usize, usize) {
        (
            self.method.flags.is_generated(),
            self.owner.is_interface(),
            self.depth,
            self.order,
        )
    }

    fn carries_generics(&self) -> bool {
        self.method.param_types().any(TypeRef::mentions_vars)
            || self.method.return_type.mentions_vars()
    }
}

type GroupKey = (String, Vec<TypeRef>);

fn resolve(registry: &TypeRegistry, type_name: &str) -> Result<TypeMembers, MetamodelError> {
    let target = registry.get(type_name)?;
    let hierarchy = hierarchy(registry, target);

    let mut groups: BTreeMap<GroupKey, Vec<Candidate<'_>>> = BTreeMap::new();
    let mut order = 0;
    for decl in &hierarchy {
        if decl.owner.name == ROOT_TYPE {
            continue;
        }
        for method in &decl.owner.methods {
            if method.flags.is_static && decl.depth > 0 {
                continue;
            }
            let candidate = candidate(target, decl, method, order);
            order += 1;
            groups
                .entry((method.name.clone(), candidate.params.clone()))
                .or_default()
                .push(candidate);
        }
    }
    for group in groups.values_mut() {
        group.sort_by_key(Candidate::rank);
    }

    let mut methods = Vec::with_capacity(groups.len());
    for (key, group) in &groups {
        let representative = &group[0];
        if representative.method.flags.is_generated() && is_erased_copy(registry, key, &groups) {
            trace!(
                type_name,
                member = %key.0,
                "dropping generated variant covered by an authored member"
            );
            continue;
        }
        methods.push(Arc::new(canonical_member(group)));
    }

    let constructors = target
        .constructors
        .iter()
        .map(|constructor| {
            let bounds = target.bounds();
            let generic: Vec<TypeRef> = constructor.params.iter().map(|p| p.ty.clone()).collect();
            Arc::new(ResolvedConstructor {
                declaring_type: target.name.clone(),
                parameter_types: generic.iter().map(|t| t.erasure(&bounds)).collect(),
                generic_parameter_types: generic,
                declaration: constructor.clone(),
            })
        })
        .collect();

    let nested = registry
        .nested_types(type_name)
        .into_iter()
        .map(|decl| decl.name.clone())
        .collect();

    debug!(
        type_name,
        supertypes = hierarchy.len() - 1,
        members = methods.len(),
        "resolved members"
    );
    Ok(TypeMembers {
        type_name: type_name.to_string(),
        methods,
        constructors,
        nested,
    })
}

/// Breadth-first supertype walk starting at `target`; each type is visited
/// once, at its nearest position.
fn hierarchy<'r>(registry: &'r TypeRegistry, target: &'r TypeDecl) -> Vec<Declaration<'r>> {
    let mut walk = Vec::new();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut queue = VecDeque::from([Declaration {
        owner: target,
        bindings: BTreeMap::new(),
        depth: 0,
    }]);

    while let Some(decl) = queue.pop_front() {
        if !seen.insert(decl.owner.name.as_str()) {
            continue;
        }
        for reference in registry.direct_supertypes(decl.owner) {
            let Some(super_decl) = reference.raw_name().and_then(|name| registry.find(name)) else {
                continue;
            };
            queue.push_back(Declaration {
                owner: super_decl,
                bindings: supertype_bindings(super_decl, reference, &decl.bindings),
                depth: decl.depth + 1,
            });
        }
        walk.push(decl);
    }
    walk
}

/// Map the supertype's parameters to the arguments supplied by `reference`.
/// A raw reference binds each parameter to its erased bound.
fn supertype_bindings(
    super_decl: &TypeDecl,
    reference: &TypeRef,
    current: &BTreeMap<String, TypeRef>,
) -> BTreeMap<String, TypeRef> {
    let args = reference.type_args();
    if args.is_empty() {
        let bounds = super_decl.bounds();
        return super_decl
            .type_params
            .iter()
            .map(|p| (p.name.clone(), TypeRef::var(&p.name).erasure(&bounds)))
            .collect();
    }
    super_decl
        .type_params
        .iter()
        .zip(args)
        .map(|(p, arg)| (p.name.clone(), arg.substitute(current)))
        .collect()
}

fn candidate<'r>(
    target: &TypeDecl,
    decl: &Declaration<'r>,
    method: &'r MethodDecl,
    order: usize,
) -> Candidate<'r> {
    let mut bindings = decl.bindings.clone();
    let mut bounds = target.bounds();
    for param in &method.type_params {
        bindings.remove(&param.name);
    }
    for param in &method.type_params {
        match &param.bound {
            Some(bound) => {
                bounds.insert(param.name.clone(), bound.substitute(&bindings));
            }
            None => {
                bounds.remove(&param.name);
            }
        }
    }

    let generic_params: Vec<TypeRef> = method
        .param_types()
        .map(|t| t.substitute(&bindings))
        .collect();
    let generic_return = method.return_type.substitute(&bindings);
    Candidate {
        owner: decl.owner,
        method,
        depth: decl.depth,
        order,
        params: generic_params.iter().map(|t| t.erasure(&bounds)).collect(),
        return_type: generic_return.erasure(&bounds),
        generic_params,
        generic_return,
    }
}

/// Whether a group of generated variants is an erased copy of an authored
/// member with the same name and arity but narrower parameter types.
fn is_erased_copy(
    registry: &TypeRegistry,
    key: &GroupKey,
    groups: &BTreeMap<GroupKey, Vec<Candidate<'_>>>,
) -> bool {
    groups.iter().any(|(other_key, other)| {
        other_key != key
            && other_key.0 == key.0
            && other_key.1.len() == key.1.len()
            && !other[0].method.flags.is_generated()
            && other_key
                .1
                .iter()
                .zip(&key.1)
                .all(|(narrow, wide)| registry.is_assignable(narrow, wide))
    })
}

fn canonical_member(group: &[Candidate<'_>]) -> ResolvedMember {
    let representative = &group[0];
    let generic_source = group
        .iter()
        .find(|c| c.carries_generics())
        .unwrap_or(representative);

    ResolvedMember {
        declaring_type: representative.owner.name.clone(),
        name: representative.method.name.clone(),
        parameter_types: representative.params.clone(),
        generic_parameter_types: generic_source.generic_params.clone(),
        return_type: representative.return_type.clone(),
        generic_return_type: generic_source.generic_return.clone(),
        flags: representative.method.flags,
        declarations: group.iter().map(|c| c.method.clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metamodel_introspect::MethodDecl;

    fn t(s: &str) -> TypeRef {
        TypeRef::parse(s).unwrap()
    }

    fn cache(types: Vec<TypeDecl>) -> MemberCache {
        let mut registry = TypeRegistry::new();
        for decl in types {
            registry.insert(decl).unwrap();
        }
        MemberCache::new(Arc::new(registry))
    }

    fn names(members: &TypeMembers) -> Vec<String> {
        members.methods().iter().map(|m| m.signature()).collect()
    }

    fn repository_types() -> Vec<TypeDecl> {
        vec![
            TypeDecl::interface("Repository")
                .type_param("T", None)
                .with_method(
                    MethodDecl::new("save")
                        .param(t("T"))
                        .returns(t("T"))
                        .abstract_method(),
                )
                .with_method(
                    MethodDecl::new("findAll")
                        .returns(t("List<T>"))
                        .abstract_method(),
                ),
            TypeDecl::class("StringRepository")
                .implements(t("Repository<String>"))
                .with_method(MethodDecl::new("save").param(t("String")).returns(t("String")))
                .with_method(MethodDecl::new("save").param(t("Object")).returns(t("Object")).bridge())
                .with_method(MethodDecl::new("findAll").returns(t("List")))
                .with_method(MethodDecl::new("findAll").returns(t("List")).synthetic()),
        ]
    }

    #[test]
    fn override_yields_single_member() {
        let cache = cache(vec![
            TypeDecl::class("Base").with_method(MethodDecl::new("approve").returns(t("boolean"))),
            TypeDecl::class("Derived")
                .extends(t("Base"))
                .with_method(MethodDecl::new("approve").returns(t("boolean"))),
        ]);
        let members = cache.resolve_members("Derived").unwrap();
        assert_eq!(names(&members), vec!["approve()"]);
        assert_eq!(members.methods()[0].declaring_type, "Derived");
        assert_eq!(members.methods()[0].declarations().len(), 2);
        assert_eq!(
            members.methods()[0].declaration().map(|decl| decl.name.as_str()),
            Some("approve")
        );
    }

    #[test]
    fn member_without_declarations_has_no_representative() {
        let member = ResolvedMember {
            declaring_type: "Customer".into(),
            name: "approve".into(),
            parameter_types: Vec::new(),
            generic_parameter_types: Vec::new(),
            return_type: t("boolean"),
            generic_return_type: t("boolean"),
            flags: MethodFlags::default(),
            declarations: Vec::new(),
        };
        assert!(member.declaration().is_none());
        assert!(member.declarations().is_empty());
    }

    #[test]
    fn bridge_and_synthetic_duplicates_are_dropped() {
        let cache = cache(repository_types());
        let members = cache.resolve_members("StringRepository").unwrap();
        assert_eq!(names(&members), vec!["findAll()", "save(String)"]);
        for member in members.methods() {
            assert_eq!(member.declaring_type, "StringRepository");
            assert!(!member.is_bridge());
            assert!(!member.is_synthetic());
        }
    }

    #[test]
    fn generic_types_come_from_the_generic_declaration() {
        let cache = cache(repository_types());
        let find_all = cache.lookup("StringRepository", "findAll", &[]).unwrap();
        assert_eq!(find_all.return_type, t("List"));
        assert_eq!(find_all.generic_return_type, t("List<String>"));

        let save = cache.lookup("StringRepository", "save", &[t("String")]).unwrap();
        assert_eq!(save.generic_parameter_types, vec![t("String")]);
        assert_eq!(save.generic_return_type, t("String"));
    }

    #[test]
    fn generic_superclass_chain_is_specialized() {
        let cache = cache(vec![
            TypeDecl::class("AbstractRepository")
                .abstract_class()
                .type_param("E", None)
                .with_method(MethodDecl::new("first").returns(t("E")))
                .with_method(MethodDecl::new("byKey").param(t("Map<String, E>")).returns(t("E[]"))),
            TypeDecl::class("CustomerRepository").extends(t("AbstractRepository<Customer>")),
        ]);
        let members = cache.resolve_members("CustomerRepository").unwrap();
        let first = members.find("first").next().unwrap();
        assert_eq!(first.generic_return_type, t("Customer"));
        assert_eq!(first.return_type, t("Customer"));
        assert_eq!(first.declaring_type, "AbstractRepository");

        let by_key = members.find("byKey").next().unwrap();
        assert_eq!(by_key.parameter_types, vec![t("Map")]);
        assert_eq!(by_key.generic_parameter_types, vec![t("Map<String, Customer>")]);
        assert_eq!(by_key.generic_return_type, t("Customer[]"));
    }

    #[test]
    fn generated_only_contract_keeps_one_tagged_representative() {
        let cache = cache(vec![
            TypeDecl::interface("Tagged")
                .with_method(MethodDecl::new("tag").returns(t("String")).synthetic()),
            TypeDecl::class("Label")
                .implements(t("Tagged"))
                .with_method(MethodDecl::new("tag").returns(t("String")).synthetic()),
        ]);
        let members = cache.resolve_members("Label").unwrap();
        assert_eq!(names(&members), vec!["tag()"]);
        assert!(members.methods()[0].is_synthetic());
        assert_eq!(members.methods()[0].declaring_type, "Label");
    }

    #[test]
    fn class_declaration_wins_over_contract() {
        let cache = cache(vec![
            TypeDecl::interface("Approvable")
                .with_method(MethodDecl::new("approve").abstract_method()),
            TypeDecl::class("Base").with_method(MethodDecl::new("approve")),
            TypeDecl::class("Derived")
                .extends(t("Base"))
                .implements(t("Approvable")),
        ]);
        let approve = cache.lookup("Derived", "approve", &[]).unwrap();
        assert_eq!(approve.declaring_type, "Base");
        assert!(!approve.is_abstract());
    }

    #[test]
    fn root_members_and_inherited_statics_are_excluded() {
        let cache = cache(vec![
            TypeDecl::class("Base")
                .extends(TypeRef::root())
                .with_method(MethodDecl::new("create").static_method())
                .with_method(MethodDecl::new("toString").returns(t("String"))),
            TypeDecl::class("Derived").extends(t("Base")),
        ]);
        assert_eq!(names(&cache.resolve_members("Base").unwrap()), vec!["create()", "toString()"]);
        let derived = cache.resolve_members("Derived").unwrap();
        assert_eq!(names(&derived), vec!["toString()"]);
        assert_eq!(derived.methods()[0].declaring_type, "Base");
    }

    #[test]
    fn lookup_exact_compatible_and_ambiguous() {
        let cache = cache(vec![
            TypeDecl::class("Party"),
            TypeDecl::class("Customer").extends(t("Party")),
            TypeDecl::interface("Contactable"),
            TypeDecl::class("Person")
                .extends(t("Party"))
                .implements(t("Contactable")),
            TypeDecl::class("Desk")
                .with_method(MethodDecl::new("assign").param(t("Party")))
                .with_method(MethodDecl::new("assign").param(t("Contactable")))
                .with_method(MethodDecl::new("notify").param(t("Party"))),
        ]);

        let exact = cache.lookup("Desk", "assign", &[t("Party")]).unwrap();
        assert_eq!(exact.parameter_types, vec![t("Party")]);

        let compatible = cache.lookup("Desk", "notify", &[t("Customer")]).unwrap();
        assert_eq!(compatible.parameter_types, vec![t("Party")]);

        // Person is both a Party and Contactable: two compatible overloads.
        let ambiguous = cache.lookup("Desk", "assign", &[t("Person")]).unwrap_err();
        assert!(matches!(ambiguous, MetamodelError::NotFound { candidates: 2, .. }));
    }

    #[test]
    fn lookup_zero_matches_and_incompatible_request() {
        let cache = cache(vec![
            TypeDecl::class("Desk").with_method(MethodDecl::new("assign").param(t("String"))),
        ]);
        let missing = cache.lookup("Desk", "unassign", &[]).unwrap_err();
        assert!(matches!(missing, MetamodelError::NotFound { candidates: 0, .. }));

        let incompatible = cache.lookup("Desk", "assign", &[t("int")]).unwrap_err();
        assert!(matches!(incompatible, MetamodelError::NotFound { candidates: 0, .. }));

        let wrong_arity = cache.lookup("Desk", "assign", &[t("String"), t("String")]).unwrap_err();
        assert!(matches!(wrong_arity, MetamodelError::NotFound { .. }));
    }

    #[test]
    fn malformed_requests_are_rejected() {
        let cache = cache(vec![TypeDecl::class("Desk")]);
        assert!(matches!(
            cache.lookup("Desk", "", &[]),
            Err(MetamodelError::InvalidArgument(_))
        ));
        assert!(matches!(
            cache.resolve_members(""),
            Err(MetamodelError::InvalidArgument(_))
        ));
        assert!(matches!(
            cache.resolve_members("Nowhere"),
            Err(MetamodelError::Introspect(_))
        ));
    }

    #[test]
    fn constructors_are_resolved_and_looked_up() {
        let cache = cache(vec![
            TypeDecl::class("Party"),
            TypeDecl::class("Customer").extends(t("Party")),
            TypeDecl::class("Order")
                .with_constructor(ConstructorDecl::new())
                .with_constructor(ConstructorDecl::new().param(t("Party"))),
            TypeDecl::class("RushOrder").extends(t("Order")),
        ]);
        assert_eq!(cache.resolve_members("Order").unwrap().constructors().len(), 2);
        assert!(cache.resolve_members("RushOrder").unwrap().constructors().is_empty());

        let ctor = cache.lookup_constructor("Order", &[t("Customer")]).unwrap();
        assert_eq!(ctor.parameter_types, vec![t("Party")]);
        assert!(cache.lookup_constructor("Order", &[t("String")]).is_err());
    }

    #[test]
    fn nested_helper_types_are_listed_on_the_declaring_type() {
        let cache = cache(vec![
            TypeDecl::class("Customer"),
            TypeDecl::class("Customer_placeOrder")
                .declared_in("Customer")
                .with_method(MethodDecl::new("act").returns(t("Order"))),
        ]);
        let customer = cache.resolve_members("Customer").unwrap();
        assert_eq!(customer.nested(), ["Customer_placeOrder".to_string()]);
        assert!(customer.is_empty());

        let mixin = cache.resolve_members("Customer_placeOrder").unwrap();
        assert_eq!(mixin.methods()[0].declaring_type, "Customer_placeOrder");
    }

    #[test]
    fn results_are_memoized_until_invalidated() {
        let cache = cache(repository_types());
        let first = cache.resolve_members("StringRepository").unwrap();
        let second = cache.resolve_members("StringRepository").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(cache.is_cached("StringRepository"));

        cache.invalidate_all();
        assert!(cache.is_empty());
        let third = cache.resolve_members("StringRepository").unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(*first, *third);
    }

    #[test]
    fn concurrent_resolution_converges_on_one_entry() {
        let cache = Arc::new(cache(repository_types()));
        let results: Vec<Arc<TypeMembers>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let cache = Arc::clone(&cache);
                    scope.spawn(move || cache.resolve_members("StringRepository").unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for result in &results {
            assert!(Arc::ptr_eq(result, &results[0]));
        }
        assert_eq!(cache.len(), 1);
    }
}
