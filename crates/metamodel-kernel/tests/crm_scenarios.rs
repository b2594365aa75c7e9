//! Integration tests: build and validate the metamodel of a small CRM
//! domain loaded from tests/fixtures/crm.json.

use metamodel_introspect::{TypeRef, TypeRegistry};
use metamodel_kernel::facet::kinds::{
    Condition, ContributingFacet, DisabledFacet, HiddenFacet, MandatoryFacet, MemberIdFacet,
    MixinFacet, NamedFacet, Optionality,
};
use metamodel_kernel::{
    AnnotatedElement, MarkerSynthesizer, MemberCache, MetaModel, MetaModelBuilder,
    MetamodelConfig, MetamodelError, TypedFacet, ValidationEngine,
};
use std::path::PathBuf;
use std::sync::Arc;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/crm.json")
}

fn cache() -> Arc<MemberCache> {
    let path = fixture_path();
    let json = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    let registry = TypeRegistry::from_json_str(&json)
        .unwrap_or_else(|e| panic!("failed to load {}: {e}", path.display()));
    Arc::new(MemberCache::new(Arc::new(registry)))
}

fn build(config: &MetamodelConfig) -> MetaModel {
    MetaModelBuilder::new(cache(), config.clone())
        .build_all()
        .expect("crm model should build")
}

#[test]
fn subtype_members_include_inherited_accessor_and_own_helpers() {
    let cache = cache();
    let members = cache.resolve_members("CustomerEx").unwrap();
    let first_name = members.find("getFirstName").next().unwrap();
    assert_eq!(first_name.declaring_type, "Customer");
    assert_eq!(members.find("hideFirstName").next().unwrap().declaring_type, "CustomerEx");
    assert_eq!(members.find("disableFirstName").next().unwrap().declaring_type, "CustomerEx");
    assert_eq!(members.find("getFirstName").count(), 1);
}

#[test]
fn supporting_methods_attach_to_the_inherited_holder() {
    let model = build(&MetamodelConfig::default());
    let customer_ex = model.get("CustomerEx").unwrap();

    let first_name = customer_ex.property("firstName").unwrap();
    assert_eq!(first_name.id().to_string(), "CustomerEx#firstName");
    assert_eq!(first_name.accessor.declaring_type, "Customer");
    assert_eq!(
        first_name.holder.get::<HiddenFacet>().unwrap().condition,
        Condition::Method("hideFirstName".into())
    );
    assert_eq!(
        first_name.holder.get::<DisabledFacet>().unwrap().condition,
        Condition::Method("disableFirstName".into())
    );
    assert!(customer_ex.action("hideFirstName").is_none());
    assert!(customer_ex.action("disableFirstName").is_none());
    assert!(customer_ex.property("hideFirstName").is_none());

    let base = model.get("Customer").unwrap().property("firstName").unwrap();
    assert!(base.holder.get::<HiddenFacet>().is_none());
}

#[test]
fn generic_repository_resolves_one_member_per_operation() {
    let cache = cache();
    let members = cache.resolve_members("CustomerRepository").unwrap();
    let saves: Vec<_> = members.find("save").collect();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].parameter_types, vec![TypeRef::named("Customer")]);
    assert!(!saves[0].is_bridge());

    let find_all = members.find("findAll").next().unwrap();
    assert_eq!(
        find_all.generic_return_type,
        TypeRef::parse("List<Customer>").unwrap()
    );

    assert!(cache.lookup("CustomerRepository", "save", &[TypeRef::named("Customer")]).is_ok());
    let err = cache
        .lookup("CustomerRepository", "save", &[TypeRef::named("Order")])
        .unwrap_err();
    assert!(matches!(err, MetamodelError::NotFound { candidates: 0, .. }));
}

#[test]
fn meta_marker_supplies_optionality() {
    let cache = cache();
    let members = cache.resolve_members("Customer").unwrap();
    let middle_name = members.find("getMiddleName").next().unwrap();
    let synthesizer = MarkerSynthesizer::new(cache.registry());
    let property = synthesizer
        .synthesize(&AnnotatedElement::Member(middle_name), "Property")
        .unwrap();
    assert_eq!(property.str_attr("optionality"), Some("optional"));

    let model = build(&MetamodelConfig::default());
    let holder = &model.get("Customer").unwrap().property("middleName").unwrap().holder;
    assert_eq!(
        holder.get::<MandatoryFacet>().unwrap().optionality,
        Optionality::Optional
    );
}

#[test]
fn parameters_get_named_from_markers() {
    let model = build(&MetamodelConfig::default());
    let place_order = model.get("Customer").unwrap().action("placeOrder").unwrap();
    let order = &place_order.parameters[0];
    assert_eq!(order.holder.id().to_string(), "Customer#placeOrder[0]");
    assert_eq!(order.holder.get::<NamedFacet>().unwrap().name, "New Order");
    assert_eq!(order.name.as_deref(), Some("order"));
}

#[test]
fn mixins_contribute_to_their_declaring_type() {
    let model = build(&MetamodelConfig::default());
    let customer = model.get("Customer").unwrap();

    let rush = customer.action("placeRush").unwrap();
    assert_eq!(rush.mixin.as_deref(), Some("Customer_placeRush"));
    assert_eq!(rush.member.name, "act");

    let last_order = customer.action("lastOrder").unwrap();
    assert_eq!(last_order.holder.top_rank(ContributingFacet::KIND).len(), 2);

    let helper = model.get("Customer_placeRush").unwrap();
    assert_eq!(helper.holder.get::<MixinFacet>().unwrap().mixed_into, "Customer");
    assert!(model.get("CustomerEx").unwrap().action("placeRush").is_none());
}

#[test]
fn member_ids_default_to_member_names() {
    let model = build(&MetamodelConfig::default());
    let customer_ex = model.get("CustomerEx").unwrap();
    let nickname = customer_ex.property("nickname").unwrap();
    assert_eq!(nickname.holder.get::<MemberIdFacet>().unwrap().id, "firstName");
    let email = customer_ex.property("email").unwrap();
    assert_eq!(email.holder.get::<MemberIdFacet>().unwrap().id, "email");
}

#[test]
fn default_validation_reports_every_problem_once() {
    let config = MetamodelConfig::default();
    let model = build(&config);
    let failures = ValidationEngine::with_builtins(&config).validate(&model);

    insta::assert_snapshot!(failures.numbered().trim_end(), @r"
    1: Customer#lastOrder: ambiguous mixin contribution: action (from @Action) conflicts with property (from @Property)
    2: Customer#tags: invalid element type String for collection: value types are not object types
    3: CustomerEx: member id 'firstName' is shared by CustomerEx#firstName and CustomerEx#nickname
    4: CustomerEx#tags: invalid element type String for collection: value types are not object types
    5: Order#status: unknown optionality 'SOMETIMES'
    ");
}

#[test]
fn conflicting_optionality_is_reported_only_when_enabled() {
    let mut config = MetamodelConfig::default();
    let model = build(&config);
    let quiet = ValidationEngine::with_builtins(&config).validate(&model);
    assert!(!quiet.messages().iter().any(|m| m.contains("conflicting optionality")));

    config.validation.check_conflicting_optionality = true;
    let failures = ValidationEngine::with_builtins(&config).validate(&model);
    let optionality: Vec<String> = failures
        .messages()
        .into_iter()
        .filter(|m| m.contains("conflicting optionality"))
        .collect();
    assert_eq!(
        optionality,
        vec![
            "Customer#email: conflicting optionality: mandatory (from @Property) conflicts with optional (from @Column)",
            "CustomerEx#email: conflicting optionality: mandatory (from @Property) conflicts with optional (from @Column)",
        ]
    );
    assert_eq!(failures.len(), quiet.len() + 2);
}

#[test]
fn report_is_rejected_with_content_addressed_ids() {
    let config = MetamodelConfig::default();
    let model = build(&config);
    let report = ValidationEngine::with_builtins(&config).validate(&model).report();
    assert!(!report.is_accepted());
    assert_eq!(report.failures.len(), 5);
    let again = ValidationEngine::with_builtins(&config).validate(&model).report();
    assert_eq!(report, again);
    assert!(report.failures.iter().all(|f| f.failure_id.starts_with("vf1_")));
}

#[test]
fn element_types_must_belong_to_the_built_model() {
    let config = MetamodelConfig::default();
    let model = MetaModelBuilder::new(cache(), config.clone())
        .build(["CustomerRepository", "Customer"])
        .unwrap();
    let failures = ValidationEngine::with_builtins(&config).validate(&model);
    // Order is not part of this model, so Customer#orders is flagged too.
    assert!(failures.messages().iter().any(|m| m.starts_with("Customer#orders: invalid element type Order")));
    assert!(!failures.messages().iter().any(|m| m.starts_with("CustomerRepository")));
}
