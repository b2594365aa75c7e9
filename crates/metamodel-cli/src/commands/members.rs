use crate::support::{cache_for, exit_with_error, load_registry_or_exit, print_json, yes_no};
use metamodel_kernel::{ResolvedConstructor, ResolvedMember};
use serde_json::json;

pub fn run(registry: String, type_name: String, json_output: bool) {
    let cache = cache_for(load_registry_or_exit(&registry));
    let members = cache
        .resolve_members(&type_name)
        .unwrap_or_else(|e| exit_with_error(e));

    if json_output {
        let methods: Vec<&ResolvedMember> = members.methods().iter().map(AsRef::as_ref).collect();
        let constructors: Vec<&ResolvedConstructor> =
            members.constructors().iter().map(AsRef::as_ref).collect();
        print_json(&json!({
            "type": type_name,
            "methods": methods,
            "constructors": constructors,
            "nested": members.nested(),
        }));
        return;
    }

    println!("metamodel members {type_name}");
    println!("  Methods ({}):", members.methods().len());
    for member in members.methods() {
        println!(
            "    {} -> {}  [declared by {}, static: {}]",
            member.signature(),
            member.generic_return_type,
            member.declaring_type,
            yes_no(member.is_static()),
        );
    }
    if !members.constructors().is_empty() {
        println!("  Constructors ({}):", members.constructors().len());
        for constructor in members.constructors() {
            let params: Vec<String> = constructor
                .generic_parameter_types
                .iter()
                .map(ToString::to_string)
                .collect();
            println!("    {type_name}({})", params.join(", "));
        }
    }
    if !members.nested().is_empty() {
        println!("  Nested: {}", members.nested().join(", "));
    }
}
