use crate::support::{
    build_model_or_exit, cache_for, exit_with_error, load_config_or_exit, load_registry_or_exit,
    print_json,
};
use metamodel_kernel::FacetHolder;
use serde_json::{Value, json};

pub fn run(registry: String, type_name: String, config: Option<String>, json_output: bool) {
    let config = load_config_or_exit(config.as_deref());
    let cache = cache_for(load_registry_or_exit(&registry));
    let model = build_model_or_exit(cache, config, std::slice::from_ref(&type_name));
    let Some(spec) = model.get(&type_name) else {
        exit_with_error(format!("no object spec for {type_name}"));
    };

    if json_output {
        let holders: Vec<Value> = spec.holders().into_iter().map(holder_json).collect();
        print_json(&json!({ "type": type_name, "holders": holders }));
        return;
    }

    println!("metamodel facets {type_name}");
    for holder in spec.holders() {
        println!("  {}", holder.id());
        for ranking in holder.rankings() {
            for (index, facet) in ranking.iter().enumerate() {
                let marker = if index == 0 { "*" } else { " " };
                println!(
                    "    {marker} {:<14} {:<9} {}",
                    ranking.kind().to_string(),
                    facet.precedence().to_string(),
                    facet.describe()
                );
            }
        }
    }
}

fn holder_json(holder: &FacetHolder) -> Value {
    let facets: Vec<Value> = holder
        .rankings()
        .map(|ranking| {
            let ranked: Vec<Value> = ranking
                .iter()
                .map(|facet| {
                    json!({
                        "precedence": facet.precedence(),
                        "description": facet.describe(),
                    })
                })
                .collect();
            json!({ "kind": ranking.kind(), "ranked": ranked })
        })
        .collect();
    json!({ "id": holder.id().to_string(), "facets": facets })
}
