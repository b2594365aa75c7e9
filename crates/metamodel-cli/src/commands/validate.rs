use crate::support::{
    EXIT_REJECTED, build_model_or_exit, cache_for, load_config_or_exit, load_registry_or_exit,
    print_json,
};
use metamodel_kernel::ValidationEngine;
use serde_json::json;

pub fn run(registry: String, config: Option<String>, types: Vec<String>, json_output: bool) {
    let config_path = config;
    let config = load_config_or_exit(config_path.as_deref());
    let cache = cache_for(load_registry_or_exit(&registry));
    let model = build_model_or_exit(cache, config.clone(), &types);

    let engine = ValidationEngine::with_builtins(&config);
    let failures = engine.validate(&model);
    let report = failures.report();

    if json_output {
        print_json(&json!({
            "registry": registry,
            "config": config_path,
            "specCount": model.len(),
            "validators": engine.validator_names(),
            "result": report.result,
            "failureCount": report.failures.len(),
            "failures": report.failures,
        }));
    } else {
        println!("metamodel validate {registry}");
        if let Some(path) = &config_path {
            println!("  Config: {path}");
        }
        println!("  Object specs: {}", model.len());
        println!("  Validators: {}", engine.validator_names().join(", "));
        println!("  Result: {}", report.result);
        if !failures.is_empty() {
            println!("  Failures ({}):", failures.len());
            for line in failures.numbered().lines() {
                println!("    {line}");
            }
        }
    }

    if !report.is_accepted() {
        std::process::exit(EXIT_REJECTED);
    }
}
