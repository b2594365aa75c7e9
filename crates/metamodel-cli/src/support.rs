use metamodel_introspect::TypeRegistry;
use metamodel_kernel::{MemberCache, MetaModel, MetaModelBuilder, MetamodelConfig};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Exit status for load, config and lookup errors.
pub const EXIT_ERROR: i32 = 2;
/// Exit status when validation produced failures.
pub const EXIT_REJECTED: i32 = 1;

pub fn exit_with_error(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(EXIT_ERROR);
}

pub fn load_registry_or_exit(path: &str) -> Arc<TypeRegistry> {
    let path = Path::new(path);
    let json = fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with_error(format!("failed to read {}: {e}", path.display())));
    let registry = TypeRegistry::from_json_str(&json)
        .unwrap_or_else(|e| exit_with_error(format!("failed to load {}: {e}", path.display())));
    debug!(path = %path.display(), types = registry.len(), "loaded type registry");
    Arc::new(registry)
}

pub fn load_config_or_exit(path: Option<&str>) -> MetamodelConfig {
    match path {
        Some(path) => MetamodelConfig::load(Path::new(path)).unwrap_or_else(|e| exit_with_error(e)),
        None => MetamodelConfig::default(),
    }
}

pub fn cache_for(registry: Arc<TypeRegistry>) -> Arc<MemberCache> {
    Arc::new(MemberCache::new(registry))
}

/// Builds every domain type, or only `types` when any are given.
pub fn build_model_or_exit(
    cache: Arc<MemberCache>,
    config: MetamodelConfig,
    types: &[String],
) -> MetaModel {
    let builder = MetaModelBuilder::new(cache, config);
    let built = if types.is_empty() {
        builder.build_all()
    } else {
        builder.build(types.iter().map(String::as_str))
    };
    built.unwrap_or_else(|e| exit_with_error(e))
}

pub fn print_json<T: Serialize>(payload: &T) {
    match serde_json::to_string_pretty(payload) {
        Ok(text) => println!("{text}"),
        Err(e) => exit_with_error(format!("json serialization: {e}")),
    }
}

pub fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
