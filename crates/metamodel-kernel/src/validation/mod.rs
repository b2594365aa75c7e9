//! Whole-model validation.
//!
//! A pass walks a frozen [`MetaModel`] in a fixed order and offers each
//! element to every registered validator, in registration order:
//!
//! ```text
//! enter
//!   for each object spec (by type name)
//!     object_enter
//!       action → parameter*      (per action)
//!       property                 (per property, by name)
//!       collection               (per collection, by name)
//!     object_exit
//! exit
//! ```
//!
//! Validators only populate the hooks they care about. Findings go into a
//! shared [`ValidationFailures`]; nothing is ever thrown.

mod failure;
pub mod validators;

pub use failure::{FailureRecord, ValidationFailure, ValidationFailures, ValidationReport};

use crate::config::MetamodelConfig;
use crate::spec::{ActionSpec, AssociationSpec, MetaModel, ObjectSpec, ParameterSpec};
use std::fmt;
use tracing::{debug, info};

pub type ModelHook = Box<dyn Fn(&MetaModel, &ValidationFailures) + Send + Sync>;
pub type ObjectHook = Box<dyn Fn(&ObjectSpec, &ValidationFailures) + Send + Sync>;
pub type ActionHook = Box<dyn Fn(&ObjectSpec, &ActionSpec, &ValidationFailures) + Send + Sync>;
pub type ParameterHook =
    Box<dyn Fn(&ObjectSpec, &ActionSpec, &ParameterSpec, &ValidationFailures) + Send + Sync>;
pub type AssociationHook =
    Box<dyn Fn(&ObjectSpec, &AssociationSpec, &ValidationFailures) + Send + Sync>;

/// A named validator: a set of optional hooks.
#[derive(Default)]
pub struct ValidatorDescriptor {
    name: String,
    enter: Option<ModelHook>,
    object_enter: Option<ObjectHook>,
    action: Option<ActionHook>,
    parameter: Option<ParameterHook>,
    property: Option<AssociationHook>,
    collection: Option<AssociationHook>,
    object_exit: Option<ObjectHook>,
    exit: Option<ModelHook>,
}

impl ValidatorDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn on_enter(mut self, hook: impl Fn(&MetaModel, &ValidationFailures) + Send + Sync + 'static) -> Self {
        self.enter = Some(Box::new(hook));
        self
    }

    pub fn on_object_enter(
        mut self,
        hook: impl Fn(&ObjectSpec, &ValidationFailures) + Send + Sync + 'static,
    ) -> Self {
        self.object_enter = Some(Box::new(hook));
        self
    }

    pub fn on_action(
        mut self,
        hook: impl Fn(&ObjectSpec, &ActionSpec, &ValidationFailures) + Send + Sync + 'static,
    ) -> Self {
        self.action = Some(Box::new(hook));
        self
    }

    pub fn on_parameter(
        mut self,
        hook: impl Fn(&ObjectSpec, &ActionSpec, &ParameterSpec, &ValidationFailures)
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.parameter = Some(Box::new(hook));
        self
    }

    pub fn on_property(
        mut self,
        hook: impl Fn(&ObjectSpec, &AssociationSpec, &ValidationFailures) + Send + Sync + 'static,
    ) -> Self {
        self.property = Some(Box::new(hook));
        self
    }

    pub fn on_collection(
        mut self,
        hook: impl Fn(&ObjectSpec, &AssociationSpec, &ValidationFailures) + Send + Sync + 'static,
    ) -> Self {
        self.collection = Some(Box::new(hook));
        self
    }

    pub fn on_object_exit(
        mut self,
        hook: impl Fn(&ObjectSpec, &ValidationFailures) + Send + Sync + 'static,
    ) -> Self {
        self.object_exit = Some(Box::new(hook));
        self
    }

    pub fn on_exit(mut self, hook: impl Fn(&MetaModel, &ValidationFailures) + Send + Sync + 'static) -> Self {
        self.exit = Some(Box::new(hook));
        self
    }

    /// Names of the populated hooks.
    pub fn hooks(&self) -> Vec<&'static str> {
        [
            ("enter", self.enter.is_some()),
            ("object_enter", self.object_enter.is_some()),
            ("action", self.action.is_some()),
            ("parameter", self.parameter.is_some()),
            ("property", self.property.is_some()),
            ("collection", self.collection.is_some()),
            ("object_exit", self.object_exit.is_some()),
            ("exit", self.exit.is_some()),
        ]
        .into_iter()
        .filter_map(|(hook, present)| present.then_some(hook))
        .collect()
    }
}

impl fmt::Debug for ValidatorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorDescriptor")
            .field("name", &self.name)
            .field("hooks", &self.hooks())
            .finish()
    }
}

/// Runs registered validators over a model.
#[derive(Debug, Default)]
pub struct ValidationEngine {
    validators: Vec<ValidatorDescriptor>,
}

impl ValidationEngine {
    /// An engine with no validators.
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine with the built-in validators `config` enables.
    pub fn with_builtins(config: &MetamodelConfig) -> Self {
        let mut engine = Self::new();
        for validator in validators::builtin(config) {
            engine.register(validator);
        }
        engine
    }

    pub fn register(&mut self, validator: ValidatorDescriptor) {
        debug!(validator = validator.name(), hooks = ?validator.hooks(), "registering validator");
        self.validators.push(validator);
    }

    pub fn with_validator(mut self, validator: ValidatorDescriptor) -> Self {
        self.register(validator);
        self
    }

    pub fn validator_names(&self) -> Vec<&str> {
        self.validators.iter().map(ValidatorDescriptor::name).collect()
    }

    /// Run one full pass. Every problem found is in the returned set.
    pub fn validate(&self, model: &MetaModel) -> ValidationFailures {
        let failures = ValidationFailures::new();
        let validators = &self.validators;

        for hook in validators.iter().filter_map(|v| v.enter.as_ref()) {
            hook(model, &failures);
        }
        for spec in model.specs() {
            for hook in validators.iter().filter_map(|v| v.object_enter.as_ref()) {
                hook(spec, &failures);
            }
            for action in &spec.actions {
                for hook in validators.iter().filter_map(|v| v.action.as_ref()) {
                    hook(spec, action, &failures);
                }
                for parameter in &action.parameters {
                    for hook in validators.iter().filter_map(|v| v.parameter.as_ref()) {
                        hook(spec, action, parameter, &failures);
                    }
                }
            }
            for property in spec.properties.values() {
                for hook in validators.iter().filter_map(|v| v.property.as_ref()) {
                    hook(spec, property, &failures);
                }
            }
            for collection in spec.collections.values() {
                for hook in validators.iter().filter_map(|v| v.collection.as_ref()) {
                    hook(spec, collection, &failures);
                }
            }
            for hook in validators.iter().filter_map(|v| v.object_exit.as_ref()) {
                hook(spec, &failures);
            }
        }
        for hook in validators.iter().filter_map(|v| v.exit.as_ref()) {
            hook(model, &failures);
        }

        info!(
            validators = validators.len(),
            specs = model.len(),
            failures = failures.len(),
            "validation pass complete"
        );
        failures
    }
}
