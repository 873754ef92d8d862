//! Import context
//!
//! One `ImportContext` lives for one import pass. It owns the type registry,
//! the generic resolution stack and the configuration, and drives class
//! translation: each method is translated on its own and a failing method
//! is reported without stopping its siblings.

use std::rc::Rc;

use crate::codegen::access_flags::ACC_PUBLIC;
use crate::codegen::TargetClass;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::generics::GenericResolver;
use crate::interfaces::{self, interface_bridge_count, plan_bridges, BridgeKind, BridgePlan, InterfaceContract};
use crate::translate::{build_bridge_stub, build_method_body};
use crate::types::{SourceClass, TypeRegistry};

/// Result of translating one class
#[derive(Debug)]
pub struct ClassOutcome {
    pub class: TargetClass,
    pub contracts: Vec<InterfaceContract>,
    pub bridges: Vec<BridgePlan>,
    /// Methods (or bridges) that could not be translated, by name
    pub failures: Vec<(String, Error)>,
}

impl ClassOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure(&self, method: &str) -> Option<&Error> {
        self.failures.iter().find(|(name, _)| name == method).map(|(_, e)| e)
    }
}

pub struct ImportContext {
    registry: Rc<TypeRegistry>,
    resolver: GenericResolver,
    pub config: Config,
    locations: Vec<String>,
}

impl ImportContext {
    pub fn new(registry: TypeRegistry) -> Self {
        Self::with_config(registry, Config::default())
    }

    pub fn with_config(registry: TypeRegistry, config: Config) -> Self {
        let registry = Rc::new(registry);
        Self {
            resolver: GenericResolver::new(Rc::clone(&registry)),
            registry,
            config,
            locations: Vec::new(),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn resolver(&mut self) -> &mut GenericResolver {
        &mut self.resolver
    }

    pub fn push_location(&mut self, context: impl Into<String>) {
        self.locations.push(context.into());
    }

    pub fn pop_location(&mut self) {
        self.locations.pop();
    }

    /// Where the pass currently is, outermost first
    pub fn location(&self) -> String {
        self.locations.join(" / ")
    }

    pub fn collect_interfaces(&mut self, class: &SourceClass) -> Result<Vec<InterfaceContract>> {
        interfaces::collect_interfaces(&mut self.resolver, class)
    }

    /// Translate every bodied method of `class` and synthesize its bridges
    pub fn translate_class(&mut self, class: &SourceClass) -> Result<ClassOutcome> {
        self.push_location(class.name.clone());
        let outcome = self.translate_class_inner(class);
        self.pop_location();
        outcome
    }

    fn translate_class_inner(&mut self, class: &SourceClass) -> Result<ClassOutcome> {
        let contracts = interfaces::collect_interfaces(&mut self.resolver, class)?;
        let bridges = plan_bridges(&mut self.resolver, class, &contracts)?;
        let bridge_count = interface_bridge_count(&contracts);

        let mut target = TargetClass::from_source(class);
        if bridge_count > 0 && !class.is_interface {
            target.add_field(ACC_PUBLIC, self.config.interface_array_field.clone(), "[Ljava/lang/Object;");
        }

        let mut failures = Vec::new();
        for (index, method) in class.methods.iter().enumerate() {
            let body = match &method.body {
                Some(body) => body,
                None => continue,
            };
            self.push_location(method.name.clone());
            if let Err(err) = build_method_body(self, &mut target.methods[index], class, method, body, bridge_count) {
                log::warn!("{}: {}", self.location(), err);
                failures.push((method.name.clone(), err));
            }
            self.pop_location();
        }

        for plan in &bridges {
            let implementation = match plan.kind {
                BridgeKind::Bridge { implementation } => &class.methods[implementation],
                BridgeKind::Missing if !class.is_interface => {
                    log::debug!("{} has no implementation of {}.{}", class.name, plan.interface, plan.method.name);
                    continue;
                }
                _ => continue,
            };
            let descriptor = plan.method.erased_descriptor();
            if target.find_method(&plan.method.name, &descriptor).is_some() {
                continue;
            }
            match build_bridge_stub(class, &plan.method, implementation) {
                Ok(stub) => target.methods.push(stub),
                Err(err) => {
                    log::warn!("{}: bridge {}: {}", self.location(), plan.method.name, err);
                    failures.push((format!("{} (bridge)", plan.method.name), err));
                }
            }
        }

        log::debug!(
            "class {}: {} methods, {} contracts, {} failures",
            class.name,
            target.methods.len(),
            contracts.len(),
            failures.len()
        );
        Ok(ClassOutcome {
            class: target,
            contracts,
            bridges,
            failures,
        })
    }

    /// Translate the whole registry in declaration order
    pub fn translate_assembly(&mut self) -> Vec<Result<ClassOutcome>> {
        let registry = Rc::clone(&self.registry);
        self.push_location(registry.assembly().to_string());
        let outcomes = registry
            .classes()
            .map(|class| {
                let outcome = self.translate_class(class);
                if let Err(err) = &outcome {
                    log::warn!("{}: class {} skipped: {}", self.location(), class.name, err);
                }
                outcome
            })
            .collect();
        self.pop_location();
        outcomes
    }
}
