//! Interface resolver
//!
//! Collects, per class, the deduplicated interface contracts it implements
//! (directly or through its base chain) together with their abstract method
//! signatures, resolved for the generic arguments of each occurrence.

mod bridges;
mod signature;

pub use bridges::{interface_bridge_count, plan_bridges, BridgeKind, BridgePlan};
pub use signature::{find_method, InterfaceMethod};

use crate::error::Result;
use crate::generics::GenericResolver;
use crate::types::{SourceClass, TypeDesc};

/// One implemented interface occurrence
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceContract {
    pub interface: TypeDesc,
    pub args: Vec<TypeDesc>,
    pub methods: Vec<InterfaceMethod>,
    /// Declared by the class under construction itself
    pub direct_reference: bool,
    /// Reached through a base class
    pub super_implements: bool,
    /// Present in the accumulated result
    pub inserted: bool,
}

impl InterfaceContract {
    pub fn name(&self) -> String {
        self.interface.name()
    }
}

/// Walk the declared interfaces, then the base chain, depth-first
pub fn collect_interfaces(resolver: &mut GenericResolver, class: &SourceClass) -> Result<Vec<InterfaceContract>> {
    let mut scope = resolver.scope();
    scope.enter_class(class)?;
    let mut contracts = Vec::new();
    walk_class(&mut scope, class, true, &mut contracts)?;
    log::debug!("class {} implements {} interface contract(s)", class.name, contracts.len());
    Ok(contracts)
}

fn walk_class(
    resolver: &mut GenericResolver,
    class: &SourceClass,
    is_self: bool,
    contracts: &mut Vec<InterfaceContract>,
) -> Result<()> {
    for interface in &class.interfaces {
        add_interface(resolver, interface, is_self, !is_self, contracts)?;
    }
    let base = match &class.base {
        Some(base) => base,
        None => return Ok(()),
    };
    let base_class = match resolver.registry().lookup(base) {
        Some(c) => c.clone(),
        None => return Ok(()),
    };
    let mut scope = resolver.scope();
    scope.enter_type(base)?;
    walk_class(&mut scope, &base_class, false, contracts)
}

fn add_interface(
    resolver: &mut GenericResolver,
    interface: &TypeDesc,
    direct: bool,
    super_implements: bool,
    contracts: &mut Vec<InterfaceContract>,
) -> Result<()> {
    let mut args = Vec::with_capacity(interface.args().len());
    for arg in interface.args() {
        let mut scope = resolver.scope();
        args.push(scope.enter_type(arg)?);
    }
    let name = interface.name();

    if let Some(existing) = contracts
        .iter_mut()
        .find(|c| c.interface.name() == name && c.args == args)
    {
        existing.super_implements |= super_implements;
        return Ok(());
    }

    let resolved = interface.with_args(args.clone());
    let index = contracts.len();
    contracts.push(InterfaceContract {
        interface: resolved.clone(),
        args,
        methods: Vec::new(),
        direct_reference: direct,
        super_implements,
        inserted: true,
    });

    let declaration = match resolver.registry().lookup(interface) {
        Some(c) => c.clone(),
        None => {
            log::debug!("interface {} has no definition; no methods collected", name);
            return Ok(());
        }
    };

    let mut scope = resolver.scope();
    scope.enter_type(&resolved)?;
    let mut methods: Vec<InterfaceMethod> = Vec::new();
    for method in &declaration.methods {
        if method.is_static || method.is_constructor() || method.is_type_initializer() || method.has_body() {
            continue;
        }
        let signature = InterfaceMethod::from_declaration(&mut scope, method)?;
        if !methods.iter().any(|m| m.same_slot(&signature)) {
            methods.push(signature);
        }
    }
    contracts[index].methods = methods;

    for parent in &declaration.interfaces {
        add_interface(&mut scope, parent, false, super_implements, contracts)?;
    }
    Ok(())
}
