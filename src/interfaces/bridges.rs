//! Bridge planning: which contract methods a class satisfies exactly and
//! which need an erasure bridge

use crate::error::Result;
use crate::generics::GenericResolver;
use crate::types::{SourceClass, TypeDesc};

use super::signature::{find_method, InterfaceMethod};
use super::InterfaceContract;

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeKind {
    /// Own method with the same erased descriptor
    Exact,
    /// Own method (index into the class's methods) compatible only under erasure
    Bridge { implementation: usize },
    /// No own method; a base class already implements the contract
    Inherited,
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BridgePlan {
    pub interface: TypeDesc,
    pub method: InterfaceMethod,
    pub kind: BridgeKind,
}

pub fn plan_bridges(
    resolver: &mut GenericResolver,
    class: &SourceClass,
    contracts: &[InterfaceContract],
) -> Result<Vec<BridgePlan>> {
    let mut scope = resolver.scope();
    scope.enter_class(class)?;

    let mut owners = Vec::new();
    let mut own = Vec::new();
    for (index, method) in class.methods.iter().enumerate() {
        if method.is_static || method.is_constructor() || method.is_type_initializer() {
            continue;
        }
        owners.push(index);
        own.push(InterfaceMethod::from_declaration(&mut scope, method)?);
    }

    let mut plans = Vec::new();
    for contract in contracts {
        for method in &contract.methods {
            let kind = match find_method(&own, method) {
                Some(pos) if own[pos].erased_descriptor() == method.erased_descriptor() => BridgeKind::Exact,
                Some(pos) => BridgeKind::Bridge { implementation: owners[pos] },
                None => match own.iter().position(|m| m.generic_compare(method)) {
                    Some(pos) => BridgeKind::Bridge { implementation: owners[pos] },
                    None if contract.super_implements => BridgeKind::Inherited,
                    None => BridgeKind::Missing,
                },
            };
            log::trace!("{}.{} -> {:?}", contract.interface, method.name, kind);
            plans.push(BridgePlan {
                interface: contract.interface.clone(),
                method: method.clone(),
                kind,
            });
        }
    }
    Ok(plans)
}

/// Generic contract records whose erased shape collides with another record
/// of the same interface; each needs a per-instance dispatch slot
pub fn interface_bridge_count(contracts: &[InterfaceContract]) -> usize {
    contracts
        .iter()
        .enumerate()
        .filter(|(i, c)| {
            !c.args.is_empty()
                && contracts
                    .iter()
                    .enumerate()
                    .any(|(j, other)| j != *i && other.interface.name() == c.interface.name())
        })
        .count()
}
