//! Erasure bridge stubs: an interface slot with the contract's erased
//! descriptor forwarding to the class's own implementation

use crate::codegen::access_flags::{ACC_BRIDGE, ACC_PUBLIC, ACC_SYNTHETIC};
use crate::codegen::code::{kind_of, load_op, return_op};
use crate::codegen::descriptor::{class_name, method_descriptor, method_name};
use crate::codegen::{opcodes, Code, TargetMethod};
use crate::error::{Error, Location, Result};
use crate::interfaces::InterfaceMethod;
use crate::types::{SourceClass, SourceMethod, TypeDesc};

use super::casts::{erasure, from_erased, to_erased};

/// Target shape of a declared type: open parameters erase to object
fn erased(ty: &TypeDesc) -> TypeDesc {
    if ty.is_generic_param() {
        TypeDesc::object()
    } else {
        ty.clone()
    }
}

pub fn build_bridge_stub(
    class: &SourceClass,
    contract: &InterfaceMethod,
    implementation: &SourceMethod,
) -> Result<TargetMethod> {
    let location = Location::new(format!("{}::{} (bridge)", class.name, contract.name));
    let code = bridge_body(class, contract, implementation).map_err(|e| e.located(location))?;
    let mut stub = TargetMethod::new(
        ACC_PUBLIC | ACC_BRIDGE | ACC_SYNTHETIC,
        method_name(&contract.name),
        contract.erased_descriptor(),
    );
    stub.code = Some(code);
    Ok(stub)
}

fn bridge_body(class: &SourceClass, contract: &InterfaceMethod, implementation: &SourceMethod) -> Result<Code> {
    if implementation.params.len() != contract.params.len() {
        return Err(Error::internal(format!(
            "bridge to {} with {} parameters for a contract with {}",
            implementation.name,
            implementation.params.len(),
            contract.params.len()
        )));
    }
    let owner = class.open_type();
    let mut code = Code::new();
    code.set_local(0, owner.clone());
    let mut slot = 1u16;
    let mut slots = Vec::with_capacity(contract.declared_params.len());
    for declared in &contract.declared_params {
        let ty = erased(declared);
        code.set_local(slot, ty.clone());
        slots.push(slot);
        slot += ty.category();
    }
    code.use_locals(slot);

    code.local(opcodes::ALOAD, 0);
    code.push(owner.clone());
    for (i, declared) in contract.declared_params.iter().enumerate() {
        let ty = erased(declared);
        code.local(load_op(kind_of(&ty)?), slots[i]);
        code.push(ty);
        let actual = &contract.params[i];
        let boundary = erasure(declared, actual)?;
        from_erased(&mut code, boundary, actual);
        code.replace_top(implementation.params[i].clone())?;
    }

    code.pop_n(contract.params.len())?;
    code.pop()?;
    code.invoke(
        opcodes::INVOKEVIRTUAL,
        class_name(&owner),
        method_name(&implementation.name),
        method_descriptor(&implementation.params, &implementation.return_type),
    );

    if contract.declared_return.is_void() {
        code.op(opcodes::RETURN);
    } else {
        let boundary = erasure(&contract.declared_return, &contract.return_type)?;
        code.reserve_stack(implementation.return_type.category());
        to_erased(&mut code, boundary);
        let ret = erased(&contract.declared_return);
        code.op(return_op(kind_of(&ret)?));
    }
    log::trace!("bridge {}.{}{}", class.name, contract.name, contract.erased_descriptor());
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxed_contract_unboxes_arguments() {
        let class = SourceClass::new("Demo.IntList");
        let implementation = SourceMethod::instance("Add", vec![TypeDesc::I32], TypeDesc::VOID).with_virtual();
        let contract = InterfaceMethod {
            name: "Add".to_string(),
            return_type: TypeDesc::VOID,
            params: vec![TypeDesc::I32],
            declared_return: TypeDesc::VOID,
            declared_params: vec![TypeDesc::param("T")],
        };
        let stub = build_bridge_stub(&class, &contract, &implementation).unwrap();
        assert!(stub.is_bridge());
        assert_eq!(stub.descriptor, "(Ljava/lang/Object;)V");
        let listing = stub.code.unwrap().listing();
        assert_eq!(
            listing,
            vec![
                "aload 0",
                "aload 1",
                "checkcast java/lang/Integer",
                "invokevirtual java/lang/Integer.intValue()I",
                "invokevirtual Demo/IntList.Add(I)V",
                "return",
            ]
        );
    }
}
