//! Stack shuffling, constants, argument/local access and `ret`

use crate::codegen::code::{kind_of, load_op, pop_op, return_op, store_op};
use crate::codegen::descriptor::class_name;
use crate::codegen::{opcodes, Const};
use crate::consts::REFERENCE_CLASS;
use crate::error::{Error, Result};
use crate::types::{StackKind, TypeDesc};

use super::locals::LocalSlot;
use super::translator::{kind_descriptor, MethodTranslator};

/// `system/Reference` accessor reading a value of `kind`
pub(super) fn reference_getter(kind: StackKind) -> (&'static str, String) {
    match kind {
        StackKind::Int => ("getInt", "()I".to_string()),
        StackKind::Long => ("getLong", "()J".to_string()),
        StackKind::Float => ("getFloat", "()F".to_string()),
        StackKind::Double => ("getDouble", "()D".to_string()),
        StackKind::Ref => ("get", "()Ljava/lang/Object;".to_string()),
    }
}

pub(super) fn reference_setter(kind: StackKind) -> (&'static str, String) {
    let name = match kind {
        StackKind::Int => "setInt",
        StackKind::Long => "setLong",
        StackKind::Float => "setFloat",
        StackKind::Double => "setDouble",
        StackKind::Ref => "set",
    };
    (name, format!("({})V", kind_descriptor(kind)))
}

impl MethodTranslator<'_> {
    pub(super) fn push_constant(&mut self, value: Const, ty: TypeDesc) -> Result<()> {
        self.code.constant(value);
        self.code.push(ty);
        Ok(())
    }

    pub(super) fn pop_value(&mut self) -> Result<()> {
        let ty = self.code.pop()?;
        self.code.op(pop_op(&ty));
        Ok(())
    }

    pub(super) fn dup_value(&mut self) -> Result<()> {
        let ty = self.code.peek(0)?.clone();
        self.code.op(if ty.category() == 2 { opcodes::DUP2 } else { opcodes::DUP });
        self.code.push(ty);
        Ok(())
    }

    fn arg_slot(&self, n: u16) -> Result<LocalSlot> {
        self.locals
            .arg(n)
            .cloned()
            .ok_or_else(|| Error::internal(format!("argument {} out of range", n)))
    }

    fn local_slot(&self, n: u16) -> Result<LocalSlot> {
        self.locals
            .local(n)
            .cloned()
            .ok_or_else(|| Error::internal(format!("local {} out of range", n)))
    }

    fn load_slot(&mut self, slot: &LocalSlot) -> Result<()> {
        match slot.boxed {
            Some(reference) => {
                let kind = kind_of(&slot.ty)?;
                let (name, descriptor) = reference_getter(kind);
                self.code.reserve_stack(slot.ty.category());
                self.code.local(opcodes::ALOAD, reference);
                self.code.invoke_virtual(REFERENCE_CLASS, name, descriptor);
                if kind == StackKind::Ref {
                    self.code.type_op(opcodes::CHECKCAST, class_name(&slot.ty));
                }
            }
            None => self.code.local(load_op(kind_of(&slot.ty)?), slot.index),
        }
        self.code.push(slot.ty.clone());
        Ok(())
    }

    fn store_slot(&mut self, slot: &LocalSlot) -> Result<()> {
        if slot.ty.is_span_handle() {
            super::span::check_assign(&mut self.code, &slot.ty)?;
        }
        let value = self.code.pop()?;
        let kind = kind_of(&slot.ty)?;
        if kind_of(&value)? != kind {
            return Err(Error::type_mismatch(format!(
                "cannot store {} into a slot of type {}",
                value, slot.ty
            )));
        }
        match slot.boxed {
            Some(reference) => {
                self.code.reserve_stack(value.category() + 1);
                self.code.local(opcodes::ALOAD, reference);
                if value.category() == 2 {
                    self.code.op(opcodes::DUP_X2);
                    self.code.op(opcodes::POP);
                } else {
                    self.code.op(opcodes::SWAP);
                }
                let (name, descriptor) = reference_setter(kind);
                self.code.invoke_virtual(REFERENCE_CLASS, name, descriptor);
            }
            None => self.code.local(store_op(kind), slot.index),
        }
        Ok(())
    }

    /// Address of a slot: its reference box, or the struct object itself
    fn load_slot_address(&mut self, slot: &LocalSlot) -> Result<()> {
        let source = match slot.boxed {
            Some(reference) => reference,
            None if slot.ty.is_struct() => slot.index,
            None => {
                return Err(Error::internal(format!(
                    "address of slot {} that was not laid out as address-taken",
                    slot.index
                )))
            }
        };
        self.code.local(opcodes::ALOAD, source);
        self.code.push(TypeDesc::byref(slot.ty.clone()));
        Ok(())
    }

    pub(super) fn load_arg(&mut self, n: u16) -> Result<()> {
        let slot = self.arg_slot(n)?;
        self.load_slot(&slot)
    }

    pub(super) fn load_arg_address(&mut self, n: u16) -> Result<()> {
        let slot = self.arg_slot(n)?;
        self.load_slot_address(&slot)
    }

    pub(super) fn store_arg(&mut self, n: u16) -> Result<()> {
        let slot = self.arg_slot(n)?;
        self.store_slot(&slot)
    }

    pub(super) fn load_local(&mut self, n: u16) -> Result<()> {
        let slot = self.local_slot(n)?;
        self.load_slot(&slot)
    }

    pub(super) fn load_local_address(&mut self, n: u16) -> Result<()> {
        let slot = self.local_slot(n)?;
        self.load_slot_address(&slot)
    }

    pub(super) fn store_local(&mut self, n: u16) -> Result<()> {
        let slot = self.local_slot(n)?;
        self.store_slot(&slot)
    }

    pub(super) fn ret(&mut self) -> Result<()> {
        let declared = self.method.return_type.clone();
        if declared.is_void() {
            self.expect_empty_stack()?;
            self.code.op(opcodes::RETURN);
            return Ok(());
        }
        let ty = self.resolver.substitute(&declared)?;
        if ty.is_span_handle() {
            super::span::check_assign(&mut self.code, &ty)?;
        }
        let value = self.code.pop()?;
        let kind = kind_of(&ty)?;
        if kind_of(&value)? != kind {
            return Err(Error::type_mismatch(format!("returning {} from a method declared {}", value, ty)));
        }
        self.expect_empty_stack()?;
        self.code.op(return_op(kind));
        Ok(())
    }

    /// Nothing but the return value may be left at `ret`
    fn expect_empty_stack(&self) -> Result<()> {
        let left = self.code.stack();
        if left.is_empty() {
            return Ok(());
        }
        let types: Vec<String> = left.iter().map(ToString::to_string).collect();
        Err(Error::type_mismatch(format!("ret leaves [{}] on the stack", types.join(", "))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_accessors() {
        assert_eq!(reference_getter(StackKind::Long), ("getLong", "()J".to_string()));
        assert_eq!(reference_setter(StackKind::Ref), ("set", "(Ljava/lang/Object;)V".to_string()));
    }
}
