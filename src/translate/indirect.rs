//! Access through addresses: byrefs, pointers and typed spans
//!
//! A byref to a struct is the struct object itself; a byref to anything else
//! is a `system/Reference` cell. Pointers and spans go to the span emulator.

use crate::codegen::code::{kind_of, zero_of};
use crate::codegen::descriptor::class_name;
use crate::codegen::opcodes;
use crate::consts::{REFERENCE_CLASS, VALUE_TYPE_CLASS};
use crate::error::{Error, Result};
use crate::types::{Primitive, StackKind, TypeDesc};

use super::convert::converted;
use super::span;
use super::stack::{reference_getter, reference_setter};
use super::translator::MethodTranslator;

/// Accessed type of a handle when the instruction does not name one
fn pointee(handle: &TypeDesc) -> Result<TypeDesc> {
    handle
        .element()
        .filter(|e| !e.is_void())
        .cloned()
        .ok_or_else(|| Error::type_mismatch(format!("access through untyped {}", handle)))
}

fn stack_type(accessed: &TypeDesc) -> TypeDesc {
    match accessed {
        TypeDesc::Primitive(p) => converted(*p),
        other => other.clone(),
    }
}

impl MethodTranslator<'_> {
    /// Replace the address on top of the stack by the value it points at
    fn load_through(&mut self, accessed: Option<TypeDesc>) -> Result<()> {
        let address = self.code.peek(0)?.clone();
        if address.is_span_handle() {
            let accessed = match accessed {
                Some(ty) => ty,
                None => pointee(&address)?,
            };
            span::load(&mut self.code, &accessed)?;
            self.code.replace_top(stack_type(&accessed))?;
            return Ok(());
        }
        let elem = match &address {
            TypeDesc::ByRef(elem) => (**elem).clone(),
            other => return Err(Error::type_mismatch(format!("indirect load through {}", other))),
        };
        let accessed = accessed.unwrap_or_else(|| elem.clone());
        self.code.pop()?;

        if elem.is_struct() {
            self.code.invoke_static(VALUE_TYPE_CLASS, "copy", "(Ljava/lang/Object;)Ljava/lang/Object;");
            self.code.type_op(opcodes::CHECKCAST, class_name(&elem));
            self.code.push(elem);
            return Ok(());
        }

        let kind = kind_of(&elem)?;
        if kind_of(&accessed)? != kind {
            return Err(Error::type_mismatch(format!("loading {} through {}", accessed, address)));
        }
        let (name, descriptor) = reference_getter(kind);
        self.code.reserve_stack(elem.category());
        self.code.invoke_virtual(REFERENCE_CLASS, name, descriptor);
        match &accessed {
            TypeDesc::Primitive(Primitive::U8) => {
                self.code.reserve_stack(1);
                self.code.constant(crate::codegen::Const::Int(0xFF));
                self.code.op(opcodes::IAND);
            }
            TypeDesc::Primitive(_) | TypeDesc::GenericParam { .. } => {}
            other => self.code.type_op(opcodes::CHECKCAST, class_name(other)),
        }
        self.code.push(stack_type(&accessed));
        Ok(())
    }

    /// Stack is `address, value`: write the value and pop both
    fn store_through(&mut self, accessed: Option<TypeDesc>) -> Result<()> {
        let value = self.code.peek(0)?.clone();
        let address = self.code.peek(1)?.clone();
        if address.is_span_handle() {
            let accessed = match accessed {
                Some(ty) => ty,
                None => pointee(&address).unwrap_or_else(|_| value.clone()),
            };
            if accessed.is_span_handle() {
                span::check_assign(&mut self.code, &accessed)?;
            }
            return span::store(&mut self.code, &accessed);
        }
        let elem = match &address {
            TypeDesc::ByRef(elem) => (**elem).clone(),
            other => return Err(Error::type_mismatch(format!("indirect store through {}", other))),
        };
        if elem.is_span_handle() {
            span::check_assign(&mut self.code, &elem)?;
        }
        let value = self.code.pop()?;
        self.code.pop()?;

        if elem.is_struct() {
            self.code.invoke_virtual(VALUE_TYPE_CLASS, "copyFrom", "(Lsystem/ValueType;)V");
            return Ok(());
        }
        let kind = kind_of(&elem)?;
        if kind_of(&value)? != kind {
            return Err(Error::type_mismatch(format!("storing {} through {}", value, address)));
        }
        let (name, descriptor) = reference_setter(kind);
        self.code.invoke_virtual(REFERENCE_CLASS, name, descriptor);
        Ok(())
    }

    pub(super) fn load_indirect(&mut self, p: Option<Primitive>) -> Result<()> {
        self.load_through(p.map(TypeDesc::Primitive))
    }

    pub(super) fn store_indirect(&mut self, p: Option<Primitive>) -> Result<()> {
        self.store_through(p.map(TypeDesc::Primitive))
    }

    pub(super) fn load_object(&mut self, ty: &TypeDesc) -> Result<()> {
        let ty = self.resolver.substitute(ty)?;
        self.load_through(Some(ty))
    }

    pub(super) fn store_object(&mut self, ty: &TypeDesc) -> Result<()> {
        let ty = self.resolver.substitute(ty)?;
        self.store_through(Some(ty))
    }

    /// `initobj`: reset the value at an address to its default
    pub(super) fn init_object(&mut self, ty: &TypeDesc) -> Result<()> {
        let ty = self.resolver.substitute(ty)?;
        let address = self.code.pop()?;
        if address.is_span_handle() {
            self.code.push(address);
            return span::clear(&mut self.code);
        }
        let elem = match &address {
            TypeDesc::ByRef(elem) => (**elem).clone(),
            other => return Err(Error::type_mismatch(format!("initobj through {}", other))),
        };
        if elem.is_struct() {
            self.code.invoke_virtual(VALUE_TYPE_CLASS, "clear", "()V");
            return Ok(());
        }
        let kind = kind_of(&elem)?;
        if kind_of(&ty)? != kind && !ty.is_generic_param() {
            return Err(Error::type_mismatch(format!("initobj {} through {}", ty, address)));
        }
        let (name, descriptor) = reference_setter(kind);
        self.code.reserve_stack(1 + elem.category());
        self.code.constant(zero_of(kind));
        self.code.invoke_virtual(REFERENCE_CLASS, name, descriptor);
        Ok(())
    }

    pub(super) fn size_of(&mut self, ty: &TypeDesc) -> Result<()> {
        let ty = self.resolver.substitute(ty)?;
        span::size_of(&mut self.code, &ty)
    }

    pub(super) fn stack_alloc(&mut self) -> Result<()> {
        let size = self.code.peek(0)?;
        if !matches!(kind_of(size)?, StackKind::Int | StackKind::Long) {
            return Err(Error::type_mismatch(format!("localloc of {}", size)));
        }
        span::localloc(&mut self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untyped_pointer_has_no_pointee() {
        assert!(pointee(&TypeDesc::pointer(TypeDesc::VOID)).is_err());
        assert_eq!(pointee(&TypeDesc::pointer(TypeDesc::I32)).unwrap(), TypeDesc::I32);
        assert_eq!(stack_type(&TypeDesc::Primitive(Primitive::I16)), TypeDesc::I32);
    }
}
