//! Type tests, casts, boxing, and the erasure boundary between generic
//! declarations and the concrete types seen at a use site

use crate::codegen::code::kind_of;
use crate::codegen::descriptor::{box_class, box_method_descriptor, class_name, unbox_method};
use crate::codegen::{opcodes, Code, Const};
use crate::consts::{OBJECT_CLASS, REFERENCE_CLASS, VALUE_TYPE_CLASS};
use crate::error::{Error, Result};
use crate::types::{Primitive, TypeDesc};

use super::translator::{kind_descriptor, MethodTranslator};

/// What a value needs when it crosses from a declared (possibly erased)
/// type to the resolved type of a use site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Erasure {
    /// Same representation on both sides
    Same,
    /// Declared as an open parameter, concrete primitive at the use site
    Boxed(Primitive),
    /// Declared as an open parameter, a narrower reference at the use site
    Cast,
}

pub(super) fn erasure(declared: &TypeDesc, actual: &TypeDesc) -> Result<Erasure> {
    if declared.is_generic_param() {
        return Ok(match actual {
            TypeDesc::Primitive(p) => Erasure::Boxed(*p),
            TypeDesc::GenericParam { .. } | TypeDesc::Null => Erasure::Same,
            other if class_name(other) == OBJECT_CLASS => Erasure::Same,
            _ => Erasure::Cast,
        });
    }
    if let (TypeDesc::Array(d), TypeDesc::Array(a)) = (declared, actual) {
        if d.is_open() && a.as_primitive().is_some() {
            return Err(Error::unsupported(format!(
                "array of open element type {} used as {}",
                declared, actual
            )));
        }
    }
    Ok(Erasure::Same)
}

/// Primitive on the stack -> its box object
pub(super) fn box_primitive(code: &mut Code, p: Primitive) {
    code.invoke_static(box_class(p), "valueOf", box_method_descriptor(p));
}

/// Box object on the stack -> primitive
pub(super) fn unbox_primitive(code: &mut Code, p: Primitive) {
    let owner = box_class(p);
    let (name, descriptor) = unbox_method(p);
    code.type_op(opcodes::CHECKCAST, owner);
    code.invoke_virtual(owner, name, descriptor);
}

/// Value of the use-site type on the stack, passed where the declaration erases
pub(super) fn to_erased(code: &mut Code, erasure: Erasure) {
    if let Erasure::Boxed(p) = erasure {
        box_primitive(code, p);
    }
}

/// Erased value on the stack, wanted as the use-site type `actual`
pub(super) fn from_erased(code: &mut Code, erasure: Erasure, actual: &TypeDesc) {
    match erasure {
        Erasure::Same => {}
        Erasure::Boxed(p) => unbox_primitive(code, p),
        Erasure::Cast => code.type_op(opcodes::CHECKCAST, class_name(actual)),
    }
}

impl MethodTranslator<'_> {
    pub(super) fn is_instance(&mut self, ty: &TypeDesc) -> Result<()> {
        let ty = self.resolver.substitute(ty)?;
        let value = self.pop_reference()?;
        self.code.push(value);
        let class = class_name(&ty);
        let ok = self.code.new_label();
        self.code.reserve_stack(1);
        self.code.op(opcodes::DUP);
        self.code.type_op(opcodes::INSTANCEOF, class.clone());
        self.code.record_frame(ok)?;
        self.code.jump(opcodes::IFNE, ok);
        self.code.op(opcodes::POP);
        self.code.constant(Const::Null);
        self.code.replace_top(TypeDesc::Null)?;
        self.code.record_frame(ok)?;
        self.code.place(ok);
        self.code.load_frame(ok);
        self.code.type_op(opcodes::CHECKCAST, class);
        self.code.replace_top(ty)?;
        Ok(())
    }

    pub(super) fn cast_class(&mut self, ty: &TypeDesc) -> Result<()> {
        let ty = self.resolver.substitute(ty)?;
        self.pop_reference()?;
        self.code.type_op(opcodes::CHECKCAST, class_name(&ty));
        self.code.push(ty);
        Ok(())
    }

    pub(super) fn box_value(&mut self, ty: &TypeDesc) -> Result<()> {
        let ty = self.resolver.substitute(ty)?;
        let value = self.code.pop()?;
        match &ty {
            TypeDesc::Primitive(p) => box_primitive(&mut self.code, *p),
            _ if ty.is_struct() => {
                self.code.invoke_static(VALUE_TYPE_CLASS, "copy", "(Ljava/lang/Object;)Ljava/lang/Object;");
            }
            _ if value.is_span_handle() => super::span::box_handle(&mut self.code),
            _ => {}
        }
        self.code.push(TypeDesc::object());
        Ok(())
    }

    /// `unbox.any`: the value itself
    pub(super) fn unbox_any(&mut self, ty: &TypeDesc) -> Result<()> {
        let ty = self.resolver.substitute(ty)?;
        self.pop_reference()?;
        match &ty {
            TypeDesc::Primitive(p) => unbox_primitive(&mut self.code, *p),
            TypeDesc::GenericParam { .. } => {}
            _ => self.code.type_op(opcodes::CHECKCAST, class_name(&ty)),
        }
        self.code.push(ty);
        Ok(())
    }

    /// `unbox`: an address of the boxed value
    pub(super) fn unbox_address(&mut self, ty: &TypeDesc) -> Result<()> {
        let ty = self.resolver.substitute(ty)?;
        self.pop_reference()?;
        match &ty {
            TypeDesc::Primitive(p) => {
                self.code.reserve_stack(2);
                unbox_primitive(&mut self.code, *p);
                self.code.invoke_static(
                    REFERENCE_CLASS,
                    "box",
                    format!("({})Lsystem/Reference;", kind_descriptor(kind_of(&ty)?)),
                );
            }
            _ if ty.is_struct() => self.code.type_op(opcodes::CHECKCAST, class_name(&ty)),
            _ => return Err(Error::unsupported(format!("unbox to reference type {}", ty))),
        }
        self.code.push(TypeDesc::byref(ty));
        Ok(())
    }

    pub(super) fn pop_reference(&mut self) -> Result<TypeDesc> {
        let value = self.code.pop()?;
        if !value.is_reference() {
            return Err(Error::type_mismatch(format!("expected a reference, found {}", value)));
        }
        Ok(value)
    }
}
