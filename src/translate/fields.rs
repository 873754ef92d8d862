//! Instance and static field access
//!
//! Descriptors always use the declared field type, so a field declared
//! with a generic parameter is accessed as `Object` and converted at the
//! boundary. Statics of generic instantiations live in a per-instantiation
//! holder object reached through a local set up by the prologue.

use crate::codegen::descriptor::{class_name, field_descriptor};
use crate::codegen::{opcodes, Const};
use crate::consts::REFERENCE_CLASS;
use crate::error::{Error, Result};
use crate::types::{FieldRef, TypeDesc};

use super::casts::{erasure, from_erased, to_erased, Erasure};
use super::translator::{static_holder, MethodTranslator};

/// Where a static field lives
enum StaticHome {
    Class(String),
    Holder { slot: u16, class: String },
}

impl MethodTranslator<'_> {
    fn static_home(&self, declaring: &TypeDesc, field: &FieldRef) -> Result<StaticHome> {
        if !self.resolver.registry().is_generic_definition(&field.declaring) {
            return Ok(StaticHome::Class(class_name(declaring)));
        }
        match self.static_data_slot(declaring) {
            Some(slot) => Ok(StaticHome::Holder { slot, class: static_holder(declaring) }),
            None => Err(Error::internal(format!("no static data local for {}", declaring))),
        }
    }

    fn pop_receiver(&mut self, field: &FieldRef) -> Result<()> {
        let receiver = self.code.pop()?;
        if !receiver.is_reference() {
            return Err(Error::type_mismatch(format!(
                "field {} accessed on a value of type {}",
                field.name, receiver
            )));
        }
        Ok(())
    }

    pub(super) fn load_field(&mut self, field: &FieldRef) -> Result<()> {
        let (declaring, field_type) = self.resolver.resolve_field(field)?;
        let boundary = erasure(&field.field_type, &field_type)?;
        self.pop_receiver(field)?;
        self.code.reserve_stack(field_type.category());
        self.code.field(
            opcodes::GETFIELD,
            class_name(&declaring),
            field.name.clone(),
            field_descriptor(&field.field_type),
        );
        from_erased(&mut self.code, boundary, &field_type);
        self.code.push(field_type);
        Ok(())
    }

    pub(super) fn store_field(&mut self, field: &FieldRef) -> Result<()> {
        let (declaring, field_type) = self.resolver.resolve_field(field)?;
        let boundary = erasure(&field.field_type, &field_type)?;
        if field_type.is_span_handle() {
            super::span::check_assign(&mut self.code, &field_type)?;
        }
        self.code.pop()?;
        to_erased(&mut self.code, boundary);
        self.pop_receiver(field)?;
        self.code.field(
            opcodes::PUTFIELD,
            class_name(&declaring),
            field.name.clone(),
            field_descriptor(&field.field_type),
        );
        Ok(())
    }

    pub(super) fn load_field_address(&mut self, field: &FieldRef) -> Result<()> {
        let (declaring, field_type) = self.resolver.resolve_field(field)?;
        self.pop_receiver(field)?;
        if field_type.is_struct() {
            self.code.field(
                opcodes::GETFIELD,
                class_name(&declaring),
                field.name.clone(),
                field_descriptor(&field.field_type),
            );
        } else {
            self.code.reserve_stack(2);
            self.code.constant(Const::String(field.name.clone()));
            self.code.invoke_static(
                REFERENCE_CLASS,
                "ofField",
                "(Ljava/lang/Object;Ljava/lang/String;)Lsystem/Reference;",
            );
        }
        self.code.push(TypeDesc::byref(field_type));
        Ok(())
    }

    pub(super) fn load_static_field(&mut self, field: &FieldRef) -> Result<()> {
        let (declaring, field_type) = self.resolver.resolve_field(field)?;
        let boundary = erasure(&field.field_type, &field_type)?;
        let descriptor = field_descriptor(&field.field_type);
        self.code.reserve_stack(field_type.category().max(1));
        match self.static_home(&declaring, field)? {
            StaticHome::Class(owner) => self.code.field(opcodes::GETSTATIC, owner, field.name.clone(), descriptor),
            StaticHome::Holder { slot, class } => {
                self.code.local(opcodes::ALOAD, slot);
                self.code.field(opcodes::GETFIELD, class, field.name.clone(), descriptor);
            }
        }
        from_erased(&mut self.code, boundary, &field_type);
        self.code.push(field_type);
        Ok(())
    }

    pub(super) fn store_static_field(&mut self, field: &FieldRef) -> Result<()> {
        let (declaring, field_type) = self.resolver.resolve_field(field)?;
        let boundary = erasure(&field.field_type, &field_type)?;
        if field_type.is_span_handle() {
            super::span::check_assign(&mut self.code, &field_type)?;
        }
        let value = self.code.pop()?;
        to_erased(&mut self.code, boundary);
        let descriptor = field_descriptor(&field.field_type);
        match self.static_home(&declaring, field)? {
            StaticHome::Class(owner) => self.code.field(opcodes::PUTSTATIC, owner, field.name.clone(), descriptor),
            StaticHome::Holder { slot, class } => {
                self.code.reserve_stack(1);
                self.code.local(opcodes::ALOAD, slot);
                let width = if matches!(boundary, Erasure::Boxed(_)) { 1 } else { value.category() };
                if width == 2 {
                    self.code.op(opcodes::DUP_X2);
                    self.code.op(opcodes::POP);
                } else {
                    self.code.op(opcodes::SWAP);
                }
                self.code.field(opcodes::PUTFIELD, class, field.name.clone(), descriptor);
            }
        }
        Ok(())
    }

    pub(super) fn load_static_field_address(&mut self, field: &FieldRef) -> Result<()> {
        let (declaring, field_type) = self.resolver.resolve_field(field)?;
        let descriptor = field_descriptor(&field.field_type);
        self.code.reserve_stack(2);
        match (self.static_home(&declaring, field)?, field_type.is_struct()) {
            (StaticHome::Class(owner), true) => {
                self.code.field(opcodes::GETSTATIC, owner, field.name.clone(), descriptor)
            }
            (StaticHome::Holder { slot, class }, true) => {
                self.code.local(opcodes::ALOAD, slot);
                self.code.field(opcodes::GETFIELD, class, field.name.clone(), descriptor);
            }
            (StaticHome::Class(owner), false) => {
                self.code.constant(Const::Class(owner));
                self.code.constant(Const::String(field.name.clone()));
                self.code.invoke_static(
                    REFERENCE_CLASS,
                    "ofStaticField",
                    "(Ljava/lang/Class;Ljava/lang/String;)Lsystem/Reference;",
                );
            }
            (StaticHome::Holder { slot, .. }, false) => {
                self.code.local(opcodes::ALOAD, slot);
                self.code.constant(Const::String(field.name.clone()));
                self.code.invoke_static(
                    REFERENCE_CLASS,
                    "ofField",
                    "(Ljava/lang/Object;Ljava/lang/String;)Lsystem/Reference;",
                );
            }
        }
        self.code.push(TypeDesc::byref(field_type));
        Ok(())
    }
}
