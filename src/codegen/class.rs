//! Target class structures: TargetClass, TargetField, TargetMethod

use crate::types::{SourceClass, SourceField, SourceMethod};

use super::code::Code;
use super::descriptor::{class_name, field_descriptor, method_descriptor, method_name};

/// Access and property flags
pub mod access_flags {
    pub const ACC_PUBLIC: u16 = 0x0001;
    pub const ACC_STATIC: u16 = 0x0008;
    pub const ACC_FINAL: u16 = 0x0010;
    pub const ACC_SUPER: u16 = 0x0020;
    pub const ACC_BRIDGE: u16 = 0x0040;
    pub const ACC_INTERFACE: u16 = 0x0200;
    pub const ACC_ABSTRACT: u16 = 0x0400;
    pub const ACC_SYNTHETIC: u16 = 0x1000;
}

use access_flags::*;

#[derive(Debug, Clone, PartialEq)]
pub struct TargetField {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
}

#[derive(Debug)]
pub struct TargetMethod {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub code: Option<Code>,
}

impl TargetMethod {
    pub fn new(access_flags: u16, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access_flags,
            name: name.into(),
            descriptor: descriptor.into(),
            code: None,
        }
    }

    /// Empty slot for a source method: erased name, descriptor and flags
    pub fn from_source(method: &SourceMethod) -> Self {
        let mut flags = ACC_PUBLIC;
        if method.is_static {
            flags |= ACC_STATIC;
        }
        if method.is_abstract {
            flags |= ACC_ABSTRACT;
        }
        Self::new(
            flags,
            method_name(&method.name),
            method_descriptor(&method.params, &method.return_type),
        )
    }

    pub fn is_bridge(&self) -> bool {
        self.access_flags & ACC_BRIDGE != 0
    }
}

#[derive(Debug)]
pub struct TargetClass {
    pub access_flags: u16,
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<TargetField>,
    pub methods: Vec<TargetMethod>,
}

impl TargetClass {
    /// Class skeleton with erased fields and empty method slots
    pub fn from_source(class: &SourceClass) -> Self {
        let mut flags = ACC_PUBLIC;
        if class.is_interface {
            flags |= ACC_INTERFACE | ACC_ABSTRACT;
        } else {
            flags |= ACC_SUPER;
        }
        if class.is_value_type {
            flags |= ACC_FINAL;
        }
        Self {
            access_flags: flags,
            name: class_name(&class.open_type()),
            super_name: class.base.as_ref().map(class_name),
            interfaces: class.interfaces.iter().map(class_name).collect(),
            fields: class.fields.iter().map(target_field).collect(),
            methods: class.methods.iter().map(TargetMethod::from_source).collect(),
        }
    }

    pub fn add_field(&mut self, access_flags: u16, name: impl Into<String>, descriptor: impl Into<String>) {
        self.fields.push(TargetField {
            access_flags,
            name: name.into(),
            descriptor: descriptor.into(),
        });
    }

    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&TargetMethod> {
        self.methods.iter().find(|m| m.name == name && m.descriptor == descriptor)
    }
}

fn target_field(field: &SourceField) -> TargetField {
    let mut flags = ACC_PUBLIC;
    if field.is_static {
        flags |= ACC_STATIC;
    }
    TargetField {
        access_flags: flags,
        name: field.name.clone(),
        descriptor: field_descriptor(&field.field_type),
    }
}
