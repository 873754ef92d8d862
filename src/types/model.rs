//! Source metadata: classes, fields, methods and member references

use crate::consts::{CONSTRUCTOR, TYPE_INITIALIZER};
use crate::sbil::MethodBody;

use super::TypeDesc;

#[derive(Debug, Clone, PartialEq)]
pub struct SourceField {
    pub name: String,
    pub field_type: TypeDesc,
    pub is_static: bool,
}

impl SourceField {
    pub fn instance(name: impl Into<String>, field_type: TypeDesc) -> Self {
        Self { name: name.into(), field_type, is_static: false }
    }

    pub fn static_field(name: impl Into<String>, field_type: TypeDesc) -> Self {
        Self { name: name.into(), field_type, is_static: true }
    }
}

#[derive(Debug, Clone)]
pub struct SourceMethod {
    pub name: String,
    pub generic_params: Vec<String>,
    pub params: Vec<TypeDesc>,
    pub return_type: TypeDesc,
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_abstract: bool,
    pub body: Option<MethodBody>,
}

impl SourceMethod {
    pub fn instance(name: impl Into<String>, params: Vec<TypeDesc>, return_type: TypeDesc) -> Self {
        Self {
            name: name.into(),
            generic_params: Vec::new(),
            params,
            return_type,
            is_static: false,
            is_virtual: false,
            is_abstract: false,
            body: None,
        }
    }

    pub fn static_method(name: impl Into<String>, params: Vec<TypeDesc>, return_type: TypeDesc) -> Self {
        Self {
            is_static: true,
            ..Self::instance(name, params, return_type)
        }
    }

    /// Abstract virtual slot, as declared by interfaces
    pub fn abstract_method(name: impl Into<String>, params: Vec<TypeDesc>, return_type: TypeDesc) -> Self {
        Self {
            is_virtual: true,
            is_abstract: true,
            ..Self::instance(name, params, return_type)
        }
    }

    pub fn with_generic_params(mut self, names: &[&str]) -> Self {
        self.generic_params = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_virtual(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    pub fn with_body(mut self, body: MethodBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR
    }

    pub fn is_type_initializer(&self) -> bool {
        self.name == TYPE_INITIALIZER
    }
}

#[derive(Debug, Clone)]
pub struct SourceClass {
    pub name: String,
    pub generic_params: Vec<String>,
    pub base: Option<TypeDesc>,
    pub interfaces: Vec<TypeDesc>,
    pub is_interface: bool,
    pub is_value_type: bool,
    pub fields: Vec<SourceField>,
    pub methods: Vec<SourceMethod>,
}

impl SourceClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generic_params: Vec::new(),
            base: Some(TypeDesc::object()),
            interfaces: Vec::new(),
            is_interface: false,
            is_value_type: false,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            base: None,
            is_interface: true,
            ..Self::new(name)
        }
    }

    pub fn value_type(name: impl Into<String>) -> Self {
        Self {
            is_value_type: true,
            ..Self::new(name)
        }
    }

    pub fn with_generic_params(mut self, names: &[&str]) -> Self {
        self.generic_params = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn extends(mut self, base: TypeDesc) -> Self {
        self.base = Some(base);
        self
    }

    pub fn implements(mut self, interface: TypeDesc) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn field(mut self, field: SourceField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn method(mut self, method: SourceMethod) -> Self {
        self.methods.push(method);
        self
    }

    /// The type as seen from inside its own definition: formals bound to themselves
    pub fn open_type(&self) -> TypeDesc {
        TypeDesc::Named {
            name: self.name.clone(),
            args: self.generic_params.iter().map(TypeDesc::param).collect(),
            value_type: self.is_value_type,
        }
    }

    pub fn find_field(&self, name: &str) -> Option<&SourceField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A call site's view of a method
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRef {
    pub declaring: TypeDesc,
    pub name: String,
    /// Formal names of the method's own generic parameters
    pub generic_params: Vec<String>,
    /// Actual arguments for those parameters at this call site
    pub generic_args: Vec<TypeDesc>,
    /// Declared parameter types, in terms of the declaring type's and the method's formals
    pub params: Vec<TypeDesc>,
    pub return_type: TypeDesc,
    pub has_this: bool,
    pub is_virtual: bool,
}

impl MethodRef {
    pub fn instance(
        declaring: TypeDesc,
        name: impl Into<String>,
        params: Vec<TypeDesc>,
        return_type: TypeDesc,
    ) -> Self {
        Self {
            declaring,
            name: name.into(),
            generic_params: Vec::new(),
            generic_args: Vec::new(),
            params,
            return_type,
            has_this: true,
            is_virtual: false,
        }
    }

    pub fn static_call(
        declaring: TypeDesc,
        name: impl Into<String>,
        params: Vec<TypeDesc>,
        return_type: TypeDesc,
    ) -> Self {
        Self {
            has_this: false,
            ..Self::instance(declaring, name, params, return_type)
        }
    }

    pub fn constructor(declaring: TypeDesc, params: Vec<TypeDesc>) -> Self {
        Self::instance(declaring, CONSTRUCTOR, params, TypeDesc::VOID)
    }

    pub fn with_virtual(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    pub fn with_generic_args(mut self, formals: &[&str], args: Vec<TypeDesc>) -> Self {
        self.generic_params = formals.iter().map(|n| n.to_string()).collect();
        self.generic_args = args;
        self
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRef {
    pub declaring: TypeDesc,
    pub name: String,
    /// Declared type, in terms of the declaring type's formals
    pub field_type: TypeDesc,
    pub is_static: bool,
}

impl FieldRef {
    pub fn instance(declaring: TypeDesc, name: impl Into<String>, field_type: TypeDesc) -> Self {
        Self { declaring, name: name.into(), field_type, is_static: false }
    }

    pub fn static_field(declaring: TypeDesc, name: impl Into<String>, field_type: TypeDesc) -> Self {
        Self { declaring, name: name.into(), field_type, is_static: true }
    }
}
