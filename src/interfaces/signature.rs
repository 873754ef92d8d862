//! Interface method signature records and their comparisons

use crate::codegen::descriptor::{method_descriptor, simple_name};
use crate::error::Result;
use crate::generics::GenericResolver;
use crate::types::{generic_equal, SourceMethod, TypeDesc};

/// A method signature as seen by one contract record
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceMethod {
    /// Simple name, source qualifiers stripped
    pub name: String,
    pub return_type: TypeDesc,
    pub params: Vec<TypeDesc>,
    /// Declared shapes, before substitution
    pub declared_return: TypeDesc,
    pub declared_params: Vec<TypeDesc>,
}

impl InterfaceMethod {
    /// Build from a declaration, substituting in the resolver's current context.
    /// The method's own formals are bound to themselves for the duration.
    pub fn from_declaration(resolver: &mut GenericResolver, method: &SourceMethod) -> Result<Self> {
        let mut scope = resolver.scope();
        scope.enter_source_method(method);
        Ok(Self {
            name: simple_name(&method.name).to_string(),
            return_type: scope.substitute(&method.return_type)?,
            params: method
                .params
                .iter()
                .map(|p| scope.substitute(p))
                .collect::<Result<_>>()?,
            declared_return: method.return_type.clone(),
            declared_params: method.params.clone(),
        })
    }

    /// Name and every resolved type descriptor-equal
    pub fn plain_compare(&self, other: &InterfaceMethod) -> bool {
        self.name == other.name && self.return_type == other.return_type && self.params == other.params
    }

    /// Name equal and every declared type equal under erasure
    pub fn generic_compare(&self, other: &InterfaceMethod) -> bool {
        self.name == other.name
            && self.declared_params.len() == other.declared_params.len()
            && generic_equal(&self.declared_return, &other.declared_return)
            && self
                .declared_params
                .iter()
                .zip(&other.declared_params)
                .all(|(a, b)| generic_equal(a, b))
    }

    /// Same name and resolved parameter list
    pub fn same_slot(&self, other: &InterfaceMethod) -> bool {
        self.name == other.name && self.params == other.params
    }

    /// Descriptor the declaration erases to
    pub fn erased_descriptor(&self) -> String {
        method_descriptor(&self.declared_params, &self.declared_return)
    }

    /// Descriptor of the resolved signature
    pub fn resolved_descriptor(&self) -> String {
        method_descriptor(&self.params, &self.return_type)
    }
}

/// Linear scan for a plain-equal signature
pub fn find_method(haystack: &[InterfaceMethod], needle: &InterfaceMethod) -> Option<usize> {
    haystack.iter().position(|m| m.plain_compare(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(name: &str, ret: TypeDesc, params: Vec<TypeDesc>, declared: Vec<TypeDesc>) -> InterfaceMethod {
        InterfaceMethod {
            name: name.to_string(),
            return_type: ret.clone(),
            params,
            declared_return: ret,
            declared_params: declared,
        }
    }

    #[test]
    fn test_different_bindings_generic_equal_only() {
        let a = method("Add", TypeDesc::VOID, vec![TypeDesc::I32], vec![TypeDesc::param("T")]);
        let b = method("Add", TypeDesc::VOID, vec![TypeDesc::string()], vec![TypeDesc::param("T")]);
        assert!(!a.plain_compare(&b));
        assert!(a.generic_compare(&b));
    }

    #[test]
    fn test_find_method_uses_plain_equality() {
        let a = method("Add", TypeDesc::VOID, vec![TypeDesc::I32], vec![TypeDesc::param("T")]);
        let b = method("Add", TypeDesc::VOID, vec![TypeDesc::string()], vec![TypeDesc::param("T")]);
        let haystack = vec![b.clone(), a.clone()];
        assert_eq!(find_method(&haystack, &a), Some(1));
        assert_eq!(find_method(&haystack[..1], &a), None);
    }
}
