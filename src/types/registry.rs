//! Index of the source assembly's type definitions

use std::collections::HashMap;

use super::{SourceClass, TypeDesc};

/// Type definitions of one assembly, in declaration order
#[derive(Debug, Default)]
pub struct TypeRegistry {
    assembly: String,
    classes: Vec<SourceClass>,
    by_name: HashMap<String, usize>,
}

impl TypeRegistry {
    pub fn new(assembly: impl Into<String>) -> Self {
        Self {
            assembly: assembly.into(),
            classes: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn assembly(&self) -> &str {
        &self.assembly
    }

    /// Add a definition; a later definition with the same name replaces the earlier one
    pub fn add(&mut self, class: SourceClass) {
        match self.by_name.get(&class.name) {
            Some(&index) => self.classes[index] = class,
            None => {
                self.by_name.insert(class.name.clone(), self.classes.len());
                self.classes.push(class);
            }
        }
    }

    pub fn with(mut self, class: SourceClass) -> Self {
        self.add(class);
        self
    }

    pub fn get(&self, name: &str) -> Option<&SourceClass> {
        self.by_name.get(name).map(|&i| &self.classes[i])
    }

    /// Definition behind a named descriptor
    pub fn lookup(&self, ty: &TypeDesc) -> Option<&SourceClass> {
        match ty {
            TypeDesc::Named { name, .. } => self.get(name),
            _ => None,
        }
    }

    pub fn classes(&self) -> impl Iterator<Item = &SourceClass> {
        self.classes.iter()
    }

    pub fn is_interface(&self, ty: &TypeDesc) -> bool {
        self.lookup(ty).map(|c| c.is_interface).unwrap_or(false)
    }

    /// Declared with formal generic parameters
    pub fn is_generic_definition(&self, ty: &TypeDesc) -> bool {
        self.lookup(ty).map(|c| !c.generic_params.is_empty()).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_keeps_order() {
        let mut registry = TypeRegistry::new("asm");
        registry.add(SourceClass::new("A"));
        registry.add(SourceClass::interface("I"));
        registry.add(SourceClass::new("A").implements(TypeDesc::named("I")));
        let names: Vec<_> = registry.classes().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "I"]);
        assert_eq!(registry.get("A").map(|c| c.interfaces.len()), Some(1));
        assert!(registry.is_interface(&TypeDesc::named("I")));
    }
}
