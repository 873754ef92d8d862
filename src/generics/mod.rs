//! Generic resolution stack
//!
//! Entering a generic type or method pushes a frame binding each formal
//! parameter to an actual argument. Lookups search frames from the top down.
//! Frames nest strictly: every push is undone by releasing the mark taken
//! just before it, normally through a `GenericScope` guard that releases on
//! every exit path.
//!
//! A binding's depth is 0 when the bound type is concrete (or the parameter
//! is bound to itself in an open definition) and `1 + depth` of the binding
//! it refers to when the argument still names an outer parameter.

use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::types::{FieldRef, MethodRef, SourceClass, SourceMethod, TypeDesc, TypeRegistry};

#[derive(Debug, Clone)]
struct Binding {
    name: String,
    ty: TypeDesc,
    depth: u32,
}

impl Binding {
    fn is_self(&self) -> bool {
        matches!(&self.ty, TypeDesc::GenericParam { name } if *name == self.name)
    }
}

/// Checkpoint of the stack depth. Consumed by `GenericResolver::release`.
#[must_use = "a mark must be released"]
#[derive(Debug)]
pub struct Mark {
    depth: usize,
}

#[derive(Debug)]
pub struct GenericResolver {
    registry: Rc<TypeRegistry>,
    frames: Vec<Vec<Binding>>,
}

impl GenericResolver {
    pub fn new(registry: Rc<TypeRegistry>) -> Self {
        Self { registry, frames: Vec::new() }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Number of frames currently pushed
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn mark(&self) -> Mark {
        Mark { depth: self.frames.len() }
    }

    /// Pop every frame pushed since `mark`
    pub fn release(&mut self, mark: Mark) {
        if mark.depth > self.frames.len() {
            log::warn!(
                "generic mark at depth {} released below it (depth {})",
                mark.depth,
                self.frames.len()
            );
        }
        self.frames.truncate(mark.depth);
    }

    /// Guard that marks now and releases when dropped
    pub fn scope(&mut self) -> GenericScope<'_> {
        let mark = self.mark();
        GenericScope {
            resolver: self,
            mark: Some(mark),
        }
    }

    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.iter().find(|b| b.name == name))
    }

    /// Bound type and depth of a parameter; unbound names are an error
    pub fn resolve(&self, name: &str) -> Result<(TypeDesc, u32)> {
        self.lookup(name)
            .map(|b| (b.ty.clone(), b.depth))
            .ok_or_else(|| Error::internal(format!("unbound generic parameter '{}'", name)))
    }

    /// Re-resolve while the binding still refers to a different bound parameter
    pub fn resolve_fully(&self, name: &str) -> Result<TypeDesc> {
        let (mut ty, mut depth) = self.resolve(name)?;
        let mut current = name.to_string();
        for _ in 0..=self.frames.len() {
            if depth == 0 {
                break;
            }
            let next = match &ty {
                TypeDesc::GenericParam { name } if *name != current => name.clone(),
                _ => break,
            };
            match self.lookup(&next) {
                Some(b) => {
                    ty = b.ty.clone();
                    depth = b.depth;
                    current = next;
                }
                None => break,
            }
        }
        Ok(ty)
    }

    /// Replace every parameter inside `ty` by its binding
    pub fn substitute(&self, ty: &TypeDesc) -> Result<TypeDesc> {
        Ok(match ty {
            TypeDesc::GenericParam { name } => self.resolve(name)?.0,
            TypeDesc::Named { name, args, value_type } => TypeDesc::Named {
                name: name.clone(),
                args: args.iter().map(|a| self.substitute(a)).collect::<Result<_>>()?,
                value_type: *value_type,
            },
            TypeDesc::Array(elem) => TypeDesc::array(self.substitute(elem)?),
            TypeDesc::ByRef(elem) => TypeDesc::byref(self.substitute(elem)?),
            TypeDesc::Pointer(elem) => TypeDesc::pointer(self.substitute(elem)?),
            TypeDesc::Primitive(_) | TypeDesc::Null => ty.clone(),
        })
    }

    fn depth_of(&self, arg: &TypeDesc) -> u32 {
        let mut params = Vec::new();
        collect_params(arg, &mut params);
        params
            .iter()
            .map(|p| match self.lookup(p) {
                Some(b) if !b.is_self() => 1 + b.depth,
                _ => 1,
            })
            .max()
            .unwrap_or(0)
    }

    /// Substitute and measure `args` in the current context, ready to be pushed
    fn prepare(&self, formals: &[String], args: &[TypeDesc]) -> Result<Vec<Binding>> {
        if formals.len() != args.len() {
            return Err(Error::internal(format!(
                "generic arity mismatch: {} formals, {} arguments",
                formals.len(),
                args.len()
            )));
        }
        formals
            .iter()
            .zip(args)
            .map(|(formal, arg)| {
                let open_self = matches!(arg, TypeDesc::GenericParam { name } if name == formal)
                    && self.lookup(formal).is_none();
                if open_self {
                    return Ok(Binding { name: formal.clone(), ty: arg.clone(), depth: 0 });
                }
                Ok(Binding {
                    name: formal.clone(),
                    ty: self.substitute(arg)?,
                    depth: self.depth_of(arg),
                })
            })
            .collect()
    }

    fn open_bindings(formals: &[String]) -> Vec<Binding> {
        formals
            .iter()
            .map(|f| Binding { name: f.clone(), ty: TypeDesc::param(f), depth: 0 })
            .collect()
    }

    /// Bind a type's formals. Non-generic types push nothing.
    pub fn enter_type(&mut self, ty: &TypeDesc) -> Result<TypeDesc> {
        let (name, args) = match ty {
            TypeDesc::Named { name, args, .. } => (name, args),
            other => return self.substitute(other),
        };
        let formals = match self.registry.get(name) {
            Some(class) if !class.generic_params.is_empty() => class.generic_params.clone(),
            _ => return self.substitute(ty),
        };
        let bindings = if args.is_empty() {
            Self::open_bindings(&formals)
        } else {
            self.prepare(&formals, args)?
        };
        let actual: Vec<TypeDesc> = bindings.iter().map(|b| b.ty.clone()).collect();
        log::trace!("enter type {} at depth {}", ty, self.frames.len());
        self.frames.push(bindings);
        Ok(ty.with_args(actual))
    }

    /// A class from inside its own definition
    pub fn enter_class(&mut self, class: &SourceClass) -> Result<TypeDesc> {
        self.enter_type(&class.open_type())
    }

    /// Bind the declaring type and the method's own formals; returns the call
    /// site's view with every declared type substituted
    pub fn enter_method(&mut self, method: &MethodRef) -> Result<MethodRef> {
        let own = if method.generic_params.is_empty() {
            None
        } else if method.generic_args.is_empty() {
            Some(Self::open_bindings(&method.generic_params))
        } else {
            Some(self.prepare(&method.generic_params, &method.generic_args)?)
        };
        let declaring = self.enter_type(&method.declaring)?;
        let generic_args = match own {
            Some(bindings) => {
                let args = bindings.iter().map(|b| b.ty.clone()).collect();
                self.frames.push(bindings);
                args
            }
            None => Vec::new(),
        };
        Ok(MethodRef {
            declaring,
            name: method.name.clone(),
            generic_params: method.generic_params.clone(),
            generic_args,
            params: method.params.iter().map(|p| self.substitute(p)).collect::<Result<_>>()?,
            return_type: self.substitute(&method.return_type)?,
            has_this: method.has_this,
            is_virtual: method.is_virtual,
        })
    }

    /// A method definition from inside its own body: formals bound to themselves
    pub fn enter_source_method(&mut self, method: &SourceMethod) {
        if !method.generic_params.is_empty() {
            self.frames.push(Self::open_bindings(&method.generic_params));
        }
    }

    /// `enter_method` in a scope of its own
    pub fn resolve_method(&mut self, method: &MethodRef) -> Result<MethodRef> {
        let mut scope = self.scope();
        scope.enter_method(method)
    }

    /// Declaring type and field type as seen from the current context
    pub fn resolve_field(&mut self, field: &FieldRef) -> Result<(TypeDesc, TypeDesc)> {
        let mut scope = self.scope();
        let declaring = scope.enter_type(&field.declaring)?;
        let field_type = scope.substitute(&field.field_type)?;
        Ok((declaring, field_type))
    }
}

fn collect_params(ty: &TypeDesc, out: &mut Vec<String>) {
    match ty {
        TypeDesc::GenericParam { name } => out.push(name.clone()),
        TypeDesc::Named { args, .. } => args.iter().for_each(|a| collect_params(a, out)),
        TypeDesc::Array(elem) | TypeDesc::ByRef(elem) | TypeDesc::Pointer(elem) => collect_params(elem, out),
        TypeDesc::Primitive(_) | TypeDesc::Null => {}
    }
}

/// Marks on creation, releases on drop; derefs to the resolver
pub struct GenericScope<'a> {
    resolver: &'a mut GenericResolver,
    mark: Option<Mark>,
}

impl Deref for GenericScope<'_> {
    type Target = GenericResolver;

    fn deref(&self) -> &GenericResolver {
        self.resolver
    }
}

impl DerefMut for GenericScope<'_> {
    fn deref_mut(&mut self) -> &mut GenericResolver {
        self.resolver
    }
}

impl Drop for GenericScope<'_> {
    fn drop(&mut self) {
        if let Some(mark) = self.mark.take() {
            self.resolver.release(mark);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Rc<TypeRegistry> {
        Rc::new(
            TypeRegistry::new("test")
                .with(SourceClass::new("Outer`1").with_generic_params(&["T"]))
                .with(SourceClass::new("Inner`1").with_generic_params(&["U"]))
                .with(SourceClass::new("Plain")),
        )
    }

    #[test]
    fn test_mark_release_is_noop() {
        let mut r = GenericResolver::new(registry());
        r.enter_type(&TypeDesc::generic("Outer`1", vec![TypeDesc::I32])).unwrap();
        let before = r.resolve("T").unwrap();
        let mark = r.mark();
        r.release(mark);
        assert_eq!(r.depth(), 1);
        assert_eq!(r.resolve("T").unwrap(), before);
    }

    #[test]
    fn test_unbound_parameter_fails() {
        let r = GenericResolver::new(registry());
        assert!(r.resolve("T").is_err());
        assert!(r.substitute(&TypeDesc::array(TypeDesc::param("T"))).is_err());
    }

    #[test]
    fn test_non_generic_type_pushes_nothing() {
        let mut r = GenericResolver::new(registry());
        let t = r.enter_type(&TypeDesc::named("Plain")).unwrap();
        assert_eq!(t, TypeDesc::named("Plain"));
        assert_eq!(r.depth(), 0);
    }

    #[test]
    fn test_scope_releases_on_error_path() {
        fn failing(r: &mut GenericResolver) -> Result<()> {
            let mut scope = r.scope();
            scope.enter_type(&TypeDesc::generic("Outer`1", vec![TypeDesc::I32]))?;
            scope.resolve("Missing")?;
            Ok(())
        }
        let mut r = GenericResolver::new(registry());
        assert!(failing(&mut r).is_err());
        assert_eq!(r.depth(), 0);
    }

    #[test]
    fn test_nested_open_binding_depth() {
        let mut r = GenericResolver::new(registry());
        r.enter_type(&TypeDesc::named("Outer`1")).unwrap();
        assert_eq!(r.resolve("T").unwrap(), (TypeDesc::param("T"), 0));
        r.enter_type(&TypeDesc::generic("Inner`1", vec![TypeDesc::param("T")])).unwrap();
        assert_eq!(r.resolve("U").unwrap(), (TypeDesc::param("T"), 1));
        assert_eq!(r.resolve_fully("U").unwrap(), TypeDesc::param("T"));
    }

    #[test]
    fn test_method_args_resolve_in_caller_context() {
        let mut r = GenericResolver::new(registry());
        r.enter_type(&TypeDesc::generic("Outer`1", vec![TypeDesc::string()])).unwrap();
        let m = MethodRef::instance(
            TypeDesc::generic("Outer`1", vec![TypeDesc::I32]),
            "Map",
            vec![TypeDesc::param("T"), TypeDesc::param("M")],
            TypeDesc::param("M"),
        )
        .with_generic_args(&["M"], vec![TypeDesc::param("T")]);
        let resolved = r.resolve_method(&m).unwrap();
        assert_eq!(resolved.params, vec![TypeDesc::I32, TypeDesc::string()]);
        assert_eq!(resolved.return_type, TypeDesc::string());
        assert_eq!(r.depth(), 1);
    }
}
