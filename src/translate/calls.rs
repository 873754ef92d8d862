//! Calls, object construction and function pointers

use crate::codegen::code::{kind_of, load_op, store_op};
use crate::codegen::descriptor::{class_name, method_descriptor, method_name};
use crate::codegen::{opcodes, Const};
use crate::consts::{METHOD_POINTER_CLASS, SOURCE_METHOD_POINTER};
use crate::error::{Error, Result};
use crate::types::{MethodRef, TypeDesc};

use super::casts::{erasure, from_erased, to_erased, Erasure};
use super::translator::MethodTranslator;

/// Argument values parked in scratch locals, in push order
struct Spilled {
    mark: u16,
    values: Vec<(u16, TypeDesc)>,
}

impl MethodTranslator<'_> {
    /// Adapt the value on top of the stack to a parameter
    fn coerce_top(&mut self, param: &TypeDesc, boundary: Erasure) -> Result<()> {
        if param.is_span_handle() {
            super::span::check_assign(&mut self.code, param)?;
        }
        if let Erasure::Boxed(_) = boundary {
            to_erased(&mut self.code, boundary);
            self.code.replace_top(TypeDesc::object())?;
        }
        Ok(())
    }

    fn needs_coercion(&self, value: &TypeDesc, param: &TypeDesc, boundary: Erasure) -> bool {
        boundary != Erasure::Same || (param.is_span_handle() && value != param)
    }

    fn spill(&mut self, count: usize) -> Result<Spilled> {
        let mark = self.locals.temp_mark();
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            let ty = self.code.pop()?;
            let slot = self.locals.alloc_temp(&ty);
            self.code.local(store_op(kind_of(&ty)?), slot);
            values.push((slot, ty));
        }
        values.reverse();
        Ok(Spilled { mark, values })
    }

    fn reload(&mut self, spilled: Spilled, params: &[TypeDesc], boundaries: &[Erasure]) -> Result<()> {
        for (i, (slot, ty)) in spilled.values.into_iter().enumerate() {
            self.code.local(load_op(kind_of(&ty)?), slot);
            self.code.push(ty);
            self.coerce_top(&params[i], boundaries[i])?;
        }
        self.locals.release_temps(spilled.mark);
        Ok(())
    }

    /// Box/cast the `params.len()` arguments on top of the stack
    fn coerce_args(&mut self, params: &[TypeDesc], boundaries: &[Erasure]) -> Result<()> {
        let n = params.len();
        let mut first = None;
        for i in 0..n {
            let value = self.code.peek(n - 1 - i)?;
            if self.needs_coercion(value, &params[i], boundaries[i]) {
                first = Some(i);
                break;
            }
        }
        match first {
            None => Ok(()),
            Some(i) if i == n - 1 => self.coerce_top(&params[i], boundaries[i]),
            Some(i) => {
                let spilled = self.spill(n - i)?;
                self.reload(spilled, &params[i..], &boundaries[i..])
            }
        }
    }

    fn boundaries(&self, method: &MethodRef, resolved: &MethodRef) -> Result<Vec<Erasure>> {
        method
            .params
            .iter()
            .zip(&resolved.params)
            .map(|(declared, actual)| erasure(declared, actual))
            .collect()
    }

    fn push_result(&mut self, method: &MethodRef, resolved: &MethodRef) -> Result<()> {
        if resolved.return_type.is_void() {
            return Ok(());
        }
        let boundary = erasure(&method.return_type, &resolved.return_type)?;
        self.code.reserve_stack(resolved.return_type.category());
        from_erased(&mut self.code, boundary, &resolved.return_type);
        self.code.push(resolved.return_type.clone());
        Ok(())
    }

    /// Constructor call on the instance under construction: `Some(true)` when
    /// it targets the base class, `Some(false)` when it delegates to a
    /// sibling constructor of the same class
    fn chained_constructor(&self, method: &MethodRef) -> Option<bool> {
        if !self.method.is_constructor() || self.constructed || !method.is_constructor() {
            return None;
        }
        let callee = method.declaring.name();
        if self.class.base.as_ref().map(TypeDesc::name).as_ref() == Some(&callee) {
            Some(true)
        } else if callee == self.class.name {
            Some(false)
        } else {
            None
        }
    }

    pub(super) fn call(&mut self, method: &MethodRef, virtual_dispatch: bool) -> Result<()> {
        let resolved = self.resolver.resolve_method(method)?;
        let boundaries = self.boundaries(method, &resolved)?;
        self.coerce_args(&resolved.params, &boundaries)?;

        let args = self.code.pop_n(method.params.len())?;
        log::trace!("call {}::{} with {:?}", resolved.declaring, method.name, args);
        if method.has_this {
            self.pop_reference()?;
        }

        let is_interface = self.resolver.registry().is_interface(&method.declaring);
        let op = if !method.has_this {
            opcodes::INVOKESTATIC
        } else if method.is_constructor() {
            opcodes::INVOKESPECIAL
        } else if virtual_dispatch || !method.is_virtual {
            if is_interface {
                opcodes::INVOKEINTERFACE
            } else {
                opcodes::INVOKEVIRTUAL
            }
        } else {
            // non-virtual call of a virtual method: base.M()
            opcodes::INVOKESPECIAL
        };
        self.code.invoke(
            op,
            class_name(&resolved.declaring),
            method_name(&method.name),
            method_descriptor(&method.params, &method.return_type),
        );
        self.push_result(method, &resolved)?;

        match self.chained_constructor(method) {
            Some(true) => self.after_base_constructor()?,
            // the delegated constructor has set the instance up
            Some(false) => self.constructed = true,
            None => {}
        }
        Ok(())
    }

    pub(super) fn new_object(&mut self, method: &MethodRef) -> Result<()> {
        if !method.is_constructor() {
            return Err(Error::internal(format!("newobj of non-constructor {}", method.name)));
        }
        let resolved = self.resolver.resolve_method(method)?;
        let boundaries = self.boundaries(method, &resolved)?;
        let class = class_name(&resolved.declaring);

        let spilled = self.spill(method.params.len())?;
        self.code.reserve_stack(2);
        self.code.type_op(opcodes::NEW, class.clone());
        self.code.op(opcodes::DUP);
        self.code.push(resolved.declaring.clone());
        self.code.push(resolved.declaring.clone());
        self.reload(spilled, &resolved.params, &boundaries)?;

        self.code.pop_n(method.params.len())?;
        self.code.pop()?;
        self.code.invoke(
            opcodes::INVOKESPECIAL,
            class,
            "<init>",
            method_descriptor(&method.params, &TypeDesc::VOID),
        );
        Ok(())
    }

    pub(super) fn load_function(&mut self, method: &MethodRef, virtual_dispatch: bool) -> Result<()> {
        let resolved = self.resolver.resolve_method(method)?;
        let name = method_name(&method.name);
        let descriptor = method_descriptor(&method.params, &method.return_type);
        self.code.reserve_stack(3);
        if virtual_dispatch {
            self.pop_reference()?;
            self.code.constant(Const::String(name));
            self.code.constant(Const::String(descriptor));
            self.code.invoke_static(
                METHOD_POINTER_CLASS,
                "ofVirtual",
                "(Ljava/lang/Object;Ljava/lang/String;Ljava/lang/String;)Lsystem/MethodPointer;",
            );
        } else {
            self.code.constant(Const::Class(class_name(&resolved.declaring)));
            self.code.constant(Const::String(name));
            self.code.constant(Const::String(descriptor));
            self.code.invoke_static(
                METHOD_POINTER_CLASS,
                "of",
                "(Ljava/lang/Class;Ljava/lang/String;Ljava/lang/String;)Lsystem/MethodPointer;",
            );
        }
        self.code.push(TypeDesc::named(SOURCE_METHOD_POINTER));
        Ok(())
    }
}
