//! Array creation, length and element access

use crate::codegen::code::{kind_of, load_op, store_op};
use crate::codegen::descriptor::class_name;
use crate::codegen::opcodes::{self, atype};
use crate::codegen::Const;
use crate::consts::{OBJECT_CLASS, REFERENCE_CLASS, VALUE_TYPE_CLASS};
use crate::error::{Error, Result};
use crate::types::{Primitive, StackKind, TypeDesc};

use super::casts::{erasure, from_erased, to_erased, Erasure};
use super::convert::converted;
use super::translator::MethodTranslator;

fn array_type_code(p: Primitive) -> Option<u8> {
    Some(match p {
        Primitive::Bool => atype::T_BOOLEAN,
        Primitive::Char | Primitive::U16 => atype::T_CHAR,
        Primitive::I8 | Primitive::U8 => atype::T_BYTE,
        Primitive::I16 => atype::T_SHORT,
        Primitive::I32 | Primitive::U32 => atype::T_INT,
        Primitive::I64 | Primitive::U64 | Primitive::ISize | Primitive::USize => atype::T_LONG,
        Primitive::F32 => atype::T_FLOAT,
        Primitive::F64 => atype::T_DOUBLE,
        Primitive::Void => return None,
    })
}

/// `[load, store]` element opcodes for arrays of `elem`
fn element_ops(elem: &TypeDesc) -> (u8, u8) {
    use opcodes::*;
    match elem {
        TypeDesc::Primitive(p) => match p {
            Primitive::Bool | Primitive::I8 | Primitive::U8 => (BALOAD, BASTORE),
            Primitive::Char | Primitive::U16 => (CALOAD, CASTORE),
            Primitive::I16 => (SALOAD, SASTORE),
            Primitive::I32 | Primitive::U32 => (IALOAD, IASTORE),
            Primitive::I64 | Primitive::U64 | Primitive::ISize | Primitive::USize => (LALOAD, LASTORE),
            Primitive::F32 => (FALOAD, FASTORE),
            Primitive::F64 => (DALOAD, DASTORE),
            Primitive::Void => (AALOAD, AASTORE),
        },
        _ => (AALOAD, AASTORE),
    }
}

impl MethodTranslator<'_> {
    /// Int index on top of the stack; native-int indices are narrowed
    fn index_on_top(&mut self) -> Result<()> {
        let index = self.code.peek(0)?.clone();
        match kind_of(&index)? {
            StackKind::Int => Ok(()),
            StackKind::Long => {
                self.code.op(opcodes::L2I);
                self.code.replace_top(TypeDesc::I32)?;
                Ok(())
            }
            _ => Err(Error::type_mismatch(format!("array index of type {}", index))),
        }
    }

    /// Element type of the array operand, or `fallback` when the stack
    /// does not know it (null literal, erased parameter)
    fn array_element(&self, array: &TypeDesc, fallback: &TypeDesc) -> Result<TypeDesc> {
        match array {
            TypeDesc::Array(elem) => Ok((**elem).clone()),
            TypeDesc::Null | TypeDesc::GenericParam { .. } => Ok(fallback.clone()),
            TypeDesc::Named { .. } if class_name(array) == OBJECT_CLASS => Ok(fallback.clone()),
            other => Err(Error::type_mismatch(format!("element access on {}", other))),
        }
    }

    pub(super) fn new_array(&mut self, elem: &TypeDesc) -> Result<()> {
        let elem = self.resolver.substitute(elem)?;
        self.index_on_top()?;
        self.code.pop()?;
        match &elem {
            TypeDesc::Primitive(p) => {
                let code = array_type_code(*p).ok_or_else(|| Error::type_mismatch("array of void"))?;
                self.code.emit(crate::codegen::Insn::NewArray(code));
            }
            _ => self.code.type_op(opcodes::ANEWARRAY, class_name(&elem)),
        }
        if elem.is_struct() {
            self.code.reserve_stack(3);
            self.code.op(opcodes::DUP);
            self.code.constant(Const::Class(class_name(&elem)));
            self.code.invoke_static(VALUE_TYPE_CLASS, "initArray", "([Ljava/lang/Object;Ljava/lang/Class;)V");
        }
        self.code.push(TypeDesc::array(elem));
        Ok(())
    }

    pub(super) fn array_length(&mut self) -> Result<()> {
        self.pop_reference()?;
        self.code.op(opcodes::ARRAYLENGTH);
        self.code.push(TypeDesc::I32);
        Ok(())
    }

    pub(super) fn load_element(&mut self, ty: &TypeDesc) -> Result<()> {
        let ty = self.resolver.substitute(ty)?;
        self.index_on_top()?;
        self.code.pop()?;
        let array = self.pop_reference()?;
        let elem = self.array_element(&array, &ty)?;
        let boundary = erasure(&elem, &ty)?;
        let (load, _) = element_ops(&elem);
        self.code.reserve_stack(ty.category());
        self.code.op(load);
        if let TypeDesc::Primitive(Primitive::U8) = elem {
            self.code.constant(Const::Int(0xFF));
            self.code.op(opcodes::IAND);
        }
        from_erased(&mut self.code, boundary, &ty);
        let pushed = match &ty {
            TypeDesc::Primitive(p) => converted(*p),
            _ if boundary == Erasure::Same => elem,
            _ => ty,
        };
        self.code.push(pushed);
        Ok(())
    }

    pub(super) fn load_element_address(&mut self, ty: &TypeDesc) -> Result<()> {
        let ty = self.resolver.substitute(ty)?;
        self.index_on_top()?;
        self.code.pop()?;
        let array = self.pop_reference()?;
        let elem = self.array_element(&array, &ty)?;
        if elem.is_struct() {
            self.code.op(opcodes::AALOAD);
        } else {
            self.code.invoke_static(
                REFERENCE_CLASS,
                "ofElement",
                "(Ljava/lang/Object;I)Lsystem/Reference;",
            );
        }
        self.code.push(TypeDesc::byref(elem));
        Ok(())
    }

    pub(super) fn store_element(&mut self, ty: &TypeDesc) -> Result<()> {
        let ty = self.resolver.substitute(ty)?;
        let value = self.code.pop()?;
        let index = self.code.peek(0)?.clone();
        if kind_of(&index)? == StackKind::Long {
            // the index sits under the value
            let mark = self.locals.temp_mark();
            let temp = self.locals.alloc_temp(&value);
            let kind = kind_of(&value)?;
            self.code.local(store_op(kind), temp);
            self.index_on_top()?;
            self.code.local(load_op(kind), temp);
            self.code.reserve_stack(value.category());
            self.locals.release_temps(mark);
        }
        self.code.push(value);
        let array_index = self.code.stack().len().checked_sub(3);
        let array = match array_index {
            Some(at) => self.code.stack()[at].clone(),
            None => return Err(crate::codegen::StackError::Underflow.into()),
        };
        let elem = self.array_element(&array, &ty)?;
        if elem.is_span_handle() {
            super::span::check_assign(&mut self.code, &elem)?;
        }
        let boundary = erasure(&elem, &ty)?;
        to_erased(&mut self.code, boundary);
        let (_, store) = element_ops(&elem);
        self.code.pop_n(3)?;
        self.code.op(store);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_and_char_elements() {
        assert_eq!(element_ops(&TypeDesc::Primitive(Primitive::U8)), (opcodes::BALOAD, opcodes::BASTORE));
        assert_eq!(element_ops(&TypeDesc::Primitive(Primitive::Char)), (opcodes::CALOAD, opcodes::CASTORE));
        assert_eq!(element_ops(&TypeDesc::string()), (opcodes::AALOAD, opcodes::AASTORE));
        assert_eq!(array_type_code(Primitive::USize), Some(atype::T_LONG));
    }
}
