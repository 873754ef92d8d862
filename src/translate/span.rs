//! Span emulator
//!
//! Raw pointers and typed spans are both represented on the target by a
//! `system/Span` handle: a backing store, a byte offset and an element type
//! tag. Everything here works on the top of the operand stack of a `Code`
//! buffer and calls into the runtime helper class.

use crate::codegen::code::Code;
use crate::codegen::descriptor::class_name;
use crate::codegen::{opcodes, Const, Label};
use crate::consts::SPAN_CLASS;
use crate::error::{Error, Result};
use crate::sbil::{Instruction, Op};
use crate::types::{Primitive, StackKind, TypeDesc};

const SPAN: &str = "Lsystem/Span;";

fn is_long(ty: &TypeDesc) -> bool {
    ty.stack_kind() == Some(StackKind::Long)
}

/// Element type a handle points at; raw `void*` has none
fn element_of(ty: &TypeDesc) -> Option<&TypeDesc> {
    ty.element().filter(|e| !e.is_void())
}

fn same_element(a: &TypeDesc, b: &TypeDesc) -> bool {
    a == b || class_name(a) == class_name(b)
}

/// `localloc`: byte count on the stack -> untyped pointer handle
pub fn localloc(code: &mut Code) -> Result<()> {
    let size = code.pop()?;
    match size.stack_kind() {
        Some(StackKind::Int) => code.op(opcodes::I2L),
        Some(StackKind::Long) => {}
        _ => return Err(Error::type_mismatch(format!("localloc size of type {}", size))),
    }
    code.invoke_static(SPAN_CLASS, "localloc", format!("(J){}", SPAN));
    code.push(TypeDesc::pointer(TypeDesc::VOID));
    Ok(())
}

/// `sizeof`: primitives are constants, structs ask the runtime
pub fn size_of(code: &mut Code, ty: &TypeDesc) -> Result<()> {
    match ty {
        TypeDesc::Primitive(p) if *p != Primitive::Void => code.constant(Const::Int(p.byte_size() as i32)),
        TypeDesc::Pointer(_) => code.constant(Const::Int(8)),
        _ if ty.is_struct() => {
            code.reserve_stack(1);
            code.constant(Const::Class(class_name(ty)));
            code.invoke_static(SPAN_CLASS, "sizeOf", "(Ljava/lang/Class;)I");
        }
        _ => return Err(Error::unsupported(format!("sizeof {}", ty))),
    }
    code.push(TypeDesc::I32);
    Ok(())
}

/// Widen an int offset on top of the stack
fn widen_offset(code: &mut Code, offset: &TypeDesc) -> Result<()> {
    match offset.stack_kind() {
        Some(StackKind::Int) => {
            code.op(opcodes::I2L);
            Ok(())
        }
        Some(StackKind::Long) => Ok(()),
        _ => Err(Error::type_mismatch(format!("pointer offset of type {}", offset))),
    }
}

/// `handle + offset` with either operand order; the result keeps the
/// handle's type
pub fn add(code: &mut Code) -> Result<()> {
    let right = code.pop()?;
    let left = code.pop()?;
    let (handle, offset) = if left.is_span_handle() {
        widen_offset(code, &right)?;
        (left, right)
    } else if right.is_span_handle() {
        // offset, handle -> handle, offset
        code.reserve_stack(2);
        if left.category() == 2 {
            code.op(opcodes::DUP_X2);
            code.op(opcodes::POP);
        } else {
            code.op(opcodes::SWAP);
        }
        widen_offset(code, &left)?;
        (right, left)
    } else {
        return Err(Error::internal(format!("span add without a handle: {} + {}", left, right)));
    };
    log::trace!("span add {} + {}", handle, offset);
    push_element_class(code, &handle);
    code.invoke_static(SPAN_CLASS, "add", format!("({}JLjava/lang/Class;){}", SPAN, SPAN));
    code.push(handle);
    Ok(())
}

/// Class literal of a handle's element type, or null for `void*`
fn push_element_class(code: &mut Code, handle: &TypeDesc) {
    code.reserve_stack(1);
    match element_of(handle) {
        Some(elem) => code.constant(Const::Class(class_name(elem))),
        None => code.constant(Const::Null),
    }
}

/// `handle - offset`, or `pointer - pointer` as a byte distance
pub fn subtract(code: &mut Code) -> Result<()> {
    let right = code.pop()?;
    let left = code.pop()?;
    if !left.is_span_handle() {
        return Err(Error::type_mismatch(format!("cannot subtract {} from {}", right, left)));
    }
    if right.is_span_handle() {
        if !(left.is_pointer() && right.is_pointer()) {
            return Err(Error::type_mismatch(format!(
                "difference of {} and {} requires two pointers",
                left, right
            )));
        }
        code.invoke_static(SPAN_CLASS, "distance", format!("({}{})J", SPAN, SPAN));
        code.push(TypeDesc::Primitive(Primitive::ISize));
        return Ok(());
    }
    widen_offset(code, &right)?;
    code.op(opcodes::LNEG);
    push_element_class(code, &left);
    code.invoke_static(SPAN_CLASS, "add", format!("({}JLjava/lang/Class;){}", SPAN, SPAN));
    code.push(left);
    Ok(())
}

/// Typed load through a handle. `as_type` is the accessed type, which may
/// differ from the handle's element type (`ldind.i2` through a `char*`).
pub fn load(code: &mut Code, as_type: &TypeDesc) -> Result<()> {
    let handle = code.pop()?;
    if !handle.is_span_handle() {
        return Err(Error::internal(format!("span load through {}", handle)));
    }
    let through_char = matches!(element_of(&handle), Some(TypeDesc::Primitive(Primitive::Char)));
    let (name, descriptor) = match as_type {
        TypeDesc::Primitive(Primitive::I16) if through_char => ("loadChar", "()C"),
        TypeDesc::Primitive(p) => match p {
            Primitive::Bool | Primitive::I8 | Primitive::U8 => ("loadByte", "()B"),
            // unsigned 16-bit loads keep the char shape so no sign extension happens
            Primitive::Char | Primitive::U16 => ("loadChar", "()C"),
            Primitive::I16 => ("loadShort", "()S"),
            Primitive::I32 | Primitive::U32 => ("loadInt", "()I"),
            Primitive::I64 | Primitive::U64 | Primitive::ISize | Primitive::USize => ("loadLong", "()J"),
            Primitive::F32 => ("loadFloat", "()F"),
            Primitive::F64 => ("loadDouble", "()D"),
            Primitive::Void => return Err(Error::type_mismatch("load through an untyped pointer")),
        },
        _ if as_type.is_struct() => {
            code.reserve_stack(2);
            code.constant(Const::Class(class_name(as_type)));
            code.invoke_virtual(SPAN_CLASS, "loadValue", "(Ljava/lang/Class;)Ljava/lang/Object;");
            code.type_op(opcodes::CHECKCAST, class_name(as_type));
            code.push(as_type.clone());
            return Ok(());
        }
        _ => {
            code.reserve_stack(1);
            code.invoke_virtual(SPAN_CLASS, "loadRef", "()Ljava/lang/Object;");
            code.type_op(opcodes::CHECKCAST, class_name(as_type));
            code.push(as_type.clone());
            return Ok(());
        }
    };
    code.reserve_stack(as_type.category());
    code.invoke_virtual(SPAN_CLASS, name, descriptor);
    if let TypeDesc::Primitive(Primitive::U8) = as_type {
        code.constant(Const::Int(0xFF));
        code.op(opcodes::IAND);
    }
    code.push(as_type.clone());
    Ok(())
}

/// Typed store through a handle: stack is `handle, value`
pub fn store(code: &mut Code, as_type: &TypeDesc) -> Result<()> {
    let value = code.pop()?;
    let handle = code.pop()?;
    if !handle.is_span_handle() {
        return Err(Error::internal(format!("span store through {}", handle)));
    }
    if value.stack_kind() != as_type.stack_kind() {
        return Err(Error::type_mismatch(format!("storing {} as {}", value, as_type)));
    }
    let (name, descriptor) = match as_type {
        TypeDesc::Primitive(p) => match p {
            Primitive::Bool | Primitive::I8 | Primitive::U8 => ("storeByte", "(B)V"),
            Primitive::Char | Primitive::U16 => ("storeChar", "(C)V"),
            Primitive::I16 => ("storeShort", "(S)V"),
            Primitive::I32 | Primitive::U32 => ("storeInt", "(I)V"),
            Primitive::I64 | Primitive::U64 | Primitive::ISize | Primitive::USize => ("storeLong", "(J)V"),
            Primitive::F32 => ("storeFloat", "(F)V"),
            Primitive::F64 => ("storeDouble", "(D)V"),
            Primitive::Void => return Err(Error::type_mismatch("store through an untyped pointer")),
        },
        _ if as_type.is_struct() => ("storeValue", "(Ljava/lang/Object;)V"),
        _ => ("storeRef", "(Ljava/lang/Object;)V"),
    };
    code.invoke_virtual(SPAN_CLASS, name, descriptor);
    Ok(())
}

/// `initobj` through a handle
pub fn clear(code: &mut Code) -> Result<()> {
    let handle = code.pop()?;
    if !handle.is_span_handle() {
        return Err(Error::internal(format!("span clear through {}", handle)));
    }
    code.invoke_virtual(SPAN_CLASS, "clear", "()V");
    Ok(())
}

/// Make the value on top of the stack assignable to a handle of type
/// `target`, converting where the runtime can
pub fn check_assign(code: &mut Code, target: &TypeDesc) -> Result<()> {
    let value = code.peek(0)?.clone();
    if value == TypeDesc::Null || value == *target {
        return Ok(());
    }
    if is_long(&value) {
        code.invoke_static(SPAN_CLASS, "fromAddress", format!("(J){}", SPAN));
        code.replace_top(target.clone())?;
        return Ok(());
    }
    if let TypeDesc::ByRef(elem) = &value {
        if elem.is_struct() {
            code.invoke_static(SPAN_CLASS, "fromValue", format!("(Ljava/lang/Object;){}", SPAN));
        } else {
            code.invoke_static(SPAN_CLASS, "fromReference", format!("(Lsystem/Reference;){}", SPAN));
        }
        code.replace_top(target.clone())?;
        return Ok(());
    }
    if value.is_span_handle() {
        match (element_of(&value), element_of(target)) {
            (Some(a), Some(b)) if same_element(a, b) => {
                code.replace_top(target.clone())?;
                return Ok(());
            }
            (None, Some(elem)) => {
                code.reserve_stack(1);
                code.constant(Const::Class(class_name(elem)));
                code.invoke_virtual(SPAN_CLASS, "withType", format!("(Ljava/lang/Class;){}", SPAN));
                code.replace_top(target.clone())?;
                return Ok(());
            }
            (_, None) => {
                code.replace_top(target.clone())?;
                return Ok(());
            }
            _ => {}
        }
    }
    Err(Error::type_mismatch(format!("cannot assign {} to {}", value, target)))
}

/// `ldc.i4.0; conv.u` right before the current instruction
fn is_null_pointer_literal(preceding: &[Instruction]) -> bool {
    matches!(
        preceding,
        [.., Instruction { op: Op::LdcI4(0), .. }, Instruction { op: Op::Conv(Primitive::USize), .. }]
    )
}

/// Comparison with at least one handle operand. Emits a jump to `target`
/// taken when the comparison is true (`equal` selects `==` or `!=` for the
/// null-literal form, `ordered_jump` is the int compare-with-zero opcode
/// for the general form). Returns false when neither operand is a handle.
pub fn compare_jump(
    code: &mut Code,
    preceding: &[Instruction],
    ordered_jump: u8,
    equal: Option<bool>,
    target: Label,
) -> Result<bool> {
    let right = code.peek(0)?.clone();
    let left = code.peek(1)?.clone();
    if !left.is_span_handle() && !right.is_span_handle() {
        return Ok(false);
    }
    code.pop_n(2)?;
    if left.is_span_handle() && right.is_span_handle() {
        code.invoke_static(SPAN_CLASS, "compare", format!("({}{})I", SPAN, SPAN));
        code.jump(ordered_jump, target);
        return Ok(true);
    }
    // only `handle, literal`: the literal has to be the right operand
    match equal {
        Some(equal) if left.is_span_handle() && is_long(&right) && is_null_pointer_literal(preceding) => {
            code.op(opcodes::POP2);
            code.jump(if equal { opcodes::IFNULL } else { opcodes::IFNONNULL }, target);
            Ok(true)
        }
        _ => Err(Error::type_mismatch(format!("cannot compare {} with {}", left, right))),
    }
}

/// Handle -> boxed object
pub fn box_handle(code: &mut Code) {
    code.invoke_virtual(SPAN_CLASS, "box", "()Ljava/lang/Object;");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_ptr() -> TypeDesc {
        TypeDesc::pointer(TypeDesc::I32)
    }

    #[test]
    fn test_pointer_difference_needs_two_pointers() {
        let mut code = Code::new();
        code.push(TypeDesc::span(TypeDesc::I32));
        code.push(int_ptr());
        assert!(subtract(&mut code).unwrap_err().is_type_mismatch());

        let mut code = Code::new();
        code.push(int_ptr());
        code.push(int_ptr());
        subtract(&mut code).unwrap();
        assert_eq!(code.stack(), &[TypeDesc::Primitive(Primitive::ISize)]);
    }

    #[test]
    fn test_add_accepts_offset_first() {
        let mut code = Code::new();
        code.push(TypeDesc::I32);
        code.push(int_ptr());
        add(&mut code).unwrap();
        assert_eq!(code.stack(), &[int_ptr()]);
        assert_eq!(code.listing()[0], "swap");
        assert_eq!(code.listing()[1], "i2l");
    }

    #[test]
    fn test_assign_untyped_pointer_tags_element() {
        let mut code = Code::new();
        code.push(TypeDesc::pointer(TypeDesc::VOID));
        check_assign(&mut code, &int_ptr()).unwrap();
        assert_eq!(code.stack(), &[int_ptr()]);
        assert!(code.listing()[1].starts_with("invokevirtual system/Span.withType"));
    }

    #[test]
    fn test_assign_mismatched_elements_fails() {
        let mut code = Code::new();
        code.push(TypeDesc::pointer(TypeDesc::I64));
        let err = check_assign(&mut code, &int_ptr()).unwrap_err();
        assert!(err.is_type_mismatch());
        assert!(err.to_string().contains("int64*"));
        assert!(err.to_string().contains("int32*"));
    }

    #[test]
    fn test_size_of() {
        let mut code = Code::new();
        size_of(&mut code, &TypeDesc::I64).unwrap();
        size_of(&mut code, &TypeDesc::value("Point")).unwrap();
        assert_eq!(code.listing()[0], "push 8");
        assert_eq!(code.listing()[2], "invokestatic system/Span.sizeOf(Ljava/lang/Class;)I");
        assert!(size_of(&mut code, &TypeDesc::string()).is_err());
    }
}
