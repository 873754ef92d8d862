//! Numeric conversions
//!
//! The target has no unsigned primitives: unsigned results are produced by
//! masking, and checked conversions call `system/Arithmetic`, which range
//! checks a 64-bit integer or a double.

use crate::codegen::code::kind_of;
use crate::codegen::{opcodes, Const};
use crate::consts::{ARITHMETIC_CLASS, SPAN_CLASS};
use crate::error::{Error, Result};
use crate::types::{Primitive, StackKind, TypeDesc};

use super::translator::MethodTranslator;

/// Stack type after converting to `p`: sub-int targets widen to int32
pub(super) fn converted(p: Primitive) -> TypeDesc {
    match p {
        Primitive::Bool | Primitive::Char | Primitive::I8 | Primitive::U8 | Primitive::I16 | Primitive::U16 => {
            TypeDesc::I32
        }
        other => TypeDesc::Primitive(other),
    }
}

/// Name stem of the checked-conversion helper for `p`
fn checked_stem(p: Primitive) -> Option<&'static str> {
    Some(match p {
        Primitive::I8 => "Int8",
        Primitive::U8 => "UInt8",
        Primitive::I16 => "Int16",
        Primitive::U16 | Primitive::Char => "UInt16",
        Primitive::I32 => "Int32",
        Primitive::U32 => "UInt32",
        Primitive::I64 | Primitive::ISize => "Int64",
        Primitive::U64 | Primitive::USize => "UInt64",
        _ => return None,
    })
}

impl MethodTranslator<'_> {
    fn zero_extend_int(&mut self) {
        self.code.reserve_stack(2);
        self.code.op(opcodes::I2L);
        self.code.constant(Const::Long(0xFFFF_FFFF));
        self.code.op(opcodes::LAND);
    }

    /// Narrow an int on the stack to a sub-int target
    fn narrow_int(&mut self, p: Primitive) {
        match p {
            Primitive::I8 => self.code.op(opcodes::I2B),
            Primitive::U8 => {
                self.code.reserve_stack(1);
                self.code.constant(Const::Int(0xFF));
                self.code.op(opcodes::IAND);
            }
            Primitive::I16 => self.code.op(opcodes::I2S),
            Primitive::U16 | Primitive::Char => self.code.op(opcodes::I2C),
            _ => {}
        }
    }

    pub(super) fn convert(&mut self, p: Primitive) -> Result<()> {
        let value = self.code.pop()?;
        let native = matches!(p, Primitive::ISize | Primitive::USize);

        if value.is_span_handle() {
            if !native {
                return Err(Error::type_mismatch(format!("conversion of {} to {}", value, p.source_name())));
            }
            self.code.push(value);
            return Ok(());
        }
        if let TypeDesc::ByRef(elem) = &value {
            if !native {
                return Err(Error::type_mismatch(format!("conversion of {} to {}", value, p.source_name())));
            }
            if elem.is_struct() {
                self.code
                    .invoke_static(SPAN_CLASS, "fromValue", "(Ljava/lang/Object;)Lsystem/Span;");
            } else {
                self.code
                    .invoke_static(SPAN_CLASS, "fromReference", "(Lsystem/Reference;)Lsystem/Span;");
            }
            self.code.push(TypeDesc::pointer((**elem).clone()));
            return Ok(());
        }

        let from = kind_of(&value)?;
        let to = p
            .stack_kind()
            .ok_or_else(|| Error::internal("conversion to void"))?;
        let unsigned_long = matches!(p, Primitive::U64 | Primitive::USize);
        match (from, to) {
            (StackKind::Int, StackKind::Int) => self.narrow_int(p),
            (StackKind::Int, StackKind::Long) if unsigned_long => self.zero_extend_int(),
            (StackKind::Int, StackKind::Long) => self.code.op(opcodes::I2L),
            (StackKind::Int, StackKind::Float) => self.code.op(opcodes::I2F),
            (StackKind::Int, StackKind::Double) => self.code.op(opcodes::I2D),
            (StackKind::Long, StackKind::Int) => {
                self.code.op(opcodes::L2I);
                self.narrow_int(p);
            }
            (StackKind::Long, StackKind::Long) => {}
            (StackKind::Long, StackKind::Float) => self.code.op(opcodes::L2F),
            (StackKind::Long, StackKind::Double) => self.code.op(opcodes::L2D),
            (StackKind::Float, StackKind::Int) | (StackKind::Double, StackKind::Int) => {
                // go through long so values above i32::MAX survive an unsigned target
                self.code.reserve_stack(2);
                self.code.op(if from == StackKind::Float { opcodes::F2L } else { opcodes::D2L });
                self.code.op(opcodes::L2I);
                self.narrow_int(p);
            }
            (StackKind::Float, StackKind::Long) | (StackKind::Double, StackKind::Long) if unsigned_long => {
                if from == StackKind::Float {
                    self.code.op(opcodes::F2D);
                }
                self.code
                    .invoke_static(ARITHMETIC_CLASS, "doubleToUnsignedLong", "(D)J");
            }
            (StackKind::Float, StackKind::Long) => self.code.op(opcodes::F2L),
            (StackKind::Double, StackKind::Long) => self.code.op(opcodes::D2L),
            (StackKind::Float, StackKind::Float) | (StackKind::Double, StackKind::Double) => {}
            (StackKind::Float, StackKind::Double) => self.code.op(opcodes::F2D),
            (StackKind::Double, StackKind::Float) => self.code.op(opcodes::D2F),
            (StackKind::Ref, _) | (_, StackKind::Ref) => {
                return Err(Error::type_mismatch(format!("conversion of {} to {}", value, p.source_name())))
            }
        }
        self.code.push(converted(p));
        Ok(())
    }

    /// `conv.ovf.*` and `conv.ovf.*.un`
    pub(super) fn convert_checked(&mut self, p: Primitive, unsigned_source: bool) -> Result<()> {
        let value = self.code.pop()?;
        let stem = checked_stem(p)
            .ok_or_else(|| Error::unsupported(format!("checked conversion to {}", p.source_name())))?;
        let mut suffix = "";
        let source = match kind_of(&value)? {
            StackKind::Int if unsigned_source => {
                self.zero_extend_int();
                "J"
            }
            StackKind::Int => {
                self.code.reserve_stack(1);
                self.code.op(opcodes::I2L);
                "J"
            }
            StackKind::Long => {
                if unsigned_source {
                    suffix = "Un";
                }
                "J"
            }
            StackKind::Float => {
                self.code.reserve_stack(1);
                self.code.op(opcodes::F2D);
                "D"
            }
            StackKind::Double => "D",
            StackKind::Ref => {
                return Err(Error::type_mismatch(format!("checked conversion of {}", value)));
            }
        };
        let ret = if p.category() == 2 { "J" } else { "I" };
        self.code.invoke_static(
            ARITHMETIC_CLASS,
            format!("checked{}{}", stem, suffix),
            format!("({}){}", source, ret),
        );
        self.code.push(converted(p));
        Ok(())
    }

    /// `conv.r.un`: the integer on the stack read as unsigned
    pub(super) fn convert_unsigned_to_float(&mut self) -> Result<()> {
        let value = self.code.pop()?;
        match kind_of(&value)? {
            StackKind::Int => {
                self.zero_extend_int();
                self.code.invoke_static(ARITHMETIC_CLASS, "unsignedToDouble", "(J)D");
            }
            StackKind::Long => self.code.invoke_static(ARITHMETIC_CLASS, "unsignedToDouble", "(J)D"),
            StackKind::Float => self.code.op(opcodes::F2D),
            StackKind::Double => {}
            StackKind::Ref => return Err(Error::type_mismatch(format!("conv.r.un of {}", value))),
        }
        self.code.push(TypeDesc::F64);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_int_targets_widen() {
        assert_eq!(converted(Primitive::U8), TypeDesc::I32);
        assert_eq!(converted(Primitive::USize), TypeDesc::Primitive(Primitive::USize));
        assert_eq!(checked_stem(Primitive::Char), Some("UInt16"));
        assert_eq!(checked_stem(Primitive::F32), None);
    }
}
