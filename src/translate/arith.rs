//! Arithmetic, bitwise and shift operators
//!
//! Operands of different widths are widened to the wider kind first
//! (int32 with native int, float32 with float64). Unsigned division and
//! checked arithmetic go through `java/lang` and runtime helpers.

use crate::codegen::code::{kind_of, load_op, store_op};
use crate::codegen::{opcodes, Const};
use crate::consts::{ARITHMETIC_CLASS, INTEGER_CLASS, LONG_CLASS, MATH_CLASS};
use crate::error::{Error, Result};
use crate::sbil::Op;
use crate::types::{StackKind, TypeDesc};

use super::translator::MethodTranslator;

/// Pick the opcode of a typed family `[int, long, float, double]`
fn typed(ops: [u8; 4], kind: StackKind) -> Option<u8> {
    match kind {
        StackKind::Int => Some(ops[0]),
        StackKind::Long => Some(ops[1]),
        StackKind::Float => Some(ops[2]),
        StackKind::Double => Some(ops[3]),
        StackKind::Ref => None,
    }
}

/// Integer-only family `[int, long]`
fn integral(ops: [u8; 2], kind: StackKind) -> Option<u8> {
    match kind {
        StackKind::Int => Some(ops[0]),
        StackKind::Long => Some(ops[1]),
        _ => None,
    }
}

/// Result type of an operation over values of `kind`
pub(super) fn canonical(kind: StackKind) -> TypeDesc {
    match kind {
        StackKind::Int => TypeDesc::I32,
        StackKind::Long => TypeDesc::I64,
        StackKind::Float => TypeDesc::F32,
        StackKind::Double => TypeDesc::F64,
        StackKind::Ref => TypeDesc::object(),
    }
}

fn widening(from: StackKind, to: StackKind) -> Option<u8> {
    match (from, to) {
        (StackKind::Int, StackKind::Long) => Some(opcodes::I2L),
        (StackKind::Float, StackKind::Double) => Some(opcodes::F2D),
        _ => None,
    }
}

enum Emit {
    Op(u8),
    Static(&'static str, &'static str),
}

impl MethodTranslator<'_> {
    /// Bring the two operands on top of the stack to one kind
    pub(super) fn unify_operands(&mut self) -> Result<StackKind> {
        let right = self.code.peek(0)?.clone();
        let left = self.code.peek(1)?.clone();
        let (lk, rk) = (kind_of(&left)?, kind_of(&right)?);
        if lk == rk {
            return Ok(lk);
        }
        if let Some(widen) = widening(rk, lk) {
            self.code.op(widen);
            self.code.replace_top(canonical(lk))?;
            return Ok(lk);
        }
        if let Some(widen) = widening(lk, rk) {
            // the narrow operand is underneath: park the wide one
            let mark = self.locals.temp_mark();
            let temp = self.locals.alloc_temp(&right);
            self.code.local(store_op(rk), temp);
            self.code.pop()?;
            self.code.op(widen);
            self.code.replace_top(canonical(rk))?;
            self.code.local(load_op(rk), temp);
            self.code.push(right);
            self.locals.release_temps(mark);
            return Ok(rk);
        }
        Err(Error::type_mismatch(format!("operands {} and {} cannot be combined", left, right)))
    }

    pub(super) fn binary(&mut self, op: &Op) -> Result<()> {
        let right = self.code.peek(0)?.clone();
        let left = self.code.peek(1)?.clone();
        if left.is_span_handle() || right.is_span_handle() {
            return match op {
                Op::Add | Op::AddOvfUn => super::span::add(&mut self.code),
                Op::Sub | Op::SubOvfUn => super::span::subtract(&mut self.code),
                _ => Err(Error::type_mismatch(format!("{} on {} and {}", op.name(), left, right))),
            };
        }

        let kind = self.unify_operands()?;
        let emit = self.binary_emit(op, kind).ok_or_else(|| {
            Error::type_mismatch(format!("{} on operands of type {} and {}", op.name(), left, right))
        })?;
        self.code.pop_n(2)?;
        match emit {
            Emit::Op(code) => self.code.op(code),
            Emit::Static(owner, name) => {
                let descriptor = if kind == StackKind::Long { "(JJ)J" } else { "(II)I" };
                self.code.invoke_static(owner, name, descriptor);
            }
        }
        self.code.push(canonical(kind));
        Ok(())
    }

    fn binary_emit(&self, op: &Op, kind: StackKind) -> Option<Emit> {
        use opcodes::*;
        let integer = integral([0, 0], kind).is_some();
        let unsigned_owner = if kind == StackKind::Long { LONG_CLASS } else { INTEGER_CLASS };
        match op {
            Op::Add => typed([IADD, LADD, FADD, DADD], kind).map(Emit::Op),
            Op::Sub => typed([ISUB, LSUB, FSUB, DSUB], kind).map(Emit::Op),
            Op::Mul => typed([IMUL, LMUL, FMUL, DMUL], kind).map(Emit::Op),
            Op::Div => typed([IDIV, LDIV, FDIV, DDIV], kind).map(Emit::Op),
            Op::Rem => typed([IREM, LREM, FREM, DREM], kind).map(Emit::Op),
            Op::DivUn if integer => Some(Emit::Static(unsigned_owner, "divideUnsigned")),
            Op::RemUn if integer => Some(Emit::Static(unsigned_owner, "remainderUnsigned")),
            Op::AddOvf if integer => Some(Emit::Static(MATH_CLASS, "addExact")),
            Op::SubOvf if integer => Some(Emit::Static(MATH_CLASS, "subtractExact")),
            Op::MulOvf if integer => Some(Emit::Static(MATH_CLASS, "multiplyExact")),
            Op::AddOvfUn if integer => Some(Emit::Static(ARITHMETIC_CLASS, "addUnsignedExact")),
            Op::SubOvfUn if integer => Some(Emit::Static(ARITHMETIC_CLASS, "subtractUnsignedExact")),
            Op::MulOvfUn if integer => Some(Emit::Static(ARITHMETIC_CLASS, "multiplyUnsignedExact")),
            Op::And => integral([IAND, LAND], kind).map(Emit::Op),
            Op::Or => integral([IOR, LOR], kind).map(Emit::Op),
            Op::Xor => integral([IXOR, LXOR], kind).map(Emit::Op),
            _ => None,
        }
    }

    pub(super) fn shift(&mut self, op: &Op) -> Result<()> {
        let amount = self.code.pop()?;
        match kind_of(&amount)? {
            StackKind::Int => {}
            StackKind::Long => self.code.op(opcodes::L2I),
            _ => return Err(Error::type_mismatch(format!("shift amount of type {}", amount))),
        }
        let value = self.code.pop()?;
        let kind = kind_of(&value)?;
        let family = match op {
            Op::Shl => [opcodes::ISHL, opcodes::LSHL],
            Op::Shr => [opcodes::ISHR, opcodes::LSHR],
            _ => [opcodes::IUSHR, opcodes::LUSHR],
        };
        let code = integral(family, kind)
            .ok_or_else(|| Error::type_mismatch(format!("{} on a value of type {}", op.name(), value)))?;
        self.code.op(code);
        self.code.push(canonical(kind));
        Ok(())
    }

    pub(super) fn negate(&mut self) -> Result<()> {
        let value = self.code.pop()?;
        let kind = kind_of(&value)?;
        let code = typed([opcodes::INEG, opcodes::LNEG, opcodes::FNEG, opcodes::DNEG], kind)
            .ok_or_else(|| Error::type_mismatch(format!("neg on a value of type {}", value)))?;
        self.code.op(code);
        self.code.push(canonical(kind));
        Ok(())
    }

    pub(super) fn bitwise_not(&mut self) -> Result<()> {
        let value = self.code.pop()?;
        let kind = kind_of(&value)?;
        self.code.reserve_stack(value.category() * 2);
        match kind {
            StackKind::Int => {
                self.code.constant(Const::Int(-1));
                self.code.op(opcodes::IXOR);
            }
            StackKind::Long => {
                self.code.constant(Const::Long(-1));
                self.code.op(opcodes::LXOR);
            }
            _ => return Err(Error::type_mismatch(format!("not on a value of type {}", value))),
        }
        self.code.push(canonical(kind));
        Ok(())
    }
}
