//! Branches, `switch` and the `c*` comparisons
//!
//! Every conditional pair (`beq`/`bne.un`, `bgt`/`ble.un`, ...) shares one
//! lowering: the `.un` form tests the negated condition, compares integers
//! unsigned and lets an unordered float comparison take the jump.

use crate::codegen::code::kind_of;
use crate::codegen::{opcodes, Const, Insn, Label};
use crate::consts::{INTEGER_CLASS, LONG_CLASS};
use crate::error::{Error, Result};
use crate::sbil::Op;
use crate::types::{StackKind, TypeDesc};

use super::translator::MethodTranslator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Cond {
    Eq,
    Ne,
    Lt,
    Ge,
    Gt,
    Le,
}

impl Cond {
    pub(super) fn negate(self) -> Cond {
        match self {
            Cond::Eq => Cond::Ne,
            Cond::Ne => Cond::Eq,
            Cond::Lt => Cond::Ge,
            Cond::Ge => Cond::Lt,
            Cond::Gt => Cond::Le,
            Cond::Le => Cond::Gt,
        }
    }

    /// Compare-with-zero jump
    fn if_zero(self) -> u8 {
        match self {
            Cond::Eq => opcodes::IFEQ,
            Cond::Ne => opcodes::IFNE,
            Cond::Lt => opcodes::IFLT,
            Cond::Ge => opcodes::IFGE,
            Cond::Gt => opcodes::IFGT,
            Cond::Le => opcodes::IFLE,
        }
    }

    fn if_icmp(self) -> u8 {
        match self {
            Cond::Eq => opcodes::IF_ICMPEQ,
            Cond::Ne => opcodes::IF_ICMPNE,
            Cond::Lt => opcodes::IF_ICMPLT,
            Cond::Ge => opcodes::IF_ICMPGE,
            Cond::Gt => opcodes::IF_ICMPGT,
            Cond::Le => opcodes::IF_ICMPLE,
        }
    }
}

/// A two-operand test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Test {
    pub cond: Cond,
    /// Integers compare unsigned; an unordered float comparison satisfies the test
    pub unsigned: bool,
}

impl Test {
    fn new(cond: Cond, unsigned: bool) -> Self {
        Self { cond, unsigned }
    }

    /// `fcmpl` yields -1 on NaN, `fcmpg` +1; pick the one that makes the
    /// unordered outcome come out as wanted
    fn float_compare(self, double: bool) -> u8 {
        let nan_is_less = match self.cond {
            Cond::Lt | Cond::Le | Cond::Ne => self.unsigned,
            Cond::Gt | Cond::Ge => !self.unsigned,
            Cond::Eq => true,
        };
        match (nan_is_less, double) {
            (true, false) => opcodes::FCMPL,
            (false, false) => opcodes::FCMPG,
            (true, true) => opcodes::DCMPL,
            (false, true) => opcodes::DCMPG,
        }
    }
}

/// Test taken by a conditional branch opcode
pub(super) fn branch_test(op: &Op) -> Option<Test> {
    let (cond, negated) = match op {
        Op::Beq(_) => (Cond::Eq, false),
        Op::BneUn(_) => (Cond::Eq, true),
        Op::Bgt(_) => (Cond::Gt, false),
        Op::BleUn(_) => (Cond::Gt, true),
        Op::Bge(_) => (Cond::Ge, false),
        Op::BltUn(_) => (Cond::Ge, true),
        Op::Blt(_) => (Cond::Lt, false),
        Op::BgeUn(_) => (Cond::Lt, true),
        Op::Ble(_) => (Cond::Le, false),
        Op::BgtUn(_) => (Cond::Le, true),
        _ => return None,
    };
    Some(if negated {
        Test::new(cond.negate(), true)
    } else {
        Test::new(cond, false)
    })
}

fn compare_test(op: &Op) -> Option<Test> {
    Some(match op {
        Op::Ceq => Test::new(Cond::Eq, false),
        Op::Cgt => Test::new(Cond::Gt, false),
        Op::CgtUn => Test::new(Cond::Gt, true),
        Op::Clt => Test::new(Cond::Lt, false),
        Op::CltUn => Test::new(Cond::Lt, true),
        _ => return None,
    })
}

impl MethodTranslator<'_> {
    fn jump_to(&mut self, op: u8, label: Label) -> Result<()> {
        self.code.record_frame(label)?;
        self.code.jump(op, label);
        Ok(())
    }

    /// Pop two operands and jump to `label` when `test` holds
    fn compare_and_jump(&mut self, test: Test, label: Label) -> Result<()> {
        let equality = match test.cond {
            Cond::Eq => Some(true),
            Cond::Ne => Some(false),
            _ => None,
        };
        let preceding = self.preceding();
        if super::span::compare_jump(&mut self.code, preceding, test.cond.if_zero(), equality, label)? {
            self.code.record_frame(label)?;
            return Ok(());
        }

        let right = self.code.peek(0)?.clone();
        let left = self.code.peek(1)?.clone();
        if left.is_reference() || right.is_reference() {
            self.code.pop_n(2)?;
            let op = match test.cond {
                Cond::Eq => opcodes::IF_ACMPEQ,
                Cond::Ne => opcodes::IF_ACMPNE,
                // `cgt.un` against null is the reference inequality idiom
                Cond::Gt if test.unsigned => opcodes::IF_ACMPNE,
                _ => {
                    return Err(Error::type_mismatch(format!(
                        "ordered comparison of references {} and {}",
                        left, right
                    )))
                }
            };
            if !(left.is_reference() && right.is_reference()) {
                return Err(Error::type_mismatch(format!("comparison of {} with {}", left, right)));
            }
            return self.jump_to(op, label);
        }

        let kind = self.unify_operands()?;
        self.code.pop_n(2)?;
        let unsigned = test.unsigned && !matches!(test.cond, Cond::Eq | Cond::Ne);
        match kind {
            StackKind::Int if unsigned => {
                self.code.invoke_static(INTEGER_CLASS, "compareUnsigned", "(II)I");
                self.jump_to(test.cond.if_zero(), label)
            }
            StackKind::Int => self.jump_to(test.cond.if_icmp(), label),
            StackKind::Long => {
                if unsigned {
                    self.code.invoke_static(LONG_CLASS, "compareUnsigned", "(JJ)I");
                } else {
                    self.code.op(opcodes::LCMP);
                }
                self.jump_to(test.cond.if_zero(), label)
            }
            StackKind::Float | StackKind::Double => {
                self.code.op(test.float_compare(kind == StackKind::Double));
                self.jump_to(test.cond.if_zero(), label)
            }
            StackKind::Ref => Err(Error::internal("reference operands after unification")),
        }
    }

    pub(super) fn branch(&mut self, target: u32) -> Result<()> {
        let label = self.label_for(target);
        self.jump_to(opcodes::GOTO, label)
    }

    pub(super) fn branch_truth(&mut self, target: u32, truthy: bool) -> Result<()> {
        let label = self.label_for(target);
        let value = self.code.pop()?;
        let op = match kind_of(&value)? {
            StackKind::Int => {
                if truthy {
                    opcodes::IFNE
                } else {
                    opcodes::IFEQ
                }
            }
            StackKind::Long => {
                self.code.reserve_stack(2);
                self.code.op(opcodes::LCONST_0);
                self.code.op(opcodes::LCMP);
                if truthy {
                    opcodes::IFNE
                } else {
                    opcodes::IFEQ
                }
            }
            StackKind::Ref => {
                if truthy {
                    opcodes::IFNONNULL
                } else {
                    opcodes::IFNULL
                }
            }
            StackKind::Float | StackKind::Double => {
                return Err(Error::type_mismatch(format!("truth test of {}", value)));
            }
        };
        self.jump_to(op, label)
    }

    pub(super) fn branch_compare(&mut self, op: &Op, target: u32) -> Result<()> {
        let test = branch_test(op).ok_or_else(|| Error::internal("not a conditional branch"))?;
        let label = self.label_for(target);
        self.compare_and_jump(test, label)
    }

    pub(super) fn switch(&mut self, targets: &[u32]) -> Result<()> {
        let value = self.code.pop()?;
        if kind_of(&value)? != StackKind::Int {
            return Err(Error::type_mismatch(format!("switch on {}", value)));
        }
        let next = self
            .next_offset()
            .ok_or_else(|| Error::internal("switch falls off the end of the method"))?;
        let default = self.label_for(next);
        let labels: Vec<Label> = targets.iter().map(|t| self.label_for(*t)).collect();
        for label in labels.iter().chain(std::iter::once(&default)) {
            self.code.record_frame(*label)?;
        }
        self.code.emit(Insn::TableSwitch { low: 0, default, targets: labels });
        Ok(())
    }

    /// `ceq`, `cgt`, `clt` and their unsigned forms: 0 or 1 on the stack
    pub(super) fn compare_value(&mut self, op: &Op) -> Result<()> {
        let test = compare_test(op).ok_or_else(|| Error::internal("not a comparison"))?;
        let yes = self.code.new_label();
        let done = self.code.new_label();
        self.compare_and_jump(test, yes)?;

        self.code.reserve_stack(1);
        self.code.constant(Const::Int(0));
        self.code.push(TypeDesc::I32);
        self.jump_to(opcodes::GOTO, done)?;

        self.code.place(yes);
        self.code.load_frame(yes);
        self.code.constant(Const::Int(1));
        self.code.push(TypeDesc::I32);
        self.code.record_frame(done)?;

        self.code.place(done);
        self.code.load_frame(done);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_un_forms_negate_their_pair() {
        let beq = branch_test(&Op::Beq(0)).unwrap();
        let bne = branch_test(&Op::BneUn(0)).unwrap();
        assert_eq!(bne.cond, beq.cond.negate());
        assert!(bne.unsigned && !beq.unsigned);
        assert_eq!(branch_test(&Op::BleUn(0)).unwrap().cond, Cond::Le);
        assert_eq!(branch_test(&Op::BgtUn(0)).unwrap(), Test::new(Cond::Gt, true));
        assert!(branch_test(&Op::Br(0)).is_none());
    }

    #[test]
    fn test_unordered_floats() {
        // blt: NaN must not jump -> fcmpg (+1 fails "< 0")
        assert_eq!(branch_test(&Op::Blt(0)).unwrap().float_compare(false), opcodes::FCMPG);
        // blt.un tests >= negated: NaN must jump -> fcmpl (-1 passes "< 0")
        assert_eq!(branch_test(&Op::BltUn(0)).unwrap().float_compare(false), opcodes::FCMPL);
        // bgt: NaN must not jump -> fcmpl
        assert_eq!(branch_test(&Op::Bgt(0)).unwrap().float_compare(true), opcodes::DCMPL);
        // cgt.un: NaN yields 1 -> fcmpg
        assert_eq!(compare_test(&Op::CgtUn).unwrap().float_compare(false), opcodes::FCMPG);
    }
}
