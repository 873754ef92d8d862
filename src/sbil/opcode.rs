//! The closed source opcode set

use crate::types::{FieldRef, MethodRef, Primitive, TypeDesc};

/// Control-flow classification of a source instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Next,
    /// Unconditional transfer to a target (`br`, `leave`)
    Branch,
    /// Conditional transfer, falls through otherwise
    CondBranch,
    Return,
    Throw,
}

impl Flow {
    /// Control never reaches the next linear instruction
    pub fn is_transfer(self) -> bool {
        matches!(self, Flow::Branch | Flow::Return | Flow::Throw)
    }
}

/// Source opcodes with their operands. Branch targets are absolute offsets.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Nop,
    Pop,
    Dup,

    LdArg(u16),
    LdArgA(u16),
    StArg(u16),
    LdLoc(u16),
    LdLocA(u16),
    StLoc(u16),

    LdNull,
    LdcI4(i32),
    LdcI8(i64),
    LdcR4(f32),
    LdcR8(f64),
    LdStr(String),

    LdFld(FieldRef),
    LdFldA(FieldRef),
    StFld(FieldRef),
    LdSFld(FieldRef),
    LdSFldA(FieldRef),
    StSFld(FieldRef),

    NewObj(MethodRef),
    Call(MethodRef),
    CallVirt(MethodRef),
    Ret,

    IsInst(TypeDesc),
    CastClass(TypeDesc),
    Box(TypeDesc),
    Unbox(TypeDesc),
    UnboxAny(TypeDesc),

    Conv(Primitive),
    ConvOvf(Primitive),
    ConvOvfUn(Primitive),
    ConvRUn,

    Add,
    Sub,
    Mul,
    Div,
    DivUn,
    Rem,
    RemUn,
    AddOvf,
    AddOvfUn,
    SubOvf,
    SubOvfUn,
    MulOvf,
    MulOvfUn,
    Neg,
    Not,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    ShrUn,

    LdInd(Primitive),
    LdIndRef,
    StInd(Primitive),
    StIndRef,
    LdObj(TypeDesc),
    StObj(TypeDesc),
    InitObj(TypeDesc),

    NewArr(TypeDesc),
    LdLen,
    LdElem(TypeDesc),
    LdElemA(TypeDesc),
    StElem(TypeDesc),

    Br(u32),
    BrTrue(u32),
    BrFalse(u32),
    Beq(u32),
    BneUn(u32),
    Bgt(u32),
    BleUn(u32),
    Bge(u32),
    BltUn(u32),
    Blt(u32),
    BgeUn(u32),
    Ble(u32),
    BgtUn(u32),
    Switch(Vec<u32>),
    Leave(u32),

    Ceq,
    Cgt,
    CgtUn,
    Clt,
    CltUn,

    LdFtn(MethodRef),
    LdVirtFtn(MethodRef),

    SizeOf(TypeDesc),
    LocAlloc,

    Throw,
    Rethrow,
    EndFinally,
}

impl Op {
    /// Source mnemonic, used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Op::Nop => "nop",
            Op::Pop => "pop",
            Op::Dup => "dup",
            Op::LdArg(_) => "ldarg",
            Op::LdArgA(_) => "ldarga",
            Op::StArg(_) => "starg",
            Op::LdLoc(_) => "ldloc",
            Op::LdLocA(_) => "ldloca",
            Op::StLoc(_) => "stloc",
            Op::LdNull => "ldnull",
            Op::LdcI4(_) => "ldc.i4",
            Op::LdcI8(_) => "ldc.i8",
            Op::LdcR4(_) => "ldc.r4",
            Op::LdcR8(_) => "ldc.r8",
            Op::LdStr(_) => "ldstr",
            Op::LdFld(_) => "ldfld",
            Op::LdFldA(_) => "ldflda",
            Op::StFld(_) => "stfld",
            Op::LdSFld(_) => "ldsfld",
            Op::LdSFldA(_) => "ldsflda",
            Op::StSFld(_) => "stsfld",
            Op::NewObj(_) => "newobj",
            Op::Call(_) => "call",
            Op::CallVirt(_) => "callvirt",
            Op::Ret => "ret",
            Op::IsInst(_) => "isinst",
            Op::CastClass(_) => "castclass",
            Op::Box(_) => "box",
            Op::Unbox(_) => "unbox",
            Op::UnboxAny(_) => "unbox.any",
            Op::Conv(_) => "conv",
            Op::ConvOvf(_) => "conv.ovf",
            Op::ConvOvfUn(_) => "conv.ovf.un",
            Op::ConvRUn => "conv.r.un",
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Mul => "mul",
            Op::Div => "div",
            Op::DivUn => "div.un",
            Op::Rem => "rem",
            Op::RemUn => "rem.un",
            Op::AddOvf => "add.ovf",
            Op::AddOvfUn => "add.ovf.un",
            Op::SubOvf => "sub.ovf",
            Op::SubOvfUn => "sub.ovf.un",
            Op::MulOvf => "mul.ovf",
            Op::MulOvfUn => "mul.ovf.un",
            Op::Neg => "neg",
            Op::Not => "not",
            Op::And => "and",
            Op::Or => "or",
            Op::Xor => "xor",
            Op::Shl => "shl",
            Op::Shr => "shr",
            Op::ShrUn => "shr.un",
            Op::LdInd(_) => "ldind",
            Op::LdIndRef => "ldind.ref",
            Op::StInd(_) => "stind",
            Op::StIndRef => "stind.ref",
            Op::LdObj(_) => "ldobj",
            Op::StObj(_) => "stobj",
            Op::InitObj(_) => "initobj",
            Op::NewArr(_) => "newarr",
            Op::LdLen => "ldlen",
            Op::LdElem(_) => "ldelem",
            Op::LdElemA(_) => "ldelema",
            Op::StElem(_) => "stelem",
            Op::Br(_) => "br",
            Op::BrTrue(_) => "brtrue",
            Op::BrFalse(_) => "brfalse",
            Op::Beq(_) => "beq",
            Op::BneUn(_) => "bne.un",
            Op::Bgt(_) => "bgt",
            Op::BleUn(_) => "ble.un",
            Op::Bge(_) => "bge",
            Op::BltUn(_) => "blt.un",
            Op::Blt(_) => "blt",
            Op::BgeUn(_) => "bge.un",
            Op::Ble(_) => "ble",
            Op::BgtUn(_) => "bgt.un",
            Op::Switch(_) => "switch",
            Op::Leave(_) => "leave",
            Op::Ceq => "ceq",
            Op::Cgt => "cgt",
            Op::CgtUn => "cgt.un",
            Op::Clt => "clt",
            Op::CltUn => "clt.un",
            Op::LdFtn(_) => "ldftn",
            Op::LdVirtFtn(_) => "ldvirtftn",
            Op::SizeOf(_) => "sizeof",
            Op::LocAlloc => "localloc",
            Op::Throw => "throw",
            Op::Rethrow => "rethrow",
            Op::EndFinally => "endfinally",
        }
    }

    pub fn flow(&self) -> Flow {
        match self {
            Op::Br(_) | Op::Leave(_) => Flow::Branch,
            Op::BrTrue(_)
            | Op::BrFalse(_)
            | Op::Beq(_)
            | Op::BneUn(_)
            | Op::Bgt(_)
            | Op::BleUn(_)
            | Op::Bge(_)
            | Op::BltUn(_)
            | Op::Blt(_)
            | Op::BgeUn(_)
            | Op::Ble(_)
            | Op::BgtUn(_)
            | Op::Switch(_) => Flow::CondBranch,
            Op::Ret | Op::EndFinally => Flow::Return,
            Op::Throw | Op::Rethrow => Flow::Throw,
            _ => Flow::Next,
        }
    }

    /// Branch targets named by this instruction
    pub fn targets(&self) -> Vec<u32> {
        match self {
            Op::Br(t)
            | Op::Leave(t)
            | Op::BrTrue(t)
            | Op::BrFalse(t)
            | Op::Beq(t)
            | Op::BneUn(t)
            | Op::Bgt(t)
            | Op::BleUn(t)
            | Op::Bge(t)
            | Op::BltUn(t)
            | Op::Blt(t)
            | Op::BgeUn(t)
            | Op::Ble(t)
            | Op::BgtUn(t) => vec![*t],
            Op::Switch(targets) => targets.clone(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_classification() {
        assert_eq!(Op::Br(4).flow(), Flow::Branch);
        assert_eq!(Op::BleUn(4).flow(), Flow::CondBranch);
        assert_eq!(Op::Ret.flow(), Flow::Return);
        assert_eq!(Op::Rethrow.flow(), Flow::Throw);
        assert_eq!(Op::Add.flow(), Flow::Next);
        assert!(Op::Leave(2).flow().is_transfer());
        assert!(!Op::Switch(vec![1, 2]).flow().is_transfer());
    }

    #[test]
    fn test_switch_targets() {
        assert_eq!(Op::Switch(vec![3, 7]).targets(), vec![3, 7]);
        assert!(Op::Nop.targets().is_empty());
    }
}
