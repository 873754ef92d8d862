//! Code buffer - symbolic target instructions plus the operand-stack/local
//! type state they run against
//!
//! The buffer does not encode bytes. Jumps name labels, constants carry their
//! values, and every label that can be reached by a jump or handler has a
//! recorded `Frame`. Stack effects are applied by the caller through
//! `push`/`pop`, keeping emission and bookkeeping side by side.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::types::{StackKind, TypeDesc};

use super::error::{StackError, StackResult};
use super::frame::Frame;
use super::opcodes;

/// Position in the emitted code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Constant pushed by `Insn::Push`
#[derive(Debug, Clone, PartialEq)]
pub enum Const {
    Null,
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// Class literal, by internal name
    Class(String),
}

/// One symbolic target instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Insn {
    /// Operand-free opcode
    Op(u8),
    Push(Const),
    Local { op: u8, index: u16 },
    Field { op: u8, owner: String, name: String, descriptor: String },
    Invoke { op: u8, owner: String, name: String, descriptor: String },
    /// `NEW`, `ANEWARRAY`, `CHECKCAST`, `INSTANCEOF`
    Type { op: u8, class: String },
    NewArray(u8),
    Jump { op: u8, target: Label },
    TableSwitch { low: i32, default: Label, targets: Vec<Label> },
    Mark(Label),
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use opcodes::mnemonic;
        match self {
            Insn::Op(op) => write!(f, "{}", mnemonic(*op)),
            Insn::Push(c) => match c {
                Const::Null => write!(f, "aconst_null"),
                Const::Int(v) => write!(f, "push {}", v),
                Const::Long(v) => write!(f, "push {}L", v),
                Const::Float(v) => write!(f, "push {}F", v),
                Const::Double(v) => write!(f, "push {}D", v),
                Const::String(s) => write!(f, "ldc {:?}", s),
                Const::Class(c) => write!(f, "ldc class {}", c),
            },
            Insn::Local { op, index } => write!(f, "{} {}", mnemonic(*op), index),
            Insn::Field { op, owner, name, descriptor } => {
                write!(f, "{} {}.{}:{}", mnemonic(*op), owner, name, descriptor)
            }
            Insn::Invoke { op, owner, name, descriptor } => {
                write!(f, "{} {}.{}{}", mnemonic(*op), owner, name, descriptor)
            }
            Insn::Type { op, class } => write!(f, "{} {}", mnemonic(*op), class),
            Insn::NewArray(atype) => write!(f, "newarray {}", atype),
            Insn::Jump { op, target } => write!(f, "{} {}", mnemonic(*op), target),
            Insn::TableSwitch { low, default, targets } => {
                write!(f, "tableswitch {} [", low)?;
                for (i, t) in targets.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, "] default {}", default)
            }
            Insn::Mark(label) => write!(f, "{}:", label),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionEntry {
    pub start: Label,
    pub end: Label,
    pub handler: Label,
    /// `None` catches everything
    pub catch_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineNumberEntry {
    pub start: Label,
    pub line: u32,
}

/// Operand stack and tracked locals of the code being emitted
#[derive(Debug, Clone, Default)]
pub struct TypeState {
    pub stack: Vec<TypeDesc>,
    /// Slots used by the stack, counting category-2 values twice
    pub slots: u16,
    pub locals: Vec<Option<TypeDesc>>,
}

impl TypeState {
    fn snapshot(&self) -> Frame {
        Frame::new(self.stack.clone(), self.locals.clone())
    }

    fn restore(&mut self, frame: &Frame) {
        self.stack = frame.stack.clone();
        self.slots = frame.stack.iter().map(TypeDesc::category).sum();
        self.locals = frame.locals.clone();
    }
}

#[derive(Debug, Default)]
pub struct Code {
    insns: Vec<Insn>,
    state: TypeState,
    reachable: bool,
    frames: BTreeMap<Label, Frame>,
    placed: HashSet<Label>,
    exception_table: Vec<ExceptionEntry>,
    line_numbers: Vec<LineNumberEntry>,
    next_label: u32,
    max_stack: u16,
    max_locals: u16,
}

impl Code {
    pub fn new() -> Self {
        Self {
            reachable: true,
            ..Default::default()
        }
    }

    pub fn emit(&mut self, insn: Insn) {
        self.insns.push(insn);
    }

    pub fn op(&mut self, op: u8) {
        self.emit(Insn::Op(op));
    }

    pub fn constant(&mut self, c: Const) {
        self.emit(Insn::Push(c));
    }

    pub fn local(&mut self, op: u8, index: u16) {
        self.emit(Insn::Local { op, index });
    }

    pub fn field(&mut self, op: u8, owner: impl Into<String>, name: impl Into<String>, descriptor: impl Into<String>) {
        self.emit(Insn::Field {
            op,
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        });
    }

    pub fn invoke(&mut self, op: u8, owner: impl Into<String>, name: impl Into<String>, descriptor: impl Into<String>) {
        self.emit(Insn::Invoke {
            op,
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        });
    }

    pub fn invoke_static(&mut self, owner: impl Into<String>, name: impl Into<String>, descriptor: impl Into<String>) {
        self.invoke(opcodes::INVOKESTATIC, owner, name, descriptor);
    }

    pub fn invoke_virtual(&mut self, owner: impl Into<String>, name: impl Into<String>, descriptor: impl Into<String>) {
        self.invoke(opcodes::INVOKEVIRTUAL, owner, name, descriptor);
    }

    pub fn type_op(&mut self, op: u8, class: impl Into<String>) {
        self.emit(Insn::Type { op, class: class.into() });
    }

    pub fn jump(&mut self, op: u8, target: Label) {
        self.emit(Insn::Jump { op, target });
    }

    pub fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    pub fn place(&mut self, label: Label) {
        self.placed.insert(label);
        self.emit(Insn::Mark(label));
    }

    pub fn is_placed(&self, label: Label) -> bool {
        self.placed.contains(&label)
    }

    // Type state

    pub fn push(&mut self, ty: TypeDesc) {
        let width = ty.category();
        if width == 0 {
            return;
        }
        self.state.slots += width;
        self.max_stack = self.max_stack.max(self.state.slots);
        self.state.stack.push(ty);
    }

    pub fn pop(&mut self) -> StackResult<TypeDesc> {
        let ty = self.state.stack.pop().ok_or(StackError::Underflow)?;
        self.state.slots -= ty.category();
        Ok(ty)
    }

    /// Pop `n` values, returned in push order
    pub fn pop_n(&mut self, n: usize) -> StackResult<Vec<TypeDesc>> {
        if self.state.stack.len() < n {
            return Err(StackError::Underflow);
        }
        let mut values = Vec::with_capacity(n);
        for _ in 0..n {
            values.push(self.pop()?);
        }
        values.reverse();
        Ok(values)
    }

    /// Value `depth` entries below the top
    pub fn peek(&self, depth: usize) -> StackResult<&TypeDesc> {
        let len = self.state.stack.len();
        if depth >= len {
            return Err(StackError::Underflow);
        }
        Ok(&self.state.stack[len - 1 - depth])
    }

    pub fn replace_top(&mut self, ty: TypeDesc) -> StackResult<()> {
        self.pop()?;
        self.push(ty);
        Ok(())
    }

    pub fn stack(&self) -> &[TypeDesc] {
        &self.state.stack
    }

    pub fn stack_slots(&self) -> u16 {
        self.state.slots
    }

    pub fn clear_stack(&mut self) {
        self.state.stack.clear();
        self.state.slots = 0;
    }

    /// Guarantee `slots` extra stack headroom above the current depth
    pub fn reserve_stack(&mut self, slots: u16) {
        self.max_stack = self.max_stack.max(self.state.slots + slots);
    }

    /// Track a local's type for frames
    pub fn set_local(&mut self, slot: u16, ty: TypeDesc) {
        let width = ty.category().max(1);
        let needed = (slot + width) as usize;
        if self.state.locals.len() < needed {
            self.state.locals.resize(needed, None);
        }
        self.state.locals[slot as usize] = Some(ty);
        if width == 2 {
            self.state.locals[slot as usize + 1] = None;
        }
        self.use_locals(slot + width);
    }

    pub fn local_type(&self, slot: u16) -> Option<&TypeDesc> {
        self.state.locals.get(slot as usize).and_then(Option::as_ref)
    }

    pub fn tracked_locals(&self) -> &[Option<TypeDesc>] {
        &self.state.locals
    }

    /// Note that slots below `count` are in use, tracked or not
    pub fn use_locals(&mut self, count: u16) {
        self.max_locals = self.max_locals.max(count);
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    // Frames

    /// Record the current state at `label`, merging with an earlier recording
    pub fn record_frame(&mut self, label: Label) -> StackResult<()> {
        let frame = self.state.snapshot();
        self.merge_frame(label, frame)
    }

    /// Record the current locals with an explicit stack (handler entries)
    pub fn record_frame_with_stack(&mut self, label: Label, stack: Vec<TypeDesc>) -> StackResult<()> {
        let slots: u16 = stack.iter().map(TypeDesc::category).sum();
        self.max_stack = self.max_stack.max(slots);
        let frame = Frame::new(stack, self.state.locals.clone());
        self.merge_frame(label, frame)
    }

    fn merge_frame(&mut self, label: Label, frame: Frame) -> StackResult<()> {
        match self.frames.get_mut(&label) {
            Some(recorded) => recorded.merge_with(label, &frame),
            None => {
                log::trace!("frame {} stack={:?}", label, frame.stack);
                self.frames.insert(label, frame);
                Ok(())
            }
        }
    }

    /// Continue from the frame recorded at `label`; false if there is none
    pub fn load_frame(&mut self, label: Label) -> bool {
        match self.frames.get(&label) {
            Some(frame) => {
                self.state.restore(frame);
                self.reachable = true;
                true
            }
            None => false,
        }
    }

    /// Adopt a frame's types for code that is not known to be reachable
    pub fn preview_frame(&mut self, label: Label) -> bool {
        match self.frames.get(&label) {
            Some(frame) => {
                self.state.restore(frame);
                true
            }
            None => false,
        }
    }

    pub fn has_frame(&self, label: Label) -> bool {
        self.frames.contains_key(&label)
    }

    pub fn frame(&self, label: Label) -> Option<&Frame> {
        self.frames.get(&label)
    }

    pub fn frames(&self) -> &BTreeMap<Label, Frame> {
        &self.frames
    }

    // Tables

    pub fn add_exception(&mut self, start: Label, end: Label, handler: Label, catch_type: Option<String>) {
        self.exception_table.push(ExceptionEntry { start, end, handler, catch_type });
    }

    pub fn exception_table(&self) -> &[ExceptionEntry] {
        &self.exception_table
    }

    pub fn add_line(&mut self, start: Label, line: u32) {
        self.line_numbers.push(LineNumberEntry { start, line });
    }

    pub fn line_numbers(&self) -> &[LineNumberEntry] {
        &self.line_numbers
    }

    pub fn insns(&self) -> &[Insn] {
        &self.insns
    }

    pub fn max_stack(&self) -> u16 {
        self.max_stack
    }

    pub fn max_locals(&self) -> u16 {
        self.max_locals
    }

    /// One line per instruction, for diagnostics and tests
    pub fn listing(&self) -> Vec<String> {
        self.insns.iter().map(ToString::to_string).collect()
    }
}

/// Load opcode for a value of `kind`
pub fn load_op(kind: StackKind) -> u8 {
    match kind {
        StackKind::Int => opcodes::ILOAD,
        StackKind::Long => opcodes::LLOAD,
        StackKind::Float => opcodes::FLOAD,
        StackKind::Double => opcodes::DLOAD,
        StackKind::Ref => opcodes::ALOAD,
    }
}

pub fn store_op(kind: StackKind) -> u8 {
    match kind {
        StackKind::Int => opcodes::ISTORE,
        StackKind::Long => opcodes::LSTORE,
        StackKind::Float => opcodes::FSTORE,
        StackKind::Double => opcodes::DSTORE,
        StackKind::Ref => opcodes::ASTORE,
    }
}

pub fn return_op(kind: StackKind) -> u8 {
    match kind {
        StackKind::Int => opcodes::IRETURN,
        StackKind::Long => opcodes::LRETURN,
        StackKind::Float => opcodes::FRETURN,
        StackKind::Double => opcodes::DRETURN,
        StackKind::Ref => opcodes::ARETURN,
    }
}

/// `POP` or `POP2` for a value of type `ty`
pub fn pop_op(ty: &TypeDesc) -> u8 {
    if ty.category() == 2 {
        opcodes::POP2
    } else {
        opcodes::POP
    }
}

/// Zero constant of a stack kind
pub fn zero_of(kind: StackKind) -> Const {
    match kind {
        StackKind::Int => Const::Int(0),
        StackKind::Long => Const::Long(0),
        StackKind::Float => Const::Float(0.0),
        StackKind::Double => Const::Double(0.0),
        StackKind::Ref => Const::Null,
    }
}

/// Storable kind of `ty`
pub fn kind_of(ty: &TypeDesc) -> StackResult<StackKind> {
    ty.stack_kind().ok_or_else(|| StackError::NotStorable { ty: ty.clone() })
}
