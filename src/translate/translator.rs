//! Per-method translation state machine
//!
//! Program points are source offsets. Each step records the offset's label,
//! handles exception-region entry, settles the frame at branch targets,
//! dispatches the opcode to its family routine and, after transfers of
//! control, seeds the state for the next linear offset.

use std::collections::{HashMap, HashSet};

use crate::codegen::code::{kind_of, load_op, store_op, zero_of};
use crate::codegen::descriptor::{class_name, field_descriptor};
use crate::codegen::{opcodes, Code, Const, Label};
use crate::config::Config;
use crate::consts::{GENERIC_CLASS, OBJECT_CLASS, REFERENCE_CLASS};
use crate::error::{Error, Location, Result};
use crate::generics::GenericResolver;
use crate::sbil::{Flow, Instruction, MethodBody, Op};
use crate::types::{SourceClass, SourceMethod, StackKind, TypeDesc};

use super::exceptions::RegionState;
use super::locals::LocalsLayout;

/// Erased descriptor used by the runtime helpers for a value of `kind`
pub(super) fn kind_descriptor(kind: StackKind) -> &'static str {
    match kind {
        StackKind::Int => "I",
        StackKind::Long => "J",
        StackKind::Float => "F",
        StackKind::Double => "D",
        StackKind::Ref => "Ljava/lang/Object;",
    }
}

pub(crate) struct MethodTranslator<'a> {
    pub(super) resolver: &'a mut GenericResolver,
    pub(super) config: &'a Config,
    pub(super) class: &'a SourceClass,
    pub(super) method: &'a SourceMethod,
    pub(super) body: &'a MethodBody,
    pub(super) path: String,
    pub(super) code: Code,
    pub(super) locals: LocalsLayout,
    pub(super) labels: HashMap<u32, Label>,
    pub(super) branch_targets: HashSet<u32>,
    pub(super) regions: Vec<RegionState>,
    /// Generic declaring types whose statics are reached through a holder local
    pub(super) static_data: Vec<(TypeDesc, u16)>,
    pub(super) bridge_count: usize,
    pub(super) constructed: bool,
    /// Index of the instruction being translated
    pub(super) index: usize,
}

impl<'a> MethodTranslator<'a> {
    pub(crate) fn new(
        resolver: &'a mut GenericResolver,
        config: &'a Config,
        class: &'a SourceClass,
        method: &'a SourceMethod,
        body: &'a MethodBody,
        bridge_count: usize,
        path: String,
    ) -> Result<Self> {
        let mut taken_args = HashSet::new();
        let mut taken_locals = HashSet::new();
        let mut branch_targets = HashSet::new();
        for insn in &body.instructions {
            match &insn.op {
                Op::LdArgA(n) => {
                    taken_args.insert(*n);
                }
                Op::LdLocA(n) => {
                    taken_locals.insert(*n);
                }
                op => branch_targets.extend(op.targets()),
            }
        }
        for region in &body.regions {
            branch_targets.insert(region.handler_start);
        }

        let this = if method.is_static { None } else { Some(class.open_type()) };
        let params = method
            .params
            .iter()
            .map(|p| resolver.substitute(p))
            .collect::<Result<Vec<_>>>()?;
        let declared = body
            .locals
            .iter()
            .map(|l| resolver.substitute(l))
            .collect::<Result<Vec<_>>>()?;
        let locals = LocalsLayout::new(this, &params, &declared, &taken_args, &taken_locals);

        let mut translator = Self {
            resolver,
            config,
            class,
            method,
            body,
            path,
            code: Code::new(),
            locals,
            labels: HashMap::new(),
            branch_targets,
            regions: Vec::new(),
            static_data: Vec::new(),
            bridge_count,
            constructed: false,
            index: 0,
        };
        translator.plan_regions()?;
        translator.plan_static_data()?;
        Ok(translator)
    }

    pub(super) fn label_for(&mut self, offset: u32) -> Label {
        if let Some(label) = self.labels.get(&offset) {
            return *label;
        }
        let label = self.code.new_label();
        self.labels.insert(offset, label);
        label
    }

    pub(super) fn next_offset(&self) -> Option<u32> {
        self.body.instructions.get(self.index + 1).map(|i| i.offset)
    }

    /// Instructions before the current one
    pub(super) fn preceding(&self) -> &'a [Instruction] {
        let body = self.body;
        &body.instructions[..self.index]
    }

    pub(crate) fn run(mut self) -> Result<Code> {
        let method_location = Location::new(self.path.clone());
        self.prologue().map_err(|e| e.located(method_location.clone()))?;

        let body = self.body;
        for (index, insn) in body.instructions.iter().enumerate() {
            self.index = index;
            self.step(insn).map_err(|e| {
                e.located(method_location.clone().at(insn.offset, insn.op.name(), body.line_at(insn.offset)))
            })?;
        }

        // Region ends past the last instruction
        let mut pending: Vec<(u32, Label)> = self
            .labels
            .iter()
            .filter(|(_, l)| !self.code.is_placed(**l))
            .map(|(o, l)| (*o, *l))
            .collect();
        pending.sort();
        for (_, label) in pending {
            self.code.place(label);
        }
        self.code.use_locals(self.locals.high_water());
        log::debug!(
            "translated {}: {} insns, max_stack={}, max_locals={}, frames={}",
            self.path,
            self.code.insns().len(),
            self.code.max_stack(),
            self.code.max_locals(),
            self.code.frames().len()
        );
        Ok(self.code)
    }

    fn step(&mut self, insn: &Instruction) -> Result<()> {
        let offset = insn.offset;
        self.enter_regions(offset)?;

        let label = self.label_for(offset);
        self.code.place(label);
        if self.config.emit_line_numbers {
            if let Some(line) = self.body.line_starting_at(offset) {
                self.code.add_line(label, line);
            }
        }

        if self.code.has_frame(label) {
            if self.code.is_reachable() {
                self.code.record_frame(label)?;
            }
            self.code.load_frame(label);
        } else if self.branch_targets.contains(&offset) {
            self.code.record_frame(label)?;
        }
        self.enter_handler(offset)?;

        log::trace!("IL_{:04x} {:?} stack={:?}", offset, insn.op, self.code.stack());
        self.translate(&insn.op)?;

        match insn.op.flow() {
            flow if flow.is_transfer() => self.after_transfer(),
            Flow::CondBranch => {
                if let Some(next) = self.next_offset() {
                    let label = self.label_for(next);
                    self.code.record_frame(label)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Seed the state for the next linear offset: the first recorded frame
    /// ahead, unless a branch of any kind comes first; otherwise an empty stack
    fn after_transfer(&mut self) {
        self.code.clear_stack();
        self.code.set_reachable(false);
        let body = self.body;
        for next in &body.instructions[self.index + 1..] {
            let label = self.label_for(next.offset);
            if self.code.preview_frame(label) {
                log::trace!("lookahead found frame at IL_{:04x}", next.offset);
                return;
            }
            if next.op.flow().is_transfer() || next.op.flow() == Flow::CondBranch {
                break;
            }
        }
    }

    fn translate(&mut self, op: &Op) -> Result<()> {
        match op {
            Op::Nop => Ok(()),
            Op::Pop => self.pop_value(),
            Op::Dup => self.dup_value(),

            Op::LdArg(n) => self.load_arg(*n),
            Op::LdArgA(n) => self.load_arg_address(*n),
            Op::StArg(n) => self.store_arg(*n),
            Op::LdLoc(n) => self.load_local(*n),
            Op::LdLocA(n) => self.load_local_address(*n),
            Op::StLoc(n) => self.store_local(*n),

            Op::LdNull => self.push_constant(Const::Null, TypeDesc::Null),
            Op::LdcI4(v) => self.push_constant(Const::Int(*v), TypeDesc::I32),
            Op::LdcI8(v) => self.push_constant(Const::Long(*v), TypeDesc::I64),
            Op::LdcR4(v) => self.push_constant(Const::Float(*v), TypeDesc::F32),
            Op::LdcR8(v) => self.push_constant(Const::Double(*v), TypeDesc::F64),
            Op::LdStr(s) => self.push_constant(Const::String(s.clone()), TypeDesc::string()),

            Op::LdFld(f) => self.load_field(f),
            Op::LdFldA(f) => self.load_field_address(f),
            Op::StFld(f) => self.store_field(f),
            Op::LdSFld(f) => self.load_static_field(f),
            Op::LdSFldA(f) => self.load_static_field_address(f),
            Op::StSFld(f) => self.store_static_field(f),

            Op::NewObj(m) => self.new_object(m),
            Op::Call(m) => self.call(m, false),
            Op::CallVirt(m) => self.call(m, true),
            Op::Ret => self.ret(),

            Op::IsInst(t) => self.is_instance(t),
            Op::CastClass(t) => self.cast_class(t),
            Op::Box(t) => self.box_value(t),
            Op::Unbox(t) => self.unbox_address(t),
            Op::UnboxAny(t) => self.unbox_any(t),

            Op::Conv(p) => self.convert(*p),
            Op::ConvOvf(p) => self.convert_checked(*p, false),
            Op::ConvOvfUn(p) => self.convert_checked(*p, true),
            Op::ConvRUn => self.convert_unsigned_to_float(),

            Op::Add
            | Op::Sub
            | Op::Mul
            | Op::Div
            | Op::DivUn
            | Op::Rem
            | Op::RemUn
            | Op::AddOvf
            | Op::AddOvfUn
            | Op::SubOvf
            | Op::SubOvfUn
            | Op::MulOvf
            | Op::MulOvfUn
            | Op::And
            | Op::Or
            | Op::Xor => self.binary(op),
            Op::Shl | Op::Shr | Op::ShrUn => self.shift(op),
            Op::Neg => self.negate(),
            Op::Not => self.bitwise_not(),

            Op::LdInd(p) => self.load_indirect(Some(*p)),
            Op::LdIndRef => self.load_indirect(None),
            Op::StInd(p) => self.store_indirect(Some(*p)),
            Op::StIndRef => self.store_indirect(None),
            Op::LdObj(t) => self.load_object(t),
            Op::StObj(t) => self.store_object(t),
            Op::InitObj(t) => self.init_object(t),

            Op::NewArr(t) => self.new_array(t),
            Op::LdLen => self.array_length(),
            Op::LdElem(t) => self.load_element(t),
            Op::LdElemA(t) => self.load_element_address(t),
            Op::StElem(t) => self.store_element(t),

            Op::Br(t) => self.branch(*t),
            Op::BrTrue(t) => self.branch_truth(*t, true),
            Op::BrFalse(t) => self.branch_truth(*t, false),
            Op::Beq(t) | Op::BneUn(t) | Op::Bgt(t) | Op::BleUn(t) | Op::Bge(t) | Op::BltUn(t) | Op::Blt(t)
            | Op::BgeUn(t) | Op::Ble(t) | Op::BgtUn(t) => self.branch_compare(op, *t),
            Op::Switch(targets) => self.switch(targets),
            Op::Leave(t) => self.leave(*t),

            Op::Ceq | Op::Cgt | Op::CgtUn | Op::Clt | Op::CltUn => self.compare_value(op),

            Op::LdFtn(m) => self.load_function(m, false),
            Op::LdVirtFtn(m) => self.load_function(m, true),

            Op::SizeOf(t) => self.size_of(t),
            Op::LocAlloc => self.stack_alloc(),

            Op::Throw => self.throw(),
            Op::Rethrow => self.rethrow(),
            Op::EndFinally => self.end_finally(),
        }
    }

    // Prologue

    fn prologue(&mut self) -> Result<()> {
        if let Some(this) = self.locals.this().cloned() {
            self.code.set_local(this.index, this.ty);
        }
        let args = self.locals.args().to_vec();
        for arg in &args {
            self.code.set_local(arg.index, arg.ty.clone());
        }
        for arg in &args {
            if let Some(slot) = arg.boxed {
                let kind = kind_of(&arg.ty)?;
                self.code.local(load_op(kind), arg.index);
                self.emit_reference_box(kind);
                self.code.local(opcodes::ASTORE, slot);
                self.code.set_local(slot, TypeDesc::byref(arg.ty.clone()));
            }
        }

        let declared = self.locals.locals().to_vec();
        for local in &declared {
            let kind = kind_of(&local.ty)?;
            match local.boxed {
                Some(slot) => {
                    self.code.constant(zero_of(kind));
                    self.emit_reference_box(kind);
                    self.code.local(opcodes::ASTORE, slot);
                    self.code.set_local(slot, TypeDesc::byref(local.ty.clone()));
                }
                None => {
                    self.emit_default_value(&local.ty)?;
                    self.code.local(store_op(kind), local.index);
                    self.code.set_local(local.index, local.ty.clone());
                }
            }
        }

        self.init_region_locals();
        self.init_static_data()?;

        if self.class.is_value_type && self.method.is_constructor() {
            self.allocate_instance_fields()?;
        }
        if self.method.is_type_initializer() && self.class.generic_params.is_empty() {
            self.allocate_static_fields()?;
        }
        Ok(())
    }

    /// Value on the stack -> `system/Reference` box
    fn emit_reference_box(&mut self, kind: StackKind) {
        self.code.reserve_stack(2);
        self.code.invoke_static(
            REFERENCE_CLASS,
            "box",
            format!("({})Lsystem/Reference;", kind_descriptor(kind)),
        );
    }

    /// Default value of `ty`: zero, null, or a fresh struct object
    pub(super) fn emit_default_value(&mut self, ty: &TypeDesc) -> Result<()> {
        if ty.is_struct() {
            let class = class_name(ty);
            self.code.reserve_stack(2);
            self.code.type_op(opcodes::NEW, class.clone());
            self.code.op(opcodes::DUP);
            self.code.invoke(opcodes::INVOKESPECIAL, class, "<init>", "()V");
        } else {
            self.code.reserve_stack(ty.category());
            self.code.constant(zero_of(kind_of(ty)?));
        }
        Ok(())
    }

    /// Struct-typed instance fields get their objects
    pub(super) fn allocate_instance_fields(&mut self) -> Result<()> {
        let owner = class_name(&self.class.open_type());
        let fields: Vec<_> = self
            .class
            .fields
            .iter()
            .filter(|f| !f.is_static && f.field_type.is_struct())
            .cloned()
            .collect();
        for field in fields {
            self.code.reserve_stack(3);
            self.code.local(opcodes::ALOAD, 0);
            self.emit_default_value(&field.field_type)?;
            self.code
                .field(opcodes::PUTFIELD, owner.clone(), field.name.clone(), field_descriptor(&field.field_type));
        }
        Ok(())
    }

    fn allocate_static_fields(&mut self) -> Result<()> {
        let owner = class_name(&self.class.open_type());
        let fields: Vec<_> = self
            .class
            .fields
            .iter()
            .filter(|f| f.is_static && f.field_type.is_struct())
            .cloned()
            .collect();
        for field in fields {
            self.emit_default_value(&field.field_type)?;
            self.code
                .field(opcodes::PUTSTATIC, owner.clone(), field.name.clone(), field_descriptor(&field.field_type));
        }
        Ok(())
    }

    /// After the base constructor call: struct fields, then the interface
    /// dispatch array when the class has colliding generic contracts
    pub(super) fn after_base_constructor(&mut self) -> Result<()> {
        self.constructed = true;
        if !self.class.is_value_type {
            self.allocate_instance_fields()?;
        }
        if self.bridge_count > 0 {
            let owner = class_name(&self.class.open_type());
            self.code.reserve_stack(2);
            self.code.local(opcodes::ALOAD, 0);
            self.code.constant(Const::Int(self.bridge_count as i32));
            self.code.type_op(opcodes::ANEWARRAY, OBJECT_CLASS);
            self.code.field(
                opcodes::PUTFIELD,
                owner,
                self.config.interface_array_field.clone(),
                "[Ljava/lang/Object;",
            );
        }
        Ok(())
    }

    // Generic static data

    /// Declaring types of static fields that need a per-instantiation holder
    fn plan_static_data(&mut self) -> Result<()> {
        let body = self.body;
        for insn in &body.instructions {
            let field = match &insn.op {
                Op::LdSFld(f) | Op::LdSFldA(f) | Op::StSFld(f) => f,
                _ => continue,
            };
            if !self.resolver.registry().is_generic_definition(&field.declaring) {
                continue;
            }
            let (declaring, _) = self.resolver.resolve_field(field)?;
            if self.static_data.iter().any(|(t, _)| *t == declaring) {
                continue;
            }
            let slot = self.locals.alloc(&declaring);
            self.static_data.push((declaring, slot));
        }
        Ok(())
    }

    fn init_static_data(&mut self) -> Result<()> {
        let entries = self.static_data.clone();
        let own = self.class.open_type();
        for (declaring, slot) in entries {
            let holder = static_holder(&declaring);
            if !declaring.is_open() {
                let args = declaring.args().to_vec();
                self.code.reserve_stack(4);
                self.code.constant(Const::Class(class_name(&declaring)));
                self.code.constant(Const::Int(args.len() as i32));
                self.code.type_op(opcodes::ANEWARRAY, "java/lang/Class");
                for (i, arg) in args.iter().enumerate() {
                    self.code.op(opcodes::DUP);
                    self.code.constant(Const::Int(i as i32));
                    self.code.constant(Const::Class(class_name(arg)));
                    self.code.op(opcodes::AASTORE);
                }
                self.code.invoke_static(
                    GENERIC_CLASS,
                    "staticData",
                    "(Ljava/lang/Class;[Ljava/lang/Class;)Ljava/lang/Object;",
                );
            } else if declaring == own && !self.method.is_static {
                self.code.reserve_stack(1);
                self.code.local(opcodes::ALOAD, 0);
                self.code
                    .invoke_static(GENERIC_CLASS, "staticDataOf", "(Ljava/lang/Object;)Ljava/lang/Object;");
            } else {
                return Err(Error::unsupported(format!(
                    "static data of open generic type {} outside its own instance methods",
                    declaring
                )));
            }
            self.code.type_op(opcodes::CHECKCAST, holder.clone());
            self.code.local(opcodes::ASTORE, slot);
            self.code.set_local(slot, TypeDesc::named(holder));
        }
        Ok(())
    }

    pub(super) fn static_data_slot(&self, declaring: &TypeDesc) -> Option<u16> {
        self.static_data.iter().find(|(t, _)| t == declaring).map(|(_, s)| *s)
    }
}

/// Per-instantiation static field holder of a generic class
pub(super) fn static_holder(declaring: &TypeDesc) -> String {
    format!("{}{}", class_name(declaring), crate::consts::STATIC_DATA_SUFFIX)
}
