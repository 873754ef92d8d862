//! Exception regions: handler table entries, handler-entry frames and the
//! lowering of finally/fault regions to catch-all handlers
//!
//! A finally handler runs either after a `leave` (the dispatch local holds
//! the index of the leave target) or after an exception (dispatch local -1,
//! the exception parked in the region's exception local). `endfinally`
//! switches on the dispatch local and rethrows on the default arm.

use crate::codegen::code::pop_op;
use crate::codegen::descriptor::class_name;
use crate::codegen::{opcodes, Const, Label};
use crate::error::{Error, Result};
use crate::sbil::{ExceptionRegion, Op, RegionKind};
use crate::types::TypeDesc;

use super::translator::MethodTranslator;

const SOURCE_EXCEPTION: &str = "System.Exception";

/// Where a finally handler continues after a `leave`
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LeaveTarget {
    Offset(u32),
    /// Run the enclosing finally region next, which then leaves to `target`
    Finally { region: usize, target: u32 },
}

#[derive(Debug, Clone)]
pub(crate) struct RegionState {
    pub region: ExceptionRegion,
    /// Type held by the exception local
    pub exception: TypeDesc,
    pub exception_slot: u16,
    /// Leave-target index of a finally region; -1 means "rethrow"
    pub dispatch_slot: Option<u16>,
    /// Continuations of the `leave`s out of the protected range
    pub leave_targets: Vec<LeaveTarget>,
    /// Catch-all entry of a finally/fault handler
    pub stub: Option<Label>,
}

impl RegionState {
    fn is_catch(&self) -> bool {
        matches!(self.region.kind, RegionKind::Catch(_))
    }

    fn handler_len(&self) -> u32 {
        self.region.handler_end - self.region.handler_start
    }
}

impl MethodTranslator<'_> {
    pub(super) fn plan_regions(&mut self) -> Result<()> {
        let body = self.body;
        for region in &body.regions {
            let exception = match &region.kind {
                RegionKind::Catch(ty) => self.resolver.substitute(ty)?,
                RegionKind::Finally | RegionKind::Fault => TypeDesc::named(SOURCE_EXCEPTION),
                RegionKind::Filter => {
                    return Err(Error::unsupported(format!(
                        "filter region at IL_{:04x}",
                        region.handler_start
                    )))
                }
            };
            let exception_slot = self.locals.alloc(&exception);
            let mut state = RegionState {
                region: region.clone(),
                exception,
                exception_slot,
                dispatch_slot: None,
                leave_targets: Vec::new(),
                stub: None,
            };
            match region.kind {
                RegionKind::Finally => {
                    state.dispatch_slot = Some(self.locals.alloc(&TypeDesc::I32));
                    state.stub = Some(self.code.new_label());
                }
                RegionKind::Fault => state.stub = Some(self.code.new_label()),
                _ => {}
            }
            self.regions.push(state);
        }

        for insn in &body.instructions {
            if let Op::Leave(target) = insn.op {
                let crossed = self.crossed_finally(insn.offset, target);
                for (k, &index) in crossed.iter().enumerate() {
                    let next = match crossed.get(k + 1) {
                        Some(&outer) => LeaveTarget::Finally { region: outer, target },
                        None => LeaveTarget::Offset(target),
                    };
                    let targets = &mut self.regions[index].leave_targets;
                    if !targets.contains(&next) {
                        targets.push(next);
                    }
                }
            }
        }
        Ok(())
    }

    /// Finally regions a `leave` at `offset` to `target` runs, innermost first
    fn crossed_finally(&self, offset: u32, target: u32) -> Vec<usize> {
        let mut crossed: Vec<usize> = (0..self.regions.len())
            .filter(|&i| {
                let region = &self.regions[i].region;
                matches!(region.kind, RegionKind::Finally) && region.protects(offset) && !region.protects(target)
            })
            .collect();
        crossed.sort_by_key(|&i| {
            let region = &self.regions[i].region;
            region.try_end - region.try_start
        });
        crossed
    }

    /// Continue into the handler of finally region `index` with its dispatch
    /// local selecting `next`
    fn enter_finally(&mut self, index: usize, next: &LeaveTarget) -> Result<()> {
        let state = self.regions[index].clone();
        let position = state
            .leave_targets
            .iter()
            .position(|t| t == next)
            .ok_or_else(|| Error::internal("leave target missing from finally dispatch"))?;
        let slot = state
            .dispatch_slot
            .ok_or_else(|| Error::internal("finally region without a dispatch local"))?;
        self.code.reserve_stack(1);
        self.code.constant(Const::Int(position as i32));
        self.code.local(opcodes::ISTORE, slot);
        let handler = self.label_for(state.region.handler_start);
        self.code.record_frame(handler)?;
        self.code.jump(opcodes::GOTO, handler);
        Ok(())
    }

    /// Prologue: region locals get a fixed type for every frame
    pub(super) fn init_region_locals(&mut self) {
        let regions = self.regions.clone();
        for state in regions {
            self.code.reserve_stack(1);
            self.code.constant(Const::Null);
            self.code.local(opcodes::ASTORE, state.exception_slot);
            self.code.set_local(state.exception_slot, state.exception.clone());
            if let Some(slot) = state.dispatch_slot {
                self.code.constant(Const::Int(0));
                self.code.local(opcodes::ISTORE, slot);
                self.code.set_local(slot, TypeDesc::I32);
            }
        }
    }

    /// Runs before the label of `offset` is placed: opens protected ranges
    /// starting here and emits the catch-all stubs of handlers starting here
    pub(super) fn enter_regions(&mut self, offset: u32) -> Result<()> {
        for index in 0..self.regions.len() {
            let state = self.regions[index].clone();
            if state.region.try_start == offset {
                let start = self.label_for(offset);
                let end = self.label_for(state.region.try_end);
                let (handler, catch_type) = match (&state.region.kind, state.stub) {
                    (RegionKind::Catch(_), _) => {
                        (self.label_for(state.region.handler_start), Some(class_name(&state.exception)))
                    }
                    (_, Some(stub)) => (stub, None),
                    _ => return Err(Error::internal("handler without an entry label")),
                };
                self.code.add_exception(start, end, handler, catch_type);
                self.code.record_frame_with_stack(handler, vec![state.exception.clone()])?;
                log::trace!(
                    "region IL_{:04x}..IL_{:04x} -> {}",
                    state.region.try_start,
                    state.region.try_end,
                    handler
                );
            }
            if state.region.handler_start == offset {
                if let Some(stub) = state.stub {
                    self.code.place(stub);
                    if !self.code.load_frame(stub) {
                        return Err(Error::internal("handler entered before its protected range"));
                    }
                    self.code.pop()?;
                    self.code.local(opcodes::ASTORE, state.exception_slot);
                    if let Some(slot) = state.dispatch_slot {
                        self.code.constant(Const::Int(-1));
                        self.code.local(opcodes::ISTORE, slot);
                    }
                }
            }
        }
        Ok(())
    }

    /// Runs after the label of `offset` is settled: a catch handler parks its
    /// exception for `rethrow`
    pub(super) fn enter_handler(&mut self, offset: u32) -> Result<()> {
        let slot = self
            .regions
            .iter()
            .find(|s| s.is_catch() && s.region.handler_start == offset)
            .map(|s| s.exception_slot);
        if let Some(slot) = slot {
            self.code.reserve_stack(1);
            self.code.op(opcodes::DUP);
            self.code.local(opcodes::ASTORE, slot);
        }
        Ok(())
    }

    /// Innermost region whose handler contains the current instruction
    fn current_handler(&self, catch: bool) -> Option<&RegionState> {
        let offset = self.body.instructions[self.index].offset;
        self.regions
            .iter()
            .filter(|s| s.region.in_handler(offset) && s.is_catch() == catch)
            .min_by_key(|s| s.handler_len())
    }

    pub(super) fn leave(&mut self, target: u32) -> Result<()> {
        while let Some(ty) = self.code.stack().last().cloned() {
            self.code.op(pop_op(&ty));
            self.code.pop()?;
        }

        let offset = self.body.instructions[self.index].offset;
        let crossed = self.crossed_finally(offset, target);
        match crossed.as_slice() {
            [] => {
                let label = self.label_for(target);
                self.code.record_frame(label)?;
                self.code.jump(opcodes::GOTO, label);
            }
            [innermost, rest @ ..] => {
                let next = match rest.first() {
                    Some(&outer) => LeaveTarget::Finally { region: outer, target },
                    None => LeaveTarget::Offset(target),
                };
                self.enter_finally(*innermost, &next)?;
            }
        }
        Ok(())
    }

    pub(super) fn end_finally(&mut self) -> Result<()> {
        let state = self
            .current_handler(false)
            .cloned()
            .ok_or_else(|| Error::unsupported("endfinally outside a finally or fault handler"))?;
        self.code.clear_stack();

        if let (RegionKind::Finally, Some(slot), false) =
            (&state.region.kind, state.dispatch_slot, state.leave_targets.is_empty())
        {
            let mut targets = Vec::with_capacity(state.leave_targets.len());
            let mut chained = Vec::new();
            for next in &state.leave_targets {
                match next {
                    LeaveTarget::Offset(offset) => targets.push(self.label_for(*offset)),
                    LeaveTarget::Finally { region, target } => {
                        let label = self.code.new_label();
                        targets.push(label);
                        chained.push((label, *region, *target));
                    }
                }
            }
            let rethrow = self.code.new_label();
            self.code.reserve_stack(1);
            self.code.local(opcodes::ILOAD, slot);
            for label in targets.iter().chain(std::iter::once(&rethrow)) {
                self.code.record_frame(*label)?;
            }
            self.code.emit(crate::codegen::Insn::TableSwitch {
                low: 0,
                default: rethrow,
                targets,
            });
            for (label, region, target) in chained {
                let next = self.next_after(region, target);
                self.code.place(label);
                self.code.load_frame(label);
                self.enter_finally(region, &next)?;
            }
            self.code.place(rethrow);
            self.code.load_frame(rethrow);
        }
        self.code.reserve_stack(1);
        self.code.local(opcodes::ALOAD, state.exception_slot);
        self.code.op(opcodes::ATHROW);
        Ok(())
    }

    /// Continuation of finally region `index` for a leave to `target`: the
    /// next enclosing finally, or the target itself
    fn next_after(&self, index: usize, target: u32) -> LeaveTarget {
        self.regions[index]
            .leave_targets
            .iter()
            .find(|next| match next {
                LeaveTarget::Offset(offset) => *offset == target,
                LeaveTarget::Finally { target: t, .. } => *t == target,
            })
            .cloned()
            .unwrap_or(LeaveTarget::Offset(target))
    }

    pub(super) fn throw(&mut self) -> Result<()> {
        let ty = self.code.pop()?;
        if !ty.is_reference() {
            return Err(Error::type_mismatch(format!("throw of non-reference value {}", ty)));
        }
        self.code.op(opcodes::ATHROW);
        Ok(())
    }

    pub(super) fn rethrow(&mut self) -> Result<()> {
        let slot = self
            .current_handler(true)
            .map(|s| s.exception_slot)
            .ok_or_else(|| Error::unsupported("rethrow outside a catch handler"))?;
        self.code.reserve_stack(1);
        self.code.local(opcodes::ALOAD, slot);
        self.code.op(opcodes::ATHROW);
        Ok(())
    }
}
