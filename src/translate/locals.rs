//! Local variable layout of a translated method
//!
//! Slot order: receiver, parameters, declared locals, reference boxes for
//! address-taken parameters, translator-owned locals, then scratch slots.
//! Category-2 values take two slots.

use std::collections::HashSet;

use crate::types::TypeDesc;

#[derive(Debug, Clone, PartialEq)]
pub struct LocalSlot {
    pub index: u16,
    /// Declared source type
    pub ty: TypeDesc,
    /// Slot holding the `system/Reference` box when the address is taken
    pub boxed: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct LocalsLayout {
    this: Option<LocalSlot>,
    args: Vec<LocalSlot>,
    locals: Vec<LocalSlot>,
    next: u16,
    high_water: u16,
}

/// Address-taken values live in a reference box unless they are structs,
/// whose object already is the address
fn needs_box(ty: &TypeDesc, taken: bool) -> bool {
    taken && !ty.is_struct()
}

impl LocalsLayout {
    pub fn new(
        this: Option<TypeDesc>,
        params: &[TypeDesc],
        declared: &[TypeDesc],
        taken_args: &HashSet<u16>,
        taken_locals: &HashSet<u16>,
    ) -> Self {
        let mut next = 0u16;
        let this = this.map(|ty| {
            next = 1;
            LocalSlot { index: 0, ty, boxed: None }
        });
        let arg_base = if this.is_some() { 1 } else { 0 };

        let mut args = Vec::with_capacity(params.len());
        for ty in params {
            args.push(LocalSlot { index: next, ty: ty.clone(), boxed: None });
            next += ty.category().max(1);
        }

        let mut locals = Vec::with_capacity(declared.len());
        for (n, ty) in declared.iter().enumerate() {
            if needs_box(ty, taken_locals.contains(&(n as u16))) {
                locals.push(LocalSlot { index: next, ty: ty.clone(), boxed: Some(next) });
                next += 1;
            } else {
                locals.push(LocalSlot { index: next, ty: ty.clone(), boxed: None });
                next += ty.category().max(1);
            }
        }

        for (n, arg) in args.iter_mut().enumerate() {
            if needs_box(&arg.ty, taken_args.contains(&(n as u16 + arg_base))) {
                arg.boxed = Some(next);
                next += 1;
            }
        }

        Self { this, args, locals, next, high_water: next }
    }

    pub fn this(&self) -> Option<&LocalSlot> {
        self.this.as_ref()
    }

    /// Argument `n` in source numbering, where the receiver is argument 0
    pub fn arg(&self, n: u16) -> Option<&LocalSlot> {
        match &self.this {
            Some(this) if n == 0 => Some(this),
            Some(_) => self.args.get(n as usize - 1),
            None => self.args.get(n as usize),
        }
    }

    pub fn args(&self) -> &[LocalSlot] {
        &self.args
    }

    pub fn local(&self, n: u16) -> Option<&LocalSlot> {
        self.locals.get(n as usize)
    }

    pub fn locals(&self) -> &[LocalSlot] {
        &self.locals
    }

    /// Slot count of receiver and parameters
    pub fn param_slots(&self) -> u16 {
        self.args
            .last()
            .map(|a| a.index + a.ty.category().max(1))
            .unwrap_or(if self.this.is_some() { 1 } else { 0 })
    }

    /// A translator-owned local living for the whole method
    pub fn alloc(&mut self, ty: &TypeDesc) -> u16 {
        let slot = self.next;
        self.next += ty.category().max(1);
        self.high_water = self.high_water.max(self.next);
        slot
    }

    pub fn temp_mark(&self) -> u16 {
        self.next
    }

    /// Scratch slot, valid until `release_temps` with an earlier mark
    pub fn alloc_temp(&mut self, ty: &TypeDesc) -> u16 {
        self.alloc(ty)
    }

    pub fn release_temps(&mut self, mark: u16) {
        self.next = mark;
    }

    pub fn high_water(&self) -> u16 {
        self.high_water
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wide_params_take_two_slots() {
        let layout = LocalsLayout::new(
            Some(TypeDesc::named("A")),
            &[TypeDesc::I64, TypeDesc::I32],
            &[TypeDesc::F64],
            &HashSet::new(),
            &HashSet::new(),
        );
        assert_eq!(layout.arg(0).map(|s| s.index), Some(0));
        assert_eq!(layout.arg(1).map(|s| s.index), Some(1));
        assert_eq!(layout.arg(2).map(|s| s.index), Some(3));
        assert_eq!(layout.local(0).map(|s| s.index), Some(4));
        assert_eq!(layout.param_slots(), 4);
        assert_eq!(layout.high_water(), 6);
    }

    #[test]
    fn test_address_taken_slots_are_boxed() {
        let taken_args: HashSet<u16> = [0].into_iter().collect();
        let taken_locals: HashSet<u16> = [0, 1].into_iter().collect();
        let layout = LocalsLayout::new(
            None,
            &[TypeDesc::I64],
            &[TypeDesc::I64, TypeDesc::value("Point")],
            &taken_args,
            &taken_locals,
        );
        let arg = layout.arg(0).unwrap();
        assert_eq!(arg.index, 0);
        assert_eq!(arg.boxed, Some(4));
        assert_eq!(layout.local(0).unwrap().boxed, Some(2));
        assert_eq!(layout.local(1).unwrap().boxed, None);
    }

    #[test]
    fn test_temps_are_released() {
        let mut layout = LocalsLayout::new(None, &[TypeDesc::I32], &[], &HashSet::new(), &HashSet::new());
        let mark = layout.temp_mark();
        assert_eq!(layout.alloc_temp(&TypeDesc::I64), 1);
        layout.release_temps(mark);
        assert_eq!(layout.alloc_temp(&TypeDesc::I32), 1);
        assert_eq!(layout.high_water(), 3);
    }
}
