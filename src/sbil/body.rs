//! Method bodies: instructions, declared locals, exception regions and line maps

use crate::types::TypeDesc;

use super::opcode::Op;

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub offset: u32,
    pub op: Op,
}

impl Instruction {
    pub fn new(offset: u32, op: Op) -> Self {
        Self { offset, op }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegionKind {
    Catch(TypeDesc),
    Finally,
    Fault,
    Filter,
}

/// A protected range and its handler. Ends are exclusive offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionRegion {
    pub kind: RegionKind,
    pub try_start: u32,
    pub try_end: u32,
    pub handler_start: u32,
    pub handler_end: u32,
}

impl ExceptionRegion {
    pub fn new(kind: RegionKind, try_range: (u32, u32), handler_range: (u32, u32)) -> Self {
        Self {
            kind,
            try_start: try_range.0,
            try_end: try_range.1,
            handler_start: handler_range.0,
            handler_end: handler_range.1,
        }
    }

    pub fn protects(&self, offset: u32) -> bool {
        offset >= self.try_start && offset < self.try_end
    }

    pub fn in_handler(&self, offset: u32) -> bool {
        offset >= self.handler_start && offset < self.handler_end
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodBody {
    pub instructions: Vec<Instruction>,
    pub locals: Vec<TypeDesc>,
    pub regions: Vec<ExceptionRegion>,
    /// (offset, source line), sorted by offset
    pub lines: Vec<(u32, u32)>,
}

impl MethodBody {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            ..Default::default()
        }
    }

    /// Body whose instruction offsets are their indices
    pub fn sequential(ops: Vec<Op>) -> Self {
        let instructions = ops
            .into_iter()
            .enumerate()
            .map(|(i, op)| Instruction::new(i as u32, op))
            .collect();
        Self::new(instructions)
    }

    pub fn with_locals(mut self, locals: Vec<TypeDesc>) -> Self {
        self.locals = locals;
        self
    }

    pub fn with_region(mut self, region: ExceptionRegion) -> Self {
        self.regions.push(region);
        self
    }

    pub fn with_line(mut self, offset: u32, line: u32) -> Self {
        let at = self.lines.partition_point(|&(o, _)| o <= offset);
        self.lines.insert(at, (offset, line));
        self
    }

    /// Source line covering `offset`
    pub fn line_at(&self, offset: u32) -> Option<u32> {
        let at = self.lines.partition_point(|&(o, _)| o <= offset);
        at.checked_sub(1).map(|i| self.lines[i].1)
    }

    /// Line that starts exactly at `offset`
    pub fn line_starting_at(&self, offset: u32) -> Option<u32> {
        self.lines.iter().find(|&&(o, _)| o == offset).map(|&(_, line)| line)
    }

    pub fn last_offset(&self) -> Option<u32> {
        self.instructions.last().map(|i| i.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_lookup() {
        let body = MethodBody::sequential(vec![Op::Nop, Op::Nop, Op::Nop, Op::Ret])
            .with_line(0, 10)
            .with_line(2, 12);
        assert_eq!(body.line_at(1), Some(10));
        assert_eq!(body.line_at(3), Some(12));
        assert_eq!(body.line_starting_at(2), Some(12));
        assert_eq!(body.line_starting_at(3), None);
        assert_eq!(body.last_offset(), Some(3));
    }
}
