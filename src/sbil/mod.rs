//! Source instruction model

pub mod body;
pub mod opcode;

pub use body::{ExceptionRegion, Instruction, MethodBody, RegionKind};
pub use opcode::{Flow, Op};
