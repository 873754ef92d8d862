//! Errors raised by target code bookkeeping

use thiserror::Error;

use crate::types::TypeDesc;

use super::code::Label;

/// Errors in operand-stack and frame bookkeeping
#[derive(Error, Debug, PartialEq)]
pub enum StackError {
    #[error("Stack underflow")]
    Underflow,
    #[error("Frame mismatch at {label}: recorded {recorded:?}, incoming {incoming:?}")]
    FrameMismatch {
        label: Label,
        recorded: Vec<TypeDesc>,
        incoming: Vec<TypeDesc>,
    },
    #[error("No value of a storable kind: {ty}")]
    NotStorable { ty: TypeDesc },
}

/// Result type for stack bookkeeping
pub type StackResult<T> = Result<T, StackError>;
