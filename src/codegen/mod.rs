//! Target code model
//!
//! Symbolic target instructions, the code buffer with its operand-stack type
//! state, stack-map frames, erased descriptors and the class/method slots the
//! translator fills. Binary class-file encoding is left to the consumer.

pub mod class;
pub mod code;
pub mod descriptor;
pub mod error;
pub mod frame;
pub mod opcodes;

pub use class::{access_flags, TargetClass, TargetField, TargetMethod};
pub use code::{Code, Const, ExceptionEntry, Insn, Label, LineNumberEntry, TypeState};
pub use descriptor::{class_name, field_descriptor, method_descriptor};
pub use error::StackError;
pub use frame::{describe_frames, merge_type, Frame, VerificationType};
