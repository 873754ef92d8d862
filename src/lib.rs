//! SBIL → TBF method translator (sbil2tbf)
//!
//! Translates methods compiled to a stack-based intermediate bytecode with
//! unboxed generics, byref/pointer types and unsigned arithmetic into methods
//! of a JVM-style target bytecode with erased generics and no byrefs.
//!
//! ## Architecture
//!
//! - **types**: type descriptors, the source metadata model and the type registry
//! - **sbil**: the closed source opcode set, instructions and method bodies
//! - **codegen**: target opcodes, the code buffer with its operand-stack type
//!   state, stack-map frames, erased descriptors and target class/method slots
//! - **generics**: the scoped generic resolution stack
//! - **interfaces**: interface contract collection and bridge planning
//! - **translate**: the per-method instruction translator (including the span
//!   emulator and the exception-region helper)
//! - **context**: the per-pass import context and the class/assembly driver
//!
//! ## Translation Flow
//!
//! ```text
//! TypeRegistry → ImportContext → collect_interfaces → plan_bridges
//!                              ↘ build_method_body (per method) → TargetMethod
//! ```

pub mod codegen;
pub mod config;
pub mod consts;
pub mod context;
pub mod error;
pub mod generics;
pub mod interfaces;
pub mod sbil;
pub mod translate;
pub mod types;

pub use config::Config;
pub use context::{ClassOutcome, ImportContext};
pub use error::{Error, Location, Result};
pub use generics::{GenericResolver, GenericScope, Mark};
pub use interfaces::{collect_interfaces, find_method, InterfaceContract, InterfaceMethod};
pub use translate::{build_bridge_stub, build_method_body};
pub use types::{Primitive, TypeDesc};
