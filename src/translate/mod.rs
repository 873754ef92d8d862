//! Instruction translator
//!
//! Turns one SBIL method body into target code. `MethodTranslator` walks the
//! instructions in order; each opcode family lives in its own module and
//! works against the translator's `Code` buffer and type state:
//!
//! - `stack`: constants, shuffling, argument/local access, `ret`
//! - `fields`, `calls`, `casts`, `arrays`, `indirect`: member and memory access
//! - `arith`, `convert`, `branch`: operators, conversions, control flow
//! - `exceptions`: protected regions and the finally/fault lowering
//! - `span`: the pointer and span emulator
//! - `bridge`: erasure bridge stubs for interface contracts

mod arith;
mod arrays;
mod branch;
mod bridge;
mod calls;
mod casts;
mod convert;
mod exceptions;
mod fields;
mod indirect;
mod locals;
pub mod span;
mod stack;
mod translator;

pub use bridge::build_bridge_stub;
pub use locals::{LocalSlot, LocalsLayout};

use crate::codegen::TargetMethod;
use crate::context::ImportContext;
use crate::error::{Error, Location, Result};
use crate::sbil::MethodBody;
use crate::types::{SourceClass, SourceMethod};

use translator::MethodTranslator;

/// Translate `body` of `method` into `target`.
///
/// `interface_bridge_count` is the number of colliding generic interface
/// contracts of `class`; constructors allocate that many dispatch slots.
/// On failure `target` is left untouched.
pub fn build_method_body(
    ctx: &mut ImportContext,
    target: &mut TargetMethod,
    class: &SourceClass,
    method: &SourceMethod,
    body: &MethodBody,
    interface_bridge_count: usize,
) -> Result<()> {
    let path = format!("{}::{}", class.name, method.name);
    let location = Location::new(path.clone());
    if body.is_empty() {
        return Err(Error::limit("method body is empty").located(location));
    }
    let max = ctx.config.max_code_offset;
    if let Some(last) = body.last_offset().filter(|&last| last > max) {
        return Err(Error::limit(format!(
            "highest instruction offset {} exceeds the code offset space ({})",
            last, max
        ))
        .located(location));
    }

    let config = ctx.config.clone();
    let mut scope = ctx.resolver().scope();
    scope.enter_class(class).map_err(|e| e.located(location.clone()))?;
    scope.enter_source_method(method);

    log::debug!("translating {} ({} instructions)", path, body.instructions.len());
    let translator = MethodTranslator::new(&mut scope, &config, class, method, body, interface_bridge_count, path)
        .map_err(|e| e.located(location))?;
    let code = translator.run()?;
    target.code = Some(code);
    Ok(())
}
