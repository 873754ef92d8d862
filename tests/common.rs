// Common test utilities
#![allow(dead_code)]

use sbil2tbf::codegen::{Code, TargetMethod};
use sbil2tbf::sbil::MethodBody;
use sbil2tbf::types::{SourceClass, SourceMethod, TypeDesc, TypeRegistry};
use sbil2tbf::{build_method_body, ImportContext, Result};

pub const PROGRAM: &str = "Demo.Program";

/// Translate `method` of `class`, with `class` added to `registry`
pub fn translate_with(registry: TypeRegistry, class: SourceClass, method: SourceMethod, body: MethodBody) -> Result<Code> {
    let mut registry = registry;
    registry.add(class.clone());
    let mut ctx = ImportContext::new(registry);
    let mut target = TargetMethod::from_source(&method);
    build_method_body(&mut ctx, &mut target, &class, &method, &body, 0)?;
    Ok(target.code.expect("translated method has code"))
}

/// Translate a static method of `Demo.Program`
pub fn translate_static(params: Vec<TypeDesc>, ret: TypeDesc, body: MethodBody) -> Result<Code> {
    translate_static_in(TypeRegistry::new("demo"), params, ret, body)
}

pub fn translate_static_in(registry: TypeRegistry, params: Vec<TypeDesc>, ret: TypeDesc, body: MethodBody) -> Result<Code> {
    let method = SourceMethod::static_method("Run", params, ret);
    translate_with(registry, SourceClass::new(PROGRAM), method, body)
}

/// Listing without label marks
pub fn ops(code: &Code) -> Vec<String> {
    code.listing().into_iter().filter(|line| !line.ends_with(':')).collect()
}

pub fn emits(code: &Code, needle: &str) -> bool {
    ops(code).iter().any(|line| line == needle)
}

/// Listing line starting with `prefix`
pub fn find_op(code: &Code, prefix: &str) -> Option<String> {
    ops(code).into_iter().find(|line| line.starts_with(prefix))
}
