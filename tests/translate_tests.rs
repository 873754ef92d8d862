mod common;

use common::*;
use sbil2tbf::codegen::TargetMethod;
use sbil2tbf::sbil::{MethodBody, Op};
use sbil2tbf::types::{MethodRef, SourceClass, SourceField, SourceMethod, TypeDesc, TypeRegistry};
use sbil2tbf::{build_method_body, ImportContext};

const SHAPE: &str = "Demo.Shape";

fn shape() -> SourceClass {
    SourceClass::new(SHAPE).field(SourceField::instance("origin", TypeDesc::value("Demo.Point")))
}

/// `.ctor(int)` that hands over to `.ctor()`
fn delegating_constructor() -> (SourceMethod, MethodBody) {
    let method = SourceMethod::instance(".ctor", vec![TypeDesc::I32], TypeDesc::VOID);
    let body = MethodBody::sequential(vec![
        Op::LdArg(0),
        Op::Call(MethodRef::constructor(TypeDesc::named(SHAPE), vec![])),
        Op::Ret,
    ]);
    (method, body)
}

#[test]
fn delegating_constructor_leaves_fields_to_the_callee() {
    let (method, body) = delegating_constructor();
    let code = translate_with(TypeRegistry::new("demo"), shape(), method, body).unwrap();
    assert_eq!(
        ops(&code),
        vec!["aload 0", "invokespecial Demo/Shape.<init>()V", "return"]
    );
}

#[test]
fn delegating_constructor_leaves_the_dispatch_array_to_the_callee() {
    let class = shape();
    let (method, body) = delegating_constructor();
    let mut ctx = ImportContext::new(TypeRegistry::new("demo").with(class.clone()));
    let mut target = TargetMethod::from_source(&method);
    build_method_body(&mut ctx, &mut target, &class, &method, &body, 2).unwrap();
    let code = target.code.unwrap();
    assert!(find_op(&code, "anewarray").is_none());
    assert!(find_op(&code, "putfield").is_none());
}

#[test]
fn straight_line_code_keeps_the_parameter_slots() {
    let body = MethodBody::sequential(vec![Op::LdArg(0), Op::LdArg(1), Op::Mul, Op::LdArg(0), Op::Sub, Op::Ret]);
    let code = translate_static(vec![TypeDesc::I32, TypeDesc::I32], TypeDesc::I32, body).unwrap();
    assert_eq!(code.max_locals(), 2);
    assert_eq!(code.max_stack(), 2);
    assert!(code.frames().is_empty());
    assert_eq!(ops(&code).last().unwrap(), "ireturn");
}

#[test]
fn void_return_with_a_value_left_is_rejected() {
    let body = MethodBody::sequential(vec![Op::LdcI4(1), Op::Ret]);
    let err = translate_static(vec![], TypeDesc::VOID, body).unwrap_err();
    assert!(err.is_type_mismatch());
    assert_eq!(err.location().unwrap().opcode, Some("ret"));
}

#[test]
fn value_return_with_extra_values_is_rejected() {
    let body = MethodBody::sequential(vec![Op::LdcI4(1), Op::LdcI4(2), Op::Ret]);
    let err = translate_static(vec![], TypeDesc::I32, body).unwrap_err();
    assert!(err.is_type_mismatch());
}

#[test]
fn dead_code_adopts_the_frame_ahead() {
    // the pop at 4 only type-checks against the frame recorded for 5
    let body = MethodBody::sequential(vec![
        Op::LdcI4(7),
        Op::LdArg(0),
        Op::BrTrue(5),
        Op::Br(5),
        Op::Pop,
        Op::Ret,
    ]);
    let code = translate_static(vec![TypeDesc::I32], TypeDesc::I32, body).unwrap();
    assert!(emits(&code, "pop"));
    assert_eq!(ops(&code).last().unwrap(), "ireturn");
}

#[test]
fn frame_lookahead_stops_at_a_conditional_branch() {
    // dead code from 4 starts empty; the frame at 8 would leave an extra int
    let body = MethodBody::sequential(vec![
        Op::LdcI4(5),
        Op::LdArg(0),
        Op::BrTrue(8),
        Op::Br(8),
        Op::LdArg(0),
        Op::BrFalse(7),
        Op::Nop,
        Op::LdcI4(3),
        Op::Ret,
    ]);
    let code = translate_static(vec![TypeDesc::I32], TypeDesc::I32, body).unwrap();
    assert_eq!(ops(&code).last().unwrap(), "ireturn");
}
