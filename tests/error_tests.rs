mod common;

use common::*;
use sbil2tbf::codegen::TargetMethod;
use sbil2tbf::sbil::{Instruction, MethodBody, Op};
use sbil2tbf::types::{SourceClass, SourceMethod, TypeDesc, TypeRegistry};
use sbil2tbf::{build_method_body, Config, Error, ImportContext};

#[test]
fn empty_body_is_a_limit_error() {
    let err = translate_static(vec![], TypeDesc::VOID, MethodBody::sequential(vec![])).unwrap_err();
    assert!(err.is_limit());
    assert_eq!(err.location().unwrap().context, "Demo.Program::Run");
}

#[test]
fn offsets_past_the_code_space_are_rejected() {
    let body = MethodBody::new(vec![Instruction::new(0, Op::Nop), Instruction::new(0x1_0000, Op::Ret)]);
    let err = translate_static(vec![], TypeDesc::VOID, body).unwrap_err();
    assert!(err.is_limit());
}

#[test]
fn configured_offset_space_is_honored() {
    let class = SourceClass::new(PROGRAM);
    let method = SourceMethod::static_method("Run", vec![], TypeDesc::VOID);
    let body = MethodBody::new(vec![Instruction::new(0, Op::Nop), Instruction::new(300, Op::Ret)]);
    let config = Config {
        max_code_offset: 255,
        ..Config::default()
    };
    let mut ctx = ImportContext::with_config(TypeRegistry::new("demo").with(class.clone()), config);
    let mut target = TargetMethod::from_source(&method);
    let err = build_method_body(&mut ctx, &mut target, &class, &method, &body, 0).unwrap_err();
    assert!(err.is_limit());
    assert!(target.code.is_none());
}

#[test]
fn errors_carry_offset_opcode_and_line() {
    let body = MethodBody::sequential(vec![Op::LdcI4(1), Op::LdStr("x".to_string()), Op::Add, Op::Ret]).with_line(2, 42);
    let err = translate_static(vec![], TypeDesc::I32, body).unwrap_err();
    assert!(err.is_type_mismatch());
    let location = err.location().unwrap();
    assert_eq!(location.offset, Some(2));
    assert_eq!(location.opcode, Some("add"));
    assert_eq!(location.line, Some(42));
    let message = err.to_string();
    assert!(message.contains("Demo.Program::Run"), "{}", message);
    assert!(message.contains("IL_0002"), "{}", message);
}

#[test]
fn internal_faults_are_reported_generically() {
    // ldarg past the parameter list
    let body = MethodBody::sequential(vec![Op::LdArg(3), Op::Ret]);
    let err = translate_static(vec![TypeDesc::I32], TypeDesc::I32, body).unwrap_err();
    assert!(matches!(err.kind(), Error::Internal { .. }));
    assert!(err.to_string().contains("unexpected opcode or operand"));
}

#[test]
fn stack_underflow_is_reported() {
    let body = MethodBody::sequential(vec![Op::Pop, Op::Ret]);
    let err = translate_static(vec![], TypeDesc::VOID, body).unwrap_err();
    assert!(err.location().is_some());
}

#[test]
fn return_type_must_match_the_stack() {
    let body = MethodBody::sequential(vec![Op::LdcR8(1.5), Op::Ret]);
    let err = translate_static(vec![], TypeDesc::I32, body).unwrap_err();
    assert!(err.is_type_mismatch());
}

#[test]
fn line_numbers_follow_the_debug_map() {
    let body = MethodBody::sequential(vec![Op::LdcI4(1), Op::Pop, Op::Ret])
        .with_line(0, 10)
        .with_line(2, 11);
    let code = translate_static(vec![], TypeDesc::VOID, body).unwrap();
    let lines: Vec<u32> = code.line_numbers().iter().map(|entry| entry.line).collect();
    assert_eq!(lines, vec![10, 11]);
}

#[test]
fn line_numbers_can_be_switched_off() {
    let class = SourceClass::new(PROGRAM);
    let method = SourceMethod::static_method("Run", vec![], TypeDesc::VOID);
    let body = MethodBody::sequential(vec![Op::Ret]).with_line(0, 10);
    let config = Config {
        emit_line_numbers: false,
        ..Config::default()
    };
    let mut ctx = ImportContext::with_config(TypeRegistry::new("demo").with(class.clone()), config);
    let mut target = TargetMethod::from_source(&method);
    build_method_body(&mut ctx, &mut target, &class, &method, &body, 0).unwrap();
    assert!(target.code.unwrap().line_numbers().is_empty());
}
