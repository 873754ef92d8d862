mod common;

use common::*;
use sbil2tbf::sbil::{MethodBody, Op};
use sbil2tbf::types::{Primitive, TypeDesc};

#[test]
fn add_two_ints() {
    let body = MethodBody::sequential(vec![Op::LdArg(0), Op::LdArg(1), Op::Add, Op::Ret]);
    let code = translate_static(vec![TypeDesc::I32, TypeDesc::I32], TypeDesc::I32, body).unwrap();
    assert_eq!(ops(&code), vec!["iload 0", "iload 1", "iadd", "ireturn"]);
    assert_eq!(code.max_stack(), 2);
    assert_eq!(code.max_locals(), 2);
}

#[test]
fn unsigned_division_calls_the_runtime() {
    let body = MethodBody::sequential(vec![Op::LdArg(0), Op::LdArg(1), Op::DivUn, Op::Ret]);
    let u32_ty = TypeDesc::Primitive(Primitive::U32);
    let code = translate_static(vec![u32_ty.clone(), u32_ty.clone()], u32_ty, body).unwrap();
    assert!(emits(&code, "invokestatic java/lang/Integer.divideUnsigned(II)I"));
    assert!(!emits(&code, "idiv"));
}

#[test]
fn long_plus_int_widens_the_int() {
    let body = MethodBody::sequential(vec![Op::LdArg(0), Op::LdArg(1), Op::Add, Op::Ret]);
    let code = translate_static(vec![TypeDesc::I64, TypeDesc::I32], TypeDesc::I64, body).unwrap();
    assert_eq!(ops(&code), vec!["lload 0", "iload 2", "i2l", "ladd", "lreturn"]);
}

#[test]
fn int_plus_long_parks_the_wide_operand() {
    let body = MethodBody::sequential(vec![Op::LdArg(0), Op::LdArg(1), Op::Add, Op::Ret]);
    let code = translate_static(vec![TypeDesc::I32, TypeDesc::I64], TypeDesc::I64, body).unwrap();
    let listing = ops(&code);
    assert_eq!(&listing[..2], &["iload 0", "lload 1"]);
    assert!(listing[2].starts_with("lstore "));
    assert_eq!(listing[3], "i2l");
    assert!(listing[4].starts_with("lload "));
    assert_eq!(&listing[5..], &["ladd", "lreturn"]);
}

#[test]
fn overflow_checked_add_uses_exact_math() {
    let body = MethodBody::sequential(vec![Op::LdArg(0), Op::LdArg(1), Op::AddOvf, Op::Ret]);
    let code = translate_static(vec![TypeDesc::I64, TypeDesc::I64], TypeDesc::I64, body).unwrap();
    assert!(emits(&code, "invokestatic java/lang/Math.addExact(JJ)J"));
}

#[test]
fn bitwise_not_is_xor_with_minus_one() {
    let body = MethodBody::sequential(vec![Op::LdArg(0), Op::Not, Op::Ret]);
    let code = translate_static(vec![TypeDesc::I32], TypeDesc::I32, body).unwrap();
    assert_eq!(ops(&code), vec!["iload 0", "push -1", "ixor", "ireturn"]);
}

#[test]
fn unsigned_shift_right() {
    let body = MethodBody::sequential(vec![Op::LdArg(0), Op::LdcI4(3), Op::ShrUn, Op::Ret]);
    let code = translate_static(vec![TypeDesc::I64], TypeDesc::I64, body).unwrap();
    assert_eq!(ops(&code), vec!["lload 0", "push 3", "lushr", "lreturn"]);
}

#[test]
fn bitwise_ops_on_floats_are_rejected() {
    let body = MethodBody::sequential(vec![Op::LdArg(0), Op::LdArg(1), Op::And, Op::Ret]);
    let err = translate_static(vec![TypeDesc::F64, TypeDesc::F64], TypeDesc::F64, body).unwrap_err();
    assert!(err.is_type_mismatch());
    let location = err.location().expect("located error");
    assert_eq!(location.offset, Some(2));
}

#[test]
fn local_round_trip() {
    let body = MethodBody::sequential(vec![Op::LdArg(0), Op::StLoc(0), Op::LdLoc(0), Op::Ret])
        .with_locals(vec![TypeDesc::F64]);
    let code = translate_static(vec![TypeDesc::F64], TypeDesc::F64, body).unwrap();
    let listing = ops(&code);
    // locals start zeroed, after the arguments
    assert!(listing.contains(&"dstore 2".to_string()));
    assert!(listing.ends_with(&["dload 0".to_string(), "dstore 2".to_string(), "dload 2".to_string(), "dreturn".to_string()]));
}
