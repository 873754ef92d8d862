mod common;

use common::*;
use sbil2tbf::sbil::{MethodBody, Op};
use sbil2tbf::types::{Primitive, TypeDesc};

#[test]
fn signed_branch_compares_ints_directly() {
    let body = MethodBody::sequential(vec![
        Op::LdArg(0),
        Op::LdArg(1),
        Op::Bge(5),
        Op::LdArg(1),
        Op::Ret,
        Op::LdArg(0),
        Op::Ret,
    ]);
    let code = translate_static(vec![TypeDesc::I32, TypeDesc::I32], TypeDesc::I32, body).unwrap();
    let listing = ops(&code);
    assert_eq!(listing[0], "iload 0");
    assert_eq!(listing[1], "iload 1");
    assert!(listing[2].starts_with("if_icmpge L"));
    assert_eq!(&listing[3..], &["iload 1", "ireturn", "iload 0", "ireturn"]);

    // jump target and fall-through both see an empty stack
    assert!(!code.frames().is_empty());
    assert!(code.frames().values().all(|f| f.stack.is_empty()));
}

#[test]
fn unsigned_branch_uses_compare_unsigned() {
    let body = MethodBody::sequential(vec![
        Op::LdArg(0),
        Op::LdArg(1),
        Op::BltUn(5),
        Op::LdcI4(0),
        Op::Ret,
        Op::LdcI4(1),
        Op::Ret,
    ]);
    let u32_ty = TypeDesc::Primitive(Primitive::U32);
    let code = translate_static(vec![u32_ty.clone(), u32_ty], TypeDesc::I32, body).unwrap();
    let listing = ops(&code);
    assert_eq!(listing[2], "invokestatic java/lang/Integer.compareUnsigned(II)I");
    assert!(listing[3].starts_with("iflt L"));
}

#[test]
fn not_equal_unsigned_is_plain_inequality() {
    let body = MethodBody::sequential(vec![
        Op::LdArg(0),
        Op::LdArg(1),
        Op::BneUn(5),
        Op::LdcI4(0),
        Op::Ret,
        Op::LdcI4(1),
        Op::Ret,
    ]);
    let code = translate_static(vec![TypeDesc::I32, TypeDesc::I32], TypeDesc::I32, body).unwrap();
    assert!(find_op(&code, "if_icmpne L").is_some());
    assert!(find_op(&code, "invokestatic").is_none());
}

#[test]
fn float_branch_picks_nan_handling() {
    let body = MethodBody::sequential(vec![
        Op::LdArg(0),
        Op::LdArg(1),
        Op::Bgt(5),
        Op::LdcI4(0),
        Op::Ret,
        Op::LdcI4(1),
        Op::Ret,
    ]);
    let code = translate_static(vec![TypeDesc::F32, TypeDesc::F32], TypeDesc::I32, body).unwrap();
    let listing = ops(&code);
    assert_eq!(listing[2], "fcmpl");
    assert!(listing[3].starts_with("ifgt L"));
}

#[test]
fn ceq_materializes_zero_or_one() {
    let body = MethodBody::sequential(vec![Op::LdArg(0), Op::LdArg(1), Op::Ceq, Op::Ret]);
    let code = translate_static(vec![TypeDesc::I32, TypeDesc::I32], TypeDesc::BOOL, body).unwrap();
    let listing = ops(&code);
    assert_eq!(listing.len(), 7);
    assert!(listing[2].starts_with("if_icmpeq L"));
    assert_eq!(listing[3], "push 0");
    assert!(listing[4].starts_with("goto L"));
    assert_eq!(&listing[5..], &["push 1", "ireturn"]);
}

#[test]
fn long_comparison_goes_through_lcmp() {
    let body = MethodBody::sequential(vec![Op::LdArg(0), Op::LdArg(1), Op::Clt, Op::Ret]);
    let code = translate_static(vec![TypeDesc::I64, TypeDesc::I64], TypeDesc::BOOL, body).unwrap();
    let listing = ops(&code);
    assert_eq!(listing[2], "lcmp");
    assert!(listing[3].starts_with("iflt L"));
}

#[test]
fn truth_test_on_reference_checks_null() {
    let body = MethodBody::sequential(vec![Op::LdArg(0), Op::BrTrue(4), Op::LdcI4(0), Op::Ret, Op::LdcI4(1), Op::Ret]);
    let code = translate_static(vec![TypeDesc::string()], TypeDesc::I32, body).unwrap();
    assert!(find_op(&code, "ifnonnull L").is_some());
}

#[test]
fn ordered_comparison_of_references_is_rejected() {
    let body = MethodBody::sequential(vec![
        Op::LdArg(0),
        Op::LdArg(1),
        Op::Bgt(5),
        Op::LdcI4(0),
        Op::Ret,
        Op::LdcI4(1),
        Op::Ret,
    ]);
    let err = translate_static(vec![TypeDesc::string(), TypeDesc::string()], TypeDesc::I32, body).unwrap_err();
    assert!(err.is_type_mismatch());
}

#[test]
fn switch_becomes_tableswitch() {
    let body = MethodBody::sequential(vec![
        Op::LdArg(0),
        Op::Switch(vec![4, 6]),
        Op::LdcI4(-1),
        Op::Ret,
        Op::LdcI4(10),
        Op::Ret,
        Op::LdcI4(20),
        Op::Ret,
    ]);
    let code = translate_static(vec![TypeDesc::I32], TypeDesc::I32, body).unwrap();
    let listing = ops(&code);
    assert!(listing[1].starts_with("tableswitch 0 ["));
    assert!(listing[1].contains("default L"));
    assert_eq!(&listing[2..4], &["push -1", "ireturn"]);
}

#[test]
fn loop_with_back_edge() {
    let body = MethodBody::sequential(vec![
        Op::Br(5),
        Op::LdLoc(0),
        Op::LdcI4(1),
        Op::Add,
        Op::StLoc(0),
        Op::LdLoc(0),
        Op::LdArg(0),
        Op::Blt(1),
        Op::LdLoc(0),
        Op::Ret,
    ])
    .with_locals(vec![TypeDesc::I32]);
    let code = translate_static(vec![TypeDesc::I32], TypeDesc::I32, body).unwrap();
    let listing = ops(&code);
    assert_eq!(&listing[..2], &["push 0", "istore 1"]);
    assert!(listing[2].starts_with("goto L"));
    assert_eq!(&listing[3..9], &["iload 1", "push 1", "iadd", "istore 1", "iload 1", "iload 0"]);
    assert!(listing[9].starts_with("if_icmplt L"));
    assert_eq!(&listing[10..], &["iload 1", "ireturn"]);
}
