mod common;

use std::rc::Rc;

use common::*;
use sbil2tbf::sbil::{MethodBody, Op};
use sbil2tbf::types::{FieldRef, MethodRef, SourceClass, SourceField, SourceMethod, TypeDesc, TypeRegistry};
use sbil2tbf::GenericResolver;

const BOX: &str = "Demo.Box`1";

fn box_class() -> SourceClass {
    SourceClass::new(BOX)
        .with_generic_params(&["T"])
        .field(SourceField::instance("value", TypeDesc::param("T")))
}

fn value_field(args: Vec<TypeDesc>) -> FieldRef {
    let declaring = if args.is_empty() {
        TypeDesc::named(BOX)
    } else {
        TypeDesc::generic(BOX, args)
    };
    FieldRef::instance(declaring, "value", TypeDesc::param("T"))
}

#[test]
fn generic_field_read_unboxes_at_the_boundary() {
    let registry = TypeRegistry::new("demo").with(box_class());
    let body = MethodBody::sequential(vec![Op::LdArg(0), Op::LdFld(value_field(vec![TypeDesc::I32])), Op::Ret]);
    let code = translate_static_in(
        registry,
        vec![TypeDesc::generic(BOX, vec![TypeDesc::I32])],
        TypeDesc::I32,
        body,
    )
    .unwrap();
    assert_eq!(
        ops(&code),
        vec![
            "aload 0",
            "getfield Demo/Box.value:Ljava/lang/Object;",
            "checkcast java/lang/Integer",
            "invokevirtual java/lang/Integer.intValue()I",
            "ireturn",
        ]
    );
}

#[test]
fn generic_field_write_boxes_at_the_boundary() {
    let registry = TypeRegistry::new("demo").with(box_class());
    let body = MethodBody::sequential(vec![
        Op::LdArg(0),
        Op::LdArg(1),
        Op::StFld(value_field(vec![TypeDesc::I32])),
        Op::Ret,
    ]);
    let code = translate_static_in(
        registry,
        vec![TypeDesc::generic(BOX, vec![TypeDesc::I32]), TypeDesc::I32],
        TypeDesc::VOID,
        body,
    )
    .unwrap();
    assert_eq!(
        ops(&code),
        vec![
            "aload 0",
            "iload 1",
            "invokestatic java/lang/Integer.valueOf(I)Ljava/lang/Integer;",
            "putfield Demo/Box.value:Ljava/lang/Object;",
            "return",
        ]
    );
}

#[test]
fn reference_arguments_cross_the_boundary_unchanged() {
    let registry = TypeRegistry::new("demo").with(box_class());
    let body = MethodBody::sequential(vec![
        Op::LdArg(0),
        Op::LdFld(value_field(vec![TypeDesc::string()])),
        Op::Ret,
    ]);
    let code = translate_static_in(
        registry,
        vec![TypeDesc::generic(BOX, vec![TypeDesc::string()])],
        TypeDesc::string(),
        body,
    )
    .unwrap();
    let listing = ops(&code);
    assert_eq!(listing[1], "getfield Demo/Box.value:Ljava/lang/Object;");
    assert_eq!(listing[2], "checkcast java/lang/String");
    assert_eq!(listing[3], "areturn");
}

#[test]
fn open_field_inside_the_generic_class() {
    let class = box_class();
    let method = SourceMethod::instance("Get", vec![], TypeDesc::param("T"));
    let body = MethodBody::sequential(vec![Op::LdArg(0), Op::LdFld(value_field(vec![])), Op::Ret]);
    let code = translate_with(TypeRegistry::new("demo"), class, method, body).unwrap();
    assert_eq!(
        ops(&code),
        vec!["aload 0", "getfield Demo/Box.value:Ljava/lang/Object;", "areturn"]
    );
}

#[test]
fn generic_method_call_boxes_and_unboxes() {
    let identity = MethodRef::static_call(
        TypeDesc::named("Demo.Util"),
        "Identity",
        vec![TypeDesc::param("T")],
        TypeDesc::param("T"),
    )
    .with_generic_args(&["T"], vec![TypeDesc::I32]);
    let body = MethodBody::sequential(vec![Op::LdArg(0), Op::Call(identity), Op::Ret]);
    let code = translate_static(vec![TypeDesc::I32], TypeDesc::I32, body).unwrap();
    assert_eq!(
        ops(&code),
        vec![
            "iload 0",
            "invokestatic java/lang/Integer.valueOf(I)Ljava/lang/Integer;",
            "invokestatic Demo/Util.Identity(Ljava/lang/Object;)Ljava/lang/Object;",
            "checkcast java/lang/Integer",
            "invokevirtual java/lang/Integer.intValue()I",
            "ireturn",
        ]
    );
}

#[test]
fn scope_releases_its_frames_on_drop() {
    let registry = Rc::new(TypeRegistry::new("demo").with(box_class()));
    let mut resolver = GenericResolver::new(Rc::clone(&registry));
    {
        let mut scope = resolver.scope();
        scope.enter_type(&TypeDesc::generic(BOX, vec![TypeDesc::I64])).unwrap();
        assert_eq!(scope.resolve("T").unwrap(), (TypeDesc::I64, 0));
        assert_eq!(scope.depth(), 1);
    }
    assert_eq!(resolver.depth(), 0);
    assert!(resolver.resolve("T").is_err());
}

#[test]
fn nested_binding_resolves_through_the_outer_frame() {
    let registry = Rc::new(
        TypeRegistry::new("demo")
            .with(box_class())
            .with(SourceClass::new("Demo.Pair`2").with_generic_params(&["K", "V"])),
    );
    let mut resolver = GenericResolver::new(registry);
    resolver.enter_type(&TypeDesc::generic(BOX, vec![TypeDesc::string()])).unwrap();
    resolver
        .enter_type(&TypeDesc::generic("Demo.Pair`2", vec![TypeDesc::param("T"), TypeDesc::I32]))
        .unwrap();
    // K names the outer T, one level down
    assert_eq!(resolver.resolve("K").unwrap(), (TypeDesc::string(), 1));
    assert_eq!(resolver.resolve_fully("V").unwrap(), TypeDesc::I32);
}
