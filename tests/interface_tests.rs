mod common;

use common::*;
use sbil2tbf::interfaces::{interface_bridge_count, BridgeKind};
use sbil2tbf::sbil::{MethodBody, Op};
use sbil2tbf::types::{MethodRef, SourceClass, SourceMethod, TypeDesc, TypeRegistry};
use sbil2tbf::ImportContext;

const ILIST: &str = "Demo.IList`1";

fn ilist() -> SourceClass {
    SourceClass::interface(ILIST)
        .with_generic_params(&["T"])
        .method(SourceMethod::abstract_method("Add", vec![TypeDesc::param("T")], TypeDesc::VOID))
        .method(SourceMethod::abstract_method("Get", vec![TypeDesc::I32], TypeDesc::param("T")))
}

fn ilist_of(arg: TypeDesc) -> TypeDesc {
    TypeDesc::generic(ILIST, vec![arg])
}

fn int_list() -> SourceClass {
    SourceClass::new("Demo.IntList")
        .implements(ilist_of(TypeDesc::I32))
        .method(
            SourceMethod::instance("Add", vec![TypeDesc::I32], TypeDesc::VOID)
                .with_virtual()
                .with_body(MethodBody::sequential(vec![Op::Ret])),
        )
        .method(
            SourceMethod::instance("Get", vec![TypeDesc::I32], TypeDesc::I32)
                .with_virtual()
                .with_body(MethodBody::sequential(vec![Op::LdArg(1), Op::Ret])),
        )
}

fn base_constructor() -> SourceMethod {
    SourceMethod::instance(".ctor", vec![], TypeDesc::VOID).with_body(MethodBody::sequential(vec![
        Op::LdArg(0),
        Op::Call(MethodRef::constructor(TypeDesc::object(), vec![])),
        Op::Ret,
    ]))
}

#[test]
fn contract_is_resolved_for_its_arguments() {
    let registry = TypeRegistry::new("demo").with(ilist()).with(int_list());
    let class = registry.get("Demo.IntList").unwrap().clone();
    let mut ctx = ImportContext::new(registry);
    let contracts = ctx.collect_interfaces(&class).unwrap();
    assert_eq!(contracts.len(), 1);
    let contract = &contracts[0];
    assert_eq!(contract.args, vec![TypeDesc::I32]);
    assert!(contract.direct_reference);
    assert!(!contract.super_implements);

    let add = &contract.methods[0];
    assert_eq!(add.params, vec![TypeDesc::I32]);
    assert_eq!(add.erased_descriptor(), "(Ljava/lang/Object;)V");
    assert_eq!(add.resolved_descriptor(), "(I)V");
    let get = &contract.methods[1];
    assert_eq!(get.return_type, TypeDesc::I32);
}

#[test]
fn contract_reached_twice_is_recorded_once() {
    let base = SourceClass::new("Demo.Base").implements(ilist_of(TypeDesc::string()));
    let derived = SourceClass::new("Demo.Derived")
        .extends(TypeDesc::named("Demo.Base"))
        .implements(ilist_of(TypeDesc::string()));
    let registry = TypeRegistry::new("demo").with(ilist()).with(base).with(derived.clone());
    let mut ctx = ImportContext::new(registry);
    let contracts = ctx.collect_interfaces(&derived).unwrap();
    assert_eq!(contracts.len(), 1);
    assert!(contracts[0].direct_reference);
    assert!(contracts[0].super_implements);
    assert_eq!(interface_bridge_count(&contracts), 0);
}

#[test]
fn interface_inheritance_is_followed() {
    let icollection = SourceClass::interface("Demo.ICollection`1")
        .with_generic_params(&["E"])
        .implements(ilist_of(TypeDesc::param("E")))
        .method(SourceMethod::abstract_method("Count", vec![], TypeDesc::I32));
    let class = SourceClass::new("Demo.Bag").implements(TypeDesc::generic("Demo.ICollection`1", vec![TypeDesc::I64]));
    let registry = TypeRegistry::new("demo").with(ilist()).with(icollection).with(class.clone());
    let mut ctx = ImportContext::new(registry);
    let contracts = ctx.collect_interfaces(&class).unwrap();
    assert_eq!(contracts.len(), 2);
    assert_eq!(contracts[1].interface, ilist_of(TypeDesc::I64));
    assert!(!contracts[1].direct_reference);
    assert_eq!(contracts[1].methods[0].params, vec![TypeDesc::I64]);
}

#[test]
fn primitive_implementation_gets_bridges() {
    let registry = TypeRegistry::new("demo").with(ilist()).with(int_list());
    let class = registry.get("Demo.IntList").unwrap().clone();
    let mut ctx = ImportContext::new(registry);
    let outcome = ctx.translate_class(&class).unwrap();
    assert!(outcome.is_complete());
    assert!(outcome
        .bridges
        .iter()
        .all(|plan| matches!(plan.kind, BridgeKind::Bridge { .. })));

    let methods = &outcome.class.methods;
    assert_eq!(methods.len(), 4);
    let add = outcome.class.find_method("Add", "(Ljava/lang/Object;)V").unwrap();
    assert!(add.is_bridge());
    let get = outcome.class.find_method("Get", "(I)Ljava/lang/Object;").unwrap();
    assert!(get.is_bridge());
    assert_eq!(
        ops(get.code.as_ref().unwrap()),
        vec![
            "aload 0",
            "iload 1",
            "invokevirtual Demo/IntList.Get(I)I",
            "invokestatic java/lang/Integer.valueOf(I)Ljava/lang/Integer;",
            "areturn",
        ]
    );
    // no dispatch array for a single contract
    assert!(outcome.class.fields.is_empty());
}

#[test]
fn open_implementation_matches_exactly() {
    let class = SourceClass::new("Demo.List`1")
        .with_generic_params(&["T"])
        .implements(ilist_of(TypeDesc::param("T")))
        .method(SourceMethod::instance("Add", vec![TypeDesc::param("T")], TypeDesc::VOID).with_virtual())
        .method(SourceMethod::instance("Get", vec![TypeDesc::I32], TypeDesc::param("T")).with_virtual());
    let registry = TypeRegistry::new("demo").with(ilist()).with(class.clone());
    let mut ctx = ImportContext::new(registry);
    let outcome = ctx.translate_class(&class).unwrap();
    assert!(outcome.bridges.iter().all(|plan| plan.kind == BridgeKind::Exact));
    assert_eq!(outcome.class.methods.len(), 2);
}

#[test]
fn colliding_contracts_get_a_dispatch_array() {
    let class = SourceClass::new("Demo.Multi")
        .implements(ilist_of(TypeDesc::I32))
        .implements(ilist_of(TypeDesc::string()))
        .method(base_constructor());
    let registry = TypeRegistry::new("demo").with(ilist()).with(class.clone());
    let mut ctx = ImportContext::new(registry);
    let outcome = ctx.translate_class(&class).unwrap();
    assert_eq!(outcome.contracts.len(), 2);
    assert_eq!(interface_bridge_count(&outcome.contracts), 2);
    assert!(outcome.bridges.iter().all(|plan| plan.kind == BridgeKind::Missing));

    let field = &outcome.class.fields[0];
    assert_eq!(field.name, "$interfaces");
    assert_eq!(field.descriptor, "[Ljava/lang/Object;");

    let ctor = outcome.class.find_method("<init>", "()V").unwrap();
    assert_eq!(
        ops(ctor.code.as_ref().unwrap()),
        vec![
            "aload 0",
            "invokespecial java/lang/Object.<init>()V",
            "aload 0",
            "push 2",
            "anewarray java/lang/Object",
            "putfield Demo/Multi.$interfaces:[Ljava/lang/Object;",
            "return",
        ]
    );
}

#[test]
fn inherited_contract_needs_no_bridge() {
    let base = SourceClass::new("Demo.Base").implements(ilist_of(TypeDesc::I32));
    let derived = SourceClass::new("Demo.Derived").extends(TypeDesc::named("Demo.Base"));
    let registry = TypeRegistry::new("demo").with(ilist()).with(base).with(derived.clone());
    let mut ctx = ImportContext::new(registry);
    let outcome = ctx.translate_class(&derived).unwrap();
    assert!(outcome.bridges.iter().all(|plan| plan.kind == BridgeKind::Inherited));
    assert!(outcome.class.methods.is_empty());
}

#[test]
fn failing_method_does_not_stop_its_siblings() {
    let class = SourceClass::new("Demo.Mixed")
        .method(
            SourceMethod::static_method("Good", vec![], TypeDesc::I32)
                .with_body(MethodBody::sequential(vec![Op::LdcI4(1), Op::Ret])),
        )
        .method(
            SourceMethod::static_method("Bad", vec![], TypeDesc::VOID)
                .with_body(MethodBody::sequential(vec![Op::LdcI4(1), Op::Throw])),
        )
        .method(
            SourceMethod::static_method("AlsoGood", vec![], TypeDesc::VOID)
                .with_body(MethodBody::sequential(vec![Op::Ret])),
        );
    let registry = TypeRegistry::new("demo").with(class);
    let mut ctx = ImportContext::new(registry);
    let outcomes = ctx.translate_assembly();
    assert_eq!(outcomes.len(), 1);
    let outcome = outcomes.into_iter().next().unwrap().unwrap();
    assert!(!outcome.is_complete());
    assert!(outcome.failure("Bad").unwrap().is_type_mismatch());
    let methods = &outcome.class.methods;
    assert!(methods[0].code.is_some());
    assert!(methods[1].code.is_none());
    assert!(methods[2].code.is_some());
    assert_eq!(ctx.location(), "");
}

#[test]
fn diamond_through_the_base_chain_is_recorded_once() {
    let k = SourceClass::interface("Demo.IKey").method(SourceMethod::abstract_method("Key", vec![], TypeDesc::I32));
    let left = SourceClass::interface("Demo.ILeft").implements(TypeDesc::named("Demo.IKey"));
    let right = SourceClass::interface("Demo.IRight").implements(TypeDesc::named("Demo.IKey"));
    let base = SourceClass::new("Demo.Base").implements(TypeDesc::named("Demo.IRight"));
    let class = SourceClass::new("Demo.Leaf")
        .extends(TypeDesc::named("Demo.Base"))
        .implements(TypeDesc::named("Demo.ILeft"));
    let registry = TypeRegistry::new("demo")
        .with(k)
        .with(left)
        .with(right)
        .with(base)
        .with(class.clone());
    let mut ctx = ImportContext::new(registry);
    let contracts = ctx.collect_interfaces(&class).unwrap();
    assert_eq!(contracts.len(), 3);
    let key: Vec<_> = contracts.iter().filter(|c| c.name() == "Demo.IKey").collect();
    assert_eq!(key.len(), 1);
    assert!(key[0].super_implements);
    assert_eq!(key[0].methods.len(), 1);
    assert_eq!(key[0].methods[0].return_type, TypeDesc::I32);
}
