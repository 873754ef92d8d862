//! Erasure: target class names and field/method descriptors for source types

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::consts::{
    CONSTRUCTOR, OBJECT_CLASS, REFERENCE_CLASS, SPAN_CLASS, TYPE_INITIALIZER, WELL_KNOWN_CLASSES,
};
use crate::types::{Primitive, TypeDesc};

static WELL_KNOWN: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| WELL_KNOWN_CLASSES.iter().copied().collect());

/// Target internal class name of a source type.
///
/// Primitives map to their box classes, arrays to their array descriptor.
pub fn class_name(ty: &TypeDesc) -> String {
    match ty {
        TypeDesc::Primitive(p) => box_class(*p).to_string(),
        TypeDesc::Named { name, .. } => match WELL_KNOWN.get(name.as_str()) {
            Some(target) => target.to_string(),
            None => erase_name(name),
        },
        TypeDesc::GenericParam { .. } | TypeDesc::Null => OBJECT_CLASS.to_string(),
        TypeDesc::Array(_) => field_descriptor(ty),
        TypeDesc::ByRef(elem) if elem.is_struct() => class_name(elem),
        TypeDesc::ByRef(_) => REFERENCE_CLASS.to_string(),
        TypeDesc::Pointer(_) => SPAN_CLASS.to_string(),
    }
}

/// `Ns.Outer+Inner`2` -> `Ns/Outer$Inner`
fn erase_name(name: &str) -> String {
    let base = match name.rfind('`') {
        Some(tick) if name[tick + 1..].chars().all(|c| c.is_ascii_digit()) => &name[..tick],
        _ => name,
    };
    base.replace('.', "/").replace('+', "$")
}

pub fn field_descriptor(ty: &TypeDesc) -> String {
    match ty {
        TypeDesc::Primitive(p) => p.descriptor().to_string(),
        TypeDesc::Array(elem) => format!("[{}", field_descriptor(elem)),
        other => format!("L{};", class_name(other)),
    }
}

pub fn method_descriptor(params: &[TypeDesc], ret: &TypeDesc) -> String {
    let mut desc = String::from("(");
    for p in params {
        desc.push_str(&field_descriptor(p));
    }
    desc.push(')');
    desc.push_str(&field_descriptor(ret));
    desc
}

/// Box class holding a primitive of kind `p` when erased to a reference
pub fn box_class(p: Primitive) -> &'static str {
    match p {
        Primitive::Void => "java/lang/Void",
        Primitive::Bool => "java/lang/Boolean",
        Primitive::Char | Primitive::U16 => "java/lang/Character",
        Primitive::I8 | Primitive::U8 => "java/lang/Byte",
        Primitive::I16 => "java/lang/Short",
        Primitive::I32 | Primitive::U32 => "java/lang/Integer",
        Primitive::I64 | Primitive::U64 | Primitive::ISize | Primitive::USize => "java/lang/Long",
        Primitive::F32 => "java/lang/Float",
        Primitive::F64 => "java/lang/Double",
    }
}

/// Name and descriptor of the box class's unboxing accessor
pub fn unbox_method(p: Primitive) -> (&'static str, String) {
    let name = match p.descriptor() {
        'Z' => "booleanValue",
        'C' => "charValue",
        'B' => "byteValue",
        'S' => "shortValue",
        'I' => "intValue",
        'J' => "longValue",
        'F' => "floatValue",
        _ => "doubleValue",
    };
    (name, format!("(){}", p.descriptor()))
}

/// `valueOf` descriptor of the box class
pub fn box_method_descriptor(p: Primitive) -> String {
    format!("({})L{};", p.descriptor(), box_class(p))
}

/// Target method name: constructors and type initializers get their target
/// names, explicit-implementation qualifiers are stripped
pub fn method_name(name: &str) -> String {
    match name {
        CONSTRUCTOR => "<init>".to_string(),
        TYPE_INITIALIZER => "<clinit>".to_string(),
        other => simple_name(other).to_string(),
    }
}

/// `System.IComparable.CompareTo` -> `CompareTo`
pub fn simple_name(name: &str) -> &str {
    if name == CONSTRUCTOR || name == TYPE_INITIALIZER {
        return name;
    }
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erased_class_names() {
        assert_eq!(class_name(&TypeDesc::object()), "java/lang/Object");
        assert_eq!(class_name(&TypeDesc::named("Acme.Collections.List`1")), "Acme/Collections/List");
        assert_eq!(class_name(&TypeDesc::named("Acme.Outer+Inner")), "Acme/Outer$Inner");
        assert_eq!(class_name(&TypeDesc::param("T")), "java/lang/Object");
        assert_eq!(class_name(&TypeDesc::pointer(TypeDesc::I32)), "system/Span");
        assert_eq!(class_name(&TypeDesc::span(TypeDesc::I32)), "system/Span");
        assert_eq!(class_name(&TypeDesc::byref(TypeDesc::I32)), "system/Reference");
        assert_eq!(class_name(&TypeDesc::byref(TypeDesc::value("Point"))), "Point");
    }

    #[test]
    fn test_descriptors() {
        let params = vec![
            TypeDesc::I32,
            TypeDesc::Primitive(Primitive::U8),
            TypeDesc::array(TypeDesc::string()),
            TypeDesc::param("T"),
        ];
        assert_eq!(
            method_descriptor(&params, &TypeDesc::Primitive(Primitive::USize)),
            "(IB[Ljava/lang/String;Ljava/lang/Object;)J"
        );
        assert_eq!(method_descriptor(&[], &TypeDesc::VOID), "()V");
    }

    #[test]
    fn test_method_names() {
        assert_eq!(method_name(".ctor"), "<init>");
        assert_eq!(method_name(".cctor"), "<clinit>");
        assert_eq!(method_name("System.IComparable.CompareTo"), "CompareTo");
        assert_eq!(unbox_method(Primitive::U32), ("intValue", "()I".to_string()));
    }
}
