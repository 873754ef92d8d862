//! Source type descriptors and metadata model
//!
//! `TypeDesc` is a tagged variant over every type shape the translator meets.
//! Equality is structural (derived): erasure names and every generic argument
//! must match recursively. Descriptors are immutable; substitution builds new
//! values.

pub mod model;
pub mod registry;

use std::fmt;

use crate::consts::{SOURCE_OBJECT, SOURCE_READONLY_SPAN, SOURCE_SPAN, SOURCE_STRING};

pub use model::{FieldRef, MethodRef, SourceClass, SourceField, SourceMethod};
pub use registry::TypeRegistry;

/// Primitive kinds of the source type system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Void,
    Bool,
    Char,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    /// Native-size signed integer (64-bit on the target)
    ISize,
    /// Native-size unsigned integer (64-bit on the target)
    USize,
}

/// Operand-stack kind of a value on the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackKind {
    Int,
    Long,
    Float,
    Double,
    Ref,
}

impl StackKind {
    /// Number of target stack/local slots a value of this kind occupies
    pub fn category(self) -> u16 {
        match self {
            StackKind::Long | StackKind::Double => 2,
            _ => 1,
        }
    }
}

impl Primitive {
    /// Target primitive descriptor character
    pub fn descriptor(self) -> char {
        match self {
            Primitive::Void => 'V',
            Primitive::Bool => 'Z',
            Primitive::Char | Primitive::U16 => 'C',
            Primitive::I8 | Primitive::U8 => 'B',
            Primitive::I16 => 'S',
            Primitive::I32 | Primitive::U32 => 'I',
            Primitive::I64 | Primitive::U64 | Primitive::ISize | Primitive::USize => 'J',
            Primitive::F32 => 'F',
            Primitive::F64 => 'D',
        }
    }

    pub fn stack_kind(self) -> Option<StackKind> {
        match self {
            Primitive::Void => None,
            Primitive::Bool
            | Primitive::Char
            | Primitive::I8
            | Primitive::U8
            | Primitive::I16
            | Primitive::U16
            | Primitive::I32
            | Primitive::U32 => Some(StackKind::Int),
            Primitive::I64 | Primitive::U64 | Primitive::ISize | Primitive::USize => Some(StackKind::Long),
            Primitive::F32 => Some(StackKind::Float),
            Primitive::F64 => Some(StackKind::Double),
        }
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Primitive::Bool | Primitive::Char | Primitive::U8 | Primitive::U16 | Primitive::U32 | Primitive::U64 | Primitive::USize
        )
    }

    pub fn byte_size(self) -> u32 {
        match self {
            Primitive::Void => 0,
            Primitive::Bool | Primitive::I8 | Primitive::U8 => 1,
            Primitive::Char | Primitive::I16 | Primitive::U16 => 2,
            Primitive::I32 | Primitive::U32 | Primitive::F32 => 4,
            Primitive::I64 | Primitive::U64 | Primitive::F64 | Primitive::ISize | Primitive::USize => 8,
        }
    }

    pub fn category(self) -> u16 {
        self.stack_kind().map(StackKind::category).unwrap_or(0)
    }

    pub fn source_name(self) -> &'static str {
        match self {
            Primitive::Void => "void",
            Primitive::Bool => "bool",
            Primitive::Char => "char",
            Primitive::I8 => "int8",
            Primitive::U8 => "uint8",
            Primitive::I16 => "int16",
            Primitive::U16 => "uint16",
            Primitive::I32 => "int32",
            Primitive::U32 => "uint32",
            Primitive::I64 => "int64",
            Primitive::U64 => "uint64",
            Primitive::F32 => "float32",
            Primitive::F64 => "float64",
            Primitive::ISize => "native int",
            Primitive::USize => "native uint",
        }
    }
}

/// A source type descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    Primitive(Primitive),
    /// A class, interface or struct, possibly parameterized
    Named {
        name: String,
        args: Vec<TypeDesc>,
        value_type: bool,
    },
    /// An open generic parameter of a type or method
    GenericParam { name: String },
    /// Single-dimension array; rank is the nesting depth
    Array(Box<TypeDesc>),
    ByRef(Box<TypeDesc>),
    Pointer(Box<TypeDesc>),
    /// Type of the null literal on the operand stack
    Null,
}

impl TypeDesc {
    pub const VOID: TypeDesc = TypeDesc::Primitive(Primitive::Void);
    pub const BOOL: TypeDesc = TypeDesc::Primitive(Primitive::Bool);
    pub const I32: TypeDesc = TypeDesc::Primitive(Primitive::I32);
    pub const I64: TypeDesc = TypeDesc::Primitive(Primitive::I64);
    pub const F32: TypeDesc = TypeDesc::Primitive(Primitive::F32);
    pub const F64: TypeDesc = TypeDesc::Primitive(Primitive::F64);

    pub fn named(name: impl Into<String>) -> Self {
        TypeDesc::Named {
            name: name.into(),
            args: Vec::new(),
            value_type: false,
        }
    }

    /// A user struct
    pub fn value(name: impl Into<String>) -> Self {
        TypeDesc::Named {
            name: name.into(),
            args: Vec::new(),
            value_type: true,
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeDesc>) -> Self {
        TypeDesc::Named {
            name: name.into(),
            args,
            value_type: false,
        }
    }

    pub fn param(name: impl Into<String>) -> Self {
        TypeDesc::GenericParam { name: name.into() }
    }

    pub fn array(elem: TypeDesc) -> Self {
        TypeDesc::Array(Box::new(elem))
    }

    pub fn byref(elem: TypeDesc) -> Self {
        TypeDesc::ByRef(Box::new(elem))
    }

    pub fn pointer(elem: TypeDesc) -> Self {
        TypeDesc::Pointer(Box::new(elem))
    }

    /// `System.Span<elem>`
    pub fn span(elem: TypeDesc) -> Self {
        TypeDesc::Named {
            name: SOURCE_SPAN.to_string(),
            args: vec![elem],
            value_type: true,
        }
    }

    pub fn object() -> Self {
        Self::named(SOURCE_OBJECT)
    }

    pub fn string() -> Self {
        Self::named(SOURCE_STRING)
    }

    /// Erasure-level name (generic arguments dropped)
    pub fn name(&self) -> String {
        match self {
            TypeDesc::Primitive(p) => p.source_name().to_string(),
            TypeDesc::Named { name, .. } => name.clone(),
            TypeDesc::GenericParam { name } => name.clone(),
            TypeDesc::Array(elem) => format!("{}[]", elem.name()),
            TypeDesc::ByRef(elem) => format!("{}&", elem.name()),
            TypeDesc::Pointer(elem) => format!("{}*", elem.name()),
            TypeDesc::Null => "null".to_string(),
        }
    }

    pub fn args(&self) -> &[TypeDesc] {
        match self {
            TypeDesc::Named { args, .. } => args,
            _ => &[],
        }
    }

    /// Same descriptor with its generic argument list replaced
    pub fn with_args(&self, new_args: Vec<TypeDesc>) -> Self {
        match self {
            TypeDesc::Named { name, value_type, .. } => TypeDesc::Named {
                name: name.clone(),
                args: new_args,
                value_type: *value_type,
            },
            other => other.clone(),
        }
    }

    pub fn as_primitive(&self) -> Option<Primitive> {
        match self {
            TypeDesc::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_generic_param(&self) -> bool {
        matches!(self, TypeDesc::GenericParam { .. })
    }

    /// True when an open generic parameter occurs anywhere inside
    pub fn is_open(&self) -> bool {
        match self {
            TypeDesc::GenericParam { .. } => true,
            TypeDesc::Named { args, .. } => args.iter().any(TypeDesc::is_open),
            TypeDesc::Array(elem) | TypeDesc::ByRef(elem) | TypeDesc::Pointer(elem) => elem.is_open(),
            TypeDesc::Primitive(_) | TypeDesc::Null => false,
        }
    }

    pub fn is_byref(&self) -> bool {
        matches!(self, TypeDesc::ByRef(_))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, TypeDesc::Pointer(_))
    }

    /// Real typed span (`System.Span<T>` / `System.ReadOnlySpan<T>`)
    pub fn is_typed_span(&self) -> bool {
        match self {
            TypeDesc::Named { name, .. } => name == SOURCE_SPAN || name == SOURCE_READONLY_SPAN,
            _ => false,
        }
    }

    /// Represented on the target by a span handle
    pub fn is_span_handle(&self) -> bool {
        self.is_pointer() || self.is_typed_span()
    }

    pub fn rank(&self) -> u32 {
        match self {
            TypeDesc::Array(elem) => 1 + elem.rank(),
            _ => 0,
        }
    }

    /// Element type of arrays, byrefs, pointers and typed spans
    pub fn element(&self) -> Option<&TypeDesc> {
        match self {
            TypeDesc::Array(elem) | TypeDesc::ByRef(elem) | TypeDesc::Pointer(elem) => Some(elem),
            TypeDesc::Named { args, .. } if self.is_typed_span() => args.first(),
            _ => None,
        }
    }

    pub fn is_value_type(&self) -> bool {
        match self {
            TypeDesc::Primitive(p) => *p != Primitive::Void,
            TypeDesc::Named { value_type, .. } => *value_type,
            TypeDesc::Pointer(_) => true,
            _ => false,
        }
    }

    /// A user struct, represented on the target by a mutable object
    pub fn is_struct(&self) -> bool {
        matches!(self, TypeDesc::Named { value_type: true, .. }) && !self.is_typed_span()
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeDesc::Primitive(Primitive::Void))
    }

    pub fn stack_kind(&self) -> Option<StackKind> {
        match self {
            TypeDesc::Primitive(p) => p.stack_kind(),
            _ => Some(StackKind::Ref),
        }
    }

    /// Target slot count; void occupies none
    pub fn category(&self) -> u16 {
        self.stack_kind().map(StackKind::category).unwrap_or(0)
    }

    pub fn is_reference(&self) -> bool {
        self.stack_kind() == Some(StackKind::Ref)
    }
}

impl From<Primitive> for TypeDesc {
    fn from(p: Primitive) -> Self {
        TypeDesc::Primitive(p)
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Named { name, args, .. } if !args.is_empty() => {
                write!(f, "{}<", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ">")
            }
            TypeDesc::Array(elem) => write!(f, "{}[]", elem),
            TypeDesc::ByRef(elem) => write!(f, "{}&", elem),
            TypeDesc::Pointer(elem) => write!(f, "{}*", elem),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Erasure-aware comparison: open parameters match each other, parameterized
/// types match when arity agrees and every argument matches.
pub fn generic_equal(a: &TypeDesc, b: &TypeDesc) -> bool {
    match (a, b) {
        (TypeDesc::GenericParam { .. }, TypeDesc::GenericParam { .. }) => true,
        (
            TypeDesc::Named { name: n1, args: a1, .. },
            TypeDesc::Named { name: n2, args: a2, .. },
        ) => n1 == n2 && a1.len() == a2.len() && a1.iter().zip(a2).all(|(x, y)| generic_equal(x, y)),
        (TypeDesc::Array(x), TypeDesc::Array(y))
        | (TypeDesc::ByRef(x), TypeDesc::ByRef(y))
        | (TypeDesc::Pointer(x), TypeDesc::Pointer(y)) => generic_equal(x, y),
        _ => a == b,
    }
}
