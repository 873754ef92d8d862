// Target code offsets are 16-bit
pub const MAX_CODE_OFFSET: u32 = 0xFFFF;

pub const DEFAULT_INTERFACE_ARRAY_FIELD: &str = "$interfaces";

// Source names with special meaning to the translator
pub const SOURCE_OBJECT: &str = "System.Object";
pub const SOURCE_STRING: &str = "System.String";
pub const SOURCE_SPAN: &str = "System.Span`1";
pub const SOURCE_READONLY_SPAN: &str = "System.ReadOnlySpan`1";
pub const SOURCE_METHOD_POINTER: &str = "System.IntPtr";
pub const CONSTRUCTOR: &str = ".ctor";
pub const TYPE_INITIALIZER: &str = ".cctor";

// Target class names
pub const OBJECT_CLASS: &str = "java/lang/Object";
pub const STRING_CLASS: &str = "java/lang/String";
pub const CLASS_CLASS: &str = "java/lang/Class";
pub const THROWABLE_CLASS: &str = "java/lang/Throwable";
pub const MATH_CLASS: &str = "java/lang/Math";
pub const INTEGER_CLASS: &str = "java/lang/Integer";
pub const LONG_CLASS: &str = "java/lang/Long";

// Runtime helper classes the emitted code calls into
pub const SPAN_CLASS: &str = "system/Span";
pub const REFERENCE_CLASS: &str = "system/Reference";
pub const ARITHMETIC_CLASS: &str = "system/Arithmetic";
pub const GENERIC_CLASS: &str = "system/Generic";
pub const VALUE_TYPE_CLASS: &str = "system/ValueType";
pub const METHOD_POINTER_CLASS: &str = "system/MethodPointer";

/// Suffix of the per-instantiation static data holder of a generic class
pub const STATIC_DATA_SUFFIX: &str = "$Static";

// Well-known source names and their target classes
pub const WELL_KNOWN_CLASSES: &[(&str, &str)] = &[
    ("System.Object", OBJECT_CLASS),
    ("System.String", STRING_CLASS),
    ("System.Type", CLASS_CLASS),
    ("System.Exception", THROWABLE_CLASS),
    ("System.ValueType", VALUE_TYPE_CLASS),
    ("System.IntPtr", METHOD_POINTER_CLASS),
    ("System.Span`1", SPAN_CLASS),
    ("System.ReadOnlySpan`1", SPAN_CLASS),
];
