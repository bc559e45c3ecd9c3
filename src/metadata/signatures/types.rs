use crate::metadata::token::Token;

/// Element type markers used in signature blobs (ECMA-335 II.23.1.16)
#[allow(non_snake_case)]
#[allow(missing_docs)]
pub mod ELEMENT_TYPE {
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    // Followed by type
    pub const PTR: u8 = 0x0f;
    // Followed by type
    pub const BYREF: u8 = 0x10;
    // Followed by TypeDef or TypeRef token
    pub const VALUETYPE: u8 = 0x11;
    // Followed by TypeDef or TypeRef token
    pub const CLASS: u8 = 0x12;
    // Generic parameter in a generic type definition, represented as number
    pub const VAR: u8 = 0x13;
    // type rank boundsCount bound1 … loCount lo1 …
    pub const ARRAY: u8 = 0x14;
    // Generic type instantiation. Followed by type type-arg-count type-1 ... type-n
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    // System.IntPtr
    pub const I: u8 = 0x18;
    // System.UIntPtr
    pub const U: u8 = 0x19;
    // Followed by full method signature
    pub const FNPTR: u8 = 0x1b;
    // System.Object
    pub const OBJECT: u8 = 0x1c;
    // Single-dim array with 0 lower bound
    pub const SZARRAY: u8 = 0x1d;
    // Generic parameter in a generic method definition, represented as number
    pub const MVAR: u8 = 0x1e;
    // Required modifier : followed by a TypeDef or TypeRef token
    pub const CMOD_REQD: u8 = 0x1f;
    // Optional modifier : followed by a TypeDef or TypeRef token
    pub const CMOD_OPT: u8 = 0x20;
    // Sentinel for vararg method signature
    pub const SENTINEL: u8 = 0x41;
    // Denotes a local variable that points at a pinned object
    pub const PINNED: u8 = 0x45;
}

/// Leading byte of non-method signature blobs (ECMA-335 II.23.2)
#[allow(non_snake_case)]
#[allow(missing_docs)]
pub mod SIGNATURE_HEADER {
    pub const FIELD: u8 = 0x06;
    pub const LOCAL_SIG: u8 = 0x07;
    pub const PROPERTY: u8 = 0x08;
}

/// Calling convention byte of method signatures (ECMA-335 II.23.2.3)
#[allow(non_snake_case)]
#[allow(missing_docs)]
pub mod CALLING_CONVENTION {
    pub const DEFAULT: u8 = 0x00;
    pub const C: u8 = 0x01;
    pub const STDCALL: u8 = 0x02;
    pub const THISCALL: u8 = 0x03;
    pub const FASTCALL: u8 = 0x04;
    pub const VARARG: u8 = 0x05;
    pub const GENERIC: u8 = 0x10;
    pub const HASTHIS: u8 = 0x20;
    pub const EXPLICITTHIS: u8 = 0x40;
}

/// Represents a type in the various signatures
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TypeSignature {
    #[default]
    /// void
    Void,
    /// bool
    Boolean,
    /// char
    Char,
    /// signed 8bit integer
    I1,
    /// unsigned 8bit integer
    U1,
    /// signed 16bit integer
    I2,
    /// unsigned 16bit integer
    U2,
    /// signed 32bit integer
    I4,
    /// unsigned 32bit integer
    U4,
    /// signed 64bit integer
    I8,
    /// unsigned 64bit integer
    U8,
    /// 32bit floating-point
    R4,
    /// 64bit floating-point
    R8,
    /// System.String
    String,
    /// A pointer to a type
    Ptr(SignaturePointer),
    /// Type by reference
    ByRef(Box<TypeSignature>),
    /// CIL value-type
    // TypeDefOrRefOrSpecEncoded
    ValueType(Token),
    /// CIL Class
    // TypeDefOrRefOrSpecEncoded
    Class(Token),
    /// Generic type parameter
    // Index into GenericParam table
    GenericParamType(u32),
    /// Array
    Array(SignatureArray),
    /// Generic type and its arguments
    GenericInst(Box<TypeSignature>, Vec<TypeSignature>),
    /// Type is referenced during runtime
    TypedByRef,
    /// signed integer, sized to executing platform
    I,
    /// unsigned integer, sized to executing platform
    U,
    /// Function pointer
    FnPtr(Box<SignatureMethod>),
    /// System.Object
    Object,
    /// Single dimension array
    SzArray(SignatureSzArray),
    /// Generic method parameter
    // Index into GenericParam table
    GenericParamMethod(u32),
    /// A pinned type
    Pinned(Box<TypeSignature>),
}

impl TypeSignature {
    /// Shorthand for a single dimension, zero based array of `base`
    #[must_use]
    pub fn sz_array(base: TypeSignature) -> Self {
        TypeSignature::SzArray(SignatureSzArray {
            modifiers: Vec::new(),
            base: Box::new(base),
        })
    }

    /// Shorthand for an unmanaged pointer to `base`
    #[must_use]
    pub fn pointer(base: TypeSignature) -> Self {
        TypeSignature::Ptr(SignaturePointer {
            modifiers: Vec::new(),
            base: Box::new(base),
        })
    }
}

/// A custom modifier (`modreq` / `modopt`) attached to a type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CustomModifier {
    /// `modreq` when set, `modopt` otherwise
    pub is_required: bool,
    /// The modifier type - `TypeDefOrRefOrSpecEncoded`
    pub modifier_type: Token,
}

/// Size and lower bound of one array dimension
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArrayDimensions {
    /// The size of this dimension
    pub size: Option<u32>,
    /// The lower bound of this dimension (lowest index that can be used to access an element)
    pub lower_bound: Option<u32>,
}

/// A general (possibly multi-dimensional) array
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureArray {
    /// The type in the array
    pub base: Box<TypeSignature>,
    /// The number of dimensions
    pub rank: u32,
    /// The dimensions (can be less than 'rank', are in order from 0..count)
    pub dimensions: Vec<ArrayDimensions>,
}

/// A single dimension array with a zero lower bound
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureSzArray {
    /// Custom modifiers
    pub modifiers: Vec<CustomModifier>,
    /// The type in the array
    pub base: Box<TypeSignature>,
}

/// A pointer to a type
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignaturePointer {
    /// Custom modifiers
    pub modifiers: Vec<CustomModifier>,
    /// The type pointed to
    pub base: Box<TypeSignature>,
}

/// Parameter with optional custom modifiers
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureParameter {
    /// Custom modifiers of the parameter
    pub modifiers: Vec<CustomModifier>,
    /// Parameter is passed by reference
    pub by_ref: bool,
    /// The type of the parameter
    pub base: TypeSignature,
}

impl From<TypeSignature> for SignatureParameter {
    fn from(base: TypeSignature) -> Self {
        SignatureParameter {
            modifiers: Vec::new(),
            by_ref: false,
            base,
        }
    }
}

/// Represents a method signature (II.23.2.1)
#[derive(Debug, Clone, PartialEq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct SignatureMethod {
    /// Used to encode the keyword instance in the calling convention, see §II.15.3
    pub has_this: bool,
    /// Used to encode the keyword explicit in the calling convention, see §II.15.3
    pub explicit_this: bool,
    /// Used to encode the keyword vararg in the calling convention, see §II.15.3
    pub vararg: bool,
    /// Uses native 'cdecl' calling convention
    pub cdecl: bool,
    /// Uses native 'stdcall' calling convention
    pub stdcall: bool,
    /// Uses native 'thiscall' calling convention
    pub thiscall: bool,
    /// Uses native 'fastcall' calling convention
    pub fastcall: bool,
    /// Number of generic parameters of this method
    pub param_count_generic: u32,
    /// The return type of this `Method`
    pub return_type: SignatureParameter,
    /// The parameters of this `Method`
    pub params: Vec<SignatureParameter>,
    /// The optional parameters passed after the sentinel of a vararg call site
    pub varargs: Vec<SignatureParameter>,
}

impl SignatureMethod {
    /// Creates a managed, static signature with the given return and parameter types
    #[must_use]
    pub fn new(return_type: TypeSignature, params: Vec<TypeSignature>) -> Self {
        SignatureMethod {
            return_type: return_type.into(),
            params: params.into_iter().map(SignatureParameter::from).collect(),
            ..Default::default()
        }
    }

    /// Creates a managed instance signature with the given return and parameter types
    #[must_use]
    pub fn instance(return_type: TypeSignature, params: Vec<TypeSignature>) -> Self {
        SignatureMethod {
            has_this: true,
            ..Self::new(return_type, params)
        }
    }

    /// Returns true if a call through this signature leaves a value on the stack
    #[must_use]
    pub fn returns_value(&self) -> bool {
        self.return_type.by_ref || self.return_type.base != TypeSignature::Void
    }
}

/// Field signature (II.23.2.4)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureField {
    /// The custom modifiers for this field
    pub modifiers: Vec<CustomModifier>,
    /// The signature of this type
    pub base: TypeSignature,
}

/// Property signature (II.23.2.5)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureProperty {
    /// Indicates the passing of a 'this' pointer
    pub has_this: bool,
    /// The custom modifiers of the property type
    pub modifiers: Vec<CustomModifier>,
    /// The signature of this property
    pub base: TypeSignature,
    /// The parameters of this property
    pub params: Vec<SignatureParameter>,
}

/// Local variable signature (II.23.2.6)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureLocalVariables {
    /// The local variables
    pub locals: Vec<SignatureLocalVariable>,
}

/// Represents a local variable in a method body
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureLocalVariable {
    /// Custom modifiers
    pub modifiers: Vec<CustomModifier>,
    /// Is passed by reference
    pub is_byref: bool,
    /// This variable is pinned
    pub is_pinned: bool,
    /// The signature of this variable
    pub base: TypeSignature,
}
