//! Signature blob encoders (ECMA-335 II.23.2).
//!
//! The assembler needs signature blobs in three places: the local variable signature referenced
//! from the fat method header, stand-alone call-site signatures for `calli`, and vararg
//! call-site signatures for `call` with optional arguments. Field and property encoders
//! complete the set for callers that build member references themselves.
//!
//! # Available Encoders
//!
//! - [`encode_type_signature`] - a single type, appended to an existing buffer
//! - [`encode_method_signature`] - method and call-site signatures, including the vararg sentinel
//! - [`encode_field_signature`] - field signatures
//! - [`encode_property_signature`] - property signatures
//! - [`encode_local_var_signature`] - local variable signatures for the StandAloneSig table

use crate::{
    metadata::{
        signatures::{
            CustomModifier, SignatureField, SignatureLocalVariables, SignatureMethod,
            SignatureParameter, SignatureProperty, TypeSignature, CALLING_CONVENTION,
            ELEMENT_TYPE, SIGNATURE_HEADER,
        },
        token::{Token, TABLE},
    },
    utils::{to_u32, write_compressed_int, write_compressed_uint},
    Result,
};

/// Encodes a custom modifier as `CMOD_REQD`/`CMOD_OPT` followed by its TypeDefOrRef index.
fn encode_custom_modifier(modifier: &CustomModifier, buffer: &mut Vec<u8>) -> Result<()> {
    let modifier_type = if modifier.is_required {
        ELEMENT_TYPE::CMOD_REQD
    } else {
        ELEMENT_TYPE::CMOD_OPT
    };
    buffer.push(modifier_type);

    let coded_index = encode_type_def_or_ref_coded_index(modifier.modifier_type)?;
    write_compressed_uint(coded_index, buffer)
}

/// Encodes a token as a TypeDefOrRef coded index according to ECMA-335 §II.23.2.8.
///
/// - TypeDef (0x02): `(rid << 2) | 0`
/// - TypeRef (0x01): `(rid << 2) | 1`
/// - TypeSpec (0x1B): `(rid << 2) | 2`
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] if the token's table is none of the above.
pub fn encode_type_def_or_ref_coded_index(token: Token) -> Result<u32> {
    let rid = token.row();

    match token.table() {
        TABLE::TYPE_DEF => Ok(rid << 2),
        TABLE::TYPE_REF => Ok((rid << 2) | 1),
        TABLE::TYPE_SPEC => Ok((rid << 2) | 2),
        table => Err(malformed_error!(
            "Invalid token table 0x{:02X} for TypeDefOrRef coded index - {}",
            table,
            token
        )),
    }
}

/// Appends the encoding of a single type to `buffer`.
///
/// # Errors
///
/// Returns an error if a type token is not a TypeDef, TypeRef or TypeSpec, or if a count
/// does not fit into a compressed integer.
pub fn encode_type_signature(signature: &TypeSignature, buffer: &mut Vec<u8>) -> Result<()> {
    match signature {
        TypeSignature::Void => buffer.push(ELEMENT_TYPE::VOID),
        TypeSignature::Boolean => buffer.push(ELEMENT_TYPE::BOOLEAN),
        TypeSignature::Char => buffer.push(ELEMENT_TYPE::CHAR),
        TypeSignature::I1 => buffer.push(ELEMENT_TYPE::I1),
        TypeSignature::U1 => buffer.push(ELEMENT_TYPE::U1),
        TypeSignature::I2 => buffer.push(ELEMENT_TYPE::I2),
        TypeSignature::U2 => buffer.push(ELEMENT_TYPE::U2),
        TypeSignature::I4 => buffer.push(ELEMENT_TYPE::I4),
        TypeSignature::U4 => buffer.push(ELEMENT_TYPE::U4),
        TypeSignature::I8 => buffer.push(ELEMENT_TYPE::I8),
        TypeSignature::U8 => buffer.push(ELEMENT_TYPE::U8),
        TypeSignature::R4 => buffer.push(ELEMENT_TYPE::R4),
        TypeSignature::R8 => buffer.push(ELEMENT_TYPE::R8),
        TypeSignature::String => buffer.push(ELEMENT_TYPE::STRING),
        TypeSignature::TypedByRef => buffer.push(ELEMENT_TYPE::TYPEDBYREF),
        TypeSignature::I => buffer.push(ELEMENT_TYPE::I),
        TypeSignature::U => buffer.push(ELEMENT_TYPE::U),
        TypeSignature::Object => buffer.push(ELEMENT_TYPE::OBJECT),
        TypeSignature::Ptr(pointer) => {
            buffer.push(ELEMENT_TYPE::PTR);
            for modifier in &pointer.modifiers {
                encode_custom_modifier(modifier, buffer)?;
            }
            encode_type_signature(&pointer.base, buffer)?;
        }
        TypeSignature::ByRef(inner) => {
            buffer.push(ELEMENT_TYPE::BYREF);
            encode_type_signature(inner, buffer)?;
        }
        TypeSignature::Pinned(inner) => {
            buffer.push(ELEMENT_TYPE::PINNED);
            encode_type_signature(inner, buffer)?;
        }
        TypeSignature::ValueType(token) => {
            buffer.push(ELEMENT_TYPE::VALUETYPE);
            write_compressed_uint(encode_type_def_or_ref_coded_index(*token)?, buffer)?;
        }
        TypeSignature::Class(token) => {
            buffer.push(ELEMENT_TYPE::CLASS);
            write_compressed_uint(encode_type_def_or_ref_coded_index(*token)?, buffer)?;
        }
        TypeSignature::GenericParamType(index) => {
            buffer.push(ELEMENT_TYPE::VAR);
            write_compressed_uint(*index, buffer)?;
        }
        TypeSignature::GenericParamMethod(index) => {
            buffer.push(ELEMENT_TYPE::MVAR);
            write_compressed_uint(*index, buffer)?;
        }
        TypeSignature::GenericInst(base, args) => {
            buffer.push(ELEMENT_TYPE::GENERICINST);
            encode_type_signature(base, buffer)?;
            write_compressed_uint(to_u32(args.len())?, buffer)?;
            for arg in args {
                encode_type_signature(arg, buffer)?;
            }
        }
        TypeSignature::Array(array) => {
            buffer.push(ELEMENT_TYPE::ARRAY);
            encode_type_signature(&array.base, buffer)?;
            write_compressed_uint(array.rank, buffer)?;

            // Sizes and lower bounds are each a prefix of the dimension list
            let sizes: Vec<u32> = array
                .dimensions
                .iter()
                .map_while(|dimension| dimension.size)
                .collect();
            write_compressed_uint(to_u32(sizes.len())?, buffer)?;
            for size in sizes {
                write_compressed_uint(size, buffer)?;
            }

            let bounds: Vec<u32> = array
                .dimensions
                .iter()
                .map_while(|dimension| dimension.lower_bound)
                .collect();
            write_compressed_uint(to_u32(bounds.len())?, buffer)?;
            for bound in bounds {
                let bound = i32::try_from(bound)
                    .map_err(|_| malformed_error!("Array lower bound {} out of range", bound))?;
                write_compressed_int(bound, buffer)?;
            }
        }
        TypeSignature::SzArray(array) => {
            buffer.push(ELEMENT_TYPE::SZARRAY);
            for modifier in &array.modifiers {
                encode_custom_modifier(modifier, buffer)?;
            }
            encode_type_signature(&array.base, buffer)?;
        }
        TypeSignature::FnPtr(method) => {
            buffer.push(ELEMENT_TYPE::FNPTR);
            encode_method_signature_into(method, buffer)?;
        }
    }

    Ok(())
}

/// Encodes a signature parameter (`CustomMod* [BYREF] Type`).
fn encode_parameter(parameter: &SignatureParameter, buffer: &mut Vec<u8>) -> Result<()> {
    for modifier in &parameter.modifiers {
        encode_custom_modifier(modifier, buffer)?;
    }

    if parameter.by_ref {
        buffer.push(ELEMENT_TYPE::BYREF);
    }

    encode_type_signature(&parameter.base, buffer)
}

fn encode_method_signature_into(signature: &SignatureMethod, buffer: &mut Vec<u8>) -> Result<()> {
    // A call site carrying optional arguments is always vararg
    let vararg = signature.vararg || !signature.varargs.is_empty();

    let mut calling_convention = if vararg {
        CALLING_CONVENTION::VARARG
    } else if signature.fastcall {
        CALLING_CONVENTION::FASTCALL
    } else if signature.thiscall {
        CALLING_CONVENTION::THISCALL
    } else if signature.stdcall {
        CALLING_CONVENTION::STDCALL
    } else if signature.cdecl {
        CALLING_CONVENTION::C
    } else {
        CALLING_CONVENTION::DEFAULT
    };

    if signature.has_this {
        calling_convention |= CALLING_CONVENTION::HASTHIS;
    }

    if signature.explicit_this {
        calling_convention |= CALLING_CONVENTION::EXPLICITTHIS;
    }

    if signature.param_count_generic > 0 {
        calling_convention |= CALLING_CONVENTION::GENERIC;
    }

    buffer.push(calling_convention);

    if signature.param_count_generic > 0 {
        write_compressed_uint(signature.param_count_generic, buffer)?;
    }

    let param_count = to_u32(signature.params.len() + signature.varargs.len())?;
    write_compressed_uint(param_count, buffer)?;

    encode_parameter(&signature.return_type, buffer)?;
    for param in &signature.params {
        encode_parameter(param, buffer)?;
    }

    if !signature.varargs.is_empty() {
        buffer.push(ELEMENT_TYPE::SENTINEL);
        for param in &signature.varargs {
            encode_parameter(param, buffer)?;
        }
    }

    Ok(())
}

/// Encodes a method or call-site signature.
///
/// The parameter count covers both the fixed and the optional parameters. Optional parameters
/// are written after the `SENTINEL` marker and force the `VARARG` calling convention.
///
/// # Errors
///
/// Returns an error if a contained type cannot be encoded.
///
/// # Examples
///
/// ```rust
/// use cilemit::metadata::signatures::{encode_method_signature, SignatureMethod, TypeSignature};
///
/// let signature = SignatureMethod::instance(TypeSignature::Void, vec![TypeSignature::I4]);
/// assert_eq!(encode_method_signature(&signature)?, vec![0x20, 0x01, 0x01, 0x08]);
/// # Ok::<(), cilemit::Error>(())
/// ```
pub fn encode_method_signature(signature: &SignatureMethod) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    encode_method_signature_into(signature, &mut buffer)?;
    Ok(buffer)
}

/// Encodes a field signature (`FIELD CustomMod* Type`).
///
/// # Errors
///
/// Returns an error if the field type cannot be encoded.
pub fn encode_field_signature(signature: &SignatureField) -> Result<Vec<u8>> {
    let mut buffer = vec![SIGNATURE_HEADER::FIELD];

    for modifier in &signature.modifiers {
        encode_custom_modifier(modifier, &mut buffer)?;
    }

    encode_type_signature(&signature.base, &mut buffer)?;
    Ok(buffer)
}

/// Encodes a property signature (`PROPERTY [HASTHIS] ParamCount CustomMod* Type Param*`).
///
/// # Errors
///
/// Returns an error if the property type or a parameter cannot be encoded.
pub fn encode_property_signature(signature: &SignatureProperty) -> Result<Vec<u8>> {
    let mut prolog = SIGNATURE_HEADER::PROPERTY;
    if signature.has_this {
        prolog |= CALLING_CONVENTION::HASTHIS;
    }
    let mut buffer = vec![prolog];

    write_compressed_uint(to_u32(signature.params.len())?, &mut buffer)?;

    for modifier in &signature.modifiers {
        encode_custom_modifier(modifier, &mut buffer)?;
    }

    encode_type_signature(&signature.base, &mut buffer)?;

    for param in &signature.params {
        encode_parameter(param, &mut buffer)?;
    }

    Ok(buffer)
}

/// Encodes a local variable signature (`LOCAL_SIG Count (CustomMod* [PINNED] [BYREF] Type)*`).
///
/// # Errors
///
/// Returns an error if there are more locals than a compressed integer can count, or if a
/// local type cannot be encoded.
pub fn encode_local_var_signature(signature: &SignatureLocalVariables) -> Result<Vec<u8>> {
    let mut buffer = vec![SIGNATURE_HEADER::LOCAL_SIG];

    write_compressed_uint(to_u32(signature.locals.len())?, &mut buffer)?;

    for local in &signature.locals {
        for modifier in &local.modifiers {
            encode_custom_modifier(modifier, &mut buffer)?;
        }

        if local.is_pinned {
            buffer.push(ELEMENT_TYPE::PINNED);
        }

        if local.is_byref {
            buffer.push(ELEMENT_TYPE::BYREF);
        }

        encode_type_signature(&local.base, &mut buffer)?;
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::signatures::{
        ArrayDimensions, SignatureArray, SignatureLocalVariable,
    };

    #[test]
    fn test_encode_primitive_and_class_types() -> Result<()> {
        let mut buffer = Vec::new();
        encode_type_signature(&TypeSignature::I4, &mut buffer)?;
        encode_type_signature(&TypeSignature::String, &mut buffer)?;
        encode_type_signature(&TypeSignature::Class(Token::new(0x0100_0003)), &mut buffer)?;
        encode_type_signature(&TypeSignature::ValueType(Token::new(0x0200_0001)), &mut buffer)?;
        assert_eq!(buffer, vec![0x08, 0x0E, 0x12, 0x0D, 0x11, 0x04]);

        Ok(())
    }

    #[test]
    fn test_encode_invalid_type_token() {
        let mut buffer = Vec::new();
        let result =
            encode_type_signature(&TypeSignature::Class(Token::new(0x0600_0001)), &mut buffer);
        assert!(result.is_err());
    }

    #[test]
    fn test_encode_arrays() -> Result<()> {
        let mut buffer = Vec::new();
        encode_type_signature(&TypeSignature::sz_array(TypeSignature::U1), &mut buffer)?;
        assert_eq!(buffer, vec![0x1D, 0x05]);

        buffer.clear();
        let array = TypeSignature::Array(SignatureArray {
            base: Box::new(TypeSignature::I4),
            rank: 2,
            dimensions: vec![
                ArrayDimensions {
                    size: Some(3),
                    lower_bound: Some(0),
                },
                ArrayDimensions {
                    size: None,
                    lower_bound: None,
                },
            ],
        });
        encode_type_signature(&array, &mut buffer)?;
        assert_eq!(buffer, vec![0x14, 0x08, 0x02, 0x01, 0x03, 0x01, 0x00]);

        Ok(())
    }

    #[test]
    fn test_encode_generic_instance() -> Result<()> {
        let mut buffer = Vec::new();
        let list_of_int = TypeSignature::GenericInst(
            Box::new(TypeSignature::Class(Token::new(0x0100_0012))),
            vec![TypeSignature::I4],
        );
        encode_type_signature(&list_of_int, &mut buffer)?;
        assert_eq!(buffer, vec![0x15, 0x12, 0x49, 0x01, 0x08]);

        Ok(())
    }

    #[test]
    fn test_encode_method_signature() -> Result<()> {
        let signature = SignatureMethod::new(
            TypeSignature::I4,
            vec![TypeSignature::String, TypeSignature::Object],
        );
        assert_eq!(
            encode_method_signature(&signature)?,
            vec![0x00, 0x02, 0x08, 0x0E, 0x1C]
        );

        let mut generic = SignatureMethod::instance(
            TypeSignature::GenericParamMethod(0),
            vec![TypeSignature::GenericParamMethod(0)],
        );
        generic.param_count_generic = 1;
        assert_eq!(
            encode_method_signature(&generic)?,
            vec![0x30, 0x01, 0x01, 0x1E, 0x00, 0x1E, 0x00]
        );

        Ok(())
    }

    #[test]
    fn test_encode_vararg_call_site() -> Result<()> {
        let mut signature = SignatureMethod::new(TypeSignature::Void, vec![TypeSignature::String]);
        signature.varargs = vec![TypeSignature::I4.into(), TypeSignature::R8.into()];

        assert_eq!(
            encode_method_signature(&signature)?,
            vec![0x05, 0x03, 0x01, 0x0E, 0x41, 0x08, 0x0D]
        );

        Ok(())
    }

    #[test]
    fn test_encode_unmanaged_signature() -> Result<()> {
        let signature = SignatureMethod {
            stdcall: true,
            ..SignatureMethod::new(TypeSignature::I4, vec![TypeSignature::I])
        };
        assert_eq!(encode_method_signature(&signature)?, vec![0x02, 0x01, 0x08, 0x18]);

        Ok(())
    }

    #[test]
    fn test_encode_field_and_property() -> Result<()> {
        let field = SignatureField {
            modifiers: vec![CustomModifier {
                is_required: true,
                modifier_type: Token::new(0x1B00_0010),
            }],
            base: TypeSignature::I4,
        };
        assert_eq!(encode_field_signature(&field)?, vec![0x06, 0x1F, 0x42, 0x08]);

        let property = SignatureProperty {
            has_this: true,
            modifiers: Vec::new(),
            base: TypeSignature::String,
            params: vec![TypeSignature::I4.into()],
        };
        assert_eq!(
            encode_property_signature(&property)?,
            vec![0x28, 0x01, 0x0E, 0x08]
        );

        Ok(())
    }

    #[test]
    fn test_encode_local_var_signature() -> Result<()> {
        let locals = SignatureLocalVariables {
            locals: vec![
                SignatureLocalVariable {
                    base: TypeSignature::I4,
                    ..Default::default()
                },
                SignatureLocalVariable {
                    is_pinned: true,
                    base: TypeSignature::String,
                    ..Default::default()
                },
                SignatureLocalVariable {
                    is_byref: true,
                    base: TypeSignature::I4,
                    ..Default::default()
                },
            ],
        };
        assert_eq!(
            encode_local_var_signature(&locals)?,
            vec![0x07, 0x03, 0x08, 0x45, 0x0E, 0x10, 0x08]
        );

        Ok(())
    }
}
