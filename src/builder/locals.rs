//! Local variable declarations of a method body.
//!
//! Locals are numbered in declaration order. Their types make up the `LOCAL_SIG` blob whose
//! StandAloneSig token goes into the fat method header.

use crate::{
    metadata::signatures::{
        encode_local_var_signature, SignatureLocalVariable, SignatureLocalVariables,
        TypeSignature,
    },
    utils::to_u32,
    Error, Result,
};

/// Highest local index the two-byte `ldloc`/`stloc`/`ldloca` forms can address.
const MAX_LOCAL_INDEX: u32 = 0xFFFF;

/// A declared local variable.
///
/// Returned by [`crate::builder::MethodBodyBuilder::declare_local`] and passed back to
/// [`crate::builder::MethodBodyBuilder::emit_local`].
#[derive(Debug, Clone, PartialEq)]
pub struct LocalBuilder {
    index: u32,
    local_type: TypeSignature,
    pinned: bool,
}

impl LocalBuilder {
    /// Position of the local in the method's local signature
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Declared type
    #[must_use]
    pub fn local_type(&self) -> &TypeSignature {
        &self.local_type
    }

    /// Whether the garbage collector must not move the referenced object
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }
}

/// The locals declared so far.
#[derive(Debug, Clone, Default)]
pub(crate) struct LocalTable {
    locals: Vec<SignatureLocalVariable>,
}

impl LocalTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.locals.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.locals.is_empty()
    }

    /// Appends a local and returns its handle.
    pub(crate) fn declare(&mut self, local_type: TypeSignature, pinned: bool) -> Result<LocalBuilder> {
        let index = to_u32(self.locals.len())?;
        if index > MAX_LOCAL_INDEX {
            return Err(Error::LocalIndexOutOfRange(index));
        }

        let (is_byref, base) = match local_type.clone() {
            TypeSignature::ByRef(inner) => (true, *inner),
            other => (false, other),
        };
        self.locals.push(SignatureLocalVariable {
            modifiers: Vec::new(),
            is_byref,
            is_pinned: pinned,
            base,
        });

        Ok(LocalBuilder {
            index,
            local_type,
            pinned,
        })
    }

    /// Checks that `local` was declared by this table.
    pub(crate) fn check(&self, local: &LocalBuilder) -> Result<()> {
        let declared = self
            .locals
            .get(local.index as usize)
            .ok_or(Error::InvalidLocal(local.index))?;

        if declared.is_pinned != local.pinned {
            return Err(Error::InvalidLocal(local.index));
        }
        Ok(())
    }

    /// Encodes the `LOCAL_SIG` blob, `None` without locals.
    pub(crate) fn encode(&self) -> Result<Option<Vec<u8>>> {
        if self.locals.is_empty() {
            return Ok(None);
        }

        let signature = SignatureLocalVariables {
            locals: self.locals.clone(),
        };
        encode_local_var_signature(&signature).map(Some)
    }
}
