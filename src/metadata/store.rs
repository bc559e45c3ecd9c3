//! The metadata store collaborator.
//!
//! Method bodies reference types, methods, fields, strings and signatures through 32-bit tokens
//! that are owned by the module being built, not by the assembler. The [`MetadataStore`] trait
//! is the narrow interface the assembler consumes: it resolves opaque [`ItemHandle`]s to their
//! current token, interns user strings and signature blobs, and finally rewrites the placeholder
//! bytes recorded in the fixup ledgers once the module's metadata is sealed.
//!
//! The store is passed explicitly into every builder operation that needs a token. It is shared
//! between all method bodies of a module, so implementations must be `Send + Sync` and own
//! their synchronization; the assembler never holds a lock across its own buffer work.
//!
//! [`InMemoryMetadataStore`] is a complete, thread-safe implementation for tests, benchmarks and
//! embedders without a real module writer.
//!
//! # Examples
//!
//! ```rust
//! use cilemit::metadata::{store::{InMemoryMetadataStore, MetadataStore}, token::TABLE};
//!
//! let store = InMemoryMetadataStore::new();
//! let console = store.declare(TABLE::TYPE_REF);
//!
//! let resolved = store.resolve_token(console)?;
//! assert!(!resolved.is_final);
//!
//! store.seal();
//! let resolved = store.resolve_token(console)?;
//! assert!(resolved.is_final);
//! assert_eq!(resolved.token.value(), 0x0100_0001);
//! # Ok::<(), cilemit::Error>(())
//! ```

use std::{
    collections::HashMap,
    fmt,
    sync::atomic::{AtomicU32, AtomicU64, Ordering},
};

use dashmap::{mapref::entry::Entry, DashMap};
use widestring::U16String;

use crate::{
    metadata::{
        signatures::SignatureMethod,
        token::{Token, TABLE},
    },
    utils::{to_u32, write_compressed_uint, write_le_at},
    Error, Result,
};

/// Opaque reference to an item owned by the metadata store.
///
/// Handles stay valid for the lifetime of the store, while the token an item resolves to may
/// change until the module is sealed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemHandle(u64);

impl ItemHandle {
    /// Creates a handle from a raw store-specific identifier
    #[must_use]
    pub fn new(id: u64) -> Self {
        ItemHandle(id)
    }

    /// Returns the raw identifier
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The token an item resolves to at a given moment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedToken {
    /// The token to embed now
    pub token: Token,
    /// `false` while the token may still change; non-final tokens must be recorded as fixups
    pub is_final: bool,
}

/// A method referenced by a call-family instruction.
///
/// The signature drives the variable stack behaviour of `call`, `callvirt` and `newobj`: the
/// parameter count plus `this` for instance methods is popped, and one value is pushed when the
/// return type is not `void`.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodRef {
    /// Handle of the MethodDef, MemberRef or MethodSpec
    pub handle: ItemHandle,
    /// Declared signature of the callee
    pub signature: SignatureMethod,
}

impl MethodRef {
    /// Creates a method reference
    #[must_use]
    pub fn new(handle: ItemHandle, signature: SignatureMethod) -> Self {
        MethodRef { handle, signature }
    }
}

/// Interface between the assembler and the module that owns metadata tokens.
///
/// # Thread Safety
///
/// One store is shared by every method body of a module, possibly across threads. Each method
/// is called for a single short access and must synchronize internally.
pub trait MetadataStore: Send + Sync {
    /// Resolves an item to its current token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedToken`] if the handle is unknown to the store.
    fn resolve_token(&self, item: ItemHandle) -> Result<ResolvedToken>;

    /// Interns a user string and returns its final `0x70` token.
    ///
    /// # Errors
    ///
    /// Returns an error if the user string heap is exhausted.
    fn user_string_token(&self, value: &str) -> Result<Token>;

    /// Interns a signature blob as a StandAloneSig row and returns its final token.
    ///
    /// Byte-identical blobs must yield the same token.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob cannot be stored.
    fn signature_token(&self, blob: &[u8]) -> Result<Token>;

    /// Creates (or reuses) the MemberRef describing a vararg call site of `method` with the
    /// given call-site signature blob.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedToken`] if `method` is unknown to the store.
    fn vararg_member_ref(&self, method: ItemHandle, call_site: &[u8]) -> Result<ItemHandle>;

    /// Rewrites the token placeholders of one section.
    ///
    /// `offsets` and `items` are parallel: the final token of `items[i]` is written as a
    /// little-endian `u32` at `section[offsets[i]..]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedToken`] for an item without a final token, or
    /// [`Error::OutOfBounds`] for an offset outside the section.
    fn finalize_fixups(
        &self,
        section: &mut [u8],
        offsets: &[u32],
        items: &[ItemHandle],
    ) -> Result<()>;
}

#[derive(Clone, Copy, Debug)]
struct ItemEntry {
    table: u8,
    provisional: Token,
    sealed: Option<Token>,
}

/// A thread-safe, in-memory [`MetadataStore`].
///
/// Items are declared with a table id and receive a provisional token; [`InMemoryMetadataStore::seal`]
/// assigns final rows per table in declaration order. User strings are stored UTF-16 encoded in
/// `#US` heap layout and StandAloneSig blobs are deduplicated.
///
/// # Thread Safety
///
/// All tables are [`DashMap`]s or append-only [`boxcar::Vec`]s, so concurrent method bodies only
/// contend on the shard they touch.
pub struct InMemoryMetadataStore {
    next_handle: AtomicU64,
    next_provisional: AtomicU32,
    items: DashMap<ItemHandle, ItemEntry>,
    sealed_rows: DashMap<u8, u32>,
    user_strings: DashMap<String, Token>,
    user_string_heap: boxcar::Vec<(u32, Vec<u8>)>,
    user_string_size: AtomicU32,
    signature_rows: DashMap<Vec<u8>, Token>,
    signatures: boxcar::Vec<Vec<u8>>,
    call_sites: DashMap<(ItemHandle, Vec<u8>), ItemHandle>,
}

/// First provisional row; provisional tokens stay clear of sealed rows of small modules.
const PROVISIONAL_ROW_BASE: u32 = 0x00F0_0000;

impl InMemoryMetadataStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        InMemoryMetadataStore {
            next_handle: AtomicU64::new(1),
            next_provisional: AtomicU32::new(PROVISIONAL_ROW_BASE),
            items: DashMap::new(),
            sealed_rows: DashMap::new(),
            user_strings: DashMap::new(),
            user_string_heap: boxcar::Vec::new(),
            // The heap always starts with the empty blob at offset 0
            user_string_size: AtomicU32::new(1),
            signature_rows: DashMap::new(),
            signatures: boxcar::Vec::new(),
            call_sites: DashMap::new(),
        }
    }

    fn next_handle(&self) -> ItemHandle {
        ItemHandle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    /// Declares an item of `table` whose final token is assigned by [`InMemoryMetadataStore::seal`].
    pub fn declare(&self, table: u8) -> ItemHandle {
        let handle = self.next_handle();
        let row = self.next_provisional.fetch_add(1, Ordering::Relaxed);
        self.items.insert(
            handle,
            ItemEntry {
                table,
                provisional: Token::from_parts(table, row),
                sealed: None,
            },
        );
        handle
    }

    /// Declares an item whose token is already final, such as a TypeRef imported from another
    /// module.
    pub fn declare_final(&self, token: Token) -> ItemHandle {
        let handle = self.next_handle();
        self.items.insert(
            handle,
            ItemEntry {
                table: token.table(),
                provisional: token,
                sealed: Some(token),
            },
        );
        handle
    }

    /// Assigns final tokens to every item declared so far, numbering rows per table in
    /// declaration order after the rows sealed by earlier calls.
    pub fn seal(&self) {
        let mut pending: Vec<(ItemHandle, u8)> = self
            .items
            .iter()
            .filter(|entry| entry.value().sealed.is_none())
            .map(|entry| (*entry.key(), entry.value().table))
            .collect();
        pending.sort_unstable();

        let mut assigned: HashMap<u8, u32> = HashMap::new();
        for (handle, table) in pending {
            let row = assigned
                .entry(table)
                .or_insert_with(|| self.sealed_rows.get(&table).map_or(0, |rows| *rows));
            *row += 1;

            if let Some(mut entry) = self.items.get_mut(&handle) {
                entry.sealed = Some(Token::from_parts(table, *row));
            }
        }

        for (table, rows) in assigned {
            self.sealed_rows.insert(table, rows);
        }
    }

    /// Returns the `#US` heap built so far, entries ordered by offset.
    #[must_use]
    pub fn user_string_heap(&self) -> Vec<u8> {
        let mut entries: Vec<&(u32, Vec<u8>)> =
            self.user_string_heap.iter().map(|(_, entry)| entry).collect();
        entries.sort_unstable_by_key(|(offset, _)| *offset);

        let mut heap = vec![0u8];
        for (_, blob) in entries {
            heap.extend_from_slice(blob);
        }
        heap
    }

    /// Returns the StandAloneSig blob stored for `token`.
    #[must_use]
    pub fn signature_blob(&self, token: Token) -> Option<Vec<u8>> {
        if token.table() != TABLE::STAND_ALONE_SIG || token.row() == 0 {
            return None;
        }
        self.signatures.get((token.row() - 1) as usize).cloned()
    }

    /// Number of interned StandAloneSig blobs.
    #[must_use]
    pub fn signature_count(&self) -> usize {
        self.signatures.count()
    }
}

impl Default for InMemoryMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Encodes a user string as a `#US` heap entry (ECMA-335 II.24.2.4): compressed length,
/// UTF-16LE code units and a terminal byte flagging characters that need special handling.
fn encode_user_string(value: &str) -> Result<Vec<u8>> {
    let units = U16String::from_str(value);

    let special = units.as_slice().iter().any(|&unit| {
        unit > 0xFF || matches!(unit, 0x01..=0x08 | 0x0E..=0x1F | 0x27 | 0x2D | 0x7F)
    });

    let mut entry = Vec::with_capacity(units.len() * 2 + 5);
    write_compressed_uint(to_u32(units.len() * 2 + 1)?, &mut entry)?;
    for unit in units.as_slice() {
        entry.extend_from_slice(&unit.to_le_bytes());
    }
    entry.push(u8::from(special));

    Ok(entry)
}

impl MetadataStore for InMemoryMetadataStore {
    fn resolve_token(&self, item: ItemHandle) -> Result<ResolvedToken> {
        let entry = self.items.get(&item).ok_or(Error::UnresolvedToken(item))?;
        Ok(match entry.sealed {
            Some(token) => ResolvedToken {
                token,
                is_final: true,
            },
            None => ResolvedToken {
                token: entry.provisional,
                is_final: false,
            },
        })
    }

    fn user_string_token(&self, value: &str) -> Result<Token> {
        match self.user_strings.entry(value.to_string()) {
            Entry::Occupied(entry) => Ok(*entry.get()),
            Entry::Vacant(entry) => {
                let blob = encode_user_string(value)?;
                let size = to_u32(blob.len())?;
                let offset = self.user_string_size.fetch_add(size, Ordering::Relaxed);
                if offset + size > 0x00FF_FFFF {
                    return Err(Error::Store("user string heap exhausted".to_string()));
                }

                self.user_string_heap.push((offset, blob));
                let token = Token::from_parts(TABLE::USER_STRING, offset);
                entry.insert(token);
                Ok(token)
            }
        }
    }

    fn signature_token(&self, blob: &[u8]) -> Result<Token> {
        match self.signature_rows.entry(blob.to_vec()) {
            Entry::Occupied(entry) => Ok(*entry.get()),
            Entry::Vacant(entry) => {
                let index = self.signatures.push(blob.to_vec());
                let token = Token::from_parts(TABLE::STAND_ALONE_SIG, to_u32(index + 1)?);
                entry.insert(token);
                Ok(token)
            }
        }
    }

    fn vararg_member_ref(&self, method: ItemHandle, call_site: &[u8]) -> Result<ItemHandle> {
        if !self.items.contains_key(&method) {
            return Err(Error::UnresolvedToken(method));
        }

        match self.call_sites.entry((method, call_site.to_vec())) {
            Entry::Occupied(entry) => Ok(*entry.get()),
            Entry::Vacant(entry) => {
                let handle = self.declare(TABLE::MEMBER_REF);
                entry.insert(handle);
                Ok(handle)
            }
        }
    }

    fn finalize_fixups(
        &self,
        section: &mut [u8],
        offsets: &[u32],
        items: &[ItemHandle],
    ) -> Result<()> {
        if offsets.len() != items.len() {
            return Err(malformed_error!(
                "Fixup arrays differ in length - {} offsets, {} items",
                offsets.len(),
                items.len()
            ));
        }

        for (&offset, &item) in offsets.iter().zip(items) {
            let resolved = self.resolve_token(item)?;
            if !resolved.is_final {
                return Err(Error::UnresolvedToken(item));
            }

            let mut cursor = offset as usize;
            write_le_at(section, &mut cursor, resolved.token.value())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::read_le;

    #[test]
    fn test_declare_and_seal() -> Result<()> {
        let store = InMemoryMetadataStore::new();
        let first = store.declare(TABLE::TYPE_REF);
        let method = store.declare(TABLE::METHOD_DEF);
        let second = store.declare(TABLE::TYPE_REF);

        assert!(!store.resolve_token(first)?.is_final);
        assert_eq!(store.resolve_token(first)?.token.table(), TABLE::TYPE_REF);

        store.seal();
        assert_eq!(store.resolve_token(first)?.token, Token::new(0x0100_0001));
        assert_eq!(store.resolve_token(second)?.token, Token::new(0x0100_0002));
        assert_eq!(store.resolve_token(method)?.token, Token::new(0x0600_0001));

        let third = store.declare(TABLE::TYPE_REF);
        store.seal();
        assert_eq!(store.resolve_token(third)?.token, Token::new(0x0100_0003));

        Ok(())
    }

    #[test]
    fn test_declare_final() -> Result<()> {
        let store = InMemoryMetadataStore::new();
        let handle = store.declare_final(Token::new(0x0A00_0007));
        let resolved = store.resolve_token(handle)?;
        assert!(resolved.is_final);
        assert_eq!(resolved.token.value(), 0x0A00_0007);
        Ok(())
    }

    #[test]
    fn test_unknown_handle() {
        let store = InMemoryMetadataStore::new();
        assert!(matches!(
            store.resolve_token(ItemHandle::new(42)),
            Err(Error::UnresolvedToken(handle)) if handle.id() == 42
        ));
    }

    #[test]
    fn test_user_strings() -> Result<()> {
        let store = InMemoryMetadataStore::new();
        let hello = store.user_string_token("Hi")?;
        let again = store.user_string_token("Hi")?;
        let other = store.user_string_token("€")?;

        assert_eq!(hello, again);
        assert_eq!(hello.value(), 0x7000_0001);
        assert_eq!(other.value(), 0x7000_0007);
        assert_eq!(
            store.user_string_heap(),
            vec![0x00, 0x05, b'H', 0x00, b'i', 0x00, 0x00, 0x03, 0xAC, 0x20, 0x01]
        );
        Ok(())
    }

    #[test]
    fn test_signature_dedup() -> Result<()> {
        let store = InMemoryMetadataStore::new();
        let first = store.signature_token(&[0x07, 0x01, 0x08])?;
        let second = store.signature_token(&[0x07, 0x01, 0x0E])?;
        let again = store.signature_token(&[0x07, 0x01, 0x08])?;

        assert_eq!(first.value(), 0x1100_0001);
        assert_eq!(second.value(), 0x1100_0002);
        assert_eq!(first, again);
        assert_eq!(store.signature_count(), 2);
        assert_eq!(store.signature_blob(second), Some(vec![0x07, 0x01, 0x0E]));
        Ok(())
    }

    #[test]
    fn test_vararg_member_ref() -> Result<()> {
        let store = InMemoryMetadataStore::new();
        let method = store.declare(TABLE::MEMBER_REF);
        let site = store.vararg_member_ref(method, &[0x05, 0x01, 0x01, 0x08])?;
        let same = store.vararg_member_ref(method, &[0x05, 0x01, 0x01, 0x08])?;
        let other = store.vararg_member_ref(method, &[0x05, 0x01, 0x01, 0x0E])?;

        assert_eq!(site, same);
        assert_ne!(site, other);
        assert!(store
            .vararg_member_ref(ItemHandle::new(999), &[0x05])
            .is_err());
        Ok(())
    }

    #[test]
    fn test_finalize_fixups() -> Result<()> {
        let store = InMemoryMetadataStore::new();
        let item = store.declare(TABLE::FIELD);
        let mut section = vec![0x7B, 0, 0, 0, 0, 0x2A];

        let result = store.finalize_fixups(&mut section, &[1], &[item]);
        assert!(matches!(result, Err(Error::UnresolvedToken(_))));

        store.seal();
        store.finalize_fixups(&mut section, &[1], &[item])?;
        assert_eq!(read_le::<u32>(&section[1..])?, 0x0400_0001);

        assert!(store.finalize_fixups(&mut section, &[4], &[item]).is_err());
        Ok(())
    }
}
