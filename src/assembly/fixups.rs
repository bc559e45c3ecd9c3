//! Ledger of token placeholders awaiting their final value.
//!
//! Whenever an operand embeds a token the metadata store reports as not yet final, the
//! section offset of that token is registered here together with the item it stands for. The
//! ledger is handed to [`crate::metadata::store::MetadataStore::finalize_fixups`] once the
//! module's metadata is sealed; the assembler never revisits those bytes itself.

use crate::metadata::store::ItemHandle;

/// One token placeholder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenFixup {
    /// Offset of the 4-byte token within its section
    pub offset: u32,
    /// The item whose final token belongs there
    pub item: ItemHandle,
}

/// Token placeholders of one section, in registration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenFixups {
    entries: Vec<TokenFixup>,
}

impl TokenFixups {
    /// Creates an empty ledger
    #[must_use]
    pub fn new() -> Self {
        TokenFixups {
            entries: Vec::new(),
        }
    }

    /// Records that the token of `item` is embedded at `offset`
    pub fn register(&mut self, offset: u32, item: ItemHandle) {
        self.entries.push(TokenFixup { offset, item });
    }

    /// Number of pending fixups
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the pending fixups
    pub fn iter(&self) -> impl Iterator<Item = &TokenFixup> {
        self.entries.iter()
    }

    /// The parallel offset and item arrays handed to the metadata store
    #[must_use]
    pub fn to_arrays(&self) -> (Vec<u32>, Vec<ItemHandle>) {
        self.entries
            .iter()
            .map(|fixup| (fixup.offset, fixup.item))
            .unzip()
    }

    /// Drops every entry once the store has applied them
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
