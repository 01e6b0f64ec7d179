//! Vault directory listing and walking.

pub mod walker;

pub use walker::{
    EntryKind, VaultEntry, VaultWalker, VaultWalkerError, WalkedFile, list_entries, validate_root,
};
