//! core::ids
//!
//! Identifier minting.
//!
//! Ids are braced random (v4) UUIDs, the form the host application itself
//! writes. No coordination with disk state is needed: the collision
//! probability is negligible, and an id is never handed out twice by the
//! same factory, whether or not the record it was minted for is later
//! committed or discarded.

use std::cell::Cell;

use uuid::Uuid;

use super::types::ObjectId;

/// Mints fresh object ids.
///
/// The factory is intentionally `!Sync`; the core is single-threaded and
/// callers pass `&IdFactory` around freely.
///
/// # Example
///
/// ```
/// use eventforge::core::ids::IdFactory;
///
/// let ids = IdFactory::new();
/// let a = ids.mint();
/// let b = ids.mint();
/// assert_ne!(a, b);
/// assert_eq!(ids.issued(), 2);
/// assert!(a.as_str().starts_with('{') && a.as_str().ends_with('}'));
/// ```
#[derive(Debug, Default)]
pub struct IdFactory {
    issued: Cell<u64>,
}

impl IdFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a new id.
    pub fn mint(&self) -> ObjectId {
        self.issued.set(self.issued.get() + 1);
        ObjectId::from_uuid(Uuid::new_v4())
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.issued.get()
    }
}
