//! Dense integer identities for document-model nodes.
//!
//! Every [`Element`](crate::model::Element), [`Item`](crate::model::Item) and
//! [`Channel`](crate::model::Channel) holds an [`ElementId`] leased from an
//! [`IdPool`]. Dropping the node returns the identity to the pool, and the pool
//! always hands out the lowest free identity before minting a new one.
//!
//! The pool is an explicit value passed to the parser and collection rather
//! than process-wide state, so independent documents can use independent
//! identity spaces.
//!
//! Raw identities are recycled, so each lease also carries a generation
//! number that the pool never issues twice. Addresses that must not outlive
//! their node compare generations.

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Raw numeric identity.
pub type RawId = u32;

/// Identity returned once the numeric range is exhausted.
///
/// Allocation saturates at this value instead of failing; releasing it is a no-op.
pub const SENTINEL_ID: RawId = RawId::MAX;

// ============================================================================
// Allocator
// ============================================================================

/// Unsynchronized identity allocator.
///
/// Not reentrant: callers serialize access themselves. [`IdPool`] wraps it in
/// a mutex for shared use.
#[derive(Debug)]
pub struct IdAllocator {
    /// Released identities below `next`, reused lowest-first.
    free: BTreeSet<RawId>,
    /// Next never-issued identity.
    next: RawId,
    /// Identities at or above this bound are never minted.
    limit: RawId,
    /// Leases issued so far; the next lease's generation.
    generation: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::with_limit(SENTINEL_ID)
    }

    /// Creates an allocator that mints at most `limit` distinct identities.
    pub fn with_limit(limit: RawId) -> Self {
        Self {
            free: BTreeSet::new(),
            next: 0,
            limit: limit.min(SENTINEL_ID),
            generation: 0,
        }
    }

    /// Returns the lowest available identity, or [`SENTINEL_ID`] when exhausted.
    pub fn allocate(&mut self) -> RawId {
        if let Some(id) = self.free.pop_first() {
            return id;
        }
        if self.next >= self.limit {
            return SENTINEL_ID;
        }
        let id = self.next;
        self.next += 1;
        id
    }

    /// Allocates an identity together with a generation unique to this allocator.
    pub fn allocate_stamped(&mut self) -> (RawId, u64) {
        let id = self.allocate();
        let generation = self.generation;
        self.generation += 1;
        (id, generation)
    }

    /// Marks `id` as free. Unknown identities (never issued, or the sentinel) are ignored.
    pub fn release(&mut self, id: RawId) {
        if id >= self.next {
            return;
        }
        self.free.insert(id);
    }

    /// Number of identities currently issued and not yet released.
    pub fn in_use(&self) -> usize {
        self.next as usize - self.free.len()
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Shared pool
// ============================================================================

/// Cheaply clonable handle to a locked [`IdAllocator`].
#[derive(Clone, Default)]
pub struct IdPool {
    inner: Arc<Mutex<IdAllocator>>,
}

impl IdPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: RawId) -> Self {
        Self {
            inner: Arc::new(Mutex::new(IdAllocator::with_limit(limit))),
        }
    }

    /// Leases an identity that is released again when the lease is dropped.
    pub fn lease(&self) -> ElementId {
        let (raw, generation) = self.inner.lock().allocate_stamped();
        if raw == SENTINEL_ID {
            tracing::warn!("Identity pool exhausted, issuing sentinel id");
        }
        ElementId {
            raw,
            generation,
            pool: self.clone(),
        }
    }

    pub fn in_use(&self) -> usize {
        self.inner.lock().in_use()
    }
}

impl fmt::Debug for IdPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdPool")
            .field("in_use", &self.in_use())
            .finish()
    }
}

/// An identity leased from an [`IdPool`].
pub struct ElementId {
    raw: RawId,
    generation: u64,
    pool: IdPool,
}

impl ElementId {
    pub fn get(&self) -> RawId {
        self.raw
    }

    /// Lease number within the pool. Unlike the raw id it is never reused.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for ElementId {
    fn drop(&mut self) {
        self.pool.inner.lock().release(self.raw);
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.raw)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
