//! Source identifiers and the thread-safe generator issuing them.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::{Mutex, PoisonError};

use crate::errors::{ErrorInfo, PropError};

/// Raw name stored in dependency arrays for slots that reference no source.
pub const NO_SOURCE: u64 = 0;

/// Identifier of one independent error source.
///
/// Two dependency slots describe the same source iff their raw names are equal
/// and non-zero, which is why the zero value is unrepresentable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(NonZeroU64);

impl SourceId {
    /// Creates an identifier from its raw name, returning `None` for the empty sentinel.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Returns the raw name stored in dependency arrays.
    pub fn as_raw(&self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Contiguous block of freshly reserved identifiers, `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceIdRange {
    start: u64,
    end: u64,
}

impl SourceIdRange {
    /// Number of identifiers in the block.
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    /// Returns `true` when the block holds no identifiers.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// First identifier of the block, if any.
    pub fn first(&self) -> Option<SourceId> {
        if self.is_empty() {
            None
        } else {
            SourceId::from_raw(self.start)
        }
    }

    /// Iterates the raw names in increasing order.
    pub fn raw(&self) -> std::ops::Range<u64> {
        self.start..self.end
    }

    /// Iterates the identifiers in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.raw().filter_map(SourceId::from_raw)
    }
}

/// Issues process-unique identifiers for newly created error sources.
///
/// A mutex guards the "read counter, reserve N, advance" step so every block
/// handed out is disjoint from every other block, under any interleaving.
#[derive(Debug)]
pub struct SourceIdGenerator {
    next: Mutex<u64>,
}

impl SourceIdGenerator {
    /// Creates a generator whose first identifier is `1`.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates a generator whose first identifier is `first` (zero is bumped to one).
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: Mutex::new(first.max(1)),
        }
    }

    /// Reserves a single identifier.
    pub fn next_id(&self) -> Result<SourceId, PropError> {
        let block = self.next_ids(1)?;
        block.first().ok_or_else(exhausted)
    }

    /// Reserves `count` consecutive identifiers.
    pub fn next_ids(&self, count: usize) -> Result<SourceIdRange, PropError> {
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        let start = *next;
        let end = start.checked_add(count as u64).ok_or_else(exhausted)?;
        *next = end;
        drop(next);
        tracing::trace!(start, count, "reserved source ids");
        Ok(SourceIdRange { start, end })
    }

    /// Returns the identifier the next reservation will start at.
    pub fn peek(&self) -> u64 {
        *self.next.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SourceIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn exhausted() -> PropError {
    PropError::InvalidOperation(
        ErrorInfo::new("ids-exhausted", "source identifier space exhausted")
            .with_hint("use a fresh generator for independent calculations"),
    )
}
