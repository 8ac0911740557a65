use core::mem;
use core::ops::{Index, IndexMut};
use core::sync::atomic::{AtomicU64, Ordering};

use crate::Error;

/// Identifies the tree that minted a [`NodeHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TreeId(u64);

impl TreeId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Reference to a single node of a [`RedBlackTree`].
///
/// A handle stays valid until the node it refers to is erased or the tree is
/// cleared. After that every operation given the handle fails with
/// [`Error::InvalidHandle`], even if the storage slot has been reused by a
/// newer node. Handles of one tree are never valid in another tree.
///
/// [`RedBlackTree`]: crate::RedBlackTree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    tree: TreeId,
    index: u32,
    generation: u32,
}

enum Slot<T> {
    Occupied(T),
    Vacant { next_free: Option<u32> },
}

struct Entry<T> {
    // bumped every time the slot is vacated
    generation: u32,
    slot: Slot<T>,
}

/// Slot storage with a LIFO free list and generation tagged handles.
pub(crate) struct Arena<T> {
    // INVARIANTS:
    //  * every index reachable from `free_head` through `next_free` is vacant
    //  * `len` is the number of occupied entries
    //  * `entries.len() <= max_entries <= u32::MAX`
    entries: Vec<Entry<T>>,
    free_head: Option<u32>,
    len: usize,
    max_entries: usize,
    id: TreeId,
}

impl<T> Arena<T> {
    pub(crate) fn with_capacity(cap: usize) -> Self {
        Self {
            entries: Vec::with_capacity(cap),
            free_head: None,
            len: 0,
            max_entries: u32::MAX as usize,
            id: TreeId::next(),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Stores `value` and returns its index.
    ///
    /// Vacant slots are reused before the storage grows. If growing fails
    /// nothing is modified.
    pub(crate) fn try_insert(&mut self, value: T) -> Result<usize, Error> {
        if let Some(index) = self.free_head {
            let entry = &mut self.entries[index as usize];
            match entry.slot {
                Slot::Vacant { next_free } => self.free_head = next_free,
                Slot::Occupied(_) => unreachable!("free list points to occupied slot {index}"),
            }
            entry.slot = Slot::Occupied(value);
            self.len += 1;
            return Ok(index as usize);
        }

        let index = self.entries.len();
        if index >= self.max_entries {
            return Err(Error::OutOfMemory);
        }
        self.entries
            .try_reserve(1)
            .map_err(|_| Error::OutOfMemory)?;
        self.entries.push(Entry {
            generation: 0,
            slot: Slot::Occupied(value),
        });
        self.len += 1;
        Ok(index)
    }

    /// Takes the value out of slot `index`, invalidating all handles to it.
    ///
    /// # Panics
    ///
    /// If the slot is vacant.
    pub(crate) fn remove(&mut self, index: usize) -> T {
        let entry = &mut self.entries[index];
        let slot = mem::replace(
            &mut entry.slot,
            Slot::Vacant {
                next_free: self.free_head,
            },
        );
        let Slot::Occupied(value) = slot else {
            unreachable!("removing vacant slot {index}")
        };
        entry.generation = entry.generation.wrapping_add(1);
        self.free_head = Some(index as u32);
        self.len -= 1;
        value
    }

    /// Returns the index `handle` points to if it still refers to a live value
    /// of this arena.
    pub(crate) fn resolve(&self, handle: NodeHandle) -> Option<usize> {
        if handle.tree != self.id {
            return None;
        }

        let index = handle.index as usize;
        match self.entries.get(index) {
            Some(Entry {
                generation,
                slot: Slot::Occupied(_),
            }) if *generation == handle.generation => Some(index),
            _ => None,
        }
    }

    /// Lowers the number of slots the arena may grow to.
    #[cfg(test)]
    pub(crate) fn set_max_entries(&mut self, max_entries: usize) {
        assert!(max_entries <= u32::MAX as usize);
        self.max_entries = max_entries;
    }

    /// Creates a handle for the occupied slot `index`.
    pub(crate) fn handle(&self, index: usize) -> NodeHandle {
        debug_assert!(matches!(self.entries[index].slot, Slot::Occupied(_)));
        NodeHandle {
            tree: self.id,
            index: index as u32,
            generation: self.entries[index].generation,
        }
    }
}

impl<T> Index<usize> for Arena<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        match &self.entries[index].slot {
            Slot::Occupied(value) => value,
            Slot::Vacant { .. } => panic!("arena slot {index} is vacant"),
        }
    }
}

impl<T> IndexMut<usize> for Arena<T> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        match &mut self.entries[index].slot {
            Slot::Occupied(value) => value,
            Slot::Vacant { .. } => panic!("arena slot {index} is vacant"),
        }
    }
}
