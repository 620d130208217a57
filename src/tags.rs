//! Class-tag table (spec.md §3)
//!
//! Host-side map from the device's dense class index (0..N-1, assigned
//! monotonically as training progresses) to an opaque user tag. Bounded
//! capacity; the original (`original_source/grc/grc_i2c.c`, `MAX_TAG_CNT`)
//! hard-codes 5, spec.md invites implementations to raise it, so we use 16.

use crate::error::{GrcError, GrcResult};
use heapless::Vec;

/// Bounded capacity for the tag table (spec.md §6 closed set: "original = 5;
/// implementations may raise").
pub const CAPACITY: usize = 16;

/// User-visible class identifier. The source's `grc_class_tag_t` is a plain
/// `uint32_t`; we keep that shape since tags are opaque to the protocol.
pub type Tag = u32;

/// Ordered, index-addressable map of device class index to caller tag.
#[derive(Default)]
pub struct TagTable {
    entries: Vec<Tag, CAPACITY>,
}

impl TagTable {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `clear_state` empties the table.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Tag assigned to a device class index, if any.
    pub fn tag_for_index(&self, index: usize) -> Option<Tag> {
        self.entries.get(index).copied()
    }

    /// Class index already assigned to `tag`, if any.
    pub fn index_for_tag(&self, tag: Tag) -> Option<usize> {
        self.entries.iter().position(|&t| t == tag)
    }

    /// Appends a new tag to the next contiguous index.
    ///
    /// Used after a successful `ADD_NEW_TAG` train: indices are always
    /// assigned in call order (spec.md §8 invariant 5).
    pub fn push(&mut self, tag: Tag) -> GrcResult<usize> {
        let index = self.entries.len();
        self.entries.push(tag).map_err(|_| GrcError::ArgumentError)?;
        Ok(index)
    }

    /// Reinitialises the table to the identity map `0..count-1` (tag ==
    /// index), as `upload` does per spec.md §4.6.
    pub fn reinit_identity(&mut self, count: usize) -> GrcResult<()> {
        if count > CAPACITY {
            return Err(GrcError::ArgumentError);
        }
        self.entries.clear();
        for i in 0..count {
            self.entries.push(i as Tag).map_err(|_| GrcError::ArgumentError)?;
        }
        Ok(())
    }
}
