//! Background Tag Index
//!
//! Maps each cycle to the set of slots tagged as background in it. Built once
//! per chunk and read-only afterwards.
//!
//! ## Nearest-tag search
//!
//! Because cycles and slots are both kept ordered, the signed distance from a
//! query to the tags is monotone in `(cycle, slot)` order. The closest tag at or
//! before the query and the closest tag at or after it are therefore found with
//! two ordered range walks instead of scanning and sorting every distance.

use crate::types::{distance, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Legacy marker for "no tag before the query".
pub const NO_TAG_BEFORE: i64 = 999_999;

/// Legacy marker for "no tag after the query".
pub const NO_TAG_AFTER: i64 = -999_999;

/// Outcome of inserting a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagInsert {
    New,
    /// The `(cycle, slot)` pair was already tagged; the index is unchanged.
    Duplicate,
}

/// Signed distances from a query to its nearest tags.
///
/// `before <= 0 <= after` whenever both are present. A tag sitting exactly on
/// the query is reported on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NearestTags {
    pub before: Option<i64>,
    pub after: Option<i64>,
}

impl NearestTags {
    pub const NONE: Self = Self {
        before: None,
        after: None,
    };

    /// `(before, after)` with absent values replaced by the `(+999999, -999999)`
    /// markers used by the downstream ntuples.
    pub fn sentinel_pair(self) -> (i64, i64) {
        (
            self.before.unwrap_or(NO_TAG_BEFORE),
            self.after.unwrap_or(NO_TAG_AFTER),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackgroundTagIndex {
    tags: BTreeMap<u64, BTreeSet<u16>>,
    len: usize,
}

impl BackgroundTagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag `ts`. Re-inserting an existing pair is a no-op reported as
    /// [`TagInsert::Duplicate`].
    pub fn insert(&mut self, ts: Timestamp) -> TagInsert {
        if self.tags.entry(ts.cycle()).or_default().insert(ts.slot()) {
            self.len += 1;
            TagInsert::New
        } else {
            TagInsert::Duplicate
        }
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        self.tags
            .get(&ts.cycle())
            .is_some_and(|slots| slots.contains(&ts.slot()))
    }

    /// Number of distinct tagged `(cycle, slot)` pairs.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Tagged timestamps in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = Timestamp> + '_ {
        self.tags.iter().flat_map(|(&cycle, slots)| {
            slots
                .iter()
                .filter_map(move |&slot| Timestamp::new(cycle, slot).ok())
        })
    }

    /// Whether any tag in `ts`'s own cycle falls in the same strobe window.
    pub fn tags_window(&self, ts: Timestamp, strobe_length: u16) -> bool {
        let Some(slots) = self.tags.get(&ts.cycle()) else {
            return false;
        };
        let start = ts.window(strobe_length).saturating_mul(strobe_length);
        let end = start.saturating_add(strobe_length);
        slots.range(start..end).next().is_some()
    }

    /// Closest tag at or before `query` and closest tag at or after it, as
    /// signed distances from `query`.
    pub fn nearest_around(&self, query: Timestamp) -> NearestTags {
        NearestTags {
            before: self.last_at_or_before(query).map(|t| distance(query, t)),
            after: self.first_at_or_after(query).map(|t| distance(query, t)),
        }
    }

    fn last_at_or_before(&self, query: Timestamp) -> Option<Timestamp> {
        self.tags
            .range(..=query.cycle())
            .rev()
            .find_map(|(&cycle, slots)| {
                let slot = if cycle == query.cycle() {
                    slots.range(..=query.slot()).next_back()
                } else {
                    slots.last()
                };
                slot.and_then(|&s| Timestamp::new(cycle, s).ok())
            })
    }

    fn first_at_or_after(&self, query: Timestamp) -> Option<Timestamp> {
        self.tags.range(query.cycle()..).find_map(|(&cycle, slots)| {
            let slot = if cycle == query.cycle() {
                slots.range(query.slot()..).next()
            } else {
                slots.first()
            };
            slot.and_then(|&s| Timestamp::new(cycle, s).ok())
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
