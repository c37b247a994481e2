// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The ROA snapshot store.
//!
//! The store publishes immutable snapshots of the ROA set. Each publication
//! gets the next serial number and records the delta from the previous
//! snapshot, so that routers a few generations behind can be brought up to
//! date incrementally. Readers only ever hold an `Arc` to a complete
//! snapshot; the publish lock is held just long enough to swap pointers.

use crate::log::cache_log;
use crate::types::Roa;
use crate::MOD_STORE;
use chrono::{DateTime, Utc};
use rtr_common::{lock, read_lock, write_lock};
use slog::Logger;
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

/// Default number of per-generation deltas retained for incremental sync.
pub const DEFAULT_HISTORY_DEPTH: usize = 16;

/// Serial assigned to the first snapshot a store publishes.
pub const DEFAULT_INITIAL_SERIAL: u32 = 1;

/// One published generation of the ROA set.
#[derive(Debug)]
pub struct Snapshot {
    generation: u32,
    roas: BTreeSet<Roa>,
    created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn roas(&self) -> &BTreeSet<Roa> {
        &self.roas
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn len(&self) -> usize {
        self.roas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roas.is_empty()
    }
}

/// The changes that take the ROA set of `from_generation` to the ROA set of
/// `to_generation`. `added` and `removed` are always disjoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub from_generation: u32,
    pub to_generation: u32,
    pub added: BTreeSet<Roa>,
    pub removed: BTreeSet<Roa>,
}

impl Delta {
    /// The delta between two ROA sets.
    pub fn between(
        old: &BTreeSet<Roa>,
        new: &BTreeSet<Roa>,
        from_generation: u32,
        to_generation: u32,
    ) -> Self {
        Self {
            from_generation,
            to_generation,
            added: new.difference(old).copied().collect(),
            removed: old.difference(new).copied().collect(),
        }
    }

    /// A delta that changes nothing.
    pub fn empty(generation: u32) -> Self {
        Self {
            from_generation: generation,
            to_generation: generation,
            added: BTreeSet::new(),
            removed: BTreeSet::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Fold `next`, which must start where this delta ends, into this delta.
    /// A ROA removed and then re-added (or added and then removed) cancels.
    pub fn compose(&mut self, next: &Delta) {
        debug_assert_eq!(self.to_generation, next.from_generation);
        for roa in &next.removed {
            if !self.added.remove(roa) {
                self.removed.insert(*roa);
            }
        }
        for roa in &next.added {
            if !self.removed.remove(roa) {
                self.added.insert(*roa);
            }
        }
        self.to_generation = next.to_generation;
    }

    /// Apply this delta to a ROA set.
    pub fn apply(&self, set: &mut BTreeSet<Roa>) {
        for roa in &self.removed {
            set.remove(roa);
        }
        set.extend(self.added.iter().copied());
    }
}

#[derive(Default)]
struct Published {
    snapshot: Option<Arc<Snapshot>>,
    /// Per-generation deltas, oldest first. The last one ends at the current
    /// snapshot.
    deltas: VecDeque<Arc<Delta>>,
}

pub struct SnapshotStore {
    published: RwLock<Published>,

    /// Serializes writers so that the delta computed outside the publish
    /// lock is against the snapshot actually being replaced.
    writer: Mutex<()>,

    history_depth: usize,
    initial_serial: u32,
    log: Logger,
}

impl SnapshotStore {
    /// Create an empty store. `history_depth` is clamped to at least one.
    pub fn new(history_depth: usize, initial_serial: u32, log: Logger) -> Self {
        Self {
            published: RwLock::new(Published::default()),
            writer: Mutex::new(()),
            history_depth: history_depth.max(1),
            initial_serial,
            log,
        }
    }

    /// The latest snapshot, or `None` before the first `replace`.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        read_lock!(self.published).snapshot.clone()
    }

    /// Publish `roas` as the next generation and return the new snapshot.
    /// Duplicate records collapse into one.
    pub fn replace(
        &self,
        roas: impl IntoIterator<Item = Roa>,
    ) -> Arc<Snapshot> {
        let _writer = lock!(self.writer);

        let roas: BTreeSet<Roa> = roas.into_iter().collect();
        let previous = self.current();

        let (generation, delta) = match &previous {
            Some(prev) => {
                let generation = prev.generation.wrapping_add(1);
                let delta = Delta::between(
                    &prev.roas,
                    &roas,
                    prev.generation,
                    generation,
                );
                (generation, Some(Arc::new(delta)))
            }
            None => (self.initial_serial, None),
        };

        let snapshot = Arc::new(Snapshot {
            generation,
            roas,
            created_at: Utc::now(),
        });

        let (added, removed) = delta
            .as_ref()
            .map(|d| (d.added.len(), d.removed.len()))
            .unwrap_or((snapshot.len(), 0));

        {
            let mut published = write_lock!(self.published);
            published.snapshot = Some(snapshot.clone());
            if let Some(delta) = delta {
                published.deltas.push_back(delta);
                while published.deltas.len() > self.history_depth {
                    published.deltas.pop_front();
                }
            }
        }

        cache_log!(self.log, MOD_STORE, info,
            "published snapshot generation {}", generation;
            "generation" => generation,
            "roas" => snapshot.len(),
            "added" => added,
            "removed" => removed,
            "created_at" => snapshot.created_at().to_rfc3339()
        );

        snapshot
    }

    /// The cumulative delta from generation `from` to the current snapshot.
    /// `None` means the caller must fall back to a full sync: there is no
    /// snapshot, or `from` is not a generation within the retained history.
    pub fn delta_since(&self, from: u32) -> Option<Delta> {
        let (current, steps) = {
            let published = read_lock!(self.published);
            let current = published.snapshot.as_ref()?.generation;
            if from == current {
                return Some(Delta::empty(current));
            }
            let start = published
                .deltas
                .iter()
                .position(|d| d.from_generation == from)?;
            let steps: Vec<Arc<Delta>> =
                published.deltas.iter().skip(start).cloned().collect();
            (current, steps)
        };

        let mut iter = steps.iter();
        let mut delta = iter.next()?.as_ref().clone();
        for step in iter {
            delta.compose(step);
        }
        debug_assert_eq!(delta.to_generation, current);
        Some(delta)
    }

    pub fn history_depth(&self) -> usize {
        self.history_depth
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::Prefix;
    use pretty_assertions::assert_eq;
    use rtr_common::log::discard_logger;

    fn roa(p: &str, max: u8, asn: u32) -> Roa {
        Roa::new(p.parse::<Prefix>().expect("prefix"), max, asn).expect("roa")
    }

    fn set(roas: &[Roa]) -> BTreeSet<Roa> {
        roas.iter().copied().collect()
    }

    #[test]
    fn empty_store_has_nothing() {
        let store = SnapshotStore::new(4, 1, discard_logger());
        assert!(store.current().is_none());
        assert!(store.delta_since(0).is_none());
        assert!(store.delta_since(1).is_none());
    }

    #[test]
    fn generations_increase_by_one() {
        let store = SnapshotStore::new(4, 1, discard_logger());
        let a = roa("10.0.0.0/8", 8, 100);
        let mut last = None;
        for i in 0..10u32 {
            let s = store.replace(vec![a]);
            assert_eq!(s.generation(), 1 + i);
            if let Some(prev) = last {
                assert_eq!(s.generation(), prev + 1);
            }
            last = Some(s.generation());
        }
        assert_eq!(store.current().expect("current").generation(), 10);
    }

    #[test]
    fn serial_wraps() {
        let store = SnapshotStore::new(4, u32::MAX, discard_logger());
        assert_eq!(store.replace(Vec::new()).generation(), u32::MAX);
        assert_eq!(store.replace(Vec::new()).generation(), 0);
        let d = store.delta_since(u32::MAX).expect("delta across wrap");
        assert_eq!(d.from_generation, u32::MAX);
        assert_eq!(d.to_generation, 0);
    }

    #[test]
    fn delta_since_current_is_empty() {
        let store = SnapshotStore::new(4, 1, discard_logger());
        store.replace(vec![roa("10.0.0.0/8", 8, 100)]);
        let d = store.delta_since(1).expect("delta");
        assert!(d.is_empty());
        assert_eq!(d.to_generation, 1);
    }

    #[test]
    fn delta_single_step() {
        let store = SnapshotStore::new(4, 1, discard_logger());
        let a = roa("10.0.0.0/8", 8, 100);
        let b = roa("192.0.2.0/24", 24, 200);
        let c = roa("2001:db8::/32", 48, 300);
        store.replace(vec![a, b]);
        store.replace(vec![b, c]);

        let d = store.delta_since(1).expect("delta");
        assert_eq!(d.from_generation, 1);
        assert_eq!(d.to_generation, 2);
        assert_eq!(d.added, set(&[c]));
        assert_eq!(d.removed, set(&[a]));
    }

    #[test]
    fn delta_composes_across_generations() {
        let store = SnapshotStore::new(8, 1, discard_logger());
        let a = roa("10.0.0.0/8", 8, 100);
        let b = roa("192.0.2.0/24", 24, 200);
        let c = roa("2001:db8::/32", 48, 300);
        let d = roa("198.51.100.0/24", 24, 400);

        let g1 = store.replace(vec![a, b]);
        store.replace(vec![b, c]); // -a +c
        store.replace(vec![a, b, d]); // +a -c +d
        let g4 = store.replace(vec![a, d]); // -b

        let delta = store.delta_since(g1.generation()).expect("delta");
        assert_eq!(delta.to_generation, g4.generation());
        assert_eq!(delta.added, set(&[d]));
        assert_eq!(delta.removed, set(&[b]));

        let mut rebuilt = g1.roas().clone();
        delta.apply(&mut rebuilt);
        assert_eq!(&rebuilt, g4.roas());
    }

    #[test]
    fn history_window_is_bounded() {
        let store = SnapshotStore::new(2, 1, discard_logger());
        for i in 0..5u32 {
            store.replace(vec![roa("10.0.0.0/8", 8, i)]);
        }
        // generations 1..=5, deltas 3->4 and 4->5 retained
        assert!(store.delta_since(1).is_none());
        assert!(store.delta_since(2).is_none());
        assert!(store.delta_since(3).is_some());
        assert!(store.delta_since(4).is_some());
        assert!(store.delta_since(5).is_some());
        // never published
        assert!(store.delta_since(6).is_none());
    }

    #[test]
    fn zero_depth_clamped() {
        let store = SnapshotStore::new(0, 1, discard_logger());
        assert_eq!(store.history_depth(), 1);
        store.replace(Vec::new());
        store.replace(vec![roa("10.0.0.0/8", 8, 1)]);
        assert!(store.delta_since(1).is_some());
    }

    #[test]
    fn duplicates_collapse() {
        let store = SnapshotStore::new(2, 1, discard_logger());
        let a = roa("10.0.0.0/8", 8, 100);
        let s = store.replace(vec![a, a, a]);
        assert_eq!(s.len(), 1);
    }
}
