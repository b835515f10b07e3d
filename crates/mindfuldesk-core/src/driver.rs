//! Timer registrations owned by the scheduling driver.
//!
//! Two primitives back every countdown in the engine:
//!
//! - [`TimerRegistry`] holds the 1 Hz registrations (focus session and
//!   override window). Each arm hands out a [`TimerToken`] carrying a
//!   generation; cancelling or re-arming a slot invalidates older tokens, so a
//!   tick captured before `stop()` can never reach the next session.
//! - [`DeadlineQueue`] multiplexes many independent deadlines (one per health
//!   reminder) in a min-heap. Advancing the clock costs O(1) and only due
//!   entries are popped. Cancelled entries stay in the heap and are discarded
//!   lazily when they surface, or all at once when they outnumber live
//!   entries two to one.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerSlot {
    FocusSession,
    OverrideWindow,
}

/// Proof that a slot was armed at a given generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken {
    slot: TimerSlot,
    generation: u64,
}

impl TimerToken {
    pub fn slot(&self) -> TimerSlot {
        self.slot
    }
}

#[derive(Debug, Default)]
pub struct TimerRegistry {
    next_generation: u64,
    armed: HashMap<TimerSlot, u64>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `slot`, replacing any previous registration.
    pub fn arm(&mut self, slot: TimerSlot) -> TimerToken {
        self.next_generation += 1;
        self.armed.insert(slot, self.next_generation);
        TimerToken {
            slot,
            generation: self.next_generation,
        }
    }

    /// Cancel `slot`. Returns whether it was armed.
    pub fn cancel(&mut self, slot: TimerSlot) -> bool {
        self.armed.remove(&slot).is_some()
    }

    pub fn is_live(&self, token: TimerToken) -> bool {
        self.armed.get(&token.slot) == Some(&token.generation)
    }

    pub fn token(&self, slot: TimerSlot) -> Option<TimerToken> {
        self.armed
            .get(&slot)
            .map(|&generation| TimerToken { slot, generation })
    }

    /// Live tokens in dispatch order (focus session before override window).
    pub fn armed(&self) -> Vec<TimerToken> {
        let mut tokens: Vec<TimerToken> = self
            .armed
            .iter()
            .map(|(&slot, &generation)| TimerToken { slot, generation })
            .collect();
        tokens.sort_by_key(|t| t.slot);
        tokens
    }
}

#[derive(Debug)]
pub struct DeadlineQueue<K> {
    heap: BinaryHeap<Reverse<(u64, u64, K)>>,
    live: HashMap<K, (u64, u64)>,
    next_generation: u64,
}

impl<K> Default for DeadlineQueue<K> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: HashMap::new(),
            next_generation: 0,
        }
    }
}

impl<K: Clone + Eq + Hash + Ord> DeadlineQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `key` at `deadline`, superseding any earlier schedule.
    pub fn schedule(&mut self, key: K, deadline: u64) {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.live.insert(key.clone(), (deadline, generation));
        self.heap.push(Reverse((deadline, generation, key)));
        self.compact_if_bloated();
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        let cancelled = self.live.remove(key).is_some();
        self.compact_if_bloated();
        cancelled
    }

    pub fn clear(&mut self) {
        self.live.clear();
        self.heap.clear();
    }

    pub fn deadline(&self, key: &K) -> Option<u64> {
        self.live.get(key).map(|&(deadline, _)| deadline)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.live.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Earliest live deadline, discarding stale heap entries on the way.
    pub fn next_deadline(&mut self) -> Option<u64> {
        self.prune_stale();
        self.heap.peek().map(|Reverse((deadline, _, _))| *deadline)
    }

    /// Remove and return every key whose deadline is `<= now`, earliest first.
    /// Popped keys are no longer scheduled.
    pub fn pop_due(&mut self, now: u64) -> Vec<K> {
        let mut due = Vec::new();
        loop {
            self.prune_stale();
            match self.heap.peek() {
                Some(Reverse((deadline, _, _))) if *deadline <= now => {}
                _ => break,
            }
            if let Some(Reverse((_, _, key))) = self.heap.pop() {
                self.live.remove(&key);
                due.push(key);
            }
        }
        due
    }

    /// Rebuild the heap from live entries once stale ones exceed twice the
    /// live count.
    fn compact_if_bloated(&mut self) {
        let stale = self.heap.len().saturating_sub(self.live.len());
        if stale <= 2 * self.live.len() {
            return;
        }
        let live = &self.live;
        self.heap.retain(|Reverse((_, generation, key))| {
            live.get(key).is_some_and(|&(_, g)| g == *generation)
        });
    }

    fn prune_stale(&mut self) {
        while let Some(Reverse((_, generation, key))) = self.heap.peek() {
            match self.live.get(key) {
                Some(&(_, live_generation)) if live_generation == *generation => break,
                _ => {
                    self.heap.pop();
                }
            }
        }
    }
}
