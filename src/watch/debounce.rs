//! Per-set trigger coalescing
//!
//! Each sync set owns one slot with a pending deadline and an in-flight
//! flag. Notifications re-arm the deadline instead of queueing passes, so a
//! burst of changes costs one pass. A notification that lands while a pass
//! is running leaves the slot pending and exactly one follow-up pass runs
//! once the current one finishes.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
	pending: Option<Instant>,
	in_flight: bool,
}

/// Debounced scheduler handing out at most one pass per set at a time
#[derive(Debug, Clone)]
pub struct TriggerScheduler {
	debounce: Duration,
	slots: Vec<Slot>,
}

impl TriggerScheduler {
	pub fn new(set_count: usize, debounce: Duration) -> Self {
		TriggerScheduler { debounce, slots: vec![Slot::default(); set_count] }
	}

	/// Record a change for `set`, (re)arming its deadline
	pub fn notify(&mut self, set: usize) {
		self.notify_at(set, Instant::now());
	}

	pub fn notify_at(&mut self, set: usize, now: Instant) {
		if let Some(slot) = self.slots.get_mut(set) {
			slot.pending = Some(now + self.debounce);
		}
	}

	/// Mark `set` as due right away, skipping the debounce delay
	pub fn trigger_now(&mut self, set: usize) {
		if let Some(slot) = self.slots.get_mut(set) {
			slot.pending = Some(Instant::now());
		}
	}

	/// Earliest deadline among sets that could start a pass
	pub fn next_deadline(&self) -> Option<Instant> {
		self.slots.iter().filter(|s| !s.in_flight).filter_map(|s| s.pending).min()
	}

	/// Claim the first due set whose pass is not running
	///
	/// The claimed set is marked in flight until [`finish`](Self::finish).
	pub fn take_due(&mut self, now: Instant) -> Option<usize> {
		let index = self
			.slots
			.iter()
			.position(|s| !s.in_flight && s.pending.is_some_and(|deadline| deadline <= now))?;
		let slot = &mut self.slots[index];
		slot.pending = None;
		slot.in_flight = true;
		Some(index)
	}

	/// Release the in-flight guard of `set`
	pub fn finish(&mut self, set: usize) {
		if let Some(slot) = self.slots.get_mut(set) {
			slot.in_flight = false;
		}
	}

	pub fn is_pending(&self, set: usize) -> bool {
		self.slots.get(set).is_some_and(|s| s.pending.is_some())
	}

	pub fn is_in_flight(&self, set: usize) -> bool {
		self.slots.get(set).is_some_and(|s| s.in_flight)
	}
}


// vim: ts=4
