/*
 * This source code is licensed under the GNU AGPLv3 license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::{sync::Arc, time::Duration};

use crate::{
	container::{PopRecord, PopularityQueue},
	entry::EntryHandle,
	policy::evict_sink::EvictSink,
	scheduler::AgingClock,
};

/// Popularity aging with an EWMA-like recurrence; the queue's front (lowest
/// score) is evicted first.
pub struct CcpPolicy<H> {
	capacity: usize,
	c: f64,
	epoch_secs: f64,

	queue: PopularityQueue<H>,

	scheduler: Arc<dyn AgingClock>,
	evict: EvictSink<H>,
}

impl<H: EntryHandle + 'static> CcpPolicy<H> {
	pub fn new(
		capacity: usize,
		c: f64,
		epoch_secs: f64,
		scheduler: Arc<dyn AgingClock>,
		evict: impl FnMut(H) + 'static,
	) -> Self {
		let policy = CcpPolicy {
			capacity,
			c,
			epoch_secs,
			queue: PopularityQueue::new(),
			scheduler,
			evict: EvictSink::new(evict),
		};

		policy.scheduler.schedule_after(policy.epoch());
		policy
	}

	pub fn set_limit(&mut self, capacity: usize) {
		self.capacity = capacity;
		self.evict_entries();
	}

	fn epoch(&self) -> Duration {
		Duration::from_secs_f64(self.epoch_secs.max(0.0))
	}

	fn aging_factor(&self) -> f64 {
		1.0 + self.c * self.epoch_secs
	}

	pub fn after_insert(&mut self, handle: H) {
		let name = handle.name().clone();
		self.queue.insert(PopRecord::new(name, None, 0.0, 1, handle));

		self.evict_entries();
	}

	pub fn after_refresh(&mut self, handle: H) {
		self.bump(handle);
	}

	pub fn before_use(&mut self, handle: H) {
		self.bump(handle);
	}

	fn bump(&mut self, handle: H) {
		let name = handle.name().clone();

		match self.queue.get_mut(&name) {
			Some(record) => record.increment_n(),
			None => log::warn!("ccp: refresh/use for unknown name {name}"),
		}
	}

	/// No-op: the source leaves `beforeErase` disabled for this policy; see
	/// the crate's `DESIGN.md` for the open-question resolution.
	pub fn before_erase(&mut self, _handle: H) {}

	fn evict_entries(&mut self) {
		while self.queue.len() > self.capacity {
			let Some(victim) = self.queue.pop_front() else { break };
			self.evict.emit(victim.into_entry());
		}

		self.queue.sort();
	}

	/// Runs one aging tick and reschedules itself for the next epoch.
	pub fn tick(&mut self) {
		let a = self.aging_factor();

		for record in self.queue.iter_mut() {
			let n = record.take_n();
			record.set_p((a * n as f64 + record.p()) / (a + 1.0));
		}

		self.queue.sort();

		self.scheduler.schedule_after(self.epoch());
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{name::Name, scheduler::test_support::NullClock};

	#[derive(Clone)]
	struct TestEntry(Name);

	impl EntryHandle for TestEntry {
		fn name(&self) -> &Name {
			&self.0
		}

		fn congestion_marked(&self) -> bool {
			false
		}
	}

	fn entry(name: &str) -> TestEntry {
		TestEntry(Name::from(name))
	}

	#[test]
	fn basic_aging_and_eviction_scenario() {
		use std::{cell::RefCell, rc::Rc};

		let evicted = Rc::new(RefCell::new(Vec::new()));
		let sink = evicted.clone();

		let clock = Arc::new(NullClock::default());
		let mut policy = CcpPolicy::new(2, 0.5, 2.0, clock, move |handle: TestEntry| {
			sink.borrow_mut().push(handle.name().to_string());
		});

		policy.after_insert(entry("/a"));
		policy.after_insert(entry("/b"));

		policy.before_use(entry("/a"));
		policy.before_use(entry("/a"));
		policy.before_use(entry("/a"));

		policy.tick();

		let a = policy.queue.get_mut(&Name::from("/a")).unwrap().p();
		let b = policy.queue.get_mut(&Name::from("/b")).unwrap().p();
		assert!((a - 8.0 / 3.0).abs() < 1e-9);
		assert!((b - 2.0 / 3.0).abs() < 1e-9);

		policy.after_insert(entry("/c"));
		assert_eq!(evicted.borrow().as_slice(), ["/b"]);
	}

	#[test]
	fn unknown_name_refresh_is_ignored() {
		let clock = Arc::new(NullClock::default());
		let mut policy = CcpPolicy::new(4, 0.5, 2.0, clock, |_: TestEntry| {});

		policy.before_use(entry("/never-inserted"));
		assert!(policy.queue.is_empty());
	}
}
