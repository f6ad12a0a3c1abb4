/*
 * This source code is licensed under the GNU AGPLv3 license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::{collections::HashMap, sync::Arc, time::Duration};

use crate::{
	container::{GhostMap, GhostRecord, PopRecord, PopularityQueue},
	entry::EntryHandle,
	name::Name,
	policy::evict_sink::EvictSink,
	scheduler::AgingClock,
};

/// CCP augmented with per-prefix congestion feedback and a persistent ghost
/// history used to bias admission of previously-evicted names.
pub struct CcpccPolicy<H> {
	capacity: usize,
	c: f64,
	epoch_secs: f64,
	u_a: f64,
	u_b: f64,

	queue: PopularityQueue<H>,
	congestion: HashMap<Name, u32>,
	ghosts: GhostMap,

	scheduler: Arc<dyn AgingClock>,
	evict: EvictSink<H>,
}

impl<H: EntryHandle + 'static> CcpccPolicy<H> {
	pub fn new(
		capacity: usize,
		c: f64,
		epoch_secs: f64,
		u_a: f64,
		u_b: f64,
		scheduler: Arc<dyn AgingClock>,
		evict: impl FnMut(H) + 'static,
	) -> Self {
		let policy = CcpccPolicy {
			capacity,
			c,
			epoch_secs,
			u_a,
			u_b,
			queue: PopularityQueue::new(),
			congestion: HashMap::new(),
			ghosts: GhostMap::new(),
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
		let prefix = handle.data_name_prefix();

		let counter = self.congestion.entry(prefix.clone()).or_insert(0);
		if handle.congestion_marked() {
			*counter += 1;
		}
		let congestion = *counter;

		let (history_p, history_n) = match self.ghosts.take(&name) {
			Some(ghost) => (ghost.p, ghost.n),
			None => (0.0, 0),
		};

		let a = self.aging_factor();
		let cur_p = self.u_a * (a * history_n as f64 + history_p) / (a + 1.0) + self.u_b * congestion as f64;

		let is_full = self.capacity > 0 && self.queue.len() >= self.capacity;

		if is_full {
			if let Some(front) = self.queue.front() {
				if cur_p <= front.p() {
					self.ghosts.insert(name, GhostRecord { p: history_p, n: history_n + 1 });
					self.evict.emit(handle);
					return;
				}
			}
		}

		self.queue.insert(PopRecord::new(name, Some(prefix), cur_p, 1, handle));
		self.queue.sort();
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
			None => log::warn!("ccpcc: refresh/use for unknown name {name}"),
		}
	}

	/// No-op, matching CCP's inherited `beforeErase` behavior; see the
	/// crate's `DESIGN.md` for the open-question resolution this preserves.
	pub fn before_erase(&mut self, _handle: H) {}

	fn evict_entries(&mut self) {
		while self.queue.len() > self.capacity {
			let Some(victim) = self.queue.pop_front() else { break };
			let name = victim.name().clone();
			let ghost = GhostRecord { p: victim.p(), n: victim.n() };

			self.ghosts.insert(name, ghost);
			self.evict.emit(victim.into_entry());
		}
	}

	/// Runs one aging tick and reschedules itself for the next epoch.
	pub fn tick(&mut self) {
		let a = self.aging_factor();

		for record in self.queue.iter_mut() {
			let n = record.take_n();
			let congestion = record
				.prefix()
				.and_then(|prefix| self.congestion.get(prefix))
				.copied()
				.unwrap_or(0);

			let p = self.u_a * (a * n as f64 + record.p()) / (a + 1.0) + self.u_b * congestion as f64;
			record.set_p(p);
		}

		for ghost in self.ghosts.values_mut() {
			ghost.p = (a * ghost.n as f64 + ghost.p) / (a + 1.0);
			ghost.n = 0;
		}

		self.congestion.clear();
		self.queue.sort();

		self.scheduler.schedule_after(self.epoch());
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::scheduler::test_support::NullClock;

	#[derive(Clone)]
	struct TestEntry {
		name: Name,
		congestion_marked: bool,
	}

	impl TestEntry {
		fn new(name: &str) -> Self {
			TestEntry { name: Name::from(name), congestion_marked: false }
		}
	}

	impl EntryHandle for TestEntry {
		fn name(&self) -> &Name {
			&self.name
		}

		fn congestion_marked(&self) -> bool {
			self.congestion_marked
		}
	}

	#[test]
	fn admission_rejects_unpromising_newcomer() {
		use std::{cell::RefCell, rc::Rc};

		let evicted = Rc::new(RefCell::new(Vec::new()));
		let sink = evicted.clone();

		let clock = Arc::new(NullClock::default());
		let mut policy = CcpccPolicy::new(1, 0.5, 2.0, 0.5, 0.5, clock, move |handle: TestEntry| {
			sink.borrow_mut().push(handle.name().to_string());
		});

		policy.after_insert(TestEntry::new("/a"));
		assert!(evicted.borrow().is_empty());

		policy.tick();
		assert_eq!(policy.queue.front().unwrap().p(), 0.0);

		policy.after_insert(TestEntry::new("/b"));

		assert_eq!(evicted.borrow().as_slice(), ["/b"]);
		assert_eq!(policy.ghosts.len(), 1);
		assert_eq!(policy.queue.len(), 1);
		assert_eq!(policy.queue.front().unwrap().name(), &Name::from("/a"));
	}

	#[test]
	fn congestion_marked_insert_increments_prefix_counter() {
		let clock = Arc::new(NullClock::default());
		let mut policy = CcpccPolicy::new(4, 0.5, 2.0, 0.5, 0.5, clock, |_: TestEntry| {});

		let mut marked = TestEntry::new("/a/1");
		marked.congestion_marked = true;
		policy.after_insert(marked);

		assert_eq!(*policy.congestion.get(&Name::from("/a")).unwrap(), 1);
	}
}
