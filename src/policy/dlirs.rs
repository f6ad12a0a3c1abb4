/*
 * This source code is licensed under the GNU AGPLv3 license found in the
 * LICENSE file in the root directory of this source tree.
 */

use crate::{
	container::{OrderedStack, ResidentList, StackState},
	contract_violation,
	entry::EntryHandle,
	policy::evict_sink::EvictSink,
};

/// LIRS plus dynamic resizing of the LIR/HIR partition, driven by the rate
/// of ghost hits versus demoted-RHIR hits.
pub struct DlirsPolicy<H> {
	capacity: usize,
	lir_size: usize,
	hir_size: usize,

	/// Number of currently-in-HIR entries that reached HIR by demotion
	/// from LIR, as opposed to fresh RHIR insertion.
	hir_lir: usize,

	stack: OrderedStack<H>,
	list: ResidentList<H>,

	evict: EvictSink<H>,
}

impl<H: EntryHandle + 'static> DlirsPolicy<H> {
	pub fn new(capacity: usize, evict: impl FnMut(H) + 'static) -> Self {
		let mut policy = DlirsPolicy {
			capacity: 0,
			lir_size: 0,
			hir_size: 0,
			hir_lir: 0,

			stack: OrderedStack::new(),
			list: ResidentList::new(),

			evict: EvictSink::new(evict),
		};

		policy.set_limit(capacity);
		policy
	}

	pub fn set_limit(&mut self, capacity: usize) {
		self.capacity = capacity;

		if capacity < 2 {
			self.hir_size = 0;
			self.lir_size = capacity;
			return;
		}

		let initial_hir = 1 + capacity / 10;
		self.hir_size = initial_hir.clamp(1, capacity - 1);
		self.lir_size = capacity - self.hir_size;
	}

	fn curlir(&self) -> usize {
		self.stack.lir_count()
	}

	fn curhir(&self) -> usize {
		self.list.len()
	}

	fn curnhir(&self) -> usize {
		self.stack.nhir_count()
	}

	/// Keeps the stack within its `2 * capacity` ghost budget.
	fn enforce_stack_budget(&mut self) {
		let total = self.curlir() + self.curhir() + self.curnhir();
		let budget = (2 * self.capacity).saturating_sub(2);

		if total > budget {
			self.stack.erase_k_nhir(total - budget);
		}
	}

	fn adjust_size(&mut self, hit_hir: bool) {
		if self.capacity < 2 {
			return;
		}

		let delta: i64 = if hit_hir {
			if self.curnhir() > self.hir_lir { 0 } else { 1 }
		} else if self.hir_lir > self.curnhir() {
			0
		} else {
			-1
		};

		let bound = (self.capacity - 1) as i64;
		self.hir_size = (self.hir_size as i64 + delta).clamp(1, bound) as usize;
		self.lir_size = self.capacity - self.hir_size;
	}

	pub fn after_insert(&mut self, handle: H) {
		if self.capacity == 0 {
			self.evict.emit(handle);
			return;
		}

		self.enforce_stack_budget();

		let name = handle.name().clone();

		if self.stack.lir_count() < self.lir_size {
			self.stack.push_back(name, StackState::Lir, false, Some(handle));
			return;
		}

		if self.list.len() < self.hir_size {
			self.stack.push_back(name.clone(), StackState::RHir, false, Some(handle.clone()));
			self.list.push_back(name, false, handle);
			return;
		}

		// cache full: evict the front of Q
		let Some(victim) = self.list.pop_front() else {
			contract_violation!("DLIRS overflow with empty resident-HIR list");
		};

		if victim.demoted() {
			self.hir_lir = self.hir_lir.saturating_sub(1);
		}

		if let Some(loc) = self.stack.find(victim.name()) {
			self.stack.set_state_at(loc, StackState::NHir);
			self.stack.set_demoted_at(loc, false);
		}

		if let Some(loc) = self.stack.find(&name) {
			let loc = self.stack.move_to_top(loc, Some(handle));
			self.stack.set_state_at(loc, StackState::Lir);

			if self.stack.record(loc).demoted() {
				self.hir_lir = self.hir_lir.saturating_sub(1);
			}
			self.stack.set_demoted_at(loc, false);

			self.demote_bottom(false);
			self.stack.stack_pruning();

			self.adjust_size(true);

			let k = self.curlir().saturating_sub(self.lir_size);
			self.change_lir_to_hir(k);
		} else {
			self.stack.push_back(name.clone(), StackState::RHir, false, Some(handle.clone()));
			self.list.push_back(name, false, handle);
		}

		self.evict.emit(victim.into_entry());
	}

	/// Demotes the current stack bottom (which must be LIR) to resident
	/// HIR, pushing it onto the back of Q. When `mark_demoted` is set, the
	/// record is flagged as reached-by-demotion and `hir_lir` grows.
	fn demote_bottom(&mut self, mark_demoted: bool) {
		let bottom = self.stack
			.get_bottom()
			.unwrap_or_else(|| contract_violation!("stack is empty during demotion"));

		if bottom.state() != StackState::Lir {
			contract_violation!("stack bottom is not LIR before demotion");
		}

		let name = bottom.name().clone();
		let loc = self.stack.find(&name).unwrap();
		let entry = self.stack
			.record(loc)
			.entry()
			.cloned()
			.unwrap_or_else(|| contract_violation!("resident LIR record missing its handle"));

		self.stack.set_state_at(loc, StackState::RHir);
		self.stack.set_demoted_at(loc, mark_demoted);
		self.list.push_back(name, mark_demoted, entry);

		if mark_demoted {
			self.hir_lir += 1;
		}
	}

	fn change_hir_to_lir(&mut self, k: usize) {
		for _ in 0..k {
			let Some(victim) = self.list.pop_front() else { break };
			let name = victim.name().clone();
			let demoted = victim.demoted();

			if let Some(loc) = self.stack.find(&name) {
				self.stack.set_state_at(loc, StackState::Lir);
				self.stack.set_demoted_at(loc, false);
			} else {
				self.stack.push_back(name, StackState::Lir, false, Some(victim.into_entry()));
			}

			if demoted {
				self.hir_lir = self.hir_lir.saturating_sub(1);
			}
		}
	}

	fn change_lir_to_hir(&mut self, k: usize) {
		for _ in 0..k {
			if self.stack.get_bottom().is_none() {
				break;
			}

			self.demote_bottom(true);
			self.stack.stack_pruning();
		}
	}

	fn remove_hir(&mut self, k: usize) {
		for _ in 0..k {
			let Some(victim) = self.list.pop_front() else { break };

			if let Some(loc) = self.stack.find(victim.name()) {
				self.stack.set_state_at(loc, StackState::NHir);
			}

			if victim.demoted() {
				self.hir_lir = self.hir_lir.saturating_sub(1);
			}

			self.evict.emit(victim.into_entry());
		}
	}

	pub fn after_refresh(&mut self, handle: H) {
		self.touch(handle);
	}

	pub fn before_use(&mut self, handle: H) {
		self.touch(handle);
	}

	fn touch(&mut self, handle: H) {
		let name = handle.name().clone();

		if let Some(loc) = self.stack.find(&name) {
			match self.stack.state_at(loc) {
				StackState::Lir => {
					self.stack.move_to_top(loc, Some(handle));
					self.stack.stack_pruning();
				},

				StackState::RHir => {
					let loc = self.stack.move_to_top(loc, Some(handle));
					let was_demoted = self.stack.record(loc).demoted();

					self.stack.set_state_at(loc, StackState::Lir);
					self.stack.set_demoted_at(loc, false);

					if was_demoted {
						self.hir_lir = self.hir_lir.saturating_sub(1);
					}

					self.demote_bottom(true);
					self.stack.stack_pruning();

					self.list.erase_by_name(&name);
				},

				StackState::NHir => {
					contract_violation!("resident entry {name} found in NHIR state");
				},
			}

			return;
		}

		if let Some(loc) = self.list.find(&name) {
			let demoted = self.list.record(loc).demoted();

			if demoted {
				self.adjust_size(false);
				self.list.set_demoted_at(loc, false);
				self.hir_lir = self.hir_lir.saturating_sub(1);
			}

			self.stack.push_back(name.clone(), StackState::RHir, false, Some(handle.clone()));
			self.list.move_to_back(&name, handle);

			let k = self.lir_size.saturating_sub(self.curlir());
			self.change_hir_to_lir(k);

			return;
		}

		log::warn!("dlirs: touch for unknown name {name}");
	}

	/// Rebalances the HIR partition after an external erase; no eviction
	/// signal is emitted for the handle being erased itself, only (if any)
	/// for entries `removeHIR` pops while restoring the invariant.
	pub fn before_erase(&mut self, _handle: H) {
		let excess = self.curhir() as i64 - self.hir_size as i64;

		if excess > 0 {
			self.remove_hir(excess as usize);
		}
	}
}
