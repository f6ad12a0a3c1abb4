/*
 * This source code is licensed under the GNU AGPLv3 license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::collections::HashMap;

use dlv_list::{Index, VecList};

use crate::{
	container::record::{StackRecord, StackState},
	name::Name,
};

/// The primary stack S shared by LIRS and DLIRS.
///
/// Backed by an arena (`VecList`) plus a name -> index auxiliary map, per
/// the design note that a hashed auxiliary index may sit on top of the
/// logical name -> record store without changing policy semantics. The
/// arena's back is the stack's top (the most-recently-used / push end); its
/// front is the stack's bottom (the pruning end), so `stack_pruning`
/// removing from the front always removes the least-recently-used record.
pub struct OrderedStack<H> {
	records: VecList<StackRecord<H>>,
	index: HashMap<Name, Index<StackRecord<H>>>,
	lir_count: usize,
	nhir_count: usize,
}

impl<H> Default for OrderedStack<H> {
	fn default() -> Self {
		OrderedStack {
			records: VecList::new(),
			index: HashMap::new(),
			lir_count: 0,
			nhir_count: 0,
		}
	}
}

impl<H: Clone> OrderedStack<H> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Number of resident LIR records currently in the stack.
	pub fn lir_count(&self) -> usize {
		self.lir_count
	}

	/// Number of non-resident (ghost) HIR records currently in the stack.
	pub fn nhir_count(&self) -> usize {
		self.nhir_count
	}

	pub fn find(&self, name: &Name) -> Option<Index<StackRecord<H>>> {
		self.index.get(name).copied()
	}

	pub fn record(&self, loc: Index<StackRecord<H>>) -> &StackRecord<H> {
		self.records
			.get(loc)
			.unwrap_or_else(|| crate::contract_violation!("dangling stack location"))
	}

	pub fn state_at(&self, loc: Index<StackRecord<H>>) -> StackState {
		self.record(loc).state()
	}

	pub fn set_state_at(&mut self, loc: Index<StackRecord<H>>, state: StackState) {
		let Some(record) = self.records.get_mut(loc) else {
			crate::contract_violation!("dangling stack location");
		};

		let prev = record.state();
		record.set_state(state);

		self.bump_count(prev, -1);
		self.bump_count(state, 1);
	}

	pub fn set_demoted_at(&mut self, loc: Index<StackRecord<H>>, demoted: bool) {
		let Some(record) = self.records.get_mut(loc) else {
			crate::contract_violation!("dangling stack location");
		};

		record.set_demoted(demoted);
	}

	/// Pushes a new record onto the top of the stack.
	pub fn push_back(
		&mut self,
		name: Name,
		state: StackState,
		demoted: bool,
		entry: Option<H>,
	) -> Index<StackRecord<H>> {
		let record = StackRecord::new(name.clone(), state, demoted, entry);
		let loc = self.records.push_back(record);

		self.index.insert(name, loc);
		self.bump_count(state, 1);

		loc
	}

	/// Removes and returns the bottom (least-recently-used) record.
	pub fn pop_front(&mut self) -> Option<StackRecord<H>> {
		let loc = self.records.front_index()?;
		self.erase_at(loc)
	}

	pub fn erase_at(&mut self, loc: Index<StackRecord<H>>) -> Option<StackRecord<H>> {
		let record = self.records.remove(loc)?;

		self.index.remove(record.name());
		self.bump_count(record.state(), -1);

		Some(record)
	}

	/// Peeks at the bottom (least-recently-used) record without removing it.
	pub fn get_bottom(&self) -> Option<&StackRecord<H>> {
		self.records.front()
	}

	/// Peeks at the top (most-recently-used) record without removing it.
	pub fn get_top(&self) -> Option<&StackRecord<H>> {
		self.records.back()
	}

	/// Removes the record at `loc` and re-inserts it at the top, optionally
	/// replacing its handle (a refreshed entry's handle may change across
	/// the insertion that collided with it).
	pub fn move_to_top(&mut self, loc: Index<StackRecord<H>>, entry: Option<H>) -> Index<StackRecord<H>> {
		let Some(mut record) = self.erase_at(loc) else {
			crate::contract_violation!("move_to_top on dangling stack location");
		};

		if let Some(entry) = entry {
			record.set_entry(Some(entry));
		}

		let name = record.name().clone();
		let state = record.state();
		let new_loc = self.records.push_back(record);

		self.index.insert(name, new_loc);
		self.bump_count(state, 1);

		new_loc
	}

	/// Repeatedly erases the bottom entry while it is not LIR. Returns the
	/// number of NHIR (ghost) records erased. After this call, the bottom is
	/// LIR or the stack is empty.
	pub fn stack_pruning(&mut self) -> usize {
		let mut erased_nhir = 0;

		while let Some(bottom) = self.records.front() {
			if bottom.state() == StackState::Lir {
				break;
			}

			let loc = self.records.front_index().unwrap();
			let record = self.erase_at(loc).unwrap();

			if record.state() == StackState::NHir {
				erased_nhir += 1;
			}
		}

		erased_nhir
	}

	/// Bulk-removes up to `k` non-resident-HIR records from any position,
	/// used by DLIRS to reclaim ghost slots when the stack exceeds its
	/// `2 * capacity` budget. Returns the number actually removed.
	pub fn erase_k_nhir(&mut self, k: usize) -> usize {
		let mut removed = 0;
		let mut cursor = self.records.front_index();

		while removed < k {
			let Some(loc) = cursor else { break };
			cursor = self.records.get_next_index(loc);

			if self.records.get(loc).map(|record| record.state()) == Some(StackState::NHir) {
				self.erase_at(loc);
				removed += 1;
			}
		}

		removed
	}

	fn bump_count(&mut self, state: StackState, delta: i64) {
		match state {
			StackState::Lir => self.lir_count = apply_delta(self.lir_count, delta),
			StackState::NHir => self.nhir_count = apply_delta(self.nhir_count, delta),
			// resident RHIR entries are always present in the list Q, whose
			// own length is the authoritative resident-HIR count.
			StackState::RHir => {},
		}
	}
}

fn apply_delta(count: usize, delta: i64) -> usize {
	(count as i64 + delta).max(0) as usize
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn push_find_and_prune() {
		let mut stack = OrderedStack::<u32>::new();

		stack.push_back(Name::from("/a"), StackState::Lir, false, Some(1));
		let loc = stack.push_back(Name::from("/b"), StackState::NHir, false, None);

		assert_eq!(stack.lir_count(), 1);
		assert_eq!(stack.nhir_count(), 1);
		assert!(stack.find(&Name::from("/b")).is_some());

		stack.set_state_at(loc, StackState::NHir);
		assert_eq!(stack.get_bottom().unwrap().name(), &Name::from("/a"));

		// bottom is LIR, nothing to prune yet since /a sits at the front
		let erased = stack.stack_pruning();
		assert_eq!(erased, 0);
	}

	#[test]
	fn move_to_top_relocates_and_keeps_counts() {
		let mut stack = OrderedStack::<u32>::new();

		let a = stack.push_back(Name::from("/a"), StackState::Lir, false, Some(1));
		stack.push_back(Name::from("/b"), StackState::Lir, false, Some(2));

		stack.move_to_top(a, Some(10));

		assert_eq!(stack.lir_count(), 2);
		assert_eq!(stack.get_top().unwrap().name(), &Name::from("/a"));
		assert_eq!(*stack.get_top().unwrap().entry().unwrap(), 10);
	}
}
