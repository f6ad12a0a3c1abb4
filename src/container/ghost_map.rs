/*
 * This source code is licensed under the GNU AGPLv3 license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::collections::HashMap;

use crate::name::Name;

/// A remembered score for an entry that is no longer resident. CCPCC-only.
#[derive(Debug, Clone, Copy)]
pub struct GhostRecord {
	pub p: f64,
	pub n: u32,
}

/// Name -> [`GhostRecord`] map. Disjoint from the popularity queue by name:
/// a name is either resident (in the queue) or a ghost (here), never both.
#[derive(Default)]
pub struct GhostMap {
	map: HashMap<Name, GhostRecord>,
}

impl GhostMap {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.map.len()
	}

	pub fn is_empty(&self) -> bool {
		self.map.is_empty()
	}

	/// Removes and returns the ghost record for `name`, if any.
	pub fn take(&mut self, name: &Name) -> Option<GhostRecord> {
		self.map.remove(name)
	}

	pub fn insert(&mut self, name: Name, record: GhostRecord) {
		self.map.insert(name, record);
	}

	pub fn values_mut(&mut self) -> impl Iterator<Item = &mut GhostRecord> {
		self.map.values_mut()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn take_removes_entry() {
		let mut ghosts = GhostMap::new();
		ghosts.insert(Name::from("/a"), GhostRecord { p: 1.0, n: 2 });

		assert_eq!(ghosts.len(), 1);
		let record = ghosts.take(&Name::from("/a")).unwrap();
		assert_eq!(record.n, 2);
		assert!(ghosts.is_empty());
	}
}
