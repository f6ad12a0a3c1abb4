/*
 * This source code is licensed under the GNU AGPLv3 license found in the
 * LICENSE file in the root directory of this source tree.
 */

use crate::name::Name;

/// An opaque, non-owning reference to a CS entry.
///
/// The policy never owns the underlying entry; a handle is a back-pointer
/// the CS hands in on every callback. Dereferencing a handle after
/// `beforeErase`/eviction is undefined, so a policy must forget every
/// handle it holds before returning from the callback that erases it.
pub trait EntryHandle: Clone {
	/// The entry's immutable name.
	fn name(&self) -> &Name;

	/// The data name with its last component dropped. Used by CCPCC to
	/// bucket congestion feedback per prefix; defaults to `name().parent()`.
	fn data_name_prefix(&self) -> Name {
		self.name().parent()
	}

	/// Whether the cached Data carries a congestion mark. Every entry has
	/// this bit regardless of the active policy; only CCPCC reads it.
	fn congestion_marked(&self) -> bool;
}
