/*
 * This source code is licensed under the GNU AGPLv3 license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::time::Duration;

/// A handle returned by [`AgingClock::schedule_after`], identifying one
/// scheduled callback. The engine does not interpret its value; it exists
/// so a host scheduler can correlate a fired callback with the request
/// that scheduled it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleToken(pub u64);

/// A scheduling capability injected into CCP/CCPCC at construction.
///
/// The aging tick is an independent, periodically-scheduled event; the
/// policy must not take a hard dependency on a specific time source or
/// event-loop implementation, so the host provides this capability and the
/// policy asks it to be woken up again at the end of every tick.
pub trait AgingClock: Send + Sync {
	/// Requests a callback after `after` has elapsed. The policy reschedules
	/// itself this way at the end of every aging tick.
	fn schedule_after(&self, after: Duration) -> ScheduleToken;
}

#[cfg(test)]
pub(crate) mod test_support {
	use super::*;
	use std::sync::atomic::{AtomicU64, Ordering};

	/// A clock that never actually fires; tests call `tick()` on the
	/// policy directly and only care that scheduling requests don't panic.
	#[derive(Default)]
	pub struct NullClock {
		next: AtomicU64,
	}

	impl AgingClock for NullClock {
		fn schedule_after(&self, _after: Duration) -> ScheduleToken {
			ScheduleToken(self.next.fetch_add(1, Ordering::Relaxed))
		}
	}
}
