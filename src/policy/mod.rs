/*
 * This source code is licensed under the GNU AGPLv3 license found in the
 * LICENSE file in the root directory of this source tree.
 */

mod ccp;
mod ccpcc;
mod dlirs;
pub(crate) mod evict_sink;
mod lirs;

use std::sync::Arc;

use crate::{entry::EntryHandle, error::ConfigError, scheduler::AgingClock};

pub use ccp::CcpPolicy;
pub use ccpcc::CcpccPolicy;
pub use dlirs::DlirsPolicy;
pub use lirs::LirsPolicy;

/// The policy name used when none is configured.
pub const DEFAULT_POLICY_NAME: &str = "lirs";

/// Tunables shared by the popularity policies; ignored by LIRS/DLIRS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyParams {
	/// Decay weight `c`, must be in `(0, 1]`.
	pub c: f64,
	/// Epoch `T` in seconds, must be positive.
	pub epoch_secs: f64,
	/// CCPCC congestion weight applied to resident score.
	pub u_a: f64,
	/// CCPCC congestion weight applied to the congestion counter.
	pub u_b: f64,
}

impl Default for PolicyParams {
	fn default() -> Self {
		PolicyParams {
			c: 0.5,
			epoch_secs: 2.0,
			u_a: 0.5,
			u_b: 0.5,
		}
	}
}

impl PolicyParams {
	fn validate(&self) -> Result<(), ConfigError> {
		if !(self.c > 0.0 && self.c <= 1.0) {
			return Err(ConfigError::InvalidDecayWeight(self.c));
		}

		if !(self.epoch_secs > 0.0) {
			return Err(ConfigError::InvalidEpoch);
		}

		if self.u_a < 0.0 {
			return Err(ConfigError::InvalidCongestionWeight(self.u_a));
		}

		if self.u_b < 0.0 {
			return Err(ConfigError::InvalidCongestionWeight(self.u_b));
		}

		Ok(())
	}
}

/// A closed set of policy variants sharing the four CS callbacks. Modeled as
/// a tagged enum rather than a trait object, per the engine's preference for
/// specialization over virtual dispatch across a fixed, small policy set.
pub enum Policy<H> {
	Lirs(LirsPolicy<H>),
	Dlirs(DlirsPolicy<H>),
	Ccp(CcpPolicy<H>),
	Ccpcc(CcpccPolicy<H>),
}

impl<H: EntryHandle + 'static> Policy<H> {
	pub fn set_limit(&mut self, capacity: usize) {
		match self {
			Policy::Lirs(policy) => policy.set_limit(capacity),
			Policy::Dlirs(policy) => policy.set_limit(capacity),
			Policy::Ccp(policy) => policy.set_limit(capacity),
			Policy::Ccpcc(policy) => policy.set_limit(capacity),
		}
	}

	pub fn after_insert(&mut self, handle: H) {
		match self {
			Policy::Lirs(policy) => policy.after_insert(handle),
			Policy::Dlirs(policy) => policy.after_insert(handle),
			Policy::Ccp(policy) => policy.after_insert(handle),
			Policy::Ccpcc(policy) => policy.after_insert(handle),
		}
	}

	pub fn after_refresh(&mut self, handle: H) {
		match self {
			Policy::Lirs(policy) => policy.after_refresh(handle),
			Policy::Dlirs(policy) => policy.after_refresh(handle),
			Policy::Ccp(policy) => policy.after_refresh(handle),
			Policy::Ccpcc(policy) => policy.after_refresh(handle),
		}
	}

	pub fn before_use(&mut self, handle: H) {
		match self {
			Policy::Lirs(policy) => policy.before_use(handle),
			Policy::Dlirs(policy) => policy.before_use(handle),
			Policy::Ccp(policy) => policy.before_use(handle),
			Policy::Ccpcc(policy) => policy.before_use(handle),
		}
	}

	pub fn before_erase(&mut self, handle: H) {
		match self {
			Policy::Lirs(policy) => policy.before_erase(handle),
			Policy::Dlirs(policy) => policy.before_erase(handle),
			Policy::Ccp(policy) => policy.before_erase(handle),
			Policy::Ccpcc(policy) => policy.before_erase(handle),
		}
	}

	/// Runs an aging tick. A no-op for LIRS/DLIRS, which have none; CCP and
	/// CCPCC call this from the callback their `AgingClock` fires.
	pub fn tick(&mut self) {
		match self {
			Policy::Lirs(_) | Policy::Dlirs(_) => {},
			Policy::Ccp(policy) => policy.tick(),
			Policy::Ccpcc(policy) => policy.tick(),
		}
	}
}

/// Instantiates one of the four registered policies by name.
pub fn make_policy<H: EntryHandle + 'static>(
	name: &str,
	capacity: usize,
	params: PolicyParams,
	scheduler: Arc<dyn AgingClock>,
	evict: impl FnMut(H) + 'static,
) -> Result<Policy<H>, ConfigError> {
	match name {
		"lirs" => Ok(Policy::Lirs(LirsPolicy::new(capacity, evict))),
		"dlirs" => Ok(Policy::Dlirs(DlirsPolicy::new(capacity, evict))),
		"ccp" => {
			params.validate()?;
			Ok(Policy::Ccp(CcpPolicy::new(capacity, params.c, params.epoch_secs, scheduler, evict)))
		},
		"ccpcc" => {
			params.validate()?;
			Ok(Policy::Ccpcc(CcpccPolicy::new(
				capacity,
				params.c,
				params.epoch_secs,
				params.u_a,
				params.u_b,
				scheduler,
				evict,
			)))
		},
		other => Err(ConfigError::UnknownPolicy(other.to_string())),
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

	#[test]
	fn default_policy_name_resolves() {
		let clock = Arc::new(NullClock::default());
		let policy = make_policy::<TestEntry>(DEFAULT_POLICY_NAME, 4, PolicyParams::default(), clock, |_| {});
		assert!(matches!(policy, Ok(Policy::Lirs(_))));
	}

	#[test]
	fn unknown_policy_name_is_rejected() {
		let clock = Arc::new(NullClock::default());
		let err = make_policy::<TestEntry>("nonexistent", 4, PolicyParams::default(), clock, |_| {}).unwrap_err();
		assert_eq!(err, ConfigError::UnknownPolicy("nonexistent".to_string()));
	}

	#[test]
	fn invalid_decay_weight_is_rejected() {
		let clock = Arc::new(NullClock::default());
		let params = PolicyParams { c: 0.0, ..PolicyParams::default() };
		let err = make_policy::<TestEntry>("ccp", 4, params, clock, |_| {}).unwrap_err();
		assert_eq!(err, ConfigError::InvalidDecayWeight(0.0));
	}
}
