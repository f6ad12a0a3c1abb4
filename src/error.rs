/*
 * This source code is licensed under the GNU AGPLv3 license found in the
 * LICENSE file in the root directory of this source tree.
 */

use thiserror::Error;

/// Construction-time configuration errors.
///
/// These are distinct from the policy callback contract: callbacks never
/// return an error (programming contract violations abort the process,
/// unknown-name callbacks are logged and ignored), but a misconfigured
/// policy is rejected up front, before any CS callback ever runs.
#[derive(Debug, PartialEq, Error)]
pub enum ConfigError {
	#[error("decay weight `c` must be in (0, 1], got {0}")]
	InvalidDecayWeight(f64),

	#[error("epoch `T` must be a positive number of seconds")]
	InvalidEpoch,

	#[error("congestion weight must be non-negative, got {0}")]
	InvalidCongestionWeight(f64),

	#[error("unknown policy name: {0:?}")]
	UnknownPolicy(String),
}

/// Logs and aborts the process. Used for programming-contract violations:
/// an internal invariant broken by a bug, not an environmental failure, so
/// no recovery is attempted.
#[macro_export]
macro_rules! contract_violation {
	($($arg:tt)*) => {{
		let message = format!($($arg)*);
		log::error!("policy contract violation: {message}");
		panic!("policy contract violation: {message}");
	}};
}
