// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lockstep execution engine: ordered acquisition, guarded execution and
//! reverse-order release

mod acquire;
mod cancel;
mod coordinator;
mod error;
mod release;
mod slot;
mod workload;

pub use acquire::{acquire_all, AcquireReason, AcquisitionFailure, HeldLockStack};
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use coordinator::{Coordinator, JobReport};
pub use error::JobError;
pub use release::release_all;
pub use slot::{run_slot, Workload, WorkloadError};
pub use workload::{CommandWorkload, SleepWorkload};
