// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lockstep-core: pure types for the ordered multi-resource lock coordinator
//!
//! This crate provides:
//! - Canonical resource keys and the deterministic acquisition order
//! - Job outcomes and release reports
//! - Coordinator configuration

pub mod config;
pub mod key;
pub mod order;
pub mod outcome;

pub use config::{parse_duration, ConfigError, CoordinatorConfig};
pub use key::{KeyError, ResourceKey};
pub use order::AcquisitionOrder;
pub use outcome::{JobOutcome, ReleaseError, ReleaseReport};
