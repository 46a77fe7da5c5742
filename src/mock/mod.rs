// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fault-injection framework for OS API calls.
//!
//! The framework lets a test deterministically replace any individual
//! OS-API call with custom or canned-failure behavior, for the duration
//! of one test, with guaranteed restoration afterward, and without the
//! production code being aware a substitution occurred.
//!
//! Four pieces compose it:
//!
//! - [`ApiSpec`] / [`define_api!`](crate::define_api): compile-time
//!   description of a free function's calling signature, plus the
//!   canonical "always fail" behavior ([`always_fail`]).
//! - [`InterceptionCell`]: per-API state holding the genuine and the
//!   currently active implementation; all calls funnel through it.
//! - [`OverrideGuard`]: scope-bound controller installing a behavior on
//!   construction and restoring the genuine one on drop.
//! - [`MockRegistry`] / [`ExportTable`]: explicit keying of cells by
//!   API, bound against named module export tables, reached by
//!   dependency injection instead of process-wide statics.
//!
//! Everything is synchronous and runs on the caller's thread. A cell's
//! active implementation carries no cross-thread ordering guarantees;
//! the test harness is expected to serialize use of any one API. In
//! practice each test builds its own registry, so parallel test threads
//! touch disjoint cells.
//!
//! ```
//! use std::sync::Arc;
//! use svcfault::define_api;
//! use svcfault::mock::{last_error, ExportTable, MockRegistry, OverrideGuard};
//!
//! define_api! {
//!     pub ProbeOpen in "probe": fn(u32) -> u32,
//!     convention: System,
//!     failure: 0,
//!     error_code: 87,
//! }
//!
//! let registry = MockRegistry::new([
//!     ExportTable::new("probe").export::<ProbeOpen>(|(n,)| n + 1),
//! ]);
//! let cell = registry.cell::<ProbeOpen>();
//!
//! assert_eq!(cell.invoke((1,)), 2); // genuine dispatch
//! {
//!     let _guard = OverrideGuard::failing(&cell);
//!     assert_eq!(cell.invoke((1,)), 0); // canned failure
//!     assert_eq!(last_error(), 87);
//! }
//! assert_eq!(cell.invoke((1,)), 2); // restored
//! ```

mod cell;
mod guard;
mod module;
mod registry;
mod signature;

pub use cell::InterceptionCell;
pub use guard::OverrideGuard;
pub use module::ExportTable;
pub use registry::MockRegistry;
pub use signature::{always_fail, last_error, set_last_error, ApiFn, ApiSpec, CallConvention};
