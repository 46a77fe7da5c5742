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

//! # svcfault
//!
//! A Windows service management utility built around a fault-injection
//! layer for the OS calls it makes.
//!
//! Every OS API the crate touches is declared once with [`define_api!`]
//! and reached through an [`api::ApiSurface`], a facade over per-API
//! interception cells. Production code calls the surface and gets the
//! genuine system behavior; a test installs a [`mock::OverrideGuard`]
//! on a cell to redirect that one API for the guard's lifetime, then
//! the genuine behavior is restored when the guard drops.
//!
//! ## Failing a single OS call
//!
//! ```
//! use std::sync::Arc;
//! use svcfault::api::{reg, ApiSurface};
//! use svcfault::mock::OverrideGuard;
//! use svcfault::registry::RegistryKey;
//!
//! let (api, sim) = ApiSurface::simulated();
//! let api = Arc::new(api);
//! sim.seed_key("SOFTWARE\\Probe");
//!
//! // Genuine path: the key opens.
//! assert!(RegistryKey::open(api.clone(), "SOFTWARE\\Probe").is_ok());
//!
//! // Inject the canned failure for RegOpenKeyW only.
//! {
//!     let cell = api.cells().cell::<reg::RegOpenKeyW>();
//!     let _guard = OverrideGuard::<reg::RegOpenKeyW>::failing(&cell);
//!     assert!(RegistryKey::open(api.clone(), "SOFTWARE\\Probe").is_err());
//! }
//!
//! // Guard dropped: the genuine behavior is back.
//! assert!(RegistryKey::open(api, "SOFTWARE\\Probe").is_ok());
//! ```
//!
//! ## Modules
//!
//! - [`mock`]: signature descriptors, interception cells, override
//!   guards, and the keyed registry that owns the cells
//! - [`api`]: the declared OS call surface, the [`api::ApiSurface`]
//!   facade, and its simulated and live backings
//! - [`registry`], [`scm`], [`service`], [`eventlog`]: the service
//!   management collaborators, all reached through the surface

pub mod api;
pub mod error;
pub mod eventlog;
pub mod mock;
pub mod registry;
pub mod scm;
pub mod service;

pub use api::ApiSurface;
pub use error::{Result, SvcError};
pub use mock::{InterceptionCell, MockRegistry, OverrideGuard};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
