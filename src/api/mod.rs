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

//! The intercepted OS API surface.
//!
//! `reg`, `svc`, `event`, and `sync` declare the individual API
//! signatures; [`ApiSurface`] is the facade collaborators call through;
//! `sim` supplies an in-memory backing for tests and non-Windows
//! builds, `system` the live Win32 backing.

pub mod codes;
pub mod event;
pub mod reg;
pub mod sim;
pub mod surface;
pub mod svc;
pub mod sync;
#[cfg(windows)]
pub mod system;

pub use sim::SimOs;
pub use surface::ApiSurface;
pub use svc::{ControlHandler, ServiceStatus};
