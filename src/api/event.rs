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

//! Intercepted event-log APIs (`advapi32`).

use crate::define_api;

use super::codes::{Bool, RawHandle, ERROR_INVALID_HANDLE, FALSE};

define_api! {
    /// Register an event source: `(machine, source name)`. Returns the
    /// source handle, `0` on failure.
    pub RegisterEventSourceW in "advapi32":
        fn(Option<String>, String) -> RawHandle,
    convention: System,
    failure: 0,
    error_code: ERROR_INVALID_HANDLE,
}

define_api! {
    /// Write an event record: `(source, record type, category, event id,
    /// insertion strings)`.
    pub ReportEventW in "advapi32":
        fn(RawHandle, u16, u16, u32, Vec<String>) -> Bool,
    convention: System,
    failure: FALSE,
    error_code: ERROR_INVALID_HANDLE,
}

define_api! {
    /// Release an event source handle.
    pub DeregisterEventSource in "advapi32": fn(RawHandle) -> Bool,
    convention: System,
    failure: FALSE,
    error_code: ERROR_INVALID_HANDLE,
}
