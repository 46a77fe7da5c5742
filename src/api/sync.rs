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

//! Intercepted synchronization APIs (`kernel32`), used by the hosted
//! service's stop-event plumbing.

use crate::define_api;

use super::codes::{
    Bool, RawHandle, ERROR_INVALID_HANDLE, ERROR_NOT_ENOUGH_MEMORY, FALSE, WAIT_FAILED,
};

define_api! {
    /// Create an event object: `(manual reset, initially signaled)`.
    /// Returns the event handle, `0` on failure.
    pub CreateEventW in "kernel32": fn(bool, bool) -> RawHandle,
    convention: System,
    failure: 0,
    error_code: ERROR_NOT_ENOUGH_MEMORY,
}

define_api! {
    /// Signal an event object.
    pub SetEvent in "kernel32": fn(RawHandle) -> Bool,
    convention: System,
    failure: FALSE,
    error_code: ERROR_INVALID_HANDLE,
}

define_api! {
    /// Wait on a handle with a millisecond timeout. Returns one of the
    /// `WAIT_*` codes.
    pub WaitForSingleObject in "kernel32": fn(RawHandle, u32) -> u32,
    convention: System,
    failure: WAIT_FAILED,
    error_code: ERROR_INVALID_HANDLE,
}

define_api! {
    /// Close a kernel object handle.
    pub CloseHandle in "kernel32": fn(RawHandle) -> Bool,
    convention: System,
    failure: FALSE,
    error_code: ERROR_INVALID_HANDLE,
}
