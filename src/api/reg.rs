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

//! Intercepted registry APIs (`advapi32`).
//!
//! Failure sentinels and last-error codes follow the documented Win32
//! contracts: registry calls return their status directly and do not
//! touch the last error, so the canned failures return
//! `ERROR_REGISTRY_CORRUPT` (or `ERROR_INVALID_HANDLE` for the close
//! path) with no last-error side effect.

use crate::define_api;

use super::codes::{HKey, Lstatus, ERROR_INVALID_HANDLE, ERROR_REGISTRY_CORRUPT, NO_ERROR};

define_api! {
    /// Open an existing key under a root key. Returns `(status, key)`;
    /// the key is meaningful only when the status is `NO_ERROR`.
    pub RegOpenKeyW in "advapi32": fn(HKey, String) -> (Lstatus, HKey),
    convention: System,
    failure: (ERROR_REGISTRY_CORRUPT, 0),
    error_code: NO_ERROR,
}

define_api! {
    /// Create (or open) a key under a root key. Returns `(status, key)`.
    pub RegCreateKeyW in "advapi32": fn(HKey, String) -> (Lstatus, HKey),
    convention: System,
    failure: (ERROR_REGISTRY_CORRUPT, 0),
    error_code: NO_ERROR,
}

define_api! {
    /// Set a value on an open key: `(key, value name, value type, data)`.
    pub RegSetValueExW in "advapi32": fn(HKey, String, u32, Vec<u8>) -> Lstatus,
    convention: System,
    failure: ERROR_REGISTRY_CORRUPT,
    error_code: NO_ERROR,
}

define_api! {
    /// Close an open key handle.
    pub RegCloseKey in "advapi32": fn(HKey) -> Lstatus,
    convention: System,
    failure: ERROR_INVALID_HANDLE,
    error_code: NO_ERROR,
}
