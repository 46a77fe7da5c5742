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

//! Intercepted Service Control Manager and service-status APIs
//! (`advapi32`).

use std::sync::Arc;

use crate::define_api;

use super::codes::{
    Bool, ScHandle, StatusHandle, ERROR_INVALID_HANDLE, ERROR_INVALID_PARAMETER,
    ERROR_NOT_ENOUGH_MEMORY, FALSE,
};

/// Service status record reported to and queried from the SCM.
///
/// Mirrors the fields of the Win32 `SERVICE_STATUS` structure the
/// collaborators actually use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServiceStatus {
    pub service_type: u32,
    pub current_state: u32,
    pub controls_accepted: u32,
    pub win32_exit_code: u32,
    pub checkpoint: u32,
    pub wait_hint: u32,
}

impl ServiceStatus {
    /// All-zero status, usable in const contexts.
    pub const ZERO: ServiceStatus = ServiceStatus {
        service_type: 0,
        current_state: 0,
        controls_accepted: 0,
        win32_exit_code: 0,
        checkpoint: 0,
        wait_hint: 0,
    };
}

/// Service control handler callback registered with the SCM dispatcher.
pub type ControlHandler = Arc<dyn Fn(u32) + Send + Sync>;

define_api! {
    /// Connect to the SCM: `(machine, database, desired access)`.
    pub OpenSCManagerW in "advapi32":
        fn(Option<String>, Option<String>, u32) -> ScHandle,
    convention: System,
    failure: 0,
    error_code: ERROR_INVALID_PARAMETER,
}

define_api! {
    /// Open an existing service: `(manager, service name, desired access)`.
    pub OpenServiceW in "advapi32": fn(ScHandle, String, u32) -> ScHandle,
    convention: System,
    failure: 0,
    error_code: ERROR_INVALID_PARAMETER,
}

define_api! {
    /// Create a service: `(manager, name, display name, desired access,
    /// service type, start type, error control, binary path)`.
    pub CreateServiceW in "advapi32":
        fn(ScHandle, String, String, u32, u32, u32, u32, String) -> ScHandle,
    convention: System,
    failure: 0,
    error_code: ERROR_INVALID_PARAMETER,
}

define_api! {
    /// Mark a service for deletion.
    pub DeleteService in "advapi32": fn(ScHandle) -> Bool,
    convention: System,
    failure: FALSE,
    error_code: ERROR_INVALID_HANDLE,
}

define_api! {
    /// Start a service with optional arguments.
    pub StartServiceW in "advapi32": fn(ScHandle, Vec<String>) -> Bool,
    convention: System,
    failure: FALSE,
    error_code: ERROR_INVALID_HANDLE,
}

define_api! {
    /// Send a control code to a service. Returns `(ok, status)` with the
    /// service's status after the control was delivered.
    pub ControlService in "advapi32": fn(ScHandle, u32) -> (Bool, ServiceStatus),
    convention: System,
    failure: (FALSE, ServiceStatus::ZERO),
    error_code: ERROR_INVALID_HANDLE,
}

define_api! {
    /// Query a service's current status. Returns `(ok, status)`.
    pub QueryServiceStatus in "advapi32": fn(ScHandle) -> (Bool, ServiceStatus),
    convention: System,
    failure: (FALSE, ServiceStatus::ZERO),
    error_code: ERROR_INVALID_HANDLE,
}

define_api! {
    /// Close an SCM or service handle.
    pub CloseServiceHandle in "advapi32": fn(ScHandle) -> Bool,
    convention: System,
    failure: FALSE,
    error_code: ERROR_INVALID_HANDLE,
}

define_api! {
    /// Register a service's control handler: `(service name, handler)`.
    /// Returns the status handle, `0` on failure.
    pub RegisterServiceCtrlHandlerW in "advapi32":
        fn(String, ControlHandler) -> StatusHandle,
    convention: System,
    failure: 0,
    error_code: ERROR_NOT_ENOUGH_MEMORY,
}

define_api! {
    /// Report a service's status to the SCM.
    pub SetServiceStatus in "advapi32": fn(StatusHandle, ServiceStatus) -> Bool,
    convention: System,
    failure: FALSE,
    error_code: ERROR_INVALID_HANDLE,
}
