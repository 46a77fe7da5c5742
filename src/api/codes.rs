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

//! Win32 handle aliases, status codes, and flag constants used across
//! the intercepted API surface and its collaborators.

/// Registry key handle.
pub type HKey = usize;
/// Service Control Manager / service handle.
pub type ScHandle = usize;
/// Service status reporting handle.
pub type StatusHandle = usize;
/// Generic kernel object handle (events, event-log sources).
pub type RawHandle = usize;
/// Win32 `BOOL`.
pub type Bool = i32;
/// Registry API status (`LSTATUS` value range).
pub type Lstatus = u32;

pub const TRUE: Bool = 1;
pub const FALSE: Bool = 0;

/// Predefined root key `HKEY_LOCAL_MACHINE`.
pub const HKEY_LOCAL_MACHINE: HKey = 0x8000_0002;

// System error codes.
pub const NO_ERROR: u32 = 0;
pub const ERROR_FILE_NOT_FOUND: u32 = 2;
pub const ERROR_ACCESS_DENIED: u32 = 5;
pub const ERROR_INVALID_HANDLE: u32 = 6;
pub const ERROR_NOT_ENOUGH_MEMORY: u32 = 8;
pub const ERROR_OUTOFMEMORY: u32 = 14;
pub const ERROR_INVALID_PARAMETER: u32 = 87;
pub const ERROR_CALL_NOT_IMPLEMENTED: u32 = 120;
pub const ERROR_ALREADY_EXISTS: u32 = 183;
pub const ERROR_REGISTRY_CORRUPT: u32 = 1015;
pub const ERROR_SERVICE_ALREADY_RUNNING: u32 = 1056;
pub const ERROR_SERVICE_DOES_NOT_EXIST: u32 = 1060;

// Registry value types.
pub const REG_SZ: u32 = 1;
pub const REG_EXPAND_SZ: u32 = 2;
pub const REG_MULTI_SZ: u32 = 7;

// Service states.
pub const SERVICE_STOPPED: u32 = 1;
pub const SERVICE_START_PENDING: u32 = 2;
pub const SERVICE_STOP_PENDING: u32 = 3;
pub const SERVICE_RUNNING: u32 = 4;

// Service control codes and accepted-control masks.
pub const SERVICE_CONTROL_STOP: u32 = 1;
pub const SERVICE_ACCEPT_STOP: u32 = 1;

// Service type / start / error-control configuration.
pub const SERVICE_WIN32_OWN_PROCESS: u32 = 0x10;
pub const SERVICE_DEMAND_START: u32 = 3;
pub const SERVICE_ERROR_NORMAL: u32 = 1;

// Access rights.
pub const DELETE: u32 = 0x0001_0000;
pub const STANDARD_RIGHTS_READ: u32 = 0x0002_0000;
pub const STANDARD_RIGHTS_WRITE: u32 = 0x0002_0000;
pub const SC_MANAGER_CONNECT: u32 = 0x0001;
pub const SC_MANAGER_CREATE_SERVICE: u32 = 0x0002;
pub const SERVICE_CHANGE_CONFIG: u32 = 0x0002;
pub const SERVICE_QUERY_STATUS: u32 = 0x0004;
pub const SERVICE_START: u32 = 0x0010;
pub const SERVICE_STOP: u32 = 0x0020;

// Wait results.
pub const WAIT_OBJECT_0: u32 = 0;
pub const WAIT_TIMEOUT: u32 = 0x102;
pub const WAIT_FAILED: u32 = 0xFFFF_FFFF;
pub const INFINITE: u32 = 0xFFFF_FFFF;

// Event log record types.
pub const EVENTLOG_ERROR_TYPE: u16 = 0x0001;
pub const EVENTLOG_WARNING_TYPE: u16 = 0x0002;
pub const EVENTLOG_INFORMATION_TYPE: u16 = 0x0004;
