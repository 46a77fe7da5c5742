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

//! Live Win32 exports for the intercepted surface.
//!
//! Each export wraps the real system call, converting between the owned
//! argument tuples the interception layer carries and the raw pointer
//! shapes the Win32 ABI expects. Failures mirror the system last error
//! into the crate's thread-local so override guards and genuine calls
//! report errors through one channel.

use std::sync::RwLock;

use windows::core::PCWSTR;
use windows::Win32::Foundation::{CloseHandle, HANDLE, WIN32_ERROR};
use windows::Win32::Security::PSID;
use windows::Win32::System::EventLog::{
    DeregisterEventSource, RegisterEventSourceW, ReportEventW, REPORT_EVENT_TYPE,
};
use windows::Win32::System::Registry::{
    RegCloseKey, RegCreateKeyW, RegOpenKeyW, RegSetValueExW, HKEY, REG_VALUE_TYPE,
};
use windows::Win32::System::Services::{
    CloseServiceHandle, ControlService, CreateServiceW, DeleteService, OpenSCManagerW,
    OpenServiceW, QueryServiceStatus, RegisterServiceCtrlHandlerW, SetServiceStatus,
    StartServiceW, ENUM_SERVICE_TYPE, SC_HANDLE, SERVICE_ERROR, SERVICE_STATUS,
    SERVICE_STATUS_CURRENT_STATE, SERVICE_STATUS_HANDLE, SERVICE_START_TYPE,
};
use windows::Win32::System::Threading::{CreateEventW, SetEvent, WaitForSingleObject};

use crate::mock::{set_last_error, ExportTable};

use super::codes::{Bool, FALSE, TRUE, WAIT_FAILED};
use super::svc::{ControlHandler, ServiceStatus};
use super::{event, reg, svc, sync};

/// Handler installed through the intercepted
/// `RegisterServiceCtrlHandlerW`, dispatched to by the raw callback the
/// system actually registers. One service per process, matching the
/// hosted-service model.
static CTRL_HANDLER: RwLock<Option<ControlHandler>> = RwLock::new(None);

extern "system" fn ctrl_dispatch(control: u32) {
    let handler = CTRL_HANDLER
        .read()
        .ok()
        .and_then(|slot| slot.clone());
    if let Some(handler) = handler {
        handler(control);
    }
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn opt_wide(s: &Option<String>) -> Option<Vec<u16>> {
    s.as_deref().map(wide)
}

fn pcwstr(buf: &Option<Vec<u16>>) -> PCWSTR {
    match buf {
        Some(buf) => PCWSTR(buf.as_ptr()),
        None => PCWSTR::null(),
    }
}

/// Win32 error code carried by a `windows` crate error.
fn win32_code(err: &windows::core::Error) -> u32 {
    WIN32_ERROR::from_error(err)
        .map(|code| code.0)
        .unwrap_or(err.code().0 as u32)
}

fn mirror_err(err: &windows::core::Error) {
    set_last_error(win32_code(err));
}

fn from_raw_status(raw: SERVICE_STATUS) -> ServiceStatus {
    ServiceStatus {
        service_type: raw.dwServiceType.0,
        current_state: raw.dwCurrentState.0,
        controls_accepted: raw.dwControlsAccepted,
        win32_exit_code: raw.dwWin32ExitCode,
        checkpoint: raw.dwCheckPoint,
        wait_hint: raw.dwWaitHint,
    }
}

fn to_raw_status(status: ServiceStatus) -> SERVICE_STATUS {
    SERVICE_STATUS {
        dwServiceType: ENUM_SERVICE_TYPE(status.service_type),
        dwCurrentState: SERVICE_STATUS_CURRENT_STATE(status.current_state),
        dwControlsAccepted: status.controls_accepted,
        dwWin32ExitCode: status.win32_exit_code,
        dwServiceSpecificExitCode: 0,
        dwCheckPoint: status.checkpoint,
        dwWaitHint: status.wait_hint,
    }
}

fn bool_result(result: windows::core::Result<()>) -> Bool {
    match result {
        Ok(()) => TRUE,
        Err(err) => {
            mirror_err(&err);
            FALSE
        }
    }
}

/// Export tables over the genuine system calls: `advapi32` and
/// `kernel32`.
pub fn export_tables() -> Vec<ExportTable> {
    vec![advapi32(), kernel32()]
}

fn advapi32() -> ExportTable {
    ExportTable::new("advapi32")
        .export::<reg::RegOpenKeyW>(|(root, path)| {
            let path = wide(&path);
            let mut key = HKEY::default();
            let status =
                unsafe { RegOpenKeyW(HKEY(root as _), PCWSTR(path.as_ptr()), &mut key) };
            (status.0, key.0 as usize)
        })
        .export::<reg::RegCreateKeyW>(|(root, path)| {
            let path = wide(&path);
            let mut key = HKEY::default();
            let status =
                unsafe { RegCreateKeyW(HKEY(root as _), PCWSTR(path.as_ptr()), &mut key) };
            (status.0, key.0 as usize)
        })
        .export::<reg::RegSetValueExW>(|(key, name, kind, data)| {
            let name = wide(&name);
            let status = unsafe {
                RegSetValueExW(
                    HKEY(key as _),
                    PCWSTR(name.as_ptr()),
                    0,
                    REG_VALUE_TYPE(kind),
                    Some(&data),
                )
            };
            status.0
        })
        .export::<reg::RegCloseKey>(|(key,)| unsafe { RegCloseKey(HKEY(key as _)).0 })
        .export::<svc::OpenSCManagerW>(|(machine, database, access)| {
            let machine = opt_wide(&machine);
            let database = opt_wide(&database);
            match unsafe { OpenSCManagerW(pcwstr(&machine), pcwstr(&database), access) } {
                Ok(handle) => handle.0 as usize,
                Err(err) => {
                    mirror_err(&err);
                    0
                }
            }
        })
        .export::<svc::OpenServiceW>(|(manager, name, access)| {
            let name = wide(&name);
            match unsafe {
                OpenServiceW(SC_HANDLE(manager as _), PCWSTR(name.as_ptr()), access)
            } {
                Ok(handle) => handle.0 as usize,
                Err(err) => {
                    mirror_err(&err);
                    0
                }
            }
        })
        .export::<svc::CreateServiceW>(
            |(manager, name, display, access, kind, start, error_control, path)| {
                let name = wide(&name);
                let display = wide(&display);
                let path = wide(&path);
                match unsafe {
                    CreateServiceW(
                        SC_HANDLE(manager as _),
                        PCWSTR(name.as_ptr()),
                        PCWSTR(display.as_ptr()),
                        access,
                        ENUM_SERVICE_TYPE(kind),
                        SERVICE_START_TYPE(start),
                        SERVICE_ERROR(error_control),
                        PCWSTR(path.as_ptr()),
                        PCWSTR::null(),
                        None,
                        PCWSTR::null(),
                        PCWSTR::null(),
                        PCWSTR::null(),
                    )
                } {
                    Ok(handle) => handle.0 as usize,
                    Err(err) => {
                        mirror_err(&err);
                        0
                    }
                }
            },
        )
        .export::<svc::DeleteService>(|(service,)| {
            bool_result(unsafe { DeleteService(SC_HANDLE(service as _)) })
        })
        .export::<svc::StartServiceW>(|(service, args)| {
            let args: Vec<Vec<u16>> = args.iter().map(|arg| wide(arg)).collect();
            let ptrs: Vec<PCWSTR> = args.iter().map(|arg| PCWSTR(arg.as_ptr())).collect();
            let ptrs = (!ptrs.is_empty()).then_some(ptrs.as_slice());
            bool_result(unsafe { StartServiceW(SC_HANDLE(service as _), ptrs) })
        })
        .export::<svc::ControlService>(|(service, control)| {
            let mut raw = SERVICE_STATUS::default();
            match unsafe { ControlService(SC_HANDLE(service as _), control, &mut raw) } {
                Ok(()) => (TRUE, from_raw_status(raw)),
                Err(err) => {
                    mirror_err(&err);
                    (FALSE, ServiceStatus::ZERO)
                }
            }
        })
        .export::<svc::QueryServiceStatus>(|(service,)| {
            let mut raw = SERVICE_STATUS::default();
            match unsafe { QueryServiceStatus(SC_HANDLE(service as _), &mut raw) } {
                Ok(()) => (TRUE, from_raw_status(raw)),
                Err(err) => {
                    mirror_err(&err);
                    (FALSE, ServiceStatus::ZERO)
                }
            }
        })
        .export::<svc::CloseServiceHandle>(|(handle,)| {
            bool_result(unsafe { CloseServiceHandle(SC_HANDLE(handle as _)) })
        })
        .export::<svc::RegisterServiceCtrlHandlerW>(|(name, handler)| {
            if let Ok(mut slot) = CTRL_HANDLER.write() {
                *slot = Some(handler);
            }
            let name = wide(&name);
            match unsafe {
                RegisterServiceCtrlHandlerW(PCWSTR(name.as_ptr()), Some(ctrl_dispatch))
            } {
                Ok(handle) => handle.0 as usize,
                Err(err) => {
                    mirror_err(&err);
                    0
                }
            }
        })
        .export::<svc::SetServiceStatus>(|(handle, status)| {
            let raw = to_raw_status(status);
            bool_result(unsafe {
                SetServiceStatus(SERVICE_STATUS_HANDLE(handle as _), &raw)
            })
        })
        .export::<event::RegisterEventSourceW>(|(machine, source)| {
            let machine = opt_wide(&machine);
            let source = wide(&source);
            match unsafe { RegisterEventSourceW(pcwstr(&machine), PCWSTR(source.as_ptr())) } {
                Ok(handle) => handle.0 as usize,
                Err(err) => {
                    mirror_err(&err);
                    0
                }
            }
        })
        .export::<event::ReportEventW>(|(source, record_type, category, event_id, strings)| {
            let strings: Vec<Vec<u16>> = strings.iter().map(|s| wide(s)).collect();
            let ptrs: Vec<PCWSTR> = strings.iter().map(|s| PCWSTR(s.as_ptr())).collect();
            let ptrs = (!ptrs.is_empty()).then_some(ptrs.as_slice());
            bool_result(unsafe {
                ReportEventW(
                    HANDLE(source as _),
                    REPORT_EVENT_TYPE(record_type),
                    category,
                    event_id,
                    PSID::default(),
                    0,
                    ptrs,
                    None,
                )
            })
        })
        .export::<event::DeregisterEventSource>(|(source,)| {
            bool_result(unsafe { DeregisterEventSource(HANDLE(source as _)) })
        })
}

fn kernel32() -> ExportTable {
    ExportTable::new("kernel32")
        .export::<sync::CreateEventW>(|(manual_reset, signaled)| {
            match unsafe { CreateEventW(None, manual_reset, signaled, PCWSTR::null()) } {
                Ok(handle) => handle.0 as usize,
                Err(err) => {
                    mirror_err(&err);
                    0
                }
            }
        })
        .export::<sync::SetEvent>(|(handle,)| {
            bool_result(unsafe { SetEvent(HANDLE(handle as _)) })
        })
        .export::<sync::WaitForSingleObject>(|(handle, millis)| {
            let result = unsafe { WaitForSingleObject(HANDLE(handle as _), millis) };
            if result.0 == WAIT_FAILED {
                set_last_error(unsafe {
                    windows::Win32::Foundation::GetLastError().0
                });
            }
            result.0
        })
        .export::<sync::CloseHandle>(|(handle,)| {
            bool_result(unsafe { CloseHandle(HANDLE(handle as _)) })
        })
}
