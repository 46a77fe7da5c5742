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

//! In-memory stand-in for the OS surface.
//!
//! [`SimOs`] provides working "genuine" implementations for every
//! intercepted API: a registry key/value store, a service table, event
//! objects, and an event-log sink. It backs the non-Windows build of
//! [`ApiSurface`](super::ApiSurface) and gives tests a genuine success
//! path to contrast with injected faults, plus inspection helpers to
//! assert on the side effects collaborators produced.
//!
//! The simulation is deliberately shallow: handles are opaque counters,
//! services transition states immediately, and no access checking is
//! performed. Fault paths are exercised through override guards, not by
//! simulating OS failures.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::mock::{set_last_error, ExportTable};

use super::codes::*;
use super::svc::{ControlHandler, ServiceStatus};

/// One record written through `ReportEventW`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedEvent {
    pub source: String,
    pub record_type: u16,
    pub event_id: u32,
    pub strings: Vec<String>,
}

#[derive(Default)]
struct SimState {
    next_handle: usize,
    // Registry.
    keys: HashMap<String, HashMap<String, (u32, Vec<u8>)>>,
    key_handles: HashMap<HKey, String>,
    // Service Control Manager.
    services: HashMap<String, u32>,
    manager_handles: HashMap<ScHandle, ()>,
    service_handles: HashMap<ScHandle, String>,
    // Service status reporting.
    handlers: HashMap<String, ControlHandler>,
    status_handles: HashMap<StatusHandle, String>,
    reported: Vec<ServiceStatus>,
    // Event objects.
    events: HashMap<RawHandle, SimEvent>,
    // Event log.
    sources: HashMap<RawHandle, String>,
    log: Vec<LoggedEvent>,
}

struct SimEvent {
    manual_reset: bool,
    signaled: bool,
}

impl SimState {
    fn alloc_handle(&mut self) -> usize {
        self.next_handle += 4;
        0x1000 + self.next_handle
    }
}

type Shared = Arc<Mutex<SimState>>;

fn locked(state: &Shared) -> std::sync::MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle on the simulated OS, cloneable into tests for seeding and
/// inspection while the export tables built from it are in use.
#[derive(Clone, Default)]
pub struct SimOs {
    state: Shared,
}

impl SimOs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the export tables the simulation serves: `advapi32` and
    /// `kernel32`.
    pub fn export_tables(&self) -> Vec<ExportTable> {
        vec![self.advapi32(), self.kernel32()]
    }

    // ----- seeding and inspection -------------------------------------

    /// Create a registry key without going through the API surface.
    pub fn seed_key(&self, path: &str) {
        locked(&self.state).keys.entry(path.to_owned()).or_default();
    }

    pub fn key_exists(&self, path: &str) -> bool {
        locked(&self.state).keys.contains_key(path)
    }

    /// Raw value stored under `path`, if any.
    pub fn value(&self, path: &str, name: &str) -> Option<(u32, Vec<u8>)> {
        locked(&self.state).keys.get(path)?.get(name).cloned()
    }

    /// Value under `path` decoded as UTF-16LE text (terminators kept).
    pub fn string_value(&self, path: &str, name: &str) -> Option<String> {
        let (_, data) = self.value(path, name)?;
        let units: Vec<u16> = data
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Some(String::from_utf16_lossy(&units))
    }

    /// Create a service record in the given state.
    pub fn seed_service(&self, name: &str, state: u32) {
        locked(&self.state).services.insert(name.to_owned(), state);
    }

    /// Current state of a simulated service.
    pub fn service_state(&self, name: &str) -> Option<u32> {
        locked(&self.state).services.get(name).copied()
    }

    /// Control handler registered for a service, if any.
    pub fn control_handler(&self, name: &str) -> Option<ControlHandler> {
        locked(&self.state).handlers.get(name).cloned()
    }

    /// Every status reported through `SetServiceStatus`, in order.
    pub fn reported_statuses(&self) -> Vec<ServiceStatus> {
        locked(&self.state).reported.clone()
    }

    /// Every record written through `ReportEventW`, in order.
    pub fn logged_events(&self) -> Vec<LoggedEvent> {
        locked(&self.state).log.clone()
    }

    /// Count of live handles of every kind; drop paths should return
    /// this to zero.
    pub fn live_handles(&self) -> usize {
        let state = locked(&self.state);
        state.key_handles.len()
            + state.manager_handles.len()
            + state.service_handles.len()
            + state.events.len()
            + state.sources.len()
    }

    // ----- exported behaviors -----------------------------------------

    fn advapi32(&self) -> ExportTable {
        use super::{event, reg, svc};

        let table = ExportTable::new("advapi32");

        // Registry.
        let st = self.state.clone();
        let table = table.export::<reg::RegOpenKeyW>(move |(_root, path)| {
            let mut state = locked(&st);
            if state.keys.contains_key(&path) {
                let handle = state.alloc_handle();
                state.key_handles.insert(handle, path);
                (NO_ERROR, handle)
            } else {
                (ERROR_FILE_NOT_FOUND, 0)
            }
        });

        let st = self.state.clone();
        let table = table.export::<reg::RegCreateKeyW>(move |(_root, path)| {
            let mut state = locked(&st);
            state.keys.entry(path.clone()).or_default();
            let handle = state.alloc_handle();
            state.key_handles.insert(handle, path);
            (NO_ERROR, handle)
        });

        let st = self.state.clone();
        let table = table.export::<reg::RegSetValueExW>(move |(key, name, kind, data)| {
            let mut state = locked(&st);
            let Some(path) = state.key_handles.get(&key).cloned() else {
                return ERROR_INVALID_HANDLE;
            };
            state
                .keys
                .entry(path)
                .or_default()
                .insert(name, (kind, data));
            NO_ERROR
        });

        let st = self.state.clone();
        let table = table.export::<reg::RegCloseKey>(move |(key,)| {
            match locked(&st).key_handles.remove(&key) {
                Some(_) => NO_ERROR,
                None => ERROR_INVALID_HANDLE,
            }
        });

        // Service Control Manager.
        let st = self.state.clone();
        let table = table.export::<svc::OpenSCManagerW>(move |(_machine, _db, _access)| {
            let mut state = locked(&st);
            let handle = state.alloc_handle();
            state.manager_handles.insert(handle, ());
            handle
        });

        let st = self.state.clone();
        let table = table.export::<svc::OpenServiceW>(move |(_manager, name, _access)| {
            let mut state = locked(&st);
            if state.services.contains_key(&name) {
                let handle = state.alloc_handle();
                state.service_handles.insert(handle, name);
                handle
            } else {
                set_last_error(ERROR_SERVICE_DOES_NOT_EXIST);
                0
            }
        });

        let st = self.state.clone();
        let table = table.export::<svc::CreateServiceW>(
            move |(_manager, name, _display, _access, _kind, _start, _err_ctl, _path)| {
                let mut state = locked(&st);
                if state.services.contains_key(&name) {
                    set_last_error(ERROR_ALREADY_EXISTS);
                    return 0;
                }
                state.services.insert(name.clone(), SERVICE_STOPPED);
                let handle = state.alloc_handle();
                state.service_handles.insert(handle, name);
                handle
            },
        );

        let st = self.state.clone();
        let table = table.export::<svc::DeleteService>(move |(service,)| {
            let mut state = locked(&st);
            let Some(name) = state.service_handles.get(&service).cloned() else {
                set_last_error(ERROR_INVALID_HANDLE);
                return FALSE;
            };
            state.services.remove(&name);
            TRUE
        });

        let st = self.state.clone();
        let table = table.export::<svc::StartServiceW>(move |(service, _args)| {
            let mut state = locked(&st);
            let Some(name) = state.service_handles.get(&service).cloned() else {
                set_last_error(ERROR_INVALID_HANDLE);
                return FALSE;
            };
            match state.services.get(&name).copied() {
                Some(SERVICE_RUNNING) => {
                    set_last_error(ERROR_SERVICE_ALREADY_RUNNING);
                    FALSE
                }
                Some(_) => {
                    state.services.insert(name, SERVICE_RUNNING);
                    TRUE
                }
                None => {
                    set_last_error(ERROR_SERVICE_DOES_NOT_EXIST);
                    FALSE
                }
            }
        });

        let st = self.state.clone();
        let table = table.export::<svc::ControlService>(move |(service, control)| {
            let mut state = locked(&st);
            let Some(name) = state.service_handles.get(&service).cloned() else {
                set_last_error(ERROR_INVALID_HANDLE);
                return (FALSE, ServiceStatus::ZERO);
            };
            if control != SERVICE_CONTROL_STOP {
                set_last_error(ERROR_CALL_NOT_IMPLEMENTED);
                return (FALSE, ServiceStatus::ZERO);
            }
            state.services.insert(name, SERVICE_STOPPED);
            (
                TRUE,
                ServiceStatus {
                    current_state: SERVICE_STOPPED,
                    ..ServiceStatus::ZERO
                },
            )
        });

        let st = self.state.clone();
        let table = table.export::<svc::QueryServiceStatus>(move |(service,)| {
            let state = locked(&st);
            let Some(name) = state.service_handles.get(&service) else {
                set_last_error(ERROR_INVALID_HANDLE);
                return (FALSE, ServiceStatus::ZERO);
            };
            match state.services.get(name).copied() {
                Some(current_state) => (
                    TRUE,
                    ServiceStatus {
                        current_state,
                        ..ServiceStatus::ZERO
                    },
                ),
                None => {
                    set_last_error(ERROR_SERVICE_DOES_NOT_EXIST);
                    (FALSE, ServiceStatus::ZERO)
                }
            }
        });

        let st = self.state.clone();
        let table = table.export::<svc::CloseServiceHandle>(move |(handle,)| {
            let mut state = locked(&st);
            if state.manager_handles.remove(&handle).is_some()
                || state.service_handles.remove(&handle).is_some()
            {
                TRUE
            } else {
                set_last_error(ERROR_INVALID_HANDLE);
                FALSE
            }
        });

        let st = self.state.clone();
        let table = table.export::<svc::RegisterServiceCtrlHandlerW>(move |(name, handler)| {
            let mut state = locked(&st);
            state.handlers.insert(name.clone(), handler);
            let handle = state.alloc_handle();
            state.status_handles.insert(handle, name);
            handle
        });

        let st = self.state.clone();
        let table = table.export::<svc::SetServiceStatus>(move |(handle, status)| {
            let mut state = locked(&st);
            // The original reports a final STOPPED status even when
            // handler registration failed and the handle is null, so
            // the sink accepts any handle value.
            let _ = handle;
            state.reported.push(status);
            TRUE
        });

        // Event log.
        let st = self.state.clone();
        let table = table.export::<event::RegisterEventSourceW>(move |(_machine, source)| {
            let mut state = locked(&st);
            let handle = state.alloc_handle();
            state.sources.insert(handle, source);
            handle
        });

        let st = self.state.clone();
        let table = table.export::<event::ReportEventW>(
            move |(source, record_type, _category, event_id, strings)| {
                let mut state = locked(&st);
                let Some(name) = state.sources.get(&source).cloned() else {
                    set_last_error(ERROR_INVALID_HANDLE);
                    return FALSE;
                };
                state.log.push(LoggedEvent {
                    source: name,
                    record_type,
                    event_id,
                    strings,
                });
                TRUE
            },
        );

        let st = self.state.clone();
        table.export::<event::DeregisterEventSource>(move |(source,)| {
            match locked(&st).sources.remove(&source) {
                Some(_) => TRUE,
                None => {
                    set_last_error(ERROR_INVALID_HANDLE);
                    FALSE
                }
            }
        })
    }

    fn kernel32(&self) -> ExportTable {
        use super::sync;

        let table = ExportTable::new("kernel32");

        let st = self.state.clone();
        let table = table.export::<sync::CreateEventW>(move |(manual_reset, signaled)| {
            let mut state = locked(&st);
            let handle = state.alloc_handle();
            state.events.insert(
                handle,
                SimEvent {
                    manual_reset,
                    signaled,
                },
            );
            handle
        });

        let st = self.state.clone();
        let table = table.export::<sync::SetEvent>(move |(handle,)| {
            let mut state = locked(&st);
            match state.events.get_mut(&handle) {
                Some(event) => {
                    event.signaled = true;
                    TRUE
                }
                None => {
                    set_last_error(ERROR_INVALID_HANDLE);
                    FALSE
                }
            }
        });

        let st = self.state.clone();
        let table = table.export::<sync::WaitForSingleObject>(move |(handle, _millis)| {
            let mut state = locked(&st);
            match state.events.get_mut(&handle) {
                Some(event) => {
                    if event.signaled {
                        if !event.manual_reset {
                            event.signaled = false;
                        }
                        WAIT_OBJECT_0
                    } else {
                        WAIT_TIMEOUT
                    }
                }
                None => {
                    set_last_error(ERROR_INVALID_HANDLE);
                    WAIT_FAILED
                }
            }
        });

        let st = self.state.clone();
        table.export::<sync::CloseHandle>(move |(handle,)| {
            match locked(&st).events.remove(&handle) {
                Some(_) => TRUE,
                None => {
                    set_last_error(ERROR_INVALID_HANDLE);
                    FALSE
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{reg, svc, sync};
    use crate::mock::MockRegistry;

    fn registry() -> (MockRegistry, SimOs) {
        let sim = SimOs::new();
        (MockRegistry::new(sim.export_tables()), sim)
    }

    #[test]
    fn registry_keys_create_open_and_store_values() {
        let (registry, sim) = registry();

        let (status, _) = registry
            .cell::<reg::RegOpenKeyW>()
            .invoke((HKEY_LOCAL_MACHINE, "Software\\Missing".into()));
        assert_eq!(status, ERROR_FILE_NOT_FOUND);

        let (status, key) = registry
            .cell::<reg::RegCreateKeyW>()
            .invoke((HKEY_LOCAL_MACHINE, "Software\\Probe".into()));
        assert_eq!(status, NO_ERROR);

        let status = registry.cell::<reg::RegSetValueExW>().invoke((
            key,
            "Value".into(),
            REG_SZ,
            vec![0x41, 0x00],
        ));
        assert_eq!(status, NO_ERROR);
        assert_eq!(
            sim.string_value("Software\\Probe", "Value").as_deref(),
            Some("A")
        );

        assert_eq!(registry.cell::<reg::RegCloseKey>().invoke((key,)), NO_ERROR);
        assert_eq!(sim.live_handles(), 0);
    }

    #[test]
    fn services_run_through_their_lifecycle() {
        let (registry, sim) = registry();

        let manager = registry
            .cell::<svc::OpenSCManagerW>()
            .invoke((None, None, SC_MANAGER_CONNECT));
        assert_ne!(manager, 0);

        let service = registry.cell::<svc::CreateServiceW>().invoke((
            manager,
            "ProbeSvc".into(),
            "Probe Service".into(),
            SERVICE_START,
            SERVICE_WIN32_OWN_PROCESS,
            SERVICE_DEMAND_START,
            SERVICE_ERROR_NORMAL,
            "C:\\probe.exe".into(),
        ));
        assert_ne!(service, 0);
        assert_eq!(sim.service_state("ProbeSvc"), Some(SERVICE_STOPPED));

        assert_eq!(
            registry
                .cell::<svc::StartServiceW>()
                .invoke((service, vec![])),
            TRUE
        );
        let (ok, status) = registry.cell::<svc::QueryServiceStatus>().invoke((service,));
        assert_eq!(ok, TRUE);
        assert_eq!(status.current_state, SERVICE_RUNNING);

        let (ok, status) = registry
            .cell::<svc::ControlService>()
            .invoke((service, SERVICE_CONTROL_STOP));
        assert_eq!(ok, TRUE);
        assert_eq!(status.current_state, SERVICE_STOPPED);

        assert_eq!(
            registry.cell::<svc::DeleteService>().invoke((service,)),
            TRUE
        );
        assert_eq!(sim.service_state("ProbeSvc"), None);
    }

    #[test]
    fn auto_reset_events_clear_on_successful_wait() {
        let (registry, _sim) = registry();

        let event = registry.cell::<sync::CreateEventW>().invoke((false, false));
        assert_ne!(event, 0);

        let wait = registry.cell::<sync::WaitForSingleObject>();
        assert_eq!(wait.invoke((event, 10)), WAIT_TIMEOUT);

        assert_eq!(registry.cell::<sync::SetEvent>().invoke((event,)), TRUE);
        assert_eq!(wait.invoke((event, 10)), WAIT_OBJECT_0);
        // Auto-reset: consumed by the successful wait.
        assert_eq!(wait.invoke((event, 10)), WAIT_TIMEOUT);
    }
}
