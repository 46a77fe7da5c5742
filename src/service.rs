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

//! Hosted service bootstrap.
//!
//! [`ServiceHost`] implements the service side of the SCM contract:
//! register a control handler, report `START_PENDING` then `RUNNING`,
//! idle on the stop event, and report `STOPPED` with the final exit
//! code. The stop control is handled by reporting `STOP_PENDING` and
//! signalling the event the wait loop blocks on.

use std::sync::{Arc, Mutex};

use tracing::{error, info};

use crate::api::codes::*;
use crate::api::{ApiSurface, ServiceStatus};

/// Service name as registered with the SCM; also the svchost group.
pub const SERVICE_NAME: &str = "SvcFault";
/// Display name shown in the services console.
pub const SERVICE_DISPLAY_NAME: &str = "Fault Injection Probe Service";
/// Module svchost.exe loads for this service.
pub const SERVICE_MODULE: &str = "svcfault.dll";

/// Wait-hint reported while start is pending, in milliseconds.
const START_HINT_MILLIS: u32 = 3000;

#[derive(Default)]
struct HostState {
    status: ServiceStatus,
    status_handle: StatusHandle,
    stop_event: RawHandle,
}

/// One hosted service instance.
///
/// Held in an `Arc` so the control handler registered with the SCM can
/// reach it after `service_main` returns to the dispatcher.
pub struct ServiceHost {
    api: Arc<ApiSurface>,
    state: Mutex<HostState>,
    /// Wait-loop timeout between wakeups, in milliseconds.
    poll_millis: u32,
}

impl ServiceHost {
    pub fn new(api: Arc<ApiSurface>) -> Arc<Self> {
        Self::with_poll_millis(api, 1000 * 60)
    }

    /// Same as [`ServiceHost::new`] with the wait-loop timeout
    /// overridden, so tests do not idle for a minute per wakeup.
    pub fn with_poll_millis(api: Arc<ApiSurface>, poll_millis: u32) -> Arc<Self> {
        Arc::new(Self {
            api,
            state: Mutex::new(HostState {
                status: ServiceStatus {
                    service_type: SERVICE_WIN32_OWN_PROCESS,
                    ..ServiceStatus::ZERO
                },
                ..HostState::default()
            }),
            poll_millis,
        })
    }

    /// Service entry point, called by the dispatcher with the service
    /// name. Runs until the service stops and reports the final status.
    pub fn service_main(self: &Arc<Self>, name: &str) {
        let host = self.clone();
        let handler: crate::api::ControlHandler =
            Arc::new(move |control| host.control(control));

        let status_handle = self.api.register_service_ctrl_handler(name, handler);
        if status_handle == 0 {
            let code = crate::mock::last_error();
            error!(code, "failed to register service control handler");
            // Report through the null handle so the failure is visible
            // to whoever is watching the status sink.
            self.report_status(SERVICE_STOPPED, code, 0);
            return;
        }
        if let Ok(mut state) = self.state.lock() {
            state.status_handle = status_handle;
        }

        self.report_status(SERVICE_START_PENDING, NO_ERROR, START_HINT_MILLIS);

        let code = self.initialize();
        let code = if code == NO_ERROR {
            info!(service = name, "service running");
            self.report_status(SERVICE_RUNNING, NO_ERROR, 0);
            self.wait()
        } else {
            code
        };

        self.report_status(SERVICE_STOPPED, code, 0);
    }

    /// Create the stop event. Returns `NO_ERROR` or the last-error code
    /// of the failed call.
    fn initialize(&self) -> u32 {
        let event = self.api.create_event(false, false);
        if event == 0 {
            let code = crate::mock::last_error();
            error!(code, "failed to create stop event");
            return code;
        }
        if let Ok(mut state) = self.state.lock() {
            state.stop_event = event;
        }
        NO_ERROR
    }

    /// Block until the stop event is signalled. Returns `NO_ERROR`, or
    /// the wait result when the wait itself failed.
    fn wait(&self) -> u32 {
        let event = match self.state.lock() {
            Ok(state) => state.stop_event,
            Err(_) => return ERROR_OUTOFMEMORY,
        };
        loop {
            match self.api.wait_for_single_object(event, self.poll_millis) {
                WAIT_OBJECT_0 => return NO_ERROR,
                WAIT_TIMEOUT => continue,
                status => {
                    error!(status, "wait on stop event failed");
                    return status;
                }
            }
        }
    }

    /// Control handler. Stop reports `STOP_PENDING`, signals the stop
    /// event, and re-reports the current state; other codes are ignored.
    fn control(&self, control: u32) {
        if control != SERVICE_CONTROL_STOP {
            return;
        }
        self.report_status(SERVICE_STOP_PENDING, NO_ERROR, 0);

        let event = self.state.lock().map(|state| state.stop_event).unwrap_or(0);
        if self.api.set_event(event) == FALSE {
            error!(
                code = crate::mock::last_error(),
                "failed to signal stop event"
            );
        }

        let current = self
            .state
            .lock()
            .map(|state| state.status.current_state)
            .unwrap_or(SERVICE_STOP_PENDING);
        self.report_status(current, NO_ERROR, 0);
    }

    /// Update the tracked status and report it to the SCM.
    ///
    /// Controls are not accepted while start is pending; the checkpoint
    /// resets on `RUNNING` and `STOPPED` and counts up in pending
    /// states.
    fn report_status(&self, current_state: u32, exit_code: u32, wait_hint: u32) {
        let (handle, status) = match self.state.lock() {
            Ok(mut state) => {
                state.status.current_state = current_state;
                state.status.win32_exit_code = exit_code;
                state.status.wait_hint = wait_hint;
                state.status.controls_accepted = if current_state == SERVICE_START_PENDING {
                    0
                } else {
                    SERVICE_ACCEPT_STOP
                };
                if current_state == SERVICE_RUNNING || current_state == SERVICE_STOPPED {
                    state.status.checkpoint = 0;
                } else {
                    state.status.checkpoint += 1;
                }
                (state.status_handle, state.status)
            }
            Err(_) => return,
        };

        if self.api.set_service_status(handle, status) == FALSE {
            error!(
                code = crate::mock::last_error(),
                "failed to report service status"
            );
        }
    }

    /// Status handle received from the registration call, for
    /// inspection. Zero until registration succeeds.
    pub fn status_handle(&self) -> StatusHandle {
        self.state
            .lock()
            .map(|state| state.status_handle)
            .unwrap_or(0)
    }

    /// Request a stop as the SCM would, through the control handler
    /// path.
    pub fn request_stop(&self) {
        self.control(SERVICE_CONTROL_STOP);
    }
}

impl Drop for ServiceHost {
    fn drop(&mut self) {
        if let Ok(state) = self.state.lock() {
            if state.stop_event != 0 {
                self.api.close_handle(state.stop_event);
            }
        }
    }
}
